//! JSON export of scenario runs.
//!
//! One `ExportFrame` per accepted pose update: the commanded pose, every
//! frame origin, the end-effector anchor and the link segments.

use kinoview_core::{LinkKind, SceneSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A link segment flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSegment {
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub radius: f64,
    pub tool: bool,
}

/// Scene state after one accepted pose update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFrame {
    /// Accepted-update counter of the engine
    pub update: u64,

    /// Virtual time in seconds
    pub time_sec: f64,

    /// Commanded joint angles (radians)
    pub pose: Vec<f64>,

    pub frame_origins: Vec<[f64; 3]>,
    pub anchor: [f64; 3],
    pub segments: Vec<ExportSegment>,

    /// Camera aspect ratio at the time of the update
    pub aspect: f64,
}

impl ExportFrame {
    pub fn from_snapshot(snapshot: &SceneSnapshot, pose: &[f64], time_sec: f64) -> Self {
        Self {
            update: snapshot.update,
            time_sec,
            pose: pose.to_vec(),
            frame_origins: snapshot.frame_origins.iter().map(|p| [p.x, p.y, p.z]).collect(),
            anchor: [snapshot.anchor.x, snapshot.anchor.y, snapshot.anchor.z],
            segments: snapshot
                .segments
                .iter()
                .map(|s| ExportSegment {
                    start: [s.start.x, s.start.y, s.start.z],
                    end: [s.end.x, s.end.y, s.end.z],
                    radius: s.radius,
                    tool: s.kind == LinkKind::Tool,
                })
                .collect(),
            aspect: snapshot.aspect,
        }
    }
}

/// Complete export of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneExport {
    pub scenario: String,
    pub seed: u64,

    /// Virtual duration in seconds
    pub duration_sec: f64,

    pub frames: Vec<ExportFrame>,

    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SceneExport {
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    pub fn add_frame(&mut self, frame: ExportFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>, duration_sec: f64) {
        self.passed = passed;
        self.failure_reason = failure_reason;
        self.duration_sec = duration_sec;
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file() {
        let mut export = SceneExport::new("zero", 42);
        export.add_frame(ExportFrame {
            update: 1,
            time_sec: 0.5,
            pose: vec![0.0; 6],
            frame_origins: vec![[0.0, 0.0, 0.2433]],
            anchor: [0.057, -0.01, 1.0283],
            segments: vec![ExportSegment {
                start: [0.0; 3],
                end: [0.0, 0.0, 0.2433],
                radius: 0.03,
                tool: false,
            }],
            aspect: 1.5,
        });
        export.finalize(true, None, 1.0);

        let path = std::env::temp_dir().join(format!("kinoview_export_{}.json", std::process::id()));
        export.write_to_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let parsed: SceneExport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, export);
        assert!(!text.contains("failure_reason"));
    }
}
