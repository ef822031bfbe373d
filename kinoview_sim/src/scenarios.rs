//! Pose-stream scenarios for the engine.

use crate::error::ScenarioError;
use kinoview_core::units::{degrees_to_radians, pose_from_degrees};
use kinoview_env::Viewport;
use rand::Rng;

/// Home preset of the Gen3 Lite (degrees).
pub const HOME_DEGREES: [f64; 6] = [0.0, 344.0, 75.0, 0.0, 300.0, 0.0];

/// Joint ranges used by the random preset (degrees, inclusive).
pub const JOINT_LIMITS_DEGREES: [(f64, f64); 6] = [
    (-154.1, 154.1),
    (-150.1, 150.1),
    (-150.1, 150.1),
    (-148.98, 148.98),
    (-144.97, 145.0),
    (-148.98, 148.98),
];

/// Frame 6 position reported by the kinematics service (meters).
const ZERO_FRAME6: [f64; 3] = [0.057, -0.010, 1.0033];
const HOME_FRAME6: [f64; 3] = [0.43863, 0.19351, 0.44908];

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Single zero pose
    Zero,

    /// Zero, then the home preset
    Home,

    /// Seeded random poses within the joint ranges, with a resize midway
    Random,

    /// Folds the upper arm straight down and back, with malformed input mixed in
    WristFlip,

    /// Interpolates zero → home → zero while the camera orbits and the surface resizes
    Sweep,
}

/// One action a scenario performs against the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A valid pose (radians) that must be applied
    Pose(Vec<f64>),
    /// A pose that must be rejected without changing the scene
    Malformed(Vec<f64>),
    /// Change the surface size, then resize the engine
    Resize(Viewport),
    /// Orbit the camera (radians)
    Orbit { azimuth: f64, polar: f64 },
}

impl ScenarioId {
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Zero,
            ScenarioId::Home,
            ScenarioId::Random,
            ScenarioId::WristFlip,
            ScenarioId::Sweep,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Zero => "zero",
            ScenarioId::Home => "home",
            ScenarioId::Random => "random",
            ScenarioId::WristFlip => "wrist_flip",
            ScenarioId::Sweep => "sweep",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Zero => "Zero pose, checked against the service's frame 6 position",
            ScenarioId::Home => "Home preset [0, 344, 75, 0, 300, 0] deg, checked against the service",
            ScenarioId::Random => "20 random poses within the Gen3 Lite joint ranges",
            ScenarioId::WristFlip => "Anti-parallel links plus rejected input (short vector, NaN)",
            ScenarioId::Sweep => "Interpolated zero -> home -> zero with camera orbit and resizes",
        }
    }

    /// Expected world position of the last frame after the final step.
    pub fn reference_frame6(&self) -> Option<[f64; 3]> {
        match self {
            ScenarioId::Zero | ScenarioId::Sweep => Some(ZERO_FRAME6),
            ScenarioId::Home => Some(HOME_FRAME6),
            ScenarioId::Random | ScenarioId::WristFlip => None,
        }
    }

    /// Builds the step list. Only `Random` consumes the RNG.
    pub fn steps<R: Rng>(&self, rng: &mut R) -> Vec<Step> {
        let zero = vec![0.0; 6];
        let home = pose_from_degrees(&HOME_DEGREES);

        match self {
            ScenarioId::Zero => vec![Step::Pose(zero)],

            ScenarioId::Home => vec![Step::Pose(zero), Step::Pose(home)],

            ScenarioId::Random => {
                let mut steps: Vec<Step> = (0..20).map(|_| Step::Pose(random_pose(rng))).collect();
                steps.insert(10, Step::Resize(Viewport::new(1280, 720)));
                steps
            }

            ScenarioId::WristFlip => {
                let pi = std::f64::consts::PI;
                vec![
                    Step::Pose(zero.clone()),
                    Step::Pose(vec![0.0, pi, 0.0, 0.0, 0.0, 0.0]),
                    Step::Malformed(vec![0.0; 5]),
                    Step::Pose(vec![0.0, pi, 0.0, 0.0, pi, 0.0]),
                    Step::Malformed(vec![0.0, 0.0, f64::NAN, 0.0, 0.0, 0.0]),
                    Step::Pose(vec![0.0, -pi, 0.0, 0.0, 0.0, 2.0 * pi]),
                    Step::Malformed(vec![0.0, 0.0, 0.0, f64::INFINITY, 0.0, 0.0]),
                    Step::Pose(zero),
                ]
            }

            ScenarioId::Sweep => {
                const STEPS_PER_LEG: usize = 24;
                let mut steps = Vec::new();
                for (from, to) in [(&zero, &home), (&home, &zero)] {
                    for i in 0..=STEPS_PER_LEG {
                        let t = i as f64 / STEPS_PER_LEG as f64;
                        steps.push(Step::Pose(lerp(from, to, t)));
                        steps.push(Step::Orbit {
                            azimuth: 0.02,
                            polar: 0.0,
                        });
                    }
                    steps.push(Step::Resize(Viewport::new(1920, 1080)));
                }
                // A collapsed surface must not break the camera
                steps.push(Step::Resize(Viewport::new(640, 0)));
                steps
            }
        }
    }
}

/// Uniform random pose within `JOINT_LIMITS_DEGREES` (radians).
pub fn random_pose<R: Rng>(rng: &mut R) -> Vec<f64> {
    JOINT_LIMITS_DEGREES
        .iter()
        .map(|&(lo, hi)| degrees_to_radians(rng.gen_range(lo..=hi)))
        .collect()
}

fn lerp(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + (b - a) * t).collect()
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zero" => Ok(ScenarioId::Zero),
            "home" => Ok(ScenarioId::Home),
            "random" => Ok(ScenarioId::Random),
            "wrist_flip" | "wristflip" | "flip" => Ok(ScenarioId::WristFlip),
            "sweep" => Ok(ScenarioId::Sweep),
            _ => Err(ScenarioError::UnknownScenario(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_names() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
        }
        assert_eq!("WristFlip".parse::<ScenarioId>().unwrap(), ScenarioId::WristFlip);
        assert!(matches!(
            "bogus".parse::<ScenarioId>(),
            Err(ScenarioError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_random_pose_within_limits() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let pose = random_pose(&mut rng);
            assert_eq!(pose.len(), 6);
            for (angle, (lo, hi)) in pose.iter().zip(JOINT_LIMITS_DEGREES.iter()) {
                let deg = angle.to_degrees();
                assert!(deg >= lo - 1e-9 && deg <= hi + 1e-9);
            }
        }
    }

    #[test]
    fn test_random_steps_are_seeded() {
        let a = ScenarioId::Random.steps(&mut ChaCha8Rng::seed_from_u64(11));
        let b = ScenarioId::Random.steps(&mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(a, b);
        assert_eq!(a.len(), 21);
        assert_eq!(a[10], Step::Resize(Viewport::new(1280, 720)));
    }

    #[test]
    fn test_sweep_ends_at_zero() {
        let steps = ScenarioId::Sweep.steps(&mut ChaCha8Rng::seed_from_u64(0));
        let last_pose = steps
            .iter()
            .rev()
            .find_map(|s| match s {
                Step::Pose(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap();
        assert!(last_pose.iter().all(|a| a.abs() < 1e-12));
    }

    #[test]
    fn test_wrist_flip_has_malformed_input() {
        let steps = ScenarioId::WristFlip.steps(&mut ChaCha8Rng::seed_from_u64(0));
        let malformed = steps.iter().filter(|s| matches!(s, Step::Malformed(_))).count();
        assert_eq!(malformed, 3);
    }
}
