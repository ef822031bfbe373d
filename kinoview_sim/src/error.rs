//! Error types for the scenario runner.

use kinoview_core::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// The engine could not be constructed
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Building the runtime or writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),

    /// The dispatcher went away before answering
    #[error("Dispatcher closed before replying")]
    DispatcherClosed,
}
