// Workflow orchestration modules

pub mod state_machine;

pub use state_machine::{
    decide, ArtifactFailure, OrchestratorSettings, ReleaseOrchestrator, RunError, RunOutcome, RunReport, RunState,
};
