mod job;
mod orchestrator;
mod state;

pub use job::GenerationJob;
pub use orchestrator::{GenerationHandle, GenerationOrchestrator};
pub use state::{GenerationOutcome, GenerationState, Phase};
