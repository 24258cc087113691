pub mod effort;
pub mod orchestrator;
pub mod side;
pub mod store;

pub use effort::best_effort;
pub use orchestrator::{OrchestratorTimeouts, ScoreOrchestrator};
pub use side::{Points, Side};
pub use store::ScoreStore;
