pub mod format;
pub mod prompts;
pub mod turn;

pub use turn::{TurnEvent, TurnPrompt, run_turn};
