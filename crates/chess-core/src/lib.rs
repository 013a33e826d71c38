pub mod autoplay;
pub mod engine;
pub mod error;
pub mod game_data;
pub mod pgn;
pub mod replay;

pub use autoplay::{ManualTimer, Timer, TimerHandle, TimerId, TokioTimer};
pub use engine::{MoveCandidate, RulesEngine, ShakmatyEngine};
pub use error::{EngineError, ReplayError};
pub use game_data::{DrawReason, GameStatus, Orientation, Side};
pub use replay::{AnalysisRequest, Navigation, ReplayController, ReplaySnapshot, Tick};
