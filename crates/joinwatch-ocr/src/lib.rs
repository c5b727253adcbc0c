mod command;
mod engine;
mod error;
mod pool;
mod preprocess;

pub use command::CommandEngine;
pub use engine::{OcrEngine, OcrOutcome, recognize_with_timeout};
pub use error::{AdapterError, PoolError};
pub use pool::{EngineLease, EnginePool};
pub use preprocess::{AdaptiveSelector, Preprocessor, StrategyStats};
