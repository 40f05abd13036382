pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::{Clock, MonotonicTime, TimeSource};
pub use config::{AppConfig, WindowConfig};
pub use error::{ConstructionError, EngineError};
