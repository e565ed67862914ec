pub mod config;
pub mod entity;
pub mod error;
pub mod metrics;

pub use config::{load_dotenv, Config, ExecutionConfig, RevertConfig, TickConfig};
pub use entity::*;
pub use error::*;
pub use metrics::*;
