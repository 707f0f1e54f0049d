pub mod config;
pub mod error;
pub mod safety;
pub mod text;
pub mod types;

pub use config::{Config, PipelineConfig};
pub use error::TrendwireError;
pub use safety::*;
pub use types::*;
