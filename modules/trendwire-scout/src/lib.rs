pub mod campaign;
pub mod dedup;
pub mod enrichment;
pub mod gateway;
pub mod lifecycle;
pub mod pipeline;
pub mod run_log;
pub mod safety;
pub mod scoring;
pub mod sources;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use gateway::build_gateway;
pub use pipeline::{Pipeline, RunStats};
pub use run_log::RunLog;
pub use store::{JsonFileStore, MemoryStore};
