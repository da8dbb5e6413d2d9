mod error;
mod events;
mod worker;

pub use error::WorkerError;
pub use events::WorkerEvent;
pub use worker::{BridgeWorker, ingest, spawn_ingestion};
