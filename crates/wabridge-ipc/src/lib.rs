mod client;
mod error;
mod manager;
mod process;

pub use client::NetworkClient;
pub use error::IpcError;
pub use manager::{CommandOutcome, NetworkConfig, NetworkManager};
