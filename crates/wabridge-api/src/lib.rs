//! HTTP surface of the bridge: request decoding, validation, and the
//! uniform JSON envelope around store reads and network commands.

mod error;
mod extract;
pub mod handlers;
mod response;
mod router;
mod state;

pub use error::ApiError;
pub use extract::StrictJson;
pub use response::ApiResponse;
pub use router::build_router;
pub use state::AppState;
