mod events;
pub mod jid;
mod protocol;
pub mod validation;

pub use events::*;
pub use jid::{JidKind, format_jid_for_display};
pub use protocol::*;
pub use validation::ValidationError;
