use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Outbound side of the messaging network, as seen by the HTTP bridge.
///
/// Every argument has already been validated by the caller; implementations
/// only forward.
pub trait NetworkClient: Send + Sync + 'static {
    fn send_message(&self, recipient: &str, message: &str) -> impl Future<Output = Result<()>> + Send;

    fn send_file(&self, recipient: &str, file_path: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Returns where the downloaded file was written.
    fn download_media(
        &self,
        message_id: &str,
        chat_jid: &str,
    ) -> impl Future<Output = Result<PathBuf>> + Send;

    fn is_connected(&self) -> bool;
}
