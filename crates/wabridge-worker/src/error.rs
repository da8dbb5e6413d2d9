use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Database error: {0}")]
    Db(#[from] wabridge_db::DbError),

    #[error("IPC error: {0}")]
    Ipc(#[from] wabridge_ipc::IpcError),

    #[error("Worker already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, WorkerError>;
