/// What the worker reports to whoever is running it.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    ClientReady,
    Connected { phone_number: Option<String> },
    Disconnected { reason: String },
    MessageStored { chat_jid: String, message_id: String, timestamp: i64 },
    MessageSkipped { chat_jid: String, message_id: String },
    Error { error: String },
}
