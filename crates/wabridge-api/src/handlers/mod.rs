pub mod chats;
pub mod download;
pub mod health;
pub mod messages;
pub mod send;
