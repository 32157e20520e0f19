pub mod chat;
pub mod flow;
