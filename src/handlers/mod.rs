pub mod chat;

pub use chat::{ChatHandleError, handle_chat};
