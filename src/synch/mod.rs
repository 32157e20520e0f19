pub mod session_locks;

pub use session_locks::SessionLocks;
