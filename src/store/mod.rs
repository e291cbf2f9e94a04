//! Session state: TTL-scoped resume and job texts per user.

pub mod memory;
pub mod redis_backend;
pub mod traits;

pub use memory::{Clock, ManualClock, MemorySessionStore, SystemClock, spawn_expiry_task};
pub use redis_backend::RedisSessionStore;
pub use traits::{SessionKind, SessionStore};
