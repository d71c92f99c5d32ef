//! Persistence layer — durable user records plus a local completion cache.

pub mod flag_cache;
pub mod gateway;
pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use flag_cache::{FileFlagCache, MemoryFlagCache};
pub use gateway::PersistenceGateway;
pub use libsql_backend::LibSqlUserStore;
pub use model::{SignInResult, UserIdentity, UserRecord};
pub use traits::{Document, FlagCache, UserStore};
