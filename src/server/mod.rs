//! Server-side modules for the TaskMaster sync server.

pub mod accounts;
pub mod hub;
pub mod routes;
pub mod storage;
pub mod tokens;

pub use accounts::{Account, AccountStore, AccountStoreError};
pub use hub::{HubEvent, SyncHub};
pub use routes::{router, AuthUser, ServerError, ServerState};
pub use storage::{DocFile, ServerStorage, ServerStorageError};
pub use tokens::{TokenData, TokenStore};
