//! TaskMaster Core Library
//!
//! Local persistence, remote document sync and session handling for the
//! TaskMaster widget.

pub mod engine;
pub mod identity;
pub mod local_store;
pub mod models;
pub mod remote;
pub mod status;
pub mod transfer;

pub use engine::{AppState, Change, NoteDraft, SyncEngine, SyncPhase, AUTOSAVE_DELAY};
pub use identity::{
    AuthError, AuthErrorCategory, HttpIdentityProvider, IdentityProvider, MemoryIdentityProvider,
    SessionManager,
};
pub use local_store::{LocalStore, StorageError};
pub use models::{
    Category, EntityId, Note, Priority, Reminder, RepeatInterval, Session, Settings, Stats, Task,
    TaskFilter, Theme,
};
pub use remote::{
    check_server, CollectionKind, Document, HttpRemoteStore, MemoryRemoteStore, RemoteError,
    RemoteStore, RemoteTarget,
};
pub use status::{Status, StatusKind, StatusReporter};
pub use transfer::{ExportDocument, ImportDocument, TransferError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
