//! The backend abstraction `VaultStore` drives.
//!
//! A backend is one storage endpoint (the local database file or the
//! remote replica target).  Backends are `Send` so shutdown can hand
//! them to a time-boxed worker thread.

use crate::errors::Result;

use super::model::{CredentialEntry, MasterCredential, User};

pub trait StorageBackend: Send {
    /// Short label for log lines ("local" / "remote").
    fn name(&self) -> &str;

    /// Liveness probe used during backend resolution.
    fn ping(&self) -> Result<()>;

    // --- Master credential (single-record collection) ---

    fn load_master_credential(&self) -> Result<Option<MasterCredential>>;

    /// Clears any prior record before inserting: no history is kept.
    fn save_master_credential(&self, credential: &MasterCredential) -> Result<()>;

    // --- Users ---

    fn find_user(&self, email: &str) -> Result<Option<User>>;

    /// Insert or replace, keyed by email.  Identity uniqueness is
    /// enforced by the session before it writes.
    fn upsert_user(&self, user: &User) -> Result<()>;

    // --- Credential entries, keyed by (service, user_id) ---

    fn upsert_entry(&self, entry: &CredentialEntry) -> Result<()>;

    fn find_entry(&self, service: &str, owner: &str) -> Result<Option<CredentialEntry>>;

    fn list_entries(&self, owner: &str) -> Result<Vec<CredentialEntry>>;

    fn delete_entries_for_owner(&self, owner: &str) -> Result<()>;

    /// Release the connection.  Consumes the backend; called from the
    /// bounded-shutdown worker.
    fn close(self: Box<Self>) -> Result<()>;
}
