//! Dual-tier persistence.
//!
//! `VaultStore` owns a primary backend and an optional best-effort
//! replica.  Backend resolution at startup:
//!
//! 1. Open the local database.  If it answers a liveness probe it
//!    becomes the primary.
//! 2. If a remote target is configured, also attach it as a replica;
//!    failure to attach is non-fatal (local-only operation continues).
//! 3. If the local database cannot be opened, try the remote target as
//!    the primary instead.  If that also fails, startup fails with
//!    `StorageUnavailable`.
//!
//! Writes go to the primary and are mirrored to the replica; a replica
//! write failure is logged and swallowed.  Reads prefer the replica and
//! mirror every record back into the primary, so the primary self-heals
//! toward replica state over time.

pub mod backend;
pub mod model;
pub mod sqlite;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::settings::Settings;
use crate::errors::{PassVaultError, Result};

pub use backend::StorageBackend;
pub use model::{CredentialEntry, EntryMetadata, MasterCredential, PlainEntry, User};
pub use sqlite::SqliteBackend;

/// Bounded wait for backend release at shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle owning the resolved backend connections for the process
/// lifetime.  Not persisted; released by [`VaultStore::close`].
pub struct VaultStore {
    primary: Option<Box<dyn StorageBackend>>,
    replica: Option<Box<dyn StorageBackend>>,
    primary_is_remote: bool,
}

impl VaultStore {
    /// Resolve backends per the startup protocol above.
    pub fn connect(settings: &Settings, project_dir: &std::path::Path) -> Result<Self> {
        let local_path = settings.local_db_path(project_dir);
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let local_target = local_path.to_string_lossy().into_owned();

        match SqliteBackend::open(&local_target, "local") {
            Ok(local) => {
                info!(target = %local_target, "connected to local backend");

                let replica = match settings.remote_target() {
                    Some(remote) => match SqliteBackend::open(remote, "remote") {
                        Ok(backend) => {
                            info!(target = %remote, "attached remote replica");
                            Some(Box::new(backend) as Box<dyn StorageBackend>)
                        }
                        Err(e) => {
                            warn!(target = %remote, error = %e,
                                "could not attach remote replica; continuing local-only");
                            None
                        }
                    },
                    None => None,
                };

                Ok(Self::from_backends(Box::new(local), replica))
            }
            Err(local_err) => {
                warn!(target = %local_target, error = %local_err,
                    "local backend unreachable; trying remote");

                let Some(remote) = settings.remote_target() else {
                    return Err(PassVaultError::StorageUnavailable(format!(
                        "local backend failed ({local_err}) and no remote target is configured"
                    )));
                };

                let backend = SqliteBackend::open(remote, "remote").map_err(|remote_err| {
                    PassVaultError::StorageUnavailable(format!(
                        "local backend failed ({local_err}); remote backend failed ({remote_err})"
                    ))
                })?;
                info!(target = %remote, "connected to remote backend as primary");

                let mut store = Self::from_backends(Box::new(backend), None);
                store.primary_is_remote = true;
                Ok(store)
            }
        }
    }

    /// Build a store from already-opened backends (tests, embedding).
    pub fn from_backends(
        primary: Box<dyn StorageBackend>,
        replica: Option<Box<dyn StorageBackend>>,
    ) -> Self {
        Self {
            primary: Some(primary),
            replica,
            primary_is_remote: false,
        }
    }

    /// True when the remote tier had to take over as primary.
    pub fn primary_is_remote(&self) -> bool {
        self.primary_is_remote
    }

    pub fn has_replica(&self) -> bool {
        self.replica.is_some()
    }

    fn primary(&self) -> Result<&dyn StorageBackend> {
        self.primary
            .as_deref()
            .ok_or(PassVaultError::ConnectionClosed)
    }

    // ------------------------------------------------------------------
    // Writes: primary first, replica best-effort
    // ------------------------------------------------------------------

    pub fn upsert_entry(&self, entry: &CredentialEntry) -> Result<()> {
        self.primary()?.upsert_entry(entry)?;
        if let Some(replica) = &self.replica {
            if let Err(e) = replica.upsert_entry(entry) {
                warn!(backend = replica.name(), error = %e,
                    "replica write failed; entry persisted on primary only");
            }
        }
        Ok(())
    }

    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.primary()?.upsert_user(user)?;
        if let Some(replica) = &self.replica {
            if let Err(e) = replica.upsert_user(user) {
                warn!(backend = replica.name(), error = %e,
                    "replica write failed; user persisted on primary only");
            }
        }
        Ok(())
    }

    /// Single-record semantics: saving clears any prior master
    /// credential before inserting.
    pub fn save_master_credential(&self, credential: &MasterCredential) -> Result<()> {
        self.primary()?.save_master_credential(credential)?;
        if let Some(replica) = &self.replica {
            if let Err(e) = replica.save_master_credential(credential) {
                warn!(backend = replica.name(), error = %e,
                    "replica write failed; master credential persisted on primary only");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads: replica first, mirrored back into the primary
    // ------------------------------------------------------------------

    pub fn load_master_credential(&self) -> Result<Option<MasterCredential>> {
        if let Some(replica) = &self.replica {
            match replica.load_master_credential() {
                Ok(found) => {
                    if let Some(credential) = &found {
                        self.primary()?.save_master_credential(credential)?;
                    }
                    return Ok(found);
                }
                Err(e) => {
                    warn!(backend = replica.name(), error = %e,
                        "replica read failed; falling back to primary");
                }
            }
        }
        self.primary()?.load_master_credential()
    }

    pub fn find_entry(&self, service: &str, owner: &str) -> Result<Option<CredentialEntry>> {
        if let Some(replica) = &self.replica {
            match replica.find_entry(service, owner) {
                Ok(found) => {
                    if let Some(entry) = &found {
                        // Self-heal: the primary converges toward the
                        // replica.  A primary failure here propagates.
                        self.primary()?.upsert_entry(entry)?;
                    }
                    return Ok(found);
                }
                Err(e) => {
                    warn!(backend = replica.name(), error = %e,
                        "replica read failed; falling back to primary");
                }
            }
        }
        self.primary()?.find_entry(service, owner)
    }

    pub fn list_entries(&self, owner: &str) -> Result<Vec<CredentialEntry>> {
        if let Some(replica) = &self.replica {
            match replica.list_entries(owner) {
                Ok(entries) => {
                    for entry in &entries {
                        self.primary()?.upsert_entry(entry)?;
                    }
                    return Ok(entries);
                }
                Err(e) => {
                    warn!(backend = replica.name(), error = %e,
                        "replica read failed; falling back to primary");
                }
            }
        }
        self.primary()?.list_entries(owner)
    }

    pub fn find_user(&self, email: &str) -> Result<Option<User>> {
        if let Some(replica) = &self.replica {
            match replica.find_user(email) {
                Ok(found) => {
                    if let Some(user) = &found {
                        self.primary()?.upsert_user(user)?;
                    }
                    return Ok(found);
                }
                Err(e) => {
                    warn!(backend = replica.name(), error = %e,
                        "replica read failed; falling back to primary");
                }
            }
        }
        self.primary()?.find_user(email)
    }

    // ------------------------------------------------------------------
    // Bulk replace
    // ------------------------------------------------------------------

    /// Delete all primary records for `owner`, then re-insert the given
    /// list one by one through the mirrored write path.  Not atomic: a
    /// crash mid-replace can leave a partial record set.
    pub fn replace_all_for_owner(&self, owner: &str, entries: &[CredentialEntry]) -> Result<()> {
        self.primary()?.delete_entries_for_owner(owner)?;
        for entry in entries {
            self.upsert_entry(entry)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Release both connections on a worker thread, waiting at most
    /// five seconds.  On timeout the wait is abandoned so teardown
    /// never hangs; this must not be upgraded to an unbounded wait.
    /// Idempotent: a second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let primary = self.primary.take();
        let replica = self.replica.take();
        if primary.is_none() && replica.is_none() {
            debug!("store already closed");
            return Ok(());
        }

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for backend in [primary, replica].into_iter().flatten() {
                let name = backend.name().to_string();
                if let Err(e) = backend.close() {
                    warn!(backend = %name, error = %e, "error releasing backend");
                }
            }
            // The receiver may already have given up; ignore send errors.
            let _ = tx.send(());
        });

        match rx.recv_timeout(CLOSE_TIMEOUT) {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(
                    timeout_secs = CLOSE_TIMEOUT.as_secs(),
                    "backend release timed out; abandoning wait"
                );
                Ok(())
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.primary.is_none() && self.replica.is_none()
    }
}

impl Drop for VaultStore {
    /// Deterministic release if the owner forgot to call `close`.
    fn drop(&mut self) {
        let _ = self.close();
    }
}
