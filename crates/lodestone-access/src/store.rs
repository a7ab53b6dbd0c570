//! Persistence hook for the access lists.
//!
//! Lodestone doesn't own a storage format. The lists are loaded and saved
//! through the [`AccessStore`] trait; where the bytes go is the
//! implementor's business. Two stores ship with the crate:
//!
//! - [`JsonFileStore`]: one JSON file per list in a directory, the layout
//!   server admins are used to editing by hand.
//! - [`MemoryStore`]: keeps everything in memory. For bootstrap code that
//!   loads lists from elsewhere, and for tests.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lodestone_protocol::{Codec, JsonCodec, PlayerIdentity, ProtocolError};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use crate::{ListKind, StoreError};

/// Loads and saves the four access lists.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because loads may run on a worker task while
/// the owner thread keeps ticking, and the returned futures are `Send` for
/// the same reason.
///
/// Implementations may use `async fn` directly:
///
/// ```rust
/// use lodestone_access::{AccessStore, StoreError};
/// use lodestone_protocol::PlayerIdentity;
///
/// /// A store with nothing in it that discards every write.
/// struct NullStore;
///
/// impl AccessStore for NullStore {
///     async fn load_bans(&self) -> Result<Vec<PlayerIdentity>, StoreError> { Ok(vec![]) }
///     async fn save_bans(&self, _: Vec<PlayerIdentity>) -> Result<(), StoreError> { Ok(()) }
///     async fn load_ip_bans(&self) -> Result<Vec<String>, StoreError> { Ok(vec![]) }
///     async fn save_ip_bans(&self, _: Vec<String>) -> Result<(), StoreError> { Ok(()) }
///     async fn load_whitelist(&self) -> Result<Vec<PlayerIdentity>, StoreError> { Ok(vec![]) }
///     async fn save_whitelist(&self, _: Vec<PlayerIdentity>) -> Result<(), StoreError> { Ok(()) }
///     async fn load_operators(&self) -> Result<Vec<PlayerIdentity>, StoreError> { Ok(vec![]) }
///     async fn save_operators(&self, _: Vec<PlayerIdentity>) -> Result<(), StoreError> { Ok(()) }
/// }
/// ```
pub trait AccessStore: Send + Sync + 'static {
    fn load_bans(
        &self,
    ) -> impl Future<Output = Result<Vec<PlayerIdentity>, StoreError>> + Send;

    fn save_bans(
        &self,
        entries: Vec<PlayerIdentity>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load_ip_bans(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    fn save_ip_bans(
        &self,
        entries: Vec<String>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load_whitelist(
        &self,
    ) -> impl Future<Output = Result<Vec<PlayerIdentity>, StoreError>> + Send;

    fn save_whitelist(
        &self,
        entries: Vec<PlayerIdentity>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load_operators(
        &self,
    ) -> impl Future<Output = Result<Vec<PlayerIdentity>, StoreError>> + Send;

    fn save_operators(
        &self,
        entries: Vec<PlayerIdentity>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Stores each list as a document in `dir` (see [`ListKind::file_name`]).
///
/// A missing file reads as an empty list, so a fresh server directory works
/// without any setup. Writes go to a `.tmp` sibling first and are renamed
/// into place, so a crash mid-write never leaves a truncated list behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore<C: Codec = JsonCodec> {
    dir: PathBuf,
    codec: C,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_codec(dir, JsonCodec)
    }
}

impl<C: Codec> JsonFileStore<C> {
    /// A store in `dir` that encodes with a custom codec.
    pub fn with_codec(dir: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            dir: dir.into(),
            codec,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, list: ListKind) -> PathBuf {
        self.dir.join(list.file_name())
    }

    async fn read_list<T: DeserializeOwned>(&self, list: ListKind) -> Result<Vec<T>, StoreError> {
        let path = self.path(list);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "list file missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(self.codec.decode(&bytes)?)
    }

    async fn write_list<T: Serialize + Sync>(
        &self,
        list: ListKind,
        entries: &[T],
    ) -> Result<(), StoreError> {
        let bytes = self.codec.encode(&entries)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path(list);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), count = entries.len(), "list saved");
        Ok(())
    }

    async fn read_identities(&self, list: ListKind) -> Result<Vec<PlayerIdentity>, StoreError> {
        let entries: Vec<PlayerIdentity> = self.read_list(list).await?;
        if let Some(blank) = entries.iter().find(|i| i.name().trim().is_empty()) {
            return Err(ProtocolError::InvalidEntry(format!(
                "blank player name in {list} (id {:?})",
                blank.id()
            ))
            .into());
        }
        Ok(entries)
    }

    async fn read_addresses(&self) -> Result<Vec<String>, StoreError> {
        let entries: Vec<String> = self.read_list(ListKind::IpBans).await?;
        Ok(entries.iter().map(|a| crate::normalize_address(a)).collect())
    }
}

impl<C: Codec> AccessStore for JsonFileStore<C> {
    async fn load_bans(&self) -> Result<Vec<PlayerIdentity>, StoreError> {
        self.read_identities(ListKind::Bans).await
    }

    async fn save_bans(&self, entries: Vec<PlayerIdentity>) -> Result<(), StoreError> {
        self.write_list(ListKind::Bans, &entries).await
    }

    async fn load_ip_bans(&self) -> Result<Vec<String>, StoreError> {
        self.read_addresses().await
    }

    async fn save_ip_bans(&self, entries: Vec<String>) -> Result<(), StoreError> {
        self.write_list(ListKind::IpBans, &entries).await
    }

    async fn load_whitelist(&self) -> Result<Vec<PlayerIdentity>, StoreError> {
        self.read_identities(ListKind::Whitelist).await
    }

    async fn save_whitelist(&self, entries: Vec<PlayerIdentity>) -> Result<(), StoreError> {
        self.write_list(ListKind::Whitelist, &entries).await
    }

    async fn load_operators(&self) -> Result<Vec<PlayerIdentity>, StoreError> {
        self.read_identities(ListKind::Operators).await
    }

    async fn save_operators(&self, entries: Vec<PlayerIdentity>) -> Result<(), StoreError> {
        self.write_list(ListKind::Operators, &entries).await
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct MemoryLists {
    bans: Vec<PlayerIdentity>,
    ip_bans: Vec<String>,
    whitelist: Vec<PlayerIdentity>,
    operators: Vec<PlayerIdentity>,
}

/// An in-memory [`AccessStore`].
///
/// `set_*` methods change what the next load returns, as if an admin
/// edited the files; `set_unavailable(true)` makes every load fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: Mutex<MemoryLists>,
    unavailable: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bans(&self, entries: Vec<PlayerIdentity>) {
        self.lists.lock().bans = entries;
    }

    pub fn set_ip_bans(&self, entries: Vec<String>) {
        self.lists.lock().ip_bans = entries;
    }

    pub fn set_whitelist(&self, entries: Vec<PlayerIdentity>) {
        self.lists.lock().whitelist = entries;
    }

    pub fn set_operators(&self, entries: Vec<PlayerIdentity>) {
        self.lists.lock().operators = entries;
    }

    /// Simulates an unreadable store: every load fails until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    pub fn bans(&self) -> Vec<PlayerIdentity> {
        self.lists.lock().bans.clone()
    }

    pub fn ip_bans(&self) -> Vec<String> {
        self.lists.lock().ip_bans.clone()
    }

    pub fn whitelist(&self) -> Vec<PlayerIdentity> {
        self.lists.lock().whitelist.clone()
    }

    pub fn operators(&self) -> Vec<PlayerIdentity> {
        self.lists.lock().operators.clone()
    }

    fn read<T>(&self, pick: impl FnOnce(&MemoryLists) -> Vec<T>) -> Result<Vec<T>, StoreError> {
        if *self.unavailable.lock() {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(pick(&self.lists.lock()))
    }
}

impl AccessStore for MemoryStore {
    async fn load_bans(&self) -> Result<Vec<PlayerIdentity>, StoreError> {
        self.read(|l| l.bans.clone())
    }

    async fn save_bans(&self, entries: Vec<PlayerIdentity>) -> Result<(), StoreError> {
        self.set_bans(entries);
        Ok(())
    }

    async fn load_ip_bans(&self) -> Result<Vec<String>, StoreError> {
        self.read(|l| l.ip_bans.clone())
    }

    async fn save_ip_bans(&self, entries: Vec<String>) -> Result<(), StoreError> {
        self.set_ip_bans(entries);
        Ok(())
    }

    async fn load_whitelist(&self) -> Result<Vec<PlayerIdentity>, StoreError> {
        self.read(|l| l.whitelist.clone())
    }

    async fn save_whitelist(&self, entries: Vec<PlayerIdentity>) -> Result<(), StoreError> {
        self.set_whitelist(entries);
        Ok(())
    }

    async fn load_operators(&self) -> Result<Vec<PlayerIdentity>, StoreError> {
        self.read(|l| l.operators.clone())
    }

    async fn save_operators(&self, entries: Vec<PlayerIdentity>) -> Result<(), StoreError> {
        self.set_operators(entries);
        Ok(())
    }
}
