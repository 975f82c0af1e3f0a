use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::data_structs::user::PublicProfile;
use crate::encrypted_signing::SESSION_TTL_SECONDS;

pub const USER_EMAIL_KEY: &str = "userEmail";
pub const USER_CREDITS_KEY: &str = "userCredits";
pub const SESSION_EXPIRES_KEY: &str = "sessionExpiresAt";

/// Balance shown when the session has no stored credits.
pub const DEFAULT_CREDITS: u64 = 150;
pub const LANDING_PAGE: &str = "/";

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("local store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("local store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Insufficient credits! Please add more credits to your account.")]
    InsufficientCredits { price: u64, available: u64 },
    #[error(transparent)]
    Store(#[from] LocalStoreError),
}

/// Client-local key/value persistence.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;
    fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<AHashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, AHashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileLocalStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLocalStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileLocalStore {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<AHashMap<String, String>, LocalStoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(AHashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AHashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    // written beside the target and renamed over it, so a crash never leaves a torn file
    fn write(&self, entries: &AHashMap<String, String>) -> Result<(), LocalStoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut staged, entries)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn modify(&self, change: impl FnOnce(&mut AHashMap<String, String>)) -> Result<(), LocalStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.read()?;
        change(&mut entries);
        self.write(&entries)
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

/// Where the page should go instead of rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    To(String),
}

#[derive(Debug)]
pub enum SessionLoad<S: LocalStore> {
    Active(SessionContext<S>),
    Redirect(Navigation),
}

/// The signed-in user as the client sees it: identity and credit balance,
/// cached in a [`LocalStore`].
///
/// Purchases only change the local balance. The server-side `credits`
/// column is never updated from here.
#[derive(Debug)]
pub struct SessionContext<S: LocalStore> {
    store: S,
    email: String,
    credits: u64,
}

impl<S: LocalStore> SessionContext<S> {

    /// Caches a freshly logged-in profile.
    pub fn establish(store: S, profile: &PublicProfile, now: DateTime<Utc>) -> Result<Self, LocalStoreError> {
        let credits = u64::try_from(profile.credits).unwrap_or(0);
        let expires_at = now + Duration::seconds(SESSION_TTL_SECONDS);
        store.set(USER_EMAIL_KEY, &profile.email)?;
        store.set(USER_CREDITS_KEY, &credits.to_string())?;
        store.set(SESSION_EXPIRES_KEY, &expires_at.to_rfc3339())?;
        Ok(SessionContext { store, email: profile.email.clone(), credits })
    }

    /// Hydrates the session from the store without asking the server. No
    /// email, or an expired session, sends the caller to the landing page.
    pub fn load(store: S, now: DateTime<Utc>) -> Result<SessionLoad<S>, LocalStoreError> {
        let email = match store.get(USER_EMAIL_KEY)? {
            Some(email) if !email.is_empty() => email,
            _ => return Ok(SessionLoad::Redirect(Navigation::To(LANDING_PAGE.to_string()))),
        };

        if let Some(expires_at) = store.get(SESSION_EXPIRES_KEY)? {
            let expired = match DateTime::parse_from_rfc3339(&expires_at) {
                Ok(expires_at) => expires_at <= now,
                Err(_) => true,
            };
            if expired {
                log::info!("local session for {email} expired");
                clear_markers(&store)?;
                return Ok(SessionLoad::Redirect(Navigation::To(LANDING_PAGE.to_string())));
            }
        }

        let credits = store.get(USER_CREDITS_KEY)?
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_CREDITS);

        Ok(SessionLoad::Active(SessionContext { store, email, credits }))
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn credits(&self) -> u64 {
        self.credits
    }

    /// Deducts `price` and persists the new balance locally.
    pub fn spend(&mut self, price: u64) -> Result<u64, PurchaseError> {
        let remaining = deduct(self.credits, price)?;
        self.store.set(USER_CREDITS_KEY, &remaining.to_string())?;
        self.credits = remaining;
        Ok(remaining)
    }

    /// Logout: forgets every cached marker.
    pub fn invalidate(self) -> Result<S, LocalStoreError> {
        clear_markers(&self.store)?;
        Ok(self.store)
    }
}

/// The balance after paying `price`, or a rejection that leaves it alone.
pub fn deduct(credits: u64, price: u64) -> Result<u64, PurchaseError> {
    credits.checked_sub(price)
        .ok_or(PurchaseError::InsufficientCredits { price, available: credits })
}

fn clear_markers<S: LocalStore>(store: &S) -> Result<(), LocalStoreError> {
    for key in [USER_EMAIL_KEY, USER_CREDITS_KEY, SESSION_EXPIRES_KEY] {
        store.remove(key)?;
    }
    Ok(())
}

impl<S: LocalStore + ?Sized> LocalStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        (**self).remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(credits: i64) -> PublicProfile {
        PublicProfile {
            id: "u-alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            credits,
        }
    }

    fn active<S: LocalStore>(load: SessionLoad<S>) -> SessionContext<S> {
        match load {
            SessionLoad::Active(session) => session,
            SessionLoad::Redirect(to) => panic!("unexpected redirect to {to:?}"),
        }
    }

    #[test]
    fn no_email_redirects_home() {
        let store = MemoryLocalStore::new();
        store.set(USER_CREDITS_KEY, "40").unwrap();
        match SessionContext::load(&store, Utc::now()).unwrap() {
            SessionLoad::Redirect(to) => assert_eq!(to, Navigation::To("/".to_string())),
            SessionLoad::Active(_) => panic!("expected a redirect"),
        }
    }

    #[test]
    fn hydrates_cached_values() {
        let store = MemoryLocalStore::new();
        store.set(USER_EMAIL_KEY, "alice@example.com").unwrap();
        store.set(USER_CREDITS_KEY, "42").unwrap();
        let session = active(SessionContext::load(&store, Utc::now()).unwrap());
        assert_eq!(session.email(), "alice@example.com");
        assert_eq!(session.credits(), 42);
    }

    #[test]
    fn missing_or_garbled_credits_use_the_default() {
        let store = MemoryLocalStore::new();
        store.set(USER_EMAIL_KEY, "alice@example.com").unwrap();
        assert_eq!(active(SessionContext::load(&store, Utc::now()).unwrap()).credits(), DEFAULT_CREDITS);
        store.set(USER_CREDITS_KEY, "lots").unwrap();
        assert_eq!(active(SessionContext::load(&store, Utc::now()).unwrap()).credits(), DEFAULT_CREDITS);
    }

    #[test]
    fn established_session_expires_after_seven_days() {
        let store = MemoryLocalStore::new();
        let now = Utc::now();
        SessionContext::establish(&store, &profile(80), now).unwrap();

        let session = active(SessionContext::load(&store, now + Duration::days(6)).unwrap());
        assert_eq!(session.credits(), 80);

        let later = now + Duration::days(7);
        assert!(matches!(SessionContext::load(&store, later).unwrap(), SessionLoad::Redirect(_)));
        assert_eq!(store.get(USER_EMAIL_KEY).unwrap(), None);
    }

    #[test]
    fn spend_persists_or_rejects() {
        let store = MemoryLocalStore::new();
        let mut session = SessionContext::establish(&store, &profile(30), Utc::now()).unwrap();

        let err = session.spend(50).unwrap_err();
        assert!(matches!(err, PurchaseError::InsufficientCredits { price: 50, available: 30 }));
        assert_eq!(session.credits(), 30);
        assert_eq!(store.get(USER_CREDITS_KEY).unwrap().as_deref(), Some("30"));

        assert_eq!(session.spend(30).unwrap(), 0);
        assert_eq!(store.get(USER_CREDITS_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn invalidate_clears_markers() {
        let store = MemoryLocalStore::new();
        let session = SessionContext::establish(&store, &profile(10), Utc::now()).unwrap();
        session.invalidate().unwrap();
        for key in [USER_EMAIL_KEY, USER_CREDITS_KEY, SESSION_EXPIRES_KEY] {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }

    #[test]
    fn file_store_replaces_the_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, b"{\"userEmail\": \"old@exa").unwrap();

        let store = FileLocalStore::new(&path);
        assert!(matches!(store.get(USER_EMAIL_KEY), Err(LocalStoreError::Corrupt(_))));
        std::fs::remove_file(&path).unwrap();

        store.set(USER_EMAIL_KEY, "alice@example.com").unwrap();
        store.set(USER_CREDITS_KEY, "90").unwrap();
        store.remove(USER_CREDITS_KEY).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("local-storage.json")]);

        let on_disk: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::json!({ "userEmail": "alice@example.com" }));
    }

    #[test]
    fn deduct_never_goes_negative() {
        assert_eq!(deduct(100, 40).unwrap(), 60);
        assert_eq!(deduct(40, 40).unwrap(), 0);
        assert!(deduct(39, 40).is_err());
    }
}
