// src/persist/bridge.rs
// =============================================================================
// The persistence bridge: save / load the note for the signed-in user.
//
// What it takes care of:
// - Refusing to do anything when nobody is signed in (no network call at all)
// - Deciding between "create" and "update" on save
// - Turning every failure into a short message for the user
// - Tracking saving / loading so the UI can show a spinner
// - Loading the note automatically the first time a user signs in
//
// Messages ("banners") expire on their own: 3 seconds for success,
// 5 seconds for errors.
// =============================================================================

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use super::store::{Credential, DocumentStore, Session, StoreError};

const SUCCESS_BANNER: Duration = Duration::from_secs(3);
const ERROR_BANNER: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("a save or load is already in progress")]
    Busy,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// A short message for the user that disappears after a while
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
    expires_at: Instant,
}

impl Banner {
    fn new(kind: BannerKind, text: impl Into<String>) -> Self {
        let ttl = match kind {
            BannerKind::Success => SUCCESS_BANNER,
            BannerKind::Error => ERROR_BANNER,
        };
        Self {
            kind,
            text: text.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// What the UI needs to draw buttons and spinners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeState {
    pub saving: bool,
    pub loading: bool,
    /// The automatic load for this sign-in already happened
    pub has_loaded: bool,
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Save,
    Load,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::Save => "save",
            Operation::Load => "load",
        }
    }
}

// Resets the saving/loading flag when the operation ends
struct Running<'a> {
    state: &'a Mutex<BridgeState>,
    operation: Operation,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        match self.operation {
            Operation::Save => state.saving = false,
            Operation::Load => state.loading = false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct PersistenceBridge {
    store: Arc<dyn DocumentStore>,
    session: Mutex<Session>,
    state: Mutex<BridgeState>,
    banner: Mutex<Option<Banner>>,
}

impl PersistenceBridge {
    pub fn new(store: Arc<dyn DocumentStore>, session: Session) -> Self {
        Self {
            store,
            session: Mutex::new(session),
            state: Mutex::new(BridgeState::default()),
            banner: Mutex::new(None),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.session).is_authenticated()
    }

    pub fn state(&self) -> BridgeState {
        *lock(&self.state)
    }

    /// The current message, if it hasn't expired yet
    pub fn banner(&self) -> Option<Banner> {
        let mut banner = lock(&self.banner);
        if banner.as_ref().is_some_and(Banner::is_expired) {
            *banner = None;
        }
        banner.clone()
    }

    pub fn clear_banner(&self) {
        *lock(&self.banner) = None;
    }

    // Records a sign-in change
    //
    // Returns: true when the caller should load the note now (first
    //          authenticated session since the last sign-out)
    pub fn set_session(&self, session: Session) -> bool {
        let authenticated = session.is_authenticated();
        *lock(&self.session) = session;

        let mut state = lock(&self.state);
        if !authenticated {
            state.has_loaded = false;
            drop(state);
            self.clear_banner();
            return false;
        }

        let first = !state.has_loaded;
        state.has_loaded = true;
        first
    }

    // Saves the note, creating the remote document on first use
    pub async fn save(&self, content: &str) -> Result<(), PersistError> {
        let credential = self.require_credential(Operation::Save)?;
        let _running = self.start(Operation::Save)?;

        let result = match self.store.find(&credential).await {
            Ok(Some(id)) => self.store.update(&credential, &id, content).await,
            Ok(None) => self.store.create(&credential, content).await.map(|id| {
                info!(document = %id, "created note document");
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(bytes = content.len(), "note saved");
                self.flash(BannerKind::Success, "Note saved successfully!");
                Ok(())
            }
            Err(e) => Err(self.fail(Operation::Save, e)),
        }
    }

    // Loads the note
    //
    // Returns: Ok(None) when nothing was ever saved (not an error)
    pub async fn load(&self) -> Result<Option<String>, PersistError> {
        let credential = self.require_credential(Operation::Load)?;
        let _running = self.start(Operation::Load)?;

        let result = match self.store.find(&credential).await {
            Ok(Some(id)) => self.store.read(&credential, &id).await.map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(content)) => {
                info!(bytes = content.len(), "note loaded");
                self.flash(BannerKind::Success, "Note loaded successfully!");
                Ok(Some(content))
            }
            Ok(None) => {
                self.flash(BannerKind::Success, "No saved note found. Save your note first.");
                Ok(None)
            }
            Err(e) => Err(self.fail(Operation::Load, e)),
        }
    }

    fn require_credential(&self, operation: Operation) -> Result<Credential, PersistError> {
        let credential = lock(&self.session).credential().cloned();
        credential.ok_or_else(|| {
            self.flash(
                BannerKind::Error,
                format!("Please sign in to {} your note", operation.verb()),
            );
            PersistError::Unauthenticated
        })
    }

    fn start(&self, operation: Operation) -> Result<Running<'_>, PersistError> {
        let mut state = lock(&self.state);
        if state.saving || state.loading {
            return Err(PersistError::Busy);
        }
        match operation {
            Operation::Save => state.saving = true,
            Operation::Load => state.loading = true,
        }
        drop(state);

        self.clear_banner();
        Ok(Running {
            state: &self.state,
            operation,
        })
    }

    fn fail(&self, operation: Operation, error: StoreError) -> PersistError {
        warn!(operation = operation.verb(), error = %error, "persistence failed");
        self.flash(
            BannerKind::Error,
            format!("Failed to {} note: {}", operation.verb(), error),
        );
        PersistError::Store(error)
    }

    fn flash(&self, kind: BannerKind, text: impl Into<String>) {
        *lock(&self.banner) = Some(Banner::new(kind, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::DocumentId;
    use futures::future::BoxFuture;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // One document per token, kept in memory
    #[derive(Default)]
    struct MemoryStore {
        docs: Mutex<HashMap<String, (DocumentId, String)>>,
        calls: AtomicUsize,
        creates: AtomicUsize,
        fail_with: Option<u16>,
        delay: Duration,
    }

    impl MemoryStore {
        async fn touch(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match self.fail_with {
                Some(status) => Err(StoreError::Status {
                    status,
                    body: String::new(),
                }),
                None => Ok(()),
            }
        }
    }

    impl DocumentStore for MemoryStore {
        fn find<'a>(&'a self, credential: &'a Credential)
            -> BoxFuture<'a, Result<Option<DocumentId>, StoreError>> {
            Box::pin(async move {
                self.touch().await?;
                let docs = self.docs.lock().unwrap();
                Ok(docs.get(credential.secret()).map(|(id, _)| id.clone()))
            })
        }

        fn read<'a>(
            &'a self,
            credential: &'a Credential,
            _id: &'a DocumentId,
        ) -> BoxFuture<'a, Result<String, StoreError>> {
            Box::pin(async move {
                self.touch().await?;
                let docs = self.docs.lock().unwrap();
                Ok(docs
                    .get(credential.secret())
                    .map(|(_, text)| text.clone())
                    .unwrap_or_default())
            })
        }

        fn create<'a>(
            &'a self,
            credential: &'a Credential,
            content: &'a str,
        ) -> BoxFuture<'a, Result<DocumentId, StoreError>> {
            Box::pin(async move {
                self.touch().await?;
                self.creates.fetch_add(1, Ordering::SeqCst);
                let id = DocumentId(format!("doc-{}", credential.secret()));
                self.docs
                    .lock()
                    .unwrap()
                    .insert(credential.secret().to_string(), (id.clone(), content.to_string()));
                Ok(id)
            })
        }

        fn update<'a>(
            &'a self,
            credential: &'a Credential,
            id: &'a DocumentId,
            content: &'a str,
        ) -> BoxFuture<'a, Result<(), StoreError>> {
            Box::pin(async move {
                self.touch().await?;
                self.docs
                    .lock()
                    .unwrap()
                    .insert(credential.secret().to_string(), (id.clone(), content.to_string()));
                Ok(())
            })
        }
    }

    fn signed_in() -> Session {
        Session::signed_in(Credential::new("alice"))
    }

    fn bridge(store: MemoryStore, session: Session) -> (PersistenceBridge, Arc<MemoryStore>) {
        let store = Arc::new(store);
        (PersistenceBridge::new(store.clone(), session), store)
    }

    #[tokio::test]
    async fn test_save_requires_sign_in() {
        let (bridge, store) = bridge(MemoryStore::default(), Session::signed_out());

        let result = bridge.save("note").await;

        assert!(matches!(result, Err(PersistError::Unauthenticated)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        let banner = bridge.banner().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.text, "Please sign in to save your note");
        assert_eq!(bridge.state(), BridgeState::default());
    }

    #[tokio::test]
    async fn test_load_without_document_is_none() {
        let (bridge, _) = bridge(MemoryStore::default(), signed_in());

        assert_eq!(bridge.load().await.unwrap(), None);
        assert_eq!(
            bridge.banner().unwrap().text,
            "No saved note found. Save your note first."
        );
    }

    #[tokio::test]
    async fn test_save_creates_then_updates() {
        let (bridge, store) = bridge(MemoryStore::default(), signed_in());

        bridge.save("first https://a.dev").await.unwrap();
        bridge.save("second https://b.dev").await.unwrap();

        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.load().await.unwrap().as_deref(), Some("second https://b.dev"));
        assert_eq!(bridge.banner().unwrap().kind, BannerKind::Success);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_message() {
        let (bridge, _) = bridge(
            MemoryStore {
                fail_with: Some(502),
                ..Default::default()
            },
            signed_in(),
        );

        let err = bridge.save("note").await.unwrap_err();

        assert!(matches!(err, PersistError::Store(StoreError::Status { status: 502, .. })));
        let banner = bridge.banner().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert!(banner.text.starts_with("Failed to save note"));
        assert!(!bridge.state().saving);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_operation_at_a_time() {
        let (bridge, _) = bridge(
            MemoryStore {
                delay: Duration::from_millis(200),
                ..Default::default()
            },
            signed_in(),
        );

        let (saved, loaded) = tokio::join!(bridge.save("note"), bridge.load());

        assert!(saved.is_ok());
        assert!(matches!(loaded, Err(PersistError::Busy)));
        assert_eq!(bridge.state(), BridgeState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_banners_expire() {
        let (bridge, _) = bridge(MemoryStore::default(), signed_in());
        bridge.save("note").await.unwrap();

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(bridge.banner().is_some());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(bridge.banner().is_none());

        let _ = bridge.set_session(Session::signed_out());
        let _ = bridge.save("note").await;
        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(bridge.banner().is_some());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(bridge.banner().is_none());
    }

    #[tokio::test]
    async fn test_auto_load_once_per_sign_in() {
        let (bridge, _) = bridge(MemoryStore::default(), Session::signed_out());

        assert!(!bridge.set_session(Session::signed_out()));
        assert!(bridge.set_session(signed_in()));
        assert!(!bridge.set_session(signed_in()));
        assert!(bridge.state().has_loaded);

        assert!(!bridge.set_session(Session::signed_out()));
        assert!(!bridge.state().has_loaded);
        assert!(bridge.set_session(signed_in()));
    }
}
