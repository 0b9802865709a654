// src/persist/store.rs
// =============================================================================
// The pieces every document store shares:
// - Credential / Session: who is signed in (if anyone)
// - DocumentStore: find / read / create / update one note per owner
// - StoreError: what can go wrong talking to the store
// =============================================================================

use futures::future::BoxFuture;
use std::fmt;
use thiserror::Error;

/// An opaque bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The current sign-in state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<Credential>,
}

impl Session {
    pub fn signed_in(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

impl From<Option<Credential>> for Session {
    fn from(credential: Option<Credential>) -> Self {
        Self { credential }
    }
}

/// Identifier the store gave our note
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store answered HTTP {status}")]
    Status { status: u16, body: String },

    #[error("could not reach the document store")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from the document store: {0}")]
    Malformed(String),
}

/// A remote store holding exactly one note document per owner.
///
/// The owner is whoever the credential belongs to.
pub trait DocumentStore: Send + Sync {
    /// Looks up the owner's note; `None` if it was never saved
    fn find<'a>(&'a self, credential: &'a Credential)
        -> BoxFuture<'a, Result<Option<DocumentId>, StoreError>>;

    fn read<'a>(
        &'a self,
        credential: &'a Credential,
        id: &'a DocumentId,
    ) -> BoxFuture<'a, Result<String, StoreError>>;

    fn create<'a>(
        &'a self,
        credential: &'a Credential,
        content: &'a str,
    ) -> BoxFuture<'a, Result<DocumentId, StoreError>>;

    fn update<'a>(
        &'a self,
        credential: &'a Credential,
        id: &'a DocumentId,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_is_redacted() {
        let credential = Credential::new("ghp_secret");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(
            format!("{:?}", Session::signed_in(credential)),
            "Session { credential: Some(Credential(***)) }"
        );
    }

    #[test]
    fn test_session_authentication() {
        assert!(!Session::signed_out().is_authenticated());
        assert!(Session::from(Some(Credential::new("t"))).is_authenticated());
    }
}
