// src/persist/mod.rs
// =============================================================================
// This module saves and loads the note for a signed-in user.
//
// Submodules:
// - store: Credential / Session and the DocumentStore trait
// - gist: A DocumentStore backed by a private GitHub Gist
// - bridge: Save / load orchestration, busy flags and user messages
// =============================================================================

mod bridge;
mod gist;
mod store;

pub use bridge::{Banner, BannerKind, BridgeState, PersistError, PersistenceBridge};
pub use gist::GistStore;
pub use store::{Credential, DocumentId, DocumentStore, Session, StoreError};
