// src/editor.rs
// =============================================================================
// The editor host: one note, its highlighted display and the save/load flow.
//
// This is the layer a UI talks to. It owns:
// - the Engine (buffer + statuses + probes)
// - the PersistenceBridge (save / load / messages)
// - the last rendered display and where the caret is in it
//
// Redraws are full rebuilds; the caret is carried across each rebuild and
// silently dropped if it no longer fits the new text.
// =============================================================================

use std::sync::Arc;

use crate::checker::LinkStatus;
use crate::engine::Engine;
use crate::persist::{Banner, PersistError, PersistenceBridge, Session};
use crate::render::{preserve_selection, Rendered, Selection};

pub struct Editor {
    engine: Engine,
    bridge: Arc<PersistenceBridge>,
    view: Rendered,
    selection: Option<Selection>,
}

impl Editor {
    pub fn new(engine: Engine, bridge: Arc<PersistenceBridge>) -> Self {
        let view = engine.render();
        Self {
            engine,
            bridge,
            view,
            selection: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn view(&self) -> &Rendered {
        &self.view
    }

    // The user typed: the new text goes to the engine (restarting the
    // debounce timer) and the caret is placed at the given character offset
    pub fn input(&mut self, text: impl Into<String>, caret: Option<usize>) {
        self.engine.set_text(text);
        self.view = self.engine.render();
        self.selection = caret
            .and_then(|offset| self.view.position_at(offset))
            .map(Selection::collapsed);
    }

    /// Caret position as a character offset into the note, if there is one.
    pub fn caret(&self) -> Option<usize> {
        self.selection
            .and_then(|selection| self.view.offset_of(selection.focus))
    }

    /// Rebuilds the display from the engine, keeping the caret if it still fits.
    pub fn redraw(&mut self) -> &Rendered {
        let next = self.engine.render();
        self.selection = self
            .selection
            .and_then(|selection| preserve_selection(&self.view, selection, &next));
        self.view = next;
        &self.view
    }

    pub async fn check_all(&mut self) -> Vec<LinkStatus> {
        let results = self.engine.check_all().await;
        self.redraw();
        results
    }

    pub async fn save(&self) -> Result<(), PersistError> {
        self.bridge.save(&self.engine.text()).await
    }

    // Loads the saved note into the buffer
    //
    // Returns: Ok(true) if a note was found and loaded
    pub async fn load(&mut self) -> Result<bool, PersistError> {
        match self.bridge.load().await? {
            Some(content) => {
                self.engine.load_text(content);
                self.redraw();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Sign-in changed: the first authenticated session loads the note.
    // A failed automatic load is already reported through the banner.
    pub async fn set_session(&mut self, session: Session) -> bool {
        if !self.bridge.set_session(session) {
            return false;
        }
        match self.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(error = %e, "automatic load failed");
                false
            }
        }
    }

    pub fn banner(&self) -> Option<Banner> {
        self.bridge.banner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{LinkState, ProbeOutcome, Prober};
    use crate::config::EngineConfig;
    use crate::persist::{Credential, DocumentId, DocumentStore, StoreError};
    use crate::render::HighlightClass;
    use anyhow::Result;
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    struct AlwaysUp;

    impl Prober for AlwaysUp {
        fn probe<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<ProbeOutcome>> {
            Box::pin(async { Ok(ProbeOutcome::reachable(200)) })
        }
    }

    // Holds at most one note, for whoever asks
    #[derive(Default)]
    struct OneNote(Mutex<Option<String>>);

    impl DocumentStore for OneNote {
        fn find<'a>(&'a self, _credential: &'a Credential)
            -> BoxFuture<'a, Result<Option<DocumentId>, StoreError>> {
            let found = self.0.lock().unwrap().as_ref().map(|_| DocumentId("note".into()));
            Box::pin(async move { Ok(found) })
        }

        fn read<'a>(
            &'a self,
            _credential: &'a Credential,
            _id: &'a DocumentId,
        ) -> BoxFuture<'a, Result<String, StoreError>> {
            let text = self.0.lock().unwrap().clone().unwrap_or_default();
            Box::pin(async move { Ok(text) })
        }

        fn create<'a>(
            &'a self,
            _credential: &'a Credential,
            content: &'a str,
        ) -> BoxFuture<'a, Result<DocumentId, StoreError>> {
            *self.0.lock().unwrap() = Some(content.to_string());
            Box::pin(async { Ok(DocumentId("note".into())) })
        }

        fn update<'a>(
            &'a self,
            _credential: &'a Credential,
            _id: &'a DocumentId,
            content: &'a str,
        ) -> BoxFuture<'a, Result<(), StoreError>> {
            *self.0.lock().unwrap() = Some(content.to_string());
            Box::pin(async { Ok(()) })
        }
    }

    fn editor(store: OneNote, session: Session) -> Editor {
        let engine = Engine::new(Arc::new(AlwaysUp), EngineConfig::default());
        let bridge = Arc::new(PersistenceBridge::new(Arc::new(store), session));
        Editor::new(engine, bridge)
    }

    #[tokio::test(start_paused = true)]
    async fn test_redraw_after_probe_keeps_caret() {
        let mut editor = editor(OneNote::default(), Session::signed_out());
        let text = "visit https://a.dev today";

        editor.input(text, Some(text.len()));
        assert_eq!(editor.view().links().next().unwrap().class, HighlightClass::Unchecked);

        editor.engine().settle().await;
        editor.redraw();

        assert_eq!(editor.view().links().next().unwrap().class, HighlightClass::Reachable);
        assert_eq!(editor.caret(), Some(text.len()));
    }

    #[tokio::test]
    async fn test_check_all_redraws() {
        let mut editor = editor(OneNote::default(), Session::signed_out());
        editor.engine().load_text("https://a.dev");

        let results = editor.check_all().await;

        assert_eq!(results[0].state, LinkState::Reachable);
        assert_eq!(editor.view().links().next().unwrap().class, HighlightClass::Reachable);
    }

    #[tokio::test]
    async fn test_sign_in_loads_saved_note_and_drops_bad_caret() {
        let store = OneNote(Mutex::new(Some("saved".to_string())));
        let mut editor = editor(store, Session::signed_out());
        let typed = "a much longer draft than the saved note";
        editor.input(typed, Some(typed.len()));

        let loaded = editor
            .set_session(Session::signed_in(Credential::new("token")))
            .await;

        assert!(loaded);
        assert_eq!(editor.engine().text(), "saved");
        assert_eq!(editor.view().visible_text(), "saved");
        assert_eq!(editor.caret(), None);
        // second notification for the same sign-in does not reload
        assert!(!editor.set_session(Session::signed_in(Credential::new("token"))).await);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let mut editor = editor(OneNote::default(), Session::signed_in(Credential::new("t")));
        editor.input("keep https://a.dev", None);

        editor.save().await.unwrap();
        editor.engine().load_text("scratch");
        assert!(editor.load().await.unwrap());

        assert_eq!(editor.engine().text(), "keep https://a.dev");
        assert_eq!(editor.banner().unwrap().text, "Note loaded successfully!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_the_note_keeps_the_caret() {
        let mut editor = editor(OneNote::default(), Session::signed_out());
        editor.input("https://a.dev", Some(13));

        editor.input("", Some(0));
        assert_eq!(editor.caret(), Some(0));

        editor.redraw();
        assert_eq!(editor.caret(), Some(0));
    }
}
