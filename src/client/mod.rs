//! Note client: a local mirror of the server's notes kept in step with
//! every request made through it.
//!
//! The mirror lives behind a synchronous mutex that is never held across an
//! await point, so overlapping requests from the same client only contend
//! for the short window in which a response is applied.

mod api;
mod cache;
mod http;

pub use api::NoteApi;
pub use cache::{
    sort_notes, CreateTicket, LoadTicket, NoteCache, SortKey, SortOrder, Ticket,
};
pub use http::HttpNoteApi;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::entity::{CreateNote, Note, NoteUpdate};
use crate::error::{MurmurError, Result};
use crate::service::ImageUpload;

/// Outcome of a reload. A failed reload keeps the previous collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

pub struct NoteClient<A> {
    api: A,
    cache: Mutex<NoteCache>,
}

impl<A: NoteApi> NoteClient<A> {
    /// An empty client; nothing is fetched until `load`
    pub fn new(api: A) -> Self {
        Self {
            api,
            cache: Mutex::new(NoteCache::new()),
        }
    }

    /// Create a client and populate it from the server
    pub async fn start(api: A) -> Self {
        let client = Self::new(api);
        client.load().await;
        client
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// The filtered, sorted view
    pub fn notes(&self) -> Vec<Note> {
        self.lock().notes().to_vec()
    }

    /// Everything known locally, in server order
    pub fn all(&self) -> Vec<Note> {
        self.lock().all().to_vec()
    }

    pub fn get(&self, id: &Uuid) -> Option<Note> {
        self.lock().get(id).cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error().map(str::to_string)
    }

    /// Read access to the whole mirror
    pub fn with_cache<R>(&self, f: impl FnOnce(&NoteCache) -> R) -> R {
        f(&self.lock())
    }

    /// Replace the local collection with the server's. On failure the
    /// previous collection stays and the error is recorded.
    pub async fn load(&self) -> Freshness {
        match self.refresh().await {
            Ok(()) => Freshness::Fresh,
            Err(_) => Freshness::Stale,
        }
    }

    /// `load`, for callers that want the error itself
    pub async fn refresh(&self) -> Result<()> {
        let ticket = self.lock().begin_load();

        match self.api.list().await {
            Ok(notes) => {
                let count = notes.len();
                if self.lock().finish_load(ticket, notes) {
                    debug!(count, "Loaded notes");
                } else {
                    debug!("Discarded superseded load");
                }
                Ok(())
            }
            Err(e) => Err(self.fail("load", e)),
        }
    }

    pub async fn create(&self, draft: CreateNote) -> Result<Note> {
        let ticket = self.lock().begin_create();

        match self.api.create(draft).await {
            Ok(note) => {
                self.lock().insert_created(ticket, note.clone());
                Ok(note)
            }
            Err(e) => Err(self.fail("create", e)),
        }
    }

    pub async fn update(&self, id: Uuid, update: NoteUpdate) -> Result<Note> {
        let ticket = self.lock().begin(id);
        let result = self.api.update(id, update).await;
        self.settle("update", ticket, result)
    }

    /// Remove a note. The local copy goes only after the server confirms.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let ticket = self.lock().begin(id);

        match self.api.delete(id).await {
            Ok(()) => {
                self.lock().remove(ticket);
                Ok(())
            }
            Err(e) => Err(self.fail("delete", e)),
        }
    }

    pub async fn toggle_favorite(&self, id: Uuid) -> Result<Note> {
        let ticket = self.lock().begin(id);
        let result = self.api.toggle_favorite(id).await;
        self.settle("toggle_favorite", ticket, result)
    }

    pub async fn attach_image(&self, id: Uuid, upload: ImageUpload) -> Result<Note> {
        let ticket = self.lock().begin(id);
        let result = self.api.attach_image(id, upload).await;
        self.settle("attach_image", ticket, result)
    }

    pub fn search(&self, term: &str) {
        self.lock().search(term);
    }

    pub fn sort(&self, key: SortKey, order: SortOrder) {
        self.lock().sort(key, order);
    }

    pub fn toggle_sort(&self, key: SortKey) -> SortOrder {
        self.lock().toggle_sort(key)
    }

    pub fn show_favorites(&self, only: bool) {
        self.lock().show_favorites(only);
    }

    /// Drop all local state, e.g. on logout
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn settle(&self, op: &'static str, ticket: Ticket, result: Result<Note>) -> Result<Note> {
        match result {
            Ok(note) => {
                if !self.lock().apply(ticket, note.clone()) {
                    debug!(op, id = %ticket.id(), "Discarded stale response");
                }
                Ok(note)
            }
            Err(e) => Err(self.fail(op, e)),
        }
    }

    fn fail(&self, op: &'static str, e: MurmurError) -> MurmurError {
        warn!(op, error = %e, "Note request failed");
        self.lock().record_error(e.to_string());
        e
    }

    fn lock(&self) -> MutexGuard<'_, NoteCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
