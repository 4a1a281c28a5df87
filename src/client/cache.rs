//! Client-side mirror of the server's note collection.
//!
//! `NoteCache` is plain state: it never performs I/O. The async driver hands
//! out tickets before each request and feeds responses back in; responses are
//! applied only if no later-issued request has already been applied for the
//! same note.
//!
//! Two sequences are kept: `original`, the last-known full collection in
//! server order, and `view`, which is `original` filtered by the search term
//! and favorites flag and then ordered by the active sort.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use icu_collator::{Collator, CollatorOptions, Strength};
use tracing::warn;
use uuid::Uuid;

use crate::entity::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Name,
    #[default]
    Date,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Name => write!(f, "name"),
            SortKey::Date => write!(f, "date"),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" | "title" => Ok(SortKey::Name),
            "date" | "time" | "timestamp" => Ok(SortKey::Date),
            _ => Err(format!("Invalid sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

/// Issued before a request that targets a single note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    id: Uuid,
    seq: u64,
}

impl Ticket {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Issued before a full reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTicket {
    seq: u64,
}

#[derive(Debug, Default)]
pub struct NoteCache {
    original: Vec<Note>,
    view: Vec<Note>,
    query: String,
    favorites_only: bool,
    sort: Option<(SortKey, SortOrder)>,
    next_seq: u64,
    /// Tickets issued before this value belong to a previous session.
    floor: u64,
    last_load: u64,
    /// Sequence of the request whose data is currently held, per note
    applied: HashMap<Uuid, u64>,
    /// Sequence of the delete that removed a note, so older loads cannot revive it
    removed: HashMap<Uuid, u64>,
    last_error: Option<String>,
}

impl NoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The filtered and sorted sequence
    pub fn notes(&self) -> &[Note] {
        &self.view
    }

    /// Everything last known from the server, unfiltered and unsorted
    pub fn all(&self) -> &[Note] {
        &self.original
    }

    pub fn get(&self, id: &Uuid) -> Option<&Note> {
        self.original.iter().find(|n| n.id == *id)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort_state(&self) -> Option<(SortKey, SortOrder)> {
        self.sort
    }

    pub fn favorites_only(&self) -> bool {
        self.favorites_only
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        LoadTicket {
            seq: self.issue(),
        }
    }

    /// Replace the collection with the server's list. Returns false if a
    /// later load has already been applied or the ticket predates `clear`.
    ///
    /// Notes whose local copy came from a request issued after this load
    /// keep that copy, and notes created after it was issued stay even when
    /// the list does not contain them yet.
    pub fn finish_load(&mut self, ticket: LoadTicket, notes: Vec<Note>) -> bool {
        if ticket.seq < self.floor || ticket.seq <= self.last_load {
            return false;
        }
        self.last_load = ticket.seq;

        let previous = std::mem::take(&mut self.original);
        let listed: HashSet<Uuid> = notes.iter().map(|n| n.id).collect();

        let mut merged: Vec<Note> = previous
            .iter()
            .filter(|n| !listed.contains(&n.id) && self.applied_after(&n.id, ticket.seq))
            .cloned()
            .collect();

        for note in notes {
            if self
                .removed
                .get(&note.id)
                .is_some_and(|&seq| seq >= ticket.seq)
            {
                continue;
            }
            if self.applied_after(&note.id, ticket.seq) {
                if let Some(local) = previous.iter().find(|n| n.id == note.id) {
                    merged.push(local.clone());
                    continue;
                }
            }
            let entry = self.applied.entry(note.id).or_insert(0);
            *entry = (*entry).max(ticket.seq);
            merged.push(note);
        }

        self.removed.retain(|_, seq| *seq > ticket.seq);
        self.applied.retain(|id, _| merged.iter().any(|n| n.id == *id));
        self.original = merged;

        self.last_error = None;
        self.refresh_view();
        true
    }

    /// Issued before a create request, whose note id is not known yet
    pub fn begin_create(&mut self) -> CreateTicket {
        CreateTicket { seq: self.issue() }
    }

    pub fn begin(&mut self, id: Uuid) -> Ticket {
        Ticket {
            id,
            seq: self.issue(),
        }
    }

    /// Overwrite the local copy with the server's. Stale responses and
    /// responses for notes no longer held locally are dropped.
    pub fn apply(&mut self, ticket: Ticket, note: Note) -> bool {
        if note.id != ticket.id || self.is_stale(&ticket) {
            return false;
        }

        let Some(slot) = self.original.iter_mut().find(|n| n.id == ticket.id) else {
            return false;
        };
        *slot = note;
        self.applied.insert(ticket.id, ticket.seq);
        self.refresh_view();
        true
    }

    /// Add a freshly created note at the front, where the server's list
    /// would put it.
    pub fn insert_created(&mut self, ticket: CreateTicket, note: Note) -> bool {
        if ticket.seq < self.floor
            || self.removed.contains_key(&note.id)
            || self.get(&note.id).is_some()
        {
            return false;
        }
        self.applied.insert(note.id, ticket.seq);
        self.original.insert(0, note);
        self.refresh_view();
        true
    }

    /// Drop a note after the server confirmed its deletion
    pub fn remove(&mut self, ticket: Ticket) -> bool {
        if ticket.seq < self.floor {
            return false;
        }
        self.removed.insert(ticket.id, ticket.seq);
        self.applied.remove(&ticket.id);

        let before = self.original.len();
        self.original.retain(|n| n.id != ticket.id);
        let removed = self.original.len() != before;
        if removed {
            self.refresh_view();
        }
        removed
    }

    /// Case-insensitive match on title or content, always against the full
    /// collection. A blank term shows everything again.
    pub fn search(&mut self, term: &str) {
        self.query = term.trim().to_string();
        self.refresh_view();
    }

    pub fn sort(&mut self, key: SortKey, order: SortOrder) {
        self.sort = Some((key, order));
        self.refresh_view();
    }

    /// Same key as the active sort flips its order; a new key starts ascending.
    pub fn toggle_sort(&mut self, key: SortKey) -> SortOrder {
        let order = match self.sort {
            Some((active, order)) if active == key => order.flipped(),
            _ => SortOrder::Asc,
        };
        self.sort(key, order);
        order
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
        self.refresh_view();
    }

    pub fn show_favorites(&mut self, only: bool) {
        self.favorites_only = only;
        self.refresh_view();
    }

    /// Forget everything, e.g. on logout. Requests still in flight are ignored
    /// when they complete.
    pub fn clear(&mut self) {
        let next_seq = self.next_seq;
        *self = Self::default();
        self.next_seq = next_seq;
        self.floor = next_seq;
    }

    fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn applied_after(&self, id: &Uuid, seq: u64) -> bool {
        self.applied.get(id).is_some_and(|&applied| applied > seq)
    }

    fn is_stale(&self, ticket: &Ticket) -> bool {
        ticket.seq < self.floor
            || self
                .applied
                .get(&ticket.id)
                .is_some_and(|&applied| ticket.seq <= applied)
    }

    fn refresh_view(&mut self) {
        let needle = self.query.to_lowercase();
        let mut view: Vec<Note> = self
            .original
            .iter()
            .filter(|n| !self.favorites_only || n.is_favorite)
            .filter(|n| needle.is_empty() || matches_term(n, &needle))
            .cloned()
            .collect();

        if let Some((key, order)) = self.sort {
            sort_notes(&mut view, key, order);
        }

        self.view = view;
    }
}

fn matches_term(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle) || note.content.to_lowercase().contains(needle)
}

/// Stable sort by title or by creation time. Titles compare with the root
/// collation, ignoring case; the raw title breaks ties.
pub fn sort_notes(notes: &mut [Note], key: SortKey, order: SortOrder) {
    let collator = match key {
        SortKey::Name => title_collator(),
        SortKey::Date => None,
    };
    notes.sort_by(|a, b| {
        let ord = match key {
            SortKey::Name => compare_titles(collator.as_ref(), &a.title, &b.title),
            SortKey::Date => a.timestamp.cmp(&b.timestamp),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn title_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Secondary);
    match Collator::try_new(&Default::default(), options) {
        Ok(collator) => Some(collator),
        Err(e) => {
            warn!(error = ?e, "Collation data unavailable, sorting titles by lowercase");
            None
        }
    }
}

fn compare_titles(collator: Option<&Collator>, a: &str, b: &str) -> Ordering {
    let folded = match collator {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    };
    folded.then_with(|| a.cmp(b))
}
