//! In-memory entity store
//!
//! One [`Slot`] per domain holds that domain's [`Collection`] behind a
//! `watch` channel. Readers get snapshots or subscriptions; only the sync
//! actions in this crate can change a slot.
//!
//! ## Ordering
//!
//! Every fetch takes a [`FetchTicket`] carrying a sequence number. Issuing a
//! new fetch bumps the slot's latest number and cancels the previous
//! in-flight request; a result whose ticket is no longer the latest is
//! dropped on arrival. Collections therefore converge on the most recently
//! issued fetch, whatever order responses come back in.
//!
//! Local patches (a created, updated or deleted record) leave an in-flight
//! fetch running. The list it returns may predate the mutation, so the
//! patches made while it was pending are replayed on top of its result.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ListFilters;
use crate::domain::Domain;
use crate::error::ApiError;
use crate::models::{
    Album, Bookmark, Card, Entity, EntityId, FileItem, Folder, Note, Password, Photo, Resume,
    VoiceMemo,
};

/// Fetch state of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Error,
}

/// One domain's records plus fetch status
#[derive(Debug, Clone, Serialize)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: FetchStatus::Idle,
            error: None,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

/// Handle for one issued fetch
#[derive(Debug)]
pub struct FetchTicket {
    seq: u64,
    cancel: CancellationToken,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Cancelled once a newer fetch is issued for the same domain
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A confirmed mutation applied locally
#[derive(Debug, Clone)]
enum Patch<T> {
    Upsert(T),
    Remove(EntityId),
}

impl<T: Entity> Patch<T> {
    fn apply(&self, items: &mut Vec<T>) {
        match self {
            Patch::Upsert(record) => {
                match items.iter_mut().find(|existing| existing.id() == record.id()) {
                    Some(existing) => *existing = record.clone(),
                    None => items.push(record.clone()),
                }
            }
            Patch::Remove(id) => items.retain(|item| item.id() != id),
        }
    }
}

struct Control<T> {
    /// Sequence number of the latest issued fetch
    latest: u64,
    in_flight: Option<CancellationToken>,
    last_filters: ListFilters,
    /// Patches made while `in_flight` was pending
    pending: Vec<Patch<T>>,
}

impl<T> Default for Control<T> {
    fn default() -> Self {
        Self {
            latest: 0,
            in_flight: None,
            last_filters: ListFilters::default(),
            pending: Vec::new(),
        }
    }
}

/// Storage for one domain
pub struct Slot<T> {
    domain: Domain,
    state: watch::Sender<Collection<T>>,
    control: Mutex<Control<T>>,
}

impl<T: Entity> Slot<T> {
    fn new() -> Self {
        let (state, _) = watch::channel(Collection::default());
        Self {
            domain: T::DOMAIN,
            state,
            control: Mutex::new(Control::default()),
        }
    }

    pub fn snapshot(&self) -> Collection<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Collection<T>> {
        self.state.subscribe()
    }

    fn control(&self) -> std::sync::MutexGuard<'_, Control<T>> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Filters of the most recent fetch
    pub(crate) fn last_filters(&self) -> ListFilters {
        self.control().last_filters.clone()
    }

    /// Register a new fetch, cancelling whichever one was in flight
    pub(crate) fn begin_fetch(&self, filters: ListFilters) -> FetchTicket {
        let mut control = self.control();
        let ticket = self.supersede(&mut control);
        control.in_flight = Some(ticket.cancel.clone());
        control.last_filters = filters;
        // Issued after those patches were confirmed, so the server has them
        control.pending.clear();
        drop(control);

        self.state.send_modify(|collection| {
            collection.status = FetchStatus::Loading;
        });
        ticket
    }

    /// Apply a fetch result if its ticket is still the latest.
    ///
    /// Returns `false` when the result was discarded as stale.
    pub(crate) fn finish_fetch(&self, ticket: &FetchTicket, result: Result<Vec<T>, ApiError>) -> bool {
        let mut control = self.control();
        if ticket.seq != control.latest {
            debug!(
                domain = %self.domain,
                seq = ticket.seq,
                latest = control.latest,
                "Discarding stale fetch result"
            );
            return false;
        }
        control.in_flight = None;
        let pending = std::mem::take(&mut control.pending);

        // Apply while holding the control lock so no newer ticket can slip
        // in between the check and the write
        match result {
            Ok(items) => {
                let mut items = dedupe(items);
                for patch in &pending {
                    patch.apply(&mut items);
                }
                self.state.send_modify(|collection| {
                    collection.items = items;
                    collection.status = FetchStatus::Idle;
                    collection.error = None;
                });
            }
            Err(e) => {
                self.state.send_modify(|collection| {
                    collection.status = FetchStatus::Error;
                    collection.error = Some(e.to_string());
                });
            }
        }
        true
    }

    /// Insert or replace one record from a server answer
    pub(crate) fn upsert(&self, record: T) {
        self.patch(Patch::Upsert(record));
    }

    /// Drop one record after a confirmed delete
    pub(crate) fn remove(&self, id: &EntityId) {
        self.patch(Patch::Remove(id.clone()));
    }

    fn patch(&self, patch: Patch<T>) {
        let mut control = self.control();
        let fetching = control.in_flight.is_some();
        self.state.send_modify(|collection| {
            patch.apply(&mut collection.items);
            if !fetching {
                collection.status = FetchStatus::Idle;
                collection.error = None;
            }
        });
        if fetching {
            control.pending.push(patch);
        }
    }

    /// Empty the collection and abandon any in-flight fetch
    pub(crate) fn reset(&self) {
        let mut control = self.control();
        self.supersede(&mut control);
        control.last_filters = ListFilters::default();
        control.pending.clear();
        self.state.send_replace(Collection::default());
    }

    /// Bump the sequence number and cancel the in-flight request
    fn supersede(&self, control: &mut Control<T>) -> FetchTicket {
        control.latest += 1;
        if let Some(previous) = control.in_flight.take() {
            previous.cancel();
        }
        FetchTicket {
            seq: control.latest,
            cancel: CancellationToken::new(),
        }
    }

    fn summary(&self) -> CollectionSummary {
        let state = self.state.borrow();
        CollectionSummary {
            domain: self.domain,
            count: state.items.len(),
            status: state.status,
            error: state.error.clone(),
        }
    }
}

/// Keep one record per id: first position, last value
fn dedupe<T: Entity>(items: Vec<T>) -> Vec<T> {
    let mut positions: HashMap<EntityId, usize> = HashMap::with_capacity(items.len());
    let mut unique: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        match positions.get(item.id()) {
            Some(&index) => unique[index] = item,
            None => {
                positions.insert(item.id().clone(), unique.len());
                unique.push(item);
            }
        }
    }
    unique
}

/// Status line for one collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub domain: Domain,
    pub count: usize,
    pub status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every synchronized collection
pub struct EntityStore {
    notes: Slot<Note>,
    bookmarks: Slot<Bookmark>,
    passwords: Slot<Password>,
    cards: Slot<Card>,
    voice_memos: Slot<VoiceMemo>,
    resumes: Slot<Resume>,
    files: Slot<FileItem>,
    folders: Slot<Folder>,
    photos: Slot<Photo>,
    albums: Slot<Album>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            notes: Slot::new(),
            bookmarks: Slot::new(),
            passwords: Slot::new(),
            cards: Slot::new(),
            voice_memos: Slot::new(),
            resumes: Slot::new(),
            files: Slot::new(),
            folders: Slot::new(),
            photos: Slot::new(),
            albums: Slot::new(),
        }
    }

    pub fn slot<T: Stored>(&self) -> &Slot<T> {
        T::slot(self)
    }

    /// Current state of one collection
    pub fn collection<T: Stored>(&self) -> Collection<T> {
        self.slot::<T>().snapshot()
    }

    pub fn subscribe<T: Stored>(&self) -> watch::Receiver<Collection<T>> {
        self.slot::<T>().subscribe()
    }

    /// Status of every collection, in domain order
    pub fn summaries(&self) -> Vec<CollectionSummary> {
        vec![
            self.notes.summary(),
            self.bookmarks.summary(),
            self.passwords.summary(),
            self.cards.summary(),
            self.voice_memos.summary(),
            self.resumes.summary(),
            self.files.summary(),
            self.folders.summary(),
            self.photos.summary(),
            self.albums.summary(),
        ]
    }

    /// Drop every collection (used when the session ends)
    pub(crate) fn clear_all(&self) {
        self.notes.reset();
        self.bookmarks.reset();
        self.passwords.reset();
        self.cards.reset();
        self.voice_memos.reset();
        self.resumes.reset();
        self.files.reset();
        self.folders.reset();
        self.photos.reset();
        self.albums.reset();
    }
}

/// An entity with a slot in the [`EntityStore`]
pub trait Stored: Entity {
    fn slot(store: &EntityStore) -> &Slot<Self>;
}

impl Stored for Note {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.notes
    }
}

impl Stored for Bookmark {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.bookmarks
    }
}

impl Stored for Password {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.passwords
    }
}

impl Stored for Card {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.cards
    }
}

impl Stored for VoiceMemo {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.voice_memos
    }
}

impl Stored for Resume {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.resumes
    }
}

impl Stored for FileItem {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.files
    }
}

impl Stored for Folder {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.folders
    }
}

impl Stored for Photo {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.photos
    }
}

impl Stored for Album {
    fn slot(store: &EntityStore) -> &Slot<Self> {
        &store.albums
    }
}
