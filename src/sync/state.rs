//! Synced account state and its fenced, all-or-nothing store.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// On-chain account view for the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedAccountState {
    pub is_registered: bool,
    /// Account index owning the wallet address. 0 = unassigned.
    pub nft_id: u64,
    pub num_users: u64,
}

/// What a single refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Context lacked a required field; nothing was fetched.
    Skipped { missing: &'static str },
    /// Fetched and committed.
    Updated(SyncedAccountState),
    /// Fetched, but a refresh started later had already committed.
    Superseded,
}

impl RefreshOutcome {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Skipped { .. } => "skipped",
            RefreshOutcome::Updated(_) => "updated",
            RefreshOutcome::Superseded => "superseded",
        }
    }
}

#[derive(Debug)]
struct Versioned {
    seq: u64,
    state: SyncedAccountState,
}

/// Holds the latest committed state.
///
/// Each refresh takes a ticket from [`StateStore::begin`]; a commit only lands
/// if no higher ticket has committed yet. The three fields are swapped as one
/// value, so readers never see a mix of old and new. Committed changes are
/// also published to [`StateStore::subscribe`] receivers.
#[derive(Debug)]
pub struct StateStore {
    current: ArcSwap<Versioned>,
    next_seq: AtomicU64,
    in_flight: AtomicUsize,
    published: watch::Sender<SyncedAccountState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Versioned {
                seq: 0,
                state: SyncedAccountState::default(),
            }),
            next_seq: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            published: watch::channel(SyncedAccountState::default()).0,
        }
    }

    /// Latest committed state.
    pub fn get(&self) -> SyncedAccountState {
        self.current.load().state
    }

    /// Receiver woken whenever the committed state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncedAccountState> {
        self.published.subscribe()
    }

    /// Whether any refresh holding a ticket has not finished yet.
    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Take a ticket for a new refresh. The ticket keeps `is_fetching` true until dropped.
    pub fn begin(&self) -> Ticket<'_> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ticket { store: self, seq }
    }

    /// Commit `state` for `ticket`. Returns false if a newer refresh already committed.
    pub fn commit(&self, ticket: &Ticket<'_>, state: SyncedAccountState) -> bool {
        let seq = ticket.seq;
        let previous = self.current.rcu(|cur| {
            if seq > cur.seq {
                Arc::new(Versioned { seq, state })
            } else {
                Arc::clone(cur)
            }
        });
        let landed = previous.seq < seq;
        if landed {
            // Read the latest under the channel lock: racing commits must not
            // leave an older state as the last value sent.
            self.published.send_if_modified(|published| {
                let latest = self.get();
                let changed = *published != latest;
                *published = latest;
                changed
            });
        }
        landed
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A refresh in progress.
#[derive(Debug)]
pub struct Ticket<'a> {
    store: &'a StateStore,
    seq: u64,
}

impl Ticket<'_> {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
