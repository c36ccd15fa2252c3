//! Fetch lifecycle controller.
//!
//! Every outbound request belongs to a [`Slot`]. Issuing a request bumps that
//! slot's counter and hands out a [`Ticket`] carrying the new [`RequestId`].
//! When the request finishes, its ticket is compared with the slot's counter:
//! a stale ticket is dropped silently and leaves the slot untouched. Only the
//! most recently issued request of a slot can change what the user sees.

use std::fmt;

use tracing::{debug, trace};

use crate::error::FetchError;
use crate::executor::{Executor, Job};

/// A logical data channel whose requests are tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    MarketCodes,
    TickerList,
    StockData,
    AssetReport,
    BetaCalculation,
    PortfolioBeta,
    SvmAnalysis,
    LatestAnalysis,
    MarketIndex,
    DataImport,
    Recalculate,
    ResearchAnalysis,
}

impl Slot {
    pub const COUNT: usize = 12;

    pub const ALL: [Slot; Slot::COUNT] = [
        Slot::MarketCodes,
        Slot::TickerList,
        Slot::StockData,
        Slot::AssetReport,
        Slot::BetaCalculation,
        Slot::PortfolioBeta,
        Slot::SvmAnalysis,
        Slot::LatestAnalysis,
        Slot::MarketIndex,
        Slot::DataImport,
        Slot::Recalculate,
        Slot::ResearchAnalysis,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Slot::MarketCodes => "market codes",
            Slot::TickerList => "ticker list",
            Slot::StockData => "stock data",
            Slot::AssetReport => "asset report",
            Slot::BetaCalculation => "beta calculation",
            Slot::PortfolioBeta => "portfolio beta",
            Slot::SvmAnalysis => "SVM analysis",
            Slot::LatestAnalysis => "latest analysis",
            Slot::MarketIndex => "market index",
            Slot::DataImport => "data import",
            Slot::Recalculate => "recalculation",
            Slot::ResearchAnalysis => "research analysis",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-slot monotonically increasing request number. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one issued request: which slot, which request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub slot: Slot,
    pub id: RequestId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Pending(RequestId),
    Success { value: T, id: RequestId },
    Failure { error: FetchError, id: RequestId },
}

impl<T> FetchState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchState::Pending(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FetchState::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            FetchState::Idle => None,
            FetchState::Pending(id)
            | FetchState::Success { id, .. }
            | FetchState::Failure { id, .. } => Some(*id),
        }
    }
}

/// What `resolve` did with a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Superseded,
}

struct SlotEntry<T> {
    latest: u64,
    state: FetchState<T>,
}

pub struct FetchController<T> {
    slots: [SlotEntry<T>; Slot::COUNT],
}

impl<T> Default for FetchController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FetchController<T> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| SlotEntry {
                latest: 0,
                state: FetchState::Idle,
            }),
        }
    }

    fn entry(&self, slot: Slot) -> &SlotEntry<T> {
        &self.slots[slot.index()]
    }

    fn entry_mut(&mut self, slot: Slot) -> &mut SlotEntry<T> {
        &mut self.slots[slot.index()]
    }

    /// Start a new request for `slot`. Any earlier request becomes stale.
    pub fn begin(&mut self, slot: Slot) -> Ticket {
        let entry = self.entry_mut(slot);
        entry.latest += 1;
        let id = RequestId(entry.latest);
        entry.state = FetchState::Pending(id);
        debug!(%slot, %id, "request issued");
        Ticket { slot, id }
    }

    /// `begin` and hand the job to the executor.
    pub fn issue<E>(&mut self, slot: Slot, executor: &E, job: Job<T>) -> Ticket
    where
        E: Executor<T> + ?Sized,
    {
        let ticket = self.begin(slot);
        executor.spawn(ticket, job);
        ticket
    }

    /// Apply a finished request if it is still the latest for its slot.
    pub fn resolve(&mut self, ticket: Ticket, outcome: Result<T, FetchError>) -> Resolution {
        let entry = self.entry_mut(ticket.slot);
        if ticket.id.0 != entry.latest || !entry.state.is_pending() {
            trace!(slot = %ticket.slot, id = %ticket.id, latest = entry.latest, "stale result dropped");
            return Resolution::Superseded;
        }
        entry.state = match outcome {
            Ok(value) => FetchState::Success {
                value,
                id: ticket.id,
            },
            Err(error) => {
                debug!(slot = %ticket.slot, id = %ticket.id, %error, "request failed");
                FetchState::Failure {
                    error,
                    id: ticket.id,
                }
            }
        };
        Resolution::Applied
    }

    /// Drop interest in the slot's in-flight request and return it to `Idle`.
    /// Returns whether a request was pending.
    pub fn cancel(&mut self, slot: Slot) -> bool {
        let entry = self.entry_mut(slot);
        let was_pending = entry.state.is_pending();
        if was_pending {
            entry.latest += 1;
            entry.state = FetchState::Idle;
            debug!(%slot, "request cancelled");
        }
        was_pending
    }

    /// Set a value produced locally. Counts as a new request, so anything
    /// still in flight for the slot is dropped when it lands.
    pub fn fill(&mut self, slot: Slot, value: T) -> RequestId {
        let entry = self.entry_mut(slot);
        entry.latest += 1;
        let id = RequestId(entry.latest);
        entry.state = FetchState::Success { value, id };
        debug!(%slot, %id, "filled locally");
        id
    }

    /// Forget the slot's result. An in-flight request is cancelled too.
    pub fn reset(&mut self, slot: Slot) {
        let entry = self.entry_mut(slot);
        if entry.state.is_pending() {
            entry.latest += 1;
        }
        entry.state = FetchState::Idle;
    }

    pub fn state(&self, slot: Slot) -> &FetchState<T> {
        &self.entry(slot).state
    }

    /// The id of the newest request issued for `slot`, if any.
    pub fn latest(&self, slot: Slot) -> Option<RequestId> {
        match self.entry(slot).latest {
            0 => None,
            n => Some(RequestId(n)),
        }
    }

    pub fn is_pending(&self, slot: Slot) -> bool {
        self.entry(slot).state.is_pending()
    }

    pub fn any_pending(&self) -> bool {
        self.slots.iter().any(|e| e.state.is_pending())
    }

    pub fn pending_slots(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|&s| self.is_pending(s))
            .collect()
    }
}
