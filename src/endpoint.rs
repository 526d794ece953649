//! The endpoint record (§3) as tracked by the [`Router`](crate::router::Router).
//!
//! Adapter-specific behavior (the actual `read`/`write`/`cleanup` routines)
//! lives in boxed trait objects owned by each endpoint's task
//! (`crate::adapters`); the `Router` only needs the lightweight bookkeeping
//! fields below to run the fan-out and lifecycle protocol. This split keeps
//! the Router generic over adapter kind without function-pointer fields.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::queue::Queue;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A generational identifier for an endpoint.
///
/// The design notes (§9) call out weak `pair` references as a staleness
/// hazard for raw pointers; representing `pair` as a plain `Copy` id that is
/// only ever looked up through the Router's live tables sidesteps the
/// problem entirely — an id for a reaped endpoint simply misses.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct EndpointId(u64);

impl EndpointId {
    pub(crate) fn next() -> EndpointId {
        EndpointId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An endpoint's direction (§3). `Both` only appears in configuration; by
/// the time an endpoint reaches the Router it has already been split into
/// an `In` half and an `Out` half sharing a `pair` id (see DESIGN.md).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Direction {
    In,
    Out,
    /// Scheduled for quiet exit (§3): the task must return without ever
    /// joining an active list.
    None,
}

/// The Router's bookkeeping record for one endpoint.
pub struct Endpoint {
    pub id: EndpointId,
    /// Human-readable tag for logs, e.g. `"file[in]"` or `"tcp:127.0.0.1:10110[out]"`.
    pub name: String,
    pub direction: Direction,
    /// Weak back-reference to the sibling of a split `Both` transport.
    pub pair: Option<EndpointId>,
    /// For `In`: the shared central queue. For `Out`: a private queue owned
    /// exclusively by this endpoint.
    pub queue: Arc<Queue>,
}

impl Endpoint {
    pub fn new(name: String, direction: Direction, queue: Arc<Queue>) -> Endpoint {
        Endpoint {
            id: EndpointId::next(),
            name,
            direction,
            pair: None,
            queue,
        }
    }
}
