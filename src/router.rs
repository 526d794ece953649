//! The endpoint registry (§3 "Router (iolists)", §4.4).
//!
//! Owns the four endpoint lists (`initializing`, `inputs`, `outputs`,
//! `dead`), the central queue, and the two condition variables that drive
//! the supervisor's bring-up and reap loops. A single mutex guards all list
//! membership, matching the spec's `io_mutex`; each `Queue`'s own mutex is
//! independent and always acquired *after* the router's, never before, so
//! there is no lock-ordering cycle.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};

use crate::cancel::CancelToken;
use crate::endpoint::{Direction, Endpoint, EndpointId};
use crate::queue::{Queue, QueueError};
use crate::senblk::SenBlk;

struct State {
    endpoints: HashMap<EndpointId, Endpoint>,
    cancels: HashMap<EndpointId, CancelToken>,
    initializing: HashSet<EndpointId>,
    inputs: HashSet<EndpointId>,
    outputs: HashSet<EndpointId>,
    dead: Vec<EndpointId>,
    timetodie: bool,
    terminate_sent: bool,
}

pub struct Router {
    state: Mutex<State>,
    init_cond: Condvar,
    dead_cond: Condvar,
    central: Arc<Queue>,
}

/// What woke the reaper loop (§4.5 step 6).
pub enum ReapEvent {
    /// At least one endpoint is on the dead list; drain it with [`Router::drain_dead`].
    Dead,
    /// An external termination request (SIGTERM/SIGINT) or an empty
    /// `outputs` list means every input should be asked to exit.
    Terminate,
}

impl Router {
    /// Builds a Router with a fresh central queue of `central_size` slots.
    pub fn new(central_size: usize) -> Result<Router, QueueError> {
        Ok(Router {
            state: Mutex::new(State {
                endpoints: HashMap::new(),
                cancels: HashMap::new(),
                initializing: HashSet::new(),
                inputs: HashSet::new(),
                outputs: HashSet::new(),
                dead: Vec::new(),
                timetodie: false,
                terminate_sent: false,
            }),
            init_cond: Condvar::new(),
            dead_cond: Condvar::new(),
            central: Arc::new(Queue::new(central_size)?),
        })
    }

    pub fn central_queue(&self) -> Arc<Queue> {
        self.central.clone()
    }

    /// The cancellation token an endpoint task should poll, if `id` is
    /// still known to the router.
    pub fn cancel_of(&self, id: EndpointId) -> Option<CancelToken> {
        self.state.lock().unwrap().cancels.get(&id).cloned()
    }

    /// §4.4 LinkInitialized: append a newly constructed endpoint to
    /// `initialized`.
    pub fn link_initialized(&self, ep: Endpoint, cancel: CancelToken) -> EndpointId {
        let id = ep.id;
        let mut state = self.state.lock().unwrap();
        state.cancels.insert(id, cancel);
        state.endpoints.insert(id, ep);
        state.initializing.insert(id);
        id
    }

    /// §4.4 Promote: called from within the endpoint's own task at the
    /// start of its run. Moves `id` from `initializing` to `inputs` or
    /// `outputs` per its direction.
    pub fn promote(&self, id: EndpointId) {
        let mut state = self.state.lock().unwrap();
        state.initializing.remove(&id);
        let direction = state.endpoints.get(&id).map(|e| e.direction);
        match direction {
            Some(Direction::In) => {
                state.inputs.insert(id);
            }
            Some(Direction::Out) => {
                state.outputs.insert(id);
            }
            Some(Direction::None) | None => {
                // Scheduled for quiet exit; never joins an active list (§4.3).
            }
        }
        if state.initializing.is_empty() {
            self.init_cond.notify_all();
        }
    }

    /// Blocks until `initialized` is empty (§4.5 step 5).
    pub fn wait_until_brought_up(&self) {
        let mut state = self.state.lock().unwrap();
        while !state.initializing.is_empty() {
            state = self.init_cond.wait(state).unwrap();
        }
    }

    /// §4.4 Unlink: remove `id` from its active list, run paired-endpoint
    /// notification, and append it to `dead`. Cleanup of adapter-private
    /// state is the caller's responsibility (via an RAII guard, §9) and
    /// must have already run before this is called, since `cleanup` must
    /// execute exactly once and Unlink does not own the adapter object.
    pub fn unlink(&self, id: EndpointId) {
        let mut state = self.state.lock().unwrap();
        let was_input = state.inputs.remove(&id);
        let was_output = state.outputs.remove(&id);
        state.initializing.remove(&id);

        let pair = state.endpoints.get(&id).and_then(|e| e.pair);
        if let Some(sib) = pair {
            self.notify_sibling(&mut state, sib);
        }

        state.endpoints.remove(&id);
        state.cancels.remove(&id);

        if was_input && state.inputs.is_empty() {
            // Last input gone: close the central queue so the Engine
            // propagates shutdown to every output (§4.3).
            self.central.close();
        }
        let _ = was_output;

        state.dead.push(id);
        self.dead_cond.notify_all();
    }

    fn notify_sibling(&self, state: &mut State, sib: EndpointId) {
        if let Some(sib_ep) = state.endpoints.get(&sib) {
            match sib_ep.direction {
                Direction::Out => {
                    // Closing an output's private queue wakes its writer
                    // task with end-of-stream.
                    sib_ep.queue.close();
                }
                Direction::In => {
                    // Ask the sibling input to exit voluntarily rather than
                    // forcing it; it will notice on its next I/O boundary.
                    if let Some(tok) = state.cancels.get(&sib) {
                        tok.cancel();
                    }
                }
                Direction::None => {}
            }
        }
    }

    /// §4.2 Engine fan-out: copy `unit` (or propagate end-of-stream when
    /// `unit` is `None`) to every endpoint on `outputs`, skipping the output
    /// half of the pair `unit` originated from (loop prevention).
    pub fn dispatch(&self, unit: Option<&SenBlk>) {
        let state = self.state.lock().unwrap();
        for out_id in &state.outputs {
            let out = match state.endpoints.get(out_id) {
                Some(e) => e,
                None => continue,
            };
            match unit {
                None => out.queue.push(None),
                Some(u) => {
                    if u.src.is_some() && u.src == out.pair {
                        continue;
                    }
                    out.queue.push(Some(u.clone()));
                }
            }
        }
    }

    /// Records that `a` and `b` are the two halves of one split `Both`
    /// transport. Called once, right after both halves have been linked.
    pub fn pair(&self, a: EndpointId, b: EndpointId) {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.endpoints.get_mut(&a) {
            e.pair = Some(b);
        }
        if let Some(e) = state.endpoints.get_mut(&b) {
            e.pair = Some(a);
        }
    }

    /// External SIGTERM/SIGINT path (§5): sets `timetodie` and wakes the
    /// reaper.
    pub fn request_termination(&self) {
        let mut state = self.state.lock().unwrap();
        state.timetodie = true;
        self.dead_cond.notify_all();
    }

    /// §4.5 step 6: blocks until there is reaping work to do.
    ///
    /// `Terminate` is edge-triggered (`terminate_sent` latches once it
    /// fires): without that latch, a still-draining input with no output
    /// left to feed would make this spin, re-reporting `Terminate` on every
    /// call until the input actually exits.
    pub fn wait_for_reap(&self) -> ReapEvent {
        let mut state = self.state.lock().unwrap();
        loop {
            if !state.dead.is_empty() {
                return ReapEvent::Dead;
            }
            if !state.terminate_sent && (state.timetodie || state.outputs.is_empty()) {
                state.terminate_sent = true;
                return ReapEvent::Terminate;
            }
            state = self.dead_cond.wait(state).unwrap();
        }
    }

    /// Clears `timetodie` and sends the per-task termination signal to
    /// every current input endpoint (§4.5 step 6b).
    pub fn cancel_all_inputs(&self) {
        let mut state = self.state.lock().unwrap();
        state.timetodie = false;
        let inputs: Vec<EndpointId> = state.inputs.iter().copied().collect();
        for id in inputs {
            if let Some(tok) = state.cancels.get(&id) {
                tok.cancel();
            }
        }
    }

    /// Drains the dead list, returning ids ready to be joined.
    pub fn drain_dead(&self) -> Vec<EndpointId> {
        let mut state = self.state.lock().unwrap();
        std::mem::take(&mut state.dead)
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock().unwrap();
        (
            state.initializing.len(),
            state.inputs.len(),
            state.outputs.len(),
            state.dead.len(),
        )
    }
}
