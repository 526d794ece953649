//! Bring-up, steady-state reaping, and shutdown (§4.5).
//!
//! `run` is the whole program once a [`ParsedConfig`] exists: build the
//! Router and its central queue, spawn the Engine, build and launch one
//! task per configured endpoint, wait for them all to promote, then loop
//! reaping dead endpoints until none are left.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::adapters::{self, Built, InputAdapter, OutputAdapter};
use crate::cancel::CancelToken;
use crate::config::{EndpointDescriptor, ParsedConfig};
use crate::endpoint::{Direction, Endpoint, EndpointId};
use crate::engine;
use crate::error::KplexError;
use crate::queue::Queue;
use crate::router::{ReapEvent, Router};
use crate::signal;

/// Runs until every endpoint has exited and the reaper has nothing left to
/// join, or a startup error aborts bring-up early.
pub fn run(config: ParsedConfig) -> Result<(), KplexError> {
    let router = Arc::new(Router::new(config.qsize())?);
    signal::install(router.clone())?;

    let engine_router = router.clone();
    let engine_handle = thread::spawn(move || engine::run(engine_router));

    let mut handles: HashMap<EndpointId, JoinHandle<()>> = HashMap::new();
    for descriptor in &config.endpoints {
        spawn_endpoint(&router, descriptor, &mut handles)?;
    }

    router.wait_until_brought_up();
    info!("kplexrs: all endpoints up, {} running", handles.len());

    loop {
        match router.wait_for_reap() {
            ReapEvent::Dead => {
                for id in router.drain_dead() {
                    if let Some(handle) = handles.remove(&id) {
                        let _ = handle.join();
                    }
                }
                if handles.is_empty() {
                    break;
                }
            }
            ReapEvent::Terminate => {
                router.cancel_all_inputs();
                if handles.is_empty() {
                    break;
                }
            }
        }
    }

    let _ = engine_handle.join();
    Ok(())
}

fn spawn_endpoint(
    router: &Arc<Router>,
    descriptor: &EndpointDescriptor,
    handles: &mut HashMap<EndpointId, JoinHandle<()>>,
) -> Result<(), KplexError> {
    let name = format!("{}[{:?}]", descriptor.kind, descriptor.direction);
    match adapters::build(descriptor)? {
        Built::Input(adapter) => {
            let id = link_input(router, name, router.central_queue());
            handles.insert(id, spawn_input_task(router.clone(), id, adapter));
        }
        Built::Output(adapter) => {
            let queue = Arc::new(Queue::new(router.central_queue().capacity())?);
            let id = link_output(router, name, queue.clone());
            handles.insert(id, spawn_output_task(router.clone(), id, adapter, queue));
        }
        Built::Both(input, output) => {
            let out_queue = Arc::new(Queue::new(router.central_queue().capacity())?);
            let in_id = link_input(router, format!("{name}/in"), router.central_queue());
            let out_id = link_output(router, format!("{name}/out"), out_queue.clone());
            router.pair(in_id, out_id);
            handles.insert(in_id, spawn_input_task(router.clone(), in_id, input));
            handles.insert(out_id, spawn_output_task(router.clone(), out_id, output, out_queue));
        }
    }
    Ok(())
}

fn link_input(router: &Arc<Router>, name: String, queue: Arc<Queue>) -> EndpointId {
    let ep = Endpoint::new(name, Direction::In, queue);
    router.link_initialized(ep, CancelToken::new())
}

fn link_output(router: &Arc<Router>, name: String, queue: Arc<Queue>) -> EndpointId {
    let ep = Endpoint::new(name, Direction::Out, queue);
    router.link_initialized(ep, CancelToken::new())
}

/// Guarantees `Router::unlink` runs exactly once per endpoint task, even if
/// the adapter's `run` panics (§9 "Cleanup on every exit path").
struct UnlinkGuard {
    router: Arc<Router>,
    id: EndpointId,
}

impl Drop for UnlinkGuard {
    fn drop(&mut self) {
        self.router.unlink(self.id);
    }
}

fn spawn_input_task(
    router: Arc<Router>,
    id: EndpointId,
    mut adapter: Box<dyn InputAdapter>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        router.promote(id);
        let cancel = router.cancel_of(id).unwrap_or_default();
        let central = router.central_queue();
        let _guard = UnlinkGuard {
            router: router.clone(),
            id,
        };
        if let Err(e) = adapter.run(id, &central, &cancel) {
            warn!("endpoint {} exited with error: {}", id, e);
        }
        adapter.cleanup();
    })
}

fn spawn_output_task(
    router: Arc<Router>,
    id: EndpointId,
    mut adapter: Box<dyn OutputAdapter>,
    queue: Arc<Queue>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        router.promote(id);
        let _guard = UnlinkGuard {
            router: router.clone(),
            id,
        };
        if let Err(e) = adapter.run(&queue) {
            warn!("endpoint {} exited with error: {}", id, e);
        }
        adapter.cleanup();
    })
}
