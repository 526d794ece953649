//! The Engine (§4.2): the single dedicated fan-out task.

use std::sync::Arc;

use crate::router::Router;

/// Runs the Engine loop to completion. Returns when the central queue
/// closes and every output has been sent end-of-stream.
pub fn run(router: Arc<Router>) {
    let central = router.central_queue();
    loop {
        match central.next() {
            Some(unit) => {
                router.dispatch(Some(&unit));
            }
            None => {
                debug!("engine: central queue closed, propagating end-of-stream to outputs");
                router.dispatch(None);
                return;
            }
        }
    }
}
