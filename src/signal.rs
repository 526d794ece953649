//! SIGTERM/SIGINT handling (§5 "Termination").
//!
//! A dedicated thread blocks on `signal_hook`'s iterator and forwards
//! either signal to [`Router::request_termination`], which is the same
//! path the reaper loop uses to start cancelling inputs. Per-endpoint
//! cancellation (SIGUSR1 in the original) is handled in-process by
//! [`crate::cancel::CancelToken`] instead of a second real signal, since
//! nothing outside this process ever needs to target one endpoint task.

use std::io;
use std::sync::Arc;
use std::thread;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::router::Router;

/// Spawns the signal-handling thread. Returns an error only if the signal
/// set itself cannot be installed (a startup-fatal condition).
pub fn install(router: Arc<Router>) -> io::Result<()> {
    let mut signals = Signals::new([SIGTERM, SIGINT])?;
    thread::spawn(move || {
        for signal in signals.forever() {
            match signal {
                SIGTERM | SIGINT => {
                    info!("received signal {}, shutting down", signal);
                    router.request_termination();
                }
                _ => unreachable!("only SIGTERM/SIGINT were registered"),
            }
        }
    });
    Ok(())
}
