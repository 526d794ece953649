//! The adapter interface (§4.6) and the registry that builds one from a
//! parsed [`EndpointDescriptor`](crate::config::EndpointDescriptor).
//!
//! Two transports are implemented for real: `file` and `tcp`. They are
//! sufficient to exercise every lifecycle path in §8's end-to-end
//! scenarios, including a `Both`-direction split (tcp) and loop prevention
//! (file or tcp, looped back through a second output). `serial`, `pty`,
//! `broadcast`, and `seatalk` are stubbed: their byte-level driver work is
//! out of scope (§1), so `init` validates their config keys and then
//! returns a descriptive error rather than silently doing nothing.

mod file;
mod stub;
mod tcp;

use std::io;

use thiserror::Error;

use crate::cancel::CancelToken;
use crate::config::{AdapterKind, ConfigDirection, EndpointDescriptor};
use crate::endpoint::EndpointId;
use crate::queue::Queue;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{kind} endpoint missing required key `{key}`")]
    MissingKey { kind: AdapterKind, key: &'static str },

    #[error("{kind} endpoint has invalid value for `{key}`: {value}")]
    InvalidValue {
        kind: AdapterKind,
        key: &'static str,
        value: String,
    },

    #[error("{kind} does not support direction `both`")]
    BothUnsupported { kind: AdapterKind },

    #[error("{kind} adapter is not implemented in this build (byte-level driver is out of scope)")]
    NotImplemented { kind: AdapterKind },

    #[error("i/o error bringing up {kind} endpoint: {source}")]
    Io {
        kind: AdapterKind,
        #[source]
        source: io::Error,
    },
}

/// An input endpoint's blocking read loop (§4.6 `read`).
pub trait InputAdapter: Send {
    /// Reads sentences until the source is exhausted, an I/O error occurs,
    /// or `cancel` is signalled, pushing each onto `central` tagged with
    /// `id`.
    fn run(&mut self, id: EndpointId, central: &Queue, cancel: &CancelToken) -> io::Result<()>;

    /// Releases adapter-private state. Safe to call exactly once; the
    /// endpoint task's RAII guard (§9) guarantees that.
    fn cleanup(&mut self) {}
}

/// An output endpoint's blocking write loop (§4.6 `write`).
pub trait OutputAdapter: Send {
    /// Pulls sentences from `queue` until end-of-stream, writing each one
    /// out.
    fn run(&mut self, queue: &Queue) -> io::Result<()>;

    fn cleanup(&mut self) {}
}

/// What `init` produces for one descriptor (§4.6, §3 "Paired endpoints").
pub enum Built {
    Input(Box<dyn InputAdapter>),
    Output(Box<dyn OutputAdapter>),
    /// A pre-split `Both` transport: the input half owns the underlying
    /// resource, the output half holds a duplicated handle (§5 "Resource
    /// acquisition").
    Both(Box<dyn InputAdapter>, Box<dyn OutputAdapter>),
}

/// Builds the adapter(s) described by `descriptor`.
pub fn build(descriptor: &EndpointDescriptor) -> Result<Built, AdapterError> {
    match descriptor.kind {
        AdapterKind::File => file::build(descriptor),
        AdapterKind::Tcp => tcp::build(descriptor),
        AdapterKind::Serial | AdapterKind::Pty | AdapterKind::Broadcast | AdapterKind::Seatalk => {
            stub::build(descriptor)
        }
    }
}

pub(crate) fn require_in_or_out(
    descriptor: &EndpointDescriptor,
) -> Result<(), AdapterError> {
    if descriptor.direction == ConfigDirection::Both {
        return Err(AdapterError::BothUnsupported {
            kind: descriptor.kind,
        });
    }
    Ok(())
}
