//! `kplexrs`: an any-to-any multiplexer for NMEA-0183 marine sentence
//! streams. One central queue collects sentences from every input
//! endpoint; the Engine fans each one out to every output endpoint except
//! the output half of whichever paired transport it arrived on.

#[macro_use]
extern crate log;

pub mod adapters;
pub mod cancel;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod queue;
pub mod router;
pub mod senblk;
pub mod signal;
pub mod supervisor;

pub use error::KplexError;
