//! The `tcp` adapter: TCP sockets as NMEA sources, sinks, or (via
//! `direction = both`) a single connection split into an input half and an
//! output half that share one underlying socket (§3 "Paired endpoints").
//!
//! The input half owns the original [`TcpStream`]; the output half holds a
//! `try_clone`d duplicate, mirroring the "duplicated file descriptor"
//! language in §5 — neither half needs to restore any device state at
//! cleanup, so closing simply happens when each stream is dropped.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::{AdapterKind, ConfigDirection, EndpointDescriptor};
use crate::endpoint::EndpointId;
use crate::queue::Queue;
use crate::senblk::{SenBlk, SENMAX};

use super::{AdapterError, Built, InputAdapter, OutputAdapter};

/// How often a blocking read times out so the input half can recheck its
/// cancellation token (§5 "Cancellation / termination").
const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn addr_of(descriptor: &EndpointDescriptor) -> Result<&str, AdapterError> {
    descriptor.get("addr").map_err(|_| AdapterError::MissingKey {
        kind: AdapterKind::Tcp,
        key: "addr",
    })
}

fn mode_of(descriptor: &EndpointDescriptor) -> Result<&str, AdapterError> {
    let mode = descriptor.get("mode").map_err(|_| AdapterError::MissingKey {
        kind: AdapterKind::Tcp,
        key: "mode",
    })?;
    match mode {
        "connect" | "listen" => Ok(mode),
        other => Err(AdapterError::InvalidValue {
            kind: AdapterKind::Tcp,
            key: "mode",
            value: other.to_string(),
        }),
    }
}

fn open_stream(addr: &str, mode: &str) -> io::Result<TcpStream> {
    match mode {
        "connect" => TcpStream::connect(addr),
        _ => {
            let listener = TcpListener::bind(addr)?;
            let (stream, _) = listener.accept()?;
            Ok(stream)
        }
    }
}

pub fn build(descriptor: &EndpointDescriptor) -> Result<Built, AdapterError> {
    let addr = addr_of(descriptor)?.to_string();
    let mode = mode_of(descriptor)?.to_string();

    let wrap_io = |e: io::Error| AdapterError::Io {
        kind: AdapterKind::Tcp,
        source: e,
    };

    match descriptor.direction {
        ConfigDirection::In => {
            let stream = open_stream(&addr, &mode).map_err(wrap_io)?;
            stream.set_read_timeout(Some(POLL_INTERVAL)).map_err(wrap_io)?;
            Ok(Built::Input(Box::new(TcpInput { stream })))
        }
        ConfigDirection::Out => {
            let stream = open_stream(&addr, &mode).map_err(wrap_io)?;
            Ok(Built::Output(Box::new(TcpOutput { stream })))
        }
        ConfigDirection::Both => {
            let stream = open_stream(&addr, &mode).map_err(wrap_io)?;
            stream.set_read_timeout(Some(POLL_INTERVAL)).map_err(wrap_io)?;
            let write_half = stream.try_clone().map_err(wrap_io)?;
            Ok(Built::Both(
                Box::new(TcpInput { stream }),
                Box::new(TcpOutput { stream: write_half }),
            ))
        }
    }
}

struct TcpInput {
    stream: TcpStream,
}

impl InputAdapter for TcpInput {
    fn run(&mut self, id: EndpointId, central: &Queue, cancel: &CancelToken) -> io::Result<()> {
        let mut reader = BufReader::new(&self.stream);
        let mut line = Vec::new();
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => return Ok(()),
                Ok(_) if line.ends_with(b"\n") => {
                    if line.len() <= SENMAX {
                        central.push(Some(SenBlk::new(&line, Some(id))));
                    } else {
                        warn!("tcp: discarding oversized sentence ({} bytes)", line.len());
                    }
                    line.clear();
                }
                Ok(_) => {
                    // EOF reached mid-sentence: truncated, discard (§6).
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

struct TcpOutput {
    stream: TcpStream,
}

impl OutputAdapter for TcpOutput {
    fn run(&mut self, queue: &Queue) -> io::Result<()> {
        loop {
            match queue.next() {
                Some(unit) => {
                    self.stream.write_all(unit.as_bytes())?;
                    self.stream.flush()?;
                }
                None => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    fn descriptor(direction: ConfigDirection, addr: &str, mode: &str) -> EndpointDescriptor {
        let mut keys = HashMap::new();
        keys.insert("addr".to_string(), addr.to_string());
        keys.insert("mode".to_string(), mode.to_string());
        EndpointDescriptor {
            kind: AdapterKind::Tcp,
            direction,
            keys,
        }
    }

    #[test]
    fn input_connect_reads_sentences() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let writer = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"$A*00\r\n$B*00\r\n").unwrap();
        });

        let desc = descriptor(ConfigDirection::In, &addr, "connect");
        let mut input = match build(&desc).unwrap() {
            Built::Input(a) => a,
            _ => panic!("expected input"),
        };
        let central = Queue::new(4).unwrap();
        let cancel = CancelToken::new();
        // A real reader returns once the peer closes the connection (EOF).
        let id = EndpointId::next();
        let done = {
            let central = &central;
            thread::scope(|s| {
                s.spawn(|| input.run(id, central, &cancel)).join().unwrap()
            })
        };
        writer.join().unwrap();
        done.unwrap();

        assert_eq!(central.next().unwrap().as_bytes(), b"$A*00\r\n");
        assert_eq!(central.next().unwrap().as_bytes(), b"$B*00\r\n");
    }

    #[test]
    fn both_split_shares_one_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let peer = thread::spawn(move || listener.accept().unwrap().0);

        let desc = descriptor(ConfigDirection::Both, &addr, "connect");
        let built = build(&desc).unwrap();
        let (input, output) = match built {
            Built::Both(i, o) => (i, o),
            _ => panic!("expected both"),
        };
        let _ = (input, output);
        peer.join().unwrap();
    }

    #[test]
    fn output_writes_to_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let reader = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            use std::io::Read;
            sock.read_to_end(&mut buf).unwrap();
            buf
        });

        let desc = descriptor(ConfigDirection::Out, &addr, "connect");
        let mut output = match build(&desc).unwrap() {
            Built::Output(a) => a,
            _ => panic!("expected output"),
        };
        let queue = Arc::new(Queue::new(4).unwrap());
        queue.push(Some(SenBlk::new(b"$A*00\r\n", None)));
        queue.push(None);
        output.run(&queue).unwrap();
        drop(output);

        let received = reader.join().unwrap();
        assert_eq!(received, b"$A*00\r\n");
    }
}
