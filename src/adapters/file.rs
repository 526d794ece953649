//! The `file` adapter: plain files as NMEA sources or sinks (§4.6).
//!
//! Supports `in` and `out` only — a regular file has no notion of the
//! shared, duplicable resource a `Both` split needs (§3), unlike a pty,
//! serial line, or socket, so `direction = both` is rejected at `init`.

use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};

use crate::cancel::CancelToken;
use crate::config::{AdapterKind, ConfigDirection, EndpointDescriptor};
use crate::endpoint::EndpointId;
use crate::queue::Queue;
use crate::senblk::{SenBlk, SENMAX};

use super::{require_in_or_out, AdapterError, Built, InputAdapter, OutputAdapter};

pub fn build(descriptor: &EndpointDescriptor) -> Result<Built, AdapterError> {
    require_in_or_out(descriptor)?;
    let filename = descriptor.get("filename").map_err(|_| AdapterError::MissingKey {
        kind: AdapterKind::File,
        key: "filename",
    })?;

    match descriptor.direction {
        ConfigDirection::In => Ok(Built::Input(Box::new(FileInput {
            path: filename.to_string(),
        }))),
        ConfigDirection::Out => Ok(Built::Output(Box::new(FileOutput {
            path: filename.to_string(),
        }))),
        ConfigDirection::Both => unreachable!("rejected by require_in_or_out"),
    }
}

struct FileInput {
    path: String,
}

impl InputAdapter for FileInput {
    fn run(&mut self, id: EndpointId, central: &Queue, cancel: &CancelToken) -> io::Result<()> {
        let file = std::fs::File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let mut line = Vec::new();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                // Source exhausted.
                return Ok(());
            }
            if !line.ends_with(b"\n") {
                // Truncated sentence at EOF without a terminator: discard (§6).
                return Ok(());
            }
            if line.len() > SENMAX {
                warn!("file[{}]: discarding oversized sentence ({} bytes)", self.path, line.len());
                continue;
            }
            central.push(Some(SenBlk::new(&line, Some(id))));
        }
    }
}

struct FileOutput {
    path: String,
}

impl OutputAdapter for FileOutput {
    fn run(&mut self, queue: &Queue) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        loop {
            match queue.next() {
                Some(unit) => {
                    file.write_all(unit.as_bytes())?;
                    file.flush()?;
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
    use std::io::Read;
    use std::sync::Arc;
    use std::thread;
    use tempfile::NamedTempFile;

    fn descriptor(direction: ConfigDirection, filename: &str) -> EndpointDescriptor {
        let mut keys = HashMap::new();
        keys.insert("filename".to_string(), filename.to_string());
        EndpointDescriptor {
            kind: AdapterKind::File,
            direction,
            keys,
        }
    }

    #[test]
    fn both_direction_rejected() {
        let desc = descriptor(ConfigDirection::Both, "/dev/null");
        assert!(matches!(build(&desc), Err(AdapterError::BothUnsupported { .. })));
    }

    #[test]
    fn input_reads_crlf_framed_sentences() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "$HELLO*00\r\n$WORLD*00\r\n").unwrap();

        let desc = descriptor(ConfigDirection::In, tmp.path().to_str().unwrap());
        let built = build(&desc).unwrap();
        let mut input = match built {
            Built::Input(a) => a,
            _ => panic!("expected input adapter"),
        };

        let central = Queue::new(4).unwrap();
        let cancel = CancelToken::new();
        input.run(EndpointId::next(), &central, &cancel).unwrap();

        assert_eq!(central.next().unwrap().as_bytes(), b"$HELLO*00\r\n");
        assert_eq!(central.next().unwrap().as_bytes(), b"$WORLD*00\r\n");
    }

    #[test]
    fn output_writes_every_sentence_in_order() {
        let tmp = NamedTempFile::new().unwrap();
        let desc = descriptor(ConfigDirection::Out, tmp.path().to_str().unwrap());
        let built = build(&desc).unwrap();
        let mut output = match built {
            Built::Output(a) => a,
            _ => panic!("expected output adapter"),
        };

        let queue = Arc::new(Queue::new(4).unwrap());
        queue.push(Some(SenBlk::new(b"$A*00\r\n", None)));
        queue.push(Some(SenBlk::new(b"$B*00\r\n", None)));
        queue.push(None);

        let q2 = queue.clone();
        let handle = thread::spawn(move || output.run(&q2));
        handle.join().unwrap().unwrap();

        let mut contents = String::new();
        std::fs::File::open(tmp.path()).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "$A*00\r\n$B*00\r\n");
    }
}
