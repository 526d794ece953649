//! End-to-end lifecycle scenarios (§8), driven through the public
//! `supervisor::run` entry point with `file` endpoints so no network
//! fixture is needed, plus one `tcp` `direction=both` scenario for
//! loop prevention.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use kplexrs::config::{AdapterKind, ConfigDirection, EndpointDescriptor, GlobalConfig, ParsedConfig};
use tempfile::NamedTempFile;

fn file_endpoint(direction: ConfigDirection, path: &str) -> EndpointDescriptor {
    let mut keys = HashMap::new();
    keys.insert("filename".to_string(), path.to_string());
    EndpointDescriptor {
        kind: AdapterKind::File,
        direction,
        keys,
    }
}

#[test]
fn fan_out_splits_one_input_to_two_file_outputs() {
    let input = NamedTempFile::new().unwrap();
    fs::write(input.path(), "$A*00\r\n$B*00\r\n").unwrap();
    let out1 = NamedTempFile::new().unwrap();
    let out2 = NamedTempFile::new().unwrap();

    let config = ParsedConfig {
        global: GlobalConfig {
            qsize: Some(8),
            ..Default::default()
        },
        endpoints: vec![
            file_endpoint(ConfigDirection::In, input.path().to_str().unwrap()),
            file_endpoint(ConfigDirection::Out, out1.path().to_str().unwrap()),
            file_endpoint(ConfigDirection::Out, out2.path().to_str().unwrap()),
        ],
    };

    kplexrs::supervisor::run(config).unwrap();

    let expected = "$A*00\r\n$B*00\r\n";
    assert_eq!(fs::read_to_string(out1.path()).unwrap(), expected);
    assert_eq!(fs::read_to_string(out2.path()).unwrap(), expected);
}

#[test]
fn last_input_exhausted_closes_the_single_output() {
    let in1 = NamedTempFile::new().unwrap();
    fs::write(in1.path(), "$A*00\r\n").unwrap();
    let in2 = NamedTempFile::new().unwrap();
    fs::write(in2.path(), "$B*00\r\n").unwrap();
    let out = NamedTempFile::new().unwrap();

    let config = ParsedConfig {
        global: GlobalConfig {
            qsize: Some(8),
            ..Default::default()
        },
        endpoints: vec![
            file_endpoint(ConfigDirection::In, in1.path().to_str().unwrap()),
            file_endpoint(ConfigDirection::In, in2.path().to_str().unwrap()),
            file_endpoint(ConfigDirection::Out, out.path().to_str().unwrap()),
        ],
    };

    kplexrs::supervisor::run(config).unwrap();

    let contents = fs::read_to_string(out.path()).unwrap();
    let lines: HashSet<&str> = contents.lines().collect();
    let expected: HashSet<&str> = ["$A*00\r", "$B*00\r"].into_iter().collect();
    assert_eq!(lines, expected);
}

#[test]
fn no_output_endpoints_still_terminates() {
    let input = NamedTempFile::new().unwrap();
    fs::write(input.path(), "$A*00\r\n").unwrap();

    let config = ParsedConfig {
        global: GlobalConfig {
            qsize: Some(8),
            ..Default::default()
        },
        endpoints: vec![file_endpoint(ConfigDirection::In, input.path().to_str().unwrap())],
    };

    kplexrs::supervisor::run(config).unwrap();
}

fn tcp_endpoint(direction: ConfigDirection, addr: &str, mode: &str) -> EndpointDescriptor {
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
fn tcp_both_split_never_echoes_back_to_its_own_peer() {
    // A fixture listener plays the role of the external peer the `both`
    // endpoint dials into; it is not itself under test.
    let peer_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let peer_addr = peer_listener.local_addr().unwrap().to_string();

    let out = NamedTempFile::new().unwrap();

    let config = ParsedConfig {
        global: GlobalConfig {
            qsize: Some(8),
            ..Default::default()
        },
        endpoints: vec![
            tcp_endpoint(ConfigDirection::Both, &peer_addr, "connect"),
            file_endpoint(ConfigDirection::Out, out.path().to_str().unwrap()),
        ],
    };

    let supervisor = thread::spawn(move || kplexrs::supervisor::run(config));

    let (mut peer, _) = peer_listener.accept().unwrap();
    peer.write_all(b"$LOOP*00\r\n").unwrap();

    // No echo should arrive back on the same socket: the engine must skip
    // the `both` endpoint's own output half when dispatching a unit that
    // originated from its paired input half.
    peer.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
    let mut buf = [0u8; 16];
    let err = peer.read(&mut buf).unwrap_err();
    assert!(matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    ));

    // Closing the peer's half of the connection lets the `both` endpoint's
    // input half observe EOF and unwind the whole supervisor.
    drop(peer);
    supervisor.join().unwrap().unwrap();

    assert_eq!(fs::read_to_string(out.path()).unwrap(), "$LOOP*00\r\n");
}
