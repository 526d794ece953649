//! Stand-ins for the transports whose byte-level driver work is out of
//! scope (§1): `serial`, `pty`, `broadcast`, `seatalk`. Each still validates
//! the config keys a real driver would need, so a malformed `kplex.conf`
//! fails the same way it would against a full build; only the actual I/O is
//! missing.

use crate::config::{AdapterKind, EndpointDescriptor};

use super::{require_in_or_out, AdapterError, Built};

pub fn build(descriptor: &EndpointDescriptor) -> Result<Built, AdapterError> {
    match descriptor.kind {
        AdapterKind::Serial => {
            descriptor.get("filename").map_err(|_| AdapterError::MissingKey {
                kind: AdapterKind::Serial,
                key: "filename",
            })?;
            descriptor.get("baud").map_err(|_| AdapterError::MissingKey {
                kind: AdapterKind::Serial,
                key: "baud",
            })?;
        }
        AdapterKind::Pty => {
            require_in_or_out(descriptor).ok();
        }
        AdapterKind::Broadcast => {
            descriptor.get("port").map_err(|_| AdapterError::MissingKey {
                kind: AdapterKind::Broadcast,
                key: "port",
            })?;
        }
        AdapterKind::Seatalk => {
            descriptor.get("filename").map_err(|_| AdapterError::MissingKey {
                kind: AdapterKind::Seatalk,
                key: "filename",
            })?;
        }
        AdapterKind::File | AdapterKind::Tcp => unreachable!("handled by their own modules"),
    }

    Err(AdapterError::NotImplemented {
        kind: descriptor.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::config::ConfigDirection;

    fn descriptor(kind: AdapterKind, keys: &[(&str, &str)]) -> EndpointDescriptor {
        let mut map = HashMap::new();
        for (k, v) in keys {
            map.insert(k.to_string(), v.to_string());
        }
        EndpointDescriptor {
            kind,
            direction: ConfigDirection::In,
            keys: map,
        }
    }

    #[test]
    fn serial_missing_baud_reports_missing_key_not_not_implemented() {
        let desc = descriptor(AdapterKind::Serial, &[("filename", "/dev/ttyUSB0")]);
        assert!(matches!(
            build(&desc),
            Err(AdapterError::MissingKey { key: "baud", .. })
        ));
    }

    #[test]
    fn serial_with_full_config_reports_not_implemented() {
        let desc = descriptor(
            AdapterKind::Serial,
            &[("filename", "/dev/ttyUSB0"), ("baud", "4800")],
        );
        assert!(matches!(
            build(&desc),
            Err(AdapterError::NotImplemented { kind: AdapterKind::Serial })
        ));
    }

    #[test]
    fn broadcast_missing_port_reports_missing_key() {
        let desc = descriptor(AdapterKind::Broadcast, &[]);
        assert!(matches!(
            build(&desc),
            Err(AdapterError::MissingKey { key: "port", .. })
        ));
    }

    #[test]
    fn seatalk_reports_not_implemented() {
        let desc = descriptor(AdapterKind::Seatalk, &[("filename", "/dev/ttyUSB1")]);
        assert!(matches!(
            build(&desc),
            Err(AdapterError::NotImplemented { kind: AdapterKind::Seatalk })
        ));
    }
}
