//! The unit of data carried through the multiplexer: one NMEA-0183-style
//! sentence plus the identity of the endpoint that produced it.

use crate::endpoint::EndpointId;

/// Maximum sentence length, including the terminating CR LF.
///
/// Sized for a maximal NMEA-0183 sentence (82 bytes per the standard) with
/// headroom for talkers that exceed it in practice.
pub const SENMAX: usize = 96;

/// One sentence, tagged with its producing endpoint.
///
/// `src` is used only by the loop-prevention rule in the engine (§4.2); it is
/// never used to route or own the endpoint.
#[derive(Clone)]
pub struct SenBlk {
    data: [u8; SENMAX],
    len: usize,
    pub src: Option<EndpointId>,
}

impl SenBlk {
    /// Builds a sentence from a byte slice, truncating silently if `bytes`
    /// exceeds `SENMAX` (the framing policy in §6: oversized sentences are
    /// discarded by the reader before they ever reach a `SenBlk`, so this is
    /// a defensive clamp, not the primary enforcement point).
    pub fn new(bytes: &[u8], src: Option<EndpointId>) -> SenBlk {
        let len = bytes.len().min(SENMAX);
        let mut data = [0u8; SENMAX];
        data[..len].copy_from_slice(&bytes[..len]);
        SenBlk { data, len, src }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for SenBlk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenBlk")
            .field("len", &self.len)
            .field("src", &self.src)
            .field("data", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_oversize_payload() {
        let long = vec![b'x'; SENMAX + 10];
        let blk = SenBlk::new(&long, None);
        assert_eq!(blk.len(), SENMAX);
    }

    #[test]
    fn roundtrips_bytes() {
        let blk = SenBlk::new(b"$HELLO*00\r\n", None);
        assert_eq!(blk.as_bytes(), b"$HELLO*00\r\n");
    }
}
