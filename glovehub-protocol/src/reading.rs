//! Sensor readings and node reply layout
//!
//! A sensor node exposes a reply buffer on the bus:
//!
//! ```text
//! ┌──────────────────────┬───────────────────┬──────────────────────┐
//! │ HEADER               │ TIMESTAMP         │ TAXELS               │
//! │ ready marker @ 0     │ 0 or 4B, LE       │ 2B per taxel, LE     │
//! └──────────────────────┴───────────────────┴──────────────────────┘
//! ```
//!
//! Only the marker tells a finished acquisition apart from a buffer the
//! node is still filling; there is no checksum.
//!
//! The hub forwards a validated reply to the host as a reading payload:
//!
//! ```text
//! ┌─────────┬───────────────────┬──────────────────────┐
//! │ ADDRESS │ TIMESTAMP         │ TAXELS               │
//! │ 1B      │ 0 or 4B, LE       │ copied verbatim      │
//! └─────────┴───────────────────┴──────────────────────┘
//! ```

use crate::frame::{FrameError, MAX_PAYLOAD_SIZE};

/// Timestamp width when a node reports one
pub const TIMESTAMP_LEN: usize = 4;

/// Every taxel is reported as a little-endian u16 raw count
pub const BYTES_PER_TAXEL: usize = 2;

/// Sensor address tag at the start of a reading payload
pub const ADDRESS_TAG_LEN: usize = 1;

/// Marker a node writes at offset 0 once its reply buffer is complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadyMarker {
    /// Single marker byte
    Byte(u8),
    /// Little-endian state word
    Word(u16),
}

impl ReadyMarker {
    /// Bytes the marker occupies
    pub const fn len(&self) -> usize {
        match self {
            ReadyMarker::Byte(_) => 1,
            ReadyMarker::Word(_) => 2,
        }
    }

    /// Whether `reply` starts with this marker
    pub fn matches(&self, reply: &[u8]) -> bool {
        match *self {
            ReadyMarker::Byte(b) => reply.first() == Some(&b),
            ReadyMarker::Word(w) => reply.get(..2) == Some(&w.to_le_bytes()[..]),
        }
    }

    /// Write the marker at the start of `out`
    pub fn write(&self, out: &mut [u8]) {
        match *self {
            ReadyMarker::Byte(b) => out[0] = b,
            ReadyMarker::Word(w) => out[..2].copy_from_slice(&w.to_le_bytes()),
        }
    }
}

/// Layout of a sensor node's reply buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReplyFormat {
    /// Marker identifying a complete reply
    pub marker: ReadyMarker,
    /// Bytes reserved for the header (marker plus padding)
    pub header_len: usize,
    /// Timestamp bytes following the header (0 or [`TIMESTAMP_LEN`])
    pub timestamp_len: usize,
}

impl ReplyFormat {
    /// Polled nodes: ready byte 0x01 in a 4-byte header, then a 4-byte
    /// node timestamp
    pub const TIMESTAMPED: Self = Self {
        marker: ReadyMarker::Byte(0x01),
        header_len: 4,
        timestamp_len: TIMESTAMP_LEN,
    };

    /// Broadcast-triggered nodes: one u16 state word set to 0xFFFE when
    /// the scan results are in place, no timestamp
    pub const STATE_WORD: Self = Self {
        marker: ReadyMarker::Word(0xFFFE),
        header_len: 2,
        timestamp_len: 0,
    };

    /// Bus read length for a node with `width` payload bytes
    pub const fn reply_len(&self, width: usize) -> usize {
        self.header_len + self.timestamp_len + width
    }

    /// Reading payload length (address tag, timestamp, data) for `width`
    pub const fn reading_len(&self, width: usize) -> usize {
        ADDRESS_TAG_LEN + self.timestamp_len + width
    }

    /// Widest device payload whose reading still fits in one frame
    pub const fn max_width(&self) -> usize {
        MAX_PAYLOAD_SIZE - ADDRESS_TAG_LEN - self.timestamp_len
    }

    /// Whether `reply` carries the ready marker
    pub fn is_ready(&self, reply: &[u8]) -> bool {
        self.marker.matches(reply)
    }

    /// Extract the reading from a complete reply
    ///
    /// `reply` must be exactly [`ReplyFormat::reply_len`] bytes long.
    pub fn reading<'a>(&self, address: u8, reply: &'a [u8]) -> Result<Reading<'a>, FrameError> {
        if reply.len() < self.header_len + self.timestamp_len {
            return Err(FrameError::Incomplete);
        }
        let data_start = self.header_len + self.timestamp_len;
        let timestamp = if self.timestamp_len == TIMESTAMP_LEN {
            let mut ts = [0u8; TIMESTAMP_LEN];
            ts.copy_from_slice(&reply[self.header_len..data_start]);
            Some(u32::from_le_bytes(ts))
        } else {
            None
        };

        Ok(Reading {
            address,
            timestamp,
            payload: &reply[data_start..],
        })
    }
}

impl Default for ReplyFormat {
    fn default() -> Self {
        Self::TIMESTAMPED
    }
}

/// One sensor node's data, on its way from the bus to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading<'a> {
    /// Bus address of the node, used as the reading's tag
    pub address: u8,
    /// Node-side timestamp, when the node reports one
    pub timestamp: Option<u32>,
    /// Raw taxel bytes
    pub payload: &'a [u8],
}

impl<'a> Reading<'a> {
    /// Length of this reading as a frame payload
    pub fn encoded_len(&self) -> usize {
        let ts = if self.timestamp.is_some() { TIMESTAMP_LEN } else { 0 };
        ADDRESS_TAG_LEN + ts + self.payload.len()
    }

    /// Serialize into a frame payload
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.encoded_len();
        if len > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = self.address;
        let mut pos = ADDRESS_TAG_LEN;
        if let Some(ts) = self.timestamp {
            buffer[pos..pos + TIMESTAMP_LEN].copy_from_slice(&ts.to_le_bytes());
            pos += TIMESTAMP_LEN;
        }
        buffer[pos..len].copy_from_slice(self.payload);

        Ok(len)
    }

    /// Parse a frame payload back into a reading
    ///
    /// The frame does not say whether a timestamp is present; the host
    /// knows it from the hub's reply format.
    pub fn parse(payload: &'a [u8], has_timestamp: bool) -> Result<Self, FrameError> {
        let ts_len = if has_timestamp { TIMESTAMP_LEN } else { 0 };
        if payload.len() < ADDRESS_TAG_LEN + ts_len {
            return Err(FrameError::InvalidFrame);
        }

        let timestamp = if has_timestamp {
            let mut ts = [0u8; TIMESTAMP_LEN];
            ts.copy_from_slice(&payload[ADDRESS_TAG_LEN..ADDRESS_TAG_LEN + TIMESTAMP_LEN]);
            Some(u32::from_le_bytes(ts))
        } else {
            None
        };

        Ok(Self {
            address: payload[0],
            timestamp,
            payload: &payload[ADDRESS_TAG_LEN + ts_len..],
        })
    }

    /// Number of whole taxels in the payload
    pub fn taxel_count(&self) -> usize {
        self.payload.len() / BYTES_PER_TAXEL
    }

    /// Raw value of one taxel
    pub fn taxel(&self, index: usize) -> Option<u16> {
        let start = index * BYTES_PER_TAXEL;
        let bytes = self.payload.get(start..start + BYTES_PER_TAXEL)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_matching() {
        assert!(ReadyMarker::Byte(0x01).matches(&[0x01, 0, 0]));
        assert!(!ReadyMarker::Byte(0x01).matches(&[0x00]));
        assert!(!ReadyMarker::Byte(0x01).matches(&[]));

        assert!(ReadyMarker::Word(0xFFFE).matches(&[0xFE, 0xFF, 0x10]));
        assert!(!ReadyMarker::Word(0xFFFE).matches(&[0xFF, 0xFE]));
        assert!(!ReadyMarker::Word(0xFFFE).matches(&[0xFE]));
    }

    #[test]
    fn test_marker_write() {
        let mut buf = [0u8; 3];
        ReadyMarker::Word(0xFFFE).write(&mut buf);
        assert_eq!(buf, [0xFE, 0xFF, 0x00]);
        assert_eq!(ReadyMarker::Word(0xFFFE).len(), 2);
    }

    #[test]
    fn test_reply_lengths() {
        // 67 taxels on the thumb tip
        let width = 67 * BYTES_PER_TAXEL;
        assert_eq!(ReplyFormat::TIMESTAMPED.reply_len(width), 142);
        assert_eq!(ReplyFormat::TIMESTAMPED.reading_len(width), 139);
        assert_eq!(ReplyFormat::STATE_WORD.reply_len(width), 136);
        assert_eq!(ReplyFormat::STATE_WORD.reading_len(width), 135);
    }

    #[test]
    fn test_reading_from_timestamped_reply() {
        let reply = [0x01, 0, 0, 0, 0x78, 0x56, 0x34, 0x12, 0x10, 0x00, 0x20, 0x01];
        let fmt = ReplyFormat::TIMESTAMPED;
        assert!(fmt.is_ready(&reply));

        let reading = fmt.reading(0x17, &reply).unwrap();
        assert_eq!(reading.address, 0x17);
        assert_eq!(reading.timestamp, Some(0x1234_5678));
        assert_eq!(reading.payload, &[0x10, 0x00, 0x20, 0x01]);
        assert_eq!(reading.taxel_count(), 2);
        assert_eq!(reading.taxel(1), Some(0x0120));
        assert_eq!(reading.taxel(2), None);
    }

    #[test]
    fn test_reading_encode_parse() {
        let reading = Reading {
            address: 0x0C,
            timestamp: Some(1000),
            payload: &[1, 0, 2, 0],
        };
        let mut buf = [0u8; 16];
        let len = reading.encode(&mut buf).unwrap();
        assert_eq!(len, 9);
        assert_eq!(&buf[..len], &[0x0C, 0xE8, 0x03, 0, 0, 1, 0, 2, 0]);

        let parsed = Reading::parse(&buf[..len], true).unwrap();
        assert_eq!(parsed, reading);
    }

    #[test]
    fn test_reading_without_timestamp() {
        let reading = Reading {
            address: 0x17,
            timestamp: None,
            payload: &[0xAA, 0xBB, 0xCC, 0xDD],
        };
        let mut buf = [0u8; 8];
        assert_eq!(reading.encode(&mut buf), Ok(5));
        assert_eq!(&buf[..5], &[0x17, 0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_reading_too_wide() {
        let data = [0u8; MAX_PAYLOAD_SIZE];
        let reading = Reading {
            address: 1,
            timestamp: None,
            payload: &data,
        };
        let mut buf = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(reading.encode(&mut buf), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_parse_short_payload() {
        assert_eq!(Reading::parse(&[0x17, 1, 2], true), Err(FrameError::InvalidFrame));
        assert!(Reading::parse(&[0x17], false).is_ok());
    }

    #[test]
    fn test_max_width() {
        assert_eq!(ReplyFormat::STATE_WORD.max_width(), 251);
        assert_eq!(ReplyFormat::TIMESTAMPED.max_width(), 247);
    }
}
