//! Frame encoding and decoding for the host link.
//!
//! Frame format:
//! - START (1 byte): 0x01 synchronization byte
//! - LENGTH (1 byte): total frame length, START and END included (3-255)
//! - PAYLOAD (0-252 bytes): reading data
//! - END (1 byte): b'\n'
//!
//! There is no checksum. A receiver validates a frame by finding END
//! exactly where LENGTH says it should be, and resynchronizes on the next
//! START when it is not.

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0x01;

/// Frame terminator byte
pub const FRAME_END: u8 = b'\n';

/// Terminator for plain text lines on the same link
pub const LINE_TERMINATOR: u8 = b'\n';

/// START + LENGTH
pub const HEADER_LEN: usize = 2;

/// END
pub const FOOTER_LEN: usize = 1;

/// Bytes a frame adds around its payload
pub const FRAME_OVERHEAD: usize = HEADER_LEN + FOOTER_LEN;

/// Offset of the LENGTH field from START
pub const LENGTH_OFFSET: usize = 1;

/// Largest frame LENGTH can describe
pub const MAX_FRAME_SIZE: usize = u8::MAX as usize;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - FRAME_OVERHEAD;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Not enough room right now; retry later
    WouldBlock,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Invalid frame structure
    InvalidFrame,
}

/// Total on-wire length of a frame carrying `payload_len` bytes
pub const fn frame_len(payload_len: usize) -> usize {
    payload_len + FRAME_OVERHEAD
}

/// Build the START/LENGTH header for a payload of `payload_len` bytes
pub fn header(payload_len: usize) -> Result<[u8; HEADER_LEN], FrameError> {
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }
    Ok([FRAME_START, frame_len(payload_len) as u8])
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame carrying the given payload
    pub fn new(payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty() -> Self {
        Self {
            payload: Vec::new(),
        }
    }

    /// On-wire length of this frame
    pub fn len(&self) -> usize {
        frame_len(self.payload.len())
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let end = HEADER_LEN + self.payload.len();
        buffer[..HEADER_LEN].copy_from_slice(&header(self.payload.len())?);
        buffer[HEADER_LEN..end].copy_from_slice(&self.payload);
        buffer[end] = FRAME_END;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode one frame starting at the first byte of `bytes`
    ///
    /// Returns the frame and the number of bytes it occupied. This does
    /// not resynchronize: callers holding a stream should skip to the next
    /// [`FRAME_START`] on `InvalidFrame`.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::Incomplete);
        }
        if bytes[0] != FRAME_START {
            return Err(FrameError::InvalidFrame);
        }

        let len = bytes[LENGTH_OFFSET] as usize;
        if len < FRAME_OVERHEAD {
            return Err(FrameError::InvalidFrame);
        }
        if bytes.len() < len {
            return Err(FrameError::Incomplete);
        }
        if bytes[len - 1] != FRAME_END {
            return Err(FrameError::InvalidFrame);
        }

        let frame = Self::new(&bytes[HEADER_LEN..len - FOOTER_LEN])?;
        Ok((frame, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty();
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 3);
        assert_eq!(buffer[0], FRAME_START);
        assert_eq!(buffer[1], 3); // length counts both markers
        assert_eq!(buffer[2], FRAME_END);
    }

    #[test]
    fn test_frame_encode_with_payload() {
        let frame = Frame::new(&[0x17, 0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        assert_eq!(
            encoded.as_slice(),
            &[FRAME_START, 8, 0x17, 0xAA, 0xBB, 0xCC, 0xDD, FRAME_END]
        );
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let frame = Frame::new(&[1, 2, 3]).unwrap();
        let mut buffer = [0u8; 5];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Frame::new(&large_payload), Err(FrameError::PayloadTooLarge));
        assert_eq!(header(MAX_PAYLOAD_SIZE + 1), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_largest_frame_fits_length_byte() {
        assert_eq!(header(MAX_PAYLOAD_SIZE), Ok([FRAME_START, 255]));
    }

    #[test]
    fn test_decode_incomplete() {
        let encoded = Frame::new(&[9, 9, 9]).unwrap().encode_to_vec().unwrap();
        assert_eq!(Frame::decode(&encoded[..1]), Err(FrameError::Incomplete));
        assert_eq!(Frame::decode(&encoded[..4]), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_decode_rejects_misplaced_end() {
        let mut encoded = Frame::new(&[1, 2]).unwrap().encode_to_vec().unwrap();
        let last = encoded.len() - 1;
        encoded[last] = 0x00;
        assert_eq!(Frame::decode(&encoded), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_decode_rejects_short_length() {
        assert_eq!(
            Frame::decode(&[FRAME_START, 2, FRAME_END]),
            Err(FrameError::InvalidFrame)
        );
    }

    #[test]
    fn test_decode_leaves_trailing_bytes() {
        let mut stream = Frame::new(&[7]).unwrap().encode_to_vec().unwrap();
        stream.extend_from_slice(&[FRAME_START, 3]).unwrap();

        let (frame, used) = Frame::decode(&stream).unwrap();
        assert_eq!(frame.payload.as_slice(), &[7]);
        assert_eq!(used, 4);
    }

    proptest! {
        #[test]
        fn prop_encode_decode_roundtrip(
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let frame = Frame::new(&payload).unwrap();
            let encoded = frame.encode_to_vec().unwrap();
            prop_assert_eq!(encoded.len(), payload.len() + FRAME_OVERHEAD);

            let (decoded, used) = Frame::decode(&encoded).unwrap();
            prop_assert_eq!(used, encoded.len());
            prop_assert_eq!(decoded.payload.as_slice(), payload.as_slice());
        }
    }
}
