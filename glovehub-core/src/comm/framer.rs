//! Frame encoding into, and resynchronizing decoding out of, ring buffers
//!
//! These functions assume the caller holds exclusive access to the buffer
//! for the whole call. [`crate::comm::Comm`] provides that.

use glovehub_protocol::frame::{frame_len, header};
use glovehub_protocol::{
    Frame, FrameError, FOOTER_LEN, FRAME_END, FRAME_OVERHEAD, FRAME_START, HEADER_LEN,
    LENGTH_OFFSET, MAX_FRAME_SIZE,
};

use crate::ring_buffer::{RingBuffer, RingError};

/// Default sanity bound on a received LENGTH byte
pub const DEFAULT_MAX_FRAME_LEN: usize = 100;

impl From<RingError> for FrameError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::Overflow => FrameError::WouldBlock,
            RingError::Underflow => FrameError::Incomplete,
        }
    }
}

/// Enqueue one whole frame carrying `payload`
///
/// Either the full frame lands in `tx` or nothing does. Fails with
/// `WouldBlock` when there is not enough free space right now and with
/// `BufferTooSmall` when the frame could never fit.
pub fn encode<const N: usize>(tx: &mut RingBuffer<N>, payload: &[u8]) -> Result<(), FrameError> {
    let header = header(payload.len())?;
    let len = frame_len(payload.len());
    if len > N {
        return Err(FrameError::BufferTooSmall);
    }
    if len > tx.bytes_free() {
        return Err(FrameError::WouldBlock);
    }

    tx.enqueue(&header)?;
    tx.enqueue(payload)?;
    tx.enqueue(&[FRAME_END])?;
    Ok(())
}

/// Extract the next valid frame from `rx`
///
/// Garbage before a START byte stays buffered until a START shows up, so
/// raw-byte readers (`get_byte`, `get_line`) can still consume it. A ring
/// filled with bytes that never include a START is not freed here; every
/// later RX batch is then dropped until those bytes are read out.
/// A LENGTH at or above `max_frame_len` (or too short to hold the markers)
/// discards the START byte and scanning resumes right after it. A frame
/// whose END is not where LENGTH says discards its START byte the same
/// way. Returns `None` when no complete frame is buffered yet.
pub fn decode<const N: usize>(rx: &mut RingBuffer<N>, max_frame_len: usize) -> Option<Frame> {
    // A frame longer than the buffer would never complete
    let bound = max_frame_len.min(N + 1).min(MAX_FRAME_SIZE + 1);

    loop {
        let start = rx.find_byte(FRAME_START, 0);
        if start == rx.bytes_used() {
            return None;
        }
        rx.remove_from_tail(start);

        if rx.bytes_used() < HEADER_LEN {
            return None;
        }

        let len = rx.peek(LENGTH_OFFSET)? as usize;
        if len >= bound || len < FRAME_OVERHEAD {
            rx.remove_from_tail(1);
            continue;
        }

        if rx.bytes_used() < len {
            return None;
        }

        if rx.peek(len - FOOTER_LEN)? != FRAME_END {
            rx.remove_from_tail(LENGTH_OFFSET);
            continue;
        }

        rx.remove_from_tail(HEADER_LEN);
        let mut frame = Frame::empty();
        frame.payload.resize(len - FRAME_OVERHEAD, 0).ok()?;
        rx.dequeue(&mut frame.payload[..]).ok()?;
        rx.remove_from_tail(FOOTER_LEN);
        return Some(frame);
    }
}
