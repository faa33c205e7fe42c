//! Host link communication
//!
//! [`Comm`] owns the RX and TX ring buffers shared between the periodic
//! comm tick (which runs [`Transport::service`]) and mainline code (which
//! enqueues frames and reads messages). Every access goes through one
//! blocking mutex, so the tick never observes a half-written frame and
//! mainline never observes a half-ingested RX batch.
//!
//! On the hub the mutex is a `CriticalSectionRawMutex` and the tick runs
//! on a higher-priority executor; host tests use `NoopRawMutex`.

mod framer;
mod transport;

pub use framer::{decode, encode, DEFAULT_MAX_FRAME_LEN};
pub use transport::{
    Transport, TransportStats, DEFAULT_COMM_INTERRUPT_HZ, MAX_PACKET_SIZE, MAX_TX_REJECTS,
};

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use glovehub_hal::SerialLink;
use glovehub_protocol::{Frame, FrameError, LINE_TERMINATOR};

use crate::ring_buffer::RingBuffer;

#[cfg(test)]
pub(crate) use transport::tests::MockLink;

/// Default RX ring capacity
pub const DEFAULT_RX_CAPACITY: usize = 300;

/// Default TX ring capacity
pub const DEFAULT_TX_CAPACITY: usize = 300;

/// The two link buffers, always locked together
pub struct CommBuffers<const RX: usize, const TX: usize> {
    pub rx: RingBuffer<RX>,
    pub tx: RingBuffer<TX>,
}

/// Shared communication context
pub struct Comm<M: RawMutex, const RX: usize, const TX: usize> {
    buffers: Mutex<M, RefCell<CommBuffers<RX, TX>>>,
    max_frame_len: usize,
}

impl<M: RawMutex, const RX: usize, const TX: usize> Comm<M, RX, TX> {
    /// Create a context with the default decode bound
    pub const fn new(raw: M) -> Self {
        Self::with_max_frame_len(raw, DEFAULT_MAX_FRAME_LEN)
    }

    /// Create a context rejecting received frames of `max_frame_len`
    /// bytes or longer
    pub const fn with_max_frame_len(raw: M, max_frame_len: usize) -> Self {
        Self {
            buffers: Mutex::const_new(
                raw,
                RefCell::new(CommBuffers {
                    rx: RingBuffer::new(),
                    tx: RingBuffer::new(),
                }),
            ),
            max_frame_len,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut CommBuffers<RX, TX>) -> R) -> R {
        self.buffers.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Run one comm tick against both buffers
    pub fn service<L: SerialLink>(&self, transport: &mut Transport<L>) {
        self.with(|b| transport.service(&mut b.rx, &mut b.tx));
    }

    /// Enqueue a frame if it fits right now
    pub fn try_put_message(&self, payload: &[u8]) -> Result<(), FrameError> {
        self.with(|b| encode(&mut b.tx, payload))
    }

    /// Enqueue a frame, spinning until the comm tick has drained enough
    /// of the TX ring
    ///
    /// The lock is released between attempts. If the tick is not running
    /// this never returns.
    pub fn put_message(&self, payload: &[u8]) -> Result<(), FrameError> {
        loop {
            match self.try_put_message(payload) {
                Err(FrameError::WouldBlock) => core::hint::spin_loop(),
                result => return result,
            }
        }
    }

    /// Dequeue the next valid received frame
    pub fn get_message(&self) -> Option<Frame> {
        let bound = self.max_frame_len;
        self.with(|b| decode(&mut b.rx, bound))
    }

    /// Enqueue one raw byte, spinning while the TX ring is full
    pub fn put_byte(&self, byte: u8) {
        while self.with(|b| b.tx.enqueue(&[byte]).is_err()) {
            core::hint::spin_loop();
        }
    }

    /// Dequeue one raw received byte
    pub fn get_byte(&self) -> Option<u8> {
        self.with(|b| {
            let mut byte = [0u8; 1];
            b.rx.dequeue(&mut byte).ok().map(|_| byte[0])
        })
    }

    /// Enqueue `line` followed by the line terminator
    ///
    /// Spins until the whole line fits, so a line is never interleaved
    /// with a frame.
    pub fn put_line(&self, line: &[u8]) -> Result<(), FrameError> {
        let len = line.len() + 1;
        if len > TX {
            return Err(FrameError::BufferTooSmall);
        }

        loop {
            let done = self.with(|b| {
                if b.tx.bytes_free() < len {
                    return false;
                }
                b.tx.enqueue(line).is_ok() && b.tx.enqueue(&[LINE_TERMINATOR]).is_ok()
            });
            if done {
                return Ok(());
            }
            core::hint::spin_loop();
        }
    }

    /// Dequeue one terminated line into `out`, terminator stripped
    ///
    /// Returns the line length, or `None` if no full line is buffered or
    /// the line would not fit in `out` (it stays buffered in that case).
    pub fn get_line(&self, out: &mut [u8]) -> Option<usize> {
        self.with(|b| {
            let end = b.rx.find_byte(LINE_TERMINATOR, 0);
            if end == b.rx.bytes_used() || end > out.len() {
                return None;
            }
            b.rx.dequeue(&mut out[..end]).ok()?;
            b.rx.remove_from_tail(1);
            Some(end)
        })
    }

    /// Bytes waiting to be sent
    pub fn tx_used(&self) -> usize {
        self.with(|b| b.tx.bytes_used())
    }

    /// Bytes that can still be enqueued for sending
    pub fn tx_free(&self) -> usize {
        self.with(|b| b.tx.bytes_free())
    }

    /// Bytes received and not yet consumed
    pub fn rx_used(&self) -> usize {
        self.with(|b| b.rx.bytes_used())
    }

    /// Sanity bound applied to received LENGTH bytes
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

/// Destination for encoded reading payloads
pub trait ReadingSink {
    /// Hand one payload over for framing and transmission
    fn submit(&mut self, payload: &[u8]) -> Result<(), FrameError>;
}

impl<M: RawMutex, const RX: usize, const TX: usize> ReadingSink for &Comm<M, RX, TX> {
    fn submit(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        self.put_message(payload)
    }
}
