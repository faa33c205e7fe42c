//! Serial link to the host
//!
//! The link is serviced exclusively from the periodic comm tick, never from
//! mainline code. It exposes just enough of the underlying device for the
//! transport to move whole batches in and bounded packets out:
//!
//! - how many received bytes are waiting, so a batch can be taken whole
//!   or dropped whole
//! - whether the device can accept a packet right now
//! - packet submission

/// How the physical link delimits transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkKind {
    /// Plain byte stream (UART); packet size only bounds one submission
    Stream,
    /// Packet-oriented (USB CDC); a full-size packet must be followed by a
    /// zero-length packet to end the transfer
    Packet,
}

/// Byte link serviced by the comm tick
pub trait SerialLink {
    /// Error type for rejected submissions
    type Error;

    /// Transfer semantics of this link
    fn kind(&self) -> LinkKind;

    /// Largest packet the link accepts in one submission
    fn max_packet_size(&self) -> usize;

    /// Number of received bytes waiting to be read
    fn rx_available(&mut self) -> usize;

    /// Move up to `buf.len()` received bytes into `buf`
    ///
    /// Returns the number of bytes copied.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Whether the link can take a packet right now
    fn tx_ready(&mut self) -> bool;

    /// Submit one packet (possibly empty on packet links)
    fn send(&mut self, packet: &[u8]) -> Result<(), Self::Error>;
}

/// Size of the receive staging area in [`IoLink`]
pub const IO_LINK_STAGE_LEN: usize = 64;

/// [`SerialLink`] adapter for `embedded-io` serial devices
///
/// `embedded-io` can only say whether *some* bytes are readable, not how
/// many, so received bytes are first pulled into a small staging area
/// whose fill level is what [`SerialLink::rx_available`] reports.
pub struct IoLink<T> {
    inner: T,
    max_packet: usize,
    stage: [u8; IO_LINK_STAGE_LEN],
    staged: usize,
}

impl<T> IoLink<T> {
    /// Wrap a serial device, submitting at most `max_packet` bytes at once
    pub fn new(inner: T, max_packet: usize) -> Self {
        Self {
            inner,
            max_packet,
            stage: [0; IO_LINK_STAGE_LEN],
            staged: 0,
        }
    }

    /// Access the wrapped device
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T> SerialLink for IoLink<T>
where
    T: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write + embedded_io::WriteReady,
{
    type Error = T::Error;

    fn kind(&self) -> LinkKind {
        LinkKind::Stream
    }

    fn max_packet_size(&self) -> usize {
        self.max_packet
    }

    fn rx_available(&mut self) -> usize {
        while self.staged < IO_LINK_STAGE_LEN && matches!(self.inner.read_ready(), Ok(true)) {
            match self.inner.read(&mut self.stage[self.staged..]) {
                Ok(0) | Err(_) => break,
                Ok(n) => self.staged += n,
            }
        }
        self.staged
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.staged);
        buf[..n].copy_from_slice(&self.stage[..n]);
        self.stage.copy_within(n..self.staged, 0);
        self.staged -= n;
        n
    }

    fn tx_ready(&mut self) -> bool {
        matches!(self.inner.write_ready(), Ok(true))
    }

    fn send(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(packet)
    }
}

/// Estimate of how full a UART driver's transmit buffer is
///
/// For drivers that queue writes in a buffer but cannot report its fill
/// level. Written bytes are added as they are queued; elapsed time drains
/// them at the line rate. The estimate never drains faster than the line,
/// so a write that [`TxBudget::has_room`] accepts fits without blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxBudget {
    capacity: usize,
    bytes_per_sec: u32,
    queued: usize,
}

impl TxBudget {
    /// Budget for a `capacity`-byte buffer drained at `bytes_per_sec`
    pub const fn new(capacity: usize, bytes_per_sec: u32) -> Self {
        Self {
            capacity,
            bytes_per_sec,
            queued: 0,
        }
    }

    /// Budget for an 8N1 UART at `baudrate` (10 bits per byte)
    pub const fn for_baudrate(capacity: usize, baudrate: u32) -> Self {
        Self::new(capacity, baudrate / 10)
    }

    /// Drain the estimate by `elapsed_us` of line time
    ///
    /// Returns the microseconds accounted for. Time shorter than one byte
    /// is not consumed; the caller keeps it for the next call.
    pub fn elapse(&mut self, elapsed_us: u64) -> u64 {
        let rate = self.bytes_per_sec.max(1) as u64;
        let drained = elapsed_us * rate / 1_000_000;
        if drained == 0 {
            return 0;
        }
        self.queued = self.queued.saturating_sub(drained.min(usize::MAX as u64) as usize);
        if self.queued == 0 {
            return elapsed_us;
        }
        drained * 1_000_000 / rate
    }

    /// Whether `len` more bytes fit in the buffer right now
    pub fn has_room(&self, len: usize) -> bool {
        self.capacity - self.queued >= len
    }

    /// Account for `len` bytes handed to the driver
    pub fn record(&mut self, len: usize) {
        self.queued = (self.queued + len).min(self.capacity);
    }

    /// Estimated bytes still waiting in the driver
    pub fn queued(&self) -> usize {
        self.queued
    }
}
