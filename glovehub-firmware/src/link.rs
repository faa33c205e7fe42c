//! Host link over UART0
//!
//! The buffered UART driver cannot report how full its transmit buffer is,
//! so the link keeps a [`TxBudget`] estimate and reports ready only while a
//! whole packet fits. A send therefore never blocks inside the comm tick,
//! where the UART interrupt is masked by the comm critical section; a stalled
//! line shows up as transport rejects instead.

use embassy_rp::uart::{BufferedUart, Error};
use embassy_time::{Duration, Instant};
use glovehub_hal::TxBudget;

/// Host link baud rate
pub const HOST_BAUDRATE: u32 = 921_600;

/// Bytes handed to the UART per comm tick
pub const HOST_PACKET_SIZE: usize = 32;

/// UART driver buffer size, per direction
pub const UART_BUF_LEN: usize = 256;

/// `embedded-io` view of the buffered UART with a write-ready report
pub struct HostUart {
    uart: BufferedUart,
    budget: TxBudget,
    drained_until: Instant,
}

impl HostUart {
    pub fn new(uart: BufferedUart) -> Self {
        Self {
            uart,
            budget: TxBudget::for_baudrate(UART_BUF_LEN, HOST_BAUDRATE),
            drained_until: Instant::now(),
        }
    }

    fn drain(&mut self) {
        let elapsed = Instant::now().saturating_duration_since(self.drained_until);
        let used = self.budget.elapse(elapsed.as_micros());
        self.drained_until += Duration::from_micros(used);
    }
}

impl embedded_io::ErrorType for HostUart {
    type Error = Error;
}

impl embedded_io::Read for HostUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        embedded_io::Read::read(&mut self.uart, buf)
    }
}

impl embedded_io::ReadReady for HostUart {
    fn read_ready(&mut self) -> Result<bool, Error> {
        embedded_io::ReadReady::read_ready(&mut self.uart)
    }
}

impl embedded_io::Write for HostUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.drain();
        let n = embedded_io::Write::write(&mut self.uart, buf)?;
        self.budget.record(n);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Error> {
        embedded_io::Write::flush(&mut self.uart)
    }
}

impl embedded_io::WriteReady for HostUart {
    fn write_ready(&mut self) -> Result<bool, Error> {
        self.drain();
        Ok(self.budget.has_room(HOST_PACKET_SIZE))
    }
}
