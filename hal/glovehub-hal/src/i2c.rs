//! I2C bus abstractions
//!
//! The hub is the single master on a shared I2C bus; every sensor node is
//! a slave at a fixed 7-bit address. Transfers are blocking and carry no
//! timeout: a wedged slave holds the caller until the peripheral gives up.

/// I2C bus master
///
/// Provides the two transactions the hub needs: a short command write
/// (used for the broadcast scan trigger) and a fixed-size read of a
/// sensor node's reply buffer.
pub trait I2cBus {
    /// Error type for bus-level failures (NACK, arbitration loss, ...)
    type Error;

    /// Write data to a device at the given address
    ///
    /// Blocks until the write transfer completes.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address (0x00 is the general call address)
    /// * `data` - Bytes to write
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// Blocks until the read transfer completes and returns the number of
    /// bytes the slave actually delivered, which may be less than
    /// `buf.len()` on buses that allow early termination.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// [`I2cBus`] adapter for any blocking `embedded-hal` 1.0 I2C master
///
/// `embedded-hal` reads either fill the whole buffer or fail, so a
/// successful read always reports `buf.len()` bytes.
pub struct EmbeddedHalBus<T> {
    inner: T,
}

impl<T> EmbeddedHalBus<T> {
    /// Wrap an `embedded-hal` I2C master
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Release the wrapped peripheral
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: embedded_hal::i2c::I2c> I2cBus for EmbeddedHalBus<T> {
    type Error = T::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.read(address, buf)?;
        Ok(buf.len())
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy)]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::FAST
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz), used for the sensor bus
    pub const FAST: Self = Self { frequency: 400_000 };
}
