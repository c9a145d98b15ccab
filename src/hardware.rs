//! The pluggable boundary between the driver core and the physical chip.
//!
//! A `HardwareContext` is not internally synchronized: the driver core
//! only ever touches it from its command worker thread, so implementors
//! can assume single-threaded access.

use std::fmt;

/// Operations the driver core needs from whatever actually talks to the
/// chip (I²C bus plus a reset GPIO, in the real implementation).
pub trait HardwareContext: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Pulses the chip's reset line and leaves it ready to receive its
    /// first command.
    fn reset_radio(&mut self) -> Result<(), Self::Error>;

    /// Writes a command frame to the chip.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Reads back `len` response bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, Self::Error>;
}

/// In-memory fake chip used by the driver core's own tests: tracks just
/// enough register state to answer `GET_INT_STATUS`/`GET_PROPERTY`/
/// `GET_REV` the way real hardware would.
pub struct MockHardwareContext {
    pub status_byte: u8,
    pub powered: bool,
    pub properties: std::collections::HashMap<u16, u16>,
    pub next_read: Vec<u8>,
    pub reset_count: u32,
    pub writes: Vec<Vec<u8>>,
}

#[derive(Debug)]
pub struct MockError(pub String);

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock hardware error: {}", self.0)
    }
}

impl std::error::Error for MockError {}

impl From<MockError> for crate::error::Si4707Error {
    fn from(e: MockError) -> Self {
        crate::error::Si4707Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.0))
    }
}

impl Default for MockHardwareContext {
    fn default() -> Self {
        MockHardwareContext {
            status_byte: 0x80,
            powered: false,
            properties: std::collections::HashMap::new(),
            next_read: Vec::new(),
            reset_count: 0,
            writes: Vec::new(),
        }
    }
}

impl MockHardwareContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the bytes the next `read_bytes` call(s) should return.
    pub fn queue_read(&mut self, bytes: &[u8]) {
        self.next_read.extend_from_slice(bytes);
    }
}

impl HardwareContext for MockHardwareContext {
    type Error = MockError;

    fn reset_radio(&mut self) -> Result<(), Self::Error> {
        self.reset_count += 1;
        self.status_byte = 0x80;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, Self::Error> {
        if self.next_read.is_empty() && len == 1 {
            // No response queued: a lone status-byte read (the CTS/interrupt
            // poll every command and the driver's background poll issue)
            // falls back to the current status register instead of erroring,
            // so background polling never starves a real queued response.
            return Ok(vec![self.status_byte]);
        }
        if self.next_read.len() < len {
            return Err(MockError(format!(
                "requested {len} bytes but only {} queued",
                self.next_read.len()
            )));
        }
        Ok(self.next_read.drain(0..len).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_status_and_counts() {
        let mut ctx = MockHardwareContext::new();
        ctx.status_byte = 0x00;
        ctx.reset_radio().unwrap();
        assert_eq!(ctx.status_byte, 0x80);
        assert_eq!(ctx.reset_count, 1);
    }

    #[test]
    fn write_bytes_are_recorded() {
        let mut ctx = MockHardwareContext::new();
        ctx.write_bytes(&[0x10]).unwrap();
        assert_eq!(ctx.writes, vec![vec![0x10]]);
    }

    #[test]
    fn read_bytes_drains_queue_in_order() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80, 0x01, 0x02]);
        assert_eq!(ctx.read_bytes(1).unwrap(), vec![0x80]);
        assert_eq!(ctx.read_bytes(2).unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn read_bytes_errors_when_queue_is_short() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80]);
        assert!(ctx.read_bytes(2).is_err());
    }
}

#[cfg(feature = "embedded-hal-context")]
mod embedded {
    //! `HardwareContext` adapter over `embedded-hal`'s blocking I2C and
    //! digital output traits, for running against real silicon.

    use super::HardwareContext;
    use embedded_hal::digital::OutputPin;
    use embedded_hal::i2c::I2c;
    use std::fmt;

    const SI4707_I2C_ADDRESS: u8 = 0x11;
    const RESET_PULSE: std::time::Duration = std::time::Duration::from_millis(10);

    #[derive(Debug)]
    pub enum EmbeddedHalError<I2cErr, PinErr> {
        I2c(I2cErr),
        Pin(PinErr),
    }

    impl<I2cErr: fmt::Debug, PinErr: fmt::Debug> fmt::Display for EmbeddedHalError<I2cErr, PinErr> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                EmbeddedHalError::I2c(e) => write!(f, "i2c error: {e:?}"),
                EmbeddedHalError::Pin(e) => write!(f, "reset pin error: {e:?}"),
            }
        }
    }

    impl<I2cErr: fmt::Debug, PinErr: fmt::Debug> std::error::Error for EmbeddedHalError<I2cErr, PinErr> {}

    impl<I2cErr: fmt::Debug, PinErr: fmt::Debug> From<EmbeddedHalError<I2cErr, PinErr>>
        for crate::error::Si4707Error
    {
        fn from(e: EmbeddedHalError<I2cErr, PinErr>) -> Self {
            crate::error::Si4707Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{e:?}"),
            ))
        }
    }

    /// Talks to a real Si4707 over an `embedded-hal` I2C bus, with a GPIO
    /// output pin driving the chip's active-low reset line.
    pub struct EmbeddedHalContext<B, R> {
        bus: B,
        reset: R,
    }

    impl<B, R> EmbeddedHalContext<B, R> {
        pub fn new(bus: B, reset: R) -> Self {
            EmbeddedHalContext { bus, reset }
        }
    }

    impl<B, R> HardwareContext for EmbeddedHalContext<B, R>
    where
        B: I2c + Send,
        R: OutputPin + Send,
    {
        type Error = EmbeddedHalError<B::Error, R::Error>;

        fn reset_radio(&mut self) -> Result<(), Self::Error> {
            self.reset.set_low().map_err(EmbeddedHalError::Pin)?;
            std::thread::sleep(RESET_PULSE);
            self.reset.set_high().map_err(EmbeddedHalError::Pin)?;
            std::thread::sleep(RESET_PULSE);
            Ok(())
        }

        fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            self.bus
                .write(SI4707_I2C_ADDRESS, bytes)
                .map_err(EmbeddedHalError::I2c)
        }

        fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, Self::Error> {
            let mut buf = vec![0u8; len];
            self.bus
                .read(SI4707_I2C_ADDRESS, &mut buf)
                .map_err(EmbeddedHalError::I2c)?;
            Ok(buf)
        }
    }
}

#[cfg(feature = "embedded-hal-context")]
pub use embedded::{EmbeddedHalContext, EmbeddedHalError};
