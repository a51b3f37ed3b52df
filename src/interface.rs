//! Bus transport.
//!
//! The RA8875 serial protocol has four phases, each opened by a one-byte
//! prefix: select a register, write data, read data, read status. Writes to
//! the data port land in the selected register, or in display memory when the
//! selected register is MRWC.

use embedded_hal::spi::Operation;
#[cfg(not(feature = "async"))]
use embedded_hal::spi::SpiDevice;
#[cfg(feature = "async")]
use embedded_hal_async::spi::SpiDevice;

use crate::registers::Phase;

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Interface",),
    async(feature = "async", keep_self)
)]
/// Ordered, lossless byte transport to the controller.
#[allow(async_fn_in_trait)]
pub trait Interface {
    /// Transport error
    type Error: core::fmt::Debug;

    /// Select the register addressed by subsequent data phases.
    async fn write_command(&mut self, register: u8) -> Result<(), Self::Error>;

    /// Write bytes to the data port.
    async fn write_data(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read bytes from the data port.
    async fn read_data(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Read the status register.
    async fn read_status(&mut self) -> Result<u8, Self::Error>;
}

/// [`Interface`] over an SPI device. Each phase is a single SPI transaction.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Give the SPI device back
    pub fn release(self) -> SPI {
        self.spi
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "SpiInterface",),
    async(feature = "async", keep_self)
)]
impl<SPI> Interface for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    async fn write_command(&mut self, register: u8) -> Result<(), Self::Error> {
        self.spi.write(&[Phase::CommandWrite as u8, register]).await
    }

    async fn write_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[Phase::DataWrite as u8]),
                Operation::Write(data),
            ])
            .await
    }

    async fn read_data(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[Phase::DataRead as u8]),
                Operation::Read(buf),
            ])
            .await
    }

    async fn read_status(&mut self) -> Result<u8, Self::Error> {
        let mut status = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[Phase::StatusRead as u8]),
                Operation::Read(&mut status),
            ])
            .await?;
        Ok(status[0])
    }
}
