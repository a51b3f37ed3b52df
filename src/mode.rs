use core::convert::Infallible;

use embedded_hal::digital::OutputPin;

use crate::registers::{Register, mwcr0};
use crate::{Error, Interface, Ra8875, Timer};

/// How the chip interprets data written through MRWC: pixels or characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    Graphics,
    Text,
}

impl OperatingMode {
    fn apply(self, mwcr0: u8) -> u8 {
        match self {
            OperatingMode::Graphics => (mwcr0 & !mwcr0::TEXT) | mwcr0::GRAPHICS,
            OperatingMode::Text => mwcr0 | mwcr0::TEXT,
        }
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Ra8875",),
    async(feature = "async", keep_self)
)]
impl<DI, RST, E, TIMER> Ra8875<DI, RST, TIMER>
where
    DI: Interface<Error = E>,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    /// Mode the driver believes the chip is in, `None` before the first
    /// resync or after a reset
    pub fn mode(&self) -> Option<OperatingMode> {
        self.mode
    }

    /// Switch the chip to `target` unless the mirror says it is already there.
    ///
    /// Writing MWCR0 also resets the text cursor logic, so it is never
    /// written when the mode already matches.
    pub(crate) async fn ensure_mode(&mut self, target: OperatingMode) -> Result<(), Error<E>> {
        if self.mode == Some(target) {
            return Ok(());
        }
        self.write_mode(target).await
    }

    /// Write `mode` unconditionally and reset the mirror to it.
    ///
    /// Use after anything outside this driver may have touched MWCR0.
    pub async fn resync_mode(&mut self, mode: OperatingMode) -> Result<(), Error<E>> {
        self.write_mode(mode).await
    }

    async fn write_mode(&mut self, mode: OperatingMode) -> Result<(), Error<E>> {
        let current = self.read_register(Register::Mwcr0).await?;
        self.write_data(&[mode.apply(current)]).await?;
        debug!("mode {} -> {}", self.mode, mode);
        self.mode = Some(mode);
        self.text_cursor = None;
        Ok(())
    }
}
