use core::convert::Infallible;

use embedded_hal::digital::OutputPin;

use crate::registers::{Register, becr0, dcr, ellcr, mclr, stsr};
use crate::{Error, Interface, InvalidParameter, Ra8875, Timer};

/// Hardware units that run asynchronously to the host, each with its own
/// busy bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Engine {
    /// Lines, rectangles and triangles (DCR bit 7)
    LineSquareTriangle,
    /// Circles (DCR bit 6)
    Circle,
    /// Ellipses, curves and rounded rectangles (ELLCR bit 7)
    Ellipse,
    /// Block transfer engine (BECR0 bit 7)
    BlockTransfer,
    /// Display memory clear (MCLR bit 7)
    MemoryClear,
    /// Font engine, tracked by the memory busy flag of the status register
    Font,
}

impl Engine {
    /// Register holding the busy bit, `None` for the status register
    fn status_register(self) -> Option<Register> {
        match self {
            Engine::LineSquareTriangle | Engine::Circle => Some(Register::Dcr),
            Engine::Ellipse => Some(Register::Ellcr),
            Engine::BlockTransfer => Some(Register::Becr0),
            Engine::MemoryClear => Some(Register::Mclr),
            Engine::Font => None,
        }
    }

    fn busy_mask(self) -> u8 {
        match self {
            Engine::LineSquareTriangle => dcr::LINE_SQUARE_TRIANGLE_STATUS,
            Engine::Circle => dcr::CIRCLE_STATUS,
            Engine::Ellipse => ellcr::STATUS,
            Engine::BlockTransfer => becr0::STATUS,
            Engine::MemoryClear => mclr::STATUS,
            Engine::Font => stsr::MEMORY_BUSY,
        }
    }
}

/// Bound on a busy wait.
///
/// The engine is polled every `poll_interval_us`; once `timeout_us` worth of
/// intervals have passed without the busy bit clearing, the wait fails. The
/// interval must be non-zero, otherwise the bound would only count bus
/// transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusyTimeout {
    pub timeout_us: u32,
    pub poll_interval_us: u32,
}

impl Default for BusyTimeout {
    fn default() -> Self {
        Self {
            timeout_us: 20_000,
            poll_interval_us: 1_000,
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
    /// Block until `engine` reports idle.
    ///
    /// The busy register is selected once and then only read, so nothing is
    /// written to the chip while the engine runs. After a timeout the engine
    /// state is unknown and the session should be re-initialized; the command
    /// that started the engine is never reissued.
    pub async fn wait_while_busy(
        &mut self,
        engine: Engine,
        timeout: BusyTimeout,
    ) -> Result<(), Error<E>> {
        if timeout.poll_interval_us == 0 {
            return Err(InvalidParameter::PollInterval.into());
        }
        let register = engine.status_register();
        if let Some(register) = register {
            self.write_command(register.into()).await?;
        }

        let mut waited: u32 = 0;
        loop {
            let status = match register {
                Some(_) => self.read_data().await?,
                None => self.di.read_status().await.map_err(Error::Comm)?,
            };
            if status & engine.busy_mask() == 0 {
                return Ok(());
            }
            if waited >= timeout.timeout_us {
                warn!("{} engine still busy after {=u32}us", engine, waited);
                return Err(Error::Timeout(engine));
            }
            TIMER::delay_us(timeout.poll_interval_us as u64).await;
            waited = waited.saturating_add(timeout.poll_interval_us);
        }
    }

    /// Wait with the configured drawing bound
    pub(crate) async fn wait_for(&mut self, engine: Engine) -> Result<(), Error<E>> {
        let timeout = self.config.busy_timeout;
        self.wait_while_busy(engine, timeout).await
    }
}
