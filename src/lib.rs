#![cfg_attr(not(test), no_std)]

//! Driver for the RAiO RA8875 graphics controller.
//!
//! The RA8875 renders lines, rectangles, circles, ellipses, triangles, text
//! and block transfers in hardware. This crate turns drawing requests into the
//! register sequences the chip expects, waits on the engine busy bits, and
//! switches the chip between graphics and text mode as calls alternate.
//!
//! All calls block (or `.await`, with the `async` feature) until the hardware
//! reports completion. A driver instance owns the session to one chip; wrap it
//! in a mutex if several tasks need to draw.

#[macro_use]
mod fmt;

mod busy;
mod draw;
pub mod interface;
mod mode;
pub mod registers;
mod text;
mod touch;

#[cfg(all(test, not(feature = "async")))]
mod sim;

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::{ErrorType, OutputPin};

pub use busy::{BusyTimeout, Engine};
pub use draw::{BlockMove, CurvePart, DrawCommand, RasterOp};
pub use interface::{Interface, SpiInterface};
pub use mode::OperatingMode;
use registers::*;
pub use text::{Font, FontCoding};
pub use touch::{AdcClock, Calibration, SampleWait, TouchConfig, TouchSample};

/// Supported panel resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplaySize {
    Size800x480,
    Size480x272,
    Size480x128,
    /// Sold as 480x80, the glass is 480x82 and sits 190 lines down
    Size480x80,
}

impl DisplaySize {
    pub fn width(self) -> u16 {
        match self {
            DisplaySize::Size800x480 => 800,
            _ => 480,
        }
    }

    pub fn height(self) -> u16 {
        match self {
            DisplaySize::Size800x480 => 480,
            DisplaySize::Size480x272 => 272,
            DisplaySize::Size480x128 => 128,
            DisplaySize::Size480x80 => 82,
        }
    }

    /// Lines added to every vertical coordinate written to the chip
    pub fn vertical_offset(self) -> u16 {
        match self {
            DisplaySize::Size480x80 => 190,
            _ => 0,
        }
    }

    fn timing(self) -> Timing {
        match self {
            DisplaySize::Size800x480 => Timing {
                pixclk: pcsr::PDATL | pcsr::CLK_2,
                hsync_nondisp: 26,
                hsync_start: 32,
                hsync_pw: 96,
                vsync_nondisp: 32,
                vsync_start: 23,
                vsync_pw: 2,
            },
            _ => Timing {
                pixclk: pcsr::PDATL | pcsr::CLK_4,
                hsync_nondisp: 10,
                hsync_start: 8,
                hsync_pw: 48,
                vsync_nondisp: 3,
                vsync_start: 8,
                vsync_pw: 10,
            },
        }
    }
}

struct Timing {
    pixclk: u8,
    hsync_nondisp: u8,
    hsync_start: u8,
    hsync_pw: u8,
    vsync_nondisp: u16,
    vsync_start: u16,
    vsync_pw: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorDepth {
    /// 256 colours, pixels written as RGB332
    Bpp8,
    /// 65k colours, pixels written as big-endian RGB565
    Bpp16,
}

/// Scan direction of the panel driver outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    Normal = 0x00,
    FlipHorizontal = 0x08,
    FlipVertical = 0x04,
    Rotate180 = 0x0C,
}

/// PWM clock divider for the backlight outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmClock {
    Div1 = 0x00,
    Div2 = 0x01,
    Div4 = 0x02,
    Div8 = 0x03,
    Div16 = 0x04,
    Div32 = 0x05,
    Div64 = 0x06,
    Div128 = 0x07,
    Div256 = 0x08,
    Div512 = 0x09,
    Div1024 = 0x0A,
    Div2048 = 0x0B,
    Div4096 = 0x0C,
    Div8192 = 0x0D,
    Div16384 = 0x0E,
    Div32768 = 0x0F,
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub size: DisplaySize,
    pub color_depth: ColorDepth,
    pub orientation: Orientation,
    /// Bound for every drawing engine wait
    pub busy_timeout: BusyTimeout,
    /// Bound for the full memory clear issued by `init`
    pub clear_timeout: BusyTimeout,
    /// Turn the panel on at the end of `init`
    pub start_on: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: DisplaySize::Size800x480,
            color_depth: ColorDepth::Bpp16,
            orientation: Orientation::Normal,
            busy_timeout: BusyTimeout::default(),
            clear_timeout: BusyTimeout {
                timeout_us: 500_000,
                poll_interval_us: 1_000,
            },
            start_on: true,
        }
    }
}

/// Argument rejected before anything was sent to the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidParameter {
    /// Point outside the panel
    Coordinate { x: u16, y: u16 },
    /// Radius or axis too large for the register or the shape
    Radius(u16),
    /// Text enlargement above 3
    FontScale(u8),
    /// Character spacing above 63 pixels
    CharacterSpacing(u8),
    /// Shape extends past the panel edge
    Area,
    /// Busy wait configured to poll without delay
    PollInterval,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E = ()> {
    /// Communication error
    Comm(E),
    /// Pin setting error
    Pin(Infallible),
    /// An engine was still busy when the wait bound ran out
    Timeout(Engine),
    /// Argument out of range
    InvalidParameter(InvalidParameter),
    /// Register 0x00 did not read back the RA8875 identifier
    InvalidChipId(u8),
}

impl<E> From<InvalidParameter> for Error<E> {
    fn from(p: InvalidParameter) -> Self {
        Error::InvalidParameter(p)
    }
}

/// Stand-in for boards that leave the reset line tied high.
pub struct NoResetPin;

impl ErrorType for NoResetPin {
    type Error = Infallible;
}

impl OutputPin for NoResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// One session with one RA8875.
///
/// Besides the bus, the session mirrors the chip's operating mode and the
/// last text cursor written, so that neither has to be read back on every
/// call. Writing MWCR0 or the font cursor behind the driver's back
/// desynchronises the mirror; [`Ra8875::resync_mode`] recovers from that.
pub struct Ra8875<DI, RST, TIMER> {
    di: DI,
    rst: RST,
    config: Config,
    mode: Option<OperatingMode>,
    text_cursor: Option<(u16, u16)>,
    _timer: PhantomData<TIMER>,
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
    pub fn new(config: Config, di: DI, rst: RST) -> Self {
        Self {
            di,
            rst,
            config,
            mode: None,
            text_cursor: None,
            _timer: PhantomData,
        }
    }

    /// Give back the bus and reset pin
    pub fn release(self) -> (DI, RST) {
        (self.di, self.rst)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Logical width in pixels
    pub fn width(&self) -> u16 {
        self.config.size.width()
    }

    /// Logical height in pixels
    pub fn height(&self) -> u16 {
        self.config.size.height()
    }

    /// Bring the chip from power-on (or an unknown state) to a known one.
    ///
    /// Nothing the chip held before is trusted: timing, window, font source
    /// and operating mode are all written, and display memory is cleared.
    pub async fn init(&mut self) -> Result<(), Error<E>> {
        self.reset().await?;

        let id = self.read_register(Register::Id).await?;
        if id != CHIP_ID {
            warn!("unexpected chip id {=u8:#x}", id);
            return Err(Error::InvalidChipId(id));
        }

        let size = self.config.size;
        let t = size.timing();
        let width = size.width();
        let height = size.height();
        let offset = size.vertical_offset();

        self.write_register(Register::Pllc1, pllc::PLLDIV1 + 11).await?;
        TIMER::delay_ms(1).await;
        self.write_register(Register::Pllc2, pllc::DIV4).await?;
        TIMER::delay_ms(1).await;

        let bpp = match self.config.color_depth {
            ColorDepth::Bpp8 => sysr::BPP_8,
            ColorDepth::Bpp16 => sysr::BPP_16,
        };
        self.write_register(Register::Sysr, bpp | sysr::MCU_8).await?;
        self.write_register(Register::Pcsr, t.pixclk).await?;
        TIMER::delay_ms(1).await;

        // Horizontal timing
        self.write_register(Register::Hdwr, (width / 8 - 1) as u8).await?;
        self.write_register(Register::Hndftr, hndftr::DE_HIGH).await?;
        self.write_register(Register::Hndr, (t.hsync_nondisp - 2) / 8)
            .await?;
        self.write_register(Register::Hstr, t.hsync_start / 8 - 1)
            .await?;
        self.write_register(Register::Hpwr, hpwr::LOW + t.hsync_pw / 8 - 1)
            .await?;

        // Vertical timing
        self.write_register16(Register16::Vdhr, height - 1 + offset)
            .await?;
        self.write_register16(Register16::Vndr, t.vsync_nondisp - 1)
            .await?;
        self.write_register16(Register16::Vstr, t.vsync_start - 1)
            .await?;
        self.write_register(Register::Vpwr, vpwr::LOW + t.vsync_pw - 1)
            .await?;

        self.reset_active_window().await?;
        self.clear_memory().await?;

        self.set_orientation(self.config.orientation).await?;
        self.configure_font(Font::default()).await?;
        self.resync_mode(OperatingMode::Graphics).await?;

        self.display_on(self.config.start_on).await?;
        self.gpiox(true).await?;
        self.pwm1_config(true, PwmClock::Div1024).await?;
        self.brightness(255).await?;

        debug!("initialized {}x{}", width, height);
        Ok(())
    }

    /// Pulse the reset line
    pub async fn reset(&mut self) -> Result<(), Error<E>> {
        self.rst.set_low().map_err(Error::Pin)?;
        TIMER::delay_ms(100).await;
        self.rst.set_high().map_err(Error::Pin)?;
        TIMER::delay_ms(100).await;

        self.mode = None;
        self.text_cursor = None;
        Ok(())
    }

    /// Software reset through PWRR. Registers return to their defaults, so
    /// the mode mirror is dropped until the next [`Ra8875::resync_mode`].
    pub async fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.write_register(Register::Pwrr, pwrr::SOFT_RESET).await?;
        self.write_data(&[pwrr::NORMAL]).await?;
        TIMER::delay_ms(1).await;

        self.mode = None;
        self.text_cursor = None;
        Ok(())
    }

    pub async fn display_on(&mut self, on: bool) -> Result<(), Error<E>> {
        let display = if on {
            pwrr::DISPLAY_ON
        } else {
            pwrr::DISPLAY_OFF
        };
        self.write_register(Register::Pwrr, pwrr::NORMAL | display)
            .await
    }

    /// Turn the display off and enter sleep mode, or leave it.
    ///
    /// Waking only clears the sleep bit; the panel stays dark until
    /// [`Ra8875::display_on`] is called.
    pub async fn sleep(&mut self, sleep: bool) -> Result<(), Error<E>> {
        let value = if sleep {
            pwrr::DISPLAY_OFF | pwrr::SLEEP
        } else {
            pwrr::NORMAL
        };
        self.write_register(Register::Pwrr, value).await
    }

    /// Drive the GPIOX pin, which enables the panel on most breakout boards
    pub async fn gpiox(&mut self, on: bool) -> Result<(), Error<E>> {
        self.write_register(Register::Gpiox, on as u8).await
    }

    pub async fn pwm1_config(&mut self, enable: bool, clock: PwmClock) -> Result<(), Error<E>> {
        self.write_register(Register::P1cr, pwm_control(enable, clock))
            .await
    }

    pub async fn pwm2_config(&mut self, enable: bool, clock: PwmClock) -> Result<(), Error<E>> {
        self.write_register(Register::P2cr, pwm_control(enable, clock))
            .await
    }

    /// Backlight duty cycle on PWM1
    pub async fn brightness(&mut self, level: u8) -> Result<(), Error<E>> {
        self.write_register(Register::P1dcr, level).await
    }

    pub async fn pwm2_out(&mut self, duty: u8) -> Result<(), Error<E>> {
        self.write_register(Register::P2dcr, duty).await
    }

    pub async fn set_orientation(&mut self, orientation: Orientation) -> Result<(), Error<E>> {
        let current = self.read_register(Register::Dpcr).await?;
        let value = (current & !dpcr::SCAN_MASK) | orientation as u8;
        self.write_data(&[value]).await?;
        self.config.orientation = orientation;
        Ok(())
    }

    /// Write an 8-bit register
    pub async fn write_register(&mut self, register: Register, value: u8) -> Result<(), Error<E>> {
        trace!("write {=u8:#x} <- {=u8:#x}", register as u8, value);
        self.write_command(register.into()).await?;
        self.write_data(&[value]).await
    }

    /// Read an 8-bit register
    pub async fn read_register(&mut self, register: Register) -> Result<u8, Error<E>> {
        self.write_command(register.into()).await?;
        self.read_data().await
    }

    /// Write a 16-bit field, low byte first
    pub async fn write_register16(
        &mut self,
        register: Register16,
        value: u16,
    ) -> Result<(), Error<E>> {
        let [low, high] = value.to_le_bytes();
        self.write_command(register.low()).await?;
        self.write_data(&[low]).await?;
        self.write_command(register.high()).await?;
        self.write_data(&[high]).await
    }

    /// Read a 16-bit field, low byte first
    pub async fn read_register16(&mut self, register: Register16) -> Result<u16, Error<E>> {
        self.write_command(register.low()).await?;
        let low = self.read_data().await?;
        self.write_command(register.high()).await?;
        let high = self.read_data().await?;
        Ok(u16::from_le_bytes([low, high]))
    }

    async fn write_command(&mut self, register: u8) -> Result<(), Error<E>> {
        self.di.write_command(register).await.map_err(Error::Comm)
    }

    async fn write_data(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        self.di.write_data(data).await.map_err(Error::Comm)
    }

    async fn read_data(&mut self) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.di.read_data(&mut buf).await.map_err(Error::Comm)?;
        Ok(buf[0])
    }
}

fn pwm_control(enable: bool, clock: PwmClock) -> u8 {
    let on = if enable { pwm::ENABLE } else { pwm::DISABLE };
    on | (clock as u8 & pwm::CLOCK_MASK)
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Timer",),
    async(feature = "async", keep_self)
)]
/// Simplified timer trait for delay operations.
#[allow(async_fn_in_trait)]
pub trait Timer {
    /// Delay for the specified number of microseconds.
    async fn delay_us(microseconds: u64);

    /// Delay for the specified number of milliseconds.
    async fn delay_ms(milliseconds: u64) {
        Self::delay_us(milliseconds * 1_000).await
    }
}

/// [`Timer`] backed by `embassy-time`.
#[cfg(feature = "embassy-time")]
pub struct EmbassyTimer;

#[cfg(all(feature = "embassy-time", feature = "async"))]
impl Timer for EmbassyTimer {
    async fn delay_us(microseconds: u64) {
        embassy_time::Timer::after_micros(microseconds).await;
    }
}

#[cfg(all(feature = "embassy-time", not(feature = "async")))]
impl Timer for EmbassyTimer {
    fn delay_us(microseconds: u64) {
        embassy_time::block_for(embassy_time::Duration::from_micros(microseconds));
    }
}
