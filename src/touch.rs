//! Resistive touch panel controller.
//!
//! The touch block has its own registers and does not care whether the chip
//! is in graphics or text mode, so nothing here goes through the mode mirror.

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::registers::*;
use crate::{DisplaySize, Error, Interface, Ra8875, Timer};

/// ADC clock divider for the touch sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcClock {
    Div4 = 0x02,
    Div8 = 0x03,
    Div16 = 0x04,
    Div32 = 0x05,
    Div64 = 0x06,
    Div128 = 0x07,
}

/// Settling time before each sample, in system clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleWait {
    Clk512 = 0x00,
    Clk1024 = 0x10,
    Clk2048 = 0x20,
    Clk4096 = 0x30,
    Clk8192 = 0x40,
    Clk16384 = 0x50,
    Clk32768 = 0x60,
    Clk65536 = 0x70,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchConfig {
    pub adc_clock: AdcClock,
    pub sample_wait: SampleWait,
    /// Let a touch wake the chip from sleep
    pub wake: bool,
    /// Hardware debounce of the touch detect line
    pub debounce: bool,
}

impl TouchConfig {
    /// Settings known to work with the given panel
    pub fn for_size(size: DisplaySize) -> Self {
        let adc_clock = match size {
            DisplaySize::Size800x480 => AdcClock::Div16,
            _ => AdcClock::Div4,
        };
        Self {
            adc_clock,
            sample_wait: SampleWait::Clk4096,
            wake: true,
            debounce: true,
        }
    }

    fn tpcr0(&self) -> u8 {
        let wake = if self.wake { tpcr0::WAKE_ENABLE } else { 0 };
        tpcr0::ENABLE | self.sample_wait as u8 | wake | self.adc_clock as u8
    }

    fn tpcr1(&self) -> u8 {
        let debounce = if self.debounce { tpcr1::DEBOUNCE } else { 0 };
        tpcr1::AUTO | debounce
    }
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self::for_size(DisplaySize::Size800x480)
    }
}

/// Raw 10-bit ADC readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchSample {
    pub x: u16,
    pub y: u16,
    /// The touch interrupt flag was set when the sample was taken
    pub pressed: bool,
}

/// Linear map from raw ADC readings to panel pixels.
///
/// `x_min`/`x_max` are the raw readings at the left and right edges, which
/// may be given in either order for panels wired backwards. Same for y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub x_min: u16,
    pub x_max: u16,
    pub y_min: u16,
    pub y_max: u16,
    pub width: u16,
    pub height: u16,
}

impl Calibration {
    /// Full ADC range onto a panel of the given size
    pub fn new(size: DisplaySize) -> Self {
        Self {
            x_min: 0,
            x_max: 1023,
            y_min: 0,
            y_max: 1023,
            width: size.width(),
            height: size.height(),
        }
    }

    /// Pixel under the touch, or `None` when nothing was pressed or the
    /// calibration is degenerate. Readings past the calibrated edges land on
    /// the edge pixel.
    pub fn map(&self, sample: TouchSample) -> Option<(u16, u16)> {
        if !sample.pressed {
            return None;
        }
        let x = scale(sample.x, self.x_min, self.x_max, self.width)?;
        let y = scale(sample.y, self.y_min, self.y_max, self.height)?;
        Some((x, y))
    }
}

fn scale(raw: u16, min: u16, max: u16, span: u16) -> Option<u16> {
    if min == max || span == 0 {
        return None;
    }
    let (lo, hi) = (min.min(max), min.max(max));
    let clamped = raw.clamp(lo, hi);
    let offset = if min < max {
        clamped - min
    } else {
        min - clamped
    };
    let last = (span - 1) as u32;
    Some((offset as u32 * last / (hi - lo) as u32) as u16)
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
    /// Start the touch sampler and route its interrupt to INTC2
    pub async fn enable_touch(&mut self, config: TouchConfig) -> Result<(), Error<E>> {
        self.write_register(Register::Intc2, intc::TOUCH).await?;
        self.write_register(Register::Tpcr0, config.tpcr0()).await?;
        self.write_register(Register::Tpcr1, config.tpcr1()).await?;
        let intc1 = self.read_register(Register::Intc1).await?;
        self.write_data(&[intc1 | intc::TOUCH]).await?;
        debug!("touch enabled");
        Ok(())
    }

    pub async fn disable_touch(&mut self) -> Result<(), Error<E>> {
        let intc1 = self.read_register(Register::Intc1).await?;
        self.write_data(&[intc1 & !intc::TOUCH]).await?;
        self.write_register(Register::Tpcr0, tpcr0::DISABLE).await
    }

    /// Touch interrupt flag, set until the next [`Ra8875::read_touch`]
    pub async fn touched(&mut self) -> Result<bool, Error<E>> {
        let flags = self.read_register(Register::Intc2).await?;
        Ok(flags & intc::TOUCH != 0)
    }

    /// Like [`Ra8875::touched`], but checks the active-low touch interrupt
    /// line first and skips the bus read while it is released
    pub async fn touched_irq<P>(&mut self, irq: &mut P) -> Result<bool, Error<E>>
    where
        P: InputPin<Error = Infallible>,
    {
        if irq.is_high().map_err(Error::Pin)? {
            return Ok(false);
        }
        self.touched().await
    }

    /// Latest sample, clearing the touch interrupt flag
    pub async fn read_touch(&mut self) -> Result<TouchSample, Error<E>> {
        let pressed = self.touched().await?;
        let high_x = self.read_register(Register::Tpxh).await?;
        let high_y = self.read_register(Register::Tpyh).await?;
        let low = self.read_register(Register::Tpxyl).await?;
        self.write_register(Register::Intc2, intc::TOUCH).await?;

        let sample = TouchSample {
            x: ((high_x as u16) << 2) | (low & 0x03) as u16,
            y: ((high_y as u16) << 2) | ((low >> 2) & 0x03) as u16,
            pressed,
        };
        trace!("touch {=u16} {=u16} {=bool}", sample.x, sample.y, sample.pressed);
        Ok(sample)
    }
}

#[cfg(all(test, not(feature = "async")))]
mod tests {
    use super::*;
    use crate::OperatingMode;
    use crate::sim::{FakeChip, Op, initialized};

    const PRESSED: TouchSample = TouchSample {
        x: 0,
        y: 0,
        pressed: true,
    };

    #[test]
    fn enable_programs_sampler() {
        let mut chip = FakeChip::new();
        chip.regs[0xF0] = 0x02;
        let mut display = initialized(chip);

        display.enable_touch(TouchConfig::default()).unwrap();

        let regs = &display.di.regs;
        assert_eq!(regs[0x70], 0x80 | 0x30 | 0x08 | 0x04);
        assert_eq!(regs[0x71], 0x04);
        assert_eq!(regs[0xF0], 0x06);
        assert_eq!(display.di.log[1], Op::Write(0xF1, 0x04));
        assert_eq!(display.mode(), Some(OperatingMode::Graphics));
    }

    #[test]
    fn small_panels_use_faster_adc() {
        let config = TouchConfig::for_size(DisplaySize::Size480x272);
        assert_eq!(config.adc_clock, AdcClock::Div4);
        assert_eq!(config.tpcr0(), 0xBA);
    }

    #[test]
    fn disable_clears_interrupt_enable() {
        let mut display = initialized(FakeChip::new());
        display.enable_touch(TouchConfig::default()).unwrap();

        display.disable_touch().unwrap();

        assert_eq!(display.di.regs[0xF0] & intc::TOUCH, 0);
        assert_eq!(display.di.regs[0x70], tpcr0::DISABLE);
    }

    #[test]
    fn sample_assembles_ten_bits() {
        let mut chip = FakeChip::new();
        chip.regs[0x72] = 0xC8;
        chip.regs[0x73] = 0x32;
        chip.regs[0x74] = 0b1001;
        chip.regs[0xF1] = intc::TOUCH;
        let mut display = initialized(chip);

        let sample = display.read_touch().unwrap();

        assert_eq!(
            sample,
            TouchSample {
                x: 0x321,
                y: 0x0CA,
                pressed: true,
            }
        );
        assert_eq!(display.di.log.last(), Some(&Op::Write(0xF1, intc::TOUCH)));
    }

    struct IrqLine(bool);

    impl embedded_hal::digital::ErrorType for IrqLine {
        type Error = Infallible;
    }

    impl InputPin for IrqLine {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    #[test]
    fn released_irq_line_skips_bus() {
        let mut display = initialized(FakeChip::new());
        display.di.regs[0xF1] = intc::TOUCH;

        assert!(!display.touched_irq(&mut IrqLine(true)).unwrap());
        assert!(display.di.log.is_empty());

        assert!(display.touched_irq(&mut IrqLine(false)).unwrap());
        assert_eq!(display.di.log, [Op::Select(0xF1), Op::Read(0xF1)]);
    }

    #[test]
    fn touched_reads_flag() {
        let mut display = initialized(FakeChip::new());
        assert!(!display.touched().unwrap());

        display.di.regs[0xF1] = intc::TOUCH;
        assert!(display.touched().unwrap());
    }

    #[test]
    fn calibration_maps_edges() {
        let cal = Calibration {
            x_min: 100,
            x_max: 900,
            y_min: 150,
            y_max: 850,
            width: 800,
            height: 480,
        };

        assert_eq!(cal.map(TouchSample { x: 100, y: 150, ..PRESSED }), Some((0, 0)));
        assert_eq!(cal.map(TouchSample { x: 900, y: 850, ..PRESSED }), Some((799, 479)));
        assert_eq!(cal.map(TouchSample { x: 500, y: 500, ..PRESSED }), Some((399, 239)));
        assert_eq!(cal.map(TouchSample { x: 20, y: 1000, ..PRESSED }), Some((0, 479)));
    }

    #[test]
    fn calibration_handles_inverted_axes() {
        let cal = Calibration {
            x_min: 900,
            x_max: 100,
            ..Calibration::new(DisplaySize::Size800x480)
        };

        assert_eq!(cal.map(TouchSample { x: 900, y: 0, ..PRESSED }), Some((0, 0)));
        assert_eq!(cal.map(TouchSample { x: 100, y: 1023, ..PRESSED }), Some((799, 479)));
    }

    #[test]
    fn calibration_rejects_release_and_degenerate_ranges() {
        let cal = Calibration::new(DisplaySize::Size480x272);
        assert_eq!(cal.map(TouchSample { pressed: false, ..PRESSED }), None);

        let flat = Calibration { x_max: 0, ..cal };
        assert_eq!(flat.map(PRESSED), None);
    }
}
