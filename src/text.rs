use core::convert::Infallible;

use embedded_graphics_core::pixelcolor::Rgb565;
use embedded_hal::digital::OutputPin;

use crate::registers::*;
use crate::{Engine, Error, Interface, InvalidParameter, OperatingMode, Ra8875, Timer};

/// Character set of the internal font ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FontCoding {
    #[default]
    Iso8859_1 = 0x00,
    Iso8859_2 = 0x01,
    Iso8859_3 = 0x02,
    Iso8859_4 = 0x03,
}

/// Internal font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Font {
    pub coding: FontCoding,
    /// Extra pixels between characters, 0..=63
    pub spacing: u8,
}

const MAX_SCALE: u8 = 3;

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
    /// Place the text cursor. Repeating the last position written is free.
    pub async fn set_cursor(&mut self, x: u16, y: u16) -> Result<(), Error<E>> {
        if x >= self.width() || y >= self.height() {
            return Err(InvalidParameter::Coordinate { x, y }.into());
        }
        self.ensure_mode(OperatingMode::Text).await?;
        if self.text_cursor == Some((x, y)) {
            return Ok(());
        }

        let dy = self.config.size.vertical_offset();
        self.write_register16(Register16::FontCursorX, x).await?;
        self.write_register16(Register16::FontCursorY, y + dy).await?;
        self.text_cursor = Some((x, y));
        Ok(())
    }

    /// Opaque text: `fg` for glyphs, `bg` behind them
    pub async fn set_text_color(&mut self, fg: Rgb565, bg: Rgb565) -> Result<(), Error<E>> {
        self.ensure_mode(OperatingMode::Text).await?;
        self.write_foreground(fg).await?;
        self.write_background(bg).await?;
        let fncr1 = self.read_register(Register::Fncr1).await?;
        self.write_data(&[fncr1 & !fncr1::TRANSPARENT]).await
    }

    /// Glyphs in `color`, background left untouched
    pub async fn set_text_transparent(&mut self, color: Rgb565) -> Result<(), Error<E>> {
        self.ensure_mode(OperatingMode::Text).await?;
        self.write_foreground(color).await?;
        let fncr1 = self.read_register(Register::Fncr1).await?;
        self.write_data(&[fncr1 | fncr1::TRANSPARENT]).await
    }

    /// Enlarge glyphs by `scale + 1` in both directions
    pub async fn set_text_scale(&mut self, scale: u8) -> Result<(), Error<E>> {
        if scale > MAX_SCALE {
            return Err(InvalidParameter::FontScale(scale).into());
        }
        self.ensure_mode(OperatingMode::Text).await?;
        let fncr1 = self.read_register(Register::Fncr1).await?;
        let value = (fncr1 & !fncr1::SCALE_MASK) | (scale << 2) | scale;
        self.write_data(&[value]).await
    }

    pub async fn select_font(&mut self, font: Font) -> Result<(), Error<E>> {
        if font.spacing > fwtset::SPACING_MASK {
            return Err(InvalidParameter::CharacterSpacing(font.spacing).into());
        }
        self.ensure_mode(OperatingMode::Text).await?;
        self.configure_font(font).await
    }

    /// Internal ROM font with the given coding and spacing, mode untouched
    pub(crate) async fn configure_font(&mut self, font: Font) -> Result<(), Error<E>> {
        let fncr0 = self.read_register(Register::Fncr0).await?;
        let source = fncr0 & !(fncr0::CGRAM | fncr0::EXTERNAL | fncr0::CODING_MASK);
        self.write_data(&[source | font.coding as u8]).await?;

        let fwtset = self.read_register(Register::Fwtset).await?;
        self.write_data(&[(fwtset & !fwtset::SPACING_MASK) | font.spacing])
            .await
    }

    /// Render `text` at the text cursor.
    ///
    /// Characters outside Latin-1 are sent as `?`; pick the ROM coding with
    /// [`Ra8875::select_font`] for the other ISO-8859 parts and use
    /// [`Ra8875::write_bytes`] for them.
    pub async fn write_text(&mut self, text: &str) -> Result<(), Error<E>> {
        self.begin_text().await?;
        for c in text.chars() {
            let byte = u8::try_from(c).unwrap_or(b'?');
            self.write_char(byte).await?;
        }
        Ok(())
    }

    /// Render raw character codes at the text cursor
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        self.begin_text().await?;
        for &byte in bytes {
            self.write_char(byte).await?;
        }
        Ok(())
    }

    async fn begin_text(&mut self) -> Result<(), Error<E>> {
        self.ensure_mode(OperatingMode::Text).await?;
        // The chip moves the cursor on its own from here
        self.text_cursor = None;
        self.write_command(Register::Mrwc.into()).await
    }

    async fn write_char(&mut self, byte: u8) -> Result<(), Error<E>> {
        self.write_data(&[byte]).await?;
        self.wait_for(Engine::Font).await
    }
}
