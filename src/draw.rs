//! Hardware-accelerated drawing.
//!
//! Every primitive follows the same sequence: validate against the panel,
//! switch to graphics mode, fill the argument registers, write the colour,
//! write the trigger register last, then wait on the engine that owns the
//! primitive. Geometry that does not fit the panel is rejected before
//! anything is sent, including the full extent of circles, ellipses and
//! curves; nothing is clamped or left for the chip to clip.

use core::convert::Infallible;

use embedded_graphics_core::pixelcolor::raw::{RawData, RawU16};
use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor};
use embedded_hal::digital::OutputPin;

use crate::registers::*;
use crate::{
    ColorDepth, Engine, Error, Interface, InvalidParameter, OperatingMode, Ra8875, Timer,
};

/// Quarter of an ellipse drawn by a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CurvePart {
    BottomLeft = 0,
    TopLeft = 1,
    TopRight = 2,
    BottomRight = 3,
}

/// One geometric primitive for the drawing engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrawCommand {
    Line {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
    },
    Rect {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        filled: bool,
    },
    /// Rectangle with elliptical corners of `rx` by `ry`
    RoundRect {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        rx: u16,
        ry: u16,
        filled: bool,
    },
    Circle {
        x: u16,
        y: u16,
        radius: u16,
        filled: bool,
    },
    Ellipse {
        x: u16,
        y: u16,
        rx: u16,
        ry: u16,
        filled: bool,
    },
    Curve {
        x: u16,
        y: u16,
        rx: u16,
        ry: u16,
        part: CurvePart,
        filled: bool,
    },
    Triangle {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        x3: u16,
        y3: u16,
        filled: bool,
    },
}

impl DrawCommand {
    fn validate(&self, width: u16, height: u16) -> Result<(), InvalidParameter> {
        match *self {
            DrawCommand::Line { x1, y1, x2, y2 } | DrawCommand::Rect { x1, y1, x2, y2, .. } => {
                point(x1, y1, width, height)?;
                point(x2, y2, width, height)
            }
            DrawCommand::RoundRect {
                x1,
                y1,
                x2,
                y2,
                rx,
                ry,
                ..
            } => {
                point(x1, y1, width, height)?;
                point(x2, y2, width, height)?;
                if rx as u32 * 2 > x1.abs_diff(x2) as u32 {
                    return Err(InvalidParameter::Radius(rx));
                }
                if ry as u32 * 2 > y1.abs_diff(y2) as u32 {
                    return Err(InvalidParameter::Radius(ry));
                }
                Ok(())
            }
            DrawCommand::Circle { x, y, radius, .. } => {
                point(x, y, width, height)?;
                // DCRR is a single byte
                if radius > u8::MAX as u16 {
                    return Err(InvalidParameter::Radius(radius));
                }
                let r = radius;
                extent(x, y, [r, r, r, r], width, height)
            }
            DrawCommand::Ellipse { x, y, rx, ry, .. } => {
                point(x, y, width, height)?;
                extent(x, y, [rx, rx, ry, ry], width, height)
            }
            DrawCommand::Curve {
                x, y, rx, ry, part, ..
            } => {
                point(x, y, width, height)?;
                let reach = match part {
                    CurvePart::BottomLeft => [rx, 0, 0, ry],
                    CurvePart::TopLeft => [rx, 0, ry, 0],
                    CurvePart::TopRight => [0, rx, ry, 0],
                    CurvePart::BottomRight => [0, rx, 0, ry],
                };
                extent(x, y, reach, width, height)
            }
            DrawCommand::Triangle {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
                ..
            } => {
                point(x1, y1, width, height)?;
                point(x2, y2, width, height)?;
                point(x3, y3, width, height)
            }
        }
    }

    /// Engine whose busy bit signals completion
    pub fn engine(&self) -> Engine {
        match self {
            DrawCommand::Line { .. } | DrawCommand::Rect { .. } | DrawCommand::Triangle { .. } => {
                Engine::LineSquareTriangle
            }
            DrawCommand::Circle { .. } => Engine::Circle,
            DrawCommand::Ellipse { .. } | DrawCommand::Curve { .. } | DrawCommand::RoundRect { .. } => {
                Engine::Ellipse
            }
        }
    }

    /// Register and value that start the engine
    fn trigger(&self) -> (Register, u8) {
        let fill = |filled: bool, bit: u8| if filled { bit } else { 0 };
        match *self {
            DrawCommand::Line { .. } => (
                Register::Dcr,
                dcr::LINE_SQUARE_TRIANGLE_START | dcr::DRAW_LINE,
            ),
            DrawCommand::Rect { filled, .. } => (
                Register::Dcr,
                dcr::LINE_SQUARE_TRIANGLE_START | dcr::DRAW_SQUARE | fill(filled, dcr::FILL),
            ),
            DrawCommand::Triangle { filled, .. } => (
                Register::Dcr,
                dcr::LINE_SQUARE_TRIANGLE_START | dcr::DRAW_TRIANGLE | fill(filled, dcr::FILL),
            ),
            DrawCommand::Circle { filled, .. } => (
                Register::Dcr,
                dcr::CIRCLE_START | fill(filled, dcr::FILL),
            ),
            DrawCommand::Ellipse { filled, .. } => (
                Register::Ellcr,
                ellcr::START | fill(filled, ellcr::FILL),
            ),
            DrawCommand::Curve { part, filled, .. } => (
                Register::Ellcr,
                ellcr::START
                    | ellcr::CURVE
                    | fill(filled, ellcr::FILL)
                    | (part as u8 & ellcr::CURVE_PART_MASK),
            ),
            DrawCommand::RoundRect { filled, .. } => (
                Register::Ellcr,
                ellcr::START | ellcr::ROUNDED_RECT | fill(filled, ellcr::FILL),
            ),
        }
    }
}

/// BTE raster operations, S = source, D = destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RasterOp {
    Black = 0x0,
    /// !(S | D)
    Nor = 0x1,
    /// !S & D
    NotSourceAndDest = 0x2,
    /// !S
    NotSource = 0x3,
    /// S & !D
    SourceAndNotDest = 0x4,
    /// !D
    NotDest = 0x5,
    /// S ^ D
    Xor = 0x6,
    /// !(S & D)
    Nand = 0x7,
    /// S & D
    And = 0x8,
    /// !(S ^ D)
    Xnor = 0x9,
    /// D
    Dest = 0xA,
    /// !S | D
    NotSourceOrDest = 0xB,
    /// S
    Source = 0xC,
    /// S | !D
    SourceOrNotDest = 0xD,
    /// S | D
    Or = 0xE,
    White = 0xF,
}

/// Rectangular copy inside display memory through the BTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockMove {
    pub src_x: u16,
    pub src_y: u16,
    pub dst_x: u16,
    pub dst_y: u16,
    pub width: u16,
    pub height: u16,
    pub rop: RasterOp,
}

impl BlockMove {
    fn overlaps(&self) -> bool {
        let (sx, sy, dx, dy) = (
            self.src_x as u32,
            self.src_y as u32,
            self.dst_x as u32,
            self.dst_y as u32,
        );
        let (w, h) = (self.width as u32, self.height as u32);
        sx < dx + w && dx < sx + w && sy < dy + h && dy < sy + h
    }

    /// Overlapping copies towards the end of memory must run backwards,
    /// starting from the bottom-right corners
    fn runs_backwards(&self) -> bool {
        self.overlaps() && (self.dst_y, self.dst_x) > (self.src_y, self.src_x)
    }
}

fn point(x: u16, y: u16, width: u16, height: u16) -> Result<(), InvalidParameter> {
    if x >= width || y >= height {
        return Err(InvalidParameter::Coordinate { x, y });
    }
    Ok(())
}

/// Shape around `(x, y)` reaching `[left, right, up, down]` pixels must stay
/// on the panel
fn extent(x: u16, y: u16, reach: [u16; 4], width: u16, height: u16) -> Result<(), InvalidParameter> {
    let [left, right, up, down] = reach.map(u32::from);
    let (x, y) = (x as u32, y as u32);
    if x < left || x + right >= width as u32 || y < up || y + down >= height as u32 {
        return Err(InvalidParameter::Area);
    }
    Ok(())
}

/// Last pixel of a run of `len` starting at `start`; zero length is the
/// start pixel itself
fn span_end(start: u16, len: u16) -> Result<u16, InvalidParameter> {
    start
        .checked_add(len.saturating_sub(1))
        .ok_or(InvalidParameter::Area)
}

fn area(x: u16, y: u16, w: u16, h: u16, width: u16, height: u16) -> Result<(), InvalidParameter> {
    if x as u32 + w as u32 > width as u32 || y as u32 + h as u32 > height as u32 {
        return Err(InvalidParameter::Area);
    }
    Ok(())
}

/// Colour register values: R5/G6/B5, or R3/G3/B2 at 8 bpp
fn color_components(color: Rgb565, depth: ColorDepth) -> [u8; 3] {
    match depth {
        ColorDepth::Bpp16 => [color.r(), color.g(), color.b()],
        ColorDepth::Bpp8 => [color.r() >> 2, color.g() >> 3, color.b() >> 3],
    }
}

fn to_rgb332(color: Rgb565) -> u8 {
    ((color.r() >> 2) << 5) | ((color.g() >> 3) << 2) | (color.b() >> 3)
}

fn from_rgb332(value: u8) -> Rgb565 {
    Rgb565::new((value >> 5) << 2, ((value >> 2) & 0x07) << 3, (value & 0x03) << 3)
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
    /// Encode, start and wait for one primitive.
    ///
    /// On success the shape is in display memory. On timeout the mode mirror
    /// is left as it was and nothing further is written.
    pub async fn draw(&mut self, command: DrawCommand, color: Rgb565) -> Result<(), Error<E>> {
        command.validate(self.width(), self.height())?;
        self.ensure_mode(OperatingMode::Graphics).await?;

        let dy = self.config.size.vertical_offset();
        match command {
            DrawCommand::Line { x1, y1, x2, y2 } | DrawCommand::Rect { x1, y1, x2, y2, .. } => {
                self.write_segment(x1, y1 + dy, x2, y2 + dy).await?;
            }
            DrawCommand::RoundRect {
                x1,
                y1,
                x2,
                y2,
                rx,
                ry,
                ..
            } => {
                self.write_segment(x1, y1 + dy, x2, y2 + dy).await?;
                self.write_register16(Register16::Elah, rx).await?;
                self.write_register16(Register16::Elav, ry).await?;
            }
            DrawCommand::Circle { x, y, radius, .. } => {
                self.write_register16(Register16::Dchr, x).await?;
                self.write_register16(Register16::Dcvr, y + dy).await?;
                self.write_register(Register::Dcrr, radius as u8).await?;
            }
            DrawCommand::Ellipse { x, y, rx, ry, .. } | DrawCommand::Curve { x, y, rx, ry, .. } => {
                self.write_register16(Register16::Deh, x).await?;
                self.write_register16(Register16::Dev, y + dy).await?;
                self.write_register16(Register16::Elah, rx).await?;
                self.write_register16(Register16::Elav, ry).await?;
            }
            DrawCommand::Triangle {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
                ..
            } => {
                self.write_segment(x1, y1 + dy, x2, y2 + dy).await?;
                self.write_register16(Register16::Dtph, x3).await?;
                self.write_register16(Register16::Dtpv, y3 + dy).await?;
            }
        }

        self.write_foreground(color).await?;

        let (register, start) = command.trigger();
        self.write_register(register, start).await?;
        self.wait_for(command.engine()).await
    }

    async fn write_segment(&mut self, x1: u16, y1: u16, x2: u16, y2: u16) -> Result<(), Error<E>> {
        self.write_register16(Register16::Dlhsr, x1).await?;
        self.write_register16(Register16::Dlvsr, y1).await?;
        self.write_register16(Register16::Dlher, x2).await?;
        self.write_register16(Register16::Dlver, y2).await
    }

    pub(crate) async fn write_foreground(&mut self, color: Rgb565) -> Result<(), Error<E>> {
        let [r, g, b] = color_components(color, self.config.color_depth);
        self.write_register(Register::Fgcr0, r).await?;
        self.write_register(Register::Fgcr1, g).await?;
        self.write_register(Register::Fgcr2, b).await
    }

    pub(crate) async fn write_background(&mut self, color: Rgb565) -> Result<(), Error<E>> {
        let [r, g, b] = color_components(color, self.config.color_depth);
        self.write_register(Register::Bgcr0, r).await?;
        self.write_register(Register::Bgcr1, g).await?;
        self.write_register(Register::Bgcr2, b).await
    }

    pub async fn line(&mut self, x1: u16, y1: u16, x2: u16, y2: u16, color: Rgb565) -> Result<(), Error<E>> {
        self.draw(DrawCommand::Line { x1, y1, x2, y2 }, color).await
    }

    pub async fn hline(&mut self, x: u16, y: u16, width: u16, color: Rgb565) -> Result<(), Error<E>> {
        let x2 = span_end(x, width)?;
        self.line(x, y, x2, y, color).await
    }

    pub async fn vline(&mut self, x: u16, y: u16, height: u16, color: Rgb565) -> Result<(), Error<E>> {
        let y2 = span_end(y, height)?;
        self.line(x, y, x, y2, color).await
    }

    pub async fn rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        self.rect_helper(x, y, width, height, color, false).await
    }

    pub async fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        self.rect_helper(x, y, width, height, color, true).await
    }

    async fn rect_helper(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: Rgb565,
        filled: bool,
    ) -> Result<(), Error<E>> {
        let command = DrawCommand::Rect {
            x1: x,
            y1: y,
            x2: span_end(x, width)?,
            y2: span_end(y, height)?,
            filled,
        };
        self.draw(command, color).await
    }

    /// Fill the whole panel
    pub async fn fill(&mut self, color: Rgb565) -> Result<(), Error<E>> {
        let (width, height) = (self.width(), self.height());
        self.fill_rect(0, 0, width, height, color).await
    }

    pub async fn round_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        radius: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        self.round_rect_helper(x, y, width, height, radius, color, false)
            .await
    }

    pub async fn fill_round_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        radius: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        self.round_rect_helper(x, y, width, height, radius, color, true)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn round_rect_helper(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        radius: u16,
        color: Rgb565,
        filled: bool,
    ) -> Result<(), Error<E>> {
        let command = DrawCommand::RoundRect {
            x1: x,
            y1: y,
            x2: span_end(x, width)?,
            y2: span_end(y, height)?,
            rx: radius,
            ry: radius,
            filled,
        };
        self.draw(command, color).await
    }

    pub async fn circle(&mut self, x: u16, y: u16, radius: u16, color: Rgb565) -> Result<(), Error<E>> {
        let command = DrawCommand::Circle {
            x,
            y,
            radius,
            filled: false,
        };
        self.draw(command, color).await
    }

    pub async fn fill_circle(&mut self, x: u16, y: u16, radius: u16, color: Rgb565) -> Result<(), Error<E>> {
        let command = DrawCommand::Circle {
            x,
            y,
            radius,
            filled: true,
        };
        self.draw(command, color).await
    }

    pub async fn ellipse(&mut self, x: u16, y: u16, rx: u16, ry: u16, color: Rgb565) -> Result<(), Error<E>> {
        let command = DrawCommand::Ellipse {
            x,
            y,
            rx,
            ry,
            filled: false,
        };
        self.draw(command, color).await
    }

    pub async fn fill_ellipse(
        &mut self,
        x: u16,
        y: u16,
        rx: u16,
        ry: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        let command = DrawCommand::Ellipse {
            x,
            y,
            rx,
            ry,
            filled: true,
        };
        self.draw(command, color).await
    }

    /// Quarter ellipse centred on `(x, y)`
    pub async fn curve(
        &mut self,
        x: u16,
        y: u16,
        rx: u16,
        ry: u16,
        part: CurvePart,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        let command = DrawCommand::Curve {
            x,
            y,
            rx,
            ry,
            part,
            filled: false,
        };
        self.draw(command, color).await
    }

    pub async fn fill_curve(
        &mut self,
        x: u16,
        y: u16,
        rx: u16,
        ry: u16,
        part: CurvePart,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        let command = DrawCommand::Curve {
            x,
            y,
            rx,
            ry,
            part,
            filled: true,
        };
        self.draw(command, color).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn triangle(
        &mut self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        x3: u16,
        y3: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        let command = DrawCommand::Triangle {
            x1,
            y1,
            x2,
            y2,
            x3,
            y3,
            filled: false,
        };
        self.draw(command, color).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn fill_triangle(
        &mut self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        x3: u16,
        y3: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        let command = DrawCommand::Triangle {
            x1,
            y1,
            x2,
            y2,
            x3,
            y3,
            filled: true,
        };
        self.draw(command, color).await
    }

    /// Move the graphics write cursor
    pub async fn set_graphics_cursor(&mut self, x: u16, y: u16) -> Result<(), Error<E>> {
        point(x, y, self.width(), self.height())?;
        self.ensure_mode(OperatingMode::Graphics).await?;
        let dy = self.config.size.vertical_offset();
        self.write_register16(Register16::Curh, x).await?;
        self.write_register16(Register16::Curv, y + dy).await
    }

    /// Write a single pixel through the memory port
    pub async fn pixel(&mut self, x: u16, y: u16, color: Rgb565) -> Result<(), Error<E>> {
        self.set_graphics_cursor(x, y).await?;
        self.write_command(Register::Mrwc.into()).await?;
        match self.config.color_depth {
            ColorDepth::Bpp16 => {
                let raw = RawU16::from(color).into_inner();
                self.write_data(&raw.to_be_bytes()).await
            }
            ColorDepth::Bpp8 => self.write_data(&[to_rgb332(color)]).await,
        }
    }

    /// Stream pre-formatted pixel data from the current graphics cursor
    pub async fn push_pixels(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        self.ensure_mode(OperatingMode::Graphics).await?;
        self.write_command(Register::Mrwc.into()).await?;
        self.write_data(data).await
    }

    /// Read one pixel back from display memory
    pub async fn read_pixel(&mut self, x: u16, y: u16) -> Result<Rgb565, Error<E>> {
        point(x, y, self.width(), self.height())?;
        self.ensure_mode(OperatingMode::Graphics).await?;
        let dy = self.config.size.vertical_offset();
        self.write_register16(Register16::Rcurh, x).await?;
        self.write_register16(Register16::Rcurv, y + dy).await?;
        self.write_command(Register::Mrwc.into()).await?;

        // The first pixel out of the read FIFO is stale
        match self.config.color_depth {
            ColorDepth::Bpp16 => {
                let mut pixel = [0u8; 2];
                self.di.read_data(&mut pixel).await.map_err(Error::Comm)?;
                self.di.read_data(&mut pixel).await.map_err(Error::Comm)?;
                Ok(Rgb565::from(RawU16::new(u16::from_be_bytes(pixel))))
            }
            ColorDepth::Bpp8 => {
                let _ = self.read_data().await?;
                let value = self.read_data().await?;
                Ok(from_rgb332(value))
            }
        }
    }

    /// Restrict drawing and memory writes to a window of the panel
    pub async fn set_active_window(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Result<(), Error<E>> {
        area(x, y, width, height, self.width(), self.height())?;
        let dy = self.config.size.vertical_offset();
        self.write_register16(Register16::Hsaw, x).await?;
        self.write_register16(Register16::Heaw, span_end(x, width)?)
            .await?;
        self.write_register16(Register16::Vsaw, y + dy).await?;
        self.write_register16(Register16::Veaw, span_end(y, height)? + dy)
            .await
    }

    pub async fn reset_active_window(&mut self) -> Result<(), Error<E>> {
        let (width, height) = (self.width(), self.height());
        self.set_active_window(0, 0, width, height).await
    }

    /// Clear all of display memory
    pub async fn clear_memory(&mut self) -> Result<(), Error<E>> {
        self.write_register(Register::Mclr, mclr::START | mclr::FULL)
            .await?;
        let timeout = self.config.clear_timeout;
        self.wait_while_busy(Engine::MemoryClear, timeout).await
    }

    /// Copy a block of display memory, combining it with the destination
    /// through `rop`
    pub async fn block_move(&mut self, block: BlockMove) -> Result<(), Error<E>> {
        let (width, height) = (self.width(), self.height());
        area(block.src_x, block.src_y, block.width, block.height, width, height)?;
        area(block.dst_x, block.dst_y, block.width, block.height, width, height)?;
        self.ensure_mode(OperatingMode::Graphics).await?;

        let (src_x, src_y, dst_x, dst_y, operation) = if block.runs_backwards() {
            (
                span_end(block.src_x, block.width)?,
                span_end(block.src_y, block.height)?,
                span_end(block.dst_x, block.width)?,
                span_end(block.dst_y, block.height)?,
                becr1::MOVE_NEGATIVE,
            )
        } else {
            (
                block.src_x,
                block.src_y,
                block.dst_x,
                block.dst_y,
                becr1::MOVE_POSITIVE,
            )
        };

        let dy = self.config.size.vertical_offset();
        self.write_register16(Register16::Hsbe, src_x).await?;
        self.write_register16(Register16::Vsbe, src_y + dy).await?;
        self.write_register16(Register16::Hdbe, dst_x).await?;
        self.write_register16(Register16::Vdbe, dst_y + dy).await?;
        self.write_register16(Register16::Bewr, block.width).await?;
        self.write_register16(Register16::Behr, block.height).await?;
        self.write_register(Register::Becr1, ((block.rop as u8) << 4) | operation)
            .await?;

        self.write_register(Register::Becr0, becr0::START).await?;
        self.wait_for(Engine::BlockTransfer).await
    }

    /// Solid fill through the BTE
    pub async fn block_fill(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: Rgb565,
    ) -> Result<(), Error<E>> {
        area(x, y, width, height, self.width(), self.height())?;
        self.ensure_mode(OperatingMode::Graphics).await?;

        let dy = self.config.size.vertical_offset();
        self.write_register16(Register16::Hdbe, x).await?;
        self.write_register16(Register16::Vdbe, y + dy).await?;
        self.write_register16(Register16::Bewr, width).await?;
        self.write_register16(Register16::Behr, height).await?;
        self.write_register(Register::Becr1, becr1::SOLID_FILL).await?;
        self.write_foreground(color).await?;

        self.write_register(Register::Becr0, becr0::START).await?;
        self.wait_for(Engine::BlockTransfer).await
    }
}

#[cfg(all(test, not(feature = "async")))]
mod tests {
    use super::*;
    use crate::sim::{self, FakeChip, Op, driver, initialized};
    use crate::DisplaySize;

    const RED: Rgb565 = Rgb565::new(31, 0, 0);

    fn reg16(display: &crate::Ra8875<FakeChip, crate::NoResetPin, sim::NoDelay>, r: Register16) -> u16 {
        let regs = &display.di.regs;
        u16::from_le_bytes([regs[r.low() as usize], regs[r.high() as usize]])
    }

    fn mode_writes(log: &[Op]) -> usize {
        log.iter()
            .filter(|op| matches!(op, Op::Write(0x40, _)))
            .count()
    }

    #[test]
    fn filled_rect_from_text_mode() {
        let mut display = initialized(FakeChip::new());
        display.ensure_mode(OperatingMode::Text).unwrap();
        display.di.log.clear();

        display
            .draw(
                DrawCommand::Rect {
                    x1: 10,
                    y1: 10,
                    x2: 50,
                    y2: 50,
                    filled: true,
                },
                Rgb565::from(RawU16::new(0xF800)),
            )
            .unwrap();

        let log = &display.di.log;
        assert_eq!(mode_writes(log), 1);
        let first_mode = log.iter().position(|op| matches!(op, Op::Write(0x40, _)));
        let first_arg = log.iter().position(|op| matches!(op, Op::Write(0x91, _)));
        assert!(first_mode < first_arg);

        assert_eq!(reg16(&display, Register16::Dlhsr), 10);
        assert_eq!(reg16(&display, Register16::Dlvsr), 10);
        assert_eq!(reg16(&display, Register16::Dlher), 50);
        assert_eq!(reg16(&display, Register16::Dlver), 50);
        assert_eq!(&display.di.regs[0x63..=0x65], &[31, 0, 0]);

        let triggers: std::vec::Vec<_> = log
            .iter()
            .filter(|op| matches!(op, Op::Write(0x90, _)))
            .collect();
        assert_eq!(triggers, [&Op::Write(0x90, 0xB0)]);
        assert_eq!(log.last(), Some(&Op::Read(0x90)));
        assert_eq!(display.mode(), Some(OperatingMode::Graphics));
    }

    #[test]
    fn trigger_is_written_after_arguments() {
        let mut display = initialized(FakeChip::new());

        display.line(1, 2, 3, 4, RED).unwrap();

        assert_eq!(display.di.writes_after(0x90), 0);
        let trigger = display
            .di
            .log
            .iter()
            .position(|op| matches!(op, Op::Write(0x90, 0x80)))
            .unwrap();
        let last_color = display
            .di
            .log
            .iter()
            .rposition(|op| matches!(op, Op::Write(0x65, _)))
            .unwrap();
        assert!(last_color < trigger);
    }

    #[test]
    fn drawing_run_switches_mode_at_most_once() {
        let mut display = initialized(FakeChip::new());
        display.ensure_mode(OperatingMode::Text).unwrap();
        display.di.log.clear();

        display.line(0, 0, 10, 10, RED).unwrap();
        display.fill_circle(100, 100, 20, RED).unwrap();
        display.rect(5, 5, 10, 10, RED).unwrap();
        display.ellipse(200, 200, 40, 20, RED).unwrap();

        assert_eq!(mode_writes(&display.di.log), 1);
    }

    #[test]
    fn stuck_triangle_times_out() {
        let mut display = initialized(FakeChip::new());
        display.di.stuck = true;
        let before = display.mode();

        let result = display.fill_triangle(0, 0, 50, 0, 25, 40, RED);

        assert!(matches!(
            result,
            Err(Error::Timeout(Engine::LineSquareTriangle))
        ));
        assert_eq!(display.di.writes_after(0x90), 0);
        assert_eq!(display.mode(), before);
        assert_eq!(reg16(&display, Register16::Dtph), 25);
        assert_eq!(reg16(&display, Register16::Dtpv), 40);
        assert_eq!(display.di.regs[0x90], 0xA1);
    }

    #[test]
    fn out_of_bounds_touches_nothing() {
        let mut display = initialized(FakeChip::new());

        let result = display.line(0, 0, 800, 10, RED);

        assert!(matches!(
            result,
            Err(Error::InvalidParameter(InvalidParameter::Coordinate { x: 800, y: 10 }))
        ));
        assert!(display.di.log.is_empty());
    }

    #[test]
    fn zero_sized_shapes_reach_the_chip() {
        let mut display = initialized(FakeChip::new());

        display.fill_rect(10, 10, 0, 0, RED).unwrap();
        assert_eq!(reg16(&display, Register16::Dlher), 10);

        display.circle(30, 30, 0, RED).unwrap();
        assert_eq!(display.di.regs[Register::Dcrr as usize], 0);
        assert_eq!(display.di.regs[0x90] & 0x40, 0);
    }

    #[test]
    fn circle_radius_fits_one_byte() {
        let mut display = initialized(FakeChip::new());

        assert!(matches!(
            display.circle(400, 240, 256, RED),
            Err(Error::InvalidParameter(InvalidParameter::Radius(256)))
        ));

        display.circle(400, 240, 239, RED).unwrap();
        assert_eq!(reg16(&display, Register16::Dchr), 400);
        assert_eq!(display.di.regs[Register::Dcrr as usize], 239);
        assert!(display
            .di
            .log
            .contains(&Op::Write(0x90, dcr::CIRCLE_START)));
    }

    #[test]
    fn round_shapes_must_stay_on_panel() {
        let mut display = initialized(FakeChip::new());

        for result in [
            display.circle(0, 0, 100, RED),
            display.circle(700, 100, 100, RED),
            display.fill_ellipse(400, 470, 50, 10, RED),
            display.curve(700, 300, 150, 20, CurvePart::TopRight, RED),
        ] {
            assert!(matches!(
                result,
                Err(Error::InvalidParameter(InvalidParameter::Area))
            ));
        }
        assert!(display.di.log.is_empty());

        display.circle(100, 100, 100, RED).unwrap();
        display.fill_ellipse(400, 469, 50, 10, RED).unwrap();
        display
            .curve(700, 300, 150, 20, CurvePart::BottomLeft, RED)
            .unwrap();
    }

    #[test]
    fn rounded_rect_uses_ellipse_engine() {
        let mut display = initialized(FakeChip::new());

        display.fill_round_rect(10, 20, 100, 50, 8, RED).unwrap();

        assert_eq!(reg16(&display, Register16::Dlher), 109);
        assert_eq!(reg16(&display, Register16::Dlver), 69);
        assert_eq!(reg16(&display, Register16::Elah), 8);
        assert!(display.di.log.contains(&Op::Write(0xA0, 0xE0)));
        assert_eq!(display.di.log.last(), Some(&Op::Read(0xA0)));

        assert!(matches!(
            display.round_rect(10, 20, 10, 50, 8, RED),
            Err(Error::InvalidParameter(InvalidParameter::Radius(8)))
        ));
    }

    #[test]
    fn curve_encodes_quadrant() {
        let mut display = initialized(FakeChip::new());

        display
            .fill_curve(100, 100, 30, 20, CurvePart::TopRight, RED)
            .unwrap();

        assert!(display.di.log.contains(&Op::Write(0xA0, 0xD2)));
        assert_eq!(reg16(&display, Register16::Deh), 100);
        assert_eq!(reg16(&display, Register16::Elav), 20);
    }

    #[test]
    fn short_panel_shifts_y() {
        let mut display = driver(FakeChip::new());
        display.config.size = DisplaySize::Size480x80;
        display.init().unwrap();

        display.line(0, 5, 479, 81, RED).unwrap();

        assert_eq!(reg16(&display, Register16::Dlvsr), 195);
        assert_eq!(reg16(&display, Register16::Dlver), 271);
        assert!(display.line(0, 82, 10, 10, RED).is_err());
    }

    #[test]
    fn pixel_goes_through_memory_port() {
        let mut display = initialized(FakeChip::new());

        display.pixel(3, 4, Rgb565::from(RawU16::new(0xF81F))).unwrap();

        assert_eq!(reg16(&display, Register16::Curh), 3);
        assert_eq!(reg16(&display, Register16::Curv), 4);
        assert_eq!(
            display.di.log.last(),
            Some(&Op::Memory(std::vec![0xF8, 0x1F]))
        );
    }

    #[test]
    fn read_pixel_skips_dummy() {
        let mut chip = FakeChip::new();
        chip.memory.extend([0xAA, 0xAA, 0x07, 0xE0]);
        let mut display = initialized(chip);

        let color = display.read_pixel(1, 1).unwrap();

        assert_eq!(RawU16::from(color).into_inner(), 0x07E0);
        assert_eq!(reg16(&display, Register16::Rcurh), 1);
    }

    #[test]
    fn eight_bit_colour_registers() {
        let mut display = driver(FakeChip::new());
        display.config.color_depth = ColorDepth::Bpp8;
        display.init().unwrap();

        display.fill(Rgb565::new(31, 63, 31)).unwrap();

        assert_eq!(&display.di.regs[0x63..=0x65], &[7, 7, 3]);
        assert_eq!(to_rgb332(Rgb565::new(31, 63, 31)), 0xFF);
        assert_eq!(from_rgb332(0xE0), Rgb565::new(28, 0, 0));
    }

    #[test]
    fn forward_block_move() {
        let mut display = initialized(FakeChip::new());

        display
            .block_move(BlockMove {
                src_x: 0,
                src_y: 0,
                dst_x: 200,
                dst_y: 100,
                width: 50,
                height: 40,
                rop: RasterOp::Source,
            })
            .unwrap();

        assert_eq!(reg16(&display, Register16::Hsbe), 0);
        assert_eq!(reg16(&display, Register16::Hdbe), 200);
        assert_eq!(reg16(&display, Register16::Vdbe), 100);
        assert_eq!(reg16(&display, Register16::Bewr), 50);
        assert_eq!(display.di.regs[Register::Becr1 as usize], 0xC2);
        assert_eq!(display.di.writes_after(0x50), 0);
        assert_eq!(display.di.log.last(), Some(&Op::Read(0x50)));
    }

    #[test]
    fn overlapping_block_move_runs_backwards() {
        let mut display = initialized(FakeChip::new());

        display
            .block_move(BlockMove {
                src_x: 10,
                src_y: 10,
                dst_x: 20,
                dst_y: 15,
                width: 30,
                height: 30,
                rop: RasterOp::Source,
            })
            .unwrap();

        assert_eq!(reg16(&display, Register16::Hsbe), 39);
        assert_eq!(reg16(&display, Register16::Vsbe), 39);
        assert_eq!(reg16(&display, Register16::Hdbe), 49);
        assert_eq!(reg16(&display, Register16::Vdbe), 44);
        assert_eq!(display.di.regs[Register::Becr1 as usize], 0xC3);
    }

    #[test]
    fn block_move_must_fit() {
        let mut display = initialized(FakeChip::new());

        let result = display.block_move(BlockMove {
            src_x: 0,
            src_y: 0,
            dst_x: 780,
            dst_y: 0,
            width: 30,
            height: 10,
            rop: RasterOp::Source,
        });

        assert!(matches!(
            result,
            Err(Error::InvalidParameter(InvalidParameter::Area))
        ));
        assert!(display.di.log.is_empty());
    }

    #[test]
    fn slow_bte_fill_is_waited_for() {
        let mut chip = FakeChip::new();
        chip.busy_polls = 3;
        let mut display = initialized(chip);

        display.block_fill(0, 0, 100, 100, RED).unwrap();

        let polls = display
            .di
            .log
            .iter()
            .filter(|op| matches!(op, Op::Read(0x50)))
            .count();
        assert_eq!(polls, 4);
        assert_eq!(display.di.regs[Register::Becr1 as usize], becr1::SOLID_FILL);
        assert_eq!(sim::delays(), 3_000);
    }
}
