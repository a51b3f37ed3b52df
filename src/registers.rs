//! RA8875 register map.
//!
//! Single-byte registers are listed in [`Register`]. Registers that hold a
//! 16-bit field split over two consecutive addresses (low byte first) are
//! listed in [`Register16`] by the address of their low byte, so a 16-bit
//! access can never be issued against a register that has no high half.

/// Bus phase prefix sent ahead of every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Phase {
    /// Write to the data port (register data or memory stream)
    DataWrite = 0x00,
    /// Read from the data port
    DataRead = 0x40,
    /// Select the register addressed by the next data phase
    CommandWrite = 0x80,
    /// Read the status register (STSR)
    StatusRead = 0xC0,
}

/// 8-bit registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Undocumented identification register, reads 0x75
    Id = 0x00,
    /// Power and Display Control (01h)
    Pwrr = 0x01,
    /// Memory Read/Write Command (02h) - data port for pixels and characters
    Mrwc = 0x02,
    /// Pixel Clock Setting (04h)
    Pcsr = 0x04,
    /// System Configuration (10h) - colour depth and MCU bus width
    Sysr = 0x10,
    /// LCD Horizontal Display Width (14h)
    Hdwr = 0x14,
    /// Horizontal Non-Display Period Fine Tuning (15h)
    Hndftr = 0x15,
    /// Horizontal Non-Display Period (16h)
    Hndr = 0x16,
    /// HSYNC Start Position (17h)
    Hstr = 0x17,
    /// HSYNC Pulse Width (18h)
    Hpwr = 0x18,
    /// VSYNC Pulse Width (1Fh)
    Vpwr = 0x1F,
    /// Display Configuration (20h) - layers and scan direction
    Dpcr = 0x20,
    /// Font Control 0 (21h) - font source and coding
    Fncr0 = 0x21,
    /// Font Control 1 (22h) - alignment, transparency, enlargement
    Fncr1 = 0x22,
    /// Font Write Type Setting (2Eh) - character spacing
    Fwtset = 0x2E,
    /// Memory Write Control 0 (40h) - graphics/text mode select
    Mwcr0 = 0x40,
    /// BTE Function Control 0 (50h) - start bit and busy status
    Becr0 = 0x50,
    /// BTE Function Control 1 (51h) - raster operation and operation code
    Becr1 = 0x51,
    /// Background Colour, red (60h)
    Bgcr0 = 0x60,
    /// Background Colour, green (61h)
    Bgcr1 = 0x61,
    /// Background Colour, blue (62h)
    Bgcr2 = 0x62,
    /// Foreground Colour, red (63h)
    Fgcr0 = 0x63,
    /// Foreground Colour, green (64h)
    Fgcr1 = 0x64,
    /// Foreground Colour, blue (65h)
    Fgcr2 = 0x65,
    /// Touch Panel Control 0 (70h)
    Tpcr0 = 0x70,
    /// Touch Panel Control 1 (71h)
    Tpcr1 = 0x71,
    /// Touch Panel X High Byte (72h)
    Tpxh = 0x72,
    /// Touch Panel Y High Byte (73h)
    Tpyh = 0x73,
    /// Touch Panel X/Y Low Bits (74h)
    Tpxyl = 0x74,
    /// PLL Control 1 (88h)
    Pllc1 = 0x88,
    /// PLL Control 2 (89h)
    Pllc2 = 0x89,
    /// PWM1 Control (8Ah)
    P1cr = 0x8A,
    /// PWM1 Duty Cycle (8Bh)
    P1dcr = 0x8B,
    /// PWM2 Control (8Ch)
    P2cr = 0x8C,
    /// PWM2 Duty Cycle (8Dh)
    P2dcr = 0x8D,
    /// Memory Clear Control (8Eh)
    Mclr = 0x8E,
    /// Draw Line/Circle/Square Control (90h)
    Dcr = 0x90,
    /// Draw Circle Radius (9Dh)
    Dcrr = 0x9D,
    /// Draw Ellipse/Curve/Rounded Rectangle Control (A0h)
    Ellcr = 0xA0,
    /// Extra General Purpose IO (C7h)
    Gpiox = 0xC7,
    /// Interrupt Control 1 (F0h) - interrupt enables
    Intc1 = 0xF0,
    /// Interrupt Control 2 (F1h) - interrupt flags, write 1 to clear
    Intc2 = 0xF1,
}

impl From<Register> for u8 {
    #[inline]
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// 16-bit fields, addressed by their low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register16 {
    /// LCD Vertical Display Height (19h/1Ah)
    Vdhr = 0x19,
    /// Vertical Non-Display Period (1Bh/1Ch)
    Vndr = 0x1B,
    /// VSYNC Start Position (1Dh/1Eh)
    Vstr = 0x1D,
    /// Font Write Cursor Horizontal Position (2Ah/2Bh)
    FontCursorX = 0x2A,
    /// Font Write Cursor Vertical Position (2Ch/2Dh)
    FontCursorY = 0x2C,
    /// Active Window Horizontal Start (30h/31h)
    Hsaw = 0x30,
    /// Active Window Vertical Start (32h/33h)
    Vsaw = 0x32,
    /// Active Window Horizontal End (34h/35h)
    Heaw = 0x34,
    /// Active Window Vertical End (36h/37h)
    Veaw = 0x36,
    /// Memory Write Cursor Horizontal Position (46h/47h)
    Curh = 0x46,
    /// Memory Write Cursor Vertical Position (48h/49h)
    Curv = 0x48,
    /// Memory Read Cursor Horizontal Position (4Ah/4Bh)
    Rcurh = 0x4A,
    /// Memory Read Cursor Vertical Position (4Ch/4Dh)
    Rcurv = 0x4C,
    /// BTE Horizontal Source Point (54h/55h)
    Hsbe = 0x54,
    /// BTE Vertical Source Point (56h/57h)
    Vsbe = 0x56,
    /// BTE Horizontal Destination Point (58h/59h)
    Hdbe = 0x58,
    /// BTE Vertical Destination Point (5Ah/5Bh)
    Vdbe = 0x5A,
    /// BTE Width (5Ch/5Dh)
    Bewr = 0x5C,
    /// BTE Height (5Eh/5Fh)
    Behr = 0x5E,
    /// Draw Line/Square Horizontal Start (91h/92h)
    Dlhsr = 0x91,
    /// Draw Line/Square Vertical Start (93h/94h)
    Dlvsr = 0x93,
    /// Draw Line/Square Horizontal End (95h/96h)
    Dlher = 0x95,
    /// Draw Line/Square Vertical End (97h/98h)
    Dlver = 0x97,
    /// Draw Circle Center Horizontal (99h/9Ah)
    Dchr = 0x99,
    /// Draw Circle Center Vertical (9Bh/9Ch)
    Dcvr = 0x9B,
    /// Ellipse/Rounded Rectangle Horizontal Axis (A1h/A2h)
    Elah = 0xA1,
    /// Ellipse/Rounded Rectangle Vertical Axis (A3h/A4h)
    Elav = 0xA3,
    /// Ellipse/Curve Center Horizontal (A5h/A6h)
    Deh = 0xA5,
    /// Ellipse/Curve Center Vertical (A7h/A8h)
    Dev = 0xA7,
    /// Triangle Third Point Horizontal (A9h/AAh)
    Dtph = 0xA9,
    /// Triangle Third Point Vertical (ABh/ACh)
    Dtpv = 0xAB,
}

impl Register16 {
    /// Address of the low byte
    #[inline]
    pub fn low(self) -> u8 {
        self as u8
    }

    /// Address of the high byte
    #[inline]
    pub fn high(self) -> u8 {
        self as u8 + 1
    }
}

pub const CHIP_ID: u8 = 0x75;

pub mod pwrr {
    pub const DISPLAY_ON: u8 = 0x80;
    pub const DISPLAY_OFF: u8 = 0x00;
    pub const SLEEP: u8 = 0x02;
    pub const NORMAL: u8 = 0x00;
    pub const SOFT_RESET: u8 = 0x01;
}

pub mod pllc {
    pub const PLLDIV1: u8 = 0x00;
    pub const DIV4: u8 = 0x02;
}

pub mod sysr {
    pub const BPP_8: u8 = 0x00;
    pub const BPP_16: u8 = 0x0C;
    pub const MCU_8: u8 = 0x00;
}

pub mod pcsr {
    pub const PDATL: u8 = 0x80;
    pub const CLK_2: u8 = 0x01;
    pub const CLK_4: u8 = 0x02;
}

pub mod hndftr {
    pub const DE_HIGH: u8 = 0x00;
}

pub mod hpwr {
    pub const LOW: u8 = 0x00;
}

pub mod vpwr {
    pub const LOW: u8 = 0x00;
}

pub mod dpcr {
    /// Horizontal scan direction, SEG(n-1) to SEG0
    pub const HDIR: u8 = 0x08;
    /// Vertical scan direction, COM(n-1) to COM0
    pub const VDIR: u8 = 0x04;
    pub const SCAN_MASK: u8 = HDIR | VDIR;
}

pub mod fncr0 {
    /// CGRAM instead of CGROM
    pub const CGRAM: u8 = 1 << 7;
    /// External instead of internal CGROM
    pub const EXTERNAL: u8 = 1 << 5;
    pub const CODING_MASK: u8 = 0x03;
}

pub mod fncr1 {
    pub const TRANSPARENT: u8 = 1 << 6;
    pub const SCALE_MASK: u8 = 0x0F;
}

pub mod fwtset {
    pub const SPACING_MASK: u8 = 0x3F;
}

pub mod mwcr0 {
    pub const GRAPHICS: u8 = 0x00;
    pub const TEXT: u8 = 0x80;
}

pub mod mclr {
    pub const START: u8 = 0x80;
    pub const FULL: u8 = 0x00;
    pub const STATUS: u8 = 0x80;
}

pub mod dcr {
    pub const LINE_SQUARE_TRIANGLE_START: u8 = 0x80;
    pub const LINE_SQUARE_TRIANGLE_STATUS: u8 = 0x80;
    pub const CIRCLE_START: u8 = 0x40;
    pub const CIRCLE_STATUS: u8 = 0x40;
    pub const FILL: u8 = 0x20;
    pub const DRAW_LINE: u8 = 0x00;
    pub const DRAW_TRIANGLE: u8 = 0x01;
    pub const DRAW_SQUARE: u8 = 0x10;
}

pub mod ellcr {
    pub const START: u8 = 0x80;
    pub const STATUS: u8 = 0x80;
    pub const FILL: u8 = 0x40;
    /// Rounded rectangle instead of ellipse/curve
    pub const ROUNDED_RECT: u8 = 0x20;
    /// Curve (quarter ellipse) instead of full ellipse
    pub const CURVE: u8 = 0x10;
    pub const CURVE_PART_MASK: u8 = 0x03;
}

pub mod becr0 {
    pub const START: u8 = 0x80;
    pub const STATUS: u8 = 0x80;
}

pub mod becr1 {
    pub const MOVE_POSITIVE: u8 = 0x02;
    pub const MOVE_NEGATIVE: u8 = 0x03;
    pub const SOLID_FILL: u8 = 0x0C;
}

pub mod stsr {
    /// Memory read/write busy, set while the font engine renders a glyph
    pub const MEMORY_BUSY: u8 = 0x80;
}

pub mod pwm {
    pub const ENABLE: u8 = 0x80;
    pub const DISABLE: u8 = 0x00;
    pub const CLOCK_MASK: u8 = 0x0F;
}

pub mod tpcr0 {
    pub const ENABLE: u8 = 0x80;
    pub const DISABLE: u8 = 0x00;
    pub const WAKE_ENABLE: u8 = 0x08;
}

pub mod tpcr1 {
    pub const AUTO: u8 = 0x00;
    pub const DEBOUNCE: u8 = 0x04;
}

pub mod intc {
    pub const TOUCH: u8 = 0x04;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_fields_span_two_addresses() {
        assert_eq!(Register16::Curh.low(), 0x46);
        assert_eq!(Register16::Curh.high(), 0x47);
        assert_eq!(Register16::Dtpv.high(), 0xAC);
    }

    #[test]
    fn phase_prefixes() {
        assert_eq!(Phase::CommandWrite as u8, 0x80);
        assert_eq!(Phase::StatusRead as u8, 0xC0);
        assert_eq!(u8::from(Register::Mwcr0), 0x40);
    }
}
