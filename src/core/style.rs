/// Color and style model: packed 24-bit RGB, the 16-entry named palette,
/// the xterm 256-color palette, and the per-cell style record.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StyleAttr: u8 {
        const BOLD          = 0b0000_0001;
        const BLINK         = 0b0000_0010;
        const UNDERLINE     = 0b0000_0100;
        const STRIKETHROUGH = 0b0000_1000;
    }
}

/// Font weight derived from the style for glyph lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// RGB color packed as 0x00RRGGBB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(u32);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(self) -> u8 {
        self.0 as u8
    }
}

/// Indices into the named palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Black = 0,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

/// The 16 named ANSI colors (Solarized Light).
pub const NAMED_COLORS: [Color; 16] = [
    Color::rgb(7, 54, 66),    // black
    Color::rgb(220, 50, 47),  // red
    Color::rgb(13, 153, 0),   // green
    Color::rgb(181, 137, 0),  // yellow
    Color::rgb(38, 139, 210), // blue
    Color::rgb(221, 54, 130), // magenta
    Color::rgb(42, 161, 152), // cyan
    Color::rgb(238, 232, 213), // white
    Color::rgb(0, 43, 54),    // bright black
    Color::rgb(203, 75, 22),  // bright red
    Color::rgb(88, 110, 117), // bright green
    Color::rgb(101, 123, 131), // bright yellow
    Color::rgb(131, 148, 150), // bright blue
    Color::rgb(108, 113, 196), // bright magenta
    Color::rgb(147, 161, 161), // bright cyan
    Color::rgb(253, 246, 227), // bright white
];

/// Look up an xterm 256-color palette entry.
/// 0-15 are the named palette; 16-231 the 6x6x6 cube; 232-255 the gray ramp.
pub fn palette256(index: u8) -> Color {
    match index {
        0..=15 => NAMED_COLORS[index as usize],
        16..=231 => {
            let idx = index as usize - 16;
            let r = (idx / 36) % 6;
            let g = (idx / 6) % 6;
            let b = idx % 6;
            let level = |v: usize| if v == 0 { 0u8 } else { (55 + 40 * v) as u8 };
            Color::rgb(level(r), level(g), level(b))
        }
        232..=255 => {
            let v = (8 + 10 * (index as usize - 232)) as u8;
            Color::rgb(v, v, v)
        }
    }
}

/// Per-cell rendition: colors plus packed attribute bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub fore: Color,
    pub back: Color,
    pub attr: StyleAttr,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fore: NAMED_COLORS[NamedColor::Black as usize],
            back: NAMED_COLORS[NamedColor::White as usize],
            attr: StyleAttr::empty(),
        }
    }
}

impl Style {
    pub fn weight(&self) -> FontWeight {
        if self.attr.contains(StyleAttr::BOLD) {
            FontWeight::Bold
        } else {
            FontWeight::Regular
        }
    }

    pub fn blink(&self) -> bool {
        self.attr.contains(StyleAttr::BLINK)
    }
}
