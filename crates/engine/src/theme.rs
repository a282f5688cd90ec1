use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};

/// Straight-alpha RGBA color, or the "no fill" sentinel.
///
/// # Example
/// ```
/// use engine::Color;
///
/// let amber: Color = "#ffc107".parse().expect("valid color");
/// assert_eq!(amber, Color::rgb(0xff, 0xc1, 0x07));
/// assert!("none".parse::<Color>().expect("sentinel").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    None,
    Rgba([u8; 4]),
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgba([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::Rgba([r, g, b, a])
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Same color with alpha multiplied by `factor`.
    pub fn with_opacity(self, factor: f32) -> Self {
        match self {
            Self::None => Self::None,
            Self::Rgba([r, g, b, a]) => {
                let a = (f32::from(a) * factor.clamp(0.0, 1.0)).round() as u8;
                Self::Rgba([r, g, b, a])
            }
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("transparent") {
            return Ok(Self::None);
        }
        let invalid = || TimelineError::invalid_config(format!("invalid color {raw:?}"));
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        match hex.len() {
            3 => {
                let mut out = [255u8; 4];
                for (index, slot) in out.iter_mut().take(3).enumerate() {
                    *slot = channel(index..index + 1)? * 17;
                }
                Ok(Self::Rgba(out))
            }
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl std::str::FromStr for Color {
    type Err = TimelineError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Color {
    type Error = TimelineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Rgba([r, g, b, 255]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Rgba([r, g, b, a]) => write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}"),
        }
    }
}

/// Fully populated colors for every visual role of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: Color,
    pub handle_fill: Color,
    pub handle_stripe: Color,
    pub scale_text: Color,
    pub scale_line: Color,
    pub cursor: Color,
    pub selection_border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x1f, 0x23, 0x29),
            handle_fill: Color::rgb(0xff, 0xc1, 0x07),
            handle_stripe: Color::rgb(0x3a, 0x2c, 0x00),
            scale_text: Color::rgb(0x9a, 0xa0, 0xa6),
            scale_line: Color::rgb(0x5f, 0x63, 0x68),
            cursor: Color::rgb(0xff, 0xff, 0xff),
            selection_border: Color::rgb(0xff, 0xc1, 0x07),
        }
    }
}

impl Theme {
    /// Defaults with every provided override applied.
    pub fn with_overrides(overrides: &ThemeOverrides) -> Self {
        let defaults = Self::default();
        Self {
            background: overrides.background.unwrap_or(defaults.background),
            handle_fill: overrides.handle_fill.unwrap_or(defaults.handle_fill),
            handle_stripe: overrides.handle_stripe.unwrap_or(defaults.handle_stripe),
            scale_text: overrides.scale_text.unwrap_or(defaults.scale_text),
            scale_line: overrides.scale_line.unwrap_or(defaults.scale_line),
            cursor: overrides.cursor.unwrap_or(defaults.cursor),
            selection_border: overrides
                .selection_border
                .unwrap_or(defaults.selection_border),
        }
    }
}

/// Partial theme supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeOverrides {
    pub background: Option<Color>,
    pub handle_fill: Option<Color>,
    pub handle_stripe: Option<Color>,
    pub scale_text: Option<Color>,
    pub scale_line: Option<Color>,
    pub cursor: Option<Color>,
    pub selection_border: Option<Color>,
}
