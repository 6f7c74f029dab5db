use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized color `{0}`")]
pub struct ParseColorError(pub String);

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and a handful of named colors.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "black" => return Ok(Color::BLACK),
            "white" => return Ok(Color::WHITE),
            "transparent" => return Ok(Color::TRANSPARENT),
            "red" => return Ok(Color::rgb(255, 0, 0)),
            "green" => return Ok(Color::rgb(0, 128, 0)),
            "blue" => return Ok(Color::rgb(0, 0, 255)),
            _ => {}
        }

        let error = || ParseColorError(raw.to_string());
        let hex = trimmed.strip_prefix('#').ok_or_else(error)?;
        if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(error());
        }
        let channel = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16);
        match hex.len() {
            3 => {
                let short = |index: usize| {
                    u8::from_str_radix(&hex[index..index + 1], 16).map(|value| value * 17)
                };
                Ok(Color::rgb(
                    short(0).map_err(|_| error())?,
                    short(1).map_err(|_| error())?,
                    short(2).map_err(|_| error())?,
                ))
            }
            6 => Ok(Color::rgb(
                channel(0).map_err(|_| error())?,
                channel(2).map_err(|_| error())?,
                channel(4).map_err(|_| error())?,
            )),
            8 => Ok(Color::rgba(
                channel(0).map_err(|_| error())?,
                channel(2).map_err(|_| error())?,
                channel(4).map_err(|_| error())?,
                channel(6).map_err(|_| error())?,
            )),
            _ => Err(error()),
        }
    }
}
