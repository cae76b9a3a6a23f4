//! Color and length values.
//!
//! Only used to classify and normalize declaration values for export; the
//! rule store itself keeps values as the strings the user typed.

use std::fmt;

/// A CSS color value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 1.0,
    };

    pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            let alpha = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, alpha)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A CSS length value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Length {
    /// Pixels.
    Px(f32),
    /// Em (relative to font size).
    Em(f32),
    /// Rem (relative to root font size).
    Rem(f32),
    /// Percentage.
    Percent(f32),
    /// Viewport width (1vw = 1% of viewport width).
    Vw(f32),
    /// Viewport height (1vh = 1% of viewport height).
    Vh(f32),
    /// Auto.
    Auto,
    /// Zero.
    #[default]
    Zero,
    /// min(a, b).
    Min(Box<(Length, Length)>),
    /// max(a, b).
    Max(Box<(Length, Length)>),
    /// clamp(min, preferred, max).
    Clamp(Box<(Length, Length, Length)>),
}

impl Length {
    /// Absolute pixel value for units that do not depend on layout context.
    pub fn to_px(&self, font_size: f32, root_font_size: f32) -> Option<f32> {
        match self {
            Length::Px(px) => Some(*px),
            Length::Em(em) => Some(em * font_size),
            Length::Rem(rem) => Some(rem * root_font_size),
            Length::Zero => Some(0.0),
            _ => None,
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(v) => write!(f, "{}px", v),
            Length::Em(v) => write!(f, "{}em", v),
            Length::Rem(v) => write!(f, "{}rem", v),
            Length::Percent(v) => write!(f, "{}%", v),
            Length::Vw(v) => write!(f, "{}vw", v),
            Length::Vh(v) => write!(f, "{}vh", v),
            Length::Auto => f.write_str("auto"),
            Length::Zero => f.write_str("0"),
            Length::Min(pair) => write!(f, "min({}, {})", pair.0, pair.1),
            Length::Max(pair) => write!(f, "max({}, {})", pair.0, pair.1),
            Length::Clamp(t) => write!(f, "clamp({}, {}, {})", t.0, t.1, t.2),
        }
    }
}

/// Parse a color value.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();

    match value.to_lowercase().as_str() {
        "transparent" => return Some(Color::TRANSPARENT),
        "black" => return Some(Color::BLACK),
        "white" => return Some(Color::WHITE),
        "red" => return Some(Color::from_rgb(255, 0, 0)),
        "green" => return Some(Color::from_rgb(0, 128, 0)),
        "blue" => return Some(Color::from_rgb(0, 0, 255)),
        "yellow" => return Some(Color::from_rgb(255, 255, 0)),
        "gray" | "grey" => return Some(Color::from_rgb(128, 128, 128)),
        "orange" => return Some(Color::from_rgb(255, 165, 0)),
        "pink" => return Some(Color::from_rgb(255, 192, 203)),
        "purple" => return Some(Color::from_rgb(128, 0, 128)),
        "cyan" | "aqua" => return Some(Color::from_rgb(0, 255, 255)),
        "magenta" | "fuchsia" => return Some(Color::from_rgb(255, 0, 255)),
        "lime" => return Some(Color::from_rgb(0, 255, 0)),
        "navy" => return Some(Color::from_rgb(0, 0, 128)),
        "teal" => return Some(Color::from_rgb(0, 128, 128)),
        "olive" => return Some(Color::from_rgb(128, 128, 0)),
        "maroon" => return Some(Color::from_rgb(128, 0, 0)),
        "silver" => return Some(Color::from_rgb(192, 192, 192)),
        "coral" => return Some(Color::from_rgb(255, 127, 80)),
        "tomato" => return Some(Color::from_rgb(255, 99, 71)),
        "gold" => return Some(Color::from_rgb(255, 215, 0)),
        "indigo" => return Some(Color::from_rgb(75, 0, 130)),
        "crimson" => return Some(Color::from_rgb(220, 20, 60)),
        "slategray" | "slategrey" => return Some(Color::from_rgb(112, 128, 144)),
        "whitesmoke" => return Some(Color::from_rgb(245, 245, 245)),
        _ => {}
    }

    if let Some(hex) = value.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let (r, g, b, a) = match hex.len() {
            3 | 4 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                let a = if hex.len() == 4 { digit(3)? as f32 / 255.0 } else { 1.0 };
                (digit(0)?, digit(1)?, digit(2)?, a)
            }
            6 | 8 => {
                let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                let a = if hex.len() == 8 { pair(6)? as f32 / 255.0 } else { 1.0 };
                (pair(0)?, pair(2)?, pair(4)?, a)
            }
            _ => return None,
        };
        return Some(Color::new(r, g, b, a));
    }

    // rgb() / rgba()
    if value.starts_with("rgb") {
        let inner = value
            .trim_start_matches("rgba(")
            .trim_start_matches("rgb(")
            .trim_end_matches(')');
        let parts = split_color_args(inner);
        if parts.len() >= 3 {
            let r = parts[0].trim().parse::<f32>().ok()?.clamp(0.0, 255.0) as u8;
            let g = parts[1].trim().parse::<f32>().ok()?.clamp(0.0, 255.0) as u8;
            let b = parts[2].trim().parse::<f32>().ok()?.clamp(0.0, 255.0) as u8;
            let a = match parts.get(3) {
                Some(a) => parse_alpha(a)?,
                None => 1.0,
            };
            return Some(Color::new(r, g, b, a));
        }
    }

    // hsl() / hsla()
    if value.starts_with("hsl") {
        let inner = value
            .trim_start_matches("hsla(")
            .trim_start_matches("hsl(")
            .trim_end_matches(')');
        let parts = split_color_args(inner);
        if parts.len() >= 3 {
            let h = parts[0].trim().trim_end_matches("deg").parse::<f32>().ok()?;
            let s = parts[1].trim().trim_end_matches('%').parse::<f32>().ok()? / 100.0;
            let l = parts[2].trim().trim_end_matches('%').parse::<f32>().ok()? / 100.0;
            let a = match parts.get(3) {
                Some(a) => parse_alpha(a)?,
                None => 1.0,
            };
            let (r, g, b) = hsl_to_rgb(h, s, l);
            return Some(Color::new(r, g, b, a));
        }
    }

    None
}

/// Accept both `rgb(1, 2, 3)` and `rgb(1 2 3 / 0.5)`.
fn split_color_args(inner: &str) -> Vec<&str> {
    if inner.contains(',') {
        inner.split(',').collect()
    } else {
        inner
            .split(|c: char| c.is_whitespace() || c == '/')
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn parse_alpha(value: &str) -> Option<f32> {
    let value = value.trim();
    let alpha = match value.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok()? / 100.0,
        None => value.parse::<f32>().ok()?,
    };
    Some(alpha.clamp(0.0, 1.0))
}

/// Convert HSL to RGB
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let h = h.rem_euclid(360.0) / 360.0;
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

/// Parse a length value.
pub fn parse_length(value: &str) -> Option<Length> {
    let value = value.trim();

    if value == "auto" {
        return Some(Length::Auto);
    }
    if value == "0" {
        return Some(Length::Zero);
    }

    for (name, arity) in [("min(", 2), ("max(", 2), ("clamp(", 3)] {
        let Some(inner) = value.strip_prefix(name).and_then(|v| v.strip_suffix(')')) else {
            continue;
        };
        let args = split_css_function_args(inner);
        if args.len() != arity {
            return None;
        }
        let lengths = args
            .into_iter()
            .map(parse_length)
            .collect::<Option<Vec<_>>>()?;
        let mut it = lengths.into_iter();
        let (a, b) = (it.next()?, it.next()?);
        return Some(match name {
            "min(" => Length::Min(Box::new((a, b))),
            "max(" => Length::Max(Box::new((a, b))),
            _ => Length::Clamp(Box::new((a, b, it.next()?))),
        });
    }

    // Suffix order matters: "rem" must be tried before "em".
    let units: [(&str, fn(f32) -> Length); 6] = [
        ("px", Length::Px),
        ("rem", Length::Rem),
        ("em", Length::Em),
        ("vh", Length::Vh),
        ("vw", Length::Vw),
        ("%", Length::Percent),
    ];
    for (suffix, ctor) in units {
        if let Some(num) = value.strip_suffix(suffix) {
            return num.trim().parse::<f32>().ok().map(ctor);
        }
    }

    None
}

/// Split CSS function arguments, handling nested parentheses.
fn split_css_function_args(args: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                result.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = args[start..].trim();
    if !last.is_empty() {
        result.push(last);
    }

    result
}
