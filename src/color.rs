use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    fn from_packed(value: u32) -> Self {
        let [r, g, b, a] = value.to_be_bytes();
        Self::new(r, g, b, a)
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Renders as `#rrggbbaa`, which [`parse_color`] reads back.
impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// Parses `rgb(r,g,b)`, `#RRGGBBAA` or `0xRRGGBBAA`.
///
/// Hex literals shorter than eight digits are padded on the right with `f`,
/// so `#ff0000` is opaque red. Named colors are not supported; they and any
/// malformed literal yield `default`.
pub fn parse_color(literal: &str, default: Rgba) -> Rgba {
    try_parse_color(literal).unwrap_or(default)
}

fn try_parse_color(literal: &str) -> Option<Rgba> {
    let literal = literal.trim();
    if let Some(args) = literal
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let mut channels = args.split(',').map(|part| part.trim().parse::<u8>());
        let r = channels.next()?.ok()?;
        let g = channels.next()?.ok()?;
        let b = channels.next()?.ok()?;
        if channels.next().is_some() {
            return None;
        }
        return Some(Rgba::opaque(r, g, b));
    }

    let digits = literal
        .strip_prefix('#')
        .or_else(|| literal.strip_prefix("0x"))
        .or_else(|| literal.strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 8 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let padded = format!("{digits:f<8}");
    u32::from_str_radix(&padded, 16).ok().map(Rgba::from_packed)
}
