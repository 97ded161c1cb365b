//! Resolution of tags into render-ready formatting ranges.

use crate::color::{Rgba, parse_color};
use crate::css;
use crate::markup::{Document, Tag};

/// Formatting for `length` characters starting at `start`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatRange {
    pub start: usize,
    pub length: usize,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub color: Option<Rgba>,
}

impl FormatRange {
    fn covering(tag: &Tag) -> Self {
        Self {
            start: tag.start,
            length: tag.length,
            ..Self::default()
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Used for color literals that do not parse, including named colors.
    pub default_color: Rgba,
}

/// Emits one range per recognized tag, in tag order.
///
/// Ranges are neither merged nor sorted; a consumer applying them in order
/// lets later entries refine earlier ones.
pub fn resolve(document: &Document, options: &FormatOptions) -> Vec<FormatRange> {
    document
        .tags
        .iter()
        .filter_map(|tag| resolve_tag(tag, options))
        .collect()
}

/// Convenience for resolving a decorated string directly.
pub fn resolve_str(source: &str, options: &FormatOptions) -> Vec<FormatRange> {
    resolve(&crate::markup::read(source), options)
}

fn resolve_tag(tag: &Tag, options: &FormatOptions) -> Option<FormatRange> {
    let mut range = FormatRange::covering(tag);
    match tag.name.as_str() {
        "strong" => range.bold = true,
        "em" => range.italic = true,
        "u" => range.underline = true,
        "s" => range.strikethrough = true,
        "span" => {
            let style = tag.attribute("style")?;
            apply_style(&mut range, style, options);
        }
        "text" => apply_native_attributes(&mut range, tag, options),
        _ => return None,
    }
    Some(range)
}

fn apply_style(range: &mut FormatRange, style: &str, options: &FormatOptions) {
    for entry in css::read(style).iter() {
        let value = entry.value.as_str();
        match entry.property.as_str() {
            "font-family" => range.font = Some(value.to_string()),
            "font-size" => range.font_size = parse_font_size(value),
            "font-weight" => range.bold = value == "bold",
            "font-style" => range.italic = value == "italic",
            "text-decoration" => {
                for decoration in value.split_whitespace() {
                    match decoration {
                        "underline" => range.underline = true,
                        "line-through" => range.strikethrough = true,
                        _ => {}
                    }
                }
            }
            "color" => range.color = Some(parse_color(value, options.default_color)),
            other => tracing::trace!("ignoring style property {other}"),
        }
    }
}

fn apply_native_attributes(range: &mut FormatRange, tag: &Tag, options: &FormatOptions) {
    for attribute in &tag.attributes {
        let value = attribute.value.as_str();
        match attribute.name.as_str() {
            "bold" => range.bold = parse_flag(value),
            "italic" => range.italic = parse_flag(value),
            "underline" => range.underline = parse_flag(value),
            "strikethrough" => range.strikethrough = parse_flag(value),
            "font" => range.font = Some(value.to_string()),
            "size" => range.font_size = parse_font_size(value),
            "color" => range.color = Some(parse_color(value, options.default_color)),
            _ => {}
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Reads the numeric prefix of sizes like `16.5pt` or `12px`.
///
/// Pixel sizes are taken as-is, without conversion to points.
pub fn parse_font_size(value: &str) -> Option<f32> {
    let value = value.trim();
    let number = value
        .strip_suffix("pt")
        .or_else(|| value.strip_suffix("px"))
        .unwrap_or(value)
        .trim_end();
    number.parse::<f32>().ok().filter(|size| size.is_finite())
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod format_tests;
