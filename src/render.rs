use std::ops::Range;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::format::{FormatOptions, FormatRange, resolve};
use crate::markup;
use crate::theme::Theme;

const TAB_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Column at which words wrap onto the next line.
    pub wrap_width: usize,
    pub format: FormatOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            wrap_width: 80,
            format: FormatOptions::default(),
        }
    }
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// Visual position of every caret position, `0..=chars(plain_text)`.
    pub cursor_map: Vec<CursorVisualPosition>,
}

impl RenderResult {
    /// The caret position whose visual location is closest to `line`/`column`.
    pub fn position_at(&self, line: usize, column: u16) -> Option<usize> {
        let on_line = self
            .cursor_map
            .iter()
            .enumerate()
            .filter(|(_, visual)| visual.line == line);
        on_line
            .clone()
            .filter(|(_, visual)| visual.column <= column)
            .last()
            .or_else(|| on_line.min_by_key(|(_, visual)| visual.column))
            .map(|(position, _)| position)
    }
}

/// Lays out decorated text for the terminal.
///
/// `caret` and `selection` are plain-text positions.
pub fn render_text(
    raw: &str,
    options: &RenderOptions,
    caret: Option<usize>,
    selection: Option<Range<usize>>,
    theme: &Theme,
) -> RenderResult {
    let document = markup::read(raw);
    let chars: Vec<char> = document.plain_text.chars().collect();
    let mut styles = vec![Style::default(); chars.len()];
    for range in resolve(&document, &options.format) {
        let style = range_style(&range);
        for cell in &mut styles[range.start..range.end().min(chars.len())] {
            *cell = cell.patch(style);
        }
    }
    if let Some(selection) = selection {
        let end = selection.end.min(chars.len());
        for cell in &mut styles[selection.start.min(end)..end] {
            *cell = cell.patch(theme.selection_style());
        }
    }

    let fragments = collect_fragments(&chars, &styles);
    let outputs = wrap_fragments(&fragments, options.wrap_width.max(1));

    let mut lines = Vec::with_capacity(outputs.len());
    let mut cursor_map = vec![CursorVisualPosition { line: 0, column: 0 }; chars.len() + 1];
    for (line_index, output) in outputs.into_iter().enumerate() {
        for event in output.events {
            if let Some(slot) = cursor_map.get_mut(event.position) {
                *slot = CursorVisualPosition {
                    line: line_index,
                    column: event.column,
                };
            }
        }
        let spans: Vec<Span<'static>> = output
            .spans
            .into_iter()
            .map(|segment| Span::styled(segment.text, segment.style))
            .collect();
        lines.push(Line::from(spans));
    }
    if lines.is_empty() {
        lines.push(Line::from(""));
    }

    RenderResult {
        cursor: caret.and_then(|caret| cursor_map.get(caret).copied()),
        total_lines: lines.len(),
        lines,
        cursor_map,
    }
}

fn range_style(range: &FormatRange) -> Style {
    let mut style = Style::default();
    if range.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if range.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if range.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if range.strikethrough {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if let Some(color) = range.color {
        style = style.fg(Color::Rgb(color.r, color.g, color.b));
    }
    style
}

#[derive(Clone, Debug)]
struct LineSegment {
    text: String,
    style: Style,
}

struct LineOutput {
    spans: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
}

#[derive(Clone, Copy)]
struct LocatedEvent {
    column: u16,
    position: usize,
}

/// A word or a whitespace run; may mix several styles.
#[derive(Clone)]
struct Fragment {
    pieces: Vec<LineSegment>,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

#[derive(Clone, Copy)]
struct TextEvent {
    offset: usize,
    position: usize,
}

fn collect_fragments(chars: &[char], styles: &[Style]) -> Vec<FragmentItem> {
    let mut fragments = Vec::new();
    let mut builder: Option<Fragment> = None;
    let mut pending: Vec<usize> = Vec::new();

    for (position, (&ch, &style)) in chars.iter().zip(styles).enumerate() {
        pending.push(position);
        match ch {
            '\r' => {}
            '\n' => {
                let mut token = builder.take().unwrap_or_else(|| Fragment::new(FragmentKind::Word));
                token.add_events(&mut pending);
                fragments.push(FragmentItem::Token(token));
                fragments.push(FragmentItem::LineBreak);
            }
            _ => {
                let (actual, repeat) = if ch == '\t' { (' ', TAB_WIDTH) } else { (ch, 1) };
                let kind = if actual.is_whitespace() {
                    FragmentKind::Whitespace
                } else {
                    FragmentKind::Word
                };
                if builder.as_ref().is_some_and(|current| current.kind != kind)
                    && let Some(done) = builder.take()
                {
                    fragments.push(FragmentItem::Token(done));
                }
                let current = builder.get_or_insert_with(|| Fragment::new(kind));
                current.add_events(&mut pending);
                for _ in 0..repeat {
                    current.push_char(actual, style);
                }
            }
        }
    }

    pending.push(chars.len());
    let mut token = builder.unwrap_or_else(|| Fragment::new(FragmentKind::Word));
    token.add_events(&mut pending);
    fragments.push(FragmentItem::Token(token));
    fragments
}

impl Fragment {
    fn new(kind: FragmentKind) -> Self {
        Self {
            pieces: Vec::new(),
            kind,
            width: 0,
            events: Vec::new(),
        }
    }

    fn add_events(&mut self, pending: &mut Vec<usize>) {
        for position in pending.drain(..) {
            self.events.push(TextEvent {
                offset: self.width,
                position,
            });
        }
    }

    fn push_char(&mut self, ch: char, style: Style) {
        match self.pieces.last_mut() {
            Some(piece) if piece.style == style => piece.text.push(ch),
            _ => self.pieces.push(LineSegment {
                text: ch.to_string(),
                style,
            }),
        }
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }
}

fn wrap_fragments(fragments: &[FragmentItem], width: usize) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::default();
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::default();
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => pending_whitespace.push(token.clone()),
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.width > 0 && builder.width + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::default();
                    }
                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

#[derive(Default)]
struct LineBuilder {
    segments: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
}

impl LineBuilder {
    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        for event in fragment.events {
            self.events.push(LocatedEvent {
                column: (start + event.offset) as u16,
                position: event.position,
            });
        }
        for piece in fragment.pieces {
            match self.segments.last_mut() {
                Some(last) if last.style == piece.style => last.text.push_str(&piece.text),
                _ => self.segments.push(piece),
            }
        }
        self.width += fragment.width;
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            events: self.events,
        }
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
