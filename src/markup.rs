//! Tag-decorated strings and their projection onto plain text.
//!
//! A decorated string such as `This <strong>is</strong> good.` is split into
//! the plain text `This is good.` and a list of [`Tag`]s whose ranges are
//! expressed in plain-text characters. [`write`] rebuilds the decorated form.

use std::ops::Range;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unmatched tag <{name}> at byte {offset}")]
    UnmatchedTag { name: String, offset: usize },

    #[error("position {position} is outside of the text (length {length})")]
    PositionOutOfRange { position: usize, length: usize },

    #[error("character {0:?} is reserved for markup")]
    ReservedCharacter(char),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub level: usize,
    pub start: usize,
    pub length: usize,
}

impl Tag {
    pub fn new(name: impl Into<String>, start: usize, length: usize) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            level: 0,
            start,
            length,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self
            .attributes
            .iter_mut()
            .find(|attribute| attribute.name == name)
        {
            Some(attribute) => attribute.value = value.to_string(),
            None => self.attributes.push(Attribute::new(name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|attribute| attribute.name != name);
    }

    /// True if `range` lies within this tag (equal ranges included).
    pub fn covers(&self, range: &Range<usize>) -> bool {
        self.start <= range.start && range.end <= self.end()
    }

    /// True if the ranges intersect without either containing the other.
    pub fn partially_overlaps(&self, range: &Range<usize>) -> bool {
        let end = self.end();
        let intersects = self.start < range.end && range.start < end;
        intersects && !self.covers(range) && !(range.start <= self.start && end <= range.end)
    }

    /// Same name and the same attribute set, ignoring attribute order.
    pub fn same_kind(&self, name: &str, attributes: &[Attribute]) -> bool {
        self.name == name
            && self.attributes.len() == attributes.len()
            && attributes
                .iter()
                .all(|wanted| self.attribute(&wanted.name) == Some(wanted.value.as_str()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub plain_text: String,
    pub tags: Vec<Tag>,
}

impl Document {
    pub fn new(plain_text: impl Into<String>) -> Self {
        Self {
            plain_text: plain_text.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Length of the plain text in characters.
    pub fn len(&self) -> usize {
        self.plain_text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.plain_text.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Text(&'a str),
    Open { name: &'a str, attributes: &'a str },
    Close { name: &'a str },
}

impl Token<'_> {
    pub(crate) fn is_marker(&self) -> bool {
        !matches!(self, Token::Text(_))
    }
}

/// Splits a decorated string into text runs and `<...>` markers, yielding
/// the byte range of each piece. A `<` that is not closed by a `>` before
/// the next `<` is ordinary text.
pub(crate) struct Tokens<'a> {
    source: &'a str,
    offset: usize,
}

pub(crate) fn tokens(source: &str) -> Tokens<'_> {
    Tokens { source, offset: 0 }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = (Range<usize>, Token<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset;
        if start >= self.source.len() {
            return None;
        }
        let rest = &self.source[start..];

        if let Some(len) = marker_len(rest) {
            self.offset = start + len;
            return Some((start..self.offset, classify_marker(&rest[1..len - 1])));
        }

        let mut search = rest.chars().next().map_or(1, char::len_utf8);
        let text_len = loop {
            match rest[search..].find('<') {
                Some(idx) => {
                    let candidate = search + idx;
                    if marker_len(&rest[candidate..]).is_some() {
                        break candidate;
                    }
                    search = candidate + 1;
                }
                None => break rest.len(),
            }
        };
        self.offset = start + text_len;
        Some((start..self.offset, Token::Text(&rest[..text_len])))
    }
}

fn marker_len(rest: &str) -> Option<usize> {
    if !rest.starts_with('<') {
        return None;
    }
    let body = &rest[1..];
    let close = body.find(['<', '>'])?;
    (body.as_bytes()[close] == b'>').then_some(close + 2)
}

fn classify_marker(inner: &str) -> Token<'_> {
    if let Some(name) = inner.strip_prefix('/') {
        return Token::Close { name: name.trim() };
    }
    let inner = inner.trim_start();
    let split = inner
        .find(|ch: char| ch.is_whitespace() || ch == '/')
        .unwrap_or(inner.len());
    Token::Open {
        name: &inner[..split],
        attributes: &inner[split..],
    }
}

/// Name of the tag opened by a marker body such as `span style='x'`.
pub(crate) fn marker_name(inner: &str) -> &str {
    match classify_marker(inner) {
        Token::Open { name, .. } | Token::Close { name } => name,
        Token::Text(text) => text,
    }
}

pub(crate) fn parse_attributes(raw: &str) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    let mut rest = raw.trim_start();

    while !rest.is_empty() {
        let name_end = rest
            .find(|ch: char| ch.is_whitespace() || ch == '=')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        if name.is_empty() {
            // Stray '='.
            rest = rest.get(1..).unwrap_or_default().trim_start();
            continue;
        }
        if name.starts_with('/') {
            continue;
        }

        let Some(after_eq) = rest.strip_prefix('=') else {
            attributes.push(Attribute::new(name, ""));
            continue;
        };
        let after_eq = after_eq.trim_start();

        let (value, remainder) = match after_eq.chars().next() {
            Some(quote @ ('\'' | '"')) => match after_eq[1..].find(quote) {
                Some(end) => (&after_eq[1..end + 1], &after_eq[end + 2..]),
                None => {
                    tracing::debug!("skipping unterminated attribute value for {name}");
                    break;
                }
            },
            _ => {
                let end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };
        attributes.push(Attribute::new(name, value));
        rest = remainder.trim_start();
    }

    attributes
}

struct OpenTag<'a> {
    name: &'a str,
    attributes: &'a str,
    start: usize,
    raw_offset: usize,
}

struct MatchedTag {
    tag: Tag,
    raw: Range<usize>,
}

struct Projection {
    plain_text: String,
    matched: Vec<MatchedTag>,
    inert: Vec<(String, usize)>,
}

fn project(source: &str) -> Projection {
    let mut plain_text = String::with_capacity(source.len());
    let mut characters = 0;
    let mut stack: Vec<OpenTag<'_>> = Vec::new();
    let mut matched = Vec::new();
    let mut inert = Vec::new();

    for (range, token) in tokens(source) {
        match token {
            Token::Text(text) => {
                plain_text.push_str(text);
                characters += text.chars().count();
            }
            Token::Open { name, attributes } => stack.push(OpenTag {
                name,
                attributes,
                start: characters,
                raw_offset: range.start,
            }),
            Token::Close { name } => {
                let Some(position) = stack.iter().rposition(|open| open.name == name) else {
                    inert.push((format!("/{name}"), range.start));
                    continue;
                };
                for unclosed in stack.drain(position + 1..) {
                    inert.push((unclosed.name.to_string(), unclosed.raw_offset));
                }
                if let Some(open) = stack.pop() {
                    let mut tag = Tag::new(open.name, open.start, characters - open.start);
                    tag.attributes = parse_attributes(open.attributes);
                    matched.push(MatchedTag {
                        tag,
                        raw: open.raw_offset..range.end,
                    });
                }
            }
        }
    }
    for unclosed in stack {
        inert.push((unclosed.name.to_string(), unclosed.raw_offset));
    }

    Projection {
        plain_text,
        matched,
        inert,
    }
}

fn finish(mut matched: Vec<MatchedTag>) -> Vec<Tag> {
    matched.sort_by_key(|entry| entry.raw.start);

    let mut enclosing: Vec<usize> = Vec::new();
    for entry in &mut matched {
        while enclosing
            .last()
            .is_some_and(|&end| end <= entry.raw.start)
        {
            enclosing.pop();
        }
        entry.tag.level = enclosing.len();
        enclosing.push(entry.raw.end);
    }

    // Stable: document order is kept within a level.
    matched.sort_by_key(|entry| entry.tag.level);
    matched.into_iter().map(|entry| entry.tag).collect()
}

/// Projects a decorated string onto its plain text.
///
/// Unmatched opening or closing markers are inert: they are dropped from the
/// plain text and their contents stay at the surrounding level.
pub fn read(source: &str) -> Document {
    let projection = project(source);
    for (name, offset) in &projection.inert {
        tracing::debug!(offset, "ignoring unmatched tag <{name}>");
    }
    Document {
        plain_text: projection.plain_text,
        tags: finish(projection.matched),
    }
}

/// Like [`read`], but refuses input containing unmatched markers.
pub fn read_checked(source: &str) -> Result<Document, MarkupError> {
    let projection = project(source);
    if let Some((name, offset)) = projection
        .inert
        .into_iter()
        .min_by_key(|(_, offset)| *offset)
    {
        return Err(MarkupError::UnmatchedTag { name, offset });
    }
    Ok(Document {
        plain_text: projection.plain_text,
        tags: finish(projection.matched),
    })
}

fn push_open_tag(out: &mut String, tag: &Tag) {
    out.push('<');
    out.push_str(&tag.name);
    for attribute in tag.attributes.iter().filter(|a| !a.value.is_empty()) {
        let quote = if attribute.value.contains('\'') { '"' } else { '\'' };
        out.push(' ');
        out.push_str(&attribute.name);
        out.push('=');
        out.push(quote);
        out.push_str(&attribute.value);
        out.push(quote);
    }
    out.push('>');
}

fn push_close_tag(out: &mut String, tag: &Tag) {
    out.push_str("</");
    out.push_str(&tag.name);
    out.push('>');
}

struct Writer<'a> {
    document: &'a Document,
    chars: Vec<(usize, char)>,
    out: String,
    cursor: usize,
    stack: Vec<usize>,
    empty: Vec<usize>,
}

impl<'a> Writer<'a> {
    fn new(document: &'a Document) -> Self {
        Self {
            document,
            chars: document.plain_text.char_indices().collect(),
            out: String::with_capacity(document.plain_text.len() * 2),
            cursor: 0,
            stack: Vec::new(),
            empty: Vec::new(),
        }
    }

    fn byte_offset(&self, position: usize) -> usize {
        self.chars
            .get(position)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.document.plain_text.len())
    }

    fn advance_to(&mut self, position: usize) {
        let document = self.document;
        let position = position.min(self.chars.len());
        while self.cursor < position {
            self.flush_empty(true, false);
            let next = self
                .empty
                .iter()
                .map(|&idx| document.tags[idx].start)
                .filter(|&start| start > self.cursor && start < position)
                .min()
                .unwrap_or(position);
            let from = self.byte_offset(self.cursor);
            let to = self.byte_offset(next);
            self.out.push_str(&document.plain_text[from..to]);
            self.cursor = next;
        }
    }

    /// True if a tag opening at the position of the empty tag `idx` is its
    /// parent. Such an empty tag is written inside that tag rather than at
    /// the end of a tag closing at the same position.
    fn has_opening_parent(&self, idx: usize) -> bool {
        let empty = &self.document.tags[idx];
        self.document.tags.iter().enumerate().any(|(other, tag)| {
            other != idx && tag.start == empty.start && tag.level + 1 == empty.level
        })
    }

    /// Emits the zero-length tags sitting at the cursor once the nesting
    /// depth reaches their level. `force` emits them at whatever depth;
    /// `closing` holds back those that belong to a tag opening here.
    fn flush_empty(&mut self, force: bool, closing: bool) {
        let document = self.document;
        let depth = self.stack.len();
        let ready: Vec<usize> = self
            .empty
            .iter()
            .copied()
            .filter(|&idx| {
                let tag = &document.tags[idx];
                tag.start == self.cursor
                    && (force || tag.level >= depth)
                    && !(closing && self.has_opening_parent(idx))
            })
            .collect();
        if ready.is_empty()
            || (!force && !ready.iter().any(|&idx| document.tags[idx].level == depth))
        {
            return;
        }
        self.empty.retain(|idx| !ready.contains(idx));
        self.write_empty_group(&ready);
    }

    /// Writes the shallowest tags of `group` as siblings, nesting the rest
    /// inside the last of them.
    fn write_empty_group(&mut self, group: &[usize]) {
        let document = self.document;
        let Some(level) = group.iter().map(|&idx| document.tags[idx].level).min() else {
            return;
        };
        let (siblings, nested): (Vec<usize>, Vec<usize>) = group
            .iter()
            .partition(|&&idx| document.tags[idx].level == level);
        for (n, &idx) in siblings.iter().enumerate() {
            push_open_tag(&mut self.out, &document.tags[idx]);
            if n + 1 == siblings.len() {
                self.write_empty_group(&nested);
            }
            push_close_tag(&mut self.out, &document.tags[idx]);
        }
    }

    fn close_top(&mut self) {
        let document = self.document;
        if let Some(idx) = self.stack.last().copied() {
            self.advance_to(document.tags[idx].end());
            self.flush_empty(false, true);
            self.stack.pop();
            push_close_tag(&mut self.out, &document.tags[idx]);
        }
    }

    fn write(mut self) -> String {
        let document = self.document;
        let tags = &document.tags;
        let (empty, mut order): (Vec<usize>, Vec<usize>) =
            (0..tags.len()).partition(|&idx| tags[idx].length == 0);
        self.empty = empty;
        order.sort_by(|&a, &b| {
            let (a, b) = (&tags[a], &tags[b]);
            a.start
                .cmp(&b.start)
                .then(b.end().cmp(&a.end()))
                .then(a.level.cmp(&b.level))
        });

        for idx in order {
            let tag = &tags[idx];
            while let Some(&top) = self.stack.last() {
                let outer = &tags[top];
                if tag.start < outer.end() && tag.end() <= outer.end() {
                    break;
                }
                self.close_top();
            }
            if tag.start < self.cursor {
                tracing::warn!(
                    "tag <{}> at {} overlaps its predecessor, emitting it late",
                    tag.name,
                    tag.start
                );
            }
            self.advance_to(tag.start);
            self.flush_empty(false, false);
            push_open_tag(&mut self.out, tag);
            self.stack.push(idx);
        }
        while !self.stack.is_empty() {
            self.close_top();
        }
        self.flush_empty(false, false);
        self.advance_to(self.chars.len());
        self.flush_empty(true, false);
        for idx in std::mem::take(&mut self.empty) {
            tracing::debug!("emitting stray empty tag <{}> at the end", tags[idx].name);
            push_open_tag(&mut self.out, &tags[idx]);
            push_close_tag(&mut self.out, &tags[idx]);
        }
        self.out
    }
}

/// Rebuilds the decorated string for `document`.
///
/// Tags sharing a range nest by level. Attributes with empty values are
/// omitted.
pub fn write(document: &Document) -> String {
    Writer::new(document).write()
}

#[cfg(test)]
#[path = "markup_tests.rs"]
mod markup_tests;
