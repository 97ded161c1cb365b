use std::collections::BTreeSet;
use std::ops::Range;

use super::EditOutcome;
use crate::css::{self, CssPropertyList};
use crate::markup::{self, Attribute, Document, MarkupError, Tag};

const SPAN: &str = "span";
const STYLE: &str = "style";

/// `strong` and `em` are kept as `span` styles while toggling.
fn style_alias(tag_name: &str) -> Option<(&'static str, &'static str)> {
    match tag_name {
        "strong" => Some(("font-weight", "bold")),
        "em" => Some(("font-style", "italic")),
        _ => None,
    }
}

enum Request {
    Style {
        properties: CssPropertyList,
        extra: Vec<Attribute>,
    },
    Tag {
        name: String,
        attributes: Vec<Attribute>,
    },
}

impl Request {
    fn new(tag_name: &str, attributes: &[Attribute]) -> Self {
        let attributes: Vec<Attribute> = attributes
            .iter()
            .filter(|attribute| !attribute.value.is_empty())
            .cloned()
            .collect();

        if let Some((property, value)) = style_alias(tag_name) {
            return Request::Style {
                properties: CssPropertyList::new().with(property, value),
                extra: Vec::new(),
            };
        }

        let style = attributes
            .iter()
            .find(|attribute| attribute.name == STYLE)
            .map(|attribute| css::read(&attribute.value));
        match style {
            Some(properties) if tag_name == SPAN && !properties.is_empty() => Request::Style {
                properties,
                extra: attributes
                    .into_iter()
                    .filter(|attribute| attribute.name != STYLE)
                    .collect(),
            },
            _ => Request::Tag {
                name: tag_name.to_string(),
                attributes,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PropertyKind {
    /// On/off values such as `font-weight: bold`.
    Switch,
    /// Space separated flags, toggled one at a time.
    Decoration,
    /// Plain values that overwrite each other.
    Value,
}

impl PropertyKind {
    fn of(property: &str) -> Self {
        match property {
            "font-weight" | "font-style" => PropertyKind::Switch,
            "text-decoration" => PropertyKind::Decoration,
            _ => PropertyKind::Value,
        }
    }

    fn tokens(self, value: &str) -> Vec<&str> {
        match self {
            PropertyKind::Decoration => value
                .split_whitespace()
                .filter(|token| *token != "none")
                .collect(),
            _ => vec![value],
        }
    }
}

fn add_token(style: &mut CssPropertyList, property: &str, token: &str) {
    let kind = PropertyKind::of(property);
    if kind != PropertyKind::Decoration {
        style.set(property, token);
        return;
    }
    let mut tokens: Vec<&str> = style
        .get(property)
        .map(|value| kind.tokens(value))
        .unwrap_or_default();
    if !tokens.contains(&token) {
        tokens.push(token);
    }
    let joined = tokens.join(" ");
    style.set(property, &joined);
}

fn remove_token(style: &mut CssPropertyList, property: &str, token: &str) {
    let kind = PropertyKind::of(property);
    let Some(value) = style.get(property) else {
        return;
    };
    let remaining: Vec<&str> = kind
        .tokens(value)
        .into_iter()
        .filter(|existing| *existing != token)
        .collect();
    if kind == PropertyKind::Decoration && !remaining.is_empty() {
        let joined = remaining.join(" ");
        style.set(property, &joined);
    } else if remaining.is_empty() || kind == PropertyKind::Switch {
        style.remove(property);
    }
}

fn style_of(tag: &Tag) -> CssPropertyList {
    tag.attribute(STYLE).map(css::read).unwrap_or_default()
}

fn store_style(tag: &mut Tag, style: &CssPropertyList) {
    if style.is_empty() {
        tag.remove_attribute(STYLE);
    } else {
        tag.set_attribute(STYLE, &css::write(style));
    }
}

fn has_token(tag: &Tag, property: &str, token: &str) -> bool {
    style_of(tag)
        .get(property)
        .is_some_and(|value| PropertyKind::of(property).tokens(value).contains(&token))
}

/// Rewrites `strong`/`em` tags touching `selection` into their span form.
fn normalize_aliases(mut document: Document, selection: &Range<usize>) -> Document {
    for tag in &mut document.tags {
        let touches = tag.start < selection.end && selection.start < tag.end();
        let Some((property, value)) = style_alias(&tag.name).filter(|_| touches) else {
            continue;
        };
        let mut style = style_of(tag);
        style.set(property, value);
        tag.name = SPAN.to_string();
        store_style(tag, &style);
    }
    document
}

fn split_at(selection: &Range<usize>, breaks: &BTreeSet<usize>) -> Vec<Range<usize>> {
    let mut portions = Vec::with_capacity(breaks.len() + 1);
    let mut from = selection.start;
    for &point in breaks {
        portions.push(from..point);
        from = point;
    }
    portions.push(from..selection.end);
    portions
}

/// Splits `selection` wherever a tag crosses one of its edges, and around
/// the tags inside it that already carry what is being toggled, so that
/// every portion is either fully on or fully off.
fn portions(
    document: &Document,
    selection: &Range<usize>,
    carries: impl Fn(&Tag) -> bool,
) -> Vec<Range<usize>> {
    let inside = |point: &usize| selection.start < *point && *point < selection.end;
    let mut breaks: BTreeSet<usize> = document
        .tags
        .iter()
        .filter(|tag| {
            tag.partially_overlaps(selection)
                || (carries(tag) && selection.start <= tag.start && tag.end() <= selection.end)
        })
        .flat_map(|tag| [tag.start, tag.end()])
        .filter(inside)
        .collect();

    loop {
        let portions = split_at(selection, &breaks);
        let crossing: Vec<usize> = document
            .tags
            .iter()
            .filter(|tag| portions.iter().any(|portion| tag.partially_overlaps(portion)))
            .flat_map(|tag| [tag.start, tag.end()])
            .filter(|point| inside(point) && !breaks.contains(point))
            .collect();
        if crossing.is_empty() {
            return portions;
        }
        breaks.extend(crossing);
    }
}

/// The parts of tag `outer` not covered by `portion`, cut along the tags
/// nested between them so that no piece crosses a tag boundary.
fn complement(document: &Document, outer: usize, portion: &Range<usize>) -> Vec<Range<usize>> {
    let ancestor = &document.tags[outer];
    let mut chain: Vec<&Tag> = document
        .tags
        .iter()
        .filter(|tag| {
            tag.level > ancestor.level && tag.covers(portion) && ancestor.covers(&tag.range())
        })
        .collect();
    chain.sort_by_key(|tag| tag.level);

    let mut pieces = Vec::new();
    let mut enclosing = ancestor.range();
    for inner in chain
        .iter()
        .map(|tag| tag.range())
        .chain(std::iter::once(portion.clone()))
    {
        if enclosing.start < inner.start {
            pieces.push(enclosing.start..inner.start);
        }
        if inner.end < enclosing.end {
            pieces.push(inner.end..enclosing.end);
        }
        enclosing = inner;
    }
    pieces
}

/// Tags created while toggling one portion.
#[derive(Default)]
struct Additions {
    styled: Vec<(Range<usize>, CssPropertyList)>,
    plain: Vec<Tag>,
}

impl Additions {
    fn add_style(&mut self, range: Range<usize>, property: &str, token: &str) {
        match self.styled.iter_mut().find(|(existing, _)| *existing == range) {
            Some((_, style)) => add_token(style, property, token),
            None => {
                let mut style = CssPropertyList::new();
                add_token(&mut style, property, token);
                self.styled.push((range, style));
            }
        }
    }
}

struct PortionEdit<'a> {
    document: Document,
    portion: &'a Range<usize>,
    carried: CssPropertyList,
    additions: Additions,
    eliminated: Vec<usize>,
    touched: Vec<usize>,
}

impl<'a> PortionEdit<'a> {
    fn new(document: Document, portion: &'a Range<usize>) -> Self {
        Self {
            document,
            portion,
            carried: CssPropertyList::new(),
            additions: Additions::default(),
            eliminated: Vec::new(),
            touched: Vec::new(),
        }
    }

    fn covering_spans(&self) -> impl Iterator<Item = (usize, &Tag)> {
        self.document
            .tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| tag.name == SPAN && tag.covers(self.portion))
    }

    fn innermost_exact_span(&self) -> Option<usize> {
        self.covering_spans()
            .filter(|(_, tag)| tag.range() == *self.portion)
            .max_by_key(|(_, tag)| tag.level)
            .map(|(idx, _)| idx)
    }

    fn edit_style(&mut self, idx: usize, edit: impl FnOnce(&mut CssPropertyList)) {
        let tag = &mut self.document.tags[idx];
        let mut style = style_of(tag);
        edit(&mut style);
        store_style(tag, &style);
        if !self.touched.contains(&idx) {
            self.touched.push(idx);
        }
    }

    /// Gives the portion `property: value`, on an existing span covering
    /// exactly the portion if there is one.
    fn apply_to_portion(&mut self, property: &str, token: &str) {
        match self.innermost_exact_span() {
            Some(idx) => self.edit_style(idx, |style| add_token(style, property, token)),
            None => add_token(&mut self.carried, property, token),
        }
    }

    fn toggle_token(&mut self, property: &str, token: &str) {
        let mut holders: Vec<(usize, usize)> = self
            .covering_spans()
            .filter(|(_, tag)| has_token(tag, property, token))
            .map(|(idx, tag)| (idx, tag.level))
            .collect();
        if holders.is_empty() {
            self.apply_to_portion(property, token);
            return;
        }

        holders.sort_by_key(|(_, level)| std::cmp::Reverse(*level));
        for (idx, _) in holders {
            if self.document.tags[idx].range() != *self.portion {
                for piece in complement(&self.document, idx, self.portion) {
                    self.additions.add_style(piece, property, token);
                }
            }
            self.edit_style(idx, |style| remove_token(style, property, token));
        }
    }

    fn set_value(&mut self, property: &str, value: &str) {
        let definer = self
            .covering_spans()
            .filter(|(_, tag)| style_of(tag).get(property).is_some())
            .max_by_key(|(_, tag)| tag.level)
            .map(|(idx, _)| idx);

        if let Some(idx) = definer {
            let tag = &self.document.tags[idx];
            let current = style_of(tag)
                .get(property)
                .map(str::to_string)
                .unwrap_or_default();
            if tag.range() == *self.portion || current == value {
                self.edit_style(idx, |style| style.set(property, value));
                return;
            }
            for piece in complement(&self.document, idx, self.portion) {
                self.additions.add_style(piece, property, &current);
            }
            self.edit_style(idx, |style| {
                style.remove(property);
            });
        }
        self.apply_to_portion(property, value);
    }

    fn toggle_style(&mut self, properties: &CssPropertyList) {
        for entry in properties.iter() {
            let kind = PropertyKind::of(&entry.property);
            match kind {
                PropertyKind::Value => self.set_value(&entry.property, &entry.value),
                _ => {
                    for token in kind.tokens(&entry.value) {
                        self.toggle_token(&entry.property, token);
                    }
                }
            }
        }
        for idx in std::mem::take(&mut self.touched) {
            if self.document.tags[idx].attributes.is_empty() {
                self.eliminated.push(idx);
            }
        }
    }

    fn toggle_plain(&mut self, name: &str, attributes: &[Attribute]) {
        let mut matching: Vec<usize> = self
            .document
            .tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| tag.covers(self.portion) && tag.same_kind(name, attributes))
            .map(|(idx, _)| idx)
            .collect();

        if matching.is_empty() {
            let renamed = self
                .document
                .tags
                .iter()
                .enumerate()
                .filter(|(_, tag)| tag.name == name && tag.range() == *self.portion)
                .max_by_key(|(_, tag)| tag.level)
                .map(|(idx, _)| idx);
            match renamed {
                Some(idx) if !attributes.is_empty() => {
                    let tag = &mut self.document.tags[idx];
                    for attribute in attributes {
                        tag.set_attribute(&attribute.name, &attribute.value);
                    }
                }
                _ => {
                    let mut tag = Tag::new(name, self.portion.start, self.portion.len());
                    tag.attributes = attributes.to_vec();
                    self.additions.plain.push(tag);
                }
            }
            return;
        }

        matching.sort_by_key(|&idx| std::cmp::Reverse(self.document.tags[idx].level));
        for idx in matching {
            if self.document.tags[idx].range() != *self.portion {
                for piece in complement(&self.document, idx, self.portion) {
                    let mut tag = Tag::new(name, piece.start, piece.len());
                    tag.attributes = attributes.to_vec();
                    self.additions.plain.push(tag);
                }
            }
            self.eliminated.push(idx);
        }
    }

    fn finish(self, extra: &[Attribute]) -> Document {
        let mut document = eliminate(self.document, &self.eliminated);
        for (range, style) in self.additions.styled {
            let tag = Tag::new(SPAN, range.start, range.len());
            document = insert(document, with_style(tag, &style));
        }
        for tag in self.additions.plain {
            document = insert(document, tag);
        }
        if !self.carried.is_empty() {
            let mut tag = Tag::new(SPAN, self.portion.start, self.portion.len());
            for attribute in extra {
                tag.set_attribute(&attribute.name, &attribute.value);
            }
            document = insert(document, with_style(tag, &self.carried));
        }
        document
    }
}

fn with_style(mut tag: Tag, style: &CssPropertyList) -> Tag {
    store_style(&mut tag, style);
    tag
}

/// Removes the tags at `indices`; tags nested in a removed tag move up one
/// level per removed ancestor.
fn eliminate(mut document: Document, indices: &[usize]) -> Document {
    if indices.is_empty() {
        return document;
    }
    let removed: Vec<Tag> = indices
        .iter()
        .map(|&idx| document.tags[idx].clone())
        .collect();
    let mut idx = 0;
    document.tags.retain(|_| {
        let keep = !indices.contains(&idx);
        idx += 1;
        keep
    });
    for tag in &mut document.tags {
        let ancestors = removed
            .iter()
            .filter(|outer| outer.level < tag.level && outer.covers(&tag.range()))
            .count();
        tag.level -= ancestors.min(tag.level);
    }
    document
}

/// Adds `tag` inside every tag covering its range (same-range tags
/// included) and around every tag it covers.
fn insert(mut document: Document, mut tag: Tag) -> Document {
    let range = tag.range();
    tag.level = document
        .tags
        .iter()
        .filter(|existing| existing.covers(&range))
        .count();
    for existing in &mut document.tags {
        let inside = range.start <= existing.start && existing.end() <= range.end;
        if inside && existing.range() != range {
            existing.level += 1;
        }
    }
    document.tags.push(tag);
    document
}

fn toggle_document(
    document: Document,
    tag_name: &str,
    attributes: &[Attribute],
    selection: &Range<usize>,
) -> Document {
    let request = Request::new(tag_name, attributes);
    let mut document = match request {
        Request::Style { .. } => normalize_aliases(document, selection),
        Request::Tag { .. } => document,
    };

    let carries = |tag: &Tag| match &request {
        Request::Style { properties, .. } => {
            let style = style_of(tag);
            tag.name == SPAN
                && properties
                    .iter()
                    .any(|entry| style.get(&entry.property).is_some())
        }
        Request::Tag { name, attributes } => tag.same_kind(name, attributes),
    };
    for portion in portions(&document, selection, carries) {
        tracing::trace!(
            "toggling <{tag_name}> over {}..{}",
            portion.start,
            portion.end
        );
        let mut edit = PortionEdit::new(document, &portion);
        document = match &request {
            Request::Style { properties, extra } => {
                edit.toggle_style(properties);
                edit.finish(extra)
            }
            Request::Tag { name, attributes } => {
                edit.toggle_plain(name, attributes);
                edit.finish(&[])
            }
        };
    }
    document
}

/// Toggles `tag_name` over the plain-text range `start..end`.
///
/// The selection is split wherever existing tags cross it and each portion
/// is toggled on its own. `strong` and `em` are handled as the span styles
/// `font-weight: bold` and `font-style: italic`; a `span` with a `style`
/// attribute merges property by property. Text with unmatched markup is
/// left untouched and reported as an error.
pub fn toggle_tag(
    text: &mut String,
    tag_name: &str,
    attributes: &[Attribute],
    start: usize,
    end: usize,
) -> Result<EditOutcome, MarkupError> {
    if start == end {
        return Ok(EditOutcome::Unchanged);
    }
    let selection = start.min(end)..start.max(end);

    let document = markup::read_checked(text).inspect_err(|err| {
        tracing::warn!("not toggling <{tag_name}>: {err}");
    })?;
    let length = document.len();
    if selection.end > length {
        return Err(MarkupError::PositionOutOfRange {
            position: selection.end,
            length,
        });
    }

    let updated = markup::write(&toggle_document(document, tag_name, attributes, &selection));
    if updated == *text {
        return Ok(EditOutcome::Unchanged);
    }
    *text = updated;
    Ok(EditOutcome::Applied)
}
