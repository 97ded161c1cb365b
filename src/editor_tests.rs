use super::*;
use crate::format::{FormatOptions, FormatRange, resolve_str};
use crate::markup::{self, Attribute, Document, read, write};

/// Small deterministic generator so edit sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

fn assert_well_formed(document: &Document) {
    let length = document.len();
    for tag in &document.tags {
        assert!(tag.end() <= length, "{tag:?} exceeds the text");
        for other in &document.tags {
            assert!(
                !tag.partially_overlaps(&other.range()),
                "{tag:?} crosses {other:?}"
            );
        }
        let enclosing = document
            .tags
            .iter()
            .filter(|other| other.level < tag.level && other.covers(&tag.range()))
            .count();
        assert_eq!(enclosing, tag.level, "level of {tag:?}");
    }
}

/// Formatting flags per character, combining ranges the way a renderer would.
fn rendered(text: &str) -> Vec<(bool, bool, bool, bool, Option<String>)> {
    let length = read(text).len();
    let mut cells = vec![(false, false, false, false, None); length];
    let ranges: Vec<FormatRange> = resolve_str(text, &FormatOptions::default());
    for range in ranges {
        for cell in &mut cells[range.start..range.end()] {
            cell.0 |= range.bold;
            cell.1 |= range.italic;
            cell.2 |= range.underline;
            cell.3 |= range.strikethrough;
            if range.color.is_some() {
                cell.4 = range.color.map(|color| color.to_string());
            }
        }
    }
    cells
}

const SEED_TEXT: &str = "The <em>quick <strong>brown</strong></em> fox <u>jumps <s>over</s></u> the lazy dog.";

#[test]
fn random_edits_keep_tags_nested() {
    let mut rng = Lcg(7);
    let mut text = SEED_TEXT.to_string();
    let tag_names = ["strong", "em", "u", "s"];

    for step in 0..300 {
        let length = read(&text).len();
        match rng.next(4) {
            0 if length > 1 => {
                let start = rng.next(length);
                let end = start + 1 + rng.next(length - start);
                let before = read(&text).plain_text;
                let name = tag_names[rng.next(tag_names.len())];
                toggle_tag(&mut text, name, &[], start, end).unwrap();
                assert_eq!(read(&text).plain_text, before, "step {step}: toggle changed text");
            }
            1 if length > 1 => {
                let start = rng.next(length);
                let end = start + 1 + rng.next((length - start).min(3));
                let before = read(&text).plain_text;
                let colors = ["#ff0000", "#00ff00", "rgb(0,0,255)"];
                let style = format!("color: {};", colors[rng.next(colors.len())]);
                toggle_tag(
                    &mut text,
                    "span",
                    &[Attribute::new("style", style)],
                    start,
                    end.min(length),
                )
                .unwrap();
                assert_eq!(read(&text).plain_text, before, "step {step}: style changed text");
            }
            2 if length > 0 => {
                let start = rng.next(length);
                let end = (start + 1 + rng.next(2)).min(length);
                let tag_number = erase(start, end, &mut text).unwrap();
                insert_character('x', start, tag_number, &mut text).unwrap();
            }
            _ => {
                let position = rng.next(length + 1);
                insert_character('y', position, rng.next(3), &mut text).unwrap();
            }
        }

        let document = read(&text);
        assert_well_formed(&document);
        assert_eq!(
            markup::read_checked(&text).map(|checked| checked == document),
            Ok(true),
            "step {step}: {text}"
        );
        assert_eq!(write(&document), text, "step {step}: not in canonical form");
    }
}

#[test]
fn strong_toggle_cancels_on_nested_text() {
    for (start, end) in [(0, 3), (4, 9), (6, 12), (10, 19), (16, 20), (0, 44)] {
        let mut text = SEED_TEXT.to_string();
        let original = rendered(&text);
        toggle_tag(&mut text, "strong", &[], start, end).unwrap();
        assert_ne!(rendered(&text), original, "toggle {start}..{end} had no effect");
        toggle_tag(&mut text, "strong", &[], start, end).unwrap();
        assert_eq!(rendered(&text), original, "toggle {start}..{end} did not cancel");
    }
}

#[test]
fn cleanup_after_random_erasures_is_idempotent() {
    let mut rng = Lcg(42);
    for _ in 0..50 {
        let mut text = SEED_TEXT.to_string();
        let length = read(&text).len();
        let start = rng.next(length);
        let end = (start + rng.next(12)).min(length);
        erase(start, end, &mut text).unwrap();
        let mut again = text.clone();
        assert_eq!(cleanup(&mut again), 0);
        assert_eq!(again, text);
    }
}

#[test]
fn typing_session() {
    let mut text = String::new();
    for (position, ch) in "Hello world".chars().enumerate() {
        insert_character(ch, position, 0, &mut text).unwrap();
    }
    assert_eq!(
        toggle_tag(&mut text, "u", &[], 6, 11),
        Ok(EditOutcome::Applied)
    );
    assert_eq!(text, "Hello <u>world</u>");

    // Typing at the end of the underlined word continues the underline.
    insert_character('!', 11, 0, &mut text).unwrap();
    assert_eq!(text, "Hello <u>world!</u>");

    let tag_number = erase(6, 12, &mut text).unwrap();
    assert_eq!(text, "Hello ");
    insert_character('W', 6, tag_number, &mut text).unwrap();
    assert_eq!(text, "Hello W");
}
