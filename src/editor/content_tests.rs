use super::*;
use crate::markup::{MarkupError, read};

const SAMPLE: &str = "This <strong>is</strong> good.";

fn inserted(ch: char, position: usize, tag_number: usize, text: &str) -> String {
    let mut text = text.to_string();
    insert_character(ch, position, tag_number, &mut text).expect("insert failed");
    text
}

#[test]
fn insert_before_tag() {
    assert_eq!(inserted('X', 4, 0, SAMPLE), "ThisX <strong>is</strong> good.");
}

#[test]
fn tag_number_selects_side_of_opening_tag() {
    assert_eq!(inserted('X', 5, 0, SAMPLE), "This X<strong>is</strong> good.");
    assert_eq!(inserted('X', 5, 1, SAMPLE), "This <strong>Xis</strong> good.");
}

#[test]
fn tag_number_selects_side_of_closing_tag() {
    assert_eq!(inserted('X', 7, 0, SAMPLE), "This <strong>isX</strong> good.");
    assert_eq!(inserted('X', 7, 1, SAMPLE), "This <strong>is</strong>X good.");
}

#[test]
fn excess_tag_number_stops_at_next_text() {
    assert_eq!(inserted('X', 5, 7, SAMPLE), "This <strong>Xis</strong> good.");
    assert_eq!(inserted('X', 13, 3, SAMPLE), "This <strong>is</strong> good.X");
}

#[test]
fn insert_into_empty_text() {
    assert_eq!(inserted('a', 0, 0, ""), "a");
    assert_eq!(inserted('a', 0, 1, "<u></u>"), "<u>a</u>");
}

#[test]
fn insert_counts_characters_not_bytes() {
    assert_eq!(inserted('!', 2, 0, "äö<u>ü</u>"), "äö!<u>ü</u>");
    assert_eq!(inserted('!', 3, 0, "äö<u>ü</u>"), "äö<u>ü!</u>");
}

#[test]
fn insert_rejects_markup_and_bad_positions() {
    let mut text = SAMPLE.to_string();
    assert_eq!(
        insert_character('<', 0, 0, &mut text),
        Err(MarkupError::ReservedCharacter('<'))
    );
    assert_eq!(
        insert_character('x', 14, 0, &mut text),
        Err(MarkupError::PositionOutOfRange {
            position: 14,
            length: 13
        })
    );
    assert_eq!(text, SAMPLE);
}

#[test]
fn erase_removes_emptied_tag() {
    let mut text = SAMPLE.to_string();
    let tag_number = erase(5, 7, &mut text).unwrap();
    assert_eq!(text, "This  good.");
    assert_eq!(tag_number, 0);
}

#[test]
fn erase_keeps_markers_between_characters() {
    let mut text = "ab<em>cd</em>ef".to_string();
    let tag_number = erase(1, 3, &mut text).unwrap();
    assert_eq!(text, "a<em>d</em>ef");
    assert_eq!(tag_number, 0);
}

#[test]
fn erase_returns_context_of_first_erased_character() {
    let mut text = "ab<em>cd</em>ef".to_string();
    let tag_number = erase(2, 3, &mut text).unwrap();
    assert_eq!(text, "ab<em>d</em>ef");
    assert_eq!(tag_number, 1);

    insert_character('C', 2, tag_number, &mut text).unwrap();
    assert_eq!(text, "ab<em>Cd</em>ef");
}

#[test]
fn typing_after_erasing_the_end_of_a_tag_stays_inside() {
    let mut text = "ab<em>cd</em>ef".to_string();
    let tag_number = erase(3, 4, &mut text).unwrap();
    assert_eq!(text, "ab<em>c</em>ef");
    insert_character('D', 3, tag_number, &mut text).unwrap();
    assert_eq!(text, "ab<em>cD</em>ef");
}

#[test]
fn erase_with_reversed_bounds() {
    let mut text = "hello".to_string();
    erase(4, 1, &mut text).unwrap();
    assert_eq!(text, "ho");
}

#[test]
fn erase_out_of_range_leaves_text_alone() {
    let mut text = SAMPLE.to_string();
    assert!(matches!(
        erase(10, 20, &mut text),
        Err(MarkupError::PositionOutOfRange { position: 20, .. })
    ));
    assert_eq!(text, SAMPLE);
}

#[test]
fn empty_erase_still_checks_the_position() {
    let mut text = "ab".to_string();
    assert_eq!(erase(2, 2, &mut text), Ok(0));
    assert_eq!(
        erase(50, 50, &mut text),
        Err(MarkupError::PositionOutOfRange {
            position: 50,
            length: 2
        })
    );
    assert_eq!(text, "ab");
}

#[test]
fn erase_across_nested_tags() {
    let mut text = "a<u>b<s>c</s></u>d".to_string();
    erase(1, 3, &mut text).unwrap();
    assert_eq!(text, "ad");
    assert!(read(&text).tags.is_empty());
}

#[test]
fn cleanup_removes_nested_empty_pairs() {
    let mut text = "a<u><span style='color: red;'></span></u>b".to_string();
    assert_eq!(cleanup(&mut text), 2);
    assert_eq!(text, "ab");
}

#[test]
fn cleanup_keeps_adjacent_closing_tags() {
    let source = "<u><s>x</s></u>";
    let mut text = source.to_string();
    assert_eq!(cleanup(&mut text), 0);
    assert_eq!(text, source);
}

#[test]
fn cleanup_keeps_distinct_adjacent_pairs() {
    let source = "<u>x<s></u>";
    let mut text = source.to_string();
    assert_eq!(cleanup(&mut text), 0);
    assert_eq!(text, source);
}

#[test]
fn cleanup_is_idempotent() {
    for source in [
        "a<strong></strong>b<em>c</em>",
        "<u><s></s></u><s>x</s></u>",
        "<a><b></b><c></c></a>",
        "no tags",
    ] {
        let mut once = source.to_string();
        cleanup(&mut once);
        let mut twice = once.clone();
        assert_eq!(cleanup(&mut twice), 0);
        assert_eq!(twice, once);
    }
}

#[test]
fn raw_offset_maps_end_of_text() {
    assert_eq!(raw_offset(SAMPLE, 13, 0), Ok(SAMPLE.len()));
    assert_eq!(raw_offset("<u>x</u>", 1, 0), Ok(4));
    assert_eq!(raw_offset("<u>x</u>", 1, 1), Ok(8));
}
