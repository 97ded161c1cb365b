use super::*;

fn render(raw: &str, width: usize) -> RenderResult {
    let options = RenderOptions {
        wrap_width: width,
        ..RenderOptions::default()
    };
    render_text(raw, &options, None, None, &Theme::default())
}

fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

fn at(line: usize, column: u16) -> CursorVisualPosition {
    CursorVisualPosition { line, column }
}

#[test]
fn formats_become_modifiers() {
    let result = render("a<strong>b</strong><u><s>c</s></u>", 80);
    let spans = &result.lines[0].spans;
    assert_eq!(spans.len(), 3);
    assert_eq!(spans[0].content, "a");
    assert_eq!(spans[0].style, Style::default());
    assert_eq!(spans[1].content, "b");
    assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
    assert_eq!(spans[2].content, "c");
    assert!(
        spans[2]
            .style
            .add_modifier
            .contains(Modifier::UNDERLINED | Modifier::CROSSED_OUT)
    );
}

#[test]
fn colors_become_foreground() {
    let result = render("<span style='color: rgb(1,2,3);'>x</span>", 80);
    assert_eq!(result.lines[0].spans[0].style.fg, Some(Color::Rgb(1, 2, 3)));
}

#[test]
fn words_wrap_at_the_configured_width() {
    let result = render("hello world foo", 11);
    assert_eq!(result.total_lines, 2);
    assert_eq!(line_text(&result.lines[0]).trim_end(), "hello world");
    assert_eq!(line_text(&result.lines[1]), "foo");

    assert_eq!(result.cursor_map.len(), 16);
    assert_eq!(result.cursor_map[11], at(0, 11));
    assert_eq!(result.cursor_map[12], at(1, 0));
    assert_eq!(result.cursor_map[15], at(1, 3));
}

#[test]
fn newlines_start_new_lines() {
    let result = render("a<em>b\nc</em>d", 80);
    assert_eq!(result.total_lines, 2);
    assert_eq!(result.cursor_map[2], at(0, 2));
    assert_eq!(result.cursor_map[3], at(1, 0));
    assert_eq!(result.cursor_map[5], at(1, 2));
}

#[test]
fn wide_characters_and_tabs_take_their_width() {
    let result = render("日本\tx", 80);
    assert_eq!(result.cursor_map[1], at(0, 2));
    assert_eq!(result.cursor_map[2], at(0, 4));
    assert_eq!(result.cursor_map[3], at(0, 8));
}

#[test]
fn selection_is_highlighted() {
    let theme = Theme::default();
    let result = render_text(
        "abc",
        &RenderOptions::default(),
        Some(2),
        Some(1..2),
        &theme,
    );
    let spans = &result.lines[0].spans;
    assert_eq!(spans.len(), 3);
    assert_eq!(spans[1].content, "b");
    assert_eq!(spans[1].style.bg, Some(theme.selection_bg));
    assert_eq!(spans[2].style, Style::default());
    assert_eq!(result.cursor, Some(at(0, 2)));
}

#[test]
fn empty_text_has_one_line_and_a_caret() {
    let result = render_text(
        "<u></u>",
        &RenderOptions::default(),
        Some(0),
        None,
        &Theme::default(),
    );
    assert_eq!(result.total_lines, 1);
    assert_eq!(result.cursor_map, vec![at(0, 0)]);
    assert_eq!(result.cursor, Some(at(0, 0)));
}

#[test]
fn visual_positions_map_back() {
    let result = render("hello world foo", 11);
    assert_eq!(result.position_at(1, 1), Some(13));
    assert_eq!(result.position_at(0, 50), Some(11));
    assert_eq!(result.position_at(7, 0), None);
}
