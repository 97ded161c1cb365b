use crate::markup::{MarkupError, Token, marker_name, tokens};

fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

/// Maps a plain-text position onto a byte offset in the decorated string.
///
/// When `position` falls on one or more markers, `tag_number` says how many
/// of them to step over: `0` places the offset before the first one.
pub fn raw_offset(text: &str, position: usize, tag_number: usize) -> Result<usize, MarkupError> {
    let mut characters = 0;
    let mut skip = tag_number;

    for (range, token) in tokens(text) {
        match token {
            Token::Text(run) => {
                let len = run.chars().count();
                if position < characters + len {
                    return Ok(range.start + char_to_byte_idx(run, position - characters));
                }
                characters += len;
            }
            _ if position == characters => {
                if skip == 0 {
                    return Ok(range.start);
                }
                skip -= 1;
            }
            _ => {}
        }
    }

    if position == characters {
        Ok(text.len())
    } else {
        Err(MarkupError::PositionOutOfRange {
            position,
            length: characters,
        })
    }
}

pub fn insert_character(
    ch: char,
    position: usize,
    tag_number: usize,
    text: &mut String,
) -> Result<(), MarkupError> {
    if ch == '<' || ch == '>' {
        return Err(MarkupError::ReservedCharacter(ch));
    }
    let offset = raw_offset(text, position, tag_number)?;
    text.insert(offset, ch);
    Ok(())
}

/// Deletes the plain characters in `start..end`, keeping all markers, then
/// removes the tag pairs that became empty.
///
/// Returns the `tag_number` that lets a following [`insert_character`] at
/// `start` continue in the formatting of the first erased character. The
/// text is left untouched on error.
pub fn erase(start: usize, end: usize, text: &mut String) -> Result<usize, MarkupError> {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    if start == end {
        raw_offset(text, start, 0)?;
        return Ok(0);
    }

    let mut out = String::with_capacity(text.len());
    let mut characters = 0;
    let mut erase_point = None;
    for (range, token) in tokens(text) {
        let Token::Text(run) = token else {
            out.push_str(&text[range]);
            continue;
        };
        for ch in run.chars() {
            if (start..end).contains(&characters) {
                erase_point.get_or_insert(out.len());
            } else {
                out.push(ch);
            }
            characters += 1;
        }
    }
    if end > characters {
        return Err(MarkupError::PositionOutOfRange {
            position: end,
            length: characters,
        });
    }
    let mut erase_point = erase_point.unwrap_or(out.len());

    cleanup_tracking(&mut out, &mut erase_point);

    let left = raw_offset(&out, start, 0)?;
    let tag_number = tokens(&out)
        .filter(|(range, token)| {
            token.is_marker() && range.start >= left && range.end <= erase_point
        })
        .count();

    *text = out;
    Ok(tag_number)
}

/// Removes empty tag pairs such as `<strong></strong>` until none are left.
///
/// Returns the number of removed pairs.
pub fn cleanup(text: &mut String) -> usize {
    let mut unused = 0;
    cleanup_tracking(text, &mut unused)
}

/// [`cleanup`] that keeps `point`, a byte offset into `text`, pointing at the
/// same place. A point inside a removed pair moves to where the pair was.
fn cleanup_tracking(text: &mut String, point: &mut usize) -> usize {
    let mut removed = 0;
    let mut from = 0;

    while let Some(found) = text[from..].find("></") {
        let gt = from + found;
        let candidate = text[..gt].rfind('<').and_then(|open_start| {
            let open = &text[open_start + 1..gt];
            if open.starts_with('/') {
                return None;
            }
            let close_len = text[gt + 1..].find('>')? + 1;
            let close = &text[gt + 1..gt + 1 + close_len];
            let same = marker_name(open) == marker_name(&close[1..close.len() - 1]);
            same.then_some(open_start..gt + 1 + close_len)
        });

        let Some(pair) = candidate else {
            tracing::trace!(offset = gt, "not an empty pair");
            from = gt + 1;
            continue;
        };

        if *point >= pair.end {
            *point -= pair.len();
        } else if *point > pair.start {
            *point = pair.start;
        }
        from = text[..pair.start].rfind('<').unwrap_or(0);
        text.replace_range(pair, "");
        removed += 1;
    }

    removed
}
