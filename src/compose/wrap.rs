//! Greedy word wrapping by character count.
//!
//! Widths are counted in characters, not pixels, so lines of wide glyphs come
//! out visually longer than lines of narrow ones.

/// Whitespace the wrapper normalizes and splits on.
const WRAP_WHITESPACE: [char; 6] = ['\t', '\n', '\x0b', '\x0c', '\r', ' '];

const TAB_SIZE: usize = 8;

/// Wraps `text` into lines of at most `width` characters.
///
/// Explicit line breaks count as plain spaces. Whitespace is dropped at the
/// end of every line and at the start of every line but the first. Words
/// longer than `width` are split, after their last hyphen that fits when
/// there is one. Whitespace-only input gives no lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut chunks = split_chunks(&normalize_whitespace(text));
    chunks.reverse();

    let mut lines: Vec<String> = Vec::new();
    while !chunks.is_empty() {
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0;

        if !lines.is_empty() && chunks.last().is_some_and(|chunk| is_blank(chunk)) {
            chunks.pop();
        }

        while let Some(chunk) = chunks.pop() {
            let len = chunk.chars().count();
            if current_len + len > width {
                chunks.push(chunk);
                break;
            }
            current_len += len;
            current.push(chunk);
        }

        if let Some(chunk) = chunks.last_mut()
            && chunk.chars().count() > width
        {
            let end = long_word_break(chunk, width.saturating_sub(current_len));
            let split_at = chunk.char_indices().nth(end).map_or(chunk.len(), |(index, _)| index);
            let tail = chunk.split_off(split_at);
            current.push(std::mem::replace(chunk, tail));
        }

        if current.last().is_some_and(|chunk| is_blank(chunk)) {
            current.pop();
        }
        if !current.is_empty() {
            lines.push(current.concat());
        }
    }
    lines
}

fn is_blank(chunk: &str) -> bool {
    chunk.chars().all(char::is_whitespace)
}

/// Characters of an overlong `chunk` that go on a line with `space_left` room.
///
/// Breaks after the last hyphen that fits, as long as something other than
/// hyphens comes before it.
fn long_word_break(chunk: &str, space_left: usize) -> usize {
    let chars: Vec<char> = chunk.chars().collect();
    let room = space_left.min(chars.len());
    match chars[..room].iter().rposition(|&ch| ch == '-') {
        Some(hyphen) if hyphen > 0 && chars[..hyphen].iter().any(|&ch| ch != '-') => hyphen + 1,
        _ => room,
    }
}

/// Expands tabs, then turns every wrap whitespace character into a space.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for ch in text.chars() {
        match ch {
            '\t' => {
                let pad = TAB_SIZE - column % TAB_SIZE;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(' ');
                column = 0;
            }
            ch if WRAP_WHITESPACE.contains(&ch) => {
                out.push(' ');
                column += 1;
            }
            ch => {
                out.push(ch);
                column += 1;
            }
        }
    }
    out
}

/// Splits normalized text into indivisible chunks.
///
/// A chunk is a run of spaces, a dash run of two or more hyphens between
/// words, or a word. Words also end after a hyphen that joins two letter
/// runs (`well-` + `known`, `a-b-` + `cdef`) and before a dash run.
fn split_chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = chunk_end(&chars, start);
        chunks.push(chars[start..end].iter().collect());
        start = end;
    }
    chunks
}

fn chunk_end(chars: &[char], start: usize) -> usize {
    if chars[start] == ' ' {
        return chars[start..]
            .iter()
            .position(|&ch| ch != ' ')
            .map_or(chars.len(), |offset| start + offset);
    }
    if start > 0
        && is_word_punct(chars[start - 1])
        && let Some(end) = dash_run(chars, start)
    {
        return end;
    }

    let mut end = start + 1;
    loop {
        match chars.get(end) {
            None | Some(' ') => return end,
            Some('-') if breaks_after_hyphen(chars, end) => return end + 1,
            Some(_) if is_word_punct(chars[end - 1]) && dash_run(chars, end).is_some() => {
                return end;
            }
            Some(_) => end += 1,
        }
    }
}

/// End of a run of two or more hyphens at `at` that is followed by a word character.
fn dash_run(chars: &[char], at: usize) -> Option<usize> {
    let hyphens = chars[at..].iter().take_while(|&&ch| ch == '-').count();
    let end = at + hyphens;
    (hyphens >= 2 && chars.get(end).is_some_and(|&ch| is_word(ch))).then_some(end)
}

/// The hyphen at `at` follows `xx` or `x-x` and precedes `xx` or `x-x`, letters only.
fn breaks_after_hyphen(chars: &[char], at: usize) -> bool {
    let letter = |index: Option<usize>| {
        index
            .and_then(|index| chars.get(index))
            .is_some_and(|&ch| is_letter(ch))
    };
    let hyphen = |index: Option<usize>| index.and_then(|index| chars.get(index)) == Some(&'-');

    let behind = letter(at.checked_sub(1))
        && (letter(at.checked_sub(2))
            || (hyphen(at.checked_sub(2)) && letter(at.checked_sub(3))));
    let ahead = letter(Some(at + 1))
        && (letter(Some(at + 2)) || (hyphen(Some(at + 2)) && letter(Some(at + 3))));
    behind && ahead
}

fn is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_letter(ch: char) -> bool {
    is_word(ch) && !ch.is_numeric()
}

fn is_word_punct(ch: char) -> bool {
    is_word(ch) || matches!(ch, '!' | '"' | '\'' | '&' | '.' | ',' | '?')
}
