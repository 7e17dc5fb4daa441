//! Bracket- and quote-aware scanning of filter expressions.

/// Calls `visit` with the byte offset, character and nesting depth of every
/// character outside quoted strings, stopping as soon as it returns `true`.
///
/// Openers report the depth outside them and closers the depth they return
/// to, so a matching pair is visited at the same depth.
fn scan(text: &str, mut visit: impl FnMut(usize, char, usize) -> bool) {
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                continue;
            }
            '(' | '[' | '{' => {
                if visit(offset, ch, depth) {
                    return;
                }
                depth += 1;
                continue;
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if visit(offset, ch, depth) {
            return;
        }
    }
}

/// Split `text` on `;` separators that sit outside any brackets or quotes.
///
/// Statements are trimmed and empty ones dropped.
pub(crate) fn split_statements(text: &str) -> Vec<&str> {
    let mut bounds = Vec::new();
    let mut start = 0;
    scan(text, |offset, ch, depth| {
        if ch == ';' && depth == 0 {
            bounds.push((start, offset));
            start = offset + 1;
        }
        false
    });
    bounds.push((start, text.len()));
    bounds
        .into_iter()
        .filter_map(|(from, to)| text.get(from..to))
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .collect()
}

/// Byte offset of the `)` closing the group that opens `text`.
///
/// Returns `None` if `text` does not start with `(` or the group never
/// closes.
pub(crate) fn group_end(text: &str) -> Option<usize> {
    if !text.starts_with('(') {
        return None;
    }
    let mut end = None;
    scan(text, |offset, ch, depth| {
        if ch == ')' && depth == 0 {
            end = Some(offset);
            return true;
        }
        false
    });
    end
}

/// Byte offset of a top-level `->` result assignment.
pub(crate) fn assignment_start(text: &str) -> Option<usize> {
    let mut found = None;
    scan(text, |offset, ch, depth| {
        if ch == '-' && depth == 0 && text.get(offset..).is_some_and(|rest| rest.starts_with("->")) {
            found = Some(offset);
            return true;
        }
        false
    });
    found
}
