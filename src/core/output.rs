//! Bounded text for report lines and verdict messages.

/// Join the first `limit` items, rendered, and note how many were left out.
fn join_bounded<S: AsRef<str>>(
    items: &[S],
    limit: usize,
    sep: &str,
    render: impl Fn(&str) -> String,
) -> String {
    let mut out = items
        .iter()
        .take(limit)
        .map(|s| render(s.as_ref()))
        .collect::<Vec<_>>()
        .join(sep);
    let hidden = items.len().saturating_sub(limit);
    if hidden > 0 {
        out.push_str(&format!(" (+{} more)", hidden));
    }
    out
}

/// Single-line form of `input`: whitespace runs become one space and anything
/// past `width` characters is cut and marked with `...`.
pub fn clip_line(input: &str, width: usize) -> String {
    let line = input.split_whitespace().collect::<Vec<_>>().join(" ");
    match line.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line,
    }
}

/// `a | b (+3 more)`, each message clipped to `width`.
pub fn message_preview<S: AsRef<str>>(messages: &[S], limit: usize, width: usize) -> String {
    join_bounded(messages, limit, " | ", |m| clip_line(m, width))
}

/// `'a', 'b' (+3 more)`
pub fn quoted_list<S: AsRef<str>>(items: &[S], limit: usize) -> String {
    join_bounded(items, limit, ", ", |s| format!("'{}'", s))
}
