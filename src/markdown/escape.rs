//! Markdown escaping and code-fence sizing.

/// Escape text so it renders literally in Markdown.
///
/// Inline markers (`\`, `*`, `_`, `` ` ``, `[`, `]`) are always escaped.
/// Block markers are escaped only where they would start a block: `#`, `>`,
/// `-`, `+` and `=` at the start of a line, and `N.` ordered-list numbers.
///
/// ```
/// use lectern::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("1984. A year"), "1984\\. A year");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        escape_line(line, &mut out);
    }
    out
}

fn escape_line(line: &str, out: &mut String) {
    let body = line.trim_start();
    out.push_str(&line[..line.len() - body.len()]);

    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    let rest = if digits > 0 && body[digits..].starts_with('.') {
        out.push_str(&body[..digits]);
        out.push_str("\\.");
        &body[digits + 1..]
    } else if let Some(marker) = body
        .chars()
        .next()
        .filter(|c| matches!(c, '#' | '>' | '-' | '+' | '='))
    {
        out.push('\\');
        out.push(marker);
        &body[marker.len_utf8()..]
    } else {
        body
    };

    push_inline(rest, out);
}

/// Escape text that continues a line, where block markers are inert.
pub fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    push_inline(text, &mut out);
    out
}

fn push_inline(text: &str, out: &mut String) {
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn longest_run(content: &str, marker: char) -> usize {
    content
        .split(|c| c != marker)
        .map(|run| run.chars().count())
        .max()
        .unwrap_or(0)
}

/// Fence length for a code block: at least 3, longer than any backtick run
/// in `content`.
pub fn calculate_fence_length(content: &str) -> usize {
    longest_run(content, '`').max(2) + 1
}

/// Backtick count for inline code: one more than the longest run in `content`.
pub fn calculate_inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}
