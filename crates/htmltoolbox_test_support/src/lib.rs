pub mod fixtures;

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{00A0}' => out.push_str("\\u{A0}"),
            ch if ch < ' ' => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Side-by-side report of the first differing line, with two lines of context.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;
    fn line(lines: &[String], i: usize) -> &str {
        lines.get(i).map(String::as_str).unwrap_or("<missing>")
    }
    let max = expected.len().max(actual.len());
    let mismatch = (0..max).find(|i| line(expected, *i) != line(actual, *i));

    let mut out = String::new();
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for idx in start..end {
            let marker = if idx == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {}", idx + 1, line(expected, idx));
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {}", idx + 1, line(actual, idx));
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

/// Splits `text` into escaped lines for [`diff_lines`].
pub fn escaped_lines(text: &str) -> Vec<String> {
    text.split('\n').map(escape_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_text_makes_whitespace_visible() {
        assert_eq!(escape_text("a\tb\n\"c\"\u{00A0}"), "a\\tb\\n\\\"c\\\"\\u{A0}");
        assert_eq!(escape_text("\u{1}"), "\\u{01}");
    }

    #[test]
    fn diff_lines_marks_missing_lines() {
        let report = diff_lines(&escaped_lines("a"), &escaped_lines("a\nb"));
        assert!(report.contains(">    2  expected: <missing>"));
        assert!(report.contains(">    2    actual: b"));
    }

    #[test]
    fn diff_lines_points_at_first_mismatch() {
        let expected = escaped_lines("a\nb\nc");
        let actual = escaped_lines("a\nx\nc\nd");
        let report = diff_lines(&expected, &actual);
        assert!(report.starts_with("first mismatch at line 2"));
        assert!(report.contains(">    2  expected: b"));
        assert!(report.contains(">    2    actual: x"));
        assert!(report.ends_with("expected 3 lines, actual 4 lines\n"));
    }
}
