use std::borrow::Cow;

/// Window titles are cut to this many runes in labels and status messages.
pub const LABEL_TITLE_RUNES: usize = 30;

/// Collapses `\r\n` into `\n`; every remaining `\n` is typed as one Enter.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Limits `s` to `n` runes, appending "..." when something was cut.
///
/// The input is returned unchanged (untrimmed) when it already fits.
pub fn truncate_runes(s: &str, n: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= n {
        return s.to_string();
    }

    let head: String = trimmed.chars().take(n).collect();
    if n <= 3 { head } else { format!("{head}...") }
}

/// Rune and line counts as used by the automatic speed heuristic.
/// An empty text still counts as one line.
pub fn rune_and_line_count(text: &str) -> (usize, usize) {
    text.chars().fold((0, 1), |(runes, lines), ch| {
        (runes + 1, if ch == '\n' { lines + 1 } else { lines })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_becomes_lf() {
        assert_eq!(normalize_line_endings("a\r\nb\r\n"), "a\nb\n");
        assert!(matches!(normalize_line_endings("a\nb"), Cow::Borrowed(_)));
    }

    #[test]
    fn truncation_appends_ellipsis() {
        assert_eq!(truncate_runes("short", 30), "short");
        assert_eq!(truncate_runes("äöüßäöüß", 4), "äöüß...");
        assert_eq!(truncate_runes("abcdef", 3), "abc");
    }

    #[test]
    fn counts_runes_and_lines() {
        assert_eq!(rune_and_line_count(""), (0, 1));
        assert_eq!(rune_and_line_count("ab\ncd\n"), (6, 3));
    }
}
