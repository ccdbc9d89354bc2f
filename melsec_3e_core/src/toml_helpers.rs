// Helper for TOML parse error message decoration shared by the embedded
// device and completion-code tables.

/// Look for a "line N column M" pattern in a parser error message and return
/// `(line, column)` when found.
#[must_use]
pub fn extract_line_col_from_msg(msg: &str) -> Option<(usize, usize)> {
    fn number_after<'a>(s: &'a str, marker: &str) -> Option<(usize, &'a str)> {
        let rest = &s[s.find(marker)? + marker.len()..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok().map(|n| (n, rest))
    }

    let (line, rest) = number_after(msg, "line ")?;
    let (col, _) = number_after(rest, "column ")?;
    Some((line, col))
}
