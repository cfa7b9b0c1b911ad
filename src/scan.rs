//! Bracket-aware scanning over a substring of the input.
//!
//! All positions are byte indices into the text passed in. The characters
//! these helpers look for are ASCII, so every returned position is a valid
//! `str` slicing boundary.

/// Position of the first `)` without an opener, or else of the oldest `(`
/// left open at the end of the text.
pub fn unmatched_bracket(text: &str) -> Option<usize> {
    let mut open = Vec::new();
    for (pos, byte) in text.bytes().enumerate() {
        match byte {
            b'(' => open.push(pos),
            b')' => {
                if open.pop().is_none() {
                    return Some(pos);
                }
            }
            _ => {}
        }
    }
    open.first().copied()
}

/// Trims spaces (only `' '`) from both ends.
///
/// Returns the trimmed text and the number of leading bytes removed, or
/// `None` if nothing but spaces remains.
pub fn strip_spaces(text: &str) -> Option<(&str, usize)> {
    let start = text.find(|c: char| c != ' ')?;
    Some((text[start..].trim_end_matches(' '), start))
}

/// True when the text opens with `(` and the matching `)` is the last
/// character, so `(1+2)` qualifies but `(1)+(2)` does not.
///
/// Assumes balanced brackets.
pub fn is_fully_bracketed(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'(' || bytes[bytes.len() - 1] != b')' {
        return false;
    }
    let mut depth = 0usize;
    for (pos, byte) in bytes.iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return pos == bytes.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Positions of every character from `operators` that sits outside all
/// brackets, in order.
pub fn split_points(text: &str, operators: &[u8]) -> Vec<usize> {
    let mut depth = 0isize;
    let mut points = Vec::new();
    for (pos, byte) in text.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b if depth == 0 && operators.contains(&b) => points.push(pos),
            _ => {}
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_closing_bracket() {
        assert_eq!(unmatched_bracket("1+2)"), Some(3));
        assert_eq!(unmatched_bracket(")("), Some(0));
    }

    #[test]
    fn unmatched_opening_bracket_reports_oldest() {
        assert_eq!(unmatched_bracket("(2+3"), Some(0));
        assert_eq!(unmatched_bracket("1*((2+3)"), Some(2));
        assert_eq!(unmatched_bracket("((1"), Some(0));
    }

    #[test]
    fn balanced_brackets() {
        assert_eq!(unmatched_bracket(""), None);
        assert_eq!(unmatched_bracket("(1+(2*3))-(4)"), None);
    }

    #[test]
    fn strip() {
        assert_eq!(strip_spaces("  1 + 2 "), Some(("1 + 2", 2)));
        assert_eq!(strip_spaces("x"), Some(("x", 0)));
        assert_eq!(strip_spaces("   "), None);
        assert_eq!(strip_spaces(""), None);
    }

    #[test]
    fn fully_bracketed() {
        assert!(is_fully_bracketed("(1+2)"));
        assert!(is_fully_bracketed("((1)+(2))"));
        assert!(is_fully_bracketed("()"));
        assert!(!is_fully_bracketed("(1)+(2)"));
        assert!(!is_fully_bracketed("(1)(2)"));
        assert!(!is_fully_bracketed("cos(1)"));
        assert!(!is_fully_bracketed("("));
    }

    #[test]
    fn split_points_skip_bracketed_operators() {
        assert_eq!(split_points("2-3-1", b"+-"), vec![1, 3]);
        assert_eq!(split_points("1+(2-3)", b"+-"), vec![1]);
        assert_eq!(split_points("8/4*3", b"*/"), vec![1, 3]);
        assert_eq!(split_points("(2^3)^2", b"^"), vec![5]);
        assert!(split_points("(1+2)*(3+4)", b"+-").is_empty());
        assert!(split_points("cos(x)", b"^").is_empty());
    }
}
