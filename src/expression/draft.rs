//! Text helpers for formula drafts of the form `name = expression`.

use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_LHS: &str = "Duration";

fn open_date_diff_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(.*?)\s*=\s*date_diff\((.+?),\s*$").expect("valid date_diff pattern")
    })
}

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_ ]*?)\s*=\s*(.+)$").expect("valid assignment pattern")
    })
}

/// Text before the first `=`, trimmed. `None` when there is no `=` or
/// nothing in front of it.
pub fn left_hand_side(draft: &str) -> Option<&str> {
    let (lhs, _) = draft.split_once('=')?;
    let lhs = lhs.trim();
    (!lhs.is_empty()).then_some(lhs)
}

pub fn lhs_or_default(draft: &str) -> &str {
    left_hand_side(draft).unwrap_or(DEFAULT_LHS)
}

/// Column reference as it appears in a formula. Names with whitespace are
/// backtick-quoted.
pub fn column_token(name: &str) -> String {
    if name.chars().any(char::is_whitespace) {
        format!("`{}`", name)
    } else {
        name.to_string()
    }
}

pub fn append_token(draft: &mut String, token: &str) {
    if !draft.is_empty() && !draft.ends_with(char::is_whitespace) && !draft.ends_with('(') {
        draft.push(' ');
    }
    draft.push_str(token);
}

/// `"<lhs> = date_diff(<first>, "`, waiting for the second column.
pub fn open_date_diff(lhs: &str, first: &str) -> String {
    format!("{} = date_diff({}, ", lhs, first)
}

pub fn closed_date_diff(lhs: &str, first: &str, second: &str) -> String {
    format!("{} = date_diff({}, {})", lhs, first, second)
}

/// Close an unterminated `<lhs> = date_diff(<first>, ` draft with `second`.
/// `None` when the draft does not end in that shape.
pub fn close_open_date_diff(draft: &str, second: &str) -> Option<String> {
    let caps = open_date_diff_re().captures(draft)?;
    let lhs = caps.get(1)?.as_str().trim();
    let first = caps.get(2)?.as_str().trim();
    if lhs.is_empty() || first.is_empty() {
        return None;
    }
    Some(closed_date_diff(lhs, first, second))
}

/// Split `name = expression` into its parts.
pub fn parse_assignment(input: &str) -> Option<(String, String)> {
    let caps = assignment_re().captures(input.trim())?;
    let name = caps.get(1)?.as_str().trim();
    let expression = caps.get(2)?.as_str().trim();
    if name.is_empty() || expression.is_empty() {
        return None;
    }
    Some((name.to_string(), expression.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_hand_side() {
        assert_eq!(left_hand_side("Lead Time = a - b"), Some("Lead Time"));
        assert_eq!(left_hand_side(" = a"), None);
        assert_eq!(left_hand_side("a + b"), None);
        assert_eq!(lhs_or_default(""), DEFAULT_LHS);
    }

    #[test]
    fn test_close_open_date_diff() {
        assert_eq!(
            close_open_date_diff("Age = date_diff(Created, ", "Closed").as_deref(),
            Some("Age = date_diff(Created, Closed)")
        );
        assert_eq!(
            close_open_date_diff("Age = date_diff(`Start Date`,", "End").as_deref(),
            Some("Age = date_diff(`Start Date`, End)")
        );
        assert_eq!(close_open_date_diff("Age = date_diff(Created, Qty", "End"), None);
        assert_eq!(close_open_date_diff("date_diff(Created, ", "End"), None);
    }

    #[test]
    fn test_append_token_spacing() {
        let mut draft = String::new();
        append_token(&mut draft, "Price");
        append_token(&mut draft, "*");
        append_token(&mut draft, &column_token("Unit Count"));
        assert_eq!(draft, "Price * `Unit Count`");

        let mut call = "round(".to_string();
        append_token(&mut call, "Price");
        assert_eq!(call, "round(Price");
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("margin = revenue - cost"),
            Some(("margin".into(), "revenue - cost".into()))
        );
        assert_eq!(
            parse_assignment("Lead Time = date_diff(a, b)"),
            Some(("Lead Time".into(), "date_diff(a, b)".into()))
        );
        assert_eq!(parse_assignment("revenue * 2"), None);
        assert_eq!(parse_assignment("1abc = x"), None);
    }
}
