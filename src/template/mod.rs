//! Parameter substitution engine
//!
//! Rewrites `%NAME%` tokens in command lines and configuration file
//! contents. Text from a `#` to the end of its line is a comment and is
//! copied through untouched, even when it contains token-shaped text.
//!
//! The scanner is a single left-to-right pass over one alternation regex:
//! a comment match wins over a token match starting at the same position,
//! and replacement values are never re-scanned.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{self, Result};

/// Substitution context for one templating pass
pub type ParamMap = BTreeMap<String, String>;

/// Line separator used when joining templated stdin blocks
#[cfg(windows)]
pub const LINE_SEP: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEP: &str = "\n";

#[allow(clippy::expect_used)]
static PARAM_SUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)#[^\n]*|%([A-Za-z0-9_]+)%").expect("parameter pattern is valid")
});

/// One match produced by the scanner
enum Piece<'t> {
    Comment,
    Token { name: &'t str },
}

fn classify<'t>(caps: &Captures<'t>) -> Piece<'t> {
    match caps.get(1) {
        Some(name) => Piece::Token {
            name: name.as_str(),
        },
        None => Piece::Comment,
    }
}

/// Collect the distinct token names that appear outside comments
pub fn find_params(text: &str) -> BTreeSet<String> {
    PARAM_SUB
        .captures_iter(text)
        .filter_map(|caps| match classify(&caps) {
            Piece::Token { name } => Some(name.to_string()),
            Piece::Comment => None,
        })
        .collect()
}

/// Replace every `%NAME%` token outside comments with its value from `params`
///
/// A token without a value fails with a missing parameter error, unless
/// `ignore_missing` is set, in which case the token's source text is kept.
pub fn replace(text: &str, params: &ParamMap, ignore_missing: bool) -> Result<String> {
    if text.is_empty() {
        return Ok(String::new());
    }

    tracing::debug!(
        ignore_missing,
        found = ?find_params(text),
        "performing parameter replacements"
    );

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PARAM_SUB.captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&text[last..whole.start]);
        let original = &text[whole.clone()];
        match classify(&caps) {
            Piece::Comment => out.push_str(original),
            Piece::Token { name } => match params.get(name) {
                Some(value) => {
                    tracing::trace!(token = original, value = %value, "replacing");
                    out.push_str(value);
                }
                None if ignore_missing => out.push_str(original),
                None => return Err(error::missing_parameter(name)),
            },
        }
        last = whole.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Apply [`replace`] to each element of an ordered sequence, skipping absent entries
pub fn replace_list<I, S>(values: I, params: &ParamMap, ignore_missing: bool) -> Result<Vec<String>>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flatten()
        .map(|value| replace(value.as_ref(), params, ignore_missing))
        .collect()
}

/// Join lines with the host line separator
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(LINE_SEP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_replace_keeps_trailing_comment() {
        let out = replace(
            "install %PKG%  # %PKG% is a placeholder",
            &params(&[("PKG", "nginx")]),
            false,
        )
        .unwrap();
        assert_eq!(out, "install nginx  # %PKG% is a placeholder");
    }

    #[test]
    fn test_comment_line_preserved_even_when_missing() {
        let text = "a = %A%\n# %X%\nb = 1\n";
        let out = replace(text, &params(&[("A", "1")]), false).unwrap();
        assert_eq!(out, "a = 1\n# %X%\nb = 1\n");
    }

    #[test]
    fn test_comment_detection_is_per_line() {
        let text = "# %A%\n%A%";
        let out = replace(text, &params(&[("A", "x")]), false).unwrap();
        assert_eq!(out, "# %A%\nx");
    }

    #[test]
    fn test_missing_parameter_is_error() {
        let err = replace("run %NOPE%", &ParamMap::new(), false).unwrap_err();
        assert!(matches!(err, crate::error::StackError::MissingParameter { ref token } if token == "NOPE"));
    }

    #[test]
    fn test_ignore_missing_keeps_token_text() {
        let out = replace("%A% and %B%", &params(&[("A", "1")]), true).unwrap();
        assert_eq!(out, "1 and %B%");
    }

    #[test]
    fn test_no_tokens_left_after_full_replacement() {
        let text = "%HOST%:%PORT%/%DB%\n# %HOST%";
        let map = params(&[("HOST", "localhost"), ("PORT", "3306"), ("DB", "q")]);
        let out = replace(text, &map, false).unwrap();
        let first_line = out.lines().next().unwrap();
        for name in find_params(text) {
            assert!(!first_line.contains(&format!("%{name}%")));
        }
        assert_eq!(out, "localhost:3306/q\n# %HOST%");
    }

    #[test]
    fn test_replacement_values_are_not_rescanned() {
        let out = replace("%A%", &params(&[("A", "%B%"), ("B", "nope")]), false).unwrap();
        assert_eq!(out, "%B%");
    }

    #[test]
    fn test_adjacent_tokens_do_not_overlap() {
        let out = replace("%A%%B%", &params(&[("A", "x"), ("B", "y")]), false).unwrap();
        assert_eq!(out, "xy");
    }

    #[test]
    fn test_invalid_token_characters_left_alone() {
        let out = replace("100% done, %not-a-token%", &ParamMap::new(), false).unwrap();
        assert_eq!(out, "100% done, %not-a-token%");
    }

    #[test]
    fn test_find_params_skips_comments() {
        let found = find_params("%A% %B% %A% # %C%\n%D%");
        let expected: BTreeSet<String> = ["A", "B", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(replace("", &ParamMap::new(), false).unwrap(), "");
        assert!(find_params("").is_empty());
    }

    #[test]
    fn test_replace_list_skips_absent_entries() {
        let map = params(&[("BR", "br-int")]);
        let out = replace_list(
            vec![Some("ovs-vsctl"), None, Some("add-br"), Some("%BR%")],
            &map,
            false,
        )
        .unwrap();
        assert_eq!(out, vec!["ovs-vsctl", "add-br", "br-int"]);
    }

    #[test]
    fn test_replace_list_propagates_missing() {
        let result = replace_list(vec![Some("%X%")], &ParamMap::new(), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_join_lines() {
        assert_eq!(join_lines(&["a", "b"]), format!("a{LINE_SEP}b"));
    }
}
