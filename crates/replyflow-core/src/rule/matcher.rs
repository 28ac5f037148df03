//! Keyword and wildcard matching against inbound message text.
//!
//! Plain keywords are substring tests. Keywords containing `*` or `?` are
//! anchored glob tests against the whole (normalized) message, so a bare
//! `"*meeting*"` only behaves like a substring search because the outer `*`
//! absorb the rest of the text.

use regex::Regex;

/// Characters removed from message text before matching.
///
/// Decorative emoji inserted mid-word ("price💰tag") must not defeat keyword
/// matching. Ranges are inclusive.
pub const EMOJI_RANGES: &[(char, char)] = &[
    ('\u{1F600}', '\u{1F64F}'), // emoticons
    ('\u{1F300}', '\u{1F5FF}'), // symbols & pictographs
    ('\u{1F680}', '\u{1F6FF}'), // transport & map
    ('\u{1F1E0}', '\u{1F1FF}'), // regional indicators (flags)
    ('\u{2600}', '\u{27BF}'),   // misc symbols, dingbats
    ('\u{1F900}', '\u{1F9FF}'), // supplemental symbols & pictographs
    ('\u{1FA70}', '\u{1FAFF}'), // symbols & pictographs extended-A
    ('\u{FE0F}', '\u{FE0F}'),   // emoji variation selector
    ('\u{200D}', '\u{200D}'),   // zero width joiner
];

const WILDCARDS: [char; 2] = ['*', '?'];

fn is_emoji(c: char) -> bool {
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&c))
}

/// Removes every character listed in [`EMOJI_RANGES`].
pub fn normalize(text: &str) -> String {
    text.chars().filter(|c| !is_emoji(*c)).collect()
}

/// Returns true if `pattern` is a glob (contains `*` or `?`).
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(WILDCARDS)
}

fn fold(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

/// Translates a glob into an anchored regular expression.
///
/// `*` matches any run of characters (including none), `?` exactly one
/// character, and every other character is matched literally.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str("(?s)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

/// A keyword compiled for repeated matching.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal {
        raw: String,
        folded: String,
        case_sensitive: bool,
    },
    Glob {
        raw: String,
        regex: Regex,
        case_sensitive: bool,
    },
}

impl Pattern {
    /// Compiles `raw` once. The keyword is normalized like message text, and
    /// case is folded up front when matching is case-insensitive.
    pub fn compile(raw: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        let folded = fold(&normalize(raw), case_sensitive);
        if is_wildcard(raw) {
            Ok(Self::Glob {
                raw: raw.to_string(),
                regex: glob_to_regex(&folded)?,
                case_sensitive,
            })
        } else {
            Ok(Self::Literal {
                raw: raw.to_string(),
                folded,
                case_sensitive,
            })
        }
    }

    /// The keyword as written in the rule.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal { raw, .. } | Self::Glob { raw, .. } => raw,
        }
    }

    pub fn is_glob(&self) -> bool {
        matches!(self, Self::Glob { .. })
    }

    /// Tests already-normalized text.
    pub fn matches_normalized(&self, normalized: &str) -> bool {
        if normalized.is_empty() || self.as_str().is_empty() {
            return false;
        }
        match self {
            Self::Literal { folded, .. } if folded.is_empty() => false,
            Self::Literal {
                folded,
                case_sensitive,
                ..
            } => fold(normalized, *case_sensitive).contains(folded.as_str()),
            Self::Glob {
                regex,
                case_sensitive,
                ..
            } => regex.is_match(&fold(normalized, *case_sensitive)),
        }
    }

    /// Normalizes `text` and tests it.
    pub fn matches(&self, text: &str) -> bool {
        self.matches_normalized(&normalize(text))
    }
}

/// Does `text` match `pattern`?
///
/// Empty text or an empty pattern never match. A pattern that cannot be
/// compiled never matches either.
pub fn matches(text: &str, pattern: &str, case_sensitive: bool) -> bool {
    if text.is_empty() || pattern.is_empty() {
        return false;
    }
    match Pattern::compile(pattern, case_sensitive) {
        Ok(compiled) => compiled.matches(text),
        Err(_) => false,
    }
}
