//! Glob matching for backup exclusions and organization rules.
//!
//! Patterns use fnmatch syntax: `*` matches any run of characters (slashes
//! included), `?` matches one character, `[seq]` / `[!seq]` match a class.
//! A pattern matches a path when it matches either the whole forward-slash
//! relative path or just the file name.

use crate::error::{AutomationError, Result};
use regex::Regex;
use std::path::Path;

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let translated = glob_to_regex(pattern);
        let regex = Regex::new(&translated).map_err(|e| AutomationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written in the configuration
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match against the normalized relative path or the bare file name
    pub fn matches(&self, relative_path: &Path) -> bool {
        let normalized = normalize_relative(relative_path);
        if self.regex.is_match(&normalized) {
            return true;
        }

        relative_path
            .file_name()
            .map(|name| self.regex.is_match(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

/// One-shot match of a relative path against a pattern
pub fn matches(relative_path: &Path, pattern: &str) -> Result<bool> {
    Ok(GlobPattern::new(pattern)?.matches(relative_path))
}

/// An ordered set of patterns, used for exclusions
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<GlobPattern>,
}

impl PatternSet {
    /// Compile every pattern; the first invalid one is returned as an error
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| GlobPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// The first pattern matching the path, if any
    pub fn first_match(&self, relative_path: &Path) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches(relative_path))
            .map(|p| p.as_str())
    }
}

/// Render a relative path with forward slashes on every platform
pub fn normalize_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Translate a glob into an anchored regex
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let n = chars.len();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < n {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                // Consecutive stars collapse into one
                while i < n && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < n && chars[j] == '!' {
                    j += 1;
                }
                if j < n && chars[j] == ']' {
                    j += 1;
                }
                while j < n && chars[j] != ']' {
                    j += 1;
                }

                if j >= n {
                    // Unterminated class is a literal bracket
                    out.push_str("\\[");
                } else {
                    out.push_str(&translate_class(&chars[i..j]));
                    i = j + 1;
                }
            }
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }

    out.push('$');
    out
}

/// Translate the body of a `[...]` class (without the brackets)
fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.first() {
        Some('!') => (true, &body[1..]),
        _ => (false, body),
    };

    let mut class = String::from("[");
    if negated {
        class.push('^');
    }

    for (idx, &ch) in body.iter().enumerate() {
        let is_range_dash = ch == '-' && idx > 0 && idx + 1 < body.len();
        if is_range_dash {
            class.push('-');
        } else {
            class.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4])));
        }
    }

    class.push(']');
    class
}
