//! Unix-grep-like filtering over snapshot lines and per-element search
//! records.
//!
//! Defaults diverge from grep(1) on purpose: matching is case-insensitive
//! unless asked otherwise, and bare `*` wildcards are rewritten to `.*` so
//! agents can pass glob-style patterns without valid regex syntax. A pattern
//! that still fails to compile degrades to substring containment instead of
//! raising.

use regex::RegexBuilder;
use tracing::debug;

/// Attribute values longer than this are dropped from search records.
const MAX_ATTR_VALUE_LEN: usize = 500;

/// Attributes worth matching against; everything else is noise.
const SEARCHABLE_ATTRS: &[&str] = &[
    "id",
    "name",
    "type",
    "href",
    "src",
    "alt",
    "title",
    "placeholder",
    "value",
    "role",
    "data-testid",
    "aria-label",
];

#[derive(Debug, Clone)]
pub struct GrepOptions {
    pub pattern: String,
    pub ignore_case: bool,
    pub invert: bool,
    pub fixed_strings: bool,
}

impl GrepOptions {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore_case: true,
            invert: false,
            fixed_strings: false,
        }
    }
}

impl From<&str> for GrepOptions {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Result of a grep pass over a set of items.
#[derive(Debug, Clone)]
pub struct GrepOutcome<T> {
    pub items: Vec<T>,
    pub pattern: String,
    pub match_count: usize,
    pub total_count: usize,
}

enum Matcher {
    Regex(regex::Regex),
    Substring { needle: String, ignore_case: bool },
}

impl Matcher {
    fn compile(opts: &GrepOptions) -> Self {
        let source = if opts.fixed_strings {
            regex::escape(&opts.pattern)
        } else {
            rewrite_wildcards(&opts.pattern)
        };
        match RegexBuilder::new(&source)
            .case_insensitive(opts.ignore_case)
            .build()
        {
            Ok(re) => Matcher::Regex(re),
            Err(err) => {
                debug!(pattern = %opts.pattern, %err, "pattern failed to compile, using substring match");
                Matcher::Substring {
                    needle: if opts.ignore_case {
                        opts.pattern.to_lowercase()
                    } else {
                        opts.pattern.clone()
                    },
                    ignore_case: opts.ignore_case,
                }
            }
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Regex(re) => re.is_match(text),
            Matcher::Substring {
                needle,
                ignore_case,
            } => {
                if *ignore_case {
                    text.to_lowercase().contains(needle)
                } else {
                    text.contains(needle)
                }
            }
        }
    }
}

/// Rewrite bare glob-style `*` to `.*`, leaving a pre-existing `.*` alone.
fn rewrite_wildcards(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut prev: Option<char> = None;
    for ch in pattern.chars() {
        if ch == '*' && prev != Some('.') {
            out.push_str(".*");
        } else {
            out.push(ch);
        }
        prev = Some(ch);
    }
    out
}

/// Whether a single text matches the pattern (invert applied).
pub fn matches(text: &str, opts: &GrepOptions) -> bool {
    let hit = Matcher::compile(opts).is_match(text);
    hit != opts.invert
}

/// Filter items by running the pattern against `extract(item)`.
pub fn grep<T, F>(items: Vec<T>, opts: &GrepOptions, extract: F) -> GrepOutcome<T>
where
    F: Fn(&T) -> String,
{
    let matcher = Matcher::compile(opts);
    let total_count = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| matcher.is_match(&extract(item)) != opts.invert)
        .collect();
    let match_count = kept.len();
    GrepOutcome {
        items: kept,
        pattern: opts.pattern.clone(),
        match_count,
        total_count,
    }
}

/// Everything searchable about one element, built untruncated during a walk
/// so filtering never misses a match that display truncation would hide.
#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub role: String,
    pub name: String,
    pub full_text: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub xpath: String,
}

impl SearchRecord {
    pub fn from_element(
        el: scraper::ElementRef,
        role: &str,
        name: &str,
        full_text: &str,
        xpath: &str,
    ) -> Self {
        let e = el.value();
        let classes = e.classes().map(str::to_string).collect();
        let attributes = SEARCHABLE_ATTRS
            .iter()
            .filter_map(|&key| {
                e.attr(key)
                    .filter(|v| v.len() <= MAX_ATTR_VALUE_LEN)
                    .map(|v| (key.to_string(), v.to_string()))
            })
            .collect();
        Self {
            role: role.to_string(),
            name: name.to_string(),
            full_text: full_text.to_string(),
            classes,
            attributes,
            xpath: xpath.to_string(),
        }
    }

    /// One search string per element: role, name, full text, classes,
    /// `key=value` attribute pairs, xpath.
    pub fn haystack(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.role);
        out.push(' ');
        out.push_str(&self.name);
        out.push(' ');
        out.push_str(&self.full_text);
        for class in &self.classes {
            out.push(' ');
            out.push_str(class);
        }
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out.push(' ');
        out.push_str(&self.xpath);
        out
    }
}

/// Element-level grep: match against the full per-element record rather than
/// the trimmed display line.
pub fn grep_elements<T, F>(items: Vec<T>, opts: &GrepOptions, record_of: F) -> GrepOutcome<T>
where
    F: Fn(&T) -> &SearchRecord,
{
    grep(items, opts, |item| record_of(item).haystack())
}
