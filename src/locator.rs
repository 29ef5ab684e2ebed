//! Deterministic element locators: a CSS selector for re-location and a
//! compact "semantic xpath" for grouping and filtering.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

/// Maximum structural segments in a generated CSS selector.
const MAX_CSS_SEGMENTS: usize = 4;
/// Maximum kept segments in a semantic xpath.
const MAX_XPATH_SEGMENTS: usize = 6;
/// Class names longer than this are never used in selectors.
const MAX_CLASS_LEN: usize = 29;

/// Tags that always earn a semantic-xpath segment.
const SEMANTIC_TAGS: &[&str] = &[
    "main", "nav", "header", "footer", "article", "section", "aside", "form", "table", "ul", "ol",
    "li", "dialog", "menu", "h1", "h2", "h3", "h4", "h5", "h6", "a", "button", "input", "select",
    "textarea", "label", "figure", "figcaption", "details", "summary",
];

// Tailwind-style atomic prefixes and bare layout utilities; these say nothing
// about what an element is, so they never qualify a segment.
static UTILITY_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[mp][trblxy]?-|w-|h-|min-|max-|gap-|space-|text-|bg-|font-|leading-|tracking-|border|rounded|shadow|flex|grid|inline|block|hidden$|relative$|absolute$|fixed$|sticky$|items-|justify-|self-|z-|top-|bottom-|left-|right-|inset-|overflow-|transition|duration-|opacity-|sr-only|sm:|md:|lg:|xl:|2xl:|hover:|focus:)",
    )
    .expect("utility class pattern")
});

static NAV_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(nav|menu|navbar|sidebar|topbar|toolbar|breadcrumb|drawer|header|footer)")
        .expect("nav class pattern")
});

static COMPONENT_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(btn|button|card|list|item|form|field|input|search|modal|dialog|dropdown|tabs?$|chip|badge|accordion|carousel|pagination)",
    )
    .expect("component class pattern")
});

static STATE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^(is|has)-|active|selected|current|open$|expanded|collapsed|disabled)")
        .expect("state class pattern")
});

static LAYOUT_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(container|wrapper|content|main|page|section|panel|app|root|layout|hero)([-_][a-z0-9-_]*)?$")
        .expect("layout class pattern")
});

/// Whether a class name is meaningful enough to appear in a semantic xpath.
pub fn is_semantic_class(class: &str) -> bool {
    if class.len() < 2 || class.len() > MAX_CLASS_LEN || UTILITY_CLASS.is_match(class) {
        return false;
    }
    NAV_LIKE.is_match(class)
        || COMPONENT_LIKE.is_match(class)
        || STATE_LIKE.is_match(class)
        || LAYOUT_LIKE.is_match(class)
}

/// Generate a CSS selector for an element: id, then `data-testid`, then a
/// structural path of at most four segments ending at (not including) body.
pub fn css_selector(el: ElementRef) -> String {
    let e = el.value();

    if let Some(id) = e.attr("id") {
        if !id.is_empty() {
            return if is_safe_ident(id) {
                format!("#{id}")
            } else {
                format!("[id=\"{}\"]", escape_attr_value(id))
            };
        }
    }

    if let Some(testid) = e.attr("data-testid") {
        if !testid.is_empty() {
            return format!("[data-testid=\"{}\"]", escape_attr_value(testid));
        }
    }

    structural_selector(el).unwrap_or_else(|| simple_selector(el))
}

fn structural_selector(el: ElementRef) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = Some(el);

    while let Some(node) = current {
        let tag = node.value().name();
        if tag == "body" || tag == "html" {
            break;
        }
        if segments.len() == MAX_CSS_SEGMENTS {
            break;
        }

        let mut segment = tag.to_ascii_lowercase();
        for class in node
            .value()
            .classes()
            .filter(|c| is_safe_class(c))
            .take(2)
        {
            segment.push('.');
            segment.push_str(class);
        }
        let (index, has_twins) = nth_of_type(node);
        if has_twins {
            segment.push_str(&format!(":nth-of-type({index})"));
        }
        segments.push(segment);

        current = node.parent().and_then(ElementRef::wrap);
    }

    if segments.is_empty() {
        return None;
    }
    segments.reverse();
    Some(segments.join(" > "))
}

/// Bare tag plus nth-of-type, used when the structural builder has nothing.
fn simple_selector(el: ElementRef) -> String {
    let tag = el.value().name().to_ascii_lowercase();
    let (index, has_twins) = nth_of_type(el);
    if has_twins {
        format!("{tag}:nth-of-type({index})")
    } else {
        tag
    }
}

/// Position among same-tag element siblings (1-based) and whether any other
/// same-tag siblings exist.
fn nth_of_type(el: ElementRef) -> (usize, bool) {
    let tag = el.value().name();
    let Some(parent) = el.parent() else {
        return (1, false);
    };
    let mut index = 1;
    let mut total = 0;
    for sibling in parent.children() {
        if let Some(s) = ElementRef::wrap(sibling) {
            if s.value().name() == tag {
                total += 1;
                if s.id() == el.id() {
                    index = total;
                }
            }
        }
    }
    (index, total > 1)
}

/// Generate the semantic xpath: `/body` plus up to six kept segments, where a
/// segment survives only for semantic tags or elements with an id or a
/// recognized semantic class.
pub fn semantic_xpath(el: ElementRef) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = Some(el);
    let mut is_target = true;

    while let Some(node) = current {
        let tag = node.value().name();
        if tag == "body" || tag == "html" {
            break;
        }

        if let Some(segment) = xpath_segment(node, is_target) {
            // Deepest segments win when the path is longer than the cap.
            if segments.len() < MAX_XPATH_SEGMENTS {
                segments.push(segment);
            }
        }
        is_target = false;
        current = node.parent().and_then(ElementRef::wrap);
    }

    if segments.is_empty() {
        return format!("/body/{}", el.value().name().to_ascii_lowercase());
    }
    segments.reverse();
    format!("/body/{}", segments.join("/"))
}

/// The target element's own segment stays a bare tag; only ancestor segments
/// carry `#id`/`.class` decoration.
fn xpath_segment(el: ElementRef, is_target: bool) -> Option<String> {
    let e = el.value();
    let tag = e.name();
    let id = e.attr("id").filter(|i| !i.is_empty());
    let semantic_class = e.classes().find(|c| is_semantic_class(c));

    if !SEMANTIC_TAGS.contains(&tag) && id.is_none() && semantic_class.is_none() {
        return None;
    }

    let mut segment = tag.to_ascii_lowercase();
    if !is_target {
        if let Some(id) = id {
            segment.push('#');
            segment.push_str(id);
        } else if let Some(class) = semantic_class {
            segment.push('.');
            segment.push_str(class);
        }
    }

    let (index, has_twins) = nth_of_type(el);
    if has_twins {
        segment.push_str(&format!("[{index}]"));
    }
    Some(segment)
}

fn is_safe_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_safe_class(class: &str) -> bool {
    !class.is_empty() && class.len() <= MAX_CLASS_LEN && is_safe_ident(class)
}

fn escape_attr_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
