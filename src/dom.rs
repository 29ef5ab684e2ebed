//! ARIA role and accessible-name resolution plus the visibility and
//! interactivity classifiers.
//!
//! All functions here are pure lookups over the parsed document; the walkers
//! in `walk`, `outline` and `content` decide what to do with the answers.

use std::fmt;

use scraper::{ElementRef, Html};

/// Resolved ARIA role for an element.
///
/// `Custom` carries an explicit `role` attribute value that has no dedicated
/// variant - an author-supplied role always wins outright, recognized or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Button,
    Link,
    TextBox,
    SearchBox,
    Checkbox,
    Radio,
    ComboBox,
    ListBox,
    Option,
    MenuItem,
    Menu,
    Slider,
    SpinButton,
    Switch,
    Tab,
    Heading { level: u8 },
    Navigation,
    Banner,
    ContentInfo,
    Main,
    Complementary,
    Region,
    Search,
    Form,
    List,
    ListItem,
    Table,
    Row,
    Cell,
    ColumnHeader,
    Dialog,
    Article,
    Img,
    Custom(String),
}

impl Role {
    /// Landmark roles used by the outline and content walkers.
    pub fn is_landmark(&self) -> bool {
        matches!(
            self,
            Role::Navigation
                | Role::Banner
                | Role::ContentInfo
                | Role::Main
                | Role::Complementary
                | Role::Region
                | Role::Search
                | Role::Form
        )
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Role::Heading { .. })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Heading { level } => write!(f, "heading level={level}"),
            Role::TextBox => write!(f, "textbox"),
            Role::SearchBox => write!(f, "searchbox"),
            Role::ComboBox => write!(f, "combobox"),
            Role::ListBox => write!(f, "listbox"),
            Role::MenuItem => write!(f, "menuitem"),
            Role::SpinButton => write!(f, "spinbutton"),
            Role::ContentInfo => write!(f, "contentinfo"),
            Role::ListItem => write!(f, "listitem"),
            Role::ColumnHeader => write!(f, "columnheader"),
            Role::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

/// Which interactivity engine a walk uses.
///
/// `Strict` admits only the fixed role set. `Relaxed` additionally treats
/// `onclick`, `tabindex` and `contenteditable` as interactivity signals,
/// catching div-soup widgets that never declare a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interactivity {
    #[default]
    Strict,
    Relaxed,
}

/// Resolve the ARIA role of an element, or `None` when it carries no
/// agent-relevant semantics (such elements are dropped outside `all` mode).
pub fn role_of(el: ElementRef) -> Option<Role> {
    let e = el.value();
    if let Some(explicit) = e.attr("role") {
        // First token wins when the attribute lists fallback roles.
        if let Some(token) = explicit.split_whitespace().next() {
            return Some(parse_explicit_role(token, el));
        }
    }

    let tag = e.name();
    if let Some(level) = heading_level(tag) {
        return Some(Role::Heading { level });
    }

    match tag {
        "button" => Some(Role::Button),
        "a" => e.attr("href").map(|_| Role::Link),
        "input" => Some(input_role(e.attr("type"))),
        "textarea" => Some(Role::TextBox),
        "select" => Some(if e.attr("multiple").is_some() {
            Role::ListBox
        } else {
            Role::ComboBox
        }),
        "option" => Some(Role::Option),
        "nav" => Some(Role::Navigation),
        "header" => (!inside_sectioning_content(el)).then_some(Role::Banner),
        "footer" => (!inside_sectioning_content(el)).then_some(Role::ContentInfo),
        "main" => Some(Role::Main),
        "aside" => Some(Role::Complementary),
        "article" => Some(Role::Article),
        "form" => Some(Role::Form),
        "ul" | "ol" => Some(Role::List),
        "li" => Some(Role::ListItem),
        "table" => Some(Role::Table),
        "tr" => Some(Role::Row),
        "td" => Some(Role::Cell),
        "th" => Some(Role::ColumnHeader),
        "dialog" => Some(Role::Dialog),
        "img" => Some(Role::Img),
        _ => None,
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn input_role(input_type: Option<&str>) -> Role {
    match input_type.unwrap_or("text") {
        "button" | "submit" | "reset" => Role::Button,
        "checkbox" => Role::Checkbox,
        "radio" => Role::Radio,
        "range" => Role::Slider,
        "number" => Role::SpinButton,
        "search" => Role::SearchBox,
        // email/tel/url/text/password and anything exotic degrade to textbox.
        _ => Role::TextBox,
    }
}

fn parse_explicit_role(token: &str, el: ElementRef) -> Role {
    match token {
        "button" => Role::Button,
        "link" => Role::Link,
        "textbox" => Role::TextBox,
        "searchbox" => Role::SearchBox,
        "checkbox" => Role::Checkbox,
        "radio" => Role::Radio,
        "combobox" => Role::ComboBox,
        "listbox" => Role::ListBox,
        "option" => Role::Option,
        "menuitem" | "menuitemcheckbox" | "menuitemradio" => Role::MenuItem,
        "menu" => Role::Menu,
        "slider" => Role::Slider,
        "spinbutton" => Role::SpinButton,
        "switch" => Role::Switch,
        "tab" => Role::Tab,
        "heading" => {
            let level = el
                .value()
                .attr("aria-level")
                .and_then(|l| l.parse().ok())
                .unwrap_or(2);
            Role::Heading { level }
        }
        "navigation" => Role::Navigation,
        "banner" => Role::Banner,
        "contentinfo" => Role::ContentInfo,
        "main" => Role::Main,
        "complementary" => Role::Complementary,
        "region" => Role::Region,
        "search" => Role::Search,
        "form" => Role::Form,
        "list" => Role::List,
        "listitem" => Role::ListItem,
        "table" | "grid" => Role::Table,
        "row" => Role::Row,
        "cell" | "gridcell" => Role::Cell,
        "columnheader" => Role::ColumnHeader,
        "dialog" | "alertdialog" => Role::Dialog,
        "article" => Role::Article,
        "img" | "image" => Role::Img,
        other => Role::Custom(other.to_string()),
    }
}

/// `<header>`/`<footer>` only map to banner/contentinfo at the top level;
/// nested inside sectioning content they are plain structure.
fn inside_sectioning_content(el: ElementRef) -> bool {
    el.ancestors().filter_map(ElementRef::wrap).any(|a| {
        matches!(
            a.value().name(),
            "article" | "aside" | "main" | "nav" | "section"
        )
    })
}

/// Interactive role set of the strict engine.
pub fn is_interactive(role: &Role) -> bool {
    matches!(
        role,
        Role::Button
            | Role::Link
            | Role::TextBox
            | Role::SearchBox
            | Role::Checkbox
            | Role::Radio
            | Role::ComboBox
            | Role::ListBox
            | Role::MenuItem
            | Role::Option
            | Role::Slider
            | Role::SpinButton
            | Role::Switch
            | Role::Tab
    )
}

/// Relaxed engine: role set plus click/focus/edit signals on the element.
pub fn is_interactive_relaxed(el: ElementRef, role: Option<&Role>) -> bool {
    if role.is_some_and(is_interactive) {
        return true;
    }
    let e = el.value();
    if e.name() == "a" && e.attr("href").is_none() {
        // An anchor without href is never interactive, signals or not.
        return false;
    }
    e.attr("onclick").is_some()
        || e.attr("tabindex").is_some()
        || e.attr("contenteditable").is_some_and(|v| v != "false")
}

pub fn element_is_interactive(el: ElementRef, role: Option<&Role>, engine: Interactivity) -> bool {
    match engine {
        Interactivity::Strict => role.is_some_and(is_interactive),
        Interactivity::Relaxed => is_interactive_relaxed(el, role),
    }
}

/// Visibility check over static HTML: inline style stands in for computed
/// style, plus the `hidden` attribute and `aria-hidden`.
pub fn is_visible(el: ElementRef) -> bool {
    let e = el.value();
    if e.attr("hidden").is_some() {
        return false;
    }
    if e.attr("aria-hidden") == Some("true") {
        return false;
    }
    if e.name() == "input" && e.attr("type") == Some("hidden") {
        return false;
    }
    if let Some(style) = e.attr("style") {
        for decl in style.split(';') {
            let mut parts = decl.splitn(2, ':');
            let (Some(prop), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();
            match prop.as_str() {
                "display" if value == "none" => return false,
                "visibility" if value == "hidden" => return false,
                "opacity" if value == "0" || value == "0.0" => return false,
                _ => {}
            }
        }
    }
    true
}

/// Full text content with whitespace runs collapsed to single spaces.
pub fn normalized_text(el: ElementRef) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    collapse_ws(&joined)
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute the accessible name of an element following the resolution order:
/// aria-label, aria-labelledby, then a type-specific strategy, then the
/// generic text/title fallback. Always returns a string; empty means unnamed.
pub fn name_of(doc: &Html, el: ElementRef) -> String {
    let e = el.value();

    if let Some(label) = e.attr("aria-label") {
        let label = label.trim();
        if !label.is_empty() {
            return label.to_string();
        }
    }

    if let Some(ids) = e.attr("aria-labelledby") {
        let joined = ids
            .split_whitespace()
            .filter_map(|id| element_by_id(doc, id))
            .map(normalized_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return joined;
        }
    }

    let tag = e.name();
    let type_specific = match tag {
        "button" => first_non_empty(&[normalized_text(el), attr_trimmed(el, "value")]),
        "input" if matches!(e.attr("type"), Some("submit" | "reset" | "button")) => {
            first_non_empty(&[
                attr_trimmed(el, "value"),
                default_submit_label(e.attr("type")),
            ])
        }
        "a" => first_non_empty(&[
            normalized_text(el),
            attr_trimmed(el, "title"),
            e.attr("href").map(humanize_url_segment).unwrap_or_default(),
        ]),
        "input" | "textarea" | "select" => first_non_empty(&[
            label_for(doc, el),
            enclosing_label(el),
            attr_trimmed(el, "placeholder"),
            attr_trimmed(el, "title"),
        ]),
        "img" => first_non_empty(&[
            attr_trimmed(el, "alt"),
            attr_trimmed(el, "title"),
            e.attr("src").map(humanize_url_segment).unwrap_or_default(),
        ]),
        _ => String::new(),
    };
    if !type_specific.is_empty() {
        return type_specific;
    }

    first_non_empty(&[normalized_text(el), attr_trimmed(el, "title")])
}

fn first_non_empty(candidates: &[String]) -> String {
    candidates
        .iter()
        .find(|c| !c.is_empty())
        .cloned()
        .unwrap_or_default()
}

fn attr_trimmed(el: ElementRef, name: &str) -> String {
    el.value()
        .attr(name)
        .map(|v| collapse_ws(v.trim()))
        .unwrap_or_default()
}

fn default_submit_label(input_type: Option<&str>) -> String {
    match input_type {
        Some("submit") => "Submit".to_string(),
        Some("reset") => "Reset".to_string(),
        _ => String::new(),
    }
}

/// Find an element anywhere in the document by its id attribute.
pub fn element_by_id<'a>(doc: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    doc.tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().attr("id") == Some(id))
}

/// Text of a `<label for="...">` pointing at this element.
fn label_for(doc: &Html, el: ElementRef) -> String {
    let Some(id) = el.value().attr("id") else {
        return String::new();
    };
    doc.tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|l| l.value().name() == "label" && l.value().attr("for") == Some(id))
        .map(label_text_without_controls)
        .unwrap_or_default()
}

/// Text of an enclosing `<label>`, ignoring nested form-control text.
fn enclosing_label(el: ElementRef) -> String {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "label")
        .map(label_text_without_controls)
        .unwrap_or_default()
}

fn label_text_without_controls(label: ElementRef) -> String {
    let mut parts = Vec::new();
    collect_text_skipping_controls(label, &mut parts);
    collapse_ws(&parts.join(" "))
}

fn collect_text_skipping_controls(el: ElementRef, parts: &mut Vec<String>) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !matches!(
                child_el.value().name(),
                "input" | "select" | "textarea" | "button"
            ) {
                collect_text_skipping_controls(child_el, parts);
            }
        } else if let scraper::Node::Text(text) = child.value() {
            parts.push(text.trim().to_string());
        }
    }
}

/// Turn the last path segment of a URL into readable text:
/// `/docs/getting-started.html` becomes `getting started`.
pub fn humanize_url_segment(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let stem = match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 5 => stem,
        _ => segment,
    };
    collapse_ws(&stem.replace(['-', '_', '+'], " "))
}
