//! The interactive walker: a depth-first pass that collects actionable
//! elements into flat display lines, minting refs and building the search
//! records the grep step filters on.

use scraper::{ElementRef, Html};
use serde::Serialize;
use tracing::debug;

use crate::dom::{self, Interactivity, Role};
use crate::grep::SearchRecord;
use crate::locator;
use crate::refs::RefMap;

/// Tags whose subtrees carry nothing an agent can act on or read.
pub(crate) const PRUNED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "object", "embed", "head", "meta",
    "link",
];

/// Display names longer than this are truncated in output lines; search
/// records always keep the full text.
const MAX_DISPLAY_NAME: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Best-effort layout access. The static-HTML backend has no layout, so the
/// default probe yields nothing and captured records degrade to
/// selector-only; a live-browser backend can supply real geometry.
pub trait LayoutProbe {
    fn bounding_box(&self, el: ElementRef) -> Option<BBox>;
}

/// Probe for layout-less documents.
#[derive(Debug, Default)]
pub struct NoLayout;

impl LayoutProbe for NoLayout {
    fn bounding_box(&self, _el: ElementRef) -> Option<BBox> {
        None
    }
}

/// Locator metadata published for each minted token.
#[derive(Debug, Clone, Serialize)]
pub struct RefEntry {
    pub selector: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_viewport: Option<bool>,
}

/// One element kept by the walk: its display line, its untruncated search
/// record, and the ref entry when the element is interactive.
#[derive(Debug, Clone)]
pub struct Captured {
    pub line: String,
    pub record: SearchRecord,
    pub token: Option<String>,
    pub entry: Option<RefEntry>,
}

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub max_depth: usize,
    pub include_hidden: bool,
    pub engine: Interactivity,
    /// Capture every role-bearing element, not just interactive ones.
    pub show_all: bool,
    pub viewport: Viewport,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            include_hidden: false,
            engine: Interactivity::Strict,
            show_all: false,
            viewport: Viewport::default(),
        }
    }
}

/// Outcome of an interactive walk, before grep filtering.
#[derive(Debug, Default)]
pub struct InteractiveWalk {
    pub captured: Vec<Captured>,
    pub elements_seen: usize,
    pub total_interactive: usize,
}

pub fn walk_interactive(
    doc: &Html,
    root: Option<ElementRef>,
    refs: &mut RefMap,
    opts: &WalkOptions,
    probe: &dyn LayoutProbe,
) -> InteractiveWalk {
    let mut walk = InteractiveWalk::default();
    if let Some(start) = root.or_else(|| body_element(doc)) {
        visit(doc, start, 0, refs, opts, probe, &mut walk);
    }
    debug!(
        seen = walk.elements_seen,
        interactive = walk.total_interactive,
        captured = walk.captured.len(),
        "interactive walk complete"
    );
    walk
}

pub(crate) fn body_element(doc: &Html) -> Option<ElementRef<'_>> {
    doc.tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
}

fn visit(
    doc: &Html,
    el: ElementRef,
    depth: usize,
    refs: &mut RefMap,
    opts: &WalkOptions,
    probe: &dyn LayoutProbe,
    walk: &mut InteractiveWalk,
) {
    if depth > opts.max_depth {
        return;
    }
    let tag = el.value().name();
    if PRUNED_TAGS.contains(&tag) {
        return;
    }
    if !opts.include_hidden && !dom::is_visible(el) {
        return;
    }

    walk.elements_seen += 1;

    let role = dom::role_of(el);
    let interactive = dom::element_is_interactive(el, role.as_ref(), opts.engine);
    if interactive {
        walk.total_interactive += 1;
    }

    if interactive || (opts.show_all && role.is_some()) {
        walk.captured
            .push(capture_element(doc, el, role.as_ref(), interactive, refs, opts, probe));
    }

    for child in el.children().filter_map(ElementRef::wrap) {
        visit(doc, child, depth + 1, refs, opts, probe, walk);
    }
}

fn capture_element(
    doc: &Html,
    el: ElementRef,
    role: Option<&Role>,
    interactive: bool,
    refs: &mut RefMap,
    opts: &WalkOptions,
    probe: &dyn LayoutProbe,
) -> Captured {
    let role_str = role
        .map(|r| r.to_string())
        // Relaxed-engine captures without a role read as generic widgets.
        .unwrap_or_else(|| "widget".to_string());
    let name = dom::name_of(doc, el);
    let full_text = dom::normalized_text(el);
    let xpath = locator::semantic_xpath(el);

    let (token, entry) = if interactive {
        let token = refs.generate(el.id());
        let bbox = probe.bounding_box(el);
        let in_viewport = bbox.map(|b| intersects_viewport(&b, &opts.viewport));
        let entry = RefEntry {
            selector: locator::css_selector(el),
            role: role_str.clone(),
            name: (!name.is_empty()).then(|| name.clone()),
            bbox,
            in_viewport,
        };
        (Some(token), Some(entry))
    } else {
        (None, None)
    };

    let line = format_line(el, &role_str, &name, token.as_deref(), &xpath);
    let record = SearchRecord::from_element(el, &role_str, &name, &full_text, &xpath);

    Captured {
        line,
        record,
        token,
        entry,
    }
}

fn intersects_viewport(bbox: &BBox, viewport: &Viewport) -> bool {
    bbox.x < viewport.width as f64
        && bbox.y < viewport.height as f64
        && bbox.x + bbox.width > 0.0
        && bbox.y + bbox.height > 0.0
}

/// `<ROLE> ["<name>"] <@ref:N> [input-attrs] [(state,...)] <xpath>`
fn format_line(el: ElementRef, role: &str, name: &str, token: Option<&str>, xpath: &str) -> String {
    let mut line = upper_role(role);

    if !name.is_empty() {
        line.push_str(&format!(" \"{}\"", truncate_display(name)));
    }
    if let Some(token) = token {
        line.push(' ');
        line.push_str(token);
    }

    for attr in input_attrs(el) {
        line.push_str(&format!(" [{attr}]"));
    }

    let states = state_annotations(el);
    if !states.is_empty() {
        line.push_str(&format!(" ({})", states.join(",")));
    }

    line.push(' ');
    line.push_str(xpath);
    line
}

/// Uppercase the role word, leaving qualifiers like `level=2` alone.
fn upper_role(role: &str) -> String {
    match role.split_once(' ') {
        Some((word, rest)) => format!("{} {rest}", word.to_uppercase()),
        None => role.to_uppercase(),
    }
}

fn truncate_display(name: &str) -> String {
    if name.len() <= MAX_DISPLAY_NAME {
        return name.to_string();
    }
    let mut end = MAX_DISPLAY_NAME - 3;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &name[..end])
}

fn input_attrs(el: ElementRef) -> Vec<String> {
    let e = el.value();
    let mut attrs = Vec::new();
    if matches!(e.name(), "input" | "textarea" | "select") {
        if let Some(t) = e.attr("type") {
            if t != "text" {
                attrs.push(format!("type={t}"));
            }
        }
        if let Some(v) = e.attr("value") {
            if !v.is_empty() && e.attr("type") != Some("password") {
                attrs.push(format!("value=\"{}\"", truncate_display(v)));
            }
        }
    }
    attrs
}

fn state_annotations(el: ElementRef) -> Vec<&'static str> {
    let e = el.value();
    let mut states = Vec::new();
    if e.attr("disabled").is_some() {
        states.push("disabled");
    }
    if e.attr("checked").is_some() {
        states.push("checked");
    }
    if e.attr("aria-expanded") == Some("true") {
        states.push("expanded");
    }
    if e.attr("aria-selected") == Some("true") {
        states.push("selected");
    }
    states
}

/// Page-level warnings computed from walk stats and page context.
pub fn page_warnings(url: &str, viewport: &Viewport, walk: &InteractiveWalk) -> Vec<String> {
    let mut warnings = Vec::new();

    if viewport.area() == 0 {
        warnings.push("viewport has zero area; layout-dependent data is unreliable".to_string());
    }

    if walk.elements_seen < 10 && walk.total_interactive == 0 {
        warnings.push(format!(
            "page looks empty ({} elements, no interactive controls); it may still be loading",
            walk.elements_seen
        ));
    }

    let lower = url.to_lowercase();
    if ["redirect", "interstitial", "challenge", "continue=", "return_to=", "returnurl="]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        warnings.push("url looks like an intermediate or redirect page".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(html: &str) -> (InteractiveWalk, RefMap) {
        let doc = Html::parse_document(html);
        let mut refs = RefMap::new();
        let walk = walk_interactive(&doc, None, &mut refs, &WalkOptions::default(), &NoLayout);
        (walk, refs)
    }

    #[test]
    fn captures_interactive_only_by_default() {
        let (walk, refs) = walk(
            r#"<body><h1>Title</h1><button>Go</button><p>text</p><a href="/x">Link</a></body>"#,
        );
        assert_eq!(walk.captured.len(), 2);
        assert_eq!(walk.total_interactive, 2);
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn line_format_for_button() {
        let (walk, _) = walk(r#"<body><button id="btn">Submit</button></body>"#);
        assert_eq!(walk.captured[0].line, "BUTTON \"Submit\" @ref:0 /body/button");
        let entry = walk.captured[0].entry.as_ref().unwrap();
        assert_eq!(entry.selector, "#btn");
        assert_eq!(entry.role, "button");
    }

    #[test]
    fn hidden_subtree_pruned() {
        let (walk, _) = walk(
            r#"<body><div style="display:none"><button>Ghost</button></div><button>Real</button></body>"#,
        );
        assert_eq!(walk.captured.len(), 1);
        assert!(walk.captured[0].line.contains("Real"));
    }

    #[test]
    fn include_hidden_keeps_subtree() {
        let doc = Html::parse_document(
            r#"<body><div style="display:none"><button>Ghost</button></div></body>"#,
        );
        let mut refs = RefMap::new();
        let opts = WalkOptions {
            include_hidden: true,
            ..Default::default()
        };
        let walk = walk_interactive(&doc, None, &mut refs, &opts, &NoLayout);
        assert_eq!(walk.captured.len(), 1);
    }

    #[test]
    fn state_annotations_appended() {
        let (walk, _) = walk(
            r#"<body>
            <button disabled>Off</button>
            <input type="checkbox" checked>
            <button aria-expanded="true">Menu</button>
        </body>"#,
        );
        assert!(walk.captured[0].line.contains("(disabled)"));
        assert!(walk.captured[1].line.contains("(checked)"));
        assert!(walk.captured[2].line.contains("(expanded)"));
    }

    #[test]
    fn input_type_shown() {
        let (walk, _) = walk(r#"<body><input type="email" placeholder="Email"></body>"#);
        assert!(walk.captured[0].line.contains("[type=email]"));
        assert!(walk.captured[0].line.starts_with("TEXTBOX \"Email\""));
    }

    #[test]
    fn show_all_includes_headings() {
        let doc = Html::parse_document("<body><h1>Title</h1><button>Go</button></body>");
        let mut refs = RefMap::new();
        let opts = WalkOptions {
            show_all: true,
            ..Default::default()
        };
        let walk = walk_interactive(&doc, None, &mut refs, &opts, &NoLayout);
        assert_eq!(walk.captured.len(), 2);
        assert!(walk.captured[0].line.starts_with("HEADING level=1 \"Title\""));
        assert!(walk.captured[0].token.is_none(), "headings get no ref");
        // Only the button minted a ref.
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn relaxed_engine_captures_onclick_div() {
        let doc = Html::parse_document(r#"<body><div onclick="go()">tap</div></body>"#);
        let mut refs = RefMap::new();
        let opts = WalkOptions {
            engine: Interactivity::Relaxed,
            ..Default::default()
        };
        let walk = walk_interactive(&doc, None, &mut refs, &opts, &NoLayout);
        assert_eq!(walk.captured.len(), 1);
        assert!(walk.captured[0].line.starts_with("WIDGET \"tap\""));
    }

    #[test]
    fn script_subtrees_skipped() {
        let (walk, _) = walk("<body><script>var x = 'button';</script><button>Go</button></body>");
        assert_eq!(walk.captured.len(), 1);
    }

    #[test]
    fn max_depth_bounds_descent() {
        let doc = Html::parse_document(
            "<body><div><div><div><button>Deep</button></div></div></div></body>",
        );
        let mut refs = RefMap::new();
        let opts = WalkOptions {
            max_depth: 2,
            ..Default::default()
        };
        let walk = walk_interactive(&doc, None, &mut refs, &opts, &NoLayout);
        assert!(walk.captured.is_empty());
    }

    #[test]
    fn bbox_from_probe_feeds_ref_entry() {
        struct FixedProbe;
        impl LayoutProbe for FixedProbe {
            fn bounding_box(&self, _el: ElementRef) -> Option<BBox> {
                Some(BBox {
                    x: 10.0,
                    y: 20.0,
                    width: 100.0,
                    height: 30.0,
                })
            }
        }
        let doc = Html::parse_document("<body><button>Go</button></body>");
        let mut refs = RefMap::new();
        let walk = walk_interactive(&doc, None, &mut refs, &WalkOptions::default(), &FixedProbe);
        let entry = walk.captured[0].entry.as_ref().unwrap();
        assert!(entry.bbox.is_some());
        assert_eq!(entry.in_viewport, Some(true));
    }

    #[test]
    fn no_layout_degrades_to_selector_only() {
        let (walk, _) = walk("<body><button>Go</button></body>");
        let entry = walk.captured[0].entry.as_ref().unwrap();
        assert!(entry.bbox.is_none());
        assert!(entry.in_viewport.is_none());
        assert!(!entry.selector.is_empty());
    }

    #[test]
    fn warnings_for_zero_viewport_and_empty_page() {
        let (walk, _) = walk("<body><p>bare</p></body>");
        let warnings = page_warnings(
            "https://x.test/",
            &Viewport {
                width: 0,
                height: 0,
            },
            &walk,
        );
        assert!(warnings.iter().any(|w| w.contains("zero area")));
        assert!(warnings.iter().any(|w| w.contains("looks empty")));
    }

    #[test]
    fn warning_for_redirect_url() {
        let (walk, _) = walk(r#"<body><a href="/x">x</a></body>"#);
        let warnings = page_warnings(
            "https://auth.example.com/redirect?continue=https://app",
            &Viewport::default(),
            &walk,
        );
        assert!(warnings.iter().any(|w| w.contains("redirect")));
    }
}
