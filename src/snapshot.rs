//! The snapshot façade: one entry point that runs the requested walker,
//! applies the grep filter, frames the output with the page header and
//! publishes the ref table plus quality metadata.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::info;

use crate::content;
use crate::dom::{self, Interactivity};
use crate::grep::{self, GrepOptions};
use crate::outline;
use crate::refs::RefMap;
use crate::walk::{self, LayoutProbe, NoLayout, RefEntry, Viewport, WalkOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Interactive,
    Outline,
    Content,
    Head,
    Structure,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Text,
    Markdown,
    Html,
}

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub mode: Mode,
    pub format: SnapshotFormat,
    pub grep: Option<GrepOptions>,
    pub max_depth: usize,
    pub include_hidden: bool,
    pub engine: Interactivity,
    /// Restrict the walk to the first element matching this CSS selector.
    pub root_selector: Option<String>,
    pub viewport: Viewport,
    pub include_images: bool,
    pub url: String,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Interactive,
            format: SnapshotFormat::Text,
            grep: None,
            max_depth: 32,
            include_hidden: false,
            engine: Interactivity::Strict,
            root_selector: None,
            viewport: Viewport::default(),
            include_images: false,
            url: "about:blank".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Medium,
    Low,
}

#[derive(Debug, Serialize)]
pub struct SnapshotMetadata {
    pub total_interactive_elements: usize,
    pub captured_elements: usize,
    pub quality: Quality,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResult {
    pub tree: String,
    pub refs: BTreeMap<String, RefEntry>,
    pub metadata: SnapshotMetadata,
}

pub fn snapshot(doc: &Html, refs: &mut RefMap, opts: &SnapshotOptions) -> SnapshotResult {
    snapshot_with_probe(doc, refs, opts, &NoLayout)
}

/// Take a snapshot. User-facing problems (bad root selector, empty page,
/// unfilterable pattern) surface in the tree text and warnings, never as an
/// error.
pub fn snapshot_with_probe(
    doc: &Html,
    refs: &mut RefMap,
    opts: &SnapshotOptions,
    probe: &dyn LayoutProbe,
) -> SnapshotResult {
    refs.clear();

    if opts.format == SnapshotFormat::Html {
        return html_snapshot(doc, opts);
    }

    let root = match resolve_root(doc, opts) {
        Ok(root) => root,
        Err(message) => {
            return SnapshotResult {
                tree: message.clone(),
                refs: BTreeMap::new(),
                metadata: SnapshotMetadata {
                    total_interactive_elements: 0,
                    captured_elements: 0,
                    quality: Quality::Low,
                    warnings: vec![message],
                },
            };
        }
    };

    let result = match opts.mode {
        Mode::Interactive | Mode::All => interactive_snapshot(doc, root, refs, opts, probe),
        Mode::Outline | Mode::Structure => outline_snapshot(doc, root, opts),
        Mode::Content => content_snapshot(doc, root, opts),
        Mode::Head => head_snapshot(doc, opts),
    };
    info!(
        captured = result.metadata.captured_elements,
        refs = result.refs.len(),
        quality = ?result.metadata.quality,
        "snapshot complete"
    );
    result
}

/// A bad or unmatched root selector degrades to a descriptive tree.
fn resolve_root<'a>(doc: &'a Html, opts: &SnapshotOptions) -> Result<Option<ElementRef<'a>>, String> {
    let Some(input) = opts.root_selector.as_deref() else {
        return Ok(None);
    };
    let Ok(selector) = Selector::parse(input) else {
        return Err(format!("no element found for selector: {input}"));
    };
    match doc.select(&selector).next() {
        Some(el) => Ok(Some(el)),
        None => Err(format!("no element found for selector: {input}")),
    }
}

fn walk_options(opts: &SnapshotOptions) -> WalkOptions {
    WalkOptions {
        max_depth: opts.max_depth,
        include_hidden: opts.include_hidden,
        engine: opts.engine,
        show_all: opts.mode == Mode::All,
        viewport: opts.viewport,
    }
}

fn page_header(doc: &Html, opts: &SnapshotOptions) -> String {
    let title = document_title(doc);
    format!(
        "PAGE: {} | {} | viewport={}x{}",
        opts.url, title, opts.viewport.width, opts.viewport.height
    )
}

fn document_title(doc: &Html) -> String {
    doc.tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .map(dom::normalized_text)
        .unwrap_or_default()
}

fn interactive_snapshot(
    doc: &Html,
    root: Option<ElementRef>,
    refs: &mut RefMap,
    opts: &SnapshotOptions,
    probe: &dyn LayoutProbe,
) -> SnapshotResult {
    let walk = walk::walk_interactive(doc, root, refs, &walk_options(opts), probe);
    let total_interactive = walk.total_interactive;
    let elements = walk.captured.len();
    let minted = refs.len();
    let warnings = walk::page_warnings(&opts.url, &opts.viewport, &walk);

    // The ref table covers every minted token, even ones a grep filters from
    // the visible tree.
    let ref_table: BTreeMap<String, RefEntry> = walk
        .captured
        .iter()
        .filter_map(|c| Some((c.token.clone()?, c.entry.clone()?)))
        .collect();

    let mut stat = format!("SNAPSHOT: elements={elements} refs={minted}");
    let kept = match &opts.grep {
        Some(grep_opts) => {
            let outcome = grep::grep_elements(walk.captured, grep_opts, |c| &c.record);
            stat.push_str(&format!(
                " grep={} matches={}",
                outcome.pattern, outcome.match_count
            ));
            outcome.items
        }
        None => walk.captured,
    };

    // Count only ref-bearing captures, so `all` mode's extra role-bearing
    // lines never push the capture count past the interactive total.
    let captured = kept.iter().filter(|c| c.token.is_some()).count();
    let quality = quality_of(&opts.viewport, captured, total_interactive);

    let mut lines = vec![page_header(doc, opts), stat, String::new()];
    lines.extend(kept.into_iter().map(|c| c.line));

    SnapshotResult {
        tree: lines.join("\n"),
        refs: ref_table,
        metadata: SnapshotMetadata {
            total_interactive_elements: total_interactive,
            captured_elements: captured,
            quality,
            warnings,
        },
    }
}

fn quality_of(viewport: &Viewport, captured: usize, total_interactive: usize) -> Quality {
    if viewport.area() == 0 || captured == 0 {
        Quality::Low
    } else if captured * 2 < total_interactive {
        Quality::Medium
    } else {
        Quality::High
    }
}

fn outline_snapshot(doc: &Html, root: Option<ElementRef>, opts: &SnapshotOptions) -> SnapshotResult {
    let walk = outline::walk_outline(doc, root, &walk_options(opts));
    let mut stat = format!(
        "OUTLINE: landmarks={} headings={}",
        walk.landmarks, walk.headings
    );

    let kept = match &opts.grep {
        Some(grep_opts) => {
            let outcome = grep::grep(walk.lines, grep_opts, |line| line.clone());
            stat.push_str(&format!(
                " grep={} matches={}",
                outcome.pattern, outcome.match_count
            ));
            outcome.items
        }
        None => walk.lines,
    };

    let captured = kept.len();
    let mut lines = vec![page_header(doc, opts), stat, String::new()];
    lines.extend(kept);

    SnapshotResult {
        tree: lines.join("\n"),
        refs: BTreeMap::new(),
        metadata: SnapshotMetadata {
            total_interactive_elements: 0,
            captured_elements: captured,
            quality: viewport_quality(&opts.viewport),
            warnings: Vec::new(),
        },
    }
}

fn content_snapshot(doc: &Html, root: Option<ElementRef>, opts: &SnapshotOptions) -> SnapshotResult {
    let walk = content::walk_content(doc, root, &walk_options(opts));

    if opts.format == SnapshotFormat::Markdown {
        // Markdown output is a standalone document framed by its own
        // source/end comments, so the page header is skipped.
        let tree = content::render_markdown(&walk, &opts.url, opts.include_images);
        let captured = walk.sections.len();
        return SnapshotResult {
            tree,
            refs: BTreeMap::new(),
            metadata: SnapshotMetadata {
                total_interactive_elements: 0,
                captured_elements: captured,
                quality: viewport_quality(&opts.viewport),
                warnings: Vec::new(),
            },
        };
    }

    let mut stat = format!(
        "CONTENT: sections={} words={}",
        walk.sections.len(),
        walk.word_count
    );
    let captured = walk.sections.len();

    let kept = match &opts.grep {
        Some(grep_opts) => {
            let outcome = grep::grep(content::render_tree(&walk), grep_opts, |line| line.clone());
            stat.push_str(&format!(
                " grep={} matches={}",
                outcome.pattern, outcome.match_count
            ));
            outcome.items
        }
        None => content::render_tree(&walk),
    };

    let mut lines = vec![page_header(doc, opts), stat, String::new()];
    lines.extend(kept);

    SnapshotResult {
        tree: lines.join("\n"),
        refs: BTreeMap::new(),
        metadata: SnapshotMetadata {
            total_interactive_elements: 0,
            captured_elements: captured,
            quality: viewport_quality(&opts.viewport),
            warnings: Vec::new(),
        },
    }
}

/// Document metadata block: title, meta description, canonical link.
fn head_snapshot(doc: &Html, opts: &SnapshotOptions) -> SnapshotResult {
    let mut fields = Vec::new();
    let title = document_title(doc);
    if !title.is_empty() {
        fields.push(format!("TITLE \"{title}\""));
    }
    for el in doc.tree.root().descendants().filter_map(ElementRef::wrap) {
        let e = el.value();
        match e.name() {
            "meta" if e.attr("name") == Some("description") => {
                if let Some(content) = e.attr("content") {
                    fields.push(format!("DESCRIPTION \"{}\"", dom::collapse_ws(content)));
                }
            }
            "link" if e.attr("rel") == Some("canonical") => {
                if let Some(href) = e.attr("href") {
                    fields.push(format!("CANONICAL {href}"));
                }
            }
            _ => {}
        }
    }

    let captured = fields.len();
    let mut lines = vec![page_header(doc, opts), String::new()];
    lines.extend(fields);

    SnapshotResult {
        tree: lines.join("\n"),
        refs: BTreeMap::new(),
        metadata: SnapshotMetadata {
            total_interactive_elements: 0,
            captured_elements: captured,
            quality: viewport_quality(&opts.viewport),
            warnings: Vec::new(),
        },
    }
}

/// Raw markup pass-through. No walk runs, so no refs can exist.
fn html_snapshot(doc: &Html, opts: &SnapshotOptions) -> SnapshotResult {
    let tree = walk::body_element(doc)
        .map(|body| body.html())
        .unwrap_or_else(|| doc.html());
    SnapshotResult {
        tree,
        refs: BTreeMap::new(),
        metadata: SnapshotMetadata {
            total_interactive_elements: 0,
            captured_elements: 0,
            quality: viewport_quality(&opts.viewport),
            warnings: vec!["html format emits raw markup; no refs were generated".to_string()],
        },
    }
}

fn viewport_quality(viewport: &Viewport) -> Quality {
    if viewport.area() == 0 {
        Quality::Low
    } else {
        Quality::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(html: &str, opts: &SnapshotOptions) -> SnapshotResult {
        let doc = Html::parse_document(html);
        let mut refs = RefMap::new();
        snapshot(&doc, &mut refs, opts)
    }

    const LOGIN: &str = r#"<html><head><title>Login</title></head><body>
        <button id="submit-btn">Submit</button>
        <button>Cancel</button>
        <a href="/help">Help</a>
    </body></html>"#;

    #[test]
    fn header_and_stat_lines() {
        let opts = SnapshotOptions {
            url: "https://app.test/login".into(),
            ..Default::default()
        };
        let result = take(LOGIN, &opts);
        let mut lines = result.tree.lines();
        assert_eq!(
            lines.next(),
            Some("PAGE: https://app.test/login | Login | viewport=1280x720")
        );
        assert_eq!(lines.next(), Some("SNAPSHOT: elements=3 refs=3"));
        assert_eq!(lines.next(), Some(""));
        assert!(lines.next().unwrap().starts_with("BUTTON \"Submit\" @ref:0"));
    }

    #[test]
    fn grep_filters_tree_but_not_ref_table() {
        let opts = SnapshotOptions {
            grep: Some(GrepOptions::new("submit")),
            ..Default::default()
        };
        let result = take(LOGIN, &opts);
        assert!(result.tree.contains("grep=submit matches=1"));
        assert!(result.tree.contains("Submit"));
        assert!(!result.tree.contains("Cancel"));
        assert_eq!(result.refs.len(), 3);
        assert_eq!(result.metadata.captured_elements, 1);
        assert_eq!(result.metadata.total_interactive_elements, 3);
    }

    #[test]
    fn ref_table_entries_have_selectors() {
        let result = take(LOGIN, &SnapshotOptions::default());
        let entry = &result.refs["@ref:0"];
        assert_eq!(entry.selector, "#submit-btn");
        assert_eq!(entry.role, "button");
        assert_eq!(entry.name.as_deref(), Some("Submit"));
    }

    #[test]
    fn quality_tiers() {
        let result = take(LOGIN, &SnapshotOptions::default());
        assert_eq!(result.metadata.quality, Quality::High);

        let zero = SnapshotOptions {
            viewport: Viewport {
                width: 0,
                height: 0,
            },
            ..Default::default()
        };
        let result = take(LOGIN, &zero);
        assert_eq!(result.metadata.quality, Quality::Low);
        assert!(result
            .metadata
            .warnings
            .iter()
            .any(|w| w.contains("zero area")));

        // One match out of three interactive elements is a thin capture.
        let thin = SnapshotOptions {
            grep: Some(GrepOptions::new("help")),
            ..Default::default()
        };
        let result = take(LOGIN, &thin);
        assert_eq!(result.metadata.quality, Quality::Medium);
    }

    #[test]
    fn empty_capture_is_low_quality() {
        let result = take("<body><p>just prose</p></body>", &SnapshotOptions::default());
        assert_eq!(result.metadata.quality, Quality::Low);
        assert_eq!(result.metadata.captured_elements, 0);
    }

    #[test]
    fn bad_root_selector_degrades_without_error() {
        for selector in ["#missing", "div[["] {
            let opts = SnapshotOptions {
                root_selector: Some(selector.to_string()),
                ..Default::default()
            };
            let result = take(LOGIN, &opts);
            assert_eq!(
                result.tree,
                format!("no element found for selector: {selector}")
            );
            assert_eq!(result.metadata.quality, Quality::Low);
            assert!(result.refs.is_empty());
        }
    }

    #[test]
    fn root_selector_scopes_the_walk() {
        let html = r#"<body>
            <nav><a href="/">Home</a></nav>
            <main id="app"><button>Go</button></main>
        </body>"#;
        let opts = SnapshotOptions {
            root_selector: Some("#app".into()),
            ..Default::default()
        };
        let result = take(html, &opts);
        assert!(result.tree.contains("BUTTON \"Go\""));
        assert!(!result.tree.contains("LINK"));
    }

    #[test]
    fn outline_mode_stat_line() {
        let html = "<body><nav>x</nav><main><h1>Big Title</h1></main></body>";
        let opts = SnapshotOptions {
            mode: Mode::Outline,
            ..Default::default()
        };
        let result = take(html, &opts);
        assert!(result.tree.contains("OUTLINE: landmarks=2 headings=1"));
        assert!(result.tree.contains("HEADING level=1 \"Big Title\""));
        assert!(result.refs.is_empty());
    }

    #[test]
    fn structure_mode_delegates_to_outline() {
        let html = "<body><main><h2>Sub</h2></main></body>";
        let opts = SnapshotOptions {
            mode: Mode::Structure,
            ..Default::default()
        };
        let result = take(html, &opts);
        assert!(result.tree.contains("OUTLINE:"));
    }

    #[test]
    fn content_mode_tree_format() {
        let html = "<body><main><h1>Guide</h1><p>Some words here</p></main></body>";
        let opts = SnapshotOptions {
            mode: Mode::Content,
            ..Default::default()
        };
        let result = take(html, &opts);
        assert!(result.tree.contains("CONTENT: sections=1 words=4"));
        assert!(result.tree.contains("SECTION /body/main"));
        assert!(result.tree.contains("TEXT \"Some words here\""));
    }

    #[test]
    fn content_markdown_skips_page_header() {
        let html = "<body><main><h1>Guide</h1></main></body>";
        let opts = SnapshotOptions {
            mode: Mode::Content,
            format: SnapshotFormat::Markdown,
            url: "https://docs.test".into(),
            ..Default::default()
        };
        let result = take(html, &opts);
        assert!(result.tree.starts_with("<!-- source: https://docs.test -->"));
        assert!(!result.tree.contains("PAGE:"));
        assert!(result.tree.contains("# Guide"));
    }

    #[test]
    fn head_mode_reads_document_metadata() {
        let html = r#"<html><head>
            <title>Docs</title>
            <meta name="description" content="All the docs.">
            <link rel="canonical" href="https://docs.test/">
        </head><body></body></html>"#;
        let opts = SnapshotOptions {
            mode: Mode::Head,
            ..Default::default()
        };
        let result = take(html, &opts);
        assert!(result.tree.contains("TITLE \"Docs\""));
        assert!(result.tree.contains("DESCRIPTION \"All the docs.\""));
        assert!(result.tree.contains("CANONICAL https://docs.test/"));
    }

    #[test]
    fn all_mode_includes_non_interactive_roles() {
        let html = "<body><h1>Title</h1><button>Go</button></body>";
        let opts = SnapshotOptions {
            mode: Mode::All,
            ..Default::default()
        };
        let result = take(html, &opts);
        assert!(result.tree.contains("HEADING level=1 \"Title\""));
        assert!(result.tree.contains("BUTTON \"Go\" @ref:0"));
        assert_eq!(result.refs.len(), 1);
    }

    #[test]
    fn all_mode_metadata_counts_interactive_only() {
        let opts = SnapshotOptions {
            mode: Mode::All,
            ..Default::default()
        };
        let result = take("<body><h1>Title</h1><button>Go</button></body>", &opts);
        // The heading line is in the tree but only the button counts.
        assert_eq!(result.metadata.total_interactive_elements, 1);
        assert_eq!(result.metadata.captured_elements, 1);
        assert!(
            result.metadata.captured_elements <= result.metadata.total_interactive_elements
        );
        assert_eq!(result.metadata.quality, Quality::High);
    }

    #[test]
    fn html_format_fast_path() {
        let opts = SnapshotOptions {
            format: SnapshotFormat::Html,
            ..Default::default()
        };
        let result = take(LOGIN, &opts);
        assert!(result.tree.contains("<button"));
        assert!(result.tree.contains("submit-btn"));
        assert!(result.refs.is_empty());
        assert!(result
            .metadata
            .warnings
            .iter()
            .any(|w| w.contains("no refs")));
    }

    #[test]
    fn refs_reset_between_snapshots() {
        let doc = Html::parse_document(LOGIN);
        let mut refs = RefMap::new();
        let opts = SnapshotOptions::default();
        snapshot(&doc, &mut refs, &opts);
        let second = snapshot(&doc, &mut refs, &opts);
        assert!(second.tree.contains("@ref:0"));
        assert_eq!(refs.len(), 3);
    }
}
