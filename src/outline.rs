//! The outline walker: landmark and heading hierarchy with per-branch word
//! counts, for orienting an agent on page structure without the noise of
//! individual controls.

use scraper::{ElementRef, Html};

use crate::dom::{self, Role};
use crate::walk::{self, WalkOptions};

#[derive(Debug, Default)]
pub struct OutlineWalk {
    pub lines: Vec<String>,
    pub landmarks: usize,
    pub headings: usize,
}

pub fn walk_outline(doc: &Html, root: Option<ElementRef>, opts: &WalkOptions) -> OutlineWalk {
    let mut outline = OutlineWalk::default();
    if let Some(start) = root.or_else(|| walk::body_element(doc)) {
        visit(start, 0, 0, opts, &mut outline);
    }
    outline
}

fn visit(
    el: ElementRef,
    depth: usize,
    indent: usize,
    opts: &WalkOptions,
    outline: &mut OutlineWalk,
) {
    if depth > opts.max_depth {
        return;
    }
    if walk::PRUNED_TAGS.contains(&el.value().name()) {
        return;
    }
    if !opts.include_hidden && !dom::is_visible(el) {
        return;
    }

    let role = dom::role_of(el);
    let child_indent = match role {
        Some(ref role) if outline_worthy(role) => {
            outline.lines.push(format_line(el, role, indent));
            if role.is_heading() {
                outline.headings += 1;
            } else {
                outline.landmarks += 1;
            }
            indent + 1
        }
        _ => indent,
    };

    for child in el.children().filter_map(ElementRef::wrap) {
        visit(child, depth + 1, child_indent, opts, outline);
    }
}

fn outline_worthy(role: &Role) -> bool {
    role.is_landmark() || role.is_heading() || matches!(role, Role::Article | Role::Dialog)
}

fn format_line(el: ElementRef, role: &Role, indent: usize) -> String {
    let mut line = "  ".repeat(indent);
    let display = role.to_string();
    match display.split_once(' ') {
        Some((word, rest)) => {
            line.push_str(&word.to_uppercase());
            line.push(' ');
            line.push_str(rest);
        }
        None => line.push_str(&display.to_uppercase()),
    }

    let name = if role.is_heading() {
        dom::normalized_text(el)
    } else {
        // Landmark names come from labels, not aggregated child text.
        el.value()
            .attr("aria-label")
            .map(dom::collapse_ws)
            .unwrap_or_default()
    };
    if !name.is_empty() {
        line.push_str(&format!(" \"{name}\""));
    }

    let words = word_count(el);
    line.push_str(&format!(" [{words} words]"));
    line
}

pub(crate) fn word_count(el: ElementRef) -> usize {
    dom::normalized_text(el).split_whitespace().count()
}
