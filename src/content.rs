//! The content walker: section detection plus heading/paragraph/list/code
//! extraction, rendered either as an indented tree or as Markdown.

use scraper::{ElementRef, Html};

use crate::dom::{self, Role};
use crate::locator;
use crate::outline::word_count;
use crate::walk::{self, WalkOptions};

/// Minimum words for a semantic `<div>` to count as a section on its own.
const DIV_SECTION_MIN_WORDS: usize = 30;
/// Tree-mode TEXT lines are clipped at this length; markdown keeps full text.
const MAX_TREE_TEXT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Text(String),
    List { ordered: bool, items: Vec<String> },
    Code { lang: Option<String>, text: String },
    Quote(String),
    Image { alt: String, src: String },
}

#[derive(Debug, Clone)]
pub struct Section {
    pub xpath: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Default)]
pub struct ContentWalk {
    pub sections: Vec<Section>,
    pub word_count: usize,
}

pub fn walk_content(doc: &Html, root: Option<ElementRef>, opts: &WalkOptions) -> ContentWalk {
    let Some(start) = root.or_else(|| walk::body_element(doc)) else {
        return ContentWalk::default();
    };

    let mut section_roots = Vec::new();
    collect_sections(start, 0, opts, &mut section_roots);
    if section_roots.is_empty() {
        section_roots.push(start);
    }

    let mut walk = ContentWalk::default();
    for section_el in section_roots {
        let mut blocks = Vec::new();
        extract_blocks(section_el, 0, opts, &mut blocks);
        if blocks.is_empty() {
            continue;
        }
        walk.word_count += blocks.iter().map(block_words).sum::<usize>();
        walk.sections.push(Section {
            xpath: locator::semantic_xpath(section_el),
            blocks,
        });
    }
    walk
}

/// Depth-first scan for section roots; a matched section is not searched for
/// nested sections again.
fn collect_sections<'a>(
    el: ElementRef<'a>,
    depth: usize,
    opts: &WalkOptions,
    out: &mut Vec<ElementRef<'a>>,
) {
    if depth > opts.max_depth {
        return;
    }
    for child in el.children().filter_map(ElementRef::wrap) {
        if walk::PRUNED_TAGS.contains(&child.value().name()) {
            continue;
        }
        if !opts.include_hidden && !dom::is_visible(child) {
            continue;
        }
        if is_section(child) {
            out.push(child);
        } else {
            collect_sections(child, depth + 1, opts, out);
        }
    }
}

fn is_section(el: ElementRef) -> bool {
    let e = el.value();
    if let Some(role) = dom::role_of(el) {
        if role.is_landmark() || role == Role::Article {
            return true;
        }
    }
    match e.name() {
        "section" => e.attr("id").is_some() || e.attr("aria-label").is_some(),
        "div" => {
            let has_identity =
                e.attr("id").is_some() || e.classes().any(locator::is_semantic_class);
            has_identity && word_count(el) > DIV_SECTION_MIN_WORDS
        }
        _ => false,
    }
}

fn extract_blocks(el: ElementRef, depth: usize, opts: &WalkOptions, out: &mut Vec<Block>) {
    if depth > opts.max_depth {
        return;
    }
    for child in el.children().filter_map(ElementRef::wrap) {
        let tag = child.value().name();
        if walk::PRUNED_TAGS.contains(&tag) {
            continue;
        }
        if !opts.include_hidden && !dom::is_visible(child) {
            continue;
        }

        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let text = dom::normalized_text(child);
                if !text.is_empty() {
                    let level = tag.as_bytes()[1] - b'0';
                    out.push(Block::Heading { level, text });
                }
            }
            "p" => {
                let text = dom::normalized_text(child);
                if !text.is_empty() {
                    out.push(Block::Text(text));
                }
            }
            "ul" | "ol" => {
                let items: Vec<String> = child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|li| li.value().name() == "li")
                    .map(dom::normalized_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                if !items.is_empty() {
                    out.push(Block::List {
                        ordered: tag == "ol",
                        items,
                    });
                }
            }
            "pre" => {
                let text: String = child.text().collect();
                let text = text.trim_matches('\n').to_string();
                if !text.is_empty() {
                    out.push(Block::Code {
                        lang: code_language(child),
                        text,
                    });
                }
            }
            "blockquote" => {
                let text = dom::normalized_text(child);
                if !text.is_empty() {
                    out.push(Block::Quote(text));
                }
            }
            "img" => {
                if let Some(src) = child.value().attr("src") {
                    if !src.is_empty() {
                        out.push(Block::Image {
                            alt: child.value().attr("alt").unwrap_or("").to_string(),
                            src: src.to_string(),
                        });
                    }
                }
            }
            _ => extract_blocks(child, depth + 1, opts, out),
        }
    }
}

/// Language from `language-*`/`lang-*` classes on `<pre>` or a nested
/// `<code>`.
fn code_language(pre: ElementRef) -> Option<String> {
    let from_classes = |el: ElementRef| {
        el.value().classes().find_map(|c| {
            c.strip_prefix("language-")
                .or_else(|| c.strip_prefix("lang-"))
                .map(str::to_string)
        })
    };
    from_classes(pre).or_else(|| {
        pre.children()
            .filter_map(ElementRef::wrap)
            .find(|c| c.value().name() == "code")
            .and_then(from_classes)
    })
}

fn block_words(block: &Block) -> usize {
    let count = |s: &str| s.split_whitespace().count();
    match block {
        Block::Heading { text, .. } => count(text),
        Block::Text(text) => count(text),
        Block::List { items, .. } => items.iter().map(|i| count(i)).sum(),
        Block::Code { text, .. } => count(text),
        Block::Quote(text) => count(text),
        Block::Image { alt, .. } => count(alt),
    }
}

/// Render as the indented tree format.
pub fn render_tree(walk: &ContentWalk) -> Vec<String> {
    let mut lines = Vec::new();
    for section in &walk.sections {
        lines.push(format!("SECTION {}", section.xpath));
        for block in &section.blocks {
            match block {
                Block::Heading { level, text } => {
                    lines.push(format!("  HEADING level={level} \"{text}\""));
                }
                Block::Text(text) => {
                    lines.push(format!("  TEXT \"{}\"", clip(text)));
                }
                Block::List { items, .. } => {
                    lines.push(format!("  LIST [{} items]", items.len()));
                    for item in items {
                        lines.push(format!("    - {}", clip(item)));
                    }
                }
                Block::Code { lang, text } => {
                    let tag = lang.as_deref().unwrap_or("code");
                    lines.push(format!("  CODE [{tag}]"));
                    for code_line in text.lines() {
                        lines.push(format!("    {code_line}"));
                    }
                }
                Block::Quote(text) => {
                    lines.push(format!("  QUOTE \"{}\"", clip(text)));
                }
                Block::Image { alt, src } => {
                    lines.push(format!("  IMAGE \"{alt}\" {src}"));
                }
            }
        }
    }
    lines
}

fn clip(text: &str) -> String {
    if text.len() <= MAX_TREE_TEXT {
        return text.to_string();
    }
    let mut end = MAX_TREE_TEXT - 3;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Render as Markdown, framed by source/end comments.
pub fn render_markdown(walk: &ContentWalk, url: &str, include_images: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("<!-- source: {url} -->\n"));

    for section in &walk.sections {
        out.push('\n');
        out.push_str(&format!("<!-- xpath: {} -->\n\n", section.xpath));
        for block in &section.blocks {
            match block {
                Block::Heading { level, text } => {
                    out.push_str(&format!("{} {text}\n\n", "#".repeat(*level as usize)));
                }
                Block::Text(text) => {
                    out.push_str(text);
                    out.push_str("\n\n");
                }
                Block::List { ordered, items } => {
                    for (i, item) in items.iter().enumerate() {
                        if *ordered {
                            out.push_str(&format!("{}. {item}\n", i + 1));
                        } else {
                            out.push_str(&format!("- {item}\n"));
                        }
                    }
                    out.push('\n');
                }
                Block::Code { lang, text } => {
                    out.push_str(&format!("```{}\n", lang.as_deref().unwrap_or("")));
                    out.push_str(text);
                    out.push_str("\n```\n\n");
                }
                Block::Quote(text) => {
                    out.push_str(&format!("> {text}\n\n"));
                }
                Block::Image { alt, src } => {
                    if include_images {
                        out.push_str(&format!("![{alt}]({src})\n\n"));
                    }
                }
            }
        }
    }

    out.push_str(&format!(
        "<!-- end: {} words extracted -->\n",
        walk.word_count
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(html: &str) -> ContentWalk {
        let doc = Html::parse_document(html);
        walk_content(&doc, None, &WalkOptions::default())
    }

    const ARTICLE: &str = r#"<body><main>
        <h1>Guide</h1>
        <p>First paragraph of the guide.</p>
        <ul><li>alpha</li><li>beta</li></ul>
        <pre><code class="language-rust">fn main() {}</code></pre>
        <blockquote>Wise words</blockquote>
    </main></body>"#;

    #[test]
    fn main_landmark_is_a_section() {
        let c = content(ARTICLE);
        assert_eq!(c.sections.len(), 1);
        assert_eq!(c.sections[0].xpath, "/body/main");
    }

    #[test]
    fn blocks_extracted_in_order() {
        let c = content(ARTICLE);
        let blocks = &c.sections[0].blocks;
        assert!(matches!(blocks[0], Block::Heading { level: 1, .. }));
        assert!(matches!(blocks[1], Block::Text(_)));
        assert!(matches!(blocks[2], Block::List { ordered: false, .. }));
        assert!(matches!(blocks[3], Block::Code { .. }));
        assert!(matches!(blocks[4], Block::Quote(_)));
    }

    #[test]
    fn code_language_detected() {
        let c = content(ARTICLE);
        let Block::Code { lang, text } = &c.sections[0].blocks[3] else {
            panic!("expected code block");
        };
        assert_eq!(lang.as_deref(), Some("rust"));
        assert_eq!(text, "fn main() {}");
    }

    #[test]
    fn section_with_id_detected() {
        let c = content(r#"<body><section id="pricing"><h2>Plans</h2></section></body>"#);
        assert_eq!(c.sections.len(), 1);
        assert_eq!(c.sections[0].xpath, "/body/section");
    }

    #[test]
    fn wordy_semantic_div_is_a_section() {
        let words = "lorem ipsum ".repeat(20);
        let html = format!(r#"<body><div class="content"><p>{words}</p></div></body>"#);
        let c = content(&html);
        assert_eq!(c.sections.len(), 1);
    }

    #[test]
    fn short_div_is_not_a_section_but_body_fallback_kicks_in() {
        let c = content(r#"<body><div class="content"><p>too short</p></div></body>"#);
        // The div fails the word threshold, so the body becomes one section.
        assert_eq!(c.sections.len(), 1);
        assert!(matches!(c.sections[0].blocks[0], Block::Text(_)));
    }

    #[test]
    fn word_count_sums_blocks() {
        let c = content("<body><main><p>one two</p><p>three</p></main></body>");
        assert_eq!(c.word_count, 3);
    }

    #[test]
    fn tree_rendering() {
        let c = content(ARTICLE);
        let lines = render_tree(&c);
        assert_eq!(lines[0], "SECTION /body/main");
        assert_eq!(lines[1], "  HEADING level=1 \"Guide\"");
        assert!(lines.contains(&"  LIST [2 items]".to_string()));
        assert!(lines.contains(&"  CODE [rust]".to_string()));
        assert!(lines.contains(&"    fn main() {}".to_string()));
    }

    #[test]
    fn markdown_rendering() {
        let c = content(ARTICLE);
        let md = render_markdown(&c, "https://docs.test/guide", false);
        assert!(md.starts_with("<!-- source: https://docs.test/guide -->\n"));
        assert!(md.contains("<!-- xpath: /body/main -->"));
        assert!(md.contains("# Guide\n"));
        assert!(md.contains("- alpha\n- beta\n"));
        assert!(md.contains("```rust\nfn main() {}\n```"));
        assert!(md.contains("> Wise words"));
        let expected_end = format!("<!-- end: {} words extracted -->\n", c.word_count);
        assert!(md.ends_with(&expected_end));
    }

    #[test]
    fn ordered_list_markdown() {
        let c = content("<body><main><ol><li>first</li><li>second</li></ol></main></body>");
        let md = render_markdown(&c, "", false);
        assert!(md.contains("1. first\n2. second\n"));
    }

    #[test]
    fn images_only_when_requested() {
        let html = r#"<body><main><p>intro text</p><img src="x.png" alt="pic"></main></body>"#;
        let c = content(html);
        let without = render_markdown(&c, "", false);
        assert!(!without.contains("![pic]"));
        let with = render_markdown(&c, "", true);
        assert!(with.contains("![pic](x.png)"));
    }

    #[test]
    fn hidden_content_excluded() {
        let c = content(r#"<body><main><p hidden>secret</p><p>public</p></main></body>"#);
        let blocks = &c.sections[0].blocks;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0], Block::Text("public".into()));
    }
}
