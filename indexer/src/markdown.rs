use docsearch_core::location::AnchorRegistry;
use docsearch_core::SearchEntry;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Top-level block of a Markdown page, flattened to plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Body(String),
}

pub fn blocks(source: &str) -> Vec<Block> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut heading = false;
    let mut buf = String::new();

    for event in Parser::new(source) {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    heading = matches!(tag, Tag::Heading { .. });
                    buf.clear();
                } else if matches!(tag, Tag::Paragraph | Tag::Item | Tag::CodeBlock(_)) && !buf.is_empty() && !buf.ends_with('\n') {
                    buf.push('\n');
                }
                depth += 1;
            }
            Event::End(tag) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let text = match tag {
                        TagEnd::HtmlBlock => String::new(),
                        _ => buf.trim_end().to_string(),
                    };
                    out.push(if heading { Block::Heading(text) } else { Block::Body(text) });
                }
            }
            Event::Text(t) | Event::Code(t) => buf.push_str(&t),
            Event::SoftBreak => buf.push(' '),
            Event::HardBreak => buf.push('\n'),
            Event::Rule if depth == 0 => out.push(Block::Body(String::new())),
            _ => {}
        }
    }
    out
}

/// A parsed page ready to be appended to the index.
#[derive(Debug)]
pub struct Page {
    pub label: String,
    pub entries: Vec<SearchEntry>,
}

/// Turn one Markdown page into index entries.
///
/// The label is `title` when given, else the first heading, else `fallback`.
/// Headings become sections anchored under `location`; every other top-level
/// block becomes a page entry pointing at the page itself.
pub fn extract_page(source: &str, location: &str, title: Option<&str>, fallback: &str) -> Page {
    let blocks = blocks(source);
    let label = title
        .map(str::to_string)
        .or_else(|| {
            blocks.iter().find_map(|b| match b {
                Block::Heading(h) if !h.is_empty() => Some(h.clone()),
                _ => None,
            })
        })
        .unwrap_or_else(|| fallback.to_string());

    let mut anchors = AnchorRegistry::new();
    let entries = blocks
        .into_iter()
        .map(|b| match b {
            Block::Heading(h) => {
                let anchor = anchors.anchor(&h);
                SearchEntry::section(format!("{location}#{anchor}"), label.as_str(), h)
            }
            Block::Body(text) => SearchEntry::page(location, label.as_str(), text),
        })
        .collect();
    Page { label, entries }
}
