//! Locations: page paths, heading anchors and navigation links.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref DISALLOWED: Regex = Regex::new(r"[^\p{L}\p{P}\d\-]+").expect("valid regex");
    static ref DASHES: Regex = Regex::new(r"--+").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location<'a> {
    pub path: &'a str,
    pub fragment: Option<&'a str>,
}

impl<'a> Location<'a> {
    pub fn parse(location: &'a str) -> Self {
        match location.split_once('#') {
            Some((path, fragment)) => Location { path, fragment: Some(fragment) },
            None => Location { path: location, fragment: None },
        }
    }

    /// Link relative to `base_url`. An empty location links to the base itself.
    pub fn href(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        let mut out = if path.is_empty() { format!("{base}/") } else { format!("{base}/{path}") };
        if let Some(frag) = self.fragment {
            out.push('#');
            out.push_str(frag);
        }
        out
    }
}

/// Location of a source page in the built site.
///
/// `index.md` maps to the site root, `guide/index.md` to `guide/`, and any
/// other page to `<stem>/` with pretty URLs or `<stem>.html` without.
pub fn page_location(relative: &Path, pretty_urls: bool) -> String {
    let parts: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let (last, dirs) = match parts.split_last() {
        Some(split) => split,
        None => return String::new(),
    };
    let dir = dirs.iter().map(|d| format!("{d}/")).collect::<String>();
    if last == "index" {
        return dir;
    }
    if pretty_urls {
        format!("{dir}{last}/")
    } else {
        format!("{dir}{last}.html")
    }
}

/// Anchor slug of a heading: `Public Objects` -> `Public-Objects`.
pub fn slugify(heading: &str) -> String {
    let s = WHITESPACE.replace_all(heading.trim(), "-");
    let s = s.replace('&', "-and-");
    let s = DISALLOWED.replace_all(&s, "");
    let s = DASHES.replace_all(&s, "-");
    s.trim_matches('-').to_string()
}

/// Hands out unique anchors within one page; the n-th repeat of a slug gets `-n`.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    seen: HashMap<String, usize>,
}

impl AnchorRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn anchor(&mut self, heading: &str) -> String {
        let slug = slugify(heading);
        let n = self.seen.entry(slug.clone()).or_insert(0);
        *n += 1;
        if *n == 1 { slug } else { format!("{slug}-{n}") }
    }
}
