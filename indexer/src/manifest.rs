use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// File name picked up from the input directory when `--manifest` is absent.
pub const DEFAULT_MANIFEST: &str = "docs.json";

/// Site layout: page order, page labels and URL style.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub sitename: Option<String>,
    #[serde(default = "default_pretty_urls")]
    pub pretty_urls: bool,
    #[serde(default)]
    pub pages: Vec<PageSpec>,
}

fn default_pretty_urls() -> bool { true }

impl Default for Manifest {
    fn default() -> Self {
        Self { sitename: None, pretty_urls: true, pages: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageSpec {
    /// Path relative to the input directory.
    pub file: PathBuf,
    #[serde(default)]
    pub title: Option<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("opening manifest {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing manifest {}", path.display()))
    }

    /// Label for a page: its manifest title, or the site name for the root index.
    pub fn title_for(&self, relative: &Path) -> Option<&str> {
        if let Some(title) = self.pages.iter().find(|p| p.file == relative).and_then(|p| p.title.as_deref()) {
            return Some(title);
        }
        if relative == Path::new("index.md") {
            return self.sitename.as_deref();
        }
        None
    }
}
