use crate::error::IndexError;
use crate::index::SearchIndex;
use anyhow::{Context, Result};
use bincode;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Global the search widget reads the index from.
pub const DEFAULT_VAR_NAME: &str = "documenterSearchIndex";
pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// `var <name> = {"docs": [...]}` script.
    Js,
    Json,
    Bincode,
}

impl IndexFormat {
    /// Guess from the extension; `None` when it is not one of ours.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("js") => Some(IndexFormat::Js),
            Some("json") => Some(IndexFormat::Json),
            Some("bin") => Some(IndexFormat::Bincode),
            _ => None,
        }
    }

    fn sniff(bytes: &[u8]) -> Self {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(64)]);
        let head = head.trim_start();
        if head.starts_with("var ") || head.starts_with("const ") || head.starts_with("let ") {
            IndexFormat::Js
        } else if head.starts_with('{') {
            IndexFormat::Json
        } else {
            IndexFormat::Bincode
        }
    }
}

impl FromStr for IndexFormat {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" => Ok(IndexFormat::Js),
            "json" => Ok(IndexFormat::Json),
            "bincode" | "bin" => Ok(IndexFormat::Bincode),
            other => Err(IndexError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_entries: u32,
    pub num_pages: u32,
    pub created_at: String,
    pub version: u32,
}

/// `meta.json` next to the artifact.
pub fn meta_path_for(artifact: &Path) -> PathBuf {
    artifact.with_file_name("meta.json")
}

pub fn to_json_string(index: &SearchIndex) -> Result<String> {
    Ok(serde_json::to_string_pretty(index)?)
}

pub fn from_json_str(s: &str) -> Result<SearchIndex> {
    serde_json::from_str(s).context("decoding search index JSON")
}

pub fn to_js_string(index: &SearchIndex) -> Result<String> {
    to_js_string_named(index, DEFAULT_VAR_NAME)
}

/// The docs array goes on its own line between the object braces.
pub fn to_js_string_named(index: &SearchIndex, var_name: &str) -> Result<String> {
    let docs = serde_json::to_string(index.entries())?;
    Ok(format!("var {var_name} = {{\"docs\":\n{docs}\n}}\n"))
}

/// Split a `var name = <json>` script into the name and the JSON text.
pub fn split_js_assignment(s: &str) -> Result<(&str, &str), IndexError> {
    let trimmed = s.trim();
    let rest = ["var ", "const ", "let "]
        .iter()
        .find_map(|kw| trimmed.strip_prefix(kw))
        .ok_or_else(|| IndexError::NotAnAssignment(trimmed.chars().take(32).collect()))?;
    let (name, value) = rest
        .split_once('=')
        .ok_or_else(|| IndexError::NotAnAssignment(trimmed.chars().take(32).collect()))?;
    let value = value.trim().trim_end_matches(';').trim_end();
    Ok((name.trim(), value))
}

pub fn from_js_str(s: &str) -> Result<SearchIndex> {
    let (name, json) = split_js_assignment(s)?;
    let value: serde_json::Value =
        serde_json::from_str(json).with_context(|| format!("decoding JSON assigned to `{name}`"))?;
    if value.get("docs").is_none() {
        return Err(IndexError::MissingDocs.into());
    }
    serde_json::from_value(value).with_context(|| format!("decoding entries of `{name}`"))
}

pub fn encode(index: &SearchIndex, format: IndexFormat) -> Result<Vec<u8>> {
    Ok(match format {
        IndexFormat::Js => to_js_string(index)?.into_bytes(),
        IndexFormat::Json => to_json_string(index)?.into_bytes(),
        IndexFormat::Bincode => bincode::serialize(index)?,
    })
}

pub fn decode(bytes: &[u8], format: IndexFormat) -> Result<SearchIndex> {
    match format {
        IndexFormat::Js => from_js_str(std::str::from_utf8(bytes).context("index script is not UTF-8")?),
        IndexFormat::Json => {
            let value: serde_json::Value = serde_json::from_slice(bytes).context("decoding search index JSON")?;
            if value.get("docs").is_none() {
                return Err(IndexError::MissingDocs.into());
            }
            Ok(serde_json::from_value(value)?)
        }
        IndexFormat::Bincode => Ok(bincode::deserialize(bytes).context("decoding bincode index")?),
    }
}

pub fn save_index(path: &Path, index: &SearchIndex, format: IndexFormat) -> Result<()> {
    write_bytes(path, &encode(index, format)?)
}

pub fn save_js(path: &Path, index: &SearchIndex, var_name: &str) -> Result<()> {
    write_bytes(path, to_js_string_named(index, var_name)?.as_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    f.write_all(bytes)?;
    Ok(())
}

/// Load an artifact, picking the format from the extension or the content.
pub fn load_index(path: &Path) -> Result<SearchIndex> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let format = IndexFormat::from_path(path).unwrap_or_else(|| IndexFormat::sniff(&buf));
    let index = decode(&buf, format).with_context(|| format!("loading {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = index.len(), ?format, "loaded search index");
    Ok(index)
}

pub fn save_meta(path: &Path, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    write_bytes(path, json.as_bytes())
}

pub fn load_meta(path: &Path) -> Result<MetaFile> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
