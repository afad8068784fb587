mod manifest;
mod markdown;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsearch_core::location::{page_location, Location};
use docsearch_core::persist::{
    load_index, meta_path_for, save_index, save_js, save_meta, IndexFormat, MetaFile, DEFAULT_VAR_NAME, META_VERSION,
};
use docsearch_core::validate::validate_str;
use docsearch_core::{Combine, IndexBuilder, IndexError, SearchEngine, SearchEntry, SearchIndex, SearchOptions};
use manifest::{Manifest, DEFAULT_MANIFEST};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docsearch-indexer")]
#[command(about = "Build, check and query static documentation search indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from Markdown pages and JSON/JSONL docstring records
    Build {
        /// Input directory
        #[arg(long)]
        input: PathBuf,
        /// Output artifact path
        #[arg(long, default_value = "./build/search_index.js")]
        output: PathBuf,
        /// Output format: js, json or bincode (default: from the output extension)
        #[arg(long)]
        format: Option<IndexFormat>,
        /// Site manifest (default: <input>/docs.json when present)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Link pages as `page/` (true) or `page.html` (false); default from the manifest, else true
        #[arg(long)]
        pretty_urls: Option<bool>,
        /// Directory of JSON/JSONL docstring records (default: <input>/docstrings when present)
        #[arg(long)]
        records: Option<PathBuf>,
        /// Global variable the JS artifact assigns
        #[arg(long, default_value = DEFAULT_VAR_NAME)]
        var_name: String,
    },
    /// Check every entry of an artifact and report problems
    Validate {
        #[arg(long)]
        index: PathBuf,
    },
    /// Re-encode an artifact in another format
    Convert {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        format: Option<IndexFormat>,
    },
    /// Search an artifact from the terminal
    Query {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        q: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// Match any query word instead of all of them
        #[arg(long, default_value_t = false)]
        or: bool,
        /// Disable completion of the last query word
        #[arg(long, default_value_t = false)]
        no_prefix: bool,
        /// Prefix printed links with this site URL
        #[arg(long, default_value = "")]
        base_url: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, format, manifest, pretty_urls, records, var_name } => {
            let opts = BuildOptions { manifest, pretty_urls, records, output: Some(output.clone()) };
            let index = build_index(&input, &opts)?;
            write_artifact(&index, &output, format, &var_name)
        }
        Commands::Validate { index } => validate(&index),
        Commands::Convert { input, output, format } => {
            let index = load_index(&input)?;
            let format = resolve_format(&output, format);
            save_index(&output, &index, format)?;
            tracing::info!(output = %output.display(), ?format, entries = index.len(), "converted index");
            Ok(())
        }
        Commands::Query { index, q, k, or, no_prefix, base_url } => {
            let opts = SearchOptions {
                limit: k,
                combine: if or { Combine::Or } else { Combine::And },
                prefix: !no_prefix,
                ..SearchOptions::default()
            };
            query(&index, &q, &opts, &base_url)
        }
    }
}

/// Default record directory under the input.
const DEFAULT_RECORDS_DIR: &str = "docstrings";

#[derive(Debug, Default)]
struct BuildOptions {
    manifest: Option<PathBuf>,
    /// Overrides the manifest's URL style.
    pretty_urls: Option<bool>,
    records: Option<PathBuf>,
    /// Never read back as input.
    output: Option<PathBuf>,
}

fn resolve_format(output: &Path, format: Option<IndexFormat>) -> IndexFormat {
    format.or_else(|| IndexFormat::from_path(output)).unwrap_or(IndexFormat::Js)
}

fn build_index(input: &Path, opts: &BuildOptions) -> Result<SearchIndex> {
    let manifest_path = opts.manifest.clone().or_else(|| {
        let p = input.join(DEFAULT_MANIFEST);
        p.is_file().then_some(p)
    });
    let manifest = match &manifest_path {
        Some(p) => Manifest::load(p)?,
        None => Manifest::default(),
    };
    let pretty_urls = opts.pretty_urls.unwrap_or(manifest.pretty_urls);

    let mut pages: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("md") {
            pages.push(p.strip_prefix(input).unwrap_or(p).to_path_buf());
        }
    }

    let records_dir = opts.records.clone().or_else(|| {
        let d = input.join(DEFAULT_RECORDS_DIR);
        d.is_dir().then_some(d)
    });
    let skip: Vec<PathBuf> = [opts.output.as_deref(), manifest_path.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(|p| p.canonicalize().ok())
        .collect();
    let mut records: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &records_dir {
        for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            let is_meta = p.file_name().and_then(|s| s.to_str()) == Some("meta.json");
            let is_record = !is_meta && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl"));
            if !p.is_file() || !is_record || p.canonicalize().is_ok_and(|c| skip.contains(&c)) {
                continue;
            }
            records.push(p.to_path_buf());
        }
    }

    let pages = order_pages(pages, &manifest);
    let mut builder = SearchIndex::builder();
    for rel in &pages {
        let source = fs::read_to_string(input.join(rel)).with_context(|| format!("reading {}", rel.display()))?;
        let location = page_location(rel, pretty_urls);
        let fallback = rel.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let page = markdown::extract_page(&source, &location, manifest.title_for(rel), fallback);
        tracing::debug!(page = %page.label, entries = page.entries.len(), "indexed page");
        builder.extend(page.entries);
    }

    for file in &records {
        let before = builder.len();
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(file, &mut builder)?;
        } else {
            index_json(file, &mut builder)?;
        }
        tracing::debug!(file = %file.display(), entries = builder.len() - before, "ingested docstring records");
    }

    let index = builder.finish();
    tracing::info!(pages = pages.len(), record_files = records.len(), entries = index.len(), "ingested documentation");
    Ok(index)
}

/// Manifest pages in manifest order, then the rest with the root `index.md` first.
fn order_pages(mut found: Vec<PathBuf>, manifest: &Manifest) -> Vec<PathBuf> {
    let mut ordered = Vec::with_capacity(found.len());
    for spec in &manifest.pages {
        match found.iter().position(|p| *p == spec.file) {
            Some(i) => ordered.push(found.remove(i)),
            None => tracing::warn!(file = %spec.file.display(), "manifest page not found in input"),
        }
    }
    if !manifest.pages.is_empty() && !found.is_empty() {
        tracing::warn!(count = found.len(), "pages missing from manifest appended in path order");
    }
    found.sort_by_key(|p| (p.as_path() != Path::new("index.md"), p.clone()));
    ordered.extend(found);
    ordered
}

fn index_jsonl(file: &Path, builder: &mut IndexBuilder) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let entry: SearchEntry = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", file.display(), n + 1))?;
        builder.push(entry);
    }
    Ok(())
}

/// Accepts a single record, an array of records or a `{"docs": [...]}` object.
fn index_json(file: &Path, builder: &mut IndexBuilder) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader).with_context(|| format!("parsing {}", file.display()))?;
    if json.get("docs").is_some() {
        let index: SearchIndex = serde_json::from_value(json).with_context(|| format!("invalid index {}", file.display()))?;
        builder.extend(index.iter().cloned());
        return Ok(());
    }
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                builder.push(serde_json::from_value(v).with_context(|| format!("invalid record in {}", file.display()))?);
            }
        }
        serde_json::Value::Object(_) => {
            builder.push(serde_json::from_value(json).with_context(|| format!("invalid record in {}", file.display()))?);
        }
        _ => tracing::warn!(file = %file.display(), "ignoring JSON that is neither an object nor an array"),
    }
    Ok(())
}

fn write_artifact(index: &SearchIndex, output: &Path, format: Option<IndexFormat>, var_name: &str) -> Result<()> {
    let format = resolve_format(output, format);
    match format {
        IndexFormat::Js => save_js(output, index, var_name)?,
        other => save_index(output, index, other)?,
    }
    let meta = MetaFile {
        num_entries: index.len() as u32,
        num_pages: index.pages().len() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?,
        version: META_VERSION,
    };
    save_meta(&meta_path_for(output), &meta)?;
    tracing::info!(output = %output.display(), ?format, "index build complete");
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    if IndexFormat::from_path(path) == Some(IndexFormat::Bincode) {
        // Binary snapshots are typed; decoding is the check.
        let index = load_index(path)?;
        println!("{}: {} entries, ok", path.display(), index.len());
        return Ok(());
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let report = validate_str(&text)?;
    for p in &report.warnings {
        println!("warning: {}", describe(p.entry, &p.message));
    }
    for p in &report.errors {
        println!("error: {}", describe(p.entry, &p.message));
    }
    println!("{}: {} entries, {} error(s), {} warning(s)", path.display(), report.entries, report.errors.len(), report.warnings.len());
    if report.is_valid() {
        Ok(())
    } else {
        Err(IndexError::Invalid(report.errors.len()).into())
    }
}

fn describe(entry: Option<usize>, message: &str) -> String {
    match entry {
        Some(i) => format!("entry {i}: {message}"),
        None => message.to_string(),
    }
}

fn query(path: &Path, q: &str, opts: &SearchOptions, base_url: &str) -> Result<()> {
    let engine = SearchEngine::new(Arc::new(load_index(path)?));
    let results = engine.search(q, opts);
    println!("{} hit(s) for {:?}", results.total_hits, results.query);
    for (page, hits) in results.group_by_page() {
        println!("\n{page}");
        for hit in hits {
            let link = if base_url.is_empty() { hit.location.clone() } else { Location::parse(&hit.location).href(base_url) };
            println!("  {:>8.3}  [{}] {}  {}", hit.score, hit.category, hit.title, link);
            if let Some(snippet) = &hit.snippet {
                println!("            {}", snippet.replace('\n', " "));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_core::persist::{load_meta, to_js_string};
    use docsearch_core::Category;
    use tempfile::tempdir;

    fn site(dir: &Path) {
        fs::write(dir.join("index.md"), "# Quokka Documentation\n\nQuokka simulates colonies.\n\n## Install\n\n```julia\nPkg.add(\"Quokka\")\n```\n").unwrap();
        fs::write(dir.join("api.md"), "# API\n\n## Public Objects\n\n## Public Objects\n").unwrap();
        fs::create_dir(dir.join(DEFAULT_RECORDS_DIR)).unwrap();
        fs::write(
            dir.join(DEFAULT_RECORDS_DIR).join("docstrings.jsonl"),
            "{\"location\":\"api/#Quokka.hop\",\"page\":\"API\",\"title\":\"Quokka.hop\",\"text\":\"hop(n)\",\"category\":\"function\"}\n\n",
        )
        .unwrap();
        fs::write(dir.join(DEFAULT_MANIFEST), r#"{"sitename": "Quokka", "pages": [{"file": "api.md"}, {"file": "index.md"}]}"#).unwrap();
    }

    #[test]
    fn builds_pages_then_records_in_order() {
        let dir = tempdir().unwrap();
        site(dir.path());
        let index = build_index(dir.path(), &BuildOptions::default()).unwrap();
        let locations: Vec<&str> = index.iter().map(|e| e.location.as_str()).collect();
        assert_eq!(
            locations,
            vec!["api/#API", "api/#Public-Objects", "api/#Public-Objects-2", "#Quokka-Documentation", "", "#Install", "", "api/#Quokka.hop"]
        );
        assert_eq!(index.get(4).unwrap().page, "Quokka");
        assert_eq!(index.get(6).unwrap().text, "Pkg.add(\"Quokka\")");
        assert_eq!(index.get(7).unwrap().category, Category::Function);
    }

    #[test]
    fn html_links_without_pretty_urls() {
        let dir = tempdir().unwrap();
        site(dir.path());
        let opts = BuildOptions { pretty_urls: Some(false), ..BuildOptions::default() };
        let index = build_index(dir.path(), &opts).unwrap();
        assert_eq!(index.get(0).unwrap().location, "api.html#API");
    }

    #[test]
    fn manifest_url_style_applies_unless_overridden() {
        let dir = tempdir().unwrap();
        site(dir.path());
        fs::write(dir.path().join(DEFAULT_MANIFEST), r#"{"pretty_urls": false, "pages": [{"file": "api.md"}]}"#).unwrap();
        let index = build_index(dir.path(), &BuildOptions::default()).unwrap();
        assert_eq!(index.get(0).unwrap().location, "api.html#API");
        let opts = BuildOptions { pretty_urls: Some(true), ..BuildOptions::default() };
        let index = build_index(dir.path(), &opts).unwrap();
        assert_eq!(index.get(0).unwrap().location, "api/#API");
    }

    #[test]
    fn stray_json_and_previous_output_are_not_ingested() {
        let dir = tempdir().unwrap();
        site(dir.path());
        fs::write(dir.path().join("package.json"), r#"{"name": "quokka-docs", "private": true}"#).unwrap();
        let first = build_index(dir.path(), &BuildOptions::default()).unwrap();

        // An artifact written into the records directory is skipped on rebuild.
        let out = dir.path().join(DEFAULT_RECORDS_DIR).join("search_index.json");
        write_artifact(&first, &out, None, DEFAULT_VAR_NAME).unwrap();
        let opts = BuildOptions { output: Some(out.clone()), ..BuildOptions::default() };
        let again = build_index(dir.path(), &opts).unwrap();
        assert_eq!(again, first);
        assert_eq!(again.len(), 8);
    }

    #[test]
    fn records_come_from_the_named_directory() {
        let dir = tempdir().unwrap();
        site(dir.path());
        let extra = dir.path().join("extra");
        fs::create_dir(&extra).unwrap();
        fs::write(
            extra.join("more.json"),
            r#"[{"location":"api/#Quokka.dig","page":"API","title":"Quokka.dig","text":"dig()","category":"function"}]"#,
        )
        .unwrap();
        let opts = BuildOptions { records: Some(extra), ..BuildOptions::default() };
        let index = build_index(dir.path(), &opts).unwrap();
        let last = index.get(index.len() - 1).unwrap();
        assert_eq!(last.location, "api/#Quokka.dig");
        assert!(index.iter().all(|e| e.location != "api/#Quokka.hop"));
    }

    #[test]
    fn writes_artifact_and_meta() {
        let dir = tempdir().unwrap();
        site(dir.path());
        let index = build_index(dir.path(), &BuildOptions::default()).unwrap();
        let out = dir.path().join("build").join("search_index.js");
        write_artifact(&index, &out, None, DEFAULT_VAR_NAME).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), to_js_string(&index).unwrap());
        let meta = load_meta(&meta_path_for(&out)).unwrap();
        assert_eq!(meta.num_entries, 8);
        assert_eq!(meta.num_pages, 2);
        assert!(time::OffsetDateTime::parse(&meta.created_at, &time::format_description::well_known::Rfc3339).is_ok());
        validate(&out).unwrap();
    }

    #[test]
    fn unlisted_pages_follow_index_first() {
        let found = vec![PathBuf::from("a.md"), PathBuf::from("guide/x.md"), PathBuf::from("index.md")];
        let ordered = order_pages(found, &Manifest::default());
        assert_eq!(ordered, vec![PathBuf::from("index.md"), PathBuf::from("a.md"), PathBuf::from("guide/x.md")]);
    }
}
