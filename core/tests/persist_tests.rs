use docsearch_core::persist::{
    from_js_str, load_index, load_meta, meta_path_for, save_index, save_js, save_meta, to_js_string, IndexFormat,
    MetaFile,
};
use docsearch_core::location::AnchorRegistry;
use docsearch_core::validate::validate_str;
use docsearch_core::{Category, SearchEntry, SearchIndex};
use std::fs;
use tempfile::tempdir;

const FIXTURE: &str = include_str!("fixtures/search_index.js");
// Artifact emitted by a real documentation build.
const GENERATED: &str = include_str!("fixtures/documenter_search_index.js");

#[test]
fn fixture_loads_in_generator_order() {
    let index = from_js_str(FIXTURE).unwrap();
    assert_eq!(index.len(), 10);
    assert_eq!(index.get(0).unwrap().location, "reference/#Reference");
    assert_eq!(index.get(9).unwrap().text, "using Pkg\nPkg.add(\"Quokka\")");
    assert_eq!(index.pages(), vec!["Reference", "Quokka"]);
    assert_eq!(index.by_category(Category::Method).count(), 1);
    assert_eq!(index.by_category(Category::Type).count(), 1);
}

#[test]
fn fixture_passes_validation() {
    let report = validate_str(FIXTURE).unwrap();
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.entries, 10);
}

#[test]
fn js_output_reproduces_fixture_bytes() {
    let index = from_js_str(FIXTURE).unwrap();
    assert_eq!(to_js_string(&index).unwrap(), FIXTURE);
}

#[test]
fn every_format_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let index = from_js_str(FIXTURE).unwrap();
    for (name, format) in [("a.js", IndexFormat::Js), ("a.json", IndexFormat::Json), ("a.bin", IndexFormat::Bincode)] {
        let path = dir.path().join(name);
        save_index(&path, &index, format).unwrap();
        let back = load_index(&path).unwrap();
        assert_eq!(back, index, "format {format:?}");
        let locations: Vec<&str> = back.iter().map(|e| e.location.as_str()).collect();
        let expected: Vec<&str> = index.iter().map(|e| e.location.as_str()).collect();
        assert_eq!(locations, expected);
    }
}

#[test]
fn unknown_extension_is_sniffed() {
    let dir = tempdir().unwrap();
    let index: SearchIndex = vec![SearchEntry::section("#Intro", "Home", "Intro")].into_iter().collect();
    let path = dir.path().join("index.data");
    save_js(&path, &index, "customIndex").unwrap();
    assert!(fs::read_to_string(&path).unwrap().starts_with("var customIndex = "));
    assert_eq!(load_index(&path).unwrap(), index);
}

#[test]
fn empty_index_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.js");
    save_index(&path, &SearchIndex::default(), IndexFormat::Js).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "var documenterSearchIndex = {\"docs\":\n[]\n}\n");
    assert!(load_index(&path).unwrap().is_empty());
}

#[test]
fn unknown_category_fails_to_load() {
    let bad = FIXTURE.replace("\"category\":\"type\"", "\"category\":\"chapter\"");
    assert!(from_js_str(&bad).is_err());
}

#[test]
fn meta_file_sits_next_to_artifact() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("build").join("search_index.js");
    let meta = MetaFile { num_entries: 10, num_pages: 2, created_at: "2024-01-01T00:00:00Z".into(), version: 1 };
    let path = meta_path_for(&artifact);
    save_meta(&path, &meta).unwrap();
    assert_eq!(path, dir.path().join("build").join("meta.json"));
    assert_eq!(load_meta(&path).unwrap(), meta);
}

#[test]
fn generated_artifact_round_trips_byte_for_byte() {
    let index = from_js_str(GENERATED).unwrap();
    assert_eq!(index.len(), 23);
    assert_eq!(index.pages(), vec!["API", "OdysseusEngine"]);
    assert_eq!(index.by_category(Category::Method).count(), 3);
    assert_eq!(to_js_string(&index).unwrap(), GENERATED);
    assert!(validate_str(GENERATED).unwrap().is_valid());
}

#[test]
fn generated_section_anchors_follow_repeat_counters() {
    let index = from_js_str(GENERATED).unwrap();
    for page in index.pages() {
        let mut anchors = AnchorRegistry::new();
        for entry in index.entries_for_page(page).filter(|e| e.category == Category::Section) {
            assert_eq!(Some(anchors.anchor(&entry.title).as_str()), entry.anchor(), "{}", entry.location);
        }
    }
    let repeats: Vec<&str> = index.iter().map(|e| e.location.as_str()).filter(|l| l.ends_with("-2")).collect();
    assert_eq!(repeats, vec!["api/#Public-Objects-2", "api/#Private-Objects-2"]);
}
