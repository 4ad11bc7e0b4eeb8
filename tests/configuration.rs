//! Layered configuration as seen by a site on disk.

use quire::config::{ConfigError, Configuration, load_config};
use quire::site::Site;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn layers_defaults_files_and_environment() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("base.yml"),
        "title: Base\nsource: content\nproduction:\n  future: true\n",
    )
    .unwrap();
    fs::write(tmp.path().join("local.yml"), "title: Local\n").unwrap();

    let mut config = load_config(
        tmp.path(),
        &[PathBuf::from("base.yml"), PathBuf::from("local.yml")],
    )
    .unwrap();

    // Last file wins; untouched defaults survive.
    assert_eq!(config.get("title").unwrap().as_str(), Some("Local"));
    assert_eq!(config.source(), tmp.path().join("content"));
    assert_eq!(config.get("permalink").unwrap().as_str(), Some("date"));

    assert!(!config.future());
    config.merge_environment_specific_options("production");
    assert!(config.future());
    assert!(config.get("production").is_none());
}

#[test]
fn string_exclude_in_a_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("quire.config.yml"), "exclude: drafts\n").unwrap();
    assert!(matches!(
        load_config(tmp.path(), &[]),
        Err(ConfigError::InvalidConfiguration(_))
    ));
}

#[test]
fn missing_explicit_file_is_fatal_but_missing_default_is_not() {
    let tmp = TempDir::new().unwrap();
    assert!(load_config(tmp.path(), &[]).is_ok());
    assert!(matches!(
        load_config(tmp.path(), &[PathBuf::from("nope.yml")]),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn folded_scalars_collapse_newlines() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("quire.config.yml"),
        "description: >-\n  A site about\n  many things.\n",
    )
    .unwrap();
    let config = load_config(tmp.path(), &[]).unwrap();
    assert_eq!(
        config.get("description").unwrap().as_str(),
        Some("A site about many things.")
    );
}

#[test]
fn toml_config_drives_the_site() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("quire.config.toml"),
        "collections = [\"notes\"]\nexclude = [\"scratch\"]\n",
    )
    .unwrap();
    fs::create_dir_all(tmp.path().join("src/_notes")).unwrap();
    fs::create_dir_all(tmp.path().join("src/scratch")).unwrap();
    fs::write(tmp.path().join("src/_notes/one.md"), "---\ntitle: One\n---\n").unwrap();
    fs::write(tmp.path().join("src/scratch/tmp.md"), "---\ntitle: Tmp\n---\n").unwrap();
    fs::write(tmp.path().join("src/kept.md"), "---\ntitle: Kept\n---\n").unwrap();

    let config = load_config(tmp.path(), &[]).unwrap();
    assert_eq!(config.collection_labels(), vec!["posts", "notes"]);

    let site = Site::read(config).unwrap();
    assert_eq!(site.collection("notes").unwrap().docs().len(), 1);
    let pages: Vec<String> = site
        .pages()
        .iter()
        .map(|p| p.borrow().relative_path().to_string())
        .collect();
    assert_eq!(pages, vec!["kept.md"]);
}

#[test]
fn stock_defaults_are_a_valid_configuration() {
    let config = Configuration::from_overrides(Default::default());
    assert!(config.check_include_exclude().is_ok());
    assert!(config.collection_labels().contains(&"posts".to_string()));
}
