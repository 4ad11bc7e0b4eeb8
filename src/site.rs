//! On-disk site store: documents, collections, and the site that owns them.
//!
//! ## Layout
//!
//! ```text
//! site/
//! ├── quire.config.yml
//! └── src/                        # source (config: `source`)
//!     ├── about.md                # page: front matter + body
//!     ├── contact.html            # page
//!     ├── _posts/                 # the `posts` collection
//!     │   ├── 2024-01-05-hello.md
//!     │   └── 2024-02-11-again.md
//!     ├── _authors/               # another configured collection
//!     │   └── jane.yml            # pure-data document
//!     └── node_modules/           # excluded
//! ```
//!
//! Collections live in `_<label>` directories under the source (or under
//! `collections_dir` when configured). Pages are markdown or HTML files
//! outside `_`-prefixed directories that open with front matter.
//!
//! ## Sharing
//!
//! Documents are shared between the site and any content models wrapping
//! them as [`DocumentRef`] (`Rc<RefCell<Document>>`). A model mutates the
//! document's data in place; the site sees the change immediately. The
//! store is single-threaded by construction: `Rc` is not `Send`.
//!
//! ## Filtering
//!
//! Documents with `published: false` are skipped unless `unpublished` is
//! set, and posts dated after the site time are skipped unless `future` is
//! set.

use crate::config::{ConfigError, Configuration};
use crate::front_matter::{self, FrontMatterError};
use crate::naming::parse_dated_name;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};
use std::cell::RefCell;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Shared, mutable handle to a document.
pub type DocumentRef = Rc<RefCell<Document>>;

const DATA_EXTENSIONS: &[&str] = &["yml", "yaml"];
const PAGE_EXTENSIONS: &[&str] = &["md", "markdown", "html"];

/// Identity of the collection a document belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMeta {
    pub label: String,
    /// Absolute directory holding the collection's files.
    pub directory: PathBuf,
}

/// One file-backed content unit: a post, a page, or a pure-data file.
#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
    relative_path: String,
    data: Mapping,
    content: String,
    collection: Option<CollectionMeta>,
    source: PathBuf,
    time: DateTime<Local>,
    yaml_file: bool,
}

impl Document {
    /// A document with no path yet: a new record.
    pub fn new_unsaved(
        source: PathBuf,
        collection: Option<CollectionMeta>,
        time: DateTime<Local>,
    ) -> Self {
        Self {
            path: None,
            relative_path: String::new(),
            data: Mapping::new(),
            content: String::new(),
            collection,
            source,
            time,
            yaml_file: false,
        }
    }

    /// Read a document from disk.
    ///
    /// Pure-data files (`.yml`, `.yaml`) parse entirely as the data
    /// mapping. Other files split into front matter and body; a file without
    /// front matter has empty data and the whole text as its body.
    pub fn read(
        path: &Path,
        source: &Path,
        collection: Option<CollectionMeta>,
        time: DateTime<Local>,
    ) -> Result<Self, SiteError> {
        let text = fs::read_to_string(path)?;
        let yaml_file = is_data_file(path);
        let parse = |yaml: &str| {
            front_matter::parse_mapping(yaml).map_err(|source| SiteError::FrontMatter {
                path: path.to_path_buf(),
                source,
            })
        };

        let (data, content) = if yaml_file {
            (parse(&text)?, String::new())
        } else if let Some((block, body)) = front_matter::split(&text) {
            (parse(block)?, body.to_string())
        } else {
            (Mapping::new(), text)
        };

        let mut document = Self::new_unsaved(source.to_path_buf(), collection, time);
        document.data = data;
        document.content = content;
        document.process_absolute_path(Some(path.to_path_buf()));
        document.yaml_file = yaml_file;
        Ok(document)
    }

    pub fn into_ref(self) -> DocumentRef {
        Rc::new(RefCell::new(self))
    }

    /// Absolute path, if one has been assigned.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Path relative to the site source, `/`-separated. Empty when pathless.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn data(&self) -> &Mapping {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Mapping {
        &mut self.data
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn collection(&self) -> Option<&CollectionMeta> {
        self.collection.as_ref()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The site time when this document was read or created.
    pub fn time(&self) -> DateTime<Local> {
        self.time
    }

    /// Whether the document is pure data, with no body section.
    pub fn is_yaml_file(&self) -> bool {
        self.yaml_file
    }

    /// Assign a new path, or clear it with `None`.
    ///
    /// Relative paths are taken relative to the site source.
    pub fn process_absolute_path(&mut self, path: Option<PathBuf>) {
        match path {
            Some(path) => {
                let absolute = self.in_source_dir(&path);
                self.relative_path = relative_to(&absolute, &self.source);
                self.yaml_file = is_data_file(&absolute);
                self.path = Some(absolute);
            }
            None => {
                self.path = None;
                self.relative_path.clear();
            }
        }
    }

    /// Resolve `path` inside the site source.
    ///
    /// Absolute paths already under the source are returned unchanged. Any
    /// other path has its `.` and `..` components resolved, then is joined
    /// onto the source with its root stripped, so it never escapes the source.
    pub fn in_source_dir(&self, path: &Path) -> PathBuf {
        if path.starts_with(&self.source) {
            return path.to_path_buf();
        }
        let mut relative = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::ParentDir => {
                    relative.pop();
                }
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            }
        }
        self.source.join(relative)
    }

    /// Date of the document.
    ///
    /// The `date` front matter wins, then a `YYYY-MM-DD-` filename prefix,
    /// then the site time.
    pub fn date(&self) -> NaiveDateTime {
        if let Some(date) = self.data.get("date").and_then(parse_date_value) {
            return date;
        }
        self.filename_date()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_else(|| self.time.naive_local())
    }

    fn filename_date(&self) -> Option<NaiveDate> {
        let stem = self.path.as_ref()?.file_stem()?.to_string_lossy().to_string();
        parse_dated_name(&stem).date
    }

    fn is_published(&self) -> bool {
        self.data.get("published").and_then(Value::as_bool) != Some(false)
    }
}

/// A named group of documents sharing a directory.
#[derive(Debug, Clone)]
pub struct Collection {
    meta: CollectionMeta,
    docs: Vec<DocumentRef>,
}

impl Collection {
    pub fn new(label: &str, directory: PathBuf) -> Self {
        Self {
            meta: CollectionMeta {
                label: label.to_string(),
                directory,
            },
            docs: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.meta.label
    }

    pub fn directory(&self) -> &Path {
        &self.meta.directory
    }

    pub fn meta(&self) -> &CollectionMeta {
        &self.meta
    }

    pub fn docs(&self) -> &[DocumentRef] {
        &self.docs
    }

    pub fn push(&mut self, document: DocumentRef) {
        self.docs.push(document);
    }
}

/// The site: configuration, collections, and pages.
#[derive(Debug)]
pub struct Site {
    config: Configuration,
    source: PathBuf,
    time: DateTime<Local>,
    collections: Vec<Collection>,
    pages: Vec<DocumentRef>,
}

impl Site {
    /// An empty site with one (empty) collection per configured label.
    pub fn new(config: Configuration) -> Self {
        let source = config.source();
        let collections_root = source.join(config.collections_dir());
        let collections = config
            .collection_labels()
            .iter()
            .map(|label| Collection::new(label, collections_root.join(format!("_{label}"))))
            .collect();
        Self {
            config,
            source,
            time: Local::now(),
            collections,
            pages: Vec::new(),
        }
    }

    /// Build the site and read all collections and pages from disk.
    pub fn read(config: Configuration) -> Result<Self, SiteError> {
        let mut site = Self::new(config);
        site.read_content()?;
        Ok(site)
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn time(&self) -> DateTime<Local> {
        self.time
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, label: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.label() == label)
    }

    pub fn pages(&self) -> &[DocumentRef] {
        &self.pages
    }

    /// Re-read every collection and page, dropping what was loaded before.
    pub fn read_content(&mut self) -> Result<(), SiteError> {
        let exclude = self.config.exclude();
        let include = self.config.include();

        for index in 0..self.collections.len() {
            let meta = self.collections[index].meta().clone();
            let docs = self.read_collection(&meta, &exclude)?;
            debug!(label = %meta.label, count = docs.len(), "read collection");
            self.collections[index].docs = docs;
        }

        self.pages = self.read_pages(&exclude, &include)?;
        debug!(count = self.pages.len(), "read pages");
        Ok(())
    }

    fn read_collection(
        &self,
        meta: &CollectionMeta,
        exclude: &[String],
    ) -> Result<Vec<DocumentRef>, SiteError> {
        if !meta.directory.is_dir() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        let walker = WalkDir::new(&meta.directory)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name().to_string_lossy().as_ref()));
        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || is_excluded(path, &self.source, exclude) {
                continue;
            }
            if !is_data_file(path) && !opens_with_front_matter(path)? {
                continue;
            }
            if let Some(document) = self.read_document(path, Some(meta.clone())) {
                docs.push(document.into_ref());
            }
        }
        Ok(docs)
    }

    fn read_pages(
        &self,
        exclude: &[String],
        include: &[String],
    ) -> Result<Vec<DocumentRef>, SiteError> {
        if !self.source.is_dir() {
            return Ok(Vec::new());
        }

        let source = self.source.clone();
        let mut pages = Vec::new();
        let walker = WalkDir::new(&self.source)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                let special = name.starts_with('_') || name.starts_with('.');
                (!special || include.iter().any(|i| *i == name))
                    && !is_excluded(e.path(), &source, exclude)
            });
        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, PAGE_EXTENSIONS) {
                continue;
            }
            if !opens_with_front_matter(path)? {
                continue;
            }
            if let Some(document) = self.read_document(path, None) {
                pages.push(document.into_ref());
            }
        }
        Ok(pages)
    }

    /// Read one document, applying the publication filters.
    ///
    /// Unparsable documents are reported and skipped rather than failing the
    /// whole site.
    fn read_document(&self, path: &Path, collection: Option<CollectionMeta>) -> Option<Document> {
        let is_post = collection.as_ref().is_some_and(|c| c.label == "posts");
        let document = match Document::read(path, &self.source, collection, self.time) {
            Ok(document) => document,
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                return None;
            }
        };
        if !document.is_published() && !self.config.unpublished() {
            debug!(path = %path.display(), "skipping unpublished document");
            return None;
        }
        if is_post && !self.config.future() && document.date() > self.time.naive_local() {
            debug!(path = %path.display(), "skipping future-dated post");
            return None;
        }
        Some(document)
    }
}

/// Parse a front matter date value.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS [±zzzz]`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM`, and bare `YYYY-MM-DD` (midnight).
pub fn parse_date_value(value: &Value) -> Option<NaiveDateTime> {
    parse_datetime(value.as_str()?.trim())
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn relative_to(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}

fn is_data_file(path: &Path) -> bool {
    has_extension(path, DATA_EXTENSIONS)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_excluded(path: &Path, source: &Path, exclude: &[String]) -> bool {
    let relative = relative_to(path, source);
    exclude.iter().any(|entry| {
        let entry = entry.trim_end_matches('/');
        !entry.is_empty()
            && (relative == entry
                || relative.starts_with(&format!("{entry}/"))
                || path.file_name().is_some_and(|n| n.to_string_lossy() == entry))
    })
}

fn opens_with_front_matter(path: &Path) -> Result<bool, SiteError> {
    let text = fs::read_to_string(path)?;
    Ok(front_matter::has_front_matter(&text))
}
