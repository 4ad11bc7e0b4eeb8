//! Content models: ActiveRecord-style wrappers around site documents.
//!
//! A [`ContentModel`] binds to one [`Document`](crate::site::Document) and
//! exposes its front matter as dynamic attributes:
//!
//! ```text
//! model.get("title")            → data["title"]
//! model.set("title", "Hello")   → data["title"] = "Hello", changeset += title
//! model.set("content", "Body")  → document body
//! model.save()                  → merge changes into the file on disk
//! model.destroy()               → delete the file, detach the path
//! ```
//!
//! ## Identity
//!
//! A persisted model's [`id`](ContentModel::id) is its source-relative path,
//! base64url-encoded without padding. Lookups accept either that id or the
//! literal relative path: any id containing a `.` is taken literally.
//!
//! ## Saving
//!
//! Saving rewrites only what changed. For a file already on disk, the front
//! matter is re-read, each changed attribute is overwritten with its live
//! value, and keys no longer present on the model are dropped. Everything else
//! keeps its on-disk value and position. New documents get a slugged filename
//! in their collection directory (posts are prefixed with their date).

use crate::changeset::AttributeChangeset;
use crate::front_matter::{self, FrontMatterError};
use crate::naming::{date_prefix, pluralize, slugify};
use crate::site::{Collection, Document, DocumentRef, Site};
use crate::strategy::{ContentKind, ContentStrategy, PAGES_LABEL};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_yaml::{Mapping, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("content model is not bound to a document")]
    Unbound,
    #[error("collection `{0}` not found")]
    CollectionNotFound(String),
    #[error("`{0}` is computed from the document and cannot be assigned")]
    ReadOnlyAttribute(String),
    #[error("YAML front matter not found in {}", .0.display())]
    FrontMatterMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Attribute names answered by the model itself rather than the data mapping.
pub const DECLARED_READERS: &[&str] = &["id", "content", "relative_path", "posted_datetime"];

/// Declared readers with no writer. `set` rejects them, since a stored value
/// would be shadowed on every read.
const READ_ONLY_ATTRIBUTES: &[&str] = &["id", "relative_path", "posted_datetime"];

/// Default sort key for [`ContentModel::find_all`].
pub const DEFAULT_ORDER_BY: &str = "posted_datetime";

/// Sort key that keeps documents in the order the site read them.
pub const USE_CONFIGURED_ORDER: &str = "use_configured";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Hooks run around [`ContentModel::save`] and [`ContentModel::destroy`].
///
/// A `before_*` hook returning `false` vetoes the operation; later hooks in
/// the chain are not run.
pub trait ModelCallbacks {
    fn before_save(&self, _model: &ContentModel) -> bool {
        true
    }

    fn after_save(&self, _model: &ContentModel) {}

    fn before_destroy(&self, _model: &ContentModel) -> bool {
        true
    }

    fn after_destroy(&self, _model: &ContentModel) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

impl OrderDirection {
    /// `"asc"` is ascending; anything else is descending.
    pub fn from_name(name: &str) -> Self {
        if name == "asc" {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        }
    }
}

/// The document list a label resolves to.
enum Group<'a> {
    Pages,
    Collection(&'a Collection),
}

impl<'a> Group<'a> {
    fn resolve(label: &str, site: &'a Site) -> Result<Self, ModelError> {
        if label == "page" || label == PAGES_LABEL {
            return Ok(Group::Pages);
        }
        site.collection(label)
            .or_else(|| site.collection(&pluralize(label)))
            .map(Group::Collection)
            .ok_or_else(|| ModelError::CollectionNotFound(label.to_string()))
    }

    fn docs(&self, site: &'a Site) -> &'a [DocumentRef] {
        match self {
            Group::Pages => site.pages(),
            Group::Collection(collection) => collection.docs(),
        }
    }
}

/// A dynamic-attribute view over one document.
#[derive(Default)]
pub struct ContentModel {
    kind: ContentKind,
    document: Option<DocumentRef>,
    changeset: AttributeChangeset,
    callbacks: Vec<Box<dyn ModelCallbacks>>,
}

impl fmt::Debug for ContentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentModel")
            .field("kind", &self.kind)
            .field("document", &self.describe())
            .field("changeset", &self.changeset)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Wrap a document in the model its collection label resolves to.
pub fn to_content_model(document: &DocumentRef) -> ContentModel {
    ContentModel::new_with_document(Rc::clone(document))
}

impl ContentModel {
    /// An unbound model. Most operations fail with [`ModelError::Unbound`]
    /// until [`wrap_document`](Self::wrap_document) is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_document(document: DocumentRef) -> Self {
        let mut model = Self::new();
        model.wrap_document(document);
        model
    }

    /// A fresh, pathless document in `collection`.
    pub fn new_in_collection(collection: &Collection, site: &Site) -> Self {
        let document = Document::new_unsaved(
            site.source().to_path_buf(),
            Some(collection.meta().clone()),
            site.time(),
        );
        Self::new_with_document(document.into_ref())
    }

    /// A fresh, pathless page.
    pub fn new_in_pages(site: &Site) -> Self {
        let document = Document::new_unsaved(site.source().to_path_buf(), None, site.time());
        Self::new_with_document(document.into_ref())
    }

    /// A fresh model for `label`: `page`/`pages`, a collection label, or
    /// the singular of one (`post` → `posts`).
    pub fn new_via_label(label: &str, site: &Site) -> Result<Self, ModelError> {
        Ok(match Group::resolve(label, site)? {
            Group::Pages => Self::new_in_pages(site),
            Group::Collection(collection) => Self::new_in_collection(collection, site),
        })
    }

    /// Find a document in `group` by id or literal relative path.
    pub fn find_in_group(id: &str, group: &[DocumentRef]) -> Option<Self> {
        let relative_path = decode_id(id)?;
        group
            .iter()
            .find(|doc| doc.borrow().relative_path() == relative_path)
            .map(to_content_model)
    }

    pub fn find_in_collection(id: &str, collection: &Collection) -> Option<Self> {
        Self::find_in_group(id, collection.docs())
    }

    pub fn find_in_pages(id: &str, site: &Site) -> Option<Self> {
        Self::find_in_group(id, site.pages())
    }

    /// Find by id within the group `label` resolves to.
    pub fn find(id: &str, label: &str, site: &Site) -> Result<Option<Self>, ModelError> {
        let group = Group::resolve(label, site)?;
        Ok(Self::find_in_group(id, group.docs(site)))
    }

    /// All persisted models for `label`, newest first.
    pub fn find_all(label: &str, site: &Site) -> Result<Vec<Self>, ModelError> {
        Self::find_all_ordered(label, site, DEFAULT_ORDER_BY, OrderDirection::Desc)
    }

    /// All persisted models for `label`, sorted by `order_by`.
    ///
    /// [`USE_CONFIGURED_ORDER`] keeps the site's order. When the values of
    /// `order_by` cannot be compared across the whole result (a missing key,
    /// mixed types), the models are sorted by `posted_datetime` instead and a
    /// warning is logged. The sorted list is reversed unless `direction` is
    /// ascending.
    pub fn find_all_ordered(
        label: &str,
        site: &Site,
        order_by: &str,
        direction: OrderDirection,
    ) -> Result<Vec<Self>, ModelError> {
        let group = Group::resolve(label, site)?;
        let mut models: Vec<Self> = group
            .docs(site)
            .iter()
            .map(to_content_model)
            .filter(ContentModel::persisted)
            .collect();

        if order_by == USE_CONFIGURED_ORDER {
            return Ok(models);
        }

        let keys: Vec<Option<Value>> = models
            .iter()
            .map(|m| m.read_attribute(order_by))
            .collect();
        if mutually_comparable(&keys) {
            let mut keyed: Vec<(Value, Self)> = keys.into_iter().flatten().zip(models).collect();
            keyed.sort_by(|(a, _), (b, _)| compare_values(a, b).unwrap_or(Ordering::Equal));
            models = keyed.into_iter().map(|(_, model)| model).collect();
        } else {
            warn!(
                "Cannot sort {label} by `{order_by}`: values are missing or not comparable. \
                 Sorting by {DEFAULT_ORDER_BY} instead."
            );
            models.sort_by_key(|m| m.posted_datetime());
        }

        if direction != OrderDirection::Asc {
            models.reverse();
        }
        Ok(models)
    }

    /// Bind this model to `document`, choosing its kind from the registry.
    pub fn wrap_document(&mut self, document: DocumentRef) {
        self.kind = ContentStrategy::resolve_for_document(&document.borrow());
        self.document = Some(document);
    }

    pub fn wrapped_document(&self) -> Option<&DocumentRef> {
        self.document.as_ref()
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Register hooks run around save and destroy.
    pub fn add_callbacks(&mut self, callbacks: impl ModelCallbacks + 'static) {
        self.callbacks.push(Box::new(callbacks));
    }

    pub fn with_callbacks(mut self, callbacks: impl ModelCallbacks + 'static) -> Self {
        self.add_callbacks(callbacks);
        self
    }

    fn document(&self) -> Result<&DocumentRef, ModelError> {
        self.document.as_ref().ok_or(ModelError::Unbound)
    }

    /// Absolute path of the backing file, if one has been assigned.
    pub fn absolute_path_in_source_dir(&self) -> Option<PathBuf> {
        let document = self.document.as_ref()?.borrow();
        let path = document.path()?;
        Some(document.in_source_dir(path))
    }

    /// Whether the model has a path and the file exists.
    pub fn persisted(&self) -> bool {
        self.absolute_path_in_source_dir()
            .is_some_and(|path| path.is_file())
    }

    /// Encoded relative path; `None` until persisted.
    pub fn id(&self) -> Option<String> {
        if !self.persisted() {
            return None;
        }
        let document = self.document.as_ref()?.borrow();
        Some(URL_SAFE_NO_PAD.encode(document.relative_path()))
    }

    pub fn content(&self) -> Option<String> {
        self.document
            .as_ref()
            .map(|doc| doc.borrow().content().to_string())
    }

    pub fn relative_path(&self) -> Option<String> {
        self.document
            .as_ref()
            .map(|doc| doc.borrow().relative_path().to_string())
    }

    /// The document date; midnight of the Unix epoch when unbound.
    pub fn posted_datetime(&self) -> chrono::NaiveDateTime {
        self.document
            .as_ref()
            .map(|doc| doc.borrow().date())
            .unwrap_or_default()
    }

    // =====================================================================
    // Attribute access
    // =====================================================================

    /// Read an attribute: a declared reader, then the data mapping.
    ///
    /// Unknown names log a warning and return `None`.
    pub fn get(&self, name: &str) -> Option<Value> {
        let value = self.read_attribute(name);
        if value.is_none() {
            warn!("Undefined attribute `{name}` on {}", self.describe());
        }
        value
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        let document = self.document.as_ref()?;
        match name {
            "id" => Some(self.id().map(Value::String).unwrap_or(Value::Null)),
            "content" => Some(Value::String(document.borrow().content().to_string())),
            "relative_path" => Some(Value::String(
                document.borrow().relative_path().to_string(),
            )),
            "posted_datetime" => Some(Value::String(
                self.posted_datetime().format(DATETIME_FORMAT).to_string(),
            )),
            _ => document.borrow().data().get(name).cloned(),
        }
    }

    /// Whether `name` can be read or assigned.
    pub fn respond_to(&self, name: &str) -> bool {
        if name.ends_with('=') || DECLARED_READERS.contains(&name) {
            return true;
        }
        self.document
            .as_ref()
            .is_some_and(|doc| doc.borrow().data().contains_key(name))
    }

    /// Assign an attribute and return the stored value.
    ///
    /// A trailing `=` on `name` is ignored. `content` replaces the body;
    /// `id`, `relative_path` and `posted_datetime` are rejected; every other
    /// name is written to the data mapping and recorded as changed.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<Value, ModelError> {
        let name = name.strip_suffix('=').unwrap_or(name);
        let value = value.into();
        let document = self.document()?;
        if READ_ONLY_ATTRIBUTES.contains(&name) {
            return Err(ModelError::ReadOnlyAttribute(name.to_string()));
        }

        if name == "content" {
            let body = match &value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => front_matter::key_to_string(other),
            };
            document.borrow_mut().set_content(body);
            return Ok(value);
        }

        document
            .borrow_mut()
            .data_mut()
            .insert(Value::String(name.to_string()), value.clone());
        self.changeset.will_change(name);
        Ok(value)
    }

    /// `get(name)` when the model responds to it, else `default`. Never warns.
    pub fn fetch(&self, name: &str, default: impl Into<Value>) -> Value {
        self.read_attribute(name)
            .unwrap_or_else(|| default.into())
    }

    /// Snapshot of the data mapping; empty when unbound.
    pub fn attributes(&self) -> Mapping {
        self.document
            .as_ref()
            .map(|doc| doc.borrow().data().clone())
            .unwrap_or_default()
    }

    pub fn attribute_changes(&self) -> &BTreeSet<String> {
        self.changeset.changes()
    }

    pub fn attribute_will_change(&mut self, name: &str) {
        self.changeset.will_change(name);
    }

    // =====================================================================
    // Persistence
    // =====================================================================

    /// Write the document to disk.
    ///
    /// Returns `Ok(false)` when a `before_save` hook vetoes the save.
    pub fn save(&mut self) -> Result<bool, ModelError> {
        let document = Rc::clone(self.document()?);

        if !self.run_before(|c, model| c.before_save(model)) {
            debug!("save of {} vetoed by callback", self.describe());
            return Ok(false);
        }

        if document.borrow().path().is_none() {
            let content_dir = {
                let doc = document.borrow();
                doc.collection()
                    .map(|c| c.directory.clone())
                    .unwrap_or_else(|| doc.source().to_path_buf())
            };
            let filename = self.generate_new_slug()?;
            document
                .borrow_mut()
                .process_absolute_path(Some(content_dir.join(filename)));
        }

        let path = self
            .absolute_path_in_source_dir()
            .ok_or(ModelError::Unbound)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let output = self.file_output_to_write()?;
        fs::write(&path, output)?;
        self.changeset.clear();
        info!("Saved {}", path.display());

        self.run_after(|c, model| c.after_save(model));
        Ok(true)
    }

    /// Delete the backing file and detach the document's path.
    ///
    /// Returns `Ok(false)` without touching the filesystem when the model is
    /// not persisted, or when a `before_destroy` hook vetoes.
    pub fn destroy(&mut self) -> Result<bool, ModelError> {
        if !self.persisted() {
            return Ok(false);
        }
        let document = Rc::clone(self.document()?);

        if !self.run_before(|c, model| c.before_destroy(model)) {
            debug!("destroy of {} vetoed by callback", self.describe());
            return Ok(false);
        }

        let path = self
            .absolute_path_in_source_dir()
            .ok_or(ModelError::Unbound)?;
        fs::remove_file(&path)?;
        document.borrow_mut().process_absolute_path(None);
        info!("Deleted {}", path.display());

        self.run_after(|c, model| c.after_destroy(model));
        Ok(true)
    }

    fn run_before(&self, hook: impl Fn(&dyn ModelCallbacks, &ContentModel) -> bool) -> bool {
        self.callbacks.iter().all(|c| hook(c.as_ref(), self))
    }

    fn run_after(&self, hook: impl Fn(&dyn ModelCallbacks, &ContentModel)) {
        for callbacks in &self.callbacks {
            hook(callbacks.as_ref(), self);
        }
    }

    /// Filename for a document saved for the first time.
    ///
    /// Posts are prefixed with their date. The slug comes from `title`, else
    /// `name`, else `untitled-<unix timestamp>`.
    pub fn generate_new_slug(&self) -> Result<String, ModelError> {
        let document = self.document()?.borrow();
        let prefix = match document.collection() {
            Some(collection) if collection.label == "posts" => date_prefix(document.date().date()),
            _ => String::new(),
        };

        let slug = ["title", "name"]
            .iter()
            .filter_map(|key| document.data().get(*key))
            .map(|value| match value {
                Value::String(s) => slugify(s),
                other => slugify(&front_matter::key_to_string(other)),
            })
            .find(|slug| !slug.is_empty())
            .unwrap_or_else(|| format!("untitled-{}", chrono::Utc::now().timestamp()));

        Ok(format!("{prefix}{slug}.md"))
    }

    /// The front matter to write: on-disk values with changed attributes
    /// applied and removed attributes dropped.
    pub fn processed_front_matter(&self) -> Result<Mapping, ModelError> {
        let document = self.document()?;
        let live = document.borrow().data().clone();

        let path = match self.absolute_path_in_source_dir() {
            Some(path) if path.is_file() => path,
            _ => return Ok(front_matter::stringify_mapping(live)),
        };

        let text = fs::read_to_string(&path)?;
        let yaml = if document.borrow().is_yaml_file() {
            text.as_str()
        } else {
            front_matter::split(&text)
                .map(|(block, _)| block)
                .ok_or_else(|| ModelError::FrontMatterMissing(path.clone()))?
        };
        let mut on_disk = front_matter::parse_mapping(yaml)?;

        for attr in self.changeset.changes() {
            if let Some(value) = live.get(attr.as_str()) {
                on_disk.insert(
                    Value::String(attr.clone()),
                    front_matter::stringify_keys(value.clone()),
                );
            }
        }

        Ok(on_disk
            .into_iter()
            .filter(|(key, _)| live.contains_key(key))
            .collect())
    }

    /// The complete file contents `save` writes.
    pub fn file_output_to_write(&self) -> Result<String, ModelError> {
        let front_matter = self.processed_front_matter()?;
        let document = self.document()?.borrow();
        if document.is_yaml_file() {
            Ok(serde_yaml::to_string(&front_matter)?)
        } else {
            Ok(front_matter::render_document(
                &front_matter,
                document.content(),
            )?)
        }
    }

    fn describe(&self) -> String {
        match &self.document {
            None => "unbound model".to_string(),
            Some(doc) => {
                let doc = doc.borrow();
                if doc.relative_path().is_empty() {
                    format!("unsaved {}", self.kind)
                } else {
                    format!("{} {}", self.kind, doc.relative_path())
                }
            }
        }
    }
}

/// Decode an id to a relative path. Ids containing `.` are literal paths.
fn decode_id(id: &str) -> Option<String> {
    if id.contains('.') {
        return Some(id.to_string());
    }
    let bytes = match URL_SAFE_NO_PAD.decode(id.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(id, %err, "id is not valid base64url");
            return None;
        }
    };
    String::from_utf8(bytes).ok()
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Every key present, and each adjacent pair comparable.
fn mutually_comparable(keys: &[Option<Value>]) -> bool {
    keys.iter().all(Option::is_some)
        && keys.windows(2).all(|pair| match (&pair[0], &pair[1]) {
            (Some(a), Some(b)) => compare_values(a, b).is_some(),
            _ => false,
        })
}
