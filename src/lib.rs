//! # Quire
//!
//! Front-matter content models for static sites. Every document is a file
//! that opens with a YAML block followed by a free-form body; quire reads
//! them into a site, wraps each one in a [`model::ContentModel`] with dynamic
//! attributes, and writes changes back with the smallest possible edit to the
//! front matter.
//!
//! # Architecture
//!
//! ```text
//! config       quire.config.yml  →  Configuration   (layered defaults + files + env)
//! site         src/              →  Site            (collections + pages of Documents)
//! model        Document          →  ContentModel    (get / set / save / destroy)
//! ```
//!
//! The site owns its documents as shared handles
//! ([`site::DocumentRef`]); models mutate a document's data in place, so a
//! change made through one model is visible through the site and every other
//! model wrapping the same document.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`front_matter`] | Front matter block detection, YAML mapping parse and render |
//! | [`naming`] | `YYYY-MM-DD-slug` filename convention, slugs, label plurals |
//! | [`platform`] | Host platform detection, including Windows' Linux subsystem |
//! | [`config`] | Config file discovery, layered merge, defaults, validation |
//! | [`site`] | Documents, collections, and the site read from disk |
//! | [`changeset`] | Names of attributes assigned since the last save |
//! | [`strategy`] | Collection label → model kind registry |
//! | [`model`] | Content models: lookup, attribute access, persistence, hooks |
//! | [`output`] | CLI output formatting of models |
//!
//! # Design Decisions
//!
//! ## Minimal Front Matter Rewrites
//!
//! Saving a document that already exists re-reads its front matter from
//! disk and applies only the attributes assigned since the last save. Keys
//! edited by hand in the meantime keep their on-disk values, and key order
//! is preserved, so diffs stay small.
//!
//! ## Opaque Ids, Literal Paths
//!
//! A document's id is its relative path in URL-safe base64. Lookups also
//! accept the literal path: an id containing `.` is never decoded. This keeps
//! ids safe in URLs without making the CLI awkward to use by hand.
//!
//! ## Models by Label
//!
//! Which model wraps a document is decided by its collection label through a
//! process-wide registry ([`strategy::ContentStrategy`]). `posts` and `pages`
//! are registered by default; applications register their own labels.

pub mod changeset;
pub mod config;
pub mod front_matter;
pub mod model;
pub mod naming;
pub mod output;
pub mod platform;
pub mod site;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_helpers;
