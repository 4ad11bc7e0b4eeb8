//! Shared test utilities for the quire test suite.
//!
//! Provides an isolated copy of the fixture site, lookups that panic with a
//! useful message on miss, and capture of `tracing` output.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let site = fixture_site(&tmp);
//!
//! let post = find_doc(&site, "posts", "_posts/2020-01-01-first-post.md");
//! let (value, logs) = capture_logs(|| to_content_model(&post).get("missing"));
//! assert!(logs.contains("missing"));
//! ```

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::config::load_config;
use crate::site::{DocumentRef, Site};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Load the configuration in `tmp` and read the site.
pub fn fixture_site(tmp: &TempDir) -> Site {
    let config = load_config(tmp.path(), &[]).unwrap();
    Site::read(config).unwrap()
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a document by relative path in a collection, or in the pages for
/// `"pages"`. Panics if not found.
pub fn find_doc(site: &Site, label: &str, relative_path: &str) -> DocumentRef {
    let docs = if label == "pages" {
        site.pages()
    } else {
        site.collection(label)
            .unwrap_or_else(|| panic!("collection '{label}' not found"))
            .docs()
    };
    docs.iter()
        .find(|d| d.borrow().relative_path() == relative_path)
        .cloned()
        .unwrap_or_else(|| {
            let paths: Vec<String> = docs
                .iter()
                .map(|d| d.borrow().relative_path().to_string())
                .collect();
            panic!("document '{relative_path}' not found in '{label}'. Available: {paths:?}")
        })
}

// =========================================================================
// Log capture
// =========================================================================

#[derive(Clone)]
struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return its result along with
/// everything logged at `WARN` or above.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let writer = CaptureWriter(Arc::clone(&buffer));
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.lock().unwrap()).to_string();
    (result, logs)
}
