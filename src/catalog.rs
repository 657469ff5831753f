//! Maps document identifiers to PDF files under a root directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::Result;

const ALLOWED_EXTENSIONS: [&str; 1] = ["pdf"];

/// Whether a file name carries an accepted document extension.
pub fn is_allowed_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Documents found under a root directory, keyed by file stem. Built once by
/// [`DocumentCatalog::initialize`].
#[derive(Debug, Clone)]
pub struct DocumentCatalog {
    root: PathBuf,
    documents: BTreeMap<String, PathBuf>,
    initialized: bool,
}

impl DocumentCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents: BTreeMap::new(),
            initialized: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Scan the root directory. Later calls are no-ops once a scan has
    /// succeeded; a missing root is logged and leaves the catalog empty.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        if !self.root.is_dir() {
            error!(root = %self.root.display(), "document root does not exist");
            return Ok(());
        }

        let mut documents = BTreeMap::new();
        for path in scan_dir(&self.root)? {
            let allowed = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_allowed_file);
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if allowed {
                documents.entry(stem.to_string()).or_insert(path);
            }
        }
        info!(root = %self.root.display(), documents = documents.len(), "catalog initialized");
        self.documents = documents;
        self.initialized = true;
        Ok(())
    }

    /// Document identifiers in sorted order.
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn path(&self, id: &str) -> Option<&Path> {
        self.documents.get(id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // `file_type` does not follow symlinks.
        if entry.file_type()?.is_dir() {
            files.extend(scan_dir(&entry.path())?);
        } else {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    use pretty_assertions::assert_eq;

    fn temp_dir(prefix: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}-{}-{now}", std::process::id()))
    }

    #[test]
    fn allowed_extensions_ignore_case() {
        assert!(is_allowed_file("contract.pdf"));
        assert!(is_allowed_file("CONTRACT.PDF"));
        assert!(!is_allowed_file("contract.docx"));
        assert!(!is_allowed_file("pdf"));
    }

    #[test]
    fn scans_recursively_and_is_idempotent() -> anyhow::Result<()> {
        let root = temp_dir("parabox-catalog");
        fs::create_dir_all(root.join("nested"))?;
        fs::write(root.join("lease.pdf"), b"%PDF-1.4")?;
        fs::write(root.join("nested/Supply.PDF"), b"%PDF-1.4")?;
        fs::write(root.join("notes.txt"), b"ignored")?;

        let mut catalog = DocumentCatalog::new(&root);
        catalog.initialize()?;
        assert_eq!(catalog.documents().collect::<Vec<_>>(), vec!["Supply", "lease"]);
        assert_eq!(catalog.path("lease"), Some(root.join("lease.pdf").as_path()));

        fs::write(root.join("late.pdf"), b"%PDF-1.4")?;
        catalog.initialize()?;
        assert_eq!(catalog.len(), 2);

        let _ = fs::remove_dir_all(&root);
        Ok(())
    }

    #[test]
    fn missing_root_leaves_catalog_uninitialized() -> anyhow::Result<()> {
        let mut catalog = DocumentCatalog::new(temp_dir("parabox-missing"));
        catalog.initialize()?;
        assert!(!catalog.is_initialized());
        assert!(catalog.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn directory_symlink_loop_terminates() -> anyhow::Result<()> {
        let root = temp_dir("parabox-catalog-loop");
        fs::create_dir_all(&root)?;
        fs::write(root.join("lease.pdf"), b"%PDF-1.4")?;
        std::os::unix::fs::symlink(&root, root.join("loop"))?;

        let mut catalog = DocumentCatalog::new(&root);
        catalog.initialize()?;
        assert!(catalog.is_initialized());
        assert_eq!(catalog.documents().collect::<Vec<_>>(), vec!["lease"]);

        let _ = fs::remove_dir_all(&root);
        Ok(())
    }
}
