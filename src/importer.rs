//! Stylesheet resolution
//!
//! An [`Importer`] turns the URL written in `@import`/`@use`/`@forward` into
//! a canonical location and loads its contents. Importers are consulted in
//! order; a miss (`Ok(None)`) falls through to the next one and finally to
//! the compiler's load paths.

use crate::error::Result;
use crate::preprocessor::Syntax;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["scss", "sass", "css"];

#[derive(Debug, Clone, PartialEq)]
pub struct ImporterResult {
    pub contents: String,
    pub syntax: Syntax,
}

pub trait Importer: Send + Sync {
    /// Resolve `url` as written in `containing`'s directory (when known)
    fn canonicalize(&self, url: &str, containing: Option<&Path>) -> Result<Option<PathBuf>>;

    fn load(&self, canonical: &Path) -> Result<Option<ImporterResult>>;
}

impl fmt::Debug for dyn Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Importer")
    }
}

/// Resolves references on disk relative to the referencing document,
/// falling back to a fixed base directory for documents without a location.
#[derive(Debug, Clone)]
pub struct RelativeImporter {
    base: PathBuf,
}

impl RelativeImporter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl Importer for RelativeImporter {
    fn canonicalize(&self, url: &str, containing: Option<&Path>) -> Result<Option<PathBuf>> {
        let dir = containing.unwrap_or(&self.base);
        let found = find_in_directory(dir, url);
        if let Some(path) = &found {
            log::debug!("Resolved '{}' to {}", url, path.display());
        }
        Ok(found)
    }

    fn load(&self, canonical: &Path) -> Result<Option<ImporterResult>> {
        load_file(canonical).map(Some)
    }
}

/// Read a resolved stylesheet from disk, inferring its syntax
pub fn load_file(path: &Path) -> Result<ImporterResult> {
    let contents = fs::read_to_string(path)?;
    Ok(ImporterResult {
        contents,
        syntax: Syntax::from_path(path),
    })
}

/// First existing candidate for `url` inside `dir`
pub fn find_in_directory(dir: &Path, url: &str) -> Option<PathBuf> {
    candidates(url)
        .into_iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
        .map(|path| fs::canonicalize(&path).unwrap_or(path))
}

/// Candidate file names for a reference, in lookup order: partial before
/// plain, then the directory index forms; `scss`, `sass`, `css` for each.
pub fn candidates(url: &str) -> Vec<PathBuf> {
    let path = Path::new(url);
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return Vec::new(),
    };

    let explicit = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| EXTENSIONS.contains(e));

    match explicit {
        Some(_) => vec![dir.join(format!("_{}", stem)), dir.join(stem)],
        None => {
            let mut found = Vec::with_capacity(EXTENSIONS.len() * 4);
            for ext in EXTENSIONS {
                found.push(dir.join(format!("_{}.{}", stem, ext)));
                found.push(dir.join(format!("{}.{}", stem, ext)));
            }
            for ext in EXTENSIONS {
                found.push(dir.join(stem).join(format!("_index.{}", ext)));
                found.push(dir.join(stem).join(format!("index.{}", ext)));
            }
            found
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_order() {
        let names: Vec<String> = candidates("theme/colors")
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names[0], "theme/_colors.scss");
        assert_eq!(names[1], "theme/colors.scss");
        assert_eq!(names[2], "theme/_colors.sass");
        assert_eq!(names[6], "theme/colors/_index.scss");
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn test_explicit_extension() {
        let names = candidates("reset.css");
        assert_eq!(names, vec![PathBuf::from("_reset.css"), PathBuf::from("reset.css")]);
    }

    #[test]
    fn test_relative_importer_prefers_partials() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("_vars.scss"), "$a: 1;").unwrap();
        fs::write(temp_dir.path().join("vars.scss"), "$a: 2;").unwrap();

        let importer = RelativeImporter::new(temp_dir.path());
        let canonical = importer.canonicalize("vars", None).unwrap().unwrap();
        assert!(canonical.ends_with("_vars.scss"));

        let loaded = importer.load(&canonical).unwrap().unwrap();
        assert_eq!(loaded.contents, "$a: 1;");
        assert_eq!(loaded.syntax, Syntax::Scss);
    }

    #[test]
    fn test_relative_importer_uses_containing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("_inner.sass"), "$b: 2").unwrap();

        let importer = RelativeImporter::new(temp_dir.path());
        assert!(importer.canonicalize("inner", None).unwrap().is_none());

        let canonical = importer.canonicalize("inner", Some(&nested)).unwrap().unwrap();
        assert_eq!(importer.load(&canonical).unwrap().unwrap().syntax, Syntax::Indented);
    }

    #[test]
    fn test_index_files() {
        let temp_dir = TempDir::new().unwrap();
        let module = temp_dir.path().join("tokens");
        fs::create_dir(&module).unwrap();
        fs::write(module.join("_index.scss"), "$c: 3;").unwrap();

        let found = find_in_directory(temp_dir.path(), "tokens").unwrap();
        assert!(found.ends_with("tokens/_index.scss"));
    }

    #[test]
    fn test_miss_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let importer = RelativeImporter::new(temp_dir.path());
        assert!(importer.canonicalize("missing", None).unwrap().is_none());
    }
}
