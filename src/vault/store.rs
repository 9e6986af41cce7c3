// file: src/vault/store.rs
// description: markdown note operations against a configured vault root
// reference: filesystem note storage (Obsidian vault layout)

use crate::error::{Result, ServerError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Operations over a vault: a directory tree of `.md` notes. Constructed
/// only once a root is configured; the configuration check itself lives at
/// the tool boundary.
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a note path onto the root and canonicalize it, following `..`
    /// and symlinks. The result is not checked for containment within the
    /// root (see DESIGN.md); the target must exist for canonicalization to
    /// succeed, which read and append require anyway.
    pub fn resolve_note_path(&self, note_path: &str) -> std::io::Result<PathBuf> {
        fs::canonicalize(self.root.join(note_path))
    }

    /// Read the full text of an existing `.md` note. Anything else — a
    /// missing path, a directory, a non-markdown extension — is NotFound.
    pub fn read_note(&self, note_path: &str) -> Result<String> {
        let full_path = self
            .resolve_note_path(note_path)
            .map_err(|_| not_found(note_path))?;

        if !is_markdown(&full_path) || !full_path.is_file() {
            return Err(not_found(note_path));
        }

        debug!("Reading note: {}", full_path.display());
        Ok(fs::read_to_string(&full_path)?)
    }

    /// Create or overwrite a note, appending the `.md` extension when the
    /// caller left it off and creating missing parent directories. Returns
    /// the absolute path written.
    pub fn create_note(&self, relative_path: &str, content: &str) -> Result<PathBuf> {
        let relative_path = if relative_path.ends_with(".md") {
            relative_path.to_string()
        } else {
            format!("{}.md", relative_path)
        };

        let full_path = self.root.join(&relative_path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)?;

        debug!("Wrote note: {}", full_path.display());
        Ok(full_path)
    }

    /// Append text to an existing note. The target must already exist, be
    /// a regular file, and carry an `.md` extension (case-insensitive);
    /// otherwise fails without creating anything. With `ensure_newline`, a
    /// note whose content does not end in `\n` gets one before the
    /// appended text. Existing content is never rewritten.
    pub fn append_note(&self, note_path: &str, text: &str, ensure_newline: bool) -> Result<()> {
        let full_path = self
            .resolve_note_path(note_path)
            .map_err(|_| not_found(note_path))?;

        let is_md = full_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if !full_path.is_file() || !is_md {
            warn!("Append target is not an existing markdown note: {}", note_path);
            return Err(not_found(note_path));
        }

        let needs_newline = if ensure_newline {
            let current = fs::read_to_string(&full_path)?;
            !current.is_empty() && !current.ends_with('\n')
        } else {
            false
        };

        let mut file = OpenOptions::new().append(true).open(&full_path)?;
        if needs_newline {
            file.write_all(b"\n")?;
        }
        file.write_all(text.as_bytes())?;

        debug!("Appended {} bytes to {}", text.len(), full_path.display());
        Ok(())
    }
}

// Case-sensitive on purpose: reads have always required a lowercase
// extension, while appends accept any casing.
fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

fn not_found(note_path: &str) -> ServerError {
    ServerError::NotFound(note_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn vault() -> (TempDir, VaultStore) {
        let temp = TempDir::new().unwrap();
        let store = VaultStore::new(temp.path().to_path_buf());
        (temp, store)
    }

    #[test]
    fn test_create_then_read_round_trip() {
        let (_temp, store) = vault();

        store.create_note("x", "hello").unwrap();
        assert_eq!(store.read_note("x.md").unwrap(), "hello");
    }

    #[test]
    fn test_create_does_not_double_extension() {
        let (temp, store) = vault();

        let path = store.create_note("note.md", "body").unwrap();
        assert_eq!(path, temp.path().join("note.md"));
        assert!(!temp.path().join("note.md.md").exists());
    }

    #[test]
    fn test_create_makes_parent_directories() {
        let (temp, store) = vault();

        let path = store.create_note("daily/2025/06-07", "entry").unwrap();
        assert_eq!(path, temp.path().join("daily/2025/06-07.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "entry");
    }

    #[test]
    fn test_create_overwrites_existing() {
        let (_temp, store) = vault();

        store.create_note("x", "first").unwrap();
        store.create_note("x", "second").unwrap();
        assert_eq!(store.read_note("x.md").unwrap(), "second");
    }

    #[test]
    fn test_read_rejects_non_markdown() {
        let (temp, store) = vault();

        fs::write(temp.path().join("data.txt"), "exists").unwrap();
        let err = store.read_note("data.txt").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_rejects_directory() {
        let (temp, store) = vault();

        fs::create_dir(temp.path().join("folder.md")).unwrap();
        assert!(store.read_note("folder.md").unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_missing_note() {
        let (_temp, store) = vault();
        assert!(store.read_note("nope.md").unwrap_err().is_not_found());
    }

    #[test]
    fn test_append_inserts_newline_when_missing() {
        let (_temp, store) = vault();

        store.create_note("a", "a").unwrap();
        store.append_note("a.md", "b", true).unwrap();
        assert_eq!(store.read_note("a.md").unwrap(), "a\nb");
    }

    #[test]
    fn test_append_no_extra_blank_line() {
        let (_temp, store) = vault();

        store.create_note("a", "a\n").unwrap();
        store.append_note("a.md", "b", true).unwrap();
        assert_eq!(store.read_note("a.md").unwrap(), "a\nb");
    }

    #[test]
    fn test_append_to_empty_note_adds_nothing_extra() {
        let (_temp, store) = vault();

        store.create_note("empty", "").unwrap();
        store.append_note("empty.md", "first line", true).unwrap();
        assert_eq!(store.read_note("empty.md").unwrap(), "first line");
    }

    #[test]
    fn test_append_without_ensure_newline() {
        let (_temp, store) = vault();

        store.create_note("a", "a").unwrap();
        store.append_note("a.md", "b", false).unwrap();
        assert_eq!(store.read_note("a.md").unwrap(), "ab");
    }

    #[test]
    fn test_append_missing_note_creates_nothing() {
        let (temp, store) = vault();

        let err = store.append_note("ghost.md", "text", true).unwrap_err();
        assert!(err.is_not_found());
        assert!(!temp.path().join("ghost.md").exists());
    }

    #[test]
    fn test_append_accepts_uppercase_extension() {
        let (temp, store) = vault();

        fs::write(temp.path().join("NOTE.MD"), "x").unwrap();
        store.append_note("NOTE.MD", "y", true).unwrap();
        assert_eq!(fs::read_to_string(temp.path().join("NOTE.MD")).unwrap(), "x\ny");
    }

    #[test]
    fn test_append_rejects_non_markdown_file() {
        let (temp, store) = vault();

        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        assert!(store.append_note("notes.txt", "y", true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_resolve_requires_existing_target() {
        let (temp, store) = vault();

        fs::write(temp.path().join("real.md"), "x").unwrap();
        assert!(store.resolve_note_path("real.md").is_ok());
        assert!(store.resolve_note_path("missing.md").is_err());
    }
}
