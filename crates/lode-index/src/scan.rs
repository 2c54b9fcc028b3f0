//! Repository scanning: discover candidate files for indexing.
//!
//! Walks a directory tree respecting `.gitignore`, skips binaries, and
//! produces [`FileDescriptor`]s for the filter and coordinator. Indexability
//! itself is decided later by [`crate::filter`]; the scanner only rules out
//! what can never be chunked (binary content, unreadable entries).

use std::path::Path;

use lode_core::{FileDescriptor, LodeError};
use tracing::debug;

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// Length of the content preview carried on a descriptor.
const PREVIEW_CHARS: usize = 200;

/// Map a file extension (without the dot, lowercase) to a language name.
///
/// # Examples
///
/// ```
/// use lode_index::scan::language_for_extension;
///
/// assert_eq!(language_for_extension("py"), "python");
/// assert_eq!(language_for_extension("tsx"), "typescript");
/// assert_eq!(language_for_extension("weird"), "unknown");
/// ```
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "go" => "go",
        "rs" => "rust",
        "c" | "h" => "c",
        "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sql" => "sql",
        "html" => "html",
        "css" | "scss" | "less" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "sh" | "bash" | "zsh" => "shell",
        _ => "unknown",
    }
}

/// Walk a directory tree and describe every readable text file.
///
/// Respects `.gitignore`. Binary files (null bytes in the first 8 KB) and
/// unreadable entries are skipped silently. Results are sorted by path so
/// repeated scans of the same tree are deterministic.
///
/// # Errors
///
/// Returns [`LodeError::Io`] if the root itself is not a directory.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use lode_index::scan::scan_directory;
///
/// let files = scan_directory(Path::new(".")).unwrap();
/// for f in &files {
///     println!("{} ({})", f.path.display(), f.language);
/// }
/// ```
pub fn scan_directory(root: &Path) -> Result<Vec<FileDescriptor>, LodeError> {
    if !root.is_dir() {
        return Err(LodeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", root.display()),
        )));
    }

    let walker = ignore::WalkBuilder::new(root).build();
    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("skipping walk entry: {e}");
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => continue,
        };

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => continue,
        };

        // Null bytes in the first 8KB mean binary content
        let check_len = content.len().min(BINARY_CHECK_SIZE);
        if content.as_bytes()[..check_len].contains(&0) {
            continue;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        files.push(FileDescriptor {
            path: path.to_path_buf(),
            extension: format!(".{ext}"),
            size: metadata.len(),
            content_preview: content.chars().take(PREVIEW_CHARS).collect(),
            language: language_for_extension(&ext).to_string(),
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn make_temp_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/app.py"), "def hello(): pass").unwrap();
        fs::write(root.join("src/util.js"), "const x = 1;").unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("README.md"), "# Hello").unwrap();

        dir
    }

    #[test]
    fn scan_describes_files_with_language() {
        let dir = make_temp_repo();
        let files = scan_directory(dir.path()).unwrap();

        assert_eq!(files.len(), 4);
        let python = files
            .iter()
            .find(|f| f.path.ends_with("app.py"))
            .unwrap();
        assert_eq!(python.extension, ".py");
        assert_eq!(python.language, "python");
        assert_eq!(python.content_preview, "def hello(): pass");
        assert_eq!(python.size, 17);
    }

    #[test]
    fn scan_results_are_sorted_by_path() {
        let dir = make_temp_repo();
        let files = scan_directory(dir.path()).unwrap();

        let paths: Vec<&PathBuf> = files.iter().map(|f| &f.path).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn scan_respects_gitignore() {
        let dir = make_temp_repo();
        let root = dir.path();

        // The ignore crate needs a .git dir to recognize .gitignore files
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::write(root.join("build/generated.py"), "def ignored(): pass").unwrap();
        fs::write(root.join(".gitignore"), "build/\n").unwrap();

        let files = scan_directory(root).unwrap();
        for f in &files {
            assert!(
                !f.path
                    .components()
                    .any(|c| c.as_os_str() == "build"),
                "gitignored file should be skipped: {}",
                f.path.display()
            );
        }
    }

    #[test]
    fn scan_skips_binary_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let mut binary_content = b"def main(): ".to_vec();
        binary_content.push(0);
        fs::write(root.join("binary.py"), &binary_content).unwrap();
        fs::write(root.join("normal.py"), "def normal(): pass").unwrap();

        let files = scan_directory(root).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("normal.py"));
    }

    #[test]
    fn scan_of_missing_root_is_an_error() {
        assert!(scan_directory(Path::new("/no/such/dir/lodestone")).is_err());
    }

    #[test]
    fn extension_without_dot_maps_to_unknown() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Makefile"), "all:\n\ttrue\n").unwrap();

        let files = scan_directory(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension, ".");
        assert_eq!(files[0].language, "unknown");
    }
}
