//! File selection policy for indexing.
//!
//! Pure functions over [`FileDescriptor`] lists. A file is indexable when its
//! extension is whitelisted, its path contains no excluded segment, and it is
//! not oversized. The first failing check excludes the file.

use lode_core::FileDescriptor;

/// Extensions worth indexing: source, markup, config, and shell files.
const INDEXABLE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".jsx", ".ts", ".tsx", ".java", ".go", ".rs", ".cpp", ".c", ".h", ".hpp", ".cs",
    ".php", ".rb", ".swift", ".kt", ".scala", ".sql", ".html", ".css", ".scss", ".less", ".json",
    ".yaml", ".yml", ".xml", ".sh", ".bash", ".zsh",
];

/// Path substrings that disqualify a file: tests and fixtures, dependency
/// and build output directories, version control, IDE metadata.
const EXCLUDED_PATH_SEGMENTS: &[&str] = &[
    "test",
    "spec",
    "mock",
    "fixture",
    "node_modules",
    "__pycache__",
    ".git",
    "dist",
    "build",
    "target",
    "coverage",
    ".vscode",
    ".idea",
];

/// Check a single file against the indexing policy.
///
/// Checks run in order: extension whitelist, path blacklist, size cap.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use lode_core::FileDescriptor;
/// use lode_index::filter::is_indexable;
///
/// let file = FileDescriptor {
///     path: PathBuf::from("src/app.py"),
///     extension: ".py".into(),
///     size: 200,
///     content_preview: String::new(),
///     language: "python".into(),
/// };
/// assert!(is_indexable(&file, 1_048_576));
/// ```
pub fn is_indexable(file: &FileDescriptor, max_file_size: u64) -> bool {
    let extension = file.extension.to_lowercase();
    if !INDEXABLE_EXTENSIONS.contains(&extension.as_str()) {
        return false;
    }

    let path = file.path.to_string_lossy().to_lowercase();
    if EXCLUDED_PATH_SEGMENTS
        .iter()
        .any(|segment| path.contains(segment))
    {
        return false;
    }

    file.size <= max_file_size
}

/// Select the indexable subset of `files`, preserving input order.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use lode_core::FileDescriptor;
/// use lode_index::filter::filter_indexable;
///
/// let files = vec![FileDescriptor {
///     path: PathBuf::from("README.exe"),
///     extension: ".exe".into(),
///     size: 10,
///     content_preview: String::new(),
///     language: "unknown".into(),
/// }];
/// assert!(filter_indexable(&files, 1_048_576).is_empty());
/// ```
pub fn filter_indexable(files: &[FileDescriptor], max_file_size: u64) -> Vec<FileDescriptor> {
    files
        .iter()
        .filter(|f| is_indexable(f, max_file_size))
        .cloned()
        .collect()
}
