//! Structural chunk extraction with a language-keyed strategy registry.
//!
//! Splits file content into chunks approximating logical units so each
//! indexed unit is self-contained. Whitespace-significant languages use
//! indentation tracking, brace-delimited languages use brace counting, and
//! everything else falls back to a sliding character window. A structural
//! pass that produces nothing falls back to the window silently; chunking
//! never fails.

use std::collections::{BTreeSet, HashMap};

use lode_core::{ChunkType, FileDescriptor, IndexConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract;

/// A chunk of code with extracted metadata, produced once at indexing time
/// and never mutated.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use lode_core::{FileDescriptor, IndexConfig};
/// use lode_index::chunker::ChunkExtractor;
///
/// let extractor = ChunkExtractor::new(&IndexConfig::default());
/// let file = FileDescriptor {
///     path: PathBuf::from("src/app.py"),
///     extension: ".py".into(),
///     size: 64,
///     content_preview: "def handler(event):\n    return dispatch(event)\n\nqueue = []\n".into(),
///     language: "python".into(),
/// };
/// let chunks = extractor.extract(&file);
/// assert_eq!(chunks[0].functions, vec!["handler"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    /// Path of the source file.
    pub file_path: std::path::PathBuf,
    /// Classification, first matching rule wins.
    pub chunk_type: ChunkType,
    /// Raw chunk text.
    pub content: String,
    /// First line of the chunk (1-indexed, inclusive).
    pub start_line: u32,
    /// Last line of the chunk (1-indexed, inclusive).
    pub end_line: u32,
    /// Language tag of the source file.
    pub language: String,
    /// Function names in order of appearance.
    pub functions: Vec<String>,
    /// Class names in order of appearance.
    pub classes: Vec<String>,
    /// Import identifiers referenced by the chunk.
    pub imports: BTreeSet<String>,
    /// Derived measurements and content hash.
    pub metadata: ChunkMetadata,
}

/// Derived chunk measurements.
///
/// `content_hash` is a deterministic SHA-256 of the content, enabling
/// dedupe and idempotence checks downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Number of lines in the chunk.
    pub line_count: usize,
    /// Number of characters in the chunk.
    pub char_count: usize,
    /// SHA-256 hex digest of the content.
    pub content_hash: String,
}

/// A contiguous text span with 1-based inclusive line bounds.
#[derive(Debug, Clone)]
pub struct Span {
    /// The span's text.
    pub text: String,
    /// First line (1-indexed).
    pub start_line: u32,
    /// Last line (1-indexed).
    pub end_line: u32,
}

/// A chunking strategy over raw content.
///
/// Returns `None` when the structural pass produced nothing usable; the
/// registry then falls back to the sliding window. Implementations must
/// never panic on arbitrary input.
pub trait ChunkStrategy: Send + Sync {
    /// Split content into spans.
    fn chunk(&self, content: &str) -> Option<Vec<Span>>;
}

/// Indentation-tracking strategy for whitespace-significant languages.
///
/// A chunk boundary is flushed when a non-blank line returns to column zero
/// after indented lines, i.e. when a top-level suite ends. Remaining
/// buffered lines are flushed at end of file. Blank separator lines are
/// trimmed from chunk edges.
pub struct IndentationStrategy;

impl ChunkStrategy for IndentationStrategy {
    fn chunk(&self, content: &str) -> Option<Vec<Span>> {
        let mut spans = Vec::new();
        let mut buffer: Vec<(u32, &str)> = Vec::new();
        let mut prev_indent = 0usize;

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx as u32 + 1;
            if !line.trim().is_empty() {
                let indent = line.len() - line.trim_start().len();
                if indent == 0 && prev_indent > 0 && !buffer.is_empty() {
                    flush(&mut buffer, &mut spans);
                }
                prev_indent = indent;
            }
            buffer.push((line_no, line));
        }
        flush(&mut buffer, &mut spans);

        if spans.is_empty() {
            None
        } else {
            Some(spans)
        }
    }
}

/// Brace-counting strategy for brace-delimited languages.
///
/// Maintains a running `{`/`}` balance. A boundary opens on any non-comment
/// line at zero balance when the buffer already holds content. Chunks are
/// never split while the balance is non-zero.
pub struct BraceStrategy;

impl ChunkStrategy for BraceStrategy {
    fn chunk(&self, content: &str) -> Option<Vec<Span>> {
        let mut spans = Vec::new();
        let mut buffer: Vec<(u32, &str)> = Vec::new();
        let mut balance: i64 = 0;

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx as u32 + 1;
            let trimmed = line.trim();
            let has_content = buffer.iter().any(|(_, l)| !l.trim().is_empty());
            if balance == 0 && has_content && !trimmed.starts_with("//") {
                flush(&mut buffer, &mut spans);
            }
            balance += line.matches('{').count() as i64;
            balance -= line.matches('}').count() as i64;
            buffer.push((line_no, line));
        }
        flush(&mut buffer, &mut spans);

        if spans.is_empty() {
            None
        } else {
            Some(spans)
        }
    }
}

/// Emit the buffered lines as a span, trimming blank lines from both edges.
/// Clears the buffer either way.
fn flush(buffer: &mut Vec<(u32, &str)>, spans: &mut Vec<Span>) {
    let first = buffer.iter().position(|(_, l)| !l.trim().is_empty());
    let last = buffer.iter().rposition(|(_, l)| !l.trim().is_empty());
    if let (Some(first), Some(last)) = (first, last) {
        let kept = &buffer[first..=last];
        let text = kept
            .iter()
            .map(|(_, l)| *l)
            .collect::<Vec<_>>()
            .join("\n");
        spans.push(Span {
            text,
            start_line: kept[0].0,
            end_line: kept[kept.len() - 1].0,
        });
    }
    buffer.clear();
}

/// Sliding character window with fixed overlap, the default for unmapped
/// languages and the fallback when a structural pass yields nothing.
pub struct WindowStrategy {
    chunk_size: usize,
    overlap: usize,
}

impl WindowStrategy {
    /// Create a window strategy with the given size and overlap (characters).
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    fn windows(&self, content: &str) -> Vec<Span> {
        let offsets: Vec<usize> = content.char_indices().map(|(i, _)| i).collect();
        let total = offsets.len();
        // Guard against a zero or negative step when overlap >= chunk_size.
        let step = self.chunk_size.saturating_sub(self.overlap).max(1);

        let mut spans = Vec::new();
        let mut start = 0usize;
        while start < total {
            let end = (start + self.chunk_size).min(total);
            let byte_start = offsets[start];
            let byte_end = if end == total {
                content.len()
            } else {
                offsets[end]
            };
            let text = &content[byte_start..byte_end];
            let start_line = content[..byte_start].matches('\n').count() as u32 + 1;
            let end_line = start_line + text.matches('\n').count() as u32;
            spans.push(Span {
                text: text.to_string(),
                start_line,
                end_line,
            });
            if end == total {
                break;
            }
            start += step;
        }
        spans
    }
}

impl ChunkStrategy for WindowStrategy {
    fn chunk(&self, content: &str) -> Option<Vec<Span>> {
        Some(self.windows(content))
    }
}

/// Registry mapping language tags to chunking strategies, with a sliding
/// window fallback for unmapped tags and failed structural passes.
///
/// # Examples
///
/// ```
/// use lode_core::IndexConfig;
/// use lode_index::chunker::ChunkExtractor;
///
/// let extractor = ChunkExtractor::new(&IndexConfig::default());
/// assert!(extractor.has_structural_strategy("python"));
/// assert!(!extractor.has_structural_strategy("cobol"));
/// ```
pub struct ChunkExtractor {
    strategies: HashMap<&'static str, Box<dyn ChunkStrategy>>,
    fallback: WindowStrategy,
    min_chunk_chars: usize,
}

impl ChunkExtractor {
    /// Build the registry from configuration.
    pub fn new(config: &IndexConfig) -> Self {
        let mut strategies: HashMap<&'static str, Box<dyn ChunkStrategy>> = HashMap::new();
        strategies.insert("python", Box::new(IndentationStrategy));
        for language in [
            "javascript",
            "typescript",
            "java",
            "c",
            "cpp",
            "csharp",
            "go",
            "rust",
            "php",
            "kotlin",
            "swift",
            "scala",
        ] {
            strategies.insert(language, Box::new(BraceStrategy));
        }

        Self {
            strategies,
            fallback: WindowStrategy::new(config.chunk_size, config.chunk_overlap),
            min_chunk_chars: config.min_chunk_chars,
        }
    }

    /// Whether `language` maps to a structural strategy (vs the fallback).
    pub fn has_structural_strategy(&self, language: &str) -> bool {
        self.strategies.contains_key(language)
    }

    /// Split a file into chunks.
    ///
    /// Content shorter than the configured minimum yields no chunks. A
    /// structural strategy that produces nothing falls back to the sliding
    /// window for this file; the outcome is logged, never an error.
    pub fn extract(&self, file: &FileDescriptor) -> Vec<CodeChunk> {
        let content = &file.content_preview;
        if content.chars().count() < self.min_chunk_chars {
            return Vec::new();
        }

        let spans = match self.strategies.get(file.language.as_str()) {
            Some(strategy) => match strategy.chunk(content) {
                Some(spans) => spans,
                None => {
                    debug!(
                        path = %file.path.display(),
                        language = %file.language,
                        "structural chunking produced nothing, using window fallback"
                    );
                    self.fallback.windows(content)
                }
            },
            None => self.fallback.windows(content),
        };

        spans
            .into_iter()
            .map(|span| build_chunk(file, span))
            .collect()
    }
}

fn build_chunk(file: &FileDescriptor, span: Span) -> CodeChunk {
    let functions = extract::function_names(&span.text, &file.language);
    let classes = extract::class_names(&span.text, &file.language);
    let imports = extract::import_names(&span.text, &file.language);
    let chunk_type = extract::classify(&span.text, &functions, &classes);
    let metadata = ChunkMetadata {
        line_count: span.text.matches('\n').count() + 1,
        char_count: span.text.chars().count(),
        content_hash: extract::content_hash(&span.text),
    };

    CodeChunk {
        file_path: file.path.clone(),
        chunk_type,
        content: span.text,
        start_line: span.start_line,
        end_line: span.end_line,
        language: file.language.clone(),
        functions,
        classes,
        imports,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extractor() -> ChunkExtractor {
        ChunkExtractor::new(&IndexConfig::default())
    }

    fn file(path: &str, language: &str, content: &str) -> FileDescriptor {
        FileDescriptor {
            path: PathBuf::from(path),
            extension: format!(
                ".{}",
                PathBuf::from(path)
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default()
            ),
            size: content.len() as u64,
            content_preview: content.to_string(),
            language: language.into(),
        }
    }

    #[test]
    fn two_python_functions_become_two_spans() {
        let content = "def foo():\n    return 1\n\ndef bar():\n    return 2\n";
        let spans = IndentationStrategy.chunk(content).unwrap();

        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start_line, spans[0].end_line), (1, 2));
        assert_eq!((spans[1].start_line, spans[1].end_line), (4, 5));
        assert_eq!(
            crate::extract::function_names(&spans[0].text, "python"),
            vec!["foo"]
        );
        assert_eq!(
            crate::extract::function_names(&spans[1].text, "python"),
            vec!["bar"]
        );
    }

    #[test]
    fn python_pipeline_chunks_carry_function_names() {
        let content =
            "def first_handler(event):\n    return dispatch(event)\n\ndef second_handler(event):\n    return drop(event)\n";
        let chunks = extractor().extract(&file("h.py", "python", content));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].functions, vec!["first_handler"]);
        assert_eq!(chunks[1].functions, vec!["second_handler"]);
        assert!(chunks.iter().all(|c| c.start_line <= c.end_line));
    }

    #[test]
    fn short_content_yields_zero_chunks() {
        let chunks = extractor().extract(&file("a.py", "python", "x = 1\n"));
        assert!(chunks.is_empty());
    }

    #[test]
    fn python_class_chunk_is_classified_as_class() {
        let content = "class Session:\n    def start(self):\n        return True\n\nVERSION = 3\n";
        let chunks = extractor().extract(&file("s.py", "python", content));
        assert_eq!(chunks[0].chunk_type, lode_core::ChunkType::Class);
        assert_eq!(chunks[0].classes, vec!["Session"]);
        assert_eq!(chunks[0].functions, vec!["start"]);
    }

    #[test]
    fn brace_chunks_close_balanced() {
        let content = "function add(a, b) {\n  return a + b;\n}\n\nfunction sub(a, b) {\n  if (a > b) {\n    return a - b;\n  }\n  return 0;\n}\n";
        let chunks = extractor().extract(&file("m.js", "javascript", content));

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            let opens = chunk.content.matches('{').count();
            let closes = chunk.content.matches('}').count();
            assert_eq!(opens, closes, "chunk ends mid-block: {}", chunk.content);
        }
        assert_eq!(chunks[0].functions, vec!["add"]);
        assert_eq!(chunks[1].functions, vec!["sub"]);
    }

    #[test]
    fn comment_line_opens_no_boundary() {
        let content = "function add(a, b) {\n  return a + b;\n}\n// subtraction helper\nfunction sub(a, b) {\n  return a - b;\n}\n";
        let chunks = extractor().extract(&file("m.js", "javascript", content));

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.contains("// subtraction helper"));
        assert_eq!(chunks[0].end_line, 4);
        assert_eq!(chunks[1].start_line, 5);
    }

    #[test]
    fn nested_braces_are_never_split() {
        let content = "class Tree {\n  walk() {\n    if (this.left) {\n      this.left.walk();\n    }\n  }\n}\n";
        let chunks = extractor().extract(&file("t.js", "javascript", content));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 7);
    }

    #[test]
    fn unmapped_language_uses_window_fallback() {
        let content = "lorem ipsum dolor sit amet ".repeat(40);
        let extractor = extractor();
        assert!(!extractor.has_structural_strategy("prose"));
        let chunks = extractor.extract(&file("notes.md", "prose", &content));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.metadata.char_count <= 500);
        }
    }

    #[test]
    fn window_chunks_overlap_exactly() {
        let strategy = WindowStrategy::new(100, 10);
        let content: String = ('a'..='z').cycle().take(350).collect();
        let spans = strategy.windows(&content);

        assert_eq!(spans.len(), 4);
        // Content is ASCII, so byte slicing is safe here.
        for pair in spans.windows(2) {
            let prev = &pair[0].text;
            let tail = &prev[prev.len() - 10..];
            let head = &pair[1].text[..10];
            assert_eq!(tail, head, "windows must overlap by exactly 10 chars");
        }
    }

    #[test]
    fn window_chunks_cover_content_without_gaps() {
        let strategy = WindowStrategy::new(100, 10);
        let content = "line one\nline two\nline three\n".repeat(20);
        let spans = strategy.windows(&content);

        let mut covered_end = 0usize;
        for span in &spans {
            assert!(span.text.chars().count() <= 100);
            assert!(
                span.start_line as usize <= covered_end + 1,
                "gap before line {}",
                span.start_line
            );
            covered_end = covered_end.max(span.end_line as usize);
        }
        assert_eq!(covered_end, content.matches('\n').count() + 1);
    }

    #[test]
    fn blank_python_content_falls_back_to_window() {
        let content = "\n".repeat(80);
        let chunks = extractor().extract(&file("blank.py", "python", &content));
        // Indentation pass finds nothing; the window still produces chunks.
        assert!(!chunks.is_empty());
    }

    #[test]
    fn reindexing_same_content_gives_identical_hashes() {
        let content = "def stable():\n    return 42\n\ndef other():\n    return 7\n";
        let extractor = extractor();
        let first = extractor.extract(&file("a.py", "python", content));
        let second = extractor.extract(&file("a.py", "python", content));

        let first_hashes: Vec<_> = first.iter().map(|c| &c.metadata.content_hash).collect();
        let second_hashes: Vec<_> = second.iter().map(|c| &c.metadata.content_hash).collect();
        assert_eq!(first_hashes, second_hashes);
    }

    #[test]
    fn single_long_line_is_one_chunk_per_window() {
        let content = "a".repeat(1200);
        let chunks = extractor().extract(&file("blob.bin", "unknown", &content));
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.start_line == 1));
    }
}
