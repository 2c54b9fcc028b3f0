//! Lightweight token extraction and chunk classification.
//!
//! Per-language regex patterns pull function names, class names, and import
//! identifiers out of chunk text. These are token heuristics, not grammar:
//! good enough to enrich search results and classify chunks. Languages
//! without a mapped pattern table yield empty lists, never an error.

use std::collections::{BTreeSet, HashMap};

use lode_core::ChunkType;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

struct TokenPatterns {
    functions: Vec<Regex>,
    classes: Vec<Regex>,
    imports: Vec<Regex>,
}

fn rx(pattern: &str) -> Regex {
    // Patterns are compile-time constants; a failure here is a programming
    // error caught by the pattern tests below.
    Regex::new(pattern).expect("invalid token pattern")
}

static PATTERNS: Lazy<HashMap<&'static str, TokenPatterns>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        "python",
        TokenPatterns {
            functions: vec![rx(r"(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(")],
            classes: vec![rx(r"class\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\([^)]*\))?\s*:")],
            imports: vec![
                rx(r"(?m)^\s*import\s+([A-Za-z_][A-Za-z0-9_.]*)"),
                rx(r"(?m)^\s*from\s+([A-Za-z_][A-Za-z0-9_.]*)\s+import"),
            ],
        },
    );

    let javascript = || TokenPatterns {
        functions: vec![
            rx(r"(?:async\s+)?function\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*\("),
            rx(r"(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>)"),
        ],
        classes: vec![rx(
            r"class\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:extends\s+[A-Za-z_$][A-Za-z0-9_$.]*)?\s*\{?",
        )],
        imports: vec![
            rx(r#"import\s+[^'"]*?\s+from\s+['"]([^'"]+)['"]"#),
            rx(r#"import\s+['"]([^'"]+)['"]"#),
            rx(r#"require\(\s*['"]([^'"]+)['"]"#),
        ],
    };
    map.insert("javascript", javascript());
    map.insert("typescript", javascript());

    map.insert(
        "java",
        TokenPatterns {
            functions: vec![rx(
                r"(?m)(?:public|private|protected)\s+(?:static\s+)?(?:final\s+)?[A-Za-z_][A-Za-z0-9_<>\[\]]*\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(",
            )],
            classes: vec![rx(
                r"(?:public\s+)?(?:abstract\s+|final\s+)?class\s+([A-Za-z_][A-Za-z0-9_]*)",
            )],
            imports: vec![rx(r"import\s+(?:static\s+)?([A-Za-z_][A-Za-z0-9_.]*(?:\.\*)?)\s*;")],
        },
    );

    map.insert(
        "rust",
        TokenPatterns {
            functions: vec![rx(r"fn\s+([A-Za-z_][A-Za-z0-9_]*)")],
            classes: vec![rx(r"(?:struct|enum|trait)\s+([A-Z][A-Za-z0-9_]*)")],
            imports: vec![rx(r"use\s+([A-Za-z_][A-Za-z0-9_:]*)")],
        },
    );

    map.insert(
        "go",
        TokenPatterns {
            functions: vec![rx(r"func\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*\(")],
            classes: vec![rx(r"type\s+([A-Za-z_][A-Za-z0-9_]*)\s+(?:struct|interface)")],
            imports: vec![rx(r#"import\s+(?:\w+\s+)?"([^"]+)""#)],
        },
    );

    map
});

fn capture_names(content: &str, patterns: &[Regex]) -> Vec<String> {
    let mut names = Vec::new();
    for pattern in patterns {
        for captures in pattern.captures_iter(content) {
            let name = captures
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .next();
            if let Some(name) = name {
                names.push(name);
            }
        }
    }
    names
}

/// Extract function names from chunk text, in order of appearance.
///
/// # Examples
///
/// ```
/// use lode_index::extract::function_names;
///
/// let names = function_names("def foo():\n    pass\n\nasync def bar():\n    pass\n", "python");
/// assert_eq!(names, vec!["foo", "bar"]);
/// assert!(function_names("anything", "fortran").is_empty());
/// ```
pub fn function_names(content: &str, language: &str) -> Vec<String> {
    match PATTERNS.get(language) {
        Some(patterns) => capture_names(content, &patterns.functions),
        None => Vec::new(),
    }
}

/// Extract class names from chunk text, in order of appearance.
///
/// # Examples
///
/// ```
/// use lode_index::extract::class_names;
///
/// let names = class_names("class Session(Base):\n    pass\n", "python");
/// assert_eq!(names, vec!["Session"]);
/// ```
pub fn class_names(content: &str, language: &str) -> Vec<String> {
    match PATTERNS.get(language) {
        Some(patterns) => capture_names(content, &patterns.classes),
        None => Vec::new(),
    }
}

/// Extract the set of import identifiers referenced by chunk text.
///
/// # Examples
///
/// ```
/// use lode_index::extract::import_names;
///
/// let imports = import_names("import os\nfrom pathlib import Path\n", "python");
/// assert!(imports.contains("os"));
/// assert!(imports.contains("pathlib"));
/// ```
pub fn import_names(content: &str, language: &str) -> BTreeSet<String> {
    match PATTERNS.get(language) {
        Some(patterns) => capture_names(content, &patterns.imports).into_iter().collect(),
        None => BTreeSet::new(),
    }
}

/// Classify a chunk. First matching rule wins: class definition, function
/// definition, config keyword, test keyword, else general.
///
/// # Examples
///
/// ```
/// use lode_core::ChunkType;
/// use lode_index::extract::classify;
///
/// assert_eq!(classify("DATABASE_URL in env", &[], &[]), ChunkType::Config);
/// assert_eq!(classify("plain prose", &[], &[]), ChunkType::General);
/// ```
pub fn classify(content: &str, functions: &[String], classes: &[String]) -> ChunkType {
    if !classes.is_empty() {
        return ChunkType::Class;
    }
    if !functions.is_empty() {
        return ChunkType::Function;
    }
    let lowered = content.to_lowercase();
    if ["config", "settings", "env"].iter().any(|kw| lowered.contains(kw)) {
        return ChunkType::Config;
    }
    if ["test", "spec"].iter().any(|kw| lowered.contains(kw)) {
        return ChunkType::Test;
    }
    ChunkType::General
}

/// SHA-256 hex digest of chunk content, for dedupe and idempotence checks.
///
/// # Examples
///
/// ```
/// use lode_index::extract::content_hash;
///
/// assert_eq!(content_hash("x"), content_hash("x"));
/// assert_ne!(content_hash("x"), content_hash("y"));
/// ```
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_functions_in_order() {
        let content = "def alpha():\n    pass\n\nasync def beta():\n    pass\n";
        assert_eq!(function_names(content, "python"), vec!["alpha", "beta"]);
    }

    #[test]
    fn python_classes_and_imports() {
        let content = "import os\nfrom typing import Optional\n\nclass Widget(Base):\n    pass\n";
        assert_eq!(class_names(content, "python"), vec!["Widget"]);
        let imports = import_names(content, "python");
        assert!(imports.contains("os"));
        assert!(imports.contains("typing"));
    }

    #[test]
    fn javascript_arrow_and_function_decls() {
        let content = "function greet(name) {}\nconst add = (a, b) => a + b;\nconst legacy = function() {};\n";
        let names = function_names(content, "javascript");
        assert!(names.contains(&"greet".to_string()));
        assert!(names.contains(&"add".to_string()));
        assert!(names.contains(&"legacy".to_string()));
    }

    #[test]
    fn javascript_imports() {
        let content = "import React from 'react';\nimport './styles.css';\nconst fs = require('fs');\n";
        let imports = import_names(content, "javascript");
        assert!(imports.contains("react"));
        assert!(imports.contains("./styles.css"));
        assert!(imports.contains("fs"));
    }

    #[test]
    fn java_methods_and_classes() {
        let content = "import java.util.List;\n\npublic class Account {\n    private long balance;\n\n    public long getBalance() { return balance; }\n}\n";
        assert_eq!(class_names(content, "java"), vec!["Account"]);
        assert_eq!(function_names(content, "java"), vec!["getBalance"]);
        assert!(import_names(content, "java").contains("java.util.List"));
    }

    #[test]
    fn unmapped_language_yields_empty_lists() {
        let content = "PROGRAM HELLO\nEND PROGRAM";
        assert!(function_names(content, "fortran").is_empty());
        assert!(class_names(content, "fortran").is_empty());
        assert!(import_names(content, "fortran").is_empty());
    }

    #[test]
    fn classify_prefers_class_over_function() {
        let functions = vec!["helper".to_string()];
        let classes = vec!["Widget".to_string()];
        assert_eq!(classify("...", &functions, &classes), ChunkType::Class);
        assert_eq!(classify("...", &functions, &[]), ChunkType::Function);
    }

    #[test]
    fn classify_keyword_fallbacks() {
        assert_eq!(classify("export SETTINGS_PATH=/etc", &[], &[]), ChunkType::Config);
        assert_eq!(classify("describe the spec here", &[], &[]), ChunkType::Test);
        assert_eq!(classify("nothing of note", &[], &[]), ChunkType::General);
    }

    #[test]
    fn hash_is_deterministic_hex() {
        let digest = content_hash("def foo(): pass");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, content_hash("def foo(): pass"));
    }
}
