//! In-memory search and replace across workspace files.
//!
//! # Invariants
//! - Hits are ordered by file path, then line, then column.
//! - Lines and columns are 1-based; columns count characters, not bytes.
//! - Blank queries match nothing.

use crate::error::{KernelError, KernelResult};
use crate::model::file::File;
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Search behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    /// Treat the query as a regular expression instead of literal text.
    pub use_regex: bool,
    /// Only search files with these extensions (without the dot). Empty means all.
    pub include_extensions: Vec<String>,
    /// Stop after this many hits.
    pub max_results: Option<usize>,
}

/// One match location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub matched_text: String,
}

/// Replacement result for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReplacement {
    pub path: String,
    pub content: String,
    pub replacements: usize,
}

/// Scans file contents line by line.
pub fn find_in_files<'a>(
    files: impl IntoIterator<Item = &'a File>,
    query: &str,
    options: &SearchOptions,
) -> KernelResult<Vec<SearchHit>> {
    let Some(pattern) = compile(query, options)? else {
        return Ok(Vec::new());
    };
    let limit = options.max_results.unwrap_or(usize::MAX);

    let mut hits = Vec::new();
    for file in files.into_iter().filter(|file| included(file, options)) {
        for (line_index, line) in file.content.lines().enumerate() {
            for found in pattern.find_iter(line) {
                if found.as_str().is_empty() {
                    continue;
                }
                if hits.len() >= limit {
                    return Ok(hits);
                }
                hits.push(SearchHit {
                    path: file.path.clone(),
                    line: line_index as u32 + 1,
                    column: line[..found.start()].chars().count() as u32 + 1,
                    matched_text: found.as_str().to_string(),
                });
            }
        }
    }
    Ok(hits)
}

/// Computes new contents for every file with at least one match.
///
/// Literal mode inserts `replacement` verbatim; regex mode expands `$1`-style
/// capture references.
pub fn replace_in_files<'a>(
    files: impl IntoIterator<Item = &'a File>,
    query: &str,
    replacement: &str,
    options: &SearchOptions,
) -> KernelResult<Vec<FileReplacement>> {
    let Some(pattern) = compile(query, options)? else {
        return Ok(Vec::new());
    };

    let mut results = Vec::new();
    for file in files.into_iter().filter(|file| included(file, options)) {
        let replacements = pattern
            .find_iter(&file.content)
            .filter(|found| !found.as_str().is_empty())
            .count();
        if replacements == 0 {
            continue;
        }
        let content = if options.use_regex {
            pattern.replace_all(&file.content, replacement).into_owned()
        } else {
            pattern
                .replace_all(&file.content, NoExpand(replacement))
                .into_owned()
        };
        results.push(FileReplacement {
            path: file.path.clone(),
            content,
            replacements,
        });
    }
    Ok(results)
}

fn compile(query: &str, options: &SearchOptions) -> KernelResult<Option<Regex>> {
    if query.is_empty() {
        return Ok(None);
    }
    let body = if options.use_regex {
        query.to_string()
    } else {
        regex::escape(query)
    };
    let source = if options.whole_word {
        format!(r"\b(?:{body})\b")
    } else {
        body
    };

    RegexBuilder::new(&source)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map(Some)
        .map_err(|err| KernelError::validation(format!("invalid search pattern `{query}`: {err}")))
}

fn included(file: &File, options: &SearchOptions) -> bool {
    if options.include_extensions.is_empty() {
        return true;
    }
    let Some((_, extension)) = file.name.rsplit_once('.') else {
        return false;
    };
    options
        .include_extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(extension))
}
