// src/repair/markers.rs

//! Output markers of the analyzer (jdeps) and compiler (javac)
//!
//! Neither tool has a machine-readable output mode for these cases, so the
//! text below is the contract. Anything
//! that does not fit one of these shapes is reported as an unrecognized
//! failure with the raw text attached, never guessed at.

use std::path::PathBuf;

/// Analyzer failure: unresolved dependencies ("Missing dependence"/"dependencies")
pub const MISSING_DEPENDENCY_MARKER: &str = "Missing dependen";

/// Per-dependency line suffix in the analyzer's missing-dependency report
pub const NOT_FOUND_MARKER: &str = "not found";

/// Separator between the dependent and the dependency on a report line
pub const DEPENDENCY_ARROW: &str = "->";

/// Analyzer success: followed by the generated descriptor path
pub const WRITING_TO_MARKER: &str = "writing to ";

/// Compiler failure that the repair loop can fix by dropping an export
pub const EMPTY_EXPORT_MARKER: &str = "package is empty or does not exist";

/// Keyword preceding the offending package in the compiler's echoed source line
pub const EXPORTS_KEYWORD: &str = "exports";

/// Classified analyzer output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerVerdict {
    /// A descriptor was generated at this path
    Generated(PathBuf),
    /// These names could not be resolved on the module path
    MissingDependencies(Vec<String>),
    /// Neither marker matched in a usable way
    Unrecognized,
}

/// Classified compiler output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileVerdict {
    /// This exported package is empty or absent
    EmptyExport(String),
    /// No repairable diagnostic found
    Unrecognized,
}

/// Classify analyzer output
///
/// A missing-dependency marker wins over a success marker. If the marker is
/// present but no dependency line can be parsed, the output is treated as
/// unrecognized so the raw text reaches the user.
pub fn classify_analyzer_output(output: &str) -> AnalyzerVerdict {
    if output.contains(MISSING_DEPENDENCY_MARKER) {
        let names = missing_dependency_names(output);
        if names.is_empty() {
            return AnalyzerVerdict::Unrecognized;
        }
        return AnalyzerVerdict::MissingDependencies(names);
    }

    match generated_descriptor_path(output) {
        Some(path) => AnalyzerVerdict::Generated(path),
        None => AnalyzerVerdict::Unrecognized,
    }
}

/// Unresolved names from lines shaped `<from> -> <name> ... not found`
///
/// Duplicates are dropped, first-seen order is kept.
pub fn missing_dependency_names(output: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for line in output.lines() {
        let Some(end) = line.find(NOT_FOUND_MARKER) else {
            continue;
        };
        let head = &line[..end];
        let Some(arrow) = head.rfind(DEPENDENCY_ARROW) else {
            continue;
        };

        let name = head[arrow + DEPENDENCY_ARROW.len()..].trim();
        if name.is_empty() || names.iter().any(|n| n == name) {
            continue;
        }
        names.push(name.to_string());
    }

    names
}

/// Path following the analyzer's `writing to ` marker
pub fn generated_descriptor_path(output: &str) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        let start = line.find(WRITING_TO_MARKER)? + WRITING_TO_MARKER.len();
        let path = line[start..].trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    })
}

/// Classify compiler output
pub fn classify_compile_output(output: &str) -> CompileVerdict {
    match empty_export_package(output) {
        Some(package) => CompileVerdict::EmptyExport(package),
        None => CompileVerdict::Unrecognized,
    }
}

/// Package named by the first empty-export diagnostic
///
/// The compiler echoes the offending `exports <pkg>;` line after the
/// message; the package is the text between the keyword and the `;`. When
/// the echo is missing, the name after the message's trailing colon is used.
pub fn empty_export_package(output: &str) -> Option<String> {
    let start = output.find(EMPTY_EXPORT_MARKER)?;
    let rest = &output[start + EMPTY_EXPORT_MARKER.len()..];

    if let Some(keyword) = rest.find(EXPORTS_KEYWORD) {
        let after = &rest[keyword + EXPORTS_KEYWORD.len()..];
        if let Some(end) = after.find(';') {
            let token = after[..end].trim();
            if is_package_token(token) {
                return Some(token.to_string());
            }
        }
    }

    let token = rest
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches(':')
        .trim();
    is_package_token(token).then(|| token.to_string())
}

fn is_package_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '$')
}
