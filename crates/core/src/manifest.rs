//! Line-oriented parser for `requirements.txt` style manifests.
//!
//! The parser only tokenises entries into [`Dependency`] values; it does not
//! resolve versions or look anything up. Lines it cannot understand are kept
//! as [`ParseWarning`]s so the caller can report them without failing the
//! whole request.

use crate::error::ValidationError;
use crate::types::{Dependency, DependencyList};
use serde::{Deserialize, Serialize};

/// Version comparison operators, longest first so `===` wins over `==`.
const OPERATORS: [&str; 8] = ["===", "~=", "==", "!=", "<=", ">=", "<", ">"];

/// A manifest line that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub line: usize,
    pub content: String,
    pub reason: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.reason, self.content)
    }
}

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedManifest {
    pub dependencies: DependencyList,
    pub warnings: Vec<ParseWarning>,
}

/// Parse manifest text into a dependency list.
///
/// Fails when the text is blank or when no line yields a dependency.
pub fn parse_requirements(text: &str) -> Result<ParsedManifest, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyRequirements);
    }

    let mut dependencies = Vec::new();
    let mut warnings = Vec::new();

    for (line, logical) in logical_lines(text) {
        let content = strip_comment(&logical).trim();
        if content.is_empty() {
            continue;
        }

        match parse_line(content, line) {
            Ok(dependency) => dependencies.push(dependency),
            Err(reason) => {
                tracing::debug!(line, reason = %reason, "Skipping manifest line");
                warnings.push(ParseWarning {
                    line,
                    content: content.to_string(),
                    reason,
                });
            }
        }
    }

    if dependencies.is_empty() {
        return Err(ValidationError::NoValidDependencies { warnings });
    }

    Ok(ParsedManifest {
        dependencies: DependencyList::from(dependencies),
        warnings,
    })
}

/// Join backslash continuations, yielding (first physical line number, text).
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let trimmed = raw.trim_end();

        let (start, mut buffer) = match pending.take() {
            Some(open) => open,
            None if trimmed.trim_start().starts_with('#') => {
                lines.push((number, trimmed.to_string()));
                continue;
            }
            None => (number, String::new()),
        };

        match trimmed.strip_suffix('\\') {
            Some(head) => {
                buffer.push_str(head);
                pending = Some((start, buffer));
            }
            None => {
                buffer.push_str(trimmed);
                lines.push((start, buffer));
            }
        }
    }

    if let Some(open) = pending {
        lines.push(open);
    }

    lines
}

/// Drop a `#` comment that starts the line or follows whitespace.
fn strip_comment(line: &str) -> &str {
    let mut previous: Option<char> = None;
    for (index, c) in line.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return &line[..index];
        }
        previous = Some(c);
    }
    line
}

fn parse_line(content: &str, line: usize) -> Result<Dependency, String> {
    if content.starts_with('-') {
        return Err("option lines are not supported (e.g. -r, -e, --index-url)".to_string());
    }
    let content = strip_requirement_options(content);

    let name_end = content
        .char_indices()
        .find(|(_, c)| !is_name_char(*c))
        .map_or(content.len(), |(i, _)| i);
    let name = &content[..name_end];

    if name.is_empty() {
        return Err("missing package name".to_string());
    }
    let first_last = (name.chars().next(), name.chars().last());
    if !matches!(first_last, (Some(a), Some(b)) if a.is_alphanumeric() && b.is_alphanumeric()) {
        return Err(format!("invalid package name {:?}", name));
    }

    let mut dependency = Dependency::new(name, line);
    let mut rest = content[name_end..].trim_start();

    if let Some(after_bracket) = rest.strip_prefix('[') {
        let close = after_bracket
            .find(']')
            .ok_or_else(|| "unterminated extras list".to_string())?;
        dependency.extras = parse_extras(&after_bracket[..close])?;
        rest = after_bracket[close + 1..].trim_start();
    }

    if let Some(reference) = rest.strip_prefix('@') {
        let (url, marker) = split_url_marker(reference.trim());
        if url.is_empty() {
            return Err("missing URL after '@'".to_string());
        }
        dependency.url = Some(url.to_string());
        dependency.marker = parse_marker(marker)?;
        return Ok(dependency);
    }

    let (specifier, marker) = match rest.split_once(';') {
        Some((specifier, marker)) => (specifier, Some(marker)),
        None => (rest, None),
    };
    dependency.version = parse_specifier(specifier)?;
    dependency.marker = parse_marker(marker)?;

    Ok(dependency)
}

/// Cut per-requirement options such as `--hash=...` or `--config-settings`.
fn strip_requirement_options(content: &str) -> &str {
    let mut previous: Option<char> = None;
    for (index, c) in content.char_indices() {
        if c == '-' && previous.is_some_and(char::is_whitespace) && content[index..].starts_with("--") {
            return content[..index].trim_end();
        }
        previous = Some(c);
    }
    content
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn parse_extras(list: &str) -> Result<Vec<String>, String> {
    let mut extras = Vec::new();
    for extra in list.split(',').map(str::trim) {
        if extra.is_empty() {
            continue;
        }
        if !extra.chars().all(is_name_char) {
            return Err(format!("invalid extra {:?}", extra));
        }
        extras.push(extra.to_string());
    }
    Ok(extras)
}

/// URL references only take a marker after whitespace, since `;` is legal in URLs.
fn split_url_marker(reference: &str) -> (&str, Option<&str>) {
    let mut previous: Option<char> = None;
    for (index, c) in reference.char_indices() {
        if c == ';' && previous.is_some_and(char::is_whitespace) {
            return (reference[..index].trim_end(), Some(&reference[index + 1..]));
        }
        previous = Some(c);
    }
    (reference, None)
}

fn parse_marker(marker: Option<&str>) -> Result<Option<String>, String> {
    match marker.map(str::trim) {
        None => Ok(None),
        Some("") => Err("empty environment marker".to_string()),
        Some(marker) => Ok(Some(marker.to_string())),
    }
}

fn parse_specifier(specifier: &str) -> Result<Option<String>, String> {
    let mut specifier = specifier.trim();
    if let Some(inner) = specifier
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        specifier = inner.trim();
    }
    if specifier.is_empty() {
        return Ok(None);
    }

    let mut clauses = Vec::new();
    for clause in specifier.split(',').map(str::trim) {
        let operator = OPERATORS
            .iter()
            .find(|op| clause.starts_with(*op))
            .ok_or_else(|| format!("invalid version specifier {:?}", clause))?;
        let version = clause[operator.len()..].trim();

        let valid = !version.is_empty()
            && version
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_'));
        if !valid {
            return Err(format!("invalid version specifier {:?}", clause));
        }
        clauses.push(format!("{}{}", operator, version));
    }

    Ok(Some(clauses.join(",")))
}
