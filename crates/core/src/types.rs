use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single entry parsed from a dependency manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Version specifier as written, whitespace removed (e.g. `>=2.0,<3`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    /// Direct reference (`name @ url`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Environment marker (text after `;`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// 1-based line in the source manifest
    pub line: usize,
}

impl Dependency {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            version: None,
            extras: Vec::new(),
            url: None,
            marker: None,
            line,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(version) = &self.version {
            write!(f, "{}", version)?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {}", url)?;
        }
        Ok(())
    }
}

/// Ordered, immutable list of dependencies for a single request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyList(Vec<Dependency>);

impl DependencyList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Dependency] {
        &self.0
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.name.as_str()).collect()
    }
}

impl From<Vec<Dependency>> for DependencyList {
    fn from(dependencies: Vec<Dependency>) -> Self {
        Self(dependencies)
    }
}

impl FromIterator<Dependency> for DependencyList {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DependencyList {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// License identifier(s) detected for a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LicenseId {
    Single(String),
    Multiple(Vec<String>),
    /// Anything else the backend sent, e.g. `null` when nothing was detected
    Other(Value),
}

impl LicenseId {
    pub fn is_detected(&self) -> bool {
        match self {
            Self::Single(id) => !id.is_empty(),
            Self::Multiple(ids) => !ids.is_empty(),
            Self::Other(_) => false,
        }
    }
}

impl std::fmt::Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(id) => write!(f, "{}", id),
            Self::Multiple(ids) => write!(f, "{}", ids.join(" OR ")),
            Self::Other(Value::Null) => write!(f, "unknown"),
            Self::Other(value) => write!(f, "{}", value),
        }
    }
}

/// One backend finding. Relayed exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseFinding {
    #[serde(alias = "name")]
    pub dependency: String,
    pub license: LicenseId,
    /// Kept as raw JSON so `1`, `0.95` and `null` round-trip unchanged
    pub confidence: Value,
    /// Any other backend-provided fields (e.g. `version`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LicenseFinding {
    pub fn confidence(&self) -> Option<f64> {
        self.confidence.as_f64()
    }
}

/// Backend analysis report: ordered findings plus whatever metadata the backend attached.
/// Serializes `findings` first, then the metadata keys in the order received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(alias = "files")]
    pub findings: Vec<LicenseFinding>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_preserves_order_and_metadata() {
        let body = json!({
            "project_name": "demo",
            "analysis_date": "2025-10-26",
            "findings": [
                {"dependency": "requests", "license": "Apache-2.0", "confidence": 0.9, "version": "2.28.0"},
                {"dependency": "flask", "license": "BSD-3-Clause", "confidence": 1},
                {"dependency": "numpy", "license": ["BSD-3-Clause", "MIT"], "confidence": 0.42}
            ]
        });

        let report: Report = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.findings[0].dependency, "requests");
        assert_eq!(report.findings[1].dependency, "flask");
        assert_eq!(report.findings[2].dependency, "numpy");
        assert_eq!(report.findings[0].extra["version"], "2.28.0");
        assert_eq!(report.metadata["project_name"], "demo");

        // Equal as JSON values, integer confidence included
        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out, body);
        assert_eq!(out["findings"][1]["confidence"], json!(1));

        // Key order: `findings` leads, the remaining keys keep backend order
        let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["findings", "project_name", "analysis_date"]);
        let finding_keys: Vec<&str> = out["findings"][0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(finding_keys, vec!["dependency", "license", "confidence", "version"]);
    }

    #[test]
    fn test_report_accepts_files_and_name_spelling() {
        let body = json!({
            "project_name": "test-project",
            "files": [
                {"name": "requests", "version": "2.28.0", "license": "Apache-2.0", "confidence": 0.9}
            ]
        });

        let report: Report = serde_json::from_value(body).unwrap();
        assert_eq!(report.findings[0].dependency, "requests");
        assert_eq!(report.findings[0].confidence(), Some(0.9));
        assert_eq!(
            report.findings[0].license,
            LicenseId::Single("Apache-2.0".to_string())
        );
    }

    #[test]
    fn test_undetected_license_keeps_the_report() {
        let body = json!({
            "findings": [
                {"dependency": "x", "license": null, "confidence": 0.1},
                {"dependency": "y", "license": "MIT", "confidence": "high"},
                {"dependency": "z", "license": {"spdx": "MIT"}, "confidence": null}
            ]
        });

        let report: Report = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.findings[0].license, LicenseId::Other(Value::Null));
        assert!(!report.findings[0].license.is_detected());
        assert_eq!(report.findings[0].license.to_string(), "unknown");
        assert!(report.findings[1].license.is_detected());
        assert_eq!(report.findings[1].confidence(), None);
        assert_eq!(report.findings[2].confidence(), None);

        assert_eq!(serde_json::to_value(&report).unwrap(), body);
    }

    #[test]
    fn test_report_rejects_missing_findings() {
        let result = serde_json::from_value::<Report>(json!({"status": "ok"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_dependency_serialization_skips_empty_fields() {
        let dep = Dependency::new("requests", 1).with_version("==2.31.0");
        let value = serde_json::to_value(&dep).unwrap();
        assert_eq!(
            value,
            json!({"name": "requests", "version": "==2.31.0", "line": 1})
        );
        assert_eq!(dep.to_string(), "requests==2.31.0");
    }

    #[test]
    fn test_dependency_list_is_ordered() {
        let list: DependencyList = vec![Dependency::new("b", 1), Dependency::new("a", 2)]
            .into_iter()
            .collect();
        assert_eq!(list.names(), vec!["b", "a"]);
        assert_eq!(serde_json::to_value(&list).unwrap()[0]["name"], "b");
    }
}
