//! Source model for tracking where documents come from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of ingestion source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local file or directory path
    #[default]
    File,
    /// Web page URL
    Url,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::Url => write!(f, "url"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SourceKind::File),
            "url" => Ok(SourceKind::Url),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

/// An ingestion source: a path or URL plus its kind.
///
/// Immutable once submitted to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    /// File path or URL.
    pub location: String,
}

impl Source {
    pub fn new(kind: SourceKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
        }
    }

    /// Create a local file source.
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(SourceKind::File, path)
    }

    /// Create a URL source.
    pub fn url(url: impl Into<String>) -> Self {
        Self::new(SourceKind::Url, url)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_roundtrip() {
        assert_eq!("file".parse::<SourceKind>().unwrap(), SourceKind::File);
        assert_eq!("URL".parse::<SourceKind>().unwrap(), SourceKind::Url);
        assert!("ftp".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::Url.to_string(), "url");
    }

    #[test]
    fn test_source_constructors() {
        let file = Source::file("/docs/notes.md");
        assert_eq!(file.kind, SourceKind::File);
        assert_eq!(file.location, "/docs/notes.md");

        let url = Source::url("https://example.com/page");
        assert_eq!(url.kind, SourceKind::Url);
        assert_eq!(url.to_string(), "url:https://example.com/page");
    }

    #[test]
    fn test_source_serde() {
        let source = Source::url("https://example.com");
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"url\""));
        let parsed: Source = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, source);
    }
}
