//! Document ingestion
//!
//! Turns the reference corpus into [`SourceUnit`]s: one per page of the
//! paginated primary document, one per supplementary plain-text document.
//!
//! # Usage
//!
//! ```ignore
//! use saberrag_lib::source::SourceSet;
//!
//! let sources = SourceSet::new("data/sabermetrics.pdf").with_supplementary("docs/response.md");
//! let units = sources.ingest()?;
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chunk::{ChunkMetadata, Page};
use crate::{Error, Result};

/// Content type tag for pages of the primary reference document
pub const REFERENCE_TYPE: &str = "reference";
/// Source label for the supplementary response-format document
pub const RESPONSE_FORMAT_SOURCE: &str = "response_format";
/// Content type tag for the supplementary response-format document
pub const RESPONSE_TEMPLATE_TYPE: &str = "response_template";

/// One logical page or document, ready for chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl SourceUnit {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// A loadable document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Paginated document: PDF, or plain text with form-feed page breaks.
    /// Yields one unit per page, numbered from 1.
    Paginated(PathBuf),
    /// Unpaginated text loaded as a single unit under a fixed label.
    PlainText {
        path: PathBuf,
        label: String,
        content_type: String,
    },
}

impl Source {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Source::Paginated(path) => path,
            Source::PlainText { path, .. } => path,
        }
    }

    /// Load the document into units. A missing file is `SourceNotFound`.
    pub fn load(&self) -> Result<Vec<SourceUnit>> {
        let path = self.path();
        if !path.is_file() {
            return Err(Error::SourceNotFound(path.to_path_buf()));
        }

        match self {
            Source::Paginated(path) => {
                let pages = if is_pdf(path) {
                    pdf::extract_pages(path)?
                } else {
                    text::read_pages(path)?
                };

                let source_id = path.display().to_string();
                Ok(pages
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| {
                        SourceUnit::new(
                            text,
                            ChunkMetadata {
                                source_id: Some(source_id.clone()),
                                source_type: Some(REFERENCE_TYPE.to_string()),
                                page: Page::Number(i as u32 + 1),
                                ..Default::default()
                            },
                        )
                    })
                    .collect())
            }
            Source::PlainText {
                path,
                label,
                content_type,
            } => {
                let text = text::read_document(path)?;
                Ok(vec![SourceUnit::new(
                    text,
                    ChunkMetadata {
                        source_id: Some(label.clone()),
                        source_type: Some(content_type.clone()),
                        page: Page::Unknown,
                        ..Default::default()
                    },
                )])
            }
        }
    }
}

/// The corpus: a required primary document and an optional supplement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    primary: PathBuf,
    supplementary: Option<PathBuf>,
}

impl SourceSet {
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            supplementary: None,
        }
    }

    #[must_use]
    pub fn with_supplementary(mut self, path: impl Into<PathBuf>) -> Self {
        self.supplementary = Some(path.into());
        self
    }

    #[must_use]
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    #[must_use]
    pub fn supplementary(&self) -> Option<&Path> {
        self.supplementary.as_deref()
    }

    /// The sources that will actually be read, in ingestion order.
    ///
    /// A configured supplement that does not exist is dropped here.
    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        let mut sources = vec![Source::Paginated(self.primary.clone())];
        match &self.supplementary {
            Some(path) if path.is_file() => sources.push(Source::PlainText {
                path: path.clone(),
                label: RESPONSE_FORMAT_SOURCE.to_string(),
                content_type: RESPONSE_TEMPLATE_TYPE.to_string(),
            }),
            Some(path) => debug!(path = %path.display(), "supplementary document missing, skipping"),
            None => {}
        }
        sources
    }

    /// Load every source into units, primary pages first.
    pub fn ingest(&self) -> Result<Vec<SourceUnit>> {
        let mut units = Vec::new();
        for source in self.sources() {
            let loaded = source.load()?;
            info!(path = %source.path().display(), units = loaded.len(), "loaded source document");
            units.extend(loaded);
        }
        Ok(units)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

mod pdf;
mod text;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_paginated_text_yields_numbered_pages() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "guide.txt", "OPS = OBP + SLG\n\x0CERA = earned runs x 9 / innings\n");

        let units = SourceSet::new(&primary).ingest().unwrap();

        assert_eq!(units.len(), 2);
        assert!(units[0].text.contains("OBP + SLG"));
        assert_eq!(units[0].metadata.page, Page::Number(1));
        assert_eq!(units[1].metadata.page, Page::Number(2));
        assert_eq!(units[0].metadata.source_type.as_deref(), Some(REFERENCE_TYPE));
        assert_eq!(
            units[0].metadata.source_id.as_deref(),
            Some(primary.display().to_string().as_str())
        );
    }

    #[test]
    fn test_missing_primary_is_source_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.pdf");

        let err = SourceSet::new(&missing).ingest().unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(path) if path == missing));
    }

    #[test]
    fn test_supplementary_is_tagged() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "guide.txt", "WAR = wins above replacement");
        let supplement = write(&dir, "response.md", "## 답변 형식\n- 정의\n- 공식\n");

        let units = SourceSet::new(&primary)
            .with_supplementary(&supplement)
            .ingest()
            .unwrap();

        assert_eq!(units.len(), 2);
        let last = &units[1];
        assert!(last.text.contains("답변 형식"));
        assert_eq!(last.metadata.source_id.as_deref(), Some(RESPONSE_FORMAT_SOURCE));
        assert_eq!(last.metadata.source_type.as_deref(), Some(RESPONSE_TEMPLATE_TYPE));
        assert_eq!(last.metadata.page, Page::Unknown);
    }

    #[test]
    fn test_missing_supplementary_is_skipped() {
        let dir = TempDir::new().unwrap();
        let primary = write(&dir, "guide.txt", "FIP = fielding independent pitching");

        let sources = SourceSet::new(&primary).with_supplementary(dir.path().join("response.md"));
        assert_eq!(sources.sources().len(), 1);

        let units = sources.ingest().unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("data/sabermetrics.pdf")));
        assert!(is_pdf(Path::new("GUIDE.PDF")));
        assert!(!is_pdf(Path::new("data/sabermetrics.txt")));
        assert!(!is_pdf(Path::new("README")));
    }

    #[test]
    fn test_unreadable_pdf_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let bogus = write(&dir, "broken.pdf", "this is not a pdf");

        let err = Source::Paginated(bogus).load().unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }
}
