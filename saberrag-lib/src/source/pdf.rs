use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::{Error, Result};

/// Extract text page by page.
///
/// pdf-extract panics on some malformed font tables, so the call is
/// isolated and a panic becomes an extraction error like any other.
pub(crate) fn extract_pages(path: &Path) -> Result<Vec<String>> {
    let extraction_error = |reason: String| Error::Extraction {
        path: path.to_path_buf(),
        reason,
    };

    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(extraction_error(e.to_string())),
        Err(payload) => {
            let reason = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "pdf parser panicked".to_string()
            };
            Err(extraction_error(reason))
        }
    }
}
