use std::fs;
use std::path::Path;

/// Page break in paginated plain-text documents
const FORM_FEED: char = '\x0C';

/// Read a plain-text document whole.
pub(crate) fn read_document(path: &Path) -> crate::Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Read a plain-text document split on form feeds, one entry per page.
///
/// A trailing form feed does not open an extra empty page.
pub(crate) fn read_pages(path: &Path) -> crate::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let mut pages: Vec<String> = text.split(FORM_FEED).map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    Ok(pages)
}
