//! PDF page-range text source
//!
//! The extraction core never touches PDF binary content; this collaborator
//! turns "book name + inclusive page range" into plain text. The primary
//! path is lopdf's page-ranged text extraction; when lopdf cannot load or
//! decode the document (damaged xref tables are common in scanned books),
//! whole-document extraction via pdf-extract is the fallback.

use std::path::{Path, PathBuf};

pub struct Bookshelf {
    books_dir: PathBuf,
}

impl Bookshelf {
    pub fn new<P: Into<PathBuf>>(books_dir: P) -> Self {
        Bookshelf { books_dir: books_dir.into() }
    }

    pub fn books_dir(&self) -> &Path {
        &self.books_dir
    }

    /// Resolve a book name to a PDF path under the books directory.
    ///
    /// Book names are plain filenames; anything with a path separator is
    /// rejected before touching the filesystem.
    pub fn resolve(&self, book: &str) -> Result<PathBuf, String> {
        if book.trim().is_empty() {
            return Err("missing book name".to_string());
        }
        if book.contains('/') || book.contains('\\') || book.contains("..") {
            return Err(format!("invalid book name: {}", book));
        }

        let path = self.books_dir.join(book);
        if !path.exists() {
            return Err(format!("file not found: {}", path.display()));
        }
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf {
            return Err(format!("file is not a PDF: {}", path.display()));
        }
        Ok(path)
    }

    pub fn page_count(&self, book: &str) -> Result<u32, String> {
        let path = self.resolve(book)?;
        let doc = lopdf::Document::load(&path)
            .map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        Ok(doc.get_pages().len() as u32)
    }

    /// Plain text for an inclusive 1-based page range.
    pub fn page_range_text(&self, book: &str, start: u32, end: u32) -> Result<String, String> {
        let path = self.resolve(book)?;

        match extract_range(&path, start, end) {
            Ok(text) => Ok(text),
            Err(e) => {
                eprintln!(
                    "[PDF] Page-range extraction failed ({}), falling back to whole-document extraction",
                    e
                );
                pdf_extract::extract_text(&path)
                    .map_err(|e2| format!("PDF extraction error: {}", e2))
            }
        }
    }
}

fn extract_range(path: &Path, start: u32, end: u32) -> Result<String, String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| format!("failed to load {}: {}", path.display(), e))?;

    let total = doc.get_pages().len() as u32;
    let last = end.min(total);
    if start == 0 || start > last {
        return Err(format!("page range {}-{} outside document ({} pages)", start, end, total));
    }

    let pages: Vec<u32> = (start..=last).collect();
    doc.extract_text(&pages).map_err(|e| format!("failed to extract text: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let shelf = Bookshelf::new(dir.path());
        assert!(shelf.resolve("").is_err());
        assert!(shelf.resolve("../escape.pdf").is_err());
        assert!(shelf.resolve("sub/dir.pdf").is_err());
    }

    #[test]
    fn test_resolve_requires_existing_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let shelf = Bookshelf::new(dir.path());
        assert!(shelf.resolve("missing.pdf").is_err());

        fs::write(dir.path().join("notes.txt"), "text").unwrap();
        assert!(shelf.resolve("notes.txt").is_err());

        fs::write(dir.path().join("book.pdf"), "stub").unwrap();
        assert!(shelf.resolve("book.pdf").is_ok());
    }

    #[test]
    fn test_corrupt_pdf_reports_error_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.pdf"), "not actually a pdf").unwrap();
        let shelf = Bookshelf::new(dir.path());
        // Both the page-range path and the whole-document fallback fail
        assert!(shelf.page_range_text("broken.pdf", 1, 5).is_err());
        assert!(shelf.page_count("broken.pdf").is_err());
    }
}
