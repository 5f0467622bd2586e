//! Document loaders for on-disk knowledge sources.
//!
//! [`TextFileLoader`] reads plain-text and markdown files. `PdfLoader` and
//! `DocxLoader` extract text from PDF and Word files behind the `pdf` and
//! `docx` features. [`LoaderSet`] routes each path to the first loader that
//! supports it; anything no loader supports is rejected with
//! [`RagError::Ingestion`] so the ingestion pipeline can record and skip it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use crate::document::{Document, SOURCE_KEY};
use crate::error::{RagError, Result};

/// Extensions read by [`TextFileLoader`] by default.
pub const TEXT_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "markdown"];

/// Turns a source path into documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Whether this loader can read `path`.
    fn supports(&self, path: &Path) -> bool;

    /// Load the documents contained in `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingestion`] naming `path` if the source cannot be
    /// read or is not a supported format.
    async fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

/// Loads UTF-8 text and markdown files as a single document each.
///
/// The document's `source` metadata is the file path.
#[derive(Debug, Clone)]
pub struct TextFileLoader {
    extensions: Vec<String>,
}

impl Default for TextFileLoader {
    fn default() -> Self {
        Self { extensions: TEXT_EXTENSIONS.iter().map(|e| e.to_string()).collect() }
    }
}

impl TextFileLoader {
    /// Create a loader for the default text extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted extensions (without the leading dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(|e| e.into().to_lowercase()).collect();
        self
    }
}

#[async_trait]
impl DocumentLoader for TextFileLoader {
    fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let source_id = path.display().to_string();
        if !self.supports(path) {
            return Err(unsupported(path));
        }

        let bytes = read_source(path, &source_id).await?;
        let text = String::from_utf8(bytes).map_err(|_| RagError::Ingestion {
            source_id: source_id.clone(),
            message: "file is not valid UTF-8".to_string(),
        })?;

        debug!(source = %source_id, chars = text.chars().count(), "loaded text document");
        Ok(vec![Document::new(text).with_metadata(SOURCE_KEY, source_id)])
    }
}

/// Extracts the text layer of a PDF as a single document.
///
/// Scanned pages without a text layer contribute nothing.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

#[cfg(feature = "pdf")]
#[async_trait]
impl DocumentLoader for PdfLoader {
    fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| ext == "pdf")
    }

    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        if !self.supports(path) {
            return Err(unsupported(path));
        }
        let source_id = path.display().to_string();
        let bytes = read_source(path, &source_id).await?;
        let text = extract(&source_id, move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await?;

        debug!(source = %source_id, chars = text.chars().count(), "loaded pdf document");
        Ok(vec![Document::new(text).with_metadata(SOURCE_KEY, source_id)])
    }
}

/// Extracts the paragraph text of a Word (.docx) file as a single document.
///
/// Paragraphs are joined with newlines. Tables, headers and footers are not read.
#[cfg(feature = "docx")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxLoader;

#[cfg(feature = "docx")]
#[async_trait]
impl DocumentLoader for DocxLoader {
    fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| ext == "docx")
    }

    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        if !self.supports(path) {
            return Err(unsupported(path));
        }
        let source_id = path.display().to_string();
        let bytes = read_source(path, &source_id).await?;
        let text = extract(&source_id, move || {
            let docx = docx_rs::read_docx(&bytes).map_err(|e| e.to_string())?;
            Ok(docx_text(&docx))
        })
        .await?;

        debug!(source = %source_id, chars = text.chars().count(), "loaded docx document");
        Ok(vec![Document::new(text).with_metadata(SOURCE_KEY, source_id)])
    }
}

#[cfg(feature = "docx")]
fn docx_text(docx: &docx_rs::Docx) -> String {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph),
            _ => None,
        })
        .map(|paragraph| {
            let mut line = String::new();
            for child in &paragraph.children {
                if let ParagraphChild::Run(run) = child {
                    for piece in &run.children {
                        match piece {
                            RunChild::Text(text) => line.push_str(&text.text),
                            RunChild::Tab(_) => line.push('\t'),
                            _ => {}
                        }
                    }
                }
            }
            line
        })
        .collect();
    paragraphs.join("\n")
}

/// Routes each path to the first registered loader that supports it.
///
/// The default set holds [`TextFileLoader`] plus the PDF and DOCX loaders
/// when their features are enabled.
#[derive(Clone)]
pub struct LoaderSet {
    loaders: Vec<Arc<dyn DocumentLoader>>,
}

impl std::fmt::Debug for LoaderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderSet").field("loaders", &self.loaders.len()).finish()
    }
}

impl Default for LoaderSet {
    fn default() -> Self {
        let set = Self::empty().with_loader(TextFileLoader::new());
        #[cfg(feature = "pdf")]
        let set = set.with_loader(PdfLoader);
        #[cfg(feature = "docx")]
        let set = set.with_loader(DocxLoader);
        set
    }
}

impl LoaderSet {
    /// A set with no loaders; every path is unsupported.
    pub fn empty() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Register `loader` after the existing ones.
    pub fn with_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    fn loader_for(&self, path: &Path) -> Option<&Arc<dyn DocumentLoader>> {
        self.loaders.iter().find(|loader| loader.supports(path))
    }
}

#[async_trait]
impl DocumentLoader for LoaderSet {
    fn supports(&self, path: &Path) -> bool {
        self.loader_for(path).is_some()
    }

    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        match self.loader_for(path) {
            Some(loader) => loader.load(path).await,
            None => Err(unsupported(path)),
        }
    }
}

/// List every regular file under `dir`, sorted, skipping hidden entries.
///
/// # Errors
///
/// Returns [`RagError::Ingestion`] if `dir` is missing or not a directory.
pub fn discover_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RagError::Ingestion {
            source_id: dir.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    let mut files = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

async fn read_source(path: &Path, source_id: &str) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| RagError::Ingestion {
        source_id: source_id.to_string(),
        message: format!("failed to read file: {e}"),
    })
}

/// Run a CPU-bound text extraction off the async workers.
///
/// Extraction errors and panics both become [`RagError::Ingestion`].
#[cfg(any(feature = "pdf", feature = "docx"))]
async fn extract<F>(source_id: &str, job: F) -> Result<String>
where
    F: FnOnce() -> std::result::Result<String, String> + Send + 'static,
{
    let failed = |message: String| RagError::Ingestion { source_id: source_id.to_string(), message };
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(failed(format!("failed to extract text: {e}"))),
        Err(e) => Err(failed(format!("text extraction aborted: {e}"))),
    }
}

fn unsupported(path: &Path) -> RagError {
    let kind = extension_of(path).map(|e| format!(".{e}")).unwrap_or_else(|| "none".into());
    RagError::Ingestion {
        source_id: path.display().to_string(),
        message: format!("unsupported file type ({kind})"),
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn loads_markdown_with_path_as_source() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("grounding.md");
        fs::write(&path, "# Grounding\n\nName five things you can see.").unwrap();

        let docs = TextFileLoader::new().load(&path).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.starts_with("# Grounding"));
        assert_eq!(docs[0].source(), path.display().to_string());
    }

    #[tokio::test]
    async fn rejects_pdf_with_ingestion_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("guide.pdf");
        fs::write(&path, b"%PDF-1.7").unwrap();

        let err = TextFileLoader::new().load(&path).await.unwrap_err();
        match err {
            RagError::Ingestion { source_id, message } => {
                assert!(source_id.ends_with("guide.pdf"));
                assert!(message.contains(".pdf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_ingestion_error() {
        let err = TextFileLoader::new().load(Path::new("/nonexistent/notes.txt")).await.unwrap_err();
        assert!(matches!(err, RagError::Ingestion { .. }));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let loader = TextFileLoader::new();
        assert!(loader.supports(Path::new("NOTES.TXT")));
        assert!(!loader.supports(Path::new("notes.docx")));
        assert!(!loader.supports(Path::new("README")));
        let custom = TextFileLoader::new().with_extensions(["RST"]);
        assert!(custom.supports(Path::new("a.rst")));
        assert!(!custom.supports(Path::new("a.md")));
    }

    #[tokio::test]
    async fn loader_set_routes_by_extension() {
        let temp = tempfile::tempdir().unwrap();
        let notes = temp.path().join("notes.txt");
        fs::write(&notes, "Drink water and stretch.").unwrap();
        let sheet = temp.path().join("plan.xlsx");
        fs::write(&sheet, b"PK").unwrap();

        let set = LoaderSet::default();
        assert!(set.supports(&notes));
        assert!(!set.supports(&sheet));
        assert_eq!(set.load(&notes).await.unwrap()[0].text, "Drink water and stretch.");
        match set.load(&sheet).await.unwrap_err() {
            RagError::Ingestion { message, .. } => assert!(message.contains(".xlsx")),
            other => panic!("unexpected error: {other}"),
        }

        let none = LoaderSet::empty();
        assert!(!none.supports(&notes));
        assert!(none.load(&notes).await.is_err());
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn pdf_is_unsupported_without_the_feature() {
        assert!(!LoaderSet::default().supports(Path::new("guide.pdf")));
    }

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn malformed_pdf_is_an_ingestion_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("workbook.PDF");
        fs::write(&path, b"%PDF-1.7 truncated").unwrap();

        assert!(LoaderSet::default().supports(&path));
        match PdfLoader.load(&path).await.unwrap_err() {
            RagError::Ingestion { source_id, .. } => assert!(source_id.ends_with("workbook.PDF")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "docx")]
    #[tokio::test]
    async fn docx_paragraphs_become_lines() {
        use docx_rs::{Docx, Paragraph, Run};

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("coping.docx");
        let file = fs::File::create(&path).unwrap();
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Box breathing")))
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("Inhale for four."))
                    .add_run(Run::new().add_text("Hold for four.")),
            )
            .build()
            .pack(file)
            .unwrap();

        let docs = LoaderSet::default().load(&path).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Box breathing\nInhale for four.Hold for four.");
        assert_eq!(docs[0].source(), path.display().to_string());
    }

    #[cfg(feature = "docx")]
    #[tokio::test]
    async fn corrupt_docx_is_an_ingestion_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("b.docx");
        fs::write(&path, "binary").unwrap();
        assert!(matches!(DocxLoader.load(&path).await, Err(RagError::Ingestion { .. })));
    }

    #[test]
    fn discovers_nested_files_and_skips_hidden() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("nested/a.md"), "a").unwrap();
        fs::write(root.join(".cache/skip.txt"), "x").unwrap();
        fs::write(root.join(".hidden.md"), "x").unwrap();

        let files = discover_files(root).unwrap();
        assert_eq!(files, vec![root.join("b.txt"), root.join("nested/a.md")]);
    }

    #[test]
    fn discover_rejects_missing_directory() {
        assert!(discover_files("/nonexistent/knowledge").is_err());
    }
}
