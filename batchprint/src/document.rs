//! Documents and document sets.
//!
//! A [`Document`] is one file admitted to a batch. Its [`FileType`] is derived
//! from the extension when the document is created and never changes; an
//! unknown extension is rejected at construction. Print status is owned by the
//! print controller.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{BatchPrintError, Result};

/// Family of documents handled by one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Word processing documents.
    Word,
    /// Presentations.
    Ppt,
    /// Spreadsheets.
    Excel,
    /// PDF documents.
    Pdf,
    /// Raster images.
    Image,
    /// Plain text.
    Text,
}

impl FileType {
    /// All file types in display order.
    pub const ALL: [FileType; 6] = [
        FileType::Word,
        FileType::Ppt,
        FileType::Excel,
        FileType::Pdf,
        FileType::Image,
        FileType::Text,
    ];

    /// Map a normalized extension (lowercase, leading dot) to a file type.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match normalize_extension(extension).as_str() {
            ".doc" | ".docx" | ".wps" => Some(Self::Word),
            ".ppt" | ".pptx" | ".dps" => Some(Self::Ppt),
            ".xls" | ".xlsx" | ".et" => Some(Self::Excel),
            ".pdf" => Some(Self::Pdf),
            ".jpg" | ".jpeg" | ".png" | ".bmp" | ".tiff" | ".tif" | ".webp" | ".gif" | ".tga"
            | ".dib" => Some(Self::Image),
            ".txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Extensions that map to this type.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Word => &[".doc", ".docx", ".wps"],
            Self::Ppt => &[".ppt", ".pptx", ".dps"],
            Self::Excel => &[".xls", ".xlsx", ".et"],
            Self::Pdf => &[".pdf"],
            Self::Image => &[
                ".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".tif", ".webp", ".gif", ".tga", ".dib",
            ],
            Self::Text => &[".txt"],
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Word => "Word document",
            Self::Ppt => "PowerPoint",
            Self::Excel => "Excel workbook",
            Self::Pdf => "PDF file",
            Self::Image => "Image",
            Self::Text => "Text file",
        }
    }

    /// Stable lowercase key used in configuration files.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Ppt => "ppt",
            Self::Excel => "excel",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Print status of a queued document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintStatus {
    /// Waiting to be printed.
    #[default]
    Pending,
    /// Print job is being submitted.
    Printing,
    /// Print job was submitted successfully.
    Completed,
    /// Printing failed.
    Error,
}

impl fmt::Display for PrintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Normalize an extension to lowercase with a leading dot.
///
/// `"PDF"`, `".pdf"` and `".Pdf"` all become `".pdf"`.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// Normalized extension of a path, if it has one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(normalize_extension)
}

/// A file admitted to a document set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: Uuid,
    path: PathBuf,
    file_name: String,
    file_type: FileType,
    size: u64,
    status: PrintStatus,
    error_message: Option<String>,
    added_at: DateTime<Local>,
}

impl Document {
    /// Create a document for an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not supported, the file does not
    /// exist, or its metadata cannot be read.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_type = Self::detect_type(&path)?;

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(BatchPrintError::file_not_found(path));
            }
            Err(source) => return Err(BatchPrintError::FileNotAccessible { path, source }),
        };

        if !metadata.is_file() {
            return Err(BatchPrintError::file_not_found(path));
        }

        Ok(Self::with_size(path, file_type, metadata.len()))
    }

    /// Derive the file type of a path from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPrintError::UnsupportedFileType`] for unknown extensions.
    pub fn detect_type(path: &Path) -> Result<FileType> {
        let extension = extension_of(path).unwrap_or_default();
        FileType::from_extension(&extension)
            .ok_or_else(|| BatchPrintError::unsupported_file_type(path.to_path_buf(), extension))
    }

    fn with_size(path: PathBuf, file_type: FileType, size: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            id: Uuid::new_v4(),
            path,
            file_name,
            file_type,
            size,
            status: PrintStatus::Pending,
            error_message: None,
            added_at: Local::now(),
        }
    }

    /// Unique identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Type derived from the extension.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Size in bytes recorded when the document was created.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Size in megabytes, rounded to two decimals.
    pub fn size_mb(&self) -> f64 {
        (self.size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }

    /// Current print status.
    pub fn status(&self) -> PrintStatus {
        self.status
    }

    /// Reason for the last print failure.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// When the document was added.
    pub fn added_at(&self) -> DateTime<Local> {
        self.added_at
    }

    pub(crate) fn set_status(&mut self, status: PrintStatus) {
        self.status = status;
        if status != PrintStatus::Error {
            self.error_message = None;
        }
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = PrintStatus::Error;
        self.error_message = Some(message.into());
    }
}

/// Outcome of importing several paths into a [`DocumentSet`].
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Identifiers of the documents that were added.
    pub added: Vec<Uuid>,
    /// Paths that were already present.
    pub duplicates: Vec<PathBuf>,
    /// Paths that could not be admitted, with the reason.
    pub rejected: Vec<(PathBuf, BatchPrintError)>,
}

/// Ordered set of documents, de-duplicated by canonical path.
#[derive(Debug, Default)]
pub struct DocumentSet {
    documents: Vec<Document>,
    seen: HashSet<PathBuf>,
}

impl DocumentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn identity(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Add a single file.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPrintError::DuplicateDocument`] if the file is already
    /// present, or any error from [`Document::new`].
    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> Result<&Document> {
        let path = path.into();
        let identity = Self::identity(&path);
        if self.seen.contains(&identity) {
            return Err(BatchPrintError::DuplicateDocument { path });
        }

        let document = Document::new(path)?;
        debug!(path = %document.path().display(), file_type = %document.file_type(), "document added");
        self.seen.insert(identity);
        self.documents.push(document);
        Ok(&self.documents[self.documents.len() - 1])
    }

    /// Add several files, collecting per-path failures instead of stopping.
    pub fn add_files<I, P>(&mut self, paths: I) -> ImportReport
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut report = ImportReport::default();
        for path in paths {
            let path = path.into();
            match self.add_file(path.clone()) {
                Ok(document) => report.added.push(document.id()),
                Err(BatchPrintError::DuplicateDocument { path }) => report.duplicates.push(path),
                Err(err) => report.rejected.push((path, err)),
            }
        }
        report
    }

    /// Add every supported file below `dir` whose type passes `accept`.
    ///
    /// Files with unknown extensions are ignored rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is not a directory.
    pub fn add_folder<F>(&mut self, dir: &Path, recursive: bool, accept: F) -> Result<ImportReport>
    where
        F: Fn(FileType) -> bool,
    {
        if !dir.is_dir() {
            return Err(BatchPrintError::file_not_found(dir.to_path_buf()));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut candidates = Vec::new();

        for entry in WalkDir::new(dir)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Ok(file_type) = Document::detect_type(entry.path())
                && accept(file_type)
            {
                candidates.push(entry.into_path());
            }
        }

        Ok(self.add_files(candidates))
    }

    /// Remove a document by id.
    pub fn remove(&mut self, id: Uuid) -> Option<Document> {
        let index = self.documents.iter().position(|doc| doc.id() == id)?;
        let document = self.documents.remove(index);
        self.seen.remove(&Self::identity(document.path()));
        Some(document)
    }

    /// Remove all documents.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.seen.clear();
    }

    /// Look up a document by id.
    pub fn get(&self, id: Uuid) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: Uuid) -> Option<&mut Document> {
        self.documents.iter_mut().find(|doc| doc.id() == id)
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Iterate over documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total size of all documents in bytes.
    pub fn total_size(&self) -> u64 {
        self.documents.iter().map(Document::size).sum()
    }

    /// Number of documents per file type.
    pub fn count_by_type(&self) -> BTreeMap<FileType, usize> {
        let mut counts = BTreeMap::new();
        for document in &self.documents {
            *counts.entry(document.file_type()).or_insert(0) += 1;
        }
        counts
    }
}
