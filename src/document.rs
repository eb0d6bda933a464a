//! Paginated document loading and identity.
//!
//! PDFs are read page by page with `lopdf`. Plain-text files (`.txt`,
//! `.md`) are split into pages on form-feed characters, which is how most
//! PDF-to-text converters mark page breaks.
//!
//! Identity is the SHA-256 of the file bytes, so renaming or moving a file
//! keeps its identity and any byte change produces a new one.

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::error::SliceError;
use crate::models::FileMeta;

const HASH_BUF_BYTES: usize = 1024 * 1024;
const PAGE_BREAK: char = '\u{000C}';

/// Random access to the text of a document's pages.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Text of the zero-based page `index`. Out-of-range pages and pages
    /// whose text cannot be decoded yield an empty string.
    fn page_text(&self, index: usize) -> String;
}

impl PageSource for [String] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page_text(&self, index: usize) -> String {
        self.get(index).cloned().unwrap_or_default()
    }
}

impl PageSource for Vec<String> {
    fn page_count(&self) -> usize {
        self.as_slice().page_count()
    }

    fn page_text(&self, index: usize) -> String {
        self.as_slice().page_text(index)
    }
}

/// An opened document.
pub enum PagedDocument {
    Pdf(lopdf::Document),
    Text(Vec<String>),
}

impl PagedDocument {
    /// Open a document, choosing the reader by file extension.
    pub fn open(path: &Path) -> Result<Self, SliceError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => {
                let bytes = read_bytes(path)?;
                Self::from_pdf_bytes(&bytes)
            }
            "txt" | "md" => {
                let bytes = read_bytes(path)?;
                Ok(Self::from_text(&String::from_utf8_lossy(&bytes)))
            }
            other => Err(SliceError::Unsupported(if other.is_empty() {
                path.display().to_string()
            } else {
                format!(".{}", other)
            })),
        }
    }

    pub fn from_pdf_bytes(bytes: &[u8]) -> Result<Self, SliceError> {
        lopdf::Document::load_mem(bytes)
            .map(PagedDocument::Pdf)
            .map_err(|e| SliceError::Pdf(e.to_string()))
    }

    pub fn from_text(text: &str) -> Self {
        PagedDocument::Text(text.split(PAGE_BREAK).map(str::to_string).collect())
    }
}

impl PageSource for PagedDocument {
    fn page_count(&self) -> usize {
        match self {
            PagedDocument::Pdf(doc) => doc.get_pages().len(),
            PagedDocument::Text(pages) => pages.len(),
        }
    }

    fn page_text(&self, index: usize) -> String {
        match self {
            PagedDocument::Pdf(doc) => {
                let Some(page_number) = index.checked_add(1).and_then(|n| u32::try_from(n).ok())
                else {
                    return String::new();
                };
                if !doc.get_pages().contains_key(&page_number) {
                    return String::new();
                }
                match doc.extract_text(&[page_number]) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(page = page_number, error = %e, "page text not extractable");
                        String::new()
                    }
                }
            }
            PagedDocument::Text(pages) => pages.page_text(index),
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, SliceError> {
    std::fs::read(path).map_err(|source| SliceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Hex SHA-256 of the file's full byte stream, read in 1 MiB blocks.
pub fn content_hash(path: &Path) -> Result<String, SliceError> {
    let io_err = |source| SliceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_BYTES];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn file_meta(path: &Path) -> Result<FileMeta, SliceError> {
    let metadata = std::fs::metadata(path).map_err(|source| SliceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let modified: DateTime<Local> = modified.into();

    Ok(FileMeta {
        path: path.to_string_lossy().to_string(),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        size_bytes: metadata.len(),
        modified_time: modified.format("%Y-%m-%dT%H:%M:%S").to_string(),
    })
}
