//! Document source and reader
//!
//! Documents are opaque PDF handles. Content is only read when an
//! analysis is issued, and is forwarded to the model without inspection.

use crate::error::AnalysisError;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

pub const PDF_MIME_TYPE: &str = "application/pdf";

fn pdf_mime_type() -> String {
    PDF_MIME_TYPE.to_string()
}

//
// ================= Handles =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentHandle {
    pub name: String,
    pub uri: String,
    #[serde(skip_deserializing, default = "pdf_mime_type")]
    pub mime_type: String,
}

impl DocumentHandle {
    pub fn pdf(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            mime_type: pdf_mime_type(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::pdf(name, path.display().to_string())
    }

    /// Local path the handle points at, without any `file://` prefix
    pub fn location(&self) -> &str {
        self.uri.strip_prefix("file://").unwrap_or(&self.uri)
    }

    /// Whether the location names a `.pdf` file
    pub fn is_pdf(&self) -> bool {
        is_pdf(Path::new(self.location()))
    }
}

/// Ordered set of 1..=limit documents analysed together
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSet {
    pub set_id: Uuid,
    documents: Vec<DocumentHandle>,
}

impl DocumentSet {
    pub fn new(documents: Vec<DocumentHandle>, limit: usize) -> Result<Self> {
        if documents.is_empty() {
            return Err(AnalysisError::EmptyDocumentSet);
        }
        if documents.len() > limit {
            return Err(AnalysisError::TooManyDocuments {
                given: documents.len(),
                limit,
            });
        }
        if let Some(doc) = documents.iter().find(|d| !d.is_pdf()) {
            return Err(AnalysisError::NotPdf {
                name: doc.name.clone(),
            });
        }

        Ok(Self {
            set_id: Uuid::new_v4(),
            documents,
        })
    }

    pub fn single(document: DocumentHandle) -> Self {
        Self {
            set_id: Uuid::new_v4(),
            documents: vec![document],
        }
    }

    pub fn documents(&self) -> &[DocumentHandle] {
        &self.documents
    }

    pub fn names(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Stable hash of the selected names and locations, independent of `set_id`
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for doc in &self.documents {
            hasher.update(doc.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(doc.uri.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

//
// ================= Source =================
//

/// User-driven document selection
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Return at most `limit` PDF handles; an empty vec means the user cancelled
    async fn pick(&self, limit: usize) -> Result<Vec<DocumentHandle>>;
}

/// Picks from a fixed list of paths, e.g. CLI arguments
pub struct PathDocumentSource {
    candidates: Vec<PathBuf>,
}

impl PathDocumentSource {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[async_trait]
impl DocumentSource for PathDocumentSource {
    async fn pick(&self, limit: usize) -> Result<Vec<DocumentHandle>> {
        let mut picked = Vec::new();

        for path in &self.candidates {
            if !is_pdf(path) {
                warn!(path = %path.display(), "Skipping non-PDF document");
                continue;
            }
            if picked.len() == limit {
                warn!(path = %path.display(), limit, "Document limit reached, ignoring");
                continue;
            }
            picked.push(DocumentHandle::from_path(path));
        }

        Ok(picked)
    }
}

//
// ================= Reader =================
//

/// Reads raw document bytes for upload
#[async_trait]
pub trait DocumentReader: Send + Sync {
    async fn read(&self, handle: &DocumentHandle) -> Result<Vec<u8>>;
}

/// Filesystem reader; accepts plain paths and `file://` URIs to `.pdf` files
pub struct FsDocumentReader;

#[async_trait]
impl DocumentReader for FsDocumentReader {
    async fn read(&self, handle: &DocumentHandle) -> Result<Vec<u8>> {
        if !handle.is_pdf() {
            warn!(document = %handle.name, "Refusing to read non-PDF document");
            return Err(AnalysisError::DocumentRead {
                name: handle.name.clone(),
                reason: "not a PDF document".to_string(),
            });
        }
        let path = handle.location();

        let bytes = tokio::fs::read(path).await.map_err(|e| AnalysisError::DocumentRead {
            name: handle.name.clone(),
            reason: e.to_string(),
        })?;

        debug!(document = %handle.name, bytes = bytes.len(), "Document read");
        Ok(bytes)
    }
}

/// In-memory reader for development and tests
pub struct InMemoryDocumentReader {
    contents: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryDocumentReader {
    pub fn new() -> Self {
        Self {
            contents: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut contents) = self.contents.write() {
            contents.insert(uri.into(), bytes.into());
        }
    }
}

impl Default for InMemoryDocumentReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentReader for InMemoryDocumentReader {
    async fn read(&self, handle: &DocumentHandle) -> Result<Vec<u8>> {
        let contents = self.contents.read().map_err(|_| AnalysisError::DocumentRead {
            name: handle.name.clone(),
            reason: "reader lock poisoned".to_string(),
        })?;

        contents
            .get(&handle.uri)
            .cloned()
            .ok_or_else(|| AnalysisError::DocumentRead {
                name: handle.name.clone(),
                reason: "no such document".to_string(),
            })
    }
}
