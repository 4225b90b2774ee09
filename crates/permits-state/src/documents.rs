//! # Document Attachment Batch
//!
//! Validates the document metadata uploaded with a submission. A batch is
//! accepted or refused as a whole: [`validate_batch`] either returns every
//! [`Document`] record to persist or the first reason none may be.
//!
//! The file bytes live with the storage collaborator; only its `file_url`
//! is kept here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use permits_core::{ApplicationId, DocumentId, DocumentType, Timestamp};

/// One uploaded document as described by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub mime_type: String,
    pub document_type: DocumentType,
    #[serde(default)]
    pub file_url: String,
}

/// A persisted attachment. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub application_id: ApplicationId,
    pub file_name: String,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub document_type: DocumentType,
    pub file_url: String,
    pub created_at: Timestamp,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("at least one document is required")]
    Empty,

    /// The storage collaborator's URL is missing or cannot be resolved.
    #[error("document {index} has no resolvable file URL")]
    MissingUrl { index: usize },

    #[error("document {index} is invalid: {reason}")]
    Invalid { index: usize, reason: String },

    #[error("missing required documents: {}", list(.missing))]
    IncompleteSet { missing: Vec<DocumentType> },
}

impl DocumentError {
    /// Whether the submission as a whole is incomplete, as opposed to one
    /// document being malformed.
    pub fn is_incomplete_submission(&self) -> bool {
        matches!(self, Self::Empty | Self::MissingUrl { .. })
    }
}

fn list(types: &[DocumentType]) -> String {
    types
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn resolvable(file_url: &str) -> bool {
    Url::parse(file_url.trim()).is_ok_and(|u| !u.cannot_be_a_base())
}

/// Required categories not covered by `attached`, sorted and distinct.
pub fn missing_categories(
    attached: impl IntoIterator<Item = DocumentType>,
    required: &[DocumentType],
) -> Vec<DocumentType> {
    let attached: BTreeSet<DocumentType> = attached.into_iter().collect();
    required
        .iter()
        .copied()
        .filter(|t| !attached.contains(t))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Validate a batch against the permit type's required categories and
/// build the records to persist.
pub fn validate_batch(
    application_id: ApplicationId,
    uploads: Vec<DocumentUpload>,
    required: &[DocumentType],
    now: Timestamp,
) -> Result<Vec<Document>, DocumentError> {
    if uploads.is_empty() {
        return Err(DocumentError::Empty);
    }
    for (index, upload) in uploads.iter().enumerate() {
        if !resolvable(&upload.file_url) {
            return Err(DocumentError::MissingUrl { index });
        }
        if upload.file_name.trim().is_empty() {
            return Err(DocumentError::Invalid {
                index,
                reason: "file name is empty".to_string(),
            });
        }
        if upload.file_size <= 0 {
            return Err(DocumentError::Invalid {
                index,
                reason: format!("file size must be positive, got {}", upload.file_size),
            });
        }
    }

    let missing = missing_categories(uploads.iter().map(|u| u.document_type), required);
    if !missing.is_empty() {
        return Err(DocumentError::IncompleteSet { missing });
    }

    Ok(uploads
        .into_iter()
        .map(|u| {
            let original_name = if u.original_name.trim().is_empty() {
                u.file_name.clone()
            } else {
                u.original_name
            };
            Document {
                id: DocumentId::new(),
                application_id,
                file_name: u.file_name,
                original_name,
                file_size: u.file_size,
                mime_type: u.mime_type,
                document_type: u.document_type,
                file_url: u.file_url.trim().to_string(),
                created_at: now,
            }
        })
        .collect())
}
