//! Attachment storage for sick and medical leave.
//!
//! Files land under `<root>/leave_documents/YYYY/MM/<uuid>.<ext>` and the
//! path relative to `root` is the durable reference stored on the request.

use std::{
    io,
    path::{Path, PathBuf},
};

use actix_web::web::{self, Bytes};
use chrono::{Datelike, NaiveDate};
use tracing::info;
use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct LocalDocumentStorage {
    root: PathBuf,
}

/// Lowercase alphanumeric extension of an uploaded filename, if any.
fn extension(filename: Option<&str>) -> Option<String> {
    let ext = Path::new(filename?).extension()?.to_str()?.to_ascii_lowercase();
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

pub fn reference_for(today: NaiveDate, filename: Option<&str>) -> String {
    let name = match extension(filename) {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    };
    format!(
        "leave_documents/{:04}/{:02}/{name}",
        today.year(),
        today.month()
    )
}

impl LocalDocumentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes the attachment and returns its reference.
    pub async fn save(
        &self,
        today: NaiveDate,
        filename: Option<&str>,
        content: Bytes,
    ) -> io::Result<String> {
        let reference = reference_for(today, filename);
        let path = self.root.join(&reference);

        web::block(move || {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, &content)
        })
        .await
        .map_err(io::Error::other)??;

        info!(document = %reference, "Stored leave document");
        Ok(reference)
    }
}
