//! File-backed visitor counter.
//!
//! The count lives in memory behind a mutex and is written through on every
//! increment (temp file + rename, so a crash never leaves a torn file).

use std::path::{Path, PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::errors::failure_response;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Visitor counter I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Visitor counter file is corrupt: {0}")]
    Parse(#[from] serde_json::Error),
}

impl IntoResponse for CounterError {
    fn into_response(self) -> Response {
        error!("{self}");
        failure_response(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string())
    }
}

/// On-disk shape of the counter file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitorRecord {
    pub count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct VisitorCounter {
    path: PathBuf,
    record: Mutex<VisitorRecord>,
}

impl VisitorCounter {
    /// Loads the counter, starting from zero when the file does not exist yet.
    pub async fn load(path: PathBuf) -> Result<Self, CounterError> {
        let record = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VisitorRecord::default(),
            Err(e) => return Err(e.into()),
        };
        info!("Visitor counter loaded from {} (count={})", path.display(), record.count);

        Ok(Self {
            path,
            record: Mutex::new(record),
        })
    }

    pub async fn current(&self) -> u64 {
        self.record.lock().await.count
    }

    /// Bumps the count and persists it. The in-memory value only changes if the
    /// write succeeded.
    pub async fn increment(&self) -> Result<u64, CounterError> {
        let mut record = self.record.lock().await;
        let next = VisitorRecord {
            count: record.count + 1,
            updated_at: Some(Utc::now()),
        };
        persist(&self.path, &next).await?;
        *record = next;
        Ok(next.count)
    }
}

async fn persist(path: &Path, record: &VisitorRecord) -> Result<(), CounterError> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(record)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
