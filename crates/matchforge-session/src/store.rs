//! The credential repository: a line-oriented text file.
//!
//! One row per user, `<name>,<credential>,<rating>`, where the
//! credential is the PBKDF2 string from [`crate::password`]. This is a
//! flat external dependency, not a database: reads load the whole
//! file, and rating updates rewrite it whole.

use std::path::{Path, PathBuf};

use crate::SessionError;

/// One row of the credential file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub name: String,
    pub credential: String,
    pub rating: i32,
}

/// File-backed user repository.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store over the given file path. The file is created
    /// lazily on the first insert; a missing file reads as empty.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads every row. Malformed rows are skipped with a warning.
    pub async fn load_all(&self) -> Result<Vec<UserRecord>, SessionError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(SessionError::Store(e)),
        };

        let mut records = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(line) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!(line, "skipping malformed credential row");
                }
            }
        }
        Ok(records)
    }

    /// Finds a row by user name.
    pub async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<UserRecord>, SessionError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|record| record.name == name))
    }

    /// Appends a new row. The caller checks name uniqueness first.
    pub async fn insert(&self, record: &UserRecord) -> Result<(), SessionError> {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(SessionError::Store)?;
        file.write_all(format_row(record).as_bytes())
            .await
            .map_err(SessionError::Store)?;
        file.write_all(b"\n").await.map_err(SessionError::Store)?;
        Ok(())
    }

    /// Rewrites the ratings for the named users, preserving their
    /// stored credentials, then writes the whole file back.
    ///
    /// Read-all/rewrite-all: a row appended between the read and the
    /// write is lost. Names with no matching row are ignored.
    pub async fn update_ratings(
        &self,
        updates: &[(String, i32)],
    ) -> Result<(), SessionError> {
        let mut records = self.load_all().await?;
        for (name, rating) in updates {
            if let Some(record) =
                records.iter_mut().find(|record| &record.name == name)
            {
                record.rating = *rating;
            }
        }

        let mut contents = String::new();
        for record in &records {
            contents.push_str(&format_row(record));
            contents.push('\n');
        }
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(SessionError::Store)
    }
}

fn parse_row(line: &str) -> Option<UserRecord> {
    let mut parts = line.splitn(3, ',');
    let name = parts.next()?;
    let credential = parts.next()?;
    let rating: i32 = parts.next()?.trim().parse().ok()?;
    if name.is_empty() || credential.is_empty() {
        return None;
    }
    Some(UserRecord {
        name: name.to_string(),
        credential: credential.to_string(),
        rating,
    })
}

fn format_row(record: &UserRecord) -> String {
    format!("{},{},{}", record.name, record.credential, record.rating)
}

// =========================================================================
// Tests
// =========================================================================
