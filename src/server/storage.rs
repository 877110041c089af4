//! Server-side document storage.
//!
//! Each user's documents live in one Automerge map per collection:
//! ```text
//! <DATA_DIR>/
//!   users/
//!     <user_id>/
//!       todos.automerge
//!       reminders.automerge
//!       notes.automerge
//!       settings.automerge
//! ```
//!
//! Map keys are document ids and values are the JSON-encoded document
//! bodies. The stats document is the `stats` key of `settings`.

use automerge::{transaction::Transactable, AutoCommit, ReadDoc, ROOT};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use taskmaster_core::remote::{CollectionKind, Document};

/// Key of the stats document inside the settings file.
pub const STATS_DOC_ID: &str = "stats";

/// Document files kept per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocFile {
    Collection(CollectionKind),
    Settings,
}

impl DocFile {
    pub fn filename(&self) -> &'static str {
        match self {
            DocFile::Collection(CollectionKind::Todos) => "todos.automerge",
            DocFile::Collection(CollectionKind::Reminders) => "reminders.automerge",
            DocFile::Collection(CollectionKind::Notes) => "notes.automerge",
            DocFile::Settings => "settings.automerge",
        }
    }

    /// Parse from the collection segment of a request path.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "settings" => Some(DocFile::Settings),
            other => other.parse().ok().map(DocFile::Collection),
        }
    }
}

#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// Error loading or editing an Automerge document.
    AutomergeError(PathBuf, String),
    /// User id that cannot be used as a directory name.
    InvalidUserId(String),
    InvalidCollection(String),
    /// Document body that cannot be encoded.
    InvalidDocument(String),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::AutomergeError(path, e) => {
                write!(f, "Failed to load document {}: {}", path.display(), e)
            }
            ServerStorageError::InvalidUserId(id) => write!(f, "Invalid user ID: {}", id),
            ServerStorageError::InvalidCollection(c) => write!(f, "Invalid collection: {}", c),
            ServerStorageError::InvalidDocument(e) => write!(f, "Invalid document: {}", e),
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Per-user document storage. Callers serialize writes to the same user.
#[derive(Debug, Clone)]
pub struct ServerStorage {
    data_dir: PathBuf,
}

impl ServerStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Rejects ids that could escape the users directory.
    fn validate_user_id(user_id: &str) -> Result<(), ServerStorageError> {
        if user_id.is_empty()
            || user_id.contains('/')
            || user_id.contains('\\')
            || user_id.contains("..")
            || user_id.starts_with('.')
        {
            return Err(ServerStorageError::InvalidUserId(user_id.to_string()));
        }
        Ok(())
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join("users").join(user_id)
    }

    fn doc_path(&self, user_id: &str, file: DocFile) -> PathBuf {
        self.user_dir(user_id).join(file.filename())
    }

    /// Loads a document file. Returns `Ok(None)` if it doesn't exist yet.
    pub fn load(
        &self,
        user_id: &str,
        file: DocFile,
    ) -> Result<Option<AutoCommit>, ServerStorageError> {
        Self::validate_user_id(user_id)?;
        let path = self.doc_path(user_id, file);

        match fs::read(&path) {
            Ok(bytes) => {
                let doc = AutoCommit::load(&bytes)
                    .map_err(|e| ServerStorageError::AutomergeError(path, e.to_string()))?;
                Ok(Some(doc))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerStorageError::IoError(path, e)),
        }
    }

    /// Saves a document file, creating the user directory if needed.
    pub fn save(
        &self,
        user_id: &str,
        file: DocFile,
        doc: &mut AutoCommit,
    ) -> Result<(), ServerStorageError> {
        Self::validate_user_id(user_id)?;

        let user_dir = self.user_dir(user_id);
        let path = self.doc_path(user_id, file);
        fs::create_dir_all(&user_dir)
            .map_err(|e| ServerStorageError::IoError(user_dir.clone(), e))?;

        let bytes = doc.save();
        let temp_path = path.with_extension("automerge.tmp");

        let mut out = File::create(&temp_path)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
        out.write_all(&bytes)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
        out.sync_all()
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

        fs::rename(&temp_path, &path).map_err(|e| ServerStorageError::IoError(path, e))?;
        Ok(())
    }

    /// All documents of a collection, in storage key order.
    pub fn list(
        &self,
        user_id: &str,
        kind: CollectionKind,
    ) -> Result<Vec<Document>, ServerStorageError> {
        let Some(doc) = self.load(user_id, DocFile::Collection(kind))? else {
            return Ok(Vec::new());
        };

        let mut docs = Vec::new();
        for id in doc.keys(ROOT) {
            match read_value(&doc, &id) {
                Some(data) => docs.push(Document::new(id, data)),
                None => tracing::warn!(user_id, %kind, %id, "skipping unreadable document"),
            }
        }
        Ok(docs)
    }

    pub fn get(
        &self,
        user_id: &str,
        file: DocFile,
        id: &str,
    ) -> Result<Option<Value>, ServerStorageError> {
        Ok(self
            .load(user_id, file)?
            .and_then(|doc| read_value(&doc, id)))
    }

    pub fn stats(&self, user_id: &str) -> Result<Option<Value>, ServerStorageError> {
        self.get(user_id, DocFile::Settings, STATS_DOC_ID)
    }

    /// Upserts documents in a single save.
    pub fn put_many(
        &self,
        user_id: &str,
        file: DocFile,
        docs: &[Document],
    ) -> Result<(), ServerStorageError> {
        let path = self.doc_path(user_id, file);
        let mut doc = self.load(user_id, file)?.unwrap_or_else(AutoCommit::new);

        for entry in docs {
            let body = serde_json::to_string(&entry.data)
                .map_err(|e| ServerStorageError::InvalidDocument(e.to_string()))?;
            doc.put(ROOT, entry.id.as_str(), body)
                .map_err(|e| ServerStorageError::AutomergeError(path.clone(), e.to_string()))?;
        }

        self.save(user_id, file, &mut doc)
    }

    pub fn put(
        &self,
        user_id: &str,
        file: DocFile,
        id: &str,
        data: Value,
    ) -> Result<(), ServerStorageError> {
        self.put_many(user_id, file, &[Document::new(id, data)])
    }

    /// Removes a document. Deleting a missing document is not an error.
    pub fn delete(&self, user_id: &str, file: DocFile, id: &str) -> Result<(), ServerStorageError> {
        let Some(mut doc) = self.load(user_id, file)? else {
            return Ok(());
        };
        if doc.get(ROOT, id).ok().flatten().is_none() {
            return Ok(());
        }

        let path = self.doc_path(user_id, file);
        doc.delete(ROOT, id)
            .map_err(|e| ServerStorageError::AutomergeError(path, e.to_string()))?;
        self.save(user_id, file, &mut doc)
    }
}

fn read_value(doc: &AutoCommit, id: &str) -> Option<Value> {
    let (value, _) = doc.get(ROOT, id).ok()??;
    let body = value.into_string().ok()?;
    serde_json::from_str(&body).ok()
}
