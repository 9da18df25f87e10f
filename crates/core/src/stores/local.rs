use crate::error::StoreError;
use crate::models::{DocumentRecord, MessageRecord, UploadStatus};
use crate::traits::{DocumentStore, MessageStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryState {
    documents: Vec<DocumentRecord>,
    messages: Vec<MessageRecord>,
}

/// Document and message store kept in memory, optionally mirrored to a
/// JSON file after every mutation. Clones share state.
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    state: Arc<Mutex<LibraryState>>,
    path: Option<PathBuf>,
}

impl LocalLibrary {
    /// Purely in-memory library, used by tests and one-shot runs.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(Mutex::new(LibraryState::default())),
            path: None,
        }
    }

    /// Library mirrored to `path`; existing state is loaded if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            LibraryState::default()
        };

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            path: Some(path),
        })
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut LibraryState) -> T,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().expect("library lock");
        let value = apply(&mut state);
        if let Some(path) = &self.path {
            let raw = serde_json::to_string_pretty(&*state)?;
            std::fs::write(path, raw)?;
        }
        Ok(value)
    }

    fn read<T>(&self, view: impl FnOnce(&LibraryState) -> T) -> T {
        let state = self.state.lock().expect("library lock");
        view(&state)
    }
}

#[async_trait]
impl DocumentStore for LocalLibrary {
    async fn insert_document(&self, document: DocumentRecord) -> Result<(), StoreError> {
        self.mutate(|state| state.documents.push(document))
    }

    async fn document_for_user(
        &self,
        file_id: &str,
        user_id: &str,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self.read(|state| {
            state
                .documents
                .iter()
                .find(|doc| doc.id == file_id && doc.user_id == user_id)
                .cloned()
        }))
    }

    async fn list_documents(&self, user_id: &str) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(self.read(|state| {
            state
                .documents
                .iter()
                .filter(|doc| doc.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn update_status(&self, file_id: &str, status: UploadStatus) -> Result<(), StoreError> {
        // An unknown id means the document vanished mid-pipeline; dropping
        // the write silently would hide that.
        self.mutate(|state| {
            match state.documents.iter_mut().find(|doc| doc.id == file_id) {
                Some(doc) => {
                    doc.status = status;
                    Ok(())
                }
                None => Err(StoreError::UnknownDocument(file_id.to_string())),
            }
        })?
    }

    async fn delete_document(&self, file_id: &str) -> Result<(), StoreError> {
        self.mutate(|state| state.documents.retain(|doc| doc.id != file_id))
    }
}

#[async_trait]
impl MessageStore for LocalLibrary {
    async fn append_message(&self, message: MessageRecord) -> Result<(), StoreError> {
        self.mutate(|state| state.messages.push(message))
    }

    async fn recent_messages(
        &self,
        file_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        Ok(self.read(|state| {
            state
                .messages
                .iter()
                .filter(|msg| msg.file_id == file_id && msg.user_id == user_id)
                .rev()
                .take(limit)
                .cloned()
                .collect()
        }))
    }

    async fn delete_messages(&self, file_id: &str) -> Result<(), StoreError> {
        self.mutate(|state| state.messages.retain(|msg| msg.file_id != file_id))
    }
}
