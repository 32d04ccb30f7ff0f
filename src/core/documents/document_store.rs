use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid document path '{0}'")]
    InvalidPath(String),

    #[error("Policy document service error: {0}")]
    Host(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub path: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Workspace-owned JSON documents kept by the host.
#[async_trait]
pub trait PolicyDocumentStore: Send + Sync {
    async fn list(&self, folder: &str) -> Result<Vec<DocumentEntry>, DocumentError>;
    async fn cat(&self, path: &str) -> Result<Option<Value>, DocumentError>;
    async fn write(&self, path: &str, doc: &Value) -> Result<(), DocumentError>;
}

/// Absolute, `..`-free path with single slashes.
pub fn normalize_path(raw: &str) -> Result<String, DocumentError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(DocumentError::InvalidPath(raw.to_string()));
    }
    let mut parts = Vec::new();
    for part in trimmed.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(DocumentError::InvalidPath(raw.to_string())),
            p => parts.push(p),
        }
    }
    let mut path = format!("/{}", parts.join("/"));
    if trimmed.ends_with('/') && path.len() > 1 {
        path.push('/');
    }
    Ok(path)
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub struct InMemoryDocuments {
        pub docs: RwLock<BTreeMap<String, Value>>,
    }

    #[async_trait]
    impl PolicyDocumentStore for InMemoryDocuments {
        async fn list(&self, folder: &str) -> Result<Vec<DocumentEntry>, DocumentError> {
            let folder = normalize_path(folder)?;
            let docs = self.docs.read().await;
            Ok(docs
                .keys()
                .filter(|p| p.starts_with(folder.trim_end_matches('/')))
                .map(|p| DocumentEntry {
                    path: p.clone(),
                    updated_at: None,
                })
                .collect())
        }

        async fn cat(&self, path: &str) -> Result<Option<Value>, DocumentError> {
            let path = normalize_path(path)?;
            Ok(self.docs.read().await.get(&path).cloned())
        }

        async fn write(&self, path: &str, doc: &Value) -> Result<(), DocumentError> {
            let path = normalize_path(path)?;
            self.docs.write().await.insert(path, doc.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path("/analytics//setup").unwrap(), "/analytics/setup");
        assert_eq!(normalize_path("/analytics/").unwrap(), "/analytics/");
        assert_eq!(normalize_path("/").unwrap(), "/");
        assert!(normalize_path("analytics").is_err());
        assert!(normalize_path("/a/../b").is_err());
    }
}
