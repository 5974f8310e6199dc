//! Document database access

use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::constants::MONGODB_URL_KEY;
use crate::error::{ChurnError, Result};

/// One document flattened to ordered JSON fields
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Read side of a document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of `database.collection`, in store order
    async fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Document>>;
}

/// MongoDB-backed store; one client per process
pub struct MongoDocumentStore {
    client: mongodb::Client,
}

impl MongoDocumentStore {
    /// Connect using the URL in `MONGODB_URL`
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var(MONGODB_URL_KEY)
            .map_err(|_| ChurnError::MissingEnvVar(MONGODB_URL_KEY.to_string()))?;
        Self::connect(&url).await
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = mongodb::Client::with_uri_str(url).await?;
        info!("Connected to MongoDB");
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let collection_handle = self
            .client
            .database(database)
            .collection::<mongodb::bson::Document>(collection);
        let mut cursor = collection_handle.find(doc! {}).await?;

        let mut documents = Vec::new();
        while cursor.advance().await? {
            let raw = cursor.deserialize_current()?;
            if let serde_json::Value::Object(fields) = Bson::Document(raw).into_relaxed_extjson() {
                documents.push(fields);
            }
        }
        info!(database, collection, documents = documents.len(), "Fetched collection");
        Ok(documents)
    }
}

/// Store held entirely in memory, for tests and offline runs
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<(String, String), Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(
        mut self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Self {
        self.collections
            .get_mut()
            .insert((database.to_string(), collection.to_string()), documents);
        self
    }

    pub async fn insert_many(&self, database: &str, collection: &str, documents: Vec<Document>) {
        self.collections
            .write()
            .await
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .extend(documents);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&(database.to_string(), collection.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = InMemoryDocumentStore::new()
            .with_documents("db", "c", vec![document(json!({"a": 1}))]);
        store.insert_many("db", "c", vec![document(json!({"a": 2}))]).await;

        let docs = store.find_all("db", "c").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["a"], json!(2));
        assert!(store.find_all("db", "other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_url_is_configuration_error() {
        if std::env::var(MONGODB_URL_KEY).is_ok() {
            return;
        }
        let err = MongoDocumentStore::from_env().await.err().unwrap();
        assert!(matches!(err, ChurnError::MissingEnvVar(_)));
        assert!(!err.is_retryable());
    }
}
