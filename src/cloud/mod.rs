//! Clients for the external stores
//!
//! Both stores are traits so the pipeline receives explicitly constructed
//! clients by reference and tests can hand in the in-memory variants.

mod document_store;
mod model_storage;

pub use document_store::{Document, DocumentStore, InMemoryDocumentStore, MongoDocumentStore};
pub use model_storage::{InMemoryModelStorage, LocalModelStorage, ModelStorage, S3ModelStorage};
