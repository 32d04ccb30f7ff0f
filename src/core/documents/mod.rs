pub mod document_store;
pub mod policy_document_tool;

pub use document_store::{DocumentEntry, DocumentError, PolicyDocumentStore};
pub use policy_document_tool::PolicyDocumentTool;

#[cfg(test)]
pub use document_store::testing;
