/// Knowledge document types
///
/// A document is uniquely identified by `(id, partition_key)`; the partition
/// key is the grouping key for the source, typically the origin of the URL
/// the content was scraped from. Embedding dimension consistency across the
/// store is a caller precondition, not enforced here.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,

    pub partition_key: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub content: String,

    /// Fixed-length embedding of the document summary, when computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_embedding: Option<Vec<f32>>,

    /// Free-form fields (risk scores, source labels, timestamps)
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl KnowledgeDocument {
    pub fn new(id: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
            url: String::new(),
            content: String::new(),
            summary_embedding: None,
            metadata: Map::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.summary_embedding = Some(embedding);
        self
    }

    pub fn with_metadata_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Search result: a document and its similarity score against the query
/// vector. Higher score means more similar; results are ordered ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: KnowledgeDocument,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_populates_fields() {
        let doc = KnowledgeDocument::new("doc-1", "https://example.com")
            .with_url("https://example.com/report")
            .with_content("token risk report")
            .with_embedding(vec![0.1, 0.2])
            .with_metadata_field("risk_score", Value::from(0.8));

        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.summary_embedding.as_deref(), Some(&[0.1, 0.2][..]));
        assert_eq!(doc.metadata["risk_score"], Value::from(0.8));
    }

    #[test]
    fn embedding_omitted_when_absent() {
        let doc = KnowledgeDocument::new("doc-1", "pk");
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("summary_embedding"));
    }
}
