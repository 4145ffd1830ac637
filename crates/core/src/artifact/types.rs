//! Artifact and distribution item types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the bytes of an artifact can be retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Location {
    /// Remote download link handed out by the console backend.
    Url(String),
    /// File on local disk.
    File(PathBuf),
    /// Bytes held in memory.
    Inline(Vec<u8>),
}

impl Location {
    /// Short description for logs (never dumps inline bytes).
    pub fn describe(&self) -> String {
        match self {
            Location::Url(url) => url.clone(),
            Location::File(path) => path.display().to_string(),
            Location::Inline(bytes) => format!("<inline {} bytes>", bytes.len()),
        }
    }
}

/// A recipient-specific artifact.
///
/// `id` is the recipient identifier (matricule) and the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub id: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<String>,
}

impl ArtifactRef {
    pub fn new(id: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            location,
            recipient_address: None,
        }
    }

    pub fn with_recipient_address(mut self, address: impl Into<String>) -> Self {
        self.recipient_address = Some(address.into());
        self
    }
}

/// A document supplied by the caller (combined source or single artifact).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// File name, e.g. `fiches-octobre.pdf`.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// A document with no name or no content cannot be sent anywhere.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() || self.bytes.is_empty()
    }
}

/// The unit consumed by the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistributionItem {
    /// Bytes already held by the caller, not registered anywhere.
    Local {
        id: String,
        bytes: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient_address: Option<String>,
    },
    /// A registered artifact, fetched from its location at dispatch time.
    Registered(ArtifactRef),
}

impl DistributionItem {
    pub fn local(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        DistributionItem::Local {
            id: id.into(),
            bytes,
            recipient_address: None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DistributionItem::Local { id, .. } => id,
            DistributionItem::Registered(artifact) => &artifact.id,
        }
    }

    pub fn recipient_address(&self) -> Option<&str> {
        match self {
            DistributionItem::Local {
                recipient_address, ..
            } => recipient_address.as_deref(),
            DistributionItem::Registered(artifact) => artifact.recipient_address.as_deref(),
        }
    }
}

impl From<ArtifactRef> for DistributionItem {
    fn from(artifact: ArtifactRef) -> Self {
        DistributionItem::Registered(artifact)
    }
}

/// Subject and body shared by every message of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

impl MessageTemplate {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            subject: "Votre fiche de paie".to_string(),
            body: "Bonjour,\n\nVeuillez trouver ci-joint votre fiche de paie.\n\nCordialement,\nService RH"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_serialization_skips_missing_address() {
        let artifact = ArtifactRef::new("EMP001", Location::Url("http://x/EMP001.pdf".into()));
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["id"], "EMP001");
        assert_eq!(json["location"]["kind"], "url");
        assert!(json.get("recipient_address").is_none());
    }

    #[test]
    fn test_artifact_deserializes_without_address() {
        let json = r#"{"id":"EMP002","location":{"kind":"file","value":"/tmp/EMP002.pdf"}}"#;
        let artifact: ArtifactRef = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.id, "EMP002");
        assert_eq!(artifact.location, Location::File(PathBuf::from("/tmp/EMP002.pdf")));
        assert_eq!(artifact.recipient_address, None);
    }

    #[test]
    fn test_item_accessors() {
        let local = DistributionItem::Local {
            id: "EMP003".into(),
            bytes: vec![1, 2, 3],
            recipient_address: Some("a@example.com".into()),
        };
        assert_eq!(local.id(), "EMP003");
        assert_eq!(local.recipient_address(), Some("a@example.com"));

        let registered: DistributionItem =
            ArtifactRef::new("EMP004", Location::Inline(vec![9])).into();
        assert_eq!(registered.id(), "EMP004");
        assert_eq!(registered.recipient_address(), None);
    }

    #[test]
    fn test_source_document_emptiness() {
        assert!(SourceDocument::new("", vec![1]).is_empty());
        assert!(SourceDocument::new("a.pdf", vec![]).is_empty());
        assert!(!SourceDocument::new("a.pdf", vec![1]).is_empty());
    }

    #[test]
    fn test_describe_does_not_dump_bytes() {
        let location = Location::Inline(vec![0; 2048]);
        assert_eq!(location.describe(), "<inline 2048 bytes>");
    }
}
