use crate::artifact::MessageTemplate;

/// One message to send: artifact bytes, recipient and batch template.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Recipient identifier (matricule) of the artifact.
    pub item_id: String,
    pub bytes: Vec<u8>,
    /// Where the service can download the artifact itself, for URL-backed artifacts.
    pub pdf_url: Option<String>,
    pub recipient_address: String,
    pub template: MessageTemplate,
}

/// What the dispatch service reports for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub delivered: bool,
    /// Address the service actually used.
    pub reported_address: String,
}
