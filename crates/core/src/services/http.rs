//! HTTP adapters for the console backend.
//!
//! Endpoints:
//! - `POST /api/upload` (multipart `file`) splits a combined document
//! - `POST /api/protect` (multipart `file`, `useMatricule`, `password`) protects it
//! - `POST /api/sendOne` sends one message: JSON `{ matricule, pdfUrl, email, subject, body }`
//!   for artifacts the backend can download, multipart `file` plus the same fields otherwise
//!
//! Successful answers carry `"message": "ok"`; anything else is treated as a
//! rejection or a malformed payload.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifact::{ArtifactRef, Location, SourceDocument};
use crate::auth::Credential;
use crate::config::ServicesConfig;
use crate::protection::PasswordPolicy;

use super::error::ServiceError;
use super::traits::{Dispatcher, Fetcher, Protector, Splitter};
use super::types::{DispatchReceipt, DispatchRequest};

const PDF_MIME: &str = "application/pdf";

/// `{ message, downloadLinks }` envelope shared by split and protect.
#[derive(Debug, Deserialize)]
struct LinksResponse<T> {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "downloadLinks")]
    download_links: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct SplitLink {
    matricule: String,
    url: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProtectedLink {
    filename: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    delivered: Option<bool>,
}

/// JSON form of `/api/sendOne`: the backend downloads `pdfUrl` itself.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOneBody<'a> {
    matricule: &'a str,
    pdf_url: &'a str,
    email: &'a str,
    subject: &'a str,
    body: &'a str,
}

impl<'a> SendOneBody<'a> {
    fn new(request: &'a DispatchRequest, pdf_url: &'a str) -> Self {
        Self {
            matricule: &request.item_id,
            pdf_url,
            email: &request.recipient_address,
            subject: &request.template.subject,
            body: &request.template.body,
        }
    }
}

/// Client for the split/protect/send endpoints of the console backend.
pub struct ConsoleClient {
    client: Client,
    base_url: String,
}

impl ConsoleClient {
    /// Create a new console client.
    pub fn new(config: &ServicesConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn pdf_part(name: &str, bytes: Vec<u8>) -> Result<Part, ServiceError> {
        Ok(Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(PDF_MIME)?)
    }

    async fn post_form(
        &self,
        path: &str,
        form: Form,
        credential: &Credential,
    ) -> Result<Response, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} (multipart)", url);
        self.execute(self.client.post(&url).multipart(form), url, credential)
            .await
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        credential: &Credential,
    ) -> Result<Response, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} (json)", url);
        self.execute(self.client.post(&url).json(body), url, credential)
            .await
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        url: String,
        credential: &Credential,
    ) -> Result<Response, ServiceError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, credential.bearer_header())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(url));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        Ok(response)
    }

    async fn read_links<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, ServiceError> {
        let body = response.text().await?;
        parse_links(&body)
    }
}

/// Accept a links envelope only when it reports `"ok"` and carries links.
fn parse_links<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, ServiceError> {
    let payload: LinksResponse<T> = serde_json::from_str(body)
        .map_err(|e| ServiceError::Malformed(format!("Failed to parse links response: {}", e)))?;

    match (payload.message.as_deref(), payload.download_links) {
        (Some("ok"), Some(links)) => Ok(links),
        (message, _) => Err(ServiceError::Malformed(format!(
            "unexpected answer: {}",
            message.unwrap_or("<no message>")
        ))),
    }
}

/// Pull `message` out of a JSON error body, falling back to the raw text.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<SendResponse>(body)
        .ok()
        .and_then(|r| r.message)
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Splitter for ConsoleClient {
    fn name(&self) -> &str {
        "console"
    }

    async fn split(
        &self,
        source: &SourceDocument,
        credential: &Credential,
    ) -> Result<Vec<ArtifactRef>, ServiceError> {
        let form = Form::new().part("file", Self::pdf_part(&source.name, source.bytes.clone())?);
        let response = self.post_form("/api/upload", form, credential).await?;
        let links: Vec<SplitLink> = Self::read_links(response).await?;

        Ok(links
            .into_iter()
            .map(|link| ArtifactRef {
                id: link.matricule,
                location: Location::Url(link.url),
                recipient_address: link.email,
            })
            .collect())
    }
}

#[async_trait]
impl Protector for ConsoleClient {
    fn name(&self) -> &str {
        "console"
    }

    async fn protect(
        &self,
        source: &SourceDocument,
        policy: &PasswordPolicy,
        credential: &Credential,
    ) -> Result<Vec<ArtifactRef>, ServiceError> {
        let mut form = Form::new()
            .part("file", Self::pdf_part(&source.name, source.bytes.clone())?)
            .text("useMatricule", policy.uses_matricule().to_string());
        if let PasswordPolicy::Fixed(secret) = policy {
            form = form.text("password", secret.clone());
        }

        let response = self.post_form("/api/protect", form, credential).await?;
        let links: Vec<ProtectedLink> = Self::read_links(response).await?;

        Ok(links
            .into_iter()
            .map(|link| ArtifactRef::new(link.filename, Location::Url(link.url)))
            .collect())
    }
}

#[async_trait]
impl Dispatcher for ConsoleClient {
    fn name(&self) -> &str {
        "console"
    }

    async fn dispatch_one(
        &self,
        request: &DispatchRequest,
        credential: &Credential,
    ) -> Result<DispatchReceipt, ServiceError> {
        let response = match request.pdf_url.as_deref() {
            Some(pdf_url) => {
                let body = SendOneBody::new(request, pdf_url);
                self.post_json("/api/sendOne", &body, credential).await?
            }
            None => {
                let form = Form::new()
                    .part(
                        "file",
                        Self::pdf_part(
                            &format!("{}.pdf", request.item_id),
                            request.bytes.clone(),
                        )?,
                    )
                    .text("matricule", request.item_id.clone())
                    .text("email", request.recipient_address.clone())
                    .text("subject", request.template.subject.clone())
                    .text("body", request.template.body.clone());
                self.post_form("/api/sendOne", form, credential).await?
            }
        };

        // The backend answers 2xx with an optional body; an empty body still means sent.
        let body = response.text().await.unwrap_or_default();
        let payload = if body.trim().is_empty() {
            SendResponse {
                message: None,
                email: None,
                delivered: None,
            }
        } else {
            serde_json::from_str::<SendResponse>(&body)
                .map_err(|e| {
                    ServiceError::Malformed(format!("Failed to parse send response: {}", e))
                })?
        };

        Ok(DispatchReceipt {
            delivered: payload.delivered.unwrap_or(true),
            reported_address: payload
                .email
                .unwrap_or_else(|| request.recipient_address.clone()),
        })
    }
}

/// Retrieves artifact bytes from URLs, local files or inline buffers.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, ServiceError> {
        match location {
            Location::Url(url) => {
                debug!("GET {}", url);
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if status == StatusCode::NOT_FOUND {
                    return Err(ServiceError::NotFound(url.clone()));
                }
                if !status.is_success() {
                    return Err(ServiceError::Rejected {
                        status: status.as_u16(),
                        message: format!("download of {} failed", url),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
            Location::File(path) => Ok(tokio::fs::read(path).await?),
            Location::Inline(bytes) => Ok(bytes.clone()),
        }
    }
}
