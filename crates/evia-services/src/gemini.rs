//! Gemini client for file uploads and content generation
//!
//! Two capabilities are exposed as traits so the complaint pipeline can be
//! tested without the network:
//! - [`AiFileStore`]: resumable upload into the Gemini Files API, returning the file URI
//! - [`AiChat`]: `generateContent` with optional file context, in one of two [`GenerationMode`]s

use anyhow::Context;
use async_trait::async_trait;
use evia_core::AiConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::upload::UploadStream;

const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to read file for upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected Gemini response: {0}")]
    InvalidResponse(String),
}

/// How the model is asked to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Strict JSON matching the complaint analysis schema
    ComplaintAnalysis,
    /// Free text in plain language
    Simplifier,
}

/// One piece of prior context sent before the user's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPart {
    File { uri: String, mime_type: String },
    Text(String),
}

#[async_trait]
pub trait AiFileStore: Send + Sync {
    /// Upload the whole stream and return the provider's file URI.
    async fn upload_file(
        &self,
        reader: UploadStream,
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, GeminiError>;
}

#[async_trait]
pub trait AiChat: Send + Sync {
    async fn send_message(
        &self,
        mode: GenerationMode,
        history: Vec<ChatPart>,
        message: &str,
    ) -> Result<String, GeminiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    uri: String,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

impl From<ChatPart> for Part {
    fn from(part: ChatPart) -> Self {
        match part {
            ChatPart::File { uri, mime_type } => Part {
                file_data: Some(FileData {
                    mime_type,
                    file_uri: uri,
                }),
                ..Default::default()
            },
            ChatPart::Text(text) => Part::text(text),
        }
    }
}

impl GenerationMode {
    fn generation_config(self) -> GenerationConfig {
        match self {
            GenerationMode::ComplaintAnalysis => GenerationConfig {
                temperature: 1.6,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 8192,
                response_mime_type: "application/json",
                response_schema: Some(complaint_analysis_schema()),
            },
            GenerationMode::Simplifier => GenerationConfig {
                temperature: 1.0,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 8192,
                response_mime_type: "text/plain",
                response_schema: None,
            },
        }
    }
}

/// Response schema mirroring `ComplaintAnalysis`. Every field is required.
fn complaint_analysis_schema() -> Value {
    let string = || json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "overview": string(),
            "conclusion": string(),
            "suggested_title": string(),
            "details": {
                "type": "OBJECT",
                "properties": {
                    "symptoms": string(),
                    "handling": string(),
                    "drug": string(),
                    "reason": string(),
                    "precautions": string(),
                },
                "required": ["symptoms", "handling", "drug", "reason", "precautions"],
            },
        },
        "required": ["overview", "conclusion", "suggested_title", "details"],
    })
}

/// HTTP client for the Gemini REST API
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    complaint_instruction: String,
    simplifier_instruction: String,
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client for Gemini")?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            complaint_instruction: config.complaint_system_instruction.clone(),
            simplifier_instruction: config.simplifier_system_instruction.clone(),
        })
    }

    fn system_instruction(&self, mode: GenerationMode) -> Option<Content> {
        let instruction = match mode {
            GenerationMode::ComplaintAnalysis => &self.complaint_instruction,
            GenerationMode::Simplifier => &self.simplifier_instruction,
        };
        if instruction.trim().is_empty() {
            return None;
        }
        Some(Content {
            role: None,
            parts: vec![Part::text(instruction.clone())],
        })
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GeminiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(GeminiError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AiFileStore for GeminiClient {
    #[tracing::instrument(skip(self, reader), fields(ai.operation = "upload_file"))]
    async fn upload_file(
        &self,
        mut reader: UploadStream,
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, GeminiError> {
        // The resumable protocol announces the size up front.
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let start = self
            .http_client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = Self::ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                GeminiError::InvalidResponse(format!("missing {} header", UPLOAD_URL_HEADER))
            })?;

        let size = bytes.len();
        let finished = self
            .http_client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let finished = Self::ensure_success(finished).await?;

        let uploaded: UploadFileResponse = finished
            .json()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))?;

        tracing::debug!(size = size, file_uri = %uploaded.file.uri, "File uploaded to Gemini");
        Ok(uploaded.file.uri)
    }
}

#[async_trait]
impl AiChat for GeminiClient {
    #[tracing::instrument(skip(self, history, message), fields(ai.operation = "generate_content", ai.model = %self.model))]
    async fn send_message(
        &self,
        mode: GenerationMode,
        history: Vec<ChatPart>,
        message: &str,
    ) -> Result<String, GeminiError> {
        let mut contents = Vec::with_capacity(2);
        if !history.is_empty() {
            contents.push(Content {
                role: Some("user".to_string()),
                parts: history.into_iter().map(Part::from).collect(),
            });
        }
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(message)],
        });

        let body = GenerateContentRequest {
            system_instruction: self.system_instruction(mode),
            contents,
            generation_config: mode.generation_config(),
        };

        let response = self
            .http_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))?;

        let parts: Vec<String> = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if parts.is_empty() {
            return Err(GeminiError::InvalidResponse(
                "no candidates in response".to_string(),
            ));
        }

        // Parts are consecutive fragments of one answer.
        Ok(parts.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> AiConfig {
        AiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: base_url.to_string(),
            timeout_secs: 5,
            complaint_system_instruction: "You are a triage assistant.".to_string(),
            simplifier_system_instruction: String::new(),
        }
    }

    #[tokio::test]
    async fn upload_file_follows_resumable_protocol() {
        let mut server = mockito::Server::new_async().await;
        let session_url = format!("{}/upload-session/abc", server.url());

        let start = server
            .mock("POST", "/upload/v1beta/files")
            .match_header("x-goog-api-key", "test-key")
            .match_header("x-goog-upload-command", "start")
            .match_header("x-goog-upload-header-content-length", "5")
            .match_header("x-goog-upload-header-content-type", "image/png")
            .match_body(Matcher::PartialJson(
                json!({ "file": { "display_name": "uploaded-image" } }),
            ))
            .with_status(200)
            .with_header(UPLOAD_URL_HEADER, &session_url)
            .create_async()
            .await;
        let finalize = server
            .mock("POST", "/upload-session/abc")
            .match_header("x-goog-upload-command", "upload, finalize")
            .match_header("x-goog-upload-offset", "0")
            .match_body("hello")
            .with_status(200)
            .with_body(r#"{"file":{"uri":"gemini://file123","name":"files/file123"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url())).unwrap();
        let reader: UploadStream = Box::pin(std::io::Cursor::new(b"hello".to_vec()));
        let uri = client
            .upload_file(reader, "image/png", "uploaded-image")
            .await
            .unwrap();

        assert_eq!(uri, "gemini://file123");
        start.assert_async().await;
        finalize.assert_async().await;
    }

    #[tokio::test]
    async fn upload_file_reports_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("POST", "/upload/v1beta/files")
            .with_status(403)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url())).unwrap();
        let reader: UploadStream = Box::pin(std::io::Cursor::new(b"hello".to_vec()));
        let err = client
            .upload_file(reader, "image/png", "uploaded-image")
            .await
            .unwrap_err();

        match err {
            GeminiError::Api { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn complaint_mode_sends_file_context_and_schema() {
        let mut server = mockito::Server::new_async().await;
        let generate = server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "systemInstruction": { "parts": [{ "text": "You are a triage assistant." }] },
                "contents": [
                    { "role": "user", "parts": [{ "fileData": { "mimeType": "image/png", "fileUri": "gemini://file123" } }] },
                    { "role": "user", "parts": [{ "text": "itchy rash on arm" }] }
                ],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "topK": 40,
                    "maxOutputTokens": 8192
                }
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"overview\":\"red "},{"text":"rash\"}"}]}}]}"#,
            )
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url())).unwrap();
        let text = client
            .send_message(
                GenerationMode::ComplaintAnalysis,
                vec![ChatPart::File {
                    uri: "gemini://file123".to_string(),
                    mime_type: "image/png".to_string(),
                }],
                "itchy rash on arm",
            )
            .await
            .unwrap();

        assert_eq!(text, "{\"overview\":\"red rash\"}");
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["overview"], "red rash");
        generate.assert_async().await;
    }

    #[tokio::test]
    async fn simplifier_mode_is_plain_text_without_schema() {
        let mut server = mockito::Server::new_async().await;
        let generate = server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "pharyngitis" }] }],
                "generationConfig": { "responseMimeType": "text/plain" }
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"A sore throat."}]}}]}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url())).unwrap();
        let text = client
            .send_message(GenerationMode::Simplifier, Vec::new(), "pharyngitis")
            .await
            .unwrap();
        assert_eq!(text, "A sore throat.");
        generate.assert_async().await;

        let body = serde_json::to_value(GenerateContentRequest {
            system_instruction: client.system_instruction(GenerationMode::Simplifier),
            contents: Vec::new(),
            generation_config: GenerationMode::Simplifier.generation_config(),
        })
        .unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _generate = server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url())).unwrap();
        let err = client
            .send_message(GenerationMode::Simplifier, Vec::new(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::InvalidResponse(_)));
    }

    #[test]
    fn schema_requires_every_field() {
        let schema = complaint_analysis_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 4);
        assert_eq!(
            schema["properties"]["details"]["required"]
                .as_array()
                .unwrap()
                .len(),
            5
        );
    }
}
