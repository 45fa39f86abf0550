//! Gemini `generateContent` client.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDate};
use liquida_core::{CandidateFile, SettlementResult};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::prompt::build_prompt;
use crate::retry::{RetryPolicy, with_retry};
use crate::schema::response_schema;
use crate::ExtractError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Which hosted model performs the calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelVariant {
    /// Fast model, no extended reasoning.
    #[default]
    Flash,
    /// Slower model with a large reasoning budget.
    Pro,
}

impl ModelVariant {
    pub fn model_id(&self) -> &'static str {
        match self {
            Self::Flash => "gemini-3-flash-preview",
            Self::Pro => "gemini-3-pro-preview",
        }
    }

    pub fn thinking_budget(&self) -> u32 {
        match self {
            Self::Flash => 0,
            Self::Pro => 32768,
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flash" | "gemini-3-flash-preview" => Ok(Self::Flash),
            "pro" | "gemini-3-pro-preview" => Ok(Self::Pro),
            other => Err(format!("unknown model variant: {other}")),
        }
    }
}

/// Everything sent to the model for one document.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub instructions: String,
    pub employer_percent: f64,
    pub model: ModelVariant,
    /// Base date quoted in the prompt.
    pub issued_on: NaiveDate,
}

impl ExtractionRequest {
    /// Read a queued file from disk and build a request dated today.
    pub async fn from_file(
        file: &CandidateFile,
        instructions: &str,
        employer_percent: f64,
        model: ModelVariant,
    ) -> Result<Self, ExtractError> {
        let data = tokio::fs::read(&file.path).await?;
        Ok(Self {
            file_name: file.name.clone(),
            mime_type: file.mime.clone(),
            data,
            instructions: instructions.to_string(),
            employer_percent,
            model,
            issued_on: Local::now().date_naive(),
        })
    }

    /// JSON body of the `generateContent` call.
    pub fn body(&self) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "text": build_prompt(&self.instructions, self.employer_percent, self.issued_on) },
                    { "inlineData": { "mimeType": self.mime_type, "data": STANDARD.encode(&self.data) } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
                "thinkingConfig": { "thinkingBudget": self.model.thinking_budget() }
            }
        })
    }
}

/// Source of settlement calculations for documents.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<SettlementResult, ExtractError>;
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Pull a readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if env.error.status.is_empty() => env.error.message,
        Ok(env) => format!("{} ({})", env.error.message, env.error.status),
        Err(_) => body.to_string(),
    }
}

/// HTTP client for the Gemini API.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Create a client for `base_url` (e.g. [`DEFAULT_API_BASE`], no
    /// trailing slash needed) with a per-request timeout.
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One `generateContent` call, without retry.
    pub async fn generate(
        &self,
        request: &ExtractionRequest,
    ) -> Result<SettlementResult, ExtractError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            request.model.model_id()
        );

        info!(
            file = %request.file_name,
            model = %request.model,
            bytes = request.data.len(),
            "requesting settlement calculation"
        );
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request.body())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::EmptyResponse);
        }

        debug!(chars = text.len(), "received model response");
        let result = SettlementResult::from_json(text)?;
        info!(
            items = result.items.len(),
            possible = result.calculation_possible,
            "parsed settlement result"
        );
        Ok(result)
    }
}

#[async_trait]
impl Extractor for GeminiClient {
    async fn extract(&self, request: &ExtractionRequest) -> Result<SettlementResult, ExtractError> {
        with_retry(&self.retry, || self.generate(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn request(model: ModelVariant) -> ExtractionRequest {
        ExtractionRequest {
            file_name: "inicial.pdf".into(),
            mime_type: "application/pdf".into(),
            data: b"%PDF-1.4".to_vec(),
            instructions: "sem honorários".into(),
            employer_percent: 20.0,
            model,
            issued_on: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
        }
    }

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(&server.base_url(), "test-key".into(), Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(RetryPolicy::immediate(2))
    }

    fn candidate(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn model_variants() {
        assert_eq!(ModelVariant::default(), ModelVariant::Flash);
        assert_eq!(ModelVariant::Pro.model_id(), "gemini-3-pro-preview");
        assert_eq!(ModelVariant::Pro.thinking_budget(), 32768);
        assert_eq!(ModelVariant::Flash.thinking_budget(), 0);
        assert_eq!("PRO".parse::<ModelVariant>().unwrap(), ModelVariant::Pro);
        assert!("ultra".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn body_carries_document_and_config() {
        let body = request(ModelVariant::Pro).body();
        let parts = &body["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("INSS PATRONAL: 20%"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], STANDARD.encode(b"%PDF-1.4"));

        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["thinkingConfig"]["thinkingBudget"], 32768);
        assert_eq!(config["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn error_message_prefers_api_envelope() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(error_message(body), "Quota exceeded (RESOURCE_EXHAUSTED)");
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn parses_candidate_text() {
        let server = MockServer::start_async().await;
        let payload = r#"{"reclamante": "Ana", "reclamada": "ACME", "verbas": [{"descricao": "a) Saldo", "valorCorrigido": 100}], "isCalculationPossible": true}"#;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-3-flash-preview:generateContent")
                    .header("x-goog-api-key", "test-key");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(candidate(payload));
            })
            .await;

        let result = client(&server).extract(&request(ModelVariant::Flash)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(result.claimant, "Ana");
        assert_eq!(result.items[0].corrected, 100.0);
        assert!(result.calculation_possible);
    }

    #[tokio::test]
    async fn empty_candidate_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let err = client(&server).extract(&request(ModelVariant::Flash)).await.unwrap_err();
        assert!(matches!(err, ExtractError::EmptyResponse));
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500)
                    .json_body(json!({ "error": { "message": "backend down" } }));
            })
            .await;

        let err = client(&server).extract(&request(ModelVariant::Pro)).await.unwrap_err();
        mock.assert_calls_async(1).await;
        match err {
            ExtractError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "backend down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_retries_then_gives_up() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).json_body(json!({
                    "error": { "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
                }));
            })
            .await;

        let err = client(&server).extract(&request(ModelVariant::Flash)).await.unwrap_err();
        mock.assert_calls_async(3).await;
        assert!(matches!(err, ExtractError::QuotaExceeded { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn from_file_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let file = CandidateFile::from_path(&path).unwrap();

        let req = ExtractionRequest::from_file(&file, "obs", 23.0, ModelVariant::Pro)
            .await
            .unwrap();
        assert_eq!(req.mime_type, "image/png");
        assert_eq!(req.data.len(), 4);
        assert_eq!(req.model, ModelVariant::Pro);
    }
}
