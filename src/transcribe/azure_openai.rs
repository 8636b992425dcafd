use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::multipart;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::audio::AudioChunk;
use crate::config::RecognitionConfig;
use crate::error::RecognitionError;
use crate::transcribe::backend::{language_code, RecognitionClient};

const API_VERSION: &str = "2024-06-01";
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Why a single HTTP attempt failed.
#[derive(Debug, PartialEq)]
enum AttemptError {
    /// Throttling, server error, or transport failure; worth another try.
    Retryable(String),
    Fatal(String),
}

/// Azure OpenAI Whisper deployment, called once per chunk with a temp WAV upload.
pub struct AzureOpenAiRecognizer {
    endpoint: String,
    api_key: String,
    deployment: String,
    max_retries: u32,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for AzureOpenAiRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiRecognizer")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl AzureOpenAiRecognizer {
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let azure = &config.azure;
        if azure.endpoint.is_empty() {
            anyhow::bail!(
                "Azure OpenAI endpoint not configured. \
                 Set [recognition.azure] endpoint in chunkscribe.toml"
            );
        }
        if azure.deployment.is_empty() {
            anyhow::bail!(
                "Azure OpenAI deployment not configured. \
                 Set [recognition.azure] deployment in chunkscribe.toml"
            );
        }

        let api_key = if azure.api_key.is_empty() {
            std::env::var("CHUNKSCRIBE_AZURE_KEY").map_err(|_| {
                anyhow::anyhow!(
                    "Azure API key not configured. Set [recognition.azure] api_key or CHUNKSCRIBE_AZURE_KEY"
                )
            })?
        } else {
            azure.api_key.clone()
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: azure.endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment: azure.deployment.clone(),
            max_retries: config.max_retries,
            client,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
            self.endpoint, self.deployment, API_VERSION
        )
    }

    fn attempt(&self, form: multipart::Form) -> std::result::Result<String, AttemptError> {
        let response = self
            .client
            .post(self.url())
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| AttemptError::Retryable(RecognitionError::from(e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(classify_status(status, &body));
        }

        let body: TranscriptionResponse = response
            .json()
            .map_err(|e| AttemptError::Fatal(format!("invalid transcription response: {}", e)))?;
        Ok(body.text)
    }
}

fn classify_status(status: StatusCode, body: &str) -> AttemptError {
    let detail = format!("Azure OpenAI returned HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AttemptError::Retryable(detail)
    } else {
        AttemptError::Fatal(detail)
    }
}

impl RecognitionClient for AzureOpenAiRecognizer {
    fn name(&self) -> &str {
        "azure-openai"
    }

    fn recognize(&self, chunk: &AudioChunk<'_>, locale: &str) -> Result<String, RecognitionError> {
        // Removed when dropped, whichever way this function returns.
        let artifact = chunk.write_temp_wav()?;

        let mut attempt = 0;
        loop {
            let form = multipart::Form::new()
                .part(
                    "file",
                    multipart::Part::file(artifact.path())?.mime_str("audio/wav")?,
                )
                .text("response_format", "json")
                .text("language", language_code(locale).to_string());

            match self.attempt(form) {
                Ok(text) if text.trim().is_empty() => return Err(RecognitionError::Unrecognized),
                Ok(text) => return Ok(text.trim().to_string()),
                Err(AttemptError::Retryable(detail)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Chunk {}: {} (retry {}/{})",
                        chunk.number(),
                        detail,
                        attempt,
                        self.max_retries
                    );
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                }
                Err(AttemptError::Retryable(detail)) | Err(AttemptError::Fatal(detail)) => {
                    return Err(RecognitionError::Service(detail))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AzureConfig;

    fn configured() -> RecognitionConfig {
        RecognitionConfig {
            azure: AzureConfig {
                endpoint: "https://example.openai.azure.com/".to_string(),
                api_key: "test-key".to_string(),
                deployment: "whisper".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_new_missing_endpoint() {
        let result = AzureOpenAiRecognizer::new(&RecognitionConfig::default());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("endpoint"));
    }

    #[test]
    fn test_new_missing_deployment() {
        let mut config = configured();
        config.azure.deployment.clear();
        let result = AzureOpenAiRecognizer::new(&config);
        assert!(result.unwrap_err().to_string().contains("deployment"));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let recognizer = AzureOpenAiRecognizer::new(&configured()).unwrap();
        assert_eq!(
            recognizer.url(),
            "https://example.openai.azure.com/openai/deployments/whisper/audio/transcriptions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let recognizer = AzureOpenAiRecognizer::new(&configured()).unwrap();
        let debug_output = format!("{:?}", recognizer);
        assert!(!debug_output.contains("test-key"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            AttemptError::Retryable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            AttemptError::Retryable(_)
        ));
        match classify_status(StatusCode::UNAUTHORIZED, "bad key\n") {
            AttemptError::Fatal(detail) => {
                assert_eq!(detail, "Azure OpenAI returned HTTP 401: bad key")
            }
            other => panic!("expected fatal, got {:?}", other),
        }
    }
}
