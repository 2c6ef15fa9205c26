use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Duration;

use crate::assistant::{ChatModel, ModelTurn};
use crate::config::{AssistantConfig, Config};
use crate::error::AssistantError;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    settings: AssistantConfig,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, settings: AssistantConfig) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| AssistantError::upstream(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AssistantError> {
        let api_key = config.api_key().ok_or_else(|| {
            AssistantError::upstream("No API key configured. Set GEMINI_API_KEY or add one to config.toml.")
        })?;
        Self::new(api_key, config.assistant.clone())
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn payload(&self, transcript: &[ModelTurn]) -> Value {
        let contents: Vec<Value> = transcript
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role.as_str(),
                    "parts": [{"text": turn.text}]
                })
            })
            .collect();

        let safety_settings: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
            .collect();

        json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.settings.temperature,
                "topP": self.settings.top_p,
                "topK": self.settings.top_k,
                "maxOutputTokens": self.settings.max_output_tokens,
                "responseMimeType": "application/json"
            },
            "safetySettings": safety_settings
        })
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn complete(&self, transcript: &[ModelTurn]) -> Result<String, AssistantError> {
        tracing::debug!(model = %self.settings.model, turns = transcript.len(), "Calling Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&self.payload(transcript))
            .send()
            .await
            .map_err(|e| {
                // reqwest includes the URL, and with it the key
                let e = e.without_url();
                if e.is_timeout() {
                    AssistantError::upstream("Gemini request timed out")
                } else {
                    AssistantError::upstream(format!("Gemini request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::upstream(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::upstream(format!("Unreadable Gemini response: {}", e.without_url())))?;

        body.into_text()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, AssistantError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AssistantError::upstream(format!("Gemini blocked the prompt: {reason}")));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::upstream("Gemini returned no candidates"))?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(AssistantError::upstream(format!(
                "Gemini returned an empty candidate (finish reason: {reason})"
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", AssistantConfig::default()).unwrap()
    }

    fn parse(body: Value) -> Result<String, AssistantError> {
        serde_json::from_value::<GenerateContentResponse>(body)
            .unwrap()
            .into_text()
    }

    #[test]
    fn endpoint_targets_generate_content() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn payload_carries_transcript_and_settings() {
        let transcript = vec![ModelTurn::user("preamble"), ModelTurn::model("ack"), ModelTurn::user("hi")];
        let payload = client().payload(&transcript);

        assert_eq!(payload["contents"].as_array().unwrap().len(), 3);
        assert_eq!(payload["contents"][1], json!({"role": "model", "parts": [{"text": "ack"}]}));

        let generation = &payload["generationConfig"];
        assert_eq!(generation["topK"], json!(40));
        assert_eq!(generation["maxOutputTokens"], json!(8192));
        assert_eq!(generation["responseMimeType"], json!("application/json"));
        assert!((generation["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);

        let safety = payload["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
    }

    #[test]
    fn payload_never_contains_the_key() {
        let payload = client().payload(&[ModelTurn::user("hi")]);
        assert!(!payload.to_string().contains("test-key"));
    }

    #[test]
    fn concatenates_candidate_parts() {
        let text = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"type\": "}, {"text": "\"normal_msg\", \"msg\": \"hi\"}"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(text, r#"{"type": "normal_msg", "msg": "hi"}"#);
    }

    #[test]
    fn blocked_prompt_is_upstream_error() {
        let result = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert_eq!(result, Err(AssistantError::upstream("Gemini blocked the prompt: SAFETY")));
    }

    #[test]
    fn missing_or_empty_candidates_are_upstream_errors() {
        assert!(matches!(parse(json!({})), Err(AssistantError::Upstream(_))));
        let empty = parse(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]}));
        match empty {
            Err(AssistantError::Upstream(message)) => assert!(message.contains("MAX_TOKENS")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn from_config_requires_a_key() {
        let mut config = Config::default();
        config.assistant.api_key = Some("abc".to_string());
        assert_eq!(GeminiClient::from_config(&config).unwrap().model(), "gemini-1.5-flash");
    }
}
