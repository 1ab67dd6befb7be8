//! OpenRouter-compatible chat-completion client for fact generation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{CompletionError, FactCompletion};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-small-3.1-24b-instruct";

const STATUS_BODY_LIMIT: usize = 300;

pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(client: reqwest::Client, base_url: String, model: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            model,
            api_key,
        }
    }

    fn system_prompt(category: &str) -> String {
        let domain = if category.is_empty() || category == "Random" {
            "(any domain)".to_string()
        } else {
            format!("about {}", category.to_lowercase())
        };

        format!(
            "You are Sheldon Cooper — sarcastically intelligent. Provide exactly one concise \
             fun fact {domain} and then its explanation. ALWAYS prefix the fact with \"Fact:\" \
             and the explanation with \"Explanation:\". The fact must be short and \
             self-contained. Do not produce lists."
        )
    }

    fn build_request_body(&self, category: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": Self::system_prompt(category) },
                { "role": "user", "content": "Give me one fun fact and its explanation. Only one fact." },
            ],
        })
    }

    fn parse_response(body: &str) -> Result<String, CompletionError> {
        let response: CompletionResponse = serde_json::from_str(body)
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("no choices".into()))?;

        Ok(choice.message.content)
    }
}

#[async_trait]
impl FactCompletion for OpenRouterClient {
    async fn complete(&self, category: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request_body(category))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: body.chars().take(STATUS_BODY_LIMIT).collect(),
            });
        }

        Self::parse_response(body.trim())
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::OpenRouterClient;

    #[test]
    fn parse_response_extracts_first_choice_content() {
        let body = r#"{"choices":[{"message":{"content":"Fact: x\nExplanation: y"}}]}"#;
        let content = OpenRouterClient::parse_response(body).unwrap();
        assert_eq!(content, "Fact: x\nExplanation: y");
    }

    #[test]
    fn parse_response_rejects_empty_choices() {
        assert!(OpenRouterClient::parse_response(r#"{"choices":[]}"#).is_err());
        assert!(OpenRouterClient::parse_response("not json").is_err());
    }

    #[test]
    fn request_body_carries_model_and_category_prompt() {
        let client = OpenRouterClient::new(
            reqwest::Client::new(),
            "http://example.com".to_string(),
            "test-model".to_string(),
            "key".to_string(),
        );

        let body = client.build_request_body("Science");
        assert_eq!(body["model"], "test-model");

        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("about science"));
        assert!(system.contains("Fact:"));

        let random = client.build_request_body("Random");
        let system = random["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("any domain"));
    }
}
