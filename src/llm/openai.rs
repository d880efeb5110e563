//! OpenAI-compatible client backing both the planning capability and the
//! vision-based coordinate fallback.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{resolve_api_key, LlmConfig};
use crate::errors::{OmniPilotError, OmniPilotResult};
use crate::llm::prompts::{locator_prompt, SYSTEM_PROMPT};
use crate::llm::provider::{PlanningProvider, VisionLocator};
use crate::llm::types::{
    extract_json, ChatMessage, ContentPart, ImageUrl, MessageContent, Plan,
};
use crate::perception::types::UIElement;

pub struct OpenAiCompatibleClient {
    api_base: String,
    model: String,
    vision_model: String,
    temperature: f32,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    /// Returns `None` when no API key is resolvable — the caller treats the
    /// planning capability as unconfigured rather than failing startup.
    pub fn from_config(llm: &LlmConfig) -> Option<Self> {
        let api_key = resolve_api_key(llm)?;
        Some(Self {
            api_base: llm.api_base.clone(),
            model: llm.model.clone(),
            vision_model: llm.vision_model.clone().unwrap_or_else(|| llm.model.clone()),
            temperature: llm.temperature,
            api_key,
            client: reqwest::Client::new(),
        })
    }

    /// One non-streaming chat completion; returns the assistant content.
    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        json_mode: bool,
    ) -> OmniPilotResult<String> {
        let mut body = serde_json::json!({
            "model": model,
            "messages": &messages,
            "temperature": self.temperature,
        });
        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        tracing::debug!(model, json_mode, "sending LLM request");

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(OmniPilotError::Planner(format!("{status}: {err_body}")));
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        tracing::debug!(content_len = content.len(), "LLM response received");
        Ok(content)
    }
}

#[async_trait]
impl PlanningProvider for OpenAiCompatibleClient {
    async fn decide_next_step(
        &self,
        goal: &str,
        elements: &[UIElement],
    ) -> OmniPilotResult<Plan> {
        let mut context = String::from("VISIBLE UI ELEMENTS:\n");
        for element in elements {
            context.push_str(&format!(
                "- \"{}\" at ({}, {})\n",
                element.text, element.center.0, element.center.1
            ));
        }
        if elements.is_empty() {
            context.push_str("(none detected)\n");
        }

        let messages = vec![
            ChatMessage::text("system", SYSTEM_PROMPT),
            ChatMessage::text("user", format!("GOAL: {goal}\n\n{context}")),
        ];

        let content = self.chat(&self.model, messages, true).await?;
        Ok(Plan::from_response(&content))
    }
}

#[derive(Debug, Deserialize)]
struct PointReply {
    x: f64,
    y: f64,
}

#[async_trait]
impl VisionLocator for OpenAiCompatibleClient {
    async fn locate(
        &self,
        image_b64: &str,
        description: &str,
    ) -> OmniPilotResult<Option<(u32, u32)>> {
        let messages = vec![ChatMessage {
            role: "user".into(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{image_b64}"),
                    },
                },
                ContentPart::Text {
                    text: locator_prompt(description),
                },
            ]),
        }];

        let content = self.chat(&self.vision_model, messages, false).await?;

        let Some(json) = extract_json(&content) else {
            tracing::warn!("vision locator reply contained no JSON object");
            return Ok(None);
        };
        match serde_json::from_str::<PointReply>(&json) {
            Ok(point) if point.x >= 0.0 && point.y >= 0.0 => {
                Ok(Some((point.x as u32, point.y as u32)))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "vision locator reply did not parse");
                Ok(None)
            }
        }
    }
}
