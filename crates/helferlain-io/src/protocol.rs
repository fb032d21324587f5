//! Wire types of the public chat API.

use serde::{Deserialize, Serialize};

/// Bot identity and branding, fetched once per widget during init.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BotConfig {
    pub name: String,
    #[serde(default)]
    pub branding: Branding,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Branding {
    pub welcome_message: Option<String>,
    pub primary_color: Option<String>,
    pub logo_url: Option<String>,
}

/// Body of `POST /bot/{bot_id}/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub metadata: Option<ChatMetadata>,
}

/// Citation attached to an assistant response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Source {
    pub title: String,
    pub url: Option<String>,
}

/// Backend-requested follow-up actions after a response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatMetadata {
    #[serde(default)]
    pub show_email_modal: bool,
    pub email_prompt: Option<String>,
    #[serde(default)]
    pub show_contact_modal: bool,
    #[serde(default)]
    pub contact_persons: Vec<ContactPerson>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContactPerson {
    pub name: String,
    pub role: String,
}

impl ChatMetadata {
    pub fn wants_escalation(&self) -> bool {
        self.show_email_modal || self.show_contact_modal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_config_without_branding() {
        let config: BotConfig = serde_json::from_str(r#"{"name":"Hilfe-Bot"}"#).unwrap();
        assert_eq!(config.name, "Hilfe-Bot");
        assert!(config.branding.welcome_message.is_none());
    }

    #[test]
    fn chat_response_minimal() {
        let response: ChatResponse = serde_json::from_str(r#"{"response":"Ab 99€"}"#).unwrap();
        assert_eq!(response.response, "Ab 99€");
        assert!(response.sources.is_empty());
        assert!(response.metadata.is_none());
    }

    #[test]
    fn chat_response_with_metadata() {
        let raw = r#"{
            "response": "Gerne!",
            "sources": [{"title": "Preisliste", "url": "https://example.com/preise"}],
            "metadata": {"show_email_modal": true, "email_prompt": "Ihre E-Mail?"}
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.sources.len(), 1);
        let metadata = response.metadata.unwrap();
        assert!(metadata.wants_escalation());
        assert_eq!(metadata.email_prompt.as_deref(), Some("Ihre E-Mail?"));
    }

    #[test]
    fn chat_request_field_names() {
        let request = ChatRequest {
            message: "Preise?".into(),
            conversation_id: "session_1_a".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["message"], "Preise?");
        assert_eq!(json["conversation_id"], "session_1_a");
    }
}
