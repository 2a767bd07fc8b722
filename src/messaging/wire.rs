//! Graph API wire format
//!
//! Request and response bodies exchanged with the WhatsApp Cloud API.

use serde::{Deserialize, Serialize};

use super::types::{OutboundMessage, Recipient, TemplateDefinition};

// ============================================
// Outbound message
// ============================================

/// `POST /{phone_number_id}/messages` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagePayload {
    pub messaging_product: String,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateBody {
    pub name: String,
    pub language: LanguageCode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentParameters>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageCode {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentParameters {
    #[serde(rename = "type")]
    pub component_type: String,
    pub parameters: Vec<TextParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextParameter {
    #[serde(rename = "type")]
    pub parameter_type: String,
    pub text: String,
}

impl TextParameter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            parameter_type: "text".to_string(),
            text: text.into(),
        }
    }
}

impl MessagePayload {
    /// Build the wire body for a message to one recipient
    ///
    /// The template `components` list is omitted when there are no
    /// parameters.
    pub fn new(message: &OutboundMessage, recipient: &Recipient) -> Self {
        let (text, template) = match message {
            OutboundMessage::Text { body } => (Some(TextBody { body: body.clone() }), None),
            OutboundMessage::Template {
                name,
                language_code,
                parameters,
            } => {
                let components = if parameters.is_empty() {
                    Vec::new()
                } else {
                    vec![ComponentParameters {
                        component_type: "body".to_string(),
                        parameters: parameters.iter().map(TextParameter::new).collect(),
                    }]
                };
                (
                    None,
                    Some(TemplateBody {
                        name: name.clone(),
                        language: LanguageCode {
                            code: language_code.clone(),
                        },
                        components,
                    }),
                )
            }
        };

        Self {
            messaging_product: "whatsapp".to_string(),
            to: recipient.digits().to_string(),
            message_type: message.kind().to_string(),
            text,
            template,
        }
    }
}

/// Successful `messages` response
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<AcceptedMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcceptedMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_status: Option<String>,
}

// ============================================
// Templates
// ============================================

/// `GET /{waba_id}/message_templates` response
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateListResponse {
    pub data: Option<Vec<TemplateDefinition>>,
}

/// `POST /{waba_id}/message_templates` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTemplate {
    pub name: String,
    pub category: String,
    pub language: String,
    pub components: Vec<NewTemplateComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTemplateComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    pub text: String,
}

impl NewTemplate {
    /// A template with a single BODY component
    pub fn body_only(
        name: impl Into<String>,
        category: impl Into<String>,
        language: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            language: language.into(),
            components: vec![NewTemplateComponent {
                component_type: "BODY".to_string(),
                text: body.into(),
            }],
        }
    }
}

/// Template creation response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatedTemplate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

// ============================================
// Errors
// ============================================

/// Error envelope returned by the Graph API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Option<RemoteError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

/// Pull `error.message` out of a response body, if there is one
pub fn remote_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to() -> Recipient {
        Recipient::from_phone("15550001111").unwrap()
    }

    #[test]
    fn test_text_payload_shape() {
        let payload = MessagePayload::new(&OutboundMessage::text("Hi"), &to());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "to": "15550001111",
                "type": "text",
                "text": {"body": "Hi"}
            })
        );
    }

    #[test]
    fn test_template_payload_shape() {
        let msg = OutboundMessage::template("hello_user", "en", vec!["Maria".into()]);
        let payload = MessagePayload::new(&msg, &to());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "to": "15550001111",
                "type": "template",
                "template": {
                    "name": "hello_user",
                    "language": {"code": "en"},
                    "components": [
                        {"type": "body", "parameters": [{"type": "text", "text": "Maria"}]}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_template_payload_omits_empty_components() {
        let msg = OutboundMessage::template("hello_world", "en_US", vec![]);
        let value = serde_json::to_value(MessagePayload::new(&msg, &to())).unwrap();
        assert!(value["template"].get("components").is_none());
    }

    #[test]
    fn test_remote_error_message() {
        let body = r#"{"error":{"message":"(#131030) Recipient not in allowed list","code":131030}}"#;
        assert_eq!(
            remote_error_message(body).as_deref(),
            Some("(#131030) Recipient not in allowed list")
        );
        assert_eq!(remote_error_message("not json"), None);
        assert_eq!(remote_error_message(r#"{"data":[]}"#), None);
    }
}
