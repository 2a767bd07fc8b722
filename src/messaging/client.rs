//! WhatsApp Cloud API client
//!
//! Typed calls against the Graph endpoints used by the CRM: sending
//! messages and managing the template catalog.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

use super::transport::{GraphRequest, GraphResponse, HttpTransport, Method, TransportError};
use super::types::{OutboundMessage, Recipient, TemplateDefinition};
use super::wire::{
    remote_error_message, CreatedTemplate, MessagePayload, NewTemplate, SendResponse,
    TemplateListResponse,
};

/// Connection details for the Graph API
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Base URL, without version (e.g. "https://graph.facebook.com")
    pub base_url: String,
    /// API version path segment (e.g. "v19.0")
    pub api_version: String,
    pub phone_number_id: String,
    pub waba_id: String,
    pub token: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com".to_string(),
            api_version: "v19.0".to_string(),
            phone_number_id: String::new(),
            waba_id: String::new(),
            token: String::new(),
        }
    }
}

impl GraphConfig {
    fn versioned(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version,
            path
        )
    }

    /// `POST` target for outbound messages
    pub fn messages_url(&self) -> String {
        self.versioned(&format!("{}/messages", self.phone_number_id))
    }

    /// Template catalog of the business account
    pub fn templates_url(&self) -> String {
        self.versioned(&format!("{}/message_templates", self.waba_id))
    }

    /// A single template, addressed by id
    pub fn template_url(&self, template_id: &str) -> String {
        self.versioned(template_id)
    }
}

/// Errors from Graph calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl GraphError {
    fn remote(response: &GraphResponse, fallback: &str) -> Self {
        GraphError::Remote {
            status: response.status,
            message: remote_error_message(&response.body)
                .unwrap_or_else(|| format!("{} (HTTP {})", fallback, response.status)),
        }
    }
}

/// Graph API client over a pluggable transport
pub struct GraphClient {
    transport: Arc<dyn HttpTransport>,
    config: GraphConfig,
}

impl GraphClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: GraphConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    async fn call(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<GraphResponse, GraphError> {
        let request = GraphRequest {
            method,
            url,
            bearer_token: self.config.token.clone(),
            body,
        };
        Ok(self.transport.execute(&request).await?)
    }

    fn decode<T: DeserializeOwned>(response: &GraphResponse) -> Result<T, GraphError> {
        serde_json::from_str(&response.body).map_err(|e| GraphError::Decode(e.to_string()))
    }

    /// Send one message
    ///
    /// A 2xx response only counts when it lists an accepted message.
    /// Returns the message id assigned by WhatsApp.
    pub async fn send_message(
        &self,
        message: &OutboundMessage,
        recipient: &Recipient,
    ) -> Result<String, GraphError> {
        let payload = MessagePayload::new(message, recipient);
        let body =
            serde_json::to_value(&payload).map_err(|e| GraphError::Decode(e.to_string()))?;

        let response = self
            .call(Method::Post, self.config.messages_url(), Some(body))
            .await?;

        if !response.is_success() {
            return Err(GraphError::remote(&response, "API error"));
        }

        let accepted: SendResponse = Self::decode(&response)?;
        accepted
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| GraphError::Decode("response did not acknowledge the message".into()))
    }

    /// Relay a raw payload and hand back the response body untouched
    pub async fn send_raw(&self, payload: &MessagePayload) -> Result<GraphResponse, GraphError> {
        let body =
            serde_json::to_value(payload).map_err(|e| GraphError::Decode(e.to_string()))?;
        self.call(Method::Post, self.config.messages_url(), Some(body))
            .await
    }

    /// Fetch every template of the business account
    pub async fn list_templates(&self) -> Result<Vec<TemplateDefinition>, GraphError> {
        let response = self
            .call(Method::Get, self.config.templates_url(), None)
            .await?;

        if !response.is_success() {
            return Err(GraphError::remote(&response, "Failed to load templates"));
        }

        let list: TemplateListResponse = Self::decode(&response)?;
        list.data
            .ok_or_else(|| GraphError::Decode("template list has no data".into()))
    }

    /// Submit a new template for review
    pub async fn create_template(&self, template: &NewTemplate) -> Result<CreatedTemplate, GraphError> {
        if template.name.trim().is_empty()
            || template.components.iter().all(|c| c.text.trim().is_empty())
        {
            return Err(GraphError::Validation(
                "template name and body are required".into(),
            ));
        }

        let body =
            serde_json::to_value(template).map_err(|e| GraphError::Decode(e.to_string()))?;
        let response = self
            .call(Method::Post, self.config.templates_url(), Some(body))
            .await?;

        if !response.is_success() {
            return Err(GraphError::remote(&response, "Failed to create template"));
        }

        Self::decode(&response)
    }

    /// Delete a template by id
    pub async fn delete_template(&self, template_id: &str) -> Result<(), GraphError> {
        if template_id.trim().is_empty() {
            return Err(GraphError::Validation("template id is required".into()));
        }

        let response = self
            .call(Method::Delete, self.config.template_url(template_id), None)
            .await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(GraphError::remote(&response, "Failed to delete template"))
        }
    }
}
