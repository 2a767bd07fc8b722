//! Message Composer
//!
//! Turns the caller's form state into an `OutboundMessage`. Composition never
//! fails; invariants are enforced by the dispatcher before sending.

use serde::{Deserialize, Serialize};

use super::template::{self, dispatch_parameters, variable_count};
use super::types::{OutboundMessage, TemplateDefinition, DEFAULT_LANGUAGE};

/// Which kind of message the caller selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Template,
}

/// Form state for one message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeRequest {
    #[serde(default)]
    pub kind: MessageKind,
    /// Body for text messages
    #[serde(default)]
    pub text: Option<String>,
    /// Selected template name
    #[serde(default)]
    pub template_name: Option<String>,
    /// Explicit language override
    #[serde(default)]
    pub language_code: Option<String>,
    /// Variable values aligned to placeholder positions
    #[serde(default)]
    pub variables: Vec<String>,
}

impl ComposeRequest {
    /// Text message request
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            text: Some(body.into()),
            ..Default::default()
        }
    }

    /// Template message request
    pub fn template(name: impl Into<String>, variables: Vec<String>) -> Self {
        Self {
            kind: MessageKind::Template,
            template_name: Some(name.into()),
            variables,
            ..Default::default()
        }
    }

    /// Builder method: override the language code
    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language_code = Some(code.into());
        self
    }
}

/// Builds messages against the currently loaded template catalog
pub struct Composer<'a> {
    catalog: &'a [TemplateDefinition],
}

impl<'a> Composer<'a> {
    pub fn new(catalog: &'a [TemplateDefinition]) -> Self {
        Self { catalog }
    }

    /// Find a template by name in the catalog
    pub fn find_template(&self, name: &str) -> Option<&'a TemplateDefinition> {
        self.catalog.iter().find(|t| t.name == name)
    }

    /// Build the outbound message
    ///
    /// For templates the language is the explicit override, then the
    /// catalog entry's language, then `en_US`. Parameters are sized to the
    /// catalog template's placeholder count, or to the supplied values when
    /// the template is unknown.
    pub fn compose(&self, request: &ComposeRequest) -> OutboundMessage {
        match request.kind {
            MessageKind::Text => OutboundMessage::text(request.text.clone().unwrap_or_default()),
            MessageKind::Template => {
                let name = request.template_name.clone().unwrap_or_default();
                let definition = self.find_template(&name);

                let language_code = request
                    .language_code
                    .clone()
                    .filter(|code| !code.trim().is_empty())
                    .or_else(|| {
                        definition
                            .map(|t| t.language.clone())
                            .filter(|code| !code.is_empty())
                    })
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

                let slots = definition
                    .map(variable_count)
                    .unwrap_or(request.variables.len());

                OutboundMessage::template(
                    name,
                    language_code,
                    dispatch_parameters(&request.variables, slots),
                )
            }
        }
    }

    /// Preview text for the request
    ///
    /// Text messages preview as-is. Templates render with emphasis around
    /// supplied values; `None` when the template is not in the catalog.
    pub fn preview(&self, request: &ComposeRequest) -> Option<String> {
        match request.kind {
            MessageKind::Text => request.text.clone().filter(|t| !t.is_empty()),
            MessageKind::Template => {
                let name = request.template_name.as_deref()?;
                let definition = self.find_template(name)?;
                Some(template::render_preview(definition, &request.variables))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::{ComponentType, TemplateComponent};

    fn catalog() -> Vec<TemplateDefinition> {
        vec![TemplateDefinition::new("hello_user", "en")
            .component(TemplateComponent::new(ComponentType::Body, "Hello {{1}}"))]
    }

    #[test]
    fn test_compose_text() {
        let catalog = catalog();
        let composer = Composer::new(&catalog);
        let msg = composer.compose(&ComposeRequest::text("Hi there"));
        assert_eq!(msg, OutboundMessage::text("Hi there"));
    }

    #[test]
    fn test_compose_text_without_body_is_not_validated() {
        let composer = Composer::new(&[]);
        let msg = composer.compose(&ComposeRequest {
            kind: MessageKind::Text,
            ..Default::default()
        });
        assert_eq!(msg, OutboundMessage::text(""));
    }

    #[test]
    fn test_compose_template_uses_catalog_language() {
        let catalog = catalog();
        let composer = Composer::new(&catalog);
        let msg = composer.compose(&ComposeRequest::template("hello_user", vec!["Maria".into()]));
        assert_eq!(
            msg,
            OutboundMessage::template("hello_user", "en", vec!["Maria".into()])
        );
    }

    #[test]
    fn test_compose_template_fills_missing_value() {
        let catalog = catalog();
        let composer = Composer::new(&catalog);
        let msg = composer.compose(&ComposeRequest::template("hello_user", vec![]));
        match msg {
            OutboundMessage::Template { parameters, .. } => assert_eq!(parameters, vec![" "]),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_compose_unknown_template_defaults() {
        let composer = Composer::new(&[]);
        let msg = composer.compose(&ComposeRequest::template(
            "not_loaded",
            vec!["a".into(), "".into()],
        ));
        assert_eq!(
            msg,
            OutboundMessage::template("not_loaded", "en_US", vec!["a".into(), " ".into()])
        );
    }

    #[test]
    fn test_compose_language_override() {
        let catalog = catalog();
        let composer = Composer::new(&catalog);
        let msg = composer.compose(&ComposeRequest::template("hello_user", vec![]).language("pt_BR"));
        match msg {
            OutboundMessage::Template { language_code, .. } => assert_eq!(language_code, "pt_BR"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_preview() {
        let catalog = catalog();
        let composer = Composer::new(&catalog);
        assert_eq!(
            composer.preview(&ComposeRequest::template("hello_user", vec!["Maria".into()])),
            Some("Hello *Maria*".to_string())
        );
        assert_eq!(composer.preview(&ComposeRequest::template("missing", vec![])), None);
        assert_eq!(composer.preview(&ComposeRequest::text("")), None);
    }
}
