//! Template Variable Resolver
//!
//! Finds `{{n}}` placeholders in template components, exposes them as
//! labeled inputs, renders live previews and produces the parameter list
//! that is actually dispatched.
//!
//! Preview and dispatch treat a missing value differently: the preview keeps
//! the literal `{{n}}` so the gap is visible, while the dispatched parameter
//! becomes a single space because the Graph API rejects empty parameters.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::types::{ComponentType, TemplateDefinition};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\d+)\}\}").expect("placeholder pattern is valid"));

/// Value sent in place of a blank variable
pub const BLANK_PARAMETER: &str = " ";

/// How placeholders are collected across a template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Every occurrence in component order, duplicates kept
    #[default]
    Ordered,
    /// Each distinct token once, sorted by its number
    Distinct,
}

/// A placeholder found in template text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Number inside the braces
    pub index: u32,
    /// Literal token, e.g. `{{1}}`
    pub token: String,
}

/// One input the caller should collect a value for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInput {
    /// 1-based position the value is aligned to
    pub position: usize,
    pub label: String,
    pub hint: String,
}

/// What the variable panel should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "inputs", rename_all = "lowercase")]
pub enum VariablePanel {
    /// No template, or a template without placeholders
    Hidden,
    Visible(Vec<VariableInput>),
}

impl VariablePanel {
    pub fn inputs(&self) -> &[VariableInput] {
        match self {
            VariablePanel::Hidden => &[],
            VariablePanel::Visible(inputs) => inputs,
        }
    }
}

/// Collect placeholders from every component text, top to bottom
pub fn extract_placeholders(template: &TemplateDefinition, mode: ExtractionMode) -> Vec<Placeholder> {
    let mut found: Vec<Placeholder> = template
        .components
        .iter()
        .filter_map(|c| c.text.as_deref())
        .flat_map(|text| PLACEHOLDER.captures_iter(text))
        .filter_map(|caps| {
            let index = caps[1].parse::<u32>().ok()?;
            Some(Placeholder {
                index,
                token: caps[0].to_string(),
            })
        })
        .collect();

    if mode == ExtractionMode::Distinct {
        found.sort_by_key(|p| p.index);
        found.dedup_by(|a, b| a.token == b.token);
    }

    found
}

/// Total `{{n}}` occurrences across all component texts
pub fn variable_count(template: &TemplateDefinition) -> usize {
    template
        .components
        .iter()
        .filter_map(|c| c.text.as_deref())
        .map(|text| PLACEHOLDER.find_iter(text).count())
        .sum()
}

/// Inputs to present for the selected template
pub fn variable_panel(template: Option<&TemplateDefinition>, mode: ExtractionMode) -> VariablePanel {
    let Some(template) = template else {
        return VariablePanel::Hidden;
    };

    let placeholders = extract_placeholders(template, mode);
    if placeholders.is_empty() {
        return VariablePanel::Hidden;
    }

    VariablePanel::Visible(
        placeholders
            .into_iter()
            .enumerate()
            .map(|(i, p)| VariableInput {
                position: i + 1,
                hint: format!("Value for {}", p.token),
                label: p.token,
            })
            .collect(),
    )
}

/// Display text for a template: bold header, body, italic footer
pub fn display_text(template: &TemplateDefinition) -> String {
    let mut header = None;
    let mut body = String::new();
    let mut footer = None;

    for component in &template.components {
        let Some(text) = component.text.as_deref() else {
            continue;
        };
        match component.component_type {
            ComponentType::Body => body = text.to_string(),
            ComponentType::Header if component.format.as_deref() == Some("TEXT") => {
                header = Some(text)
            }
            ComponentType::Footer => footer = Some(text),
            _ => {}
        }
    }

    let mut out = String::new();
    if let Some(h) = header {
        out.push_str(&format!("*{}*\n\n", h));
    }
    out.push_str(&body);
    if let Some(f) = footer {
        out.push_str(&format!("\n\n_ {} _", f));
    }
    out
}

/// Substitute supplied values into `text`
///
/// Each `{{n}}` becomes `*value*` when value `n` (1-based) is present and
/// non-empty; otherwise the literal token is left in place. Text without
/// placeholders comes back unchanged.
pub fn substitute(text: &str, values: &[String]) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            let value = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| values.get(i))
                .filter(|v| !v.is_empty());
            match value {
                Some(v) => format!("*{}*", v),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Live preview of a template with the given values
pub fn render_preview(template: &TemplateDefinition, values: &[String]) -> String {
    substitute(&display_text(template), values)
}

/// Parameters to dispatch for `slots` placeholders
///
/// Values beyond `slots` are dropped and blank or missing values become a
/// single space.
pub fn dispatch_parameters(values: &[String], slots: usize) -> Vec<String> {
    (0..slots)
        .map(|i| match values.get(i) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => BLANK_PARAMETER.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::TemplateComponent;

    fn template(body: &str) -> TemplateDefinition {
        TemplateDefinition::new("greeting", "en_US")
            .component(TemplateComponent::new(ComponentType::Body, body))
    }

    #[test]
    fn test_variable_count_matches_tokens() {
        assert_eq!(variable_count(&template("Hi {{1}}, your code is {{2}}")), 2);
        assert_eq!(variable_count(&template("No tokens here")), 0);
        assert_eq!(variable_count(&TemplateDefinition::new("empty", "en")), 0);
    }

    #[test]
    fn test_variable_count_spans_components() {
        let tpl = TemplateDefinition::new("multi", "en")
            .component(TemplateComponent::new(ComponentType::Header, "Order {{1}}").format("TEXT"))
            .component(TemplateComponent::new(ComponentType::Body, "{{1}} ships {{2}}"))
            .component(TemplateComponent::new(ComponentType::Footer, "Ref {{3}}"));
        assert_eq!(variable_count(&tpl), 4);
    }

    #[test]
    fn test_extract_ordered_keeps_duplicates() {
        let tpl = template("{{2}} and {{1}} then {{2}}");
        let tokens: Vec<_> = extract_placeholders(&tpl, ExtractionMode::Ordered)
            .into_iter()
            .map(|p| p.token)
            .collect();
        assert_eq!(tokens, vec!["{{2}}", "{{1}}", "{{2}}"]);
    }

    #[test]
    fn test_extract_distinct_sorts_numerically() {
        let tpl = template("{{10}} {{2}} {{1}} {{2}}");
        let indexes: Vec<_> = extract_placeholders(&tpl, ExtractionMode::Distinct)
            .into_iter()
            .map(|p| p.index)
            .collect();
        assert_eq!(indexes, vec![1, 2, 10]);
    }

    #[test]
    fn test_panel_hidden_without_template_or_tokens() {
        assert_eq!(variable_panel(None, ExtractionMode::Ordered), VariablePanel::Hidden);
        assert_eq!(
            variable_panel(Some(&template("plain")), ExtractionMode::Ordered),
            VariablePanel::Hidden
        );
    }

    #[test]
    fn test_panel_labels() {
        let panel = variable_panel(Some(&template("Hello {{1}}")), ExtractionMode::Ordered);
        let inputs = panel.inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].position, 1);
        assert_eq!(inputs[0].label, "{{1}}");
        assert_eq!(inputs[0].hint, "Value for {{1}}");
    }

    #[test]
    fn test_preview_wraps_values() {
        let preview = render_preview(&template("Hello {{1}}"), &["Maria".to_string()]);
        assert_eq!(preview, "Hello *Maria*");
    }

    #[test]
    fn test_preview_keeps_missing_tokens() {
        let preview = render_preview(
            &template("Hello {{1}}, order {{2}}"),
            &["".to_string()],
        );
        assert_eq!(preview, "Hello {{1}}, order {{2}}");
    }

    #[test]
    fn test_substitute_without_tokens_is_identity() {
        let text = "Hello *Maria*, see you soon";
        assert_eq!(substitute(text, &["x".to_string()]), text);
    }

    #[test]
    fn test_display_text_layout() {
        let tpl = TemplateDefinition::new("full", "en")
            .component(TemplateComponent::new(ComponentType::Header, "Welcome").format("TEXT"))
            .component(TemplateComponent::new(ComponentType::Body, "Hi {{1}}"))
            .component(TemplateComponent::new(ComponentType::Footer, "Reply STOP"));
        assert_eq!(display_text(&tpl), "*Welcome*\n\nHi {{1}}\n\n_ Reply STOP _");
    }

    #[test]
    fn test_display_text_skips_media_header() {
        let tpl = TemplateDefinition::new("img", "en")
            .component(TemplateComponent::new(ComponentType::Header, "ignored").format("IMAGE"))
            .component(TemplateComponent::new(ComponentType::Body, "Body"));
        assert_eq!(display_text(&tpl), "Body");
    }

    #[test]
    fn test_dispatch_parameters_blank_becomes_space() {
        assert_eq!(dispatch_parameters(&[], 1), vec![" "]);
        assert_eq!(
            dispatch_parameters(&["Maria".to_string(), "".to_string(), "extra".to_string()], 2),
            vec!["Maria", " "]
        );
    }
}
