//! Template catalog views: filtering, search, ordering and statistics

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::template::variable_count;
use super::types::TemplateDefinition;

/// Review status the catalog treats as sendable
pub const APPROVED: &str = "APPROVED";

/// Order in which statuses are listed
const STATUS_ORDER: [&str; 4] = ["APPROVED", "PENDING_REVIEW", "REJECTED", "DISABLED"];

/// Sort key for template listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSort {
    #[default]
    Name,
    /// Newest first
    Date,
    Status,
}

impl std::str::FromStr for TemplateSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(TemplateSort::Name),
            "date" => Ok(TemplateSort::Date),
            "status" => Ok(TemplateSort::Status),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Status counts over a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
}

/// Summary row for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub language: String,
    pub status: String,
    pub category: String,
    pub created_time: i64,
    pub variable_count: usize,
    pub body: Option<String>,
}

impl From<&TemplateDefinition> for TemplateSummary {
    fn from(t: &TemplateDefinition) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            language: t.language.clone(),
            status: t.status.clone(),
            category: t.category.clone(),
            created_time: t.created_time,
            variable_count: variable_count(t),
            body: t.body_text().map(str::to_string),
        }
    }
}

/// Approved templates in one of `languages`
///
/// An empty language list accepts every language.
pub fn approved<'a>(
    templates: &'a [TemplateDefinition],
    languages: &[String],
) -> Vec<&'a TemplateDefinition> {
    templates
        .iter()
        .filter(|t| t.status == APPROVED)
        .filter(|t| languages.is_empty() || languages.iter().any(|l| *l == t.language))
        .collect()
}

/// Case-insensitive match on name or category
pub fn matches(template: &TemplateDefinition, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || template.name.to_lowercase().contains(&query)
        || template.category.to_lowercase().contains(&query)
}

fn status_rank(status: &str) -> usize {
    STATUS_ORDER
        .iter()
        .position(|s| *s == status)
        .unwrap_or(STATUS_ORDER.len())
}

/// Sort a listing in place
pub fn sort(templates: &mut [&TemplateDefinition], key: TemplateSort) {
    let compare = |a: &&TemplateDefinition, b: &&TemplateDefinition| -> Ordering {
        match key {
            TemplateSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            TemplateSort::Date => b.created_time.cmp(&a.created_time),
            TemplateSort::Status => status_rank(&a.status).cmp(&status_rank(&b.status)),
        }
    };
    templates.sort_by(compare);
}

/// Search then sort
pub fn search<'a>(
    templates: impl IntoIterator<Item = &'a TemplateDefinition>,
    query: &str,
    key: TemplateSort,
) -> Vec<&'a TemplateDefinition> {
    let mut found: Vec<_> = templates.into_iter().filter(|t| matches(t, query)).collect();
    sort(&mut found, key);
    found
}

/// Count statuses
pub fn stats<'a>(templates: impl IntoIterator<Item = &'a TemplateDefinition>) -> CatalogStats {
    templates
        .into_iter()
        .fold(CatalogStats::default(), |mut acc, t| {
            acc.total += 1;
            match t.status.as_str() {
                "APPROVED" => acc.approved += 1,
                "PENDING_REVIEW" | "PENDING" => acc.pending += 1,
                "REJECTED" => acc.rejected += 1,
                _ => {}
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::types::{ComponentType, TemplateComponent};

    fn tpl(name: &str, lang: &str, status: &str, category: &str, created: i64) -> TemplateDefinition {
        let mut t = TemplateDefinition::new(name, lang).status(status);
        t.category = category.to_string();
        t.created_time = created;
        t
    }

    fn sample() -> Vec<TemplateDefinition> {
        vec![
            tpl("welcome", "en", "REJECTED", "MARKETING", 30),
            tpl("order_update", "en_US", "APPROVED", "UTILITY", 10),
            tpl("bienvenida", "es", "APPROVED", "MARKETING", 20),
            tpl("otp", "en", "PENDING_REVIEW", "AUTHENTICATION", 40),
        ]
    }

    #[test]
    fn test_approved_filters_status_and_language() {
        let templates = sample();
        let langs = vec!["en".to_string(), "en_US".to_string()];
        let names: Vec<_> = approved(&templates, &langs).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["order_update"]);

        assert_eq!(approved(&templates, &[]).len(), 2);
    }

    #[test]
    fn test_search_name_or_category() {
        let templates = sample();
        let names: Vec<_> = search(&templates, "market", TemplateSort::Name)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["bienvenida", "welcome"]);
        assert_eq!(search(&templates, "OTP", TemplateSort::Name).len(), 1);
        assert_eq!(search(&templates, "", TemplateSort::Name).len(), 4);
    }

    #[test]
    fn test_sort_orders() {
        let templates = sample();

        let by_date: Vec<_> = search(&templates, "", TemplateSort::Date)
            .iter()
            .map(|t| t.created_time)
            .collect();
        assert_eq!(by_date, vec![40, 30, 20, 10]);

        let by_status: Vec<_> = search(&templates, "", TemplateSort::Status)
            .iter()
            .map(|t| t.status.as_str())
            .collect();
        assert_eq!(
            by_status,
            vec!["APPROVED", "APPROVED", "PENDING_REVIEW", "REJECTED"]
        );
    }

    #[test]
    fn test_stats() {
        let templates = sample();
        assert_eq!(
            stats(&templates),
            CatalogStats {
                total: 4,
                approved: 2,
                pending: 1,
                rejected: 1
            }
        );
    }

    #[test]
    fn test_summary_counts_variables() {
        let t = TemplateDefinition::new("x", "en")
            .component(TemplateComponent::new(ComponentType::Body, "{{1}} and {{2}}"));
        let summary = TemplateSummary::from(&t);
        assert_eq!(summary.variable_count, 2);
        assert_eq!(summary.body.as_deref(), Some("{{1}} and {{2}}"));
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("Date".parse::<TemplateSort>(), Ok(TemplateSort::Date));
        assert!("size".parse::<TemplateSort>().is_err());
    }
}
