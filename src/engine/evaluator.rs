use crate::error::{MonitorError, Result};
use scraper::{Html, Selector};
use std::fmt;

/// What a rule expects of the first element its selector matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Contains(String),
    NotContains(String),
}

impl Condition {
    pub fn text(&self) -> &str {
        match self {
            Condition::Contains(t) | Condition::NotContains(t) => t,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Condition::Contains(_) => Action::Contains,
            Condition::NotContains(_) => Action::DoesNotContain,
        }
    }

    fn is_satisfied_by(&self, markup: &str) -> bool {
        match self {
            Condition::Contains(t) => markup.contains(t.as_str()),
            Condition::NotContains(t) => !markup.contains(t.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Contains,
    DoesNotContain,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Contains => "contains",
            Action::DoesNotContain => "does not contain",
        })
    }
}

/// A selector paired with its condition. The selector is compiled once at load.
#[derive(Debug, Clone)]
pub struct CheckRule {
    source: String,
    selector: Selector,
    condition: Condition,
}

impl CheckRule {
    pub fn new(selector: &str, condition: Condition) -> Result<Self> {
        let compiled = Selector::parse(selector).map_err(|e| {
            MonitorError::config(format!("invalid selector {:?}: {}", selector, e))
        })?;
        Ok(Self {
            source: selector.to_string(),
            selector: compiled,
            condition,
        })
    }

    pub fn contains(selector: &str, text: &str) -> Result<Self> {
        Self::new(selector, Condition::Contains(text.to_string()))
    }

    pub fn not_contains(selector: &str, text: &str) -> Result<Self> {
        Self::new(selector, Condition::NotContains(text.to_string()))
    }

    pub fn selector(&self) -> &str {
        &self.source
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub selector: String,
    pub action: Action,
    pub item: String,
}

/// Outcome of one pass over the rule list, both vectors in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub matches: Vec<MatchResult>,
    /// Selectors that matched no element; those rules were skipped.
    pub missing: Vec<String>,
}

impl Evaluation {
    pub fn missing_errors(&self) -> impl Iterator<Item = MonitorError> + '_ {
        self.missing
            .iter()
            .map(|s| MonitorError::Selector { selector: s.clone() })
    }
}

/// Check every rule against the first element its selector matches.
pub fn evaluate(document: &Html, rules: &[CheckRule]) -> Evaluation {
    let mut evaluation = Evaluation::default();

    for rule in rules {
        let Some(element) = document.select(&rule.selector).next() else {
            evaluation.missing.push(rule.source.clone());
            continue;
        };

        // Outer HTML: the element's own tag is part of what gets searched.
        let markup = element.html();
        if rule.condition.is_satisfied_by(&markup) {
            evaluation.matches.push(MatchResult {
                selector: rule.source.clone(),
                action: rule.condition.action(),
                item: rule.condition.text().to_string(),
            });
        }
    }

    evaluation
}

/// Parse a page body and evaluate it. `Html` is not `Send`, so it stays here.
pub fn evaluate_html(html: &str, rules: &[CheckRule]) -> Evaluation {
    let document = Html::parse_document(html);
    evaluate(&document, rules)
}
