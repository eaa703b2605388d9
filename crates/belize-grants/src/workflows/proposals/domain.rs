use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Identifier issued by the backend the first time a proposal is saved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value captured for a single form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Flag(_) | FieldValue::Number(_) => false,
        }
    }

    /// Numeric reading of the value. Text is accepted with thousands separators
    /// and an optional `BZD`/`$` prefix, the way applicants type amounts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(text) => {
                let cleaned: String = text
                    .trim()
                    .trim_start_matches("BZD")
                    .trim_start_matches('$')
                    .chars()
                    .filter(|ch| *ch != ',' && !ch.is_whitespace())
                    .collect();
                cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
            }
            FieldValue::Flag(_) | FieldValue::List(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            FieldValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(true),
                "false" | "no" | "off" => Some(false),
                _ => None,
            },
            FieldValue::Number(_) | FieldValue::List(_) => None,
        }
    }
}

/// Accumulated field values of an in-progress application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    fields: BTreeMap<String, FieldValue>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Overlay `other` onto this draft; later values win for the same field.
    pub fn merge(&mut self, other: &Draft) {
        for (name, value) in &other.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    pub fn merged(&self, other: &Draft) -> Draft {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Insert `value` only when the field has not been filled in yet.
    pub fn fill_missing(&mut self, name: &str, value: FieldValue) {
        let blank = self.fields.get(name).map_or(true, FieldValue::is_blank);
        if blank {
            self.fields.insert(name.to_string(), value);
        }
    }

    /// Numeric reading of a field: `0.0` when absent, NaN when present but unusable.
    pub fn amount(&self, name: &str) -> f64 {
        match self.fields.get(name) {
            None => 0.0,
            Some(value) if value.is_blank() => 0.0,
            Some(value) => value.as_number().unwrap_or(f64::NAN),
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }
}

impl FromIterator<(String, FieldValue)> for Draft {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Uploaded file bound for a specific CRM field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub field_tag: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        field_tag: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            field_tag: field_tag.into(),
            content: content.into(),
        }
    }
}

/// Position and accumulated data of one wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub current_step: usize,
    pub completed_steps: BTreeSet<usize>,
    pub draft: Draft,
    pub application_id: Option<ApplicationId>,
}

impl WizardState {
    /// Furthest step the applicant may navigate back to.
    pub fn furthest_reachable(&self) -> usize {
        self.completed_steps
            .iter()
            .next_back()
            .copied()
            .unwrap_or(0)
            .max(self.current_step)
    }

    pub fn is_completed(&self, step: usize) -> bool {
        self.completed_steps.contains(&step)
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            current_step: 1,
            completed_steps: BTreeSet::new(),
            draft: Draft::new(),
            application_id: None,
        }
    }
}
