use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::blueprint::{AwardFieldMap, FieldKind, FieldSpec, WizardBlueprint};
use super::domain::{Draft, FieldValue};
use crate::workflows::awards::{assess, AwardCategory, BudgetFigures, EligibilityIssue};

/// Result of validating one step: field name → message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepValidation {
    pub valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl StepValidation {
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    pub fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Fold another result in, keeping the first message reported per field.
    pub fn absorb(&mut self, other: StepValidation) {
        for (field, message) in other.errors {
            self.errors.entry(field).or_insert(message);
        }
        self.valid = self.errors.is_empty();
    }
}

/// Per-step validator. `fields` is the draft as it would look after the step merges.
pub trait StepValidator: Send + Sync {
    fn validate(&self, step: usize, fields: &Draft) -> StepValidation;
}

/// Presence and shape checks for the fields a step declares.
#[derive(Debug, Clone)]
pub struct FieldRulesValidator {
    fields: Vec<FieldSpec>,
}

impl FieldRulesValidator {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }
}

impl StepValidator for FieldRulesValidator {
    fn validate(&self, _step: usize, fields: &Draft) -> StepValidation {
        let mut errors = BTreeMap::new();

        for spec in &self.fields {
            let value = fields.get(spec.name).filter(|value| !value.is_blank());
            let message = match value {
                None if spec.required => Some(format!("{} is required", spec.label)),
                None => None,
                Some(value) => check_kind(spec, value),
            };
            if let Some(message) = message {
                errors.insert(spec.name.to_string(), message);
            }
        }

        StepValidation::from_errors(errors)
    }
}

fn check_kind(spec: &FieldSpec, value: &FieldValue) -> Option<String> {
    match spec.kind {
        FieldKind::Text => None,
        FieldKind::Email => {
            let valid = value.as_text().map(str::trim).is_some_and(looks_like_email);
            (!valid).then(|| format!("{} must be a valid email address", spec.label))
        }
        FieldKind::Amount => {
            let valid = value.as_number().is_some_and(|amount| amount >= 0.0);
            (!valid).then(|| format!("{} must be a non-negative amount", spec.label))
        }
        FieldKind::Months => {
            let valid = value
                .as_number()
                .is_some_and(|months| months >= 1.0 && months.fract() == 0.0);
            (!valid).then(|| format!("{} must be a whole number of months", spec.label))
        }
        FieldKind::Acknowledgement => {
            let accepted = value.as_flag() == Some(true);
            (!accepted).then(|| format!("{} must be accepted", spec.label))
        }
    }
}

fn looks_like_email(raw: &str) -> bool {
    match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !raw.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Award-category cross-field checks, limited to the fields a step owns.
#[derive(Debug, Clone)]
pub struct AwardRulesValidator {
    map: AwardFieldMap,
    scope: Vec<&'static str>,
}

impl AwardRulesValidator {
    pub fn new(map: AwardFieldMap, scope: Vec<&'static str>) -> Self {
        Self { map, scope }
    }

    fn owns(&self, field: &str) -> bool {
        self.scope.iter().any(|name| *name == field)
    }
}

impl StepValidator for AwardRulesValidator {
    fn validate(&self, _step: usize, fields: &Draft) -> StepValidation {
        let mut errors = BTreeMap::new();

        let raw_category = fields
            .get(self.map.category)
            .filter(|value| !value.is_blank());
        let category = raw_category
            .and_then(FieldValue::as_text)
            .and_then(AwardCategory::parse);

        if raw_category.is_some() && category.is_none() && self.owns(self.map.category) {
            let options: Vec<_> = AwardCategory::ordered()
                .iter()
                .map(|category| category.label())
                .collect();
            errors.insert(
                self.map.category.to_string(),
                format!("Award category must be one of: {}", options.join(", ")),
            );
        }

        let figures = BudgetFigures::new(
            fields.amount(self.map.requested_amount),
            fields.amount(self.map.co_financing_amount),
        );
        let duration = fields
            .get(self.map.duration_months)
            .filter(|value| !value.is_blank())
            .map(|_| fields.amount(self.map.duration_months));

        for issue in assess(category, &figures, duration) {
            let field = match issue {
                EligibilityIssue::FundingOutOfRange { .. } => self.map.requested_amount,
                EligibilityIssue::CoFinancingOutOfRange { .. } => self.map.co_financing_amount,
                EligibilityIssue::DurationTooLong { .. } => self.map.duration_months,
            };
            if self.owns(field) {
                errors
                    .entry(field.to_string())
                    .or_insert_with(|| issue.summary());
            }
        }

        StepValidation::from_errors(errors)
    }
}

/// Explicit step index → validators mapping, resolved once per blueprint.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<usize, Vec<Arc<dyn StepValidator>>>,
}

impl ValidatorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Field rules for every step plus award rules where the step declares them.
    pub fn for_blueprint(blueprint: &WizardBlueprint) -> Self {
        let mut registry = Self::empty();
        for step in blueprint.steps() {
            registry = registry.register(
                step.index,
                Arc::new(FieldRulesValidator::new(step.fields.clone())),
            );
            if let Some(map) = step.award_rules {
                let scope = step.fields.iter().map(|field| field.name).collect();
                registry =
                    registry.register(step.index, Arc::new(AwardRulesValidator::new(map, scope)));
            }
        }
        registry
    }

    pub fn register(mut self, step: usize, validator: Arc<dyn StepValidator>) -> Self {
        self.validators.entry(step).or_default().push(validator);
        self
    }

    pub fn validate(&self, step: usize, fields: &Draft) -> StepValidation {
        let mut outcome = StepValidation::passed();
        if let Some(validators) = self.validators.get(&step) {
            for validator in validators {
                outcome.absorb(validator.validate(step, fields));
            }
        }
        outcome
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<_, _> = self
            .validators
            .iter()
            .map(|(step, validators)| (*step, validators.len()))
            .collect();
        f.debug_struct("ValidatorRegistry")
            .field("validators", &counts)
            .finish()
    }
}
