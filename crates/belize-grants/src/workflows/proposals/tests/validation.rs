use std::collections::BTreeMap;
use std::sync::Arc;

use crate::workflows::proposals::blueprint::{AwardFieldMap, WizardBlueprint};
use crate::workflows::proposals::domain::{Draft, FieldValue};
use crate::workflows::proposals::validation::{
    AwardRulesValidator, StepValidation, StepValidator, ValidatorRegistry,
};

struct RejectEverything;

impl StepValidator for RejectEverything {
    fn validate(&self, step: usize, _fields: &Draft) -> StepValidation {
        let mut errors = BTreeMap::new();
        errors.insert("organization_name".to_string(), format!("blocked on step {step}"));
        errors.insert("notes".to_string(), "blocked".to_string());
        StepValidation::from_errors(errors)
    }
}

fn award_scope() -> Vec<&'static str> {
    vec![
        "award_category",
        "requested_amount",
        "co_financing_amount",
        "project_duration_months",
    ]
}

#[test]
fn registry_covers_every_blueprint_step() {
    let blueprint = WizardBlueprint::gap();
    let registry = ValidatorRegistry::for_blueprint(&blueprint);

    for step in blueprint.steps() {
        let outcome = registry.validate(step.index, &Draft::new());
        let required: Vec<_> = step.required_fields().map(|field| field.name).collect();
        assert!(!outcome.valid, "step {} accepted an empty draft", step.index);
        for name in required {
            assert!(outcome.errors.contains_key(name), "missing error for {name}");
        }
    }
    assert!(registry.validate(5, &Draft::new()).valid);
}

#[test]
fn first_registered_message_wins_per_field() {
    let registry = ValidatorRegistry::for_blueprint(&WizardBlueprint::gap())
        .register(1, Arc::new(RejectEverything));

    let outcome = registry.validate(1, &Draft::new());
    assert_eq!(
        outcome.errors.get("organization_name").map(String::as_str),
        Some("Organization name is required")
    );
    assert_eq!(outcome.errors.get("notes").map(String::as_str), Some("blocked"));
}

#[test]
fn field_kinds_are_checked() {
    let registry = ValidatorRegistry::for_blueprint(&WizardBlueprint::gap());

    let project = Draft::new()
        .with("project_title", FieldValue::text("Reef monitoring"))
        .with("award_category", FieldValue::text("small"))
        .with("project_duration_months", FieldValue::Number(6.5))
        .with("project_summary", FieldValue::text("Quarterly dives."));
    let outcome = registry.validate(2, &project);
    assert_eq!(
        outcome.errors.get("project_duration_months").map(String::as_str),
        Some("Project duration (months) must be a whole number of months")
    );

    let budget = Draft::new().with("requested_amount", FieldValue::Number(-5.0));
    let outcome = registry.validate(3, &budget);
    assert_eq!(
        outcome.errors.get("requested_amount").map(String::as_str),
        Some("Requested amount must be a non-negative amount")
    );

    let declaration = Draft::new().with("declaration_accepted", FieldValue::text("no"));
    let outcome = registry.validate(4, &declaration);
    assert_eq!(
        outcome.errors.get("declaration_accepted").map(String::as_str),
        Some("Declaration must be accepted")
    );
}

#[test]
fn unknown_category_lists_the_options() {
    let validator = AwardRulesValidator::new(AwardFieldMap::STANDARD, award_scope());
    let fields = Draft::new().with("award_category", FieldValue::text("Mega Grants"));

    let outcome = validator.validate(1, &fields);
    assert_eq!(
        outcome.errors.get("award_category").map(String::as_str),
        Some("Award category must be one of: Community Grant, Small Grants, Medium Grants, Large Grants")
    );
}

#[test]
fn award_rules_accept_boundary_figures() {
    let validator = AwardRulesValidator::new(AwardFieldMap::STANDARD, award_scope());
    let lowest_request = Draft::new()
        .with("award_category", FieldValue::text("Large Grants"))
        .with("requested_amount", FieldValue::text("BZD 150,000.01"))
        .with("co_financing_amount", FieldValue::Number(100_000.0))
        .with("project_duration_months", FieldValue::Number(36.0));
    let outcome = validator.validate(1, &lowest_request);
    assert!(outcome.valid, "unexpected errors: {:?}", outcome.errors);

    let lowest_share = Draft::new()
        .with("award_category", FieldValue::text("Large Grants"))
        .with("requested_amount", FieldValue::Number(300_000.0))
        .with("co_financing_amount", FieldValue::Number(100_000.0));
    let outcome = validator.validate(1, &lowest_share);
    assert!(outcome.valid, "unexpected errors: {:?}", outcome.errors);
}

#[test]
fn award_rules_report_out_of_range_figures() {
    let validator = AwardRulesValidator::new(AwardFieldMap::STANDARD, award_scope());
    let fields = Draft::new()
        .with("award_category", FieldValue::text("Small Grants"))
        .with("requested_amount", FieldValue::Number(50_000.01))
        .with("project_duration_months", FieldValue::Number(19.0));

    let outcome = validator.validate(1, &fields);
    assert_eq!(
        outcome.errors.get("requested_amount").map(String::as_str),
        Some("Small Grants requests must be between BZD 0.00 and BZD 50,000.00")
    );
    assert_eq!(
        outcome.errors.get("project_duration_months").map(String::as_str),
        Some("Small Grants projects may not run longer than 18 months")
    );
    assert!(!outcome.errors.contains_key("co_financing_amount"));
}

#[test]
fn missing_category_is_permissive() {
    let validator = AwardRulesValidator::new(AwardFieldMap::STANDARD, award_scope());
    let fields = Draft::new()
        .with("requested_amount", FieldValue::Number(2_000_000.0))
        .with("project_duration_months", FieldValue::Number(120.0));

    assert!(validator.validate(1, &fields).valid);
}

#[test]
fn unparseable_amounts_fail_the_range_check() {
    let validator = AwardRulesValidator::new(AwardFieldMap::STANDARD, award_scope());
    let fields = Draft::new()
        .with("award_category", FieldValue::text("Community Grant"))
        .with("requested_amount", FieldValue::text("twenty thousand"));

    let outcome = validator.validate(1, &fields);
    assert!(outcome.errors.contains_key("requested_amount"));
}
