use crate::infra::{parse_category, InMemoryProposalRepository};
use crate::routes::{evaluate, EvaluateRequest, LimitsView};
use belize_grants::error::AppError;
use belize_grants::workflows::awards::{format_bzd, AwardCategory};
use belize_grants::workflows::proposals::{
    ApplicantContext, Attachment, Draft, FieldValue, ProposalKind, SubmissionOutcome,
    WizardController, WizardError,
};
use clap::Args;
use serde::Serialize;
use std::io;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct LimitsArgs {
    /// Only show this category (label or short name, e.g. "medium")
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: Option<AwardCategory>,
    /// Emit CSV instead of a readable table
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Award category (label or short name)
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: AwardCategory,
    /// Requested grant amount in BZD
    #[arg(long)]
    pub(crate) requested: f64,
    /// Co-financing amount in BZD
    #[arg(long, default_value_t = 0.0)]
    pub(crate) co_financing: f64,
    /// Planned project duration in months
    #[arg(long)]
    pub(crate) duration: Option<f64>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Award category used for the sample proposal
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: Option<AwardCategory>,
    /// Requested amount for the sample proposal
    #[arg(long)]
    pub(crate) requested: Option<f64>,
    /// Co-financing amount for the sample proposal
    #[arg(long)]
    pub(crate) co_financing: Option<f64>,
    /// Attach an empty support letter to show a partially successful submission
    #[arg(long)]
    pub(crate) empty_attachment: bool,
}

#[derive(Debug, Serialize)]
struct LimitsRow {
    category: &'static str,
    min_amount: f64,
    max_amount: Option<f64>,
    co_financing_min_pct: Option<f64>,
    co_financing_max_pct: Option<f64>,
    max_duration_months: Option<u32>,
}

impl From<&LimitsView> for LimitsRow {
    fn from(view: &LimitsView) -> Self {
        Self {
            category: view.label,
            min_amount: view.min_amount,
            max_amount: view.max_amount,
            co_financing_min_pct: view.co_financing_min_pct,
            co_financing_max_pct: view.co_financing_max_pct,
            max_duration_months: view.max_duration_months,
        }
    }
}

fn selected_limits(category: Option<AwardCategory>) -> Vec<LimitsView> {
    match category {
        Some(category) => vec![LimitsView::new(category)],
        None => AwardCategory::ordered()
            .into_iter()
            .map(LimitsView::new)
            .collect(),
    }
}

pub(crate) fn write_limits_csv<W: io::Write>(
    views: &[LimitsView],
    writer: W,
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(writer);
    for view in views {
        writer
            .serialize(LimitsRow::from(view))
            .map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn run_limits(args: LimitsArgs) -> Result<(), AppError> {
    let views = selected_limits(args.category);
    if args.csv {
        return write_limits_csv(&views, io::stdout().lock());
    }

    println!("Belize Fund award limits");
    for view in &views {
        println!("\n{}", view.label);
        let max = view
            .max_amount
            .map(format_bzd)
            .unwrap_or_else(|| "no maximum".to_string());
        println!("  Funding: {} to {}", format_bzd(view.min_amount), max);
        match (view.co_financing_min_pct, view.co_financing_max_pct) {
            (Some(min), Some(max)) => {
                println!("  Co-financing: {min:.0}% to {max:.0}% of total project cost")
            }
            _ => println!("  Co-financing: not required"),
        }
        if let Some(months) = view.max_duration_months {
            println!("  Maximum duration: {months} months");
        }
    }
    Ok(())
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let request = EvaluateRequest {
        category: Some(args.category.label().to_string()),
        requested_amount: args.requested,
        co_financing_amount: args.co_financing,
        duration_months: args.duration,
    };
    let response = evaluate(Some(args.category), &request);

    println!("{} budget check", args.category.label());
    println!("  Requested: {}", format_bzd(args.requested));
    println!("  Co-financing: {}", format_bzd(args.co_financing));
    println!("  Total project cost: {}", format_bzd(response.total_project_cost));
    println!("  Co-financing share: {:.1}%", response.display_co_financing_pct);
    if response.eligible {
        println!("  Result: eligible");
    } else {
        println!("  Result: not eligible");
        for issue in &response.issues {
            println!("  - {issue}");
        }
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let category = args.category.unwrap_or(AwardCategory::MediumGrants);
    let requested = args.requested.unwrap_or(90_000.0);
    let co_financing = args.co_financing.unwrap_or(10_000.0);

    let repository = Arc::new(InMemoryProposalRepository::default());
    let kind = ProposalKind::Gap;
    let wizard = WizardController::new(kind.blueprint(), repository.clone());

    println!("{} wizard demo", kind.label());
    wizard.prefill(&demo_applicant());

    let steps = demo_steps(category, requested, co_financing);
    for values in steps {
        let step = wizard.snapshot().await.current_step;
        let title = wizard
            .blueprint()
            .step(step)
            .map(|definition| definition.title)
            .unwrap_or_default();
        match wizard.advance(values).await {
            Ok(advance) => println!(
                "  Step {step} ({title}) saved as {}",
                advance.application_id
            ),
            Err(WizardError::Validation { errors, .. }) => {
                println!("  Step {step} ({title}) needs attention:");
                for (field, message) in errors {
                    println!("    {field}: {message}");
                }
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }

    let mut attachments = vec![Attachment::new(
        "budget.pdf",
        "budget_file",
        b"%PDF-1.4 demo budget".to_vec(),
    )];
    if args.empty_attachment {
        attachments.push(Attachment::new("support_letter.pdf", "support_letter", Vec::new()));
    }

    let outcome = wizard.submit(attachments).await?;
    match &outcome {
        SubmissionOutcome::Submitted { application_id } => {
            println!("  Submitted {application_id}; wizard reset for the next proposal");
        }
        SubmissionOutcome::Degraded {
            application_id,
            message,
        } => {
            println!("  Submitted {application_id} with a warning: {message}");
            println!("  Draft kept so the applicant can retry the upload");
        }
    }

    if let Some(record) = repository.fetch(outcome.application_id()) {
        println!(
            "  Backend record: {} fields, {} attachment(s) stored",
            record.progress.draft.len(),
            record.attachment_count
        );
    }
    Ok(())
}

fn demo_applicant() -> ApplicantContext {
    ApplicantContext {
        organization_name: "Toledo Cacao Growers Association".to_string(),
        contact_name: "Marisol Coc".to_string(),
        contact_email: "marisol@toledocacao.bz".to_string(),
        contact_phone: Some("+501 722-0101".to_string()),
        district: Some("Toledo".to_string()),
    }
}

fn demo_steps(category: AwardCategory, requested: f64, co_financing: f64) -> Vec<Draft> {
    vec![
        Draft::new(),
        Draft::new()
            .with("project_title", FieldValue::text("Shade-grown cacao nursery"))
            .with("award_category", FieldValue::text(category.label()))
            .with("project_duration_months", FieldValue::Number(18.0))
            .with(
                "project_summary",
                FieldValue::text("Nursery and training for 40 smallholder farms."),
            ),
        Draft::new()
            .with("requested_amount", FieldValue::Number(requested))
            .with("co_financing_amount", FieldValue::Number(co_financing))
            .with("co_financing_sources", FieldValue::text("Association reserves")),
        Draft::new().with("declaration_accepted", FieldValue::Flag(true)),
    ]
}
