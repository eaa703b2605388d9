use serde::{Deserialize, Serialize};

/// Proposal forms offered by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    ConceptPaper,
    Gap,
    CommunityProposal,
}

impl ProposalKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ConceptPaper => "Concept Paper",
            Self::Gap => "GAP Proposal",
            Self::CommunityProposal => "Community Proposal",
        }
    }

    pub fn blueprint(self) -> WizardBlueprint {
        match self {
            Self::ConceptPaper => WizardBlueprint::concept_paper(),
            Self::Gap => WizardBlueprint::gap(),
            Self::CommunityProposal => WizardBlueprint::community_proposal(),
        }
    }
}

/// Shape a field's value must take to pass validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Amount,
    Months,
    Acknowledgement,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
        }
    }

    const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
        }
    }
}

/// Cross-field award checks attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AwardFieldMap {
    pub category: &'static str,
    pub requested_amount: &'static str,
    pub co_financing_amount: &'static str,
    pub duration_months: &'static str,
}

impl AwardFieldMap {
    pub const STANDARD: Self = Self {
        category: "award_category",
        requested_amount: "requested_amount",
        co_financing_amount: "co_financing_amount",
        duration_months: "project_duration_months",
    };
}

#[derive(Debug, Clone, Serialize)]
pub struct StepDefinition {
    pub index: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub fields: Vec<FieldSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_rules: Option<AwardFieldMap>,
}

impl StepDefinition {
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.required)
    }
}

/// Ordered steps of one proposal form.
#[derive(Debug, Clone, Serialize)]
pub struct WizardBlueprint {
    kind: ProposalKind,
    steps: Vec<StepDefinition>,
}

impl WizardBlueprint {
    pub fn kind(&self) -> ProposalKind {
        self.kind
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        index
            .checked_sub(1)
            .and_then(|position| self.steps.get(position))
    }

    pub fn concept_paper() -> Self {
        Self::from_steps(
            ProposalKind::ConceptPaper,
            vec![(
                "concept",
                "Concept Paper",
                vec![
                    FieldSpec::required("organization_name", "Organization name", FieldKind::Text),
                    FieldSpec::required("contact_email", "Contact email", FieldKind::Email),
                    FieldSpec::required("project_title", "Project title", FieldKind::Text),
                    FieldSpec::required("award_category", "Award category", FieldKind::Text),
                    FieldSpec::required("problem_statement", "Problem statement", FieldKind::Text),
                    FieldSpec::required("proposed_solution", "Proposed solution", FieldKind::Text),
                    FieldSpec::required("requested_amount", "Requested amount", FieldKind::Amount),
                    FieldSpec::optional(
                        "co_financing_amount",
                        "Co-financing amount",
                        FieldKind::Amount,
                    ),
                    FieldSpec::required(
                        "project_duration_months",
                        "Project duration (months)",
                        FieldKind::Months,
                    ),
                ],
                Some(AwardFieldMap::STANDARD),
            )],
        )
    }

    pub fn gap() -> Self {
        Self::from_steps(
            ProposalKind::Gap,
            vec![
                (
                    "organization",
                    "Organization Information",
                    vec![
                        FieldSpec::required(
                            "organization_name",
                            "Organization name",
                            FieldKind::Text,
                        ),
                        FieldSpec::required("contact_name", "Contact person", FieldKind::Text),
                        FieldSpec::required("contact_email", "Contact email", FieldKind::Email),
                        FieldSpec::optional("contact_phone", "Contact phone", FieldKind::Text),
                        FieldSpec::required("district", "District", FieldKind::Text),
                    ],
                    None,
                ),
                (
                    "project",
                    "Project Overview",
                    vec![
                        FieldSpec::required("project_title", "Project title", FieldKind::Text),
                        FieldSpec::required("award_category", "Award category", FieldKind::Text),
                        FieldSpec::required(
                            "project_duration_months",
                            "Project duration (months)",
                            FieldKind::Months,
                        ),
                        FieldSpec::required(
                            "project_summary",
                            "Project summary",
                            FieldKind::Text,
                        ),
                    ],
                    Some(AwardFieldMap::STANDARD),
                ),
                (
                    "budget",
                    "Budget",
                    vec![
                        FieldSpec::required(
                            "requested_amount",
                            "Requested amount",
                            FieldKind::Amount,
                        ),
                        FieldSpec::optional(
                            "co_financing_amount",
                            "Co-financing amount",
                            FieldKind::Amount,
                        ),
                        FieldSpec::optional(
                            "co_financing_sources",
                            "Co-financing sources",
                            FieldKind::Text,
                        ),
                    ],
                    Some(AwardFieldMap::STANDARD),
                ),
                (
                    "declaration",
                    "Attachments & Declaration",
                    vec![FieldSpec::required(
                        "declaration_accepted",
                        "Declaration",
                        FieldKind::Acknowledgement,
                    )],
                    None,
                ),
            ],
        )
    }

    pub fn community_proposal() -> Self {
        Self::from_steps(
            ProposalKind::CommunityProposal,
            vec![
                (
                    "community",
                    "Community Group",
                    vec![
                        FieldSpec::required("organization_name", "Group name", FieldKind::Text),
                        FieldSpec::required("contact_name", "Contact person", FieldKind::Text),
                        FieldSpec::required("contact_email", "Contact email", FieldKind::Email),
                        FieldSpec::required("community", "Community", FieldKind::Text),
                    ],
                    None,
                ),
                (
                    "project",
                    "Project & Budget",
                    vec![
                        FieldSpec::required("project_title", "Project title", FieldKind::Text),
                        FieldSpec::required("award_category", "Award category", FieldKind::Text),
                        FieldSpec::required(
                            "project_duration_months",
                            "Project duration (months)",
                            FieldKind::Months,
                        ),
                        FieldSpec::required(
                            "requested_amount",
                            "Requested amount",
                            FieldKind::Amount,
                        ),
                        FieldSpec::optional(
                            "co_financing_amount",
                            "Co-financing amount",
                            FieldKind::Amount,
                        ),
                    ],
                    Some(AwardFieldMap::STANDARD),
                ),
                (
                    "declaration",
                    "Declaration",
                    vec![FieldSpec::required(
                        "declaration_accepted",
                        "Declaration",
                        FieldKind::Acknowledgement,
                    )],
                    None,
                ),
            ],
        )
    }

    fn from_steps(
        kind: ProposalKind,
        steps: Vec<(&'static str, &'static str, Vec<FieldSpec>, Option<AwardFieldMap>)>,
    ) -> Self {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(position, (key, title, fields, award_rules))| StepDefinition {
                index: position + 1,
                key,
                title,
                fields,
                award_rules,
            })
            .collect();
        Self { kind, steps }
    }
}
