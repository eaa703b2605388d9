use serde::{Deserialize, Serialize};

/// Grant-size tier selected by an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AwardCategory {
    CommunityGrant,
    SmallGrants,
    MediumGrants,
    LargeGrants,
}

impl AwardCategory {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::CommunityGrant,
            Self::SmallGrants,
            Self::MediumGrants,
            Self::LargeGrants,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CommunityGrant => "Community Grant",
            Self::SmallGrants => "Small Grants",
            Self::MediumGrants => "Medium Grants",
            Self::LargeGrants => "Large Grants",
        }
    }

    /// Parse a category as typed into a form field.
    ///
    /// Case, spacing, punctuation and a trailing plural are ignored, so
    /// `"Medium Grants"`, `"medium_grant"` and `"MediumGrants"` all resolve to
    /// the same tier. Anything unrecognised yields `None`, which the rule
    /// engine treats as an unselected category.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        let stem = normalized.strip_suffix('s').unwrap_or(&normalized);

        match stem {
            "communitygrant" | "community" => Some(Self::CommunityGrant),
            "smallgrant" | "small" => Some(Self::SmallGrants),
            "mediumgrant" | "medium" => Some(Self::MediumGrants),
            "largegrant" | "large" => Some(Self::LargeGrants),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_form_spellings() {
        assert_eq!(
            AwardCategory::parse("Community Grant"),
            Some(AwardCategory::CommunityGrant)
        );
        assert_eq!(
            AwardCategory::parse("small_grants"),
            Some(AwardCategory::SmallGrants)
        );
        assert_eq!(
            AwardCategory::parse("  MediumGrants "),
            Some(AwardCategory::MediumGrants)
        );
        assert_eq!(
            AwardCategory::parse("large-grant"),
            Some(AwardCategory::LargeGrants)
        );
    }

    #[test]
    fn parse_treats_unknown_and_empty_as_absent() {
        assert_eq!(AwardCategory::parse(""), None);
        assert_eq!(AwardCategory::parse("Select a category"), None);
        assert_eq!(AwardCategory::parse("Mega Grants"), None);
    }

    #[test]
    fn labels_follow_declared_order() {
        let labels: Vec<_> = AwardCategory::ordered()
            .iter()
            .map(|category| category.label())
            .collect();
        assert_eq!(
            labels,
            vec!["Community Grant", "Small Grants", "Medium Grants", "Large Grants"]
        );
    }
}
