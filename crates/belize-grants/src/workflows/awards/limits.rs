use serde::{Deserialize, Serialize};

use super::category::AwardCategory;

/// Inclusive co-financing band, expressed as a percentage of total project cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoFinancingRange {
    pub min_pct: f64,
    pub max_pct: f64,
}

impl CoFinancingRange {
    pub fn contains(&self, pct: f64) -> bool {
        self.min_pct <= pct && pct <= self.max_pct
    }
}

/// Funding, co-financing and duration policy for one award category.
///
/// `None` bounds are unbounded. Co-financing is required exactly when
/// `co_financing` carries a range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AwardLimits {
    pub min_amount: f64,
    pub max_amount: Option<f64>,
    pub co_financing: Option<CoFinancingRange>,
    pub max_duration_months: Option<u32>,
}

impl AwardLimits {
    pub const fn permissive() -> Self {
        Self {
            min_amount: 0.0,
            max_amount: None,
            co_financing: None,
            max_duration_months: None,
        }
    }

    pub fn co_financing_required(&self) -> bool {
        self.co_financing.is_some()
    }

    pub fn co_financing_min_pct(&self) -> Option<f64> {
        self.co_financing.map(|range| range.min_pct)
    }

    pub fn co_financing_max_pct(&self) -> Option<f64> {
        self.co_financing.map(|range| range.max_pct)
    }

    pub fn amount_within(&self, amount: f64) -> bool {
        self.min_amount <= amount && self.max_amount.map_or(true, |max| amount <= max)
    }

    pub fn duration_within(&self, months: f64) -> bool {
        self.max_duration_months
            .map_or(true, |max| months <= f64::from(max))
    }
}

impl Default for AwardLimits {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Limits applicable to `category`; an absent category yields permissive limits.
pub fn get_limits(category: Option<AwardCategory>) -> AwardLimits {
    match category {
        None => AwardLimits::permissive(),
        Some(AwardCategory::CommunityGrant) | Some(AwardCategory::SmallGrants) => AwardLimits {
            min_amount: 0.0,
            max_amount: Some(50_000.0),
            co_financing: None,
            max_duration_months: Some(18),
        },
        Some(AwardCategory::MediumGrants) => AwardLimits {
            min_amount: 50_000.01,
            max_amount: Some(150_000.0),
            co_financing: Some(CoFinancingRange {
                min_pct: 10.0,
                max_pct: 25.0,
            }),
            max_duration_months: Some(24),
        },
        Some(AwardCategory::LargeGrants) => AwardLimits {
            min_amount: 150_000.01,
            max_amount: Some(500_000.0),
            co_financing: Some(CoFinancingRange {
                min_pct: 25.0,
                max_pct: 50.0,
            }),
            max_duration_months: Some(36),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_category_is_unbounded() {
        let limits = get_limits(None);
        assert_eq!(limits.min_amount, 0.0);
        assert_eq!(limits.max_amount, None);
        assert!(!limits.co_financing_required());
        assert_eq!(limits.max_duration_months, None);
        assert!(limits.amount_within(9_999_999.0));
        assert!(limits.duration_within(240.0));
    }

    #[test]
    fn table_matches_published_award_bands() {
        let community = get_limits(Some(AwardCategory::CommunityGrant));
        assert_eq!(community.min_amount, 0.0);
        assert_eq!(community.max_amount, Some(50_000.0));
        assert!(!community.co_financing_required());
        assert_eq!(community.max_duration_months, Some(18));

        let small = get_limits(Some(AwardCategory::SmallGrants));
        assert_eq!(small, community);

        let medium = get_limits(Some(AwardCategory::MediumGrants));
        assert_eq!(medium.min_amount, 50_000.01);
        assert_eq!(medium.max_amount, Some(150_000.0));
        assert_eq!(medium.co_financing_min_pct(), Some(10.0));
        assert_eq!(medium.co_financing_max_pct(), Some(25.0));
        assert_eq!(medium.max_duration_months, Some(24));

        let large = get_limits(Some(AwardCategory::LargeGrants));
        assert_eq!(large.min_amount, 150_000.01);
        assert_eq!(large.max_amount, Some(500_000.0));
        assert_eq!(large.co_financing_min_pct(), Some(25.0));
        assert_eq!(large.co_financing_max_pct(), Some(50.0));
        assert_eq!(large.max_duration_months, Some(36));
    }

    #[test]
    fn every_band_is_ordered() {
        for category in AwardCategory::ordered() {
            let limits = get_limits(Some(category));
            let max = limits.max_amount.expect("defined categories are bounded");
            assert!(limits.min_amount <= max, "{category:?} amount band inverted");
            if let Some(range) = limits.co_financing {
                assert!(range.min_pct <= range.max_pct, "{category:?} co-financing inverted");
            }
        }
    }

    #[test]
    fn medium_band_starts_one_cent_above_small_ceiling() {
        let medium = get_limits(Some(AwardCategory::MediumGrants));
        assert!(!medium.amount_within(50_000.0));
        assert!(medium.amount_within(50_000.01));
        assert!(medium.amount_within(150_000.0));
        assert!(!medium.amount_within(150_000.01));
    }
}
