/// Mapping between subscription tiers and payments-provider price IDs
///
/// Each paid tier is sold through exactly one recurring price. The catalog is
/// built from configuration at startup and is the only place a price ID is
/// turned into a tier.
///
/// # Example
///
/// ```
/// use shyft_shared::billing::plans::PlanCatalog;
/// use shyft_shared::models::company::SubscriptionTier;
///
/// let plans = PlanCatalog::new("price_s", "price_p", "price_e");
/// assert_eq!(plans.tier_for_price("price_p"), Some(SubscriptionTier::Professional));
/// assert_eq!(plans.tier_for_price("price_unknown"), None);
/// ```

use serde::Serialize;

use crate::models::company::SubscriptionTier;

/// One sellable plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub tier: SubscriptionTier,
    pub price_id: String,
}

/// The configured paid plans, cheapest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// Builds the catalog from the three configured price IDs
    pub fn new(
        starter: impl Into<String>,
        professional: impl Into<String>,
        enterprise: impl Into<String>,
    ) -> Self {
        Self {
            plans: vec![
                Plan {
                    tier: SubscriptionTier::Starter,
                    price_id: starter.into(),
                },
                Plan {
                    tier: SubscriptionTier::Professional,
                    price_id: professional.into(),
                },
                Plan {
                    tier: SubscriptionTier::Enterprise,
                    price_id: enterprise.into(),
                },
            ],
        }
    }

    /// All plans
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Tier sold through `price_id`, if it is one of ours
    pub fn tier_for_price(&self, price_id: &str) -> Option<SubscriptionTier> {
        self.plans
            .iter()
            .find(|plan| plan.price_id == price_id)
            .map(|plan| plan.tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_ways() {
        let plans = PlanCatalog::new("price_s", "price_p", "price_e");

        assert_eq!(plans.plans().len(), 3);
        assert_eq!(plans.tier_for_price("price_s"), Some(SubscriptionTier::Starter));
        assert_eq!(plans.tier_for_price("price_e"), Some(SubscriptionTier::Enterprise));
        assert_eq!(plans.tier_for_price("price_unknown"), None);
    }

    #[test]
    fn test_plans_are_ordered_cheapest_first() {
        let plans = PlanCatalog::new("a", "b", "c");
        let tiers: Vec<_> = plans.plans().iter().map(|p| p.tier).collect();
        assert_eq!(
            tiers,
            vec![
                SubscriptionTier::Starter,
                SubscriptionTier::Professional,
                SubscriptionTier::Enterprise
            ]
        );
    }
}
