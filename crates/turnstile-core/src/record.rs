use serde::{Deserialize, Serialize};

/// Entitlement tier, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Default tier for guests and lapsed subscriptions
    Free,
    Plus,
    Pro,
}

impl Tier {
    /// The tier every identity falls back to when entitlement lapses
    pub const fn lowest() -> Self {
        Self::Free
    }
}

/// Subscription lifecycle state as recorded in the partition store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// No subscription on record
    None,
    Active,
    /// Cancelled but paid through `subscription_expires_at`
    Cancelled,
    /// Cancelled and past the paid-through date
    Expired,
}

/// A tenant's record as stored in exactly one partition
///
/// Subscription fields are mutated by the external payment-settlement
/// collaborator; this core only reads them, except for the expiry
/// downgrade performed by the subscription resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Account id, the partition lookup key
    pub id: String,
    pub email: String,
    pub tier: Tier,
    pub subscription_status: SubscriptionStatus,
    /// Paid-through timestamp in unix seconds, when a subscription exists
    #[serde(default)]
    pub subscription_expires_at: Option<u64>,
}

impl TenantRecord {
    /// Whether the subscription is cancelled and past its paid-through date
    pub fn is_lapsed(&self, now: u64) -> bool {
        self.subscription_status == SubscriptionStatus::Cancelled
            && self.subscription_expires_at.is_some_and(|at| at < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: SubscriptionStatus, expires_at: Option<u64>) -> TenantRecord {
        TenantRecord {
            id: "acct_1".to_owned(),
            email: "a@example.com".to_owned(),
            tier: Tier::Pro,
            subscription_status: status,
            subscription_expires_at: expires_at,
        }
    }

    #[test]
    fn tier_ordering() {
        assert!(Tier::Free < Tier::Plus);
        assert!(Tier::Plus < Tier::Pro);
        assert_eq!(Tier::lowest(), Tier::Free);
    }

    #[test]
    fn lapsed_only_when_cancelled_and_past_expiry() {
        assert!(record(SubscriptionStatus::Cancelled, Some(100)).is_lapsed(200));
        assert!(!record(SubscriptionStatus::Cancelled, Some(300)).is_lapsed(200));
        assert!(!record(SubscriptionStatus::Active, Some(100)).is_lapsed(200));
        assert!(!record(SubscriptionStatus::Cancelled, None).is_lapsed(200));
    }

    #[test]
    fn record_round_trips_through_json() {
        let original = record(SubscriptionStatus::Active, Some(1_700_000_000));
        let json = serde_json::to_string(&original).unwrap();
        let parsed: TenantRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
