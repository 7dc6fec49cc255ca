//! Subscription plans and the project-creation gate.
//!
//! Plans are reference data. Billing itself happens elsewhere; this module
//! only answers "may this user do X".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::UserId;

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Plan {
    /// Plan id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Live projects allowed.
    pub max_projects: u32,
    /// Monthly page views allowed.
    pub max_page_views: u32,
    /// Custom domains allowed.
    pub custom_domain: bool,
    /// Lead webhooks allowed.
    pub webhooks: bool,
    /// Branding footer may be removed.
    pub remove_branding: bool,
    /// Priority support.
    pub priority_support: bool,
}

impl Plan {
    /// The built-in plan of users without a subscription.
    #[must_use]
    pub fn free() -> Self {
        Self {
            id: "free".to_string(),
            name: "Gratuito".to_string(),
            max_projects: 1,
            max_page_views: 1_000,
            custom_domain: false,
            webhooks: false,
            remove_branding: false,
            priority_support: false,
        }
    }
}

/// Billing state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// In a trial period.
    Trialing,
    /// Ended by the user.
    Canceled,
    /// Payment failed.
    PastDue,
}

impl SubscriptionStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::Canceled => "canceled",
            Self::PastDue => "past_due",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "trialing" => Some(Self::Trialing),
            "canceled" => Some(Self::Canceled),
            "past_due" => Some(Self::PastDue),
            _ => None,
        }
    }

    /// Whether the plan's features are available.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// A user's subscription and the plan it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Subscriber.
    pub user_id: UserId,
    /// Subscribed plan.
    pub plan: Plan,
    /// Billing state.
    pub status: SubscriptionStatus,
    /// Current period start.
    pub current_period_start: Option<DateTime<Utc>>,
    /// Current period end.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Billing-provider customer id.
    pub external_customer_id: Option<String>,
    /// Billing-provider subscription id.
    pub external_subscription_id: Option<String>,
}

/// What a user is entitled to right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    /// Effective plan (free when there is no subscription).
    pub plan: Plan,
    /// Subscription status, `None` on the free plan.
    pub status: Option<SubscriptionStatus>,
}

impl Entitlement {
    /// Resolves the entitlement from an optional subscription.
    #[must_use]
    pub fn from_subscription(subscription: Option<Subscription>) -> Self {
        match subscription {
            Some(sub) => Self {
                plan: sub.plan,
                status: Some(sub.status),
            },
            None => Self {
                plan: Plan::free(),
                status: None,
            },
        }
    }

    /// Whether the subscription (or the free plan) is in good standing.
    #[must_use]
    pub fn in_good_standing(&self) -> bool {
        self.status.is_none_or(SubscriptionStatus::is_usable)
    }

    /// Whether another project may be created given the current number of
    /// live projects.
    #[must_use]
    pub fn can_create_project(&self, live_projects: u64) -> bool {
        self.in_good_standing() && live_projects < u64::from(self.plan.max_projects)
    }

    /// Whether the branding footer is hidden.
    #[must_use]
    pub fn removes_branding(&self) -> bool {
        self.in_good_standing() && self.plan.remove_branding
    }

    /// Whether a custom domain may be set.
    #[must_use]
    pub fn allows_custom_domain(&self) -> bool {
        self.in_good_standing() && self.plan.custom_domain
    }
}
