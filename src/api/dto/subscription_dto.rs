//! Subscription DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Entitlement, Plan, SubscriptionStatus};

/// Live project usage against the plan limit.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsageDto {
    /// Live projects.
    pub projects: u64,
    /// Plan limit.
    pub max_projects: u32,
}

/// Response of `GET /subscription`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    /// Effective plan.
    pub plan: Plan,
    /// Billing state; absent on the free plan.
    pub status: Option<SubscriptionStatus>,
    /// Current usage.
    pub usage: UsageDto,
    /// Whether another project may be created now.
    pub can_create_project: bool,
}

impl SubscriptionResponse {
    /// Combines the entitlement with the live project count.
    #[must_use]
    pub fn new(entitlement: Entitlement, live_projects: u64) -> Self {
        let can_create_project = entitlement.can_create_project(live_projects);
        Self {
            usage: UsageDto {
                projects: live_projects,
                max_projects: entitlement.plan.max_projects,
            },
            plan: entitlement.plan,
            status: entitlement.status,
            can_create_project,
        }
    }
}
