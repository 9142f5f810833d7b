// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, Utc};
use kamu_quotas::{QuotaUsage, UsageRefreshPolicy};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Outcome of a staleness check. `until_refresh` is the countdown value the
/// row must carry afterwards, already decremented when a countdown is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshDecision {
    pub needs_refresh: bool,
    pub until_refresh: Option<i32>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Decides when tracked usage has to be resynchronized with its source of
/// truth, and produces the resynchronized row
#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
    policy: UsageRefreshPolicy,
}

impl StalenessPolicy {
    pub fn new(policy: UsageRefreshPolicy) -> Self {
        Self { policy }
    }

    /// Countdown a row starts with after creation or refresh
    pub fn until_refresh_reset(&self) -> Option<i32> {
        self.policy.until_refresh
    }

    /// Check-and-decrement. The countdown is consumed on every check,
    /// whether or not a refresh follows.
    pub fn check(&self, usage: &QuotaUsage, now: DateTime<Utc>) -> RefreshDecision {
        let until_refresh = usage.until_refresh.map(|n| n.saturating_sub(1));

        let desynced = usage.in_use < 0;
        if desynced {
            tracing::debug!(
                project_id = %usage.project_id,
                user_id = ?usage.user_id,
                resource = %usage.resource,
                in_use = usage.in_use,
                "Usage dropped below zero, forcing refresh"
            );
        }

        let countdown_elapsed = until_refresh.is_some_and(|n| n <= 0);

        let too_old = self.policy.max_age.is_some_and(|max_age| {
            usage
                .last_refreshed
                .is_none_or(|last_refreshed| now - last_refreshed >= max_age)
        });

        RefreshDecision {
            needs_refresh: desynced || countdown_elapsed || too_old,
            until_refresh,
        }
    }

    /// The only path overwriting `in_use`. `reserved` is left untouched.
    pub fn refreshed(&self, usage: QuotaUsage, in_use: i64, now: DateTime<Utc>) -> QuotaUsage {
        if usage.in_use != in_use {
            tracing::info!(
                project_id = %usage.project_id,
                user_id = ?usage.user_id,
                resource = %usage.resource,
                tracked_usage = usage.in_use,
                actual_usage = in_use,
                "Quota usage out of sync, updating"
            );
        } else {
            tracing::debug!(
                project_id = %usage.project_id,
                user_id = ?usage.user_id,
                resource = %usage.resource,
                "Quota usage has not changed"
            );
        }

        QuotaUsage {
            in_use,
            until_refresh: self.policy.until_refresh,
            last_refreshed: Some(now),
            updated_at: now,
            ..usage
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
