// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{BTreeMap, HashMap};

use kamu_quotas::{OverQuotaResource, QuotaLevel, QuotaLimits, QuotaUsageTotals};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Evaluates requested deltas against project and user hard limits
pub struct LimitChecker;

impl LimitChecker {
    /// Returns every resource whose projected usage exceeds a limit.
    ///
    /// Only positive deltas are checked, so usage that is already over the
    /// limit can always be reduced. A negative limit is unlimited at its level
    /// and never exempts the other level. `user_usages` carries entries only
    /// for resources accounted per user.
    pub fn over_quota(
        limits: &QuotaLimits,
        deltas: &BTreeMap<String, i64>,
        project_usages: &HashMap<String, QuotaUsageTotals>,
        user_usages: &HashMap<String, QuotaUsageTotals>,
    ) -> Vec<OverQuotaResource> {
        let mut overs = Vec::new();

        for (resource, &delta) in deltas {
            if delta <= 0 {
                continue;
            }

            let project_used = project_usages
                .get(resource)
                .map(QuotaUsageTotals::total)
                .unwrap_or_default();
            let project_limit = limits.project_limit(resource);

            if project_limit >= 0 && Self::exceeds(project_used, delta, project_limit) {
                tracing::debug!(
                    resource = %resource,
                    limit = project_limit,
                    delta,
                    total = project_used,
                    "Request is over project quota"
                );
                overs.push(OverQuotaResource {
                    resource: resource.clone(),
                    requested: delta,
                    used: project_used,
                    limit: project_limit,
                    level: QuotaLevel::Project,
                });
                continue;
            }

            let Some(user_usage) = user_usages.get(resource) else {
                continue;
            };

            let user_used = user_usage.total();
            let user_limit = limits.user_limit(resource);

            if user_limit >= 0 && Self::exceeds(user_used, delta, user_limit) {
                tracing::debug!(
                    resource = %resource,
                    limit = user_limit,
                    delta,
                    total = user_used,
                    "Request is over user quota"
                );
                overs.push(OverQuotaResource {
                    resource: resource.clone(),
                    requested: delta,
                    used: user_used,
                    limit: user_limit,
                    level: QuotaLevel::User,
                });
            }
        }

        overs
    }

    /// A projection that does not fit into `i64` is over any finite limit
    fn exceeds(used: i64, delta: i64, limit: i64) -> bool {
        used.checked_add(delta).is_none_or(|projected| projected > limit)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
