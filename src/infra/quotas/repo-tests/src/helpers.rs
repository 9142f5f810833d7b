// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, Duration, TimeZone, Utc};
use kamu_quotas::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2050, 1, 1, 12, 0, 0).unwrap()
}

pub(crate) fn at(seconds: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(seconds)
}

pub(crate) fn new_usage(scope: &QuotaScope, resource: &str) -> NewQuotaUsage {
    NewQuotaUsage {
        scope: scope.clone(),
        resource: resource.to_string(),
        until_refresh: None,
        created_at: t0(),
    }
}

pub(crate) fn make_reservation(usage: &QuotaUsage, delta: i64, expire_at: DateTime<Utc>) -> Reservation {
    Reservation {
        id: ReservationID::new_generated(),
        usage_id: usage.id,
        project_id: usage.project_id.clone(),
        user_id: usage.user_id.clone(),
        resource: usage.resource.clone(),
        delta,
        expire_at,
        created_at: t0(),
    }
}

pub(crate) fn make_limit(scope: &QuotaScope, resource: &str, hard_limit: i64) -> QuotaLimit {
    QuotaLimit {
        project_id: scope.project_id.clone(),
        user_id: scope.user_id.clone(),
        resource: resource.to_string(),
        hard_limit,
        created_at: t0(),
        updated_at: t0(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
