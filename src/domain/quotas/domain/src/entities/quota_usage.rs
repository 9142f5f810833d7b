// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::QuotaScope;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub type QuotaUsageID = i64;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Tracked consumption of one resource within one scope.
///
/// `in_use` is the committed count. A negative value marks the row as out of
/// sync and forces a refresh on the next reservation. `reserved` is the sum of
/// the positive deltas of all outstanding reservations against this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub id: QuotaUsageID,
    pub project_id: String,
    pub user_id: Option<String>,
    pub resource: String,
    pub in_use: i64,
    pub reserved: i64,
    pub until_refresh: Option<i32>,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuotaUsage {
    pub fn scope(&self) -> QuotaScope {
        QuotaScope {
            project_id: self.project_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    pub fn total(&self) -> i64 {
        self.in_use.saturating_add(self.reserved)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A zeroed usage row to be materialized on first touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuotaUsage {
    pub scope: QuotaScope,
    pub resource: String,
    pub until_refresh: Option<i32>,
    pub created_at: DateTime<Utc>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Usage of a resource summed over the rows visible to a scope
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsageTotals {
    pub in_use: i64,
    pub reserved: i64,
}

impl QuotaUsageTotals {
    pub fn total(&self) -> i64 {
        self.in_use + self.reserved
    }

    pub fn add(&mut self, usage: &QuotaUsage) {
        self.in_use = self.in_use.saturating_add(usage.in_use);
        self.reserved = self.reserved.saturating_add(usage.reserved);
    }
}

impl From<&QuotaUsage> for QuotaUsageTotals {
    fn from(usage: &QuotaUsage) -> Self {
        Self {
            in_use: usage.in_use,
            reserved: usage.reserved,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
