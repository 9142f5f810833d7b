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

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuotaConfig {
    /// Lifetime of a reservation when the caller uses the default expiry
    pub reservation_expire_secs: i64,
    /// Number of reservations after which a usage row is resynchronized.
    /// Zero disables the countdown.
    pub until_refresh: i32,
    /// Age after which a usage row is resynchronized on the next
    /// reservation. Zero disables age based refresh.
    pub max_age_secs: i64,
    /// How often the expiry agent sweeps abandoned reservations
    pub expiry_sweep_interval_secs: u64,
    /// Maximal number of expired reservations resolved per sweep step
    pub expiry_batch_size: usize,
    pub retry: ConflictRetryConfig,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            reservation_expire_secs: 86400,
            until_refresh: 0,
            max_age_secs: 0,
            expiry_sweep_interval_secs: 60,
            expiry_batch_size: 100,
            retry: ConflictRetryConfig::default(),
        }
    }
}

impl QuotaConfig {
    pub fn test_default() -> Self {
        Self {
            retry: ConflictRetryConfig::no_backoff(),
            ..Self::default()
        }
    }

    pub fn default_expire_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::seconds(self.reservation_expire_secs)
    }

    pub fn refresh_policy(&self) -> UsageRefreshPolicy {
        UsageRefreshPolicy {
            until_refresh: (self.until_refresh > 0).then_some(self.until_refresh),
            max_age: (self.max_age_secs > 0).then(|| chrono::Duration::seconds(self.max_age_secs)),
        }
    }

    pub fn expiry_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expiry_sweep_interval_secs.max(1))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Bounds of the retry loop that absorbs races between concurrent writers.
/// Each attempt runs the whole operation in a fresh transaction, and nothing
/// below it retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConflictRetryConfig {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ConflictRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            min_backoff_ms: 20,
            max_backoff_ms: 200,
        }
    }
}

impl ConflictRetryConfig {
    pub fn no_backoff() -> Self {
        Self {
            min_backoff_ms: 0,
            max_backoff_ms: 0,
            ..Self::default()
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// When tracked usage must be resynchronized before it can be trusted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UsageRefreshPolicy {
    /// Countdown assigned to a row after each refresh
    pub until_refresh: Option<i32>,
    pub max_age: Option<chrono::Duration>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
