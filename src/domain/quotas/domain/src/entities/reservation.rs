// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{QuotaScope, QuotaUsageID};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Opaque handle of a pending reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationID(Uuid);

impl ReservationID {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn new_generated() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for ReservationID {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReservationID {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Provisional hold against a usage row. Only pending reservations exist:
/// commit, rollback and expiry all delete the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationID,
    pub usage_id: QuotaUsageID,
    pub project_id: String,
    pub user_id: Option<String>,
    pub resource: String,
    pub delta: i64,
    pub expire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn scope(&self) -> QuotaScope {
        QuotaScope {
            project_id: self.project_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Portion of the delta that was added to the row's `reserved` counter
    pub fn held(&self) -> i64 {
        self.delta.max(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
