// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{QuotaScope, ReservationID};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Level whose limit rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLevel {
    Project,
    User,
}

impl Display for QuotaLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaLevel::Project => write!(f, "project"),
            QuotaLevel::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverQuotaResource {
    pub resource: String,
    pub requested: i64,
    /// Committed plus reserved usage at the binding level
    pub used: i64,
    pub limit: i64,
    pub level: QuotaLevel,
}

impl Display for OverQuotaResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (requested {}, used {}, {} limit {})",
            self.resource, self.requested, self.used, self.level, self.limit
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Quota exceeded for resources: {}", join_displayed(.overs))]
pub struct OverQuotaError {
    pub overs: Vec<OverQuotaResource>,
}

impl OverQuotaError {
    pub fn resource_names(&self) -> Vec<&str> {
        self.overs.iter().map(|o| o.resource.as_str()).collect()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown quota resources: {}", .resources.join(", "))]
pub struct QuotaResourceUnknownError {
    pub resources: Vec<String>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Quota usage of resource '{resource}' for {scope} could not be found")]
pub struct QuotaUsageNotFoundError {
    pub scope: QuotaScope,
    pub resource: String,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Reservations could not be found: {}", join_displayed(.reservation_ids))]
pub struct ReservationNotFoundError {
    pub reservation_ids: Vec<ReservationID>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Quota usage refresh of resources {} for {scope} is not allowed. The allowed resources are {}",
    .resources.join(", "),
    .allowed.join(", ")
)]
pub struct QuotaUsageRefreshNotAllowedError {
    pub scope: QuotaScope,
    pub resources: Vec<String>,
    pub allowed: Vec<String>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Operation '{operation}' gave up after {attempts} conflicting attempts")]
pub struct ConcurrencyExhaustedError {
    pub operation: String,
    pub attempts: u32,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid quota value {value} for resource '{resource}', expected -1 or a non-negative number")]
pub struct InvalidQuotaValueError {
    pub resource: String,
    pub value: i64,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Reservation expiration {expire_at} is not in the future of {now}")]
pub struct InvalidReservationExpirationError {
    pub expire_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn join_displayed<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
