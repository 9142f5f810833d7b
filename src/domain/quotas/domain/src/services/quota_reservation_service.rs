// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use internal_error::InternalError;
use thiserror::Error;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Two-phase accounting of limited resources: holds are placed by
/// [`QuotaReservationService::reserve`] and resolved exactly once by commit,
/// rollback or expiry.
#[async_trait::async_trait]
pub trait QuotaReservationService: Send + Sync {
    async fn reserve(
        &self,
        request: ReserveQuotaRequest,
    ) -> Result<Vec<ReservationID>, ReserveQuotaError>;

    /// Moves the held amounts into committed usage. Either all reservations
    /// are resolved or none is.
    async fn commit(&self, reservation_ids: &[ReservationID])
    -> Result<(), ResolveReservationsError>;

    /// Releases the held amounts. Either all reservations are resolved or
    /// none is.
    async fn rollback(
        &self,
        reservation_ids: &[ReservationID],
    ) -> Result<(), ResolveReservationsError>;

    /// Rolls back every reservation that expired at `now`
    async fn expire(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ExpireReservationsSummary, ExpireReservationsError>;

    async fn get_usages(
        &self,
        scope: &QuotaScope,
    ) -> Result<BTreeMap<String, QuotaUsageTotals>, GetQuotaUsageError>;

    async fn get_usage(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<QuotaUsageTotals, GetQuotaUsageError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct ReserveQuotaRequest {
    pub scope: QuotaScope,
    pub deltas: BTreeMap<String, i64>,
    pub limits: QuotaLimits,
    pub expire_at: DateTime<Utc>,
    /// Falls back to the configured policy when not set
    pub refresh_policy: Option<UsageRefreshPolicy>,
}

impl ReserveQuotaRequest {
    pub fn new(
        scope: QuotaScope,
        deltas: impl IntoIterator<Item = (impl Into<String>, i64)>,
        limits: QuotaLimits,
        expire_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scope,
            deltas: deltas.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            limits,
            expire_at,
            refresh_policy: None,
        }
    }

    pub fn with_refresh_policy(mut self, refresh_policy: UsageRefreshPolicy) -> Self {
        self.refresh_policy = Some(refresh_policy);
        self
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExpireReservationsSummary {
    pub expired: usize,
    pub failed: usize,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ReserveQuotaError {
    #[error(transparent)]
    OverQuota(OverQuotaError),

    #[error(transparent)]
    UnknownResources(QuotaResourceUnknownError),

    #[error(transparent)]
    InvalidExpiration(InvalidReservationExpirationError),

    #[error(transparent)]
    ConcurrencyExhausted(#[from] ConcurrencyExhaustedError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ResolveReservationsError {
    #[error(transparent)]
    NotFound(ReservationNotFoundError),

    #[error(transparent)]
    ConcurrencyExhausted(#[from] ConcurrencyExhaustedError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ExpireReservationsError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetQuotaUsageError {
    #[error(transparent)]
    NotFound(QuotaUsageNotFoundError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
