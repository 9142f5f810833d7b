// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use internal_error::{ErrorIntoInternal, InternalError, ResultIntoInternal};
use kamu_quotas::*;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Usage row access within one open transaction
pub(crate) struct QuotaUsageStore {
    usage_repo: Arc<dyn QuotaUsageRepository>,
}

impl QuotaUsageStore {
    pub fn new(usage_repo: Arc<dyn QuotaUsageRepository>) -> Self {
        Self { usage_repo }
    }

    pub async fn lock_project_usages(
        &self,
        project_id: &str,
    ) -> Result<Vec<QuotaUsage>, InternalError> {
        self.usage_repo
            .get_project_usages_for_update(project_id)
            .await
            .int_err()
    }

    /// Fetches the row of `(scope, resource)`, materializing a zeroed one
    /// when missing. The flag tells whether this call created it.
    ///
    /// An insert that collides with a concurrently created row re-reads it.
    /// When that row is not visible either, the race is reported as
    /// [`GetOrCreateUsageError::Lost`] and the whole transaction has to be
    /// retried by the caller.
    pub async fn get_or_create(
        &self,
        scope: &QuotaScope,
        resource: &str,
        until_refresh: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<(QuotaUsage, bool), GetOrCreateUsageError> {
        if let Some(usage) = self.usage_repo.find_usage(scope, resource).await.int_err()? {
            return Ok((usage, false));
        }

        let new_usage = NewQuotaUsage {
            scope: scope.clone(),
            resource: resource.to_string(),
            until_refresh,
            created_at: now,
        };

        match self.usage_repo.create_usage(&new_usage).await {
            Ok(usage) => Ok((usage, true)),
            Err(CreateQuotaUsageError::Duplicate(e)) => {
                tracing::debug!(error = %e, "Usage row was created concurrently, fetching it");

                match self.usage_repo.find_usage(scope, resource).await.int_err()? {
                    Some(usage) => Ok((usage, false)),
                    None => Err(GetOrCreateUsageError::Lost(e)),
                }
            }
            Err(CreateQuotaUsageError::Internal(e)) => Err(e.into()),
        }
    }

    pub async fn save(&self, usage: &QuotaUsage) -> Result<(), InternalError> {
        self.usage_repo.update_usage(usage).await.int_err()
    }

    pub async fn apply_delta(
        &self,
        usage_id: QuotaUsageID,
        in_use_delta: i64,
        reserved_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<(), InternalError> {
        if in_use_delta == 0 && reserved_delta == 0 {
            return Ok(());
        }

        self.usage_repo
            .apply_usage_delta(usage_id, in_use_delta, reserved_delta, now)
            .await
            .int_err()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub(crate) enum GetOrCreateUsageError {
    /// Insert collided with a row that is not visible to this transaction
    #[error(transparent)]
    Lost(QuotaUsageDuplicateError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<GetOrCreateUsageError> for InternalError {
    fn from(value: GetOrCreateUsageError) -> Self {
        match value {
            GetOrCreateUsageError::Lost(e) => e.int_err(),
            GetOrCreateUsageError::Internal(e) => e,
        }
    }
}

impl From<GetOrCreateUsageError> for ReserveQuotaError {
    fn from(value: GetOrCreateUsageError) -> Self {
        Self::Internal(value.into())
    }
}

impl From<GetOrCreateUsageError> for RefreshQuotaUsageError {
    fn from(value: GetOrCreateUsageError) -> Self {
        Self::Internal(value.into())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
