// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, Utc};
use internal_error::InternalError;
use thiserror::Error;

use crate::{NewQuotaUsage, QuotaScope, QuotaUsage, QuotaUsageID};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
pub trait QuotaUsageRepository: Send + Sync {
    /// Returns every usage row of the project, locking them against
    /// concurrent writers until the current transaction ends
    async fn get_project_usages_for_update(
        &self,
        project_id: &str,
    ) -> Result<Vec<QuotaUsage>, GetQuotaUsagesError>;

    /// Rows visible to the scope: the whole project for a project scope, or
    /// the user's rows plus the project-level rows for a user scope
    async fn get_usages(&self, scope: &QuotaScope) -> Result<Vec<QuotaUsage>, GetQuotaUsagesError>;

    async fn find_usage(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<Option<QuotaUsage>, GetQuotaUsagesError>;

    async fn create_usage(&self, usage: &NewQuotaUsage) -> Result<QuotaUsage, CreateQuotaUsageError>;

    /// Overwrites counters and refresh bookkeeping of an existing row
    async fn update_usage(&self, usage: &QuotaUsage) -> Result<(), UpdateQuotaUsageError>;

    /// Increments both counters of a row in place
    async fn apply_usage_delta(
        &self,
        usage_id: QuotaUsageID,
        in_use_delta: i64,
        reserved_delta: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), UpdateQuotaUsageError>;

    /// Project scope removes all rows of the project, user scope removes only
    /// the rows of that user
    async fn delete_usages_by_scope(&self, scope: &QuotaScope) -> Result<u64, DeleteQuotaUsagesError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetQuotaUsagesError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum CreateQuotaUsageError {
    #[error(transparent)]
    Duplicate(QuotaUsageDuplicateError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
#[error("Quota usage of resource '{resource}' already exists for {scope}")]
pub struct QuotaUsageDuplicateError {
    pub scope: QuotaScope,
    pub resource: String,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum UpdateQuotaUsageError {
    #[error(transparent)]
    NotFound(QuotaUsageRowNotFoundError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
#[error("Quota usage row {usage_id} not found")]
pub struct QuotaUsageRowNotFoundError {
    pub usage_id: QuotaUsageID,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum DeleteQuotaUsagesError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
