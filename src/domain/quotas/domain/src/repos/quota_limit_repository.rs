// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use internal_error::InternalError;
use thiserror::Error;

use crate::{QuotaLimit, QuotaScope};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
pub trait QuotaLimitRepository: Send + Sync {
    /// Inserts or replaces the limit of `(scope, resource)`
    async fn set_limit(&self, limit: &QuotaLimit) -> Result<(), SetQuotaLimitError>;

    async fn get_limit(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<QuotaLimit, GetQuotaLimitError>;

    /// Limits defined exactly at the scope's level
    async fn get_limits(&self, scope: &QuotaScope) -> Result<Vec<QuotaLimit>, GetQuotaLimitsError>;

    /// Project scope removes all limits of the project including user
    /// limits, user scope removes only the limits of that user
    async fn delete_limits_by_scope(&self, scope: &QuotaScope) -> Result<u64, DeleteQuotaLimitsError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum SetQuotaLimitError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetQuotaLimitError {
    #[error(transparent)]
    ProjectQuotaNotFound(ProjectQuotaNotFoundError),

    #[error(transparent)]
    UserQuotaNotFound(UserQuotaNotFoundError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl GetQuotaLimitError {
    pub fn not_found(scope: &QuotaScope, resource: &str) -> Self {
        match &scope.user_id {
            Some(user_id) => Self::UserQuotaNotFound(UserQuotaNotFoundError {
                project_id: scope.project_id.clone(),
                user_id: user_id.clone(),
                resource: resource.to_string(),
            }),
            None => Self::ProjectQuotaNotFound(ProjectQuotaNotFoundError {
                project_id: scope.project_id.clone(),
                resource: resource.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug)]
#[error("Quota of resource '{resource}' for project '{project_id}' could not be found")]
pub struct ProjectQuotaNotFoundError {
    pub project_id: String,
    pub resource: String,
}

#[derive(Error, Debug)]
#[error(
    "Quota of resource '{resource}' for user '{user_id}' in project '{project_id}' could not be \
     found"
)]
pub struct UserQuotaNotFoundError {
    pub project_id: String,
    pub user_id: String,
    pub resource: String,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetQuotaLimitsError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum DeleteQuotaLimitsError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
