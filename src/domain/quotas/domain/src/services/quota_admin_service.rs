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

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operator recovery tools
#[async_trait::async_trait]
pub trait QuotaAdminService: Send + Sync {
    /// Forces resynchronization of the named resources, or of every
    /// registered resource when no names are given. Missing usage rows are
    /// created.
    async fn usage_refresh(
        &self,
        scope: &QuotaScope,
        resource_names: Option<Vec<String>>,
    ) -> Result<Vec<QuotaUsage>, RefreshQuotaUsageError>;

    /// Drops reservations, usage rows and limits of the scope
    async fn destroy_all_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<DestroyQuotasSummary, DestroyQuotasError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DestroyQuotasSummary {
    pub reservations: u64,
    pub usages: u64,
    pub limits: u64,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum RefreshQuotaUsageError {
    #[error(transparent)]
    NotAllowed(QuotaUsageRefreshNotAllowedError),

    #[error(transparent)]
    UnknownResources(QuotaResourceUnknownError),

    #[error(transparent)]
    ConcurrencyExhausted(#[from] ConcurrencyExhaustedError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum DestroyQuotasError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
