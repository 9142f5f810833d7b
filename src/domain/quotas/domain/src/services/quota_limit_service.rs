// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use internal_error::InternalError;
use thiserror::Error;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Administrative surface over hard limits
#[async_trait::async_trait]
pub trait QuotaLimitService: Send + Sync {
    async fn set_limit(
        &self,
        scope: &QuotaScope,
        resource: &str,
        hard_limit: i64,
    ) -> Result<QuotaLimit, SetLimitError>;

    async fn get_limit(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<QuotaLimit, GetQuotaLimitError>;

    async fn get_limits(&self, scope: &QuotaScope) -> Result<Vec<QuotaLimit>, GetQuotaLimitsError>;

    /// Limits in the shape consumed by a reservation
    async fn get_effective_limits(
        &self,
        scope: &QuotaScope,
    ) -> Result<QuotaLimits, GetQuotaLimitsError>;

    /// Limit and usage of every registered resource
    async fn get_quota_report(
        &self,
        scope: &QuotaScope,
    ) -> Result<BTreeMap<String, QuotaReportEntry>, GetQuotaReportError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaReportEntry {
    pub limit: i64,
    pub in_use: i64,
    pub reserved: i64,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum SetLimitError {
    #[error(transparent)]
    UnknownResource(QuotaResourceUnknownError),

    #[error(transparent)]
    InvalidValue(InvalidQuotaValueError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetQuotaReportError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
