// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;
use std::sync::Arc;

use database_common::DatabaseTransactionRunner;
use dill::*;
use internal_error::ResultIntoInternal;
use kamu_quotas::*;
use time_source::SystemTimeSource;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct QuotaLimitServiceImpl {
    catalog: Catalog,
    resource_registry: Arc<QuotaResourceRegistry>,
    time_source: Arc<dyn SystemTimeSource>,
}

#[component(pub)]
#[interface(dyn QuotaLimitService)]
impl QuotaLimitServiceImpl {
    pub fn new(
        catalog: Catalog,
        resource_registry: Arc<QuotaResourceRegistry>,
        time_source: Arc<dyn SystemTimeSource>,
    ) -> Self {
        Self {
            catalog,
            resource_registry,
            time_source,
        }
    }

    fn limits_to_map(limits: Vec<QuotaLimit>) -> std::collections::HashMap<String, i64> {
        limits
            .into_iter()
            .map(|limit| (limit.resource, limit.hard_limit))
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl QuotaLimitService for QuotaLimitServiceImpl {
    #[tracing::instrument(level = "info", skip_all, fields(scope = %scope, resource = %resource, hard_limit = hard_limit))]
    async fn set_limit(
        &self,
        scope: &QuotaScope,
        resource: &str,
        hard_limit: i64,
    ) -> Result<QuotaLimit, SetLimitError> {
        let Some(reservable) = self.resource_registry.resource(resource) else {
            return Err(SetLimitError::UnknownResource(QuotaResourceUnknownError {
                resources: vec![resource.to_string()],
            }));
        };

        if hard_limit < UNLIMITED_QUOTA {
            return Err(SetLimitError::InvalidValue(InvalidQuotaValueError {
                resource: resource.to_string(),
                value: hard_limit,
            }));
        }

        // A user limit of a resource tracked per project applies to the project
        let limit_scope = scope.for_resource_scope(reservable.scope);
        let limit_scope = &limit_scope;
        let now = self.time_source.now();

        let limit = DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional_with(|limit_repo: Arc<dyn QuotaLimitRepository>| async move {
                let created_at = match limit_repo.get_limit(limit_scope, resource).await {
                    Ok(existing) => existing.created_at,
                    Err(
                        GetQuotaLimitError::ProjectQuotaNotFound(_)
                        | GetQuotaLimitError::UserQuotaNotFound(_),
                    ) => now,
                    Err(GetQuotaLimitError::Internal(e)) => return Err(SetLimitError::Internal(e)),
                };

                let limit = QuotaLimit {
                    project_id: limit_scope.project_id.clone(),
                    user_id: limit_scope.user_id.clone(),
                    resource: resource.to_string(),
                    hard_limit,
                    created_at,
                    updated_at: now,
                };
                limit_repo.set_limit(&limit).await.int_err()?;

                Ok::<_, SetLimitError>(limit)
            })
            .await?;

        tracing::info!(scope = %limit_scope, "Quota limit set");

        Ok(limit)
    }

    async fn get_limit(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<QuotaLimit, GetQuotaLimitError> {
        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional_with(|limit_repo: Arc<dyn QuotaLimitRepository>| async move {
                limit_repo.get_limit(scope, resource).await
            })
            .await
    }

    async fn get_limits(&self, scope: &QuotaScope) -> Result<Vec<QuotaLimit>, GetQuotaLimitsError> {
        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional_with(|limit_repo: Arc<dyn QuotaLimitRepository>| async move {
                limit_repo.get_limits(scope).await
            })
            .await
    }

    async fn get_effective_limits(
        &self,
        scope: &QuotaScope,
    ) -> Result<QuotaLimits, GetQuotaLimitsError> {
        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional_with(|limit_repo: Arc<dyn QuotaLimitRepository>| async move {
                let project = limit_repo.get_limits(&scope.project_level()).await?;

                let user = if scope.is_project_level() {
                    Vec::new()
                } else {
                    limit_repo.get_limits(scope).await?
                };

                Ok::<_, GetQuotaLimitsError>(QuotaLimits {
                    project: Self::limits_to_map(project),
                    user: Self::limits_to_map(user),
                })
            })
            .await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(scope = %scope))]
    async fn get_quota_report(
        &self,
        scope: &QuotaScope,
    ) -> Result<BTreeMap<String, QuotaReportEntry>, GetQuotaReportError> {
        let limits = self.get_effective_limits(scope).await.int_err()?;

        let rows = DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional_with(|usage_repo: Arc<dyn QuotaUsageRepository>| async move {
                usage_repo.get_usages(scope).await.int_err()
            })
            .await?;

        let mut report = BTreeMap::new();
        for resource in self.resource_registry.iter() {
            let limit = match resource.scope {
                ResourceScope::User if !scope.is_project_level() => limits
                    .user
                    .get(&resource.name)
                    .copied()
                    .unwrap_or_else(|| limits.project_limit(&resource.name)),
                _ => limits.project_limit(&resource.name),
            };

            let mut usage = QuotaUsageTotals::default();
            for row in rows.iter().filter(|r| r.resource == resource.name) {
                usage.add(row);
            }

            report.insert(
                resource.name.clone(),
                QuotaReportEntry {
                    limit,
                    in_use: usage.in_use,
                    reserved: usage.reserved,
                },
            );
        }

        Ok(report)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
