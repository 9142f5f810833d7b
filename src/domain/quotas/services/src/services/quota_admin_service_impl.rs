// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use database_common::DatabaseTransactionRunner;
use dill::*;
use internal_error::ResultIntoInternal;
use kamu_quotas::*;
use time_source::SystemTimeSource;

use crate::accounting::QuotaUsageStore;
use crate::{RetryingMutator, StalenessPolicy};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct QuotaAdminServiceImpl {
    catalog: Catalog,
    resource_registry: Arc<QuotaResourceRegistry>,
    quota_config: Arc<QuotaConfig>,
    time_source: Arc<dyn SystemTimeSource>,
    retrying_mutator: RetryingMutator,
}

#[component(pub)]
#[interface(dyn QuotaAdminService)]
impl QuotaAdminServiceImpl {
    pub fn new(
        catalog: Catalog,
        resource_registry: Arc<QuotaResourceRegistry>,
        quota_config: Arc<QuotaConfig>,
        time_source: Arc<dyn SystemTimeSource>,
    ) -> Self {
        let retrying_mutator = RetryingMutator::new(quota_config.retry.clone());

        Self {
            catalog,
            resource_registry,
            quota_config,
            time_source,
            retrying_mutator,
        }
    }

    async fn try_usage_refresh(
        &self,
        scope: &QuotaScope,
        resources: &[&ReservableResource],
    ) -> Result<Vec<QuotaUsage>, RefreshQuotaUsageError> {
        let staleness_policy = StalenessPolicy::new(self.quota_config.refresh_policy());

        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional(|transactional_catalog| async move {
                let usage_repo = transactional_catalog
                    .get_one::<dyn QuotaUsageRepository>()
                    .int_err()?;

                let store = QuotaUsageStore::new(usage_repo);
                let now = self.time_source.now();

                let project_rows = store.lock_project_usages(&scope.project_id).await?;

                let mut refreshed = Vec::with_capacity(resources.len());
                for resource in resources {
                    let row_scope = scope.for_resource_scope(resource.scope);

                    let existing = project_rows
                        .iter()
                        .find(|u| u.resource == resource.name && u.user_id == row_scope.user_id)
                        .cloned();

                    let usage = match existing {
                        Some(usage) => usage,
                        None => {
                            let (usage, _) = store
                                .get_or_create(
                                    &row_scope,
                                    &resource.name,
                                    staleness_policy.until_refresh_reset(),
                                    now,
                                )
                                .await?;
                            usage
                        }
                    };

                    let in_use = resource.sync.sync_usage(&row_scope).await?;
                    let usage = staleness_policy.refreshed(usage, in_use, now);
                    store.save(&usage).await?;

                    refreshed.push(usage);
                }

                Ok::<_, RefreshQuotaUsageError>(refreshed)
            })
            .await
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl QuotaAdminService for QuotaAdminServiceImpl {
    #[tracing::instrument(level = "info", skip_all, fields(scope = %scope, resource_names = ?resource_names))]
    async fn usage_refresh(
        &self,
        scope: &QuotaScope,
        resource_names: Option<Vec<String>>,
    ) -> Result<Vec<QuotaUsage>, RefreshQuotaUsageError> {
        let resource_names = resource_names.unwrap_or_else(|| {
            self.resource_registry
                .iter()
                .map(|r| r.name.clone())
                .collect()
        });

        let unknown = self.resource_registry.unknown_names(&resource_names);
        if !unknown.is_empty() {
            return Err(RefreshQuotaUsageError::UnknownResources(
                QuotaResourceUnknownError { resources: unknown },
            ));
        }

        let resources: Vec<&ReservableResource> = resource_names
            .iter()
            .filter_map(|name| self.resource_registry.resource(name))
            .collect();

        let not_allowed: Vec<String> = resources
            .iter()
            .filter(|r| !r.reentrant)
            .map(|r| r.name.clone())
            .collect();
        if !not_allowed.is_empty() {
            return Err(RefreshQuotaUsageError::NotAllowed(
                QuotaUsageRefreshNotAllowedError {
                    scope: scope.clone(),
                    resources: not_allowed,
                    allowed: self.resource_registry.reentrant_names(),
                },
            ));
        }

        let resources = &resources;
        let refreshed = self
            .retrying_mutator
            .run("usage_refresh", move || {
                self.try_usage_refresh(scope, resources)
            })
            .await?;

        tracing::info!(count = refreshed.len(), "Quota usages refreshed");

        Ok(refreshed)
    }

    #[tracing::instrument(level = "info", skip_all, fields(scope = %scope))]
    async fn destroy_all_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<DestroyQuotasSummary, DestroyQuotasError> {
        let summary = DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional(|transactional_catalog| async move {
                let reservation_repo = transactional_catalog
                    .get_one::<dyn ReservationRepository>()
                    .int_err()?;
                let usage_repo = transactional_catalog
                    .get_one::<dyn QuotaUsageRepository>()
                    .int_err()?;
                let limit_repo = transactional_catalog
                    .get_one::<dyn QuotaLimitRepository>()
                    .int_err()?;

                let reservations = reservation_repo
                    .delete_reservations_by_scope(scope)
                    .await
                    .int_err()?;
                let usages = usage_repo.delete_usages_by_scope(scope).await.int_err()?;
                let limits = limit_repo.delete_limits_by_scope(scope).await.int_err()?;

                Ok::<_, DestroyQuotasError>(DestroyQuotasSummary {
                    reservations,
                    usages,
                    limits,
                })
            })
            .await?;

        tracing::info!(
            reservations = summary.reservations,
            usages = summary.usages,
            limits = summary.limits,
            "Quotas destroyed"
        );

        Ok(summary)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
