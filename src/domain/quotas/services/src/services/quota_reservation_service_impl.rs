// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use database_common::DatabaseTransactionRunner;
use dill::*;
use internal_error::{InternalError, ResultIntoInternal};
use kamu_quotas::*;
use time_source::SystemTimeSource;

use crate::accounting::QuotaUsageStore;
use crate::{LimitChecker, RetryingMutator, StalenessPolicy};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct QuotaReservationServiceImpl {
    catalog: Catalog,
    resource_registry: Arc<QuotaResourceRegistry>,
    quota_config: Arc<QuotaConfig>,
    time_source: Arc<dyn SystemTimeSource>,
    retrying_mutator: RetryingMutator,
}

#[component(pub)]
#[interface(dyn QuotaReservationService)]
impl QuotaReservationServiceImpl {
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

    async fn try_reserve(
        &self,
        request: &ReserveQuotaRequest,
        staleness_policy: StalenessPolicy,
    ) -> Result<Vec<ReservationID>, ReserveQuotaError> {
        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional(|transactional_catalog| async move {
                let usage_repo = transactional_catalog
                    .get_one::<dyn QuotaUsageRepository>()
                    .int_err()?;
                let reservation_repo = transactional_catalog
                    .get_one::<dyn ReservationRepository>()
                    .int_err()?;

                let store = QuotaUsageStore::new(usage_repo);
                let scope = &request.scope;
                let now = self.time_source.now();

                // Locks the whole project first, so concurrent reservations
                // within it are checked one after another
                let mut project_rows = store.lock_project_usages(&scope.project_id).await?;

                let mut own_rows = BTreeMap::new();
                for resource_name in request.deltas.keys() {
                    let Some(resource) = self.resource_registry.resource(resource_name) else {
                        return InternalError::bail(format!(
                            "Resource '{resource_name}' is not registered"
                        ))
                        .map_err(Into::into);
                    };

                    let usage = self
                        .prepare_usage(
                            &store,
                            &mut project_rows,
                            resource,
                            &scope.for_resource_scope(resource.scope),
                            staleness_policy,
                            now,
                        )
                        .await?;

                    own_rows.insert(resource_name.clone(), usage);
                }

                let mut project_usages: HashMap<String, QuotaUsageTotals> = HashMap::new();
                for row in &project_rows {
                    if request.deltas.contains_key(&row.resource) {
                        project_usages
                            .entry(row.resource.clone())
                            .or_default()
                            .add(row);
                    }
                }

                let user_usages: HashMap<String, QuotaUsageTotals> = own_rows
                    .iter()
                    .filter(|(_, usage)| usage.user_id.is_some())
                    .map(|(name, usage)| (name.clone(), QuotaUsageTotals::from(usage)))
                    .collect();

                for (resource_name, &delta) in &request.deltas {
                    let usage = &own_rows[resource_name];
                    if delta < 0 && usage.in_use.saturating_add(delta) < 0 {
                        tracing::warn!(
                            resource = %resource_name,
                            in_use = usage.in_use,
                            delta,
                            "Quota usage would drop below zero"
                        );
                    }
                }

                let overs = LimitChecker::over_quota(
                    &request.limits,
                    &request.deltas,
                    &project_usages,
                    &user_usages,
                );
                if !overs.is_empty() {
                    let err = OverQuotaError { overs };
                    tracing::info!(%scope, resources = ?err.resource_names(), "Reservation is over quota");
                    return Err(ReserveQuotaError::OverQuota(err));
                }

                let mut reservation_ids = Vec::with_capacity(request.deltas.len());
                for (resource_name, &delta) in &request.deltas {
                    let usage = &own_rows[resource_name];

                    store.apply_delta(usage.id, 0, delta.max(0), now).await?;

                    let reservation = Reservation {
                        id: ReservationID::new_generated(),
                        usage_id: usage.id,
                        project_id: usage.project_id.clone(),
                        user_id: usage.user_id.clone(),
                        resource: resource_name.clone(),
                        delta,
                        expire_at: request.expire_at,
                        created_at: now,
                    };
                    reservation_repo
                        .create_reservation(&reservation)
                        .await
                        .int_err()?;

                    reservation_ids.push(reservation.id);
                }

                Ok::<_, ReserveQuotaError>(reservation_ids)
            })
            .await
    }

    /// Resolves the row a reservation is accounted against and brings it up
    /// to date, keeping `project_rows` in sync with what was written
    async fn prepare_usage(
        &self,
        store: &QuotaUsageStore,
        project_rows: &mut Vec<QuotaUsage>,
        resource: &ReservableResource,
        row_scope: &QuotaScope,
        staleness_policy: StalenessPolicy,
        now: DateTime<Utc>,
    ) -> Result<QuotaUsage, ReserveQuotaError> {
        let existing = project_rows
            .iter()
            .find(|u| u.resource == resource.name && u.user_id == row_scope.user_id)
            .cloned();

        let (mut usage, created) = match existing {
            Some(usage) => (usage, false),
            None => {
                store
                    .get_or_create(
                        row_scope,
                        &resource.name,
                        staleness_policy.until_refresh_reset(),
                        now,
                    )
                    .await?
            }
        };

        let decision = staleness_policy.check(&usage, now);
        usage.until_refresh = decision.until_refresh;

        if created || decision.needs_refresh {
            let in_use = resource.sync.sync_usage(row_scope).await?;
            usage = staleness_policy.refreshed(usage, in_use, now);
            store.save(&usage).await?;
        } else if decision.until_refresh.is_some() {
            store.save(&usage).await?;
        }

        match project_rows.iter_mut().find(|u| u.id == usage.id) {
            Some(row) => *row = usage.clone(),
            None => project_rows.push(usage.clone()),
        }

        Ok(usage)
    }

    async fn try_resolve(
        &self,
        reservation_ids: &[ReservationID],
        commit: bool,
    ) -> Result<(), ResolveReservationsError> {
        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional(|transactional_catalog| async move {
                let usage_repo = transactional_catalog
                    .get_one::<dyn QuotaUsageRepository>()
                    .int_err()?;
                let reservation_repo = transactional_catalog
                    .get_one::<dyn ReservationRepository>()
                    .int_err()?;

                let store = QuotaUsageStore::new(usage_repo);
                let now = self.time_source.now();

                let unique_ids: Vec<ReservationID> = reservation_ids
                    .iter()
                    .copied()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();

                let reservations = reservation_repo
                    .get_reservations_for_update(&unique_ids)
                    .await
                    .int_err()?;

                if reservations.len() != unique_ids.len() {
                    let found: HashSet<ReservationID> =
                        reservations.iter().map(|r| r.id).collect();

                    return Err(ResolveReservationsError::NotFound(
                        ReservationNotFoundError {
                            reservation_ids: unique_ids
                                .into_iter()
                                .filter(|id| !found.contains(id))
                                .collect(),
                        },
                    ));
                }

                for reservation in &reservations {
                    let in_use_delta = if commit { reservation.delta } else { 0 };
                    store
                        .apply_delta(reservation.usage_id, in_use_delta, -reservation.held(), now)
                        .await?;
                }

                reservation_repo
                    .delete_reservations(&unique_ids)
                    .await
                    .int_err()?;

                Ok::<_, ResolveReservationsError>(())
            })
            .await
    }

    /// Returns `false` when the reservation was resolved by someone else in
    /// the meantime
    async fn try_expire_one(
        &self,
        reservation_id: ReservationID,
        now: DateTime<Utc>,
    ) -> Result<bool, ResolveReservationsError> {
        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional(|transactional_catalog| async move {
                let usage_repo = transactional_catalog
                    .get_one::<dyn QuotaUsageRepository>()
                    .int_err()?;
                let reservation_repo = transactional_catalog
                    .get_one::<dyn ReservationRepository>()
                    .int_err()?;

                let store = QuotaUsageStore::new(usage_repo);

                let Some(reservation) = reservation_repo
                    .get_reservations_for_update(&[reservation_id])
                    .await
                    .int_err()?
                    .into_iter()
                    .next()
                else {
                    return Ok(false);
                };

                if !reservation.is_expired(now) {
                    return Ok(false);
                }

                store
                    .apply_delta(reservation.usage_id, 0, -reservation.held(), now)
                    .await?;

                reservation_repo
                    .delete_reservations(&[reservation_id])
                    .await
                    .int_err()?;

                Ok::<_, ResolveReservationsError>(true)
            })
            .await
    }

    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReservationID>, InternalError> {
        DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional_with(|reservation_repo: Arc<dyn ReservationRepository>| async move {
                reservation_repo
                    .list_expired_reservation_ids(now, limit)
                    .await
                    .int_err()
            })
            .await
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl QuotaReservationService for QuotaReservationServiceImpl {
    #[tracing::instrument(level = "debug", skip_all, fields(scope = %request.scope))]
    async fn reserve(
        &self,
        request: ReserveQuotaRequest,
    ) -> Result<Vec<ReservationID>, ReserveQuotaError> {
        let unknown = self.resource_registry.unknown_names(request.deltas.keys());
        if !unknown.is_empty() {
            return Err(ReserveQuotaError::UnknownResources(
                QuotaResourceUnknownError { resources: unknown },
            ));
        }

        let now = self.time_source.now();
        if request.expire_at <= now {
            return Err(ReserveQuotaError::InvalidExpiration(
                InvalidReservationExpirationError {
                    expire_at: request.expire_at,
                    now,
                },
            ));
        }

        if request.deltas.is_empty() {
            return Ok(Vec::new());
        }

        let staleness_policy = StalenessPolicy::new(
            request
                .refresh_policy
                .unwrap_or_else(|| self.quota_config.refresh_policy()),
        );

        let request = &request;
        let reservation_ids = self
            .retrying_mutator
            .run("reserve", move || self.try_reserve(request, staleness_policy))
            .await?;

        tracing::debug!(?reservation_ids, "Quota reserved");

        Ok(reservation_ids)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(reservation_ids = ?reservation_ids))]
    async fn commit(
        &self,
        reservation_ids: &[ReservationID],
    ) -> Result<(), ResolveReservationsError> {
        if reservation_ids.is_empty() {
            return Ok(());
        }

        self.retrying_mutator
            .run("commit", move || self.try_resolve(reservation_ids, true))
            .await?;

        tracing::debug!("Reservations committed");

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(reservation_ids = ?reservation_ids))]
    async fn rollback(
        &self,
        reservation_ids: &[ReservationID],
    ) -> Result<(), ResolveReservationsError> {
        if reservation_ids.is_empty() {
            return Ok(());
        }

        self.retrying_mutator
            .run("rollback", move || self.try_resolve(reservation_ids, false))
            .await?;

        tracing::debug!("Reservations rolled back");

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(now = %now))]
    async fn expire(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ExpireReservationsSummary, ExpireReservationsError> {
        let batch_size = self.quota_config.expiry_batch_size.max(1);

        let mut summary = ExpireReservationsSummary::default();
        let mut failed_ids = HashSet::new();

        loop {
            // Failed IDs stay in the store, over-fetch so they cannot starve
            // the rest
            let pending: Vec<_> = self
                .list_expired(now, batch_size + failed_ids.len())
                .await?
                .into_iter()
                .filter(|id| !failed_ids.contains(id))
                .collect();

            if pending.is_empty() {
                break;
            }

            for reservation_id in pending {
                match self
                    .retrying_mutator
                    .run("expire", move || self.try_expire_one(reservation_id, now))
                    .await
                {
                    Ok(true) => summary.expired += 1,
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(
                            %reservation_id,
                            error = ?err,
                            error_msg = %err,
                            "Failed to expire reservation"
                        );
                        failed_ids.insert(reservation_id);
                        summary.failed += 1;
                    }
                }
            }
        }

        if summary.expired > 0 || summary.failed > 0 {
            tracing::info!(
                expired = summary.expired,
                failed = summary.failed,
                "Expired reservations swept"
            );
        }

        Ok(summary)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(scope = %scope))]
    async fn get_usages(
        &self,
        scope: &QuotaScope,
    ) -> Result<BTreeMap<String, QuotaUsageTotals>, GetQuotaUsageError> {
        let rows = DatabaseTransactionRunner::new(self.catalog.clone())
            .transactional_with(|usage_repo: Arc<dyn QuotaUsageRepository>| async move {
                usage_repo.get_usages(scope).await.int_err()
            })
            .await?;

        let mut usages: BTreeMap<String, QuotaUsageTotals> = BTreeMap::new();
        for row in &rows {
            usages.entry(row.resource.clone()).or_default().add(row);
        }

        Ok(usages)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(scope = %scope, resource = %resource))]
    async fn get_usage(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<QuotaUsageTotals, GetQuotaUsageError> {
        let usages = self.get_usages(scope).await?;

        usages.get(resource).copied().ok_or_else(|| {
            GetQuotaUsageError::NotFound(QuotaUsageNotFoundError {
                scope: scope.clone(),
                resource: resource.to_string(),
            })
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
