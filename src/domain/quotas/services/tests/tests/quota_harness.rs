// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use database_common::SqliteTransactionManager;
use dill::{Catalog, CatalogBuilder};
use kamu_quotas::testing::StaticUsageSync;
use kamu_quotas::*;
use kamu_quotas_inmem::{InMemoryQuotaRepository, InMemoryQuotaTransactionManager};
use kamu_quotas_services::register_dependencies;
use kamu_quotas_sqlite::{
    SqliteQuotaLimitRepository,
    SqliteQuotaUsageRepository,
    SqliteReservationRepository,
};
use sqlx::SqlitePool;
use time_source::{SystemTimeSource, SystemTimeSourceStub};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2050, 1, 1, 12, 0, 0).unwrap()
}

pub(crate) fn project_resource(name: &str, sync: &StaticUsageSync) -> ReservableResource {
    ReservableResource::new(name, ResourceScope::Project, Arc::new(sync.clone()))
}

pub(crate) fn user_resource(name: &str, sync: &StaticUsageSync) -> ReservableResource {
    ReservableResource::new(name, ResourceScope::User, Arc::new(sync.clone()))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub(crate) struct QuotaHarness {
    pub catalog: Catalog,
    pub reservation_service: Arc<dyn QuotaReservationService>,
    pub admin_service: Arc<dyn QuotaAdminService>,
    pub limit_service: Arc<dyn QuotaLimitService>,
    pub time_source: SystemTimeSourceStub,
}

impl QuotaHarness {
    pub fn new(resource_registry: QuotaResourceRegistry) -> Self {
        Self::with_config(resource_registry, QuotaConfig::test_default())
    }

    pub fn with_config(resource_registry: QuotaResourceRegistry, quota_config: QuotaConfig) -> Self {
        let mut b = CatalogBuilder::new();
        b.add::<InMemoryQuotaRepository>();
        b.add::<InMemoryQuotaTransactionManager>();

        Self::from_storage(b, resource_registry, quota_config)
    }

    pub fn with_sqlite(sqlite_pool: SqlitePool, resource_registry: QuotaResourceRegistry) -> Self {
        let mut b = CatalogBuilder::new();
        b.add_value(sqlite_pool);
        b.add::<SqliteTransactionManager>();
        b.add::<SqliteQuotaUsageRepository>();
        b.add::<SqliteReservationRepository>();
        b.add::<SqliteQuotaLimitRepository>();

        Self::from_storage(b, resource_registry, QuotaConfig::test_default())
    }

    /// Builds on a catalog that already carries a storage backend
    pub fn from_storage(
        mut b: CatalogBuilder,
        resource_registry: QuotaResourceRegistry,
        quota_config: QuotaConfig,
    ) -> Self {
        let time_source = SystemTimeSourceStub::new_set(t0());

        b.add_value(resource_registry);
        b.add_value(quota_config);
        b.add_value(time_source.clone())
            .bind::<dyn SystemTimeSource, SystemTimeSourceStub>();
        register_dependencies(&mut b);

        let catalog = b.build();

        Self {
            reservation_service: catalog.get_one().unwrap(),
            admin_service: catalog.get_one().unwrap(),
            limit_service: catalog.get_one().unwrap(),
            catalog,
            time_source,
        }
    }

    pub fn expire_at(&self) -> DateTime<Utc> {
        self.time_source.now() + Duration::hours(1)
    }

    pub async fn reserve(
        &self,
        scope: &QuotaScope,
        deltas: &[(&str, i64)],
        limits: QuotaLimits,
    ) -> Result<Vec<ReservationID>, ReserveQuotaError> {
        self.reservation_service
            .reserve(ReserveQuotaRequest::new(
                scope.clone(),
                deltas.iter().copied(),
                limits,
                self.expire_at(),
            ))
            .await
    }

    /// `(in_use, reserved)` of a resource as seen from the scope
    pub async fn usage(&self, scope: &QuotaScope, resource: &str) -> (i64, i64) {
        let usage = self
            .reservation_service
            .get_usage(scope, resource)
            .await
            .unwrap();
        (usage.in_use, usage.reserved)
    }

    pub async fn live_reservations(&self, scope: &QuotaScope) -> Vec<Reservation> {
        self.catalog
            .get_one::<dyn ReservationRepository>()
            .unwrap()
            .get_reservations_by_scope(scope)
            .await
            .unwrap()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
