// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use futures::future::join_all;
use kamu_quotas::testing::StaticUsageSync;
use kamu_quotas::*;
use pretty_assertions::assert_eq;
use sqlx::SqlitePool;

use super::quota_harness::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn instances_registry() -> QuotaResourceRegistry {
    QuotaResourceRegistry::new()
        .with_resource(project_resource("instances", &StaticUsageSync::new()))
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_concurrent_reservations_never_overshoot() {
    let harness = QuotaHarness::new(instances_registry());

    assert_reservations_never_overshoot(&harness).await;
}

#[test_group::group(sqlite)]
#[test_log::test(sqlx::test(migrations = "../../../../migrations/sqlite"))]
async fn test_sqlite_concurrent_reservations_never_overshoot(sqlite_pool: SqlitePool) {
    let harness = QuotaHarness::with_sqlite(sqlite_pool, instances_registry());

    assert_reservations_never_overshoot(&harness).await;
}

/// Twelve requests for one instance each race for a limit of five
async fn assert_reservations_never_overshoot(harness: &QuotaHarness) {
    let scope = QuotaScope::project("p1");

    let limits = QuotaLimits::new().with_project_limit("instances", 5);
    let expire_at = harness.expire_at();

    let tasks = (0..12).map(|_| {
        let service = Arc::clone(&harness.reservation_service);
        let request =
            ReserveQuotaRequest::new(scope.clone(), [("instances", 1)], limits.clone(), expire_at);

        tokio::spawn(async move { service.reserve(request).await })
    });

    let mut accepted = Vec::new();
    let mut rejected = 0;
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(ids) => accepted.extend(ids),
            Err(ReserveQuotaError::OverQuota(err)) => {
                assert_eq!(vec!["instances"], err.resource_names());
                rejected += 1;
            }
            Err(err) => panic!("Unexpected error: {err:?}"),
        }
    }

    assert_eq!(5, accepted.len());
    assert_eq!(7, rejected);
    assert_eq!((0, 5), harness.usage(&scope, "instances").await);

    harness
        .reservation_service
        .commit(&accepted)
        .await
        .unwrap();

    assert_eq!((5, 0), harness.usage(&scope, "instances").await);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_concurrent_commit_and_rollback_resolve_once() {
    let scope = QuotaScope::project("p1");
    let harness = QuotaHarness::new(instances_registry());

    let ids = harness
        .reserve(&scope, &[("instances", 3)], QuotaLimits::new())
        .await
        .unwrap();

    let commit = {
        let service = Arc::clone(&harness.reservation_service);
        let ids = ids.clone();
        tokio::spawn(async move { service.commit(&ids).await })
    };
    let rollback = {
        let service = Arc::clone(&harness.reservation_service);
        let ids = ids.clone();
        tokio::spawn(async move { service.rollback(&ids).await })
    };

    let committed = commit.await.unwrap();
    let rolled_back = rollback.await.unwrap();

    // Exactly one of them wins, the other finds nothing to resolve
    let usage = harness.usage(&scope, "instances").await;
    match (committed, rolled_back) {
        (Ok(()), Err(ResolveReservationsError::NotFound(_))) => assert_eq!((3, 0), usage),
        (Err(ResolveReservationsError::NotFound(_)), Ok(())) => assert_eq!((0, 0), usage),
        other => panic!("Unexpected outcome: {other:?}"),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
