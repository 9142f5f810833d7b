// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use database_common::DatabaseTransactionRunner;
use dill::{Catalog, CatalogBuilder};
use internal_error::InternalError;
use kamu_quotas_inmem::domain::*;
use kamu_quotas_inmem::{InMemoryQuotaRepository, InMemoryQuotaTransactionManager};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn make_catalog() -> Catalog {
    let mut catalog_builder = CatalogBuilder::new();
    catalog_builder.add::<InMemoryQuotaRepository>();
    catalog_builder.add::<InMemoryQuotaTransactionManager>();
    catalog_builder.build()
}

fn new_usage(resource: &str) -> NewQuotaUsage {
    NewQuotaUsage {
        scope: QuotaScope::project("p1"),
        resource: resource.to_string(),
        until_refresh: None,
        created_at: Utc::now(),
    }
}

async fn count_usages(catalog: &Catalog) -> usize {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();
    usage_repo
        .get_usages(&QuotaScope::project("p1"))
        .await
        .unwrap()
        .len()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_committed_changes_are_kept() {
    let catalog = make_catalog();

    DatabaseTransactionRunner::new(catalog.clone())
        .transactional_with(|usage_repo: Arc<dyn QuotaUsageRepository>| async move {
            usage_repo.create_usage(&new_usage("cores")).await.unwrap();
            Ok::<_, InternalError>(())
        })
        .await
        .unwrap();

    assert_eq!(1, count_usages(&catalog).await);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_failed_transaction_restores_state() {
    let catalog = make_catalog();

    DatabaseTransactionRunner::new(catalog.clone())
        .transactional_with(|usage_repo: Arc<dyn QuotaUsageRepository>| async move {
            usage_repo.create_usage(&new_usage("cores")).await.unwrap();
            Ok::<_, InternalError>(())
        })
        .await
        .unwrap();

    let res = DatabaseTransactionRunner::new(catalog.clone())
        .transactional(|transactional_catalog| async move {
            let usage_repo = transactional_catalog
                .get_one::<dyn QuotaUsageRepository>()
                .unwrap();
            let limit_repo = transactional_catalog
                .get_one::<dyn QuotaLimitRepository>()
                .unwrap();

            let ram = usage_repo.create_usage(&new_usage("ram")).await.unwrap();
            usage_repo
                .apply_usage_delta(ram.id, 10, 0, Utc::now())
                .await
                .unwrap();
            limit_repo
                .set_limit(&QuotaLimit {
                    project_id: "p1".to_string(),
                    user_id: None,
                    resource: "ram".to_string(),
                    hard_limit: 5,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .await
                .unwrap();

            InternalError::bail::<()>("boom")
        })
        .await;
    assert!(res.is_err());

    assert_eq!(1, count_usages(&catalog).await);
    let limit_repo = catalog.get_one::<dyn QuotaLimitRepository>().unwrap();
    assert!(
        limit_repo
            .get_limits(&QuotaScope::project("p1"))
            .await
            .unwrap()
            .is_empty()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_transactions_do_not_interleave() {
    let catalog = make_catalog();

    let (opened_tx, opened_rx) = tokio::sync::oneshot::channel();

    let first = {
        let catalog = catalog.clone();
        tokio::spawn(async move {
            DatabaseTransactionRunner::new(catalog)
                .transactional_with(|usage_repo: Arc<dyn QuotaUsageRepository>| async move {
                    opened_tx.send(()).unwrap();
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    usage_repo.create_usage(&new_usage("cores")).await.unwrap();
                    Ok::<_, InternalError>(())
                })
                .await
        })
    };

    opened_rx.await.unwrap();

    // Observes the first transaction only after it has finished
    let seen = DatabaseTransactionRunner::new(catalog.clone())
        .transactional_with(|usage_repo: Arc<dyn QuotaUsageRepository>| async move {
            let usages = usage_repo
                .get_usages(&QuotaScope::project("p1"))
                .await
                .unwrap();
            Ok::<_, InternalError>(usages.len())
        })
        .await
        .unwrap();

    first.await.unwrap().unwrap();
    assert_eq!(1, seen);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
