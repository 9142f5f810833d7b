// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use database_common::*;
use dill::{Catalog, CatalogBuilder};
use internal_error::{InternalError, ResultIntoInternal};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, thiserror::Error)]
enum TestError {
    #[error("rejected")]
    Rejected,
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

async fn make_sqlite_catalog() -> (Catalog, SqlitePool) {
    // A single connection keeps every query on the same in-memory database
    let sqlite_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("CREATE TABLE items (name TEXT NOT NULL)")
        .execute(&sqlite_pool)
        .await
        .unwrap();

    let mut b = CatalogBuilder::new();
    b.add_value(sqlite_pool.clone());
    b.add::<SqliteTransactionManager>();

    (b.build(), sqlite_pool)
}

async fn insert_item(catalog: &Catalog, name: &str) -> Result<(), InternalError> {
    let transaction_ref = catalog.get_one::<TransactionRef>().int_err()?;
    let transaction: TransactionRefT<sqlx::Sqlite> = transaction_ref.as_ref().clone().into();

    let mut tr = transaction.lock().await;
    let connection_mut = tr.connection_mut().await?;

    sqlx::query("INSERT INTO items (name) VALUES ($1)")
        .bind(name)
        .execute(connection_mut)
        .await
        .int_err()?;

    Ok(())
}

async fn count_items(sqlite_pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(sqlite_pool)
        .await
        .unwrap()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_runner_without_manager_uses_base_catalog() {
    let catalog = CatalogBuilder::new().add_value(42_u32).build();

    let value = DatabaseTransactionRunner::new(catalog)
        .transactional(|catalog| async move {
            let value = catalog.get_one::<u32>().int_err()?;
            Ok::<_, InternalError>(*value)
        })
        .await
        .unwrap();

    pretty_assertions::assert_eq!(42, value);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_runner_commits_on_success() {
    let (catalog, sqlite_pool) = make_sqlite_catalog().await;

    DatabaseTransactionRunner::new(catalog)
        .transactional(|catalog| async move {
            insert_item(&catalog, "a").await?;
            insert_item(&catalog, "b").await?;
            Ok::<_, InternalError>(())
        })
        .await
        .unwrap();

    pretty_assertions::assert_eq!(2, count_items(&sqlite_pool).await);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_runner_rolls_back_on_error() {
    let (catalog, sqlite_pool) = make_sqlite_catalog().await;

    let res = DatabaseTransactionRunner::new(catalog)
        .transactional(|catalog| async move {
            insert_item(&catalog, "a").await?;
            Err::<(), _>(TestError::Rejected)
        })
        .await;

    assert!(matches!(res, Err(TestError::Rejected)));
    pretty_assertions::assert_eq!(0, count_items(&sqlite_pool).await);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_transient_error_classification() {
    let not_transient = InternalError::new(sqlx::Error::RowNotFound);
    assert!(!is_transient_database_error(&not_transient));

    let pool_timeout = InternalError::new(sqlx::Error::PoolTimedOut);
    assert!(is_transient_database_error(&pool_timeout));

    let plain = InternalError::new(std::io::Error::other("boom"));
    assert!(!is_transient_database_error(&plain));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
