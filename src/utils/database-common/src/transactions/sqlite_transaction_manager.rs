// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use dill::*;
use internal_error::{InternalError, ResultIntoInternal};
use sqlx::SqlitePool;

use crate::{DatabaseTransactionManager, TransactionRef, TransactionRefT};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Opens one lazily started sqlx transaction per unit of work. Nothing is
/// sent to the database until a repository asks for the connection.
pub struct SqliteTransactionManager {
    sqlite_pool: SqlitePool,
}

#[component(pub)]
#[interface(dyn DatabaseTransactionManager)]
impl SqliteTransactionManager {
    pub fn new(sqlite_pool: SqlitePool) -> Self {
        Self { sqlite_pool }
    }

    async fn finish_transaction(
        transaction_ref: TransactionRef,
        commit: bool,
    ) -> Result<(), InternalError> {
        let transaction_typed: TransactionRefT<sqlx::Sqlite> = transaction_ref.downcast();

        let Some(sqlite_transaction) = transaction_typed.into_inner_db_transaction().await else {
            tracing::trace!("No statements were issued, nothing to finish");
            return Ok(());
        };

        if commit {
            sqlite_transaction.commit().await.int_err()
        } else {
            sqlite_transaction.rollback().await.int_err()
        }
    }
}

#[async_trait::async_trait]
impl DatabaseTransactionManager for SqliteTransactionManager {
    async fn make_transaction_ref(&self) -> Result<TransactionRef, InternalError> {
        Ok(TransactionRef::new(self.sqlite_pool.clone()))
    }

    async fn commit_transaction(
        &self,
        transaction_ref: TransactionRef,
    ) -> Result<(), InternalError> {
        Self::finish_transaction(transaction_ref, true).await
    }

    async fn rollback_transaction(
        &self,
        transaction_ref: TransactionRef,
    ) -> Result<(), InternalError> {
        Self::finish_transaction(transaction_ref, false).await
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
