// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::future::Future;
use std::sync::Arc;

use dill::{Catalog, CatalogBuilder, component};
use internal_error::{InternalError, ResultIntoInternal};

use crate::DatabaseTransactionManager;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Runs a unit of work inside a database transaction.
///
/// The callback receives a catalog chained from the base one that carries the
/// [`crate::TransactionRef`], so repositories resolved from it join the
/// transaction. The transaction commits when the callback succeeds and rolls
/// back when it fails. If no [`DatabaseTransactionManager`] is registered the
/// callback simply runs against the base catalog.
pub struct DatabaseTransactionRunner {
    catalog: Catalog,
}

#[component(pub)]
impl DatabaseTransactionRunner {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub async fn transactional<H, HFut, HFutResultT, HFutResultE>(
        &self,
        callback: H,
    ) -> Result<HFutResultT, HFutResultE>
    where
        H: FnOnce(Catalog) -> HFut,
        HFut: Future<Output = Result<HFutResultT, HFutResultE>>,
        HFutResultE: From<InternalError>,
    {
        let Ok(db_transaction_manager) = self.catalog.get_one::<dyn DatabaseTransactionManager>()
        else {
            return callback(self.catalog.clone()).await;
        };

        let transaction_ref = db_transaction_manager.make_transaction_ref().await?;

        let catalog_with_transaction = CatalogBuilder::new_chained(&self.catalog)
            .add_value(transaction_ref.clone())
            .build();

        let result = callback(catalog_with_transaction).await;

        match result {
            Ok(value) => {
                db_transaction_manager
                    .commit_transaction(transaction_ref)
                    .await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = db_transaction_manager
                    .rollback_transaction(transaction_ref)
                    .await
                {
                    tracing::error!(error = ?rollback_err, "Transaction rollback failed");
                }
                Err(e)
            }
        }
    }

    pub async fn transactional_with<Iface, H, HFut, HFutResultT, HFutResultE>(
        &self,
        callback: H,
    ) -> Result<HFutResultT, HFutResultE>
    where
        Iface: 'static + ?Sized + Send + Sync,
        H: FnOnce(Arc<Iface>) -> HFut,
        HFut: Future<Output = Result<HFutResultT, HFutResultE>>,
        HFutResultE: From<InternalError>,
    {
        self.transactional(|transactional_catalog| async move {
            let catalog_item = transactional_catalog.get_one::<Iface>().int_err()?;

            callback(catalog_item).await
        })
        .await
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
