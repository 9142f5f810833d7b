// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::{Arc, Mutex};

use database_common::{DatabaseTransactionManager, TransactionRef};
use dill::*;
use internal_error::InternalError;
use tokio::sync::OwnedMutexGuard;

use crate::{InMemoryQuotaRepository, State};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Gives the in-memory repository serializable transactions: only one
/// transaction is open at a time, and a rollback restores the state captured
/// when it began
pub struct InMemoryQuotaTransactionManager {
    repository: Arc<InMemoryQuotaRepository>,
    serializer: Arc<tokio::sync::Mutex<()>>,
}

struct InMemoryQuotaTransaction {
    _permit: OwnedMutexGuard<()>,
    snapshot: State,
}

type InMemoryQuotaTransactionPayload = Mutex<Option<InMemoryQuotaTransaction>>;

#[component(pub)]
#[interface(dyn DatabaseTransactionManager)]
#[scope(Singleton)]
impl InMemoryQuotaTransactionManager {
    pub fn new(repository: Arc<InMemoryQuotaRepository>) -> Self {
        Self {
            repository,
            serializer: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn take_transaction(
        transaction_ref: &TransactionRef,
    ) -> Result<InMemoryQuotaTransaction, InternalError> {
        let Some(payload) = transaction_ref.payload::<InMemoryQuotaTransactionPayload>() else {
            return InternalError::bail("Not an in-memory quota transaction");
        };

        let Some(transaction) = payload.lock().unwrap().take() else {
            return InternalError::bail("In-memory quota transaction was already closed");
        };

        Ok(transaction)
    }
}

#[async_trait::async_trait]
impl DatabaseTransactionManager for InMemoryQuotaTransactionManager {
    async fn make_transaction_ref(&self) -> Result<TransactionRef, InternalError> {
        let permit = self.serializer.clone().lock_owned().await;

        let transaction = InMemoryQuotaTransaction {
            _permit: permit,
            snapshot: self.repository.snapshot(),
        };

        Ok(TransactionRef::from_payload::<InMemoryQuotaTransactionPayload>(
            Mutex::new(Some(transaction)),
        ))
    }

    async fn commit_transaction(
        &self,
        transaction_ref: TransactionRef,
    ) -> Result<(), InternalError> {
        Self::take_transaction(&transaction_ref)?;
        Ok(())
    }

    async fn rollback_transaction(
        &self,
        transaction_ref: TransactionRef,
    ) -> Result<(), InternalError> {
        let transaction = Self::take_transaction(&transaction_ref)?;

        tracing::debug!("Restoring in-memory quota state");
        self.repository.restore(transaction.snapshot);

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
