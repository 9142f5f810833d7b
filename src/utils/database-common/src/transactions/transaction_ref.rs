// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use internal_error::{InternalError, ResultIntoInternal};
use tokio::sync::{Mutex, MutexGuard};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Type-erased handle to the unit of work that is currently open.
///
/// A transaction manager decides what the payload is: an sqlx transaction
/// for relational stores, or any other state a store needs to keep for the
/// duration of a transaction. Repositories receive it through the catalog
/// and downcast it to the payload they understand.
#[derive(Clone)]
pub struct TransactionRef {
    inner: Arc<dyn Any + Send + Sync>,
}

impl TransactionRef {
    pub fn new<DB: sqlx::Database>(pool: sqlx::Pool<DB>) -> Self {
        Self::from_payload(Mutex::new(TransactionState::<DB>::new(pool)))
    }

    pub fn from_payload<P: Any + Send + Sync>(payload: P) -> Self {
        Self {
            inner: Arc::new(payload),
        }
    }

    pub fn payload<P: Any + Send + Sync>(&self) -> Option<Arc<P>> {
        self.inner.clone().downcast::<P>().ok()
    }

    pub fn downcast<DB: sqlx::Database>(self) -> TransactionRefT<DB> {
        let inner = self
            .inner
            .downcast::<Mutex<TransactionState<DB>>>()
            .unwrap_or_else(|_| {
                panic!(
                    "Transaction type mismatch, expected {}",
                    std::any::type_name::<DB>()
                )
            });

        TransactionRefT {
            inner,
            _phantom: PhantomData,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct TransactionRefT<DB: sqlx::Database> {
    inner: Arc<Mutex<TransactionState<DB>>>,
    _phantom: PhantomData<DB>,
}

impl<DB: sqlx::Database> TransactionRefT<DB> {
    pub async fn lock(&self) -> MutexGuard<'_, TransactionState<DB>> {
        self.inner.lock().await
    }

    /// Detaches the open database transaction, if one was started
    pub async fn into_inner_db_transaction(self) -> Option<sqlx::Transaction<'static, DB>> {
        let mut state = self.inner.lock().await;
        state.transaction.take()
    }
}

impl<DB: sqlx::Database> Clone for TransactionRefT<DB> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<DB: sqlx::Database> From<TransactionRef> for TransactionRefT<DB> {
    fn from(value: TransactionRef) -> Self {
        value.downcast()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct TransactionState<DB: sqlx::Database> {
    pool: sqlx::Pool<DB>,
    transaction: Option<sqlx::Transaction<'static, DB>>,
}

impl<DB: sqlx::Database> TransactionState<DB> {
    fn new(pool: sqlx::Pool<DB>) -> Self {
        Self {
            pool,
            transaction: None,
        }
    }

    /// Returns the connection of the current transaction, beginning one on
    /// first use
    pub async fn connection_mut(&mut self) -> Result<&mut DB::Connection, InternalError> {
        if self.transaction.is_none() {
            let transaction = self.pool.begin().await.int_err()?;
            self.transaction = Some(transaction);
        }

        match self.transaction.as_deref_mut() {
            Some(connection) => Ok(connection),
            None => InternalError::bail("Database transaction is not open"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
