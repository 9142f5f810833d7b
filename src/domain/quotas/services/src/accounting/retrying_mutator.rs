// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::future::Future;
use std::time::Duration;

use database_common::is_transient_database_error;
use internal_error::InternalError;
use kamu_quotas::{
    ConcurrencyExhaustedError,
    ConflictRetryConfig,
    QuotaUsageDuplicateError,
    RefreshQuotaUsageError,
    ReserveQuotaError,
    ResolveReservationsError,
};
use rand::Rng;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Errors that may signal a lost race rather than a genuine failure
pub trait TransientConflict {
    fn is_transient_conflict(&self) -> bool;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Bounded retry of optimistic operations that can lose a race against a
/// concurrent writer: a duplicate insert of a fresh row, a conditional update
/// touching nothing, or a lock conflict aborted by the store.
///
/// Performs at most `max_retries + 1` attempts with a jittered pause in
/// `[min_backoff, max_backoff)` between them, then gives up with
/// [`ConcurrencyExhaustedError`].
#[derive(Debug, Clone)]
pub struct RetryingMutator {
    config: ConflictRetryConfig,
}

impl RetryingMutator {
    pub fn new(config: ConflictRetryConfig) -> Self {
        Self { config }
    }

    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: TransientConflict + From<ConcurrencyExhaustedError> + std::fmt::Display,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient_conflict() => err,
                Err(err) => return Err(err),
            };

            if attempts > self.config.max_retries {
                tracing::warn!(
                    operation,
                    attempts,
                    error = %err,
                    "Giving up on conflicting operation"
                );
                return Err(ConcurrencyExhaustedError {
                    operation: operation.to_string(),
                    attempts,
                }
                .into());
            }

            let backoff = self.next_backoff();
            tracing::debug!(
                operation,
                attempt = attempts,
                ?backoff,
                error = %err,
                "Operation lost a race, retrying"
            );

            if backoff.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(backoff).await;
            }
        }
    }

    fn next_backoff(&self) -> Duration {
        let min = self.config.min_backoff_ms;
        let max = self.config.max_backoff_ms;

        let millis = if max <= min {
            min
        } else {
            rand::thread_rng().gen_range(min..max)
        };

        Duration::from_millis(millis)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Store conflicts, and inserts that collided with a row the transaction
/// cannot see
fn is_lost_race(err: &InternalError) -> bool {
    is_transient_database_error(err) || err.find_source::<QuotaUsageDuplicateError>().is_some()
}

impl TransientConflict for ReserveQuotaError {
    fn is_transient_conflict(&self) -> bool {
        match self {
            Self::Internal(e) => is_lost_race(e),
            Self::OverQuota(_)
            | Self::UnknownResources(_)
            | Self::InvalidExpiration(_)
            | Self::ConcurrencyExhausted(_) => false,
        }
    }
}

impl TransientConflict for ResolveReservationsError {
    fn is_transient_conflict(&self) -> bool {
        match self {
            Self::Internal(e) => is_transient_database_error(e),
            Self::NotFound(_) | Self::ConcurrencyExhausted(_) => false,
        }
    }
}

impl TransientConflict for RefreshQuotaUsageError {
    fn is_transient_conflict(&self) -> bool {
        match self {
            Self::Internal(e) => is_lost_race(e),
            Self::NotAllowed(_) | Self::UnknownResources(_) | Self::ConcurrencyExhausted(_) => {
                false
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
