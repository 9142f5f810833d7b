// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use internal_error::InternalError;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

// SQLite: BUSY, LOCKED and their extended variants.
// Postgres: serialization_failure, deadlock_detected.
// MySQL: lock wait timeout, deadlock.
const TRANSIENT_DATABASE_ERROR_CODES: &[&str] = &[
    "5", "6", "261", "262", "517", "40001", "40P01", "1205", "1213",
];

/// Tells whether the error is a lock conflict that the database resolved by
/// aborting our statement or transaction. Such failures are expected under
/// contention and the whole unit of work can be attempted again.
pub fn is_transient_sqlx_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| TRANSIENT_DATABASE_ERROR_CODES.contains(&code.as_ref())),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

pub fn is_transient_database_error(err: &InternalError) -> bool {
    if let Some(sqlx_err) = err.find_source::<sqlx::Error>() {
        return is_transient_sqlx_error(sqlx_err);
    }

    if let Some(DatabaseError::SqlxError(sqlx_err)) = err.find_source::<DatabaseError>() {
        return is_transient_sqlx_error(sqlx_err);
    }

    false
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
