// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, Utc};
use internal_error::InternalError;
use thiserror::Error;

use crate::{QuotaScope, Reservation, ReservationID};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn create_reservation(&self, reservation: &Reservation) -> Result<(), CreateReservationError>;

    /// Loads the reservations that still exist among `ids`, locking them
    /// until the current transaction ends. Missing IDs are skipped.
    async fn get_reservations_for_update(
        &self,
        ids: &[ReservationID],
    ) -> Result<Vec<Reservation>, GetReservationsError>;

    async fn get_reservations_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<Vec<Reservation>, GetReservationsError>;

    /// IDs of reservations with `expire_at <= now`, oldest expiry first
    async fn list_expired_reservation_ids(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReservationID>, GetReservationsError>;

    /// Returns the number of deleted records
    async fn delete_reservations(&self, ids: &[ReservationID]) -> Result<u64, DeleteReservationsError>;

    async fn delete_reservations_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<u64, DeleteReservationsError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum CreateReservationError {
    #[error(transparent)]
    Duplicate(ReservationDuplicateError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug)]
#[error("Reservation '{reservation_id}' already exists")]
pub struct ReservationDuplicateError {
    pub reservation_id: ReservationID,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetReservationsError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum DeleteReservationsError {
    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
