// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use database_common::{TransactionRef, TransactionRefT, sqlite_generate_placeholders_list};
use dill::{component, interface};
use internal_error::{ErrorIntoInternal, InternalError, ResultIntoInternal};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::helpers::*;
use crate::domain::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const RESERVATION_COLUMNS: &str =
    "id, usage_id, project_id, user_id, resource, delta, expire_at, created_at";

pub struct SqliteReservationRepository {
    transaction: TransactionRefT<sqlx::Sqlite>,
}

#[component(pub)]
#[interface(dyn ReservationRepository)]
impl SqliteReservationRepository {
    pub fn new(transaction: TransactionRef) -> Self {
        Self {
            transaction: transaction.into(),
        }
    }

    fn map_reservation_row(row: &SqliteRow) -> Result<Reservation, InternalError> {
        let id: String = row.try_get("id").int_err()?;
        let expire_at_millis: i64 = row.try_get("expire_at").int_err()?;

        let Some(expire_at) = DateTime::<Utc>::from_timestamp_millis(expire_at_millis) else {
            return InternalError::bail(format!(
                "Reservation '{id}' has an out of range expiration: {expire_at_millis}"
            ));
        };

        Ok(Reservation {
            id: ReservationID::from_str(&id).int_err()?,
            usage_id: row.try_get("usage_id").int_err()?,
            project_id: row.try_get("project_id").int_err()?,
            user_id: user_id_from_column(row.try_get("user_id").int_err()?),
            resource: row.try_get("resource").int_err()?,
            delta: row.try_get("delta").int_err()?,
            expire_at,
            created_at: row.try_get("created_at").int_err()?,
        })
    }

    fn map_reservation_rows(rows: &[SqliteRow]) -> Result<Vec<Reservation>, InternalError> {
        rows.iter().map(Self::map_reservation_row).collect()
    }
}

#[async_trait::async_trait]
impl ReservationRepository for SqliteReservationRepository {
    async fn create_reservation(&self, reservation: &Reservation) -> Result<(), CreateReservationError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        sqlx::query(
            r#"
            INSERT INTO quota_reservations (id, usage_id, project_id, user_id, resource, delta, expire_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id.to_string())
        .bind(reservation.usage_id)
        .bind(&reservation.project_id)
        .bind(reservation.user_id.as_deref().unwrap_or_default())
        .bind(&reservation.resource)
        .bind(reservation.delta)
        .bind(reservation.expire_at.timestamp_millis())
        .bind(reservation.created_at)
        .execute(connection_mut)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CreateReservationError::Duplicate(ReservationDuplicateError {
                    reservation_id: reservation.id,
                })
            } else {
                CreateReservationError::Internal(e.int_err())
            }
        })?;

        Ok(())
    }

    async fn get_reservations_for_update(
        &self,
        ids: &[ReservationID],
    ) -> Result<Vec<Reservation>, GetReservationsError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let placeholders = sqlite_generate_placeholders_list(ids.len(), 1);

        // Takes the database write lock before reading, see the usage repository
        let lock_query_str =
            format!("UPDATE quota_reservations SET id = id WHERE id IN ({placeholders})");
        let mut lock_query = sqlx::query(&lock_query_str);
        for id in ids {
            lock_query = lock_query.bind(id.to_string());
        }
        lock_query.execute(&mut *connection_mut).await.int_err()?;

        let select_query_str = format!(
            "SELECT {RESERVATION_COLUMNS} FROM quota_reservations WHERE id IN ({placeholders})"
        );
        let mut select_query = sqlx::query(&select_query_str);
        for id in ids {
            select_query = select_query.bind(id.to_string());
        }
        let rows = select_query
            .fetch_all(&mut *connection_mut)
            .await
            .int_err()?;

        Ok(Self::map_reservation_rows(&rows)?)
    }

    async fn get_reservations_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<Vec<Reservation>, GetReservationsError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let query_str = format!(
            r#"
            SELECT {RESERVATION_COLUMNS} FROM quota_reservations
                WHERE project_id = $1 AND ($2 IS NULL OR user_id = $2)
                ORDER BY created_at, id
            "#
        );
        let rows = sqlx::query(&query_str)
            .bind(&scope.project_id)
            .bind(scope.user_id())
            .fetch_all(connection_mut)
            .await
            .int_err()?;

        Ok(Self::map_reservation_rows(&rows)?)
    }

    async fn list_expired_reservation_ids(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReservationID>, GetReservationsError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM quota_reservations
                WHERE expire_at <= $1
                ORDER BY expire_at, id
                LIMIT $2
            "#,
        )
        .bind(now.timestamp_millis())
        .bind(limit)
        .fetch_all(connection_mut)
        .await
        .int_err()?;

        ids.iter()
            .map(|id| ReservationID::from_str(id).int_err())
            .collect::<Result<Vec<_>, _>>()
            .map_err(GetReservationsError::Internal)
    }

    async fn delete_reservations(&self, ids: &[ReservationID]) -> Result<u64, DeleteReservationsError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let query_str = format!(
            "DELETE FROM quota_reservations WHERE id IN ({})",
            sqlite_generate_placeholders_list(ids.len(), 1)
        );
        let mut query = sqlx::query(&query_str);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let result = query.execute(connection_mut).await.int_err()?;

        Ok(result.rows_affected())
    }

    async fn delete_reservations_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<u64, DeleteReservationsError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM quota_reservations
                WHERE project_id = $1 AND ($2 IS NULL OR user_id = $2)
            "#,
        )
        .bind(&scope.project_id)
        .bind(scope.user_id())
        .execute(connection_mut)
        .await
        .int_err()?;

        Ok(result.rows_affected())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
