// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use database_common::{TransactionRef, TransactionRefT};
use dill::{component, interface};
use internal_error::{InternalError, ResultIntoInternal};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::helpers::*;
use crate::domain::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct SqliteQuotaLimitRepository {
    transaction: TransactionRefT<sqlx::Sqlite>,
}

#[component(pub)]
#[interface(dyn QuotaLimitRepository)]
impl SqliteQuotaLimitRepository {
    pub fn new(transaction: TransactionRef) -> Self {
        Self {
            transaction: transaction.into(),
        }
    }

    fn map_limit_row(row: &SqliteRow) -> Result<QuotaLimit, InternalError> {
        Ok(QuotaLimit {
            project_id: row.try_get("project_id").int_err()?,
            user_id: user_id_from_column(row.try_get("user_id").int_err()?),
            resource: row.try_get("resource").int_err()?,
            hard_limit: row.try_get("hard_limit").int_err()?,
            created_at: row.try_get("created_at").int_err()?,
            updated_at: row.try_get("updated_at").int_err()?,
        })
    }
}

#[async_trait::async_trait]
impl QuotaLimitRepository for SqliteQuotaLimitRepository {
    async fn set_limit(&self, limit: &QuotaLimit) -> Result<(), SetQuotaLimitError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        sqlx::query(
            r#"
            INSERT INTO quota_limits (project_id, user_id, resource, hard_limit, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (project_id, user_id, resource)
                DO UPDATE SET hard_limit = excluded.hard_limit, updated_at = excluded.updated_at
            "#,
        )
        .bind(&limit.project_id)
        .bind(limit.user_id.as_deref().unwrap_or_default())
        .bind(&limit.resource)
        .bind(limit.hard_limit)
        .bind(limit.created_at)
        .bind(limit.updated_at)
        .execute(connection_mut)
        .await
        .int_err()?;

        Ok(())
    }

    async fn get_limit(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<QuotaLimit, GetQuotaLimitError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let maybe_row = sqlx::query(
            r#"
            SELECT project_id, user_id, resource, hard_limit, created_at, updated_at
                FROM quota_limits
                WHERE project_id = $1 AND user_id = $2 AND resource = $3
            "#,
        )
        .bind(&scope.project_id)
        .bind(user_id_column(scope))
        .bind(resource)
        .fetch_optional(connection_mut)
        .await
        .int_err()?;

        match maybe_row {
            Some(row) => Ok(Self::map_limit_row(&row)?),
            None => Err(GetQuotaLimitError::not_found(scope, resource)),
        }
    }

    async fn get_limits(&self, scope: &QuotaScope) -> Result<Vec<QuotaLimit>, GetQuotaLimitsError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let rows = sqlx::query(
            r#"
            SELECT project_id, user_id, resource, hard_limit, created_at, updated_at
                FROM quota_limits
                WHERE project_id = $1 AND user_id = $2
                ORDER BY resource
            "#,
        )
        .bind(&scope.project_id)
        .bind(user_id_column(scope))
        .fetch_all(connection_mut)
        .await
        .int_err()?;

        Ok(rows
            .iter()
            .map(Self::map_limit_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete_limits_by_scope(&self, scope: &QuotaScope) -> Result<u64, DeleteQuotaLimitsError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM quota_limits
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
