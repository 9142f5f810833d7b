// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::{DateTime, Utc};
use database_common::{TransactionRef, TransactionRefT};
use dill::{component, interface};
use internal_error::{ErrorIntoInternal, InternalError, ResultIntoInternal};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::helpers::*;
use crate::domain::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const USAGE_COLUMNS: &str = "id, project_id, user_id, resource, in_use, reserved, until_refresh, \
                             last_refreshed, created_at, updated_at";

pub struct SqliteQuotaUsageRepository {
    transaction: TransactionRefT<sqlx::Sqlite>,
}

#[component(pub)]
#[interface(dyn QuotaUsageRepository)]
impl SqliteQuotaUsageRepository {
    pub fn new(transaction: TransactionRef) -> Self {
        Self {
            transaction: transaction.into(),
        }
    }

    fn map_usage_row(row: &SqliteRow) -> Result<QuotaUsage, InternalError> {
        Ok(QuotaUsage {
            id: row.try_get("id").int_err()?,
            project_id: row.try_get("project_id").int_err()?,
            user_id: user_id_from_column(row.try_get("user_id").int_err()?),
            resource: row.try_get("resource").int_err()?,
            in_use: row.try_get("in_use").int_err()?,
            reserved: row.try_get("reserved").int_err()?,
            until_refresh: row.try_get("until_refresh").int_err()?,
            last_refreshed: row.try_get("last_refreshed").int_err()?,
            created_at: row.try_get("created_at").int_err()?,
            updated_at: row.try_get("updated_at").int_err()?,
        })
    }

    fn map_usage_rows(rows: &[SqliteRow]) -> Result<Vec<QuotaUsage>, InternalError> {
        rows.iter().map(Self::map_usage_row).collect()
    }
}

#[async_trait::async_trait]
impl QuotaUsageRepository for SqliteQuotaUsageRepository {
    async fn get_project_usages_for_update(
        &self,
        project_id: &str,
    ) -> Result<Vec<QuotaUsage>, GetQuotaUsagesError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        // SQLite has no row locks: a no-op write takes the database write lock
        // which is held until the transaction ends
        sqlx::query("UPDATE quota_usages SET id = id WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *connection_mut)
            .await
            .int_err()?;

        let query_str = format!(
            "SELECT {USAGE_COLUMNS} FROM quota_usages WHERE project_id = $1 ORDER BY id"
        );
        let rows = sqlx::query(&query_str)
            .bind(project_id)
            .fetch_all(&mut *connection_mut)
            .await
            .int_err()?;

        Ok(Self::map_usage_rows(&rows)?)
    }

    async fn get_usages(&self, scope: &QuotaScope) -> Result<Vec<QuotaUsage>, GetQuotaUsagesError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        // A user sees its own rows next to the project-level ones
        let query_str = format!(
            r#"
            SELECT {USAGE_COLUMNS} FROM quota_usages
                WHERE project_id = $1 AND ($2 IS NULL OR user_id IN ('', $2))
                ORDER BY id
            "#
        );
        let rows = sqlx::query(&query_str)
            .bind(&scope.project_id)
            .bind(scope.user_id())
            .fetch_all(&mut *connection_mut)
            .await
            .int_err()?;

        Ok(Self::map_usage_rows(&rows)?)
    }

    async fn find_usage(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<Option<QuotaUsage>, GetQuotaUsagesError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let query_str = format!(
            r#"
            SELECT {USAGE_COLUMNS} FROM quota_usages
                WHERE project_id = $1 AND user_id = $2 AND resource = $3
            "#
        );
        let maybe_row = sqlx::query(&query_str)
            .bind(&scope.project_id)
            .bind(user_id_column(scope))
            .bind(resource)
            .fetch_optional(&mut *connection_mut)
            .await
            .int_err()?;

        Ok(maybe_row.as_ref().map(Self::map_usage_row).transpose()?)
    }

    async fn create_usage(&self, usage: &NewQuotaUsage) -> Result<QuotaUsage, CreateQuotaUsageError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO quota_usages (project_id, user_id, resource, in_use, reserved, until_refresh, created_at, updated_at)
                VALUES ($1, $2, $3, 0, 0, $4, $5, $6)
            "#,
        )
        .bind(&usage.scope.project_id)
        .bind(user_id_column(&usage.scope))
        .bind(&usage.resource)
        .bind(usage.until_refresh)
        .bind(usage.created_at)
        .bind(usage.created_at)
        .execute(&mut *connection_mut)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CreateQuotaUsageError::Duplicate(QuotaUsageDuplicateError {
                    scope: usage.scope.clone(),
                    resource: usage.resource.clone(),
                })
            } else {
                CreateQuotaUsageError::Internal(e.int_err())
            }
        })?;

        Ok(QuotaUsage {
            id: result.last_insert_rowid(),
            project_id: usage.scope.project_id.clone(),
            user_id: usage.scope.user_id.clone(),
            resource: usage.resource.clone(),
            in_use: 0,
            reserved: 0,
            until_refresh: usage.until_refresh,
            last_refreshed: None,
            created_at: usage.created_at,
            updated_at: usage.created_at,
        })
    }

    async fn update_usage(&self, usage: &QuotaUsage) -> Result<(), UpdateQuotaUsageError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let result = sqlx::query(
            r#"
            UPDATE quota_usages
                SET in_use = $1, reserved = $2, until_refresh = $3, last_refreshed = $4, updated_at = $5
                WHERE id = $6
            "#,
        )
        .bind(usage.in_use)
        .bind(usage.reserved)
        .bind(usage.until_refresh)
        .bind(usage.last_refreshed)
        .bind(usage.updated_at)
        .bind(usage.id)
        .execute(&mut *connection_mut)
        .await
        .int_err()?;

        if result.rows_affected() == 0 {
            return Err(UpdateQuotaUsageError::NotFound(QuotaUsageRowNotFoundError {
                usage_id: usage.id,
            }));
        }

        Ok(())
    }

    async fn apply_usage_delta(
        &self,
        usage_id: QuotaUsageID,
        in_use_delta: i64,
        reserved_delta: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), UpdateQuotaUsageError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let result = sqlx::query(
            r#"
            UPDATE quota_usages
                SET in_use = in_use + $1, reserved = reserved + $2, updated_at = $3
                WHERE id = $4
            "#,
        )
        .bind(in_use_delta)
        .bind(reserved_delta)
        .bind(updated_at)
        .bind(usage_id)
        .execute(&mut *connection_mut)
        .await
        .int_err()?;

        if result.rows_affected() == 0 {
            return Err(UpdateQuotaUsageError::NotFound(QuotaUsageRowNotFoundError {
                usage_id,
            }));
        }

        Ok(())
    }

    async fn delete_usages_by_scope(&self, scope: &QuotaScope) -> Result<u64, DeleteQuotaUsagesError> {
        let mut tr = self.transaction.lock().await;

        let connection_mut = tr.connection_mut().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM quota_usages
                WHERE project_id = $1 AND ($2 IS NULL OR user_id = $2)
            "#,
        )
        .bind(&scope.project_id)
        .bind(scope.user_id())
        .execute(&mut *connection_mut)
        .await
        .int_err()?;

        Ok(result.rows_affected())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
