// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::time::Duration;

use dill::{Catalog, CatalogBuilder};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// How long a connection waits on a locked database before failing with
/// `SQLITE_BUSY`
pub const DEFAULT_SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wires SQLite-backed transactions into a catalog
pub struct SqlitePlugin;

impl SqlitePlugin {
    pub fn init_database_components(catalog_builder: &mut CatalogBuilder) {
        catalog_builder.add::<SqliteTransactionManager>();
    }

    /// Chains a catalog owning a pool for `connection_string` on top of
    /// `base_catalog`
    pub fn catalog_with_connected_pool(
        base_catalog: &Catalog,
        connection_string: &str,
        busy_timeout: Duration,
    ) -> Result<Catalog, DatabaseError> {
        let sqlite_pool = Self::open_sqlite_pool(connection_string, busy_timeout)?;

        Ok(CatalogBuilder::new_chained(base_catalog)
            .add_value(sqlite_pool)
            .build())
    }

    /// Usage rows cascade into reservations, so foreign keys are always on.
    /// Connections are established on first use.
    #[tracing::instrument(level = "info", skip_all, fields(busy_timeout = ?busy_timeout))]
    pub fn open_sqlite_pool(
        connection_string: &str,
        busy_timeout: Duration,
    ) -> Result<SqlitePool, DatabaseError> {
        let options: SqliteConnectOptions = connection_string.parse()?;

        Ok(SqlitePoolOptions::new().connect_lazy_with(
            options
                .foreign_keys(true)
                .busy_timeout(busy_timeout),
        ))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
