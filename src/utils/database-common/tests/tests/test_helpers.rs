// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use database_common::sqlite_generate_placeholders_list;
use pretty_assertions::assert_eq;
use sqlx::sqlite::SqlitePoolOptions;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_placeholders_list_shape() {
    assert_eq!("", sqlite_generate_placeholders_list(0, 1));
    assert_eq!("$1", sqlite_generate_placeholders_list(1, 1));
    assert_eq!("$1,$2,$3", sqlite_generate_placeholders_list(3, 1));
    assert_eq!("$4,$5", sqlite_generate_placeholders_list(2, 4));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_placeholders_bind_after_leading_parameter() {
    let sqlite_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("CREATE TABLE reservations (id TEXT NOT NULL, project_id TEXT NOT NULL)")
        .execute(&sqlite_pool)
        .await
        .unwrap();
    for (id, project_id) in [("r1", "p1"), ("r2", "p1"), ("r3", "p1"), ("r4", "p2")] {
        sqlx::query("INSERT INTO reservations (id, project_id) VALUES ($1, $2)")
            .bind(id)
            .bind(project_id)
            .execute(&sqlite_pool)
            .await
            .unwrap();
    }

    let ids = ["r1", "r3", "r4"];
    let query_str = format!(
        "SELECT id FROM reservations WHERE project_id = $1 AND id IN ({}) ORDER BY id",
        sqlite_generate_placeholders_list(ids.len(), 2)
    );

    let mut query = sqlx::query_scalar::<_, String>(&query_str).bind("p1");
    for id in ids {
        query = query.bind(id);
    }

    assert_eq!(
        vec!["r1".to_string(), "r3".to_string()],
        query.fetch_all(&sqlite_pool).await.unwrap()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
