// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::domain::QuotaScope;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

// Project-level records keep an empty user column so that the unique keys
// also cover them
const PROJECT_LEVEL_USER_ID: &str = "";

pub(crate) fn user_id_column(scope: &QuotaScope) -> &str {
    scope.user_id().unwrap_or(PROJECT_LEVEL_USER_ID)
}

pub(crate) fn user_id_from_column(user_id: String) -> Option<String> {
    if user_id == PROJECT_LEVEL_USER_ID {
        None
    } else {
        Some(user_id)
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(e) => e.is_unique_violation(),
        _ => false,
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
