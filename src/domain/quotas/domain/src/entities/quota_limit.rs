// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::QuotaScope;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Limit value meaning "no cap"
pub const UNLIMITED_QUOTA: i64 = -1;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Hard limit of a resource for a project, or for a user within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimit {
    pub project_id: String,
    pub user_id: Option<String>,
    pub resource: String,
    pub hard_limit: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuotaLimit {
    pub fn scope(&self) -> QuotaScope {
        QuotaScope {
            project_id: self.project_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.hard_limit == UNLIMITED_QUOTA
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Limits consumed by a single reservation. A resource missing from a map is
/// unconstrained at that level.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub project: HashMap<String, i64>,
    pub user: HashMap<String, i64>,
}

impl QuotaLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_limit(mut self, resource: impl Into<String>, limit: i64) -> Self {
        self.project.insert(resource.into(), limit);
        self
    }

    pub fn with_user_limit(mut self, resource: impl Into<String>, limit: i64) -> Self {
        self.user.insert(resource.into(), limit);
        self
    }

    pub fn project_limit(&self, resource: &str) -> i64 {
        self.project
            .get(resource)
            .copied()
            .unwrap_or(UNLIMITED_QUOTA)
    }

    pub fn user_limit(&self, resource: &str) -> i64 {
        self.user.get(resource).copied().unwrap_or(UNLIMITED_QUOTA)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
