// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Identifies whose quota a counter or a limit belongs to: a whole project,
/// or a single user within a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuotaScope {
    pub project_id: String,
    pub user_id: Option<String>,
}

impl QuotaScope {
    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: None,
        }
    }

    pub fn user(project_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: Some(user_id.into()),
        }
    }

    /// The enclosing project-wide scope
    pub fn project_level(&self) -> Self {
        Self::project(self.project_id.clone())
    }

    /// Narrows the scope to the level a resource is accounted at. Project
    /// scoped resources never carry a user.
    pub fn for_resource_scope(&self, resource_scope: ResourceScope) -> Self {
        match resource_scope {
            ResourceScope::Project => self.project_level(),
            ResourceScope::User => self.clone(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_project_level(&self) -> bool {
        self.user_id.is_none()
    }
}

impl Display for QuotaScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.user_id {
            Some(user_id) => write!(f, "project '{}', user '{user_id}'", self.project_id),
            None => write!(f, "project '{}'", self.project_id),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Level at which usage of a resource is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ResourceScope {
    Project,
    User,
}

impl Display for ResourceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceScope::Project => write!(f, "project"),
            ResourceScope::User => write!(f, "user"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////


////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
