// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;
use std::sync::Arc;

use internal_error::InternalError;

use crate::{QuotaScope, ResourceScope};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Source of truth for the consumption of a resource, used to correct drift
/// in the tracked counters
#[cfg_attr(any(feature = "testing", test), mockall::automock)]
#[async_trait::async_trait]
pub trait QuotaUsageSync: Send + Sync {
    async fn sync_usage(&self, scope: &QuotaScope) -> Result<i64, InternalError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone)]
pub struct ReservableResource {
    pub name: String,
    pub scope: ResourceScope,
    pub sync: Arc<dyn QuotaUsageSync>,
    /// Whether an operator may force a refresh of this resource at any time
    pub reentrant: bool,
}

impl ReservableResource {
    pub fn new(
        name: impl Into<String>,
        scope: ResourceScope,
        sync: Arc<dyn QuotaUsageSync>,
    ) -> Self {
        Self {
            name: name.into(),
            scope,
            sync,
            reentrant: true,
        }
    }

    pub fn non_reentrant(mut self) -> Self {
        self.reentrant = false;
        self
    }
}

impl std::fmt::Debug for ReservableResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservableResource")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("reentrant", &self.reentrant)
            .finish_non_exhaustive()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Resources known to the quota engine. Built once at startup and registered
/// in the catalog as a value.
#[derive(Debug, Default, Clone)]
pub struct QuotaResourceRegistry {
    resources: BTreeMap<String, ReservableResource>,
}

impl QuotaResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: ReservableResource) -> Self {
        self.register(resource);
        self
    }

    pub fn register(&mut self, resource: ReservableResource) {
        self.resources.insert(resource.name.clone(), resource);
    }

    pub fn resource(&self, name: &str) -> Option<&ReservableResource> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReservableResource> {
        self.resources.values()
    }

    /// Names of the given resources that are not registered, in input order
    pub fn unknown_names<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect()
    }

    pub fn reentrant_names(&self) -> Vec<String> {
        self.iter()
            .filter(|r| r.reentrant)
            .map(|r| r.name.clone())
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
