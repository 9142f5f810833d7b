// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use internal_error::InternalError;

use crate::{QuotaScope, QuotaUsageSync};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Sync source reporting preset usage per scope, zero when nothing was set.
/// Counts the calls it serves.
#[derive(Debug, Default, Clone)]
pub struct StaticUsageSync {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    usages: HashMap<QuotaScope, i64>,
    calls: usize,
}

impl StaticUsageSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usage(self, scope: QuotaScope, in_use: i64) -> Self {
        self.set_usage(scope, in_use);
        self
    }

    pub fn set_usage(&self, scope: QuotaScope, in_use: i64) {
        let mut state = self.state.lock().unwrap();
        state.usages.insert(scope, in_use);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

#[async_trait::async_trait]
impl QuotaUsageSync for StaticUsageSync {
    async fn sync_usage(&self, scope: &QuotaScope) -> Result<i64, InternalError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state.usages.get(scope).copied().unwrap_or_default())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
