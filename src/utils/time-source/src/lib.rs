// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dill::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Abstracts access to the current time so that services dealing with
/// expirations and refresh ages can be tested deterministically
pub trait SystemTimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct SystemTimeSourceDefault;

#[component(pub)]
#[interface(dyn SystemTimeSource)]
#[scope(Singleton)]
impl SystemTimeSourceDefault {
    pub fn new() -> Self {
        Self
    }
}

impl SystemTimeSource for SystemTimeSourceDefault {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A clock that stays where it was put. Falls back to the real time when
/// nothing was set.
#[derive(Debug, Clone)]
pub struct SystemTimeSourceStub {
    t: Arc<Mutex<Option<DateTime<Utc>>>>,
}

#[component(pub)]
#[interface(dyn SystemTimeSource)]
#[scope(Singleton)]
impl SystemTimeSourceStub {
    pub fn new() -> Self {
        Self {
            t: Arc::new(Mutex::new(None)),
        }
    }

    pub fn new_set(t: DateTime<Utc>) -> Self {
        Self {
            t: Arc::new(Mutex::new(Some(t))),
        }
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.t.lock().unwrap() = Some(t);
    }

    pub fn unset(&self) {
        *self.t.lock().unwrap() = None;
    }

    pub fn advance(&self, duration: chrono::Duration) -> DateTime<Utc> {
        let mut guard = self.t.lock().unwrap();
        let next = guard.unwrap_or_else(Utc::now) + duration;
        *guard = Some(next);
        next
    }
}

impl SystemTimeSource for SystemTimeSourceStub {
    fn now(&self) -> DateTime<Utc> {
        let guard = self.t.lock().unwrap();
        guard.unwrap_or_else(Utc::now)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
