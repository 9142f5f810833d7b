// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

// Re-exports
pub use kamu_quotas as domain;

mod inmem_quota_transaction_manager;
mod repos;

pub use inmem_quota_transaction_manager::*;
pub use repos::*;
