// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod quota_config;
mod quota_limit;
mod quota_resource_registry;
mod quota_scope;
mod quota_usage;
mod reservation;

pub use quota_config::*;
pub use quota_limit::*;
pub use quota_resource_registry::*;
pub use quota_scope::*;
pub use quota_usage::*;
pub use reservation::*;
