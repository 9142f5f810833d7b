// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod limit_checker;
mod retrying_mutator;
mod staleness_policy;
mod usage_store;

pub use limit_checker::*;
pub use retrying_mutator::*;
pub use staleness_policy::*;
pub(crate) use usage_store::*;
