// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod quota_limit_repository;
mod quota_usage_repository;
mod reservation_repository;

pub use quota_limit_repository::*;
pub use quota_usage_repository::*;
pub use reservation_repository::*;
