// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod helpers;
mod quota_limit_repository_test_suite;
mod quota_usage_repository_test_suite;
mod reservation_repository_test_suite;

pub use quota_limit_repository_test_suite::*;
pub use quota_usage_repository_test_suite::*;
pub use reservation_repository_test_suite::*;
