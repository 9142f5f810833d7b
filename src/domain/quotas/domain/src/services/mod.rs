// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod quota_admin_service;
mod quota_errors;
mod quota_limit_service;
mod quota_reservation_service;

pub use quota_admin_service::*;
pub use quota_errors::*;
pub use quota_limit_service::*;
pub use quota_reservation_service::*;
