// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod quota_admin_service_impl;
mod quota_limit_service_impl;
mod quota_reservation_service_impl;
mod reservation_expiry_agent_impl;

pub use quota_admin_service_impl::*;
pub use quota_limit_service_impl::*;
pub use quota_reservation_service_impl::*;
pub use reservation_expiry_agent_impl::*;
