// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use internal_error::InternalError;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A long-running loop owned by the hosting process (API server, worker).
/// Implementations must only return on a fatal error.
#[async_trait::async_trait]
pub trait BackgroundAgent: Send + Sync {
    fn agent_name(&self) -> &'static str;

    async fn run(&self) -> Result<(), InternalError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
