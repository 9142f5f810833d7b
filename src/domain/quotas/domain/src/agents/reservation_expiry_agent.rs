// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_utils::BackgroundAgent;

use crate::ExpireReservationsError;
use crate::ExpireReservationsSummary;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Periodically reaps reservations whose holders never resolved them
#[async_trait::async_trait]
pub trait ReservationExpiryAgent: BackgroundAgent {
    /// Performs a single sweep at the current time
    async fn sweep(&self) -> Result<ExpireReservationsSummary, ExpireReservationsError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
