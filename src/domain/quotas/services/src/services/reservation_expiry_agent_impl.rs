// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_utils::BackgroundAgent;
use dill::*;
use internal_error::InternalError;
use kamu_quotas::*;
use time_source::SystemTimeSource;
use tracing::Instrument;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct ReservationExpiryAgentImpl {
    reservation_service: Arc<dyn QuotaReservationService>,
    quota_config: Arc<QuotaConfig>,
    time_source: Arc<dyn SystemTimeSource>,
}

#[component(pub)]
#[interface(dyn ReservationExpiryAgent)]
#[interface(dyn BackgroundAgent)]
#[scope(Singleton)]
impl ReservationExpiryAgentImpl {
    pub fn new(
        reservation_service: Arc<dyn QuotaReservationService>,
        quota_config: Arc<QuotaConfig>,
        time_source: Arc<dyn SystemTimeSource>,
    ) -> Self {
        Self {
            reservation_service,
            quota_config,
            time_source,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl ReservationExpiryAgent for ReservationExpiryAgentImpl {
    async fn sweep(&self) -> Result<ExpireReservationsSummary, ExpireReservationsError> {
        self.reservation_service
            .expire(self.time_source.now())
            .await
    }
}

#[async_trait::async_trait]
impl BackgroundAgent for ReservationExpiryAgentImpl {
    fn agent_name(&self) -> &'static str {
        "dev.kamu.domain.quotas.ReservationExpiryAgent"
    }

    async fn run(&self) -> Result<(), InternalError> {
        let mut interval = tokio::time::interval(self.quota_config.expiry_sweep_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            // A failed sweep leaves the reservations in place for the next tick
            if let Err(err) = self
                .sweep()
                .instrument(tracing::debug_span!("ReservationExpiryAgent::sweep"))
                .await
            {
                tracing::error!(error = ?err, error_msg = %err, "Reservation expiry sweep failed");
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
