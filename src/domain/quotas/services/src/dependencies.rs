// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use dill::CatalogBuilder;

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Registers quota services. The host is expected to provide a
/// `QuotaConfig`, a `QuotaResourceRegistry`, a `SystemTimeSource` and one
/// storage backend with its transaction manager.
pub fn register_dependencies(b: &mut CatalogBuilder) {
    b.add::<QuotaReservationServiceImpl>();
    b.add::<QuotaAdminServiceImpl>();
    b.add::<QuotaLimitServiceImpl>();
    b.add::<ReservationExpiryAgentImpl>();
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
