// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use database_common_macros::database_transactional_test;
use dill::{Catalog, CatalogBuilder};
use kamu_quotas_inmem::InMemoryQuotaRepository;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_no_usages_initially,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_create_and_find_usage,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_create_duplicate_usage,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_get_usages_by_scope,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_update_usage_and_apply_delta,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_update_missing_usage,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_delete_usages_by_scope,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_create_and_get_reservations,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_create_duplicate_reservation,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_get_reservations_by_scope,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_list_expired_reservations,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_delete_reservations,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_delete_reservations_by_scope,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_get_missing_limit,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_set_and_get_limit,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_get_limits_by_level,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

database_transactional_test!(
    storage = inmem,
    fixture = kamu_quotas_repo_tests::test_delete_limits_by_scope,
    harness = InMemoryQuotaRepositoryHarness
);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct InMemoryQuotaRepositoryHarness {
    catalog: Catalog,
}

impl InMemoryQuotaRepositoryHarness {
    pub fn new() -> Self {
        let mut catalog_builder = CatalogBuilder::new();
        catalog_builder.add::<InMemoryQuotaRepository>();

        Self {
            catalog: catalog_builder.build(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
