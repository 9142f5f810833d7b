// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use dill::Catalog;
use kamu_quotas::*;
use pretty_assertions::assert_eq;

use crate::helpers::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_get_missing_limit(catalog: &Catalog) {
    let limit_repo = catalog.get_one::<dyn QuotaLimitRepository>().unwrap();

    let res = limit_repo
        .get_limit(&QuotaScope::project("p1"), "cores")
        .await;
    assert!(
        matches!(
            &res,
            Err(GetQuotaLimitError::ProjectQuotaNotFound(e))
                if e.project_id == "p1" && e.resource == "cores"
        ),
        "{res:?}"
    );

    let res = limit_repo
        .get_limit(&QuotaScope::user("p1", "u1"), "key_pairs")
        .await;
    assert!(
        matches!(
            &res,
            Err(GetQuotaLimitError::UserQuotaNotFound(e))
                if e.user_id == "u1" && e.resource == "key_pairs"
        ),
        "{res:?}"
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_set_and_get_limit(catalog: &Catalog) {
    let limit_repo = catalog.get_one::<dyn QuotaLimitRepository>().unwrap();

    let p1 = QuotaScope::project("p1");
    let p1_u1 = QuotaScope::user("p1", "u1");

    limit_repo.set_limit(&make_limit(&p1, "cores", 10)).await.unwrap();
    limit_repo
        .set_limit(&make_limit(&p1_u1, "key_pairs", 2))
        .await
        .unwrap();

    assert_eq!(
        make_limit(&p1, "cores", 10),
        limit_repo.get_limit(&p1, "cores").await.unwrap()
    );
    assert_eq!(
        make_limit(&p1_u1, "key_pairs", 2),
        limit_repo.get_limit(&p1_u1, "key_pairs").await.unwrap()
    );

    // Upsert replaces the value in place
    let replaced = QuotaLimit {
        hard_limit: UNLIMITED_QUOTA,
        updated_at: at(60),
        ..make_limit(&p1, "cores", 10)
    };
    limit_repo.set_limit(&replaced).await.unwrap();

    let found = limit_repo.get_limit(&p1, "cores").await.unwrap();
    assert!(found.is_unlimited());
    assert_eq!(replaced, found);

    assert_eq!(1, limit_repo.get_limits(&p1).await.unwrap().len());
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_get_limits_by_level(catalog: &Catalog) {
    let limit_repo = catalog.get_one::<dyn QuotaLimitRepository>().unwrap();

    let p1 = QuotaScope::project("p1");
    let p1_u1 = QuotaScope::user("p1", "u1");
    let p1_u2 = QuotaScope::user("p1", "u2");

    for limit in [
        make_limit(&p1, "cores", 10),
        make_limit(&p1, "ram", 512),
        make_limit(&p1_u1, "key_pairs", 2),
        make_limit(&p1_u2, "key_pairs", 3),
        make_limit(&QuotaScope::project("p2"), "cores", 1),
    ] {
        limit_repo.set_limit(&limit).await.unwrap();
    }

    let mut project_limits = limit_repo.get_limits(&p1).await.unwrap();
    project_limits.sort_by(|a, b| a.resource.cmp(&b.resource));
    assert_eq!(
        vec![make_limit(&p1, "cores", 10), make_limit(&p1, "ram", 512)],
        project_limits
    );

    assert_eq!(
        vec![make_limit(&p1_u2, "key_pairs", 3)],
        limit_repo.get_limits(&p1_u2).await.unwrap()
    );
    assert!(
        limit_repo
            .get_limits(&QuotaScope::user("p1", "u3"))
            .await
            .unwrap()
            .is_empty()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_delete_limits_by_scope(catalog: &Catalog) {
    let limit_repo = catalog.get_one::<dyn QuotaLimitRepository>().unwrap();

    let p1 = QuotaScope::project("p1");
    let p1_u1 = QuotaScope::user("p1", "u1");
    let p1_u2 = QuotaScope::user("p1", "u2");
    let p2 = QuotaScope::project("p2");

    for limit in [
        make_limit(&p1, "cores", 10),
        make_limit(&p1_u1, "key_pairs", 2),
        make_limit(&p1_u2, "key_pairs", 3),
        make_limit(&p2, "cores", 1),
    ] {
        limit_repo.set_limit(&limit).await.unwrap();
    }

    assert_eq!(1, limit_repo.delete_limits_by_scope(&p1_u1).await.unwrap());
    assert!(limit_repo.get_limits(&p1_u1).await.unwrap().is_empty());
    assert_eq!(1, limit_repo.get_limits(&p1_u2).await.unwrap().len());

    // Project scope also takes the remaining user limits
    assert_eq!(2, limit_repo.delete_limits_by_scope(&p1).await.unwrap());
    assert!(limit_repo.get_limits(&p1_u2).await.unwrap().is_empty());
    assert!(limit_repo.get_limits(&p1).await.unwrap().is_empty());

    assert_eq!(1, limit_repo.get_limits(&p2).await.unwrap().len());
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
