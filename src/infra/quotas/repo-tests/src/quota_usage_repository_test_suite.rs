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

pub async fn test_no_usages_initially(catalog: &Catalog) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let scope = QuotaScope::project("p1");

    assert!(usage_repo.get_usages(&scope).await.unwrap().is_empty());
    assert!(
        usage_repo
            .get_project_usages_for_update("p1")
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        usage_repo
            .find_usage(&scope, "cores")
            .await
            .unwrap()
            .is_none()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_create_and_find_usage(catalog: &Catalog) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let project_scope = QuotaScope::project("p1");
    let user_scope = QuotaScope::user("p1", "u1");

    let project_cores = usage_repo
        .create_usage(&NewQuotaUsage {
            until_refresh: Some(5),
            ..new_usage(&project_scope, "cores")
        })
        .await
        .unwrap();
    let user_keys = usage_repo
        .create_usage(&new_usage(&user_scope, "key_pairs"))
        .await
        .unwrap();

    assert_ne!(project_cores.id, user_keys.id);
    assert_eq!(
        QuotaUsage {
            id: project_cores.id,
            project_id: "p1".to_string(),
            user_id: None,
            resource: "cores".to_string(),
            in_use: 0,
            reserved: 0,
            until_refresh: Some(5),
            last_refreshed: None,
            created_at: t0(),
            updated_at: t0(),
        },
        project_cores
    );
    assert_eq!(Some("u1"), user_keys.user_id.as_deref());

    let found = usage_repo
        .find_usage(&project_scope, "cores")
        .await
        .unwrap();
    assert_eq!(Some(project_cores), found);

    let found = usage_repo
        .find_usage(&user_scope, "key_pairs")
        .await
        .unwrap();
    assert_eq!(Some(user_keys), found);

    // Lookup is exact on the user level
    assert!(
        usage_repo
            .find_usage(&project_scope, "key_pairs")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        usage_repo
            .find_usage(&user_scope, "cores")
            .await
            .unwrap()
            .is_none()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_create_duplicate_usage(catalog: &Catalog) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let scope = QuotaScope::user("p1", "u1");

    usage_repo
        .create_usage(&new_usage(&scope, "key_pairs"))
        .await
        .unwrap();

    let res = usage_repo
        .create_usage(&new_usage(&scope, "key_pairs"))
        .await;
    assert!(
        matches!(
            &res,
            Err(CreateQuotaUsageError::Duplicate(QuotaUsageDuplicateError { scope: s, resource }))
                if *s == scope && resource == "key_pairs"
        ),
        "{res:?}"
    );

    // Same resource for another user or the project is a different row
    usage_repo
        .create_usage(&new_usage(&QuotaScope::user("p1", "u2"), "key_pairs"))
        .await
        .unwrap();
    usage_repo
        .create_usage(&new_usage(&QuotaScope::project("p1"), "key_pairs"))
        .await
        .unwrap();

    let res = usage_repo
        .create_usage(&new_usage(&QuotaScope::project("p1"), "key_pairs"))
        .await;
    assert!(
        matches!(res, Err(CreateQuotaUsageError::Duplicate(_))),
        "{res:?}"
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_get_usages_by_scope(catalog: &Catalog) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let p1 = QuotaScope::project("p1");
    let p1_u1 = QuotaScope::user("p1", "u1");
    let p1_u2 = QuotaScope::user("p1", "u2");
    let p2 = QuotaScope::project("p2");

    let cores = usage_repo.create_usage(&new_usage(&p1, "cores")).await.unwrap();
    let u1_keys = usage_repo
        .create_usage(&new_usage(&p1_u1, "key_pairs"))
        .await
        .unwrap();
    let u2_keys = usage_repo
        .create_usage(&new_usage(&p1_u2, "key_pairs"))
        .await
        .unwrap();
    let p2_cores = usage_repo.create_usage(&new_usage(&p2, "cores")).await.unwrap();

    let ids = |usages: Vec<QuotaUsage>| {
        let mut ids: Vec<_> = usages.into_iter().map(|u| u.id).collect();
        ids.sort_unstable();
        ids
    };

    assert_eq!(
        vec![cores.id, u1_keys.id, u2_keys.id],
        ids(usage_repo.get_usages(&p1).await.unwrap())
    );
    assert_eq!(
        vec![cores.id, u1_keys.id],
        ids(usage_repo.get_usages(&p1_u1).await.unwrap())
    );
    assert_eq!(
        vec![cores.id, u2_keys.id],
        ids(usage_repo.get_usages(&p1_u2).await.unwrap())
    );
    assert_eq!(
        vec![p2_cores.id],
        ids(usage_repo.get_usages(&p2).await.unwrap())
    );
    assert_eq!(
        vec![cores.id, u1_keys.id, u2_keys.id],
        ids(usage_repo.get_project_usages_for_update("p1").await.unwrap())
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_update_usage_and_apply_delta(catalog: &Catalog) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let scope = QuotaScope::project("p1");
    let created = usage_repo
        .create_usage(&new_usage(&scope, "cores"))
        .await
        .unwrap();

    let refreshed = QuotaUsage {
        in_use: 7,
        until_refresh: Some(3),
        last_refreshed: Some(at(10)),
        updated_at: at(10),
        ..created.clone()
    };
    usage_repo.update_usage(&refreshed).await.unwrap();

    usage_repo
        .apply_usage_delta(created.id, 0, 4, at(20))
        .await
        .unwrap();
    usage_repo
        .apply_usage_delta(created.id, -2, -4, at(30))
        .await
        .unwrap();

    let found = usage_repo
        .find_usage(&scope, "cores")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        QuotaUsage {
            in_use: 5,
            reserved: 0,
            updated_at: at(30),
            ..refreshed
        },
        found
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_update_missing_usage(catalog: &Catalog) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let scope = QuotaScope::project("p1");
    let created = usage_repo
        .create_usage(&new_usage(&scope, "cores"))
        .await
        .unwrap();
    let missing_id = created.id + 100;

    let res = usage_repo
        .update_usage(&QuotaUsage {
            id: missing_id,
            ..created
        })
        .await;
    assert!(
        matches!(
            res,
            Err(UpdateQuotaUsageError::NotFound(QuotaUsageRowNotFoundError { usage_id }))
                if usage_id == missing_id
        ),
        "{res:?}"
    );

    let res = usage_repo.apply_usage_delta(missing_id, 1, 1, at(1)).await;
    assert!(
        matches!(res, Err(UpdateQuotaUsageError::NotFound(_))),
        "{res:?}"
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_delete_usages_by_scope(catalog: &Catalog) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let p1 = QuotaScope::project("p1");
    let p1_u1 = QuotaScope::user("p1", "u1");
    let p1_u2 = QuotaScope::user("p1", "u2");
    let p2 = QuotaScope::project("p2");

    usage_repo.create_usage(&new_usage(&p1, "cores")).await.unwrap();
    usage_repo
        .create_usage(&new_usage(&p1_u1, "key_pairs"))
        .await
        .unwrap();
    usage_repo
        .create_usage(&new_usage(&p1_u2, "key_pairs"))
        .await
        .unwrap();
    usage_repo.create_usage(&new_usage(&p2, "cores")).await.unwrap();

    assert_eq!(1, usage_repo.delete_usages_by_scope(&p1_u1).await.unwrap());
    assert_eq!(2, usage_repo.get_usages(&p1).await.unwrap().len());

    assert_eq!(2, usage_repo.delete_usages_by_scope(&p1).await.unwrap());
    assert!(usage_repo.get_usages(&p1).await.unwrap().is_empty());
    assert_eq!(0, usage_repo.delete_usages_by_scope(&p1).await.unwrap());

    assert_eq!(1, usage_repo.get_usages(&p2).await.unwrap().len());
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
