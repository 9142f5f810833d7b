// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use kamu_quotas::testing::StaticUsageSync;
use kamu_quotas::*;
use pretty_assertions::assert_eq;

use super::quota_harness::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn make_harness() -> QuotaHarness {
    let sync = StaticUsageSync::new();
    QuotaHarness::new(
        QuotaResourceRegistry::new()
            .with_resource(project_resource("cores", &sync))
            .with_resource(project_resource("gpus", &sync))
            .with_resource(user_resource("key_pairs", &sync)),
    )
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_set_limit_validation() {
    let harness = make_harness();
    let scope = QuotaScope::project("p1");

    let res = harness.limit_service.set_limit(&scope, "ram", 10).await;
    assert!(
        matches!(&res, Err(SetLimitError::UnknownResource(e)) if e.resources == ["ram"]),
        "{res:?}"
    );

    let res = harness.limit_service.set_limit(&scope, "cores", -2).await;
    assert!(
        matches!(
            &res,
            Err(SetLimitError::InvalidValue(e)) if e.resource == "cores" && e.value == -2
        ),
        "{res:?}"
    );

    let limit = harness
        .limit_service
        .set_limit(&scope, "cores", UNLIMITED_QUOTA)
        .await
        .unwrap();
    assert!(limit.is_unlimited());

    let limit = harness
        .limit_service
        .set_limit(&scope, "gpus", 0)
        .await
        .unwrap();
    assert_eq!(0, limit.hard_limit);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_set_limit_replaces_previous_value() {
    let harness = make_harness();
    let scope = QuotaScope::project("p1");

    let first = harness
        .limit_service
        .set_limit(&scope, "cores", 10)
        .await
        .unwrap();
    assert_eq!(t0(), first.created_at);

    let later = harness.time_source.advance(Duration::hours(1));
    let second = harness
        .limit_service
        .set_limit(&scope, "cores", 20)
        .await
        .unwrap();

    assert_eq!(
        QuotaLimit {
            project_id: "p1".to_string(),
            user_id: None,
            resource: "cores".to_string(),
            hard_limit: 20,
            created_at: t0(),
            updated_at: later,
        },
        second
    );
    assert_eq!(
        second,
        harness
            .limit_service
            .get_limit(&scope, "cores")
            .await
            .unwrap()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_user_limit_of_project_resource_lands_on_project() {
    let harness = make_harness();
    let user_scope = QuotaScope::user("p1", "u1");

    let limit = harness
        .limit_service
        .set_limit(&user_scope, "cores", 5)
        .await
        .unwrap();
    assert_eq!(QuotaScope::project("p1"), limit.scope());

    assert_eq!(
        5,
        harness
            .limit_service
            .get_limit(&QuotaScope::project("p1"), "cores")
            .await
            .unwrap()
            .hard_limit
    );

    let res = harness.limit_service.get_limit(&user_scope, "cores").await;
    assert!(
        matches!(
            &res,
            Err(GetQuotaLimitError::UserQuotaNotFound(e))
                if e.project_id == "p1" && e.user_id == "u1" && e.resource == "cores"
        ),
        "{res:?}"
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_get_missing_project_limit() {
    let harness = make_harness();

    let res = harness
        .limit_service
        .get_limit(&QuotaScope::project("p1"), "gpus")
        .await;
    assert!(
        matches!(
            &res,
            Err(GetQuotaLimitError::ProjectQuotaNotFound(e))
                if e.project_id == "p1" && e.resource == "gpus"
        ),
        "{res:?}"
    );

    assert!(
        harness
            .limit_service
            .get_limits(&QuotaScope::project("p1"))
            .await
            .unwrap()
            .is_empty()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_effective_limits_drive_reservations() {
    let harness = make_harness();
    let project = QuotaScope::project("p1");
    let user = QuotaScope::user("p1", "u1");

    for (scope, resource, hard_limit) in [
        (&project, "cores", 2),
        (&project, "key_pairs", 10),
        (&user, "key_pairs", 1),
        (&QuotaScope::user("p1", "u2"), "key_pairs", 7),
    ] {
        harness
            .limit_service
            .set_limit(scope, resource, hard_limit)
            .await
            .unwrap();
    }

    let limits = harness
        .limit_service
        .get_effective_limits(&user)
        .await
        .unwrap();
    assert_eq!(
        QuotaLimits {
            project: HashMap::from([("cores".to_string(), 2), ("key_pairs".to_string(), 10)]),
            user: HashMap::from([("key_pairs".to_string(), 1)]),
        },
        limits
    );

    let project_limits = harness
        .limit_service
        .get_effective_limits(&project)
        .await
        .unwrap();
    assert!(project_limits.user.is_empty());

    harness
        .reserve(&user, &[("cores", 2), ("key_pairs", 1)], limits.clone())
        .await
        .unwrap();

    let res = harness
        .reserve(&user, &[("cores", 1), ("key_pairs", 1)], limits)
        .await;
    let Err(ReserveQuotaError::OverQuota(err)) = res else {
        panic!("Expected over quota, got {res:?}");
    };
    assert_eq!(
        vec![(QuotaLevel::Project, 2), (QuotaLevel::User, 1)],
        err.overs
            .iter()
            .map(|o| (o.level, o.limit))
            .collect::<Vec<_>>()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_quota_report() {
    let harness = make_harness();
    let project = QuotaScope::project("p1");
    let user = QuotaScope::user("p1", "u1");

    harness
        .limit_service
        .set_limit(&project, "cores", 8)
        .await
        .unwrap();
    harness
        .limit_service
        .set_limit(&project, "key_pairs", 10)
        .await
        .unwrap();
    harness
        .limit_service
        .set_limit(&user, "key_pairs", 3)
        .await
        .unwrap();

    let ids = harness
        .reserve(&user, &[("cores", 2), ("key_pairs", 1)], QuotaLimits::new())
        .await
        .unwrap();
    harness.reservation_service.commit(&ids[..1]).await.unwrap();

    assert_eq!(
        BTreeMap::from([
            (
                "cores".to_string(),
                QuotaReportEntry {
                    limit: 8,
                    in_use: 2,
                    reserved: 0,
                }
            ),
            (
                "gpus".to_string(),
                QuotaReportEntry {
                    limit: UNLIMITED_QUOTA,
                    in_use: 0,
                    reserved: 0,
                }
            ),
            (
                "key_pairs".to_string(),
                QuotaReportEntry {
                    limit: 3,
                    in_use: 0,
                    reserved: 1,
                }
            ),
        ]),
        harness.limit_service.get_quota_report(&user).await.unwrap()
    );

    let project_report = harness
        .limit_service
        .get_quota_report(&project)
        .await
        .unwrap();
    assert_eq!(10, project_report["key_pairs"].limit);
    assert_eq!(1, project_report["key_pairs"].reserved);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test]
fn test_registry_lookup_through_injected_handle() {
    use dill::*;

    let harness = make_harness();
    let registry = harness
        .catalog
        .get_one::<QuotaResourceRegistry>()
        .unwrap();

    assert_eq!(
        Some(ResourceScope::Project),
        registry.resource("cores").map(|r| r.scope)
    );
    assert!(registry.resource("ram").is_none());
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
