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

async fn create_usages(catalog: &Catalog) -> (QuotaUsage, QuotaUsage, QuotaUsage) {
    let usage_repo = catalog.get_one::<dyn QuotaUsageRepository>().unwrap();

    let cores = usage_repo
        .create_usage(&new_usage(&QuotaScope::project("p1"), "cores"))
        .await
        .unwrap();
    let u1_keys = usage_repo
        .create_usage(&new_usage(&QuotaScope::user("p1", "u1"), "key_pairs"))
        .await
        .unwrap();
    let p2_cores = usage_repo
        .create_usage(&new_usage(&QuotaScope::project("p2"), "cores"))
        .await
        .unwrap();

    (cores, u1_keys, p2_cores)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_create_and_get_reservations(catalog: &Catalog) {
    let reservation_repo = catalog.get_one::<dyn ReservationRepository>().unwrap();

    let (cores, u1_keys, _) = create_usages(catalog).await;

    let r1 = make_reservation(&cores, 4, at(100));
    let r2 = make_reservation(&u1_keys, -1, at(200));
    reservation_repo.create_reservation(&r1).await.unwrap();
    reservation_repo.create_reservation(&r2).await.unwrap();

    let missing = ReservationID::new_generated();
    let mut found = reservation_repo
        .get_reservations_for_update(&[r2.id, missing, r1.id])
        .await
        .unwrap();
    found.sort_by_key(|r| r.expire_at);

    assert_eq!(vec![r1.clone(), r2.clone()], found);

    assert!(
        reservation_repo
            .get_reservations_for_update(&[missing])
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        reservation_repo
            .get_reservations_for_update(&[])
            .await
            .unwrap()
            .is_empty()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_create_duplicate_reservation(catalog: &Catalog) {
    let reservation_repo = catalog.get_one::<dyn ReservationRepository>().unwrap();

    let (cores, _, _) = create_usages(catalog).await;

    let r1 = make_reservation(&cores, 4, at(100));
    reservation_repo.create_reservation(&r1).await.unwrap();

    let res = reservation_repo
        .create_reservation(&Reservation {
            delta: 2,
            ..r1.clone()
        })
        .await;
    assert!(
        matches!(
            res,
            Err(CreateReservationError::Duplicate(ReservationDuplicateError { reservation_id }))
                if reservation_id == r1.id
        ),
        "{res:?}"
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_get_reservations_by_scope(catalog: &Catalog) {
    let reservation_repo = catalog.get_one::<dyn ReservationRepository>().unwrap();

    let (cores, u1_keys, p2_cores) = create_usages(catalog).await;

    let r_cores = make_reservation(&cores, 1, at(100));
    let r_keys = make_reservation(&u1_keys, 1, at(100));
    let r_p2 = make_reservation(&p2_cores, 1, at(100));
    for r in [&r_cores, &r_keys, &r_p2] {
        reservation_repo.create_reservation(r).await.unwrap();
    }

    let ids = |reservations: Vec<Reservation>| {
        let mut ids: Vec<_> = reservations.into_iter().map(|r| r.id).collect();
        ids.sort();
        ids
    };
    let sorted = |mut v: Vec<ReservationID>| {
        v.sort();
        v
    };

    assert_eq!(
        sorted(vec![r_cores.id, r_keys.id]),
        ids(reservation_repo
            .get_reservations_by_scope(&QuotaScope::project("p1"))
            .await
            .unwrap())
    );
    assert_eq!(
        vec![r_keys.id],
        ids(reservation_repo
            .get_reservations_by_scope(&QuotaScope::user("p1", "u1"))
            .await
            .unwrap())
    );
    assert_eq!(
        vec![r_p2.id],
        ids(reservation_repo
            .get_reservations_by_scope(&QuotaScope::project("p2"))
            .await
            .unwrap())
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_list_expired_reservations(catalog: &Catalog) {
    let reservation_repo = catalog.get_one::<dyn ReservationRepository>().unwrap();

    let (cores, u1_keys, p2_cores) = create_usages(catalog).await;

    let r_late = make_reservation(&cores, 1, at(300));
    let r_early = make_reservation(&u1_keys, 1, at(100));
    let r_mid = make_reservation(&p2_cores, 1, at(200));
    let r_future = make_reservation(&cores, 1, at(1000));
    for r in [&r_late, &r_early, &r_mid, &r_future] {
        reservation_repo.create_reservation(r).await.unwrap();
    }

    assert!(
        reservation_repo
            .list_expired_reservation_ids(at(99), 10)
            .await
            .unwrap()
            .is_empty()
    );

    // Expiry moment itself counts as expired
    assert_eq!(
        vec![r_early.id, r_mid.id],
        reservation_repo
            .list_expired_reservation_ids(at(200), 10)
            .await
            .unwrap()
    );
    assert_eq!(
        vec![r_early.id, r_mid.id, r_late.id],
        reservation_repo
            .list_expired_reservation_ids(at(500), 10)
            .await
            .unwrap()
    );
    assert_eq!(
        vec![r_early.id, r_mid.id],
        reservation_repo
            .list_expired_reservation_ids(at(500), 2)
            .await
            .unwrap()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_delete_reservations(catalog: &Catalog) {
    let reservation_repo = catalog.get_one::<dyn ReservationRepository>().unwrap();

    let (cores, u1_keys, p2_cores) = create_usages(catalog).await;

    let r1 = make_reservation(&cores, 1, at(100));
    let r2 = make_reservation(&u1_keys, 1, at(100));
    let r3 = make_reservation(&p2_cores, 1, at(100));
    for r in [&r1, &r2, &r3] {
        reservation_repo.create_reservation(r).await.unwrap();
    }

    let missing = ReservationID::new_generated();
    assert_eq!(
        2,
        reservation_repo
            .delete_reservations(&[r1.id, missing, r3.id])
            .await
            .unwrap()
    );
    assert_eq!(
        0,
        reservation_repo
            .delete_reservations(&[r1.id])
            .await
            .unwrap()
    );
    assert_eq!(0, reservation_repo.delete_reservations(&[]).await.unwrap());

    let remaining = reservation_repo
        .get_reservations_for_update(&[r1.id, r2.id, r3.id])
        .await
        .unwrap();
    assert_eq!(vec![r2], remaining);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_delete_reservations_by_scope(catalog: &Catalog) {
    let reservation_repo = catalog.get_one::<dyn ReservationRepository>().unwrap();

    let (cores, u1_keys, p2_cores) = create_usages(catalog).await;

    for r in [
        make_reservation(&cores, 1, at(100)),
        make_reservation(&cores, 2, at(100)),
        make_reservation(&u1_keys, 1, at(100)),
        make_reservation(&p2_cores, 1, at(100)),
    ] {
        reservation_repo.create_reservation(&r).await.unwrap();
    }

    assert_eq!(
        1,
        reservation_repo
            .delete_reservations_by_scope(&QuotaScope::user("p1", "u1"))
            .await
            .unwrap()
    );
    assert_eq!(
        2,
        reservation_repo
            .delete_reservations_by_scope(&QuotaScope::project("p1"))
            .await
            .unwrap()
    );
    assert_eq!(
        1,
        reservation_repo
            .get_reservations_by_scope(&QuotaScope::project("p2"))
            .await
            .unwrap()
            .len()
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
