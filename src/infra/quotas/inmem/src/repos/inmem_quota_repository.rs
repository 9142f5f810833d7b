// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dill::*;

use crate::domain::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Keeps usages, reservations and limits of all projects in one state so
/// that a transaction can snapshot and restore them together
pub struct InMemoryQuotaRepository {
    state: Arc<Mutex<State>>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Default, Clone)]
pub(crate) struct State {
    last_usage_id: QuotaUsageID,
    usages_by_id: BTreeMap<QuotaUsageID, QuotaUsage>,
    reservations_by_id: HashMap<ReservationID, Reservation>,
    limits_by_key: BTreeMap<(QuotaScope, String), QuotaLimit>,
}

impl State {
    fn project_usages<'a>(&'a self, project_id: &'a str) -> impl Iterator<Item = &'a QuotaUsage> {
        self.usages_by_id
            .values()
            .filter(move |u| u.project_id == project_id)
    }

    fn find_usage(&self, scope: &QuotaScope, resource: &str) -> Option<&QuotaUsage> {
        self.usages_by_id.values().find(|u| {
            u.project_id == scope.project_id && u.user_id == scope.user_id && u.resource == resource
        })
    }
}

/// Project scope covers everything in the project, user scope only the
/// records of that user
fn covered_by_scope(scope: &QuotaScope, project_id: &str, user_id: Option<&String>) -> bool {
    if scope.project_id != project_id {
        return false;
    }

    match &scope.user_id {
        None => true,
        Some(scope_user_id) => user_id == Some(scope_user_id),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[component(pub)]
#[interface(dyn QuotaUsageRepository)]
#[interface(dyn ReservationRepository)]
#[interface(dyn QuotaLimitRepository)]
#[scope(Singleton)]
impl InMemoryQuotaRepository {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub(crate) fn snapshot(&self) -> State {
        self.state.lock().unwrap().clone()
    }

    pub(crate) fn restore(&self, snapshot: State) {
        *self.state.lock().unwrap() = snapshot;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl QuotaUsageRepository for InMemoryQuotaRepository {
    async fn get_project_usages_for_update(
        &self,
        project_id: &str,
    ) -> Result<Vec<QuotaUsage>, GetQuotaUsagesError> {
        let guard = self.state.lock().unwrap();
        Ok(guard.project_usages(project_id).cloned().collect())
    }

    async fn get_usages(&self, scope: &QuotaScope) -> Result<Vec<QuotaUsage>, GetQuotaUsagesError> {
        let guard = self.state.lock().unwrap();

        let usages = guard
            .project_usages(&scope.project_id)
            .filter(|u| match &scope.user_id {
                None => true,
                Some(user_id) => u.user_id.is_none() || u.user_id.as_ref() == Some(user_id),
            })
            .cloned()
            .collect();

        Ok(usages)
    }

    async fn find_usage(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<Option<QuotaUsage>, GetQuotaUsagesError> {
        let guard = self.state.lock().unwrap();
        Ok(guard.find_usage(scope, resource).cloned())
    }

    async fn create_usage(&self, usage: &NewQuotaUsage) -> Result<QuotaUsage, CreateQuotaUsageError> {
        let mut guard = self.state.lock().unwrap();

        if guard.find_usage(&usage.scope, &usage.resource).is_some() {
            return Err(CreateQuotaUsageError::Duplicate(QuotaUsageDuplicateError {
                scope: usage.scope.clone(),
                resource: usage.resource.clone(),
            }));
        }

        guard.last_usage_id += 1;
        let created = QuotaUsage {
            id: guard.last_usage_id,
            project_id: usage.scope.project_id.clone(),
            user_id: usage.scope.user_id.clone(),
            resource: usage.resource.clone(),
            in_use: 0,
            reserved: 0,
            until_refresh: usage.until_refresh,
            last_refreshed: None,
            created_at: usage.created_at,
            updated_at: usage.created_at,
        };
        guard.usages_by_id.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update_usage(&self, usage: &QuotaUsage) -> Result<(), UpdateQuotaUsageError> {
        let mut guard = self.state.lock().unwrap();

        let Some(existing) = guard.usages_by_id.get_mut(&usage.id) else {
            return Err(UpdateQuotaUsageError::NotFound(QuotaUsageRowNotFoundError {
                usage_id: usage.id,
            }));
        };

        existing.in_use = usage.in_use;
        existing.reserved = usage.reserved;
        existing.until_refresh = usage.until_refresh;
        existing.last_refreshed = usage.last_refreshed;
        existing.updated_at = usage.updated_at;

        Ok(())
    }

    async fn apply_usage_delta(
        &self,
        usage_id: QuotaUsageID,
        in_use_delta: i64,
        reserved_delta: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), UpdateQuotaUsageError> {
        let mut guard = self.state.lock().unwrap();

        let Some(existing) = guard.usages_by_id.get_mut(&usage_id) else {
            return Err(UpdateQuotaUsageError::NotFound(QuotaUsageRowNotFoundError {
                usage_id,
            }));
        };

        existing.in_use = existing.in_use.saturating_add(in_use_delta);
        existing.reserved = existing.reserved.saturating_add(reserved_delta);
        existing.updated_at = updated_at;

        Ok(())
    }

    async fn delete_usages_by_scope(&self, scope: &QuotaScope) -> Result<u64, DeleteQuotaUsagesError> {
        let mut guard = self.state.lock().unwrap();

        let doomed: Vec<QuotaUsageID> = guard
            .usages_by_id
            .values()
            .filter(|u| covered_by_scope(scope, &u.project_id, u.user_id.as_ref()))
            .map(|u| u.id)
            .collect();

        for usage_id in &doomed {
            guard.usages_by_id.remove(usage_id);
        }
        // Reservations cannot outlive their usage row
        guard
            .reservations_by_id
            .retain(|_, r| !doomed.contains(&r.usage_id));

        Ok(doomed.len() as u64)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl ReservationRepository for InMemoryQuotaRepository {
    async fn create_reservation(&self, reservation: &Reservation) -> Result<(), CreateReservationError> {
        let mut guard = self.state.lock().unwrap();

        if guard.reservations_by_id.contains_key(&reservation.id) {
            return Err(CreateReservationError::Duplicate(ReservationDuplicateError {
                reservation_id: reservation.id,
            }));
        }

        guard
            .reservations_by_id
            .insert(reservation.id, reservation.clone());

        Ok(())
    }

    async fn get_reservations_for_update(
        &self,
        ids: &[ReservationID],
    ) -> Result<Vec<Reservation>, GetReservationsError> {
        let guard = self.state.lock().unwrap();

        let reservations = ids
            .iter()
            .filter_map(|id| guard.reservations_by_id.get(id))
            .cloned()
            .collect();

        Ok(reservations)
    }

    async fn get_reservations_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<Vec<Reservation>, GetReservationsError> {
        let guard = self.state.lock().unwrap();

        let mut reservations: Vec<_> = guard
            .reservations_by_id
            .values()
            .filter(|r| covered_by_scope(scope, &r.project_id, r.user_id.as_ref()))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(reservations)
    }

    async fn list_expired_reservation_ids(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReservationID>, GetReservationsError> {
        let guard = self.state.lock().unwrap();

        let mut expired: Vec<_> = guard
            .reservations_by_id
            .values()
            .filter(|r| r.is_expired(now))
            .collect();
        expired.sort_by(|a, b| a.expire_at.cmp(&b.expire_at).then(a.id.cmp(&b.id)));

        Ok(expired.into_iter().take(limit).map(|r| r.id).collect())
    }

    async fn delete_reservations(&self, ids: &[ReservationID]) -> Result<u64, DeleteReservationsError> {
        let mut guard = self.state.lock().unwrap();

        let deleted = ids
            .iter()
            .filter(|id| guard.reservations_by_id.remove(*id).is_some())
            .count();

        Ok(deleted as u64)
    }

    async fn delete_reservations_by_scope(
        &self,
        scope: &QuotaScope,
    ) -> Result<u64, DeleteReservationsError> {
        let mut guard = self.state.lock().unwrap();

        let before = guard.reservations_by_id.len();
        guard
            .reservations_by_id
            .retain(|_, r| !covered_by_scope(scope, &r.project_id, r.user_id.as_ref()));

        Ok((before - guard.reservations_by_id.len()) as u64)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl QuotaLimitRepository for InMemoryQuotaRepository {
    async fn set_limit(&self, limit: &QuotaLimit) -> Result<(), SetQuotaLimitError> {
        let mut guard = self.state.lock().unwrap();

        guard
            .limits_by_key
            .insert((limit.scope(), limit.resource.clone()), limit.clone());

        Ok(())
    }

    async fn get_limit(
        &self,
        scope: &QuotaScope,
        resource: &str,
    ) -> Result<QuotaLimit, GetQuotaLimitError> {
        let guard = self.state.lock().unwrap();

        guard
            .limits_by_key
            .get(&(scope.clone(), resource.to_string()))
            .cloned()
            .ok_or_else(|| GetQuotaLimitError::not_found(scope, resource))
    }

    async fn get_limits(&self, scope: &QuotaScope) -> Result<Vec<QuotaLimit>, GetQuotaLimitsError> {
        let guard = self.state.lock().unwrap();

        let limits = guard
            .limits_by_key
            .iter()
            .filter(|((limit_scope, _), _)| limit_scope == scope)
            .map(|(_, limit)| limit.clone())
            .collect();

        Ok(limits)
    }

    async fn delete_limits_by_scope(&self, scope: &QuotaScope) -> Result<u64, DeleteQuotaLimitsError> {
        let mut guard = self.state.lock().unwrap();

        let before = guard.limits_by_key.len();
        guard
            .limits_by_key
            .retain(|(limit_scope, _), _| {
                !covered_by_scope(scope, &limit_scope.project_id, limit_scope.user_id.as_ref())
            });

        Ok((before - guard.limits_by_key.len()) as u64)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
