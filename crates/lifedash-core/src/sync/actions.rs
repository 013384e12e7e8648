//! Fetch and mutation actions for one domain
//!
//! A fetch replaces the domain's collection wholesale with the normalized
//! server list. Create, update and delete bring the collection back into
//! agreement with the server according to the domain's [`MutationPolicy`]:
//! `LocalPatch` applies the server's answer in place, `Refetch` reissues the
//! last fetch.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ListFilters};
use crate::domain::{Domain, MutationPolicy};
use crate::envelope::{decode_list, decode_record};
use crate::error::{ApiError, ApiResult};
use crate::models::{Draft, EntityId};
use crate::session::SessionManager;
use crate::store::{Collection, EntityStore, Stored};

/// Actions for the collection of `T`
pub struct SyncActions<T> {
    api: Arc<ApiClient>,
    store: Arc<EntityStore>,
    session: Arc<SessionManager>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for SyncActions<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            store: self.store.clone(),
            session: self.session.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Stored> SyncActions<T> {
    pub(crate) fn new(
        api: Arc<ApiClient>,
        store: Arc<EntityStore>,
        session: Arc<SessionManager>,
    ) -> Self {
        Self {
            api,
            store,
            session,
            _entity: PhantomData,
        }
    }

    pub fn domain(&self) -> Domain {
        T::DOMAIN
    }

    pub fn snapshot(&self) -> Collection<T> {
        self.store.collection::<T>()
    }

    pub fn subscribe(&self) -> watch::Receiver<Collection<T>> {
        self.store.subscribe::<T>()
    }

    /// Fetch the list and replace the collection with it.
    ///
    /// Returns `Cancelled` when a newer fetch superseded this one; the
    /// collection then reflects the newer fetch. Records created, updated or
    /// deleted while this fetch was pending are kept in its result.
    pub async fn fetch(&self, filters: ListFilters) -> ApiResult<Vec<T>> {
        let slot = self.store.slot::<T>();
        let ticket = slot.begin_fetch(filters.clone());
        debug!(domain = %T::DOMAIN, seq = ticket.seq(), "Fetching collection");

        let result = self
            .api
            .get(T::DOMAIN.path(), &filters.to_query(), ticket.cancel_token())
            .await
            .and_then(|body| decode_list::<T>(T::DOMAIN, body));

        if let Err(ref e) = result {
            if e.is_auth() {
                self.session.handle_auth_failure(e).await;
                return Err(e.clone());
            }
        }

        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        if !slot.finish_fetch(&ticket, result) {
            return Err(ApiError::Cancelled);
        }
        if let Err(ref e) = outcome {
            warn!(domain = %T::DOMAIN, error = %e, "Fetch failed");
        }
        outcome.map(|()| slot.snapshot().items)
    }

    /// Reissue the most recent fetch with the same filters
    pub async fn refetch(&self) -> ApiResult<Vec<T>> {
        let filters = self.store.slot::<T>().last_filters();
        self.fetch(filters).await
    }

    pub async fn create(&self, draft: &T::Draft) -> ApiResult<T> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(ApiError::validation(missing));
        }

        let body = self.guard(self.api.post(T::DOMAIN.path(), draft).await).await?;
        let record = self.reconcile(body).await?;
        info!(domain = %T::DOMAIN, id = %record.id(), "Created");
        Ok(record)
    }

    /// Apply a partial update; unset draft fields are left untouched
    pub async fn update(&self, id: &EntityId, changes: &T::Draft) -> ApiResult<T> {
        let is_empty = serde_json::to_value(changes)
            .map(|v| v.as_object().map_or(false, |fields| fields.is_empty()))
            .unwrap_or(false);
        if is_empty {
            return Err(ApiError::validation(["changes"]));
        }

        let body = self
            .guard(self.api.patch(&T::DOMAIN.record_path(id), changes).await)
            .await?;
        let record = self.reconcile(body).await?;
        debug!(domain = %T::DOMAIN, %id, "Updated");
        Ok(record)
    }

    /// Delete a record. A record the server no longer has counts as deleted.
    pub async fn delete(&self, id: &EntityId) -> ApiResult<()> {
        match self
            .guard(self.api.delete(&T::DOMAIN.record_path(id)).await)
            .await
        {
            Ok(_) => {}
            Err(ApiError::Http { status: 404, .. }) => {
                debug!(domain = %T::DOMAIN, %id, "Already gone on the server");
            }
            Err(e) => return Err(e),
        }

        match T::DOMAIN.mutation_policy() {
            MutationPolicy::LocalPatch => self.store.slot::<T>().remove(id),
            MutationPolicy::Refetch => self.refetch_after_mutation().await,
        }
        info!(domain = %T::DOMAIN, %id, "Deleted");
        Ok(())
    }

    /// Route auth failures through the session manager
    async fn guard<V>(&self, result: ApiResult<V>) -> ApiResult<V> {
        if let Err(ref e) = result {
            if e.is_auth() {
                self.session.handle_auth_failure(e).await;
            }
        }
        result
    }

    /// Bring the collection in line with a create/update answer
    async fn reconcile(&self, body: serde_json::Value) -> ApiResult<T> {
        let record = decode_record::<T>(T::DOMAIN, body);
        match (T::DOMAIN.mutation_policy(), record) {
            (MutationPolicy::LocalPatch, Ok(record)) => {
                self.store.slot::<T>().upsert(record.clone());
                Ok(record)
            }
            (_, record) => {
                // The write went through even when the answer is unreadable
                self.refetch_after_mutation().await;
                record
            }
        }
    }

    async fn refetch_after_mutation(&self) {
        match self.refetch().await {
            Ok(_) | Err(ApiError::Cancelled) => {}
            Err(e) => warn!(domain = %T::DOMAIN, error = %e, "Refetch after mutation failed"),
        }
    }
}
