// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! In-memory API double shared by the unit tests.
//!
//! [`FakeApi`] stores objects by name and enforces `resourceVersion`
//! preconditions like the API server does. Conflicts can be scripted to model a
//! concurrent writer: each scripted conflict bumps the stored version, so the
//! next read observes version N+1.

use crate::resources::ObjectApi;
use async_trait::async_trait;
use kube::Resource;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Build an API error the way the API server reports it.
pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(Box::new(kube::core::Status {
        status: Some(kube::core::response::StatusSummary::Failure),
        message: format!("{reason} error"),
        reason: reason.to_string(),
        code,
        metadata: None,
        details: None,
    }))
}

/// Calls observed by a [`FakeApi`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub gets: u32,
    pub creates: u32,
    pub replaces: u32,
}

struct State<K> {
    objects: BTreeMap<String, K>,
    versions_seen: Vec<String>,
    scripted_conflicts: u32,
    next_version: u64,
    calls: Calls,
}

pub struct FakeApi<K> {
    state: Mutex<State<K>>,
}

impl<K> FakeApi<K>
where
    K: Resource<DynamicType = ()> + Clone,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                objects: BTreeMap::new(),
                versions_seen: Vec::new(),
                scripted_conflicts: 0,
                next_version: 1,
                calls: Calls::default(),
            }),
        }
    }

    /// Start with `object` stored at resourceVersion "1".
    pub fn with_object(object: K) -> Self {
        let api = Self::new();
        api.insert(object);
        api
    }

    fn insert(&self, mut object: K) {
        let mut state = self.state.lock().unwrap();
        let version = state.next_version;
        state.next_version += 1;
        object.meta_mut().resource_version = Some(version.to_string());
        let name = object.meta().name.clone().unwrap_or_default();
        state.objects.insert(name, object);
    }

    /// Reject the next `n` replaces with a conflict, as if another writer
    /// updated the object just before each of them.
    pub fn conflict_next_replaces(&self, n: u32) {
        self.state.lock().unwrap().scripted_conflicts = n;
    }

    pub fn stored(&self, name: &str) -> Option<K> {
        self.state.lock().unwrap().objects.get(name).cloned()
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    /// resourceVersions returned by successive gets.
    pub fn versions_seen(&self) -> Vec<String> {
        self.state.lock().unwrap().versions_seen.clone()
    }
}

#[async_trait]
impl<K> ObjectApi<K> for FakeApi<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> Result<K, kube::Error> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.calls.gets += 1;
        let object = state
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound"))?;
        let version = object.meta().resource_version.clone().unwrap_or_default();
        state.versions_seen.push(version);
        Ok(object)
    }

    async fn create(&self, object: &K) -> Result<K, kube::Error> {
        let name = object.meta().name.clone().unwrap_or_default();
        {
            let mut state = self.state.lock().unwrap();
            state.calls.creates += 1;
            if state.objects.contains_key(&name) {
                return Err(api_error(409, "AlreadyExists"));
            }
        }
        self.insert(object.clone());
        Ok(self.stored(&name).unwrap())
    }

    async fn replace(&self, name: &str, object: &K) -> Result<K, kube::Error> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.calls.replaces += 1;

        let next_version = state.next_version;
        let stored = state
            .objects
            .get_mut(name)
            .ok_or_else(|| api_error(404, "NotFound"))?;

        if state.scripted_conflicts > 0 {
            // concurrent writer bumps the stored version
            stored.meta_mut().resource_version = Some(next_version.to_string());
            state.scripted_conflicts -= 1;
            state.next_version += 1;
            return Err(api_error(409, "Conflict"));
        }

        if stored.meta().resource_version != object.meta().resource_version {
            return Err(api_error(409, "Conflict"));
        }

        let mut updated = object.clone();
        updated.meta_mut().resource_version = Some(next_version.to_string());
        *stored = updated.clone();
        state.next_version += 1;
        Ok(updated)
    }
}
