//! In-memory doubles for the engine's external seams: the two REST
//! services, the publisher, the org directory, and the token loader.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use lfx_sync_adapters::{AdapterError, CommitteeApi, Created, Fetched, OrgDirectory, ProjectApi, Publisher};
use lfx_sync_auth::{AuthError, CacheLoader, Identity, TokenKey, TokenMinter};
use lfx_sync_engine::SyncContext;
use lfx_sync_engine::handlers::{HandlerDeps, MemoryObjectReader};
use lfx_sync_mappings::{MappingStore, MemoryMappingBackend};
use lfx_sync_types::{ChangeEvent, KvOperation, Payload};

pub struct StubTokens;

#[async_trait]
impl CacheLoader<TokenKey, String> for StubTokens {
    async fn load(&self, key: &TokenKey) -> Result<String, AuthError> {
        Ok(format!("token-for-{}", key.audience))
    }
}

pub struct StubOrgs;

#[async_trait]
impl OrgDirectory for StubOrgs {
    async fn org_name(&self, org_id: &str) -> Option<String> {
        (org_id == "ORG1").then(|| "Example Org".to_string())
    }
}

/// Records every published envelope.
#[derive(Default)]
pub struct RecordingPublisher {
    pub messages: Mutex<Vec<(String, Value)>>,
}

impl RecordingPublisher {
    pub fn on_subject(&self, subject: &str) -> Vec<Value> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == subject)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_json(&self, subject: &str, value: &Value) -> Result<(), AdapterError> {
        self.messages
            .lock()
            .unwrap()
            .push((subject.to_string(), value.clone()));
        Ok(())
    }
}

/// An in-memory entity store shared by both fake services.
#[derive(Default)]
struct EntityStore {
    entities: Mutex<HashMap<String, (Value, u32)>>,
    next_uid: AtomicU32,
}

impl EntityStore {
    fn create(&self, prefix: &str, body: &Value) -> Created {
        let uid = format!("{prefix}{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        self.entities
            .lock()
            .unwrap()
            .insert(uid.clone(), (body.clone(), 1));
        Created {
            uid: uid.clone(),
            etag: Some("1".to_string()),
        }
    }

    fn get(&self, uid: &str) -> Result<Fetched, AdapterError> {
        self.entities
            .lock()
            .unwrap()
            .get(uid)
            .map(|(body, revision)| Fetched {
                body: body.clone(),
                etag: revision.to_string(),
            })
            .ok_or(AdapterError::Logical {
                status: 404,
                body: "not found".to_string(),
            })
    }

    fn update(&self, uid: &str, etag: &str, body: &Value) -> Result<(), AdapterError> {
        let mut entities = self.entities.lock().unwrap();
        let Some((current, revision)) = entities.get_mut(uid) else {
            return Err(AdapterError::Logical {
                status: 404,
                body: "not found".to_string(),
            });
        };
        if etag != revision.to_string() {
            return Err(AdapterError::PreconditionFailed);
        }
        *current = body.clone();
        *revision += 1;
        Ok(())
    }

    fn delete(&self, uid: &str) -> Result<(), AdapterError> {
        self.entities
            .lock()
            .unwrap()
            .remove(uid)
            .map(|_| ())
            .ok_or(AdapterError::Logical {
                status: 404,
                body: "not found".to_string(),
            })
    }
}

/// Fake v2 project service. `fail_updates_with_conflict` injects entity
/// tag conflicts for the next N update calls.
#[derive(Default)]
pub struct FakeProjects {
    store: EntityStore,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_updates_with_conflict: AtomicUsize,
}

impl FakeProjects {
    pub fn current(&self, uid: &str) -> Option<Value> {
        self.store
            .entities
            .lock()
            .unwrap()
            .get(uid)
            .map(|(body, _)| body.clone())
    }

    /// Mutates the stored body to simulate a concurrent writer (bumps the
    /// entity tag).
    pub fn concurrent_write(&self, uid: &str, body: Value) {
        let mut entities = self.store.entities.lock().unwrap();
        if let Some((current, revision)) = entities.get_mut(uid) {
            *current = body;
            *revision += 1;
        }
    }
}

#[async_trait]
impl ProjectApi for FakeProjects {
    async fn create(&self, _token: &str, body: &Value) -> Result<Created, AdapterError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.create("U", body))
    }

    async fn get(&self, _token: &str, uid: &str) -> Result<Fetched, AdapterError> {
        self.store.get(uid)
    }

    async fn update(
        &self,
        _token: &str,
        uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError> {
        if self
            .fail_updates_with_conflict
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AdapterError::PreconditionFailed);
        }
        self.store.update(uid, etag, body)?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, _token: &str, uid: &str, _etag: Option<&str>) -> Result<(), AdapterError> {
        self.store.delete(uid)?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fake v2 committee service: committees and members share the entity
/// store, members keyed by `{committee}/{member}`.
#[derive(Default)]
pub struct FakeCommittees {
    committees: EntityStore,
    members: EntityStore,
    pub committee_creates: AtomicUsize,
    pub member_creates: AtomicUsize,
    pub member_updates: AtomicUsize,
    pub member_deletes: AtomicUsize,
}

fn member_key(committee_uid: &str, member_uid: &str) -> String {
    format!("{committee_uid}/{member_uid}")
}

#[async_trait]
impl CommitteeApi for FakeCommittees {
    async fn create_committee(&self, _token: &str, body: &Value) -> Result<Created, AdapterError> {
        self.committee_creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.committees.create("UC", body))
    }

    async fn get_committee(&self, _token: &str, uid: &str) -> Result<Fetched, AdapterError> {
        self.committees.get(uid)
    }

    async fn update_committee(
        &self,
        _token: &str,
        uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError> {
        self.committees.update(uid, etag, body)
    }

    async fn delete_committee(
        &self,
        _token: &str,
        uid: &str,
        _etag: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.committees.delete(uid)
    }

    async fn create_member(
        &self,
        _token: &str,
        committee_uid: &str,
        body: &Value,
    ) -> Result<Created, AdapterError> {
        self.member_creates.fetch_add(1, Ordering::SeqCst);
        let created = self.members.create("UM", body);
        // re-key under the composite path
        let mut entities = self.members.entities.lock().unwrap();
        let entry = entities.remove(&created.uid).expect("just created");
        entities.insert(member_key(committee_uid, &created.uid), entry);
        Ok(created)
    }

    async fn get_member(
        &self,
        _token: &str,
        committee_uid: &str,
        member_uid: &str,
    ) -> Result<Fetched, AdapterError> {
        self.members.get(&member_key(committee_uid, member_uid))
    }

    async fn update_member(
        &self,
        _token: &str,
        committee_uid: &str,
        member_uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError> {
        self.members
            .update(&member_key(committee_uid, member_uid), etag, body)?;
        self.member_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_member(
        &self,
        _token: &str,
        committee_uid: &str,
        member_uid: &str,
        _etag: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.members.delete(&member_key(committee_uid, member_uid))?;
        self.member_deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The assembled test world.
pub struct World {
    pub deps: Arc<HandlerDeps>,
    pub mappings: MappingStore,
    pub backend: Arc<MemoryMappingBackend>,
    pub objects: Arc<MemoryObjectReader>,
    pub projects: Arc<FakeProjects>,
    pub committees: Arc<FakeCommittees>,
    pub publisher: Arc<RecordingPublisher>,
}

pub fn world() -> World {
    let backend = Arc::new(MemoryMappingBackend::new());
    let mappings = MappingStore::new(backend.clone());
    let objects = Arc::new(MemoryObjectReader::new());
    let projects = Arc::new(FakeProjects::default());
    let committees = Arc::new(FakeCommittees::default());
    let publisher = Arc::new(RecordingPublisher::default());

    let deps = Arc::new(HandlerDeps {
        mappings: mappings.clone(),
        objects: objects.clone(),
        projects: projects.clone(),
        committees: committees.clone(),
        publisher: publisher.clone(),
        orgs: Arc::new(StubOrgs),
        tokens: Arc::new(TokenMinter::with_loader(Arc::new(StubTokens))),
        audiences: BTreeMap::from([
            ("project-service".to_string(), "https://projects.example/".to_string()),
            ("committee-service".to_string(), "https://committees.example/".to_string()),
            ("indexer".to_string(), "https://indexer.example/".to_string()),
        ]),
    });

    World {
        deps,
        mappings,
        backend,
        objects,
        projects,
        committees,
        publisher,
    }
}

pub fn ctx() -> SyncContext {
    SyncContext::new(Identity::service_fallback("lfx-sync"), 1, 1)
}

pub fn ctx_attempt(attempt: u64) -> SyncContext {
    SyncContext::new(Identity::service_fallback("lfx-sync"), 1, attempt)
}

pub fn put_event(key: &str, payload: serde_json::Value) -> (ChangeEvent, Payload) {
    let payload = Payload::from_object(payload.as_object().expect("object payload").clone());
    let event = ChangeEvent {
        key: key.to_string(),
        operation: KvOperation::Put,
        sequence: 1,
        delivery_attempt: 1,
        payload: Some(payload.clone()),
    };
    (event, payload)
}

pub fn delete_event(key: &str) -> ChangeEvent {
    ChangeEvent {
        key: key.to_string(),
        operation: KvOperation::Delete,
        sequence: 2,
        delivery_attempt: 1,
        payload: None,
    }
}
