//! In-memory stores for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::{ContactStore, EventFilter, EventStore};
use crate::models::contact::{EmergencyContact, UserIdentity};
use crate::models::sos_event::{NewSosEvent, SosEvent, SosStatus};

#[derive(Default)]
pub struct MemoryContactStore {
    users: Mutex<HashMap<Uuid, UserIdentity>>,
    contacts: Mutex<Vec<EmergencyContact>>,
    pub fail: AtomicBool,
}

impl MemoryContactStore {
    pub fn add_user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            id,
            UserIdentity {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_contact(&self, user_id: Uuid, name: &str, phone: &str, verified: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.contacts.lock().unwrap().push(EmergencyContact {
            id,
            user_id,
            name: name.to_string(),
            phone: phone.to_string(),
            relationship: "Friend".to_string(),
            verified,
            created_at: Utc::now(),
        });
        id
    }

    pub fn rename_contact(&self, id: Uuid, name: &str) {
        for c in self.contacts.lock().unwrap().iter_mut() {
            if c.id == id {
                c.name = name.to_string();
            }
        }
    }

    pub fn remove_contact(&self, id: Uuid) {
        self.contacts.lock().unwrap().retain(|c| c.id != id);
    }

    pub fn is_verified(&self, user_id: Uuid, phone: &str) -> bool {
        self.contacts
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.user_id == user_id && c.phone == phone && c.verified)
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn verified_contacts(&self, user_id: Uuid) -> Result<Vec<EmergencyContact>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id && c.verified)
            .cloned()
            .collect())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserIdentity>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn mark_verified(&self, user_id: Uuid, phone: &str) -> Result<u64> {
        let mut changed = 0;
        for c in self.contacts.lock().unwrap().iter_mut() {
            if c.user_id == user_id && c.phone == phone && !c.verified {
                c.verified = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<SosEvent>>,
    pub fail: AtomicBool,
}

impl MemoryEventStore {
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn backdate(&self, id: Uuid, created_at: DateTime<Utc>) {
        for e in self.events.lock().unwrap().iter_mut() {
            if e.id == id {
                e.created_at = created_at;
            }
        }
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewSosEvent) -> Result<Uuid> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("database unavailable"));
        }
        let id = Uuid::new_v4();
        self.events.lock().unwrap().push(SosEvent {
            id,
            user_id: event.user_id,
            kind: event.kind,
            latitude: event.latitude,
            longitude: event.longitude,
            address: event.address,
            contacts_notified: event.contacts_notified,
            contacts: event.contacts,
            status: SosStatus::Active,
            notes: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn find(&self, id: Uuid) -> Result<Option<SosEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<SosEvent>> {
        let mut events: Vec<SosEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.user_id.map_or(true, |u| e.user_id == u))
            .filter(|e| filter.start.map_or(true, |s| e.created_at >= s))
            .filter(|e| filter.end.map_or(true, |s| e.created_at <= s))
            .cloned()
            .collect();
        events.reverse();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(filter.effective_limit() as usize);
        Ok(events)
    }

    async fn close(&self, id: Uuid, status: SosStatus, notes: Option<String>) -> Result<bool> {
        let mut events = self.events.lock().unwrap();
        match events.iter_mut().find(|e| e.id == id) {
            Some(e) if e.status == SosStatus::Active => {
                e.status = status;
                if notes.is_some() {
                    e.notes = notes;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let events = self.events.lock().unwrap();
        Ok(events.iter().filter(|e| e.created_at >= since).count() as i64)
    }

    async fn active_users_since(&self, since: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut users: Vec<Uuid> = Vec::new();
        for e in self.events.lock().unwrap().iter() {
            if e.created_at >= since && !users.contains(&e.user_id) {
                users.push(e.user_id);
            }
        }
        Ok(users)
    }
}
