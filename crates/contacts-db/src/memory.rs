//! In-memory [`ContactRepository`] for tests and `memory:` connection strings.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`; the derived prefix and email
//! sets are kept next to each contact so search behaves exactly like the
//! PostgreSQL backend.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use contacts_core::{
    check_contact_address, compose_contact_id, name_prefixes, name_sort_key, reject_nul, Contact,
    ContactId, ContactPatch, ContactRepository, Error, NewContact, Result, SearchQuery,
    USER_ID_FIELD,
};

struct StoredContact {
    contact: Contact,
    name_key: String,
    name_prefixes: BTreeSet<String>,
    email_keys: Vec<String>,
}

impl StoredContact {
    fn new(contact: Contact) -> Self {
        Self {
            name_key: name_sort_key(&contact.name),
            name_prefixes: name_prefixes(&contact.name),
            email_keys: contact.email_keys(),
            contact,
        }
    }

    fn matches(&self, query: &SearchQuery, prefix_key: Option<&str>, email_key: Option<&str>) -> bool {
        if self.contact.user_id != query.user_id {
            return false;
        }
        if let Some(id) = &query.id {
            if self.contact.id.as_str() != id {
                return false;
            }
        }
        if let Some(key) = prefix_key {
            if !self.name_prefixes.contains(key) {
                return false;
            }
        }
        if let Some(key) = email_key {
            if !self.email_keys.iter().any(|k| k == key) {
                return false;
            }
        }
        true
    }
}

/// In-memory contact store.
pub struct InMemoryContactRepository {
    contacts: RwLock<HashMap<ContactId, StoredContact>>,
    sequence: AtomicU64,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self {
            contacts: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, HashMap<ContactId, StoredContact>>> {
        self.contacts
            .read()
            .map_err(|_| Error::Internal("contact store lock poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, HashMap<ContactId, StoredContact>>> {
        self.contacts
            .write()
            .map_err(|_| Error::Internal("contact store lock poisoned".to_string()))
    }

    fn next_id(&self) -> ContactId {
        compose_contact_id(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Default for InMemoryContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up `id` and make sure it belongs to `user_id`.
fn owned_by<'a>(
    contacts: &'a HashMap<ContactId, StoredContact>,
    user_id: &str,
    id: &str,
) -> Option<&'a StoredContact> {
    contacts
        .get(&ContactId::from(id))
        .filter(|stored| stored.contact.user_id == user_id)
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn create(&self, user_id: &str, new: NewContact) -> Result<ContactId> {
        reject_nul(USER_ID_FIELD, user_id)?;
        new.validate()?;
        let id = self.next_id();
        let contact = Contact::from_new(id.clone(), user_id, new);
        self.write_lock()?
            .insert(id.clone(), StoredContact::new(contact));

        info!(
            subsystem = "database",
            component = "memory_store",
            op = "create",
            user_id = %user_id,
            contact_id = %id,
            "Contact created"
        );
        Ok(id)
    }

    async fn read(&self, user_id: &str, id: &str) -> Result<Contact> {
        check_contact_address(user_id, id)?;
        let contacts = self.read_lock()?;
        owned_by(&contacts, user_id, id)
            .map(|stored| stored.contact.clone())
            .ok_or_else(|| Error::contact_not_found(user_id, id))
    }

    async fn update(&self, user_id: &str, id: &str, patch: ContactPatch) -> Result<Contact> {
        check_contact_address(user_id, id)?;
        patch.validate()?;
        let mut contacts = self.write_lock()?;
        let stored = contacts
            .get_mut(&ContactId::from(id))
            .filter(|stored| stored.contact.user_id == user_id)
            .ok_or_else(|| Error::contact_not_found(user_id, id))?;

        if patch.is_empty() {
            return Ok(stored.contact.clone());
        }
        let mut contact = stored.contact.clone();
        contact.apply(patch);
        *stored = StoredContact::new(contact);

        debug!(
            subsystem = "database",
            component = "memory_store",
            op = "update",
            user_id = %user_id,
            contact_id = %id,
            "Contact updated"
        );
        Ok(stored.contact.clone())
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        check_contact_address(user_id, id)?;
        let mut contacts = self.write_lock()?;
        if owned_by(&contacts, user_id, id).is_none() {
            return Err(Error::contact_not_found(user_id, id));
        }
        contacts.remove(&ContactId::from(id));
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<u64> {
        reject_nul(USER_ID_FIELD, user_id)?;
        let mut contacts = self.write_lock()?;
        let before = contacts.len();
        contacts.retain(|_, stored| stored.contact.user_id != user_id);
        Ok((before - contacts.len()) as u64)
    }

    async fn clear_all(&self) -> Result<u64> {
        let mut contacts = self.write_lock()?;
        let removed = contacts.len() as u64;
        contacts.clear();
        Ok(removed)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Contact>> {
        query.validate()?;
        let prefix_key = query.prefix_key();
        let email_key = query.email_key();
        let contacts = self.read_lock()?;

        let mut matches: Vec<&StoredContact> = contacts
            .values()
            .filter(|stored| stored.matches(query, prefix_key.as_deref(), email_key.as_deref()))
            .collect();
        matches.sort_by(|a, b| {
            a.name_key
                .cmp(&b.name_key)
                .then_with(|| a.contact.id.cmp(&b.contact.id))
        });

        let skip = usize::try_from(query.index).unwrap_or(usize::MAX);
        let take = usize::try_from(query.count).unwrap_or(usize::MAX);
        let page: Vec<Contact> = matches
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|stored| stored.contact.clone())
            .collect();

        debug!(
            subsystem = "database",
            component = "memory_store",
            op = "search",
            user_id = %query.user_id,
            result_count = page.len(),
            "Contact search complete"
        );
        Ok(page)
    }
}
