//! Storage abstraction for contacts.
//!
//! The HTTP layer only talks to [`ContactRepository`]; PostgreSQL and
//! in-memory implementations live in `contacts-db`.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Contact, ContactId, ContactPatch, NewContact, SearchQuery};

/// Repository for per-user contact records.
///
/// Every method reports failures through [`Result`]; a contact that exists
/// for a different user is reported as not found.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Store a new contact for `user_id` and return its fresh identifier.
    async fn create(&self, user_id: &str, contact: NewContact) -> Result<ContactId>;

    /// Fetch one contact.
    async fn read(&self, user_id: &str, id: &str) -> Result<Contact>;

    /// Merge `patch` into an existing contact and return the result.
    async fn update(&self, user_id: &str, id: &str, patch: ContactPatch) -> Result<Contact>;

    /// Remove one contact.
    async fn delete(&self, user_id: &str, id: &str) -> Result<()>;

    /// Remove every contact of `user_id`; returns the number removed.
    async fn clear(&self, user_id: &str) -> Result<u64>;

    /// Remove every contact of every user; returns the number removed.
    async fn clear_all(&self) -> Result<u64>;

    /// Matching contacts ordered by case-insensitive name, windowed by
    /// `query.index` / `query.count`.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Contact>>;
}
