//! PostgreSQL contact repository.
//!
//! Contacts live in the `contact` table. Known fields get their own columns,
//! everything else the caller sent is kept in the `extra` JSONB column. The
//! derived `name_prefixes` and `email_keys` arrays are GIN-indexed and back
//! the prefix and email filters.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use contacts_core::{
    check_contact_address, compose_contact_id, name_prefixes, name_sort_key, reject_nul, Contact,
    ContactId, ContactPatch, ContactRepository, Error, NewContact, Result, SearchQuery,
    USER_ID_FIELD,
};

/// Name of the counter row used for contact identifiers.
const CONTACT_SEQUENCE: &str = "contact";

const CONTACT_COLUMNS: &str = "id, user_id, name, emails, extra";

/// PostgreSQL implementation of [`ContactRepository`].
#[derive(Clone)]
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    /// Create a new PgContactRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomically bump the identifier counter and compose a fresh id.
    async fn next_id(&self) -> Result<ContactId> {
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO contact_id_sequence (name, value)
            VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE SET value = contact_id_sequence.value + 1
            RETURNING value
            "#,
        )
        .bind(CONTACT_SEQUENCE)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let sequence = u64::try_from(sequence)
            .map_err(|_| Error::Storage(format!("negative contact sequence {}", sequence)))?;
        Ok(compose_contact_id(sequence))
    }
}

/// Build a [`Contact`] from a row selected with [`CONTACT_COLUMNS`].
fn contact_from_row(row: &PgRow) -> Result<Contact> {
    let extra = match row.try_get::<JsonValue, _>("extra")? {
        JsonValue::Object(map) => map,
        JsonValue::Null => serde_json::Map::new(),
        other => {
            return Err(Error::Serialization(format!(
                "contact extra fields must be an object, found {}",
                other
            )))
        }
    };

    Ok(Contact {
        id: ContactId::new(row.try_get::<String, _>("id")?),
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        emails: row.try_get("emails")?,
        extra,
    })
}

/// Clamp an unsigned window value into a SQL `BIGINT`.
fn sql_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn create(&self, user_id: &str, new: NewContact) -> Result<ContactId> {
        reject_nul(USER_ID_FIELD, user_id)?;
        new.validate()?;
        let id = self.next_id().await?;
        let contact = Contact::from_new(id.clone(), user_id, new);
        let prefixes: Vec<String> = name_prefixes(&contact.name).into_iter().collect();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO contact (id, user_id, name, name_key, emails, email_keys, name_prefixes, extra, created_at_utc, updated_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(contact.id.as_str())
        .bind(&contact.user_id)
        .bind(&contact.name)
        .bind(name_sort_key(&contact.name))
        .bind(&contact.emails)
        .bind(contact.email_keys())
        .bind(&prefixes)
        .bind(JsonValue::Object(contact.extra.clone()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "contacts",
            op = "create",
            user_id = %user_id,
            contact_id = %id,
            prefix_count = prefixes.len(),
            "Contact created"
        );
        Ok(id)
    }

    async fn read(&self, user_id: &str, id: &str) -> Result<Contact> {
        check_contact_address(user_id, id)?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM contact WHERE user_id = $1 AND id = $2",
            CONTACT_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => contact_from_row(&row),
            None => Err(Error::contact_not_found(user_id, id)),
        }
    }

    async fn update(&self, user_id: &str, id: &str, patch: ContactPatch) -> Result<Contact> {
        check_contact_address(user_id, id)?;
        patch.validate()?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM contact WHERE user_id = $1 AND id = $2 FOR UPDATE",
            CONTACT_COLUMNS
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::contact_not_found(user_id, id))?;

        let mut contact = contact_from_row(&row)?;
        if patch.is_empty() {
            return Ok(contact);
        }
        let name_changed = contact.apply(patch);
        let prefixes: Vec<String> = name_prefixes(&contact.name).into_iter().collect();

        sqlx::query(
            r#"
            UPDATE contact
            SET name = $3, name_key = $4, emails = $5, email_keys = $6,
                name_prefixes = $7, extra = $8, updated_at_utc = $9
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .bind(&contact.name)
        .bind(name_sort_key(&contact.name))
        .bind(&contact.emails)
        .bind(contact.email_keys())
        .bind(&prefixes)
        .bind(JsonValue::Object(contact.extra.clone()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "contacts",
            op = "update",
            user_id = %user_id,
            contact_id = %id,
            name_changed,
            "Contact updated"
        );
        Ok(contact)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        check_contact_address(user_id, id)?;
        let result = sqlx::query("DELETE FROM contact WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::contact_not_found(user_id, id));
        }

        info!(
            subsystem = "database",
            component = "contacts",
            op = "delete",
            user_id = %user_id,
            contact_id = %id,
            "Contact deleted"
        );
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<u64> {
        reject_nul(USER_ID_FIELD, user_id)?;
        let removed = sqlx::query("DELETE FROM contact WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        info!(
            subsystem = "database",
            component = "contacts",
            op = "clear",
            user_id = %user_id,
            removed_count = removed,
            "Cleared user contacts"
        );
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM contact")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        info!(
            subsystem = "database",
            component = "contacts",
            op = "clear_all",
            removed_count = removed,
            "Cleared all contacts"
        );
        Ok(removed)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Contact>> {
        query.validate()?;
        let start = Instant::now();
        let prefix_key = query.prefix_key();
        if prefix_key.as_deref() == Some("") {
            // No letters, so no word prefix can match.
            return Ok(Vec::new());
        }
        let email_key = query.email_key();

        // Build the WHERE clause from whichever filters are present
        let mut conditions = vec!["user_id = $1".to_string()];
        let mut param_count = 2;

        if query.id.is_some() {
            conditions.push(format!("id = ${}", param_count));
            param_count += 1;
        }
        if prefix_key.is_some() {
            conditions.push(format!("name_prefixes @> ARRAY[${}]::text[]", param_count));
            param_count += 1;
        }
        if email_key.is_some() {
            conditions.push(format!("email_keys @> ARRAY[${}]::text[]", param_count));
            param_count += 1;
        }

        let sql = format!(
            "SELECT {} FROM contact WHERE {} ORDER BY name_key ASC, id ASC OFFSET ${} LIMIT ${}",
            CONTACT_COLUMNS,
            conditions.join(" AND "),
            param_count,
            param_count + 1
        );

        let mut q = sqlx::query(&sql).bind(&query.user_id);
        if let Some(id) = &query.id {
            q = q.bind(id);
        }
        if let Some(key) = &prefix_key {
            q = q.bind(key);
        }
        if let Some(key) = &email_key {
            q = q.bind(key);
        }

        let rows = q
            .bind(sql_bigint(query.index))
            .bind(sql_bigint(query.count))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let contacts = rows
            .iter()
            .map(contact_from_row)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "database",
            component = "contacts",
            op = "search",
            user_id = %query.user_id,
            index = query.index,
            count = query.count,
            result_count = contacts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Contact search complete"
        );
        Ok(contacts)
    }
}
