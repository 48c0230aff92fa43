//! Contact data model.
//!
//! Known fields (`id`, `userId`, `name`, `emails`) are typed; every other
//! caller-supplied field lives in an open JSON map that is stored and returned
//! verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};
use crate::ids::is_well_formed;
use crate::prefix::{email_key, prefix_key, validate_name};

/// Page size used when a search does not specify `count`.
pub const DEFAULT_COUNT: u64 = 5;

/// Body keys that callers may not set freely.
pub const ID_FIELD: &str = "id";
pub const LEGACY_ID_FIELD: &str = "_id";
pub const USER_ID_FIELD: &str = "userId";
pub const NAME_FIELD: &str = "name";
pub const EMAILS_FIELD: &str = "emails";
pub const NAME_PREFIXES_FIELD: &str = "namePrefixes";

/// Opaque, URL-safe contact identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContactId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ContactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A stored contact as returned by read, update and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    /// Caller-supplied fields without a dedicated column.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Contact {
    /// Build the stored form of a freshly created contact.
    pub fn from_new(id: ContactId, user_id: &str, new: NewContact) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            name: new.name,
            emails: new.emails,
            extra: new.extra,
        }
    }

    /// Merge `patch` into this contact. Returns true when the name changed.
    pub fn apply(&mut self, patch: ContactPatch) -> bool {
        let mut name_changed = false;
        if let Some(name) = patch.name {
            name_changed = name != self.name;
            self.name = name;
        }
        if let Some(emails) = patch.emails {
            self.emails = emails;
        }
        for (key, value) in patch.extra {
            self.extra.insert(key, value);
        }
        name_changed
    }

    /// Lowercased email addresses used for case-insensitive matching.
    pub fn email_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .emails
            .iter()
            .flatten()
            .map(|email| email_key(email))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Fields for a contact that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub name: String,
    pub emails: Option<Vec<String>>,
    pub extra: Map<String, JsonValue>,
}

impl NewContact {
    /// Plain constructor for callers that already hold typed fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emails: None,
            extra: Map::new(),
        }
    }

    pub fn with_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emails = Some(emails.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Split a JSON request body into a new contact for `user_id`.
    ///
    /// Errors:
    /// - `BadRequest` if the body carries an identifier, a foreign `userId`,
    ///   or `namePrefixes`
    /// - `BadValue` if `name` is missing or invalid, `emails` is not a list
    ///   of strings, or any string in the body contains a NUL character
    pub fn from_json(user_id: &str, mut body: Map<String, JsonValue>) -> Result<Self> {
        for key in [ID_FIELD, LEGACY_ID_FIELD] {
            if body.contains_key(key) {
                return Err(Error::BadRequest(format!(
                    "new contact cannot have an \"{}\" property",
                    key
                )));
            }
        }
        take_user_id(&mut body, user_id)?;
        reject_name_prefixes(&body)?;
        reject_nul_in_fields(&body)?;

        let name = match body.remove(NAME_FIELD) {
            Some(value) => parse_name(value)?,
            None => return Err(Error::BadValue("name is required".to_string())),
        };
        let emails = match body.remove(EMAILS_FIELD) {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(parse_emails(value)?),
        };

        Ok(Self {
            name,
            emails,
            extra: body,
        })
    }

    pub fn validate(&self) -> Result<()> {
        reject_nul(NAME_FIELD, &self.name)?;
        validate_name(&self.name)?;
        reject_nul_in_emails(self.emails.as_deref())?;
        reject_nul_in_fields(&self.extra)
    }
}

/// Partial update of an existing contact. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactPatch {
    pub name: Option<String>,
    /// `Some(None)` removes the email set.
    pub emails: Option<Option<Vec<String>>>,
    pub extra: Map<String, JsonValue>,
}

impl ContactPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn emails(mut self, emails: Option<Vec<String>>) -> Self {
        self.emails = Some(emails);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Split a JSON request body into a patch for contact `contact_id` of
    /// `user_id`. Identifier keys are accepted only when they repeat the
    /// addressed contact.
    pub fn from_json(
        user_id: &str,
        contact_id: &str,
        mut body: Map<String, JsonValue>,
    ) -> Result<Self> {
        for key in [ID_FIELD, LEGACY_ID_FIELD] {
            if let Some(value) = body.remove(key) {
                if value.as_str() != Some(contact_id) {
                    return Err(Error::BadRequest(format!(
                        "\"{}\" property does not match contact {}",
                        key, contact_id
                    )));
                }
            }
        }
        take_user_id(&mut body, user_id)?;
        reject_name_prefixes(&body)?;
        reject_nul_in_fields(&body)?;

        let name = body.remove(NAME_FIELD).map(parse_name).transpose()?;
        let emails = match body.remove(EMAILS_FIELD) {
            None => None,
            Some(JsonValue::Null) => Some(None),
            Some(value) => Some(Some(parse_emails(value)?)),
        };

        Ok(Self {
            name,
            emails,
            extra: body,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.emails.is_none() && self.extra.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            reject_nul(NAME_FIELD, name)?;
            validate_name(name)?;
        }
        if let Some(emails) = &self.emails {
            reject_nul_in_emails(emails.as_deref())?;
        }
        reject_nul_in_fields(&self.extra)
    }
}

/// Drop a `userId` key that repeats the path user; reject any other value.
fn take_user_id(body: &mut Map<String, JsonValue>, user_id: &str) -> Result<()> {
    if let Some(value) = body.remove(USER_ID_FIELD) {
        if value.as_str() != Some(user_id) {
            return Err(Error::BadRequest(format!(
                "\"{}\" property does not match user {}",
                USER_ID_FIELD, user_id
            )));
        }
    }
    Ok(())
}

/// Check the `(user_id, id)` address of a single contact.
///
/// An id that is not [`is_well_formed`] cannot name a stored contact and is
/// reported as not found without a storage round trip.
pub fn check_contact_address(user_id: &str, id: &str) -> Result<()> {
    reject_nul(USER_ID_FIELD, user_id)?;
    if !is_well_formed(id) {
        return Err(Error::contact_not_found(user_id, id));
    }
    Ok(())
}

/// PostgreSQL text cannot hold NUL, so no backend accepts it.
pub fn reject_nul(field: &str, value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(Error::BadValue(format!(
            "{} must not contain NUL characters",
            field
        )));
    }
    Ok(())
}

fn reject_nul_in_emails(emails: Option<&[String]>) -> Result<()> {
    emails
        .unwrap_or_default()
        .iter()
        .try_for_each(|email| reject_nul(EMAILS_FIELD, email))
}

/// Walk every key and string value of a JSON object, nested ones included.
fn reject_nul_in_fields(fields: &Map<String, JsonValue>) -> Result<()> {
    for (key, value) in fields {
        reject_nul("field name", key)?;
        reject_nul_in_value(key, value)?;
    }
    Ok(())
}

fn reject_nul_in_value(field: &str, value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::String(text) => reject_nul(field, text),
        JsonValue::Array(items) => items
            .iter()
            .try_for_each(|item| reject_nul_in_value(field, item)),
        JsonValue::Object(fields) => reject_nul_in_fields(fields),
        _ => Ok(()),
    }
}

fn reject_name_prefixes(body: &Map<String, JsonValue>) -> Result<()> {
    if body.contains_key(NAME_PREFIXES_FIELD) {
        return Err(Error::BadRequest(format!(
            "\"{}\" is derived from name and cannot be set",
            NAME_PREFIXES_FIELD
        )));
    }
    Ok(())
}

fn parse_name(value: JsonValue) -> Result<String> {
    match value {
        JsonValue::String(name) => {
            validate_name(&name)?;
            Ok(name)
        }
        _ => Err(Error::BadValue("name must be a string".to_string())),
    }
}

fn parse_emails(value: JsonValue) -> Result<Vec<String>> {
    let invalid = || Error::BadValue("emails must be a list of strings".to_string());
    match value {
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::String(email) => Ok(email),
                _ => Err(invalid()),
            })
            .collect(),
        _ => Err(invalid()),
    }
}

/// Search parameters for one user's contacts.
///
/// Filters that are present are combined with logical AND; with no filters
/// every contact of the user matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub user_id: String,
    pub id: Option<String>,
    pub prefix: Option<String>,
    pub email: Option<String>,
    /// Number of matches to skip.
    pub index: u64,
    /// Maximum number of matches to return.
    pub count: u64,
}

impl SearchQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            id: None,
            prefix: None,
            email: None,
            index: 0,
            count: DEFAULT_COUNT,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn window(mut self, index: u64, count: u64) -> Self {
        self.index = index;
        self.count = count;
        self
    }

    /// Normalized prefix filter, if one was given.
    pub fn prefix_key(&self) -> Option<String> {
        self.prefix.as_deref().map(prefix_key)
    }

    /// Normalized email filter, if one was given.
    pub fn email_key(&self) -> Option<String> {
        self.email.as_deref().map(email_key)
    }

    /// Reject filters no stored contact could ever match.
    pub fn validate(&self) -> Result<()> {
        reject_nul(USER_ID_FIELD, &self.user_id)?;
        if let Some(id) = &self.id {
            reject_nul(ID_FIELD, id)?;
        }
        if let Some(email) = &self.email {
            reject_nul(EMAILS_FIELD, email)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_new_contact_from_json_keeps_unknown_fields() {
        let body = object(json!({
            "name": "Jane Doe",
            "emails": ["jane@x.com"],
            "phone": "555-1234",
            "tags": {"work": true},
        }));
        let new = NewContact::from_json("u1", body).unwrap();
        assert_eq!(new.name, "Jane Doe");
        assert_eq!(new.emails, Some(vec!["jane@x.com".to_string()]));
        assert_eq!(new.extra.get("phone"), Some(&json!("555-1234")));
        assert_eq!(new.extra.get("tags"), Some(&json!({"work": true})));
        assert!(!new.extra.contains_key("name"));
    }

    #[test]
    fn test_new_contact_rejects_identifier() {
        for key in ["id", "_id"] {
            let body = object(json!({ "name": "Jane", key: "c1" }));
            let err = NewContact::from_json("u1", body).unwrap_err();
            assert!(matches!(err, Error::BadRequest(_)), "{} should be rejected", key);
        }
    }

    #[test]
    fn test_new_contact_user_id_must_match_path() {
        let same = object(json!({ "name": "Jane", "userId": "u1" }));
        let new = NewContact::from_json("u1", same).unwrap();
        assert!(!new.extra.contains_key("userId"));

        let other = object(json!({ "name": "Jane", "userId": "u2" }));
        assert!(matches!(
            NewContact::from_json("u1", other),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_new_contact_rejects_name_prefixes() {
        let body = object(json!({ "name": "Jane", "namePrefixes": ["zz"] }));
        assert!(matches!(
            NewContact::from_json("u1", body),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_new_contact_name_validation() {
        assert!(matches!(
            NewContact::from_json("u1", object(json!({ "emails": [] }))),
            Err(Error::BadValue(_))
        ));
        assert!(matches!(
            NewContact::from_json("u1", object(json!({ "name": 42 }))),
            Err(Error::BadValue(_))
        ));
        assert!(matches!(
            NewContact::from_json("u1", object(json!({ "name": "123" }))),
            Err(Error::BadValue(_))
        ));
    }

    #[test]
    fn test_new_contact_emails_must_be_strings() {
        let body = object(json!({ "name": "Jane", "emails": ["a@b.c", 7] }));
        assert!(matches!(
            NewContact::from_json("u1", body),
            Err(Error::BadValue(_))
        ));
        let body = object(json!({ "name": "Jane", "emails": "a@b.c" }));
        assert!(matches!(
            NewContact::from_json("u1", body),
            Err(Error::BadValue(_))
        ));
    }

    #[test]
    fn test_contact_serializes_flat() {
        let contact = Contact::from_new(
            ContactId::new("1_0123456789"),
            "u1",
            NewContact::new("Jane Doe").with_field("phone", json!("555")),
        );
        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "1_0123456789",
                "userId": "u1",
                "name": "Jane Doe",
                "phone": "555",
            })
        );
    }

    #[test]
    fn test_contact_round_trips_through_json() {
        let contact = Contact::from_new(
            ContactId::new("2_0000000000"),
            "u1",
            NewContact::new("Al")
                .with_emails(["al@x.com"])
                .with_field("age", json!(40)),
        );
        let json = serde_json::to_string(&contact).unwrap();
        let back: Contact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contact);
    }

    #[test]
    fn test_patch_apply_merges_fields() {
        let mut contact = Contact::from_new(
            ContactId::new("1_0000000000"),
            "u1",
            NewContact::new("Jane")
                .with_emails(["jane@x.com"])
                .with_field("phone", json!("1")),
        );
        let changed = contact.apply(
            ContactPatch::new()
                .field("phone", json!("2"))
                .field("city", json!("Paris")),
        );
        assert!(!changed);
        assert_eq!(contact.name, "Jane");
        assert_eq!(contact.emails, Some(vec!["jane@x.com".to_string()]));
        assert_eq!(contact.extra.get("phone"), Some(&json!("2")));
        assert_eq!(contact.extra.get("city"), Some(&json!("Paris")));

        assert!(contact.apply(ContactPatch::new().name("Janet").emails(None)));
        assert_eq!(contact.name, "Janet");
        assert_eq!(contact.emails, None);
    }

    #[test]
    fn test_patch_from_json() {
        let body = object(json!({
            "id": "c1",
            "userId": "u1",
            "name": "Janet",
            "emails": null,
            "note": null,
        }));
        let patch = ContactPatch::from_json("u1", "c1", body).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Janet"));
        assert_eq!(patch.emails, Some(None));
        assert_eq!(patch.extra.get("note"), Some(&JsonValue::Null));
        assert!(!patch.extra.contains_key("id"));
    }

    #[test]
    fn test_patch_rejects_mismatched_identifiers() {
        let body = object(json!({ "id": "c2" }));
        assert!(matches!(
            ContactPatch::from_json("u1", "c1", body),
            Err(Error::BadRequest(_))
        ));
        let body = object(json!({ "userId": "u2" }));
        assert!(matches!(
            ContactPatch::from_json("u1", "c1", body),
            Err(Error::BadRequest(_))
        ));
        let body = object(json!({ "name": "  " }));
        assert!(matches!(
            ContactPatch::from_json("u1", "c1", body),
            Err(Error::BadValue(_))
        ));
    }

    #[test]
    fn test_nul_rejected_anywhere_in_body() {
        let bodies = [
            json!({ "name": "Jane\u{0}Doe" }),
            json!({ "name": "Jane", "emails": ["a\u{0}@x.com"] }),
            json!({ "name": "Jane", "note": "a\u{0}b" }),
            json!({ "name": "Jane", "address": { "lines": ["x", "y\u{0}"] } }),
            json!({ "name": "Jane", "bad\u{0}key": 1 }),
        ];
        for body in bodies {
            assert!(
                matches!(
                    NewContact::from_json("u1", object(body.clone())),
                    Err(Error::BadValue(_))
                ),
                "{} should be rejected",
                body
            );
            assert!(
                matches!(
                    ContactPatch::from_json("u1", "c1", object(body.clone())),
                    Err(Error::BadValue(_))
                ),
                "{} should be rejected in a patch",
                body
            );
        }
    }

    #[test]
    fn test_validate_rejects_nul_in_typed_input() {
        assert!(matches!(
            NewContact::new("Jane\u{0}Doe").validate(),
            Err(Error::BadValue(_))
        ));
        assert!(matches!(
            NewContact::new("Jane")
                .with_field("note", json!("a\u{0}b"))
                .validate(),
            Err(Error::BadValue(_))
        ));
        assert!(matches!(
            ContactPatch::new()
                .emails(Some(vec!["x\u{0}@y".to_string()]))
                .validate(),
            Err(Error::BadValue(_))
        ));
        assert!(NewContact::new("Jane").with_field("n", json!(null)).validate().is_ok());
    }

    #[test]
    fn test_contact_address() {
        assert!(check_contact_address("u1", "12_0123456789").is_ok());
        assert!(matches!(
            check_contact_address("u1", "12_0123\u{0}56789"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            check_contact_address("u1", "../etc"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            check_contact_address("u\u{0}1", "12_0123456789"),
            Err(Error::BadValue(_))
        ));
    }

    #[test]
    fn test_search_query_validate() {
        assert!(SearchQuery::for_user("u1").email("a@b").validate().is_ok());
        assert!(matches!(
            SearchQuery::for_user("u1").email("a\u{0}b").validate(),
            Err(Error::BadValue(_))
        ));
        assert!(matches!(
            SearchQuery::for_user("u\u{0}1").validate(),
            Err(Error::BadValue(_))
        ));
    }

    #[test]
    fn test_email_keys_are_lowercased_and_unique() {
        let contact = Contact::from_new(
            ContactId::new("1_0000000000"),
            "u1",
            NewContact::new("Jane").with_emails(["Jane@X.com", "jane@x.com", "j@y.org"]),
        );
        assert_eq!(contact.email_keys(), vec!["j@y.org", "jane@x.com"]);
    }

    #[test]
    fn test_search_query_defaults() {
        let query = SearchQuery::for_user("u1");
        assert_eq!(query.index, 0);
        assert_eq!(query.count, DEFAULT_COUNT);

        let query = query.prefix("DOE").email("Jane@X.com").window(10, 3);
        assert_eq!(query.prefix_key().as_deref(), Some("doe"));
        assert_eq!(query.email_key().as_deref(), Some("jane@x.com"));
        assert_eq!((query.index, query.count), (10, 3));
    }
}
