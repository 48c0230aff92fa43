//! # contacts-core
//!
//! Core types, traits, and abstractions for the contacts service.
//!
//! This crate provides the contact data model, the error taxonomy shared by
//! the storage and HTTP layers, the name-prefix index, identifier generation
//! and the [`ContactRepository`] trait that storage backends implement.

pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod prefix;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorCode, Result};
pub use ids::{compose_contact_id, is_well_formed};
pub use models::*;
pub use prefix::{email_key, name_prefixes, name_sort_key, prefix_key, validate_name};
pub use traits::ContactRepository;
