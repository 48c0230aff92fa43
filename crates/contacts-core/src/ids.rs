//! Contact identifier generation.
//!
//! An identifier is `<sequence>_<random digits>`: the sequence comes from an
//! atomic counter owned by the storage backend and guarantees uniqueness, the
//! random suffix keeps identifiers from being guessed. Only ASCII digits and
//! `_` appear, so identifiers embed in URL path segments unchanged.

use rand::Rng;

use crate::models::ContactId;

/// Number of random decimal digits appended to the sequence number.
pub const RANDOM_DIGITS: usize = 10;

const RANDOM_BOUND: u64 = 10_000_000_000;

/// Compose an identifier from a freshly incremented sequence value.
pub fn compose_contact_id(sequence: u64) -> ContactId {
    compose_contact_id_with(sequence, &mut rand::thread_rng())
}

/// Like [`compose_contact_id`] with an explicit random source.
pub fn compose_contact_id_with<R: Rng + ?Sized>(sequence: u64, rng: &mut R) -> ContactId {
    let suffix = rng.gen_range(0..RANDOM_BOUND);
    ContactId::new(format!(
        "{}_{:0width$}",
        sequence,
        suffix,
        width = RANDOM_DIGITS
    ))
}

/// True when `id` has the shape produced by [`compose_contact_id`].
pub fn is_well_formed(id: &str) -> bool {
    match id.split_once('_') {
        Some((sequence, suffix)) => {
            !sequence.is_empty()
                && sequence.bytes().all(|b| b.is_ascii_digit())
                && suffix.len() == RANDOM_DIGITS
                && suffix.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
