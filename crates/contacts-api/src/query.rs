//! Search query-string validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use contacts_core::{ErrorCode, SearchQuery, DEFAULT_COUNT};

use crate::error::{ApiError, ErrorEntry};

static NON_NEG_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Query string of `GET /{userId}` exactly as received.
#[derive(Debug, Default, Deserialize)]
pub struct RawSearchParams {
    pub id: Option<String>,
    pub prefix: Option<String>,
    pub email: Option<String>,
    pub index: Option<String>,
    pub count: Option<String>,
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub id: Option<String>,
    pub prefix: Option<String>,
    pub email: Option<String>,
    pub index: u64,
    pub count: u64,
}

impl SearchParams {
    /// Validate `index` and `count`, reporting every bad value at once.
    pub fn parse(raw: RawSearchParams) -> Result<Self, ApiError> {
        let mut errors = Vec::new();
        let index = parse_non_neg_int("index", raw.index.as_deref(), 0, &mut errors);
        let count = parse_non_neg_int("count", raw.count.as_deref(), DEFAULT_COUNT, &mut errors);
        if let (Some(0), Some(raw_count)) = (count, raw.count.as_deref()) {
            errors.push(ErrorEntry::new(
                ErrorCode::BadValue,
                format!("count \"{}\" must be a positive integer", raw_count),
            ));
        }
        if !errors.is_empty() {
            return Err(ApiError::new(errors));
        }
        Ok(Self {
            id: raw.id,
            prefix: raw.prefix,
            email: raw.email,
            index: index.unwrap_or(0),
            count: count.unwrap_or(DEFAULT_COUNT),
        })
    }

    /// Repository query fetching one extra row, so the caller can tell
    /// whether another page follows.
    pub fn to_lookahead_query(&self, user_id: &str) -> SearchQuery {
        let mut query = SearchQuery::for_user(user_id).window(self.index, self.count.saturating_add(1));
        query.id = self.id.clone();
        query.prefix = self.prefix.clone();
        query.email = self.email.clone();
        query
    }

    /// Query-string pairs for these parameters with `index` replaced.
    pub fn pairs_at(&self, index: u64) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(id) = &self.id {
            pairs.push(("id", id.clone()));
        }
        if let Some(prefix) = &self.prefix {
            pairs.push(("prefix", prefix.clone()));
        }
        if let Some(email) = &self.email {
            pairs.push(("email", email.clone()));
        }
        pairs.push(("index", index.to_string()));
        pairs.push(("count", self.count.to_string()));
        pairs
    }
}

fn parse_non_neg_int(
    key: &str,
    raw: Option<&str>,
    default: u64,
    errors: &mut Vec<ErrorEntry>,
) -> Option<u64> {
    let Some(raw) = raw else {
        return Some(default);
    };
    let parsed = if NON_NEG_INT.is_match(raw) {
        raw.parse::<u64>().ok()
    } else {
        None
    };
    if parsed.is_none() {
        errors.push(ErrorEntry::new(
            ErrorCode::BadValue,
            format!("{} \"{}\" must be a non-negative integer", key, raw),
        ));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn raw(index: Option<&str>, count: Option<&str>) -> RawSearchParams {
        RawSearchParams {
            index: index.map(String::from),
            count: count.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let params = SearchParams::parse(RawSearchParams::default()).unwrap();
        assert_eq!(params.index, 0);
        assert_eq!(params.count, DEFAULT_COUNT);
    }

    #[test]
    fn test_explicit_window() {
        let params = SearchParams::parse(raw(Some("10"), Some("3"))).unwrap();
        assert_eq!((params.index, params.count), (10, 3));
    }

    #[test]
    fn test_rejects_non_digits() {
        for bad in ["-1", "1.5", "abc", "", " 2", "2 "] {
            let err = SearchParams::parse(raw(Some(bad), None)).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "index {:?}", bad);
            assert_eq!(err.errors()[0].code, ErrorCode::BadValue);
            assert!(err.errors()[0].message.starts_with("index \""));
        }
    }

    #[test]
    fn test_reports_both_bad_values() {
        let err = SearchParams::parse(raw(Some("x"), Some("y"))).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.errors()[0].message, "index \"x\" must be a non-negative integer");
        assert_eq!(err.errors()[1].message, "count \"y\" must be a non-negative integer");
    }

    #[test]
    fn test_zero_count_rejected() {
        let err = SearchParams::parse(raw(None, Some("0"))).unwrap_err();
        assert_eq!(err.errors()[0].message, "count \"0\" must be a positive integer");
        assert!(SearchParams::parse(raw(Some("0"), Some("1"))).is_ok());
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(SearchParams::parse(raw(Some("99999999999999999999999"), None)).is_err());
    }

    #[test]
    fn test_lookahead_query_fetches_one_more() {
        let params = SearchParams::parse(RawSearchParams {
            prefix: Some("doe".into()),
            ..raw(Some("4"), Some("2"))
        })
        .unwrap();
        let query = params.to_lookahead_query("u1");
        assert_eq!(query.user_id, "u1");
        assert_eq!(query.prefix.as_deref(), Some("doe"));
        assert_eq!((query.index, query.count), (4, 3));
    }

    #[test]
    fn test_pairs_order() {
        let params = SearchParams {
            id: Some("1_0000000001".into()),
            prefix: Some("jo".into()),
            email: Some("a@b".into()),
            index: 0,
            count: 2,
        };
        let keys: Vec<&str> = params.pairs_at(7).iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["id", "prefix", "email", "index", "count"]);
        assert_eq!(params.pairs_at(7)[3].1, "7");
    }
}
