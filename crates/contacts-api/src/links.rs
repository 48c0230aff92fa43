//! Hypermedia links for API responses.
//!
//! Successful responses are `{ "result": ..., "links": [...] }`. Search
//! results carry `self`, `next` and `prev` links (in that order, the latter
//! two only when such a page can exist) and each contact in the page is
//! wrapped with its own `self` link.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{header, request::Parts, HeaderMap},
};
use serde::Serialize;

use contacts_core::Contact;

use crate::error::ApiError;
use crate::query::SearchParams;

pub const REL_SELF: &str = "self";
pub const REL_NEXT: &str = "next";
pub const REL_PREV: &str = "prev";

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// A single `{rel, name, href}` link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub name: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: &str, href: impl Into<String>) -> Self {
        Self {
            rel: rel.to_string(),
            name: rel.to_string(),
            href: href.into(),
        }
    }
}

/// A result together with its links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Linked<T> {
    pub result: T,
    pub links: Vec<Link>,
}

impl<T> Linked<T> {
    /// Wrap `result` with a single `self` link.
    pub fn with_self(result: T, href: impl Into<String>) -> Self {
        Self {
            result,
            links: vec![Link::new(REL_SELF, href)],
        }
    }
}

/// Absolute URL of the current request: scheme, host and path, without the
/// query string or a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl(String);

impl RequestUrl {
    pub fn from_parts(scheme: &str, host: &str, path: &str) -> Self {
        Self(format!("{}://{}{}", scheme, host, path.trim_end_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL of the resource `id` below this one.
    pub fn child(&self, id: &str) -> String {
        format!("{}/{}", self.0, urlencoding::encode(id))
    }

    /// This URL with `pairs` as its percent-encoded query string.
    pub fn with_query(&self, pairs: &[(&str, String)]) -> String {
        if pairs.is_empty() {
            return self.0.clone();
        }
        let query: Vec<String> = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.0, query.join("&"))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestUrl
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());

        let scheme = header_str(&parts.headers, FORWARDED_PROTO)
            // a proxy chain may list several protocols; the first is the client's
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .unwrap_or("http");

        let host = header_str(&parts.headers, header::HOST)
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .ok_or_else(|| ApiError::bad_request("missing Host header"))?;

        Ok(RequestUrl::from_parts(scheme, &host, uri.path()))
    }
}

/// Build the search response from a look-ahead result list of up to
/// `count + 1` contacts.
pub fn paginate(
    url: &RequestUrl,
    params: &SearchParams,
    mut results: Vec<Contact>,
) -> Linked<Vec<Linked<Contact>>> {
    let count = usize::try_from(params.count).unwrap_or(usize::MAX);
    let has_next = results.len() > count;
    results.truncate(count);

    let mut links = vec![Link::new(REL_SELF, url.with_query(&params.pairs_at(params.index)))];
    if has_next {
        let next = params.index.saturating_add(params.count);
        links.push(Link::new(REL_NEXT, url.with_query(&params.pairs_at(next))));
    }
    if params.index > 0 {
        let prev = params.index.saturating_sub(params.count);
        links.push(Link::new(REL_PREV, url.with_query(&params.pairs_at(prev))));
    }

    let result = results
        .into_iter()
        .map(|contact| {
            let href = url.child(contact.id.as_str());
            Linked::with_self(contact, href)
        })
        .collect();

    Linked { result, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contacts_core::{ContactId, NewContact};

    fn url() -> RequestUrl {
        RequestUrl::from_parts("http", "localhost:3000", "/u1")
    }

    fn params(index: u64, count: u64) -> SearchParams {
        SearchParams {
            id: None,
            prefix: None,
            email: None,
            index,
            count,
        }
    }

    fn contacts(n: usize) -> Vec<Contact> {
        (0..n)
            .map(|i| {
                Contact::from_new(
                    ContactId::new(format!("{}_0000000000", i + 1)),
                    "u1",
                    NewContact::new(format!("Name {}", i)),
                )
            })
            .collect()
    }

    fn rels(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.rel.as_str()).collect()
    }

    #[test]
    fn test_request_url_strips_trailing_slash() {
        let url = RequestUrl::from_parts("https", "api.example.com", "/u1/");
        assert_eq!(url.as_str(), "https://api.example.com/u1");
        assert_eq!(url.child("7_0123456789"), "https://api.example.com/u1/7_0123456789");
    }

    #[test]
    fn test_with_query_encodes_values() {
        let href = url().with_query(&[("email", "a+b@x.com".to_string()), ("prefix", "o'n".to_string())]);
        assert_eq!(href, "http://localhost:3000/u1?email=a%2Bb%40x.com&prefix=o%27n");
    }

    #[test]
    fn test_first_page_with_more() {
        let page = paginate(&url(), &params(0, 2), contacts(3));
        assert_eq!(page.result.len(), 2);
        assert_eq!(rels(&page.links), ["self", "next"]);
        assert_eq!(page.links[0].href, "http://localhost:3000/u1?index=0&count=2");
        assert_eq!(page.links[1].href, "http://localhost:3000/u1?index=2&count=2");
    }

    #[test]
    fn test_middle_page() {
        let page = paginate(&url(), &params(2, 2), contacts(3));
        assert_eq!(rels(&page.links), ["self", "next", "prev"]);
        assert_eq!(page.links[2].href, "http://localhost:3000/u1?index=0&count=2");
    }

    #[test]
    fn test_last_page() {
        let page = paginate(&url(), &params(4, 2), contacts(1));
        assert_eq!(page.result.len(), 1);
        assert_eq!(rels(&page.links), ["self", "prev"]);
    }

    #[test]
    fn test_exact_fit_has_no_next() {
        let page = paginate(&url(), &params(0, 3), contacts(3));
        assert_eq!(page.result.len(), 3);
        assert_eq!(rels(&page.links), ["self"]);
    }

    #[test]
    fn test_prev_clamps_at_zero() {
        let page = paginate(&url(), &params(1, 5), Vec::new());
        assert!(page.result.is_empty());
        assert_eq!(rels(&page.links), ["self", "prev"]);
        assert_eq!(page.links[1].href, "http://localhost:3000/u1?index=0&count=5");
    }

    #[test]
    fn test_items_carry_self_links() {
        let page = paginate(&url(), &params(0, 5), contacts(2));
        assert_eq!(page.result[0].links.len(), 1);
        assert_eq!(page.result[0].links[0].name, "self");
        assert_eq!(page.result[0].links[0].href, "http://localhost:3000/u1/1_0000000000");
    }

    #[test]
    fn test_filters_are_kept_in_links() {
        let mut p = params(0, 1);
        p.prefix = Some("doe".into());
        let page = paginate(&url(), &p, contacts(2));
        assert_eq!(page.links[1].href, "http://localhost:3000/u1?prefix=doe&index=1&count=1");
    }

    #[test]
    fn test_linked_serializes_result_and_links() {
        let value = serde_json::to_value(Linked::with_self(1, "http://h/u1")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "result": 1,
                "links": [{"rel": "self", "name": "self", "href": "http://h/u1"}]
            })
        );
    }
}
