//! Name to identifier resolution over a listing endpoint

use crate::error::{PrismError, Result};
use crate::transport::{Transport, TransportError, TransportRequest};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Where names and identifiers live inside a listing response.
///
/// All three are JSON pointers. `collection` is resolved against the whole
/// body; `name` and `id` against each entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFields {
    pub collection: String,
    pub name: String,
    pub id: String,
}

impl Default for ListingFields {
    fn default() -> Self {
        Self {
            collection: "/entities".to_string(),
            name: "/name".to_string(),
            id: "/uuid".to_string(),
        }
    }
}

/// One `name -> id` snapshot from a single listing call. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIndex {
    entries: HashMap<String, String>,
}

impl EntityIndex {
    /// Build from parallel name/id lists. Later duplicates of a name win.
    pub fn from_parallel(names: Vec<String>, ids: Vec<String>) -> Result<Self> {
        if names.len() != ids.len() {
            return Err(PrismError::malformed(format!(
                "{} names but {} identifiers",
                names.len(),
                ids.len()
            )));
        }

        let entries = names.into_iter().zip(ids).collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Look a name up in an index. `None` is a normal outcome, not an error.
pub fn lookup<'a>(index: &'a EntityIndex, name: &str) -> Option<&'a str> {
    index.entries.get(name).map(String::as_str)
}

/// Resolves entity names through a listing endpoint
pub struct EntityResolver<'a> {
    transport: &'a dyn Transport,
    fields: ListingFields,
}

impl<'a> EntityResolver<'a> {
    pub fn new(transport: &'a dyn Transport, fields: ListingFields) -> Self {
        Self { transport, fields }
    }

    /// GET the listing endpoint and build a fresh index from it
    pub async fn resolve(&self, listing_endpoint: &str) -> Result<EntityIndex> {
        info!(endpoint = listing_endpoint, "Resolving entities");

        let response = self
            .transport
            .execute(TransportRequest::get(listing_endpoint))
            .await?;

        if !response.is_success() {
            warn!(endpoint = listing_endpoint, status = response.status, "Listing call rejected");
            return Err(TransportError::Rejected {
                status: response.status,
                body: response.text(),
            }
            .into());
        }

        let index = parse_listing(&response.body, &self.fields)?;
        debug!(endpoint = listing_endpoint, entities = index.len(), "Entity index built");
        Ok(index)
    }
}

/// Extract parallel name and id lists from a listing body.
///
/// Entities without a string at a pointer are skipped for that list only, so
/// a partially populated listing surfaces as a length mismatch.
pub fn parse_listing(body: &[u8], fields: &ListingFields) -> Result<EntityIndex> {
    let root: Value = serde_json::from_slice(body)?;

    let entities = root
        .pointer(&fields.collection)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PrismError::malformed(format!("no entity array at '{}'", fields.collection))
        })?;

    let names = extract_strings(entities, &fields.name);
    let ids = extract_strings(entities, &fields.id);

    EntityIndex::from_parallel(names, ids)
}

fn extract_strings(entities: &[Value], pointer: &str) -> Vec<String> {
    entities
        .iter()
        .filter_map(|entity| entity.pointer(pointer).and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};

    const LISTING: &str = r#"{
        "metadata": {"total_entities": 2},
        "entities": [
            {"name": "vm1", "uuid": "u1"},
            {"name": "vm2", "uuid": "u2"}
        ]
    }"#;

    #[tokio::test]
    async fn test_resolve_and_lookup() {
        let mock = MockTransport::new().on(Method::Get, "/vms", 200, LISTING);
        let resolver = EntityResolver::new(&mock, ListingFields::default());

        let index = resolver.resolve("/vms").await.unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(lookup(&index, "vm1"), Some("u1"));
        assert_eq!(lookup(&index, "vm2"), Some("u2"));
        assert_eq!(lookup(&index, "vm3"), None);
    }

    #[test]
    fn test_every_position_maps_to_its_id() {
        let names: Vec<String> = (0..50).map(|i| format!("vm-{i}")).collect();
        let ids: Vec<String> = (0..50).map(|i| format!("uuid-{i}")).collect();
        let index = EntityIndex::from_parallel(names.clone(), ids.clone()).unwrap();

        for (name, id) in names.iter().zip(&ids) {
            assert_eq!(lookup(&index, name), Some(id.as_str()));
        }
        assert!(index.len() <= names.len());
    }

    #[test]
    fn test_duplicate_names_last_seen_wins() {
        let body = br#"{"entities": [
            {"name": "dup", "uuid": "first"},
            {"name": "dup", "uuid": "second"}
        ]}"#;

        let index = parse_listing(body, &ListingFields::default()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(lookup(&index, "dup"), Some("second"));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let body = br#"{"entities": [
            {"name": "vm1", "uuid": "u1"},
            {"name": "vm2"}
        ]}"#;

        let result = parse_listing(body, &ListingFields::default());
        assert!(matches!(result, Err(PrismError::MalformedResponse(_))));
    }

    #[test]
    fn test_missing_array_is_malformed() {
        let result = parse_listing(br#"{"entities": {}}"#, &ListingFields::default());
        assert!(matches!(result, Err(PrismError::MalformedResponse(_))));

        let result = parse_listing(b"not json", &ListingFields::default());
        assert!(matches!(result, Err(PrismError::MalformedResponse(_))));
    }

    #[test]
    fn test_nested_v3_fields() {
        let body = br#"{"entities": [
            {"status": {"name": "web"}, "metadata": {"uuid": "abc"}}
        ]}"#;
        let fields = ListingFields {
            collection: "/entities".to_string(),
            name: "/status/name".to_string(),
            id: "/metadata/uuid".to_string(),
        };

        let index = parse_listing(body, &fields).unwrap();
        assert_eq!(lookup(&index, "web"), Some("abc"));
    }

    #[test]
    fn test_empty_listing_gives_empty_index() {
        let index = parse_listing(br#"{"entities": []}"#, &ListingFields::default()).unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let mock = MockTransport::new().fail_on(Method::Get, "/vms", None, "tls handshake");
        let resolver = EntityResolver::new(&mock, ListingFields::default());

        let result = resolver.resolve("/vms").await;
        assert!(matches!(
            result,
            Err(PrismError::Transport(TransportError::RequestFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_listing_is_error() {
        let mock = MockTransport::new().on(Method::Get, "/vms", 401, "unauthorized");
        let resolver = EntityResolver::new(&mock, ListingFields::default());

        let result = resolver.resolve("/vms").await;
        assert!(matches!(
            result,
            Err(PrismError::Transport(TransportError::Rejected { status: 401, .. }))
        ));
    }
}
