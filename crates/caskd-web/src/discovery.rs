//! Discovery descriptor assembly.
//!
//! Clients fetch the discovery descriptor to learn where the server's
//! capabilities live: the signing root, the upload/download/directory helper
//! URLs, and the configured publish roots. The descriptor is rebuilt from
//! scratch on every discovery request; nothing in it is cached.
//!
//! Key collisions between the front-end's contributions and keys already in
//! the destination map indicate double-registration of a capability. That is
//! a programming error, not a runtime condition, so [`insert_new`] rejects
//! it with a distinguishable [`DiscoveryError`] which the dispatcher turns
//! into a 500 and an error log.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use thiserror::Error;

use caskd_core::{SearchIndex, ServerRoot, SignerDiscovery};

/// Error raised while assembling the discovery descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// A capability key was contributed twice.
    #[error("duplicate discovery key {key:?}")]
    DuplicateKey {
        /// The colliding key.
        key: String,
    },
}

/// A configured publish root: an externally browsable, named view over a
/// subset of stored content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRoot {
    /// Display name of the root.
    pub name: String,
    /// URL prefix the root is mounted under.
    pub prefix: String,
}

/// Inserts `key` into `map`, refusing to overwrite an existing entry.
pub fn insert_new(
    map: &mut Map<String, Value>,
    key: &str,
    value: Value,
) -> Result<(), DiscoveryError> {
    if map.contains_key(key) {
        return Err(DiscoveryError::DuplicateKey {
            key: key.to_string(),
        });
    }
    map.insert(key.to_string(), value);
    Ok(())
}

/// Assembles the front-end's contribution to the discovery descriptor.
///
/// Borrowed from the dispatcher per request; holds no state of its own
/// beyond references to the configured collaborators.
pub struct DiscoveryContribution<'a> {
    /// Mount prefix of the front-end.
    pub prefix: &'a str,
    /// Path or URL of the JSON signing helper ("" when unconfigured).
    pub json_sign_root: &'a str,
    /// Publish roots, keyed by mount prefix for deterministic iteration.
    pub publish_roots: &'a BTreeMap<String, PublishRoot>,
    /// The root handler, for search enrichment.
    pub root: &'a dyn ServerRoot,
    /// Signing collaborator, when configured.
    pub signer: Option<&'a dyn SignerDiscovery>,
}

impl DiscoveryContribution<'_> {
    /// Adds the front-end's keys to `map`.
    ///
    /// For each publish root, the entry carries the display name and prefix
    /// list; when a search collaborator and owner are available, the root's
    /// current permanode is resolved through a signed-attribute lookup.
    /// Lookup failure is treated as "no current permanode" and nothing else.
    pub async fn populate(&self, map: &mut Map<String, Value>) -> Result<(), DiscoveryError> {
        let mut contribution = Map::new();
        contribution.insert("jsonSignRoot".to_string(), json!(self.json_sign_root));
        contribution.insert(
            "uploadHelper".to_string(),
            json!(format!("{}?camli.mode=uploadhelper", self.prefix)),
        );
        contribution.insert(
            "downloadHelper".to_string(),
            json!(join_url(self.prefix, "download")),
        );
        contribution.insert(
            "directoryHelper".to_string(),
            json!(join_url(self.prefix, "tree")),
        );
        contribution.insert(
            "publishRoots".to_string(),
            Value::Object(self.publish_roots_map().await),
        );
        if let Some(signer) = self.signer {
            contribution.insert(
                "signing".to_string(),
                signer.discovery_map(self.json_sign_root),
            );
        }

        for (key, value) in contribution {
            insert_new(map, &key, value)?;
        }
        Ok(())
    }

    async fn publish_roots_map(&self) -> Map<String, Value> {
        let mut roots = Map::new();
        for (prefix, root) in self.publish_roots {
            let mut entry = Map::new();
            entry.insert("name".to_string(), json!(root.name));
            entry.insert("prefix".to_string(), json!([prefix]));
            if let Some(permanode) = self.current_permanode(&root.name).await {
                entry.insert("currentPermanode".to_string(), json!(permanode));
            }
            roots.insert(root.name.clone(), Value::Object(entry));
        }
        roots
    }

    async fn current_permanode(&self, root_name: &str) -> Option<String> {
        let search: std::sync::Arc<dyn SearchIndex> = self.root.search()?;
        let owner = self.root.owner()?;
        // Lookup failures are swallowed on purpose; see the dispatch tests.
        search
            .permanode_of_signer_attr_value(&owner, "camliRoot", root_name)
            .await
            .ok()
            .map(|r| r.to_string())
    }
}

/// Joins a mount prefix and a path segment, keeping the trailing slash the
/// helper URLs are specified with.
fn join_url(prefix: &str, segment: &str) -> String {
    format!("{}{}/", ensure_trailing_slash(prefix), segment)
}

fn ensure_trailing_slash(s: &str) -> String {
    if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{s}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    use caskd_core::{BlobFetcher, BlobRef, SearchError};

    const OWNER: &str = "sha1-0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33";
    const PERMANODE: &str = "sha1-ffffffffffffffffffffffffffffffffffffffff";

    struct FakeSearch {
        fail: bool,
    }

    #[async_trait]
    impl SearchIndex for FakeSearch {
        async fn permanode_of_signer_attr_value(
            &self,
            _signer: &BlobRef,
            attr: &str,
            _value: &str,
        ) -> Result<BlobRef, SearchError> {
            assert_eq!(attr, "camliRoot");
            if self.fail {
                Err(SearchError("index offline".to_string()))
            } else {
                Ok(BlobRef::parse(PERMANODE).unwrap())
            }
        }
    }

    struct FakeRoot {
        search: Option<Arc<dyn SearchIndex>>,
    }

    impl ServerRoot for FakeRoot {
        fn storage(&self) -> Option<Arc<dyn BlobFetcher>> {
            None
        }
        fn search(&self) -> Option<Arc<dyn SearchIndex>> {
            self.search.clone()
        }
        fn owner(&self) -> Option<BlobRef> {
            BlobRef::parse(OWNER)
        }
        fn discovery_base(&self) -> Map<String, Value> {
            Map::new()
        }
    }

    struct FakeSigner;

    impl SignerDiscovery for FakeSigner {
        fn discovery_map(&self, sign_root: &str) -> Value {
            json!({ "publicKeyId": "ABCD1234", "signRoot": sign_root })
        }
    }

    fn roots_of(entries: &[(&str, &str)]) -> BTreeMap<String, PublishRoot> {
        entries
            .iter()
            .map(|(prefix, name)| {
                (
                    (*prefix).to_string(),
                    PublishRoot {
                        name: (*name).to_string(),
                        prefix: (*prefix).to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_insert_new_rejects_collision() {
        let mut m = Map::new();
        insert_new(&mut m, "uploadHelper", json!("x")).unwrap();
        let err = insert_new(&mut m, "uploadHelper", json!("y")).unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::DuplicateKey {
                key: "uploadHelper".to_string()
            }
        );
        // The original value survives.
        assert_eq!(m["uploadHelper"], json!("x"));
    }

    #[tokio::test]
    async fn test_populate_core_keys() {
        let root = FakeRoot { search: None };
        let publish = roots_of(&[]);
        let c = DiscoveryContribution {
            prefix: "/web/",
            json_sign_root: "/sighelper/",
            publish_roots: &publish,
            root: &root,
            signer: None,
        };
        let mut m = Map::new();
        c.populate(&mut m).await.unwrap();

        assert_eq!(m["jsonSignRoot"], json!("/sighelper/"));
        assert_eq!(m["uploadHelper"], json!("/web/?camli.mode=uploadhelper"));
        assert_eq!(m["downloadHelper"], json!("/web/download/"));
        assert_eq!(m["directoryHelper"], json!("/web/tree/"));
        assert_eq!(m["publishRoots"], json!({}));
        assert!(!m.contains_key("signing"));
    }

    #[tokio::test]
    async fn test_populate_signing_submap() {
        let root = FakeRoot { search: None };
        let publish = roots_of(&[]);
        let c = DiscoveryContribution {
            prefix: "/web/",
            json_sign_root: "/sighelper/",
            publish_roots: &publish,
            root: &root,
            signer: Some(&FakeSigner),
        };
        let mut m = Map::new();
        c.populate(&mut m).await.unwrap();
        assert_eq!(m["signing"]["publicKeyId"], json!("ABCD1234"));
    }

    #[tokio::test]
    async fn test_publish_root_with_current_permanode() {
        let root = FakeRoot {
            search: Some(Arc::new(FakeSearch { fail: false })),
        };
        let publish = roots_of(&[("/pics/", "pics")]);
        let c = DiscoveryContribution {
            prefix: "/web/",
            json_sign_root: "",
            publish_roots: &publish,
            root: &root,
            signer: None,
        };
        let mut m = Map::new();
        c.populate(&mut m).await.unwrap();

        let entry = &m["publishRoots"]["pics"];
        assert_eq!(entry["name"], json!("pics"));
        assert_eq!(entry["prefix"], json!(["/pics/"]));
        assert_eq!(entry["currentPermanode"], json!(PERMANODE));
    }

    #[tokio::test]
    async fn search_failure_omits_current_permanode() {
        // Documented-but-possibly-unintended: a failing search lookup is
        // indistinguishable from "no current permanode". The entry is still
        // published, minus the enrichment, and nothing is reported.
        let root = FakeRoot {
            search: Some(Arc::new(FakeSearch { fail: true })),
        };
        let publish = roots_of(&[("/pics/", "pics")]);
        let c = DiscoveryContribution {
            prefix: "/web/",
            json_sign_root: "",
            publish_roots: &publish,
            root: &root,
            signer: None,
        };
        let mut m = Map::new();
        c.populate(&mut m).await.unwrap();

        let entry = &m["publishRoots"]["pics"];
        assert_eq!(entry["name"], json!("pics"));
        assert!(entry.get("currentPermanode").is_none());
    }

    #[tokio::test]
    async fn test_populate_is_idempotent_for_fixed_state() {
        let root = FakeRoot {
            search: Some(Arc::new(FakeSearch { fail: false })),
        };
        let publish = roots_of(&[("/pics/", "pics"), ("/blog/", "blog")]);
        let c = DiscoveryContribution {
            prefix: "/web/",
            json_sign_root: "/sighelper/",
            publish_roots: &publish,
            root: &root,
            signer: Some(&FakeSigner),
        };

        let mut first = Map::new();
        c.populate(&mut first).await.unwrap();
        let mut second = Map::new();
        c.populate(&mut second).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_populate_rejects_preexisting_key() {
        let root = FakeRoot { search: None };
        let publish = roots_of(&[]);
        let c = DiscoveryContribution {
            prefix: "/web/",
            json_sign_root: "",
            publish_roots: &publish,
            root: &root,
            signer: None,
        };
        let mut m = Map::new();
        m.insert("downloadHelper".to_string(), json!("/elsewhere/"));
        let err = c.populate(&mut m).await.unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::DuplicateKey {
                key: "downloadHelper".to_string()
            }
        );
    }
}
