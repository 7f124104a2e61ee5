//! Username-to-DN resolution.
//!
//! Operations that mutate an existing user first need its distinguished
//! name. That lookup is a trait so callers can substitute the strategy,
//! e.g. to run against fixed names in tests instead of a live directory.

use async_trait::async_trait;
use ldapadm_core::Error;
use std::collections::HashMap;
use tracing::debug;

use crate::client::{escape_filter_value, LdapSession, SearchScope};
use crate::dn::DistinguishedName;
use crate::Result;

const DN_ONLY: &[&str] = &["dn"];

/// Resolves a username to the distinguished name of its directory entry.
#[async_trait]
pub trait UserDnResolver: Send + Sync {
    /// Resolves `username` over the given session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no entry matches.
    async fn resolve(
        &self,
        session: &mut dyn LdapSession,
        username: &str,
    ) -> Result<DistinguishedName>;
}

/// Production resolver: exact `uid` match over the whole subtree under the
/// base DN. When several entries share a username the first match wins.
pub struct SubtreeUserDnResolver {
    base_dn: DistinguishedName,
}

impl SubtreeUserDnResolver {
    /// Creates a resolver searching under `base_dn`.
    #[must_use]
    pub const fn new(base_dn: DistinguishedName) -> Self {
        Self { base_dn }
    }
}

#[async_trait]
impl UserDnResolver for SubtreeUserDnResolver {
    async fn resolve(
        &self,
        session: &mut dyn LdapSession,
        username: &str,
    ) -> Result<DistinguishedName> {
        let filter = format!("(uid={})", escape_filter_value(username));
        debug!(filter, "resolving user DN");
        let entries = session
            .search(self.base_dn.as_str(), SearchScope::Subtree, &filter, DN_ONLY)
            .await?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("user `{username}` not found")))?;
        Ok(DistinguishedName::parse(&entry.dn)?)
    }
}

/// Resolver backed by a fixed username-to-DN map; performs no directory
/// round-trip. Useful in tests and wherever entry names are known ahead of
/// time.
pub struct StaticUserDnResolver {
    entries: HashMap<String, DistinguishedName>,
}

impl StaticUserDnResolver {
    /// Creates a resolver over the given username/DN pairs.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (String, DistinguishedName)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

#[async_trait]
impl UserDnResolver for StaticUserDnResolver {
    async fn resolve(
        &self,
        _session: &mut dyn LdapSession,
        username: &str,
    ) -> Result<DistinguishedName> {
        self.entries
            .get(username)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("user `{username}` not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LdapEntry, MockLdapSession};
    use std::collections::HashMap as AttrMap;

    fn entry(dn: &str) -> LdapEntry {
        LdapEntry {
            dn: dn.to_string(),
            attributes: AttrMap::new(),
        }
    }

    fn base_dn() -> DistinguishedName {
        DistinguishedName::parse("dc=example,dc=com").unwrap()
    }

    #[tokio::test]
    async fn resolves_first_match() {
        let mut session = MockLdapSession::new();
        session.expect_search().returning(|_, _, _, _| {
            Ok(vec![
                entry("uid=jdoe,ou=People,dc=example,dc=com"),
                entry("uid=jdoe,ou=Service,dc=example,dc=com"),
            ])
        });

        let resolver = SubtreeUserDnResolver::new(base_dn());
        let dn = resolver.resolve(&mut session, "jdoe").await.unwrap();
        assert_eq!(dn.as_str(), "uid=jdoe,ou=People,dc=example,dc=com");
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let mut session = MockLdapSession::new();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));

        let resolver = SubtreeUserDnResolver::new(base_dn());
        let err = resolver.resolve(&mut session, "ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn filter_escapes_special_characters() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|_, _, filter, _| filter == "(uid=jd\\2aoe)")
            .returning(|_, _, _, _| Ok(vec![entry("uid=x,dc=example,dc=com")]));

        let resolver = SubtreeUserDnResolver::new(base_dn());
        resolver.resolve(&mut session, "jd*oe").await.unwrap();
    }

    #[tokio::test]
    async fn static_resolver_returns_fixed_names() {
        let dn = DistinguishedName::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        let resolver =
            StaticUserDnResolver::new([("jdoe".to_string(), dn.clone())]);

        let mut session = MockLdapSession::new();
        let resolved = resolver.resolve(&mut session, "jdoe").await.unwrap();
        assert_eq!(resolved, dn);

        let err = resolver.resolve(&mut session, "ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
