//! Directory client and the command operations built on it.

use crate::{
    config::DirectoryConfig,
    dn::DistinguishedName,
    group::Group,
    hash,
    lookup::{SubtreeUserDnResolver, UserDnResolver},
    user::{NewUser, UserProfile},
    Result,
};
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry, SearchResult};
use ldapadm_core::Error;
use native_tls::{Certificate, TlsConnector};
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

const DN_ONLY: &[&str] = &["dn"];
const PROFILE_ATTRIBUTES: &[&str] = &["cn", "displayName", "mail", "title"];
const GROUP_ATTRIBUTES: &[&str] = &["cn", "member"];

const USER_FILTER_CLASS: &str = "inetOrgPerson";
const GROUP_FILTER_CLASS: &str = "groupOfNames";

// LDAP result codes the error taxonomy distinguishes.
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// LDAP entry representation used by the client.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserve server order).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .get(attribute)
            .map(|values| values.as_slice())
    }
}

/// LDAP modification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryModification {
    /// Add attribute values.
    Add {
        /// Attribute to modify.
        attribute: String,
        /// Values to add.
        values: Vec<String>,
    },
    /// Delete attribute values.
    Delete {
        /// Attribute to modify.
        attribute: String,
        /// Values to delete (empty removes the attribute).
        values: Vec<String>,
    },
    /// Replace attribute values.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values.
        values: Vec<String>,
    },
}

/// One bound-or-bindable protocol session against the directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapSession: Send {
    /// Performs a simple bind as `dn`.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    /// Runs a search and collects all result entries.
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>>;
    /// Adds a new entry with the given attributes.
    async fn add(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> Result<()>;
    /// Applies attribute modifications to an entry.
    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()>;
    /// Deletes an entry.
    async fn delete(&mut self, dn: &str) -> Result<()>;
    /// Ends the session.
    async fn unbind(&mut self) -> Result<()>;
}

/// Opens protocol sessions; the seam the tests replace.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapConnector: Send + Sync {
    /// Opens a fresh, not-yet-bound session.
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Directory client with pluggable connection and lookup backends.
///
/// Every public operation performs one bind-then-operate-then-unbind cycle
/// on a fresh session; nothing is cached or retried across calls.
pub struct DirectoryClient {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
    resolver: Box<dyn UserDnResolver>,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Creates a client that connects with the real LDAP backend and
    /// resolves usernames by subtree search.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        let resolver: Box<dyn UserDnResolver> =
            Box::new(SubtreeUserDnResolver::new(config.base_dn().clone()));
        Self {
            config,
            connector,
            resolver,
        }
    }

    /// Substitutes the username-to-DN resolution strategy.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Box<dyn UserDnResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_connector(config: DirectoryConfig, connector: Box<dyn LdapConnector>) -> Self {
        let config = Arc::new(config);
        let resolver: Box<dyn UserDnResolver> =
            Box::new(SubtreeUserDnResolver::new(config.base_dn().clone()));
        Self {
            config,
            connector,
            resolver,
        }
    }

    /// Creates a user entry under the user OU.
    ///
    /// The entry DN is `uid=<username>,<userOU>,<baseDN>`; the password is
    /// stored in the legacy `{SHA}` form. Not idempotent: creating the same
    /// username twice fails with [`Error::AlreadyExists`].
    ///
    /// # Errors
    ///
    /// Fails on connection, bind, or add failure, or when the entry exists.
    pub async fn create_user(&self, user: &NewUser) -> Result<DistinguishedName> {
        let dn = self.config.user_base_dn().child("uid", user.username());
        let password_hash = hash::sha1_userpassword(user.password().expose_secret());
        let attributes = user.entry_attributes(self.config.mail_domain(), password_hash);

        debug!(dn = dn.as_str(), "creating user entry");
        let mut session = self.admin_session().await?;
        session.add(dn.as_str(), attributes).await?;
        session.unbind().await?;
        Ok(dn)
    }

    /// Deletes the user entry matching `username`.
    ///
    /// The entry is looked up by exact `uid` match over the whole base
    /// subtree; when several entries share the username the first match is
    /// deleted. Group memberships are not cleaned up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no entry matches.
    pub async fn delete_user(&self, username: &str) -> Result<DistinguishedName> {
        let filter = format!("(uid={})", escape_filter_value(username));
        let mut session = self.admin_session().await?;
        let entries = session
            .search(
                self.config.base_dn().as_str(),
                SearchScope::Subtree,
                &filter,
                DN_ONLY,
            )
            .await?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("user `{username}` not found")))?;

        debug!(dn = entry.dn.as_str(), "deleting user entry");
        session.delete(&entry.dn).await?;
        session.unbind().await?;
        Ok(DistinguishedName::parse(&entry.dn)?)
    }

    /// Replaces the user's `userPassword` attribute with the hash of
    /// `new_password`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the username does not resolve.
    pub async fn change_password(
        &self,
        username: &str,
        new_password: &SecretString,
    ) -> Result<()> {
        let mut session = self.admin_session().await?;
        let dn = self.resolver.resolve(&mut *session, username).await?;
        let password_hash = hash::sha1_userpassword(new_password.expose_secret());

        session
            .modify(
                dn.as_str(),
                &[DirectoryModification::Replace {
                    attribute: "userPassword".to_string(),
                    values: vec![password_hash],
                }],
            )
            .await?;
        session.unbind().await?;
        Ok(())
    }

    /// Appends values to a named attribute on the user entry.
    ///
    /// Values for the `title` attribute are rewritten into group-style DNs
    /// (`cn=<value>,<groupOU>,<baseDN>`) before being stored; every other
    /// attribute stores its values verbatim. An empty value list is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the username does not resolve.
    pub async fn add_user_attribute(
        &self,
        username: &str,
        attribute: &str,
        values: &[String],
    ) -> Result<()> {
        if values.is_empty() {
            debug!(username, attribute, "no values given, nothing to do");
            return Ok(());
        }

        let values = if attribute == "title" {
            values
                .iter()
                .map(|value| self.group_dn(value).into())
                .collect()
        } else {
            values.to_vec()
        };

        let mut session = self.admin_session().await?;
        let dn = self.resolver.resolve(&mut *session, username).await?;
        session
            .modify(
                dn.as_str(),
                &[DirectoryModification::Add {
                    attribute: attribute.to_string(),
                    values,
                }],
            )
            .await?;
        session.unbind().await?;
        Ok(())
    }

    /// Adds the user to each named group by appending its DN to the group's
    /// `member` attribute.
    ///
    /// Groups are updated with independent sequential requests: the first
    /// failure aborts and names the failing group, leaving groups updated
    /// so far modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unresolvable username or a
    /// missing group.
    pub async fn add_user_to_groups(&self, username: &str, groups: &[String]) -> Result<()> {
        let mut session = self.admin_session().await?;
        let user_dn = self.resolver.resolve(&mut *session, username).await?;

        for group in groups {
            let group_dn = self.group_dn(group);
            debug!(group = group.as_str(), "adding member");
            session
                .modify(
                    group_dn.as_str(),
                    &[DirectoryModification::Add {
                        attribute: "member".to_string(),
                        values: vec![user_dn.to_string()],
                    }],
                )
                .await
                .map_err(|err| name_failing_group(group, err))?;
        }

        session.unbind().await?;
        Ok(())
    }

    /// Removes the user's DN from the named group's `member` attribute.
    ///
    /// The user and group are both resolved first, and membership is
    /// verified before anything is modified: removing a user that is not a
    /// member fails with [`Error::NotMember`] and performs no mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing user or group and
    /// [`Error::NotMember`] when the user is not in the group.
    pub async fn remove_user_from_group(&self, username: &str, group: &str) -> Result<()> {
        let mut session = self.admin_session().await?;

        let user_filter = format!(
            "(&(objectClass={USER_FILTER_CLASS})(uid={}))",
            escape_filter_value(username)
        );
        let user_entry = session
            .search(
                self.config.base_dn().as_str(),
                SearchScope::Subtree,
                &user_filter,
                DN_ONLY,
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("user `{username}` not found")))?;
        let user_dn = DistinguishedName::parse(&user_entry.dn)?;

        let group_filter = format!(
            "(&(objectClass={GROUP_FILTER_CLASS})(cn={}))",
            escape_filter_value(group)
        );
        let group_entry = session
            .search(
                self.config.group_base_dn().as_str(),
                SearchScope::Subtree,
                &group_filter,
                GROUP_ATTRIBUTES,
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("group `{group}` not found")))?;

        let is_member = group_entry
            .values("member")
            .unwrap_or_default()
            .iter()
            .any(|member| match DistinguishedName::parse(member) {
                Ok(member_dn) => member_dn == user_dn,
                Err(_) => member == user_dn.as_str(),
            });
        if !is_member {
            return Err(Error::NotMember {
                user: username.to_string(),
                group: group.to_string(),
            });
        }

        session
            .modify(
                &group_entry.dn,
                &[DirectoryModification::Delete {
                    attribute: "member".to_string(),
                    values: vec![user_dn.to_string()],
                }],
            )
            .await?;
        session.unbind().await?;
        Ok(())
    }

    /// Fetches the profile of the user matching `username`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no entry matches.
    pub async fn find_user(&self, username: &str) -> Result<UserProfile> {
        let filter = format!("(uid={})", escape_filter_value(username));
        let mut session = self.admin_session().await?;
        let entries = session
            .search(
                self.config.base_dn().as_str(),
                SearchScope::Subtree,
                &filter,
                PROFILE_ATTRIBUTES,
            )
            .await?;
        session.unbind().await?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("user `{username}` not found")))?;
        parse_user_profile(&entry)
    }

    /// Lists the names of every group-class entry under the base DN.
    ///
    /// An empty directory yields an empty listing, not an error.
    pub async fn list_groups(&self) -> Result<Vec<String>> {
        let filter = format!("(objectClass={GROUP_FILTER_CLASS})");
        let mut session = self.admin_session().await?;
        let entries = session
            .search(
                self.config.base_dn().as_str(),
                SearchScope::Subtree,
                &filter,
                &["cn"],
            )
            .await?;
        session.unbind().await?;

        Ok(entries
            .iter()
            .filter_map(|entry| entry.first("cn").map(str::to_owned))
            .collect())
    }

    /// Fetches the named group and its member list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no group with that name exists
    /// under the group OU.
    pub async fn group_members(&self, name: &str) -> Result<Group> {
        let filter = format!(
            "(&(objectClass={GROUP_FILTER_CLASS})(cn={}))",
            escape_filter_value(name)
        );
        let mut session = self.admin_session().await?;
        let entries = session
            .search(
                self.config.group_base_dn().as_str(),
                SearchScope::Subtree,
                &filter,
                GROUP_ATTRIBUTES,
            )
            .await?;
        session.unbind().await?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("group `{name}` not found")))?;
        parse_group_entry(&entry)
    }

    fn group_dn(&self, name: &str) -> DistinguishedName {
        self.config.group_base_dn().child("cn", name)
    }

    async fn admin_session(&self) -> Result<Box<dyn LdapSession>> {
        let mut session = self.connector.connect().await?;
        session
            .simple_bind(
                self.config.bind_dn(),
                self.config.bind_password().expose_secret(),
            )
            .await?;
        Ok(session)
    }
}

/// Rewrites a membership-update error so it names the failing group; groups
/// updated before it stay modified.
fn name_failing_group(group: &str, err: Error) -> Error {
    match err {
        Error::NotFound(_) => Error::NotFound(format!("group `{group}` not found")),
        Error::Operation { message, .. } => Error::Operation {
            operation: format!("add member to group `{group}`"),
            message,
        },
        other => other,
    }
}

fn parse_user_profile(entry: &LdapEntry) -> Result<UserProfile> {
    Ok(UserProfile {
        dn: DistinguishedName::parse(&entry.dn)?,
        cn: entry.first("cn").map(str::to_owned),
        display_name: entry.first("displayName").map(str::to_owned),
        mail: entry.first("mail").map(str::to_owned),
        titles: entry
            .values("title")
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
    })
}

fn parse_group_entry(entry: &LdapEntry) -> Result<Group> {
    let dn = DistinguishedName::parse(&entry.dn)?;
    let name = entry
        .first("cn")
        .ok_or_else(|| Error::InvalidRequest(format!("group entry `{}` has no cn", entry.dn)))?
        .to_string();

    let members = entry
        .values("member")
        .unwrap_or_default()
        .iter()
        .filter_map(|raw| match DistinguishedName::parse(raw) {
            Ok(member_dn) => Some(member_dn),
            Err(err) => {
                warn!("skipping unparseable member DN `{raw}`: {err}");
                None
            }
        })
        .collect();

    Ok(Group { dn, name, members })
}

/// Escapes a value for interpolation into an RFC 4515 search filter.
pub(crate) fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Real LDAP connector backed by `ldap3`.
struct RealLdapConnector {
    config: Arc<DirectoryConfig>,
}

impl RealLdapConnector {
    fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(&self.config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

/// Applies the operation timeout and maps library errors onto the taxonomy.
async fn bounded<F, T>(operation_timeout: Duration, what: &str, fut: F) -> Result<T>
where
    F: std::future::Future<Output = ldap3::result::Result<T>>,
{
    timeout(operation_timeout, fut)
        .await
        .map_err(|_| Error::Timeout(format!("directory {what} timed out")))?
        .map_err(|err| Error::Operation {
            operation: what.to_string(),
            message: err.to_string(),
        })
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = timeout(self.operation_timeout, self.inner.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout("directory bind timed out".to_string()))?
            .map_err(|err| Error::Connection(err.to_string()))?;
        if result.rc != 0 {
            return Err(Error::Connection(format!(
                "bind as `{dn}` failed: {} (rc={})",
                result.text, result.rc
            )));
        }
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let operation_timeout = self.operation_timeout;
        let search = self
            .inner
            .search(base_dn, scope.into(), filter, attributes.to_vec());
        let SearchResult(entries, result) = bounded(operation_timeout, "search", search).await?;
        check_result(&result, "search", base_dn)?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn add(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> Result<()> {
        let attributes: Vec<(String, HashSet<String>)> = attributes
            .into_iter()
            .map(|(attribute, values)| (attribute, values.into_iter().collect()))
            .collect();

        let operation_timeout = self.operation_timeout;
        let add = self.inner.add(dn, attributes);
        let result = bounded(operation_timeout, "add", add).await?;
        check_result(&result, "add", dn)
    }

    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        let mods: Vec<Mod<String>> = modifications
            .iter()
            .map(|modification| match modification {
                DirectoryModification::Add { attribute, values } => Mod::Add(
                    attribute.clone(),
                    values.iter().cloned().collect::<HashSet<_>>(),
                ),
                DirectoryModification::Delete { attribute, values } => Mod::Delete(
                    attribute.clone(),
                    values.iter().cloned().collect::<HashSet<_>>(),
                ),
                DirectoryModification::Replace { attribute, values } => Mod::Replace(
                    attribute.clone(),
                    values.iter().cloned().collect::<HashSet<_>>(),
                ),
            })
            .collect();

        let operation_timeout = self.operation_timeout;
        let modify = self.inner.modify(dn, mods);
        let result = bounded(operation_timeout, "modify", modify).await?;
        check_result(&result, "modify", dn)
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        let operation_timeout = self.operation_timeout;
        let delete = self.inner.delete(dn);
        let result = bounded(operation_timeout, "delete", delete).await?;
        check_result(&result, "delete", dn)
    }

    async fn unbind(&mut self) -> Result<()> {
        let operation_timeout = self.operation_timeout;
        let unbind = self.inner.unbind();
        bounded(operation_timeout, "unbind", unbind).await
    }
}

/// Maps an LDAP result code onto the error taxonomy.
fn check_result(result: &ldap3::LdapResult, operation: &str, target: &str) -> Result<()> {
    match result.rc {
        0 => Ok(()),
        RC_NO_SUCH_OBJECT => Err(Error::NotFound(format!("no such entry: {target}"))),
        RC_ENTRY_ALREADY_EXISTS => Err(Error::AlreadyExists(target.to_string())),
        rc => Err(Error::Operation {
            operation: format!("{operation} {target}"),
            message: format!("{} (rc={rc})", result.text),
        }),
    }
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connection_timeout());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| Error::Config(format!("failed to construct TLS connector: {err}")))?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::Config(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::Config(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::Config(format!("failed to load CA certificate: {err}")))?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::StaticUserDnResolver;
    use ldapadm_core::Settings;

    const USER_DN: &str = "uid=jdoe,ou=People,dc=example,dc=com";

    fn sample_config() -> DirectoryConfig {
        let settings = Settings::from_json(
            r#"{
                "ldapBaseDN": "dc=example,dc=com",
                "adminDN": "cn=admin,dc=example,dc=com",
                "adminPass": "secret",
                "ldapURL": "ldap://directory.example.com:389",
                "userOU": "ou=People",
                "groupOU": "ou=Groups",
                "domainMail": "example.com"
            }"#,
        )
        .unwrap();
        DirectoryConfig::from_settings(&settings).unwrap()
    }

    fn entry(dn: &str, attributes: &[(&str, &[&str])]) -> LdapEntry {
        LdapEntry {
            dn: dn.to_string(),
            attributes: attributes
                .iter()
                .map(|(attribute, values)| {
                    (
                        (*attribute).to_string(),
                        values.iter().map(|v| (*v).to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    fn bindable_session() -> MockLdapSession {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, password| dn == "cn=admin,dc=example,dc=com" && password == "secret")
            .returning(|_, _| Ok(()));
        session.expect_unbind().returning(|| Ok(()));
        session
    }

    fn client_with(session: MockLdapSession) -> DirectoryClient {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session)));
        DirectoryClient::with_connector(sample_config(), Box::new(connector))
    }

    fn jdoe_resolver() -> Box<StaticUserDnResolver> {
        Box::new(StaticUserDnResolver::new([(
            "jdoe".to_string(),
            DistinguishedName::parse(USER_DN).unwrap(),
        )]))
    }

    fn new_user() -> NewUser {
        NewUser::new("jdoe", SecretString::from("password".to_string()), "Doe")
    }

    #[tokio::test]
    async fn create_user_sends_expected_entry() {
        let mut session = bindable_session();
        session
            .expect_add()
            .withf(|dn, attributes| {
                let has = |name: &str, value: &str| {
                    attributes
                        .iter()
                        .any(|(attr, values)| attr == name && values.contains(&value.to_string()))
                };
                dn == USER_DN
                    && has("uid", "jdoe")
                    && has("cn", "jdoe")
                    && has("sn", "Doe")
                    && has("displayname", "Doe")
                    && has("givenname", "Doe")
                    && has("mail", "jdoe@example.com")
                    && has("userPassword", "{SHA}W6ph5Mm5Pz8GgiULbPgzG37mj9g=")
                    && has("objectClass", "inetOrgPerson")
            })
            .returning(|_, _| Ok(()));

        let client = client_with(session);
        let dn = client.create_user(&new_user()).await.unwrap();
        assert_eq!(dn.as_str(), USER_DN);
    }

    #[tokio::test]
    async fn create_user_duplicate_is_already_exists() {
        let mut session = bindable_session();
        session
            .expect_add()
            .returning(|dn, _| Err(Error::AlreadyExists(dn.to_string())));

        let client = client_with(session);
        let err = client.create_user(&new_user()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn delete_user_removes_first_match() {
        let mut session = bindable_session();
        session.expect_search().returning(|_, _, _, _| {
            Ok(vec![
                entry(USER_DN, &[]),
                entry("uid=jdoe,ou=Service,dc=example,dc=com", &[]),
            ])
        });
        session
            .expect_delete()
            .withf(|dn| dn == USER_DN)
            .times(1)
            .returning(|_| Ok(()));

        let client = client_with(session);
        let dn = client.delete_user("jdoe").await.unwrap();
        assert_eq!(dn.as_str(), USER_DN);
    }

    #[tokio::test]
    async fn delete_unknown_user_is_not_found() {
        let mut session = bindable_session();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));
        session.expect_delete().times(0);

        let client = client_with(session);
        let err = client.delete_user("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn change_password_replaces_hashed_credential() {
        let mut session = bindable_session();
        session
            .expect_modify()
            .withf(|dn, modifications| {
                dn == USER_DN
                    && modifications
                        == [DirectoryModification::Replace {
                            attribute: "userPassword".to_string(),
                            values: vec!["{SHA}W6ph5Mm5Pz8GgiULbPgzG37mj9g=".to_string()],
                        }]
            })
            .returning(|_, _| Ok(()));

        let client = client_with(session).with_resolver(jdoe_resolver());
        client
            .change_password("jdoe", &SecretString::from("password".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn title_values_become_group_dns() {
        let mut session = bindable_session();
        session
            .expect_modify()
            .withf(|dn, modifications| {
                dn == USER_DN
                    && modifications
                        == [DirectoryModification::Add {
                            attribute: "title".to_string(),
                            values: vec!["cn=Engineer,ou=Groups,dc=example,dc=com".to_string()],
                        }]
            })
            .returning(|_, _| Ok(()));

        let client = client_with(session).with_resolver(jdoe_resolver());
        client
            .add_user_attribute("jdoe", "title", &["Engineer".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn other_attributes_store_values_verbatim() {
        let mut session = bindable_session();
        session
            .expect_modify()
            .withf(|_, modifications| {
                modifications
                    == [DirectoryModification::Add {
                        attribute: "mobile".to_string(),
                        values: vec!["+1-555-0100".to_string(), "+1-555-0101".to_string()],
                    }]
            })
            .returning(|_, _| Ok(()));

        let client = client_with(session).with_resolver(jdoe_resolver());
        client
            .add_user_attribute(
                "jdoe",
                "mobile",
                &["+1-555-0100".to_string(), "+1-555-0101".to_string()],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn add_to_groups_updates_each_group() {
        let mut session = bindable_session();
        for group_dn in [
            "cn=devs,ou=Groups,dc=example,dc=com",
            "cn=ops,ou=Groups,dc=example,dc=com",
        ] {
            session
                .expect_modify()
                .withf(move |dn, modifications| {
                    dn == group_dn
                        && modifications
                            == [DirectoryModification::Add {
                                attribute: "member".to_string(),
                                values: vec![USER_DN.to_string()],
                            }]
                })
                .times(1)
                .returning(|_, _| Ok(()));
        }

        let client = client_with(session).with_resolver(jdoe_resolver());
        client
            .add_user_to_groups("jdoe", &["devs".to_string(), "ops".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn group_add_failure_names_the_failing_group() {
        let mut session = bindable_session();
        session
            .expect_modify()
            .withf(|dn, _| dn == "cn=devs,ou=Groups,dc=example,dc=com")
            .times(1)
            .returning(|_, _| Ok(()));
        session
            .expect_modify()
            .withf(|dn, _| dn == "cn=missing,ou=Groups,dc=example,dc=com")
            .times(1)
            .returning(|dn, _| Err(Error::NotFound(format!("no such entry: {dn}"))));

        let client = client_with(session).with_resolver(jdoe_resolver());
        let err = client
            .add_user_to_groups("jdoe", &["devs".to_string(), "missing".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotFound("group `missing` not found".to_string()));
    }

    #[tokio::test]
    async fn remove_from_group_deletes_member_value() {
        let mut session = bindable_session();
        session
            .expect_search()
            .withf(|_, _, filter, _| filter.contains("inetOrgPerson"))
            .returning(|_, _, _, _| Ok(vec![entry(USER_DN, &[])]));
        session
            .expect_search()
            .withf(|base, _, filter, _| {
                base == "ou=Groups,dc=example,dc=com" && filter.contains("groupOfNames")
            })
            .returning(|_, _, _, _| {
                Ok(vec![entry(
                    "cn=devs,ou=Groups,dc=example,dc=com",
                    &[(
                        "member",
                        &[USER_DN, "uid=other,ou=People,dc=example,dc=com"],
                    )],
                )])
            });
        session
            .expect_modify()
            .withf(|dn, modifications| {
                dn == "cn=devs,ou=Groups,dc=example,dc=com"
                    && modifications
                        == [DirectoryModification::Delete {
                            attribute: "member".to_string(),
                            values: vec![USER_DN.to_string()],
                        }]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let client = client_with(session);
        client.remove_user_from_group("jdoe", "devs").await.unwrap();
    }

    #[tokio::test]
    async fn remove_nonmember_fails_without_mutation() {
        let mut session = bindable_session();
        session
            .expect_search()
            .withf(|_, _, filter, _| filter.contains("inetOrgPerson"))
            .returning(|_, _, _, _| Ok(vec![entry(USER_DN, &[])]));
        session
            .expect_search()
            .withf(|_, _, filter, _| filter.contains("groupOfNames"))
            .returning(|_, _, _, _| {
                Ok(vec![entry(
                    "cn=devs,ou=Groups,dc=example,dc=com",
                    &[("member", &["uid=other,ou=People,dc=example,dc=com"])],
                )])
            });
        session.expect_modify().times(0);

        let client = client_with(session);
        let err = client
            .remove_user_from_group("jdoe", "devs")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotMember { .. }));
    }

    #[tokio::test]
    async fn find_user_parses_profile() {
        let mut session = bindable_session();
        session.expect_search().returning(|_, _, _, _| {
            Ok(vec![entry(
                USER_DN,
                &[
                    ("cn", &["jdoe"]),
                    ("displayName", &["Doe"]),
                    ("mail", &["jdoe@example.com"]),
                    (
                        "title",
                        &[
                            "cn=Engineer,ou=Groups,dc=example,dc=com",
                            "cn=Lead,ou=Groups,dc=example,dc=com",
                        ],
                    ),
                ],
            )])
        });

        let client = client_with(session);
        let profile = client.find_user("jdoe").await.unwrap();
        assert_eq!(profile.dn.as_str(), USER_DN);
        assert_eq!(profile.cn.as_deref(), Some("jdoe"));
        assert_eq!(profile.display_name.as_deref(), Some("Doe"));
        assert_eq!(profile.mail.as_deref(), Some("jdoe@example.com"));
        assert_eq!(
            profile.titles,
            vec![
                "cn=Engineer,ou=Groups,dc=example,dc=com",
                "cn=Lead,ou=Groups,dc=example,dc=com"
            ]
        );
    }

    #[tokio::test]
    async fn find_unknown_user_is_not_found() {
        let mut session = bindable_session();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));

        let client = client_with(session);
        let err = client.find_user("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn list_groups_collects_names() {
        let mut session = bindable_session();
        session
            .expect_search()
            .withf(|base, _, filter, _| {
                base == "dc=example,dc=com" && filter == "(objectClass=groupOfNames)"
            })
            .returning(|_, _, _, _| {
                Ok(vec![
                    entry("cn=devs,ou=Groups,dc=example,dc=com", &[("cn", &["devs"])]),
                    entry("cn=ops,ou=Groups,dc=example,dc=com", &[("cn", &["ops"])]),
                ])
            });

        let client = client_with(session);
        let names = client.list_groups().await.unwrap();
        assert_eq!(names, vec!["devs", "ops"]);
    }

    #[tokio::test]
    async fn empty_group_listing_is_not_an_error() {
        let mut session = bindable_session();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));

        let client = client_with(session);
        assert!(client.list_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn group_members_returns_member_list() {
        let mut session = bindable_session();
        session
            .expect_search()
            .withf(|base, _, filter, _| {
                base == "ou=Groups,dc=example,dc=com"
                    && filter == "(&(objectClass=groupOfNames)(cn=devs))"
            })
            .returning(|_, _, _, _| {
                Ok(vec![entry(
                    "cn=devs,ou=Groups,dc=example,dc=com",
                    &[("cn", &["devs"]), ("member", &[USER_DN])],
                )])
            });

        let client = client_with(session);
        let group = client.group_members("devs").await.unwrap();
        assert_eq!(group.name, "devs");
        assert_eq!(group.member_count(), 1);
        assert!(group.has_member(&DistinguishedName::parse(USER_DN).unwrap()));
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let mut session = bindable_session();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));

        let client = client_with(session);
        let err = client.group_members("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn filter_escaping_covers_metacharacters() {
        assert_eq!(escape_filter_value("plain"), "plain");
        assert_eq!(escape_filter_value("a*b"), "a\\2ab");
        assert_eq!(escape_filter_value("(uid=x)"), "\\28uid=x\\29");
        assert_eq!(escape_filter_value("back\\slash"), "back\\5cslash");
    }

    #[test]
    fn result_code_mapping() {
        let result = |rc| ldap3::LdapResult {
            rc,
            matched: String::new(),
            text: String::new(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        };
        assert!(check_result(&result(0), "add", "dn").is_ok());
        assert!(matches!(
            check_result(&result(RC_NO_SUCH_OBJECT), "modify", "dn"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            check_result(&result(RC_ENTRY_ALREADY_EXISTS), "add", "dn"),
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(
            check_result(&result(50), "modify", "dn"),
            Err(Error::Operation { .. })
        ));
    }
}
