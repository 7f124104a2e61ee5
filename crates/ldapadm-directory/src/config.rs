//! Client configuration derived from the shared settings document.

use crate::dn::DistinguishedName;
use crate::Result;
use ldapadm_core::Settings;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Configuration for connecting to and addressing the directory.
///
/// Built from [`Settings`] once per invocation; the OU bases are composed
/// onto the base DN here so every operation works with parsed names.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    url: String,
    bind_dn: String,
    bind_password: SecretString,
    base_dn: DistinguishedName,
    user_base_dn: DistinguishedName,
    group_base_dn: DistinguishedName,
    mail_domain: String,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Builds a directory configuration from the shared settings document.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory URL does not parse or when the
    /// base DN or an OU fragment is malformed.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Url::parse(&settings.ldap_url)?;

        let base_dn = DistinguishedName::parse(&settings.ldap_base_dn)?;
        let user_base_dn = DistinguishedName::parse(&settings.user_ou)?.append(&base_dn);
        let group_base_dn = DistinguishedName::parse(&settings.group_ou)?.append(&base_dn);

        Ok(Self {
            url: settings.ldap_url.clone(),
            bind_dn: settings.admin_dn.clone(),
            bind_password: settings.admin_pass.clone(),
            base_dn,
            user_base_dn,
            group_base_dn,
            mail_domain: settings.domain_mail.clone(),
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        })
    }

    /// Directory endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Administrator bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Administrator bind secret.
    #[must_use]
    pub const fn bind_password(&self) -> &SecretString {
        &self.bind_password
    }

    /// Base distinguished name of the whole tree.
    #[must_use]
    pub const fn base_dn(&self) -> &DistinguishedName {
        &self.base_dn
    }

    /// Base DN user entries are created under.
    #[must_use]
    pub const fn user_base_dn(&self) -> &DistinguishedName {
        &self.user_base_dn
    }

    /// Base DN group entries live under.
    #[must_use]
    pub const fn group_base_dn(&self) -> &DistinguishedName {
        &self.group_base_dn
    }

    /// Mail domain for derived addresses.
    #[must_use]
    pub fn mail_domain(&self) -> &str {
        &self.mail_domain
    }

    /// Whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Connection timeout.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Per-request operation timeout.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets a custom CA certificate for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}
