//! The shared settings document.
//!
//! Every command loads the same flat JSON document before opening a
//! directory connection. All fields are required strings with no defaults;
//! the loader only checks that the document parses and that the field-level
//! validation passes.

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use validator::Validate;

/// Settings shared by every directory-management command.
///
/// Loaded once per process invocation and threaded explicitly as a
/// parameter; immutable after load.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// Base distinguished name the directory tree lives under.
    #[serde(rename = "ldapBaseDN")]
    #[validate(length(min = 1))]
    pub ldap_base_dn: String,

    /// Administrator bind distinguished name.
    #[serde(rename = "adminDN")]
    #[validate(length(min = 1))]
    pub admin_dn: String,

    /// Administrator bind secret.
    #[serde(rename = "adminPass")]
    pub admin_pass: SecretString,

    /// Directory endpoint (`ldap://` or `ldaps://`).
    #[serde(rename = "ldapURL")]
    #[validate(url)]
    pub ldap_url: String,

    /// User organizational unit, relative to the base DN (e.g. `ou=People`).
    #[serde(rename = "userOU")]
    #[validate(length(min = 1))]
    pub user_ou: String,

    /// Group organizational unit, relative to the base DN.
    #[serde(rename = "groupOU")]
    #[validate(length(min = 1))]
    pub group_ou: String,

    /// Mail domain suffix used to derive addresses for new accounts.
    #[serde(rename = "domainMail")]
    #[validate(length(min = 1))]
    pub domain_mail: String,
}

impl Settings {
    /// Loads and validates the settings document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read, does not
    /// parse as JSON, or fails field validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            Error::Config(format!(
                "failed to read settings file {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates a settings document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on parse or validation failure.
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }
}
