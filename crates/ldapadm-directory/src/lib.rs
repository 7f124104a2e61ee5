//! Directory client for the ldapadm command-line tools.
//!
//! This crate wraps an LDAP directory behind a small typed client: entry
//! creation and removal, password and attribute changes, group membership,
//! and the user/OU searches the command-line tools expose.

#![deny(missing_docs)]

mod client;
mod config;
mod dn;
mod group;
pub mod hash;
mod lookup;
mod user;

pub use client::{
    DirectoryClient, DirectoryModification, LdapConnector, LdapEntry, LdapSession, SearchScope,
};
pub use config::{DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_OPERATION_TIMEOUT_SECS};
pub use dn::{DistinguishedName, DnError, Rdn};
pub use group::Group;
pub use lookup::{StaticUserDnResolver, SubtreeUserDnResolver, UserDnResolver};
pub use user::{NewUser, UserProfile};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = ldapadm_core::Result<T>;
