//! User representations for directory operations.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::dn::DistinguishedName;

/// Object classes assigned to every created user entry.
pub(crate) const USER_OBJECT_CLASSES: &[&str] =
    &["inetOrgPerson", "person", "organizationalPerson", "top"];

/// Parameters for a user entry about to be created.
///
/// Exists only as request input: the common name is the username, the mail
/// address is derived from the configured domain, and the surname doubles
/// as display and given name.
#[derive(Debug, Clone)]
pub struct NewUser {
    username: String,
    password: SecretString,
    surname: String,
}

impl NewUser {
    /// Creates the request parameters for a new account.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        surname: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password,
            surname: surname.into(),
        }
    }

    /// Login name; also used as the entry's `uid` and `cn`.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Cleartext password; hashed before it is sent anywhere.
    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }

    /// Surname; also stored as display and given name.
    #[must_use]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    /// Mail address derived from the configured domain.
    #[must_use]
    pub fn mail(&self, mail_domain: &str) -> String {
        format!("{}@{mail_domain}", self.username)
    }

    /// Assembles the attribute list for the add request.
    #[must_use]
    pub(crate) fn entry_attributes(
        &self,
        mail_domain: &str,
        password_hash: String,
    ) -> Vec<(String, Vec<String>)> {
        let string_values =
            |values: &[&str]| values.iter().map(ToString::to_string).collect::<Vec<_>>();
        vec![
            ("objectClass".to_string(), string_values(USER_OBJECT_CLASSES)),
            ("userPassword".to_string(), vec![password_hash]),
            ("sn".to_string(), vec![self.surname.clone()]),
            ("cn".to_string(), vec![self.username.clone()]),
            ("uid".to_string(), vec![self.username.clone()]),
            ("mail".to_string(), vec![self.mail(mail_domain)]),
            ("displayname".to_string(), vec![self.surname.clone()]),
            ("givenname".to_string(), vec![self.surname.clone()]),
        ]
    }
}

/// Profile returned by the user search: the attributes the search command
/// retrieves and prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Distinguished name of the entry.
    pub dn: DistinguishedName,
    /// Common name.
    #[serde(default)]
    pub cn: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Mail address.
    #[serde(default)]
    pub mail: Option<String>,
    /// All values of the multi-valued `title` attribute, in server order.
    #[serde(default)]
    pub titles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> NewUser {
        NewUser::new("jdoe", SecretString::from("hunter2".to_string()), "Doe")
    }

    #[test]
    fn derives_mail_and_cn() {
        let user = sample_user();
        assert_eq!(user.mail("example.com"), "jdoe@example.com");
        assert_eq!(user.username(), "jdoe");
        assert_eq!(user.surname(), "Doe");
    }

    #[test]
    fn entry_attributes_cover_the_schema() {
        let user = sample_user();
        let attributes = user.entry_attributes("example.com", "{SHA}digest".to_string());
        let lookup = |name: &str| {
            attributes
                .iter()
                .find(|(attr, _)| attr == name)
                .map(|(_, values)| values.clone())
                .unwrap()
        };

        assert_eq!(
            lookup("objectClass"),
            vec!["inetOrgPerson", "person", "organizationalPerson", "top"]
        );
        assert_eq!(lookup("userPassword"), vec!["{SHA}digest"]);
        assert_eq!(lookup("uid"), vec!["jdoe"]);
        assert_eq!(lookup("cn"), vec!["jdoe"]);
        assert_eq!(lookup("sn"), vec!["Doe"]);
        assert_eq!(lookup("displayname"), vec!["Doe"]);
        assert_eq!(lookup("givenname"), vec!["Doe"]);
        assert_eq!(lookup("mail"), vec!["jdoe@example.com"]);
    }

    #[test]
    fn debug_output_redacts_password() {
        let debug = format!("{:?}", sample_user());
        assert!(!debug.contains("hunter2"));
    }
}
