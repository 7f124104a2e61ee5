//! Group representation for membership operations and the OU search.

use serde::{Deserialize, Serialize};

use crate::dn::DistinguishedName;

/// A group entry with its member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Distinguished name of the group entry.
    pub dn: DistinguishedName,
    /// Group name (the `cn` attribute).
    pub name: String,
    /// Distinguished names of the group's members.
    #[serde(default)]
    pub members: Vec<DistinguishedName>,
}

impl Group {
    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns true when `member_dn` appears in the member list.
    #[must_use]
    pub fn has_member(&self, member_dn: &DistinguishedName) -> bool {
        self.members.iter().any(|dn| dn == member_dn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_checks() {
        let member = DistinguishedName::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        let group = Group {
            dn: DistinguishedName::parse("cn=admins,ou=Groups,dc=example,dc=com").unwrap(),
            name: "admins".to_string(),
            members: vec![member.clone()],
        };

        assert_eq!(group.member_count(), 1);
        assert!(group.has_member(&member));
        assert!(!group.has_member(
            &DistinguishedName::parse("uid=other,ou=People,dc=example,dc=com").unwrap()
        ));
    }
}
