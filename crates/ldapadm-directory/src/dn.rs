//! Distinguished-name handling for directory entries.
//!
//! Entry DNs are never assembled by raw string formatting: relative names
//! are composed onto a parsed base through [`DistinguishedName::child`] and
//! [`DistinguishedName::append`], which escape attribute values on the way
//! out. This keeps usernames and group names containing LDAP metacharacters
//! from corrupting the composed name.

use ldapadm_core::Error as CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component had no `=` separator.
    #[error("distinguished name component has no attribute separator: {0}")]
    MissingSeparator(String),
    /// A component had nothing left of the `=`.
    #[error("distinguished name component has an empty attribute: {0}")]
    EmptyAttribute(String),
    /// A component had nothing right of the `=`.
    #[error("distinguished name component has an empty value for attribute {0}")]
    EmptyValue(String),
    /// The distinguished name ended in the middle of an escape sequence.
    #[error("distinguished name ends with a dangling escape character")]
    TrailingEscape,
}

impl From<DnError> for CoreError {
    fn from(err: DnError) -> Self {
        CoreError::InvalidRequest(err.to_string())
    }
}

/// A single relative distinguished name: one `attribute=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Creates a relative distinguished name from an attribute and a raw
    /// (unescaped) value.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute name (e.g. `uid`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Unescaped attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if the RDN uses the given attribute name
    /// (case-insensitive).
    #[must_use]
    pub fn is(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape_value(&self.value))
    }
}

/// A parsed distinguished name.
///
/// Keeps the canonical rendered string alongside the individual RDNs.
/// Multi-valued RDNs (`+`-joined) are not treated specially; a literal `+`
/// stays part of the value, which matches every entry this tooling manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses a distinguished name.
    ///
    /// # Errors
    ///
    /// Returns [`DnError`] when the input is empty or a component is
    /// malformed.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DnError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(DnError::Empty);
        }

        let mut rdns = Vec::new();
        for component in split_components(input)? {
            rdns.push(parse_rdn(&component)?);
        }

        Ok(Self {
            raw: render(&rdns),
            rdns,
        })
    }

    /// Borrows the canonical rendered form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The RDNs in leftmost-first order.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The leftmost (entry-specific) RDN.
    #[must_use]
    pub fn first(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Value of the first RDN matching `attribute`, case-insensitive.
    #[must_use]
    pub fn value_of(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .find(|rdn| rdn.is(attribute))
            .map(Rdn::value)
    }

    /// Returns a new DN one level below this one: `attribute=value,<self>`.
    ///
    /// The value is taken raw and escaped when rendered.
    #[must_use]
    pub fn child(&self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(Rdn::new(attribute, value));
        rdns.extend(self.rdns.iter().cloned());
        Self {
            raw: render(&rdns),
            rdns,
        }
    }

    /// Returns a new DN with `suffix` appended: `<self>,<suffix>`.
    ///
    /// Used to place a relative name (such as an OU fragment) under a base.
    #[must_use]
    pub fn append(&self, suffix: &DistinguishedName) -> Self {
        let mut rdns = self.rdns.clone();
        rdns.extend(suffix.rdns.iter().cloned());
        Self {
            raw: render(&rdns),
            rdns,
        }
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for DistinguishedName {
    type Error = DnError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DistinguishedName> for String {
    fn from(dn: DistinguishedName) -> Self {
        dn.raw
    }
}

/// Splits the input on unescaped commas, keeping escape sequences intact
/// inside each component.
fn split_components(input: &str) -> std::result::Result<Vec<String>, DnError> {
    let mut components = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for ch in input.chars() {
        if escaped {
            current.push('\\');
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ',' {
            components.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }

    if escaped {
        return Err(DnError::TrailingEscape);
    }
    components.push(current);
    Ok(components)
}

fn parse_rdn(component: &str) -> std::result::Result<Rdn, DnError> {
    let component = component.trim();
    let separator = find_unescaped_equals(component)
        .ok_or_else(|| DnError::MissingSeparator(component.to_string()))?;

    let attribute = component[..separator].trim();
    if attribute.is_empty() {
        return Err(DnError::EmptyAttribute(component.to_string()));
    }

    let value = unescape_value(component[separator + 1..].trim_start())?;
    if value.is_empty() {
        return Err(DnError::EmptyValue(attribute.to_string()));
    }

    Ok(Rdn::new(attribute, value))
}

fn find_unescaped_equals(component: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, ch) in component.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' => return Some(index),
            _ => {}
        }
    }
    None
}

fn unescape_value(value: &str) -> std::result::Result<String, DnError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            out.push(chars.next().ok_or(DnError::TrailingEscape)?);
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

/// Escapes an RDN value for rendering, per RFC 4514.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (index, ch) in value.chars().enumerate() {
        let special = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (index == 0 && (ch == ' ' || ch == '#'))
            || (index == last && ch == ' ');
        if special {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn render(rdns: &[Rdn]) -> String {
    rdns.iter()
        .map(Rdn::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_inspect() {
        let dn = DistinguishedName::parse("uid=jdoe,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.as_str(), "uid=jdoe,ou=People,dc=example,dc=com");
        assert_eq!(dn.first().unwrap().attribute(), "uid");
        assert_eq!(dn.value_of("OU"), Some("People"));
        assert_eq!(dn.value_of("missing"), None);
    }

    #[test]
    fn parse_normalizes_spacing() {
        let dn = DistinguishedName::parse("cn=admins, ou=Groups, dc=example, dc=com").unwrap();
        assert_eq!(dn.as_str(), "cn=admins,ou=Groups,dc=example,dc=com");
    }

    #[test]
    fn parse_unescapes_values() {
        let dn = DistinguishedName::parse("cn=Smith\\, Jane,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.first().unwrap().value(), "Smith, Jane");
        assert!(dn.as_str().starts_with("cn=Smith\\, Jane,"));
    }

    #[test]
    fn child_escapes_special_characters() {
        let base = DistinguishedName::parse("ou=People,dc=example,dc=com").unwrap();
        let dn = base.child("uid", "odd,name");
        assert_eq!(dn.as_str(), "uid=odd\\,name,ou=People,dc=example,dc=com");
        assert_eq!(dn.first().unwrap().value(), "odd,name");
    }

    #[test]
    fn append_places_fragment_under_base() {
        let base = DistinguishedName::parse("dc=example,dc=com").unwrap();
        let ou = DistinguishedName::parse("ou=Groups").unwrap();
        assert_eq!(ou.append(&base).as_str(), "ou=Groups,dc=example,dc=com");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(DistinguishedName::parse("  "), Err(DnError::Empty));
        assert!(matches!(
            DistinguishedName::parse("no-separator"),
            Err(DnError::MissingSeparator(_))
        ));
        assert!(matches!(
            DistinguishedName::parse("=value"),
            Err(DnError::EmptyAttribute(_))
        ));
        assert!(matches!(
            DistinguishedName::parse("cn="),
            Err(DnError::EmptyValue(_))
        ));
        assert_eq!(
            DistinguishedName::parse("cn=trailing\\"),
            Err(DnError::TrailingEscape)
        );
    }

    #[test]
    fn display_round_trip() {
        let raw = "uid=jdoe,ou=People,dc=example,dc=com";
        let dn: DistinguishedName = raw.parse().unwrap();
        assert_eq!(dn.to_string(), raw);
        let again = DistinguishedName::parse(dn.to_string()).unwrap();
        assert_eq!(dn, again);
    }
}
