//! Distinguished name parsing for directory entries.
//!
//! An entry keeps its DN as the string it was built with. [`DistinguishedName`] is the
//! structured view callers opt into when they need to walk the hierarchy.

use directory_core::{fold_case, Error as CoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing or manipulating distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the attribute name to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
    /// A `\hh` escape did not decode to valid UTF-8.
    #[error("distinguished name contains an invalid hex escape: {0}")]
    InvalidHexEscape(String),
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::InvalidDn(err.to_string())
    }
}

/// One `attribute=value` assertion inside a relative distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeTypeAndValue {
    attribute: String,
    value: String,
}

impl AttributeTypeAndValue {
    /// Creates a new assertion from an attribute type and an unescaped value.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute type (e.g. `cn`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Unescaped attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if the attribute type matches `attribute` (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        fold_case(&self.attribute) == fold_case(attribute)
    }

    fn eq_ignore_case(&self, other: &Self) -> bool {
        self.matches_attribute(&other.attribute)
            && fold_case(&self.value) == fold_case(&other.value)
    }
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape(&self.value))
    }
}

/// Relative distinguished name: one or more `+`-joined assertions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativeDistinguishedName {
    assertions: Vec<AttributeTypeAndValue>,
}

impl RelativeDistinguishedName {
    /// Creates a single-valued RDN.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            assertions: vec![AttributeTypeAndValue::new(attribute, value)],
        }
    }

    /// Assertions of this RDN, in the order they were written.
    #[must_use]
    pub fn assertions(&self) -> &[AttributeTypeAndValue] {
        &self.assertions
    }

    /// Returns true when the RDN joins several assertions with `+`.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.assertions.len() > 1
    }

    /// Value of the first assertion whose attribute type matches (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.assertions
            .iter()
            .find(|atv| atv.matches_attribute(attribute))
            .map(AttributeTypeAndValue::value)
    }

    fn eq_ignore_case(&self, other: &Self) -> bool {
        self.assertions.len() == other.assertions.len()
            && self
                .assertions
                .iter()
                .zip(&other.assertions)
                .all(|(left, right)| left.eq_ignore_case(right))
    }
}

impl fmt::Display for RelativeDistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, atv) in self.assertions.iter().enumerate() {
            if idx > 0 {
                f.write_str("+")?;
            }
            write!(f, "{atv}")?;
        }
        Ok(())
    }
}

/// Structured view over a distinguished name.
///
/// Keeps a canonical, re-escaped string next to the parsed RDN sequence. The leftmost RDN
/// names the entry itself; the remaining ones name its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<RelativeDistinguishedName>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// Both backslash-escaped special characters (`\,`) and hex escapes (`\2C`) are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the distinguished name is empty or contains invalid
    /// syntax.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DistinguishedNameError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let rdns = split_escaped(input, ',')?
            .into_iter()
            .map(parse_rdn)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self::from_rdns(rdns))
    }

    fn from_rdns(rdns: Vec<RelativeDistinguishedName>) -> Self {
        let raw = rdns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self { raw, rdns }
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the RDNs in order, leftmost first.
    #[must_use]
    pub fn rdns(&self) -> &[RelativeDistinguishedName] {
        &self.rdns
    }

    /// Leftmost RDN, naming the entry itself.
    #[must_use]
    pub fn rdn(&self) -> Option<&RelativeDistinguishedName> {
        self.rdns.first()
    }

    /// Number of RDNs in the name.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    /// Returns an iterator over every assertion in order.
    pub fn components(&self) -> impl Iterator<Item = &AttributeTypeAndValue> + '_ {
        self.rdns.iter().flat_map(|rdn| rdn.assertions.iter())
    }

    /// Looks up the value for the first attribute that matches `attribute` (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.components()
            .find(|atv| atv.matches_attribute(attribute))
            .map(AttributeTypeAndValue::value)
    }

    /// Returns true if the distinguished name contains a matching attribute/value pair.
    #[must_use]
    pub fn contains(&self, attribute: &str, value: &str) -> bool {
        let value = fold_case(value);
        self.components()
            .any(|atv| atv.matches_attribute(attribute) && fold_case(atv.value()) == value)
    }

    /// Distinguished name of the parent entry, or `None` for a single-RDN name.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.len() < 2 {
            return None;
        }
        Some(Self::from_rdns(self.rdns[1..].to_vec()))
    }

    /// Returns true if this name lies strictly below `ancestor` in the hierarchy.
    ///
    /// Attribute types and values are compared case-insensitively.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        let Some(offset) = self.rdns.len().checked_sub(ancestor.rdns.len()) else {
            return false;
        };
        offset > 0
            && self.rdns[offset..]
                .iter()
                .zip(&ancestor.rdns)
                .all(|(left, right)| left.eq_ignore_case(right))
    }

    /// Creates a new distinguished name by prefixing the provided RDN.
    #[must_use]
    pub fn with_prefix(mut self, rdn: RelativeDistinguishedName) -> Self {
        self.rdns.insert(0, rdn);
        Self::from_rdns(self.rdns)
    }

    /// Creates a new distinguished name by appending another distinguished name.
    #[must_use]
    pub fn join(mut self, suffix: &DistinguishedName) -> Self {
        self.rdns.extend(suffix.rdns.iter().cloned());
        Self::from_rdns(self.rdns)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

impl TryFrom<&str> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

fn parse_rdn(
    component: &str,
) -> std::result::Result<RelativeDistinguishedName, DistinguishedNameError> {
    let assertions = split_escaped(component, '+')?
        .into_iter()
        .map(parse_assertion)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(RelativeDistinguishedName { assertions })
}

fn parse_assertion(
    part: &str,
) -> std::result::Result<AttributeTypeAndValue, DistinguishedNameError> {
    let idx = unescaped_positions(part)
        .find(|(_, ch)| *ch == '=')
        .map(|(idx, _)| idx)
        .ok_or_else(|| DistinguishedNameError::InvalidComponent(part.to_string()))?;

    let attribute = part[..idx].trim();
    let value = trim_component(&part[idx + 1..]);

    if attribute.is_empty() {
        return Err(DistinguishedNameError::MissingAttribute(part.to_string()));
    }
    if value.is_empty() {
        return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
    }

    Ok(AttributeTypeAndValue::new(attribute, unescape(value)?))
}

/// Yields `(byte index, char)` for every character that is not escaped by a backslash.
///
/// Escape characters themselves are skipped.
fn unescaped_positions(input: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut escape = false;
    input.char_indices().filter(move |(_, ch)| {
        if escape {
            escape = false;
            return false;
        }
        if *ch == '\\' {
            escape = true;
            return false;
        }
        true
    })
}

/// Splits on unescaped `delimiter`, keeping escape sequences intact in each part.
fn split_escaped(
    input: &str,
    delimiter: char,
) -> std::result::Result<Vec<&str>, DistinguishedNameError> {
    if has_dangling_escape(input) {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }

    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, _) in unescaped_positions(input).filter(|(_, ch)| *ch == delimiter) {
        parts.push(trim_component(&input[start..idx]));
        start = idx + delimiter.len_utf8();
    }
    parts.push(trim_component(&input[start..]));

    if parts.iter().any(|part| part.is_empty()) {
        return Err(DistinguishedNameError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

fn has_dangling_escape(input: &str) -> bool {
    input.chars().rev().take_while(|ch| *ch == '\\').count() % 2 == 1
}

/// Trims surrounding whitespace without eating an escaped trailing space.
fn trim_component(part: &str) -> &str {
    let part = part.trim_start();
    let trimmed = part.trim_end();
    if has_dangling_escape(trimmed) {
        if let Some(ch) = part[trimmed.len()..].chars().next() {
            return &part[..trimmed.len() + ch.len_utf8()];
        }
    }
    trimmed
}

fn unescape(value: &str) -> std::result::Result<String, DistinguishedNameError> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let next = chars
            .next()
            .ok_or(DistinguishedNameError::UnterminatedEscape)?;
        match chars.peek().copied() {
            Some(low) if next.is_ascii_hexdigit() && low.is_ascii_hexdigit() => {
                chars.next();
                let pair: String = [next, low].iter().collect();
                let byte = u8::from_str_radix(&pair, 16)
                    .map_err(|_| DistinguishedNameError::InvalidHexEscape(value.to_string()))?;
                bytes.push(byte);
            }
            _ => bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes()),
        }
    }

    String::from_utf8(bytes)
        .map_err(|_| DistinguishedNameError::InvalidHexEscape(value.to_string()))
}

fn escape(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in value.chars().enumerate() {
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (idx == 0 && (ch == ' ' || ch == '#'))
            || (idx == last && ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_dn() {
        let dn = DistinguishedName::parse("cn=John Doe,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("CN"), Some("John Doe"));
        assert_eq!(dn.get("ou"), Some("People"));
        assert!(dn.contains("dc", "EXAMPLE"));
        assert_eq!(dn.depth(), 4);
        assert_eq!(dn.to_string(), "cn=John Doe,ou=People,dc=example,dc=com");
    }

    #[test]
    fn parse_dn_with_escapes() {
        let dn = DistinguishedName::parse("cn=Smith\\, John,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("Smith, John"));
        assert_eq!(dn.depth(), 4);
        assert!(dn.as_str().starts_with("cn=Smith\\, John,ou=People"));

        let hex = DistinguishedName::parse("cn=Smith\\2C John,dc=example").unwrap();
        assert_eq!(hex.get("cn"), Some("Smith, John"));
        assert_eq!(hex.as_str(), "cn=Smith\\, John,dc=example");
    }

    #[test]
    fn parse_utf8_hex_escape() {
        let dn = DistinguishedName::parse("cn=Lu\\C4\\8Di\\C4\\87,dc=example").unwrap();
        assert_eq!(dn.get("cn"), Some("Lučić"));

        let err = DistinguishedName::parse("cn=\\C4,dc=example").unwrap_err();
        assert!(matches!(err, DistinguishedNameError::InvalidHexEscape(_)));
    }

    #[test]
    fn escaped_trailing_space_survives() {
        let dn = DistinguishedName::parse("cn=padded\\ ,dc=example").unwrap();
        assert_eq!(dn.get("cn"), Some("padded "));
        assert_eq!(dn.as_str(), "cn=padded\\ ,dc=example");
    }

    #[test]
    fn parse_multi_valued_rdn() {
        let dn = DistinguishedName::parse("cn=John+uid=1234,ou=People,dc=example,dc=com").unwrap();
        let rdn = dn.rdn().unwrap();
        assert!(rdn.is_multi_valued());
        assert_eq!(rdn.get("uid"), Some("1234"));
        assert!(dn.contains("cn", "John"));
        assert_eq!(
            dn.to_string(),
            "cn=John+uid=1234,ou=People,dc=example,dc=com"
        );
    }

    #[test]
    fn invalid_inputs() {
        assert_eq!(
            DistinguishedName::parse("   ").unwrap_err(),
            DistinguishedNameError::Empty
        );
        assert!(matches!(
            DistinguishedName::parse("cn=John,").unwrap_err(),
            DistinguishedNameError::InvalidComponent(_)
        ));
        assert!(matches!(
            DistinguishedName::parse("=John").unwrap_err(),
            DistinguishedNameError::MissingAttribute(_)
        ));
        assert!(matches!(
            DistinguishedName::parse("cn=").unwrap_err(),
            DistinguishedNameError::MissingValue(_)
        ));
        assert!(matches!(
            DistinguishedName::parse("cn=John\\").unwrap_err(),
            DistinguishedNameError::UnterminatedEscape
        ));
        assert!(matches!(
            DistinguishedName::parse("John").unwrap_err(),
            DistinguishedNameError::InvalidComponent(_)
        ));
    }

    #[test]
    fn parent_and_descendants() {
        let base = DistinguishedName::parse("dc=example,dc=com").unwrap();
        let user = DistinguishedName::parse("uid=jdoe,OU=People,DC=Example,dc=com").unwrap();

        assert!(user.is_descendant_of(&base));
        assert!(!base.is_descendant_of(&user));
        assert!(!base.is_descendant_of(&base));

        let parent = user.parent().unwrap();
        assert_eq!(parent.as_str(), "OU=People,DC=Example,dc=com");
        assert!(DistinguishedName::parse("dc=com").unwrap().parent().is_none());
    }

    #[test]
    fn with_prefix_and_join() {
        let base = DistinguishedName::parse("ou=People,dc=example,dc=com").unwrap();
        let user_dn = base
            .clone()
            .with_prefix(RelativeDistinguishedName::new("cn", "Doe, Jane"));
        assert_eq!(
            user_dn.to_string(),
            "cn=Doe\\, Jane,ou=People,dc=example,dc=com"
        );
        assert_eq!(user_dn.get("cn"), Some("Doe, Jane"));

        let full = DistinguishedName::parse("uid=1234").unwrap().join(&base);
        assert_eq!(full.to_string(), "uid=1234,ou=People,dc=example,dc=com");
    }

    #[test]
    fn serde_uses_string_form() {
        let dn = DistinguishedName::parse("cn=admins,ou=Groups,dc=example").unwrap();
        let json = serde_json::to_string(&dn).unwrap();
        assert_eq!(json, "\"cn=admins,ou=Groups,dc=example\"");

        let back: DistinguishedName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dn);
        assert!(serde_json::from_str::<DistinguishedName>("\"\"").is_err());
    }

    #[test]
    fn converts_into_core_error() {
        let err: CoreError = DistinguishedNameError::Empty.into();
        assert!(matches!(err, CoreError::InvalidDn(_)));
    }
}
