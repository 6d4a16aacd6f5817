//! Directory entry value object.

use chrono::{DateTime, Utc};
use directory_core::attribute::{parse_bool, parse_timestamp};
use directory_core::{fold_case, AttributeMap, AttributeValues, Error};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::dn::{DistinguishedName, DistinguishedNameError};
use crate::Result;

/// A directory record: a distinguished name plus multi-valued attributes.
///
/// Attribute names keep the case they were written with. A second index keyed by the
/// lowercase name is maintained next to them so lookups can opt into case-insensitive
/// matching with `force_lowercase`. When two names fold to the same lowercase key, the index
/// holds whichever was written last.
///
/// Reads and writes never fail; a missing attribute is reported as `None`.
///
/// ```
/// use directory_entry::DirectoryEntry;
///
/// let entry = DirectoryEntry::new(
///     "cn=john,dc=example,dc=com",
///     [("cn", vec!["john"]), ("mail", vec!["john@example.com"])],
/// );
/// assert!(entry.has_attribute("CN", true));
/// assert_eq!(entry.attribute("cn", false), Some(&["john".to_string()][..]));
/// assert_eq!(entry.attribute("CN", false), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntryRecord")]
pub struct DirectoryEntry {
    dn: String,
    attributes: AttributeMap,
    #[serde(skip)]
    lowercase_attributes: AttributeMap,
}

impl DirectoryEntry {
    /// Creates an entry from a DN and an initial attribute set.
    ///
    /// Attributes are indexed in iteration order, so on a lowercase collision the last pair
    /// yielded by `attributes` wins. Pass an ordered collection when that matters.
    #[must_use]
    pub fn new<I, K, V, S>(dn: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entry = Self::with_dn(dn);
        for (name, values) in attributes {
            entry.store(name.into(), values.into_iter().map(Into::into).collect());
        }
        entry
    }

    /// Creates an entry with no attributes.
    #[must_use]
    pub fn with_dn(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: AttributeMap::new(),
            lowercase_attributes: AttributeMap::new(),
        }
    }

    /// Creates a builder for a new entry.
    #[must_use]
    pub fn builder(dn: impl Into<String>) -> DirectoryEntryBuilder {
        DirectoryEntryBuilder {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Decodes an entry from its JSON form (`{"dn": ..., "attributes": {...}}`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if the input is not a valid entry document.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Encodes the entry as JSON. The lowercase index is not part of the output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the entry's distinguished name exactly as it was provided.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Parses the stored DN into its structured form.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the stored DN is not valid DN syntax.
    pub fn parsed_dn(&self) -> std::result::Result<DistinguishedName, DistinguishedNameError> {
        DistinguishedName::parse(&self.dn)
    }

    /// Returns whether an attribute exists.
    ///
    /// With `force_lowercase` the name is folded and matched against the lowercase index,
    /// otherwise the exact name is required.
    #[must_use]
    pub fn has_attribute(&self, name: &str, force_lowercase: bool) -> bool {
        self.lookup(name, force_lowercase).is_some()
    }

    /// Returns the values of an attribute, or `None` when it is absent.
    ///
    /// An attribute stored with no values yields `Some(&[])`.
    #[must_use]
    pub fn attribute(&self, name: &str, force_lowercase: bool) -> Option<&[String]> {
        self.lookup(name, force_lowercase).map(Vec::as_slice)
    }

    /// Returns the full attribute map, keyed by lowercase names when `force_lowercase` is set.
    #[must_use]
    pub fn attributes(&self, force_lowercase: bool) -> &AttributeMap {
        if force_lowercase {
            &self.lowercase_attributes
        } else {
            &self.attributes
        }
    }

    /// Sets or overwrites the values of an attribute.
    pub fn set_attribute<V, S>(&mut self, name: impl Into<String>, values: V)
    where
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store(name.into(), values.into_iter().map(Into::into).collect());
    }

    /// Removes an attribute; does nothing if it is absent.
    ///
    /// The lowercase index entry for the folded name is dropped even when another
    /// original-case attribute folds to the same key.
    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.remove(name);
        self.lowercase_attributes.remove(&fold_case(name));
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, name: &str, force_lowercase: bool) -> Option<&str> {
        self.attribute(name, force_lowercase)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns the first value of an attribute that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAttribute`] when the attribute is absent or has no values.
    pub fn required_first(&self, name: &str, force_lowercase: bool) -> Result<&str> {
        self.first(name, force_lowercase)
            .ok_or_else(|| Error::MissingAttribute(name.to_string()))
    }

    /// Parses the attribute as boolean (`true` / `1`); absent attributes are false.
    #[must_use]
    pub fn bool_value(&self, name: &str, force_lowercase: bool) -> bool {
        self.first(name, force_lowercase).is_some_and(parse_bool)
    }

    /// Decodes the first value as an RFC 3339 or LDAP generalized time timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAttributeValue`] when a value is present but not a timestamp.
    pub fn timestamp(&self, name: &str, force_lowercase: bool) -> Result<Option<DateTime<Utc>>> {
        self.first(name, force_lowercase)
            .map(|value| {
                parse_timestamp(value).ok_or_else(|| {
                    Error::invalid_value(name, format!("`{value}` is not a timestamp"))
                })
            })
            .transpose()
    }

    /// Parses every value of a DN-valued attribute such as `member`.
    ///
    /// Values that do not parse are skipped.
    #[must_use]
    pub fn dn_values(&self, name: &str, force_lowercase: bool) -> Vec<DistinguishedName> {
        self.attribute(name, force_lowercase)
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match DistinguishedName::parse(value) {
                Ok(dn) => Some(dn),
                Err(err) => {
                    warn!(entry = %self.dn, attribute = name, "skipping DN value `{value}`: {err}");
                    None
                }
            })
            .collect()
    }

    /// Iterates over the original-case attribute names.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.attributes.keys().map(String::as_str)
    }

    /// Number of original-case attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the entry has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn lookup(&self, name: &str, force_lowercase: bool) -> Option<&AttributeValues> {
        if force_lowercase {
            self.lowercase_attributes.get(&fold_case(name))
        } else {
            self.attributes.get(name)
        }
    }

    /// True when the lowercase index entry for `folded` holds a value that `name` did not
    /// write, so storing `name` moves the index away from a differently-cased sibling.
    fn displaces_sibling(&self, name: &str, folded: &str) -> bool {
        match (self.lowercase_attributes.get(folded), self.attributes.get(name)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(indexed), Some(previous)) => indexed != previous,
        }
    }

    fn store(&mut self, name: String, values: AttributeValues) {
        let folded = fold_case(&name);
        if self.displaces_sibling(&name, &folded) {
            debug!(
                entry = %self.dn,
                attribute = %name,
                folded = %folded,
                "attribute replaces a differently-cased name in the lowercase index"
            );
        }
        self.lowercase_attributes.insert(folded, values.clone());
        self.attributes.insert(name, values);
    }
}

/// Builder for [`DirectoryEntry`].
///
/// Attributes are indexed in the order they were added.
#[derive(Debug)]
pub struct DirectoryEntryBuilder {
    dn: String,
    attributes: Vec<(String, AttributeValues)>,
}

impl DirectoryEntryBuilder {
    /// Adds an attribute with its values.
    #[must_use]
    pub fn attribute<V, S>(mut self, name: impl Into<String>, values: V) -> Self
    where
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Adds several attributes, keeping their iteration order.
    #[must_use]
    pub fn attributes<I, K, V, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(
            attributes
                .into_iter()
                .map(|(name, values)| (name.into(), values.into_iter().map(Into::into).collect())),
        );
        self
    }

    /// Builds the [`DirectoryEntry`].
    #[must_use]
    pub fn build(self) -> DirectoryEntry {
        DirectoryEntry::new(self.dn, self.attributes)
    }
}

#[derive(Deserialize)]
struct EntryRecord {
    dn: String,
    #[serde(default, deserialize_with = "ordered_attributes")]
    attributes: Vec<(String, AttributeValues)>,
}

impl From<EntryRecord> for DirectoryEntry {
    fn from(record: EntryRecord) -> Self {
        Self::new(record.dn, record.attributes)
    }
}

/// Reads the attribute object in document order so collisions resolve to the last key.
fn ordered_attributes<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, AttributeValues)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedAttributes;

    impl<'de> Visitor<'de> for OrderedAttributes {
        type Value = Vec<(String, AttributeValues)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of attribute names to value lists")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut attributes = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, AttributeValues>()? {
                attributes.push(entry);
            }
            Ok(attributes)
        }
    }

    deserializer.deserialize_map(OrderedAttributes)
}
