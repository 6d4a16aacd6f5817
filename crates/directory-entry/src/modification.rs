//! LDAP-style modifications applied to directory entries.

use directory_core::fold_case;
use ldap3::Mod;
use std::collections::HashSet;

use crate::entry::DirectoryEntry;

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
        /// Values to delete (empty removes attribute).
        values: Vec<String>,
    },
    /// Replace attribute values.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values (empty removes attribute).
        values: Vec<String>,
    },
}

impl DirectoryModification {
    /// Attribute targeted by the modification.
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Add { attribute, .. }
            | Self::Delete { attribute, .. }
            | Self::Replace { attribute, .. } => attribute,
        }
    }

    /// Values carried by the modification.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            Self::Add { values, .. }
            | Self::Delete { values, .. }
            | Self::Replace { values, .. } => values,
        }
    }
}

/// Values are submitted as a set, so duplicate values collapse into one.
impl From<&DirectoryModification> for Mod<String> {
    fn from(modification: &DirectoryModification) -> Self {
        let attribute = modification.attribute().to_string();
        let values = modification.values().iter().cloned().collect::<HashSet<_>>();
        match modification {
            DirectoryModification::Add { .. } => Mod::Add(attribute, values),
            DirectoryModification::Delete { .. } => Mod::Delete(attribute, values),
            DirectoryModification::Replace { .. } => Mod::Replace(attribute, values),
        }
    }
}

impl DirectoryEntry {
    /// Applies a modification to the in-memory entry.
    ///
    /// Attribute names are matched exactly. `Add` appends values, creating the attribute if
    /// needed. `Delete` without values removes the attribute; with values it removes every
    /// occurrence of each listed value and drops the attribute once none remain. `Replace`
    /// sets the attribute to exactly the given values, and removes it when there are none,
    /// as an LDAP server does.
    pub fn apply(&mut self, modification: &DirectoryModification) {
        match modification {
            DirectoryModification::Add { attribute, values } => {
                let mut merged = self
                    .attribute(attribute, false)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                merged.extend(values.iter().cloned());
                self.set_attribute(attribute.as_str(), merged);
            }
            DirectoryModification::Delete { attribute, values } if values.is_empty() => {
                self.remove_attribute(attribute);
            }
            DirectoryModification::Delete { attribute, values } => {
                let Some(current) = self.attribute(attribute, false) else {
                    return;
                };
                let remaining = current
                    .iter()
                    .filter(|value| !values.contains(value))
                    .cloned()
                    .collect::<Vec<_>>();
                if remaining.is_empty() {
                    self.remove_attribute(attribute);
                } else {
                    self.set_attribute(attribute.as_str(), remaining);
                }
            }
            DirectoryModification::Replace { attribute, values } if values.is_empty() => {
                self.remove_attribute(attribute);
            }
            DirectoryModification::Replace { attribute, values } => {
                self.set_attribute(attribute.as_str(), values.iter().cloned());
            }
        }
    }

    /// Applies modifications in order.
    pub fn apply_all<'a, I>(&mut self, modifications: I)
    where
        I: IntoIterator<Item = &'a DirectoryModification>,
    {
        for modification in modifications {
            self.apply(modification);
        }
    }

    /// Computes the modifications that turn this entry's attributes into `target`'s.
    ///
    /// Changed or new attributes become `Replace`, attributes missing from `target` become
    /// `Delete` without values. The comparison uses the original-case attribute names of both
    /// entries.
    ///
    /// Changes are grouped by folded attribute name, and within a group every `Delete` comes
    /// before any `Replace`. A server treats `mail` and `MAIL` as one attribute, so renaming
    /// the case of an attribute deletes the old spelling first and then writes the new one.
    ///
    /// An LDAP attribute cannot be present without values. A target attribute with an empty
    /// value list is therefore reached as an absent attribute.
    #[must_use]
    pub fn diff(&self, target: &DirectoryEntry) -> Vec<DirectoryModification> {
        let mut changes = target
            .attributes(false)
            .iter()
            .filter(|(name, values)| self.attribute(name, false) != Some(values.as_slice()))
            .map(|(name, values)| DirectoryModification::Replace {
                attribute: name.clone(),
                values: values.clone(),
            })
            .collect::<Vec<_>>();

        changes.extend(
            self.attribute_names()
                .filter(|name| !target.has_attribute(name, false))
                .map(|name| DirectoryModification::Delete {
                    attribute: name.to_string(),
                    values: Vec::new(),
                }),
        );

        changes.sort_by_cached_key(|change| {
            (
                fold_case(change.attribute()),
                matches!(change, DirectoryModification::Replace { .. }),
                change.attribute().to_string(),
            )
        });
        changes
    }
}
