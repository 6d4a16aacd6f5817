//! Conversion of `ldap3` search results into directory entries.

use directory_core::Error;
use ldap3::{LdapError, ResultEntry, SearchEntry, SearchResult};
use tracing::{debug, warn};

use crate::{entry::DirectoryEntry, Result};

impl From<SearchEntry> for DirectoryEntry {
    /// Text attributes become entry attributes; binary attributes are dropped.
    ///
    /// `ldap3` hands attributes over in a hash map, so which of two colliding names ends up in
    /// the lowercase index is not predictable.
    fn from(entry: SearchEntry) -> Self {
        if !entry.bin_attrs.is_empty() {
            debug!(
                dn = %entry.dn,
                skipped = entry.bin_attrs.len(),
                "dropping binary attributes from search entry"
            );
        }
        DirectoryEntry::new(entry.dn, entry.attrs)
    }
}

impl From<ResultEntry> for DirectoryEntry {
    fn from(entry: ResultEntry) -> Self {
        SearchEntry::construct(entry).into()
    }
}

/// Builds entries from a completed search.
///
/// # Errors
///
/// Returns [`Error::ExternalServiceError`] when the server reported a non-success result code.
pub fn entries_from_search(result: SearchResult) -> Result<Vec<DirectoryEntry>> {
    let (entries, _) = result.success().map_err(|err| {
        warn!("LDAP search did not succeed: {err}");
        map_ldap_error(err)
    })?;
    Ok(entries.into_iter().map(DirectoryEntry::from).collect())
}

fn map_ldap_error(err: LdapError) -> Error {
    Error::ExternalServiceError {
        service: "ldap".to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldap3::LdapResult;
    use std::collections::HashMap;

    fn ldap_result(rc: u32, text: &str) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: text.to_string(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        }
    }

    fn sample_entry() -> SearchEntry {
        let mut attrs = HashMap::new();
        attrs.insert("uid".to_string(), vec!["jdoe".to_string()]);
        attrs.insert("cn".to_string(), vec!["John Doe".to_string()]);
        attrs.insert(
            "memberOf".to_string(),
            vec![
                "cn=admins,ou=Groups,dc=example,dc=com".to_string(),
                "cn=operators,ou=Groups,dc=example,dc=com".to_string(),
            ],
        );
        let mut bin_attrs = HashMap::new();
        bin_attrs.insert("jpegPhoto".to_string(), vec![vec![0xff, 0xd8, 0xff]]);
        SearchEntry {
            dn: "uid=jdoe,ou=People,dc=example,dc=com".to_string(),
            attrs,
            bin_attrs,
        }
    }

    #[test]
    fn search_entry_conversion() {
        let entry = DirectoryEntry::from(sample_entry());

        assert_eq!(entry.dn(), "uid=jdoe,ou=People,dc=example,dc=com");
        assert_eq!(entry.first("uid", false), Some("jdoe"));
        assert_eq!(entry.dn_values("memberof", true).len(), 2);
        assert!(!entry.has_attribute("jpegPhoto", false));
        assert_eq!(entry.len(), 3);
    }

    #[test]
    fn successful_empty_search() {
        let result = SearchResult(Vec::new(), ldap_result(0, ""));
        let entries = entries_from_search(result).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn failed_search_maps_to_external_error() {
        let result = SearchResult(Vec::new(), ldap_result(32, "No such object"));
        let err = entries_from_search(result).unwrap_err();

        match err {
            Error::ExternalServiceError { service, message } => {
                assert_eq!(service, "ldap");
                assert!(message.contains("32"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
