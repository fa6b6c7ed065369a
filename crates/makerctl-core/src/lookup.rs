//! Name-based resource lookup
//!
//! Providers key most operations on an assigned id, while the CLI keys
//! everything on the human-assigned name. Within one account a name is
//! assumed unique among live resources of the same kind; zero or multiple
//! matches are hard errors rather than a silent tie-break.

use crate::error::{CoreError, Result};
use crate::op::ResourceKind;

/// Find exactly one item whose name matches, or fail with
/// `LookupNotFound` / `LookupAmbiguous`.
pub fn find_by_name<T, F>(
    kind: ResourceKind,
    name: &str,
    items: impl IntoIterator<Item = T>,
    name_of: F,
) -> Result<T>
where
    F: Fn(&T) -> &str,
{
    let mut matches: Vec<T> = items
        .into_iter()
        .filter(|item| name_of(item) == name)
        .collect();

    match matches.len() {
        0 => Err(CoreError::LookupNotFound {
            kind,
            name: name.to_string(),
        }),
        1 => Ok(matches.swap_remove(0)),
        count => Err(CoreError::LookupAmbiguous {
            kind,
            name: name.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: u64,
        name: &'static str,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { id: 1, name: "alpha" },
            Item { id: 2, name: "beta" },
            Item { id: 3, name: "beta" },
        ]
    }

    #[test]
    fn single_match_returns_the_item() {
        let found = find_by_name(ResourceKind::Vm, "alpha", items(), |i| i.name).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn zero_matches_is_not_found() {
        let err = find_by_name(ResourceKind::Vm, "gamma", items(), |i| i.name).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let err = find_by_name(ResourceKind::Vm, "beta", items(), |i| i.name).unwrap_err();
        assert!(matches!(
            err,
            CoreError::LookupAmbiguous { count: 2, .. }
        ));
    }

    #[test]
    fn empty_listing_is_not_found() {
        let err = find_by_name(ResourceKind::Cluster, "demo", Vec::<Item>::new(), |i| i.name)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
