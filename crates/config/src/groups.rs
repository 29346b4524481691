//! Dispatch group classification: group name -> action names.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use crate::Error;

/// Reserved group whose actions never wait on anything.
pub const INDEPENDENT: &str = "independent";
/// Reserved group whose actions each get a private serial queue.
pub const SELF_DEPENDENT: &str = "self_dependent";

/// Validated group membership.
///
/// Every action appears in at most one group. The two reserved groups are
/// always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groups {
    groups: BTreeMap<String, Vec<String>>,
    owner: HashMap<String, String>,
}

impl Default for Groups {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(INDEPENDENT.to_string(), Vec::new());
        groups.insert(SELF_DEPENDENT.to_string(), Vec::new());
        Self {
            groups,
            owner: HashMap::new(),
        }
    }
}

impl Groups {
    /// Build from raw `group -> actions` lists, rejecting duplicate membership.
    pub fn from_map(
        raw: BTreeMap<String, Vec<String>>,
        path: Option<&Path>,
    ) -> Result<Self, Error> {
        let mut out = Self::default();
        for (group, actions) in raw {
            let members = out.groups.entry(group.clone()).or_default();
            for action in actions {
                if let Some(prev) = out.owner.get(&action) {
                    let message = if *prev == group {
                        format!("action '{action}' is listed twice in group '{group}'")
                    } else {
                        format!("action '{action}' is in both group '{prev}' and group '{group}'")
                    };
                    return Err(Error::Validation {
                        path: path.map(Path::to_path_buf),
                        message,
                    });
                }
                out.owner.insert(action.clone(), group.clone());
                members.push(action);
            }
        }
        Ok(out)
    }

    /// The group an action was assigned to, if any.
    pub fn group_of(&self, action: &str) -> Option<&str> {
        self.owner.get(action).map(String::as_str)
    }

    /// Names of user-defined groups (everything but the two reserved ones).
    pub fn named(&self) -> impl Iterator<Item = &str> {
        self.groups
            .keys()
            .map(String::as_str)
            .filter(|g| *g != INDEPENDENT && *g != SELF_DEPENDENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(g, a)| (g.to_string(), a.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn reserved_groups_always_present() {
        let g = Groups::from_map(raw(&[("playback", &["next"])]), None).unwrap();
        assert!(g.groups[INDEPENDENT].is_empty());
        assert!(g.groups[SELF_DEPENDENT].is_empty());
        assert_eq!(g.named().collect::<Vec<_>>(), vec!["playback"]);
        assert_eq!(g.group_of("next"), Some("playback"));
        assert_eq!(g.group_of("save"), None);
    }

    #[test]
    fn duplicate_membership_fails() {
        let err = Groups::from_map(
            raw(&[("independent", &["save"]), ("self_dependent", &["save"])]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("'save'"));

        let err = Groups::from_map(raw(&[("playback", &["next", "next"])]), None).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }
}
