use config::{Bindings, Groups, INDEPENDENT, SELF_DEPENDENT};

/// Execution group of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind<'a> {
    /// Runs on its own one-shot worker; never waits on anything.
    Independent,
    /// Serialized only against repeats of itself.
    SelfSerial,
    /// Serialized against every other member of the named group.
    Named(&'a str),
}

/// Classifies action names into execution groups.
///
/// Actions missing from every group are independent.
#[derive(Debug, Clone, Default)]
pub struct GroupPolicy {
    groups: Groups,
}

impl GroupPolicy {
    /// Build a policy from validated group membership.
    pub fn from_groups(groups: &Groups) -> Self {
        Self {
            groups: groups.clone(),
        }
    }

    /// The execution group for `action`.
    pub fn group_of(&self, action: &str) -> GroupKind<'_> {
        match self.groups.group_of(action) {
            None => GroupKind::Independent,
            Some(g) if g == INDEPENDENT => GroupKind::Independent,
            Some(g) if g == SELF_DEPENDENT => GroupKind::SelfSerial,
            Some(g) => GroupKind::Named(g),
        }
    }

    /// User-defined group names, each of which owns one persistent queue.
    pub fn named_groups(&self) -> impl Iterator<Item = &str> {
        self.groups.named()
    }

    /// Bound actions that no group mentions.
    pub fn unclassified<'b>(&self, bindings: &'b Bindings) -> Vec<&'b str> {
        bindings
            .bound_actions()
            .into_iter()
            .filter(|a| self.groups.group_of(a).is_none())
            .collect()
    }
}
