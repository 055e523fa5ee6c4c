//! Host-side configuration checks.
//!
//! None of these problems stop a tree from ticking: the engine fails the
//! affected branch (or ignores the transition) at runtime. Validation lets the
//! host surface them up front instead.

use thiserror::Error;

use crate::access::AccessKeys;
use crate::composite::CompositePolicy;
use crate::node::{Node, NodeId, NodeKind};

/// A misconfiguration found by [`TreeDriver::validate`](crate::TreeDriver::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("state `{state}`: node `{node}` ({id}) changes to unknown state `{target}`")]
    UnknownTransitionTarget {
        state: String,
        node: String,
        id: NodeId,
        target: String,
    },

    #[error("state `{state}`: decorator `{node}` ({id}) has no child and always fails")]
    DecoratorWithoutChild { state: String, node: String, id: NodeId },

    #[error("state `{state}`: composite `{node}` ({id}) has no children")]
    EmptyComposite { state: String, node: String, id: NodeId },

    #[error("state `{state}`: decorator `{node}` ({id}) uses unregistered access key `{key}`")]
    UnknownAccessKey {
        state: String,
        node: String,
        id: NodeId,
        key: String,
    },
}

/// Collects every issue of one state's tree, in pre-order.
pub(crate) fn validate_state<B>(
    state: &str,
    root: &Node<B>,
    is_state: impl Fn(&str) -> bool,
    keys: &AccessKeys,
    issues: &mut Vec<ConfigIssue>,
) {
    root.walk(&mut |node: &Node<B>, _depth: usize| {
        let name = || node.name().to_owned();
        match node.kind() {
            NodeKind::ChangeState(change) if !is_state(change.target()) => {
                issues.push(ConfigIssue::UnknownTransitionTarget {
                    state: state.to_owned(),
                    node: name(),
                    id: node.id(),
                    target: change.target().to_owned(),
                });
            }
            NodeKind::Decorator(decorator) => {
                if decorator.child_slot().is_none() {
                    issues.push(ConfigIssue::DecoratorWithoutChild {
                        state: state.to_owned(),
                        node: name(),
                        id: node.id(),
                    });
                }
                if let Some(key) = decorator.access_key_name()
                    && !keys.contains(key)
                {
                    issues.push(ConfigIssue::UnknownAccessKey {
                        state: state.to_owned(),
                        node: name(),
                        id: node.id(),
                        key: key.to_owned(),
                    });
                }
            }
            // an empty sequence is a valid no-op that succeeds
            NodeKind::Composite(composite)
                if composite.is_empty() && composite.policy() != CompositePolicy::Sequence =>
            {
                issues.push(ConfigIssue::EmptyComposite {
                    state: state.to_owned(),
                    node: name(),
                    id: node.id(),
                });
            }
            _ => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Composite;
    use crate::decorator::Decorator;

    fn issues(root: &Node<()>) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        validate_state("Patrol", root, |name| name == "Patrol", &AccessKeys::new(), &mut issues);
        issues
    }

    #[test]
    fn well_formed_tree_has_no_issues() {
        let root = Node::composite(
            "root",
            Composite::priority()
                .child(Node::change_state("stay", "Patrol").unwrap())
                .child(Node::composite("noop", Composite::sequence()).unwrap()),
        )
        .unwrap();
        assert!(issues(&root).is_empty());
    }

    #[test]
    fn reports_each_problem() {
        let root = Node::composite(
            "root",
            Composite::priority()
                .child(Node::change_state("flee", "Flee").unwrap())
                .child(Node::decorator("lonely", Decorator::new().access_key("door")).unwrap())
                .child(Node::composite("nothing", Composite::random()).unwrap()),
        )
        .unwrap();
        let found = issues(&root);
        assert_eq!(found.len(), 4);
        assert!(matches!(&found[0], ConfigIssue::UnknownTransitionTarget { target, .. } if target == "Flee"));
        assert!(matches!(&found[1], ConfigIssue::DecoratorWithoutChild { node, .. } if node == "lonely"));
        assert!(matches!(&found[2], ConfigIssue::UnknownAccessKey { key, .. } if key == "door"));
        assert!(matches!(&found[3], ConfigIssue::EmptyComposite { node, .. } if node == "nothing"));
    }
}
