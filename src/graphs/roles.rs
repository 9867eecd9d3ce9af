//! Node roles and their structural placement rules.
//!
//! Every node carries a [`NodeRole`] resolved once when the graph is built.
//! The role never influences how a step is executed (payloads stay opaque to
//! the scheduler); it only feeds the structural validator, which checks that
//! each node sits in a position its role permits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The structural role a node plays inside a workflow.
///
/// Roles map the editor's block kinds onto the five categories the validator
/// reasons about. The mapping is fixed at graph construction; scheduling
/// itself treats every node identically.
///
/// # Examples
///
/// ```
/// use stratoflow::graphs::NodeRole;
///
/// let role = NodeRole::Trigger;
/// assert!(role.is_trigger());
/// assert!(role.placement().first);
/// assert!(!role.placement().middle);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Starts a workflow; by convention the single entry point.
    Trigger,
    /// Performs externally visible work (API calls and the like).
    Action,
    /// Reshapes data flowing between other nodes.
    Transform,
    /// Routes or gates execution (conditionals, switches).
    Control,
    /// Terminal consumer of results (display, export).
    Output,
}

/// Which graph positions a role is allowed to occupy.
///
/// A node's occupied positions are derived from its edges: `first` means no
/// incoming edges, `last` means no outgoing edges, `middle` means both. An
/// isolated node occupies `first` and `last` simultaneously and passes with
/// either permission, so one-node workflows stay runnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePlacement {
    pub first: bool,
    pub middle: bool,
    pub last: bool,
}

impl RolePlacement {
    /// Whether a node with no edges at all may hold this role. An isolated
    /// node is both ends of its workflow at once; either end permission
    /// qualifies it.
    #[must_use]
    pub fn allows_isolated(&self) -> bool {
        self.first || self.last
    }
}

impl NodeRole {
    /// All roles, in display order.
    pub const ALL: [NodeRole; 5] = [
        NodeRole::Trigger,
        NodeRole::Action,
        NodeRole::Transform,
        NodeRole::Control,
        NodeRole::Output,
    ];

    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Trigger => "trigger",
            NodeRole::Action => "action",
            NodeRole::Transform => "transform",
            NodeRole::Control => "control",
            NodeRole::Output => "output",
        }
    }

    /// Positions this role may occupy.
    #[must_use]
    pub fn placement(&self) -> RolePlacement {
        match self {
            NodeRole::Trigger => RolePlacement {
                first: true,
                middle: false,
                last: false,
            },
            NodeRole::Action | NodeRole::Transform => RolePlacement {
                first: false,
                middle: true,
                last: true,
            },
            NodeRole::Control => RolePlacement {
                first: false,
                middle: true,
                last: false,
            },
            NodeRole::Output => RolePlacement {
                first: false,
                middle: false,
                last: true,
            },
        }
    }

    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(self, NodeRole::Trigger)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
