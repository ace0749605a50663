//! # Tree Model
//!
//! Node kinds stored in a [`Document`](crate::Document) arena.
//!
//! ```text
//! Instance ──owns──▶ Property (Text | Collection) ──holds──▶ Instance / Intrinsic / Virtual
//!                                                             │
//!                                   Virtual ──defines──▶ Instance / Intrinsic / Virtual
//! ```
//!
//! Children hold a [`ParentLink`] back to their container; the container owns
//! the ordered list of child ids.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a node inside one document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Back-reference from a node to its container
///
/// `index` is the position inside a multi-valued collection or a definition
/// block. It is `None` for property nodes and for single-valued slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: NodeId,
    pub index: Option<usize>,
}

/// Stand-in for the live scene-graph object of a resolved instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePeer {
    pub type_name: String,
    pub serial: u64,
}

/// External reference kinds (`x:include`, `x:reference`, `x:copy`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntrinsicKind {
    /// Include another document
    Include,
    /// Refer to a node by identifier
    Reference,
    /// Copy a node by identifier
    Copy,
}

impl IntrinsicKind {
    pub fn tag(self) -> &'static str {
        match self {
            IntrinsicKind::Include => "x:include",
            IntrinsicKind::Reference => "x:reference",
            IntrinsicKind::Copy => "x:copy",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "x:include" => Some(IntrinsicKind::Include),
            "x:reference" => Some(IntrinsicKind::Reference),
            "x:copy" => Some(IntrinsicKind::Copy),
            _ => None,
        }
    }

    /// Whether the source names a node of the same document
    pub fn targets_identifier(self) -> bool {
        !matches!(self, IntrinsicKind::Include)
    }
}

impl fmt::Display for IntrinsicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Value held by a property node
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Ordered child nodes; `single` slots hold at most one child
    Collection { items: Vec<NodeId>, single: bool },
    /// Literal or expression text
    Text(String),
}

#[derive(Debug, Clone)]
pub struct InstanceNode {
    pub type_name: String,
    pub id: Option<String>,
    pub properties: IndexMap<String, NodeId>,
    pub peer: Option<ScenePeer>,
}

#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub name: String,
    pub value: PropertyValue,
}

#[derive(Debug, Clone)]
pub struct IntrinsicNode {
    pub kind: IntrinsicKind,
    pub source: String,
    pub id: Option<String>,
    /// Target of a reference/copy, refreshed at the end of every transaction
    pub resolved: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualNode {
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Instance(InstanceNode),
    Property(PropertyNode),
    Intrinsic(IntrinsicNode),
    Virtual(VirtualNode),
}

/// One arena slot
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<ParentLink>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self { kind, parent: None }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<ParentLink> {
        self.parent
    }

    pub fn as_instance(&self) -> Option<&InstanceNode> {
        match &self.kind {
            NodeKind::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyNode> {
        match &self.kind {
            NodeKind::Property(property) => Some(property),
            _ => None,
        }
    }

    pub fn as_intrinsic(&self) -> Option<&IntrinsicNode> {
        match &self.kind {
            NodeKind::Intrinsic(intrinsic) => Some(intrinsic),
            _ => None,
        }
    }

    pub fn as_virtual(&self) -> Option<&VirtualNode> {
        match &self.kind {
            NodeKind::Virtual(virt) => Some(virt),
            _ => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self.kind, NodeKind::Instance(_))
    }

    pub fn is_property(&self) -> bool {
        matches!(self.kind, NodeKind::Property(_))
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, NodeKind::Virtual(_))
    }

    /// Instances, intrinsics and virtual nodes are objects; properties are not
    pub fn is_object(&self) -> bool {
        !self.is_property()
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Instance(instance) => instance.id.as_deref(),
            NodeKind::Intrinsic(intrinsic) => intrinsic.id.as_deref(),
            _ => None,
        }
    }

    /// Short human-readable label used in job descriptions and diagnostics
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Instance(instance) => instance.type_name.clone(),
            NodeKind::Property(property) => property.name.clone(),
            NodeKind::Intrinsic(intrinsic) => intrinsic.kind.tag().to_string(),
            NodeKind::Virtual(_) => "x:define".to_string(),
        }
    }
}

/// Position a node occupies, or will occupy, in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Document root
    Root,
    /// Inside the named collection property of an instance; `None` appends
    Property {
        instance: NodeId,
        name: String,
        index: Option<usize>,
    },
    /// Inside a definition block (virtual node); `None` appends
    Definition { host: NodeId, index: Option<usize> },
}

impl Placement {
    pub fn property(instance: NodeId, name: impl Into<String>, index: Option<usize>) -> Self {
        Placement::Property {
            instance,
            name: name.into(),
            index,
        }
    }

    /// Container node whose subtree will hold the placed node
    pub fn anchor(&self) -> Option<NodeId> {
        match self {
            Placement::Root => None,
            Placement::Property { instance, .. } => Some(*instance),
            Placement::Definition { host, .. } => Some(*host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_tags_roundtrip() {
        for kind in [IntrinsicKind::Include, IntrinsicKind::Reference, IntrinsicKind::Copy] {
            assert_eq!(IntrinsicKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(IntrinsicKind::from_tag("x:define"), None);
        assert!(!IntrinsicKind::Include.targets_identifier());
        assert!(IntrinsicKind::Copy.targets_identifier());
    }

    #[test]
    fn test_node_identifier_by_kind() {
        let instance = Node::new(NodeKind::Instance(InstanceNode {
            type_name: "Button".to_string(),
            id: Some("ok".to_string()),
            properties: IndexMap::new(),
            peer: None,
        }));
        assert_eq!(instance.identifier(), Some("ok"));
        assert!(instance.is_object());

        let property = Node::new(NodeKind::Property(PropertyNode {
            name: "text".to_string(),
            value: PropertyValue::Text("OK".to_string()),
        }));
        assert_eq!(property.identifier(), None);
        assert!(!property.is_object());
        assert_eq!(property.label(), "text");
    }
}
