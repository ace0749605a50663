//! Structural snapshot of a subtree, independent of arena ids.
//!
//! Two documents are structurally equal when the snapshots of their roots
//! are equal. Text properties and collection properties are compared as two
//! separately ordered groups, matching what the markup form can express.

use crate::document::Document;
use crate::node::{IntrinsicKind, NodeId, NodeKind, PropertyValue};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeSnapshot {
    Instance {
        type_name: String,
        id: Option<String>,
        resolved: bool,
        attributes: Vec<(String, String)>,
        collections: Vec<(String, Vec<NodeSnapshot>)>,
    },
    Intrinsic {
        intrinsic: IntrinsicKind,
        source: String,
        id: Option<String>,
    },
    Virtual {
        children: Vec<NodeSnapshot>,
    },
}

impl Document {
    /// Snapshot of the whole tree, `None` for an empty document
    pub fn snapshot(&self) -> Option<NodeSnapshot> {
        self.root().map(|root| self.snapshot_of(root))
    }

    pub fn snapshot_of(&self, id: NodeId) -> NodeSnapshot {
        match self.node(id).kind() {
            NodeKind::Instance(instance) => {
                let mut attributes = Vec::new();
                let mut collections = Vec::new();
                for (name, property) in &instance.properties {
                    match self.node(*property).as_property().map(|p| &p.value) {
                        Some(PropertyValue::Text(value)) => {
                            attributes.push((name.clone(), value.clone()))
                        }
                        Some(PropertyValue::Collection { items, .. }) => collections.push((
                            name.clone(),
                            items.iter().map(|c| self.snapshot_of(*c)).collect(),
                        )),
                        None => {}
                    }
                }
                NodeSnapshot::Instance {
                    type_name: instance.type_name.clone(),
                    id: instance.id.clone(),
                    resolved: instance.peer.is_some(),
                    attributes,
                    collections,
                }
            }
            NodeKind::Intrinsic(intrinsic) => NodeSnapshot::Intrinsic {
                intrinsic: intrinsic.kind,
                source: intrinsic.source.clone(),
                id: intrinsic.id.clone(),
            },
            NodeKind::Virtual(virt) => NodeSnapshot::Virtual {
                children: virt.children.iter().map(|c| self.snapshot_of(*c)).collect(),
            },
            NodeKind::Property(_) => panic!("property node {} has no standalone snapshot", id),
        }
    }
}
