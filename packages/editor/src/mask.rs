//! # Hierarchy Mask
//!
//! Uniform view over the children of an instance, whatever its container
//! shape: an ordered list, named single-valued slots, or a grid addressed by
//! `<Type>.columnIndex` / `<Type>.rowIndex` text properties on the children.

use crate::document::Document;
use crate::node::{Node, NodeId};
use crate::registry::{local_name, AccessoryDescriptor, ContainerLayout, TypeDescriptor};

const FALLBACK_PROPERTY: &str = "children";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridAxis {
    Column,
    Row,
}

impl GridAxis {
    fn suffix(self) -> &'static str {
        match self {
            GridAxis::Column => "columnIndex",
            GridAxis::Row => "rowIndex",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HierarchyMask<'a> {
    doc: &'a Document,
    node: NodeId,
    descriptor: Option<&'a TypeDescriptor>,
}

impl<'a> HierarchyMask<'a> {
    /// Mask over an instance; `None` for other node kinds
    pub fn new(doc: &'a Document, node: NodeId) -> Option<Self> {
        let instance = doc.instance(node)?;
        Some(Self {
            doc,
            node,
            descriptor: doc.registry().resolve(&instance.type_name),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// `None` for unresolved types
    pub fn descriptor(&self) -> Option<&'a TypeDescriptor> {
        self.descriptor
    }

    fn type_local_name(&self) -> &'a str {
        local_name(self.doc.type_name(self.node).unwrap_or_default())
    }

    // Sub-components

    /// Property holding sub-components (`children` for unresolved types)
    pub fn main_property(&self) -> Option<&'a str> {
        match self.descriptor {
            Some(descriptor) => descriptor.default_property.as_deref(),
            None => Some(FALLBACK_PROPERTY),
        }
    }

    pub fn main_accessory(&self) -> Option<&'a AccessoryDescriptor> {
        self.descriptor.and_then(TypeDescriptor::main_accessory)
    }

    pub fn accepts_sub_components(&self) -> bool {
        self.main_property().is_some()
    }

    /// Whether a new sub-component of `type_name` (`None` for intrinsics) fits
    pub fn is_accepting_sub_component(&self, type_name: Option<&str>) -> bool {
        let Some(property) = self.main_property() else {
            return false;
        };
        match self.main_accessory() {
            Some(accessory) => {
                accessory.accepts_type(type_name)
                    && !(accessory.single && !self.doc.collection(self.node, property).is_empty())
            }
            None => self.descriptor.is_none(),
        }
    }

    /// Children of the main property, definitions excluded
    pub fn sub_components(&self) -> Vec<NodeId> {
        match self.main_property() {
            Some(property) => self
                .doc
                .collection(self.node, property)
                .iter()
                .copied()
                .filter(|id| !self.doc.node(*id).is_virtual())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn sub_component_count(&self) -> usize {
        self.sub_components().len()
    }

    pub fn sub_component_at(&self, index: usize) -> Option<NodeId> {
        self.sub_components().get(index).copied()
    }

    /// Whether the main accessory takes children of `type_name`, ignoring
    /// slot occupancy
    pub fn accepts_type(&self, type_name: Option<&str>) -> bool {
        match self.main_accessory() {
            Some(accessory) => accessory.accepts_type(type_name),
            None => self.descriptor.is_none(),
        }
    }

    /// Position inside the main property collection matching a sub-component
    /// index, definitions included; `count` maps to the end
    pub fn collection_index(&self, index: usize) -> usize {
        self.collection_index_skipping(index, None)
    }

    /// Like [`Self::collection_index`], as if `skip` were already detached
    pub fn collection_index_skipping(&self, index: usize, skip: Option<NodeId>) -> usize {
        let Some(property) = self.main_property() else {
            return 0;
        };
        let items: Vec<NodeId> = self
            .doc
            .collection(self.node, property)
            .iter()
            .copied()
            .filter(|id| Some(*id) != skip)
            .collect();
        let mut seen = 0;
        for (position, id) in items.iter().enumerate() {
            if self.doc.node(*id).is_virtual() {
                continue;
            }
            if seen == index {
                return position;
            }
            seen += 1;
        }
        items.len()
    }

    // Accessories

    pub fn accessories(&self) -> &'a [AccessoryDescriptor] {
        self.descriptor
            .map(|d| d.accessories.as_slice())
            .unwrap_or(&[])
    }

    pub fn accessory_items(&self, name: &str) -> &'a [NodeId] {
        self.doc.collection(self.node, name)
    }

    /// Content of a slot
    pub fn accessory_value(&self, name: &str) -> Option<NodeId> {
        self.accessory_items(name).first().copied()
    }

    pub fn is_accepting_accessory(&self, name: &str, type_name: Option<&str>) -> bool {
        self.descriptor
            .and_then(|d| d.accessory(name))
            .is_some_and(|accessory| {
                accessory.accepts_type(type_name)
                    && (!accessory.single || self.accessory_items(name).is_empty())
            })
    }

    // Grid

    pub fn is_grid(&self) -> bool {
        self.descriptor
            .is_some_and(|d| d.layout == ContainerLayout::Grid)
    }

    /// Name of the child text property carrying a coordinate (`GridPane.columnIndex`)
    pub fn coordinate_property(&self, axis: GridAxis) -> String {
        format!("{}.{}", self.type_local_name(), axis.suffix())
    }

    /// Coordinate of a child; absent or malformed values count as 0
    pub fn coordinate(&self, child: NodeId, axis: GridAxis) -> usize {
        self.doc
            .text_property(child, &self.coordinate_property(axis))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn column_index(&self, child: NodeId) -> usize {
        self.coordinate(child, GridAxis::Column)
    }

    pub fn row_index(&self, child: NodeId) -> usize {
        self.coordinate(child, GridAxis::Row)
    }

    /// One past the highest coordinate used along `axis`
    pub fn line_count(&self, axis: GridAxis) -> usize {
        self.sub_components()
            .into_iter()
            .filter(|id| self.doc.get(*id).is_some_and(Node::is_instance))
            .map(|id| self.coordinate(id, axis) + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.line_count(GridAxis::Column)
    }

    pub fn row_count(&self) -> usize {
        self.line_count(GridAxis::Row)
    }

    /// Instance children sitting on line `n` of `axis`
    pub fn children_at(&self, axis: GridAxis, n: usize) -> Vec<NodeId> {
        self.sub_components()
            .into_iter()
            .filter(|id| self.doc.get(*id).is_some_and(Node::is_instance))
            .filter(|id| self.coordinate(*id, axis) == n)
            .collect()
    }
}
