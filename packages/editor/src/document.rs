//! # Document
//!
//! Arena-backed tree of component instances for one markup source.
//!
//! The document owns every node it has ever allocated. Jobs detach nodes
//! instead of destroying them, so a [`NodeId`] kept for undo stays valid for
//! the lifetime of the document.
//!
//! ## Mutation rules
//!
//! - Allocating nodes (`create_*`) and editing detached subtrees is allowed
//!   at any time; this is how the loader and the clipboard decoder build
//!   nodes before attaching them.
//! - Editing a *live* node (reachable from the root) must happen between
//!   [`Document::begin_update`] and [`Document::end_update`]. Doing so outside
//!   a transaction panics.

use crate::errors::JobError;
use crate::node::*;
use crate::registry::TypeRegistry;
use crate::transaction::{ChangeSet, DocumentChange, Listeners};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use trellis_parser::ast::Instruction;

/// Editable UI document
pub struct Document {
    location: Option<PathBuf>,
    instructions: Vec<Instruction>,
    registry: Arc<TypeRegistry>,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    identifiers: HashMap<String, NodeId>,
    next_serial: u64,
    saved_revision: u64,
    pub(crate) update_depth: usize,
    pub(crate) revision: u64,
    pub(crate) pending: ChangeSet,
    pub(crate) last_change: Option<DocumentChange>,
    pub(crate) listeners: Listeners,
}

/// Where an attached node ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
    /// Placement with the resolved index
    pub placement: Placement,
    /// Collection property created to receive the node
    pub created_property: Option<NodeId>,
}

/// Where a detached node used to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    pub placement: Placement,
    /// Emptied collection property removed from its instance, with its position
    pub pruned_property: Option<(NodeId, usize)>,
}

/// Record of a text property edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub previous: Option<String>,
    pub created: bool,
    pub removed: Option<(NodeId, usize)>,
}

impl Document {
    /// Create an empty document resolving types against `registry`
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            location: None,
            instructions: Vec::new(),
            registry,
            nodes: Vec::new(),
            root: None,
            identifiers: HashMap::new(),
            next_serial: 0,
            saved_revision: 0,
            update_depth: 0,
            revision: 0,
            pending: ChangeSet::default(),
            last_change: None,
            listeners: Listeners::default(),
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, location: Option<PathBuf>) {
        self.location = location;
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_handle(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.registry)
    }

    /// Processing instructions written before the root element
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn set_instructions(&mut self, instructions: Vec<Instruction>) {
        self.instructions = instructions;
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.instructions
            .iter()
            .filter(|pi| pi.target == "import")
            .map(|pi| pi.data.as_str())
    }

    /// Whether the document changed since the last [`Document::mark_saved`]
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn mark_saved(&mut self) {
        self.saved_revision = self.revision;
    }

    // Read access

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node by id; ids always come from this document's arena
    pub fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.index()) {
            Some(node) => node,
            None => panic!("node {} does not belong to this document", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.index()) {
            Some(node) => node,
            None => panic!("node {} does not belong to this document", id),
        }
    }

    /// Number of allocated nodes, live or detached
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<ParentLink> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn instance(&self, id: NodeId) -> Option<&InstanceNode> {
        self.get(id).and_then(Node::as_instance)
    }

    pub fn type_name(&self, id: NodeId) -> Option<&str> {
        self.instance(id).map(|instance| instance.type_name.as_str())
    }

    pub fn identifier(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::identifier)
    }

    /// Property node of an instance
    pub fn property(&self, instance: NodeId, name: &str) -> Option<NodeId> {
        self.instance(instance)
            .and_then(|inst| inst.properties.get(name).copied())
    }

    pub fn text_property(&self, instance: NodeId, name: &str) -> Option<&str> {
        let property = self.property(instance, name)?;
        match &self.node(property).as_property()?.value {
            PropertyValue::Text(value) => Some(value.as_str()),
            PropertyValue::Collection { .. } => None,
        }
    }

    /// Items of a collection property; empty when absent or textual
    pub fn collection(&self, instance: NodeId, name: &str) -> &[NodeId] {
        self.property(instance, name)
            .and_then(|property| self.collection_items(property))
            .unwrap_or(&[])
    }

    pub(crate) fn collection_items(&self, property: NodeId) -> Option<&[NodeId]> {
        match &self.get(property)?.as_property()?.value {
            PropertyValue::Collection { items, .. } => Some(items.as_slice()),
            PropertyValue::Text(_) => None,
        }
    }

    /// Structural children: property nodes of an instance, items of a
    /// collection, definitions of a virtual node
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::Instance(instance) => instance.properties.values().copied().collect(),
            NodeKind::Property(PropertyNode {
                value: PropertyValue::Collection { items, .. },
                ..
            }) => items.clone(),
            NodeKind::Virtual(virt) => virt.children.clone(),
            _ => Vec::new(),
        }
    }

    /// `id` and everything below it, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Live instances, intrinsics and virtual nodes in document order
    pub fn objects(&self) -> Vec<NodeId> {
        match self.root {
            Some(root) => self
                .descendants(root)
                .into_iter()
                .filter(|id| self.node(*id).is_object())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Collection property or definition block directly holding `id`
    pub fn containing_property(&self, id: NodeId) -> Option<NodeId> {
        let link = self.parent(id)?;
        self.node(link.parent).is_property().then_some(link.parent)
    }

    /// Nearest ancestor that is an object (skips property nodes)
    pub fn parent_object(&self, id: NodeId) -> Option<NodeId> {
        let link = self.parent(id)?;
        if self.node(link.parent).is_property() {
            self.parent(link.parent).map(|l| l.parent)
        } else {
            Some(link.parent)
        }
    }

    /// Whether `id` is reachable from the document root
    pub fn is_live(&self, id: NodeId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let mut current = id;
        loop {
            match self.parent(current) {
                Some(link) => current = link.parent,
                None => return self.root == Some(current),
            }
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id).map(|link| link.parent);
        }
        false
    }

    /// Where `id` currently sits
    pub fn placement_of(&self, id: NodeId) -> Option<Placement> {
        if self.root == Some(id) {
            return Some(Placement::Root);
        }
        let link = self.parent(id)?;
        match &self.node(link.parent).kind {
            NodeKind::Property(property) => {
                let items = self.collection_items(link.parent)?;
                let index = items.iter().position(|c| *c == id)?;
                Some(Placement::Property {
                    instance: self.parent(link.parent)?.parent,
                    name: property.name.clone(),
                    index: Some(index),
                })
            }
            NodeKind::Virtual(_) => Some(Placement::Definition {
                host: link.parent,
                index: link.index,
            }),
            _ => None,
        }
    }

    /// Node registered under an identifier (refreshed at transaction end)
    pub fn lookup(&self, identifier: &str) -> Option<NodeId> {
        self.identifiers.get(identifier).copied()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.identifiers.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Live node carrying `identifier`, scanning the tree instead of the registry
    pub fn find_live_identifier(&self, identifier: &str) -> Option<NodeId> {
        self.objects()
            .into_iter()
            .find(|id| self.identifier(*id) == Some(identifier))
    }

    /// Identifiers carried by any allocated node, live or held by history
    pub fn all_identifiers(&self) -> HashSet<String> {
        self.nodes
            .iter()
            .filter_map(|node| node.identifier().map(str::to_string))
            .collect()
    }

    // Allocation

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    /// Allocate a detached instance; resolved types get a live peer
    pub fn create_instance(&mut self, type_name: &str) -> NodeId {
        let peer = match self.registry.resolve(type_name) {
            Some(descriptor) => {
                self.next_serial += 1;
                Some(descriptor.instantiate(self.next_serial))
            }
            None => None,
        };

        self.alloc(NodeKind::Instance(InstanceNode {
            type_name: type_name.to_string(),
            id: None,
            properties: IndexMap::new(),
            peer,
        }))
    }

    pub fn create_intrinsic(&mut self, kind: IntrinsicKind, source: &str) -> NodeId {
        self.alloc(NodeKind::Intrinsic(IntrinsicNode {
            kind,
            source: source.to_string(),
            id: None,
            resolved: None,
        }))
    }

    pub fn create_virtual(&mut self) -> NodeId {
        self.alloc(NodeKind::Virtual(VirtualNode::default()))
    }

    // Mutation

    /// Fail fast when a live node is edited outside a transaction
    fn assert_mutable(&self, id: NodeId) {
        if self.update_depth == 0 && self.is_live(id) {
            panic!("node {} mutated outside of a transaction", id);
        }
    }

    pub fn set_identifier(
        &mut self,
        id: NodeId,
        identifier: Option<String>,
    ) -> Result<Option<String>, JobError> {
        self.get(id).ok_or(JobError::NodeNotFound(id))?;
        self.assert_mutable(id);

        if let Some(new_id) = &identifier {
            if self.is_live(id) {
                if let Some(other) = self.find_live_identifier(new_id) {
                    if other != id {
                        return Err(JobError::DuplicateIdentifier(new_id.clone()));
                    }
                }
            }
        }

        let previous = match &mut self.node_mut(id).kind {
            NodeKind::Instance(instance) => std::mem::replace(&mut instance.id, identifier),
            NodeKind::Intrinsic(intrinsic) => std::mem::replace(&mut intrinsic.id, identifier),
            _ => return Err(JobError::NotAnInstance(id)),
        };
        self.pending.touch(id);
        Ok(previous)
    }

    pub fn set_source(&mut self, id: NodeId, source: &str) -> Result<String, JobError> {
        self.get(id).ok_or(JobError::NodeNotFound(id))?;
        self.assert_mutable(id);

        let previous = match &mut self.node_mut(id).kind {
            NodeKind::Intrinsic(intrinsic) => {
                std::mem::replace(&mut intrinsic.source, source.to_string())
            }
            _ => return Err(JobError::NotAnIntrinsic(id)),
        };
        self.pending.touch(id);
        Ok(previous)
    }

    /// Set (`Some`) or clear (`None`) a text property
    pub fn set_text(
        &mut self,
        instance: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> Result<TextChange, JobError> {
        self.instance(instance)
            .ok_or(JobError::NotAnInstance(instance))?;
        self.assert_mutable(instance);
        self.pending.touch(instance);

        match self.property(instance, name) {
            Some(property) => {
                let previous = match self.node(property).as_property().map(|p| &p.value) {
                    Some(PropertyValue::Text(previous)) => previous.clone(),
                    _ => return Err(JobError::NotText(name.to_string())),
                };
                match value {
                    Some(value) => {
                        if let NodeKind::Property(p) = &mut self.node_mut(property).kind {
                            p.value = PropertyValue::Text(value.to_string());
                        }
                        self.pending.touch(property);
                        Ok(TextChange {
                            previous: Some(previous),
                            created: false,
                            removed: None,
                        })
                    }
                    None => Ok(TextChange {
                        previous: Some(previous),
                        created: false,
                        removed: self.remove_property(instance, name),
                    }),
                }
            }
            None => match value {
                Some(value) => {
                    self.add_property(instance, name, PropertyValue::Text(value.to_string()));
                    Ok(TextChange {
                        previous: None,
                        created: true,
                        removed: None,
                    })
                }
                None => Ok(TextChange {
                    previous: None,
                    created: false,
                    removed: None,
                }),
            },
        }
    }

    /// Undo a [`Document::set_text`]
    pub fn revert_text(
        &mut self,
        instance: NodeId,
        name: &str,
        change: &TextChange,
    ) -> Result<(), JobError> {
        if change.created {
            self.remove_property(instance, name);
        } else if let Some((property, position)) = change.removed {
            self.restore_property(instance, property, position)?;
        } else if let Some(previous) = &change.previous {
            self.set_text(instance, name, Some(previous))?;
        }
        Ok(())
    }

    fn add_property(&mut self, instance: NodeId, name: &str, value: PropertyValue) -> NodeId {
        let property = self.alloc(NodeKind::Property(PropertyNode {
            name: name.to_string(),
            value,
        }));
        self.node_mut(property).parent = Some(ParentLink {
            parent: instance,
            index: None,
        });
        if let NodeKind::Instance(inst) = &mut self.node_mut(instance).kind {
            inst.properties.insert(name.to_string(), property);
        }
        self.pending.touch(property);
        property
    }

    /// Detach a property node from its instance, returning it with its position
    pub fn remove_property(&mut self, instance: NodeId, name: &str) -> Option<(NodeId, usize)> {
        self.assert_mutable(instance);
        let (position, _, property) = match &mut self.node_mut(instance).kind {
            NodeKind::Instance(inst) => inst.properties.shift_remove_full(name)?,
            _ => return None,
        };
        self.node_mut(property).parent = None;
        self.pending.touch(instance);
        Some((property, position))
    }

    /// Put a previously removed property node back at `position`
    pub fn restore_property(
        &mut self,
        instance: NodeId,
        property: NodeId,
        position: usize,
    ) -> Result<(), JobError> {
        self.assert_mutable(instance);
        let name = self
            .get(property)
            .and_then(Node::as_property)
            .map(|p| p.name.clone())
            .ok_or(JobError::NodeNotFound(property))?;

        match &mut self.node_mut(instance).kind {
            NodeKind::Instance(inst) => {
                let at = position.min(inst.properties.len());
                inst.properties.shift_insert(at, name, property);
            }
            _ => return Err(JobError::NotAnInstance(instance)),
        }
        self.node_mut(property).parent = Some(ParentLink {
            parent: instance,
            index: None,
        });
        self.pending.touch(instance);
        Ok(())
    }

    /// Collection receiving children written directly inside an instance
    ///
    /// Unresolved types fall back to `children`.
    pub fn default_property(&self, instance: NodeId) -> Option<String> {
        let type_name = self.type_name(instance)?;
        match self.registry.resolve(type_name) {
            Some(descriptor) => descriptor.default_property.clone(),
            None => Some("children".to_string()),
        }
    }

    /// Collection property `name` of `instance`, created empty when missing
    pub fn ensure_collection(&mut self, instance: NodeId, name: &str) -> Result<NodeId, JobError> {
        let type_name = self
            .type_name(instance)
            .map(str::to_string)
            .ok_or(JobError::NotAnInstance(instance))?;

        match self.property(instance, name) {
            Some(property) => match self.collection_items(property) {
                Some(_) => Ok(property),
                None => Err(JobError::NotACollection(name.to_string())),
            },
            None => {
                self.assert_mutable(instance);
                let single = self
                    .registry
                    .resolve(&type_name)
                    .is_some_and(|d| d.is_single(name));
                Ok(self.add_property(
                    instance,
                    name,
                    PropertyValue::Collection {
                        items: Vec::new(),
                        single,
                    },
                ))
            }
        }
    }

    /// Attach a detached node at `placement`
    pub fn attach(&mut self, node: NodeId, placement: &Placement) -> Result<Attached, JobError> {
        self.get(node).ok_or(JobError::NodeNotFound(node))?;
        if self.parent(node).is_some() || self.root == Some(node) {
            return Err(JobError::AlreadyAttached(node));
        }
        if self.node(node).is_property() {
            return Err(JobError::NotAContainer(node));
        }

        let attached = match placement {
            Placement::Root => {
                assert!(
                    self.update_depth > 0,
                    "document root replaced outside of a transaction"
                );
                if self.root.is_some() {
                    return Err(JobError::RootOccupied);
                }
                self.root = Some(node);
                Attached {
                    placement: Placement::Root,
                    created_property: None,
                }
            }
            Placement::Property {
                instance,
                name,
                index,
            } => {
                let instance = *instance;
                self.instance(instance)
                    .ok_or(JobError::NotAnInstance(instance))?;
                if self.is_ancestor_or_self(node, instance) {
                    return Err(JobError::CycleDetected);
                }
                self.assert_mutable(instance);

                let created = self.property(instance, name).is_none();
                let property = self.ensure_collection(instance, name)?;
                let created = created.then_some(property);

                let at = match &mut self.node_mut(property).kind {
                    NodeKind::Property(PropertyNode {
                        value: PropertyValue::Collection { items, single },
                        ..
                    }) => {
                        if *single && !items.is_empty() {
                            return Err(JobError::SlotOccupied(name.clone()));
                        }
                        let at = index.unwrap_or(items.len()).min(items.len());
                        items.insert(at, node);
                        at
                    }
                    _ => return Err(JobError::NotACollection(name.clone())),
                };
                self.reindex(property);
                self.pending.touch(property);

                Attached {
                    placement: Placement::Property {
                        instance,
                        name: name.clone(),
                        index: Some(at),
                    },
                    created_property: created,
                }
            }
            Placement::Definition { host, index } => {
                let host = *host;
                if !self.get(host).is_some_and(Node::is_virtual) {
                    return Err(JobError::NotAContainer(host));
                }
                if self.is_ancestor_or_self(node, host) {
                    return Err(JobError::CycleDetected);
                }
                self.assert_mutable(host);

                let at = match &mut self.node_mut(host).kind {
                    NodeKind::Virtual(virt) => {
                        let at = index
                            .unwrap_or(virt.children.len())
                            .min(virt.children.len());
                        virt.children.insert(at, node);
                        at
                    }
                    _ => return Err(JobError::NotAContainer(host)),
                };
                self.reindex(host);
                self.pending.touch(host);

                Attached {
                    placement: Placement::Definition {
                        host,
                        index: Some(at),
                    },
                    created_property: None,
                }
            }
        };

        self.pending.attach(node);
        Ok(attached)
    }

    /// Detach a node from its container; with `prune`, an emptied collection
    /// property is removed from its instance
    pub fn detach(&mut self, node: NodeId, prune: bool) -> Result<Detached, JobError> {
        self.get(node).ok_or(JobError::NodeNotFound(node))?;

        if self.root == Some(node) {
            assert!(
                self.update_depth > 0,
                "document root replaced outside of a transaction"
            );
            self.root = None;
            self.pending.detach(node);
            return Ok(Detached {
                placement: Placement::Root,
                pruned_property: None,
            });
        }

        let link = self.parent(node).ok_or(JobError::NotAttached(node))?;
        let container = link.parent;
        self.assert_mutable(container);

        let detached = match &mut self.node_mut(container).kind {
            NodeKind::Property(PropertyNode {
                name,
                value: PropertyValue::Collection { items, .. },
            }) => {
                let position = items
                    .iter()
                    .position(|c| *c == node)
                    .ok_or(JobError::NotAttached(node))?;
                items.remove(position);
                let name = name.clone();
                let emptied = items.is_empty();

                let instance = self
                    .parent(container)
                    .map(|l| l.parent)
                    .ok_or(JobError::NotAttached(node))?;
                self.node_mut(node).parent = None;
                self.reindex(container);

                let pruned_property = if prune && emptied {
                    self.remove_property(instance, &name)
                } else {
                    None
                };

                Detached {
                    placement: Placement::Property {
                        instance,
                        name,
                        index: Some(position),
                    },
                    pruned_property,
                }
            }
            NodeKind::Virtual(virt) => {
                let position = virt
                    .children
                    .iter()
                    .position(|c| *c == node)
                    .ok_or(JobError::NotAttached(node))?;
                virt.children.remove(position);
                self.node_mut(node).parent = None;
                self.reindex(container);

                Detached {
                    placement: Placement::Definition {
                        host: container,
                        index: Some(position),
                    },
                    pruned_property: None,
                }
            }
            _ => return Err(JobError::NotAttached(node)),
        };

        self.pending.touch(container);
        self.pending.detach(node);
        Ok(detached)
    }

    /// Rewrite the parent links of every child of a container
    fn reindex(&mut self, container: NodeId) {
        let (children, single) = match &self.node(container).kind {
            NodeKind::Property(PropertyNode {
                value: PropertyValue::Collection { items, single },
                ..
            }) => (items.clone(), *single),
            NodeKind::Virtual(virt) => (virt.children.clone(), false),
            _ => return,
        };

        for (i, child) in children.into_iter().enumerate() {
            self.node_mut(child).parent = Some(ParentLink {
                parent: container,
                index: if single { None } else { Some(i) },
            });
        }
    }

    /// Rebuild the identifier registry and resolve references against it
    pub(crate) fn refresh_index(&mut self) {
        let objects = self.objects();

        let mut identifiers = HashMap::new();
        for id in &objects {
            if self.node(*id).is_virtual() {
                continue;
            }
            if let Some(identifier) = self.node(*id).identifier() {
                if identifiers.contains_key(identifier) {
                    debug!(identifier, node = %id, "Duplicate identifier");
                    continue;
                }
                identifiers.insert(identifier.to_string(), *id);
            }
        }

        for id in objects {
            let target = match self.node(id).as_intrinsic() {
                Some(intrinsic) if intrinsic.kind.targets_identifier() => {
                    identifiers.get(&intrinsic.source).copied()
                }
                _ => continue,
            };
            if let NodeKind::Intrinsic(intrinsic) = &mut self.node_mut(id).kind {
                intrinsic.resolved = target;
            }
        }

        self.identifiers = identifiers;
    }

    /// Describe every broken parent/index link reachable from the root
    pub fn verify_structure(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let Some(root) = self.root else {
            return problems;
        };

        if self.parent(root).is_some() {
            problems.push(format!("root {} has a parent", root));
        }

        for id in self.descendants(root) {
            let node = self.node(id);
            match &node.kind {
                NodeKind::Instance(instance) => {
                    for property in instance.properties.values() {
                        let expected = Some(ParentLink {
                            parent: id,
                            index: None,
                        });
                        if self.parent(*property) != expected {
                            problems.push(format!("property {} of {} has a stale link", property, id));
                        }
                    }
                    let resolved = self.registry.contains(&instance.type_name);
                    if instance.peer.is_some() != resolved {
                        problems.push(format!("instance {} peer does not match its type", id));
                    }
                }
                NodeKind::Property(PropertyNode {
                    value: PropertyValue::Collection { items, single },
                    name,
                }) => {
                    if *single && items.len() > 1 {
                        problems.push(format!("single slot '{}' holds {} nodes", name, items.len()));
                    }
                    for (i, child) in items.iter().enumerate() {
                        let expected = Some(ParentLink {
                            parent: id,
                            index: if *single { None } else { Some(i) },
                        });
                        if self.parent(*child) != expected {
                            problems.push(format!("child {} of {} has a stale link", child, id));
                        }
                    }
                }
                NodeKind::Virtual(virt) => {
                    for (i, child) in virt.children.iter().enumerate() {
                        let expected = Some(ParentLink {
                            parent: id,
                            index: Some(i),
                        });
                        if self.parent(*child) != expected {
                            problems.push(format!("definition {} of {} has a stale link", child, id));
                        }
                    }
                }
                _ => {}
            }
        }

        problems
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Arc::new(TypeRegistry::standard()))
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("location", &self.location)
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("revision", &self.revision)
            .field("update_depth", &self.update_depth)
            .finish()
    }
}
