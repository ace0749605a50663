//! # Mutations
//!
//! The closed set of atomic edits. Each variant carries its arguments and,
//! once executed, the record needed to reverse it.
//!
//! ## Semantics
//!
//! ### InsertChild
//! - Attaches a detached node; a missing collection property is created
//! - Single-valued slots must be empty
//! - No identifier in the inserted subtree may already be live
//!
//! ### RemoveChild
//! - Detaches (never destroys) the node, remembering property and index
//! - An emptied collection property is removed and restored on undo
//! - A node already cut off from the root by an earlier removal is skipped
//!
//! ### Relocate
//! - Detach then attach; the target index counts positions after the detach
//! - Fails on cycles
//!
//! ### SetText / SetIdentifier / SetSource / SetRoot
//! - Value replacement; undo restores the previous value and position

use crate::document::{Attached, Detached, Document, TextChange};
use crate::errors::JobError;
use crate::job::Job;
use crate::node::{Node, NodeId, Placement, PropertyValue};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub enum Mutation {
    InsertChild {
        node: NodeId,
        placement: Placement,
        label: String,
        applied: Option<Attached>,
    },

    RemoveChild {
        node: NodeId,
        label: String,
        applied: Option<Detached>,
        skipped: bool,
    },

    Relocate {
        node: NodeId,
        target: Placement,
        label: String,
        applied: Option<(Detached, Attached, Option<(NodeId, usize)>)>,
    },

    SetText {
        instance: NodeId,
        name: String,
        value: Option<String>,
        applied: Option<TextChange>,
    },

    SetIdentifier {
        node: NodeId,
        identifier: Option<String>,
        previous: Option<Option<String>>,
    },

    SetSource {
        node: NodeId,
        source: String,
        previous: Option<String>,
    },

    SetRoot {
        node: Option<NodeId>,
        previous: Option<Option<NodeId>>,
    },
}

impl Mutation {
    pub fn insert_child(doc: &Document, node: NodeId, placement: Placement) -> Self {
        Mutation::InsertChild {
            node,
            placement,
            label: label_of(doc, node),
            applied: None,
        }
    }

    pub fn remove_child(doc: &Document, node: NodeId) -> Self {
        Mutation::RemoveChild {
            node,
            label: label_of(doc, node),
            applied: None,
            skipped: false,
        }
    }

    pub fn relocate(doc: &Document, node: NodeId, target: Placement) -> Self {
        Mutation::Relocate {
            node,
            target,
            label: label_of(doc, node),
            applied: None,
        }
    }

    pub fn set_text(instance: NodeId, name: impl Into<String>, value: Option<&str>) -> Self {
        Mutation::SetText {
            instance,
            name: name.into(),
            value: value.map(str::to_string),
            applied: None,
        }
    }

    pub fn set_identifier(node: NodeId, identifier: Option<&str>) -> Self {
        Mutation::SetIdentifier {
            node,
            identifier: identifier.map(str::to_string),
            previous: None,
        }
    }

    pub fn set_source(node: NodeId, source: impl Into<String>) -> Self {
        Mutation::SetSource {
            node,
            source: source.into(),
            previous: None,
        }
    }

    pub fn set_root(node: Option<NodeId>) -> Self {
        Mutation::SetRoot {
            node,
            previous: None,
        }
    }

    /// Whether a RemoveChild found its node already cut off and did nothing
    pub fn was_skipped(&self) -> bool {
        matches!(self, Mutation::RemoveChild { skipped: true, .. })
    }
}

fn label_of(doc: &Document, node: NodeId) -> String {
    doc.get(node).map(Node::label).unwrap_or_default()
}

fn is_attached(doc: &Document, node: NodeId) -> bool {
    doc.parent(node).is_some() || doc.root() == Some(node)
}

/// First identifier in the detached subtree of `node` already carried by a
/// live node
fn clashing_identifier(doc: &Document, node: NodeId) -> Option<String> {
    let subtree: Vec<&str> = doc
        .descendants(node)
        .into_iter()
        .filter_map(|id| doc.identifier(id))
        .collect();
    if subtree.is_empty() {
        return None;
    }
    let live: HashSet<&str> = doc
        .objects()
        .into_iter()
        .filter_map(|id| doc.identifier(id))
        .collect();
    subtree
        .into_iter()
        .find(|identifier| live.contains(identifier))
        .map(str::to_string)
}

/// Whether `node` could be attached at `placement` once detached
fn can_attach(doc: &Document, node: NodeId, placement: &Placement) -> bool {
    match placement {
        Placement::Root => doc.root().is_none() || doc.root() == Some(node),
        Placement::Property { instance, name, .. } => {
            if doc.instance(*instance).is_none() || !doc.is_live(*instance) {
                return false;
            }
            if doc.is_ancestor_or_self(node, *instance) {
                return false;
            }
            match doc.property(*instance, name) {
                None => true,
                Some(property) => match doc.node(property).as_property().map(|p| &p.value) {
                    Some(PropertyValue::Collection { items, single }) => {
                        !*single || items.is_empty() || items.as_slice() == [node]
                    }
                    _ => false,
                },
            }
        }
        Placement::Definition { host, .. } => {
            doc.get(*host).is_some_and(Node::is_virtual)
                && doc.is_live(*host)
                && !doc.is_ancestor_or_self(node, *host)
        }
    }
}

/// Remove `instance.name` if it is an empty collection
fn prune_if_empty(doc: &mut Document, placement: &Placement) -> Option<(NodeId, usize)> {
    match placement {
        Placement::Property { instance, name, .. } => {
            let property = doc.property(*instance, name)?;
            match doc.collection_items(property) {
                Some([]) => doc.remove_property(*instance, name),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Reverse an attach: detach again and drop the property it created
fn unattach(doc: &mut Document, node: NodeId, attached: &Attached) -> Result<(), JobError> {
    doc.detach(node, false)?;
    if let (Some(_), Placement::Property { instance, name, .. }) =
        (attached.created_property, &attached.placement)
    {
        doc.remove_property(*instance, name);
    }
    Ok(())
}

/// Reverse a detach: restore a pruned property and re-attach at the old index
fn undetach(doc: &mut Document, node: NodeId, detached: &Detached) -> Result<(), JobError> {
    if let (Some((property, position)), Placement::Property { instance, .. }) =
        (detached.pruned_property, &detached.placement)
    {
        doc.restore_property(*instance, property, position)?;
    }
    doc.attach(node, &detached.placement)?;
    Ok(())
}

impl Job for Mutation {
    fn is_executable(&self, doc: &Document) -> bool {
        match self {
            Mutation::InsertChild {
                node, placement, ..
            } => doc.get(*node).is_some_and(Node::is_object)
                && !is_attached(doc, *node)
                && !matches!(placement, Placement::Root)
                && can_attach(doc, *node, placement)
                && clashing_identifier(doc, *node).is_none(),

            Mutation::RemoveChild { node, .. } => {
                doc.get(*node).is_some_and(Node::is_object) && is_attached(doc, *node)
            }

            Mutation::Relocate { node, target, .. } => {
                doc.is_live(*node)
                    && doc.root() != Some(*node)
                    && !matches!(target, Placement::Root)
                    && can_attach(doc, *node, target)
            }

            Mutation::SetText {
                instance,
                name,
                value,
                ..
            } => {
                if doc.instance(*instance).is_none() {
                    return false;
                }
                match doc.property(*instance, name) {
                    None => value.is_some(),
                    Some(_) => match doc.text_property(*instance, name) {
                        Some(current) => value.as_deref() != Some(current),
                        None => false,
                    },
                }
            }

            Mutation::SetIdentifier {
                node, identifier, ..
            } => {
                let Some(current) = doc.get(*node) else {
                    return false;
                };
                if current.is_virtual() || current.is_property() {
                    return false;
                }
                if current.identifier() == identifier.as_deref() {
                    return false;
                }
                match identifier {
                    Some(id) if doc.is_live(*node) => doc
                        .find_live_identifier(id)
                        .map_or(true, |other| other == *node),
                    _ => true,
                }
            }

            Mutation::SetSource { node, source, .. } => doc
                .get(*node)
                .and_then(Node::as_intrinsic)
                .is_some_and(|intrinsic| intrinsic.source != *source),

            Mutation::SetRoot { node, .. } => match node {
                Some(node) => {
                    doc.get(*node).is_some_and(Node::is_object)
                        && !is_attached(doc, *node)
                }
                None => doc.root().is_some(),
            },
        }
    }

    fn execute(&mut self, doc: &mut Document) -> Result<(), JobError> {
        doc.update(|doc| match self {
            Mutation::InsertChild {
                node,
                placement,
                applied,
                ..
            } => {
                if let Some(identifier) = clashing_identifier(doc, *node) {
                    return Err(JobError::DuplicateIdentifier(identifier));
                }
                *applied = Some(doc.attach(*node, placement)?);
                Ok(())
            }

            Mutation::RemoveChild {
                node,
                applied,
                skipped,
                ..
            } => {
                if !doc.is_live(*node) {
                    *skipped = true;
                    *applied = None;
                    return Ok(());
                }
                *skipped = false;
                *applied = Some(doc.detach(*node, true)?);
                Ok(())
            }

            Mutation::Relocate {
                node,
                target,
                applied,
                ..
            } => {
                let from = doc.detach(*node, false)?;
                let to = match doc.attach(*node, target) {
                    Ok(to) => to,
                    Err(e) => {
                        doc.attach(*node, &from.placement)?;
                        return Err(e);
                    }
                };
                let pruned = prune_if_empty(doc, &from.placement);
                *applied = Some((from, to, pruned));
                Ok(())
            }

            Mutation::SetText {
                instance,
                name,
                value,
                applied,
            } => {
                *applied = Some(doc.set_text(*instance, name, value.as_deref())?);
                Ok(())
            }

            Mutation::SetIdentifier {
                node,
                identifier,
                previous,
            } => {
                *previous = Some(doc.set_identifier(*node, identifier.clone())?);
                Ok(())
            }

            Mutation::SetSource {
                node,
                source,
                previous,
            } => {
                *previous = Some(doc.set_source(*node, source)?);
                Ok(())
            }

            Mutation::SetRoot { node, previous } => {
                let old = doc.root();
                if let Some(old) = old {
                    doc.detach(old, false)?;
                }
                if let Some(node) = node {
                    if let Err(e) = doc.attach(*node, &Placement::Root) {
                        if let Some(old) = old {
                            doc.attach(old, &Placement::Root)?;
                        }
                        return Err(e);
                    }
                }
                *previous = Some(old);
                Ok(())
            }
        })
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), JobError> {
        doc.update(|doc| match self {
            Mutation::InsertChild { node, applied, .. } => {
                let attached = applied.take().ok_or(JobError::NotExecuted)?;
                unattach(doc, *node, &attached)
            }

            Mutation::RemoveChild {
                node,
                applied,
                skipped,
                ..
            } => {
                if *skipped {
                    return Ok(());
                }
                let detached = applied.take().ok_or(JobError::NotExecuted)?;
                undetach(doc, *node, &detached)
            }

            Mutation::Relocate { node, applied, .. } => {
                let (from, to, pruned) = applied.take().ok_or(JobError::NotExecuted)?;
                unattach(doc, *node, &to)?;
                if let (Some((property, position)), Placement::Property { instance, .. }) =
                    (pruned, &from.placement)
                {
                    doc.restore_property(*instance, property, position)?;
                }
                doc.attach(*node, &from.placement)?;
                Ok(())
            }

            Mutation::SetText {
                instance,
                name,
                applied,
                ..
            } => {
                let change = applied.take().ok_or(JobError::NotExecuted)?;
                doc.revert_text(*instance, name, &change)
            }

            Mutation::SetIdentifier { node, previous, .. } => {
                let previous = previous.take().ok_or(JobError::NotExecuted)?;
                doc.set_identifier(*node, previous)?;
                Ok(())
            }

            Mutation::SetSource { node, previous, .. } => {
                let previous = previous.take().ok_or(JobError::NotExecuted)?;
                doc.set_source(*node, &previous)?;
                Ok(())
            }

            Mutation::SetRoot { node, previous } => {
                let old = previous.take().ok_or(JobError::NotExecuted)?;
                if node.is_some() {
                    if let Some(current) = doc.root() {
                        doc.detach(current, false)?;
                    }
                }
                if let Some(old) = old {
                    doc.attach(old, &Placement::Root)?;
                }
                Ok(())
            }
        })
    }

    fn redo(&mut self, doc: &mut Document) -> Result<(), JobError> {
        self.execute(doc)
    }

    fn description(&self) -> String {
        match self {
            Mutation::InsertChild { label, .. } => format!("Insert {}", label),
            Mutation::RemoveChild { label, .. } => format!("Delete {}", label),
            Mutation::Relocate { label, .. } => format!("Move {}", label),
            Mutation::SetText { name, .. } => format!("Set {}", name),
            Mutation::SetIdentifier { .. } => "Set identifier".to_string(),
            Mutation::SetSource { .. } => "Set source".to_string(),
            Mutation::SetRoot { .. } => "Replace root".to_string(),
        }
    }
}
