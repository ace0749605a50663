//! # Selection Model
//!
//! The selection is either a set of objects or a set of grid lines. It never
//! edits the document itself; deletion goes through the job it builds.
//! After every mutation the owner calls [`Selection::revalidate`] so the
//! group only ever names live nodes.

use crate::document::Document;
use crate::job::BatchJob;
use crate::mask::{GridAxis, HierarchyMask};
use crate::mutations::Mutation;
use crate::node::{Node, NodeId, NodeKind, PropertyValue};
use crate::structural::delete_grid_lines;
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;
use std::fmt;

/// Ordered set of selected objects
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectSelectionGroup {
    items: IndexSet<NodeId>,
    /// Most recently hit member
    hit_item: Option<NodeId>,
}

/// Container shared by sibling candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    /// Multi-valued collection property or definition block
    Collection(NodeId),
    /// Single-valued slots of one instance
    Slots(NodeId),
}

impl ObjectSelectionGroup {
    /// Group over `items`; the hit item defaults to the last one
    pub fn new(items: impl IntoIterator<Item = NodeId>, hit_item: Option<NodeId>) -> Self {
        let items: IndexSet<NodeId> = items.into_iter().collect();
        let hit_item = hit_item
            .filter(|hit| items.contains(hit))
            .or_else(|| items.last().copied());
        Self { items, hit_item }
    }

    pub fn items(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().copied()
    }

    pub fn hit_item(&self) -> Option<NodeId> {
        self.hit_item
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.items.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every member is live
    pub fn is_valid(&self, doc: &Document) -> bool {
        !self.items.is_empty() && self.items.iter().all(|id| doc.is_live(*id))
    }

    /// Deepest object that is a strict ancestor of every member; `None` when
    /// the root is selected
    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        if self.items.iter().any(|id| doc.root() == Some(*id)) {
            return None;
        }
        let first = *self.items.first()?;

        let mut candidate = doc.parent_object(first);
        while let Some(ancestor) = candidate {
            let covers_all = self
                .items
                .iter()
                .all(|id| *id != ancestor && doc.is_ancestor_or_self(ancestor, *id));
            if covers_all {
                return Some(ancestor);
            }
            candidate = doc.parent_object(ancestor);
        }
        None
    }

    fn family(doc: &Document, node: NodeId) -> Option<Family> {
        let link = doc.parent(node)?;
        match doc.node(link.parent).kind() {
            NodeKind::Property(property) => match &property.value {
                PropertyValue::Collection { single: true, .. } => {
                    doc.parent(link.parent).map(|l| Family::Slots(l.parent))
                }
                PropertyValue::Collection { .. } => Some(Family::Collection(link.parent)),
                PropertyValue::Text(_) => None,
            },
            NodeKind::Virtual(_) => Some(Family::Collection(link.parent)),
            _ => None,
        }
    }

    /// Non-virtual nodes sharing the members' container; empty when the
    /// members do not all belong to one container
    pub fn siblings(&self, doc: &Document) -> Vec<NodeId> {
        let mut families = self.items.iter().map(|id| Self::family(doc, *id));
        let Some(Some(family)) = families.next() else {
            return Vec::new();
        };
        if !families.all(|f| f == Some(family)) {
            return Vec::new();
        }

        let candidates: Vec<NodeId> = match family {
            Family::Collection(container) => doc.children(container),
            Family::Slots(instance) => doc
                .children(instance)
                .into_iter()
                .filter(|property| {
                    matches!(
                        doc.node(*property).as_property().map(|p| &p.value),
                        Some(PropertyValue::Collection { single: true, .. })
                    )
                })
                .flat_map(|property| doc.children(property))
                .collect(),
        };

        candidates
            .into_iter()
            .filter(|id| !doc.node(*id).is_virtual())
            .collect()
    }

    /// Identifier → node over the selected subtrees
    pub fn collect_selected_by_id(&self, doc: &Document) -> IndexMap<String, NodeId> {
        let mut result = IndexMap::new();
        for item in &self.items {
            for id in doc.descendants(*item) {
                if let Some(identifier) = doc.get(id).and_then(Node::identifier) {
                    result.entry(identifier.to_string()).or_insert(id);
                }
            }
        }
        result
    }

    /// Members with no selected ancestor
    pub fn topmost(&self, doc: &Document) -> Vec<NodeId> {
        self.items
            .iter()
            .copied()
            .filter(|id| {
                !self
                    .items
                    .iter()
                    .any(|other| other != id && doc.is_ancestor_or_self(*other, *id))
            })
            .collect()
    }

    /// Removes every member; selected descendants of a selected node are
    /// left to their ancestor
    pub fn make_delete_job(&self, doc: &Document) -> BatchJob {
        let targets = self.topmost(doc);
        let description = match targets.as_slice() {
            [only] => format!("Delete {}", doc.node(*only).label()),
            _ => format!("Delete {} objects", targets.len()),
        };

        let mut batch = BatchJob::new(description);
        for node in targets {
            let job = if doc.root() == Some(node) {
                Mutation::set_root(None)
            } else {
                Mutation::remove_child(doc, node)
            };
            batch.push(Box::new(job));
        }
        batch
    }

    /// Drop members that are no longer live; true when something changed
    fn retain_live(&mut self, doc: &Document) -> bool {
        let before = self.items.len();
        self.items.retain(|id| doc.is_live(*id));
        if self.hit_item.is_some_and(|hit| !self.items.contains(&hit)) {
            self.hit_item = self.items.last().copied();
        }
        self.items.len() != before
    }
}

/// Selected rows or columns of a grid container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSelectionGroup {
    pub container: NodeId,
    pub axis: GridAxis,
    pub lines: BTreeSet<usize>,
}

impl GridSelectionGroup {
    pub fn new(container: NodeId, axis: GridAxis, lines: impl IntoIterator<Item = usize>) -> Self {
        Self {
            container,
            axis,
            lines: lines.into_iter().collect(),
        }
    }

    pub fn is_valid(&self, doc: &Document) -> bool {
        if self.lines.is_empty() || !doc.is_live(self.container) {
            return false;
        }
        match HierarchyMask::new(doc, self.container) {
            Some(mask) if mask.is_grid() => {
                let count = mask.line_count(self.axis);
                self.lines.iter().all(|line| *line < count)
            }
            _ => false,
        }
    }

    pub fn make_delete_job(&self, doc: &Document) -> BatchJob {
        delete_grid_lines(doc, self.container, self.axis, &self.lines)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionGroup {
    Objects(ObjectSelectionGroup),
    Grid(GridSelectionGroup),
}

impl SelectionGroup {
    pub fn is_valid(&self, doc: &Document) -> bool {
        match self {
            SelectionGroup::Objects(group) => group.is_valid(doc),
            SelectionGroup::Grid(group) => group.is_valid(doc),
        }
    }

    pub fn make_delete_job(&self, doc: &Document) -> BatchJob {
        match self {
            SelectionGroup::Objects(group) => group.make_delete_job(doc),
            SelectionGroup::Grid(group) => group.make_delete_job(doc),
        }
    }

    pub fn as_objects(&self) -> Option<&ObjectSelectionGroup> {
        match self {
            SelectionGroup::Objects(group) => Some(group),
            SelectionGroup::Grid(_) => None,
        }
    }
}

type SelectionListener = Box<dyn FnMut(Option<&SelectionGroup>)>;

/// Current selection of an editing session
#[derive(Default)]
pub struct Selection {
    group: Option<SelectionGroup>,
    revision: u64,
    listeners: Vec<SelectionListener>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self) -> Option<&SelectionGroup> {
        self.group.as_ref()
    }

    pub fn objects(&self) -> Option<&ObjectSelectionGroup> {
        self.group.as_ref().and_then(SelectionGroup::as_objects)
    }

    /// Incremented on every selection change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_none()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.objects().is_some_and(|group| group.contains(node))
    }

    pub fn on_change(&mut self, listener: impl FnMut(Option<&SelectionGroup>) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn replace(&mut self, group: Option<SelectionGroup>) {
        if self.group == group {
            return;
        }
        self.group = group;
        self.changed();
    }

    fn changed(&mut self) {
        self.revision += 1;
        let group = self.group.as_ref();
        for listener in &mut self.listeners {
            listener(group);
        }
    }

    pub fn select(&mut self, node: NodeId) {
        self.replace(Some(SelectionGroup::Objects(ObjectSelectionGroup::new(
            [node],
            Some(node),
        ))));
    }

    pub fn select_all(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        let group = ObjectSelectionGroup::new(nodes, None);
        self.replace((!group.is_empty()).then_some(SelectionGroup::Objects(group)));
    }

    /// Add `node` to an object selection, or remove it when already selected
    pub fn toggle(&mut self, node: NodeId) {
        let group = match self.objects() {
            Some(current) if current.contains(node) => {
                let rest: Vec<NodeId> = current.items().filter(|id| *id != node).collect();
                let hit = current.hit_item().filter(|hit| *hit != node);
                let group = ObjectSelectionGroup::new(rest, hit);
                (!group.is_empty()).then_some(SelectionGroup::Objects(group))
            }
            Some(current) => {
                let items = current.items().chain([node]);
                Some(SelectionGroup::Objects(ObjectSelectionGroup::new(items, Some(node))))
            }
            None => Some(SelectionGroup::Objects(ObjectSelectionGroup::new(
                [node],
                Some(node),
            ))),
        };
        self.replace(group);
    }

    pub fn select_grid(&mut self, container: NodeId, axis: GridAxis, lines: impl IntoIterator<Item = usize>) {
        let group = GridSelectionGroup::new(container, axis, lines);
        self.replace((!group.lines.is_empty()).then_some(SelectionGroup::Grid(group)));
    }

    pub fn clear(&mut self) {
        self.replace(None);
    }

    /// Drop dead members, and the whole group when nothing valid remains
    ///
    /// Returns true when the selection changed.
    pub fn revalidate(&mut self, doc: &Document) -> bool {
        let changed = match &mut self.group {
            None => false,
            Some(SelectionGroup::Objects(group)) => {
                let dropped = group.retain_live(doc);
                if group.is_empty() {
                    self.group = None;
                }
                dropped
            }
            Some(SelectionGroup::Grid(group)) => {
                if group.is_valid(doc) {
                    false
                } else {
                    self.group = None;
                    true
                }
            }
        };
        if changed {
            self.changed();
        }
        changed
    }

    /// Delete job for the current group
    pub fn make_delete_job(&self, doc: &Document) -> Option<BatchJob> {
        self.group.as_ref().map(|group| group.make_delete_job(doc))
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("group", &self.group)
            .field("revision", &self.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use crate::loader::load;
    use crate::registry::TypeRegistry;
    use std::sync::Arc;

    const FORM: &str = r#"<VBox x:id="root">
  <HBox x:id="row">
    <Label x:id="a"/>
    <Label x:id="b"/>
    <x:define><Label x:id="hidden"/></x:define>
  </HBox>
  <Button x:id="ok">
    <graphic><ImageView x:id="icon"/></graphic>
  </Button>
  <Label x:id="c"/>
</VBox>"#;

    fn doc() -> Document {
        load(FORM, None, Arc::new(TypeRegistry::standard())).unwrap()
    }

    fn group(doc: &Document, ids: &[&str]) -> ObjectSelectionGroup {
        ObjectSelectionGroup::new(ids.iter().map(|id| doc.lookup(id).unwrap()), None)
    }

    #[test]
    fn test_common_ancestor() {
        let doc = doc();
        assert_eq!(group(&doc, &["a", "b"]).common_ancestor(&doc), doc.lookup("row"));
        assert_eq!(group(&doc, &["a", "c"]).common_ancestor(&doc), doc.lookup("root"));
        assert_eq!(group(&doc, &["row", "a"]).common_ancestor(&doc), doc.lookup("root"));
        assert_eq!(group(&doc, &["root", "a"]).common_ancestor(&doc), None);
    }

    #[test]
    fn test_siblings_exclude_definitions() {
        let doc = doc();
        let siblings = group(&doc, &["a"]).siblings(&doc);
        assert_eq!(siblings, vec![doc.lookup("a").unwrap(), doc.lookup("b").unwrap()]);
        assert!(group(&doc, &["a", "c"]).siblings(&doc).is_empty());
        assert!(group(&doc, &["root"]).siblings(&doc).is_empty());
        assert_eq!(group(&doc, &["icon"]).siblings(&doc), vec![doc.lookup("icon").unwrap()]);
    }

    #[test]
    fn test_collect_selected_by_id() {
        let doc = doc();
        let ids = group(&doc, &["row", "ok"]).collect_selected_by_id(&doc);
        let keys: Vec<_> = ids.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["row", "a", "b", "hidden", "ok", "icon"]);
    }

    #[test]
    fn test_delete_prefers_ancestor() {
        let mut doc = doc();
        let before = doc.snapshot();
        let selection = group(&doc, &["a", "row", "c"]);
        let mut job = selection.make_delete_job(&doc);
        assert_eq!(job.len(), 2);
        assert_eq!(job.description(), "Delete 2 objects");

        job.execute(&mut doc).unwrap();
        assert!(!selection.is_valid(&doc));
        assert!(doc.lookup("row").is_none());

        job.undo(&mut doc).unwrap();
        assert_eq!(doc.snapshot(), before);
        assert!(selection.is_valid(&doc));
    }

    #[test]
    fn test_deleting_root_empties_document() {
        let mut doc = doc();
        let mut job = group(&doc, &["root", "a"]).make_delete_job(&doc);
        job.execute(&mut doc).unwrap();
        assert!(doc.root().is_none());
        job.undo(&mut doc).unwrap();
        assert_eq!(doc.root(), doc.lookup("root"));
    }

    #[test]
    fn test_selection_revalidate_and_toggle() {
        let mut doc = doc();
        let a = doc.lookup("a").unwrap();
        let c = doc.lookup("c").unwrap();
        let mut selection = Selection::new();

        selection.select(a);
        selection.toggle(c);
        assert_eq!(selection.objects().unwrap().len(), 2);
        assert_eq!(selection.objects().unwrap().hit_item(), Some(c));

        let mut job = selection.make_delete_job(&doc).unwrap();
        job.execute(&mut doc).unwrap();
        assert!(selection.revalidate(&doc));
        assert!(selection.is_empty());

        job.undo(&mut doc).unwrap();
        selection.select(a);
        selection.toggle(a);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_selection_notifies_listeners() {
        use std::cell::Cell;
        use std::rc::Rc;

        let doc = doc();
        let a = doc.lookup("a").unwrap();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        let mut selection = Selection::new();
        selection.on_change(move |_| counter.set(counter.get() + 1));
        selection.select(a);
        selection.select(a);
        selection.clear();
        assert_eq!(calls.get(), 2);
        assert_eq!(selection.revision(), 2);
    }

    #[test]
    fn test_grid_selection_validity() {
        let doc = load(
            r#"<GridPane><Label GridPane.rowIndex="1"/></GridPane>"#,
            None,
            Arc::new(TypeRegistry::standard()),
        )
        .unwrap();
        let grid = doc.root().unwrap();
        assert!(GridSelectionGroup::new(grid, GridAxis::Row, [1]).is_valid(&doc));
        assert!(!GridSelectionGroup::new(grid, GridAxis::Row, [2]).is_valid(&doc));
        assert!(!GridSelectionGroup::new(grid, GridAxis::Column, []).is_valid(&doc));
    }
}
