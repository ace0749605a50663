//! Structural jobs built on [`HierarchyMask`].

use crate::document::Document;
use crate::errors::JobError;
use crate::job::{BatchJob, Job};
use crate::mask::{GridAxis, HierarchyMask};
use crate::mutations::Mutation;
use crate::node::{NodeId, Placement};
use std::collections::BTreeSet;

/// Insert a detached node as sub-component `index` (`None` appends)
///
/// `None` when the container does not accept the node.
pub fn insert_sub_component(
    doc: &Document,
    container: NodeId,
    node: NodeId,
    index: Option<usize>,
) -> Option<Mutation> {
    let mask = HierarchyMask::new(doc, container)?;
    if !mask.is_accepting_sub_component(doc.type_name(node)) {
        return None;
    }
    let property = mask.main_property()?;
    let position = index.map(|i| mask.collection_index(i));
    Some(Mutation::insert_child(
        doc,
        node,
        Placement::property(container, property, position),
    ))
}

/// Move a live node to sub-component `index` of `container`
pub fn relocate_sub_component(
    doc: &Document,
    node: NodeId,
    container: NodeId,
    index: Option<usize>,
) -> Option<Mutation> {
    let mask = HierarchyMask::new(doc, container)?;
    if !mask.accepts_type(doc.type_name(node)) {
        return None;
    }
    let property = mask.main_property()?;
    let position = index.map(|i| mask.collection_index_skipping(i, Some(node)));
    Some(Mutation::relocate(
        doc,
        node,
        Placement::property(container, property, position),
    ))
}

fn axis_label(axis: GridAxis) -> &'static str {
    match axis {
        GridAxis::Column => "columns",
        GridAxis::Row => "rows",
    }
}

/// Shifts every grid child at line `from` or later by `delta`
#[derive(Debug)]
pub struct ShiftGridJob {
    batch: BatchJob,
}

impl ShiftGridJob {
    /// An empty (non-executable) job when the container is not a grid or a
    /// child would land on a negative line
    pub fn new(doc: &Document, container: NodeId, axis: GridAxis, from: usize, delta: isize) -> Self {
        let mut batch = BatchJob::new(format!("Shift {}", axis_label(axis)));
        let Some(mask) = HierarchyMask::new(doc, container).filter(|m| m.is_grid()) else {
            return Self { batch };
        };

        let property = mask.coordinate_property(axis);
        let mut edits = Vec::new();
        for child in mask.sub_components() {
            if doc.instance(child).is_none() {
                continue;
            }
            let line = mask.coordinate(child, axis);
            if line < from || delta == 0 {
                continue;
            }
            match line.checked_add_signed(delta) {
                Some(target) => edits.push((child, target)),
                None => return Self { batch },
            }
        }

        for (child, target) in edits {
            batch.push(Box::new(Mutation::set_text(
                child,
                property.as_str(),
                Some(&target.to_string()),
            )));
        }
        Self { batch }
    }
}

/// Moves the children on exactly one grid line by `delta`
#[derive(Debug)]
pub struct MoveGridLineJob {
    batch: BatchJob,
}

impl MoveGridLineJob {
    pub fn new(doc: &Document, container: NodeId, axis: GridAxis, line: usize, delta: isize) -> Self {
        let label = match axis {
            GridAxis::Column => "Move column",
            GridAxis::Row => "Move row",
        };
        let mut batch = BatchJob::new(label);
        let Some(mask) = HierarchyMask::new(doc, container).filter(|m| m.is_grid()) else {
            return Self { batch };
        };
        let Some(target) = line.checked_add_signed(delta).filter(|t| *t != line) else {
            return Self { batch };
        };

        let property = mask.coordinate_property(axis);
        for child in mask.children_at(axis, line) {
            batch.push(Box::new(Mutation::set_text(
                child,
                property.as_str(),
                Some(&target.to_string()),
            )));
        }
        Self { batch }
    }
}

macro_rules! delegate_to_batch {
    ($job:ty) => {
        impl Job for $job {
            fn is_executable(&self, doc: &Document) -> bool {
                self.batch.is_executable(doc)
            }

            fn execute(&mut self, doc: &mut Document) -> Result<(), JobError> {
                self.batch.execute(doc)
            }

            fn undo(&mut self, doc: &mut Document) -> Result<(), JobError> {
                self.batch.undo(doc)
            }

            fn redo(&mut self, doc: &mut Document) -> Result<(), JobError> {
                self.batch.redo(doc)
            }

            fn description(&self) -> String {
                self.batch.description()
            }
        }
    };
}

delegate_to_batch!(ShiftGridJob);
delegate_to_batch!(MoveGridLineJob);

/// Remove the children on `lines` and close the gaps they leave
pub fn delete_grid_lines(
    doc: &Document,
    container: NodeId,
    axis: GridAxis,
    lines: &BTreeSet<usize>,
) -> BatchJob {
    let mut batch = BatchJob::new(format!("Delete {}", axis_label(axis)));
    let Some(mask) = HierarchyMask::new(doc, container).filter(|m| m.is_grid()) else {
        return batch;
    };

    let property = mask.coordinate_property(axis);
    for child in mask.sub_components() {
        if doc.instance(child).is_none() {
            continue;
        }
        let line = mask.coordinate(child, axis);
        if lines.contains(&line) {
            batch.push(Box::new(Mutation::remove_child(doc, child)));
            continue;
        }
        let removed_before = lines.range(..line).count();
        if removed_before > 0 {
            batch.push(Box::new(Mutation::set_text(
                child,
                property.as_str(),
                Some(&(line - removed_before).to_string()),
            )));
        }
    }
    batch
}
