//! End-to-end editing tests: load, edit through the undo stack, save

use std::collections::BTreeSet;
use std::sync::Arc;
use trellis_editor::{
    delete_grid_lines, insert_sub_component, load, save, BatchJob, Document, GridAxis,
    HierarchyMask, Job, JobError, JobPipeline, Mutation, Selection, ShiftGridJob, TypeRegistry, UndoStack,
};

const FORM: &str = r#"<?import layout.VBox?>
<VBox x:id="root" spacing="8">
  <Label x:id="title" text="Name"/>
  <TextField x:id="name"/>
  <HBox x:id="buttons">
    <Button x:id="ok" text="OK"/>
    <Button x:id="cancel" text="Cancel"/>
  </HBox>
  <x:reference source="title"/>
</VBox>
"#;

const GRID: &str = r#"<GridPane x:id="grid">
  <Label x:id="a" GridPane.columnIndex="0"/>
  <Label x:id="b" GridPane.columnIndex="1"/>
  <Label x:id="d" GridPane.columnIndex="2"/>
</GridPane>"#;

fn open(source: &str) -> anyhow::Result<Document> {
    Ok(load(source, None, Arc::new(TypeRegistry::standard()))?)
}

fn id(doc: &Document, identifier: &str) -> trellis_editor::NodeId {
    doc.lookup(identifier)
        .unwrap_or_else(|| panic!("no node named {identifier}"))
}

#[test]
fn test_undo_restores_saved_markup() -> anyhow::Result<()> {
    let mut doc = open(FORM)?;
    let before = save(&doc);
    let mut stack = UndoStack::new();

    let title = id(&doc, "title");
    let buttons = id(&doc, "buttons");
    stack.push(Box::new(Mutation::set_text(title, "text", Some("Full name"))), &mut doc)?;
    stack.push(Box::new(Mutation::remove_child(&doc, buttons)), &mut doc)?;
    let field = doc.create_instance("TextField");
    let root = doc.root().expect("root");
    let insert = insert_sub_component(&doc, root, field, Some(0)).expect("accepts");
    stack.push(Box::new(insert), &mut doc)?;

    assert_ne!(save(&doc), before);
    assert_eq!(stack.undo_levels(), 3);

    while stack.undo(&mut doc)? {}
    assert_eq!(save(&doc), before);
    assert!(doc.verify_structure().is_empty());

    while stack.redo(&mut doc)? {}
    assert!(!doc.is_live(buttons));
    assert_eq!(doc.collection(root, "children")[0], field);
    assert_eq!(doc.text_property(title, "text"), Some("Full name"));
    Ok(())
}

#[test]
fn test_delete_then_undo_restores_index() -> anyhow::Result<()> {
    let mut doc = open(FORM)?;
    let root = doc.root().expect("root");
    let name = id(&doc, "name");
    let mut stack = UndoStack::new();

    stack.push(Box::new(Mutation::remove_child(&doc, name)), &mut doc)?;
    assert!(doc.parent(name).is_none());
    assert_eq!(doc.collection(root, "children").len(), 3);

    stack.undo(&mut doc)?;
    let link = doc.parent(name).expect("reattached");
    assert_eq!(link.index, Some(1));
    assert_eq!(doc.collection(root, "children")[1], name);
    Ok(())
}

/// Fails on execute after earlier sub-jobs have run
#[derive(Debug)]
struct Refuse;

impl Job for Refuse {
    fn is_executable(&self, _doc: &Document) -> bool {
        true
    }

    fn execute(&mut self, _doc: &mut Document) -> Result<(), JobError> {
        Err(JobError::NotExecuted)
    }

    fn undo(&mut self, _doc: &mut Document) -> Result<(), JobError> {
        Ok(())
    }

    fn redo(&mut self, _doc: &mut Document) -> Result<(), JobError> {
        Ok(())
    }

    fn description(&self) -> String {
        "Refuse".to_string()
    }
}

#[test]
fn test_failed_batch_leaves_document_untouched() -> anyhow::Result<()> {
    let mut doc = open(FORM)?;
    let before = save(&doc);
    let title = id(&doc, "title");
    let ok = id(&doc, "ok");
    let buttons = id(&doc, "buttons");

    let batch = BatchJob::new("Broken")
        .with_job(Mutation::set_text(title, "text", Some("Changed")))
        .with_job(Mutation::set_identifier(ok, Some("confirm")))
        .with_job(Mutation::remove_child(&doc, buttons))
        .with_job(Refuse);

    let mut stack = UndoStack::new();
    assert!(stack.push(Box::new(batch), &mut doc).is_err());
    assert_eq!(save(&doc), before);
    assert!(doc.is_live(buttons));
    assert_eq!(doc.lookup("ok"), Some(ok));
    assert!(!stack.can_undo());
    Ok(())
}

#[test]
fn test_deleting_container_and_child_together() -> anyhow::Result<()> {
    let mut doc = open(FORM)?;
    let buttons = id(&doc, "buttons");
    let ok = id(&doc, "ok");

    let mut selection = Selection::new();
    selection.select_all([ok, buttons]);
    let job = selection.make_delete_job(&doc).expect("deletable");
    assert_eq!(job.len(), 1);

    let mut stack = UndoStack::new();
    assert!(stack.push(Box::new(job), &mut doc)?);
    assert!(!doc.is_live(buttons));
    selection.revalidate(&doc);
    assert!(selection.is_empty());

    stack.undo(&mut doc)?;
    assert!(doc.is_live(ok));
    assert_eq!(doc.parent_object(ok), Some(buttons));
    Ok(())
}

#[test]
fn test_grid_shift_and_delete() -> anyhow::Result<()> {
    let mut doc = open(GRID)?;
    let grid = doc.root().expect("root");
    let (a, b, d) = (id(&doc, "a"), id(&doc, "b"), id(&doc, "d"));
    let mut stack = UndoStack::new();

    let shift = ShiftGridJob::new(&doc, grid, GridAxis::Column, 1, 1);
    assert!(stack.push(Box::new(shift), &mut doc)?);
    {
        let mask = HierarchyMask::new(&doc, grid).expect("grid");
        assert_eq!([a, b, d].map(|n| mask.column_index(n)), [0, 2, 3]);
        assert_eq!(mask.column_count(), 4);
        assert!(mask.children_at(GridAxis::Column, 1).is_empty());
    }

    let delete = delete_grid_lines(&doc, grid, GridAxis::Column, &BTreeSet::from([2]));
    stack.push(Box::new(delete), &mut doc)?;
    assert!(!doc.is_live(b));
    let mask = HierarchyMask::new(&doc, grid).expect("grid");
    assert_eq!(mask.column_index(d), 2);

    stack.undo(&mut doc)?;
    stack.undo(&mut doc)?;
    let mask = HierarchyMask::new(&doc, grid).expect("grid");
    assert_eq!([a, b, d].map(|n| mask.column_index(n)), [0, 1, 2]);
    Ok(())
}

#[test]
fn test_pipeline_follows_renamed_references() -> anyhow::Result<()> {
    let mut doc = open(FORM)?;
    let root = doc.root().expect("root");
    let title = id(&doc, "title");
    let reference = doc.collection(root, "children")[3];
    let source = |doc: &Document| {
        doc.node(reference)
            .as_intrinsic()
            .map(|i| i.source.clone())
    };
    let mut stack = UndoStack::new().with_pipeline(JobPipeline::standard());

    stack.push(Box::new(Mutation::set_identifier(title, Some("heading"))), &mut doc)?;
    assert_eq!(source(&doc).as_deref(), Some("heading"));
    assert_eq!(stack.undo_levels(), 1);
    assert_eq!(
        doc.node(reference).as_intrinsic().and_then(|i| i.resolved),
        Some(title)
    );

    stack.undo(&mut doc)?;
    assert_eq!(source(&doc).as_deref(), Some("title"));
    assert_eq!(doc.lookup("title"), Some(title));
    Ok(())
}

#[test]
fn test_insert_rejects_identifier_already_live() -> anyhow::Result<()> {
    let mut doc = open(r#"<VBox x:id="root"><Button x:id="ok"/></VBox>"#)?;
    let root = doc.root().expect("root");
    let before = save(&doc);

    let button = doc.create_instance("Button");
    doc.set_identifier(button, Some("ok".to_string()))?;
    let insert = insert_sub_component(&doc, root, button, None).expect("accepts");
    assert!(!insert.is_executable(&doc));

    let mut stack = UndoStack::new();
    assert!(!stack.push(Box::new(insert), &mut doc)?);
    assert!(!doc.is_live(button));
    assert_eq!(save(&doc), before);
    assert!(trellis_editor::collect_diagnostics(&doc).is_empty());

    // a nested clash is caught too
    let row = doc.create_instance("HBox");
    let inner = doc.create_instance("Label");
    doc.set_identifier(inner, Some("root".to_string()))?;
    doc.attach(inner, &trellis_editor::Placement::property(row, "children", None))?;
    let mut insert = insert_sub_component(&doc, root, row, None).expect("accepts");
    assert!(!insert.is_executable(&doc));
    assert!(matches!(
        insert.execute(&mut doc),
        Err(JobError::DuplicateIdentifier(id)) if id == "root"
    ));
    assert!(!doc.is_live(row));
    Ok(())
}

#[test]
fn test_change_notifications_once_per_transaction() -> anyhow::Result<()> {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut doc = open(FORM)?;
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    doc.on_change(move |change| sink.borrow_mut().push(change.revision));

    let title = id(&doc, "title");
    let ok = id(&doc, "ok");
    let mut batch = BatchJob::new("Rename")
        .with_job(Mutation::set_text(title, "text", Some("A")))
        .with_job(Mutation::set_text(ok, "text", Some("B")));
    batch.execute(&mut doc)?;

    assert_eq!(seen.borrow().len(), 1);
    Ok(())
}
