//! # Edit Session
//!
//! Ties one document to its history, selection and clipboard. Every edit
//! goes through [`EditSession::push`]; the selection is revalidated after
//! each push, undo and redo.

use crate::clipboard::{encode, is_encodable, make_paste_job, Archive, Clipboard};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::errors::EditorError;
use crate::job::Job;
use crate::loader::{self, save_with};
use crate::mask::HierarchyMask;
use crate::pipeline::JobPipeline;
use crate::registry::TypeRegistry;
use crate::selection::Selection;
use crate::undo_stack::UndoStack;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct EditSession {
    document: Document,
    undo_stack: UndoStack,
    selection: Selection,
    clipboard: Clipboard,
    config: EditorConfig,
}

impl EditSession {
    pub fn new(document: Document, config: EditorConfig) -> Self {
        let mut undo_stack = UndoStack::with_max_levels(config.undo_limit);
        if config.reference_following {
            undo_stack.set_pipeline(Some(JobPipeline::standard()));
        }

        Self {
            document,
            undo_stack,
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            config,
        }
    }

    /// Empty document with the standard type catalogue
    pub fn empty(config: EditorConfig) -> Self {
        Self::new(Document::default(), config)
    }

    pub fn from_source(
        source: &str,
        location: Option<PathBuf>,
        registry: Arc<TypeRegistry>,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let document = loader::load(source, location, registry)?;
        Ok(Self::new(document, config))
    }

    pub fn open(path: &Path, registry: Arc<TypeRegistry>, config: EditorConfig) -> Result<Self, EditorError> {
        let document = loader::load_file(path, registry)?;
        Ok(Self::new(document, config))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selection changes are not jobs and can be made freely
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn clipboard_mut(&mut self) -> &mut Clipboard {
        &mut self.clipboard
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // History

    /// Execute and record a job; `Ok(false)` when it is not executable
    pub fn push(&mut self, job: Box<dyn Job>) -> Result<bool, EditorError> {
        let pushed = self.undo_stack.push(job, &mut self.document)?;
        self.selection.revalidate(&self.document);
        Ok(pushed)
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let undone = self.undo_stack.undo(&mut self.document)?;
        self.selection.revalidate(&self.document);
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let redone = self.undo_stack.redo(&mut self.document)?;
        self.selection.revalidate(&self.document);
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    // Selection-driven edits

    pub fn delete_selection(&mut self) -> Result<bool, EditorError> {
        match self.selection.make_delete_job(&self.document) {
            Some(job) => self.push(Box::new(job)),
            None => Ok(false),
        }
    }

    /// Put the selected objects on the clipboard; `Ok(false)` when they
    /// cannot be copied
    pub fn copy(&mut self) -> Result<bool, EditorError> {
        let Some(group) = self.selection.objects() else {
            return Ok(false);
        };
        let nodes = group.topmost(&self.document);
        if !is_encodable(&self.document, &nodes) {
            return Ok(false);
        }

        let archive = encode(&self.document, &nodes)?;
        self.clipboard.set(&archive)?;
        debug!(nodes = nodes.len(), "Copied selection");
        Ok(true)
    }

    pub fn cut(&mut self) -> Result<bool, EditorError> {
        if !self.copy()? {
            return Ok(false);
        }
        self.delete_selection()
    }

    /// Paste the clipboard into the selected container (or the root) and
    /// select the pasted nodes
    pub fn paste(&mut self) -> Result<bool, EditorError> {
        let Some(text) = self.clipboard.text() else {
            return Ok(false);
        };
        let archive = Archive::from_json(text)?;

        let target = self
            .selection
            .objects()
            .and_then(|group| group.hit_item())
            .filter(|hit| {
                HierarchyMask::new(&self.document, *hit)
                    .is_some_and(|mask| mask.accepts_sub_components())
            });

        let Some(paste) = make_paste_job(&mut self.document, &archive, target)? else {
            return Ok(false);
        };
        let nodes = paste.decoded.nodes.clone();
        if !self.push(Box::new(paste.job))? {
            return Ok(false);
        }

        let live: Vec<_> = nodes
            .into_iter()
            .filter(|id| self.document.is_live(*id))
            .collect();
        self.selection.select_all(live);
        Ok(true)
    }

    // Files

    /// Replace the document with `source`; on error the current document,
    /// history and selection are kept
    pub fn load(&mut self, source: &str, location: Option<PathBuf>) -> Result<(), EditorError> {
        let document = loader::load(source, location, self.document.registry_handle())?;
        self.document = document;
        self.undo_stack.clear();
        self.selection.clear();
        info!(location = ?self.document.location(), "Session document replaced");
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), EditorError> {
        loader::save_file(&mut self.document, &self.config)
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), EditorError> {
        self.document.set_location(Some(path.into()));
        self.save()
    }

    /// Markup of the current document
    pub fn to_markup(&self) -> String {
        save_with(&self.document, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::Mutation;

    const FORM: &str = r#"<VBox x:id="root">
  <Label x:id="title" text="Name"/>
  <TextField x:id="name"/>
</VBox>"#;

    fn session() -> EditSession {
        EditSession::from_source(
            FORM,
            None,
            Arc::new(TypeRegistry::standard()),
            EditorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_delete_selection_and_undo() {
        let mut session = session();
        let title = session.document().lookup("title").unwrap();
        session.selection_mut().select(title);

        assert!(session.delete_selection().unwrap());
        assert!(session.selection().is_empty());
        assert!(!session.document().is_live(title));

        assert!(session.undo().unwrap());
        let root = session.document().root().unwrap();
        assert_eq!(session.document().collection(root, "children")[0], title);
    }

    #[test]
    fn test_cut_and_paste_selects_pasted_nodes() {
        let mut session = session();
        let title = session.document().lookup("title").unwrap();
        session.selection_mut().select(title);

        assert!(session.cut().unwrap());
        assert!(session.clipboard().has_content());
        assert!(session.paste().unwrap());

        let selected: Vec<_> = session.selection().objects().unwrap().items().collect();
        assert_eq!(selected.len(), 1);
        // the cut node still holds its name in history
        assert_eq!(session.document().identifier(selected[0]), Some("title1"));
    }

    #[test]
    fn test_load_failure_keeps_document() {
        let mut session = session();
        let root = session.document().root().unwrap();
        session
            .push(Box::new(Mutation::set_text(root, "spacing", Some("4"))))
            .unwrap();

        assert!(session.load("<VBox>", None).is_err());
        assert!(session.can_undo());
        assert_eq!(session.document().text_property(root, "spacing"), Some("4"));

        session.load("<HBox/>", None).unwrap();
        assert!(!session.can_undo());
        assert_eq!(
            session.document().type_name(session.document().root().unwrap()),
            Some("HBox")
        );
    }

    #[test]
    fn test_copy_requires_object_selection() {
        let mut session = session();
        assert!(!session.copy().unwrap());
        assert!(!session.paste().unwrap());
    }

    #[test]
    fn test_save_without_location_fails() {
        let mut session = session();
        assert!(matches!(session.save(), Err(EditorError::NotFileBacked)));
        assert!(session.to_markup().contains("<Label x:id=\"title\" text=\"Name\"/>"));
    }
}
