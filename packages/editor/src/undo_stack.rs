//! # Undo/Redo Stack
//!
//! Records executed jobs and replays them.
//!
//! - `push` runs the job (through the pipeline, when one is installed) and
//!   clears the redo stack
//! - `undo`/`redo` move whole entries between the two stacks; the pipeline is
//!   not consulted again
//! - Non-executable jobs are rejected without error
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! stack.push(Box::new(Mutation::set_text(button, "text", Some("OK"))), &mut doc)?;
//! stack.undo(&mut doc)?;
//! stack.redo(&mut doc)?;
//! ```

use crate::document::Document;
use crate::errors::JobError;
use crate::job::Job;
use crate::pipeline::JobPipeline;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct UndoStack {
    /// Executed entries (most recent last)
    undo_stack: Vec<Box<dyn Job>>,

    /// Undone entries (most recent last)
    redo_stack: Vec<Box<dyn Job>>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    pipeline: Option<JobPipeline>,
}

impl UndoStack {
    /// Unbounded stack without pipeline
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            max_levels,
            ..Self::default()
        }
    }

    pub fn with_pipeline(mut self, pipeline: JobPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn set_pipeline(&mut self, pipeline: Option<JobPipeline>) {
        self.pipeline = pipeline;
    }

    pub fn pipeline(&self) -> Option<&JobPipeline> {
        self.pipeline.as_ref()
    }

    /// Execute `job` and record it
    ///
    /// Returns `Ok(false)` when the job is not executable; nothing changes then.
    pub fn push(&mut self, mut job: Box<dyn Job>, doc: &mut Document) -> Result<bool, JobError> {
        if !job.is_executable(doc) {
            debug!(job = %job.description(), "Job not executable");
            return Ok(false);
        }

        let entry = match &self.pipeline {
            Some(pipeline) => match pipeline.run(job, doc)? {
                Some(entry) => entry,
                None => return Ok(false),
            },
            None => {
                job.execute(doc)?;
                job
            }
        };

        info!(job = %entry.description(), revision = doc.revision(), "Executed");
        self.undo_stack.push(entry);
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(true)
    }

    /// Undo the most recent entry; `Ok(false)` when there is none
    pub fn undo(&mut self, doc: &mut Document) -> Result<bool, JobError> {
        let Some(mut job) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = job.undo(doc) {
            self.undo_stack.push(job);
            return Err(e);
        }
        debug!(job = %job.description(), "Undone");
        self.redo_stack.push(job);
        Ok(true)
    }

    /// Redo the most recently undone entry; `Ok(false)` when there is none
    pub fn redo(&mut self, doc: &mut Document) -> Result<bool, JobError> {
        let Some(mut job) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = job.redo(doc) {
            self.redo_stack.push(job);
            return Err(e);
        }
        debug!(job = %job.description(), "Redone");
        self.undo_stack.push(job);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|job| job.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|job| job.description())
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::Mutation;
    use crate::node::{NodeId, Placement};

    fn setup() -> (Document, NodeId) {
        let mut doc = Document::default();
        let root = doc.create_instance("VBox");
        doc.update(|d| d.attach(root, &Placement::Root)).unwrap();
        (doc, root)
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_push_undo_redo() {
        let (mut doc, root) = setup();
        let mut stack = UndoStack::new();

        let pushed = stack
            .push(Box::new(Mutation::set_text(root, "spacing", Some("4"))), &mut doc)
            .unwrap();
        assert!(pushed);
        assert_eq!(stack.undo_description().as_deref(), Some("Set spacing"));

        assert!(stack.undo(&mut doc).unwrap());
        assert_eq!(doc.text_property(root, "spacing"), None);
        assert!(stack.can_redo());

        assert!(stack.redo(&mut doc).unwrap());
        assert_eq!(doc.text_property(root, "spacing"), Some("4"));
        assert!(!stack.redo(&mut doc).unwrap());
    }

    #[test]
    fn test_non_executable_job_is_not_pushed() {
        let (mut doc, root) = setup();
        let mut stack = UndoStack::new();
        let pushed = stack
            .push(Box::new(Mutation::set_text(root, "spacing", None)), &mut doc)
            .unwrap();
        assert!(!pushed);
        assert!(!stack.can_undo());
        assert_eq!(doc.revision(), 1);
    }

    #[test]
    fn test_new_push_clears_redo() {
        let (mut doc, root) = setup();
        let mut stack = UndoStack::new();
        stack
            .push(Box::new(Mutation::set_text(root, "spacing", Some("4"))), &mut doc)
            .unwrap();
        stack.undo(&mut doc).unwrap();
        stack
            .push(Box::new(Mutation::set_text(root, "alignment", Some("CENTER"))), &mut doc)
            .unwrap();
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_max_levels_drops_oldest() {
        let (mut doc, root) = setup();
        let mut stack = UndoStack::with_max_levels(2);
        for value in ["1", "2", "3"] {
            stack
                .push(Box::new(Mutation::set_text(root, "spacing", Some(value))), &mut doc)
                .unwrap();
        }
        assert_eq!(stack.undo_levels(), 2);
        stack.undo(&mut doc).unwrap();
        stack.undo(&mut doc).unwrap();
        assert_eq!(doc.text_property(root, "spacing"), Some("1"));
    }
}
