//! # Jobs
//!
//! A job is an undoable edit. `execute` records whatever `undo` needs to
//! reverse it exactly; `redo` reproduces the state reached by `execute`.
//!
//! Atomic edits live in [`Mutation`](crate::Mutation); [`BatchJob`] composes
//! any jobs into one history entry.

use crate::document::Document;
use crate::errors::JobError;
use std::fmt;
use tracing::{debug, warn};

pub trait Job: fmt::Debug {
    /// Side-effect free pre-check against the current document
    fn is_executable(&self, doc: &Document) -> bool;

    fn execute(&mut self, doc: &mut Document) -> Result<(), JobError>;

    fn undo(&mut self, doc: &mut Document) -> Result<(), JobError>;

    fn redo(&mut self, doc: &mut Document) -> Result<(), JobError>;

    /// Label shown in undo/redo menus
    fn description(&self) -> String;
}

/// Ordered group of jobs executed inside one transaction
#[derive(Debug)]
pub struct BatchJob {
    description: String,
    jobs: Vec<Box<dyn Job>>,
    /// Indices of the sub-jobs that ran on the last execute/redo
    executed: Vec<usize>,
}

impl BatchJob {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            jobs: Vec::new(),
            executed: Vec::new(),
        }
    }

    /// Wrap jobs that have all been executed already
    pub(crate) fn from_executed(description: impl Into<String>, jobs: Vec<Box<dyn Job>>) -> Self {
        Self {
            description: description.into(),
            executed: (0..jobs.len()).collect(),
            jobs,
        }
    }

    pub fn with_job(mut self, job: impl Job + 'static) -> Self {
        self.jobs.push(Box::new(job));
        self
    }

    pub fn push(&mut self, job: Box<dyn Job>) {
        self.jobs.push(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[Box<dyn Job>] {
        &self.jobs
    }

    /// Number of sub-jobs that ran on the last execute
    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    fn rollback(&mut self, doc: &mut Document) {
        for &i in self.executed.iter().rev() {
            if let Err(e) = self.jobs[i].undo(doc) {
                warn!(job = %self.jobs[i].description(), error = %e, "Rollback step failed");
            }
        }
        self.executed.clear();
    }
}

impl Job for BatchJob {
    fn is_executable(&self, doc: &Document) -> bool {
        self.jobs.iter().any(|job| job.is_executable(doc))
    }

    fn execute(&mut self, doc: &mut Document) -> Result<(), JobError> {
        self.executed.clear();
        doc.begin_update();
        let mark = doc.change_mark();

        for i in 0..self.jobs.len() {
            // earlier sub-jobs may have made this one moot
            if !self.jobs[i].is_executable(doc) {
                debug!(job = %self.jobs[i].description(), "Skipping sub-job");
                continue;
            }
            if let Err(e) = self.jobs[i].execute(doc) {
                self.rollback(doc);
                doc.discard_changes_since(mark);
                doc.end_update();
                return Err(e);
            }
            self.executed.push(i);
        }

        doc.end_update();
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), JobError> {
        doc.begin_update();
        let result = self
            .executed
            .iter()
            .rev()
            .try_for_each(|&i| self.jobs[i].undo(doc));
        doc.end_update();
        result
    }

    fn redo(&mut self, doc: &mut Document) -> Result<(), JobError> {
        doc.begin_update();
        let result = self
            .executed
            .iter()
            .try_for_each(|&i| self.jobs[i].redo(doc));
        doc.end_update();
        result
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::Mutation;
    use crate::node::Placement;

    fn vbox_with_labels(count: usize) -> (Document, Vec<crate::NodeId>) {
        let mut doc = Document::default();
        let root = doc.create_instance("VBox");
        let labels: Vec<_> = (0..count).map(|_| doc.create_instance("Label")).collect();
        doc.update(|d| -> Result<(), JobError> {
            d.attach(root, &Placement::Root)?;
            for label in &labels {
                d.attach(*label, &Placement::property(root, "children", None))?;
            }
            Ok(())
        })
        .unwrap();
        (doc, labels)
    }

    #[test]
    fn test_empty_batch_is_not_executable() {
        let (doc, _) = vbox_with_labels(0);
        assert!(!BatchJob::new("Nothing").is_executable(&doc));
    }

    #[test]
    fn test_batch_undo_runs_in_reverse() {
        let (mut doc, labels) = vbox_with_labels(3);
        let root = doc.root().unwrap();
        let before = doc.snapshot();

        let mut batch = BatchJob::new("Delete")
            .with_job(Mutation::remove_child(&doc, labels[0]))
            .with_job(Mutation::remove_child(&doc, labels[2]));
        batch.execute(&mut doc).unwrap();
        assert_eq!(doc.collection(root, "children"), &[labels[1]]);
        assert_eq!(doc.revision(), 2);

        batch.undo(&mut doc).unwrap();
        assert_eq!(doc.snapshot(), before);
        assert_eq!(doc.collection(root, "children"), labels.as_slice());

        batch.redo(&mut doc).unwrap();
        assert_eq!(doc.collection(root, "children"), &[labels[1]]);
    }

    #[test]
    fn test_sub_job_made_moot_is_skipped() {
        let (mut doc, labels) = vbox_with_labels(2);
        let stray = doc.create_instance("Button");

        let mut batch = BatchJob::new("Fill slot")
            .with_job(Mutation::remove_child(&doc, labels[0]))
            .with_job(Mutation::insert_child(
                &doc,
                labels[0],
                Placement::property(labels[1], "graphic", None),
            ))
            .with_job(Mutation::insert_child(
                &doc,
                stray,
                Placement::property(labels[1], "graphic", None),
            ));

        batch.execute(&mut doc).unwrap();
        assert_eq!(batch.executed_count(), 2);
        assert!(!doc.is_live(stray));
    }

    #[derive(Debug)]
    struct Failing;

    impl Job for Failing {
        fn is_executable(&self, _doc: &Document) -> bool {
            true
        }

        fn execute(&mut self, _doc: &mut Document) -> Result<(), JobError> {
            Err(JobError::CycleDetected)
        }

        fn undo(&mut self, _doc: &mut Document) -> Result<(), JobError> {
            Ok(())
        }

        fn redo(&mut self, _doc: &mut Document) -> Result<(), JobError> {
            Ok(())
        }

        fn description(&self) -> String {
            "Fail".to_string()
        }
    }

    #[test]
    fn test_failed_sub_job_rolls_back() {
        let (mut doc, labels) = vbox_with_labels(2);
        let root = doc.root().unwrap();
        let before = doc.snapshot();
        let revision = doc.revision();
        let notified = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = std::rc::Rc::clone(&notified);
        doc.on_change(move |_| counter.set(counter.get() + 1));

        let mut batch = BatchJob::new("Broken")
            .with_job(Mutation::set_text(root, "spacing", Some("4")))
            .with_job(Mutation::remove_child(&doc, labels[1]))
            .with_job(Failing);

        assert_eq!(batch.execute(&mut doc), Err(JobError::CycleDetected));
        assert_eq!(doc.snapshot(), before);
        assert_eq!(batch.executed_count(), 0);
        assert_eq!(doc.revision(), revision);
        assert_eq!(notified.get(), 0);
    }
}
