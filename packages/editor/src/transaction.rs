//! # Transactions
//!
//! Every edit of a live node happens inside a (possibly nested) update
//! transaction. Nesting is counted; only the outermost `end_update`
//! refreshes derived state and notifies listeners, once, with the net change.
//!
//! ```rust,ignore
//! doc.begin_update();
//! doc.attach(label, &Placement::property(root, "children", None))?;
//! doc.set_text(label, "text", Some("Hello"))?;
//! doc.end_update(); // one DocumentChange
//! ```

use crate::document::Document;
use crate::node::NodeId;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Net effect of one outermost transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    /// Revision reached after the transaction
    pub revision: u64,
    /// Nodes whose content or children changed
    pub touched: BTreeSet<NodeId>,
    /// Nodes attached and still attached at the end
    pub attached: Vec<NodeId>,
    /// Nodes detached and still detached at the end
    pub detached: Vec<NodeId>,
}

impl DocumentChange {
    pub fn is_structural(&self) -> bool {
        !self.attached.is_empty() || !self.detached.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ChangeSet {
    touched: BTreeSet<NodeId>,
    attached: Vec<NodeId>,
    detached: Vec<NodeId>,
}

impl ChangeSet {
    pub(crate) fn touch(&mut self, id: NodeId) {
        self.touched.insert(id);
    }

    pub(crate) fn attach(&mut self, id: NodeId) {
        self.touched.insert(id);
        match self.detached.iter().position(|d| *d == id) {
            // detached then attached again: a move
            Some(pos) => {
                self.detached.remove(pos);
            }
            None => self.attached.push(id),
        }
    }

    pub(crate) fn detach(&mut self, id: NodeId) {
        self.touched.insert(id);
        match self.attached.iter().position(|a| *a == id) {
            Some(pos) => {
                self.attached.remove(pos);
            }
            None => self.detached.push(id),
        }
    }

    fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }
}

type Listener = Box<dyn FnMut(&DocumentChange)>;

#[derive(Default)]
pub(crate) struct Listeners(Vec<Listener>);

impl Listeners {
    fn notify(&mut self, change: &DocumentChange) {
        for listener in &mut self.0 {
            listener(change);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listeners({})", self.0.len())
    }
}

impl Document {
    pub fn begin_update(&mut self) {
        self.update_depth += 1;
    }

    /// Close the innermost transaction
    ///
    /// # Panics
    ///
    /// Panics when no transaction is open.
    pub fn end_update(&mut self) {
        assert!(
            self.update_depth > 0,
            "end_update called without a matching begin_update"
        );
        self.update_depth -= 1;
        if self.update_depth == 0 {
            self.commit();
        }
    }

    pub fn is_updating(&self) -> bool {
        self.update_depth > 0
    }

    /// Run `f` inside a transaction
    ///
    /// The transaction commits whatever `f` left behind, even when it returns
    /// an error. Failed batches and pipeline runs revert their edits and drop
    /// the recorded changes, so nothing is reported for them.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    /// Pending changes of the open transaction, to restore after a rollback
    pub(crate) fn change_mark(&self) -> ChangeSet {
        self.pending.clone()
    }

    /// Forget changes recorded after `mark`; the caller has already reverted
    /// the document itself
    pub(crate) fn discard_changes_since(&mut self, mark: ChangeSet) {
        self.pending = mark;
    }

    /// Register a listener called once per committed transaction
    pub fn on_change(&mut self, listener: impl FnMut(&DocumentChange) + 'static) {
        self.listeners.0.push(Box::new(listener));
    }

    pub fn last_change(&self) -> Option<&DocumentChange> {
        self.last_change.as_ref()
    }

    /// Incremented by every transaction that changed something
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn commit(&mut self) {
        let changes = std::mem::take(&mut self.pending);
        if changes.is_empty() {
            return;
        }

        self.refresh_index();
        self.revision += 1;

        let change = DocumentChange {
            revision: self.revision,
            touched: changes.touched,
            attached: changes.attached,
            detached: changes.detached,
        };
        debug!(
            revision = change.revision,
            touched = change.touched.len(),
            attached = change.attached.len(),
            detached = change.detached.len(),
            "Document changed"
        );

        self.listeners.notify(&change);
        self.last_change = Some(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::JobError;
    use crate::node::Placement;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_nested_transactions_notify_once() {
        let mut doc = Document::default();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        doc.on_change(move |change| sink.borrow_mut().push(change.revision));

        let root = doc.create_instance("VBox");
        doc.begin_update();
        doc.attach(root, &Placement::Root).unwrap();
        doc.begin_update();
        doc.set_text(root, "spacing", Some("8")).unwrap();
        doc.end_update();
        assert!(calls.borrow().is_empty());
        doc.end_update();

        assert_eq!(*calls.borrow(), vec![1]);
        assert_eq!(doc.revision(), 1);
        assert_eq!(doc.last_change().unwrap().attached, vec![root]);
    }

    #[test]
    fn test_move_within_transaction_is_not_structural() {
        let mut doc = Document::default();
        let root = doc.create_instance("VBox");
        let label = doc.create_instance("Label");
        doc.update(|d| -> Result<(), crate::JobError> {
            d.attach(root, &Placement::Root)?;
            d.attach(label, &Placement::property(root, "children", None))?;
            Ok(())
        })
        .unwrap();

        doc.update(|d| -> Result<(), crate::JobError> {
            d.detach(label, false)?;
            d.attach(label, &Placement::property(root, "children", Some(0)))?;
            Ok(())
        })
        .unwrap();

        let change = doc.last_change().unwrap();
        assert!(!change.is_structural());
        assert!(change.touched.contains(&label));
    }

    #[test]
    fn test_failed_update_still_commits_partial_edits() {
        let mut doc = Document::default();
        let root = doc.create_instance("VBox");
        doc.update(|d| d.attach(root, &Placement::Root)).unwrap();
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        doc.on_change(move |_| *sink.borrow_mut() += 1);

        let result = doc.update(|d| -> Result<(), JobError> {
            d.set_text(root, "spacing", Some("8"))?;
            Err(JobError::NotExecuted)
        });

        assert!(result.is_err());
        assert_eq!(doc.text_property(root, "spacing"), Some("8"));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_discarded_changes_are_not_reported() {
        let mut doc = Document::default();
        let root = doc.create_instance("VBox");
        doc.update(|d| d.attach(root, &Placement::Root)).unwrap();
        let revision = doc.revision();

        doc.begin_update();
        let mark = doc.change_mark();
        let change = doc.set_text(root, "spacing", Some("8")).unwrap();
        doc.revert_text(root, "spacing", &change).unwrap();
        doc.discard_changes_since(mark);
        doc.end_update();

        assert_eq!(doc.revision(), revision);
        assert!(doc.text_property(root, "spacing").is_none());
    }

    #[test]
    fn test_empty_transaction_keeps_revision() {
        let mut doc = Document::default();
        doc.update(|_| ());
        assert_eq!(doc.revision(), 0);
        assert!(doc.last_change().is_none());
        assert!(!doc.is_dirty());
    }

    #[test]
    #[should_panic(expected = "without a matching begin_update")]
    fn test_unbalanced_end_update_panics() {
        let mut doc = Document::default();
        doc.end_update();
    }
}
