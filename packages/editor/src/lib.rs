//! # Trellis Editor
//!
//! Document editing engine for Trellis UI markup.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: markup text → element AST           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ loader: elements → Document arena           │
//! │  - instances, properties, intrinsics        │
//! │  - types resolved against a TypeRegistry    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editing                                     │
//! │  - jobs executed inside transactions        │
//! │  - undo/redo stack + job pipeline           │
//! │  - selection revalidated after each edit    │
//! │  - clipboard archive for copy/paste         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Explicit ownership**: one `Document` owns every node; no globals
//! 2. **Detach, never destroy**: jobs keep `NodeId`s valid for undo
//! 3. **Transactions**: live nodes change only inside `begin_update`/`end_update`
//! 4. **Pipeline once**: collectors and rules run on the initial push only
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis_editor::{load, save, Mutation, TypeRegistry, UndoStack};
//!
//! let mut doc = load(source, None, Arc::new(TypeRegistry::standard()))?;
//! let mut stack = UndoStack::new();
//!
//! let title = doc.lookup("title").unwrap();
//! stack.push(Box::new(Mutation::set_text(title, "text", Some("Hello"))), &mut doc)?;
//! stack.undo(&mut doc)?;
//!
//! let markup = save(&doc);
//! ```

mod clipboard;
mod collectors;
mod config;
mod document;
mod errors;
mod job;
mod loader;
mod mask;
mod mutations;
mod node;
mod pipeline;
mod registry;
mod selection;
mod session;
mod snapshot;
mod structural;
mod transaction;
mod undo_stack;

pub use clipboard::{
    decode, encode, has_decodable_content, is_encodable, make_paste_job, Archive, ArchiveError,
    ArchivedNode, ArchivedProperty, Clipboard, Decoded, Paste, ARCHIVE_FORMAT, ARCHIVE_VERSION,
};
pub use collectors::{
    collect_diagnostics, Diagnostic, DiagnosticLevel, DuplicateIdentifierCollector,
    IdentifierCollector, UnresolvedReferenceCollector, UnresolvedTypeCollector,
};
pub use config::EditorConfig;
pub use document::{Attached, Detached, Document, TextChange};
pub use errors::{EditorError, JobError};
pub use job::{BatchJob, Job};
pub use loader::{element_of, load, load_file, save, save_file, save_with, to_markup};
pub use mask::{GridAxis, HierarchyMask};
pub use mutations::Mutation;
pub use node::{
    InstanceNode, IntrinsicKind, IntrinsicNode, Node, NodeId, NodeKind, ParentLink, Placement,
    PropertyNode, PropertyValue, ScenePeer, VirtualNode,
};
pub use pipeline::{
    Collector, CollectorOutput, JobPipeline, PipelineContext, PipelineRule, ReferenceFollower,
};
pub use registry::{
    local_name, AccessoryDescriptor, ContainerLayout, TypeDescriptor, TypeRegistry,
};
pub use selection::{GridSelectionGroup, ObjectSelectionGroup, Selection, SelectionGroup};
pub use session::EditSession;
pub use snapshot::NodeSnapshot;
pub use structural::{
    delete_grid_lines, insert_sub_component, relocate_sub_component, MoveGridLineJob,
    ShiftGridJob,
};
pub use transaction::DocumentChange;
pub use undo_stack::UndoStack;

// Re-export the markup AST for callers working with raw elements
pub use trellis_parser::ast::Document as MarkupDocument;
