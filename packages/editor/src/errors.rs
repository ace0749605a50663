//! Error types for the editor

use crate::node::NodeId;
use thiserror::Error;
use trellis_parser::ast::Span;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] trellis_parser::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Load error at {}: {message}", span.start)]
    Load { message: String, span: Span },

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Clipboard error: {0}")]
    Archive(#[from] crate::clipboard::ArchiveError),

    #[error("Document is not file-backed")]
    NotFileBacked,
}

impl EditorError {
    pub fn load(span: Span, message: impl Into<String>) -> Self {
        EditorError::Load {
            message: message.into(),
            span,
        }
    }
}

/// Failures of a job or of a low-level tree mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not an instance")]
    NotAnInstance(NodeId),

    #[error("Node {0} is not an intrinsic")]
    NotAnIntrinsic(NodeId),

    #[error("Node {0} cannot hold children here")]
    NotAContainer(NodeId),

    #[error("Property '{0}' is not a collection")]
    NotACollection(String),

    #[error("Property '{0}' is not a text property")]
    NotText(String),

    #[error("Slot '{0}' is already occupied")]
    SlotOccupied(String),

    #[error("Node {0} is already attached")]
    AlreadyAttached(NodeId),

    #[error("Node {0} is not attached")]
    NotAttached(NodeId),

    #[error("Document already has a root")]
    RootOccupied,

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Identifier '{0}' is already in use")]
    DuplicateIdentifier(String),

    #[error("Job has not been executed")]
    NotExecuted,
}
