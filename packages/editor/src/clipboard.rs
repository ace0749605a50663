//! # Clipboard Codec
//!
//! Portable archive of a set of subtrees, used for copy/paste between
//! documents. The archive is JSON, independent of the markup form:
//!
//! ```json
//! {"format":"trellis-archive","version":1,"origin":3735928559,"imports":["layout.VBox"],
//!  "items":[{"kind":"instance","typeName":"Button","id":"ok","properties":[...]}]}
//! ```
//!
//! Decoding allocates detached nodes in the target document. Identifiers that
//! clash with any identifier in the target arena are renamed, and references
//! inside the archive follow the renames.

use crate::document::Document;
use crate::errors::JobError;
use crate::job::BatchJob;
use crate::mutations::Mutation;
use crate::node::{IntrinsicKind, NodeId, NodeKind, Placement, PropertyValue};
use crate::structural::insert_sub_component;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

pub const ARCHIVE_FORMAT: &str = "trellis-archive";
pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Invalid archive: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported archive format '{format}' version {version}")]
    UnsupportedFormat { format: String, version: u32 },

    #[error("Only live, non-virtual nodes can be copied")]
    NotEncodable,

    #[error("Malformed archive content: {0}")]
    Malformed(#[from] JobError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub format: String,
    pub version: u32,

    /// CRC-32 of the source document location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<u32>,

    #[serde(default)]
    pub imports: Vec<String>,

    pub items: Vec<ArchivedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArchivedNode {
    Instance {
        #[serde(rename = "typeName")]
        type_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        properties: Vec<ArchivedProperty>,
    },
    Intrinsic {
        intrinsic: IntrinsicKind,
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Source names a node inside the archive
        #[serde(default)]
        internal: bool,
    },
    Virtual {
        #[serde(default)]
        children: Vec<ArchivedNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArchivedProperty {
    Text { name: String, value: String },
    Collection { name: String, items: Vec<ArchivedNode> },
}

#[derive(Deserialize)]
struct ArchiveHeader {
    format: String,
    version: u32,
}

impl Archive {
    pub fn to_json(&self) -> Result<String, ArchiveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ArchiveError> {
        let archive: Archive = serde_json::from_str(text)?;
        archive.check_format()?;
        Ok(archive)
    }

    fn check_format(&self) -> Result<(), ArchiveError> {
        if self.format != ARCHIVE_FORMAT || self.version > ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedFormat {
                format: self.format.clone(),
                version: self.version,
            });
        }
        Ok(())
    }
}

/// Fingerprint of a document location
fn origin_of(doc: &Document) -> Option<u32> {
    doc.location()
        .map(|path| crc32fast::hash(path.to_string_lossy().as_bytes()))
}

/// Only live, non-virtual nodes can be copied
pub fn is_encodable(doc: &Document, nodes: &[NodeId]) -> bool {
    !nodes.is_empty()
        && nodes.iter().all(|id| {
            doc.get(*id)
                .is_some_and(|node| node.is_object() && !node.is_virtual())
                && doc.is_live(*id)
        })
}

pub fn encode(doc: &Document, nodes: &[NodeId]) -> Result<Archive, ArchiveError> {
    if !is_encodable(doc, nodes) {
        return Err(ArchiveError::NotEncodable);
    }

    let copied: HashSet<&str> = nodes
        .iter()
        .flat_map(|id| doc.descendants(*id))
        .filter_map(|id| doc.identifier(id))
        .collect();

    let items: Vec<ArchivedNode> = nodes
        .iter()
        .map(|id| archive_node(doc, *id, &copied))
        .collect();
    debug!(items = items.len(), "Encoded clipboard archive");

    Ok(Archive {
        format: ARCHIVE_FORMAT.to_string(),
        version: ARCHIVE_VERSION,
        origin: origin_of(doc),
        imports: doc.imports().map(str::to_string).collect(),
        items,
    })
}

fn archive_node(doc: &Document, id: NodeId, copied: &HashSet<&str>) -> ArchivedNode {
    match doc.node(id).kind() {
        NodeKind::Instance(instance) => ArchivedNode::Instance {
            type_name: instance.type_name.clone(),
            id: instance.id.clone(),
            properties: instance
                .properties
                .iter()
                .filter_map(|(name, property)| {
                    match &doc.node(*property).as_property()?.value {
                        PropertyValue::Text(value) => Some(ArchivedProperty::Text {
                            name: name.clone(),
                            value: value.clone(),
                        }),
                        PropertyValue::Collection { items, .. } => {
                            Some(ArchivedProperty::Collection {
                                name: name.clone(),
                                items: items
                                    .iter()
                                    .map(|child| archive_node(doc, *child, copied))
                                    .collect(),
                            })
                        }
                    }
                })
                .collect(),
        },
        NodeKind::Intrinsic(intrinsic) => ArchivedNode::Intrinsic {
            intrinsic: intrinsic.kind,
            source: intrinsic.source.clone(),
            id: intrinsic.id.clone(),
            internal: intrinsic.kind.targets_identifier()
                && copied.contains(intrinsic.source.as_str()),
        },
        NodeKind::Virtual(virt) => ArchivedNode::Virtual {
            children: virt
                .children
                .iter()
                .map(|child| archive_node(doc, *child, copied))
                .collect(),
        },
        NodeKind::Property(_) => ArchivedNode::Virtual {
            children: Vec::new(),
        },
    }
}

/// Whether `text` looks like an archive this version can decode
pub fn has_decodable_content(text: &str) -> bool {
    serde_json::from_str::<ArchiveHeader>(text)
        .is_ok_and(|header| header.format == ARCHIVE_FORMAT && header.version <= ARCHIVE_VERSION)
}

/// Result of decoding an archive into a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Detached top-level nodes, in archive order
    pub nodes: Vec<NodeId>,

    /// Types the target registry does not know
    pub unresolved_types: Vec<String>,

    /// Old identifier → new identifier
    pub renamed: IndexMap<String, String>,

    /// The archive was copied from this same document
    pub same_origin: bool,
}

pub fn decode(archive: &Archive, doc: &mut Document) -> Result<Decoded, ArchiveError> {
    archive.check_format()?;

    let mut taken = doc.all_identifiers();
    let mut renamed = IndexMap::new();
    let mut identifiers = Vec::new();
    for item in &archive.items {
        collect_identifiers(item, &mut identifiers);
    }
    let mut seen = HashSet::new();
    for identifier in identifiers {
        // repeated inside the archive: keep the first mapping
        if !seen.insert(identifier) {
            continue;
        }
        if taken.contains(identifier) {
            let fresh = fresh_identifier(identifier, &taken);
            taken.insert(fresh.clone());
            renamed.insert(identifier.to_string(), fresh);
        } else {
            taken.insert(identifier.to_string());
        }
    }

    let mut decoded = Decoded {
        renamed,
        same_origin: archive.origin.is_some() && archive.origin == origin_of(doc),
        ..Decoded::default()
    };
    for item in &archive.items {
        let node = build_node(doc, item, &mut decoded)?;
        decoded.nodes.push(node);
    }

    info!(
        nodes = decoded.nodes.len(),
        renamed = decoded.renamed.len(),
        unresolved = decoded.unresolved_types.len(),
        "Decoded clipboard archive"
    );
    Ok(decoded)
}

fn collect_identifiers<'a>(item: &'a ArchivedNode, out: &mut Vec<&'a str>) {
    match item {
        ArchivedNode::Instance { id, properties, .. } => {
            out.extend(id.as_deref());
            for property in properties {
                if let ArchivedProperty::Collection { items, .. } = property {
                    for child in items {
                        collect_identifiers(child, out);
                    }
                }
            }
        }
        ArchivedNode::Intrinsic { id, .. } => out.extend(id.as_deref()),
        ArchivedNode::Virtual { children } => {
            for child in children {
                collect_identifiers(child, out);
            }
        }
    }
}

/// `button` → `button1`, `button2`, …; trailing digits are replaced
fn fresh_identifier(identifier: &str, taken: &HashSet<String>) -> String {
    let base = identifier.trim_end_matches(|c: char| c.is_ascii_digit());
    let base = if base.is_empty() { identifier } else { base };
    (1u64..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| identifier.to_string())
}

/// Allocate one archived subtree, detached
///
/// Content the target cannot hold (text and collection under one name, two
/// items in a single slot) fails the decode.
fn build_node(
    doc: &mut Document,
    item: &ArchivedNode,
    decoded: &mut Decoded,
) -> Result<NodeId, ArchiveError> {
    let rename = |id: &Option<String>, decoded: &Decoded| {
        id.as_ref()
            .map(|id| decoded.renamed.get(id).cloned().unwrap_or_else(|| id.clone()))
    };

    match item {
        ArchivedNode::Instance {
            type_name,
            id,
            properties,
        } => {
            let node = doc.create_instance(type_name);
            if doc.instance(node).is_some_and(|i| i.peer.is_none())
                && !decoded.unresolved_types.contains(type_name)
            {
                decoded.unresolved_types.push(type_name.clone());
            }
            doc.set_identifier(node, rename(id, decoded))?;

            for property in properties {
                match property {
                    ArchivedProperty::Text { name, value } => {
                        doc.set_text(node, name, Some(value))?;
                    }
                    ArchivedProperty::Collection { name, items } => {
                        doc.ensure_collection(node, name)?;
                        for child in items {
                            let child = build_node(doc, child, decoded)?;
                            doc.attach(child, &Placement::property(node, name.as_str(), None))?;
                        }
                    }
                }
            }
            Ok(node)
        }
        ArchivedNode::Intrinsic {
            intrinsic,
            source,
            id,
            internal,
        } => {
            let source = match decoded.renamed.get(source) {
                Some(new) if *internal => new.clone(),
                _ => source.clone(),
            };
            let node = doc.create_intrinsic(*intrinsic, &source);
            doc.set_identifier(node, rename(id, decoded))?;
            Ok(node)
        }
        ArchivedNode::Virtual { children } => {
            let host = doc.create_virtual();
            for child in children {
                let child = build_node(doc, child, decoded)?;
                doc.attach(child, &Placement::Definition { host, index: None })?;
            }
            Ok(host)
        }
    }
}

/// Last copied archive
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    content: Option<String>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, archive: &Archive) -> Result<(), ArchiveError> {
        self.content = Some(archive.to_json()?);
        Ok(())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = Some(text.into());
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(has_decodable_content)
    }

    pub fn clear(&mut self) {
        self.content = None;
    }
}

/// Decoded nodes and the job that places them
#[derive(Debug)]
pub struct Paste {
    pub job: BatchJob,
    pub decoded: Decoded,
}

/// Decode `archive` and build the job inserting it
///
/// Pasting into an empty document makes the single archived node the root.
/// Otherwise nodes are appended to the main accessory of `target` (or of the
/// root). Returns `None` when nothing can be placed.
pub fn make_paste_job(
    doc: &mut Document,
    archive: &Archive,
    target: Option<NodeId>,
) -> Result<Option<Paste>, ArchiveError> {
    let decoded = decode(archive, doc)?;
    let mut job = BatchJob::new("Paste");

    let Some(container) = target.or(doc.root()) else {
        if let [only] = decoded.nodes.as_slice() {
            job.push(Box::new(Mutation::set_root(Some(*only))));
            return Ok(Some(Paste { job, decoded }));
        }
        return Ok(None);
    };

    for node in &decoded.nodes {
        match insert_sub_component(doc, container, *node, None) {
            Some(insert) => job.push(Box::new(insert)),
            None => debug!(node = %node, container = %container, "Container does not accept pasted node"),
        }
    }
    Ok((!job.is_empty()).then_some(Paste { job, decoded }))
}
