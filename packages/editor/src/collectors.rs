//! Read-only scans of the live tree.
//!
//! Collectors feed the [`JobPipeline`](crate::JobPipeline) and the
//! diagnostics shown by `trellis check`. They never fail.

use crate::document::Document;
use crate::node::{NodeId, NodeKind};
use crate::pipeline::{Collector, CollectorOutput};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,

    /// Collector that produced this diagnostic
    pub rule: String,

    pub message: String,

    pub node: Option<NodeId>,
}

impl Diagnostic {
    pub fn error(rule: impl Into<String>, message: impl Into<String>, node: NodeId) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            rule: rule.into(),
            message: message.into(),
            node: Some(node),
        }
    }

    pub fn warning(rule: impl Into<String>, message: impl Into<String>, node: NodeId) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            rule: rule.into(),
            message: message.into(),
            node: Some(node),
        }
    }
}

/// Identifier → node over the live tree, first occurrence wins
#[derive(Debug, Default)]
pub struct IdentifierCollector;

impl IdentifierCollector {
    pub const NAME: &'static str = "identifiers";

    pub fn scan(doc: &Document) -> IndexMap<String, NodeId> {
        let mut identifiers = IndexMap::new();
        for id in doc.objects() {
            if let Some(identifier) = doc.identifier(id) {
                identifiers.entry(identifier.to_string()).or_insert(id);
            }
        }
        identifiers
    }
}

impl Collector for IdentifierCollector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn collect(&self, doc: &Document) -> CollectorOutput {
        CollectorOutput::Identifiers(Self::scan(doc))
    }
}

/// Instances whose type is unknown to the registry
#[derive(Debug, Default)]
pub struct UnresolvedTypeCollector;

impl Collector for UnresolvedTypeCollector {
    fn name(&self) -> &'static str {
        "unresolved-type"
    }

    fn collect(&self, doc: &Document) -> CollectorOutput {
        let diagnostics = doc
            .objects()
            .into_iter()
            .filter_map(|id| {
                let instance = doc.instance(id)?;
                instance.peer.is_none().then(|| {
                    Diagnostic::warning(
                        self.name(),
                        format!("Unknown type '{}'", instance.type_name),
                        id,
                    )
                })
            })
            .collect();
        CollectorOutput::Diagnostics(diagnostics)
    }
}

/// References and copies whose source names no live node
#[derive(Debug, Default)]
pub struct UnresolvedReferenceCollector;

impl Collector for UnresolvedReferenceCollector {
    fn name(&self) -> &'static str {
        "unresolved-reference"
    }

    fn collect(&self, doc: &Document) -> CollectorOutput {
        let identifiers = IdentifierCollector::scan(doc);
        let mut diagnostics = Vec::new();

        for id in doc.objects() {
            if let NodeKind::Intrinsic(intrinsic) = doc.node(id).kind() {
                if intrinsic.kind.targets_identifier()
                    && !identifiers.contains_key(&intrinsic.source)
                {
                    diagnostics.push(Diagnostic::warning(
                        self.name(),
                        format!("<{}> source '{}' does not resolve", intrinsic.kind, intrinsic.source),
                        id,
                    ));
                }
            }
        }

        CollectorOutput::Diagnostics(diagnostics)
    }
}

/// Identifiers carried by more than one live node
#[derive(Debug, Default)]
pub struct DuplicateIdentifierCollector;

impl Collector for DuplicateIdentifierCollector {
    fn name(&self) -> &'static str {
        "duplicate-identifier"
    }

    fn collect(&self, doc: &Document) -> CollectorOutput {
        let mut seen: IndexMap<&str, NodeId> = IndexMap::new();
        let mut diagnostics = Vec::new();

        for id in doc.objects() {
            let Some(identifier) = doc.identifier(id) else {
                continue;
            };
            if let Some(first) = seen.get(identifier) {
                diagnostics.push(Diagnostic::error(
                    self.name(),
                    format!("Identifier '{}' already used by {}", identifier, first),
                    id,
                ));
            } else {
                seen.insert(identifier, id);
            }
        }

        CollectorOutput::Diagnostics(diagnostics)
    }
}

/// Run every diagnostic collector
pub fn collect_diagnostics(doc: &Document) -> Vec<Diagnostic> {
    let collectors: [&dyn Collector; 3] = [
        &UnresolvedTypeCollector,
        &UnresolvedReferenceCollector,
        &DuplicateIdentifierCollector,
    ];

    collectors
        .iter()
        .flat_map(|c| c.collect(doc).diagnostics().to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load;
    use crate::registry::TypeRegistry;
    use std::sync::Arc;

    #[test]
    fn test_diagnostics_for_broken_document() {
        let source = r#"<VBox>
  <Spaceship x:id="a"/>
  <Label x:id="a"/>
  <x:reference source="missing"/>
  <x:copy source="a"/>
</VBox>"#;
        let doc = load(source, None, Arc::new(TypeRegistry::standard())).unwrap();
        let diagnostics = collect_diagnostics(&doc);

        let rules: Vec<_> = diagnostics.iter().map(|d| d.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec!["unresolved-type", "unresolved-reference", "duplicate-identifier"]
        );
        assert_eq!(diagnostics[2].level, DiagnosticLevel::Error);
    }

    #[test]
    fn test_identifier_collector_in_document_order() {
        let source = r#"<VBox x:id="root">
  <x:define><Label x:id="spare"/></x:define>
  <Button x:id="ok"/>
</VBox>"#;
        let doc = load(source, None, Arc::new(TypeRegistry::standard())).unwrap();
        let ids = IdentifierCollector::scan(&doc);
        assert_eq!(ids.keys().collect::<Vec<_>>(), vec!["root", "spare", "ok"]);
    }
}
