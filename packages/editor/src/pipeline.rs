//! # Job Pipeline
//!
//! Runs around the *initial* push of a job, never around undo/redo:
//!
//! ```text
//! pre collectors → rule pre-jobs → job → post collectors → rule post-jobs
//! ```
//!
//! Everything runs inside one transaction. When a rule contributed jobs, the
//! whole sequence is recorded as a single history entry.

use crate::collectors::{Diagnostic, IdentifierCollector};
use crate::document::Document;
use crate::errors::JobError;
use crate::job::{BatchJob, Job};
use crate::mutations::Mutation;
use crate::node::NodeId;
use indexmap::IndexMap;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Read-only scan of the document
pub trait Collector: fmt::Debug {
    fn name(&self) -> &'static str;

    fn collect(&self, doc: &Document) -> CollectorOutput;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectorOutput {
    Nodes(Vec<NodeId>),
    Identifiers(IndexMap<String, NodeId>),
    Diagnostics(Vec<Diagnostic>),
}

impl CollectorOutput {
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            CollectorOutput::Nodes(nodes) => nodes,
            _ => &[],
        }
    }

    pub fn identifiers(&self) -> Option<&IndexMap<String, NodeId>> {
        match self {
            CollectorOutput::Identifiers(identifiers) => Some(identifiers),
            _ => None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CollectorOutput::Diagnostics(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

/// Collector results gathered before and after the main job
#[derive(Debug, Default)]
pub struct PipelineContext {
    pre: IndexMap<&'static str, CollectorOutput>,
    post: IndexMap<&'static str, CollectorOutput>,
}

impl PipelineContext {
    pub fn pre(&self, name: &str) -> Option<&CollectorOutput> {
        self.pre.get(name)
    }

    pub fn post(&self, name: &str) -> Option<&CollectorOutput> {
        self.post.get(name)
    }
}

/// Produces extra jobs around a pushed job
pub trait PipelineRule: fmt::Debug {
    fn pre_job(&self, _ctx: &PipelineContext, _job: &dyn Job, _doc: &Document) -> Option<Box<dyn Job>> {
        None
    }

    fn post_job(&self, _ctx: &PipelineContext, _job: &dyn Job, _doc: &Document) -> Option<Box<dyn Job>> {
        None
    }
}

/// Re-points references and copies when an identifier is renamed
#[derive(Debug, Default)]
pub struct ReferenceFollower;

impl PipelineRule for ReferenceFollower {
    fn post_job(&self, ctx: &PipelineContext, _job: &dyn Job, doc: &Document) -> Option<Box<dyn Job>> {
        let before = ctx.pre(IdentifierCollector::NAME)?.identifiers()?;
        let after = ctx.post(IdentifierCollector::NAME)?.identifiers()?;

        let renames: Vec<(&str, &str)> = before
            .iter()
            .filter(|(old, _)| !after.contains_key(old.as_str()))
            .filter_map(|(old, node)| {
                let new = doc.identifier(*node)?;
                (doc.is_live(*node) && new != old.as_str()).then_some((old.as_str(), new))
            })
            .collect();
        if renames.is_empty() {
            return None;
        }

        let mut batch = BatchJob::new("Follow references");
        for id in doc.objects() {
            let Some(intrinsic) = doc.node(id).as_intrinsic() else {
                continue;
            };
            if !intrinsic.kind.targets_identifier() {
                continue;
            }
            if let Some((_, new)) = renames.iter().find(|(old, _)| *old == intrinsic.source) {
                debug!(node = %id, from = %intrinsic.source, to = %new, "Following rename");
                batch.push(Box::new(Mutation::set_source(id, *new)));
            }
        }

        (!batch.is_empty()).then(|| Box::new(batch) as Box<dyn Job>)
    }
}

#[derive(Debug, Default)]
pub struct JobPipeline {
    pre_collectors: Vec<Box<dyn Collector>>,
    post_collectors: Vec<Box<dyn Collector>>,
    rules: Vec<Box<dyn PipelineRule>>,
}

impl JobPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier collectors plus the reference follower
    pub fn standard() -> Self {
        Self::new()
            .with_pre_collector(IdentifierCollector)
            .with_post_collector(IdentifierCollector)
            .with_rule(ReferenceFollower)
    }

    pub fn with_pre_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.pre_collectors.push(Box::new(collector));
        self
    }

    pub fn with_post_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.post_collectors.push(Box::new(collector));
        self
    }

    pub fn with_rule(mut self, rule: impl PipelineRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Execute `job` with the pipeline around it, returning the history entry
    ///
    /// `Ok(None)` when a pre-job left the main job non-executable; the
    /// pre-jobs are rolled back and nothing is recorded.
    #[instrument(skip_all, fields(job = %job.description()))]
    pub fn run(&self, job: Box<dyn Job>, doc: &mut Document) -> Result<Option<Box<dyn Job>>, JobError> {
        let description = job.description();
        let mut ctx = PipelineContext::default();
        for collector in &self.pre_collectors {
            ctx.pre.insert(collector.name(), collector.collect(doc));
        }

        let pre_jobs: Vec<Box<dyn Job>> = self
            .rules
            .iter()
            .filter_map(|rule| rule.pre_job(&ctx, job.as_ref(), doc))
            .collect();

        let mut executed = Vec::new();
        doc.begin_update();
        let mark = doc.change_mark();
        match self.run_steps(pre_jobs, job, &mut ctx, doc, &mut executed) {
            Ok(true) => {}
            Ok(false) => {
                debug!(job = %description, "Main job skipped after pre-jobs");
                rollback(&mut executed, doc);
                doc.discard_changes_since(mark);
                doc.end_update();
                return Ok(None);
            }
            Err(e) => {
                rollback(&mut executed, doc);
                doc.discard_changes_since(mark);
                doc.end_update();
                return Err(e);
            }
        }
        doc.end_update();

        debug!(job = %description, steps = executed.len(), "Pipeline finished");
        if executed.len() == 1 {
            if let Some(only) = executed.pop() {
                return Ok(Some(only));
            }
        }
        Ok(Some(Box::new(BatchJob::from_executed(description, executed))))
    }

    fn run_steps(
        &self,
        pre_jobs: Vec<Box<dyn Job>>,
        job: Box<dyn Job>,
        ctx: &mut PipelineContext,
        doc: &mut Document,
        executed: &mut Vec<Box<dyn Job>>,
    ) -> Result<bool, JobError> {
        for step in pre_jobs {
            run_step(step, doc, executed)?;
        }
        if !run_step(job, doc, executed)? {
            return Ok(false);
        }

        for collector in &self.post_collectors {
            ctx.post.insert(collector.name(), collector.collect(doc));
        }

        let post_jobs: Vec<Box<dyn Job>> = match executed.last() {
            Some(main) => self
                .rules
                .iter()
                .filter_map(|rule| rule.post_job(ctx, main.as_ref(), doc))
                .collect(),
            None => Vec::new(),
        };
        for step in post_jobs {
            run_step(step, doc, executed)?;
        }
        Ok(true)
    }
}

fn rollback(executed: &mut Vec<Box<dyn Job>>, doc: &mut Document) {
    for step in executed.iter_mut().rev() {
        if let Err(e) = step.undo(doc) {
            warn!(job = %step.description(), error = %e, "Rollback step failed");
        }
    }
    executed.clear();
}

/// Execute one step if it still applies; `Ok(false)` when skipped
fn run_step(
    mut step: Box<dyn Job>,
    doc: &mut Document,
    executed: &mut Vec<Box<dyn Job>>,
) -> Result<bool, JobError> {
    if !step.is_executable(doc) {
        debug!(job = %step.description(), "Skipping pipeline step");
        return Ok(false);
    }
    step.execute(doc)?;
    executed.push(step);
    Ok(true)
}
