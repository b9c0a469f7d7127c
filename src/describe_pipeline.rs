//! Description Pipeline (C6): per work unit, call the Describer, turn its
//! raw JSON into a `DerivationRecord`, enqueue newly-seen edges, and hand
//! the record to the Output Sink. A failure here is local — it's reported
//! on the status channel and swallowed, never propagated, so one bad node
//! can't poison the crawl.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::driver::{EvaluatorDriver, RawDescription, RawEdge, RawMeta};
use crate::error::{Error, FailureKind};
use crate::model::{
    AttributePath, BuildInputEdge, BuildInputType, DerivationRecord, License, NixpkgsMetadata,
    Output, ParsedName,
};
use crate::sink::SinkHandle;
use crate::status::{StatusChannel, StatusEvent};
use crate::visited::VisitedSet;

/// Everything a work unit needs that doesn't change across the run —
/// bundled so `crawl.rs` only has to clone one `Arc` per spawned task.
pub struct PipelineContext {
    pub driver: EvaluatorDriver,
    pub visited: VisitedSet,
    pub sink: SinkHandle,
    pub status: StatusChannel,
    pub runtime_only: bool,
    /// Attribute paths never submitted to the pool, e.g. known bootstrap
    /// packages (§12 of SPEC_FULL.md). Checked before `try_insert`, so a
    /// skipped path also never occupies a Visited Set slot.
    pub skip_attrs: HashSet<String>,
}

impl PipelineContext {
    pub(crate) fn should_skip(&self, path: &AttributePath) -> bool {
        self.skip_attrs.contains(path.as_str())
    }
}

/// Describe one attribute path: the body every `WorkPool` task runs.
/// `scope` is threaded through so newly-discovered edges can be submitted
/// as further tasks in the same rayon scope.
pub fn describe_one<'scope>(scope: &rayon::Scope<'scope>, ctx: Arc<PipelineContext>, path: AttributePath) {
    ctx.status.emit(StatusEvent::Started(path.clone()));

    match ctx.driver.describe(&path, ctx.runtime_only) {
        Ok(raw) => {
            let record = to_record(raw);

            for edge in &record.build_inputs {
                if ctx.should_skip(&edge.attribute_path) {
                    continue;
                }
                if ctx.visited.try_insert(edge.attribute_path.clone()) {
                    ctx.status.emit(StatusEvent::Queued(edge.attribute_path.clone()));
                    let child_ctx = Arc::clone(&ctx);
                    let child_path = edge.attribute_path.clone();
                    scope.spawn(move |s| describe_one(s, child_ctx, child_path));
                }
            }

            debug!(%path, n_edges = record.build_inputs.len(), "described");
            ctx.sink.send(record);
            ctx.status.emit(StatusEvent::Described(path));
        }
        Err(e) => {
            let kind = FailureKind::from(&e);
            log_failure(&path, &e);
            ctx.status.emit(StatusEvent::Failed(path, kind));
        }
    }
}

fn log_failure(path: &AttributePath, e: &Error) {
    if let Some(tail) = e.stderr_tail() {
        tracing::warn!(%path, error = %e, stderr = %tail, "failed to describe node");
    } else {
        tracing::warn!(%path, error = %e, "failed to describe node");
    }
}

fn to_record(raw: RawDescription) -> DerivationRecord {
    let name = raw.name.clone().unwrap_or_default();
    let outputs = raw
        .outputs
        .into_iter()
        .map(|o| Output {
            name: o.name,
            output_path: o.output_path,
        })
        .collect();

    let build_inputs = raw
        .build_inputs
        .into_iter()
        .filter_map(edge_from_raw)
        .collect();

    DerivationRecord {
        parsed_name: ParsedName::parse(&name),
        name,
        attribute_path: raw.attribute_path,
        derivation_path: raw.derivation_path,
        output_path: raw.output_path,
        outputs,
        nixpkgs_metadata: meta_from_raw(raw.meta),
        src: raw.src,
        build_inputs,
    }
}

fn edge_from_raw(raw: RawEdge) -> Option<BuildInputEdge> {
    // An edge with no resolvable target (the describer couldn't navigate
    // back to it) carries no identity to re-describe or deduplicate by,
    // so it's dropped rather than emitted with a null attribute_path.
    let attribute_path = raw.attribute_path?;
    Some(BuildInputEdge {
        build_input_type: BuildInputType::from_attr_key(&raw.build_input_type),
        attribute_path,
        output_path: raw.output_path,
    })
}

fn meta_from_raw(raw: RawMeta) -> NixpkgsMetadata {
    NixpkgsMetadata {
        pname: raw.pname,
        version: raw.version,
        description: raw.description,
        homepage: raw.homepage,
        broken: raw.broken,
        licenses: raw
            .licenses
            .into_iter()
            .map(|l| License {
                spdx_id: l.spdx_id,
                full_name: l.full_name,
            })
            .collect(),
    }
}
