//! Pipeline execution engine
//!
//! Runs a pipeline in dependency order. A topological pre-pass rejects
//! malformed graphs before anything is dispatched; a worklist scheduler
//! then claims each ready node exactly once and dispatches it, threading
//! successful outputs along the wires.
//!
//! # Failure semantics
//!
//! A failing node is marked `Error` and gets a `{type: error}` result
//! entry. A node whose upstream producers all failed or were skipped is
//! itself skipped: it stays `Idle` and has no result entry. A node with at
//! least one successful producer runs with whatever inputs arrived.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};

use crate::bundle::{InputBundle, OutputBundle, OutputKind};
use crate::catalog::{BlockCatalog, DOWNLOAD_EXPORT};
use crate::dispatch::{DispatchEnvelope, DispatchRequest, Dispatcher};
use crate::error::Result;
use crate::events::{EventSink, NullEventSink, PipelineEvent};
use crate::graph::Pipeline;
use crate::types::{MediaKind, NodeId, NodeStatus};
use crate::validation;

/// Message recorded when an export node has nothing to export
pub const NO_EXPORT_MEDIA: &str =
    "No upstream video/image to download. Connect a generator block.";

/// Engine tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upper bound on dispatches in flight at once (1 runs nodes one by one)
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

/// Results of one run, keyed by node id
///
/// Only nodes that settled as done or error have an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub results: BTreeMap<NodeId, OutputBundle>,
    /// Nodes in the order they settled (done or error)
    pub completion_order: Vec<NodeId>,
    /// Nodes that were never dispatched
    pub skipped: Vec<NodeId>,
}

impl RunReport {
    pub fn result(&self, node_id: &str) -> Option<&OutputBundle> {
        self.results.get(node_id)
    }

    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| !r.is_error()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.values().filter(|r| r.is_error()).count()
    }

    /// Whether every node ran and succeeded
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

/// Normalized outcome of one node
enum Outcome {
    Success(OutputBundle),
    Failure(String),
}

/// Wiring of the pipeline by node index, captured before the run
struct Plan {
    ids: Vec<NodeId>,
    block_ids: Vec<String>,
    /// Per node: (source index, source port) in connection order
    incoming: Vec<Vec<(usize, String)>>,
    /// Per node: target index of every outgoing connection
    outgoing: Vec<Vec<usize>>,
}

impl Plan {
    fn new(pipeline: &Pipeline) -> Self {
        let ids: Vec<NodeId> = pipeline.nodes.iter().map(|n| n.id.clone()).collect();
        let position = |id: &str| ids.iter().position(|n| n == id);

        let mut incoming = vec![Vec::new(); ids.len()];
        let mut outgoing = vec![Vec::new(); ids.len()];
        for conn in &pipeline.connections {
            // Endpoints were checked by the pre-pass
            if let (Some(from), Some(to)) =
                (position(&conn.source.node_id), position(&conn.target.node_id))
            {
                incoming[to].push((from, conn.source.port.clone()));
                outgoing[from].push(to);
            }
        }

        Self {
            block_ids: pipeline.nodes.iter().map(|n| n.block_id.clone()).collect(),
            ids,
            incoming,
            outgoing,
        }
    }
}

/// Dependency-ordered executor for pipelines
pub struct ExecutionEngine {
    catalog: Arc<BlockCatalog>,
    dispatcher: Arc<dyn Dispatcher>,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl ExecutionEngine {
    /// Create an engine that discards events
    pub fn new(catalog: Arc<BlockCatalog>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            catalog,
            dispatcher,
            events: Arc::new(NullEventSink),
            config: EngineConfig::default(),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute every node of the pipeline in dependency order
    ///
    /// Node statuses and previews on `pipeline` are reset first and updated
    /// as nodes settle. Returns `Err` only for malformed graphs, in which
    /// case nothing was dispatched.
    pub async fn run(&self, pipeline: &mut Pipeline) -> Result<RunReport> {
        pipeline.reset_run_state();
        validation::preflight(pipeline, &self.catalog)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let plan = Plan::new(pipeline);
        let node_count = plan.ids.len();
        let limit = self.config.max_concurrency.max(1);

        log::info!(
            "Run {} started for pipeline '{}' ({} nodes)",
            run_id,
            pipeline.name,
            node_count
        );
        self.emit(PipelineEvent::RunStarted {
            run_id: run_id.clone(),
            pipeline: pipeline.name.clone(),
        });

        let mut report = RunReport {
            run_id: run_id.clone(),
            ..Default::default()
        };
        let mut settled = vec![Settled::Pending; node_count];
        let mut waiting: Vec<usize> = plan.incoming.iter().map(Vec::len).collect();
        let mut ready: VecDeque<usize> = (0..node_count).filter(|&i| waiting[i] == 0).collect();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < limit {
                let Some(index) = ready.pop_front() else {
                    break;
                };
                let node_id = plan.ids[index].clone();

                let has_producer = plan.incoming[index]
                    .iter()
                    .any(|(source, _)| settled[*source] == Settled::Succeeded);
                if !plan.incoming[index].is_empty() && !has_producer {
                    log::debug!("Skipping node '{}': no upstream producer succeeded", node_id);
                    settled[index] = Settled::Skipped;
                    report.skipped.push(node_id.clone());
                    self.emit(PipelineEvent::NodeSkipped {
                        run_id: run_id.clone(),
                        node_id,
                    });
                    release(&plan, index, &mut waiting, &mut ready);
                    continue;
                }

                let inputs = self.collect_inputs(&plan, index, &settled, &report);
                pipeline.nodes[index].status = NodeStatus::Running;
                self.emit(PipelineEvent::NodeStarted {
                    run_id: run_id.clone(),
                    node_id: node_id.clone(),
                });

                if plan.block_ids[index] == DOWNLOAD_EXPORT {
                    let outcome = self.export(&run_id, &node_id, &inputs);
                    self.settle(pipeline, &mut report, &mut settled, index, outcome);
                    release(&plan, index, &mut waiting, &mut ready);
                    continue;
                }

                let request = DispatchRequest {
                    node_id,
                    block_id: plan.block_ids[index].clone(),
                    config: pipeline.nodes[index].config.resolve(),
                    inputs,
                };
                log::debug!(
                    "Dispatching node '{}' ({})",
                    request.node_id,
                    request.block_id
                );
                let dispatcher = self.dispatcher.clone();
                in_flight.push(async move {
                    let block_id = request.block_id.clone();
                    let joined =
                        tokio::spawn(async move { dispatcher.dispatch(request).await }).await;
                    (index, normalize(&block_id, joined))
                });
            }

            let Some((index, outcome)) = in_flight.next().await else {
                break;
            };
            self.settle(pipeline, &mut report, &mut settled, index, outcome);
            release(&plan, index, &mut waiting, &mut ready);
        }

        log::info!(
            "Run {} finished: {} succeeded, {} failed, {} skipped",
            run_id,
            report.succeeded(),
            report.failed(),
            report.skipped.len()
        );
        self.emit(PipelineEvent::RunCompleted {
            run_id,
            succeeded: report.succeeded(),
            failed: report.failed(),
            skipped: report.skipped.len(),
        });

        Ok(report)
    }

    /// Build a node's input bundle from its successful producers
    fn collect_inputs(
        &self,
        plan: &Plan,
        index: usize,
        settled: &[Settled],
        report: &RunReport,
    ) -> InputBundle {
        let mut inputs = InputBundle::new();
        for (source, port) in &plan.incoming[index] {
            if settled[*source] != Settled::Succeeded {
                continue;
            }
            if let Some(output) = report.results.get(&plan.ids[*source]) {
                inputs.insert(port.clone(), output.clone());
            }
        }
        inputs
    }

    /// Export nodes resolve locally: pick the first upstream media URL
    fn export(&self, run_id: &str, node_id: &str, inputs: &InputBundle) -> Outcome {
        let Some((url, _)) = inputs.first_media_url() else {
            return Outcome::Failure(NO_EXPORT_MEDIA.to_string());
        };
        let kind = MediaKind::for_export(url);
        let key = match kind {
            MediaKind::Video => "video_url",
            MediaKind::Image => "image_url",
        };
        let bundle = OutputBundle::new(OutputKind::Download)
            .with("download_url", url)
            .with(key, url);

        self.emit(PipelineEvent::DownloadRequested {
            run_id: run_id.to_string(),
            node_id: node_id.to_string(),
            url: url.to_string(),
            kind,
        });
        Outcome::Success(bundle)
    }

    /// Record a node's outcome on the pipeline and in the report
    fn settle(
        &self,
        pipeline: &mut Pipeline,
        report: &mut RunReport,
        settled: &mut [Settled],
        index: usize,
        outcome: Outcome,
    ) {
        let node = &mut pipeline.nodes[index];
        let run_id = report.run_id.clone();
        match outcome {
            Outcome::Success(bundle) => {
                log::debug!("Node '{}' done ({:?})", node.id, bundle.kind);
                node.status = NodeStatus::Done;
                node.output = bundle.preview();
                settled[index] = Settled::Succeeded;
                report.results.insert(node.id.clone(), bundle.clone());
                self.emit(PipelineEvent::NodeCompleted {
                    run_id,
                    node_id: node.id.clone(),
                    output: bundle,
                });
            }
            Outcome::Failure(message) => {
                log::warn!("Node '{}' failed: {}", node.id, message);
                node.status = NodeStatus::Error;
                settled[index] = Settled::Failed;
                report
                    .results
                    .insert(node.id.clone(), OutputBundle::error(message.clone()));
                self.emit(PipelineEvent::NodeFailed {
                    run_id,
                    node_id: node.id.clone(),
                    error: message,
                });
            }
        }
        report.completion_order.push(node.id.clone());
    }

    fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver pipeline event: {}", e);
        }
    }
}

/// Mark the dependents of a settled node and queue those now ready
fn release(plan: &Plan, index: usize, waiting: &mut [usize], ready: &mut VecDeque<usize>) {
    for &target in &plan.outgoing[index] {
        waiting[target] -= 1;
        if waiting[target] == 0 {
            ready.push_back(target);
        }
    }
}

/// Fold envelopes, dispatcher errors and panics into one outcome
fn normalize(
    block_id: &str,
    joined: std::result::Result<Result<DispatchEnvelope>, tokio::task::JoinError>,
) -> Outcome {
    match joined {
        Ok(Ok(DispatchEnvelope::Success(bundle))) => Outcome::Success(bundle),
        Ok(Ok(DispatchEnvelope::Failure(message))) => Outcome::Failure(message),
        Ok(Err(e)) => Outcome::Failure(e.to_string()),
        Err(e) if e.is_panic() => Outcome::Failure(format!("Block '{}' panicked", block_id)),
        Err(e) => Outcome::Failure(format!("Block '{}' was cancelled: {}", block_id, e)),
    }
}
