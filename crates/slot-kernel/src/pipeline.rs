//! One-call adaptation run: build, plan, execute, validate, seal

use crate::config::AdaptationConfig;
use crate::construction::SlotGraphBuilder;
use crate::disposition::DispositionRules;
use crate::error::KernelError;
use crate::executor::{execute_all, seal, ExecutionSummary};
use crate::graph::SlotGraph;
use crate::planner::{plan, DiscoveryData, Plan};
use crate::validation::{validate, ValidationReport};
use tracing::info;

/// Result of a complete adaptation run
#[derive(Debug)]
pub struct Adaptation {
    /// Executed (and, when valid, sealed) graph
    pub graph: SlotGraph,
    /// Plan that was executed
    pub plan: Plan,
    /// Execution totals
    pub summary: ExecutionSummary,
    /// Validation verdict
    pub report: ValidationReport,
}

/// Run every phase against the documents registered with `builder`
///
/// Validation findings are returned in the report, not raised.
///
/// # Errors
/// - [`KernelError::Resolution`] when the root part cannot be built
/// - [`KernelError::Config`] when a pattern in `config` does not compile
/// - [`KernelError::Execution`] when the plan cannot be applied
pub fn adapt(
    builder: &SlotGraphBuilder,
    root_part: &str,
    config: &AdaptationConfig,
    namespace: &str,
    discovery: &DiscoveryData,
) -> Result<Adaptation, KernelError> {
    let mut graph = builder.build(root_part)?;
    let rules = DispositionRules::compile(config)?;
    let plan = plan(&graph, &rules, namespace, discovery);
    let summary = execute_all(&mut graph, &plan)?;
    let report = validate(&graph, false)?;
    let sealed = seal(&mut graph, &report);

    info!(
        graph = %graph.id(),
        root = root_part,
        namespace,
        applied = summary.applied,
        valid = report.valid,
        sealed,
        "adaptation finished"
    );

    Ok(Adaptation {
        graph,
        plan,
        summary,
        report,
    })
}
