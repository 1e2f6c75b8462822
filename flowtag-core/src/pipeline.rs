//! End-to-end run: load tables, dispatch the flow log, write the report.

use crate::aggregate::{FlowAggregator, FlowCounts};
use crate::config::PipelineConfig;
use crate::dispatch::{DispatchSummary, Dispatcher};
use crate::error::FlowTagError;
use crate::lookup::load_lookup_table;
use crate::protocol::{ProtocolMap, load_protocol_map};
use crate::report::write_report;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub flow_log: PathBuf,
    pub lookup_table: PathBuf,
    pub output: PathBuf,
    /// Falls back to [`ProtocolMap::builtin`] when absent.
    pub protocol_map: Option<PathBuf>,
    pub config: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: DispatchSummary,
    pub counts: FlowCounts,
}

pub fn run(opts: &RunOptions) -> Result<RunOutcome, FlowTagError> {
    let lookup = load_lookup_table(&opts.lookup_table)?;
    let protocols = match &opts.protocol_map {
        Some(path) => load_protocol_map(path)?,
        None => ProtocolMap::builtin().clone(),
    };

    let dispatcher = Dispatcher::new(
        Arc::new(lookup),
        Arc::new(protocols),
        Arc::new(FlowAggregator::new()),
        opts.config,
    );
    let summary = dispatcher.run_file(&opts.flow_log)?;

    let counts = dispatcher.sink().snapshot();
    if counts.discarded.total() > 0 {
        tracing::info!(
            too_few_fields = counts.discarded.too_few_fields,
            invalid_protocol = counts.discarded.invalid_protocol,
            "discarded malformed flow log lines"
        );
    }

    write_report(&opts.output, &counts)?;

    Ok(RunOutcome { summary, counts })
}
