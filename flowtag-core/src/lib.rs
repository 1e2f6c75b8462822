pub mod aggregate;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
mod fields;
pub mod logging;
pub mod lookup;
pub mod pipeline;
pub mod protocol;
pub mod report;

pub use aggregate::{DiscardCounts, FlowAggregator, FlowCounts};
pub use classify::{Classification, DiscardReason, UNTAGGED, classify_line};
pub use config::PipelineConfig;
pub use dispatch::{ClassificationSink, DispatchSummary, Dispatcher};
pub use error::FlowTagError;
pub use lookup::{LookupTable, PortProtocol, load_lookup_table};
pub use pipeline::{RunOptions, RunOutcome, run};
pub use protocol::{ProtocolMap, UNKNOWN_PROTOCOL, load_protocol_map};
pub use report::{render_report, write_report};
