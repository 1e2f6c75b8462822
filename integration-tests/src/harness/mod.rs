mod fixture;
pub mod tracing;

pub use fixture::{FLOW_LOG, Fixture, LOOKUP_TABLE, PROTOCOL_MAP};
pub use tracing::{CapturedEvent, events, init_test_tracing};
