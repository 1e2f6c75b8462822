use flowtag_core::{
    Classification, ClassificationSink, Dispatcher, FlowTagError, LookupTable, PipelineConfig,
    ProtocolMap,
};
use integration_tests::harness::{FLOW_LOG, Fixture, LOOKUP_TABLE, events, init_test_tracing};
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::Level;

#[test]
fn timeout_fails_the_run_and_is_logged() {
    // Arrange
    let events = events();
    init_test_tracing(events.clone());
    let fixture =
        Fixture::new().config(PipelineConfig::default().with_timeout(Duration::ZERO));

    // Act
    let err = fixture.run().unwrap_err();

    // Assert
    assert!(matches!(err, FlowTagError::Timeout { .. }));
    assert!(!fixture.output_path().exists());

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| {
        e.level == Level::WARN
            && e.message()
                .is_some_and(|m| m.contains("flow log timeout reached"))
    }));
}

/// Blocks in `accept` until the gate is released.
#[derive(Default)]
struct Gate(Mutex<()>);

impl ClassificationSink for Gate {
    fn accept(&self, _classification: &Classification) {
        drop(self.0.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

#[test]
fn stuck_workers_time_out_and_are_logged() {
    // Arrange
    let events = events();
    init_test_tracing(events.clone());
    let lookup = LookupTable::from_reader(Cursor::new(LOOKUP_TABLE)).unwrap();
    let gate = Arc::new(Gate::default());
    let dispatcher = Dispatcher::new(
        Arc::new(lookup),
        Arc::new(ProtocolMap::builtin().clone()),
        gate.clone(),
        PipelineConfig::default().with_timeout(Duration::from_millis(100)),
    );
    let closed = gate.0.lock().unwrap();

    // Act
    let result = dispatcher.run_reader(Cursor::new(FLOW_LOG));
    drop(closed);

    // Assert
    assert!(matches!(result, Err(FlowTagError::Timeout { .. })));

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| {
        e.level == Level::WARN
            && e.message()
                .is_some_and(|m| m.contains("timeout reached waiting for workers"))
    }));
}
