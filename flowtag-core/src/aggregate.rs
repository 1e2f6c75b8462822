use crate::classify::{Classification, DiscardReason};
use crate::lookup::PortProtocol;
use ahash::RandomState;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared frequency tables fed by the dispatcher's workers.
///
/// Every counter is an atomic behind a sharded map, so concurrent `record`
/// calls on the same key never lose an increment. Reads are only meaningful
/// once all writers are done; see [`FlowAggregator::snapshot`].
#[derive(Debug)]
pub struct FlowAggregator {
    tag_counts: DashMap<String, AtomicU64, RandomState>,
    port_protocol_counts: DashMap<PortProtocol, AtomicU64, RandomState>,

    too_few_fields: AtomicU64,
    invalid_protocol: AtomicU64,
}

impl Default for FlowAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowAggregator {
    pub fn new() -> Self {
        Self {
            tag_counts: DashMap::with_hasher(RandomState::new()),
            port_protocol_counts: DashMap::with_hasher(RandomState::new()),
            too_few_fields: AtomicU64::new(0),
            invalid_protocol: AtomicU64::new(0),
        }
    }

    /// Count one classified record against its tag and its port/protocol pair.
    pub fn record(&self, tag: &str, port_protocol: &PortProtocol) {
        increment(&self.tag_counts, tag, || tag.to_string());
        increment(&self.port_protocol_counts, port_protocol, || {
            port_protocol.clone()
        });
    }

    /// Count a record that was dropped. Discards never touch the tag or
    /// port/protocol tables.
    pub fn record_discard(&self, reason: DiscardReason) {
        let counter = match reason {
            DiscardReason::TooFewFields => &self.too_few_fields,
            DiscardReason::InvalidProtocol => &self.invalid_protocol,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn apply(&self, classification: &Classification) {
        match classification {
            Classification::Tagged { tag, port_protocol } => self.record(tag, port_protocol),
            Classification::Discard(reason) => self.record_discard(*reason),
        }
    }

    /// Copy the current counts out of the shared tables.
    ///
    /// Call after the workers have been joined; a snapshot taken while
    /// records are still arriving is not a consistent cut.
    pub fn snapshot(&self) -> FlowCounts {
        FlowCounts {
            tag_counts: self
                .tag_counts
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            port_protocol_counts: self
                .port_protocol_counts
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            discarded: DiscardCounts {
                too_few_fields: self.too_few_fields.load(Ordering::Relaxed),
                invalid_protocol: self.invalid_protocol.load(Ordering::Relaxed),
            },
        }
    }
}

// Read-locked fast path for keys already present; the entry API (write lock
// on the shard) only runs the first time a key is seen.
fn increment<K, Q>(
    map: &DashMap<K, AtomicU64, RandomState>,
    key: &Q,
    to_owned: impl FnOnce() -> K,
) where
    K: std::hash::Hash + Eq + std::borrow::Borrow<Q>,
    Q: std::hash::Hash + Eq + ?Sized,
{
    if let Some(counter) = map.get(key) {
        counter.fetch_add(1, Ordering::Relaxed);
        return;
    }

    map.entry(to_owned())
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardCounts {
    pub too_few_fields: u64,
    pub invalid_protocol: u64,
}

impl DiscardCounts {
    pub fn total(&self) -> u64 {
        self.too_few_fields + self.invalid_protocol
    }
}

/// Point-in-time copy of the aggregated counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowCounts {
    pub tag_counts: HashMap<String, u64>,
    pub port_protocol_counts: HashMap<PortProtocol, u64>,
    pub discarded: DiscardCounts,
}

impl FlowCounts {
    pub fn tag(&self, tag: &str) -> u64 {
        self.tag_counts.get(tag).copied().unwrap_or(0)
    }

    pub fn port_protocol(&self, port: &str, protocol: &str) -> u64 {
        self.port_protocol_counts
            .get(&PortProtocol::new(port, protocol))
            .copied()
            .unwrap_or(0)
    }

    /// Number of records that were counted.
    pub fn classified(&self) -> u64 {
        self.tag_counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tag_counts.is_empty() && self.port_protocol_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn record_counts_tag_and_pair() {
        // Arrange
        let agg = FlowAggregator::new();
        let key = PortProtocol::new("25", "tcp");

        // Act
        agg.record("sv_P1", &key);
        agg.record("sv_P1", &key);
        agg.record("Untagged", &PortProtocol::new("223", "tcp"));

        // Assert
        let counts = agg.snapshot();
        assert_eq!(counts.tag("sv_P1"), 2);
        assert_eq!(counts.tag("Untagged"), 1);
        assert_eq!(counts.port_protocol("25", "tcp"), 2);
        assert_eq!(counts.port_protocol("223", "tcp"), 1);
        assert_eq!(counts.classified(), 3);
    }

    #[test]
    fn discards_only_touch_discard_counters() {
        let agg = FlowAggregator::new();

        agg.apply(&Classification::Discard(DiscardReason::TooFewFields));
        agg.apply(&Classification::Discard(DiscardReason::InvalidProtocol));
        agg.apply(&Classification::Discard(DiscardReason::InvalidProtocol));

        let counts = agg.snapshot();
        assert!(counts.is_empty());
        assert_eq!(
            counts.discarded,
            DiscardCounts {
                too_few_fields: 1,
                invalid_protocol: 2,
            }
        );
        assert_eq!(counts.discarded.total(), 3);
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        // Arrange
        let agg = Arc::new(FlowAggregator::new());
        let threads = 8;
        let per_thread = 5_000;

        // Act
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let agg = agg.clone();
                thread::spawn(move || {
                    let shared = PortProtocol::new("25", "tcp");
                    let own = PortProtocol::new(&i.to_string(), "udp");
                    for _ in 0..per_thread {
                        agg.record("shared", &shared);
                        agg.record(&format!("own_{i}"), &own);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Assert
        let counts = agg.snapshot();
        assert_eq!(counts.tag("shared"), threads * per_thread);
        assert_eq!(counts.port_protocol("25", "tcp"), threads * per_thread);
        for i in 0..threads {
            assert_eq!(counts.tag(&format!("own_{i}")), per_thread);
            assert_eq!(counts.port_protocol(&i.to_string(), "udp"), per_thread);
        }
        let pair_total: u64 = counts.port_protocol_counts.values().sum();
        assert_eq!(counts.classified(), pair_total);
    }
}
