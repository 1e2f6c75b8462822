//! IANA protocol numbers to protocol names.

use crate::error::FlowTagError;
use crate::fields::{raw_lines, split_fields};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Name reported for protocol numbers missing from the map.
pub const UNKNOWN_PROTOCOL: &str = "unknown";

const BUILTIN_PROTOCOLS: &[(i32, &str)] = &[
    (1, "icmp"),
    (6, "tcp"),
    (17, "udp"),
    (47, "gre"),
    (50, "esp"),
    (51, "ah"),
    (89, "ospf"),
    (132, "sctp"),
];

static BUILTIN: Lazy<ProtocolMap> = Lazy::new(|| {
    BUILTIN_PROTOCOLS
        .iter()
        .map(|(number, name)| (*number, (*name).to_string()))
        .collect()
});

#[derive(Debug, Clone, Default)]
pub struct ProtocolMap {
    names: HashMap<i32, String>,
}

impl ProtocolMap {
    /// The table used when no protocol map file is given.
    pub fn builtin() -> &'static ProtocolMap {
        &BUILTIN
    }

    /// Parse `number,name` rows. There is no header row.
    ///
    /// Rows that aren't valid UTF-8, don't have exactly two fields, or whose
    /// number doesn't parse are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut names = HashMap::new();

        for (idx, line) in raw_lines(reader).enumerate() {
            let Ok(line) = String::from_utf8(line?) else {
                tracing::trace!(line = idx + 1, "skipping protocol row that is not valid UTF-8");
                continue;
            };

            let [number, name] = split_fields(&line, ',')[..] else {
                tracing::trace!(line = idx + 1, "skipping malformed protocol row");
                continue;
            };

            let Ok(number) = number.trim().parse::<i32>() else {
                tracing::debug!(line = idx + 1, number, "skipping protocol row with invalid number");
                continue;
            };

            names.insert(number, name.trim().to_lowercase());
        }

        Ok(Self { names })
    }

    pub fn get(&self, number: i32) -> Option<&str> {
        self.names.get(&number).map(String::as_str)
    }

    /// Name for `number`, or [`UNKNOWN_PROTOCOL`].
    pub fn resolve(&self, number: i32) -> &str {
        self.get(number).unwrap_or(UNKNOWN_PROTOCOL)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(i32, String)> for ProtocolMap {
    fn from_iter<I: IntoIterator<Item = (i32, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

pub fn load_protocol_map(path: impl AsRef<Path>) -> Result<ProtocolMap, FlowTagError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| FlowTagError::read_file(path, e))?;

    let map = ProtocolMap::from_reader(BufReader::new(file))
        .map_err(|e| FlowTagError::read_file(path, e))?;

    tracing::debug!(path = %path.display(), entries = map.len(), "loaded protocol map");

    Ok(map)
}
