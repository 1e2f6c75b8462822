//! Tag lookup table.
//!
//! The table is a CSV file with a header row followed by `dstport,protocol,tag`
//! rows. Port and protocol are matched case-insensitively; the tag keeps the
//! casing it was written with.

use crate::error::FlowTagError;
use crate::fields::{raw_lines, split_fields};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Destination port paired with a protocol name.
///
/// Both parts are lowercased on construction, so two keys built from
/// differently-cased input compare equal. The same key shape indexes the
/// lookup table and the per-pair counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortProtocol {
    port: String,
    protocol: String,
}

impl PortProtocol {
    pub fn new(port: &str, protocol: &str) -> Self {
        Self {
            port: port.to_lowercase(),
            protocol: protocol.to_lowercase(),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.port, self.protocol)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    tags: HashMap<PortProtocol, String>,
}

impl LookupTable {
    /// Parse a lookup table from any line source.
    ///
    /// The first line is always treated as the header. Rows that aren't
    /// valid UTF-8 or don't split into exactly three fields are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut tags = HashMap::new();

        for (idx, line) in raw_lines(reader).enumerate() {
            let line = line?;
            if idx == 0 {
                continue;
            }

            let Ok(line) = String::from_utf8(line) else {
                tracing::trace!(line = idx + 1, "skipping lookup row that is not valid UTF-8");
                continue;
            };

            let [port, protocol, tag] = split_fields(&line, ',')[..] else {
                tracing::trace!(line = idx + 1, "skipping malformed lookup row");
                continue;
            };

            tags.insert(
                PortProtocol::new(port.trim(), protocol.trim()),
                tag.trim().to_string(),
            );
        }

        Ok(Self { tags })
    }

    pub fn get(&self, key: &PortProtocol) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<(PortProtocol, String)> for LookupTable {
    fn from_iter<I: IntoIterator<Item = (PortProtocol, String)>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

pub fn load_lookup_table(path: impl AsRef<Path>) -> Result<LookupTable, FlowTagError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| FlowTagError::read_file(path, e))?;

    let table = LookupTable::from_reader(BufReader::new(file))
        .map_err(|e| FlowTagError::read_file(path, e))?;

    tracing::debug!(path = %path.display(), entries = table.len(), "loaded lookup table");

    Ok(table)
}
