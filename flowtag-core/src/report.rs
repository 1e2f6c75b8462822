use crate::aggregate::FlowCounts;
use crate::error::FlowTagError;
use std::fs;
use std::path::Path;

/// Render the two count tables as the plain-text report.
///
/// Rows are sorted by tag and by port/protocol so the same counts always
/// render to the same text.
pub fn render_report(counts: &FlowCounts) -> String {
    let mut out = String::new();

    out.push_str("Tag Counts:\n");
    out.push_str("Tag,Count\n");

    let mut tags: Vec<_> = counts.tag_counts.iter().collect();
    tags.sort_by_key(|(tag, _)| *tag);
    for (tag, count) in tags {
        out.push_str(&format!("{tag},{count}\n"));
    }

    out.push('\n');
    out.push_str("Port/Protocol Combination Counts:\n");
    out.push_str("Port,Protocol,Count\n");

    let mut pairs: Vec<_> = counts.port_protocol_counts.iter().collect();
    pairs.sort_by_key(|(pair, _)| *pair);
    for (pair, count) in pairs {
        out.push_str(&format!("{},{},{count}\n", pair.port(), pair.protocol()));
    }

    out
}

pub fn write_report(path: impl AsRef<Path>, counts: &FlowCounts) -> Result<(), FlowTagError> {
    let path = path.as_ref();
    fs::write(path, render_report(counts)).map_err(|e| FlowTagError::write_file(path, e))?;

    tracing::debug!(
        path = %path.display(),
        tags = counts.tag_counts.len(),
        port_protocols = counts.port_protocol_counts.len(),
        "wrote report"
    );

    Ok(())
}
