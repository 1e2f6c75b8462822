use crate::fields::split_fields;
use crate::lookup::{LookupTable, PortProtocol};
use crate::protocol::ProtocolMap;

/// Tag reported for port/protocol pairs missing from the lookup table.
pub const UNTAGGED: &str = "Untagged";

/// Minimum number of space-separated fields in a flow log record.
pub const MIN_FIELDS: usize = 8;

const DST_PORT_FIELD: usize = 6;
const PROTOCOL_FIELD: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Tagged {
        tag: String,
        port_protocol: PortProtocol,
    },
    Discard(DiscardReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    TooFewFields,
    InvalidProtocol,
}

/// Classify one flow log record.
///
/// Records with fewer than [`MIN_FIELDS`] fields, or whose protocol field is
/// not an integer, are discarded. A protocol number that parses but isn't in
/// `protocols` (negative numbers included) is classified under `unknown`.
pub fn classify_line(line: &str, lookup: &LookupTable, protocols: &ProtocolMap) -> Classification {
    let fields = split_fields(line, ' ');
    if fields.len() < MIN_FIELDS {
        return Classification::Discard(DiscardReason::TooFewFields);
    }

    let Ok(number) = fields[PROTOCOL_FIELD].parse::<i32>() else {
        return Classification::Discard(DiscardReason::InvalidProtocol);
    };

    let port_protocol = PortProtocol::new(fields[DST_PORT_FIELD], protocols.resolve(number));
    let tag = lookup.get(&port_protocol).unwrap_or(UNTAGGED).to_string();

    Classification::Tagged { tag, port_protocol }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup() -> LookupTable {
        [
            (PortProtocol::new("25", "tcp"), "sv_P1".to_string()),
            (PortProtocol::new("68", "udp"), "sv_P2".to_string()),
            (PortProtocol::new("22", "tcp"), "sv_P4".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn protocols() -> ProtocolMap {
        [(6, "tcp".to_string()), (17, "udp".to_string()), (1, "icmp".to_string())]
            .into_iter()
            .collect()
    }

    fn tagged(tag: &str, port: &str, protocol: &str) -> Classification {
        Classification::Tagged {
            tag: tag.to_string(),
            port_protocol: PortProtocol::new(port, protocol),
        }
    }

    #[test]
    fn tags_known_port_protocol() {
        let result = classify_line(
            "src1 dst1 1000 srcport1 dstport1 192.168.1.1 25 6",
            &lookup(),
            &protocols(),
        );

        assert_eq!(result, tagged("sv_P1", "25", "tcp"));
    }

    #[test]
    fn unmatched_pair_is_untagged() {
        let result = classify_line("a b c d e f 223 6", &lookup(), &protocols());

        assert_eq!(result, tagged(UNTAGGED, "223", "tcp"));
    }

    #[test]
    fn too_few_fields_is_discarded() {
        for line in ["", "incomplete line", "a b c d e f 25"] {
            assert_eq!(
                classify_line(line, &lookup(), &protocols()),
                Classification::Discard(DiscardReason::TooFewFields),
                "line: {line:?}"
            );
        }
    }

    #[test]
    fn trailing_spaces_do_not_count_as_fields() {
        let result = classify_line("a b c d e f 25      ", &lookup(), &protocols());

        assert_eq!(result, Classification::Discard(DiscardReason::TooFewFields));
    }

    #[test]
    fn non_integer_protocol_is_discarded() {
        for token in ["notAProtocol", "6.0", "", "99999999999"] {
            let line = format!("a b c d e f 68 {token} extra");
            assert_eq!(
                classify_line(&line, &lookup(), &protocols()),
                Classification::Discard(DiscardReason::InvalidProtocol),
                "token: {token:?}"
            );
        }
    }

    #[test]
    fn negative_protocol_is_counted_as_unknown() {
        let result = classify_line("a b c d e f notAPort -17", &lookup(), &protocols());

        assert_eq!(result, tagged(UNTAGGED, "notaport", "unknown"));
    }

    #[test]
    fn unmapped_protocol_is_counted_as_unknown() {
        let result = classify_line("a b c d e f 25 132", &lookup(), &protocols());

        assert_eq!(result, tagged(UNTAGGED, "25", "unknown"));
    }

    #[test]
    fn port_is_case_folded() {
        let lookup: LookupTable = [(PortProtocol::new("https", "tcp"), "Web".to_string())]
            .into_iter()
            .collect();

        let result = classify_line("a b c d e f HTTPS 6", &lookup, &protocols());

        assert_eq!(result, tagged("Web", "https", "tcp"));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let line = "2 123456789012 eni-0a1b2c3d 10.0.1.201 198.51.100.2 443 68 17 25 20000 ACCEPT OK";

        let result = classify_line(line, &lookup(), &protocols());

        assert_eq!(result, tagged("sv_P2", "68", "udp"));
    }
}
