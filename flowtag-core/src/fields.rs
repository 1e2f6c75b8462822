use std::io::{self, BufRead};

/// Lines of `reader` as raw bytes, without the trailing `\n` or `\r\n`.
///
/// Unlike [`BufRead::lines`] this never fails on encoding, only on I/O.
pub(crate) fn raw_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<Vec<u8>>> {
    reader.split(b'\n').map(|line| {
        line.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            bytes
        })
    })
}

/// Decode a line, replacing invalid UTF-8 sequences with U+FFFD.
pub(crate) fn decode_lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Split `line` on `sep`, dropping trailing empty fields.
///
/// Interior empty fields are kept, so `"a,,b"` has three fields while
/// `"a,b,"` and `"a,b,,"` both have two. A line with nothing but separators
/// has no fields at all.
pub(crate) fn split_fields(line: &str, sep: char) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(sep).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::{decode_lossy, raw_lines, split_fields};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn keeps_interior_empty_fields() {
        assert_eq!(split_fields("a,,b", ','), vec!["a", "", "b"]);
    }

    #[test]
    fn drops_trailing_empty_fields() {
        assert_eq!(split_fields("25,tcp,", ','), vec!["25", "tcp"]);
        assert_eq!(split_fields("a b  ", ' '), vec!["a", "b"]);
    }

    #[test]
    fn separators_only_is_empty() {
        assert!(split_fields(",,", ',').is_empty());
        assert!(split_fields("", ' ').is_empty());
    }

    #[test]
    fn leading_empty_field_is_kept() {
        assert_eq!(split_fields(" a", ' '), vec!["", "a"]);
    }

    #[test]
    fn raw_lines_strip_line_endings() {
        let lines: Vec<Vec<u8>> = raw_lines(Cursor::new(&b"a b\r\nc\n\nlast"[..]))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(lines, vec![b"a b".to_vec(), b"c".to_vec(), Vec::new(), b"last".to_vec()]);
    }

    #[test]
    fn raw_lines_keep_invalid_utf8() {
        let lines: Vec<Vec<u8>> = raw_lines(Cursor::new(&b"caf\xE9\nok\n"[..]))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(decode_lossy(lines[0].clone()), "caf\u{FFFD}");
        assert_eq!(decode_lossy(lines[1].clone()), "ok");
    }
}
