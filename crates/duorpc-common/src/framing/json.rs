//! Incremental framer for the JSON dialect.
//!
//! A bracket-depth scanner, not a JSON parser: it balances the opening
//! token of the message (`{` or `[`) against its closer while skipping
//! everything inside string literals, and emits the enclosed bytes as one
//! frame once the depth returns to zero. The codec re-parses every frame,
//! so anything beyond bracket/string balancing is left to it.
//!
//! Bytes before the first opener are discarded, which tolerates whitespace
//! and newline separators between messages.

use super::{Framer, ReadBuffer};
use crate::protocol::Result;

#[derive(Default)]
pub struct JsonFramer {
    buffer: ReadBuffer,
    scan: Option<Scan>,
}

/// State of a message scan in progress. The message always starts at
/// offset 0 of the buffer: the preamble is discarded when the opener is
/// found, and completed frames are drained from the front.
struct Scan {
    opener: u8,
    closer: u8,
    depth: u32,
    in_string: bool,
    pos: usize,
}

impl Framer for JsonFramer {
    fn reserve(&mut self, n: usize) -> &mut [u8] {
        self.buffer.reserve(n)
    }

    fn consumed(&mut self, n: usize) {
        self.buffer.consumed(n)
    }

    fn next(&mut self) -> Result<Option<Vec<u8>>> {
        if self.scan.is_none() && !self.start_scan() {
            return Ok(None);
        }

        let mut scan = match self.scan.take() {
            Some(scan) => scan,
            None => return Ok(None),
        };

        let mut end = None;
        let data = self.buffer.data();
        while scan.pos < data.len() {
            let byte = data[scan.pos];
            if byte == b'"' && !is_escaped(data, scan.pos) {
                scan.in_string = !scan.in_string;
            } else if !scan.in_string {
                if byte == scan.opener {
                    scan.depth += 1;
                } else if byte == scan.closer {
                    scan.depth -= 1;
                    if scan.depth == 0 {
                        end = Some(scan.pos + 1);
                        break;
                    }
                }
            }
            scan.pos += 1;
        }

        match end {
            Some(end) => {
                let frame = self.buffer.data()[..end].to_vec();
                self.buffer.drain_front(end);
                Ok(Some(frame))
            }
            None => {
                self.scan = Some(scan);
                Ok(None)
            }
        }
    }
}

impl JsonFramer {
    /// Discard separator bytes and position the buffer on the next message
    /// opener. Returns false if no opener is buffered yet.
    fn start_scan(&mut self) -> bool {
        let data = self.buffer.data();
        match data.iter().position(|&b| b == b'{' || b == b'[') {
            None => {
                let len = data.len();
                self.buffer.drain_front(len);
                false
            }
            Some(first) => {
                self.buffer.drain_front(first);
                let opener = self.buffer.data()[0];
                let closer = if opener == b'{' { b'}' } else { b']' };
                self.scan = Some(Scan {
                    opener,
                    closer,
                    depth: 1,
                    in_string: false,
                    pos: 1,
                });
                true
            }
        }
    }
}

/// A quote is escaped iff it is preceded by an odd number of consecutive
/// backslashes.
fn is_escaped(data: &[u8], pos: usize) -> bool {
    let mut backslashes = 0;
    while backslashes < pos && data[pos - 1 - backslashes] == b'\\' {
        backslashes += 1;
    }
    backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(framer: &mut JsonFramer, bytes: &[u8]) {
        let chunk = framer.reserve(bytes.len());
        chunk.copy_from_slice(bytes);
        framer.consumed(bytes.len());
    }

    fn drain(framer: &mut JsonFramer) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = framer.next().unwrap() {
            frames.push(String::from_utf8(frame).unwrap());
        }
        frames
    }

    #[test]
    fn test_single_object() {
        let mut framer = JsonFramer::default();
        feed(&mut framer, br#"{"a":1}"#);
        assert_eq!(drain(&mut framer), vec![r#"{"a":1}"#]);
    }

    #[test]
    fn test_multiple_messages_with_separators() {
        let mut framer = JsonFramer::default();
        feed(&mut framer, b" {\"a\":1}\n\n\t{\"b\":2} \r\n[3,4] ");
        assert_eq!(drain(&mut framer), vec![r#"{"a":1}"#, r#"{"b":2}"#, "[3,4]"]);
        // trailing separator is discarded, nothing left over
        assert!(framer.next().unwrap().is_none());
    }

    #[test]
    fn test_brackets_inside_strings_do_not_alter_depth() {
        let mut framer = JsonFramer::default();
        feed(&mut framer, br#"{"a":"}{][","b":"[["}"#);
        assert_eq!(drain(&mut framer), vec![r#"{"a":"}{][","b":"[["}"#]);
    }

    #[test]
    fn test_escaped_quotes() {
        let mut framer = JsonFramer::default();
        // "}\"" stays inside the string; "\\" closes it before the brace
        let raw = br#"{"a":"}\"","b":"\\"}"#;
        feed(&mut framer, raw);
        assert_eq!(drain(&mut framer), vec![std::str::from_utf8(raw).unwrap()]);
    }

    #[test]
    fn test_double_escaped_backslash_then_quote() {
        let mut framer = JsonFramer::default();
        // \\\" is an escaped backslash followed by an escaped quote
        let raw = br#"{"a":"\\\"}"}"#;
        feed(&mut framer, raw);
        assert_eq!(drain(&mut framer), vec![std::str::from_utf8(raw).unwrap()]);
    }

    #[test]
    fn test_nested_structures() {
        let mut framer = JsonFramer::default();
        let raw = br#"{"a":{"b":[{"c":1},[2,[3]]]}}"#;
        feed(&mut framer, raw);
        assert_eq!(drain(&mut framer), vec![std::str::from_utf8(raw).unwrap()]);
    }

    #[test]
    fn test_arbitrary_chunk_boundaries() {
        let stream = br#"{"a":"}{"} [1,[2]] {"b":{"c":"\""}}"#;
        let expected = vec![r#"{"a":"}{"}"#, "[1,[2]]", r#"{"b":{"c":"\""}}"#];

        for chunk_size in [1, 2, 3, 5, 8] {
            let mut framer = JsonFramer::default();
            let mut frames = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                feed(&mut framer, chunk);
                frames.extend(drain(&mut framer));
            }
            assert_eq!(frames, expected, "chunk_size={}", chunk_size);
        }
    }

    #[test]
    fn test_garbage_before_first_opener_is_discarded() {
        let mut framer = JsonFramer::default();
        feed(&mut framer, b"noise \n more noise {\"a\":1}");
        assert_eq!(drain(&mut framer), vec![r#"{"a":1}"#]);
    }

    #[test]
    fn test_never_emits_a_prefix() {
        let mut framer = JsonFramer::default();
        feed(&mut framer, br#"{"a":[1,2"#);
        assert!(framer.next().unwrap().is_none());
        feed(&mut framer, br#"]}"#);
        assert_eq!(drain(&mut framer), vec![r#"{"a":[1,2]}"#]);
    }
}
