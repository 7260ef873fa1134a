//! Source map v3 for a flushed [`EditBuffer`](crate::edit_buffer::EditBuffer).
//!
//! One mapping is emitted at the start of every chunk copied from the
//! original text and at every line start inside such a chunk. Inserted text
//! stays unmapped.

use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A run of output bytes copied verbatim from the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedSegment {
    pub generated: u32,
    pub original: u32,
    pub len: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Trailing comment that points a loader at `map_file_name`.
    pub fn url_comment(map_file_name: &str) -> String {
        format!("//# sourceMappingURL={}", map_file_name)
    }
}

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { starts }
    }

    /// Zero-based line and UTF-16 column of byte `offset`.
    fn position(&self, text: &str, offset: usize) -> (u32, u32) {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.starts[line];
        let column = text.get(start..offset).map_or(0, |s| s.encode_utf16().count());
        (line as u32, column as u32)
    }
}

pub(crate) fn build(
    original: &str,
    generated: &str,
    segments: &[MappedSegment],
    source_name: &str,
    file_name: &str,
) -> SourceMap {
    let original_lines = LineIndex::new(original);
    let generated_lines = LineIndex::new(generated);

    // (generated line, generated column, original line, original column)
    let mut points: Vec<(u32, u32, u32, u32)> = Vec::new();
    for segment in segments {
        let copied = &original[segment.original as usize..(segment.original + segment.len) as usize];
        let mut starts = vec![0usize];
        starts.extend(
            copied
                .match_indices('\n')
                .map(|(i, _)| i + 1)
                .filter(|&i| i < copied.len()),
        );
        for start in starts {
            let (gen_line, gen_col) =
                generated_lines.position(generated, segment.generated as usize + start);
            let (src_line, src_col) =
                original_lines.position(original, segment.original as usize + start);
            points.push((gen_line, gen_col, src_line, src_col));
        }
    }
    points.sort();
    points.dedup_by_key(|p| (p.0, p.1));

    SourceMap {
        version: 3,
        file: file_name.to_string(),
        sources: vec![source_name.to_string()],
        sources_content: vec![original.to_string()],
        names: Vec::new(),
        mappings: encode_mappings(&points),
    }
}

fn encode_mappings(points: &[(u32, u32, u32, u32)]) -> String {
    let mut mappings = String::new();
    let mut current_line = 0u32;
    let mut previous_column = 0i64;
    let mut previous_src_line = 0i64;
    let mut previous_src_column = 0i64;
    let mut first_in_line = true;

    for &(gen_line, gen_col, src_line, src_col) in points {
        while current_line < gen_line {
            mappings.push(';');
            current_line += 1;
            previous_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            mappings.push(',');
        }
        first_in_line = false;

        encode_vlq(&mut mappings, gen_col as i64 - previous_column);
        // Single source, index delta is always zero.
        encode_vlq(&mut mappings, 0);
        encode_vlq(&mut mappings, src_line as i64 - previous_src_line);
        encode_vlq(&mut mappings, src_col as i64 - previous_src_column);

        previous_column = gen_col as i64;
        previous_src_line = src_line as i64;
        previous_src_column = src_col as i64;
    }
    mappings
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit_buffer::EditBuffer;
    use crate::ir::TextRange;
    use pretty_assertions::assert_eq;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(&mut out, value);
        out
    }

    #[test]
    fn encodes_vlq_digits() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
    }

    #[test]
    fn identity_map_has_one_mapping_per_line() {
        let buffer = EditBuffer::new("a\nb\n");
        let map = buffer.generate_map("in.js", "out.js");
        assert_eq!(map.version, 3);
        assert_eq!(map.sources, vec!["in.js"]);
        assert_eq!(map.mappings, "AAAA;AACA");
    }

    #[test]
    fn inserted_lines_shift_generated_positions() {
        let mut buffer = EditBuffer::new("a\nb");
        buffer.append_left(0, "x\n");
        let map = buffer.generate_map("in.js", "out.js");
        // Line 0 is inserted text; line 1 maps to source line 0.
        assert_eq!(map.mappings, ";AAAA;AACA");
    }

    #[test]
    fn removed_text_is_not_mapped() {
        let mut buffer = EditBuffer::new("abc\ndef");
        buffer.remove(TextRange::new(0, 4));
        let map = buffer.generate_map("in.js", "out.js");
        assert_eq!(buffer.to_string(), "def");
        assert_eq!(map.mappings, "AACA");
    }

    #[test]
    fn serializes_camel_case_fields() {
        let map = EditBuffer::new("a").generate_map("in.js", "out.js");
        let json = map.to_json().unwrap();
        assert!(json.contains("\"sourcesContent\":[\"a\"]"));
        assert!(json.contains("\"version\":3"));
    }
}
