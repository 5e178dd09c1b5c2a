//! Synthetic sequence identifiers
//!
//! External tools (the aligner, the PHYLIP converter, RAxML) mangle or
//! truncate arbitrary FASTA headers, so every header is replaced by a
//! synthetic ordinal identifier `g_<i>` before the first external stage and
//! restored in the produced trees afterwards.
//!
//! # Lossy restoration
//!
//! Tree labels are restored through [`sanitize`], which keeps only the first
//! whitespace-delimited token of the header and replaces the Newick
//! metacharacters `:`, `(`, `)`, `,` and `;` with `_`. Two headers that differ
//! only in those characters (or only after the first whitespace) therefore
//! restore to the same label. This is an accepted limitation of the output
//! format; the full headers remain available in the [`IdentifierMap`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

use crate::defaults::{HEADER_SENTINEL, SYNTHETIC_PREFIX};
use crate::error::{PipelineError, Result};
use crate::utils::xzopen;

#[path = "identifier_test.rs"]
mod identifier_test;

/// Characters with structural meaning in Newick trees.
const TREE_METACHARS: [char; 5] = [':', '(', ')', ',', ';'];

/// Bijective mapping from synthetic id to original header.
///
/// Ids are the contiguous range `0..len()`, assigned in input order. The map
/// is immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    headers: Vec<String>,
}

impl IdentifierMap {
    /// Build a map where `headers[i]` is the header of the sequence renamed to `g_<i>`.
    pub fn from_headers(headers: Vec<String>) -> Self {
        IdentifierMap { headers }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Original header (without the `>` sentinel) for a synthetic id.
    pub fn get(&self, id: usize) -> Option<&str> {
        self.headers.get(id).map(String::as_str)
    }

    /// `(id, original header)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.headers.iter().map(String::as_str).enumerate()
    }
}

/// Synthetic identifier for the sequence at zero-based position `i`.
pub fn synthetic_id(i: usize) -> String {
    format!("{}{}", SYNTHETIC_PREFIX, i)
}

/// Turn an original header into a label that is safe inside a Newick tree.
///
/// Strips leading `>` sentinels, keeps the first whitespace-delimited token
/// and replaces tree metacharacters with `_`. Idempotent.
pub fn sanitize(header: &str) -> String {
    let header = header.trim_start_matches(HEADER_SENTINEL);
    let token = header.split_whitespace().next().unwrap_or("");
    token
        .chars()
        .map(|c| if TREE_METACHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Rewrite every header line of a FASTA stream to `>g_<i>`.
///
/// Single pass in input order. Sequence lines (and anything before the first
/// header) are copied byte for byte. Returns the map from synthetic id to
/// the original header text.
pub fn encode<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> io::Result<IdentifierMap> {
    let mut headers = Vec::new();
    let mut line = Vec::with_capacity(256);

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        if line.first() == Some(&(HEADER_SENTINEL as u8)) {
            let text = String::from_utf8_lossy(&line[1..]);
            let text = text.trim_end_matches(['\n', '\r']);
            writeln!(writer, "{}{}", HEADER_SENTINEL, synthetic_id(headers.len()))?;
            headers.push(text.to_string());
        } else {
            writer.write_all(&line)?;
        }
    }

    writer.flush()?;
    Ok(IdentifierMap::from_headers(headers))
}

/// [`encode`] from `input` (plain or gzip) into `output`.
///
/// Fails with [`PipelineError::NoSequences`] when the input holds no header,
/// so no external stage ever runs with an empty map.
pub fn encode_file(input: &Path, output: &Path) -> Result<IdentifierMap> {
    let reader = xzopen(input).map_err(|e| PipelineError::io(input, e))?;
    let file = File::create(output).map_err(|e| PipelineError::io(output, e))?;

    let map = encode(reader, BufWriter::new(file)).map_err(|e| PipelineError::io(input, e))?;
    if map.is_empty() {
        return Err(PipelineError::NoSequences {
            path: input.to_path_buf(),
        });
    }

    log::debug!(
        "Renamed {} sequences from {} into {}",
        map.len(),
        input.display(),
        output.display()
    );
    Ok(map)
}

/// Restored labels that do not identify a single sequence.
///
/// Maps each label that is empty, or shared by two or more ids, to the ids
/// that restore to it. Empty when every sequence gets a distinct name.
pub fn ambiguous_labels(map: &IdentifierMap) -> BTreeMap<String, Vec<usize>> {
    let mut by_label: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (id, header) in map.iter() {
        by_label.entry(sanitize(header)).or_default().push(id);
    }
    by_label.retain(|label, ids| label.is_empty() || ids.len() > 1);
    by_label
}

/// Outcome of one [`decode`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Number of `g_<i>:` tokens rewritten.
    pub replaced: usize,
    /// Ids that appeared as tokens but have no entry in the map; left verbatim.
    pub unmapped: BTreeSet<usize>,
}

/// Restore original labels in a tree produced from encoded sequences.
///
/// Only the complete token `g_<i>:` is rewritten, to `sanitize(header) + ":"`.
/// The token must start at a label boundary, spell `i` without leading zeros
/// and end with the colon, so `g_1:` never matches inside `g_10:` or `xg_1:`.
/// The scan is a single pass over the input: replaced text is never
/// rescanned. Ids absent from the tree are not an error.
pub fn decode(tree: &str, map: &IdentifierMap) -> (String, DecodeStats) {
    let labels: Vec<String> = map.iter().map(|(_, header)| sanitize(header)).collect();
    let bytes = tree.as_bytes();

    let mut out = String::with_capacity(tree.len());
    let mut stats = DecodeStats::default();
    let mut pending = 0;
    let mut i = 0;

    while i < bytes.len() {
        let Some((id, end)) = match_token(bytes, i) else {
            i += 1;
            continue;
        };
        match labels.get(id) {
            Some(label) => {
                out.push_str(&tree[pending..i]);
                out.push_str(label);
                out.push(':');
                pending = end;
                stats.replaced += 1;
            }
            None => {
                stats.unmapped.insert(id);
            }
        }
        i = end;
    }

    out.push_str(&tree[pending..]);
    (out, stats)
}

fn is_label_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Match `g_<digits>:` at `start`; returns the id and the index just past the colon.
fn match_token(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    let prefix = SYNTHETIC_PREFIX.as_bytes();
    if !bytes[start..].starts_with(prefix) {
        return None;
    }
    if start > 0 && is_label_byte(bytes[start - 1]) {
        return None;
    }

    let digits_start = start + prefix.len();
    let digits_len = bytes[digits_start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let digits_end = digits_start + digits_len;

    if digits_len == 0 || bytes.get(digits_end) != Some(&b':') {
        return None;
    }
    if digits_len > 1 && bytes[digits_start] == b'0' {
        return None;
    }

    // Digits are ASCII, so the slice is valid UTF-8
    let id = std::str::from_utf8(&bytes[digits_start..digits_end])
        .ok()?
        .parse::<usize>()
        .ok()?;
    Some((id, digits_end + 1))
}
