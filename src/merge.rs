// Merge and diff of two images.
//
// Merging folds another image-like source into a target under an overlap
// policy; equal bytes at the same address are never a conflict. Diffing
// renders both images through the dump format and emits a unified diff over
// the dump rows, so a human sees address-anchored lines rather than raw
// byte offsets.

use std::collections::HashMap;
use std::io::Write;

use thiserror::Error;

use crate::image::{Image, ImageError, Overlap, StartAddress};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for image merging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// Both images hold different bytes at one address under the `Error`
    /// policy.
    #[error("data overlapped at address {address:#06X}")]
    AddressOverlap { address: u64 },

    /// Both images carry different start addresses under the `Error`
    /// policy.
    #[error("starting addresses are different")]
    StartAddrConflict,
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Anything that can act as the right-hand side of a merge: an addressable
/// byte population plus optional start-address metadata.
pub trait AddressedByteSource {
    /// Populated addresses in ascending order.
    fn addresses(&self) -> Vec<u64>;
    /// Byte at `addr`, only if populated.
    fn byte_at(&self, addr: u64) -> Option<u8>;
    fn start_addr(&self) -> Option<StartAddress>;
}

impl AddressedByteSource for Image {
    fn addresses(&self) -> Vec<u64> {
        Image::addresses(self)
    }

    fn byte_at(&self, addr: u64) -> Option<u8> {
        Image::byte_at(self, addr)
    }

    fn start_addr(&self) -> Option<StartAddress> {
        Image::start_addr(self)
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge `other` into `dest`.
///
/// Data cells merge address by address: absent in `dest` copies, equal
/// values no-op, different values follow `overlap`. The start address
/// follows the same three-way rule afterwards.
pub fn merge<S: AddressedByteSource + ?Sized>(
    dest: &mut Image,
    other: &S,
    overlap: Overlap,
) -> Result<(), MergeError> {
    for addr in other.addresses() {
        let Some(value) = other.byte_at(addr) else {
            continue;
        };
        match dest.byte_at(addr) {
            None => dest.set(addr, value),
            Some(existing) if existing == value => {}
            Some(_) => match overlap {
                Overlap::Error => return Err(MergeError::AddressOverlap { address: addr }),
                Overlap::Ignore => {}
                Overlap::Replace => dest.set(addr, value),
            },
        }
    }

    let incoming = other.start_addr();
    if dest.start_addr() != incoming {
        match (dest.start_addr(), incoming) {
            (None, Some(_)) => dest.set_start_addr(incoming),
            (_, None) => {}
            (Some(_), Some(_)) => match overlap {
                Overlap::Error => return Err(MergeError::StartAddrConflict),
                Overlap::Ignore => {}
                Overlap::Replace => dest.set_start_addr(incoming),
            },
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Render both images as dumps and write a unified diff of the rows, with
/// three lines of context. Identical images produce no output.
pub fn diff_dumps<W: Write>(
    a: &Image,
    b: &Image,
    out: &mut W,
    name_a: &str,
    name_b: &str,
) -> Result<(), ImageError> {
    let dump_a = a.dump_string(16, false)?;
    let dump_b = b.dump_string(16, false)?;
    let lines_a: Vec<&str> = dump_a.lines().collect();
    let lines_b: Vec<&str> = dump_b.lines().collect();
    for line in unified_diff(&lines_a, &lines_b, name_a, name_b, 3) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

// One opcode over line ranges of both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy)]
struct Opcode {
    tag: OpTag,
    a_start: usize,
    a_end: usize,
    b_start: usize,
    b_end: usize,
}

/// Longest matching block between `a[alo..ahi]` and `b[blo..bhi]`, using a
/// prebuilt index of line positions in `b`.
fn longest_match(
    a: &[&str],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
    b_index: &HashMap<&str, Vec<usize>>,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0usize);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();
    for (i, line) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_runs: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b_index.get(line) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let len = j
                    .checked_sub(1)
                    .and_then(|prev| run_lengths.get(&prev).copied())
                    .unwrap_or(0)
                    + 1;
                next_runs.insert(j, len);
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        run_lengths = next_runs;
    }
    best
}

/// Matching blocks in both sequences, ascending, with a zero-length
/// terminal block.
fn matching_blocks(a: &[&str], b: &[&str]) -> Vec<(usize, usize, usize)> {
    let mut b_index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, line) in b.iter().enumerate() {
        b_index.entry(line).or_default().push(j);
    }

    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    let mut blocks = Vec::new();
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, len) = longest_match(a, alo, ahi, blo, bhi, &b_index);
        if len > 0 {
            blocks.push((i, j, len));
            queue.push((alo, i, blo, j));
            queue.push((i + len, ahi, j + len, bhi));
        }
    }
    blocks.sort_unstable();
    blocks.push((a.len(), b.len(), 0));
    blocks
}

fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    let mut out = Vec::new();
    let (mut ai, mut bi) = (0usize, 0usize);
    for (i, j, len) in matching_blocks(a, b) {
        let tag = match (ai < i, bi < j) {
            (true, true) => Some(OpTag::Replace),
            (true, false) => Some(OpTag::Delete),
            (false, true) => Some(OpTag::Insert),
            (false, false) => None,
        };
        if let Some(tag) = tag {
            out.push(Opcode {
                tag,
                a_start: ai,
                a_end: i,
                b_start: bi,
                b_end: j,
            });
        }
        if len > 0 {
            out.push(Opcode {
                tag: OpTag::Equal,
                a_start: i,
                a_end: i + len,
                b_start: j,
                b_end: j + len,
            });
        }
        ai = i + len;
        bi = j + len;
    }
    out
}

/// Split opcodes into hunks with at most `n` context lines on each side.
fn grouped_opcodes(a: &[&str], b: &[&str], n: usize) -> Vec<Vec<Opcode>> {
    let mut codes = opcodes(a, b);
    if codes.iter().all(|c| c.tag == OpTag::Equal) {
        return Vec::new();
    }
    if let Some(first) = codes.first_mut() {
        if first.tag == OpTag::Equal {
            first.a_start = first.a_end.saturating_sub(n).max(first.a_start);
            first.b_start = first.b_end.saturating_sub(n).max(first.b_start);
        }
    }
    if let Some(last) = codes.last_mut() {
        if last.tag == OpTag::Equal {
            last.a_end = last.a_end.min(last.a_start + n);
            last.b_end = last.b_end.min(last.b_start + n);
        }
    }

    let mut groups = Vec::new();
    let mut group: Vec<Opcode> = Vec::new();
    for code in codes {
        // A long equal run ends the current hunk and starts the next.
        if code.tag == OpTag::Equal && code.a_end - code.a_start > 2 * n && !group.is_empty() {
            group.push(Opcode {
                a_end: code.a_start + n,
                b_end: code.b_start + n,
                ..code
            });
            groups.push(group);
            group = vec![Opcode {
                a_start: code.a_end.saturating_sub(n).max(code.a_start),
                b_start: code.b_end.saturating_sub(n).max(code.b_start),
                ..code
            }];
            continue;
        }
        group.push(code);
    }
    if !(group.len() == 1 && group[0].tag == OpTag::Equal) && !group.is_empty() {
        groups.push(group);
    }
    groups
}

fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    if length == 1 {
        format!("{}", start + 1)
    } else if length == 0 {
        format!("{start},0")
    } else {
        format!("{},{length}", start + 1)
    }
}

/// Line-oriented unified diff, difflib style, without trailing newlines.
fn unified_diff(a: &[&str], b: &[&str], name_a: &str, name_b: &str, n: usize) -> Vec<String> {
    let groups = grouped_opcodes(a, b, n);
    if groups.is_empty() {
        return Vec::new();
    }
    let mut out = vec![format!("--- {name_a}"), format!("+++ {name_b}")];
    for group in groups {
        let first = group[0];
        let last = group[group.len() - 1];
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a_start, last.a_end),
            format_range(first.b_start, last.b_end)
        ));
        for code in group {
            match code.tag {
                OpTag::Equal => {
                    for line in &a[code.a_start..code.a_end] {
                        out.push(format!(" {line}"));
                    }
                }
                OpTag::Replace | OpTag::Delete => {
                    for line in &a[code.a_start..code.a_end] {
                        out.push(format!("-{line}"));
                    }
                }
                OpTag::Insert => {}
            }
            if matches!(code.tag, OpTag::Replace | OpTag::Insert) {
                for line in &b[code.b_start..code.b_end] {
                    out.push(format!("+{line}"));
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
