/*
    leakroot  -  a memory leak root-cause analyzer
    Copyright (C) 2026  The leakroot Authors

    This program is free software: you can redistribute it and/or modify it
    under the terms of the GNU General Public License as published by the
    Free Software Foundation, either version 3 of the License, or (at your
    option) any later version.

    This program is distributed in the hope that it will be useful, but
    WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License
    for more details.

    You should have received a copy of the GNU General Public License along
    with this program. If not, see <https://www.gnu.org/licenses/>.
*/

// Component A: turns a Valgrind-like memory checker's text report into
// structured LeakRecords.
use crate::error::ReportError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossCategory {
    Definitely,
    Indirectly,
    Possibly,
    StillReachable,
}

impl LossCategory {
    fn parse(text: &str) -> Option<LossCategory> {
        match text {
            "definitely" => Some(LossCategory::Definitely),
            "indirectly" => Some(LossCategory::Indirectly),
            "possibly" => Some(LossCategory::Possibly),
            "still reachable" => Some(LossCategory::StillReachable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: Option<u32>,
}

impl Frame {
    pub fn has_debug_info(&self) -> bool {
        self.file != "?"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakRecord {
    pub bytes_direct: u64,
    pub bytes_indirect: u64,
    pub blocks: u64,
    pub loss_record_index: u32,
    pub loss_record_total: u32,
    pub category: LossCategory,

    // Ordered innermost-first.
    pub alloc_stack: Vec<Frame>,
}

impl LeakRecord {
    pub fn total_bytes(&self) -> u64 {
        self.bytes_direct + self.bytes_indirect
    }

    pub fn innermost_frame(&self) -> Option<&Frame> {
        self.alloc_stack.first()
    }
}

// Reason a `definitely lost` record was not carried forward for deep
// analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoDebugInfo,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub bytes: u64,
    pub blocks: u64,
    pub records: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportTotals {
    pub by_category: HashMap<String, CategoryTotals>,
}

impl ReportTotals {
    fn add(&mut self, category: LossCategory, record: &LeakRecord) {
        let key = category_key(category);
        let entry = self.by_category.entry(key.to_string()).or_default();
        entry.bytes += record.total_bytes();
        entry.blocks += record.blocks;
        entry.records += 1;
    }
}

fn category_key(category: LossCategory) -> &'static str {
    match category {
        LossCategory::Definitely => "definitely",
        LossCategory::Indirectly => "indirectly",
        LossCategory::Possibly => "possibly",
        LossCategory::StillReachable => "still-reachable",
    }
}

#[derive(Debug, Clone)]
pub struct ParsedReport {
    // `definitely lost` records with resolvable source coordinates,
    // in the order they appeared in the checker's output.
    pub definitely_lost: Vec<LeakRecord>,

    // `definitely lost` records dropped before deep analysis, and why.
    pub dropped: Vec<(LeakRecord, DropReason)>,

    pub totals: ReportTotals,
}

struct Patterns {
    size_line: Regex,
    frame_with_loc: Regex,
    frame_no_loc: Regex,
}

impl Patterns {
    fn new() -> Patterns {
        Patterns {
            size_line: Regex::new(
                r"(?x)
                ^(?:==\d+==\s*)?
                (?P<total>[0-9,]+)\s*
                (?:\(\s*(?P<direct>[0-9,]+)\s+direct,\s*(?P<indirect>[0-9,]+)\s+indirect\s*\)\s*)?
                bytes\ in\ (?P<blocks>[0-9,]+)\ blocks\ are\ (?P<category>definitely|indirectly|possibly|still\ reachable)\ lost
                \ in\ loss\ record\ (?P<index>\d+)\ of\ (?P<total_records>\d+)
                ",
            )
            .expect("static size-line pattern is valid"),

            frame_with_loc: Regex::new(
                r"^(?:==\d+==\s*)?(?:at|by)\s+0x[0-9A-Fa-f]+:\s+(?P<function>.+?)\s+\((?P<file>[^():]+):(?P<line>\d+)\)\s*$",
            )
            .expect("static frame pattern is valid"),

            frame_no_loc: Regex::new(
                r"^(?:==\d+==\s*)?(?:at|by)\s+0x[0-9A-Fa-f]+:\s+(?P<function>.+?)\s+\((?:in\s+)?.*\)\s*$",
            )
            .expect("static frame fallback pattern is valid"),
        }
    }
}

fn parse_count(text: &str) -> u64 {
    text.replace(',', "").parse().unwrap_or(0)
}

// Parse a single loss-record block's leading size line, if `line` is one.
fn parse_size_line(patterns: &Patterns, line: &str) -> Option<(LossCategory, u64, u64, u64, u32, u32)> {
    let caps = patterns.size_line.captures(line)?;
    let category = LossCategory::parse(&caps["category"])?;
    let total = parse_count(&caps["total"]);
    let (direct, indirect) = match (caps.name("direct"), caps.name("indirect")) {
        (Some(d), Some(i)) => (parse_count(d.as_str()), parse_count(i.as_str())),
        _ => (total, 0),
    };
    let blocks = parse_count(&caps["blocks"]);
    let index: u32 = caps["index"].parse().ok()?;
    let total_records: u32 = caps["total_records"].parse().ok()?;

    Some((category, direct, indirect, blocks, index, total_records))
}

fn parse_frame(patterns: &Patterns, line: &str) -> Option<Frame> {
    if let Some(caps) = patterns.frame_with_loc.captures(line) {
        return Some(Frame {
            function: caps["function"].trim().to_string(),
            file: caps["file"].trim().to_string(),
            line: caps["line"].parse().ok(),
        });
    }
    if let Some(caps) = patterns.frame_no_loc.captures(line) {
        return Some(Frame {
            function: caps["function"].trim().to_string(),
            file: "?".to_string(),
            line: None,
        });
    }
    None
}

// Parse a memory checker's text report, in the line-oriented format
// documented in the external-interfaces section: size lines of the form
// "N (D direct, I indirect) bytes in B blocks are CATEGORY lost in loss
// record K of M", followed by "at"/"by" stack frame lines.
pub fn parse_report(text: &str) -> Result<ParsedReport, ReportError> {
    if text.trim().is_empty() {
        return Err(ReportError::Empty);
    }

    let patterns = Patterns::new();
    let lines: Vec<&str> = text.lines().collect();

    let mut definitely_lost = Vec::new();
    let mut dropped = Vec::new();
    let mut totals = ReportTotals::default();

    let mut ix = 0;
    while ix < lines.len() {
        let line = lines[ix];
        match parse_size_line(&patterns, line) {
            Some((category, direct, indirect, blocks, index, total_records)) => {
                let mut alloc_stack = Vec::new();
                let mut cursor = ix + 1;
                let mut resync_attempts = 0;

                loop {
                    if cursor >= lines.len() {
                        break;
                    }
                    if let Some(frame) = parse_frame(&patterns, lines[cursor]) {
                        alloc_stack.push(frame);
                        cursor += 1;
                        resync_attempts = 0;
                        continue;
                    }

                    // Not a frame line. If we have not collected any frames
                    // yet, try to resync a bounded number of times before
                    // giving up on this one block.
                    if alloc_stack.is_empty() && resync_attempts < 2 {
                        resync_attempts += 1;
                        cursor += 1;
                        continue;
                    }
                    break;
                }

                if alloc_stack.is_empty() {
                    // This block could not be resynced; skip just it and
                    // resume scanning at the next line, which may itself be
                    // a size line (cursor already sits past the unreadable
                    // lines we tried) or the start of a fresh one.
                    ix = cursor.max(ix + 1);
                    continue;
                }

                let record = LeakRecord {
                    bytes_direct: direct,
                    bytes_indirect: indirect,
                    blocks,
                    loss_record_index: index,
                    loss_record_total: total_records,
                    category,
                    alloc_stack,
                };

                totals.add(category, &record);

                match category {
                    LossCategory::Definitely => {
                        if record.innermost_frame().map(Frame::has_debug_info) == Some(true) {
                            definitely_lost.push(record);
                        } else {
                            dropped.push((record, DropReason::NoDebugInfo));
                        }
                    }
                    _ => {}
                }

                ix = cursor;
            }
            None => ix += 1,
        }
    }

    Ok(ParsedReport {
        definitely_lost,
        dropped,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
==22== HEAP SUMMARY:
==22==     in use at exit: 100 bytes in 1 blocks
==22==   total heap usage: 13 allocs, 12 frees, 79,320 bytes allocated
==22==
==22== 72 (24 direct, 48 indirect) bytes in 1 blocks are definitely lost in loss record 3 of 4
==22==    at 0x4C2FB0F: malloc (vg_replace_malloc.c:299)
==22==    by 0x1091A9: mk (leak.c:4)
==22==    by 0x1091DD: main (leak.c:9)
==22==
==22== 10 bytes in 1 blocks are possibly lost in loss record 1 of 4
==22==    at 0x4C2FB0F: malloc (vg_replace_malloc.c:299)
==22==    by 0x1091A9: mk (leak.c:4)
";

    #[test]
    fn parses_definitely_and_possibly_blocks() {
        let parsed = parse_report(SAMPLE).unwrap();
        assert_eq!(parsed.definitely_lost.len(), 1);
        let record = &parsed.definitely_lost[0];
        assert_eq!(record.bytes_direct, 24);
        assert_eq!(record.bytes_indirect, 48);
        assert_eq!(record.blocks, 1);
        assert_eq!(record.loss_record_index, 3);
        assert_eq!(record.loss_record_total, 4);
        assert_eq!(record.alloc_stack[0].function, "malloc");
        assert_eq!(record.alloc_stack[1].function, "mk");
        assert_eq!(record.alloc_stack[1].file, "leak.c");
        assert_eq!(record.alloc_stack[1].line, Some(4));

        let possibly = parsed.totals.by_category.get("possibly").unwrap();
        assert_eq!(possibly.bytes, 10);
        assert_eq!(possibly.records, 1);
    }

    #[test]
    fn empty_report_is_an_error() {
        assert!(matches!(parse_report(""), Err(ReportError::Empty)));
        assert!(matches!(parse_report("   \n\t"), Err(ReportError::Empty)));
    }

    #[test]
    fn zero_definitely_lost_is_not_an_error() {
        let text = "==1== All heap blocks were freed -- no leaks are possible\n";
        let parsed = parse_report(text).unwrap();
        assert!(parsed.definitely_lost.is_empty());
    }

    #[test]
    fn drops_records_with_no_debug_info() {
        let text = "\
==1== 8 bytes in 1 blocks are definitely lost in loss record 1 of 1
==1==    at 0x4C2FB0F: malloc (in /usr/lib/valgrind/vgpreload_memcheck-amd64-linux.so)
";
        let parsed = parse_report(text).unwrap();
        assert!(parsed.definitely_lost.is_empty());
        assert_eq!(parsed.dropped.len(), 1);
        assert_eq!(parsed.dropped[0].1, DropReason::NoDebugInfo);
    }

    #[test]
    fn unrecoverable_block_is_skipped_not_fatal() {
        let text = "\
==1== 8 bytes in 1 blocks are definitely lost in loss record 1 of 2
this is not a stack frame
nor is this
nor this
==1== 16 bytes in 1 blocks are definitely lost in loss record 2 of 2
==1==    at 0x4C2FB0F: malloc (vg_replace_malloc.c:299)
==1==    by 0x1091A9: mk (leak.c:4)
";
        let parsed = parse_report(text).unwrap();
        assert_eq!(parsed.definitely_lost.len(), 1);
        assert_eq!(parsed.definitely_lost[0].loss_record_index, 2);
    }
}
