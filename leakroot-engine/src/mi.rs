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

// A small line parser for the GDB/MI-style protocol the dynamic tracer
// speaks to the debugger. Only the subset used by `tracer` is modeled:
// result/async records with a results list of name=value pairs, where a
// value is a string, a {tuple}, or a [list].
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiValue {
    String(String),
    Tuple(HashMap<String, MiValue>),
    List(Vec<MiValue>),
}

impl MiValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MiValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&HashMap<String, MiValue>> {
        match self {
            MiValue::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MiValue]> {
        match self {
            MiValue::List(l) => Some(l),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiRecord {
    // `^done,reason=...` and friends.
    Result {
        class: String,
        results: HashMap<String, MiValue>,
    },
    // `*stopped,reason=...` and friends.
    Exec {
        class: String,
        results: HashMap<String, MiValue>,
    },
    // `~"..."`, `&"..."`, `@"..."` console/log/target streams.
    Stream { kind: char, text: String },
    // `(gdb)` prompt or any other line we don't need to interpret.
    Other(String),
}

pub fn parse_line(line: &str) -> MiRecord {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix('^') {
        let (class, results) = parse_class_and_results(rest);
        return MiRecord::Result { class, results };
    }
    if let Some(rest) = line.strip_prefix('*') {
        let (class, results) = parse_class_and_results(rest);
        return MiRecord::Exec { class, results };
    }
    for kind in ['~', '&', '@'] {
        if let Some(rest) = line.strip_prefix(kind) {
            let text = parse_c_string(rest).unwrap_or_else(|| rest.to_string());
            return MiRecord::Stream { kind, text };
        }
    }

    MiRecord::Other(line.to_string())
}

fn parse_class_and_results(rest: &str) -> (String, HashMap<String, MiValue>) {
    let comma = rest.find(',');
    let (class, remainder) = match comma {
        Some(ix) => (rest[..ix].to_string(), &rest[ix + 1..]),
        None => (rest.to_string(), ""),
    };

    let mut results = HashMap::new();
    let mut chars: std::iter::Peekable<std::str::Chars> = remainder.chars().peekable();
    while chars.peek().is_some() {
        skip_char(&mut chars, ',');
        let Some(name) = read_name(&mut chars) else { break };
        if chars.peek() != Some(&'=') {
            break;
        }
        chars.next();
        let Some(value) = read_value(&mut chars) else { break };
        results.insert(name, value);
    }

    (class, results)
}

fn skip_char(chars: &mut std::iter::Peekable<std::str::Chars>, target: char) {
    if chars.peek() == Some(&target) {
        chars.next();
    }
}

fn read_name(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<String> {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' || c == '-' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn read_value(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<MiValue> {
    match chars.peek()? {
        '"' => {
            chars.next();
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                chars.next();
                match c {
                    '"' => return Some(MiValue::String(text)),
                    '\\' => {
                        if let Some(&escaped) = chars.peek() {
                            chars.next();
                            text.push(unescape(escaped));
                        }
                    }
                    _ => text.push(c),
                }
            }
            Some(MiValue::String(text))
        }
        '{' => {
            chars.next();
            let mut tuple = HashMap::new();
            loop {
                skip_char(chars, ',');
                if chars.peek() == Some(&'}') {
                    chars.next();
                    break;
                }
                let Some(name) = read_name(chars) else { break };
                if chars.peek() != Some(&'=') {
                    break;
                }
                chars.next();
                let Some(value) = read_value(chars) else { break };
                tuple.insert(name, value);
                if chars.peek() == Some(&'}') {
                    chars.next();
                    break;
                }
            }
            Some(MiValue::Tuple(tuple))
        }
        '[' => {
            chars.next();
            let mut items = Vec::new();
            loop {
                skip_char(chars, ',');
                if chars.peek() == Some(&']') {
                    chars.next();
                    break;
                }
                // List elements may themselves be `name=value` tuples
                // without braces (MI allows this for result lists); peek
                // for that shape and fall back to a bare value otherwise.
                let checkpoint: Vec<char> = chars.clone().collect();
                if let Some(name) = read_name(chars) {
                    if chars.peek() == Some(&'=') {
                        chars.next();
                        if let Some(value) = read_value(chars) {
                            let mut tuple = HashMap::new();
                            tuple.insert(name, value);
                            items.push(MiValue::Tuple(tuple));
                            if chars.peek() == Some(&']') {
                                chars.next();
                                break;
                            }
                            continue;
                        }
                    }
                }
                *chars = checkpoint.into_iter().peekable();
                if let Some(value) = read_value(chars) {
                    items.push(value);
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                    break;
                }
            }
            Some(MiValue::List(items))
        }
        _ => None,
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

fn parse_c_string(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    let mut chars = inner.chars().peekable();
    let mut out = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(unescape(escaped));
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_result_record() {
        let record = parse_line("^done,value=\"42\"\n");
        match record {
            MiRecord::Result { class, results } => {
                assert_eq!(class, "done");
                assert_eq!(results.get("value").and_then(MiValue::as_str), Some("42"));
            }
            _ => panic!("expected Result"),
        }
    }

    #[test]
    fn parses_exec_stopped_with_frame_tuple() {
        let record = parse_line("*stopped,reason=\"end-stepping-range\",frame={func=\"mk\",line=\"8\"}");
        match record {
            MiRecord::Exec { class, results } => {
                assert_eq!(class, "stopped");
                let frame = results.get("frame").and_then(MiValue::as_tuple).unwrap();
                assert_eq!(frame.get("func").and_then(MiValue::as_str), Some("mk"));
                assert_eq!(frame.get("line").and_then(MiValue::as_str), Some("8"));
            }
            _ => panic!("expected Exec"),
        }
    }

    #[test]
    fn parses_stream_record() {
        let record = parse_line("~\"Breakpoint 1 at 0x1234\\n\"");
        match record {
            MiRecord::Stream { kind, text } => {
                assert_eq!(kind, '~');
                assert_eq!(text, "Breakpoint 1 at 0x1234\n");
            }
            _ => panic!("expected Stream"),
        }
    }

    #[test]
    fn parses_list_of_tuples() {
        let record = parse_line("^done,locals=[{name=\"p\",value=\"0x0\"},{name=\"n\",value=\"64\"}]");
        match record {
            MiRecord::Result { results, .. } => {
                let locals = results.get("locals").and_then(MiValue::as_list).unwrap();
                assert_eq!(locals.len(), 2);
                let first = locals[0].as_tuple().unwrap();
                assert_eq!(first.get("name").and_then(MiValue::as_str), Some("p"));
            }
            _ => panic!("expected Result"),
        }
    }

    #[test]
    fn other_line_is_passthrough() {
        assert_eq!(parse_line("(gdb) "), MiRecord::Other("(gdb) ".to_string()));
    }
}
