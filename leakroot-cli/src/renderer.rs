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

// The terminal renderer: one of the external collaborators named in the
// external interfaces, specified here only as a plain-text formatter.
use leakroot_engine::LeakDiagnosis;

// Format a byte count using a suffix, the same ladder the teacher's own
// table formatter uses for trace sizes.
pub fn format_bytes(value: u64) -> String {
    const DIVISOR: u64 = 1024;
    if value < 99999 {
        format!("{} B", value)
    } else if value / DIVISOR < 9999 {
        format!("{} KB", value / DIVISOR)
    } else if value / DIVISOR / DIVISOR < 9999 {
        format!("{} MB", value / DIVISOR / DIVISOR)
    } else {
        format!("{} GB", value / DIVISOR / DIVISOR / DIVISOR)
    }
}

pub fn render_text(diagnosis: &LeakDiagnosis) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "leak #{}: {} lost in {} at {}:{}\n",
        diagnosis.leak_id,
        format_bytes(diagnosis.bytes),
        diagnosis.site.function,
        diagnosis.site.file,
        diagnosis.witness_line,
    ));
    out.push_str(&format!("  kind: {:?}\n", diagnosis.kind));
    if diagnosis.roots_at_leak.is_empty() {
        out.push_str("  roots at leak: none\n");
    } else {
        out.push_str("  roots at leak:\n");
        for root in &diagnosis.roots_at_leak {
            out.push_str(&format!("    {}\n", root));
        }
    }
    if let Some(narrative) = &diagnosis.narrative {
        out.push_str(&format!("  {}\n", narrative));
    }
    out
}

pub fn render_json(diagnosis: &LeakDiagnosis) -> Result<String, serde_json::Error> {
    serde_json::to_string(diagnosis)
}

pub fn render_summary(total_leaks: usize, total_bytes: u64) -> String {
    if total_leaks == 0 {
        "no leaks found\n".to_string()
    } else {
        format!("{} leak(s), {} total\n", total_leaks, format_bytes(total_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leakroot_engine::{LeakKind, RootCause, Site, WitnessEvent};

    #[test]
    fn formats_bytes_with_suffix() {
        assert_eq!(format_bytes(72), "72 B");
        assert_eq!(format_bytes(200_000), "195 KB");
    }

    #[test]
    fn renders_text_diagnosis() {
        let cause = RootCause {
            file: "leak.c".to_string(),
            line: 9,
            kind: LeakKind::MissingFree,
            last_roots_at_leak: vec![],
            witness_event: WitnessEvent::ScopeExit { function: "mk".to_string() },
        };
        let diagnosis = LeakDiagnosis {
            leak_id: 1,
            bytes: 72,
            kind: LeakKind::MissingFree,
            site: Site {
                file: cause.file.clone(),
                function: "mk".to_string(),
                line: cause.line,
            },
            witness_line: cause.line,
            roots_at_leak: vec![],
            narrative: None,
        };
        let text = render_text(&diagnosis);
        assert!(text.contains("leak #1"));
        assert!(text.contains("MissingFree"));
        assert!(text.contains("roots at leak: none"));
    }

    #[test]
    fn summary_reports_no_leaks() {
        assert_eq!(render_summary(0, 0), "no leaks found\n");
    }
}
