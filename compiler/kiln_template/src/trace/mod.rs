//! "Instantiated from here" traces.
//!
//! Long traces are compressed. Runs of a declaration instantiating itself
//! from the same place fold into one line; if that is still too long, only
//! the innermost and outermost lines are kept.

use kiln_ir::Span;

use crate::ids::DeclId;


/// One line of a trace, innermost first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TraceEntry {
    pub decl: DeclId,
    pub name: String,
    pub span: Span,
}

fn line(entry: &TraceEntry) -> String {
    format!("{}: instantiated from here: `{}`", entry.span, entry.name)
}

/// Render `entries` as notes, showing at most `max_shown` lines.
pub fn format_trace(entries: &[TraceEntry], max_shown: usize) -> Vec<String> {
    if entries.len() <= max_shown {
        return entries.iter().map(line).collect();
    }

    let runs = recursive_runs(entries);
    if runs.len() <= max_shown {
        return runs
            .iter()
            .map(|&(start, len)| {
                let entry = &entries[start];
                if len == 1 {
                    line(entry)
                } else {
                    format!(
                        "{}: {len} recursive instantiations from here: `{}`",
                        entry.span, entry.name
                    )
                }
            })
            .collect();
    }

    let head = max_shown.div_ceil(2);
    let tail = max_shown / 2;
    let skipped = entries.len() - head - tail;
    let mut out: Vec<String> = entries[..head].iter().map(line).collect();
    out.push(format!("... ({skipped} instantiations, -v to show) ..."));
    out.extend(entries[entries.len() - tail..].iter().map(line));
    out
}

/// Group consecutive entries of one declaration at one span.
/// Returns `(start, length)` pairs.
fn recursive_runs(entries: &[TraceEntry]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match runs.last_mut() {
            Some((start, len))
                if entries[*start].decl == entry.decl && entries[*start].span == entry.span =>
            {
                *len += 1;
            }
            _ => runs.push((i, 1)),
        }
    }
    runs
}
