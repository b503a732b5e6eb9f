use super::*;
use pretty_assertions::assert_eq;

fn error_at(start: u32, message: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E4002)
        .with_message(message)
        .with_label(Span::new(start, start + 1), "here")
}

#[test]
fn gagged_errors_are_counted_not_kept() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());

    let mark = queue.push_gag();
    assert!(queue.is_gagged());
    assert!(!queue.add(error_at(0, "speculative failure")));
    assert!(!queue.add(error_at(4, "another one")));
    assert_eq!(queue.pop_gag(mark), 2);

    assert!(!queue.is_gagged());
    assert_eq!(queue.error_count(), 0);
    assert_eq!(queue.gagged_count(), 2);
    assert!(queue.has_errors().is_none());
}

#[test]
fn nested_gags_report_their_own_counts() {
    let mut queue = DiagnosticQueue::new();

    let outer = queue.push_gag();
    assert!(!queue.add(error_at(0, "outer")));
    let inner = queue.push_gag();
    assert!(!queue.add(error_at(1, "inner")));
    assert_eq!(queue.pop_gag(inner), 1);
    assert!(queue.is_gagged());
    assert_eq!(queue.pop_gag(outer), 2);
    assert!(!queue.is_gagged());
}

#[test]
fn duplicate_errors_are_dropped() {
    let mut queue = DiagnosticQueue::new();
    assert!(queue.add(error_at(3, "no matching template")));
    assert!(!queue.add(error_at(3, "no matching template")));
    assert!(queue.add(error_at(9, "no matching template")));
    assert_eq!(queue.error_count(), 2);
}

#[test]
fn error_limit_stops_collection() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
        error_limit: 2,
        deduplicate: false,
    });
    assert!(queue.add(error_at(0, "a")));
    assert!(queue.add(error_at(1, "b")));
    assert!(queue.limit_reached());
    assert!(!queue.add(error_at(2, "c")));
    assert!(!queue.add(error_at(3, "d")));
    assert_eq!(queue.error_count(), 2);

    let codes: Vec<ErrorCode> = queue.flush().into_iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E4002, ErrorCode::E4002, ErrorCode::E9002]);
}

#[test]
fn limit_diagnostic_points_at_the_first_dropped_error() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
        error_limit: 1,
        deduplicate: false,
    });
    assert!(queue.add(error_at(0, "a")));
    assert!(!queue.add(error_at(7, "b")));
    let flushed = queue.flush();
    assert_eq!(flushed[1].code, ErrorCode::E9002);
    assert_eq!(flushed[1].message, "aborting due to 1 previous errors");
    assert_eq!(flushed[1].primary_span(), Some(Span::new(7, 8)));

    // a flushed queue may report the limit again
    assert!(queue.add(error_at(0, "a")));
    assert!(!queue.add(error_at(1, "b")));
    assert_eq!(queue.flush().len(), 2);
}

#[test]
fn flush_resets_state() {
    let mut queue = DiagnosticQueue::new();
    assert!(queue.add(error_at(0, "x")));
    assert!(queue.has_errors().is_some());
    let flushed = queue.flush();
    assert_eq!(flushed.len(), 1);
    assert_eq!(queue.error_count(), 0);
    assert_eq!(queue.peek().count(), 0);
}
