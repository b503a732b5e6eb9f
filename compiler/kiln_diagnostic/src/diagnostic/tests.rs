use super::*;
use pretty_assertions::assert_eq;

#[test]
fn builder_collects_labels_and_notes() {
    let diag = Diagnostic::error(ErrorCode::E4002)
        .with_message("no matching template")
        .with_label(Span::new(4, 9), "instantiated here")
        .with_secondary_label(Span::new(0, 3), "declared here")
        .with_note("candidate: Foo(T : T[])");

    assert!(diag.is_error());
    assert_eq!(diag.primary_span(), Some(Span::new(4, 9)));
    assert_eq!(diag.labels.len(), 2);
    assert_eq!(diag.notes, vec!["candidate: Foo(T : T[])".to_string()]);
}

#[test]
fn display_renders_code_labels_and_notes() {
    let diag = Diagnostic::error(ErrorCode::E4005)
        .with_message("recursive template expansion")
        .with_label(Span::new(1, 2), "here")
        .with_notes(["instantiated from `Foo!(int)`"]);

    assert_eq!(
        diag.to_string(),
        "error[E4005]: recursive template expansion\n  --> 1..2: here\n  = note: instantiated from `Foo!(int)`"
    );
}

#[test]
fn note_severity_is_not_an_error() {
    let mut diag = Diagnostic::error(ErrorCode::E4002);
    diag.severity = Severity::Note;
    assert!(!diag.is_error());
    assert_eq!(diag.primary_span(), None);
}
