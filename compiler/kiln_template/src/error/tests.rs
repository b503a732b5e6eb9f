use pretty_assertions::assert_eq;

use super::*;

#[test]
fn codes_follow_the_taxonomy() {
    let err = TemplateError::RecursiveExpansion {
        instance: "A!(3)".into(),
        span: Span::new(1, 2),
    };
    assert_eq!(err.code(), ErrorCode::E4005);
    assert!(err.code().is_recursion_error());
    assert_eq!(err.span(), Span::new(1, 2));
    assert_eq!(err.to_string(), "recursive template expansion for `A!(3)`");
}

#[test]
fn semantic_failures_convert() {
    let failure = SemanticFailure::new("undefined identifier `x`", Span::new(4, 5));
    let err: TemplateError = failure.into();
    assert_eq!(err.code(), ErrorCode::E4009);
    assert_eq!(err.span(), Span::new(4, 5));
}

#[test]
fn diagnostic_lists_candidates_then_trace() {
    let err = TemplateError::NoMatchingOverload {
        instance: "Foo!(int)".into(),
        candidates: vec!["Foo(T : T[])".into(), "Foo(int n)".into()],
        span: Span::new(0, 3),
    };
    let diag = err.to_diagnostic(&["0..3: instantiated from here: `Bar!(int)`".into()]);
    assert_eq!(diag.code, ErrorCode::E4002);
    assert_eq!(
        diag.notes,
        vec![
            "candidate: Foo(T : T[])".to_string(),
            "candidate: Foo(int n)".to_string(),
            "0..3: instantiated from here: `Bar!(int)`".to_string(),
        ]
    );
    assert_eq!(diag.primary_span(), Some(Span::new(0, 3)));
}

#[test]
fn only_member_failures_name_an_instance() {
    let err = TemplateError::MemberElaborationFailed {
        instance: InstanceId::new(3),
        name: "S!(int)".into(),
        reason: Some("undefined identifier".into()),
        span: Span::DUMMY,
    };
    assert_eq!(err.instance(), Some(InstanceId::new(3)));
    assert_eq!(err.to_diagnostic(&[]).notes, vec!["undefined identifier".to_string()]);
    let other = TemplateError::MixinOnly {
        template: "M".into(),
        span: Span::DUMMY,
    };
    assert_eq!(other.instance(), None);
}
