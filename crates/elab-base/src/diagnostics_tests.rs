use crate::{Diagnostic, Span, SuggestedEdit, diagnostics_have_errors, render_diagnostics};

fn unwrap_diagnostic() -> Diagnostic {
    Diagnostic::error(
        "E4002",
        "value of optional type 'Int?' not unwrapped",
        Span::new(1, 3, 1, 3),
    )
    .with_edit(SuggestedEdit::insert(Span::new(1, 3, 1, 3).end_point(), "!"))
}

#[test]
fn renders_plain_diagnostic_with_source_frame_and_fix() {
    let rendered = render_diagnostics("main.sw", Some("f(y)"), &[unwrap_diagnostic()], false);
    insta::assert_snapshot!(rendered, @r"
    error[E4002] main.sw:1:3
      value of optional type 'Int?' not unwrapped
      |
    1 | f(y)
      |   ^ value of optional type 'Int?' not unwrapped
    fix: insert '!' at main.sw:1:4
    ");
}

#[test]
fn renders_without_source_and_with_labels() {
    let diagnostic = Diagnostic::warning("W4101", "cast always succeeds", Span::new(2, 1, 2, 4))
        .with_label("operand has type 'String'", Span::new(2, 1, 2, 1));
    let rendered = render_diagnostics("main.sw", None, &[diagnostic], false);
    assert_eq!(
        rendered,
        "warning[W4101] main.sw:2:1\n  cast always succeeds\nnote: operand has type 'String' at main.sw:2:1"
    );
}

#[test]
fn multi_line_spans_underline_only_their_first_column() {
    let diagnostic = Diagnostic::error("E4001", "desync", Span::new(1, 2, 3, 1));
    let rendered = render_diagnostics("main.sw", Some("abc\ndef\nghi"), &[diagnostic], false);
    assert!(rendered.contains("  |  ^ desync"), "{rendered}");
}

#[test]
fn warnings_alone_are_not_errors() {
    let warning = Diagnostic::warning("W4102", "redundant", Span::default());
    assert!(!diagnostics_have_errors(&[warning.clone()]));
    assert!(diagnostics_have_errors(&[warning, unwrap_diagnostic()]));
}

#[test]
fn colored_output_keeps_the_code_and_message() {
    let rendered = render_diagnostics("main.sw", Some("f(y)"), &[unwrap_diagnostic()], true);
    assert!(rendered.contains("error[E4002]"));
    assert!(rendered.contains("\x1b["));
}
