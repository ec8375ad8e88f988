//! End-to-end checks of CSS selector result matchers against captured responses.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use html_result_matchers::prelude::*;
use html_result_matchers::{MatchError, Subject};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn html(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::html(body.to_string())
}

// ============================================================================
// Worked scenarios
// ============================================================================

#[test]
fn test_number_equal() {
    init_tracing();
    let response = html(r#"<div id="x">42</div>"#);
    css_selector!("#x")
        .unwrap()
        .number(42.0)
        .match_response(&response)
        .unwrap();
}

#[test]
fn test_number_mismatch_reports_both_values() {
    let response = html(r#"<div id="x">42</div>"#);
    let err = css_selector!("#x")
        .unwrap()
        .number(43.0)
        .match_response(&response)
        .unwrap_err();
    match err {
        MatchError::Mismatch {
            selector,
            subject,
            expected,
            actual,
        } => {
            assert_eq!(selector, "#x");
            assert_eq!(subject, Subject::Number);
            assert_eq!(expected, "43.0");
            assert_eq!(actual, "42.0");
        }
        other => panic!("expected a mismatch, got {other:?}"),
    }
}

#[test]
fn test_count_then_uniqueness() {
    let response = html("<p>a</p><p>b</p>");
    let p = css_selector!("p").unwrap();
    p.node_count(2).match_response(&response).unwrap();
    let err = p.string("a").match_response(&response).unwrap_err();
    assert!(matches!(err, MatchError::NotUnique { count: 2, .. }));
}

#[test]
fn test_missing_element() {
    let response = html("<span></span>");
    let missing = css_selector!("#missing").unwrap();
    let err = missing.exists().match_response(&response).unwrap_err();
    assert_eq!(err.to_string(), "CSS selector #missing does not exist");
    missing.does_not_exist().match_response(&response).unwrap();
}

#[test]
fn test_attribute_value() {
    let response = html(r#"<a href="/x">link</a>"#);
    let a = css_selector!("a").unwrap();
    a.attribute("href", "/x").match_response(&response).unwrap();
    let err = a
        .attribute("href", "/y")
        .match_response(&response)
        .unwrap_err();
    assert!(matches!(
        err,
        MatchError::Mismatch { subject: Subject::Attribute(ref name), .. } if name == "href"
    ));
}

#[test]
fn test_template_substitution() {
    let matchers = css_selector!("#%s", "row-1").unwrap();
    assert_eq!(matchers.selector(), "#row-1");
}

// ============================================================================
// Encodings and response metadata
// ============================================================================

#[test]
fn test_charset_header_drives_decoding() {
    init_tracing();
    let body = b"<h1>Z\xfcrich</h1>".to_vec();
    let declared = ResponseSnapshot::html(body.clone()).with_charset("ISO-8859-1");
    let undeclared = ResponseSnapshot::html(body);
    let title = css_selector!("h1").unwrap().string("Zürich");

    title.match_response(&declared).unwrap();
    assert!(title.match_response(&undeclared).is_err());
}

#[test]
fn test_meta_charset_without_header() {
    let response =
        ResponseSnapshot::html(b"<head><meta charset=\"ISO-8859-1\"></head><h1>Z\xfcrich</h1>".to_vec());
    css_selector!("h1")
        .unwrap()
        .string("Zürich")
        .match_response(&response)
        .unwrap();
}

#[test]
fn test_meta_charset_after_long_head() {
    let mut body = format!("<head><!-- {} -->", "x".repeat(6000)).into_bytes();
    body.extend_from_slice(b"<meta charset=\"ISO-8859-1\"></head><p>\xe9</p>");
    css_selector!("p")
        .unwrap()
        .string("é")
        .match_response(&ResponseSnapshot::html(body))
        .unwrap();
}

#[test]
fn test_preformatted_text_keeps_whitespace() {
    let response = html("<pre>a   b\n  c</pre>");
    let pre = css_selector!("pre").unwrap();
    pre.string("a   b\n  c").match_response(&response).unwrap();
    assert!(pre.string("a b c").match_response(&response).is_err());
}

#[test]
fn test_unsupported_charset_is_parse_error() {
    let response = html("<p>x</p>").with_charset("x-made-up");
    let err = css_selector!("p")
        .unwrap()
        .exists()
        .match_response(&response)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_invalid_selector_surfaces_on_evaluation() {
    let matchers = css_selector!("div >").unwrap();
    let err = matchers
        .exists()
        .match_response(&html("<div></div>"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(err.selector(), Some("div >"));
}

#[cfg(feature = "http")]
#[test]
fn test_http_response_integration() {
    let response = http::Response::builder()
        .status(200)
        .header(http::header::CONTENT_TYPE, "text/html; charset=ISO-8859-1")
        .body(b"<p class=\"city\">Z\xfcrich</p>".to_vec())
        .unwrap();
    let city = css_selector!("p.city")
        .unwrap()
        .with_config(DocumentConfig::new().with_mode(ParseMode::Fragment));
    city.string("Zürich").match_response(&response).unwrap();
    city.node_count(1).match_response(&response).unwrap();
}

// ============================================================================
// Predicate-based matchers
// ============================================================================

#[test]
fn test_predicates() {
    let response = html(
        r#"<ul class="results">
             <li><span class="score">9.5</span> Alpha</li>
             <li><span class="score">7</span> Beta</li>
             <li><span class="score">3.25</span> Gamma</li>
           </ul>
           <p id="summary">Showing 3 of 120 results</p>"#,
    );

    css_selector!(".results li")
        .unwrap()
        .node_count_matching(predicate::in_iter([2_usize, 3, 4]))
        .match_response(&response)
        .unwrap();
    css_selector!("li:nth-child(%d) .score", 1)
        .unwrap()
        .number_matching(predicate::ge(9.0_f64))
        .match_response(&response)
        .unwrap();
    css_selector!("#summary")
        .unwrap()
        .string_matching(predicate::str::is_match(r"^Showing \d+ of \d+ results$").unwrap())
        .match_response(&response)
        .unwrap();

    let err = css_selector!("li:nth-child(%d) .score", 3)
        .unwrap()
        .number_matching(predicate::gt(5.0_f64))
        .match_response(&response)
        .unwrap_err();
    assert!(matches!(err, MatchError::PredicateFailed { ref actual, .. } if actual == "3.25"));
}

#[test]
fn test_boolean_lenient_reading() {
    let response = html(r#"<i id="a">True</i><i id="b">on</i>"#);
    css_selector!("#a")
        .unwrap()
        .boolean_value(true)
        .match_response(&response)
        .unwrap();
    css_selector!("#b")
        .unwrap()
        .boolean_value(false)
        .match_response(&response)
        .unwrap();
}

#[test]
fn test_matchers_outlive_factory() {
    let checks = {
        let row = css_selector!("tr[data-id='%d']", 5).unwrap();
        vec![row.exists(), row.attribute("data-id", 5)]
    };
    let response = html("<table><tr data-id=\"5\"><td>x</td></tr></table>");
    for check in &checks {
        check.match_response(&response).unwrap();
    }
}

// ============================================================================
// Properties
// ============================================================================

fn list_of(n: usize) -> String {
    let items: String = (0..n).map(|i| format!("<li>item {i}</li>")).collect();
    format!("<ul>{items}</ul>")
}

proptest! {
    #[test]
    fn prop_exists_and_does_not_exist_partition(n in 0usize..6) {
        let response = html(&list_of(n));
        let li = css_selector!("li").unwrap();
        let exists = li.exists().match_response(&response).is_ok();
        let absent = li.does_not_exist().match_response(&response).is_ok();
        prop_assert_ne!(exists, absent);
        prop_assert_eq!(exists, n > 0);
    }

    #[test]
    fn prop_node_count_is_exact(n in 0usize..6, expected in 0usize..6) {
        let response = html(&list_of(n));
        let result = css_selector!("li").unwrap().node_count(expected).match_response(&response);
        prop_assert_eq!(result.is_ok(), n == expected);
    }

    #[test]
    fn prop_value_operations_need_exactly_one(n in 0usize..5, value in "[a-z]{1,8}") {
        prop_assume!(n != 1);
        let response = html(&list_of(n));
        let li = css_selector!("li").unwrap();
        for check in [
            li.string(value.clone()),
            li.number(1.0),
            li.boolean_value(true),
            li.attribute("class", value.clone()),
        ] {
            let err = check.match_response(&response).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Uniqueness);
        }
    }

    #[test]
    fn prop_string_matches_exact_text(word in "[a-zA-Z0-9]{1,12}", other in "[a-zA-Z0-9]{1,12}") {
        let response = html(&format!("<p id=\"t\">{word}</p>"));
        let p = css_selector!("#t").unwrap();
        prop_assert!(p.string(word.clone()).match_response(&response).is_ok());
        prop_assert_eq!(p.string(other.clone()).match_response(&response).is_ok(), word == other);
    }

    #[test]
    fn prop_same_template_same_selector(id in "[a-z][a-z0-9-]{0,10}") {
        let a = css_selector!("#%s", id.clone()).unwrap();
        let b = css_selector!("#%s", id.clone()).unwrap();
        prop_assert_eq!(a.selector(), b.selector());
        prop_assert_eq!(a.selector(), format!("#{id}"));
    }
}
