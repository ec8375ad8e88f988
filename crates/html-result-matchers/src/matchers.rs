//! Deferred result matchers built from a CSS selector.
//!
//! [`CssResultMatchers`] formats its selector template once and hands out
//! [`Matcher`]s: reusable checks bound to one assertion that do nothing
//! until invoked with a response.
//!
//! ```
//! use html_result_matchers::{css_selector, ResponseSnapshot, ResultMatcher};
//!
//! let response = ResponseSnapshot::html(r#"<ul id="cart"><li>tea</li><li>milk</li></ul>"#);
//!
//! let items = css_selector!("#%s > li", "cart").unwrap();
//! items.node_count(2).match_response(&response).unwrap();
//! items.exists().match_response(&response).unwrap();
//! assert!(items.string("tea").match_response(&response).is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use predicates::Predicate;

use crate::config::DocumentConfig;
use crate::expectation::SelectorExpectation;
use crate::response::CapturedResponse;
use crate::result::MatchResult;
use crate::template::FormatArg;

/// A check run against a captured response
pub trait ResultMatcher {
    /// Run the check against a body and its declared encoding
    fn match_content(&self, body: &[u8], encoding: Option<&str>) -> MatchResult<()>;

    /// Run the check against a captured response
    fn match_response(&self, response: &dyn CapturedResponse) -> MatchResult<()> {
        self.match_content(response.body(), response.declared_encoding())
    }
}

type Check = dyn Fn(&[u8], Option<&str>) -> MatchResult<()> + Send + Sync;

/// A deferred, reusable check
#[derive(Clone)]
pub struct Matcher {
    description: String,
    check: Arc<Check>,
}

impl Matcher {
    /// Wrap `check` as a matcher described by `description`
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&[u8], Option<&str>) -> MatchResult<()> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// What the check asserts
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl ResultMatcher for Matcher {
    fn match_content(&self, body: &[u8], encoding: Option<&str>) -> MatchResult<()> {
        (self.check)(body, encoding)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Factory for response assertions through one CSS selector
#[derive(Debug, Clone)]
pub struct CssResultMatchers {
    expectation: Arc<SelectorExpectation>,
}

impl CssResultMatchers {
    /// Format `template` with `args` and prepare matchers for the result.
    ///
    /// # Errors
    ///
    /// Returns a format error when the template and arguments do not fit.
    pub fn new(template: &str, args: &[FormatArg]) -> MatchResult<Self> {
        Ok(Self {
            expectation: Arc::new(SelectorExpectation::new(template, args)?),
        })
    }

    /// Decode and parse responses with `config`.
    ///
    /// Matchers created before this call keep their previous configuration.
    #[must_use]
    pub fn with_config(self, config: DocumentConfig) -> Self {
        let expectation = Arc::try_unwrap(self.expectation)
            .unwrap_or_else(|shared| (*shared).clone())
            .with_config(config);
        Self {
            expectation: Arc::new(expectation),
        }
    }

    /// The formatted selector expression
    #[must_use]
    pub fn selector(&self) -> &str {
        self.expectation.selector()
    }

    /// The underlying expectation, for immediate evaluation
    #[must_use]
    pub fn expectation(&self) -> &SelectorExpectation {
        &self.expectation
    }

    /// Assert the selector matches at least one element
    pub fn exists(&self) -> Matcher {
        self.deferred("exists", |e, body, encoding| e.exists(body, encoding))
    }

    /// Assert the selector matches nothing
    pub fn does_not_exist(&self) -> Matcher {
        self.deferred("does not exist", |e, body, encoding| {
            e.does_not_exist(body, encoding)
        })
    }

    /// Assert the selector matches exactly `expected` elements
    pub fn node_count(&self, expected: usize) -> Matcher {
        self.deferred(format!("node count == {expected}"), move |e, body, encoding| {
            e.assert_node_count(body, encoding, expected)
        })
    }

    /// Assert the number of matched elements satisfies `predicate`
    pub fn node_count_matching<P>(&self, predicate: P) -> Matcher
    where
        P: Predicate<usize> + Send + Sync + 'static,
    {
        self.deferred(format!("node count {predicate}"), move |e, body, encoding| {
            e.assert_node_count_matches(body, encoding, &predicate)
        })
    }

    /// Assert the unique element's text equals `expected`
    pub fn string(&self, expected: impl Into<String>) -> Matcher {
        let expected = expected.into();
        self.deferred(format!("text == {expected:?}"), move |e, body, encoding| {
            e.assert_string(body, encoding, &expected)
        })
    }

    /// Assert the unique element's text satisfies `predicate`
    pub fn string_matching<P>(&self, predicate: P) -> Matcher
    where
        P: Predicate<str> + Send + Sync + 'static,
    {
        self.deferred(format!("text {predicate}"), move |e, body, encoding| {
            e.assert_string_matches(body, encoding, &predicate)
        })
    }

    /// Assert the unique element's numeric text equals `expected`
    pub fn number(&self, expected: f64) -> Matcher {
        self.deferred(format!("number == {expected}"), move |e, body, encoding| {
            e.assert_number(body, encoding, expected)
        })
    }

    /// Assert the unique element's numeric text satisfies `predicate`
    pub fn number_matching<P>(&self, predicate: P) -> Matcher
    where
        P: Predicate<f64> + Send + Sync + 'static,
    {
        self.deferred(format!("number {predicate}"), move |e, body, encoding| {
            e.assert_number_matches(body, encoding, &predicate)
        })
    }

    /// Assert the unique element's text read as a boolean equals `expected`
    pub fn boolean_value(&self, expected: bool) -> Matcher {
        self.deferred(format!("boolean == {expected}"), move |e, body, encoding| {
            e.assert_boolean(body, encoding, expected)
        })
    }

    /// Assert the unique element's `name` attribute equals `expected`.
    ///
    /// `expected` is compared through its display form, so integers work:
    /// `attribute("colspan", 2)`.
    pub fn attribute(&self, name: impl Into<String>, expected: impl fmt::Display) -> Matcher {
        let name = name.into();
        let expected = expected.to_string();
        self.deferred(
            format!("attribute {name:?} == {expected:?}"),
            move |e, body, encoding| e.assert_attribute(body, encoding, &name, &expected),
        )
    }

    fn deferred<F>(&self, what: impl fmt::Display, check: F) -> Matcher
    where
        F: Fn(&SelectorExpectation, &[u8], Option<&str>) -> MatchResult<()>
            + Send
            + Sync
            + 'static,
    {
        let expectation = Arc::clone(&self.expectation);
        Matcher::new(
            format!("CSS selector {} {what}", expectation.selector()),
            move |body, encoding| check(expectation.as_ref(), body, encoding),
        )
    }
}

/// Response assertions through the CSS selector `template` formatted with `args`.
///
/// See [`css_selector!`](crate::css_selector!) for a variant that converts
/// arguments automatically.
pub fn css_selector(template: &str, args: &[FormatArg]) -> MatchResult<CssResultMatchers> {
    CssResultMatchers::new(template, args)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::response::ResponseSnapshot;
    use crate::result::{ErrorKind, MatchError};
    use predicates::prelude::*;

    const PAGE: &str = r#"
        <html><body>
          <h1 id="title">Orders</h1>
          <table id="orders">
            <tr data-id="7"><td class="total">42</td><td class="paid">true</td></tr>
            <tr data-id="8"><td class="total">13.5</td><td class="paid">false</td></tr>
          </table>
          <a id="next" href="/orders?page=2">next</a>
        </body></html>
    "#;

    fn page() -> ResponseSnapshot {
        ResponseSnapshot::html(PAGE)
    }

    mod factory {
        use super::*;

        #[test]
        fn test_template_arguments() {
            let matchers = css_selector("tr[data-id='%d'] .%s", &[7.into(), "total".into()]).unwrap();
            assert_eq!(matchers.selector(), "tr[data-id='7'] .total");
            matchers.number(42.0).match_response(&page()).unwrap();
        }

        #[test]
        fn test_format_error_at_build_time() {
            let err = css_selector("#%s", &[]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format);
        }

        #[test]
        fn test_matcher_description() {
            let matchers = css_selector("#title", &[]).unwrap();
            assert_eq!(
                matchers.string("Orders").description(),
                "CSS selector #title text == \"Orders\""
            );
            assert_eq!(
                matchers.node_count(1).to_string(),
                "CSS selector #title node count == 1"
            );
        }

        #[test]
        fn test_with_config_leaves_existing_matchers() {
            let matchers = css_selector("p", &[]).unwrap();
            let utf8 = matchers.string("é");
            let latin1 = matchers
                .with_config(DocumentConfig::new().with_default_encoding("ISO-8859-1"))
                .string("é");
            let body = b"<p>\xe9</p>";
            assert!(utf8.match_content(body, None).is_err());
            latin1.match_content(body, None).unwrap();
        }
    }

    mod deferred {
        use super::*;
        use std::thread;

        #[test]
        fn test_all_kinds_against_page() {
            let response = page();
            let checks = [
                css_selector("#title", &[]).unwrap().exists(),
                css_selector("#missing", &[]).unwrap().does_not_exist(),
                css_selector("tr", &[]).unwrap().node_count(2),
                css_selector("td", &[]).unwrap().node_count_matching(predicate::ge(4_usize)),
                css_selector("#title", &[]).unwrap().string("Orders"),
                css_selector("#title", &[]).unwrap().string_matching(predicate::str::is_match("^Ord").unwrap()),
                css_selector("tr[data-id='8'] .total", &[]).unwrap().number(13.5),
                css_selector("tr[data-id='8'] .total", &[]).unwrap().number_matching(predicate::lt(20.0_f64)),
                css_selector("tr[data-id='7'] .paid", &[]).unwrap().boolean_value(true),
                css_selector("#next", &[]).unwrap().attribute("href", "/orders?page=2"),
                css_selector("tr:first-child", &[]).unwrap().attribute("data-id", 7),
            ];
            for check in &checks {
                check
                    .match_response(&response)
                    .unwrap_or_else(|e| panic!("{check} failed: {e}"));
            }
        }

        #[test]
        fn test_reusable_across_responses() {
            let count = css_selector("li", &[]).unwrap().node_count(2);
            count.match_content(b"<li>a</li><li>b</li>", None).unwrap();
            let err = count.match_content(b"<li>a</li>", None).unwrap_err();
            assert!(matches!(err, MatchError::Mismatch { .. }));
            count.match_content(b"<ul><li>x</li><li>y</li></ul>", None).unwrap();
        }

        #[test]
        fn test_failures_name_the_selector() {
            let err = css_selector("td", &[])
                .unwrap()
                .string("42")
                .match_response(&page())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Uniqueness);
            assert_eq!(err.selector(), Some("td"));
            assert!(err.to_string().contains("got 4"));
        }

        #[test]
        fn test_declared_charset_from_response() {
            let response = ResponseSnapshot::html(b"<p>caf\xe9</p>".to_vec()).with_charset("ISO-8859-1");
            css_selector("p", &[]).unwrap().string("café").match_response(&response).unwrap();
        }

        #[test]
        fn test_concurrent_invocation() {
            let check = css_selector("p", &[]).unwrap().node_count(3);
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let check = check.clone();
                    thread::spawn(move || check.match_content(b"<p>1</p><p>2</p><p>3</p>", None))
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        }

        #[test]
        fn test_custom_matcher() {
            let status_ok = Matcher::new("non-empty body", |body, _| {
                if body.is_empty() {
                    Err(MatchError::DoesNotExist {
                        selector: "body".into(),
                    })
                } else {
                    Ok(())
                }
            });
            status_ok.match_response(&page()).unwrap();
            assert!(status_ok.match_content(b"", None).is_err());
        }
    }
}
