//! CSS-selector assertions on HTML response bodies.
//!
//! Endpoint tests capture a response, then check its HTML with selectors:
//! does `#cart > li` exist, how many rows does `table tr` match, what is the
//! text of `#total`, which `href` does `a.next` carry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   format once   ┌─────────────────────┐
//! │ template + args  │────────────────►│ SelectorExpectation │
//! └──────────────────┘                 └──────────┬──────────┘
//!                                                 │ shared
//!                      ┌──────────────────────────▼──────────┐
//!                      │ CssResultMatchers ──► Matcher (Fn)  │
//!                      └──────────────────────────┬──────────┘
//!                                                 │ on invoke
//!  body bytes + charset ──► decode ──► parse ──► select ──► assert
//! ```
//!
//! Every invocation re-parses its input, so matchers hold no mutable state
//! and can be shared between threads.
//!
//! # Example
//!
//! ```
//! use html_result_matchers::prelude::*;
//!
//! let response = ResponseSnapshot::html(r#"<div id="row-1"><a href="/x">42</a></div>"#);
//!
//! let link = css_selector!("#%s a", "row-1").unwrap();
//! link.number(42.0).match_response(&response).unwrap();
//! link.attribute("href", "/x").match_response(&response).unwrap();
//! link.string_matching(predicate::str::contains("4")).match_response(&response).unwrap();
//!
//! let err = link.number(43.0).match_response(&response).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Assertion);
//! ```

#![warn(missing_docs)]

mod config;
mod document;
mod expectation;
mod matchers;
mod response;
mod result;
mod template;

pub use config::{DocumentConfig, ParseMode, DEFAULT_ENCODING};
pub use document::{decode, rendered_text, ParsedDocument, META_PRESCAN_BYTES};
pub use expectation::SelectorExpectation;
pub use matchers::{css_selector, CssResultMatchers, Matcher, ResultMatcher};
pub use response::{charset_from_content_type, CapturedResponse, ResponseSnapshot};
pub use result::{ErrorKind, MatchError, MatchResult, Subject};
pub use template::{format_template, FormatArg, FormatError};

/// Build [`CssResultMatchers`] from a template and loosely typed arguments.
///
/// Each argument goes through [`FormatArg::from`], so strings, integers,
/// floats, booleans and chars can be mixed:
///
/// ```
/// let row = html_result_matchers::css_selector!("tr:nth-child(%d) td.%s", 3, "name").unwrap();
/// assert_eq!(row.selector(), "tr:nth-child(3) td.name");
/// ```
#[macro_export]
macro_rules! css_selector {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::CssResultMatchers::new($template, &[$($crate::FormatArg::from($arg)),*])
    };
}

/// Everything a test module usually needs
pub mod prelude {
    pub use super::{
        css_selector, CapturedResponse, CssResultMatchers, DocumentConfig, ErrorKind, FormatArg,
        MatchError, MatchResult, Matcher, ParseMode, ResponseSnapshot, ResultMatcher,
        SelectorExpectation,
    };
    pub use predicates::prelude::*;
}
