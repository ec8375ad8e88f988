//! Selector expectations evaluated against response content.
//!
//! A [`SelectorExpectation`] owns one formatted CSS selector. Every
//! operation parses the supplied bytes afresh, selects the matching
//! elements and asserts a property of them. Value-extracting operations
//! (text, number, boolean, attribute) first require exactly one match.

use predicates::Predicate;
use scraper::ElementRef;
use tracing::debug;

use crate::config::DocumentConfig;
use crate::document::{rendered_text, ParsedDocument};
use crate::result::{MatchError, MatchResult, Subject};
use crate::template::{format_double, format_template, FormatArg};

/// A formatted CSS selector and the assertions it supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorExpectation {
    expression: String,
    config: DocumentConfig,
}

impl SelectorExpectation {
    /// Format `template` with `args` into a selector expression.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Format`] when the template and arguments do not fit.
    pub fn new(template: &str, args: &[FormatArg]) -> MatchResult<Self> {
        let expression = format_template(template, args)?;
        Ok(Self {
            expression,
            config: DocumentConfig::default(),
        })
    }

    /// Use `config` for decoding and parsing content
    #[must_use]
    pub fn with_config(mut self, config: DocumentConfig) -> Self {
        self.config = config;
        self
    }

    /// The formatted selector expression
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.expression
    }

    /// Document configuration in use
    #[must_use]
    pub const fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Assert at least one element matches.
    pub fn exists(&self, content: &[u8], encoding: Option<&str>) -> MatchResult<()> {
        let document = self.parse(content, encoding)?;
        let count = self.select(&document)?.len();
        if count == 0 {
            return Err(MatchError::DoesNotExist {
                selector: self.expression.clone(),
            });
        }
        Ok(())
    }

    /// Assert no element matches.
    pub fn does_not_exist(&self, content: &[u8], encoding: Option<&str>) -> MatchResult<()> {
        let document = self.parse(content, encoding)?;
        let count = self.select(&document)?.len();
        if count != 0 {
            return Err(MatchError::Exists {
                selector: self.expression.clone(),
                count,
            });
        }
        Ok(())
    }

    /// Assert exactly `expected` elements match.
    pub fn assert_node_count(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        expected: usize,
    ) -> MatchResult<()> {
        let document = self.parse(content, encoding)?;
        let count = self.select(&document)?.len();
        self.check_equal(Subject::NodeCount, &expected, &count)
    }

    /// Assert the number of matched elements satisfies `predicate`.
    pub fn assert_node_count_matches<P>(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        predicate: &P,
    ) -> MatchResult<()>
    where
        P: Predicate<usize> + ?Sized,
    {
        let document = self.parse(content, encoding)?;
        let count = self.select(&document)?.len();
        self.check_predicate(Subject::NodeCount, predicate, &count, &count)
    }

    /// Assert the unique element's rendered text equals `expected`.
    pub fn assert_string(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        expected: &str,
    ) -> MatchResult<()> {
        let document = self.parse(content, encoding)?;
        let text = rendered_text(self.retrieve_unique_element(&document)?);
        self.check_equal(Subject::Text, expected, text.as_str())
    }

    /// Assert the unique element's rendered text satisfies `predicate`.
    pub fn assert_string_matches<P>(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        predicate: &P,
    ) -> MatchResult<()>
    where
        P: Predicate<str> + ?Sized,
    {
        let document = self.parse(content, encoding)?;
        let text = rendered_text(self.retrieve_unique_element(&document)?);
        self.check_predicate(Subject::Text, predicate, text.as_str(), &text)
    }

    /// Assert the unique element's text, read as a number, equals `expected`.
    ///
    /// Comparison is by value identity: `NaN` equals `NaN` so a page
    /// rendering "NaN" can be asserted, and `-0.0` does not equal `0.0`.
    pub fn assert_number(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        expected: f64,
    ) -> MatchResult<()> {
        let actual = self.unique_number(content, encoding)?;
        if actual.to_bits() == expected.to_bits() || (actual.is_nan() && expected.is_nan()) {
            return Ok(());
        }
        Err(self.mismatch(
            Subject::Number,
            &format_double(expected),
            &format_double(actual),
        ))
    }

    /// Assert the unique element's text, read as a number, satisfies `predicate`.
    pub fn assert_number_matches<P>(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        predicate: &P,
    ) -> MatchResult<()>
    where
        P: Predicate<f64> + ?Sized,
    {
        let actual = self.unique_number(content, encoding)?;
        self.check_predicate(Subject::Number, predicate, &actual, &format_double(actual))
    }

    /// Assert the unique element's text, read as a boolean, equals `expected`.
    ///
    /// Reading is lenient: `"true"` in any letter case is `true`, every
    /// other text (including `"yes"` or `"1"`) is `false`. A page showing
    /// `"yes"` therefore passes `assert_boolean(.., false)`.
    pub fn assert_boolean(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        expected: bool,
    ) -> MatchResult<()> {
        let document = self.parse(content, encoding)?;
        let text = rendered_text(self.retrieve_unique_element(&document)?);
        self.check_equal(Subject::Boolean, &expected, &parse_boolean(&text))
    }

    /// Assert the unique element's `name` attribute equals `expected`.
    ///
    /// A missing attribute reads as the empty string.
    pub fn assert_attribute(
        &self,
        content: &[u8],
        encoding: Option<&str>,
        name: &str,
        expected: &str,
    ) -> MatchResult<()> {
        let document = self.parse(content, encoding)?;
        let element = self.retrieve_unique_element(&document)?;
        let actual = attribute_value(element, name);
        self.check_equal(Subject::Attribute(name.to_string()), expected, actual)
    }

    fn parse(&self, content: &[u8], encoding: Option<&str>) -> MatchResult<ParsedDocument> {
        ParsedDocument::parse(content, encoding, &self.config)
    }

    fn select<'d>(&self, document: &'d ParsedDocument) -> MatchResult<Vec<ElementRef<'d>>> {
        let elements = document.select(&self.expression)?;
        debug!(
            selector = %self.expression,
            matched = elements.len(),
            "evaluated CSS selector"
        );
        Ok(elements)
    }

    /// The single element matching the selector; anything else is an error
    fn retrieve_unique_element<'d>(
        &self,
        document: &'d ParsedDocument,
    ) -> MatchResult<ElementRef<'d>> {
        match self.select(document)?.as_slice() {
            [element] => Ok(*element),
            elements => Err(MatchError::NotUnique {
                selector: self.expression.clone(),
                count: elements.len(),
            }),
        }
    }

    fn unique_number(&self, content: &[u8], encoding: Option<&str>) -> MatchResult<f64> {
        let document = self.parse(content, encoding)?;
        let text = rendered_text(self.retrieve_unique_element(&document)?);
        parse_number(&text).ok_or_else(|| MatchError::NotANumber {
            selector: self.expression.clone(),
            text,
        })
    }

    fn check_equal<T>(&self, subject: Subject, expected: &T, actual: &T) -> MatchResult<()>
    where
        T: PartialEq + std::fmt::Display + ?Sized,
    {
        if expected == actual {
            Ok(())
        } else {
            Err(self.mismatch(subject, expected, actual))
        }
    }

    fn check_predicate<P, T>(
        &self,
        subject: Subject,
        predicate: &P,
        value: &T,
        shown: &dyn std::fmt::Display,
    ) -> MatchResult<()>
    where
        P: Predicate<T> + ?Sized,
        T: ?Sized,
    {
        if predicate.eval(value) {
            return Ok(());
        }
        Err(MatchError::PredicateFailed {
            selector: self.expression.clone(),
            subject,
            predicate: predicate.to_string(),
            actual: shown.to_string(),
        })
    }

    fn mismatch<T>(&self, subject: Subject, expected: &T, actual: &T) -> MatchError
    where
        T: std::fmt::Display + ?Sized,
    {
        MatchError::Mismatch {
            selector: self.expression.clone(),
            subject,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Read element text as a number.
///
/// Surrounding whitespace is ignored and a trailing `d`/`f` type suffix is
/// accepted. The only spelled-out values are `NaN` and `Infinity`, signed or
/// not, in exactly that case.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let digits = match trimmed.strip_suffix(['d', 'D', 'f', 'F']) {
        Some(digits) if !digits.ends_with(|c: char| c.is_ascii_alphabetic()) => digits,
        _ => trimmed,
    };
    let unsigned = digits.strip_prefix(['+', '-']).unwrap_or(digits);
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic())
        && unsigned != "NaN"
        && unsigned != "Infinity"
    {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// `"true"` in any case is `true`; everything else is `false`.
pub(crate) fn parse_boolean(text: &str) -> bool {
    text.eq_ignore_ascii_case("true")
}

fn attribute_value<'e>(element: ElementRef<'e>, name: &str) -> &'e str {
    let attrs = element.value();
    attrs
        .attr(name)
        .or_else(|| attrs.attr(&name.to_ascii_lowercase()))
        .unwrap_or("")
}
