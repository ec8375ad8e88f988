//! Positional `%`-specifier formatting for selector templates.
//!
//! A template such as `#%s > li:nth-child(%d)` with arguments `["menu", 3]`
//! renders to `#menu > li:nth-child(3)`. Specifiers follow the familiar
//! `%[index$][flags][width][.precision]conversion` grammar:
//!
//! | Conversion | Accepts | Output |
//! |---|---|---|
//! | `s`, `S` | any | display form (`S` upper-cased) |
//! | `d` | integers | decimal |
//! | `x`, `X`, `o` | integers | hexadecimal, octal |
//! | `f`, `e`, `E` | floats | fixed, scientific |
//! | `b`, `B` | any | boolean value, `true` for non-boolean arguments |
//! | `c` | chars, integer code points | character |
//! | `%%`, `%n` | none | literal `%`, newline |
//!
//! Supported flags are `-` (left-justify), `0` (zero-pad) and `+` (sign).
//! An explicit `n$` index is 1-based and does not advance the running
//! index. Surplus arguments are ignored.

use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Argument substituted into a selector template
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    /// Text
    Str(String),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Single character
    Char(char),
}

impl FormatArg {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) | Self::UInt(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Char(_) => "char",
        }
    }
}

impl fmt::Display for FormatArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&format_double(*v)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(c) => write!(f, "{c}"),
        }
    }
}

impl From<&str> for FormatArg {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FormatArg {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for FormatArg {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<char> for FormatArg {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<bool> for FormatArg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for FormatArg {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for FormatArg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<isize> for FormatArg {
    fn from(value: isize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<usize> for FormatArg {
    fn from(value: usize) -> Self {
        Self::UInt(value as u64)
    }
}

macro_rules! impl_from_integer {
    ($variant:ident($target:ty): $($t:ty),*) => {
        $(
            impl From<$t> for FormatArg {
                fn from(value: $t) -> Self {
                    Self::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(Int(i64): i8, i16, i32, i64);
impl_from_integer!(UInt(u64): u8, u16, u32, u64);

/// Template and arguments are incompatible
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Specifier points past the supplied arguments
    #[error("format specifier '{specifier}' needs argument {index} but {available} were supplied")]
    MissingArgument {
        /// Offending specifier
        specifier: String,
        /// 1-based argument position
        index: usize,
        /// Number of supplied arguments
        available: usize,
    },

    /// Conversion character is not recognised
    #[error("unknown format conversion '{conversion}' in '{specifier}'")]
    UnknownConversion {
        /// Offending specifier
        specifier: String,
        /// Conversion character
        conversion: char,
    },

    /// Argument type does not fit the conversion
    #[error("format specifier '{specifier}' cannot be applied to a {arg_type} argument")]
    IllegalConversion {
        /// Offending specifier
        specifier: String,
        /// Type of the supplied argument
        arg_type: &'static str,
    },

    /// Flag not accepted by the conversion
    #[error("flags '{flags}' are not supported by '{specifier}'")]
    UnsupportedFlag {
        /// Offending specifier
        specifier: String,
        /// Flags as written
        flags: String,
    },

    /// `-` or `0` used without a width
    #[error("format specifier '{specifier}' needs a width for its padding flag")]
    MissingWidth {
        /// Offending specifier
        specifier: String,
    },

    /// Precision given to a conversion that takes none
    #[error("format specifier '{specifier}' does not take a precision")]
    IllegalPrecision {
        /// Offending specifier
        specifier: String,
    },

    /// `%` not followed by a valid specifier
    #[error("dangling '%' at offset {offset}")]
    DanglingPercent {
        /// Byte offset in the template
        offset: usize,
    },

    /// Explicit argument index is zero or out of range
    #[error("argument index in '{specifier}' is invalid, indices start at 1")]
    InvalidIndex {
        /// Offending specifier
        specifier: String,
    },
}

fn specifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"%(?:(\d+)\$)?([-#+ 0,(<]*)(\d+)?(?:\.(\d+))?([a-zA-Z%])")
            .expect("specifier pattern is valid")
    })
}

/// Substitute `args` into `template`.
pub fn format_template(template: &str, args: &[FormatArg]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    let mut ordinary = 0;

    for caps in specifier_regex().captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        push_literal(&mut out, &template[last..whole.start()], last)?;
        let spec = Specifier::from_captures(&caps)?;
        out.push_str(&spec.render(args, &mut ordinary)?);
        last = whole.end();
    }
    push_literal(&mut out, &template[last..], last)?;

    Ok(out)
}

fn push_literal(out: &mut String, literal: &str, base: usize) -> Result<(), FormatError> {
    if let Some(pos) = literal.find('%') {
        return Err(FormatError::DanglingPercent {
            offset: base + pos,
        });
    }
    out.push_str(literal);
    Ok(())
}

struct Specifier<'t> {
    text: &'t str,
    index: Option<usize>,
    flags: &'t str,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

impl<'t> Specifier<'t> {
    fn from_captures(caps: &Captures<'t>) -> Result<Self, FormatError> {
        let text = caps.get(0).map_or("", |m| m.as_str());
        let number = |group: usize| -> Result<Option<usize>, FormatError> {
            caps.get(group)
                .map(|m| m.as_str().parse::<usize>())
                .transpose()
                .map_err(|_| FormatError::InvalidIndex {
                    specifier: text.to_string(),
                })
        };

        Ok(Self {
            text,
            index: number(1)?,
            flags: caps.get(2).map_or("", |m| m.as_str()),
            width: number(3)?,
            precision: number(4)?,
            conversion: caps
                .get(5)
                .and_then(|m| m.as_str().chars().next())
                .unwrap_or('%'),
        })
    }

    fn render(&self, args: &[FormatArg], ordinary: &mut usize) -> Result<String, FormatError> {
        let allowed = match self.conversion {
            '%' | 's' | 'S' | 'b' | 'B' | 'c' => "-",
            'n' => "",
            'd' | 'f' | 'e' | 'E' => "-+0",
            'x' | 'X' | 'o' => "-0",
            other => {
                return Err(FormatError::UnknownConversion {
                    specifier: self.text.to_string(),
                    conversion: other,
                })
            }
        };
        self.check_flags(allowed)?;
        let takes_precision = !matches!(self.conversion, '%' | 'n' | 'c' | 'd' | 'x' | 'X' | 'o');
        if self.precision.is_some() && !takes_precision {
            return Err(FormatError::IllegalPrecision {
                specifier: self.text.to_string(),
            });
        }

        let body = match self.conversion {
            '%' => "%".to_string(),
            'n' => return Ok("\n".to_string()),
            conversion => {
                let arg = self.take_argument(args, ordinary)?;
                self.convert(conversion, arg)?
            }
        };

        Ok(self.pad(body))
    }

    fn check_flags(&self, allowed: &str) -> Result<(), FormatError> {
        let unsupported = self.flags.chars().any(|flag| !allowed.contains(flag));
        let conflicting = self.flags.contains('-') && self.flags.contains('0');
        if unsupported || conflicting {
            return Err(FormatError::UnsupportedFlag {
                specifier: self.text.to_string(),
                flags: self.flags.to_string(),
            });
        }
        if self.width.is_none() && (self.flags.contains('-') || self.flags.contains('0')) {
            return Err(FormatError::MissingWidth {
                specifier: self.text.to_string(),
            });
        }
        Ok(())
    }

    fn take_argument<'a>(
        &self,
        args: &'a [FormatArg],
        ordinary: &mut usize,
    ) -> Result<&'a FormatArg, FormatError> {
        let position = match self.index {
            Some(0) => {
                return Err(FormatError::InvalidIndex {
                    specifier: self.text.to_string(),
                })
            }
            Some(explicit) => explicit - 1,
            None => {
                let position = *ordinary;
                *ordinary += 1;
                position
            }
        };

        args.get(position)
            .ok_or_else(|| FormatError::MissingArgument {
                specifier: self.text.to_string(),
                index: position + 1,
                available: args.len(),
            })
    }

    fn convert(&self, conversion: char, arg: &FormatArg) -> Result<String, FormatError> {
        let illegal = || FormatError::IllegalConversion {
            specifier: self.text.to_string(),
            arg_type: arg.type_name(),
        };
        let signed = |negative: bool, digits: String| {
            if !negative && self.flags.contains('+') {
                format!("+{digits}")
            } else {
                digits
            }
        };

        let rendered = match (conversion, arg) {
            ('s' | 'S', _) => self.truncate(arg.to_string()),
            ('b' | 'B', FormatArg::Bool(value)) => self.truncate(value.to_string()),
            ('b' | 'B', _) => self.truncate("true".to_string()),
            ('c', FormatArg::Char(c)) => c.to_string(),
            ('c', FormatArg::Int(v)) => u32::try_from(*v)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(illegal)?
                .to_string(),
            ('c', FormatArg::UInt(v)) => u32::try_from(*v)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(illegal)?
                .to_string(),
            ('d', FormatArg::Int(v)) => signed(*v < 0, v.to_string()),
            ('d', FormatArg::UInt(v)) => signed(false, v.to_string()),
            ('x' | 'X', FormatArg::Int(v)) => format!("{:x}", *v as u64),
            ('x' | 'X', FormatArg::UInt(v)) => format!("{v:x}"),
            ('o', FormatArg::Int(v)) => format!("{:o}", *v as u64),
            ('o', FormatArg::UInt(v)) => format!("{v:o}"),
            ('f' | 'e' | 'E', FormatArg::Float(v)) if v.is_nan() => "NaN".to_string(),
            ('f' | 'e' | 'E', FormatArg::Float(v)) if v.is_infinite() => {
                signed(*v < 0.0, if *v < 0.0 { "-Infinity" } else { "Infinity" }.to_string())
            }
            ('f', FormatArg::Float(v)) => {
                let precision = self.precision.unwrap_or(6);
                signed(v.is_sign_negative(), format!("{v:.precision$}"))
            }
            ('e' | 'E', FormatArg::Float(v)) => {
                let precision = self.precision.unwrap_or(6);
                signed(
                    v.is_sign_negative(),
                    two_digit_exponent(&format!("{v:.precision$e}")),
                )
            }
            _ => return Err(illegal()),
        };

        Ok(if conversion.is_ascii_uppercase() {
            rendered.to_uppercase()
        } else {
            rendered
        })
    }

    fn truncate(&self, value: String) -> String {
        match self.precision {
            Some(precision) => value.chars().take(precision).collect(),
            None => value,
        }
    }

    fn pad(&self, body: String) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = width - len;

        if self.flags.contains('-') {
            format!("{body}{}", " ".repeat(fill))
        } else if self.flags.contains('0') {
            let sign_len = usize::from(body.starts_with(['+', '-']));
            let (sign, digits) = body.split_at(sign_len);
            format!("{sign}{}{digits}", "0".repeat(fill))
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }
}

/// Canonical text of a double: `42.0`, `0.001`, `1.0E20`, `1.5E-7`, `NaN`,
/// `-Infinity`.
///
/// Magnitudes in `[1e-3, 1e7)` and zero are plain decimals with at least one
/// fractional digit; everything else is `d.dddE[-]n`.
pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        // Debug keeps the fractional part in this range
        return format!("{value:?}");
    }
    let scientific = format!("{value:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
        Some((mantissa, exponent)) => format!("{mantissa}.0E{exponent}"),
        None => scientific,
    }
}

/// `4.2e1` becomes `4.2e+01`.
fn two_digit_exponent(scientific: &str) -> String {
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => scientific.to_string(),
    }
}
