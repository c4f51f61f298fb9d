use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// One piece of a parsed [`ProtocolFormat`].
#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Year,
    /// `{number}` with an optional zero-padding width.
    Number { width: usize },
}

/// Template that renders an allocated `(year, number)` pair as a protocol string.
///
/// Placeholders:
/// - `{year}`: the four-digit sequence year
/// - `{number}`: the raw counter value
/// - `{number:05}` (or `{number:05d}`): the counter zero-padded to 5 digits
///
/// `{{` and `}}` produce literal braces. A template must contain `{number}`,
/// otherwise two allocations could render to the same string.
#[derive(Clone, PartialEq, Eq)]
pub struct ProtocolFormat {
    template: String,
    segments: Vec<Segment>,
}

impl ProtocolFormat {
    /// The default rendering, e.g. `42/2025`.
    pub const DEFAULT_TEMPLATE: &'static str = "{number}/{year}";

    /// Parse a template string.
    pub fn parse(template: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();
        let mut has_number = false;

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(invalid("unmatched '}'")),
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(invalid("unclosed placeholder"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&name).ok_or_else(|| {
                        invalid(&format!("unknown placeholder {{{name}}}"))
                    })?);
                    has_number |= name.starts_with("number");
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if !has_number {
            return Err(invalid("missing {number} placeholder"));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// Render a protocol number.
    pub fn render(&self, year: i32, number: u64) -> ProtocolNumber {
        let mut formatted = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => formatted.push_str(text),
                Segment::Year => formatted.push_str(&year.to_string()),
                Segment::Number { width } => {
                    formatted.push_str(&format!("{number:0width$}", width = *width))
                }
            }
        }
        ProtocolNumber {
            year,
            number,
            formatted,
        }
    }

    /// The original template text.
    pub fn template(&self) -> &str {
        &self.template
    }
}

fn parse_placeholder(name: &str) -> Option<Segment> {
    match name {
        "year" => return Some(Segment::Year),
        "number" => return Some(Segment::Number { width: 0 }),
        _ => {}
    }
    let spec = name.strip_prefix("number:")?;
    let spec = spec.strip_suffix('d').unwrap_or(spec);
    let digits = spec.strip_prefix('0').unwrap_or(spec);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let width = digits.parse::<usize>().ok().filter(|w| *w <= 20)?;
    Some(Segment::Number { width })
}

impl Default for ProtocolFormat {
    fn default() -> Self {
        Self::parse(Self::DEFAULT_TEMPLATE).expect("default protocol format is valid")
    }
}

impl FromStr for ProtocolFormat {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ProtocolFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolFormat({:?})", self.template)
    }
}

impl fmt::Display for ProtocolFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl Serialize for ProtocolFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.template)
    }
}

impl<'de> Deserialize<'de> for ProtocolFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let template = String::deserialize(deserializer)?;
        Self::parse(&template).map_err(serde::de::Error::custom)
    }
}

/// An allocated protocol number together with its rendered form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolNumber {
    /// Sequence year the number belongs to.
    pub year: i32,
    /// Raw counter value, starting at 1 each year.
    pub number: u64,
    /// Rendered through the configured [`ProtocolFormat`].
    pub formatted: String,
}

impl fmt::Display for ProtocolNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format() {
        let format = ProtocolFormat::default();
        assert_eq!(format.render(2025, 42).formatted, "42/2025");
    }

    #[test]
    fn zero_padded_python_style() {
        let format = ProtocolFormat::parse("PROT-{year}-{number:05d}").unwrap();
        let number = format.render(2024, 7);
        assert_eq!(number.formatted, "PROT-2024-00007");
        assert_eq!(number.year, 2024);
        assert_eq!(number.number, 7);
    }

    #[test]
    fn zero_padded_rust_style() {
        let format = ProtocolFormat::parse("{number:03}").unwrap();
        assert_eq!(format.render(2024, 5).formatted, "005");
        assert_eq!(format.render(2024, 12345).formatted, "12345");
    }

    #[test]
    fn escaped_braces() {
        let format = ProtocolFormat::parse("{{{number}}}").unwrap();
        assert_eq!(format.render(2025, 1).formatted, "{1}");
    }

    #[test]
    fn missing_number_rejected() {
        let err = ProtocolFormat::parse("PROT-{year}").unwrap_err();
        assert!(matches!(err, TypeError::InvalidTemplate { .. }));
    }

    #[test]
    fn unknown_placeholder_rejected() {
        assert!(ProtocolFormat::parse("{number}-{month}").is_err());
        assert!(ProtocolFormat::parse("{number:abc}").is_err());
    }

    #[test]
    fn unbalanced_braces_rejected() {
        assert!(ProtocolFormat::parse("{number").is_err());
        assert!(ProtocolFormat::parse("number}").is_err());
    }

    #[test]
    fn serde_as_string() {
        let format = ProtocolFormat::parse("N.{number}").unwrap();
        let json = serde_json::to_string(&format).unwrap();
        assert_eq!(json, "\"N.{number}\"");
        let back: ProtocolFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, format);
        assert!(serde_json::from_str::<ProtocolFormat>("\"{year}\"").is_err());
    }

    #[test]
    fn display_uses_formatted() {
        let number = ProtocolFormat::default().render(2026, 3);
        assert_eq!(number.to_string(), "3/2026");
    }

    proptest::proptest! {
        #[test]
        fn distinct_numbers_render_distinct(a in 1u64..1_000_000, b in 1u64..1_000_000) {
            let format = ProtocolFormat::parse("PROT-{year}-{number:05d}").unwrap();
            proptest::prop_assume!(a != b);
            proptest::prop_assert_ne!(
                format.render(2025, a).formatted,
                format.render(2025, b).formatted
            );
        }
    }
}
