//! Wildcard name patterns with captures and back-references.
//!
//! Patterns match class names, member names and type names written in source form. The
//! supported wildcards are:
//!
//! | Token | Matches |
//! |-------|---------|
//! | `?`   | a single character other than `.` |
//! | `*`   | any run of characters other than `.` |
//! | `**`  | any run of characters, including `.` |
//! | `***` | any type, including primitives and arrays |
//! | `%`   | any primitive type other than `void` |
//! | `<n>` | the text captured by the n-th wildcard (1-based) |
//!
//! Every wildcard pushes the text it matched onto a [`Captures`] list. Captures accumulate
//! across all patterns of a rule in matching order, so a member pattern can refer back to a
//! wildcard of the class name.

use std::fmt;

use crate::{program::descriptor::PRIMITIVES, Error, Result};

/// Texts captured by the wildcards of a match, in matching order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Captures(Vec<String>);

impl Captures {
    /// Creates an empty capture list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The n-th capture, 1-based
    #[must_use]
    pub fn get(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|index| self.0.get(index))
            .map(String::as_str)
    }

    /// Number of captured texts
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All captures in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn push(&mut self, text: &str) {
        self.0.push(text.to_string());
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    AnyChar,
    AnyNoDot,
    AnyWithDots,
    AnyType,
    Primitive,
    BackRef(usize),
}

impl Segment {
    fn is_wildcard(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }
}

/// A compiled wildcard pattern.
///
/// # Examples
///
/// ```rust
/// use shaker::rules::{Captures, NamePattern};
///
/// let pattern = NamePattern::parse("com.*.Foo")?;
/// let mut captures = Captures::new();
/// assert!(pattern.matches("com.example.Foo", &mut captures));
/// assert_eq!(captures.get(1), Some("example"));
/// assert!(!pattern.matches("com.a.b.Foo", &mut Captures::new()));
/// # Ok::<(), shaker::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamePattern {
    segments: Vec<Segment>,
}

impl NamePattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for empty patterns, runs of more than three `*`, and
    /// malformed back-references.
    pub fn parse(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::InvalidPattern("empty pattern".to_string()));
        }

        let chars: Vec<char> = source.chars().collect();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;

        while pos < chars.len() {
            let segment = match chars[pos] {
                '*' => {
                    let run = chars[pos..].iter().take_while(|c| **c == '*').count();
                    pos += run;
                    match run {
                        1 => Segment::AnyNoDot,
                        2 => Segment::AnyWithDots,
                        3 => Segment::AnyType,
                        _ => {
                            return Err(Error::InvalidPattern(format!(
                                "{source}: too many consecutive '*'"
                            )))
                        }
                    }
                }
                '?' => {
                    pos += 1;
                    Segment::AnyChar
                }
                '%' => {
                    pos += 1;
                    Segment::Primitive
                }
                '<' if chars.get(pos + 1).is_some_and(char::is_ascii_digit) => {
                    let digits: String = chars[pos + 1..]
                        .iter()
                        .take_while(|c| c.is_ascii_digit())
                        .collect();
                    let close = pos + 1 + digits.len();
                    if chars.get(close) != Some(&'>') {
                        return Err(Error::InvalidPattern(format!(
                            "{source}: unterminated back-reference"
                        )));
                    }
                    let index: usize = digits.parse().map_err(|_| {
                        Error::InvalidPattern(format!("{source}: invalid back-reference"))
                    })?;
                    if index == 0 {
                        return Err(Error::InvalidPattern(format!(
                            "{source}: back-references are 1-based"
                        )));
                    }
                    pos = close + 1;
                    Segment::BackRef(index)
                }
                c => {
                    literal.push(c);
                    pos += 1;
                    continue;
                }
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(NamePattern { segments })
    }

    /// Pattern matching any class name
    #[must_use]
    pub fn any() -> Self {
        NamePattern {
            segments: vec![Segment::AnyWithDots],
        }
    }

    /// Pattern matching exactly `name`
    #[must_use]
    pub fn literal(name: &str) -> Self {
        NamePattern {
            segments: vec![Segment::Literal(name.to_string())],
        }
    }

    /// Matches `name`, appending the text of every wildcard to `captures`.
    ///
    /// On failure `captures` is left unchanged.
    pub fn matches(&self, name: &str, captures: &mut Captures) -> bool {
        let mark = captures.len();
        let chars: Vec<char> = name.chars().collect();
        if match_from(&self.segments, &chars, 0, captures) {
            true
        } else {
            captures.truncate(mark);
            false
        }
    }

    /// Matches `name` without keeping captures
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.matches(name, &mut Captures::new())
    }

    /// Returns true if the pattern contains no wildcards and no back-references
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.segments.iter().any(Segment::is_wildcard)
    }

    /// Returns true if the pattern contains a back-reference
    #[must_use]
    pub fn has_back_references(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::BackRef(_)))
    }

    /// Number of wildcards that capture text when this pattern matches
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| segment.is_wildcard() && !matches!(segment, Segment::BackRef(_)))
            .count()
    }

    /// Replaces every back-reference by the captured text it refers to.
    ///
    /// Wildcards are kept, so the result still matches whatever the original wildcards match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if a back-reference points past the end of `captures`.
    pub fn substitute(&self, captures: &Captures) -> Result<NamePattern> {
        let mut segments: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let segment = match segment {
                Segment::BackRef(n) => {
                    let text = captures.get(*n).ok_or_else(|| {
                        Error::InvalidRule(format!(
                            "back-reference <{n}> in '{self}' exceeds {} captures",
                            captures.len()
                        ))
                    })?;
                    Segment::Literal(text.to_string())
                }
                other => other.clone(),
            };
            match (segments.last_mut(), segment) {
                (Some(Segment::Literal(previous)), Segment::Literal(text)) => {
                    previous.push_str(&text);
                }
                (_, segment) => segments.push(segment),
            }
        }
        Ok(NamePattern { segments })
    }
}

fn match_from(segments: &[Segment], name: &[char], pos: usize, captures: &mut Captures) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return pos == name.len();
    };

    match segment {
        Segment::Literal(text) => {
            let len = text.chars().count();
            pos + len <= name.len()
                && text.chars().zip(&name[pos..pos + len]).all(|(a, b)| a == *b)
                && match_from(rest, name, pos + len, captures)
        }
        Segment::BackRef(n) => match captures.get(*n).map(str::to_string) {
            Some(text) => {
                let len = text.chars().count();
                pos + len <= name.len()
                    && text.chars().zip(&name[pos..pos + len]).all(|(a, b)| a == *b)
                    && match_from(rest, name, pos + len, captures)
            }
            None => false,
        },
        Segment::AnyChar => {
            pos < name.len()
                && name[pos] != '.'
                && try_capture(rest, name, pos, pos + 1, captures)
        }
        Segment::Primitive => PRIMITIVES
            .iter()
            .filter(|primitive| **primitive != "void")
            .any(|primitive| {
                let len = primitive.len();
                pos + len <= name.len()
                    && primitive.chars().zip(&name[pos..pos + len]).all(|(a, b)| a == *b)
                    && try_capture(rest, name, pos, pos + len, captures)
            }),
        Segment::AnyNoDot => {
            let limit = name[pos..]
                .iter()
                .position(|c| *c == '.')
                .map_or(name.len(), |offset| pos + offset);
            (pos..=limit)
                .rev()
                .any(|end| try_capture(rest, name, pos, end, captures))
        }
        Segment::AnyWithDots | Segment::AnyType => (pos..=name.len())
            .rev()
            .any(|end| try_capture(rest, name, pos, end, captures)),
    }
}

fn try_capture(
    rest: &[Segment],
    name: &[char],
    start: usize,
    end: usize,
    captures: &mut Captures,
) -> bool {
    let mark = captures.len();
    let text: String = name[start..end].iter().collect();
    captures.push(&text);
    if match_from(rest, name, end, captures) {
        return true;
    }
    captures.truncate(mark);
    false
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "{text}")?,
                Segment::AnyChar => write!(f, "?")?,
                Segment::AnyNoDot => write!(f, "*")?,
                Segment::AnyWithDots => write!(f, "**")?,
                Segment::AnyType => write!(f, "***")?,
                Segment::Primitive => write!(f, "%")?,
                Segment::BackRef(n) => write!(f, "<{n}>")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(pattern: &str, name: &str) -> Option<Vec<String>> {
        let mut captures = Captures::new();
        NamePattern::parse(pattern)
            .unwrap()
            .matches(name, &mut captures)
            .then(|| captures.iter().map(str::to_string).collect())
    }

    #[test]
    fn test_single_star_stops_at_dots() {
        assert_eq!(captured("com.*.Foo", "com.bar.Foo"), Some(vec!["bar".to_string()]));
        assert_eq!(captured("com.*.Foo", "com.a.b.Foo"), None);
        assert_eq!(captured("com.*", "com.Foo"), Some(vec!["Foo".to_string()]));
    }

    #[test]
    fn test_double_star_crosses_dots() {
        assert_eq!(
            captured("com.foo.**", "com.foo.bar.Baz"),
            Some(vec!["bar.Baz".to_string()])
        );
        assert!(captured("com.foo.**", "com.other.Baz").is_none());
    }

    #[test]
    fn test_single_char_and_primitive() {
        assert!(captured("a.?", "a.B").is_some());
        assert!(captured("a.?", "a.BC").is_none());
        assert_eq!(captured("%", "int"), Some(vec!["int".to_string()]));
        assert!(captured("%", "void").is_none());
        assert!(captured("%", "java.lang.String").is_none());
        assert!(captured("***", "int[][]").is_some());
    }

    #[test]
    fn test_back_references() {
        assert_eq!(
            captured("com.*.Foo<1>", "com.bar.Foobar"),
            Some(vec!["bar".to_string()])
        );
        assert!(captured("com.*.Foo<1>", "com.bar.Foobaz").is_none());

        let mut captures = Captures::new();
        assert!(NamePattern::parse("a.*Impl").unwrap().matches("a.ServiceImpl", &mut captures));
        assert!(NamePattern::parse("get<1>").unwrap().matches("getService", &mut captures));
        assert!(!NamePattern::parse("set<1>").unwrap().matches("setOther", &mut captures));
        assert_eq!(captures.len(), 1);
    }

    #[test]
    fn test_failed_match_leaves_captures_untouched() {
        let mut captures = Captures::new();
        captures.push("kept");
        assert!(!NamePattern::parse("x.*.y").unwrap().matches("x.a.z", &mut captures));
        assert_eq!(captures.iter().collect::<Vec<_>>(), vec!["kept"]);
    }

    #[test]
    fn test_substitute() {
        let pattern = NamePattern::parse("com.foo.<1>Impl").unwrap();
        assert!(!pattern.is_concrete());
        assert!(pattern.has_back_references());

        let mut captures = Captures::new();
        captures.push("Service");
        let substituted = pattern.substitute(&captures).unwrap();
        assert!(substituted.is_concrete());
        assert_eq!(substituted.to_string(), "com.foo.ServiceImpl");
        assert!(substituted.matches_name("com.foo.ServiceImpl"));

        assert!(matches!(
            NamePattern::parse("<2>").unwrap().substitute(&captures),
            Err(Error::InvalidRule(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(NamePattern::parse("").is_err());
        assert!(NamePattern::parse("a.****").is_err());
        assert!(NamePattern::parse("<0>").is_err());
        assert!(NamePattern::parse("<1").is_err());
        assert_eq!(NamePattern::parse("<init>").unwrap().to_string(), "<init>");
        assert!(NamePattern::parse("<init>").unwrap().is_concrete());
    }

    #[test]
    fn test_display_round_trips_source() {
        for source in ["com.**", "a.*.B<1>", "%", "***", "x?y"] {
            assert_eq!(NamePattern::parse(source).unwrap().to_string(), source);
        }
    }
}
