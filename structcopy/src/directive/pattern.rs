use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

/// Destination field name pattern of a `:skip` directive.
///
/// `/.../` is a regular expression searched anywhere in the name, anything else is compared to
/// the whole name.
#[derive(Clone, Debug)]
pub enum SkipPattern {
    Literal(String),
    Regex {
        source: String,
        exact_case: Regex,
        any_case: Regex,
    },
}

impl SkipPattern {
    pub fn parse(text: &str) -> Result<Self, regex::Error> {
        match text
            .strip_prefix('/')
            .and_then(|inner| inner.strip_suffix('/'))
        {
            Some(source) if !source.is_empty() => Ok(Self::Regex {
                source: source.to_owned(),
                exact_case: Regex::new(source)?,
                any_case: RegexBuilder::new(source).case_insensitive(true).build()?,
            }),
            _ => Ok(Self::Literal(text.to_owned())),
        }
    }

    pub fn is_match(&self, name: &str, case_sensitive: bool) -> bool {
        match self {
            Self::Literal(literal) if case_sensitive => literal == name,
            Self::Literal(literal) => literal.eq_ignore_ascii_case(name),
            Self::Regex { exact_case, .. } if case_sensitive => exact_case.is_match(name),
            Self::Regex { any_case, .. } => any_case.is_match(name),
        }
    }

    /// Pattern as written in the directive.
    pub fn as_written(&self) -> String {
        match self {
            Self::Literal(literal) => literal.clone(),
            Self::Regex { source, .. } => format!("/{}/", source),
        }
    }
}

impl PartialEq for SkipPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_written() == other.as_written()
    }
}

impl Eq for SkipPattern {}

impl Serialize for SkipPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_written())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::literal("SkipField", "SkipField", true, true)]
    #[case::literal_other_case("SkipField", "skipfield", true, false)]
    #[case::literal_any_case("SkipField", "skipfield", false, true)]
    #[case::literal_is_whole_name("Skip", "SkipField", true, false)]
    #[case::regex("/^Int/", "Internal", true, true)]
    #[case::regex_search("/Id$/", "OwnerId", true, true)]
    #[case::regex_other_case("/^int/", "Internal", true, false)]
    #[case::regex_any_case("/^int/", "Internal", false, true)]
    #[case::lone_slash("/", "/", true, true)]
    fn should_match_names(
        #[case] pattern: &str,
        #[case] name: &str,
        #[case] case_sensitive: bool,
        #[case] expected: bool,
    ) {
        let pattern = SkipPattern::parse(pattern).unwrap();
        assert_eq!(pattern.is_match(name, case_sensitive), expected);
    }

    #[test]
    fn should_reject_invalid_regex() {
        assert!(SkipPattern::parse("/(unclosed/").is_err());
    }
}
