use std::collections::BTreeMap;

use serde::Serialize;

use super::SkipPattern;
use crate::diagnostic::Position;

/// How destination field names are paired with source members.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchRule {
    #[default]
    #[display(fmt = "name")]
    Name,
    /// By `#[serde(rename)]` tag, the field name standing in for missing tags.
    #[display(fmt = "tag")]
    Tag,
    /// Only overrides and literals assign.
    #[display(fmt = "none")]
    None,
}

impl MatchRule {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "tag" => Some(Self::Tag),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Where the generated function writes its result.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationStyle {
    /// `fn f(src: &Src) -> Dst`
    #[default]
    #[display(fmt = "return")]
    ReturnValue,
    /// `fn f(dst: &mut Dst, src: &Src)`
    #[display(fmt = "arg")]
    ArgumentOut,
}

impl DestinationStyle {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "return" => Some(Self::ReturnValue),
            "arg" => Some(Self::ArgumentOut),
            _ => None,
        }
    }
}

/// Function named by a directive, with the position of that directive.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, new)]
pub struct FunctionRef {
    pub name: String,
    pub position: Position,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, new)]
pub struct ConverterOverride {
    pub converter: String,
    /// Explicit input path, the destination field name when absent.
    pub src: Option<String>,
}

/// Parsed directive set of one conversion method.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct MethodSpec {
    pub match_rule: MatchRule,
    pub case_sensitive: bool,
    pub use_getter: bool,
    pub use_stringer: bool,
    pub allow_typecast: bool,
    pub style: DestinationStyle,
    pub reverse: bool,
    /// Parameter emitted as `self` of a method instead of a free function.
    pub receiver: Option<String>,
    pub skip_patterns: Vec<SkipPattern>,
    pub field_overrides: BTreeMap<String, String>,
    pub method_overrides: BTreeMap<String, String>,
    pub converter_overrides: BTreeMap<String, ConverterOverride>,
    pub literal_overrides: BTreeMap<String, String>,
    pub delegate: Option<FunctionRef>,
    pub pre_process: Option<FunctionRef>,
    pub post_process: Option<FunctionRef>,
    /// Set once the method is planned.
    pub produces_error: bool,
}

impl Default for MethodSpec {
    fn default() -> Self {
        Self {
            match_rule: MatchRule::default(),
            case_sensitive: true,
            use_getter: false,
            use_stringer: false,
            allow_typecast: false,
            style: DestinationStyle::default(),
            reverse: false,
            receiver: None,
            skip_patterns: Vec::new(),
            field_overrides: BTreeMap::new(),
            method_overrides: BTreeMap::new(),
            converter_overrides: BTreeMap::new(),
            literal_overrides: BTreeMap::new(),
            delegate: None,
            pre_process: None,
            post_process: None,
            produces_error: false,
        }
    }
}

impl MethodSpec {
    pub fn is_skipped(&self, dst_field: &str) -> bool {
        self.skip_patterns
            .iter()
            .any(|pattern| pattern.is_match(dst_field, self.case_sensitive))
    }

    /// Compares member names under the active case policy.
    pub fn names_match(&self, left: &str, right: &str) -> bool {
        if self.case_sensitive {
            left == right
        } else {
            left.eq_ignore_ascii_case(right)
        }
    }
}
