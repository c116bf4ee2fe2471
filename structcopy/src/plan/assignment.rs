use serde::Serialize;

/// Why a destination field is left untouched.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[display(fmt = "skipped by directive")]
    Directive,
    #[display(fmt = "no match")]
    NoMatch,
    #[display(fmt = "automatic matching disabled")]
    MatchDisabled,
    #[display(fmt = "type mismatch")]
    TypeMismatch,
    #[display(fmt = "converter signature mismatch")]
    ConverterSignature,
}

/// Operation producing one destination field, or the whole destination for [DelegateLoop].
///
/// Source paths are relative to the source value: `name`, `category.id`, `nick()`.
///
/// [DelegateLoop]: Assignment::DelegateLoop
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignment {
    SimpleCopy {
        dst: String,
        src: String,
    },
    CastCopy {
        dst: String,
        src: String,
        target_type: String,
    },
    GetterCopy {
        dst: String,
        getter: String,
    },
    /// `to_string()` of a `Display` source member.
    StringerCopy {
        dst: String,
        src: String,
    },
    ConverterCall {
        dst: String,
        src: String,
        converter: String,
        /// The converter takes its input by reference.
        by_ref: bool,
        may_error: bool,
    },
    MethodMatchCall {
        dst: String,
        method: String,
        may_error: bool,
    },
    LiteralAssign {
        dst: String,
        literal: String,
    },
    Skip {
        dst: String,
        reason: SkipReason,
    },
    DelegateLoop {
        dst_slice: String,
        src_slice: String,
        element_type: String,
        delegate: String,
        may_error: bool,
    },
}

impl Assignment {
    /// Destination field, or destination slice type for a delegated loop.
    pub fn dst(&self) -> &str {
        match self {
            Self::SimpleCopy { dst, .. }
            | Self::CastCopy { dst, .. }
            | Self::GetterCopy { dst, .. }
            | Self::StringerCopy { dst, .. }
            | Self::ConverterCall { dst, .. }
            | Self::MethodMatchCall { dst, .. }
            | Self::LiteralAssign { dst, .. }
            | Self::Skip { dst, .. } => dst,
            Self::DelegateLoop { dst_slice, .. } => dst_slice,
        }
    }

    pub fn may_error(&self) -> bool {
        match self {
            Self::ConverterCall { may_error, .. }
            | Self::MethodMatchCall { may_error, .. }
            | Self::DelegateLoop { may_error, .. } => *may_error,
            _ => false,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

/// Pre or post processing function call.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, new)]
pub struct HookCall {
    pub name: String,
    pub may_error: bool,
}

/// Ordered assignments of one method, with its hooks.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, new)]
pub struct AssignmentPlan {
    assignments: Vec<Assignment>,
    pre_process: Option<HookCall>,
    post_process: Option<HookCall>,
}

impl AssignmentPlan {
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn pre_process(&self) -> Option<&HookCall> {
        self.pre_process.as_ref()
    }

    pub fn post_process(&self) -> Option<&HookCall> {
        self.post_process.as_ref()
    }

    /// Whether the emitted function must propagate a failure.
    pub fn produces_error(&self) -> bool {
        self.assignments.iter().any(Assignment::may_error)
            || self.pre_process.iter().any(|hook| hook.may_error)
            || self.post_process.iter().any(|hook| hook.may_error)
    }

    pub fn delegate_loop(&self) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|assignment| matches!(assignment, Assignment::DelegateLoop { .. }))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn should_derive_error_production() {
        let infallible = AssignmentPlan::new(
            vec![
                Assignment::SimpleCopy {
                    dst: "name".to_owned(),
                    src: "name".to_owned(),
                },
                Assignment::MethodMatchCall {
                    dst: "nick".to_owned(),
                    method: "nick".to_owned(),
                    may_error: false,
                },
            ],
            Some(HookCall::new("before".to_owned(), false)),
            None,
        );
        assert!(!infallible.produces_error());

        let failing_hook = AssignmentPlan::new(
            Vec::new(),
            None,
            Some(HookCall::new("after".to_owned(), true)),
        );
        assert!(failing_hook.produces_error());
    }

    #[test]
    fn should_serialize_with_kind_tag() {
        let assignment = Assignment::Skip {
            dst: "SkipField".to_owned(),
            reason: SkipReason::Directive,
        };
        assert_eq!(
            serde_json::to_string(&assignment).unwrap(),
            r#"{"kind":"skip","dst":"SkipField","reason":"directive"}"#
        );
        assert_eq!(SkipReason::Directive.to_string(), "skipped by directive");
    }
}
