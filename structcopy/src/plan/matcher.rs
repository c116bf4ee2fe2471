//! Field Matcher: decides how one destination field is produced.

use std::collections::BTreeMap;

use super::assignment::{Assignment, SkipReason};
use crate::{
    catalog::{FieldDescriptor, StructDescriptor, TypeCatalog, TypeId},
    diagnostic::Diagnostics,
    directive::{MatchRule, MethodSpec},
};

/// Source member chosen for a destination field.
#[derive(Clone, PartialEq, Eq, Debug)]
enum Accessor {
    Field { path: String, ty: TypeId },
    Getter { path: String, ty: TypeId },
}

impl Accessor {
    fn path(&self) -> &str {
        match self {
            Self::Field { path, .. } | Self::Getter { path, .. } => path,
        }
    }

    fn ty(&self) -> TypeId {
        match self {
            Self::Field { ty, .. } | Self::Getter { ty, .. } => *ty,
        }
    }
}

enum Lookup {
    Found(Accessor),
    /// Override path the catalog cannot follow, used as written.
    Trusted(String),
    Missing,
}

#[derive(new)]
pub struct FieldMatcher<'a> {
    catalog: &'a TypeCatalog,
    spec: &'a MethodSpec,
    src: &'a StructDescriptor,
    method: &'a str,
}

impl<'a> FieldMatcher<'a> {
    pub fn resolve(&self, dst: &FieldDescriptor, diagnostics: &mut Diagnostics) -> Assignment {
        let assignment = self.resolve_inner(dst, diagnostics);
        log::trace!("{}: {} <- {:?}", self.method, dst.name(), assignment);
        assignment
    }

    fn resolve_inner(&self, dst: &FieldDescriptor, diagnostics: &mut Diagnostics) -> Assignment {
        let dst_name = dst.name().to_owned();
        let spec = self.spec;

        if let Some(literal) = self.override_for(&spec.literal_overrides, &dst_name) {
            return Assignment::LiteralAssign {
                dst: dst_name,
                literal: literal.clone(),
            };
        }
        if spec.is_skipped(&dst_name) {
            return Assignment::Skip {
                dst: dst_name,
                reason: SkipReason::Directive,
            };
        }
        if let Some(method) = self.override_for(&spec.method_overrides, &dst_name) {
            let may_error = self
                .src
                .method(method, spec.case_sensitive)
                .map_or(false, |descriptor| descriptor.returns_result());
            return Assignment::MethodMatchCall {
                dst: dst_name,
                method: method.clone(),
                may_error,
            };
        }

        let converter = self.override_for(&spec.converter_overrides, &dst_name);
        let field_override = converter
            .and_then(|converter| converter.src.as_ref())
            .or_else(|| self.override_for(&spec.field_overrides, &dst_name));

        let lookup = match field_override {
            Some(path) => match self.resolve_path(path) {
                Some(accessor) => Lookup::Found(accessor),
                None => Lookup::Trusted(path.clone()),
            },
            None if spec.match_rule == MatchRule::None && converter.is_none() => {
                return Assignment::Skip {
                    dst: dst_name,
                    reason: SkipReason::MatchDisabled,
                };
            }
            None => match self.find_accessor(dst) {
                Some(accessor) => Lookup::Found(accessor),
                None if converter.is_some() => Lookup::Trusted(dst_name.clone()),
                None => Lookup::Missing,
            },
        };

        let accessor = match lookup {
            Lookup::Found(accessor) => accessor,
            Lookup::Trusted(path) => {
                log::debug!(
                    "{}: source path {:?} for \"{}\" is not resolvable, used as written",
                    self.method,
                    path,
                    dst_name
                );
                return match converter {
                    Some(converter) => self.converter_call(
                        dst_name,
                        path,
                        &converter.converter,
                        diagnostics,
                    ),
                    None => Assignment::SimpleCopy {
                        dst: dst_name,
                        src: path,
                    },
                };
            }
            Lookup::Missing => {
                diagnostics.warn(format!(
                    "{}: no source member matches destination field \"{}\"",
                    self.method, dst_name
                ));
                return Assignment::Skip {
                    dst: dst_name,
                    reason: SkipReason::NoMatch,
                };
            }
        };

        if let Some(converter) = converter {
            return self.converter_call(
                dst_name,
                accessor.path().to_owned(),
                &converter.converter,
                diagnostics,
            );
        }

        let catalog = self.catalog;
        let (src_type, dst_type) = (&catalog[accessor.ty()], &catalog[dst.ty()]);
        if src_type.id() == dst_type.id() {
            return match accessor {
                Accessor::Getter { path, .. } => Assignment::GetterCopy {
                    dst: dst_name,
                    getter: path.trim_end_matches("()").to_owned(),
                },
                Accessor::Field { path, .. } => Assignment::SimpleCopy {
                    dst: dst_name,
                    src: path,
                },
            };
        }
        if spec.use_stringer && dst_type.is_string_like() && catalog.is_stringer(src_type.id()) {
            return Assignment::StringerCopy {
                dst: dst_name,
                src: accessor.path().to_owned(),
            };
        }
        if spec.allow_typecast && src_type.is_basic() && dst_type.is_basic() {
            return Assignment::CastCopy {
                dst: dst_name,
                src: accessor.path().to_owned(),
                target_type: dst_type.name().to_owned(),
            };
        }

        diagnostics.warn(format!(
            "{}: field \"{}\": type mismatch, {} cannot be assigned to {}",
            self.method,
            dst_name,
            src_type.name(),
            dst_type.name()
        ));
        Assignment::Skip {
            dst: dst_name,
            reason: SkipReason::TypeMismatch,
        }
    }

    /// Looks an override up by destination field name under the active case policy.
    fn override_for<'m, V>(&self, map: &'m BTreeMap<String, V>, dst: &str) -> Option<&'m V> {
        map.get(dst).or_else(|| {
            if self.spec.case_sensitive {
                None
            } else {
                map.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(dst))
                    .map(|(_, value)| value)
            }
        })
    }

    /// Field first, then getter when enabled.
    fn find_accessor(&self, dst: &FieldDescriptor) -> Option<Accessor> {
        let spec = self.spec;
        if spec.match_rule == MatchRule::Tag {
            let dst_key = dst.tag().unwrap_or(dst.name());
            if let Some(field) = self
                .src
                .fields()
                .find(|field| spec.names_match(field.tag().unwrap_or(field.name()), dst_key))
            {
                return Some(Accessor::Field {
                    path: field.name().to_owned(),
                    ty: field.ty(),
                });
            }
        } else if let Some(field) = self.src.field(dst.name(), spec.case_sensitive) {
            return Some(Accessor::Field {
                path: field.name().to_owned(),
                ty: field.ty(),
            });
        }
        if spec.use_getter {
            if let Some(method) = self.src.method(dst.name(), spec.case_sensitive) {
                if let (true, Some(ty)) = (method.is_getter(), method.result()) {
                    return Some(Accessor::Getter {
                        path: format!("{}()", method.name()),
                        ty,
                    });
                }
            }
        }
        None
    }

    /// Follows a `a.b.c()` path through the catalog.
    fn resolve_path(&self, path: &str) -> Option<Accessor> {
        let case_sensitive = self.spec.case_sensitive;
        let segments = path.split('.').collect::<Vec<_>>();
        let mut container = self.src;
        let mut resolved = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let (name, ty, is_call) = match segment.strip_suffix("()") {
                Some(method) => {
                    let method = container.method(method, case_sensitive)?;
                    if !method.is_getter() {
                        return None;
                    }
                    (method.name(), method.result()?, true)
                }
                None => {
                    let field = container.field(segment, case_sensitive)?;
                    (field.name(), field.ty(), false)
                }
            };
            resolved.push(if is_call {
                format!("{}()", name)
            } else {
                name.to_owned()
            });
            if index + 1 == segments.len() {
                let path = resolved.join(".");
                return Some(if is_call {
                    Accessor::Getter { path, ty }
                } else {
                    Accessor::Field { path, ty }
                });
            }
            container = self.catalog.struct_of(ty)?;
        }
        None
    }

    fn converter_call(
        &self,
        dst: String,
        src: String,
        converter: &str,
        diagnostics: &mut Diagnostics,
    ) -> Assignment {
        let Some(function) = self.catalog.function(converter) else {
            return Assignment::ConverterCall {
                dst,
                src,
                converter: converter.to_owned(),
                by_ref: true,
                may_error: false,
            };
        };
        if function.params().len() != 1 || function.result().is_none() {
            diagnostics.warn(format!(
                "{}: field \"{}\": converter {} must take one argument and return a value",
                self.method, dst, converter
            ));
            return Assignment::Skip {
                dst,
                reason: SkipReason::ConverterSignature,
            };
        }
        let by_ref = self.catalog[function.params()[0]].name().starts_with('&');
        Assignment::ConverterCall {
            dst,
            src,
            converter: converter.to_owned(),
            by_ref,
            may_error: function.returns_result(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        catalog::{FunctionDescriptor, MethodDescriptor, StructId, TypeCatalogBuilder},
        diagnostic::Position,
        directive::{method_directives, parse, AnnotationLine},
    };

    struct Fixture {
        catalog: TypeCatalog,
        src: StructId,
        dst: StructId,
    }

    /// Source `User { name: String, email: String, age: u32, status: Status, nick(), profile:
    /// Profile }` and destination `Dto { Name: String, Email: String, age: u64, status: String,
    /// nick: String, city: String, label: String }`.
    fn fixture() -> Fixture {
        let mut builder = TypeCatalogBuilder::new();
        let string = builder.basic("String");
        let ref_string = builder.reference(string);
        let u32_type = builder.basic("u32");
        let u64_type = builder.basic("u64");
        let status = builder.basic("Status");
        builder.mark_stringer(status);

        let profile = builder.declare_struct("Profile", "domain");
        builder.add_field(profile, "city", string, None);
        let profile_type = builder.struct_type(profile);

        let src = builder.declare_struct("User", "domain");
        builder.add_field(src, "name", string, None);
        builder.add_field(src, "email", string, Some("mail".to_owned()));
        builder.add_field(src, "age", u32_type, None);
        builder.add_field(src, "status", status, None);
        builder.add_field(src, "profile", profile_type, None);
        builder.add_method(
            src,
            MethodDescriptor::new("nick".to_owned(), 0, Some(string), false),
        );
        builder.add_method(
            src,
            MethodDescriptor::new("validate".to_owned(), 0, Some(string), true),
        );

        let dst = builder.declare_struct("Dto", "model");
        builder.add_field(dst, "Name", string, None);
        builder.add_field(dst, "Email", string, Some("mail".to_owned()));
        builder.add_field(dst, "age", u64_type, None);
        builder.add_field(dst, "status", string, None);
        builder.add_field(dst, "nick", string, None);
        builder.add_field(dst, "city", string, None);
        builder.add_field(dst, "label", string, None);

        builder.add_function(
            "",
            FunctionDescriptor::new("to_label".to_owned(), vec![ref_string], Some(string), true),
        );
        builder.add_function(
            "",
            FunctionDescriptor::new("two_args".to_owned(), vec![string, string], Some(string), false),
        );

        Fixture {
            catalog: builder.build(),
            src,
            dst,
        }
    }

    fn spec(texts: &[&str]) -> MethodSpec {
        let lines = texts
            .iter()
            .map(|text| {
                AnnotationLine::new((*text).to_owned(), Position::new("setup.rs".to_owned(), 3, 5))
            })
            .collect::<Vec<_>>();
        let mut diagnostics = Diagnostics::new(Position::new("setup.rs".to_owned(), 1, 1));
        parse(&lines, &method_directives(), &mut diagnostics).unwrap()
    }

    fn resolve(texts: &[&str], dst_field: &str) -> (Assignment, Diagnostics) {
        let fixture = fixture();
        let spec = spec(texts);
        let matcher = FieldMatcher::new(
            &fixture.catalog,
            &spec,
            &fixture.catalog[fixture.src],
            "user_to_dto",
        );
        let field = fixture.catalog[fixture.dst]
            .field(dst_field, true)
            .unwrap()
            .clone();
        let mut diagnostics = Diagnostics::new(Position::new("setup.rs".to_owned(), 4, 5));
        let assignment = matcher.resolve(&field, &mut diagnostics);
        (assignment, diagnostics)
    }

    #[rstest]
    #[case::over_name_match(&[":literal Name \"x\""])]
    #[case::over_skip(&[":skip Name", ":literal Name \"x\""])]
    #[case::over_field_override(&[":map email Name", ":literal Name \"x\""])]
    #[case::over_match_none(&[":match none", ":literal Name \"x\""])]
    fn literal_should_win(#[case] texts: &[&str]) {
        let (assignment, _) = resolve(texts, "Name");
        assert_eq!(
            assignment,
            Assignment::LiteralAssign {
                dst: "Name".to_owned(),
                literal: "\"x\"".to_owned()
            }
        );
    }

    #[rstest]
    #[case::literal(&[":case:off", ":skip Name"])]
    #[case::regex(&[":skip /^Na/"])]
    #[case::over_method_override(&[":skip Name", ":match_method Name nick"])]
    fn skip_should_win_over_source_match(#[case] texts: &[&str]) {
        let (assignment, diagnostics) = resolve(texts, "Name");
        assert_eq!(
            assignment,
            Assignment::Skip {
                dst: "Name".to_owned(),
                reason: SkipReason::Directive
            }
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn case_policy_should_drive_name_matching() {
        let (assignment, diagnostics) = resolve(&[], "Email");
        assert_eq!(
            assignment,
            Assignment::Skip {
                dst: "Email".to_owned(),
                reason: SkipReason::NoMatch
            }
        );
        assert_eq!(diagnostics.len(), 1);

        let (assignment, _) = resolve(&[":case:off"], "Email");
        assert_eq!(
            assignment,
            Assignment::SimpleCopy {
                dst: "Email".to_owned(),
                src: "email".to_owned()
            }
        );
    }

    #[test]
    fn getter_should_apply_only_when_enabled() {
        let (assignment, _) = resolve(&[":getter"], "nick");
        assert_eq!(
            assignment,
            Assignment::GetterCopy {
                dst: "nick".to_owned(),
                getter: "nick".to_owned()
            }
        );

        let (assignment, _) = resolve(&[], "nick");
        assert_matches!(
            assignment,
            Assignment::Skip {
                reason: SkipReason::NoMatch,
                ..
            }
        );
    }

    #[test]
    fn typecast_should_apply_only_when_enabled() {
        let (assignment, diagnostics) = resolve(&[], "age");
        assert_eq!(
            assignment,
            Assignment::Skip {
                dst: "age".to_owned(),
                reason: SkipReason::TypeMismatch
            }
        );
        let warning = diagnostics.iter().next().unwrap();
        assert!(warning.message.contains("user_to_dto"));
        assert!(warning.message.contains("\"age\""));

        let (assignment, _) = resolve(&[":typecast"], "age");
        assert_eq!(
            assignment,
            Assignment::CastCopy {
                dst: "age".to_owned(),
                src: "age".to_owned(),
                target_type: "u64".to_owned()
            }
        );
    }

    #[test]
    fn typecast_should_not_apply_to_struct_values() {
        let (assignment, diagnostics) = resolve(&[":typecast", ":map profile city"], "city");
        assert_eq!(
            assignment,
            Assignment::Skip {
                dst: "city".to_owned(),
                reason: SkipReason::TypeMismatch
            }
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn stringer_should_take_precedence_over_typecast() {
        let (assignment, _) = resolve(&[":stringer", ":typecast"], "status");
        assert_eq!(
            assignment,
            Assignment::StringerCopy {
                dst: "status".to_owned(),
                src: "status".to_owned()
            }
        );
    }

    #[test]
    fn tag_rule_should_match_by_tag() {
        let (assignment, _) = resolve(&[":match tag"], "Email");
        assert_eq!(
            assignment,
            Assignment::SimpleCopy {
                dst: "Email".to_owned(),
                src: "email".to_owned()
            }
        );
    }

    #[test]
    fn match_none_should_only_assign_overrides() {
        let (assignment, diagnostics) = resolve(&[":match none"], "Name");
        assert_matches!(
            assignment,
            Assignment::Skip {
                reason: SkipReason::MatchDisabled,
                ..
            }
        );
        assert!(diagnostics.is_empty());

        let (assignment, _) = resolve(&[":match none", ":match_field Name email"], "Name");
        assert_matches!(assignment, Assignment::SimpleCopy { src, .. } if src == "email");
    }

    #[rstest]
    #[case::dotted("profile.city", "profile.city")]
    #[case::untrusted("profile.country", "profile.country")]
    fn field_override_paths(#[case] path: &str, #[case] expected: &str) {
        let directive = format!(":match_field city {}", path);
        let (assignment, _) = resolve(&[&directive], "city");
        assert_eq!(
            assignment,
            Assignment::SimpleCopy {
                dst: "city".to_owned(),
                src: expected.to_owned()
            }
        );
    }

    #[test]
    fn field_override_call_should_resolve_getter() {
        let (assignment, _) = resolve(&[":match_field label nick()"], "label");
        assert_eq!(
            assignment,
            Assignment::GetterCopy {
                dst: "label".to_owned(),
                getter: "nick".to_owned()
            }
        );
    }

    #[test]
    fn field_override_should_be_type_checked_when_resolvable() {
        let (assignment, _) = resolve(&[":match_field label age"], "label");
        assert_matches!(
            assignment,
            Assignment::Skip {
                reason: SkipReason::TypeMismatch,
                ..
            }
        );
    }

    #[test]
    fn method_override_should_not_check_source() {
        let (assignment, _) = resolve(&[":match_method label validate()"], "label");
        assert_eq!(
            assignment,
            Assignment::MethodMatchCall {
                dst: "label".to_owned(),
                method: "validate".to_owned(),
                may_error: true
            }
        );
        let (assignment, _) = resolve(&[":match_method label missing"], "label");
        assert_matches!(assignment, Assignment::MethodMatchCall { may_error: false, .. });
    }

    #[test]
    fn converters_should_be_checked_against_catalog() {
        let (assignment, _) = resolve(&[":conv label to_label name"], "label");
        assert_eq!(
            assignment,
            Assignment::ConverterCall {
                dst: "label".to_owned(),
                src: "name".to_owned(),
                converter: "to_label".to_owned(),
                by_ref: true,
                may_error: true
            }
        );

        let (assignment, diagnostics) = resolve(&[":conv label two_args name"], "label");
        assert_matches!(
            assignment,
            Assignment::Skip {
                reason: SkipReason::ConverterSignature,
                ..
            }
        );
        assert_eq!(diagnostics.len(), 1);

        let (assignment, _) = resolve(&[":conv label external::label_of"], "label");
        assert_eq!(
            assignment,
            Assignment::ConverterCall {
                dst: "label".to_owned(),
                src: "label".to_owned(),
                converter: "external::label_of".to_owned(),
                by_ref: true,
                may_error: false
            }
        );
    }
}
