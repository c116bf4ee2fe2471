//! Assignment Planner.
//!
//! A plan is computed from a [MethodSpec] and the source and destination [TypeId]s:
//!
//! * slice of structs to slice of structs: a single [Assignment::DelegateLoop] calling the
//!   `:struct_conv` function on each element,
//! * struct to struct: one [Assignment] per destination field, in declaration order,
//! * anything else: an empty plan.
//!
//! Planning only reads the catalog, so independent methods can be planned from several threads.

use std::collections::BTreeMap;

use crate::{
    catalog::{TypeCatalog, TypeId},
    diagnostic::Diagnostics,
    directive::{FunctionRef, MethodSpec},
    error::{Error, Result},
};

pub mod assignment;
pub mod matcher;

pub use assignment::{Assignment, AssignmentPlan, HookCall, SkipReason};
pub use matcher::FieldMatcher;

pub struct Planner<'a> {
    catalog: &'a TypeCatalog,
    /// Already planned sibling methods and whether they produce an error.
    siblings: BTreeMap<String, bool>,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self {
            catalog,
            siblings: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &'a TypeCatalog {
        self.catalog
    }

    /// Records a planned method, making it usable as `:struct_conv` delegate.
    pub fn add_sibling<N: Into<String>>(&mut self, name: N, produces_error: bool) {
        self.siblings.insert(name.into(), produces_error);
    }

    pub fn plan(
        &self,
        method: &str,
        spec: &MethodSpec,
        src: TypeId,
        dst: TypeId,
        diagnostics: &mut Diagnostics,
    ) -> Result<AssignmentPlan> {
        let catalog = self.catalog;
        let pre_process = self.hook(spec.pre_process.as_ref(), "preprocess", diagnostics)?;
        let post_process = self.hook(spec.post_process.as_ref(), "postprocess", diagnostics)?;

        if let (Some(_), Some(dst_element)) = (
            catalog.slice_element_struct(src),
            catalog.slice_element_struct(dst),
        ) {
            let delegate = spec.delegate.as_ref().ok_or_else(|| {
                Error::configuration(diagnostics.anchor(), "struct_conv func is required")
            })?;
            let may_error = self.delegate_may_error(delegate, diagnostics);
            log::debug!("{}: delegating elements to {}", method, delegate.name);
            return Ok(AssignmentPlan::new(
                vec![Assignment::DelegateLoop {
                    dst_slice: catalog[dst].name().to_owned(),
                    src_slice: catalog[src].name().to_owned(),
                    element_type: dst_element.qualified_name(),
                    delegate: delegate.name.clone(),
                    may_error,
                }],
                pre_process,
                post_process,
            ));
        }

        if let (Some(src_struct), Some(dst_struct)) = (catalog.struct_of(src), catalog.struct_of(dst))
        {
            let matcher = FieldMatcher::new(catalog, spec, src_struct, method);
            let assignments = dst_struct
                .fields()
                .map(|field| matcher.resolve(field, diagnostics))
                .collect::<Vec<_>>();
            log::debug!(
                "{}: {} assignment(s), {} skipped",
                method,
                assignments.len(),
                assignments.iter().filter(|a| a.is_skip()).count()
            );
            return Ok(AssignmentPlan::new(assignments, pre_process, post_process));
        }

        log::debug!(
            "{}: {} to {} is not a struct copy, empty plan",
            method,
            catalog[src].name(),
            catalog[dst].name()
        );
        Ok(AssignmentPlan::new(Vec::new(), pre_process, post_process))
    }

    fn delegate_may_error(&self, delegate: &FunctionRef, diagnostics: &mut Diagnostics) -> bool {
        if let Some(&produces_error) = self.siblings.get(&delegate.name) {
            return produces_error;
        }
        match self.catalog.function(&delegate.name) {
            Some(function) => function.returns_result(),
            None => {
                diagnostics.warn_at(
                    delegate.position.clone(),
                    format!("struct_conv func {} not found", delegate.name),
                );
                false
            }
        }
    }

    /// Checks a hook against the catalog: `fn(dst, src, ...)` returning nothing or a `Result`.
    fn hook(
        &self,
        hook: Option<&FunctionRef>,
        kind: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<HookCall>> {
        let Some(hook) = hook else {
            return Ok(None);
        };
        let Some(function) = self.catalog.function(&hook.name) else {
            diagnostics.warn_at(
                hook.position.clone(),
                format!("{} func {} not found", kind, hook.name),
            );
            return Ok(Some(HookCall::new(hook.name.clone(), false)));
        };
        let returns_unit = function
            .result()
            .map_or(true, |result| self.catalog[result].name() == "()");
        if function.params().len() < 2 || !returns_unit {
            return Err(Error::configuration(
                &hook.position,
                format!("function {} cannot use for {} func", hook.name, kind),
            ));
        }
        Ok(Some(HookCall::new(
            hook.name.clone(),
            function.returns_result(),
        )))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        catalog::{FunctionDescriptor, TypeCatalogBuilder},
        diagnostic::Position,
        directive::{method_directives, parse, AnnotationLine},
    };

    struct Fixture {
        catalog: TypeCatalog,
        src: TypeId,
        dst: TypeId,
        src_slice: TypeId,
        dst_slice: TypeId,
        string: TypeId,
    }

    fn fixture() -> Fixture {
        let mut builder = TypeCatalogBuilder::new();
        let string = builder.basic("String");
        let unit = builder.basic("()");

        let src = builder.declare_struct("Pet", "domain");
        builder.add_field(src, "name", string, None);
        let dst = builder.declare_struct("Pet", "model");
        builder.add_field(dst, "name", string, None);
        builder.add_field(dst, "nick", string, None);

        let src_type = builder.struct_type(src);
        let src_ref = builder.reference(src_type);
        let dst_type = builder.struct_type(dst);
        let src_elems = builder.vec(src_type);
        let src_slice = builder.reference(src_elems);
        let dst_slice = builder.vec(dst_type);

        builder.add_function(
            "",
            FunctionDescriptor::new("before".to_owned(), vec![dst_type, src_ref], Some(unit), true),
        );
        builder.add_function(
            "",
            FunctionDescriptor::new("returns_value".to_owned(), vec![dst_type, src_ref], Some(string), false),
        );
        builder.add_function(
            "",
            FunctionDescriptor::new("external_conv".to_owned(), vec![src_ref], Some(dst_type), true),
        );

        Fixture {
            catalog: builder.build(),
            src: src_ref,
            dst: dst_type,
            src_slice,
            dst_slice,
            string,
        }
    }

    fn spec(texts: &[&str]) -> MethodSpec {
        let lines = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                AnnotationLine::new(
                    (*text).to_owned(),
                    Position::new("setup.rs".to_owned(), 3 + index, 5),
                )
            })
            .collect::<Vec<_>>();
        let mut diagnostics = Diagnostics::new(Position::new("setup.rs".to_owned(), 1, 1));
        parse(&lines, &method_directives(), &mut diagnostics).unwrap()
    }

    fn diagnostics() -> Diagnostics {
        Diagnostics::new(Position::new("setup.rs".to_owned(), 10, 5))
    }

    #[test]
    fn should_plan_struct_fields_in_declaration_order() {
        let fixture = fixture();
        let planner = Planner::new(&fixture.catalog);
        let mut diagnostics = diagnostics();
        let plan = planner
            .plan(
                "domain_to_model",
                &spec(&[":skip nick"]),
                fixture.src,
                fixture.dst,
                &mut diagnostics,
            )
            .unwrap();
        assert_eq!(
            plan.assignments(),
            &[
                Assignment::SimpleCopy {
                    dst: "name".to_owned(),
                    src: "name".to_owned()
                },
                Assignment::Skip {
                    dst: "nick".to_owned(),
                    reason: SkipReason::Directive
                },
            ]
        );
        assert!(!plan.produces_error());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn should_require_delegate_for_slices() {
        let fixture = fixture();
        let planner = Planner::new(&fixture.catalog);
        let error = planner
            .plan(
                "pets",
                &spec(&[]),
                fixture.src_slice,
                fixture.dst_slice,
                &mut diagnostics(),
            )
            .unwrap_err();
        assert_matches!(
            error,
            Error::Configuration { position, message }
                if message == "struct_conv func is required" && position.line() == 10
        );
    }

    #[test]
    fn should_delegate_slices_to_sibling() {
        let fixture = fixture();
        let mut planner = Planner::new(&fixture.catalog);
        planner.add_sibling("domain_to_model", true);
        let plan = planner
            .plan(
                "pets",
                &spec(&[":struct_conv domain_to_model"]),
                fixture.src_slice,
                fixture.dst_slice,
                &mut diagnostics(),
            )
            .unwrap();
        assert_eq!(
            plan.assignments(),
            &[Assignment::DelegateLoop {
                dst_slice: "Vec<model::Pet>".to_owned(),
                src_slice: "&Vec<domain::Pet>".to_owned(),
                element_type: "model::Pet".to_owned(),
                delegate: "domain_to_model".to_owned(),
                may_error: true,
            }]
        );
        assert!(plan.produces_error());
    }

    #[test]
    fn should_resolve_delegate_from_catalog_or_warn() {
        let fixture = fixture();
        let planner = Planner::new(&fixture.catalog);

        let plan = planner
            .plan(
                "pets",
                &spec(&[":struct_conv external_conv"]),
                fixture.src_slice,
                fixture.dst_slice,
                &mut diagnostics(),
            )
            .unwrap();
        assert!(plan.produces_error());

        let mut diagnostics = diagnostics();
        let plan = planner
            .plan(
                "pets",
                &spec(&[":struct_conv nowhere"]),
                fixture.src_slice,
                fixture.dst_slice,
                &mut diagnostics,
            )
            .unwrap();
        assert!(!plan.produces_error());
        assert_eq!(
            diagnostics.iter().next().map(|d| d.message.as_str()),
            Some("struct_conv func nowhere not found")
        );
    }

    #[test]
    fn should_plan_nothing_for_other_shapes() {
        let fixture = fixture();
        let plan = Planner::new(&fixture.catalog)
            .plan(
                "names",
                &spec(&[]),
                fixture.string,
                fixture.string,
                &mut diagnostics(),
            )
            .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn should_check_hooks() {
        let fixture = fixture();
        let planner = Planner::new(&fixture.catalog);

        let plan = planner
            .plan(
                "domain_to_model",
                &spec(&[":preprocess before", ":postprocess unknown_hook"]),
                fixture.src,
                fixture.dst,
                &mut diagnostics(),
            )
            .unwrap();
        assert_eq!(
            plan.pre_process(),
            Some(&HookCall::new("before".to_owned(), true))
        );
        assert_eq!(
            plan.post_process(),
            Some(&HookCall::new("unknown_hook".to_owned(), false))
        );
        assert!(plan.produces_error());

        let error = planner
            .plan(
                "domain_to_model",
                &spec(&[":postprocess returns_value"]),
                fixture.src,
                fixture.dst,
                &mut diagnostics(),
            )
            .unwrap_err();
        assert_eq!(error.position().map(|p| p.line()), Some(3));
    }
}
