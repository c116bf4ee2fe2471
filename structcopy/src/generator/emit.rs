//! Renders planned methods as Rust functions.

use std::collections::BTreeMap;

use codegen::{Block, Function, Scope};
use itertools::Itertools;
use syn::{GenericArgument, PathArguments, Type};

use super::endpoint::Endpoints;
use crate::{
    catalog::{loader::MethodDecl, type_name::type_display_name, TypeCatalog},
    directive::{DestinationStyle, MethodSpec},
    plan::{Assignment, AssignmentPlan, HookCall},
};

/// Error type of fallible functions declared without `Result<T, E>`.
pub const DEFAULT_ERROR_TYPE: &str = "Box<dyn std::error::Error>";

/// Endpoint of a sibling method bound to `self` by `:recv`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SiblingReceiver {
    Source,
    Destination,
}

/// How a sibling method is called when used as `:struct_conv` delegate.
#[derive(Clone, Copy, PartialEq, Eq, Debug, new)]
pub struct SiblingCall {
    pub style: DestinationStyle,
    /// Source first, destination second, for argument style.
    pub reverse: bool,
    pub receiver: Option<SiblingReceiver>,
}

impl SiblingCall {
    /// Call shape of a planned method, from its directives and endpoints.
    pub fn of(spec: &MethodSpec, endpoints: &Endpoints) -> Self {
        let receiver = endpoints.receiver.map(|receiver| {
            if receiver.name == endpoints.dst.name {
                SiblingReceiver::Destination
            } else {
                SiblingReceiver::Source
            }
        });
        Self::new(spec.style, spec.reverse, receiver)
    }
}

pub struct PlannedMethod<'a> {
    pub decl: &'a MethodDecl,
    pub spec: MethodSpec,
    pub endpoints: Endpoints<'a>,
    pub plan: AssignmentPlan,
}

impl<'a> PlannedMethod<'a> {
    /// Whether the emitted function returns a `Result`.
    pub fn is_fallible(&self) -> bool {
        self.spec.produces_error || self.decl.returns_result
    }

    fn error_type(&self) -> &str {
        self.decl.error_type.as_deref().unwrap_or(DEFAULT_ERROR_TYPE)
    }
}

#[derive(new)]
pub struct MethodEmitter<'a> {
    catalog: &'a TypeCatalog,
    siblings: &'a BTreeMap<String, SiblingCall>,
}

struct Vars<'m> {
    src: &'m str,
    dst: &'m str,
    /// `dst` as `&mut` argument of hooks and delegates.
    dst_mut: String,
}

impl<'a> MethodEmitter<'a> {
    pub fn emit(&self, method: &PlannedMethod, scope: &mut Scope) {
        let decl = method.decl;
        let endpoints = &method.endpoints;
        let function = match endpoints.receiver {
            Some(receiver) => {
                let target = receiver
                    .written
                    .trim_start_matches('&')
                    .trim_start_matches("mut ")
                    .to_owned();
                let function = scope.new_impl(&target).new_fn(&decl.name);
                if receiver.written.starts_with("&mut ") {
                    function.arg_mut_self();
                } else if receiver.written.starts_with('&') {
                    function.arg_ref_self();
                } else {
                    function.arg_self();
                }
                function
            }
            None => scope.new_fn(&decl.name),
        };
        function.vis("pub");

        if !decl.docs.is_empty() {
            function.doc(
                &decl
                    .docs
                    .iter()
                    .map(|line| line.strip_prefix(' ').unwrap_or(line))
                    .join("\n"),
            );
        }

        for param in &decl.params {
            if endpoints
                .receiver
                .map_or(false, |receiver| receiver.name == param.name)
            {
                continue;
            }
            function.arg(&param.name, param.written.as_str());
        }

        let fallible = method.is_fallible();
        match (method.spec.style, fallible) {
            (DestinationStyle::ReturnValue, false) => {
                function.ret(endpoints.dst.written.as_str());
            }
            (DestinationStyle::ReturnValue, true) => {
                function.ret(format!(
                    "Result<{}, {}>",
                    endpoints.dst.written,
                    method.error_type()
                ));
            }
            (DestinationStyle::ArgumentOut, true) => {
                function.ret(format!("Result<(), {}>", method.error_type()));
            }
            (DestinationStyle::ArgumentOut, false) => {}
        }

        if let Some(receiver) = endpoints.receiver {
            function.line(format!("let {} = self;", receiver.name));
        }
        self.body(method, function);
    }

    fn body(&self, method: &PlannedMethod, function: &mut Function) {
        let endpoints = &method.endpoints;
        let style = method.spec.style;
        let vars = match style {
            DestinationStyle::ReturnValue => {
                let dst = if method.decl.params.iter().any(|param| param.name == "dst") {
                    "out"
                } else {
                    "dst"
                };
                Vars {
                    src: &endpoints.src.name,
                    dst,
                    dst_mut: format!("&mut {}", dst),
                }
            }
            DestinationStyle::ArgumentOut => Vars {
                src: &endpoints.src.name,
                dst: &endpoints.dst.name,
                dst_mut: endpoints.dst.name.clone(),
            },
        };
        let plan = &method.plan;
        let has_hooks = plan.pre_process().is_some() || plan.post_process().is_some();

        if plan.is_empty() {
            let expr = self.trivial_expr(method);
            match style {
                DestinationStyle::ReturnValue => function.line(format!(
                    "let {}{} = {};",
                    if has_hooks { "mut " } else { "" },
                    vars.dst,
                    expr
                )),
                DestinationStyle::ArgumentOut => function.line(format!("*{} = {};", vars.dst, expr)),
            };
        } else if style == DestinationStyle::ReturnValue {
            let init = match plan.delegate_loop() {
                Some(_) if endpoints.dst.written.starts_with("Vec<") => {
                    format!("Vec::with_capacity({}.len())", vars.src)
                }
                _ => default_expr(&endpoints.dst.written),
            };
            function.line(format!("let mut {} = {};", vars.dst, init));
        }

        if let Some(hook) = plan.pre_process() {
            function.line(hook_call(hook, &vars));
        }
        for assignment in plan.iter() {
            match assignment {
                Assignment::DelegateLoop {
                    delegate,
                    element_type,
                    may_error,
                    ..
                } => {
                    if style == DestinationStyle::ArgumentOut {
                        function.line(format!("{}.clear();", vars.dst));
                    }
                    let element = element_written(&endpoints.dst.written)
                        .unwrap_or_else(|| element_type.clone());
                    function.push_block(self.delegate_loop(delegate, &element, *may_error, &vars));
                }
                assignment => {
                    function.line(self.assignment_line(assignment, method, &vars));
                }
            }
        }
        if let Some(hook) = plan.post_process() {
            function.line(hook_call(hook, &vars));
        }

        match (style, method.is_fallible()) {
            (DestinationStyle::ReturnValue, false) => {
                function.line(vars.dst);
            }
            (DestinationStyle::ReturnValue, true) => {
                function.line(format!("Ok({})", vars.dst));
            }
            (DestinationStyle::ArgumentOut, true) => {
                function.line("Ok(())");
            }
            (DestinationStyle::ArgumentOut, false) => {}
        }
    }

    fn assignment_line(&self, assignment: &Assignment, method: &PlannedMethod, vars: &Vars) -> String {
        let (src, dst) = (vars.src, vars.dst);
        match assignment {
            Assignment::SimpleCopy { dst: field, src: path } => {
                let copy = path.ends_with("()")
                    || self
                        .catalog
                        .struct_of(method.endpoints.dst.ty)
                        .and_then(|dst_struct| dst_struct.field(field, true))
                        .map_or(false, |field| self.catalog[field.ty()].is_copy_scalar());
                format!(
                    "{}.{} = {}.{}{};",
                    dst,
                    field,
                    src,
                    path,
                    if copy { "" } else { ".clone()" }
                )
            }
            Assignment::CastCopy {
                dst: field,
                src: path,
                target_type,
            } => {
                let numeric = self
                    .catalog
                    .type_by_name(target_type)
                    .map_or(false, |ty| ty.is_numeric());
                if numeric {
                    format!("{}.{} = {}.{} as {};", dst, field, src, path, target_type)
                } else {
                    format!(
                        "{}.{} = {}::from({}.{}.clone());",
                        dst,
                        field,
                        type_call(target_type),
                        src,
                        path
                    )
                }
            }
            Assignment::GetterCopy { dst: field, getter } => {
                format!("{}.{} = {}.{}();", dst, field, src, getter)
            }
            Assignment::StringerCopy { dst: field, src: path } => {
                format!("{}.{} = {}.{}.to_string();", dst, field, src, path)
            }
            Assignment::ConverterCall {
                dst: field,
                src: path,
                converter,
                by_ref,
                may_error,
            } => format!(
                "{}.{} = {}({}{}.{}{}){};",
                dst,
                field,
                converter,
                if *by_ref { "&" } else { "" },
                src,
                path,
                if *by_ref { "" } else { ".clone()" },
                question_mark(*may_error)
            ),
            Assignment::MethodMatchCall {
                dst: field,
                method: name,
                may_error,
            } => format!(
                "{}.{} = {}.{}(){};",
                dst,
                field,
                src,
                name,
                question_mark(*may_error)
            ),
            Assignment::LiteralAssign { dst: field, literal } => {
                format!("{}.{} = {};", dst, field, literal)
            }
            Assignment::Skip { dst: field, reason } => format!("// {}: {}", field, reason),
            Assignment::DelegateLoop { delegate, .. } => format!("// {}: delegated", delegate),
        }
    }

    fn delegate_loop(&self, delegate: &str, element: &str, may_error: bool, vars: &Vars) -> Block {
        let mut block = Block::new(&format!("for item in {}.iter()", vars.src));
        let propagate = question_mark(may_error);
        let call = self.siblings.get(delegate).copied();
        match call {
            Some(SiblingCall {
                style: DestinationStyle::ArgumentOut,
                reverse,
                receiver,
            }) => {
                block.line(format!("let mut element = {};", default_expr(element)));
                block.line(match receiver {
                    Some(SiblingReceiver::Source) => {
                        format!("item.{}(&mut element){};", delegate, propagate)
                    }
                    Some(SiblingReceiver::Destination) => {
                        format!("element.{}(item){};", delegate, propagate)
                    }
                    None if reverse => format!("{}(item, &mut element){};", delegate, propagate),
                    None => format!("{}(&mut element, item){};", delegate, propagate),
                });
                block.line(format!("{}.push(element);", vars.dst));
            }
            Some(SiblingCall {
                receiver: Some(_), ..
            }) => {
                block.line(format!(
                    "{}.push(item.{}(){});",
                    vars.dst, delegate, propagate
                ));
            }
            _ => {
                block.line(format!(
                    "{}.push({}(item){});",
                    vars.dst, delegate, propagate
                ));
            }
        }
        block
    }

    /// Whole value conversion for endpoints the planner does not decompose.
    fn trivial_expr(&self, method: &PlannedMethod) -> String {
        let catalog = self.catalog;
        let (src, dst) = (method.endpoints.src, method.endpoints.dst);
        let src_type = &catalog[catalog.strip_pointers(src.ty)];
        let dst_type = &catalog[catalog.strip_pointers(dst.ty)];
        if src_type.id() == dst_type.id() {
            format!("{}.clone()", src.name)
        } else if method.spec.allow_typecast && src_type.is_numeric() && dst_type.is_numeric() {
            let deref = if src.written.starts_with('&') { "*" } else { "" };
            format!("{}{} as {}", deref, src.name, dst_type.name())
        } else {
            format!("{}.clone().into()", src.name)
        }
    }
}

fn question_mark(may_error: bool) -> &'static str {
    if may_error {
        "?"
    } else {
        ""
    }
}

fn hook_call(hook: &HookCall, vars: &Vars) -> String {
    format!(
        "{}({}, {}){};",
        hook.name,
        vars.dst_mut,
        vars.src,
        question_mark(hook.may_error)
    )
}

/// Type usable in front of `::` in an expression.
fn type_call(ty: &str) -> String {
    if ty.contains(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':')) {
        format!("<{}>", ty)
    } else {
        ty.to_owned()
    }
}

fn default_expr(ty: &str) -> String {
    format!("{}::default()", type_call(ty))
}

fn strip_references(ty: Type) -> Type {
    match ty {
        Type::Reference(reference) => strip_references(*reference.elem),
        other => other,
    }
}

/// Element type of a written slice-like type: `Vec<T>`, `&[T]`, `[T; N]`, `&mut Vec<T>`.
pub fn element_written(written: &str) -> Option<String> {
    let element = match strip_references(syn::parse_str::<Type>(written).ok()?) {
        Type::Slice(slice) => *slice.elem,
        Type::Array(array) => *array.elem,
        Type::Path(type_path) => {
            let last = type_path.path.segments.into_iter().last()?;
            let PathArguments::AngleBracketed(args) = last.arguments else {
                return None;
            };
            args.args.into_iter().find_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })?
        }
        _ => return None,
    };
    Some(type_display_name(&element))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::vec("Vec<model::Pet>", Some("model::Pet"))]
    #[case::mut_vec("&mut Vec<model::Pet>", Some("model::Pet"))]
    #[case::slice("&[domain::Pet]", Some("domain::Pet"))]
    #[case::array("[Pet; 4]", Some("Pet"))]
    #[case::not_a_slice("model::Pet", None)]
    fn should_find_element_type(#[case] written: &str, #[case] expected: Option<&str>) {
        assert_eq!(element_written(written).as_deref(), expected);
    }

    #[rstest]
    #[case::path("model::Pet", "model::Pet::default()")]
    #[case::generic("Vec<model::Pet>", "<Vec<model::Pet>>::default()")]
    fn should_build_default_expression(#[case] ty: &str, #[case] expected: &str) {
        assert_eq!(default_expr(ty), expected);
    }
}
