//! Per-file generation: directives, endpoints, plans and emitted code of every annotated method.
//!
//! Method-level failures (directive errors, unusable endpoints, missing delegates) become
//! error diagnostics and the method is left out of the output. The other methods still generate.

use std::collections::BTreeMap;

use codegen::Scope;
use serde::Serialize;

use self::{
    config::{GeneratorConfig, HEADER},
    emit::{MethodEmitter, PlannedMethod, SiblingCall},
    endpoint::Endpoints,
};
use crate::{
    catalog::loader::{MethodDecl, SourceLoader, SourceUnit},
    diagnostic::{Diagnostic, Diagnostics, Position},
    directive::{self, method_directives, MethodSpec, INTERFACE_DIRECTIVES},
    error::{Error, Result},
    plan::{AssignmentPlan, Planner},
};

pub mod config;
pub mod emit;
pub mod endpoint;

/// What was decided for one method, for inspection and `--plan` reports.
#[derive(Clone, Debug, Serialize)]
pub struct MethodReport {
    pub interface: String,
    pub method: String,
    pub position: Position,
    pub spec: Option<MethodSpec>,
    pub plan: Option<AssignmentPlan>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedFile {
    pub file: String,
    #[serde(skip)]
    pub code: String,
    pub methods: Vec<MethodReport>,
    /// Ordered by position.
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratedFile {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == crate::diagnostic::Severity::Error)
    }

    pub fn method(&self, name: &str) -> Option<&MethodReport> {
        self.methods.iter().find(|report| report.method == name)
    }

    /// Methods, specs, plans and diagnostics as pretty JSON.
    pub fn plan_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Loads the sources configured in `loader` and generates them.
pub fn generate_from(loader: SourceLoader, config: &GeneratorConfig) -> Result<GeneratedFile> {
    let unit = loader
        .interface_name(config.interface_name.clone())
        .load()?;
    Ok(generate(&unit, config))
}

struct Pending<'a> {
    decl: &'a MethodDecl,
    report: usize,
    spec: MethodSpec,
    endpoints: Endpoints<'a>,
    diagnostics: Diagnostics,
    delegates_elements: bool,
}

pub fn generate(unit: &SourceUnit, config: &GeneratorConfig) -> GeneratedFile {
    let catalog = &unit.catalog;
    let method_set = method_directives();
    let mut file_diagnostics = Diagnostics::new(Position::new(unit.file.clone(), 1, 1));
    let mut reports = Vec::new();
    let mut pending = Vec::new();

    for interface in &unit.interfaces {
        let mut diagnostics = Diagnostics::new(interface.position.clone());
        let parsed = directive::parse(&interface.lines, INTERFACE_DIRECTIVES, &mut diagnostics);
        if let Err(error) = parsed {
            record_error(&mut diagnostics, &interface.name, error);
            file_diagnostics.absorb(diagnostics);
            continue;
        }
        file_diagnostics.absorb(diagnostics);

        for decl in &interface.methods {
            let mut diagnostics = Diagnostics::new(decl.position.clone());
            let report = reports.len();
            reports.push(MethodReport {
                interface: interface.name.clone(),
                method: decl.name.clone(),
                position: decl.position.clone(),
                spec: None,
                plan: None,
            });
            let prepared = directive::parse(&decl.lines, &method_set, &mut diagnostics)
                .and_then(|spec| endpoint::select(decl, &spec).map(|endpoints| (spec, endpoints)));
            match prepared {
                Ok((spec, endpoints)) => {
                    let delegates_elements = catalog.slice_element_struct(endpoints.src.ty).is_some()
                        && catalog.slice_element_struct(endpoints.dst.ty).is_some();
                    pending.push(Pending {
                        decl,
                        report,
                        spec,
                        endpoints,
                        diagnostics,
                        delegates_elements,
                    });
                }
                Err(error) => {
                    record_error(&mut diagnostics, &decl.name, error);
                    file_diagnostics.absorb(diagnostics);
                }
            }
        }
    }

    let siblings = pending
        .iter()
        .map(|method| {
            (
                method.decl.name.clone(),
                SiblingCall::of(&method.spec, &method.endpoints),
            )
        })
        .collect::<BTreeMap<_, _>>();

    // Element-wise methods last, so that their delegates are already planned.
    let mut order = (0..pending.len()).collect::<Vec<_>>();
    order.sort_by_key(|&index| pending[index].delegates_elements);

    let mut planner = Planner::new(catalog);
    let mut planned = (0..pending.len()).map(|_| None).collect::<Vec<_>>();
    for index in order {
        let method = &mut pending[index];
        let result = planner.plan(
            &method.decl.name,
            &method.spec,
            method.endpoints.src.ty,
            method.endpoints.dst.ty,
            &mut method.diagnostics,
        );
        let report = &mut reports[method.report];
        match result {
            Ok(plan) => {
                method.spec.produces_error = plan.produces_error();
                planner.add_sibling(
                    method.decl.name.clone(),
                    method.spec.produces_error || method.decl.returns_result,
                );
                report.spec = Some(method.spec.clone());
                report.plan = Some(plan.clone());
                planned[index] = Some(plan);
            }
            Err(error) => {
                report.spec = Some(method.spec.clone());
                record_error(&mut method.diagnostics, &method.decl.name, error);
            }
        }
    }

    let mut scope = Scope::new();
    if config.header {
        scope.raw(HEADER);
    }
    if !unit.uses.is_empty() {
        scope.raw(&unit.uses.join("\n"));
    }
    let emitter = MethodEmitter::new(catalog, &siblings);
    let mut generated = 0;
    for (method, plan) in pending.into_iter().zip(planned) {
        file_diagnostics.absorb(method.diagnostics);
        let Some(plan) = plan else {
            continue;
        };
        emitter.emit(
            &PlannedMethod {
                decl: method.decl,
                spec: method.spec,
                endpoints: method.endpoints,
                plan,
            },
            &mut scope,
        );
        generated += 1;
    }

    log::info!(
        "{}: {} method(s) generated, {} diagnostic(s)",
        unit.file,
        generated,
        file_diagnostics.len()
    );

    GeneratedFile {
        file: unit.file.clone(),
        code: scope.to_string(),
        methods: reports,
        diagnostics: file_diagnostics.sorted(),
    }
}

fn record_error(diagnostics: &mut Diagnostics, name: &str, error: Error) {
    let position = error
        .position()
        .cloned()
        .unwrap_or_else(|| diagnostics.anchor().clone());
    let message = match error {
        Error::Syntax { line, .. } => format!("invalid notation format {:?}", line),
        Error::Configuration { message, .. } => message,
        other => other.to_string(),
    };
    log::warn!("{}: {} omitted: {}", position, name, message);
    diagnostics.error_at(position, format!("{}: {}", name, message));
}
