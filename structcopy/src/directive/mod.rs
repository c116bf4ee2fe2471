//! Directive Parser: annotation lines to [MethodSpec].
//!
//! A directive line reads `:name arg...`, optionally behind a `//` marker:
//!
//! ```text
//! /// :match_field Email EMail
//! /// :skip /^Internal/
//! /// :case:off
//! ```
//!
//! Directives are a closed [Directive] enum. Each name has one [DirectiveDef] entry in
//! [DIRECTIVES] giving its arity and the constructor from its arguments.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    diagnostic::{Diagnostics, Position},
    error::{Error, Result},
};

pub mod method_spec;
pub mod pattern;

pub use method_spec::{ConverterOverride, DestinationStyle, FunctionRef, MatchRule, MethodSpec};
pub use pattern::SkipPattern;

/// Raw annotation line with its source position.
#[derive(Clone, PartialEq, Eq, Debug, new)]
pub struct AnnotationLine {
    pub text: String,
    pub position: Position,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Directive {
    StructCopyGen,
    Match(MatchRule),
    Style(DestinationStyle),
    Recv(String),
    Reverse,
    Case(bool),
    Getter(bool),
    Stringer(bool),
    Typecast(bool),
    Skip(SkipPattern),
    Map {
        src: String,
        dst: String,
    },
    MatchField {
        dst: String,
        src: String,
    },
    MatchMethod {
        dst: String,
        method: String,
    },
    Conv {
        dst: String,
        converter: String,
        src: Option<String>,
    },
    StructConv(String),
    Literal {
        dst: String,
        literal: String,
    },
    PreProcess(String),
    PostProcess(String),
}

/// Arguments of a directive line.
pub struct DirectiveArgs<'a> {
    /// Whitespace separated arguments.
    pub args: Vec<&'a str>,
    /// Text following the first argument, verbatim.
    pub rest: &'a str,
}

pub struct DirectiveDef {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    /// Usage shown in arity errors.
    pub usage: &'static str,
    pub build: fn(&DirectiveArgs) -> std::result::Result<Directive, String>,
}

pub const DIRECTIVES: &[DirectiveDef] = &[
    DirectiveDef {
        name: "structcopygen",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::StructCopyGen),
    },
    DirectiveDef {
        name: "match",
        min_args: 1,
        max_args: 1,
        usage: "<algorithm>",
        build: |a| {
            MatchRule::from_value(a.args[0])
                .map(Directive::Match)
                .ok_or_else(|| format!("invalid <algorithm> arg {:?}", a.args[0]))
        },
    },
    DirectiveDef {
        name: "style",
        min_args: 1,
        max_args: 1,
        usage: "<return|arg>",
        build: |a| {
            DestinationStyle::from_value(a.args[0])
                .map(Directive::Style)
                .ok_or_else(|| format!("invalid <style> arg {:?}", a.args[0]))
        },
    },
    DirectiveDef {
        name: "recv",
        min_args: 1,
        max_args: 1,
        usage: "<var>",
        build: |a| Ok(Directive::Recv(a.args[0].to_owned())),
    },
    DirectiveDef {
        name: "reverse",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Reverse),
    },
    DirectiveDef {
        name: "case",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Case(true)),
    },
    DirectiveDef {
        name: "case:off",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Case(false)),
    },
    DirectiveDef {
        name: "getter",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Getter(true)),
    },
    DirectiveDef {
        name: "getter:off",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Getter(false)),
    },
    DirectiveDef {
        name: "stringer",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Stringer(true)),
    },
    DirectiveDef {
        name: "stringer:off",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Stringer(false)),
    },
    DirectiveDef {
        name: "typecast",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Typecast(true)),
    },
    DirectiveDef {
        name: "typecast:off",
        min_args: 0,
        max_args: 0,
        usage: "",
        build: |_| Ok(Directive::Typecast(false)),
    },
    DirectiveDef {
        name: "skip",
        min_args: 1,
        max_args: 1,
        usage: "<field>",
        build: |a| {
            SkipPattern::parse(a.args[0])
                .map(Directive::Skip)
                .map_err(|err| format!("invalid regexp: {}", err))
        },
    },
    DirectiveDef {
        name: "map",
        min_args: 2,
        max_args: 2,
        usage: "<src> <dst>",
        build: |a| {
            Ok(Directive::Map {
                src: a.args[0].to_owned(),
                dst: a.args[1].to_owned(),
            })
        },
    },
    DirectiveDef {
        name: "match_field",
        min_args: 2,
        max_args: 2,
        usage: "<dst> <src>",
        build: |a| {
            Ok(Directive::MatchField {
                dst: a.args[0].to_owned(),
                src: a.args[1].to_owned(),
            })
        },
    },
    DirectiveDef {
        name: "match_method",
        min_args: 2,
        max_args: 2,
        usage: "<dst> <method>",
        build: |a| {
            Ok(Directive::MatchMethod {
                dst: a.args[0].to_owned(),
                method: a.args[1].trim_end_matches("()").to_owned(),
            })
        },
    },
    DirectiveDef {
        name: "conv",
        min_args: 2,
        max_args: 3,
        usage: "<dst> <convert_func> [<src>]",
        build: |a| {
            Ok(Directive::Conv {
                dst: a.args[0].to_owned(),
                converter: a.args[1].to_owned(),
                src: a.args.get(2).map(|src| (*src).to_owned()),
            })
        },
    },
    DirectiveDef {
        name: "struct_conv",
        min_args: 1,
        max_args: 1,
        usage: "<convert_func>",
        build: |a| Ok(Directive::StructConv(a.args[0].to_owned())),
    },
    DirectiveDef {
        name: "literal",
        min_args: 2,
        max_args: usize::MAX,
        usage: "<dst> <literal>",
        build: |a| {
            Ok(Directive::Literal {
                dst: a.args[0].to_owned(),
                literal: a.rest.to_owned(),
            })
        },
    },
    DirectiveDef {
        name: "preprocess",
        min_args: 1,
        max_args: 1,
        usage: "<func>",
        build: |a| Ok(Directive::PreProcess(a.args[0].to_owned())),
    },
    DirectiveDef {
        name: "postprocess",
        min_args: 1,
        max_args: 1,
        usage: "<func>",
        build: |a| Ok(Directive::PostProcess(a.args[0].to_owned())),
    },
];

/// Directives accepted on an interface.
pub const INTERFACE_DIRECTIVES: &[&str] = &["structcopygen"];

/// Directives accepted on a method: every directive but the interface marker.
pub fn method_directives() -> Vec<&'static str> {
    DIRECTIVES
        .iter()
        .map(|def| def.name)
        .filter(|name| !INTERFACE_DIRECTIVES.contains(name))
        .collect()
}

pub fn lookup(name: &str) -> Option<&'static DirectiveDef> {
    DIRECTIVES.iter().find(|def| def.name == name)
}

lazy_static! {
    static ref NOTATION: Regex = Regex::new(r"^\s*(?://+)?\s*:(\S+)\s*(.*)$").unwrap();
    static ref AFTER_FIRST_ARG: Regex = Regex::new(r"^\S+\s+(.*)$").unwrap();
}

/// Parses one line.
///
/// Returns `Ok(None)` for a well-formed directive whose name is not in `valid`, after recording a
/// warning.
pub fn parse_line(
    line: &AnnotationLine,
    valid: &[&str],
    diagnostics: &mut Diagnostics,
) -> Result<Option<Directive>> {
    let captures = NOTATION.captures(&line.text).ok_or_else(|| Error::Syntax {
        position: line.position.clone(),
        line: line.text.clone(),
    })?;
    let name = captures.get(1).map_or("", |m| m.as_str());
    let tail = captures.get(2).map_or("", |m| m.as_str()).trim_end();

    let def = match lookup(name) {
        Some(def) if valid.contains(&name) => def,
        _ => {
            diagnostics.warn_at(
                line.position.clone(),
                format!("\":{}\" is invalid or unknown notation here", name),
            );
            return Ok(None);
        }
    };

    let args = DirectiveArgs {
        args: tail.split_whitespace().collect(),
        rest: AFTER_FIRST_ARG
            .captures(tail)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str()),
    };
    if args.args.len() < def.min_args || args.args.len() > def.max_args {
        let message = if def.max_args == 0 {
            format!(":{} takes no argument", name)
        } else {
            format!(":{} needs {} arg(s)", name, def.usage)
        };
        return Err(Error::configuration(&line.position, message));
    }
    let directive =
        (def.build)(&args).map_err(|message| Error::configuration(&line.position, message))?;
    log::trace!("{}: {:?}", line.position, directive);
    Ok(Some(directive))
}

/// Parses the annotation lines of one method or interface into a [MethodSpec].
///
/// Unknown or misplaced directives are warnings. Grammar violations, arity violations, invalid
/// values and `:reverse` without `:style arg` abort the whole set.
pub fn parse(
    lines: &[AnnotationLine],
    valid: &[&str],
    diagnostics: &mut Diagnostics,
) -> Result<MethodSpec> {
    let mut spec = MethodSpec::default();
    let mut reverse_position = None;

    for line in lines {
        let Some(directive) = parse_line(line, valid, diagnostics)? else {
            continue;
        };
        let position = &line.position;
        match directive {
            Directive::StructCopyGen => {}
            Directive::Match(rule) => spec.match_rule = rule,
            Directive::Style(style) => spec.style = style,
            Directive::Recv(var) => spec.receiver = Some(var),
            Directive::Reverse => {
                spec.reverse = true;
                reverse_position = Some(position.clone());
            }
            Directive::Case(on) => spec.case_sensitive = on,
            Directive::Getter(on) => spec.use_getter = on,
            Directive::Stringer(on) => spec.use_stringer = on,
            Directive::Typecast(on) => spec.allow_typecast = on,
            Directive::Skip(pattern) => spec.skip_patterns.push(pattern),
            Directive::Map { src, dst } | Directive::MatchField { dst, src } => {
                override_entry(&mut spec.field_overrides, dst, src, position, diagnostics)
            }
            Directive::MatchMethod { dst, method } => {
                override_entry(&mut spec.method_overrides, dst, method, position, diagnostics)
            }
            Directive::Conv {
                dst,
                converter,
                src,
            } => override_entry(
                &mut spec.converter_overrides,
                dst,
                ConverterOverride::new(converter, src),
                position,
                diagnostics,
            ),
            Directive::Literal { dst, literal } => {
                override_entry(&mut spec.literal_overrides, dst, literal, position, diagnostics)
            }
            Directive::StructConv(name) => {
                spec.delegate = Some(FunctionRef::new(name, position.clone()))
            }
            Directive::PreProcess(name) => {
                spec.pre_process = Some(FunctionRef::new(name, position.clone()))
            }
            Directive::PostProcess(name) => {
                spec.post_process = Some(FunctionRef::new(name, position.clone()))
            }
        }
    }

    if let Some(position) = reverse_position {
        if spec.style == DestinationStyle::ReturnValue {
            return Err(Error::configuration(
                &position,
                "to use \":reverse\", style must be \":style arg\"",
            ));
        }
    }
    Ok(spec)
}

fn override_entry<V>(
    map: &mut std::collections::BTreeMap<String, V>,
    dst: String,
    value: V,
    position: &Position,
    diagnostics: &mut Diagnostics,
) {
    if map.contains_key(&dst) {
        diagnostics.warn_at(
            position.clone(),
            format!("override for \"{}\" replaces an earlier one", dst),
        );
    }
    map.insert(dst, value);
}
