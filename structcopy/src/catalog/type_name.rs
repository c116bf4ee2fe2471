//! Display names of `syn` types.
//!
//! Names are compact (`Vec<u32>`, not `Vec < u32 >`) and paths to prelude types are shortened
//! (`std::string::String` becomes `String`), so that equal types written differently intern to
//! the same descriptor.

use std::collections::BTreeMap;

use maplit::btreemap;
use syn::{
    visit_mut::{visit_type_path_mut, VisitMut},
    Path, PathSegment, Type, TypePath,
};

/// Display name of a type as written, prelude paths shortened.
pub fn type_display_name(ty: &Type) -> String {
    let mut ty = ty.clone();
    PreludeRewriter.visit_type_mut(&mut ty);
    compact_tokens(&quote!(#ty).to_string())
}

/// Parses a type from text and returns its display name.
pub fn dynamic_type_display_name(type_name: &str) -> Option<String> {
    syn::parse_str::<Type>(type_name)
        .ok()
        .map(|ty| type_display_name(&ty))
}

/// Path segments joined with `::`, prelude paths shortened and generic arguments dropped.
pub fn path_display_name(path: &Path) -> String {
    let mut path = path.clone();
    shorten_prelude_path(&mut path);
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

/// Removes the spaces `quote` puts between tokens where Rust code would not have any.
pub fn compact_tokens(tokens: &str) -> String {
    let mut out = String::with_capacity(tokens.len());
    let chars = tokens.chars().collect::<Vec<_>>();
    for (index, &c) in chars.iter().enumerate() {
        if c != ' ' {
            out.push(c);
            continue;
        }
        let prev = out.chars().last();
        let next = chars.get(index + 1).copied();
        let glue_before = matches!(prev, Some('<' | '&' | '(' | '[' | ':' | '\''))
            || matches!(next, Some('<' | '>' | ',' | ';' | ')' | ']' | ':'));
        let keep_after_comma = matches!(prev, Some(',' | ';'));
        let keep_dyn = prev == Some('>') && next.map_or(false, |n| n.is_alphanumeric());
        if keep_after_comma || keep_dyn || !glue_before {
            out.push(' ');
        }
    }
    out
}

struct PreludeRewriter;

impl VisitMut for PreludeRewriter {
    fn visit_type_path_mut(&mut self, i: &mut TypePath) {
        shorten_prelude_path(&mut i.path);
        visit_type_path_mut(self, i);
    }
}

fn shorten_prelude_path(path: &mut Path) {
    let Path {
        leading_colon,
        segments,
    } = path;
    let prelude = PatternSegments(btreemap! {
        "boxed" => PatternSegments(btreemap!{
            "Box" => PatternSegments(btreemap!{}),
        }),
        "string" => PatternSegments(btreemap!{
            "String" => PatternSegments(btreemap!{}),
        }),
        "vec" => PatternSegments(btreemap!{
            "Vec" => PatternSegments(btreemap!{}),
        }),
        "option" => PatternSegments(btreemap!{
            "Option" => PatternSegments(btreemap!{}),
        }),
        "result" => PatternSegments(btreemap!{
            "Result" => PatternSegments(btreemap!{}),
        }),
    });
    let in_scope_types = PatternSegments(btreemap! {
        "alloc" => PatternSegments(prelude.0.clone()),
        "core" => PatternSegments(prelude.0.clone()),
        "std" => prelude,
    });
    if match_segments(segments.iter(), &in_scope_types) {
        if let Some(seg) = segments.pop() {
            let seg = seg.into_value();
            segments.clear();
            segments.push(seg);
            *leading_colon = None;
        }
    }
}

#[derive(Clone)]
struct PatternSegments<'a>(BTreeMap<&'a str, Self>);

fn match_segments<'a>(
    mut segments: impl Iterator<Item = &'a PathSegment>,
    values: &PatternSegments<'_>,
) -> bool {
    if let Some(PathSegment {
        ident,
        arguments: _,
    }) = segments.next()
    {
        for (value, next) in &values.0 {
            if ident == value {
                return match_segments(segments, next);
            }
        }
        false
    } else {
        values.0.is_empty()
    }
}
