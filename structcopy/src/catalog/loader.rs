//! Builds a [TypeCatalog] and the annotated interface declarations from Rust source text.
//!
//! The input file holds the converter trait (by default `StructCopyGen`) whose methods carry
//! directive doc lines:
//!
//! ```rust,ignore
//! trait StructCopyGen {
//!     /// :match_field email e_mail
//!     /// :typecast
//!     fn user_to_dto(src: &entity::User) -> dto::UserDto;
//! }
//! ```
//!
//! Structs, inherent methods, `Display` implementations and free functions are collected from the
//! input file and every included file, inline `mod` blocks included.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use proc_macro2::Span;
use syn::{
    spanned::Spanned, Attribute, Expr, ExprLit, Fields, FnArg, GenericArgument, ImplItem, Item,
    ItemImpl, ItemTrait, Lit, LitStr, Meta, Pat, PathArguments, ReturnType, Signature, TraitItem,
    Type, TypePath,
};
use walkdir::WalkDir;

use super::{
    type_name::{compact_tokens, path_display_name, type_display_name},
    FunctionDescriptor, MethodDescriptor, TypeCatalog, TypeCatalogBuilder, TypeId, TypeShape,
};
use crate::{
    diagnostic::Position,
    directive::AnnotationLine,
    error::{Error, Result},
};

/// Name of the trait processed without an interface-level `:structcopygen` line.
pub const DEFAULT_INTERFACE_NAME: &str = "StructCopyGen";

/// Parameter (or result) of a trait method.
#[derive(Clone, PartialEq, Eq, Debug, new)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeId,
    /// Type as written in the declaration, prelude paths shortened.
    pub written: String,
}

/// Trait method declaration with its directive lines.
#[derive(Clone, Debug)]
pub struct MethodDecl {
    pub name: String,
    pub position: Position,
    /// Doc lines which are not directives.
    pub docs: Vec<String>,
    pub lines: Vec<AnnotationLine>,
    pub params: Vec<ParamDecl>,
    /// Declared result, the `T` of `Result<T, E>` for fallible declarations.
    pub result: Option<ParamDecl>,
    pub returns_result: bool,
    /// Written `E` of a declared `Result<T, E>`.
    pub error_type: Option<String>,
}

/// Trait whose methods are converters to generate.
#[derive(Clone, Debug)]
pub struct InterfaceDecl {
    pub name: String,
    pub position: Position,
    pub lines: Vec<AnnotationLine>,
    pub methods: Vec<MethodDecl>,
}

/// Output of [SourceLoader::load].
#[derive(Debug)]
pub struct SourceUnit {
    pub file: String,
    pub catalog: TypeCatalog,
    pub interfaces: Vec<InterfaceDecl>,
    /// `use` items of the input file, rendered.
    pub uses: Vec<String>,
}

struct SourceFile {
    name: String,
    package: String,
    content: String,
}

/// Collects the source files making up one generation unit.
#[derive(Default)]
pub struct SourceLoader {
    interface_name: Option<String>,
    input: Option<SourceFile>,
    includes: Vec<SourceFile>,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides [DEFAULT_INTERFACE_NAME].
    pub fn interface_name<N: Into<String>>(mut self, name: N) -> Self {
        self.interface_name = Some(name.into());
        self
    }

    pub fn input_str<F, C>(mut self, file: F, content: C) -> Self
    where
        F: Into<String>,
        C: Into<String>,
    {
        self.input = Some(SourceFile {
            name: file.into(),
            package: String::new(),
            content: content.into(),
        });
        self
    }

    pub fn input_path<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Ok(self.input_str(path.display().to_string(), content))
    }

    /// Adds a file whose items live in module `package`.
    pub fn include_str<F, P, C>(mut self, file: F, package: P, content: C) -> Self
    where
        F: Into<String>,
        P: Into<String>,
        C: Into<String>,
    {
        self.includes.push(SourceFile {
            name: file.into(),
            package: package.into(),
            content: content.into(),
        });
        self
    }

    /// Adds a file, or every `.rs` file under a directory.
    ///
    /// Module paths are derived from the file location relative to the included directory
    /// (`model/user.rs` is `model::user`, `model/mod.rs` is `model`). A single file is the module
    /// named by its stem.
    pub fn include_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let root = path.as_ref();
        if root.is_file() {
            let package = module_name(root.file_stem().and_then(|s| s.to_str()).unwrap_or(""));
            let content = fs::read_to_string(root)?;
            return Ok(self.include_str(root.display().to_string(), package, content));
        }
        let mut files = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().map_or(false, |ext| ext == "rs"))
            .map(|entry| entry.into_path())
            .collect::<Vec<PathBuf>>();
        files.sort();
        for file in files {
            let package = module_path(&file, root);
            let content = fs::read_to_string(&file)?;
            self = self.include_str(file.display().to_string(), package, content);
        }
        Ok(self)
    }

    pub fn load(self) -> Result<SourceUnit> {
        let input = self.input.ok_or_else(|| Error::Parse {
            file: String::new(),
            message: "no input file".to_owned(),
        })?;
        let interface_name = self
            .interface_name
            .unwrap_or_else(|| DEFAULT_INTERFACE_NAME.to_owned());

        let mut parsed = Vec::with_capacity(1 + self.includes.len());
        for file in std::iter::once(&input).chain(self.includes.iter()) {
            let syntax = syn::parse_file(&file.content).map_err(|err| Error::Parse {
                file: file.name.clone(),
                message: {
                    let start = err.span().start();
                    format!("{}:{}: {}", start.line, start.column + 1, err)
                },
            })?;
            parsed.push((file, syntax));
        }

        let mut collector = Collector::default();
        for (file, syntax) in &parsed {
            collector.declare_items(&syntax.items, &file.package);
        }
        for (file, syntax) in &parsed {
            collector.define_items(&syntax.items, &file.package);
        }

        let (_, input_syntax) = &parsed[0];
        let mut interfaces = Vec::new();
        let mut uses = Vec::new();
        for item in &input_syntax.items {
            match item {
                Item::Trait(item_trait) => {
                    if let Some(interface) =
                        collector.interface(item_trait, &input.name, &interface_name)
                    {
                        interfaces.push(interface);
                    }
                }
                Item::Use(item_use) => uses.push(
                    prettyplease::unparse(&syn::File {
                        shebang: None,
                        attrs: Vec::new(),
                        items: vec![Item::Use(item_use.clone())],
                    })
                    .trim()
                    .to_owned(),
                ),
                _ => {}
            }
        }

        log::debug!(
            "loaded {} with {} include(s): {} interface(s)",
            input.name,
            parsed.len() - 1,
            interfaces.len()
        );

        Ok(SourceUnit {
            file: input.name.clone(),
            catalog: collector.builder.build(),
            interfaces,
            uses,
        })
    }
}

fn module_name(stem: &str) -> String {
    match stem {
        "lib" | "main" | "mod" => String::new(),
        stem => stem.to_owned(),
    }
}

fn module_path(file: &Path, root: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut segments = relative
        .parent()
        .into_iter()
        .flat_map(|parent| parent.components())
        .filter_map(|component| component.as_os_str().to_str().map(str::to_owned))
        .collect::<Vec<_>>();
    let stem = module_name(relative.file_stem().and_then(|s| s.to_str()).unwrap_or(""));
    if !stem.is_empty() {
        segments.push(stem);
    }
    segments.join("::")
}

fn join_package(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_owned()
    } else {
        format!("{}::{}", package, name)
    }
}

fn position(file: &str, span: Span) -> Position {
    let start = span.start();
    Position::new(file.to_owned(), start.line, start.column + 1)
}

#[derive(Default)]
struct Collector {
    builder: TypeCatalogBuilder,
    /// Enum paths (every suffix of the qualified path) to their qualified path.
    enum_paths: BTreeMap<String, String>,
}

impl Collector {
    fn declare_items(&mut self, items: &[Item], package: &str) {
        for item in items {
            match item {
                Item::Struct(item_struct) => {
                    self.builder
                        .declare_struct(item_struct.ident.to_string(), package);
                }
                Item::Enum(item_enum) => {
                    let qualified = join_package(package, &item_enum.ident.to_string());
                    let segments = qualified.split("::").collect::<Vec<_>>();
                    for start in 0..segments.len() {
                        self.enum_paths
                            .entry(segments[start..].join("::"))
                            .or_insert_with(|| qualified.clone());
                    }
                }
                Item::Mod(item_mod) => {
                    if let Some((_, items)) = &item_mod.content {
                        self.declare_items(items, &join_package(package, &item_mod.ident.to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    fn define_items(&mut self, items: &[Item], package: &str) {
        for item in items {
            match item {
                Item::Struct(item_struct) => {
                    let Some(id) = self.resolve_struct(&item_struct.ident.to_string(), package)
                    else {
                        continue;
                    };
                    if let Fields::Named(fields) = &item_struct.fields {
                        for field in &fields.named {
                            let Some(ident) = &field.ident else {
                                continue;
                            };
                            let ty = self.lower(&field.ty, package);
                            let tag = serde_rename(&field.attrs);
                            self.builder
                                .add_field(id, ident.to_string().trim_start_matches("r#"), ty, tag);
                        }
                    }
                }
                Item::Impl(item_impl) => self.define_impl(item_impl, package),
                Item::Fn(item_fn) => {
                    let (params, result, returns_result) = self.signature(&item_fn.sig, package);
                    self.builder.add_function(
                        package,
                        FunctionDescriptor::new(
                            item_fn.sig.ident.to_string(),
                            params,
                            result,
                            returns_result,
                        ),
                    );
                }
                Item::Mod(item_mod) => {
                    if let Some((_, items)) = &item_mod.content {
                        self.define_items(items, &join_package(package, &item_mod.ident.to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    fn define_impl(&mut self, item_impl: &ItemImpl, package: &str) {
        if let Some((_, trait_path, _)) = &item_impl.trait_ {
            let is_display = trait_path
                .segments
                .last()
                .map_or(false, |segment| segment.ident == "Display");
            if is_display {
                let ty = self.lower(&item_impl.self_ty, package);
                self.builder.mark_stringer(ty);
            }
            return;
        }
        let Type::Path(TypePath { path, .. }) = &*item_impl.self_ty else {
            return;
        };
        let Some(id) = self.resolve_struct(&path_display_name(path), package) else {
            return;
        };
        for impl_item in &item_impl.items {
            let ImplItem::Fn(impl_fn) = impl_item else {
                continue;
            };
            if impl_fn.sig.receiver().is_none() {
                continue;
            }
            let (params, result, returns_result) = self.signature(&impl_fn.sig, package);
            self.builder.add_method(
                id,
                MethodDescriptor::new(
                    impl_fn.sig.ident.to_string(),
                    params.len(),
                    result,
                    returns_result,
                ),
            );
        }
    }

    /// Lowers typed parameters (receiver excluded) and the result of a signature.
    fn signature(
        &mut self,
        sig: &Signature,
        package: &str,
    ) -> (Vec<TypeId>, Option<TypeId>, bool) {
        let params = sig
            .inputs
            .iter()
            .filter_map(|input| match input {
                FnArg::Typed(pat_type) => Some(self.lower(&pat_type.ty, package)),
                FnArg::Receiver(_) => None,
            })
            .collect();
        let (result, returns_result) = match &sig.output {
            ReturnType::Default => (None, false),
            ReturnType::Type(_, ty) => match split_result(ty) {
                Some((ok, _)) => (Some(self.lower(ok, package)), true),
                None => (Some(self.lower(ty, package)), false),
            },
        };
        (params, result, returns_result)
    }

    fn interface(
        &mut self,
        item_trait: &ItemTrait,
        file: &str,
        interface_name: &str,
    ) -> Option<InterfaceDecl> {
        let (_, lines) = doc_lines(&item_trait.attrs, file);
        let marked = lines.iter().any(|line| {
            line.text
                .trim_start()
                .trim_start_matches('/')
                .trim_start()
                .strip_prefix(":structcopygen")
                .map_or(false, |rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        });
        if item_trait.ident != interface_name && !marked {
            return None;
        }

        let methods = item_trait
            .items
            .iter()
            .filter_map(|trait_item| match trait_item {
                TraitItem::Fn(trait_fn) => Some(trait_fn),
                _ => None,
            })
            .map(|trait_fn| {
                let (docs, lines) = doc_lines(&trait_fn.attrs, file);
                let sig = &trait_fn.sig;
                let params = sig
                    .inputs
                    .iter()
                    .filter_map(|input| match input {
                        FnArg::Typed(pat_type) => Some(pat_type),
                        FnArg::Receiver(_) => None,
                    })
                    .enumerate()
                    .map(|(index, pat_type)| {
                        let name = match &*pat_type.pat {
                            Pat::Ident(pat_ident) => pat_ident.ident.to_string(),
                            _ => format!("arg{}", index),
                        };
                        ParamDecl::new(
                            name,
                            self.lower(&pat_type.ty, ""),
                            type_display_name(&pat_type.ty),
                        )
                    })
                    .collect();
                let (result, returns_result, error_type) = match &sig.output {
                    ReturnType::Default => (None, false, None),
                    ReturnType::Type(_, ty) => match split_result(ty) {
                        Some((ok, err)) => (
                            Some(ParamDecl::new(
                                "dst".to_owned(),
                                self.lower(ok, ""),
                                type_display_name(ok),
                            )),
                            true,
                            err.map(type_display_name),
                        ),
                        None => (
                            Some(ParamDecl::new(
                                "dst".to_owned(),
                                self.lower(ty, ""),
                                type_display_name(ty),
                            )),
                            false,
                            None,
                        ),
                    },
                };
                MethodDecl {
                    name: sig.ident.to_string(),
                    position: position(file, sig.ident.span()),
                    docs,
                    lines,
                    params,
                    result,
                    returns_result,
                    error_type,
                }
            })
            .collect();

        Some(InterfaceDecl {
            name: item_trait.ident.to_string(),
            position: position(file, item_trait.ident.span()),
            lines,
            methods,
        })
    }

    fn resolve_struct(&self, path: &str, package: &str) -> Option<super::StructId> {
        if !package.is_empty() && !path.contains("::") {
            if let Some(id) = self.builder.struct_by_path(&join_package(package, path)) {
                return Some(id);
            }
        }
        self.builder.struct_by_path(path)
    }

    fn resolve_enum(&self, path: &str, package: &str) -> Option<String> {
        let path = path.trim_start_matches("crate::").trim_start_matches("self::");
        if !package.is_empty() && !path.contains("::") {
            if let Some(qualified) = self.enum_paths.get(&join_package(package, path)) {
                return Some(qualified.clone());
            }
        }
        self.enum_paths.get(path).cloned()
    }

    /// Interns the descriptor of a written type.
    fn lower(&mut self, ty: &Type, package: &str) -> TypeId {
        match ty {
            Type::Paren(paren) => self.lower(&paren.elem, package),
            Type::Group(group) => self.lower(&group.elem, package),
            Type::Reference(reference) => {
                let mut prefix = "&".to_owned();
                if let Some(lifetime) = &reference.lifetime {
                    prefix.push_str(&format!("{} ", lifetime));
                }
                if reference.mutability.is_some() {
                    prefix.push_str("mut ");
                }
                match &*reference.elem {
                    Type::Slice(slice) => {
                        let element = self.lower(&slice.elem, package);
                        let name = format!("{}[{}]", prefix, self.builder.type_name(element));
                        self.builder.intern(name, TypeShape::Slice { element })
                    }
                    Type::Path(type_path) if type_path.path.is_ident("str") => {
                        self.builder.basic(type_display_name(ty))
                    }
                    elem => {
                        let element = self.lower(elem, package);
                        let name = format!("{}{}", prefix, self.builder.type_name(element));
                        self.builder.intern(name, TypeShape::Pointer { element })
                    }
                }
            }
            Type::Slice(slice) => {
                let element = self.lower(&slice.elem, package);
                let name = format!("[{}]", self.builder.type_name(element));
                self.builder.intern(name, TypeShape::Slice { element })
            }
            Type::Array(array) => {
                let element = self.lower(&array.elem, package);
                let len = &array.len;
                let name = format!(
                    "[{}; {}]",
                    self.builder.type_name(element),
                    compact_tokens(&quote!(#len).to_string())
                );
                self.builder.intern(name, TypeShape::Slice { element })
            }
            Type::Path(type_path) if type_path.qself.is_none() => {
                self.lower_path(type_path, package)
            }
            Type::TraitObject(_) | Type::ImplTrait(_) => self
                .builder
                .intern(type_display_name(ty), TypeShape::Interface),
            Type::Tuple(tuple) if tuple.elems.is_empty() => self.builder.basic("()"),
            _ => self
                .builder
                .intern(type_display_name(ty), TypeShape::Unknown),
        }
    }

    fn lower_path(&mut self, type_path: &TypePath, package: &str) -> TypeId {
        let written = path_display_name(&type_path.path);
        let Some(last) = type_path.path.segments.last() else {
            return self.builder.intern(written, TypeShape::Unknown);
        };
        let ident = last.ident.to_string();
        let args = match &last.arguments {
            PathArguments::AngleBracketed(args) => args.args.iter().collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        let type_args = args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect::<Vec<_>>();

        match (ident.as_str(), type_args.as_slice()) {
            ("Box" | "Rc" | "Arc" | "Option", [element]) => {
                let element = self.lower(element, package);
                let name = format!("{}<{}>", written, self.builder.type_name(element));
                self.builder.intern(name, TypeShape::Pointer { element })
            }
            ("Vec" | "VecDeque", [element]) => {
                let element = self.lower(element, package);
                let name = format!("{}<{}>", written, self.builder.type_name(element));
                self.builder.intern(name, TypeShape::Slice { element })
            }
            ("HashMap" | "BTreeMap" | "IndexMap", [key, value, ..]) => {
                let key = self.lower(key, package);
                let value = self.lower(value, package);
                let name = format!(
                    "{}<{}, {}>",
                    written,
                    self.builder.type_name(key),
                    self.builder.type_name(value)
                );
                self.builder.intern(name, TypeShape::Map { key, value })
            }
            _ => {
                if let Some(id) = self.resolve_struct(&written, package) {
                    return self.builder.struct_type(id);
                }
                let base = self.resolve_enum(&written, package).unwrap_or(written);
                if args.is_empty() {
                    return self.builder.basic(base);
                }
                let rendered = args
                    .iter()
                    .map(|arg| match arg {
                        GenericArgument::Type(ty) => {
                            let id = self.lower(ty, package);
                            self.builder.type_name(id).to_owned()
                        }
                        other => compact_tokens(&quote!(#other).to_string()),
                    })
                    .join(", ");
                self.builder.basic(format!("{}<{}>", base, rendered))
            }
        }
    }
}

/// Splits `Result<T, E>` (or a single-argument `Result<T>` alias) into its parts.
fn split_result(ty: &Type) -> Option<(&Type, Option<&Type>)> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    let last = path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    let ok = types.next()?;
    Some((ok, types.next()))
}

/// Splits doc attributes into plain documentation and directive lines.
fn doc_lines(attrs: &[Attribute], file: &str) -> (Vec<String>, Vec<AnnotationLine>) {
    let mut docs = Vec::new();
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let Meta::NameValue(name_value) = &attr.meta else {
            continue;
        };
        let Expr::Lit(ExprLit {
            lit: Lit::Str(text),
            ..
        }) = &name_value.value
        else {
            continue;
        };
        let start = position(file, attr.span());
        for (offset, text) in text.value().lines().enumerate() {
            if text.trim_start().starts_with(':') {
                let line_position = Position::new(
                    start.file().to_owned(),
                    start.line() + offset,
                    start.column(),
                );
                lines.push(AnnotationLine::new(text.to_owned(), line_position));
            } else {
                docs.push(text.to_owned());
            }
        }
    }
    (docs, lines)
}

/// Value of `#[serde(rename = "...")]`, if any.
fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    let mut rename = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|inner| {
                    if inner.input.peek(syn::Token![=]) {
                        inner.value()?.parse::<Expr>()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        });
    }
    rename
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::TypeKind;

    const SETUP: &str = r#"
use crate::model;

/// Converters.
trait StructCopyGen {
    /// Copies a pet.
    /// :getter
    /// :typecast
    fn domain_to_model(pet: &domain::Pet) -> model::Pet;

    /// :struct_conv domain_to_model
    fn pets(src: &[domain::Pet]) -> Result<Vec<model::Pet>, ConvertError>;
}

/// :structcopygen
trait Other {
    fn other(_: &domain::Pet) -> model::Pet;
}

trait Ignored {
    fn ignored(src: &domain::Pet) -> model::Pet;
}

mod domain {
    pub struct Pet {
        pub id: u64,
        pub name: String,
        pub status: Status,
        pub tags: Vec<String>,
    }

    impl Pet {
        pub fn nick(&self) -> String {
            self.name.clone()
        }

        pub fn check(&self, strict: bool) -> Result<(), String> {
            Ok(())
        }
    }

    pub enum Status {
        Available,
    }

    impl std::fmt::Display for Status {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "available")
        }
    }
}

fn tag_label(tag: &str, upper: bool) -> Result<String, ConvertError> {
    Ok(tag.to_owned())
}
"#;

    const MODEL: &str = r#"
pub struct Pet {
    pub id: i64,
    #[serde(default, rename = "petName")]
    pub name: String,
    pub status: String,
    pub owner: Option<Box<Owner>>,
}

pub struct Owner {
    pub name: String,
}
"#;

    fn load() -> SourceUnit {
        SourceLoader::new()
            .input_str("setup.rs", SETUP)
            .include_str("model.rs", "model", MODEL)
            .load()
            .unwrap()
    }

    #[test]
    fn should_collect_structs_across_files() {
        let unit = load();
        let catalog = &unit.catalog;

        let pet = catalog.struct_by_path("domain::Pet").unwrap();
        assert_eq!(
            pet.fields()
                .map(|f| (f.name(), catalog[f.ty()].name()))
                .collect::<Vec<_>>(),
            vec![
                ("id", "u64"),
                ("name", "String"),
                ("status", "domain::Status"),
                ("tags", "Vec<String>"),
            ]
        );
        assert!(pet.method("nick", true).unwrap().is_getter());
        assert!(!pet.method("check", true).unwrap().is_getter());
        let status = pet.field("status", true).unwrap().ty();
        assert!(catalog.is_stringer(status));

        let model_pet = catalog.struct_by_path("model::Pet").unwrap();
        assert_eq!(model_pet.field("name", true).unwrap().tag(), Some("petName"));
        let owner = model_pet.field("owner", true).unwrap();
        assert!(owner.is_pointer());
        assert_eq!(catalog[owner.ty()].name(), "Option<Box<model::Owner>>");
        assert_eq!(
            catalog.struct_of(owner.ty()).map(|s| s.qualified_name()),
            Some("model::Owner".to_owned())
        );
    }

    #[test]
    fn should_collect_annotated_interfaces() {
        let unit = load();
        assert_eq!(
            unit.interfaces.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            vec!["StructCopyGen", "Other"]
        );
        assert_eq!(unit.uses, vec!["use crate::model;".to_owned()]);

        let intf = &unit.interfaces[0];
        let method = &intf.methods[0];
        assert_eq!(method.name, "domain_to_model");
        assert_eq!(method.docs, vec![" Copies a pet.".to_owned()]);
        assert_eq!(
            method.lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>(),
            vec![" :getter", " :typecast"]
        );
        assert_eq!(method.lines[0].position.line() + 1, method.lines[1].position.line());
        assert_eq!(method.params[0].name, "pet");
        assert_eq!(method.params[0].written, "&domain::Pet");
        assert_matches!(unit.catalog[method.params[0].ty].kind(), TypeKind::Pointer);
        assert!(!method.returns_result);

        let slice = &intf.methods[1];
        assert!(slice.returns_result);
        assert_eq!(slice.error_type.as_deref(), Some("ConvertError"));
        let result = slice.result.as_ref().unwrap();
        assert_eq!(result.written, "Vec<model::Pet>");
        assert!(unit.catalog.slice_element_struct(result.ty).is_some());
        assert!(unit
            .catalog
            .slice_element_struct(slice.params[0].ty)
            .is_some());

        assert_eq!(unit.interfaces[1].methods[0].params[0].name, "arg0");
    }

    #[test]
    fn should_collect_free_functions() {
        let unit = load();
        let function = unit.catalog.function("tag_label").unwrap();
        assert_eq!(function.params().len(), 2);
        assert!(function.returns_result());
        assert_eq!(
            function.result().map(|id| unit.catalog[id].name()),
            Some("String")
        );
    }

    #[test]
    fn should_report_parse_errors_with_file() {
        let error = SourceLoader::new()
            .input_str("broken.rs", "struct {")
            .load()
            .unwrap_err();
        assert_matches!(error, Error::Parse { file, .. } if file == "broken.rs");
    }
}
