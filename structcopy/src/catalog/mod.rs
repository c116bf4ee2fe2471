//! Type Catalog: read-only descriptors of the types the core inspects.
//!
//! Descriptors live in an arena and refer to each other through [TypeId] and [StructId], which
//! allows mutually referential structs without shared pointers. A catalog is built once per input
//! file (see [builder] and [loader]) and is never mutated while plans are computed.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Debug, Formatter},
    ops::Index,
};

use serde::Serialize;

pub mod builder;
pub mod loader;
pub mod type_name;

pub use builder::TypeCatalogBuilder;

/// Identifier of a type descriptor in a [TypeCatalog].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize)]
pub struct TypeId(usize);

impl Debug for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("#{}", self.0))
    }
}

/// Identifier of a struct descriptor in a [TypeCatalog].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize)]
pub struct StructId(usize);

impl Debug for StructId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("struct#{}", self.0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Serialize)]
pub enum TypeKind {
    Basic,
    Pointer,
    Slice,
    Map,
    Struct,
    Interface,
    Unknown,
}

/// Structure of a type, with links to the descriptors of its components.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypeShape {
    Basic,
    Pointer { element: TypeId },
    Slice { element: TypeId },
    Map { key: TypeId, value: TypeId },
    Struct { definition: StructId },
    Interface,
    Unknown,
}

impl TypeShape {
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Basic => TypeKind::Basic,
            Self::Pointer { .. } => TypeKind::Pointer,
            Self::Slice { .. } => TypeKind::Slice,
            Self::Map { .. } => TypeKind::Map,
            Self::Struct { .. } => TypeKind::Struct,
            Self::Interface => TypeKind::Interface,
            Self::Unknown => TypeKind::Unknown,
        }
    }
}

#[derive(PartialEq, Eq, Debug, new)]
pub struct TypeDescriptor {
    id: TypeId,
    name: String,
    shape: TypeShape,
}

impl TypeDescriptor {
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Canonical display name, also usable as Rust type text.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    pub fn kind(&self) -> TypeKind {
        self.shape.kind()
    }

    /// Pointee of a pointer, or element of a slice.
    pub fn element(&self) -> Option<TypeId> {
        match self.shape {
            TypeShape::Pointer { element } | TypeShape::Slice { element } => Some(element),
            _ => None,
        }
    }

    pub fn struct_id(&self) -> Option<StructId> {
        match self.shape {
            TypeShape::Struct { definition } => Some(definition),
            _ => None,
        }
    }

    /// Neither struct, slice, map, pointer nor trait object.
    pub fn is_basic(&self) -> bool {
        self.kind() == TypeKind::Basic
    }

    /// Whether a `to_string()` result can be assigned to a value of this type.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self.name.as_str(),
            "String" | "str" | "&str" | "&'static str" | "Cow<str>" | "Cow<'static, str>"
        )
    }

    /// Whether values of this type are copied rather than cloned by the emitted code.
    pub fn is_copy_scalar(&self) -> bool {
        is_numeric_primitive(&self.name) || matches!(self.name.as_str(), "bool" | "char")
    }

    pub fn is_numeric(&self) -> bool {
        is_numeric_primitive(&self.name)
    }
}

fn is_numeric_primitive(name: &str) -> bool {
    matches!(
        name,
        "i8" | "i16"
            | "i32"
            | "i64"
            | "i128"
            | "isize"
            | "u8"
            | "u16"
            | "u32"
            | "u64"
            | "u128"
            | "usize"
            | "f32"
            | "f64"
    )
}

#[derive(Clone, PartialEq, Eq, Debug, new)]
pub struct FieldDescriptor {
    name: String,
    ty: TypeId,
    tag: Option<String>,
    is_pointer: bool,
    is_slice: bool,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Serialization name (`#[serde(rename = "...")]`), used by the tag match rule.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_pointer(&self) -> bool {
        self.is_pointer
    }

    pub fn is_slice(&self) -> bool {
        self.is_slice
    }
}

/// Method of an inherent `impl` block.
#[derive(Clone, PartialEq, Eq, Debug, new)]
pub struct MethodDescriptor {
    name: String,
    /// Number of parameters, the receiver excluded.
    params: usize,
    result: Option<TypeId>,
    returns_result: bool,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> usize {
        self.params
    }

    /// Returned type, the `T` of `Result<T, E>` for fallible methods.
    pub fn result(&self) -> Option<TypeId> {
        self.result
    }

    pub fn returns_result(&self) -> bool {
        self.returns_result
    }

    /// Zero argument, single infallible return.
    pub fn is_getter(&self) -> bool {
        self.params == 0 && self.result.is_some() && !self.returns_result
    }
}

/// Free function usable as converter or hook.
#[derive(Clone, PartialEq, Eq, Debug, new)]
pub struct FunctionDescriptor {
    name: String,
    params: Vec<TypeId>,
    result: Option<TypeId>,
    returns_result: bool,
}

impl FunctionDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[TypeId] {
        &self.params
    }

    pub fn result(&self) -> Option<TypeId> {
        self.result
    }

    pub fn returns_result(&self) -> bool {
        self.returns_result
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StructDescriptor {
    id: StructId,
    name: String,
    package: String,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
}

impl StructDescriptor {
    pub fn id(&self) -> StructId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.package, self.name)
        }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// Finds a field by name, ignoring ASCII case when `case_sensitive` is false.
    ///
    /// An exact match is preferred to a case-insensitive one.
    pub fn field(&self, name: &str, case_sensitive: bool) -> Option<&FieldDescriptor> {
        find_by_name(&self.fields, name, case_sensitive, FieldDescriptor::name)
    }

    pub fn method(&self, name: &str, case_sensitive: bool) -> Option<&MethodDescriptor> {
        find_by_name(&self.methods, name, case_sensitive, MethodDescriptor::name)
    }
}

fn find_by_name<'a, T>(
    items: &'a [T],
    name: &str,
    case_sensitive: bool,
    item_name: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    items.iter().find(|item| item_name(item) == name).or_else(|| {
        if case_sensitive {
            None
        } else {
            items
                .iter()
                .find(|item| item_name(item).eq_ignore_ascii_case(name))
        }
    })
}

/// Arena of type, struct and function descriptors.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: Vec<TypeDescriptor>,
    type_names: BTreeMap<String, TypeId>,
    structs: Vec<StructDescriptor>,
    struct_paths: BTreeMap<String, StructId>,
    stringers: BTreeSet<TypeId>,
    functions: BTreeMap<String, FunctionDescriptor>,
}

impl TypeCatalog {
    pub fn get_type(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.0)
    }

    pub fn get_struct(&self, id: StructId) -> Option<&StructDescriptor> {
        self.structs.get(id.0)
    }

    /// Looks a type up by canonical display name.
    pub fn type_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.type_names.get(name).map(|&id| &self[id])
    }

    /// Looks a struct up by written path: the exact path, then its last two segments, then its
    /// simple name.
    pub fn struct_by_path(&self, path: &str) -> Option<&StructDescriptor> {
        lookup_path(&self.struct_paths, path).map(|id| &self[id])
    }

    /// Looks a free function up by written path, see [struct_by_path](Self::struct_by_path).
    pub fn function(&self, path: &str) -> Option<&FunctionDescriptor> {
        let segments = path.split("::").collect::<Vec<_>>();
        (0..segments.len())
            .filter_map(|skip| self.functions.get(&segments[skip..].join("::")))
            .next()
    }

    /// Whether the type implements `Display`, hence has a `to_string()` method.
    pub fn is_stringer(&self, id: TypeId) -> bool {
        self.stringers.contains(&self.strip_pointers(id))
    }

    /// Follows pointer-like wrappers down to the first non pointer type.
    pub fn strip_pointers(&self, mut id: TypeId) -> TypeId {
        while let TypeShape::Pointer { element } = self[id].shape {
            id = element;
        }
        id
    }

    /// Struct behind `id`, through pointer-like wrappers.
    pub fn struct_of(&self, id: TypeId) -> Option<&StructDescriptor> {
        self[self.strip_pointers(id)]
            .struct_id()
            .and_then(|struct_id| self.get_struct(struct_id))
    }

    /// Struct element of a slice-of-struct type, through pointer-like wrappers on both levels.
    pub fn slice_element_struct(&self, id: TypeId) -> Option<&StructDescriptor> {
        match self[self.strip_pointers(id)].shape {
            TypeShape::Slice { element } => self.struct_of(element),
            _ => None,
        }
    }

    pub(crate) fn from_parts(
        types: Vec<TypeDescriptor>,
        structs: Vec<StructDescriptor>,
        struct_paths: BTreeMap<String, StructId>,
        stringers: BTreeSet<TypeId>,
        functions: BTreeMap<String, FunctionDescriptor>,
    ) -> Self {
        let type_names = types
            .iter()
            .map(|descriptor| (descriptor.name.clone(), descriptor.id))
            .collect();
        Self {
            types,
            type_names,
            structs,
            struct_paths,
            stringers,
            functions,
        }
    }
}

fn lookup_path<V: Copy>(table: &BTreeMap<String, V>, path: &str) -> Option<V> {
    let path = path.trim_start_matches("crate::").trim_start_matches("self::");
    if let Some(&value) = table.get(path) {
        return Some(value);
    }
    let segments = path.split("::").collect::<Vec<_>>();
    if segments.len() > 2 {
        if let Some(&value) = table.get(&segments[segments.len() - 2..].join("::")) {
            return Some(value);
        }
    }
    segments.last().and_then(|name| table.get(*name).copied())
}

impl Index<TypeId> for TypeCatalog {
    type Output = TypeDescriptor;

    fn index(&self, index: TypeId) -> &Self::Output {
        self.get_type(index)
            .unwrap_or_else(|| panic!("type #{} not found", index))
    }
}

impl Index<StructId> for TypeCatalog {
    type Output = StructDescriptor;

    fn index(&self, index: StructId) -> &Self::Output {
        self.get_struct(index)
            .unwrap_or_else(|| panic!("struct #{} not found", index))
    }
}
