use std::collections::{BTreeMap, BTreeSet};

use super::{
    lookup_path, FieldDescriptor, FunctionDescriptor, MethodDescriptor, StructDescriptor,
    StructId, TypeCatalog, TypeDescriptor, TypeId, TypeShape,
};

/// Main structure to start building a [TypeCatalog].
///
/// Type descriptors are interned by display name: asking twice for the same name returns the same
/// [TypeId], which is what makes type equality an identifier comparison in the planner.
#[derive(Debug, Default)]
pub struct TypeCatalogBuilder {
    types: Vec<TypeDescriptor>,
    type_names: BTreeMap<String, TypeId>,
    structs: Vec<StructDescriptor>,
    struct_paths: BTreeMap<String, StructId>,
    stringers: BTreeSet<TypeId>,
    functions: BTreeMap<String, FunctionDescriptor>,
}

impl TypeCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a type descriptor.
    ///
    /// If a descriptor with that name already exists, it is returned untouched.
    pub fn intern<N>(&mut self, name: N, shape: TypeShape) -> TypeId
    where
        N: Into<String>,
    {
        let name = name.into();
        if let Some(&id) = self.type_names.get(&name) {
            return id;
        }
        let id = TypeId::from(self.types.len());
        self.types.push(TypeDescriptor::new(id, name.clone(), shape));
        self.type_names.insert(name, id);
        id
    }

    pub fn basic<N>(&mut self, name: N) -> TypeId
    where
        N: Into<String>,
    {
        self.intern(name, TypeShape::Basic)
    }

    /// Interns a pointer-like type, `wrapper` being e.g. `Box` or `Option`.
    pub fn pointer(&mut self, wrapper: &str, element: TypeId) -> TypeId {
        let name = format!("{}<{}>", wrapper, self.types[element.0].name());
        self.intern(name, TypeShape::Pointer { element })
    }

    pub fn reference(&mut self, element: TypeId) -> TypeId {
        let name = format!("&{}", self.types[element.0].name());
        self.intern(name, TypeShape::Pointer { element })
    }

    pub fn vec(&mut self, element: TypeId) -> TypeId {
        let name = format!("Vec<{}>", self.types[element.0].name());
        self.intern(name, TypeShape::Slice { element })
    }

    pub fn map(&mut self, wrapper: &str, key: TypeId, value: TypeId) -> TypeId {
        let name = format!(
            "{}<{}, {}>",
            wrapper,
            self.types[key.0].name(),
            self.types[value.0].name()
        );
        self.intern(name, TypeShape::Map { key, value })
    }

    /// Declares a struct without fields yet.
    ///
    /// The struct is reachable by its qualified path, the last two segments of that path and, if
    /// no other struct claimed it first, its simple name.
    pub fn declare_struct<N, P>(&mut self, name: N, package: P) -> StructId
    where
        N: Into<String>,
        P: Into<String>,
    {
        let id = StructId::from(self.structs.len());
        let descriptor = StructDescriptor {
            id,
            name: name.into(),
            package: package.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        };
        let qualified = descriptor.qualified_name();
        let segments = qualified.split("::").collect::<Vec<_>>();
        for start in 0..segments.len() {
            self.struct_paths
                .entry(segments[start..].join("::"))
                .or_insert(id);
        }
        self.structs.push(descriptor);
        id
    }

    /// Interns the type descriptor of a declared struct.
    pub fn struct_type(&mut self, id: StructId) -> TypeId {
        let name = self.structs[id.0].qualified_name();
        self.intern(name, TypeShape::Struct { definition: id })
    }

    /// Appends a field, deriving its pointer and slice flags from its type.
    pub fn add_field<N>(&mut self, id: StructId, name: N, ty: TypeId, tag: Option<String>)
    where
        N: Into<String>,
    {
        let (is_pointer, is_slice) = match self.types[ty.0].shape() {
            TypeShape::Pointer { element } => (
                true,
                matches!(self.types[element.0].shape(), TypeShape::Slice { .. }),
            ),
            TypeShape::Slice { .. } => (false, true),
            _ => (false, false),
        };
        self.structs[id.0].fields.push(FieldDescriptor::new(
            name.into(),
            ty,
            tag,
            is_pointer,
            is_slice,
        ));
    }

    pub fn add_method(&mut self, id: StructId, method: MethodDescriptor) {
        self.structs[id.0].methods.push(method);
    }

    /// Registers a free function by qualified path and, if not taken, by simple name.
    pub fn add_function(&mut self, package: &str, function: FunctionDescriptor) {
        if !package.is_empty() {
            self.functions
                .insert(format!("{}::{}", package, function.name()), function.clone());
        }
        self.functions
            .entry(function.name().to_owned())
            .or_insert(function);
    }

    /// Marks a type as implementing `Display`.
    pub fn mark_stringer(&mut self, id: TypeId) {
        self.stringers.insert(id);
    }

    pub fn struct_by_path(&self, path: &str) -> Option<StructId> {
        lookup_path(&self.struct_paths, path)
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.types[id.0].name()
    }

    pub fn build(self) -> TypeCatalog {
        TypeCatalog::from_parts(
            self.types,
            self.structs,
            self.struct_paths,
            self.stringers,
            self.functions,
        )
    }
}
