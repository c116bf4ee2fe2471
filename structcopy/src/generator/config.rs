use crate::catalog::loader::DEFAULT_INTERFACE_NAME;

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by structcopy-gen. DO NOT EDIT.";

pub struct GeneratorConfig {
    /// Whether to start the output with [HEADER].
    pub header: bool,
    /// Trait processed without an interface-level `:structcopygen` line.
    pub interface_name: String,
}

impl GeneratorConfig {
    pub fn new<N: Into<String>>(header: bool, interface_name: N) -> Self {
        Self {
            header,
            interface_name: interface_name.into(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new(true, DEFAULT_INTERFACE_NAME)
    }
}
