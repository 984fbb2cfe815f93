//! The arena that owns every IR entity
//!
//! Values (constants, arguments, blocks, instructions) and functions are
//! arena-allocated and referenced through cheap `Copy` handles. The def-use
//! relation between values is a pair of edge collections inside the arena
//! nodes, so the apparent Value/User cycle never becomes an ownership cycle.

use generational_arena::Arena;
use indexmap::IndexMap;

use crate::function::FunctionContent;
use crate::types::{Type, TypeContent};
use crate::value::ValueContent;

/// Owns all values, functions, and interned types of an IR universe.
///
/// Constants live in the same arena as everything else and may be shared by
/// any number of users across any number of functions.
pub struct Context {
    pub(crate) values: Arena<ValueContent>,
    pub(crate) functions: Arena<FunctionContent>,
    types: IndexMap<TypeContent, ()>,
    bottom: Type,
    label: Type,
}

impl Context {
    pub fn new() -> Context {
        let mut types = IndexMap::new();
        let (bottom, _) = types.insert_full(TypeContent::Bottom, ());
        let (label, _) = types.insert_full(TypeContent::Label, ());
        Context {
            values: Arena::new(),
            functions: Arena::new(),
            types,
            bottom: Type(bottom),
            label: Type(label),
        }
    }

    /// The sentinel type for "no computed type".
    pub fn bottom_type(&self) -> Type {
        self.bottom
    }

    /// The type carried by basic block labels.
    pub fn label_type(&self) -> Type {
        self.label
    }

    pub(crate) fn intern_type(&mut self, content: TypeContent) -> Type {
        let (index, _) = self.types.insert_full(content, ());
        Type(index)
    }

    pub(crate) fn type_content(&self, ty: Type) -> &TypeContent {
        self.types
            .get_index(ty.0)
            .map(|(content, _)| content)
            .unwrap_or(&TypeContent::Bottom)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}
