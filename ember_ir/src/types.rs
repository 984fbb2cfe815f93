//! Interned IR types
//!
//! The core treats types as mostly opaque: they support equality, rendering,
//! and a structural rewrite. Types are interned in the [`Context`] so that
//! equality is handle equality and the same type is never stored twice.

use crate::context::Context;
use crate::printer::PrettyPrinter;

/// A handle to an interned type in the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Type(pub(crate) usize);

/// The structure behind a [`Type`] handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeContent {
    /// Sentinel for "no computed type". Renders as `bottom`.
    Bottom,
    /// The type of basic block labels.
    Label,
    /// A named monotype, e.g. `Integer`.
    Mono(String),
    /// A named type constructor applied to element types.
    Composite { name: String, elems: Vec<Type> },
}

impl Type {
    /// Intern a monotype by name.
    pub fn mono(context: &mut Context, name: impl Into<String>) -> Type {
        context.intern_type(TypeContent::Mono(name.into()))
    }

    /// Intern a composite type from a constructor name and element types.
    pub fn composite(context: &mut Context, name: impl Into<String>, elems: Vec<Type>) -> Type {
        context.intern_type(TypeContent::Composite {
            name: name.into(),
            elems,
        })
    }

    pub fn content<'a>(&self, context: &'a Context) -> &'a TypeContent {
        context.type_content(*self)
    }

    pub fn is_bottom(&self, context: &Context) -> bool {
        matches!(self.content(context), TypeContent::Bottom)
    }

    /// The bare name of this type, without the `^` sigil.
    pub fn name(&self, context: &Context) -> String {
        match self.content(context) {
            TypeContent::Bottom => "bottom".to_string(),
            TypeContent::Label => "label".to_string(),
            TypeContent::Mono(name) => name.clone(),
            TypeContent::Composite { name, .. } => name.clone(),
        }
    }

    /// Returns self: interned types are already canonical.
    pub fn to_type(self) -> Type {
        self
    }

    /// Rewrite this type bottom-up, substituting `to` for every occurrence
    /// of `from`. Composite types are re-interned with rewritten elements.
    pub fn replace_type_with(&self, context: &mut Context, from: Type, to: Type) -> Type {
        if *self == from {
            return to;
        }
        match self.content(context).clone() {
            TypeContent::Composite { name, elems } => {
                let elems = elems
                    .iter()
                    .map(|e| e.replace_type_with(context, from, to))
                    .collect();
                context.intern_type(TypeContent::Composite { name, elems })
            }
            _ => *self,
        }
    }

    /// Render this type as it appears in textual IR.
    pub fn display(&self, context: &Context) -> String {
        match self.content(context) {
            TypeContent::Bottom => "bottom".to_string(),
            TypeContent::Label => "label".to_string(),
            TypeContent::Mono(name) => format!("^{}", name),
            TypeContent::Composite { name, elems } => {
                let elems = elems
                    .iter()
                    .map(|e| e.display(context))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("^{}({})", name, elems)
            }
        }
    }

    pub fn pretty_print(&self, context: &Context, p: &mut PrettyPrinter) {
        let rendered = self.display(context);
        p.ty(rendered);
    }
}
