//! Instruction classes and the opcode registry
//!
//! An instruction's behavior is described by an [`InsnClass`]: a class name,
//! the opcode derived from it, an operand schema, a type rule, and the
//! terminator flags. Classes are collected in a named [`Scope`] which the
//! builder consults to resolve symbolic opcodes.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::Context;
use crate::error::{IrError, Result};
use crate::syntax::{Slot, Syntax};
use crate::types::Type;

/// Derive an opcode from a class name: the last path component with any
/// `Insn` suffix stripped, CamelCase converted to snake_case.
pub fn class_to_opcode(class_name: &str) -> String {
    let short = class_name.rsplit("::").next().unwrap_or(class_name);
    let short = short.strip_suffix("Insn").unwrap_or(short);
    let mut opcode = String::with_capacity(short.len() + 4);
    for (i, c) in short.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                opcode.push('_');
            }
            opcode.extend(c.to_lowercase());
        } else {
            opcode.push(c);
        }
    }
    opcode
}

/// The reverse mapping: `foo_bar` becomes `FooBarInsn`.
pub fn opcode_to_class(opcode: &str) -> String {
    let mut class = String::with_capacity(opcode.len() + 4);
    for part in opcode.split('_') {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            class.extend(first.to_uppercase());
            class.push_str(chars.as_str());
        }
    }
    class.push_str("Insn");
    class
}

/// How an instruction class computes its result type.
#[derive(Clone, Debug)]
pub enum TypeRule {
    /// Always the bottom sentinel.
    Bottom,
    /// Stored explicitly and mutable after construction.
    Explicit,
    /// The type of the i-th operand.
    Operand(usize),
    /// A fixed type.
    Fixed(Type),
}

/// Structural role of an instruction class.
#[derive(Clone, Debug)]
pub enum InsnKind {
    Plain,
    /// Operand shape is a per-predecessor-block mapping.
    Phi,
    /// Ends a basic block. `exits` is whether control leaves the function;
    /// a class that does not declare it cannot answer the query.
    Terminator { exits: Option<bool> },
}

/// A registered instruction class.
#[derive(Clone, Debug)]
pub struct InsnClass {
    pub name: String,
    pub opcode: String,
    pub syntax: Syntax,
    pub kind: InsnKind,
    pub type_rule: TypeRule,
}

impl InsnClass {
    /// A plain instruction class. The opcode is derived, never stored by
    /// callers.
    pub fn new(name: impl Into<String>, syntax: Syntax, type_rule: TypeRule) -> InsnClass {
        let name = name.into();
        let opcode = class_to_opcode(&name);
        InsnClass {
            name,
            opcode,
            syntax,
            kind: InsnKind::Plain,
            type_rule,
        }
    }

    /// A generic instruction class: type is stored explicitly and mutable.
    pub fn generic(name: impl Into<String>, syntax: Syntax) -> InsnClass {
        InsnClass::new(name, syntax, TypeRule::Explicit)
    }

    /// A terminator class.
    pub fn terminator(name: impl Into<String>, syntax: Syntax, exits: bool) -> InsnClass {
        let mut class = InsnClass::new(name, syntax, TypeRule::Bottom);
        class.kind = InsnKind::Terminator { exits: Some(exits) };
        class
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, InsnKind::Terminator { .. })
    }

    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InsnKind::Phi)
    }

    /// Whether this terminator returns from the function. Fails when the
    /// class never declared it.
    pub fn exits(&self) -> Result<bool> {
        match self.kind {
            InsnKind::Terminator { exits: Some(exits) } => Ok(exits),
            InsnKind::Terminator { exits: None } => {
                Err(IrError::NotImplemented("exits on an abstract terminator"))
            }
            _ => Ok(false),
        }
    }
}

/// A named registry mapping opcodes to instruction classes.
pub struct Scope {
    name: String,
    classes: IndexMap<String, Arc<InsnClass>>,
}

impl Scope {
    /// An empty scope.
    pub fn new(name: impl Into<String>) -> Scope {
        Scope {
            name: name.into(),
            classes: IndexMap::new(),
        }
    }

    /// A scope pre-populated with the core classes: `phi` and the four
    /// terminators.
    pub fn core(context: &Context) -> Scope {
        let label = context.label_type();
        let mut scope = Scope::new("core");

        let mut phi = InsnClass::generic("PhiInsn", Syntax::empty());
        phi.kind = InsnKind::Phi;
        scope.register(phi);

        scope.register(InsnClass::terminator(
            "BranchInsn",
            Syntax::new("BranchInsn", vec![Slot::typed_operand("target", label)])
                .expect("core schema"),
            false,
        ));
        scope.register(InsnClass::terminator(
            "CondBranchInsn",
            Syntax::new(
                "CondBranchInsn",
                vec![
                    Slot::operand("condition"),
                    Slot::typed_operand("if_true", label),
                    Slot::typed_operand("if_false", label),
                ],
            )
            .expect("core schema"),
            false,
        ));
        scope.register(InsnClass::terminator(
            "ReturnInsn",
            Syntax::empty(),
            true,
        ));
        scope.register(InsnClass::terminator(
            "ReturnValueInsn",
            Syntax::new("ReturnValueInsn", vec![Slot::operand("value")]).expect("core schema"),
            true,
        ));
        scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a class under its derived opcode, replacing any previous
    /// class with the same opcode.
    pub fn register(&mut self, class: InsnClass) -> Arc<InsnClass> {
        let class = Arc::new(class);
        self.classes.insert(class.opcode.clone(), Arc::clone(&class));
        class
    }

    pub fn contains(&self, opcode: &str) -> bool {
        self.classes.contains_key(opcode)
    }

    /// Resolve an opcode to its class.
    pub fn resolve(&self, opcode: &str) -> Result<Arc<InsnClass>> {
        self.classes
            .get(opcode)
            .cloned()
            .ok_or_else(|| IrError::UnknownOpcode {
                opcode: opcode.to_string(),
                scope: self.name.clone(),
            })
    }

    pub fn opcodes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_class_to_opcode() {
        assert_eq!(class_to_opcode("DupInsn"), "dup");
        assert_eq!(class_to_opcode("TupleConcatInsn"), "tuple_concat");
        assert_eq!(class_to_opcode("Ember::SSA::TupleConcatInsn"), "tuple_concat");
        assert_eq!(class_to_opcode("ReturnValueInsn"), "return_value");
    }

    #[test]
    fn test_opcode_to_class() {
        assert_eq!(opcode_to_class("foo_bar"), "FooBarInsn");
        assert_eq!(opcode_to_class("dup"), "DupInsn");
        assert_eq!(opcode_to_class("cond_branch"), "CondBranchInsn");
    }

    #[test]
    fn test_core_scope_contents() {
        let context = Context::new();
        let scope = Scope::core(&context);
        for opcode in ["phi", "branch", "cond_branch", "return", "return_value"] {
            assert!(scope.contains(opcode), "missing {}", opcode);
        }
        assert!(matches!(
            scope.resolve("frobnicate"),
            Err(IrError::UnknownOpcode { .. })
        ));
    }

    #[test]
    fn test_terminator_exit_flags() {
        let context = Context::new();
        let scope = Scope::core(&context);
        assert_eq!(scope.resolve("branch").unwrap().exits().unwrap(), false);
        assert_eq!(scope.resolve("return").unwrap().exits().unwrap(), true);

        let mut abstract_term = InsnClass::new("HaltInsn", Syntax::empty(), TypeRule::Bottom);
        abstract_term.kind = InsnKind::Terminator { exits: None };
        assert!(matches!(
            abstract_term.exits(),
            Err(IrError::NotImplemented(_))
        ));
    }

    proptest! {
        #[test]
        fn test_opcode_round_trip(name in "([A-Z][a-z]{1,8}){1,4}") {
            let class_name = format!("{}Insn", name);
            let opcode = class_to_opcode(&class_name);
            prop_assert_eq!(opcode_to_class(&opcode), class_name);
        }
    }
}
