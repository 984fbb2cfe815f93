//! Values and the def-use engine
//!
//! Everything that can appear as an operand is a [`Value`]: constants,
//! function arguments, basic blocks (as labels), and instructions. Each
//! value tracks the users that name it in an insertion-ordered multiset, so
//! that for every user `u` and operand `v`, `u` appears in `v`'s use list
//! exactly as many times as `v` appears among `u`'s operands.

use crate::block::{Block, BlockContent};
use crate::constant::ConstantValue;
use crate::context::Context;
use crate::function::Function;
use crate::instruction::InstructionContent;
use crate::printer::PrettyPrinter;
use crate::scope::InsnKind;
use crate::types::Type;

/// A handle to a value in the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Value(pub(crate) generational_arena::Index);

pub(crate) struct ValueContent {
    pub ty: Type,
    pub uses: Vec<Value>,
    pub datum: ValueDatum,
}

pub(crate) enum ValueDatum {
    Constant(ConstantValue),
    Argument(ArgumentContent),
    Block(BlockContent),
    Instruction(InstructionContent),
}

pub(crate) struct ArgumentContent {
    pub function: Function,
    pub name: String,
}

impl Value {
    /// Create a constant value. Constants are immutable after construction
    /// and free of function ownership.
    pub fn new_constant(context: &mut Context, ty: Type, value: ConstantValue) -> Value {
        Value(context.values.insert(ValueContent {
            ty,
            uses: Vec::new(),
            datum: ValueDatum::Constant(value),
        }))
    }

    pub fn ty(&self, context: &Context) -> Type {
        context.values[self.0].ty
    }

    /// The function-unique name of this value, if it is a named value.
    pub fn name<'a>(&self, context: &'a Context) -> Option<&'a str> {
        match &context.values[self.0].datum {
            ValueDatum::Constant(_) => None,
            ValueDatum::Argument(arg) => Some(&arg.name),
            ValueDatum::Block(block) => Some(&block.name),
            ValueDatum::Instruction(insn) => Some(&insn.name),
        }
    }

    /// The function carrying this value, if it is a named value.
    pub fn function(&self, context: &Context) -> Option<Function> {
        match &context.values[self.0].datum {
            ValueDatum::Constant(_) => None,
            ValueDatum::Argument(arg) => Some(arg.function),
            ValueDatum::Block(block) => Some(block.function),
            ValueDatum::Instruction(insn) => Some(insn.function),
        }
    }

    pub fn is_constant_value(&self, context: &Context) -> bool {
        matches!(context.values[self.0].datum, ValueDatum::Constant(_))
    }

    pub fn is_argument(&self, context: &Context) -> bool {
        matches!(context.values[self.0].datum, ValueDatum::Argument(_))
    }

    pub fn is_block(&self, context: &Context) -> bool {
        matches!(context.values[self.0].datum, ValueDatum::Block(_))
    }

    pub fn is_instruction(&self, context: &Context) -> bool {
        matches!(context.values[self.0].datum, ValueDatum::Instruction(_))
    }

    pub fn as_block(&self, context: &Context) -> Option<Block> {
        if self.is_block(context) {
            Some(Block(*self))
        } else {
            None
        }
    }

    /// Whether this value is a constant reference: literal constants and
    /// block labels both qualify.
    pub fn is_constant(&self, context: &Context) -> bool {
        matches!(
            context.values[self.0].datum,
            ValueDatum::Constant(_) | ValueDatum::Block(_)
        )
    }

    /// Whether this value must survive dead-code elimination: arguments
    /// represent external inputs and terminators transfer control.
    pub fn has_side_effects(&self, context: &Context) -> bool {
        match &context.values[self.0].datum {
            ValueDatum::Argument(_) => true,
            ValueDatum::Instruction(insn) => {
                matches!(insn.class.kind, InsnKind::Terminator { .. })
            }
            _ => false,
        }
    }

    /// The constant payload, if this value is a constant.
    pub fn constant_value<'a>(&self, context: &'a Context) -> Option<&'a ConstantValue> {
        match &context.values[self.0].datum {
            ValueDatum::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Structural constant equality: same type and same payload.
    pub fn constant_eq(&self, context: &Context, other: Value) -> bool {
        match (self.constant_value(context), other.constant_value(context)) {
            (Some(a), Some(b)) => self.ty(context) == other.ty(context) && a == b,
            _ => false,
        }
    }

    // --- use lists -------------------------------------------------------

    /// The users currently naming this value, in insertion order. A user
    /// appears once per operand position that names this value.
    pub fn uses<'a>(&self, context: &'a Context) -> &'a [Value] {
        &context.values[self.0].uses
    }

    pub fn use_count(&self, context: &Context) -> usize {
        context.values[self.0].uses.len()
    }

    pub fn is_used(&self, context: &Context) -> bool {
        !context.values[self.0].uses.is_empty()
    }

    pub(crate) fn add_use(&self, context: &mut Context, user: Value) {
        context.values[self.0].uses.push(user);
    }

    pub(crate) fn remove_use(&self, context: &mut Context, user: Value) {
        let uses = &mut context.values[self.0].uses;
        if let Some(position) = uses.iter().position(|u| *u == user) {
            uses.remove(position);
        }
    }

    /// Rewrite every user of this value to name `other` instead. Use lists
    /// on both sides are patched; `other` inherits all use edges.
    pub fn replace_all_uses_with(&self, context: &mut Context, other: Value) {
        if *self == other {
            return;
        }
        while let Some(user) = context.values[self.0].uses.first().copied() {
            crate::instruction::replace_operand_occurrences(context, user, *self, other);
        }
    }

    // --- rendering -------------------------------------------------------

    /// Render this value as it appears in an operand position.
    pub fn inspect_as_value(&self, context: &Context) -> String {
        match &context.values[self.0].datum {
            ValueDatum::Constant(value) => {
                format!("{} {}", self.ty(context).display(context), value)
            }
            ValueDatum::Argument(arg) => format!("%{}", arg.name),
            ValueDatum::Block(block) => format!("label %{}", block.name),
            ValueDatum::Instruction(insn) => format!("%{}", insn.name),
        }
    }

    /// Render this value in declaration position: constants as
    /// `<type> <literal>`, arguments as `<type> %<name>`, blocks and
    /// instructions through their own printers.
    pub fn pretty_print(&self, context: &Context, p: &mut PrettyPrinter) {
        match &context.values[self.0].datum {
            ValueDatum::Constant(value) => {
                self.ty(context).pretty_print(context, p);
                p.text(value.to_string());
            }
            ValueDatum::Argument(arg) => {
                self.ty(context).pretty_print(context, p);
                p.text(format!("%{}", arg.name));
            }
            ValueDatum::Block(_) => Block(*self).pretty_print(context, p),
            ValueDatum::Instruction(_) => crate::instruction::pretty_print(context, *self, p),
        }
    }

    pub fn to_ir_string(&self, context: &Context) -> String {
        let mut p = PrettyPrinter::new();
        self.pretty_print(context, &mut p);
        p.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn test_constant_equality_is_structural() {
        let mut context = Context::new();
        let int = Type::mono(&mut context, "Integer");
        let string = Type::mono(&mut context, "String");

        let one = Value::new_constant(&mut context, int, ConstantValue::Integer(1));
        let one_again = Value::new_constant(&mut context, int, ConstantValue::Integer(1));
        let two = Value::new_constant(&mut context, int, ConstantValue::Integer(2));
        let typed = Value::new_constant(&mut context, string, ConstantValue::Integer(1));

        assert_ne!(one, one_again);
        assert!(one.constant_eq(&context, one_again));
        assert!(!one.constant_eq(&context, two));
        assert!(!one.constant_eq(&context, typed));
    }

    #[test]
    fn test_constant_flags() {
        let mut context = Context::new();
        let int = Type::mono(&mut context, "Integer");
        let one = Value::new_constant(&mut context, int, ConstantValue::Integer(1));

        assert!(one.is_constant(&context));
        assert!(!one.has_side_effects(&context));
        assert!(!one.is_used(&context));
        assert_eq!(one.name(&context), None);
        assert_eq!(one.function(&context), None);
    }

    #[test]
    fn test_use_list_is_a_multiset() {
        let mut context = Context::new();
        let int = Type::mono(&mut context, "Integer");
        let value = Value::new_constant(&mut context, int, ConstantValue::Integer(1));
        let user = Value::new_constant(&mut context, int, ConstantValue::Integer(2));

        value.add_use(&mut context, user);
        value.add_use(&mut context, user);
        assert_eq!(value.use_count(&context), 2);

        value.remove_use(&mut context, user);
        assert_eq!(value.use_count(&context), 1);
        value.remove_use(&mut context, user);
        assert!(!value.is_used(&context));
    }

    #[test]
    fn test_constant_inspect() {
        let mut context = Context::new();
        let int = Type::mono(&mut context, "Integer");
        let one = Value::new_constant(&mut context, int, ConstantValue::Integer(1));
        assert_eq!(one.inspect_as_value(&context), "^Integer 1");
        assert_eq!(one.to_ir_string(&context), "^Integer 1");
    }
}
