//! Instructions and their mutation engine
//!
//! An instruction is a named value that lives in a basic block, holds
//! ordered operands, and derives its opcode from its class. All operand
//! mutation goes through this module so that use lists stay consistent
//! with operand lists on every path.
//!
//! Phi instructions use a different operand shape: an ordered mapping from
//! predecessor block to incoming value. Each pair contributes two use
//! edges, one for the value and one for the block label. Operand iteration
//! yields all values first, then all blocks.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::block::Block;
use crate::context::Context;
use crate::error::{IrError, Result};
use crate::events;
use crate::function::Function;
use crate::printer::PrettyPrinter;
use crate::scope::{InsnClass, TypeRule};
use crate::types::Type;
use crate::value::{Value, ValueContent, ValueDatum};

pub(crate) type OperandList = SmallVec<[Value; 3]>;

/// Extra non-operand parameters carried by an instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(value) => write!(f, "{}", value),
            ParamValue::String(value) => write!(f, "{}", value),
        }
    }
}

/// Operand storage. Plain instructions hold an ordered list; phis hold an
/// ordered block-to-value mapping.
pub(crate) enum Operands {
    List(OperandList),
    Phi(Vec<(Block, Value)>),
}

pub(crate) struct InstructionContent {
    pub function: Function,
    pub block: Option<Block>,
    pub name: String,
    pub class: Arc<InsnClass>,
    pub operands: Operands,
    pub params: Vec<ParamValue>,
}

impl InstructionContent {
    /// All operand positions flattened: phi pairs contribute their values
    /// first, then their blocks.
    pub(crate) fn expanded_operands(&self) -> Vec<Value> {
        match &self.operands {
            Operands::List(list) => list.to_vec(),
            Operands::Phi(pairs) => pairs
                .iter()
                .map(|(_, value)| *value)
                .chain(pairs.iter().map(|(block, _)| block.to_value()))
                .collect(),
        }
    }
}

fn as_instruction<'a>(context: &'a Context, value: Value) -> &'a InstructionContent {
    match &context.values[value.0].datum {
        ValueDatum::Instruction(insn) => insn,
        _ => panic!("not an instruction value"),
    }
}

fn as_instruction_mut<'a>(context: &'a mut Context, value: Value) -> &'a mut InstructionContent {
    match &mut context.values[value.0].datum {
        ValueDatum::Instruction(insn) => insn,
        _ => panic!("not an instruction value"),
    }
}

fn recompute_type(context: &mut Context, value: Value) {
    let (rule, first) = {
        let insn = as_instruction(context, value);
        let operands = insn.expanded_operands();
        (insn.class.type_rule.clone(), operands)
    };
    let ty = match rule {
        TypeRule::Bottom => context.bottom_type(),
        TypeRule::Explicit => return,
        TypeRule::Operand(i) => first
            .get(i)
            .map(|operand| operand.ty(context))
            .unwrap_or_else(|| context.bottom_type()),
        TypeRule::Fixed(ty) => ty,
    };
    context.values[value.0].ty = ty;
}

/// Swap every operand position of `user` naming `old` to `new`, patching
/// use lists on both sides. Phi block labels are rewritten as well.
pub(crate) fn replace_operand_occurrences(
    context: &mut Context,
    user: Value,
    old: Value,
    new: Value,
) {
    let function = as_instruction(context, user).function;
    let mut replaced = 0;
    {
        let insn = as_instruction_mut(context, user);
        match &mut insn.operands {
            Operands::List(list) => {
                for slot in list.iter_mut() {
                    if *slot == old {
                        *slot = new;
                        replaced += 1;
                    }
                }
            }
            Operands::Phi(pairs) => {
                for (block, value) in pairs.iter_mut() {
                    if *value == old {
                        *value = new;
                        replaced += 1;
                    }
                    if block.to_value() == old {
                        *block = Block(new);
                        replaced += 1;
                    }
                }
            }
        }
    }
    for _ in 0..replaced {
        old.remove_use(context, user);
        new.add_use(context, user);
    }
    if replaced > 0 {
        recompute_type(context, user);
        events::emit_update(context, function, user);
    }
}

pub(crate) fn set_block(context: &mut Context, insn: Value, block: Option<Block>) {
    as_instruction_mut(context, insn).block = block;
}

/// Set an instruction's operand shape without schema validation or event
/// emission. Used by function cloning, where the shape is known valid.
pub(crate) fn set_operands_raw(context: &mut Context, value: Value, operands: Operands) {
    let old = as_instruction(context, value).expanded_operands();
    for operand in &old {
        operand.remove_use(context, value);
    }
    as_instruction_mut(context, value).operands = operands;
    let new = as_instruction(context, value).expanded_operands();
    for operand in &new {
        operand.add_use(context, value);
    }
    recompute_type(context, value);
}

pub(crate) fn new_instruction_raw(
    context: &mut Context,
    function: Function,
    class: Arc<InsnClass>,
    operands: Operands,
    params: Vec<ParamValue>,
    ty: Type,
    name_hint: Option<&str>,
) -> Value {
    let name = function.make_name(context, name_hint);
    let value = Value(context.values.insert(ValueContent {
        ty,
        uses: Vec::new(),
        datum: ValueDatum::Instruction(InstructionContent {
            function,
            block: None,
            name,
            class,
            operands: Operands::List(SmallVec::new()),
            params,
        }),
    }));
    set_operands_raw(context, value, operands);
    value
}

impl Value {
    /// Construct an instruction of `class` over `operands`, validated
    /// against the class syntax. The instruction is named through the
    /// function's namer and is not yet placed in a block.
    pub fn new_instruction(
        context: &mut Context,
        function: Function,
        class: &Arc<InsnClass>,
        operands: Vec<Value>,
    ) -> Result<Value> {
        Value::new_instruction_with(context, function, class, operands, Vec::new(), None, None)
    }

    /// Full-form instruction constructor: extra parameters, an explicit
    /// type for generic classes, and a name hint. Phi-kind classes take
    /// (block, value) pairs and must go through [`Value::new_phi`].
    pub fn new_instruction_with(
        context: &mut Context,
        function: Function,
        class: &Arc<InsnClass>,
        operands: Vec<Value>,
        params: Vec<ParamValue>,
        ty: Option<Type>,
        name_hint: Option<&str>,
    ) -> Result<Value> {
        if class.is_phi() {
            return Err(IrError::Schema {
                class: class.name.clone(),
                reason: "phi operands are (block, value) pairs".to_string(),
            });
        }
        class.syntax.check(context, &class.opcode, &operands)?;
        let ty = match class.type_rule {
            TypeRule::Bottom => context.bottom_type(),
            TypeRule::Explicit => ty.unwrap_or_else(|| context.bottom_type()),
            TypeRule::Operand(i) => operands
                .get(i)
                .map(|operand| operand.ty(context))
                .unwrap_or_else(|| context.bottom_type()),
            TypeRule::Fixed(ty) => ty,
        };
        let value = new_instruction_raw(
            context,
            function,
            Arc::clone(class),
            Operands::List(OperandList::from_vec(operands)),
            params,
            ty,
            name_hint,
        );
        let function = as_instruction(context, value).function;
        events::emit_update(context, function, value);
        Ok(value)
    }

    /// Construct a phi instruction with an explicit type and incoming
    /// (predecessor block, value) pairs.
    pub fn new_phi(
        context: &mut Context,
        function: Function,
        class: &Arc<InsnClass>,
        ty: Type,
        incoming: Vec<(Block, Value)>,
    ) -> Result<Value> {
        if !class.is_phi() {
            return Err(IrError::Schema {
                class: class.name.clone(),
                reason: "not a phi class".to_string(),
            });
        }
        let value = new_instruction_raw(
            context,
            function,
            Arc::clone(class),
            Operands::Phi(incoming),
            Vec::new(),
            ty,
            None,
        );
        events::emit_update(context, function, value);
        Ok(value)
    }

    /// The opcode derived from this instruction's class.
    pub fn opcode<'a>(&self, context: &'a Context) -> &'a str {
        &as_instruction(context, *self).class.opcode
    }

    pub fn class(&self, context: &Context) -> Arc<InsnClass> {
        Arc::clone(&as_instruction(context, *self).class)
    }

    pub fn block(&self, context: &Context) -> Option<Block> {
        as_instruction(context, *self).block
    }

    pub fn params<'a>(&self, context: &'a Context) -> &'a [ParamValue] {
        &as_instruction(context, *self).params
    }

    /// All operand positions as a snapshot, phis flattened values-first.
    pub fn operands(&self, context: &Context) -> Vec<Value> {
        as_instruction(context, *self).expanded_operands()
    }

    /// Replace the whole operand list, validating against the class syntax
    /// and patching use lists by multiset semantics.
    pub fn set_operands(&self, context: &mut Context, operands: Vec<Value>) -> Result<()> {
        let (class, function) = {
            let insn = as_instruction(context, *self);
            (Arc::clone(&insn.class), insn.function)
        };
        class.syntax.check(context, &class.opcode, &operands)?;
        set_operands_raw(
            context,
            *self,
            Operands::List(OperandList::from_vec(operands)),
        );
        events::emit_update(context, function, *self);
        Ok(())
    }

    /// Rewrite only the positions where `old` currently appears.
    pub fn replace_uses_of(&self, context: &mut Context, old: Value, new: Value) -> Result<()> {
        let occurrences = as_instruction(context, *self)
            .expanded_operands()
            .iter()
            .filter(|operand| **operand == old)
            .count();
        if occurrences == 0 {
            return Err(IrError::InvalidUse {
                user: self.inspect_as_value(context),
                value: old.inspect_as_value(context),
            });
        }
        replace_operand_occurrences(context, *self, old, new);
        Ok(())
    }

    /// Clear all operands, severing this instruction from every use list.
    pub fn detach(&self, context: &mut Context) {
        let function = as_instruction(context, *self).function;
        let empty = match as_instruction(context, *self).operands {
            Operands::List(_) => Operands::List(SmallVec::new()),
            Operands::Phi(_) => Operands::Phi(Vec::new()),
        };
        set_operands_raw(context, *self, empty);
        events::emit_update(context, function, *self);
    }

    /// Delete this instruction: detach operands, unlink from its block,
    /// and release its name.
    pub fn remove(&self, context: &mut Context) {
        self.detach(context);
        if let Some(block) = as_instruction(context, *self).block {
            block.remove(context, *self);
        }
        let (function, name) = {
            let insn = as_instruction(context, *self);
            (insn.function, insn.name.clone())
        };
        function.free_name(context, &name);
    }

    /// Rewrite all uses of this instruction to `other`, then remove this
    /// instruction from its block. When `other` is an instruction not yet
    /// placed in a block, it is first inserted at this instruction's
    /// position; constants are never inserted into blocks.
    pub fn replace_with(&self, context: &mut Context, other: Value) -> Result<()> {
        let needs_placement = other.is_instruction(context) && other.block(context).is_none();
        if needs_placement {
            if let Some(block) = as_instruction(context, *self).block {
                block.insert_before(context, *self, other)?;
            }
        }
        self.replace_all_uses_with(context, other);
        self.remove(context);
        Ok(())
    }

    /// Rename this instruction through the function's namer, preserving
    /// uniqueness. Returns the name actually assigned.
    pub fn rename(&self, context: &mut Context, hint: &str) -> String {
        let (function, old_name) = {
            let insn = as_instruction(context, *self);
            (insn.function, insn.name.clone())
        };
        function.free_name(context, &old_name);
        let new_name = function.make_name(context, Some(hint));
        as_instruction_mut(context, *self).name = new_name.clone();
        events::emit_rename(context, function, &old_name, &new_name);
        new_name
    }

    /// Override the stored type. Meaningful for generic instructions,
    /// whose type is an explicit mutable attribute; derived classes
    /// recompute on the next operand change.
    pub fn set_type(&self, context: &mut Context, ty: Type) {
        let function = as_instruction(context, *self).function;
        context.values[self.0].ty = ty;
        events::emit_update(context, function, *self);
    }

    // --- named slot accessors -------------------------------------------

    /// The operand bound by a named single slot.
    pub fn slot(&self, context: &Context, name: &str) -> Result<Value> {
        let insn = as_instruction(context, *self);
        let (index, splat) = insn
            .class
            .syntax
            .position_of(name)
            .ok_or_else(|| IrError::NotFound {
                kind: "operand slot",
                name: name.to_string(),
            })?;
        if splat {
            return Err(IrError::NotFound {
                kind: "operand slot",
                name: name.to_string(),
            });
        }
        match &insn.operands {
            Operands::List(list) => list.get(index).copied().ok_or_else(|| IrError::NotFound {
                kind: "operand slot",
                name: name.to_string(),
            }),
            Operands::Phi(_) => Err(IrError::NotFound {
                kind: "operand slot",
                name: name.to_string(),
            }),
        }
    }

    /// The operand tail bound by a named splat slot.
    pub fn splat(&self, context: &Context, name: &str) -> Result<Vec<Value>> {
        let insn = as_instruction(context, *self);
        let (index, splat) = insn
            .class
            .syntax
            .position_of(name)
            .ok_or_else(|| IrError::NotFound {
                kind: "splat slot",
                name: name.to_string(),
            })?;
        if !splat {
            return Err(IrError::NotFound {
                kind: "splat slot",
                name: name.to_string(),
            });
        }
        match &insn.operands {
            Operands::List(list) => Ok(list.iter().skip(index).copied().collect()),
            Operands::Phi(_) => Err(IrError::NotFound {
                kind: "splat slot",
                name: name.to_string(),
            }),
        }
    }

    /// Rewrite the operand bound by a named single slot.
    pub fn set_slot(&self, context: &mut Context, name: &str, value: Value) -> Result<()> {
        let insn = as_instruction(context, *self);
        let (index, splat) = insn
            .class
            .syntax
            .position_of(name)
            .ok_or_else(|| IrError::NotFound {
                kind: "operand slot",
                name: name.to_string(),
            })?;
        if splat {
            return Err(IrError::NotFound {
                kind: "operand slot",
                name: name.to_string(),
            });
        }
        let mut operands = match &insn.operands {
            Operands::List(list) => list.to_vec(),
            Operands::Phi(_) => {
                return Err(IrError::NotFound {
                    kind: "operand slot",
                    name: name.to_string(),
                })
            }
        };
        operands[index] = value;
        self.set_operands(context, operands)
    }

    /// Replace the operand tail bound by a named splat slot.
    pub fn set_splat(&self, context: &mut Context, name: &str, values: Vec<Value>) -> Result<()> {
        let insn = as_instruction(context, *self);
        let (index, splat) = insn
            .class
            .syntax
            .position_of(name)
            .ok_or_else(|| IrError::NotFound {
                kind: "splat slot",
                name: name.to_string(),
            })?;
        if !splat {
            return Err(IrError::NotFound {
                kind: "splat slot",
                name: name.to_string(),
            });
        }
        let mut operands = match &insn.operands {
            Operands::List(list) => list.to_vec(),
            Operands::Phi(_) => {
                return Err(IrError::NotFound {
                    kind: "splat slot",
                    name: name.to_string(),
                })
            }
        };
        operands.truncate(index);
        operands.extend(values);
        self.set_operands(context, operands)
    }

    /// Re-run the syntax type checks without failing.
    pub fn is_valid(&self, context: &Context) -> bool {
        self.invalid_slot(context).is_none()
    }

    /// The first slot whose operand is missing or ill-typed.
    pub fn invalid_slot(&self, context: &Context) -> Option<String> {
        let insn = as_instruction(context, *self);
        match &insn.operands {
            Operands::List(list) => insn.class.syntax.first_invalid(context, list),
            Operands::Phi(_) => None,
        }
    }

    // --- phi shape -------------------------------------------------------

    /// The (predecessor block, incoming value) pairs of a phi.
    pub fn phi_incoming(&self, context: &Context) -> Vec<(Block, Value)> {
        match &as_instruction(context, *self).operands {
            Operands::Phi(pairs) => pairs.clone(),
            Operands::List(_) => panic!("not a phi instruction"),
        }
    }

    /// The incoming value selected when control arrives from `block`.
    pub fn phi_value_for(&self, context: &Context, block: Block) -> Option<Value> {
        self.phi_incoming(context)
            .iter()
            .find(|(from, _)| *from == block)
            .map(|(_, value)| *value)
    }

    /// Replace the whole incoming mapping of a phi.
    pub fn set_phi_incoming(&self, context: &mut Context, incoming: Vec<(Block, Value)>) {
        let function = as_instruction(context, *self).function;
        match as_instruction(context, *self).operands {
            Operands::Phi(_) => {}
            Operands::List(_) => panic!("not a phi instruction"),
        }
        set_operands_raw(context, *self, Operands::Phi(incoming));
        events::emit_update(context, function, *self);
    }

    /// Append one incoming pair to a phi.
    pub fn add_phi_incoming(&self, context: &mut Context, block: Block, value: Value) {
        let mut incoming = self.phi_incoming(context);
        incoming.push((block, value));
        self.set_phi_incoming(context, incoming);
    }

    // --- terminator queries ---------------------------------------------

    pub fn is_terminator(&self, context: &Context) -> bool {
        match &context.values[self.0].datum {
            ValueDatum::Instruction(insn) => insn.class.is_terminator(),
            _ => false,
        }
    }

    /// Whether this instruction returns from the function. Non-terminators
    /// answer false; a terminator class without the flag cannot answer.
    pub fn exits(&self, context: &Context) -> Result<bool> {
        match &context.values[self.0].datum {
            ValueDatum::Instruction(insn) => insn.class.exits(),
            _ => Ok(false),
        }
    }
}

/// Render one instruction line: `<type> %<name> = <opcode> <operands>`,
/// with the type/name prefix omitted for bottom-typed instructions and the
/// opcode decorated with `!<slot>` when the instruction is invalid.
pub(crate) fn pretty_print(context: &Context, value: Value, p: &mut PrettyPrinter) {
    let insn = as_instruction(context, value);
    let ty = value.ty(context);
    if !ty.is_bottom(context) {
        ty.pretty_print(context, p);
        p.text(format!("%{}", insn.name));
        p.text("=");
    }
    p.keyword(&insn.class.opcode);
    if let Some(slot) = value.invalid_slot(context) {
        p.text(format!("!{}", slot));
    }
    match &insn.operands {
        Operands::List(list) => {
            for (i, operand) in list.iter().enumerate() {
                p.text(operand.inspect_as_value(context));
                if i + 1 < list.len() {
                    p.append(",");
                }
            }
        }
        Operands::Phi(pairs) => {
            for (i, (block, incoming)) in pairs.iter().enumerate() {
                p.text(format!("%{}", block.name(context)));
                p.text("=>");
                p.text(incoming.inspect_as_value(context));
                if i + 1 < pairs.len() {
                    p.append(",");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ConstantValue;
    use crate::error::IrError;
    use crate::scope::Scope;
    use crate::syntax::{Slot, Syntax};

    struct Fixture {
        context: Context,
        scope: Scope,
        int: Type,
        function: Function,
    }

    fn fixture() -> Fixture {
        let mut context = Context::new();
        let int = Type::mono(&mut context, "Integer");
        let array = Type::mono(&mut context, "Array");
        let mut scope = Scope::core(&context);
        scope.register(InsnClass::new(
            "DupInsn",
            Syntax::new("DupInsn", vec![Slot::operand("value")]).unwrap(),
            TypeRule::Operand(0),
        ));
        scope.register(InsnClass::new(
            "TupleConcatInsn",
            Syntax::new(
                "TupleConcatInsn",
                vec![Slot::operand("left"), Slot::operand("right")],
            )
            .unwrap(),
            TypeRule::Fixed(array),
        ));
        scope.register(InsnClass::new(
            "CallInsn",
            Syntax::new(
                "CallInsn",
                vec![Slot::operand("callee"), Slot::splat("arguments")],
            )
            .unwrap(),
            TypeRule::Bottom,
        ));
        let function = Function::new(&mut context, "f");
        Fixture {
            context,
            scope,
            int,
            function,
        }
    }

    fn int_const(fx: &mut Fixture, value: i64) -> Value {
        Value::new_constant(&mut fx.context, fx.int, ConstantValue::Integer(value))
    }

    #[test]
    fn test_opcode_is_derived_from_class() {
        let mut fx = fixture();
        let one = int_const(&mut fx, 1);
        let class = fx.scope.resolve("dup").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, vec![one]).unwrap();
        assert_eq!(insn.opcode(&fx.context), "dup");
        assert_eq!(insn.ty(&fx.context), fx.int);
        assert!(insn.is_instruction(&fx.context));
        assert!(!insn.has_side_effects(&fx.context));
    }

    #[test]
    fn test_operand_construction_tracks_uses() {
        let mut fx = fixture();
        let one = int_const(&mut fx, 1);
        let two = int_const(&mut fx, 2);
        let class = fx.scope.resolve("tuple_concat").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, vec![one, two]).unwrap();
        assert_eq!(one.uses(&fx.context), &[insn]);
        assert_eq!(two.uses(&fx.context), &[insn]);
        assert_eq!(insn.operands(&fx.context), vec![one, two]);
    }

    #[test]
    fn test_duplicate_operand_counts_twice() {
        let mut fx = fixture();
        let one = int_const(&mut fx, 1);
        let class = fx.scope.resolve("tuple_concat").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, vec![one, one]).unwrap();
        assert_eq!(one.use_count(&fx.context), 2);

        let two = int_const(&mut fx, 2);
        insn.set_operands(&mut fx.context, vec![one, two]).unwrap();
        assert_eq!(one.use_count(&fx.context), 1);
        assert_eq!(two.use_count(&fx.context), 1);
    }

    #[test]
    fn test_slot_accessors() {
        let mut fx = fixture();
        let one = int_const(&mut fx, 1);
        let two = int_const(&mut fx, 2);
        let class = fx.scope.resolve("tuple_concat").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, vec![one, two]).unwrap();

        assert_eq!(insn.slot(&fx.context, "left").unwrap(), one);
        assert_eq!(insn.slot(&fx.context, "right").unwrap(), two);
        assert!(matches!(
            insn.slot(&fx.context, "middle"),
            Err(IrError::NotFound { .. })
        ));

        let three = int_const(&mut fx, 3);
        insn.set_slot(&mut fx.context, "left", three).unwrap();
        assert_eq!(insn.slot(&fx.context, "left").unwrap(), three);
        assert!(!one.is_used(&fx.context));
        assert_eq!(three.uses(&fx.context), &[insn]);
    }

    #[test]
    fn test_splat_accessors() {
        let mut fx = fixture();
        let callee = int_const(&mut fx, 0);
        let one = int_const(&mut fx, 1);
        let two = int_const(&mut fx, 2);
        let class = fx.scope.resolve("call").unwrap();
        let insn = Value::new_instruction(
            &mut fx.context,
            fx.function,
            &class,
            vec![callee, one, two],
        )
        .unwrap();

        assert_eq!(insn.splat(&fx.context, "arguments").unwrap(), vec![one, two]);
        insn.set_splat(&mut fx.context, "arguments", vec![two]).unwrap();
        assert_eq!(insn.operands(&fx.context), vec![callee, two]);
        assert!(!one.is_used(&fx.context));
        assert!(matches!(
            insn.splat(&fx.context, "callee"),
            Err(IrError::NotFound { .. })
        ));
    }

    #[test]
    fn test_replace_uses_of_requires_membership() {
        let mut fx = fixture();
        let one = int_const(&mut fx, 1);
        let two = int_const(&mut fx, 2);
        let three = int_const(&mut fx, 3);
        let class = fx.scope.resolve("dup").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, vec![one]).unwrap();

        let result = insn.replace_uses_of(&mut fx.context, two, three);
        assert!(matches!(result, Err(IrError::InvalidUse { .. })));

        insn.replace_uses_of(&mut fx.context, one, two).unwrap();
        assert_eq!(insn.operands(&fx.context), vec![two]);
        assert!(!one.is_used(&fx.context));
        assert_eq!(two.uses(&fx.context), &[insn]);
    }

    #[test]
    fn test_detach_severs_all_use_lists() {
        let mut fx = fixture();
        let one = int_const(&mut fx, 1);
        let class = fx.scope.resolve("tuple_concat").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, vec![one, one]).unwrap();

        insn.detach(&mut fx.context);
        assert!(insn.operands(&fx.context).is_empty());
        assert!(!one.is_used(&fx.context));
    }

    #[test]
    fn test_phi_use_tracking() {
        let mut fx = fixture();
        let bb1 = Block::new(&mut fx.context, fx.function, Some("bb1"));
        let bb2 = Block::new(&mut fx.context, fx.function, Some("bb2"));
        let v1 = int_const(&mut fx, 1);
        let class = fx.scope.resolve("phi").unwrap();
        let phi =
            Value::new_phi(&mut fx.context, fx.function, &class, fx.int, vec![(bb1, v1)]).unwrap();

        assert_eq!(v1.uses(&fx.context), &[phi]);
        assert_eq!(bb1.to_value().uses(&fx.context), &[phi]);
        // Values iterate before blocks.
        assert_eq!(phi.operands(&fx.context), vec![v1, bb1.to_value()]);

        phi.replace_uses_of(&mut fx.context, bb1.to_value(), bb2.to_value())
            .unwrap();
        assert_eq!(phi.phi_incoming(&fx.context), vec![(bb2, v1)]);
        assert_eq!(phi.phi_value_for(&fx.context, bb2), Some(v1));
        assert_eq!(phi.phi_value_for(&fx.context, bb1), None);
        assert!(!bb1.to_value().is_used(&fx.context));
        assert_eq!(bb2.to_value().uses(&fx.context), &[phi]);
    }

    #[test]
    fn test_phi_shape_is_enforced_at_construction() {
        let mut fx = fixture();
        let phi_class = fx.scope.resolve("phi").unwrap();
        let result =
            Value::new_instruction(&mut fx.context, fx.function, &phi_class, Vec::new());
        assert!(matches!(result, Err(IrError::Schema { .. })));

        let dup_class = fx.scope.resolve("dup").unwrap();
        let result =
            Value::new_phi(&mut fx.context, fx.function, &dup_class, fx.int, Vec::new());
        assert!(matches!(result, Err(IrError::Schema { .. })));
    }

    #[test]
    fn test_replace_with_constant_rewrites_uses() {
        let mut fx = fixture();
        let one = int_const(&mut fx, 1);
        let class = fx.scope.resolve("dup").unwrap();
        let i1 = Value::new_instruction(&mut fx.context, fx.function, &class, vec![one]).unwrap();
        let i2 = Value::new_instruction(&mut fx.context, fx.function, &class, vec![i1]).unwrap();

        let two = int_const(&mut fx, 2);
        i1.replace_with(&mut fx.context, two).unwrap();
        assert_eq!(i2.operands(&fx.context), vec![two]);
        assert!(!i1.is_used(&fx.context));
        assert!(i1.operands(&fx.context).is_empty());
    }

    #[test]
    fn test_terminator_flags() {
        let mut fx = fixture();
        let target = Block::new(&mut fx.context, fx.function, None);
        let class = fx.scope.resolve("branch").unwrap();
        let branch = Value::new_instruction(
            &mut fx.context,
            fx.function,
            &class,
            vec![target.to_value()],
        )
        .unwrap();

        assert!(branch.is_terminator(&fx.context));
        assert!(branch.has_side_effects(&fx.context));
        assert_eq!(branch.exits(&fx.context).unwrap(), false);
        assert!(branch.ty(&fx.context).is_bottom(&fx.context));
    }
}
