//! Basic blocks
//!
//! A block is a named value of label type holding an ordered instruction
//! sequence. Because labels are operands (branch targets, phi keys), blocks
//! participate in use lists like any other value.
//!
//! A block is well-terminated when its last instruction is a terminator and
//! no other instruction is. Well-termination is not enforced on every
//! mutation, so blocks may pass through unterminated states during
//! construction; the successor and predecessor queries assume it.

use crate::context::Context;
use crate::error::{IrError, Result};
use crate::events;
use crate::function::Function;
use crate::printer::PrettyPrinter;
use crate::value::{Value, ValueContent, ValueDatum};

/// A handle to a basic block; convertible to the underlying [`Value`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Block(pub(crate) Value);

pub(crate) struct BlockContent {
    pub function: Function,
    pub name: String,
    pub instructions: Vec<Value>,
}

fn content<'a>(context: &'a Context, block: Block) -> &'a BlockContent {
    match &context.values[block.0 .0].datum {
        ValueDatum::Block(content) => content,
        _ => panic!("not a block value"),
    }
}

fn content_mut<'a>(context: &'a mut Context, block: Block) -> &'a mut BlockContent {
    match &mut context.values[block.0 .0].datum {
        ValueDatum::Block(content) => content,
        _ => panic!("not a block value"),
    }
}

impl Block {
    /// Create a block in `function`, naming it through the function's
    /// namer, and append it to the function's block list.
    pub fn new(context: &mut Context, function: Function, name: Option<&str>) -> Block {
        let name = function.make_name(context, name);
        let ty = context.label_type();
        let value = Value(context.values.insert(ValueContent {
            ty,
            uses: Vec::new(),
            datum: ValueDatum::Block(BlockContent {
                function,
                name: name.clone(),
                instructions: Vec::new(),
            }),
        }));
        let block = Block(value);
        function.push_block(context, block);
        events::emit_add_block(context, function, &name);
        block
    }

    pub fn to_value(self) -> Value {
        self.0
    }

    pub fn function(&self, context: &Context) -> Function {
        content(context, *self).function
    }

    pub fn name<'a>(&self, context: &'a Context) -> &'a str {
        &content(context, *self).name
    }

    // --- instruction list ------------------------------------------------

    /// Append an instruction to the end of this block.
    pub fn append(&self, context: &mut Context, insn: Value) {
        let index = content(context, *self).instructions.len();
        content_mut(context, *self).instructions.push(insn);
        crate::instruction::set_block(context, insn, Some(*self));
        let function = content(context, *self).function;
        let block_name = self.name(context).to_string();
        events::emit_add_instruction(context, function, insn, block_name, index);
    }

    /// Insert `new` immediately before `existing`.
    pub fn insert_before(&self, context: &mut Context, existing: Value, new: Value) -> Result<()> {
        let index = self.position_of(context, existing)?;
        content_mut(context, *self).instructions.insert(index, new);
        crate::instruction::set_block(context, new, Some(*self));
        let function = content(context, *self).function;
        let block_name = self.name(context).to_string();
        events::emit_add_instruction(context, function, new, block_name, index);
        Ok(())
    }

    /// Unlink an instruction from this block. Operand and use lists are
    /// untouched; callers wanting full deletion use the instruction's
    /// `remove`.
    pub fn remove(&self, context: &mut Context, insn: Value) {
        let instructions = &mut content_mut(context, *self).instructions;
        if let Some(index) = instructions.iter().position(|i| *i == insn) {
            instructions.remove(index);
            crate::instruction::set_block(context, insn, None);
            let function = content(context, *self).function;
            events::emit_remove_instruction(context, function, insn);
        }
    }

    /// Substitute `new` for `old` in place. Use lists are not rewritten;
    /// callers use the instruction's `replace_with` for that.
    pub fn replace(&self, context: &mut Context, old: Value, new: Value) -> Result<()> {
        let index = self.position_of(context, old)?;
        content_mut(context, *self).instructions[index] = new;
        crate::instruction::set_block(context, old, None);
        crate::instruction::set_block(context, new, Some(*self));
        let function = content(context, *self).function;
        let block_name = self.name(context).to_string();
        events::emit_remove_instruction(context, function, old);
        events::emit_add_instruction(context, function, new, block_name, index);
        Ok(())
    }

    pub fn contains(&self, context: &Context, insn: Value) -> bool {
        content(context, *self).instructions.contains(&insn)
    }

    /// The instruction sequence as a snapshot; mutating it does not affect
    /// the block.
    pub fn instructions(&self, context: &Context) -> Vec<Value> {
        content(context, *self).instructions.clone()
    }

    /// The instructions whose class opcode matches.
    pub fn instructions_of(&self, context: &Context, opcode: &str) -> Vec<Value> {
        content(context, *self)
            .instructions
            .iter()
            .filter(|insn| insn.opcode(context) == opcode)
            .copied()
            .collect()
    }

    pub fn is_empty(&self, context: &Context) -> bool {
        content(context, *self).instructions.is_empty()
    }

    pub fn len(&self, context: &Context) -> usize {
        content(context, *self).instructions.len()
    }

    fn position_of(&self, context: &Context, insn: Value) -> Result<usize> {
        content(context, *self)
            .instructions
            .iter()
            .position(|i| *i == insn)
            .ok_or_else(|| IrError::NotFound {
                kind: "instruction in block",
                name: insn
                    .name(context)
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| "<unnamed>".to_string()),
            })
    }

    // --- terminator discipline ------------------------------------------

    /// The last instruction, when it is a terminator.
    pub fn terminator(&self, context: &Context) -> Option<Value> {
        content(context, *self)
            .instructions
            .last()
            .copied()
            .filter(|insn| insn.is_terminator(context))
    }

    pub fn is_terminated(&self, context: &Context) -> bool {
        self.terminator(context).is_some()
    }

    /// Whether control exits the function from this block.
    pub fn exits(&self, context: &Context) -> Result<bool> {
        match self.terminator(context) {
            Some(terminator) => terminator.exits(context),
            None => Ok(false),
        }
    }

    /// The blocks named as operands of this block's terminator, in operand
    /// order.
    pub fn successors(&self, context: &Context) -> Vec<Block> {
        match self.terminator(context) {
            Some(terminator) => terminator
                .operands(context)
                .iter()
                .filter_map(|operand| operand.as_block(context))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The blocks whose terminator names this block, ordered by block
    /// insertion order in the function.
    pub fn predecessors(&self, context: &Context) -> Vec<Block> {
        let function = self.function(context);
        function
            .blocks(context)
            .into_iter()
            .filter(|block| block.successors(context).contains(self))
            .collect()
    }

    pub fn predecessor_names(&self, context: &Context) -> Vec<String> {
        self.predecessors(context)
            .iter()
            .map(|block| block.name(context).to_string())
            .collect()
    }

    // --- rendering -------------------------------------------------------

    /// Render the block: `<name>:` then each instruction indented three
    /// spaces, terminated with a newline.
    pub fn pretty_print(&self, context: &Context, p: &mut PrettyPrinter) {
        p.text(format!("{}:", self.name(context)));
        p.newline();
        p.indented(3, |p| {
            for insn in self.instructions(context) {
                crate::instruction::pretty_print(context, insn, p);
                p.newline();
            }
        });
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
    use crate::constant::ConstantValue;
    use crate::scope::Scope;
    use crate::types::Type;

    struct Fixture {
        context: Context,
        scope: Scope,
        function: Function,
    }

    fn fixture() -> Fixture {
        let mut context = Context::new();
        let scope = Scope::core(&context);
        let function = Function::new(&mut context, "f");
        Fixture {
            context,
            scope,
            function,
        }
    }

    fn branch(fx: &mut Fixture, from: Block, to: Block) -> Value {
        let class = fx.scope.resolve("branch").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, vec![to.to_value()])
                .unwrap();
        from.append(&mut fx.context, insn);
        insn
    }

    fn ret(fx: &mut Fixture, block: Block) -> Value {
        let class = fx.scope.resolve("return").unwrap();
        let insn =
            Value::new_instruction(&mut fx.context, fx.function, &class, Vec::new()).unwrap();
        block.append(&mut fx.context, insn);
        insn
    }

    #[test]
    fn test_block_is_a_label_value() {
        let mut fx = fixture();
        let block = Block::new(&mut fx.context, fx.function, Some("entry"));
        let value = block.to_value();

        assert!(value.is_block(&fx.context));
        assert!(value.is_constant(&fx.context));
        assert_eq!(value.ty(&fx.context), fx.context.label_type());
        assert_eq!(value.inspect_as_value(&fx.context), "label %entry");
    }

    #[test]
    fn test_successors_and_predecessors() {
        let mut fx = fixture();
        let b1 = Block::new(&mut fx.context, fx.function, Some("b1"));
        let b2 = Block::new(&mut fx.context, fx.function, Some("b2"));
        branch(&mut fx, b1, b2);
        ret(&mut fx, b2);

        assert!(b1.is_terminated(&fx.context));
        assert_eq!(b1.successors(&fx.context), vec![b2]);
        assert_eq!(b1.exits(&fx.context).unwrap(), false);
        assert_eq!(b2.predecessors(&fx.context), vec![b1]);
        assert_eq!(b2.predecessor_names(&fx.context), vec!["b1".to_string()]);

        // An exiting terminator has no successors.
        assert_eq!(b2.exits(&fx.context).unwrap(), true);
        assert!(b2.successors(&fx.context).is_empty());
    }

    #[test]
    fn test_unterminated_block_has_no_successors() {
        let mut fx = fixture();
        let block = Block::new(&mut fx.context, fx.function, None);
        assert!(!block.is_terminated(&fx.context));
        assert_eq!(block.terminator(&fx.context), None);
        assert!(block.successors(&fx.context).is_empty());
        assert_eq!(block.exits(&fx.context).unwrap(), false);
    }

    #[test]
    fn test_insert_before_requires_anchor() {
        let mut fx = fixture();
        let b1 = Block::new(&mut fx.context, fx.function, None);
        let b2 = Block::new(&mut fx.context, fx.function, None);
        let terminator = ret(&mut fx, b1);

        let class = fx.scope.resolve("branch").unwrap();
        let stray = Value::new_instruction(
            &mut fx.context,
            fx.function,
            &class,
            vec![b2.to_value()],
        )
        .unwrap();

        // The anchor lives in b1, not b2.
        let result = b2.insert_before(&mut fx.context, terminator, stray);
        assert!(matches!(result, Err(IrError::NotFound { .. })));

        b1.insert_before(&mut fx.context, terminator, stray).unwrap();
        assert_eq!(b1.instructions(&fx.context), vec![stray, terminator]);
        assert_eq!(stray.block(&fx.context), Some(b1));
    }

    #[test]
    fn test_replace_substitutes_in_place() {
        let mut fx = fixture();
        let b1 = Block::new(&mut fx.context, fx.function, None);
        let b2 = Block::new(&mut fx.context, fx.function, None);
        let old = branch(&mut fx, b1, b2);

        let class = fx.scope.resolve("return").unwrap();
        let new =
            Value::new_instruction(&mut fx.context, fx.function, &class, Vec::new()).unwrap();
        b1.replace(&mut fx.context, old, new).unwrap();

        assert_eq!(b1.instructions(&fx.context), vec![new]);
        assert_eq!(old.block(&fx.context), None);
        assert_eq!(new.block(&fx.context), Some(b1));
        // Use lists are untouched by in-place replacement.
        assert!(b2.to_value().is_used(&fx.context));
    }

    #[test]
    fn test_instruction_list_is_a_snapshot() {
        let mut fx = fixture();
        let block = Block::new(&mut fx.context, fx.function, None);
        ret(&mut fx, block);

        let mut snapshot = block.instructions(&fx.context);
        snapshot.clear();
        assert_eq!(block.len(&fx.context), 1);
    }

    #[test]
    fn test_filtered_iteration() {
        let mut fx = fixture();
        let b1 = Block::new(&mut fx.context, fx.function, None);
        let b2 = Block::new(&mut fx.context, fx.function, None);
        let class = fx.scope.resolve("return_value").unwrap();
        let int = Type::mono(&mut fx.context, "Integer");
        let one = Value::new_constant(&mut fx.context, int, ConstantValue::Integer(1));
        let rv = Value::new_instruction(&mut fx.context, fx.function, &class, vec![one]).unwrap();
        b1.append(&mut fx.context, rv);
        ret(&mut fx, b2);

        assert_eq!(b1.instructions_of(&fx.context, "return_value"), vec![rv]);
        assert!(b1.instructions_of(&fx.context, "return").is_empty());
    }
}
