//! Stateful IR construction
//!
//! The builder carries the function under construction, a current-block
//! cursor, and the scope used to resolve symbolic opcodes. Construction
//! creates the function with its arguments, return type, and an entry
//! block; instructions append at the cursor.

use log::trace;

use crate::block::Block;
use crate::constant::ConstantValue;
use crate::context::Context;
use crate::error::Result;
use crate::function::Function;
use crate::instruction::ParamValue;
use crate::scope::Scope;
use crate::types::Type;
use crate::value::Value;

pub struct Builder<'a> {
    context: &'a mut Context,
    scope: &'a Scope,
    function: Function,
    block: Block,
}

impl<'a> Builder<'a> {
    /// Create a function with the given name, arguments, and return type,
    /// plus an anonymous entry block, and position the cursor there. With
    /// `instrument` set, the function records every mutation from the
    /// start.
    pub fn new(
        context: &'a mut Context,
        scope: &'a Scope,
        name: &str,
        arguments: &[(Type, &str)],
        return_type: Type,
        instrument: bool,
    ) -> Builder<'a> {
        let function = Function::new(context, name);
        if instrument {
            function.instrument(context);
        }
        function.set_arguments(context, arguments);
        function.set_return_type(context, return_type);
        let entry = Block::new(context, function, None);
        function.set_entry(context, entry);
        Builder {
            context,
            scope,
            function,
            block: entry,
        }
    }

    pub fn context(&mut self) -> &mut Context {
        self.context
    }

    pub fn function(&self) -> Function {
        self.function
    }

    pub fn current_block(&self) -> Block {
        self.block
    }

    /// Move the cursor to an existing block.
    pub fn switch_to(&mut self, block: Block) {
        self.block = block;
    }

    /// Resolve an argument of the function under construction by name.
    pub fn argument(&self, name: &str) -> Result<Value> {
        self.function.find_name(self.context, name)
    }

    /// Create a constant value.
    pub fn constant(&mut self, ty: Type, value: ConstantValue) -> Value {
        Value::new_constant(self.context, ty, value)
    }

    // --- instruction emission -------------------------------------------

    /// Resolve `opcode` through the scope, construct the instruction over
    /// `operands`, and append it at the cursor.
    pub fn append(&mut self, opcode: &str, operands: Vec<Value>) -> Result<Value> {
        self.append_full(opcode, operands, Vec::new(), None)
    }

    /// `append` with extra parameters and an explicit type for generic
    /// classes.
    pub fn append_full(
        &mut self,
        opcode: &str,
        operands: Vec<Value>,
        params: Vec<ParamValue>,
        ty: Option<Type>,
    ) -> Result<Value> {
        let class = self.scope.resolve(opcode)?;
        let insn = Value::new_instruction_with(
            self.context,
            self.function,
            &class,
            operands,
            params,
            ty,
            None,
        )?;
        self.block.append(self.context, insn);
        Ok(insn)
    }

    /// Construct a phi over (predecessor, value) pairs and append it at
    /// the cursor.
    pub fn phi(&mut self, ty: Type, incoming: Vec<(Block, Value)>) -> Result<Value> {
        let class = self.scope.resolve("phi")?;
        let insn = Value::new_phi(self.context, self.function, &class, ty, incoming)?;
        self.block.append(self.context, insn);
        Ok(insn)
    }

    pub fn branch(&mut self, target: Block) -> Result<Value> {
        self.append("branch", vec![target.to_value()])
    }

    pub fn cond_branch(&mut self, condition: Value, if_true: Block, if_false: Block) -> Result<Value> {
        self.append(
            "cond_branch",
            vec![condition, if_true.to_value(), if_false.to_value()],
        )
    }

    pub fn ret(&mut self) -> Result<Value> {
        self.append("return", Vec::new())
    }

    pub fn ret_value(&mut self, value: Value) -> Result<Value> {
        self.append("return_value", vec![value])
    }

    // --- block management -------------------------------------------------

    /// Create a block and move the cursor there. When the current block is
    /// not yet terminated, an unconditional branch to the new block is
    /// appended first, so control flow stays connected.
    pub fn add_block(&mut self, name: Option<&str>) -> Result<Block> {
        let block = Block::new(self.context, self.function, name);
        if !self.block.is_terminated(self.context) {
            trace!(
                "auto-branching {} -> {}",
                self.block.name(self.context),
                block.name(self.context)
            );
            self.branch(block)?;
        }
        self.block = block;
        Ok(block)
    }

    /// Create and activate a block for the duration of `f`, restoring the
    /// previous cursor on exit.
    pub fn in_block<R>(
        &mut self,
        name: Option<&str>,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<(Block, R)> {
        let saved = self.block;
        let block = self.add_block(name)?;
        let result = f(self);
        self.block = saved;
        Ok((block, result?))
    }
}
