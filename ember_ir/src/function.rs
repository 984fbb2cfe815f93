//! Functions
//!
//! A function owns its arguments, its ordered blocks, and a namer that
//! keeps every named value unique within the function. `original_name`
//! records the name requested at creation and survives renames and deep
//! clones.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::block::Block;
use crate::context::Context;
use crate::error::{IrError, Result};
use crate::events::{self, Event, EventStream};
use crate::instruction::{self, Operands};
use crate::printer::PrettyPrinter;
use crate::types::Type;
use crate::value::{ArgumentContent, Value, ValueContent, ValueDatum};

/// A handle to a function in the [`Context`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Function(pub(crate) generational_arena::Index);

pub(crate) struct FunctionContent {
    pub name: String,
    pub original_name: String,
    pub arguments: Vec<Value>,
    pub return_type: Type,
    pub entry: Option<Block>,
    pub blocks: Vec<Block>,
    pub names: HashSet<String>,
    pub next_anonymous: u32,
    pub events: Option<EventStream>,
}

impl Function {
    /// Create an empty function: no arguments, no blocks, bottom return
    /// type.
    pub fn new(context: &mut Context, name: impl Into<String>) -> Function {
        let name = name.into();
        let return_type = context.bottom_type();
        Function(context.functions.insert(FunctionContent {
            original_name: name.clone(),
            name,
            arguments: Vec::new(),
            return_type,
            entry: None,
            blocks: Vec::new(),
            names: HashSet::new(),
            next_anonymous: 1,
            events: None,
        }))
    }

    pub fn name<'a>(&self, context: &'a Context) -> &'a str {
        &context.functions[self.0].name
    }

    /// The name requested at creation, preserved across renames and
    /// clones.
    pub fn original_name<'a>(&self, context: &'a Context) -> &'a str {
        &context.functions[self.0].original_name
    }

    /// Rename the function. `original_name` is untouched.
    pub fn set_name(&self, context: &mut Context, name: impl Into<String>) {
        context.functions[self.0].name = name.into();
    }

    pub fn return_type(&self, context: &Context) -> Type {
        context.functions[self.0].return_type
    }

    pub fn set_return_type(&self, context: &mut Context, ty: Type) {
        context.functions[self.0].return_type = ty;
        events::emit_set_return_type(context, *self, ty);
    }

    pub fn arguments(&self, context: &Context) -> Vec<Value> {
        context.functions[self.0].arguments.clone()
    }

    /// Create the argument list from (type, name) pairs and announce it to
    /// the instrumentation stream.
    pub fn set_arguments(&self, context: &mut Context, arguments: &[(Type, &str)]) -> Vec<Value> {
        let mut created = Vec::with_capacity(arguments.len());
        for (ty, name) in arguments {
            let name = self.make_name(context, Some(name));
            let value = Value(context.values.insert(ValueContent {
                ty: *ty,
                uses: Vec::new(),
                datum: ValueDatum::Argument(ArgumentContent {
                    function: *self,
                    name,
                }),
            }));
            context.functions[self.0].arguments.push(value);
            created.push(value);
        }
        events::emit_set_arguments(context, *self);
        created
    }

    pub fn entry(&self, context: &Context) -> Option<Block> {
        context.functions[self.0].entry
    }

    pub fn set_entry(&self, context: &mut Context, block: Block) {
        context.functions[self.0].entry = Some(block);
    }

    /// The blocks of this function in insertion order, as a snapshot.
    pub fn blocks(&self, context: &Context) -> Vec<Block> {
        context.functions[self.0].blocks.clone()
    }

    pub(crate) fn push_block(&self, context: &mut Context, block: Block) {
        context.functions[self.0].blocks.push(block);
    }

    /// Drop a block from the function's block list and release its name.
    pub fn remove_block(&self, context: &mut Context, block: Block) -> Result<()> {
        let position = context.functions[self.0]
            .blocks
            .iter()
            .position(|b| *b == block)
            .ok_or_else(|| IrError::NotFound {
                kind: "basic block",
                name: block.name(context).to_string(),
            })?;
        context.functions[self.0].blocks.remove(position);
        let name = block.name(context).to_string();
        events::emit_remove_block(context, *self, &name);
        self.free_name(context, &name);
        Ok(())
    }

    // --- naming ----------------------------------------------------------

    /// Reserve a function-unique name. A `None` hint yields the first free
    /// decimal integer; a taken hint gets the smallest free `.N` suffix.
    pub fn make_name(&self, context: &mut Context, hint: Option<&str>) -> String {
        let content = &mut context.functions[self.0];
        let name = match hint {
            None => loop {
                let candidate = content.next_anonymous.to_string();
                content.next_anonymous += 1;
                if !content.names.contains(&candidate) {
                    break candidate;
                }
            },
            Some(hint) if !content.names.contains(hint) => hint.to_string(),
            Some(hint) => {
                let mut n = 1;
                loop {
                    let candidate = format!("{}.{}", hint, n);
                    if !content.names.contains(&candidate) {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };
        content.names.insert(name.clone());
        name
    }

    pub(crate) fn free_name(&self, context: &mut Context, name: &str) {
        context.functions[self.0].names.remove(name);
    }

    /// Resolve a named value (argument, block, or instruction) by name.
    pub fn find_name(&self, context: &Context, name: &str) -> Result<Value> {
        for argument in &context.functions[self.0].arguments {
            if argument.name(context) == Some(name) {
                return Ok(*argument);
            }
        }
        for block in &context.functions[self.0].blocks {
            if block.name(context) == name {
                return Ok(block.to_value());
            }
            for insn in block.instructions(context) {
                if insn.name(context) == Some(name) {
                    return Ok(insn);
                }
            }
        }
        Err(IrError::NotFound {
            kind: "named value",
            name: name.to_string(),
        })
    }

    // --- traversal -------------------------------------------------------

    /// All instructions of all blocks, flattened in insertion order.
    pub fn instructions(&self, context: &Context) -> Vec<Value> {
        self.blocks(context)
            .iter()
            .flat_map(|block| block.instructions(context))
            .collect()
    }

    pub fn instruction_count(&self, context: &Context) -> usize {
        self.blocks(context)
            .iter()
            .map(|block| block.len(context))
            .sum()
    }

    // --- instrumentation -------------------------------------------------

    /// Attach an event stream recording every subsequent mutation.
    pub fn instrument(&self, context: &mut Context) {
        context.functions[self.0].events = Some(EventStream::new());
    }

    pub fn is_instrumented(&self, context: &Context) -> bool {
        context.functions[self.0].events.is_some()
    }

    pub fn events<'a>(&self, context: &'a Context) -> Option<&'a EventStream> {
        context.functions[self.0].events.as_ref()
    }

    /// Mark the beginning of a named transform in the event stream.
    pub fn transform_start(&self, context: &mut Context, name: impl Into<String>) {
        let name = name.into();
        events::emit(context, *self, |_, _| Event::TransformStart { name });
    }

    // --- type rewriting --------------------------------------------------

    /// Rewrite every type annotation carried by this function: argument
    /// types, the return type, and instruction result types.
    pub fn replace_type_with(&self, context: &mut Context, from: Type, to: Type) {
        let return_type = self.return_type(context).replace_type_with(context, from, to);
        context.functions[self.0].return_type = return_type;

        for argument in self.arguments(context) {
            let ty = argument.ty(context).replace_type_with(context, from, to);
            context.values[argument.0].ty = ty;
        }
        for insn in self.instructions(context) {
            let ty = insn.ty(context).replace_type_with(context, from, to);
            context.values[insn.0].ty = ty;
        }
    }

    // --- deep clone ------------------------------------------------------

    /// Deep-clone this function: a fresh value-identity graph with the same
    /// structure. Intra-function references are rewritten to the clones;
    /// constants and types are shared by identity. The clone's name is its
    /// `original_name` and it carries no instrumentation.
    pub fn dup(&self, context: &mut Context) -> Function {
        let original_name = self.original_name(context).to_string();
        debug!("duplicating function {}", self.name(context));

        let clone = Function::new(context, original_name);
        let return_type = self.return_type(context);
        context.functions[clone.0].return_type = return_type;

        let mut map: HashMap<Value, Value> = HashMap::new();

        for argument in self.arguments(context) {
            let ty = argument.ty(context);
            let name = argument
                .name(context)
                .map(|name| name.to_string())
                .unwrap_or_default();
            let name = clone.make_name(context, Some(&name));
            let cloned = Value(context.values.insert(ValueContent {
                ty,
                uses: Vec::new(),
                datum: ValueDatum::Argument(ArgumentContent {
                    function: clone,
                    name,
                }),
            }));
            context.functions[clone.0].arguments.push(cloned);
            map.insert(argument, cloned);
        }

        for block in self.blocks(context) {
            let name = block.name(context).to_string();
            let cloned_block = Block::new(context, clone, Some(&name));
            map.insert(block.to_value(), cloned_block.to_value());

            for insn in block.instructions(context) {
                let (class, params, ty, name) = {
                    let content = &context.values[insn.0];
                    match &content.datum {
                        ValueDatum::Instruction(content_insn) => (
                            std::sync::Arc::clone(&content_insn.class),
                            content_insn.params.clone(),
                            content.ty,
                            content_insn.name.clone(),
                        ),
                        _ => continue,
                    }
                };
                let empty = if class.is_phi() {
                    Operands::Phi(Vec::new())
                } else {
                    Operands::List(Default::default())
                };
                let cloned_insn = instruction::new_instruction_raw(
                    context,
                    clone,
                    class,
                    empty,
                    params,
                    ty,
                    Some(&name),
                );
                cloned_block.append(context, cloned_insn);
                map.insert(insn, cloned_insn);
            }
        }

        // Second pass: rewrite operands, substituting clones for
        // intra-function values and reusing everything else by identity.
        for block in self.blocks(context) {
            for insn in block.instructions(context) {
                let cloned_insn = map[&insn];
                let operands = {
                    match &context.values[insn.0].datum {
                        ValueDatum::Instruction(content_insn) => match &content_insn.operands {
                            Operands::List(list) => Operands::List(
                                list.iter()
                                    .map(|operand| *map.get(operand).unwrap_or(operand))
                                    .collect(),
                            ),
                            Operands::Phi(pairs) => Operands::Phi(
                                pairs
                                    .iter()
                                    .map(|(from, value)| {
                                        let from = map
                                            .get(&from.to_value())
                                            .map(|v| Block(*v))
                                            .unwrap_or(*from);
                                        let value = *map.get(value).unwrap_or(value);
                                        (from, value)
                                    })
                                    .collect(),
                            ),
                        },
                        _ => continue,
                    }
                };
                instruction::set_operands_raw(context, cloned_insn, operands);
            }
        }

        if let Some(entry) = self.entry(context) {
            if let Some(cloned_entry) = map.get(&entry.to_value()) {
                context.functions[clone.0].entry = Some(Block(*cloned_entry));
            }
        }
        clone
    }

    // --- verification ----------------------------------------------------

    /// Validate structural well-formedness: termination discipline, operand
    /// locality, def-use bijection, and name uniqueness.
    pub fn verify(&self, context: &Context) -> std::result::Result<(), String> {
        let mut names = HashSet::new();
        for argument in self.arguments(context) {
            let name = argument.name(context).unwrap_or_default().to_string();
            if !names.insert(name.clone()) {
                return Err(format!("duplicate name: {}", name));
            }
        }

        for block in self.blocks(context) {
            if !names.insert(block.name(context).to_string()) {
                return Err(format!("duplicate name: {}", block.name(context)));
            }
            let instructions = block.instructions(context);
            match instructions.last() {
                Some(last) if last.is_terminator(context) => {}
                _ => {
                    return Err(format!(
                        "block {} is not terminated",
                        block.name(context)
                    ))
                }
            }
            for insn in &instructions[..instructions.len() - 1] {
                if insn.is_terminator(context) {
                    return Err(format!(
                        "terminator {} in the middle of block {}",
                        insn.name(context).unwrap_or_default(),
                        block.name(context)
                    ));
                }
            }

            for insn in &instructions {
                let name = insn.name(context).unwrap_or_default().to_string();
                if !names.insert(name.clone()) {
                    return Err(format!("duplicate name: {}", name));
                }
                for operand in insn.operands(context) {
                    if !operand.is_constant_value(context)
                        && operand.function(context) != Some(*self)
                    {
                        return Err(format!(
                            "operand of {} does not belong to this function",
                            name
                        ));
                    }
                    let forward = insn
                        .operands(context)
                        .iter()
                        .filter(|o| **o == operand)
                        .count();
                    let backward = operand
                        .uses(context)
                        .iter()
                        .filter(|u| **u == *insn)
                        .count();
                    if forward != backward {
                        return Err(format!(
                            "def-use mismatch between {} and its operand",
                            name
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    // --- rendering -------------------------------------------------------

    /// Render the function: signature line, blocks separated by blank
    /// lines, closing brace.
    pub fn pretty_print(&self, context: &Context, p: &mut PrettyPrinter) {
        p.keyword("function");
        self.return_type(context).pretty_print(context, p);
        p.text(format!("{}(", self.name(context)));
        let arguments = self.arguments(context);
        for (i, argument) in arguments.iter().enumerate() {
            argument.pretty_print(context, p);
            if i + 1 < arguments.len() {
                p.append(",");
            }
        }
        p.text(")");
        p.text("{");
        p.newline();
        let blocks = self.blocks(context);
        for (i, block) in blocks.iter().enumerate() {
            block.pretty_print(context, p);
            if i + 1 < blocks.len() {
                p.newline();
            }
        }
        p.text("}");
    }

    pub fn to_ir_string(&self, context: &Context) -> String {
        let mut p = PrettyPrinter::new();
        self.pretty_print(context, &mut p);
        p.finish()
    }
}
