//! Instrumentation event stream
//!
//! When a function is instrumented, every mutation of observable IR state
//! appends a record to an ordered, append-only log. The log linearizes
//! object mutations into a script an external visualizer can replay:
//! an instruction's `update_instruction` (operands and type) always
//! precedes its `add_instruction` (placement), so replayers construct
//! fully-formed instructions before linking them into blocks.
//!
//! Types are interned on first sight and assigned sequential integer ids;
//! every later reference uses the id.

use indexmap::IndexMap;
use serde::Serialize;

use crate::context::Context;
use crate::function::Function;
use crate::types::{Type, TypeContent};
use crate::value::{Value, ValueDatum};

/// One mutation record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SetArguments {
        arguments: Vec<ArgumentDecl>,
    },
    SetReturnType {
        return_type: u32,
    },
    Type {
        id: u32,
        kind: String,
        name: String,
    },
    AddBasicBlock {
        name: String,
    },
    RemoveBasicBlock {
        name: String,
    },
    UpdateInstruction {
        name: String,
        opcode: String,
        parameters: String,
        operands: Vec<OperandRef>,
        #[serde(rename = "type")]
        ty: u32,
    },
    AddInstruction {
        name: String,
        basic_block: String,
        index: usize,
    },
    RemoveInstruction {
        name: String,
    },
    RenameInstruction {
        name: String,
        new_name: String,
    },
    TransformStart {
        name: String,
    },
}

/// An argument declaration inside `set_arguments`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArgumentDecl {
    pub kind: &'static str,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: u32,
}

/// An operand reference inside `update_instruction`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperandRef {
    Constant {
        #[serde(rename = "type")]
        ty: u32,
        value: String,
    },
    Instruction {
        name: String,
    },
    BasicBlock {
        name: String,
    },
    Argument {
        name: String,
    },
}

/// The per-function mutation log.
pub struct EventStream {
    events: Vec<Event>,
    type_ids: IndexMap<Type, ()>,
}

impl EventStream {
    pub fn new() -> EventStream {
        EventStream {
            events: Vec::new(),
            type_ids: IndexMap::new(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.events).expect("event stream serializes")
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Intern a type, emitting its `type` record on first sight.
    pub(crate) fn type_id(&mut self, context: &Context, ty: Type) -> u32 {
        if let Some(index) = self.type_ids.get_index_of(&ty) {
            return index as u32;
        }
        let (index, _) = self.type_ids.insert_full(ty, ());
        let id = index as u32;
        let kind = match ty.content(context) {
            TypeContent::Composite { .. } => "composite",
            _ => "monotype",
        };
        self.events.push(Event::Type {
            id,
            kind: kind.to_string(),
            name: ty.name(context),
        });
        id
    }

    pub(crate) fn encode_operand(&mut self, context: &Context, operand: Value) -> OperandRef {
        match &context.values[operand.0].datum {
            ValueDatum::Constant(value) => OperandRef::Constant {
                ty: self.type_id(context, operand.ty(context)),
                value: value.to_string(),
            },
            ValueDatum::Argument(argument) => OperandRef::Argument {
                name: argument.name.clone(),
            },
            ValueDatum::Block(block) => OperandRef::BasicBlock {
                name: block.name.clone(),
            },
            ValueDatum::Instruction(insn) => OperandRef::Instruction {
                name: insn.name.clone(),
            },
        }
    }

    fn encode_update(&mut self, context: &Context, insn: Value) -> Event {
        let (name, opcode, parameters, operands) = match &context.values[insn.0].datum {
            ValueDatum::Instruction(content) => (
                content.name.clone(),
                content.class.opcode.clone(),
                content
                    .params
                    .iter()
                    .map(|param| param.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                content.expanded_operands(),
            ),
            _ => panic!("not an instruction value"),
        };
        let operands = operands
            .into_iter()
            .map(|operand| self.encode_operand(context, operand))
            .collect();
        let ty = self.type_id(context, insn.ty(context));
        Event::UpdateInstruction {
            name,
            opcode,
            parameters,
            operands,
            ty,
        }
    }
}

impl Default for EventStream {
    fn default() -> Self {
        EventStream::new()
    }
}

// --- emission hooks -----------------------------------------------------
//
// Mutation sites call these with the owning function; they are no-ops for
// uninstrumented functions. The stream is detached from the function for
// the duration of the callback so it can read the context while encoding.

pub(crate) fn emit(
    context: &mut Context,
    function: Function,
    f: impl FnOnce(&mut EventStream, &Context) -> Event,
) {
    if let Some(mut stream) = context.functions[function.0].events.take() {
        let event = f(&mut stream, context);
        stream.push(event);
        context.functions[function.0].events = Some(stream);
    }
}

pub(crate) fn emit_update(context: &mut Context, function: Function, insn: Value) {
    emit(context, function, |stream, context| {
        stream.encode_update(context, insn)
    });
}

pub(crate) fn emit_add_instruction(
    context: &mut Context,
    function: Function,
    insn: Value,
    basic_block: String,
    index: usize,
) {
    emit(context, function, |_, context| Event::AddInstruction {
        name: insn.name(context).unwrap_or_default().to_string(),
        basic_block,
        index,
    });
}

pub(crate) fn emit_remove_instruction(context: &mut Context, function: Function, insn: Value) {
    emit(context, function, |_, context| Event::RemoveInstruction {
        name: insn.name(context).unwrap_or_default().to_string(),
    });
}

pub(crate) fn emit_rename(context: &mut Context, function: Function, old: &str, new: &str) {
    let (old, new) = (old.to_string(), new.to_string());
    emit(context, function, |_, _| Event::RenameInstruction {
        name: old,
        new_name: new,
    });
}

pub(crate) fn emit_add_block(context: &mut Context, function: Function, name: &str) {
    let name = name.to_string();
    emit(context, function, |_, _| Event::AddBasicBlock { name });
}

pub(crate) fn emit_remove_block(context: &mut Context, function: Function, name: &str) {
    let name = name.to_string();
    emit(context, function, |_, _| Event::RemoveBasicBlock { name });
}

pub(crate) fn emit_set_arguments(context: &mut Context, function: Function) {
    emit(context, function, |stream, context| {
        let arguments = context.functions[function.0]
            .arguments
            .iter()
            .map(|argument| ArgumentDecl {
                kind: "argument",
                name: argument.name(context).unwrap_or_default().to_string(),
                ty: stream.type_id(context, argument.ty(context)),
            })
            .collect();
        Event::SetArguments { arguments }
    });
}

pub(crate) fn emit_set_return_type(context: &mut Context, function: Function, ty: Type) {
    emit(context, function, |stream, context| Event::SetReturnType {
        return_type: stream.type_id(context, ty),
    });
}
