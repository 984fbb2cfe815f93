//! SSA intermediate representation for the Ember compiler middle-end
//!
//! This crate provides the in-memory IR a middle-end works on: modules of
//! functions, functions as control-flow graphs of basic blocks, and blocks
//! of typed instructions in SSA form. Def-use edges are maintained
//! bidirectionally on every mutation, instruction operand shapes are
//! described by declarative schemas, and instrumented functions emit a
//! structured mutation log suitable for replay in external visualizers.
//!
//! All entities live in a [`Context`] arena and are referenced through
//! cheap `Copy` handles, so passing values around never fights the borrow
//! checker; operations take the context explicitly.

pub mod block;
pub mod builder;
pub mod constant;
pub mod context;
pub mod error;
pub mod events;
pub mod function;
pub mod instruction;
pub mod module;
pub mod printer;
pub mod scope;
pub mod syntax;
pub mod types;
pub mod value;

pub use block::Block;
pub use builder::Builder;
pub use constant::ConstantValue;
pub use context::Context;
pub use error::{IrError, Result};
pub use events::{ArgumentDecl, Event, EventStream, OperandRef};
pub use function::Function;
pub use instruction::ParamValue;
pub use module::Module;
pub use printer::PrettyPrinter;
pub use scope::{class_to_opcode, opcode_to_class, InsnClass, InsnKind, Scope, TypeRule};
pub use syntax::{Slot, Syntax};
pub use types::{Type, TypeContent};
pub use value::Value;
