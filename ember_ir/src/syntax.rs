//! Declarative operand schemas
//!
//! An instruction class declares the shape of its operand list as a sequence
//! of named slots. A plain slot binds exactly one operand and may constrain
//! its type; a splat slot binds the remaining tail and must come last.
//! Construction and mutation validate operand lists against the schema.

use crate::context::Context;
use crate::error::{IrError, Result};
use crate::types::Type;
use crate::value::Value;

/// One named operand slot.
#[derive(Clone, Debug)]
pub enum Slot {
    /// Exactly one operand, optionally constrained to a required type.
    Operand { name: String, ty: Option<Type> },
    /// Zero or more trailing operands.
    Splat { name: String },
}

impl Slot {
    pub fn operand(name: impl Into<String>) -> Slot {
        Slot::Operand {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed_operand(name: impl Into<String>, ty: Type) -> Slot {
        Slot::Operand {
            name: name.into(),
            ty: Some(ty),
        }
    }

    pub fn splat(name: impl Into<String>) -> Slot {
        Slot::Splat { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Slot::Operand { name, .. } => name,
            Slot::Splat { name } => name,
        }
    }
}

/// The operand schema of an instruction class.
#[derive(Clone, Debug)]
pub struct Syntax {
    slots: Vec<Slot>,
}

impl Syntax {
    /// An empty schema: no operands.
    pub fn empty() -> Syntax {
        Syntax { slots: Vec::new() }
    }

    /// Build a schema, rejecting ill-formed declarations: at most one splat,
    /// and only in the last position.
    pub fn new(class: &str, slots: Vec<Slot>) -> Result<Syntax> {
        let splats = slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Splat { .. }))
            .count();
        if splats > 1 {
            return Err(IrError::Schema {
                class: class.to_string(),
                reason: "more than one splat slot".to_string(),
            });
        }
        if splats == 1 && !matches!(slots.last(), Some(Slot::Splat { .. })) {
            return Err(IrError::Schema {
                class: class.to_string(),
                reason: "splat slot must come last".to_string(),
            });
        }
        Ok(Syntax { slots })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn has_splat(&self) -> bool {
        matches!(self.slots.last(), Some(Slot::Splat { .. }))
    }

    /// Number of operands bound by plain slots.
    pub fn fixed_arity(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Operand { .. }))
            .count()
    }

    /// Position of a named slot. The second component is true for splats.
    pub(crate) fn position_of(&self, name: &str) -> Option<(usize, bool)> {
        self.slots
            .iter()
            .position(|slot| slot.name() == name)
            .map(|i| (i, matches!(self.slots[i], Slot::Splat { .. })))
    }

    /// Validate an operand list against this schema, reporting the first
    /// arity or type violation.
    pub fn check(&self, context: &Context, opcode: &str, operands: &[Value]) -> Result<()> {
        let fixed = self.fixed_arity();
        let ok = if self.has_splat() {
            operands.len() >= fixed
        } else {
            operands.len() == fixed
        };
        if !ok {
            return Err(IrError::Arity {
                opcode: opcode.to_string(),
                expected: if self.has_splat() {
                    format!("at least {}", fixed)
                } else {
                    format!("exactly {}", fixed)
                },
                actual: operands.len(),
            });
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if let Slot::Operand {
                name,
                ty: Some(required),
            } = slot
            {
                let actual = operands[i].ty(context);
                if actual.to_type() != required.to_type() {
                    return Err(IrError::TypeMismatch {
                        opcode: opcode.to_string(),
                        slot: name.clone(),
                        expected: required.display(context),
                        actual: actual.display(context),
                    });
                }
            }
        }
        Ok(())
    }

    /// Re-run the checks without failing: the name of the first slot whose
    /// operand is missing or ill-typed, if any.
    pub fn first_invalid(&self, context: &Context, operands: &[Value]) -> Option<String> {
        for (i, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Operand { name, ty } => {
                    let operand = match operands.get(i) {
                        Some(operand) => *operand,
                        None => return Some(name.clone()),
                    };
                    if let Some(required) = ty {
                        if operand.ty(context).to_type() != required.to_type() {
                            return Some(name.clone());
                        }
                    }
                }
                Slot::Splat { .. } => return None,
            }
        }
        if operands.len() > self.slots.len() && !self.has_splat() {
            return Some(
                self.slots
                    .last()
                    .map(|slot| slot.name().to_string())
                    .unwrap_or_else(|| "operands".to_string()),
            );
        }
        None
    }
}
