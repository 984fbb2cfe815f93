//! Shared fixtures for the integration tests: a context with a few
//! monotypes and a scope extended with the instruction classes the
//! scenarios use.

use ember_ir::{Context, InsnClass, Scope, Slot, Syntax, Type, TypeRule};

pub struct Fixture {
    pub context: Context,
    pub scope: Scope,
    pub int: Type,
    pub binding: Type,
    pub array: Type,
}

pub fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut context = Context::new();
    let int = Type::mono(&mut context, "Integer");
    let binding = Type::mono(&mut context, "Binding");
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
        "DerefInsn",
        Syntax::new("DerefInsn", vec![Slot::typed_operand("binding", binding)]).unwrap(),
        TypeRule::Bottom,
    ));
    scope.register(InsnClass::generic(
        "CastInsn",
        Syntax::new("CastInsn", vec![Slot::operand("value")]).unwrap(),
    ));

    Fixture {
        context,
        scope,
        int,
        binding,
        array,
    }
}
