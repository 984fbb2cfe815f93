//! Modules: named collections of functions
//!
//! A module keys functions by name and disambiguates collisions by
//! appending `;N` suffixes, preserving each function's `original_name`.

use log::debug;

use crate::context::Context;
use crate::error::{IrError, Result};
use crate::function::Function;
use crate::printer::PrettyPrinter;

pub struct Module {
    name: String,
    functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Add a function, renaming it when its name is already in use. An
    /// explicit prefix renames the function on insertion before
    /// disambiguation. Returns the function handle with its final name
    /// applied.
    pub fn add(
        &mut self,
        context: &mut Context,
        function: Function,
        prefix: Option<&str>,
    ) -> Function {
        let requested = match prefix {
            Some(prefix) => format!("{}.{}", prefix, function.name(context)),
            None => function.name(context).to_string(),
        };
        let assigned = self.disambiguate(context, &requested);
        if assigned != requested {
            debug!("module {}: renaming {} to {}", self.name, requested, assigned);
        }
        function.set_name(context, assigned);
        self.functions.push(function);
        function
    }

    /// Find the smallest free name: the requested name itself when unused,
    /// otherwise `base;N` with the smallest N >= 1, where `base` is the
    /// requested name with any existing `;N` suffix stripped.
    fn disambiguate(&self, context: &Context, requested: &str) -> String {
        if !self.contains_name(context, requested) {
            return requested.to_string();
        }
        let base = match requested.rfind(';') {
            Some(i)
                if !requested[i + 1..].is_empty()
                    && requested[i + 1..].chars().all(|c| c.is_ascii_digit()) =>
            {
                &requested[..i]
            }
            _ => requested,
        };
        let mut n = 1;
        loop {
            let candidate = format!("{};{}", base, n);
            if !self.contains_name(context, &candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn contains_name(&self, context: &Context, name: &str) -> bool {
        self.functions
            .iter()
            .any(|function| function.name(context) == name)
    }

    /// Look a function up by its module-facing name.
    pub fn find(&self, context: &Context, name: &str) -> Result<Function> {
        self.functions
            .iter()
            .find(|function| function.name(context) == name)
            .copied()
            .ok_or_else(|| IrError::NotFound {
                kind: "function",
                name: name.to_string(),
            })
    }

    /// Remove a function by name, returning its handle.
    pub fn remove(&mut self, context: &Context, name: &str) -> Result<Function> {
        let position = self
            .functions
            .iter()
            .position(|function| function.name(context) == name)
            .ok_or_else(|| IrError::NotFound {
                kind: "function",
                name: name.to_string(),
            })?;
        Ok(self.functions.remove(position))
    }

    /// Remove a function by handle.
    pub fn remove_function(&mut self, context: &Context, function: Function) -> Result<()> {
        let position = self
            .functions
            .iter()
            .position(|f| *f == function)
            .ok_or_else(|| IrError::NotFound {
                kind: "function",
                name: function.name(context).to_string(),
            })?;
        self.functions.remove(position);
        Ok(())
    }

    /// Aggregate the event streams of all instrumented functions into one
    /// JSON object keyed by function name.
    pub fn instrumentation(&self, context: &Context) -> serde_json::Value {
        let mut aggregated = serde_json::Map::new();
        for function in &self.functions {
            if let Some(stream) = function.events(context) {
                aggregated.insert(function.name(context).to_string(), stream.to_json());
            }
        }
        serde_json::Value::Object(aggregated)
    }

    /// Validate every function in the module.
    pub fn verify(&self, context: &Context) -> std::result::Result<(), String> {
        for function in &self.functions {
            function
                .verify(context)
                .map_err(|e| format!("function {}: {}", function.name(context), e))?;
        }
        Ok(())
    }

    pub fn pretty_print(&self, context: &Context, p: &mut PrettyPrinter) {
        for (i, function) in self.functions.iter().enumerate() {
            function.pretty_print(context, p);
            p.newline();
            if i + 1 < self.functions.len() {
                p.newline();
            }
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

    #[test]
    fn test_name_disambiguation() {
        let mut context = Context::new();
        let mut module = Module::new("main");

        let f1 = Function::new(&mut context, "foo");
        let f2 = Function::new(&mut context, "foo");
        let f3 = Function::new(&mut context, "foo;1");
        module.add(&mut context, f1, None);
        module.add(&mut context, f2, None);
        module.add(&mut context, f3, None);

        assert_eq!(f1.name(&context), "foo");
        assert_eq!(f2.name(&context), "foo;1");
        assert_eq!(f3.name(&context), "foo;2");
        assert_eq!(f1.original_name(&context), "foo");
        assert_eq!(f2.original_name(&context), "foo");
        assert_eq!(f3.original_name(&context), "foo;1");
    }

    #[test]
    fn test_add_with_prefix() {
        let mut context = Context::new();
        let mut module = Module::new("main");
        let function = Function::new(&mut context, "bar");
        module.add(&mut context, function, Some("outer"));
        assert_eq!(function.name(&context), "outer.bar");
        assert_eq!(function.original_name(&context), "bar");
    }

    #[test]
    fn test_find_and_remove() {
        let mut context = Context::new();
        let mut module = Module::new("main");
        let function = Function::new(&mut context, "foo");
        module.add(&mut context, function, None);

        assert_eq!(module.find(&context, "foo").unwrap(), function);
        assert!(matches!(
            module.find(&context, "bar"),
            Err(IrError::NotFound { .. })
        ));

        let removed = module.remove(&context, "foo").unwrap();
        assert_eq!(removed, function);
        assert_eq!(module.function_count(), 0);
        assert!(matches!(
            module.remove(&context, "foo"),
            Err(IrError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_by_handle() {
        let mut context = Context::new();
        let mut module = Module::new("main");
        let function = Function::new(&mut context, "foo");
        module.add(&mut context, function, None);

        module.remove_function(&context, function).unwrap();
        assert!(matches!(
            module.remove_function(&context, function),
            Err(IrError::NotFound { .. })
        ));
    }
}
