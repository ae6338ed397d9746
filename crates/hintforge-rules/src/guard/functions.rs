//! Guard function registry and evaluation

use std::collections::HashMap;

use thiserror::Error;

use super::builtins;
use super::expr::GuardExpression;
use crate::binding::BindingContext;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("unknown guard function '{name}'")]
    UnknownFunction { name: String },
}

/// A named predicate over bindings and raw argument strings
pub trait GuardFunction: Send + Sync {
    fn call(&self, ctx: &BindingContext<'_>, args: &[String]) -> bool;
}

impl<F> GuardFunction for F
where
    F: Fn(&BindingContext<'_>, &[String]) -> bool + Send + Sync,
{
    fn call(&self, ctx: &BindingContext<'_>, args: &[String]) -> bool {
        self(ctx, args)
    }
}

/// Name to predicate table, built once by the host and passed by reference
#[derive(Default)]
pub struct GuardRegistry {
    functions: HashMap<String, Box<dyn GuardFunction>>,
}

impl GuardRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with every built-in guard
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_all(&mut registry);
        registry
    }

    /// Register or replace a function
    pub fn register(&mut self, name: impl Into<String>, function: impl GuardFunction + 'static) {
        self.functions.insert(name.into(), Box::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&dyn GuardFunction> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Function names in `expr` this registry cannot resolve
    pub fn unknown_functions<'e>(&self, expr: &'e GuardExpression) -> Vec<&'e str> {
        expr.function_names()
            .into_iter()
            .filter(|name| !self.contains(name))
            .collect()
    }

    /// Evaluate a guard. `&&` and `||` short-circuit, so an unknown function
    /// on a branch that is never reached is not reported.
    pub fn evaluate(
        &self,
        expr: &GuardExpression,
        ctx: &BindingContext<'_>,
    ) -> Result<bool, GuardError> {
        match expr {
            GuardExpression::And { left, right } => {
                Ok(self.evaluate(left, ctx)? && self.evaluate(right, ctx)?)
            }
            GuardExpression::Or { left, right } => {
                Ok(self.evaluate(left, ctx)? || self.evaluate(right, ctx)?)
            }
            GuardExpression::Not { operand } => Ok(!self.evaluate(operand, ctx)?),
            GuardExpression::FunctionCall { name, args } => {
                let function = self.get(name).ok_or_else(|| GuardError::UnknownFunction {
                    name: name.clone(),
                })?;
                Ok(function.call(ctx, args))
            }
        }
    }
}

impl std::fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
