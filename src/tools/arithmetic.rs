/// Arithmetic Tools
///
/// Placeholder payloads for the registry: each handler is a plain function
/// wrapped in `tool!`, so it stays directly callable and also yields a
/// registrable `Tool` handle. `register` shows the three registration shapes.

use serde_json::{Value, json};

use crate::core::error::RegistryError;
use crate::core::registry::{ToolOptions, ToolRegistry};

crate::tool! {
    /// Add two numbers and return the sum.
    pub fn add(a: i64, b: i64) -> Result<Value, String> {
        let sum = a.checked_add(b).ok_or_else(|| overflow("add", a, b))?;
        Ok(json!({ "sum": sum }))
    }
}

crate::tool! {
    /// Multiply two numbers and return the product.
    pub fn multiply(a: i64, b: i64) -> Result<Value, String> {
        let product = a.checked_mul(b).ok_or_else(|| overflow("multiply", a, b))?;
        Ok(json!({ "product": product }))
    }
}

crate::tool! {
    /// Subtract two numbers and return the difference.
    pub fn subtract(a: i64, b: i64) -> Result<Value, String> {
        let difference = a.checked_sub(b).ok_or_else(|| overflow("subtract", a, b))?;
        Ok(json!({ "difference": difference }))
    }
}

crate::tool! {
    /// Divide two numbers.
    pub fn divide(a: i64, b: i64) -> Value {
        if b == 0 {
            return json!({ "error": "Division by zero" });
        }
        json!({ "quotient": a as f64 / b as f64 })
    }
}

crate::tool! {
    /// HTTP endpoint that also works as an MCP tool.
    pub fn multiply_endpoint(a: i64, b: i64) -> Result<Value, String> {
        multiply(a, b)
    }
}

fn overflow(op: &str, a: i64, b: i64) -> String {
    format!("integer overflow: cannot {} {} and {}", op, a, b)
}

/// Register every arithmetic tool.
pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    // decorator
    add::register(registry)?;

    // direct call
    registry.tool(multiply::Tool)?;

    // deferred call
    registry.tool_with(ToolOptions::new())(subtract::Tool)?;
    registry.tool_with(ToolOptions::new())(divide::Tool)?;

    // route handler doubling as a tool
    registry.tool(multiply_endpoint::Tool)?;

    Ok(())
}
