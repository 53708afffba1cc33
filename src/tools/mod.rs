/// Tools Module
///
/// Tool implementations. Each tool module exports a `register` function that
/// adds its tools to the registry during server initialization.

pub mod arithmetic;

use crate::core::error::RegistryError;
use crate::core::registry::{DuplicatePolicy, ToolRegistry};

/// Build the registry with every available tool.
///
/// Called once at startup; the caller shares the result read-only.
pub fn initialize_tools(policy: DuplicatePolicy) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::with_policy(policy);

    // Add new tool registrations here:
    // your_tool::register(&mut registry)?;
    arithmetic::register(&mut registry)?;

    tracing::info!(tools = registry.len(), "tool registry initialized");
    Ok(registry)
}
