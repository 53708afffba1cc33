/// Tool Registry
///
/// Maps tool names to descriptors (name, description, parameter schema and
/// handler). Tools are registered once at startup through `&mut ToolRegistry`
/// and the registry is then shared read-only, usually behind an `Arc`, with
/// whichever transport dispatches invocations.
///
/// There are three equivalent ways to register a handler, all of which end in
/// [`ToolRegistry::add_tool`]:
///
/// - decorator: wrap the function definition in [`tool!`](crate::tool) and
///   call the generated `register` hook
/// - direct call: `registry.tool(handler)`
/// - deferred call: `registry.tool_with(options)(handler)`

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::error::{InvokeError, RegistryError};

/// Primitive parameter types a tool may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamType {
    /// Resolve a declared type name, either a Rust primitive (`i64`, `f64`,
    /// `String`, `bool`, ...) or a JSON Schema name (`integer`, `number`, ...).
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared.trim() {
            "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize"
            | "integer" => Some(Self::Integer),
            "f32" | "f64" | "number" => Some(Self::Number),
            "String" | "string" => Some(Self::String),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// JSON Schema type name.
    pub fn json_type(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    /// Whether a JSON value is compatible with this type.
    pub fn accepts(self, value: &Value) -> bool {
        self.normalize(value).is_some()
    }

    /// Return the value in the form handlers extract, or `None` if it is not
    /// compatible. Integral floats such as `2.0` become integers.
    ///
    /// # Arguments
    /// * `value` - Raw argument value as received from the caller
    pub fn normalize(self, value: &Value) -> Option<Value> {
        match self {
            Self::Integer if value.is_i64() || value.is_u64() => Some(value.clone()),
            Self::Integer => value.as_f64().and_then(integral_value),
            Self::Number if value.is_number() => Some(value.clone()),
            Self::String if value.is_string() => Some(value.clone()),
            Self::Boolean if value.is_boolean() => Some(value.clone()),
            _ => None,
        }
    }

    /// Convert a raw string (e.g. an HTTP query parameter) into a JSON value
    /// of this type. Returns `None` when the text does not parse.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        match self {
            Self::Integer => {
                let raw = raw.trim();
                raw.parse::<i64>()
                    .map(Value::from)
                    .or_else(|_| raw.parse::<u64>().map(Value::from))
                    .ok()
            }
            Self::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            Self::String => Some(Value::String(raw.to_string())),
            Self::Boolean => raw.trim().parse::<bool>().ok().map(Value::Bool),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type())
    }
}

/// Convert an integral float to an integer JSON value, if it fits `i64` or
/// `u64` exactly.
fn integral_value(f: f64) -> Option<Value> {
    if f.fract() != 0.0 || !f.is_finite() {
        return None;
    }
    // 2^63 and 2^64 are exact in f64; the upper bounds are exclusive.
    if f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 {
        Some(Value::from(f as i64))
    } else if f >= 0.0 && f < 18_446_744_073_709_551_616.0 {
        Some(Value::from(f as u64))
    } else {
        None
    }
}

/// A named, typed tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    /// Parameter name, the key callers pass the argument under
    pub name: String,
    /// Primitive type the argument value must have
    #[serde(rename = "type")]
    pub ty: ParamType,
}

/// Invocation arguments keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Create an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments from a JSON value. `null` is treated as no arguments;
    /// anything other than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(format!("arguments must be an object, got {}", json_kind(&other))),
        }
    }

    /// Add or replace an argument, builder style.
    ///
    /// # Arguments
    /// * `name` - Parameter name the value is bound to
    /// * `value` - Anything convertible into a JSON value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Deserialize a single argument into `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, String> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| format!("missing required argument '{}'", name))?;
        T::deserialize(value).map_err(|e| format!("argument '{}': {}", name, e))
    }

    /// Borrow an argument's JSON value without converting it.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Iterate over the argument names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of arguments supplied.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A callable that can be registered as a tool.
///
/// The signature is declared statically as `(parameter, type name)` pairs and
/// is resolved to [`ParamType`]s when the tool is registered. Implementations
/// are normally generated by [`tool!`](crate::tool).
pub trait ToolFn: Send + Sync + 'static {
    /// Identifier the tool is registered under unless overridden.
    fn name(&self) -> &'static str;

    /// Raw documentation, used as the default description.
    fn doc(&self) -> &'static str {
        ""
    }

    /// Declared `(parameter, type name)` pairs in call order.
    fn signature(&self) -> &'static [(&'static str, &'static str)];

    /// Run the handler. Arguments have already been checked against the
    /// signature.
    fn call(&self, args: &Arguments) -> Result<Value, InvokeError>;
}

/// Conversion from a handler's return value into an invocation result.
pub trait IntoToolResult {
    fn into_tool_result(self) -> Result<Value, InvokeError>;
}

impl IntoToolResult for Value {
    fn into_tool_result(self) -> Result<Value, InvokeError> {
        Ok(self)
    }
}

impl<E: fmt::Display> IntoToolResult for Result<Value, E> {
    fn into_tool_result(self) -> Result<Value, InvokeError> {
        self.map_err(|e| InvokeError::Handler(e.to_string()))
    }
}

/// Overrides for the derived name and description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOptions {
    /// Registered name; defaults to the handler's identifier
    pub name: Option<String>,
    /// Description; defaults to the handler's doc comment
    pub description: Option<String>,
}

impl ToolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Metadata produced by registration. Immutable once created.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<Param>,
    handler: Arc<dyn ToolFn>,
}

impl ToolDescriptor {
    /// Unique tool name within the registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description, from the doc comment unless overridden.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters in call order.
    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    /// Look up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema for the tool's input, as advertised by `tools/list`.
    /// Every declared parameter is required.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), serde_json::json!({ "type": p.ty.json_type() })))
            .collect();
        let required: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check that argument names match the declared parameters exactly and
    /// that every value fits its primitive type, returning the arguments in
    /// normalized form.
    ///
    /// # Arguments
    /// * `args` - Arguments as received from the caller
    pub fn bind_arguments(&self, args: &Arguments) -> Result<Arguments, InvokeError> {
        let mut bound = Arguments::new();
        for param in &self.parameters {
            let Some(value) = args.raw(&param.name) else {
                return Err(self.mismatch(format!("missing required argument '{}'", param.name)));
            };
            let Some(normalized) = param.ty.normalize(value) else {
                return Err(self.mismatch(format!(
                    "argument '{}' expected {}, got {}",
                    param.name,
                    param.ty,
                    json_kind(value)
                )));
            };
            bound = bound.with(param.name.clone(), normalized);
        }

        if let Some(extra) = args.names().find(|name| self.param(name).is_none()) {
            return Err(self.mismatch(format!("unexpected argument '{}'", extra)));
        }

        Ok(bound)
    }

    /// Validate the arguments, then run the handler. The handler's return
    /// value is passed back as-is.
    pub fn invoke(&self, args: &Arguments) -> Result<Value, InvokeError> {
        let bound = self.bind_arguments(args)?;
        self.handler.call(&bound)
    }

    fn mismatch(&self, reason: String) -> InvokeError {
        InvokeError::ArgumentMismatch {
            tool: self.name.clone(),
            reason,
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// What happens when a tool is registered under a name that is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Last registration wins. The old entry is removed and the new one is
    /// appended, so it moves to the end of [`ToolRegistry::list`].
    #[default]
    Replace,
    /// Fail with [`RegistryError::DuplicateName`].
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "reject" => Ok(Self::Reject),
            _ => Err("expected 'replace' or 'reject'"),
        }
    }
}

/// Registry of available tools.
///
/// Keeps descriptors in registration order for listing and indexed by name
/// for invocation.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    policy: DuplicatePolicy,
    tools: Vec<Arc<ToolDescriptor>>,
    by_name: HashMap<String, Arc<ToolDescriptor>>,
}

impl ToolRegistry {
    /// Create an empty registry with the default (replace) duplicate policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with an explicit duplicate-name policy.
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Duplicate-name policy this registry was built with.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register a handler, deriving name, description and parameters from it
    /// unless `options` overrides them. A failed registration leaves the
    /// registry untouched.
    pub fn add_tool<H: ToolFn>(
        &mut self,
        handler: H,
        options: ToolOptions,
    ) -> Result<Arc<ToolDescriptor>, RegistryError> {
        let name = options.name.unwrap_or_else(|| handler.name().to_string());
        let description = options
            .description
            .unwrap_or_else(|| clean_doc(handler.doc()));

        let parameters = handler
            .signature()
            .iter()
            .map(|&(param, declared)| {
                ParamType::from_declared(declared)
                    .map(|ty| Param {
                        name: param.to_string(),
                        ty,
                    })
                    .ok_or_else(|| RegistryError::UnsupportedSignature {
                        tool: name.clone(),
                        param: param.to_string(),
                        declared: declared.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.by_name.contains_key(&name) {
            match self.policy {
                DuplicatePolicy::Reject => return Err(RegistryError::DuplicateName(name)),
                DuplicatePolicy::Replace => {
                    tracing::warn!(tool = %name, "replacing previously registered tool");
                    self.tools.retain(|d| d.name != name);
                }
            }
        }

        let descriptor = Arc::new(ToolDescriptor {
            name: name.clone(),
            description,
            parameters,
            handler: Arc::new(handler),
        });
        self.tools.push(Arc::clone(&descriptor));
        self.by_name.insert(name, Arc::clone(&descriptor));

        tracing::debug!(
            tool = %descriptor.name,
            params = descriptor.parameters.len(),
            "registered tool"
        );
        Ok(descriptor)
    }

    /// Direct-call registration with derived name and description.
    pub fn tool<H: ToolFn>(&mut self, handler: H) -> Result<Arc<ToolDescriptor>, RegistryError> {
        self.add_tool(handler, ToolOptions::default())
    }

    /// Deferred registration: returns a closure that registers whatever
    /// handler it is applied to, e.g. `registry.tool_with(options)(handler)`.
    pub fn tool_with<H: ToolFn>(
        &mut self,
        options: ToolOptions,
    ) -> impl FnOnce(H) -> Result<Arc<ToolDescriptor>, RegistryError> + '_ {
        move |handler| self.add_tool(handler, options)
    }

    /// Look up a tool and run it with arguments bound by name.
    pub fn invoke(&self, name: &str, args: &Arguments) -> Result<Value, InvokeError> {
        let descriptor = self
            .by_name
            .get(name)
            .ok_or_else(|| InvokeError::UnknownTool(name.to_string()))?;
        descriptor.invoke(args)
    }

    /// Snapshot of all descriptors in registration order.
    pub fn list(&self) -> Vec<Arc<ToolDescriptor>> {
        self.tools.clone()
    }

    /// Descriptor registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.by_name.get(name)
    }

    /// Whether a tool is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Normalize a doc comment: trim every line and drop leading and trailing
/// blank lines.
fn clean_doc(doc: &str) -> String {
    let lines: Vec<&str> = doc.lines().map(str::trim).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Define a function and turn it into a registrable tool.
///
/// The function is emitted unchanged and stays directly callable. Alongside it
/// a module of the same name holds a `Tool` handler, whose signature is the
/// function's `(parameter, type)` list and whose description is its doc
/// comment, plus a `register` hook that performs a direct-call registration.
///
/// ```ignore
/// crate::tool! {
///     /// Add two numbers and return the sum.
///     pub fn add(a: i64, b: i64) -> Value {
///         json!({ "sum": a + b })
///     }
/// }
///
/// add::register(&mut registry)?;
/// ```
///
/// The function may return either a `serde_json::Value` or a
/// `Result<Value, E>` where `E: Display`; an `Err` becomes
/// [`InvokeError::Handler`].
#[macro_export]
macro_rules! tool {
    (
        $(#[doc = $doc:literal])*
        $vis:vis fn $name:ident ( $($param:ident : $ty:ty),* $(,)? ) -> $ret:ty $body:block
    ) => {
        $(#[doc = $doc])*
        $vis fn $name($($param: $ty),*) -> $ret $body

        #[doc = concat!("Tool handle for [`", stringify!($name), "()`].")]
        $vis mod $name {
            #[allow(unused_imports)]
            use super::*;

            #[derive(Debug, Clone, Copy, Default)]
            pub struct Tool;

            impl $crate::core::registry::ToolFn for Tool {
                fn name(&self) -> &'static str {
                    stringify!($name)
                }

                fn doc(&self) -> &'static str {
                    concat!($($doc, "\n"),*)
                }

                fn signature(&self) -> &'static [(&'static str, &'static str)] {
                    &[$((stringify!($param), stringify!($ty))),*]
                }

                fn call(
                    &self,
                    args: &$crate::core::registry::Arguments,
                ) -> ::std::result::Result<::serde_json::Value, $crate::core::error::InvokeError> {
                    $(
                        let $param: $ty = args.get(stringify!($param)).map_err(|reason| {
                            $crate::core::error::InvokeError::ArgumentMismatch {
                                tool: stringify!($name).to_string(),
                                reason,
                            }
                        })?;
                    )*
                    $crate::core::registry::IntoToolResult::into_tool_result(super::$name($($param),*))
                }
            }

            /// Register this tool under its own name.
            pub fn register(
                registry: &mut $crate::core::registry::ToolRegistry,
            ) -> ::std::result::Result<
                ::std::sync::Arc<$crate::core::registry::ToolDescriptor>,
                $crate::core::error::RegistryError,
            > {
                registry.tool(Tool)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    crate::tool! {
        /// Add two numbers and return the sum.
        fn add(a: i64, b: i64) -> Value {
            json!({ "sum": a + b })
        }
    }

    crate::tool! {
        /// Divide two numbers.
        fn divide(a: i64, b: i64) -> Value {
            if b == 0 {
                return json!({ "error": "Division by zero" });
            }
            json!({ "quotient": a as f64 / b as f64 })
        }
    }

    crate::tool! {
        /// Shout a message.
        ///
        /// Upper-cases the input.
        fn shout(message: String, times: u32, loud: bool, scale: f64) -> Value {
            let text = if loud { message.to_uppercase() } else { message };
            json!({ "text": text.repeat(times as usize), "scale": scale })
        }
    }

    crate::tool! {
        /// Always fails.
        fn explode(reason: String) -> Result<Value, String> {
            Err(format!("boom: {}", reason))
        }
    }

    crate::tool! {
        fn total(values: Vec<i64>) -> Value {
            json!(values.iter().sum::<i64>())
        }
    }

    crate::tool! {
        /// Multiply two numbers.
        fn multiply(a: i64, b: i64) -> Value {
            json!({ "product": a * b })
        }
    }

    fn ab(a: impl Into<Value>, b: impl Into<Value>) -> Arguments {
        Arguments::new().with("a", a).with("b", b)
    }

    fn summary(d: &ToolDescriptor) -> (String, String, Vec<Param>) {
        (d.name().to_string(), d.description().to_string(), d.parameters().to_vec())
    }

    #[test]
    fn test_registration_shapes_are_equivalent() {
        let mut decorated = ToolRegistry::new();
        let mut direct = ToolRegistry::new();
        let mut deferred = ToolRegistry::new();

        let a = add::register(&mut decorated).unwrap();
        let b = direct.tool(add::Tool).unwrap();
        let c = deferred.tool_with(ToolOptions::new())(add::Tool).unwrap();

        assert_eq!(summary(&a), summary(&b));
        assert_eq!(summary(&b), summary(&c));
        assert_eq!(a.name(), "add");
        assert_eq!(a.description(), "Add two numbers and return the sum.");
        assert_eq!(
            a.parameters(),
            &[
                Param { name: "a".into(), ty: ParamType::Integer },
                Param { name: "b".into(), ty: ParamType::Integer },
            ]
        );
    }

    #[test]
    fn test_options_override_derived_metadata() {
        let mut registry = ToolRegistry::new();
        let d = registry
            .tool_with(ToolOptions::new().name("plus").description("Sum it."))(add::Tool)
            .unwrap();

        assert_eq!(d.name(), "plus");
        assert_eq!(d.description(), "Sum it.");
        assert!(registry.contains("plus"));
        assert!(!registry.contains("add"));
    }

    #[test]
    fn test_multiline_doc_is_cleaned() {
        let mut registry = ToolRegistry::new();
        let d = registry.tool(shout::Tool).unwrap();
        assert_eq!(d.description(), "Shout a message.\n\nUpper-cases the input.");
        let types: Vec<ParamType> = d.parameters().iter().map(|p| p.ty).collect();
        assert_eq!(
            types,
            vec![ParamType::String, ParamType::Integer, ParamType::Boolean, ParamType::Number]
        );
    }

    #[test]
    fn test_unsupported_signature_is_not_registered() {
        let mut registry = ToolRegistry::new();
        let err = registry.tool(total::Tool).unwrap_err();
        // Vec<i64> has no primitive mapping, so nothing is registered.
        assert!(matches!(
            err,
            RegistryError::UnsupportedSignature { ref tool, ref param, .. }
                if tool == "total" && param == "values"
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invoke_add_scenario() {
        let mut registry = ToolRegistry::new();
        add::register(&mut registry).unwrap();

        let result = registry.invoke("add", &ab(2, 3)).unwrap();
        assert_eq!(result, json!({ "sum": 5 }));
    }

    #[test]
    fn test_divide_by_zero_is_a_result_not_an_error() {
        let mut registry = ToolRegistry::new();
        registry.tool(divide::Tool).unwrap();

        assert_eq!(
            registry.invoke("divide", &ab(4, 0)).unwrap(),
            json!({ "error": "Division by zero" })
        );
        assert_eq!(registry.invoke("divide", &ab(9, 2)).unwrap(), json!({ "quotient": 4.5 }));
    }

    #[test]
    fn test_invoke_matches_direct_call() {
        let mut registry = ToolRegistry::new();
        registry.tool(shout::Tool).unwrap();
        let args = Arguments::new()
            .with("message", "hi")
            .with("times", 2)
            .with("loud", true)
            .with("scale", 1.5);

        assert_eq!(
            registry.invoke("shout", &args).unwrap(),
            shout("hi".to_string(), 2, true, 1.5)
        );
    }

    #[test]
    fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.invoke("add", &ab(1, 2)),
            Err(InvokeError::UnknownTool("add".to_string()))
        );
    }

    #[rstest]
    #[case::missing(Arguments::new().with("a", 1), "missing required argument 'b'")]
    #[case::wrong_type(ab(1, "two"), "argument 'b' expected integer, got string")]
    #[case::float_for_integer(ab(1.5, 2), "argument 'a' expected integer, got number")]
    #[case::extra(ab(1, 2).with("c", 3), "unexpected argument 'c'")]
    fn test_argument_mismatch(#[case] args: Arguments, #[case] reason: &str) {
        let mut registry = ToolRegistry::new();
        add::register(&mut registry).unwrap();

        assert_eq!(
            registry.invoke("add", &args),
            Err(InvokeError::ArgumentMismatch {
                tool: "add".to_string(),
                reason: reason.to_string(),
            })
        );
    }

    #[test]
    fn test_number_accepts_integers() {
        let mut registry = ToolRegistry::new();
        registry.tool(shout::Tool).unwrap();
        let args = Arguments::new()
            .with("message", "a")
            .with("times", 1)
            .with("loud", false)
            .with("scale", 3);

        assert_eq!(
            registry.invoke("shout", &args).unwrap(),
            json!({ "text": "a", "scale": 3.0 })
        );
    }

    #[test]
    fn test_integral_float_binds_as_integer() {
        let mut registry = ToolRegistry::new();
        add::register(&mut registry).unwrap();

        assert_eq!(registry.invoke("add", &ab(2.0, 3)).unwrap(), json!({ "sum": 5 }));
        assert_eq!(registry.invoke("add", &ab(-4.0, 1.0)).unwrap(), json!({ "sum": -3 }));
    }

    #[rstest]
    #[case(json!(2.0), Some(json!(2)))]
    #[case(json!(-7.0), Some(json!(-7)))]
    #[case(json!(1.0e19), Some(json!(10_000_000_000_000_000_000u64)))]
    #[case(json!(u64::MAX), Some(json!(u64::MAX)))]
    #[case(json!(2.5), None)]
    #[case(json!(1.0e20), None)]
    #[case(json!("2"), None)]
    fn test_integer_normalize(#[case] value: Value, #[case] expected: Option<Value>) {
        assert_eq!(ParamType::Integer.normalize(&value), expected);
    }

    #[test]
    fn test_handler_error_passes_through() {
        let mut registry = ToolRegistry::new();
        registry.tool(explode::Tool).unwrap();

        let err = registry
            .invoke("explode", &Arguments::new().with("reason", "fuse"))
            .unwrap_err();
        assert_eq!(err, InvokeError::Handler("boom: fuse".to_string()));
        assert_eq!(err.to_string(), "boom: fuse");
    }

    #[test]
    fn test_list_is_ordered_snapshot() {
        let mut registry = ToolRegistry::new();
        registry.tool(multiply::Tool).unwrap();
        add::register(&mut registry).unwrap();

        let snapshot = registry.list();
        registry.tool(divide::Tool).unwrap();

        let names: Vec<&str> = snapshot.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["multiply", "add"]);
        assert_eq!(registry.list().len(), 3);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_name_replaces_by_default() {
        let mut registry = ToolRegistry::new();
        add::register(&mut registry).unwrap();
        registry.tool(divide::Tool).unwrap();
        registry
            .tool_with(ToolOptions::new().name("add"))(multiply::Tool)
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.invoke("add", &ab(2, 3)).unwrap(), json!({ "product": 6 }));
        let names: Vec<String> = registry.list().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["divide", "add"]);
    }

    #[test]
    fn test_duplicate_name_rejected_under_reject_policy() {
        let mut registry = ToolRegistry::with_policy(DuplicatePolicy::Reject);
        add::register(&mut registry).unwrap();

        let err = registry
            .tool_with(ToolOptions::new().name("add"))(multiply::Tool)
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("add".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.invoke("add", &ab(2, 3)).unwrap(), json!({ "sum": 5 }));
    }

    #[test]
    fn test_input_schema() {
        let mut registry = ToolRegistry::new();
        let d = add::register(&mut registry).unwrap();

        assert_eq!(
            d.input_schema(),
            json!({
                "type": "object",
                "properties": {
                    "a": { "type": "integer" },
                    "b": { "type": "integer" }
                },
                "required": ["a", "b"]
            })
        );
    }

    #[rstest]
    #[case("i64", Some(ParamType::Integer))]
    #[case("usize", Some(ParamType::Integer))]
    #[case("f32", Some(ParamType::Number))]
    #[case("String", Some(ParamType::String))]
    #[case("boolean", Some(ParamType::Boolean))]
    #[case("Vec<i64>", None)]
    #[case("&str", None)]
    fn test_param_type_from_declared(#[case] declared: &str, #[case] expected: Option<ParamType>) {
        assert_eq!(ParamType::from_declared(declared), expected);
    }

    #[rstest]
    #[case(ParamType::Integer, "42", Some(json!(42)))]
    #[case(ParamType::Integer, "4.2", None)]
    #[case(ParamType::Integer, "18446744073709551615", Some(json!(u64::MAX)))]
    #[case(ParamType::Integer, "-9223372036854775808", Some(json!(i64::MIN)))]
    #[case(ParamType::Integer, "18446744073709551616", None)]
    #[case(ParamType::Number, "4.5", Some(json!(4.5)))]
    #[case(ParamType::Boolean, "true", Some(json!(true)))]
    #[case(ParamType::Boolean, "yes", None)]
    #[case(ParamType::String, "4", Some(json!("4")))]
    fn test_param_type_coerce(#[case] ty: ParamType, #[case] raw: &str, #[case] expected: Option<Value>) {
        assert_eq!(ty.coerce(raw), expected);
    }

    #[test]
    fn test_arguments_from_value() {
        assert_eq!(Arguments::from_value(Value::Null).unwrap().len(), 0);
        assert_eq!(Arguments::from_value(json!({ "a": 1 })).unwrap(), Arguments::new().with("a", 1));
        assert!(Arguments::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_duplicate_policy_from_str() {
        assert_eq!("Replace".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Replace));
        assert_eq!("reject".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Reject));
        assert!("ignore".parse::<DuplicatePolicy>().is_err());
    }
}
