//! Modules served by the local deployment.

use serde_json::{Number, Value};

use crate::{
    handlers::{HandlerCatalog, InvocationError, LocalFunction},
    params::Params,
    registry::ModuleDescriptor,
    schema::{ParamKind, ParamSchema, ParamSpec},
};

/// The handler table behind [`modules`].
pub fn catalog() -> anyhow::Result<HandlerCatalog> {
    let mut catalog = HandlerCatalog::new();
    catalog
        .register("math", "add", binary(|a, b| a.checked_add(b), |a, b| a + b))?
        .register(
            "math",
            "subtract",
            binary(|a, b| a.checked_sub(b), |a, b| a - b),
        )?
        .register(
            "math",
            "multiply",
            binary(|a, b| a.checked_mul(b), |a, b| a * b),
        )?
        .register("math", "divide", divide())?
        .register("text", "echo", echo())?;
    Ok(catalog)
}

/// Registered modules, in listing order.
pub fn modules() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::local("add", "Add two numbers: a + b", "math:add"),
        ModuleDescriptor::local("subtract", "Subtract two numbers: a - b", "math:subtract"),
        ModuleDescriptor::local("multiply", "Multiply two numbers: a * b", "math:multiply"),
        ModuleDescriptor::local("divide", "Divide two numbers: a / b", "math:divide"),
        ModuleDescriptor::local(
            "echo",
            "Return `message`, upper-cased when `upper` is true",
            "text:echo",
        ),
    ]
}

fn operands() -> ParamSchema {
    ParamSchema::new([
        ParamSpec::required("a", ParamKind::Number),
        ParamSpec::required("b", ParamKind::Number),
    ])
}

fn number<'a>(params: &'a Params, name: &str) -> Result<&'a Number, InvocationError> {
    params
        .get(name)
        .and_then(|v| v.as_number())
        .ok_or_else(|| InvocationError::new(format!("parameter '{name}' must be a number")))
}

fn float_value(v: f64) -> Result<Value, InvocationError> {
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| InvocationError::new("result is not a finite number"))
}

/// Integer math when both operands are integers and the result fits, `f64` otherwise.
fn arith(
    a: &Number,
    b: &Number,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, InvocationError> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(out) = int_op(x, y) {
            return Ok(Value::from(out));
        }
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => float_value(float_op(x, y)),
        _ => Err(InvocationError::new("operands are not representable as f64")),
    }
}

fn binary(
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> LocalFunction {
    LocalFunction::sync(operands(), move |params| {
        arith(number(params, "a")?, number(params, "b")?, int_op, float_op)
    })
}

fn divide() -> LocalFunction {
    LocalFunction::sync(operands(), |params| {
        let a = number(params, "a")?;
        let b = number(params, "b")?;
        if b.as_f64() == Some(0.0) {
            return Err(InvocationError::new("division by zero"));
        }
        arith(
            a,
            b,
            |x, y| match x.checked_rem(y) {
                Some(0) => x.checked_div(y),
                _ => None,
            },
            |x, y| x / y,
        )
    })
}

fn echo() -> LocalFunction {
    let schema = ParamSchema::new([
        ParamSpec::required("message", ParamKind::String),
        ParamSpec::optional("upper", ParamKind::Boolean),
    ]);
    LocalFunction::sync(schema, |params| {
        let message = params
            .get("message")
            .and_then(|v| v.as_str())
            .ok_or_else(|| InvocationError::new("parameter 'message' must be a string"))?;
        let upper = params
            .get("upper")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(Value::String(if upper {
            message.to_uppercase()
        } else {
            message.to_string()
        }))
    })
}
