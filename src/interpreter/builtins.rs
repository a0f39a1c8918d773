use crate::ast::Value;
use crate::error::RuntimeError;
use rand::Rng;
use rand::rngs::StdRng;

/// Calls `Math.<name>`.
pub(super) fn math(name: &str, args: &[Value], rng: &mut StdRng) -> Result<Value, RuntimeError> {
    let arg = |index: usize| args.get(index).map_or(f64::NAN, Value::to_number);
    let result = match name {
        "floor" => arg(0).floor(),
        "ceil" => arg(0).ceil(),
        "round" => js_round(arg(0)),
        "trunc" => arg(0).trunc(),
        "abs" => arg(0).abs(),
        "sqrt" => arg(0).sqrt(),
        "pow" => arg(0).powf(arg(1)),
        "random" => rng.random::<f64>(),
        "min" => fold_extreme(args, f64::INFINITY, f64::min),
        "max" => fold_extreme(args, f64::NEG_INFINITY, f64::max),
        other => {
            return Err(RuntimeError::Type(format!("Math.{other} is not a function")));
        }
    };
    Ok(Value::Number(result))
}

/// `Math.round` rounds halves towards positive infinity.
fn js_round(n: f64) -> f64 {
    if n.is_finite() { (n + 0.5).floor() } else { n }
}

fn fold_extreme(args: &[Value], initial: f64, pick: fn(f64, f64) -> f64) -> f64 {
    let mut result = initial;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        result = pick(result, n);
    }
    result
}

/// Reads the longest numeric prefix of the argument's text, ignoring leading
/// whitespace. `parseFloat("3.5kg")` is `3.5`; no numeric prefix gives `NaN`.
pub(super) fn parse_float(value: &Value) -> f64 {
    let text = value.to_string();
    let text = text.trim_start();
    let bytes = text.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if text[end..].starts_with("Infinity") {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut cursor = fraction_start;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        mantissa_digits += cursor - fraction_start;
        if mantissa_digits > 0 {
            end = cursor;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if cursor < bytes.len() && matches!(bytes[cursor], b'+' | b'-') {
            cursor += 1;
        }
        let exponent_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exponent_start {
            end = cursor;
        }
    }

    text[..end].parse().unwrap_or(f64::NAN)
}

/// `Number(value)`.
pub(super) fn to_number(args: &[Value]) -> Value {
    Value::Number(args.first().map_or(0.0, Value::to_number))
}

/// `String(value)`.
pub(super) fn to_string(args: &[Value]) -> Value {
    Value::Str(args.first().map(ToString::to_string).unwrap_or_default())
}

