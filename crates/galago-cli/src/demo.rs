//! Built-in demo function sets the CLI can run inference against.

use galago_engine::{FunctionUnderTest, InputParser, Value};

fn int_args(args: &[Value]) -> Result<Vec<i64>, String> {
    args.iter()
        .map(|v| v.as_i64().ok_or_else(|| format!("expected an integer, got {v}")))
        .collect()
}

fn int_binop(name: &str, f: fn(i64, i64) -> i64) -> FunctionUnderTest {
    FunctionUnderTest::new(name, 2, move |args| {
        let ints = int_args(args)?;
        Ok(Value::Int(f(ints[0], ints[1])))
    })
    .with_namespace("arith")
}

fn int_unop(name: &str, f: fn(i64) -> i64) -> FunctionUnderTest {
    FunctionUnderTest::new(name, 1, move |args| {
        let ints = int_args(args)?;
        Ok(Value::Int(f(ints[0])))
    })
    .with_namespace("arith")
}

/// Integer arithmetic: the classic inference targets.
pub(crate) fn arithmetic_functions() -> Vec<FunctionUnderTest> {
    vec![
        int_binop("add", |a, b| a.wrapping_add(b)),
        int_binop("subtract", |a, b| a.wrapping_sub(b)),
        int_binop("multiply", |a, b| a.wrapping_mul(b)),
        FunctionUnderTest::new("safe_div", 2, |args| {
            let ints = int_args(args)?;
            let (a, b) = (ints[0], ints[1]);
            if b == 0 {
                return Err("division by zero".into());
            }
            if a % b == 0 {
                Ok(Value::Int(a / b))
            } else {
                Ok(Value::Float(a as f64 / b as f64))
            }
        })
        .with_namespace("arith"),
        int_binop("min", |a, b| a.min(b)),
        int_binop("max", |a, b| a.max(b)),
        int_unop("negate", |a| a.wrapping_neg()),
        int_unop("absolute", |a| a.wrapping_abs()),
    ]
}

fn set_args(args: &[Value]) -> Result<Vec<Vec<Value>>, String> {
    args.iter()
        .map(|v| match v {
            Value::Set(items) => Ok(items.clone()),
            other => Err(format!("expected a set, got {other}")),
        })
        .collect()
}

fn set_binop(name: &str, f: fn(Vec<Value>, Vec<Value>) -> Vec<Value>) -> FunctionUnderTest {
    FunctionUnderTest::new(name, 2, move |args| {
        let mut sets = set_args(args)?;
        let b = sets.pop().unwrap_or_default();
        let a = sets.pop().unwrap_or_default();
        Ok(Value::set(f(a, b)))
    })
    .with_namespace("sets")
}

/// Set algebra over `{…}`-shaped inputs.
pub(crate) fn set_functions() -> Vec<FunctionUnderTest> {
    vec![
        set_binop("union", |a, b| {
            let mut out = a;
            out.extend(b);
            out
        }),
        set_binop("intersection", |a, b| {
            a.into_iter().filter(|v| b.contains(v)).collect()
        }),
        set_binop("difference", |a, b| {
            a.into_iter().filter(|v| !b.contains(v)).collect()
        }),
    ]
}

fn frame_prefix(len: usize) -> String {
    let mut out = String::with_capacity(2);
    out.push((((len >> 8) & 0xff) as u8) as char);
    out.push(((len & 0xff) as u8) as char);
    out
}

/// Length-prefixed frame codec: `encode` prepends a big-endian two-byte
/// length, `decode` strips and checks it.
pub(crate) fn codec_functions() -> Vec<FunctionUnderTest> {
    vec![
        FunctionUnderTest::new("encode", 1, |args| match &args[0] {
            Value::Str(payload) => Ok(Value::Str(format!(
                "{}{payload}",
                frame_prefix(payload.chars().count())
            ))),
            other => Err(format!("expected a string payload, got {other}")),
        })
        .with_namespace("codec"),
        FunctionUnderTest::new("decode", 1, |args| match &args[0] {
            Value::Str(frame) => {
                let chars: Vec<char> = frame.chars().collect();
                if chars.len() < 2 {
                    return Err("frame shorter than its length prefix".into());
                }
                let declared = ((chars[0] as usize) << 8) | chars[1] as usize;
                let payload: String = chars[2..].iter().collect();
                if declared != payload.chars().count() {
                    return Err(format!(
                        "length prefix {declared} does not match payload length {}",
                        payload.chars().count()
                    ));
                }
                Ok(Value::Str(payload))
            }
            other => Err(format!("expected a frame string, got {other}")),
        })
        .with_namespace("codec"),
    ]
}

/// Resolve a named demo set to its functions and the parser its inputs
/// need.
pub(crate) fn function_set(name: &str) -> Option<(Vec<FunctionUnderTest>, InputParser)> {
    match name {
        "arith" => Some((arithmetic_functions(), InputParser::numbers())),
        "sets" => Some((set_functions(), InputParser::shaped())),
        "codec" => Some((codec_functions(), InputParser::shaped())),
        _ => None,
    }
}
