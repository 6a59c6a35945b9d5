//! Built-in functions, available globally and through the `sass:*` modules
//!
//! Functions that need the evaluator (`if`, `call`, `get-function`,
//! `variable-exists`, ...) live in the evaluator; everything here is a pure
//! function of its arguments.

use crate::compiler::value::*;
use crate::error::{ExtractError, Result};

pub struct Builtin {
    pub name: &'static str,
    params: &'static [&'static str],
    callback: fn(&[Value]) -> Result<Value>,
}

impl Builtin {
    pub fn call(&self, positional: Vec<Value>, named: Vec<(String, Value)>) -> Result<Value> {
        let args = self.bind(positional, named)?;
        (self.callback)(&args)
    }

    fn bind(&self, positional: Vec<Value>, named: Vec<(String, Value)>) -> Result<Vec<Value>> {
        let rest_index = self.params.iter().position(|p| p.ends_with("..."));
        let fixed = rest_index.unwrap_or(self.params.len());

        if rest_index.is_none() && positional.len() > fixed {
            return Err(ExtractError::eval(format!(
                "Only {} argument(s) allowed, but {} were passed.",
                fixed,
                positional.len()
            )));
        }

        let mut args = vec![Value::Null; self.params.len()];
        let mut rest = Vec::new();
        for (i, value) in positional.into_iter().enumerate() {
            if i < fixed {
                args[i] = value;
            } else {
                rest.push(value);
            }
        }

        for (name, value) in named {
            let name = name.replace('_', "-");
            let index = self
                .params
                .iter()
                .position(|p| p.trim_end_matches("...") == name)
                .ok_or_else(|| ExtractError::eval(format!("No argument named ${}.", name)))?;
            args[index] = value;
        }

        if let Some(index) = rest_index {
            if !rest.is_empty() || args[index].is_null() {
                args[index] = Value::List(SassList::new(rest, ListSeparator::Comma));
            }
        }

        Ok(args)
    }
}

macro_rules! builtin {
    ($name:expr, [$($param:expr),*], $callback:expr) => {
        Builtin {
            name: $name,
            params: &[$($param),*],
            callback: $callback,
        }
    };
}

static GLOBAL_FUNCTIONS: &[Builtin] = &[
    // Colors
    builtin!("rgb", ["red", "green", "blue", "alpha"], rgb),
    builtin!("rgba", ["red", "green", "blue", "alpha"], rgb),
    builtin!("hsl", ["hue", "saturation", "lightness", "alpha"], hsl),
    builtin!("hsla", ["hue", "saturation", "lightness", "alpha"], hsl),
    builtin!("red", ["color"], |args| Ok(Value::number(args[0].assert_color("color")?.red as f64))),
    builtin!("green", ["color"], |args| Ok(Value::number(args[0].assert_color("color")?.green as f64))),
    builtin!("blue", ["color"], |args| Ok(Value::number(args[0].assert_color("color")?.blue as f64))),
    builtin!("alpha", ["color"], alpha),
    builtin!("opacity", ["color"], alpha),
    builtin!("hue", ["color"], |args| Ok(Value::number_with_unit(args[0].assert_color("color")?.to_hsl().0, "deg"))),
    builtin!("saturation", ["color"], |args| Ok(Value::number_with_unit(args[0].assert_color("color")?.to_hsl().1, "%"))),
    builtin!("lightness", ["color"], |args| Ok(Value::number_with_unit(args[0].assert_color("color")?.to_hsl().2, "%"))),
    builtin!("lighten", ["color", "amount"], |args| adjust_hsl(args, 0.0, 0.0, 1.0)),
    builtin!("darken", ["color", "amount"], |args| adjust_hsl(args, 0.0, 0.0, -1.0)),
    builtin!("saturate", ["color", "amount"], saturate),
    builtin!("desaturate", ["color", "amount"], |args| adjust_hsl(args, 0.0, -1.0, 0.0)),
    builtin!("adjust-hue", ["color", "degrees"], adjust_hue),
    builtin!("complement", ["color"], complement),
    builtin!("invert", ["color", "weight"], invert),
    builtin!("grayscale", ["color"], grayscale),
    builtin!("mix", ["color1", "color2", "weight"], mix),
    builtin!("opacify", ["color", "amount"], |args| adjust_alpha(args, 1.0)),
    builtin!("fade-in", ["color", "amount"], |args| adjust_alpha(args, 1.0)),
    builtin!("transparentize", ["color", "amount"], |args| adjust_alpha(args, -1.0)),
    builtin!("fade-out", ["color", "amount"], |args| adjust_alpha(args, -1.0)),
    builtin!(
        "adjust-color",
        ["color", "red", "green", "blue", "hue", "saturation", "lightness", "alpha"],
        |args| change_color(args, true)
    ),
    builtin!(
        "change-color",
        ["color", "red", "green", "blue", "hue", "saturation", "lightness", "alpha"],
        |args| change_color(args, false)
    ),
    // Math
    builtin!("percentage", ["number"], percentage),
    builtin!("round", ["number"], |args| round_with(args, f64::round)),
    builtin!("ceil", ["number"], |args| round_with(args, f64::ceil)),
    builtin!("floor", ["number"], |args| round_with(args, f64::floor)),
    builtin!("abs", ["number"], |args| round_with(args, f64::abs)),
    builtin!("min", ["numbers..."], |args| extremum(args, "min", std::cmp::Ordering::Less)),
    builtin!("max", ["numbers..."], |args| extremum(args, "max", std::cmp::Ordering::Greater)),
    builtin!("div", ["number1", "number2"], div),
    builtin!("pow", ["base", "exponent"], pow),
    builtin!("sqrt", ["number"], sqrt),
    builtin!("unit", ["number"], |args| Ok(Value::quoted(args[0].assert_number("number")?.unit_string()))),
    builtin!("unitless", ["number"], |args| Ok(Value::Bool(args[0].assert_number("number")?.is_unitless()))),
    builtin!("comparable", ["number1", "number2"], comparable),
    // Strings
    builtin!("quote", ["string"], |args| Ok(Value::quoted(args[0].assert_string("string")?.text.clone()))),
    builtin!("unquote", ["string"], |args| Ok(Value::unquoted(args[0].assert_string("string")?.text.clone()))),
    builtin!("str-length", ["string"], |args| {
        Ok(Value::number(args[0].assert_string("string")?.text.chars().count() as f64))
    }),
    builtin!("to-upper-case", ["string"], |args| map_text(args, |s| s.to_uppercase())),
    builtin!("to-lower-case", ["string"], |args| map_text(args, |s| s.to_lowercase())),
    builtin!("str-index", ["string", "substring"], str_index),
    builtin!("str-slice", ["string", "start-at", "end-at"], str_slice),
    builtin!("str-insert", ["string", "insert", "index"], str_insert),
    // Lists
    builtin!("length", ["list"], |args| Ok(Value::number(args[0].as_list().len() as f64))),
    builtin!("nth", ["list", "n"], nth),
    builtin!("join", ["list1", "list2", "separator", "bracketed"], join),
    builtin!("append", ["list", "val", "separator"], append),
    builtin!("index", ["list", "value"], index),
    builtin!("list-separator", ["list"], |args| Ok(Value::unquoted(args[0].separator().name()))),
    builtin!("is-bracketed", ["list"], |args| {
        Ok(Value::Bool(matches!(&args[0], Value::List(list) if list.bracketed)))
    }),
    builtin!("zip", ["lists..."], zip),
    // Maps
    builtin!("map-get", ["map", "key", "keys..."], map_get),
    builtin!("map-merge", ["map1", "map2"], map_merge),
    builtin!("map-keys", ["map"], |args| {
        Ok(Value::List(SassList::new(args[0].assert_map("map")?.keys(), ListSeparator::Comma)))
    }),
    builtin!("map-values", ["map"], |args| {
        Ok(Value::List(SassList::new(args[0].assert_map("map")?.values(), ListSeparator::Comma)))
    }),
    builtin!("map-has-key", ["map", "key", "keys..."], map_has_key),
    builtin!("map-remove", ["map", "keys..."], map_remove),
    // Introspection
    builtin!("type-of", ["value"], |args| Ok(Value::unquoted(args[0].type_name()))),
    builtin!("inspect", ["value"], |args| Ok(Value::unquoted(args[0].to_string()))),
    builtin!("if", ["condition", "if-true", "if-false"], |args| {
        Ok(if args[0].is_truthy() { args[1].clone() } else { args[2].clone() })
    }),
];

/// Names exposed by each built-in module, mapped to the global function
const MODULE_FUNCTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "math",
        &[
            ("div", "div"),
            ("round", "round"),
            ("ceil", "ceil"),
            ("floor", "floor"),
            ("abs", "abs"),
            ("min", "min"),
            ("max", "max"),
            ("percentage", "percentage"),
            ("unit", "unit"),
            ("is-unitless", "unitless"),
            ("compatible", "comparable"),
            ("pow", "pow"),
            ("sqrt", "sqrt"),
        ],
    ),
    (
        "string",
        &[
            ("quote", "quote"),
            ("unquote", "unquote"),
            ("length", "str-length"),
            ("to-upper-case", "to-upper-case"),
            ("to-lower-case", "to-lower-case"),
            ("index", "str-index"),
            ("slice", "str-slice"),
            ("insert", "str-insert"),
        ],
    ),
    (
        "list",
        &[
            ("length", "length"),
            ("nth", "nth"),
            ("join", "join"),
            ("append", "append"),
            ("index", "index"),
            ("separator", "list-separator"),
            ("is-bracketed", "is-bracketed"),
            ("zip", "zip"),
        ],
    ),
    (
        "map",
        &[
            ("get", "map-get"),
            ("merge", "map-merge"),
            ("keys", "map-keys"),
            ("values", "map-values"),
            ("has-key", "map-has-key"),
            ("remove", "map-remove"),
        ],
    ),
    (
        "color",
        &[
            ("red", "red"),
            ("green", "green"),
            ("blue", "blue"),
            ("alpha", "alpha"),
            ("opacity", "opacity"),
            ("hue", "hue"),
            ("saturation", "saturation"),
            ("lightness", "lightness"),
            ("mix", "mix"),
            ("invert", "invert"),
            ("grayscale", "grayscale"),
            ("complement", "complement"),
            ("adjust", "adjust-color"),
            ("change", "change-color"),
        ],
    ),
    ("meta", &[("type-of", "type-of"), ("inspect", "inspect"), ("if", "if")]),
];

pub fn global(name: &str) -> Option<&'static Builtin> {
    GLOBAL_FUNCTIONS.iter().find(|b| b.name == name)
}

pub fn is_module(module: &str) -> bool {
    MODULE_FUNCTIONS.iter().any(|(m, _)| *m == module)
}

pub fn module_function(module: &str, name: &str) -> Option<&'static Builtin> {
    let (_, functions) = MODULE_FUNCTIONS.iter().find(|(m, _)| *m == module)?;
    let (_, global_name) = functions.iter().find(|(n, _)| *n == name)?;
    global(global_name)
}

pub fn module_variable(module: &str, name: &str) -> Option<Value> {
    match (module, name) {
        ("math", "pi") => Some(Value::number(std::f64::consts::PI)),
        ("math", "e") => Some(Value::number(std::f64::consts::E)),
        _ => None,
    }
}

/// A call rendered back as plain CSS, for arguments Sass cannot evaluate
/// such as `var(--x)`
pub fn plain_css_call(name: &str, args: &[Value]) -> Result<Value> {
    let mut rendered = Vec::new();
    for arg in args.iter().filter(|a| !a.is_null()) {
        rendered.push(arg.to_css(true)?);
    }
    Ok(Value::unquoted(format!("{}({})", name, rendered.join(", "))))
}

fn has_special_argument(args: &[Value]) -> bool {
    args.iter().any(|a| matches!(a, Value::String(s) if !s.quoted))
}

fn number_value<'a>(value: &'a Value, name: &str) -> Result<&'a SassNumber> {
    value.assert_number(name)
}

/// An amount given either in percent or as a unitless number
fn percent_amount(value: &Value, name: &str) -> Result<f64> {
    let number = number_value(value, name)?;
    if !number.is_unitless() && !number.has_unit("%") {
        return Err(ExtractError::eval(format!("${}: Expected {} to have unit \"%\".", name, number)));
    }
    Ok(number.value)
}

fn rgb_channel(value: &Value, name: &str) -> Result<f64> {
    let number = number_value(value, name)?;
    if number.has_unit("%") {
        Ok(number.value * 255.0 / 100.0)
    } else {
        Ok(number.value)
    }
}

fn alpha_channel(value: &Value) -> Result<f64> {
    if value.is_null() {
        return Ok(1.0);
    }
    let number = number_value(value, "alpha")?;
    if number.has_unit("%") {
        Ok(number.value / 100.0)
    } else {
        Ok(number.value)
    }
}

fn rgb(args: &[Value]) -> Result<Value> {
    if let Value::Color(color) = &args[0] {
        let alpha = if args[1].is_null() { &args[3] } else { &args[1] };
        return Ok(Value::Color(color.with_alpha(alpha_channel(alpha)?)));
    }
    if has_special_argument(args) {
        return plain_css_call("rgb", args);
    }
    if args[1].is_null() || args[2].is_null() {
        return Err(ExtractError::eval("Missing argument $green or $blue."));
    }
    Ok(Value::Color(SassColor::rgba(
        rgb_channel(&args[0], "red")?,
        rgb_channel(&args[1], "green")?,
        rgb_channel(&args[2], "blue")?,
        alpha_channel(&args[3])?,
    )))
}

fn hsl(args: &[Value]) -> Result<Value> {
    if has_special_argument(args) {
        return plain_css_call("hsl", args);
    }
    let hue = number_value(&args[0], "hue")?.value;
    let saturation = number_value(&args[1], "saturation")?.value;
    let lightness = number_value(&args[2], "lightness")?.value;
    Ok(Value::Color(SassColor::from_hsla(hue, saturation, lightness, alpha_channel(&args[3])?)))
}

fn alpha(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Color(color) => Ok(Value::number(color.alpha)),
        // `opacity(50%)` is also a CSS filter function
        other => plain_css_call("opacity", std::slice::from_ref(other)),
    }
}

fn adjust_hsl(args: &[Value], hue_sign: f64, saturation_sign: f64, lightness_sign: f64) -> Result<Value> {
    let color = args[0].assert_color("color")?;
    let amount = percent_amount(&args[1], "amount")?;
    let (h, s, l) = color.to_hsl();
    Ok(Value::Color(SassColor::from_hsla(
        h + hue_sign * amount,
        (s + saturation_sign * amount).clamp(0.0, 100.0),
        (l + lightness_sign * amount).clamp(0.0, 100.0),
        color.alpha,
    )))
}

fn saturate(args: &[Value]) -> Result<Value> {
    if args[1].is_null() {
        // Single-argument `saturate()` is the CSS filter
        return plain_css_call("saturate", &args[..1]);
    }
    adjust_hsl(args, 0.0, 1.0, 0.0)
}

fn adjust_hue(args: &[Value]) -> Result<Value> {
    let color = args[0].assert_color("color")?;
    let degrees = number_value(&args[1], "degrees")?.value;
    let (h, s, l) = color.to_hsl();
    Ok(Value::Color(SassColor::from_hsla(h + degrees, s, l, color.alpha)))
}

fn complement(args: &[Value]) -> Result<Value> {
    let color = args[0].assert_color("color")?;
    let (h, s, l) = color.to_hsl();
    Ok(Value::Color(SassColor::from_hsla(h + 180.0, s, l, color.alpha)))
}

fn grayscale(args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Color(color) => {
            let (h, _, l) = color.to_hsl();
            Ok(Value::Color(SassColor::from_hsla(h, 0.0, l, color.alpha)))
        }
        other => plain_css_call("grayscale", std::slice::from_ref(other)),
    }
}

fn invert(args: &[Value]) -> Result<Value> {
    let color = match &args[0] {
        Value::Color(color) => color,
        other => return plain_css_call("invert", std::slice::from_ref(other)),
    };
    let inverted = SassColor::rgba(
        255.0 - color.red as f64,
        255.0 - color.green as f64,
        255.0 - color.blue as f64,
        color.alpha,
    );
    if args[1].is_null() {
        return Ok(Value::Color(inverted));
    }
    let weight = percent_amount(&args[1], "weight")?;
    Ok(Value::Color(mix_colors(&inverted, color, weight)))
}

fn mix(args: &[Value]) -> Result<Value> {
    let first = args[0].assert_color("color1")?;
    let second = args[1].assert_color("color2")?;
    let weight = if args[2].is_null() {
        50.0
    } else {
        percent_amount(&args[2], "weight")?
    };
    Ok(Value::Color(mix_colors(first, second, weight)))
}

fn mix_colors(first: &SassColor, second: &SassColor, weight: f64) -> SassColor {
    let p = weight / 100.0;
    let w = 2.0 * p - 1.0;
    let a = first.alpha - second.alpha;
    let w1 = if w * a == -1.0 { w } else { (w + a) / (1.0 + w * a) };
    let weight1 = (w1 + 1.0) / 2.0;
    let weight2 = 1.0 - weight1;

    SassColor::rgba(
        first.red as f64 * weight1 + second.red as f64 * weight2,
        first.green as f64 * weight1 + second.green as f64 * weight2,
        first.blue as f64 * weight1 + second.blue as f64 * weight2,
        first.alpha * p + second.alpha * (1.0 - p),
    )
}

fn adjust_alpha(args: &[Value], sign: f64) -> Result<Value> {
    let color = args[0].assert_color("color")?;
    let amount = number_value(&args[1], "amount")?.value;
    Ok(Value::Color(color.with_alpha((color.alpha + sign * amount).clamp(0.0, 1.0))))
}

/// `adjust-color` adds to channels, `change-color` replaces them
fn change_color(args: &[Value], relative: bool) -> Result<Value> {
    let color = args[0].assert_color("color")?;
    let apply = |current: f64, value: &Value, name: &str| -> Result<f64> {
        if value.is_null() {
            return Ok(current);
        }
        let amount = number_value(value, name)?.value;
        Ok(if relative { current + amount } else { amount })
    };

    let mut result = SassColor::rgba(
        apply(color.red as f64, &args[1], "red")?,
        apply(color.green as f64, &args[2], "green")?,
        apply(color.blue as f64, &args[3], "blue")?,
        apply(color.alpha, &args[7], "alpha")?,
    );

    if !(args[4].is_null() && args[5].is_null() && args[6].is_null()) {
        let (h, s, l) = result.to_hsl();
        result = SassColor::from_hsla(
            apply(h, &args[4], "hue")?,
            apply(s, &args[5], "saturation")?.clamp(0.0, 100.0),
            apply(l, &args[6], "lightness")?.clamp(0.0, 100.0),
            result.alpha,
        );
    }

    Ok(Value::Color(result))
}

fn percentage(args: &[Value]) -> Result<Value> {
    let number = number_value(&args[0], "number")?;
    if !number.is_unitless() {
        return Err(ExtractError::eval(format!("$number: Expected {} to have no units.", number)));
    }
    Ok(Value::number_with_unit(number.value * 100.0, "%"))
}

fn round_with(args: &[Value], op: fn(f64) -> f64) -> Result<Value> {
    let mut number = number_value(&args[0], "number")?.clone();
    number.value = op(number.value);
    Ok(Value::Number(number))
}

fn extremum(args: &[Value], name: &str, wanted: std::cmp::Ordering) -> Result<Value> {
    let values = args[0].as_list();
    if values.iter().any(|v| !matches!(v, Value::Number(_))) {
        return plain_css_call(name, &values);
    }

    let mut best: Option<&SassNumber> = None;
    for value in &values {
        let number = number_value(value, "numbers")?;
        best = match best {
            Some(current) if number.compare(current)? != wanted => Some(current),
            _ => Some(number),
        };
    }

    best.map(|n| Value::Number(n.clone()))
        .ok_or_else(|| ExtractError::eval("At least one argument must be passed."))
}

fn div(args: &[Value]) -> Result<Value> {
    let left = number_value(&args[0], "number1")?;
    let right = number_value(&args[1], "number2")?;
    Ok(Value::Number(left.divided_by(right)))
}

fn pow(args: &[Value]) -> Result<Value> {
    let base = number_value(&args[0], "base")?;
    let exponent = number_value(&args[1], "exponent")?;
    if !base.is_unitless() || !exponent.is_unitless() {
        return Err(ExtractError::eval("$base and $exponent must be unitless."));
    }
    Ok(Value::number(base.value.powf(exponent.value)))
}

fn sqrt(args: &[Value]) -> Result<Value> {
    let number = number_value(&args[0], "number")?;
    if !number.is_unitless() {
        return Err(ExtractError::eval(format!("$number: Expected {} to have no units.", number)));
    }
    Ok(Value::number(number.value.sqrt()))
}

fn comparable(args: &[Value]) -> Result<Value> {
    let left = number_value(&args[0], "number1")?;
    let right = number_value(&args[1], "number2")?;
    Ok(Value::Bool(left.is_comparable_to(right)))
}

fn map_text(args: &[Value], op: fn(&str) -> String) -> Result<Value> {
    let string = args[0].assert_string("string")?;
    Ok(Value::String(SassString {
        text: op(&string.text),
        quoted: string.quoted,
    }))
}

fn str_index(args: &[Value]) -> Result<Value> {
    let string = args[0].assert_string("string")?;
    let substring = args[1].assert_string("substring")?;
    Ok(match string.text.find(&substring.text) {
        Some(byte_index) => Value::number((string.text[..byte_index].chars().count() + 1) as f64),
        None => Value::Null,
    })
}

/// Sass string index (1-based, negative from the end) to a char offset
fn char_index(index: f64, length: usize, is_end: bool) -> usize {
    let index = index as i64;
    let length = length as i64;
    let resolved = if index > 0 {
        if is_end { index } else { index - 1 }
    } else if index == 0 {
        0
    } else {
        let from_end = length + index;
        if is_end { from_end + 1 } else { from_end }
    };
    resolved.clamp(0, length) as usize
}

fn str_slice(args: &[Value]) -> Result<Value> {
    let string = args[0].assert_string("string")?;
    let chars: Vec<char> = string.text.chars().collect();
    let start = char_index(number_value(&args[1], "start-at")?.value, chars.len(), false);
    let end = if args[2].is_null() {
        chars.len()
    } else {
        char_index(number_value(&args[2], "end-at")?.value, chars.len(), true)
    };
    let text: String = if start < end { chars[start..end].iter().collect() } else { String::new() };
    Ok(Value::String(SassString {
        text,
        quoted: string.quoted,
    }))
}

fn str_insert(args: &[Value]) -> Result<Value> {
    let string = args[0].assert_string("string")?;
    let insert = args[1].assert_string("insert")?;
    let mut chars: Vec<char> = string.text.chars().collect();
    let index = number_value(&args[2], "index")?.value;
    let at = char_index(index, chars.len(), index < 0.0);
    for (offset, ch) in insert.text.chars().enumerate() {
        chars.insert(at + offset, ch);
    }
    Ok(Value::String(SassString {
        text: chars.into_iter().collect(),
        quoted: string.quoted,
    }))
}

fn list_index(n: &Value, length: usize) -> Result<usize> {
    let number = number_value(n, "n")?;
    if !number.is_int() {
        return Err(ExtractError::eval(format!("$n: {} is not an int.", number)));
    }
    let index = number.value.round() as i64;
    let length = length as i64;
    if index == 0 || index.abs() > length {
        return Err(ExtractError::eval(format!(
            "$n: Invalid index {} for a list with {} elements.",
            index, length
        )));
    }
    let resolved = if index > 0 { index - 1 } else { length + index };
    Ok(resolved as usize)
}

fn nth(args: &[Value]) -> Result<Value> {
    let items = args[0].as_list();
    let index = list_index(&args[1], items.len())?;
    Ok(items[index].clone())
}

fn separator_argument(value: &Value, fallback: ListSeparator) -> Result<ListSeparator> {
    match value {
        Value::Null => Ok(fallback),
        Value::String(s) => match s.text.as_str() {
            "auto" => Ok(fallback),
            "comma" => Ok(ListSeparator::Comma),
            "space" => Ok(ListSeparator::Space),
            "slash" => Ok(ListSeparator::Slash),
            other => Err(ExtractError::eval(format!(
                "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\", was {}.",
                other
            ))),
        },
        other => Err(ExtractError::eval(format!("$separator: {} is not a string.", other))),
    }
}

fn decided(separator: ListSeparator) -> Option<ListSeparator> {
    match separator {
        ListSeparator::Undecided => None,
        other => Some(other),
    }
}

fn join(args: &[Value]) -> Result<Value> {
    let mut items = args[0].as_list();
    let second = args[1].as_list();

    let auto = decided(args[0].separator())
        .filter(|_| items.len() > 1)
        .or_else(|| decided(args[1].separator()).filter(|_| second.len() > 1))
        .or_else(|| decided(args[0].separator()))
        .unwrap_or(ListSeparator::Space);
    let separator = separator_argument(&args[2], auto)?;

    let bracketed = match &args[3] {
        Value::Null => matches!(&args[0], Value::List(l) if l.bracketed),
        Value::String(s) if s.text == "auto" => matches!(&args[0], Value::List(l) if l.bracketed),
        other => other.is_truthy(),
    };

    items.extend(second);
    Ok(Value::List(SassList {
        items,
        separator,
        bracketed,
    }))
}

fn append(args: &[Value]) -> Result<Value> {
    let mut items = args[0].as_list();
    let fallback = decided(args[0].separator()).unwrap_or(ListSeparator::Space);
    let separator = separator_argument(&args[2], fallback)?;
    let bracketed = matches!(&args[0], Value::List(l) if l.bracketed);
    items.push(args[1].clone());
    Ok(Value::List(SassList {
        items,
        separator,
        bracketed,
    }))
}

fn index(args: &[Value]) -> Result<Value> {
    Ok(args[0]
        .as_list()
        .iter()
        .position(|item| *item == args[1])
        .map_or(Value::Null, |i| Value::number((i + 1) as f64)))
}

fn zip(args: &[Value]) -> Result<Value> {
    let lists: Vec<Vec<Value>> = args[0].as_list().iter().map(|l| l.as_list()).collect();
    let shortest = lists.iter().map(Vec::len).min().unwrap_or(0);
    let rows = (0..shortest)
        .map(|i| Value::List(SassList::new(lists.iter().map(|l| l[i].clone()).collect(), ListSeparator::Space)))
        .collect();
    Ok(Value::List(SassList::new(rows, ListSeparator::Comma)))
}

fn map_get(args: &[Value]) -> Result<Value> {
    let mut current = args[0].assert_map("map")?;
    let mut keys = vec![args[1].clone()];
    keys.extend(args[2].as_list());

    let last = keys.len() - 1;
    for (i, key) in keys.iter().enumerate() {
        let value = match current.get(key) {
            Some(value) => value.clone(),
            None => return Ok(Value::Null),
        };
        if i == last {
            return Ok(value);
        }
        current = match value.try_map() {
            Some(map) => map,
            None => return Ok(Value::Null),
        };
    }
    Ok(Value::Null)
}

fn map_has_key(args: &[Value]) -> Result<Value> {
    let mut lookup = args.to_vec();
    lookup.truncate(3);
    Ok(Value::Bool(!map_get(&lookup)?.is_null() || {
        let map = args[0].assert_map("map")?;
        args[2].as_list().is_empty() && map.contains_key(&args[1])
    }))
}

fn map_merge(args: &[Value]) -> Result<Value> {
    let mut merged = args[0].assert_map("map1")?;
    for (key, value) in args[1].assert_map("map2")?.iter() {
        merged.insert(key.clone(), value.clone());
    }
    Ok(Value::Map(merged))
}

fn map_remove(args: &[Value]) -> Result<Value> {
    let mut map = args[0].assert_map("map")?;
    for key in args[1].as_list() {
        map.remove(&key);
    }
    Ok(Value::Map(map))
}
