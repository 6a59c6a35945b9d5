//! Conversion of compiler runtime values into a plain, typed value tree

use crate::compiler::value::{format_number, SassColor, SassMap, SassNumber, Value};
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Reified variables keyed by name, `$` included, in discovery order
pub type VariableMap = IndexMap<String, ReifiedValue>;

/// A compiler value reduced to plain data, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReifiedValue {
    #[serde(rename = "SassMap")]
    Map { value: IndexMap<String, ReifiedValue> },

    #[serde(rename = "SassList")]
    List { value: Vec<ReifiedValue> },

    #[serde(rename = "SassColor")]
    Color { value: ColorValue },

    #[serde(rename = "SassString")]
    String { value: String },

    #[serde(rename = "SassBoolean")]
    Boolean { value: bool },

    #[serde(rename = "SassNumber")]
    Number {
        #[serde(serialize_with = "serialize_number", deserialize_with = "deserialize_number")]
        value: f64,
        unit: String,
    },

    #[serde(rename = "unknown")]
    Unknown { value: serde_json::Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorValue {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
    /// `#rrggbb`; alpha is not encoded
    pub hex: String,
}

impl ReifiedValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ReifiedValue::Map { .. } => "SassMap",
            ReifiedValue::List { .. } => "SassList",
            ReifiedValue::Color { .. } => "SassColor",
            ReifiedValue::String { .. } => "SassString",
            ReifiedValue::Boolean { .. } => "SassBoolean",
            ReifiedValue::Number { .. } => "SassNumber",
            ReifiedValue::Unknown { .. } => "unknown",
        }
    }

    /// CSS-like rendering used by the CLI's flat output
    pub fn to_css_string(&self) -> String {
        match self {
            ReifiedValue::Map { value } => {
                let entries: Vec<String> = value
                    .iter()
                    .map(|(key, item)| format!("{}: {}", key, item.to_css_string()))
                    .collect();
                format!("({})", entries.join(", "))
            }
            ReifiedValue::List { value } => value
                .iter()
                .map(ReifiedValue::to_css_string)
                .collect::<Vec<_>>()
                .join(" "),
            ReifiedValue::Color { value } => {
                if value.a >= 1.0 {
                    value.hex.clone()
                } else {
                    format!("rgba({}, {}, {}, {})", value.r, value.g, value.b, value.a)
                }
            }
            ReifiedValue::String { value } => value.clone(),
            ReifiedValue::Boolean { value } => value.to_string(),
            ReifiedValue::Number { value, unit } => {
                format!("{}{}", format_number(*value), unit)
            }
            ReifiedValue::Unknown { value } => match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        }
    }
}

fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if !value.is_finite() {
        // JSON has no literal for these
        serializer.serialize_str(&format_number(*value))
    } else if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn deserialize_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(value) => Ok(value),
        Repr::Text(text) => match text.as_str() {
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            "NaN" => Ok(f64::NAN),
            other => Err(de::Error::custom(format!("invalid number: {}", other))),
        },
    }
}

/// Reify a compiler value. `None` when the value has no plain form (`null`).
pub fn reify(value: &Value) -> Option<ReifiedValue> {
    match value {
        Value::Map(map) => Some(reify_map(map)),
        Value::List(list) => Some(ReifiedValue::List {
            value: list.items.iter().filter_map(reify).collect(),
        }),
        Value::Color(color) => Some(reify_color(color)),
        Value::String(string) => Some(ReifiedValue::String {
            value: string.text.clone(),
        }),
        Value::Bool(flag) => Some(ReifiedValue::Boolean { value: *flag }),
        Value::Number(number) => Some(reify_number(number)),
        other => other
            .inspect_value()
            .map(|value| ReifiedValue::Unknown { value }),
    }
}

/// Entries whose value can't be reified are dropped
pub fn reify_map(map: &SassMap) -> ReifiedValue {
    ReifiedValue::Map {
        value: reify_entries(map),
    }
}

/// Reify the packed structure the hook receives: one entry per variable
pub fn reify_variables(map: &SassMap) -> VariableMap {
    reify_entries(map)
}

fn reify_entries(map: &SassMap) -> IndexMap<String, ReifiedValue> {
    let mut entries = IndexMap::with_capacity(map.len());
    for (key, value) in map.iter() {
        if let Some(reified) = reify(value) {
            entries.insert(sanitize_key(&key.to_string()), reified);
        }
    }
    entries
}

fn reify_color(color: &SassColor) -> ReifiedValue {
    ReifiedValue::Color {
        value: ColorValue {
            r: color.red,
            g: color.green,
            b: color.blue,
            a: color.alpha,
            hex: color.hex(),
        },
    }
}

fn reify_number(number: &SassNumber) -> ReifiedValue {
    ReifiedValue::Number {
        value: number.value,
        unit: number.numerator_units.concat(),
    }
}

/// Strip one pair of matching quotes around a non-empty key: `"a"` -> `a`
pub fn sanitize_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if (first == '"' || first == '\'') && first == last && key.len() > 2 => {
            key[1..key.len() - 1].to_string()
        }
        _ => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::value::{ListSeparator, SassFunction, SassList};

    fn px(value: f64) -> Value {
        Value::number_with_unit(value, "px")
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            reify(&Value::number(1.0)),
            Some(ReifiedValue::Number {
                value: 1.0,
                unit: String::new()
            })
        );
        assert_eq!(
            reify(&px(10.0)),
            Some(ReifiedValue::Number {
                value: 10.0,
                unit: "px".to_string()
            })
        );
        assert_eq!(
            reify(&Value::quoted("string")),
            Some(ReifiedValue::String {
                value: "string".to_string()
            })
        );
        assert_eq!(reify(&Value::Bool(false)), Some(ReifiedValue::Boolean { value: false }));
        assert_eq!(reify(&Value::Null), None);
    }

    #[test]
    fn test_compound_units_keep_numerator_only() {
        let number = SassNumber {
            value: 2.0,
            numerator_units: vec!["px".to_string(), "em".to_string()],
            denominator_units: vec!["s".to_string()],
        };
        assert_eq!(
            reify(&Value::Number(number)),
            Some(ReifiedValue::Number {
                value: 2.0,
                unit: "pxem".to_string()
            })
        );
    }

    #[test]
    fn test_color_hex_ignores_alpha() {
        let opaque = reify(&Value::Color(SassColor::rgb(255, 255, 255))).unwrap();
        let translucent = reify(&Value::Color(SassColor::rgba(255.0, 255.0, 255.0, 0.5))).unwrap();

        match (opaque, translucent) {
            (ReifiedValue::Color { value: a }, ReifiedValue::Color { value: b }) => {
                assert_eq!(a.hex, "#ffffff");
                assert_eq!(a.a, 1.0);
                assert_eq!(b.hex, a.hex);
                assert_eq!(b.a, 0.5);
            }
            other => panic!("expected colors, got {:?}", other),
        }
    }

    #[test]
    fn test_map_keys_are_unquoted_and_nulls_dropped() {
        let mut inner = SassMap::new();
        inner.insert(Value::unquoted("waldo"), px(10.0));

        let mut map = SassMap::new();
        map.insert(Value::quoted("garply"), Value::Map(inner));
        map.insert(Value::unquoted("fred"), Value::quoted("string"));
        map.insert(Value::quoted("gone"), Value::Null);

        let reified = reify(&Value::Map(map)).unwrap();
        let ReifiedValue::Map { value } = reified else {
            panic!("expected a map");
        };
        let keys: Vec<&String> = value.keys().collect();
        assert_eq!(keys, vec!["garply", "fred"]);
        assert!(matches!(&value["garply"], ReifiedValue::Map { value } if value.contains_key("waldo")));
    }

    #[test]
    fn test_lists_reify_items_in_order() {
        let space = Value::List(SassList::new(
            vec![px(10.0), px(20.0), Value::unquoted("none"), Value::Null],
            ListSeparator::Space,
        ));
        let comma = Value::List(SassList::new(
            vec![px(10.0), px(20.0), Value::quoted("none")],
            ListSeparator::Comma,
        ));
        let a = reify(&space).unwrap();
        assert_eq!(a, reify(&comma).unwrap());
        assert!(matches!(a, ReifiedValue::List { ref value } if value.len() == 3));
    }

    #[test]
    fn test_unknown_fallback() {
        let function = Value::Function(SassFunction {
            name: "darken".to_string(),
        });
        assert_eq!(
            reify(&function),
            Some(ReifiedValue::Unknown {
                value: serde_json::json!("darken")
            })
        );
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("\"$a\""), "$a");
        assert_eq!(sanitize_key("'b'"), "b");
        assert_eq!(sanitize_key("plain"), "plain");
        assert_eq!(sanitize_key("\"\""), "\"\"");
        assert_eq!(sanitize_key("'mixed\""), "'mixed\"");
        // Affix match only, inner quotes are left alone
        assert_eq!(sanitize_key("\"a\"b\""), "a\"b");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(reify(&px(10.0)).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "SassNumber", "value": 10, "unit": "px"}));

        let json = serde_json::to_value(reify(&Value::number(0.5)).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "SassNumber", "value": 0.5, "unit": ""}));

        let json = serde_json::to_value(reify(&Value::Color(SassColor::rgb(0, 0, 0))).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "SassColor",
                "value": {"r": 0, "g": 0, "b": 0, "a": 1.0, "hex": "#000000"}
            })
        );
    }

    #[test]
    fn test_number_edge_values() {
        let number = |value: f64| ReifiedValue::Number {
            value,
            unit: String::new(),
        };

        let json = serde_json::to_value(number(f64::INFINITY)).unwrap();
        assert_eq!(json["value"], "Infinity");
        assert_eq!(serde_json::to_value(number(f64::NEG_INFINITY)).unwrap()["value"], "-Infinity");
        assert_eq!(serde_json::to_value(number(f64::NAN)).unwrap()["value"], "NaN");

        let json = serde_json::to_value(number(1.000000000001)).unwrap();
        assert_eq!(json["value"], serde_json::json!(1.000000000001));
        assert!(json["value"].is_f64());
        assert!(serde_json::to_value(number(-3.0)).unwrap()["value"].is_i64());

        let back: ReifiedValue =
            serde_json::from_str(r#"{"type":"SassNumber","value":"-Infinity","unit":"px"}"#).unwrap();
        assert!(matches!(back, ReifiedValue::Number { value, .. } if value == f64::NEG_INFINITY));
        let back: ReifiedValue = serde_json::from_str(r#"{"type":"SassNumber","value":4,"unit":"px"}"#).unwrap();
        assert_eq!(
            back,
            ReifiedValue::Number {
                value: 4.0,
                unit: "px".to_string()
            }
        );
    }

    #[test]
    fn test_flat_rendering() {
        let list = Value::List(SassList::new(vec![px(1.0), Value::unquoted("solid")], ListSeparator::Space));
        assert_eq!(reify(&list).unwrap().to_css_string(), "1px solid");
        let color = Value::Color(SassColor::rgba(0.0, 0.0, 0.0, 0.5));
        assert_eq!(reify(&color).unwrap().to_css_string(), "rgba(0, 0, 0, 0.5)");
    }
}
