//! Runtime values of the embedded Sass compiler
//!
//! These are the values custom functions receive and return, and the input
//! of the reifier. Numbers carry their units, strings remember whether they
//! were quoted, and colors remember how they were written so they inspect
//! the way they were authored.

use crate::compiler::colors;
use crate::error::{ExtractError, Result};
use std::fmt;

/// Precision Sass uses when printing and comparing numbers
const PRECISION: i32 = 10;
const EPSILON: f64 = 1e-11;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(SassNumber),
    String(SassString),
    Color(SassColor),
    List(SassList),
    Map(SassMap),
    Function(SassFunction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SassFunction {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SassNumber {
    pub value: f64,
    pub numerator_units: Vec<String>,
    pub denominator_units: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SassString {
    pub text: String,
    pub quoted: bool,
}

#[derive(Debug, Clone)]
pub struct SassColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f64,
    /// Authored spelling (`white`, `#FFF`) for literal colors
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSeparator {
    Comma,
    Space,
    Slash,
    Undecided,
}

#[derive(Debug, Clone)]
pub struct SassList {
    pub items: Vec<Value>,
    pub separator: ListSeparator,
    pub bracketed: bool,
}

/// Insertion-ordered association list; keys are compared with Sass equality
#[derive(Debug, Clone, Default)]
pub struct SassMap {
    entries: Vec<(Value, Value)>,
}

impl Value {
    pub fn number(value: f64) -> Self {
        Value::Number(SassNumber::unitless(value))
    }

    pub fn number_with_unit(value: f64, unit: &str) -> Self {
        Value::Number(SassNumber::with_unit(value, unit))
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Value::String(SassString::quoted(text))
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Value::String(SassString::unquoted(text))
    }

    pub fn empty_list() -> Self {
        Value::List(SassList::new(Vec::new(), ListSeparator::Undecided))
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Color(_) => "color",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
        }
    }

    /// The value seen as a list: maps become lists of key/value pairs and
    /// single values become one-element lists.
    pub fn as_list(&self) -> Vec<Value> {
        match self {
            Value::List(list) => list.items.clone(),
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Value::List(SassList::new(vec![k.clone(), v.clone()], ListSeparator::Space)))
                .collect(),
            other => vec![other.clone()],
        }
    }

    pub fn separator(&self) -> ListSeparator {
        match self {
            Value::List(list) => list.separator,
            Value::Map(_) => ListSeparator::Comma,
            _ => ListSeparator::Undecided,
        }
    }

    /// Maps, plus the empty list which doubles as the empty map
    pub fn try_map(&self) -> Option<SassMap> {
        match self {
            Value::Map(map) => Some(map.clone()),
            Value::List(list) if list.items.is_empty() => Some(SassMap::default()),
            _ => None,
        }
    }

    /// Raw payload exposed by values outside the core kinds
    pub fn inspect_value(&self) -> Option<serde_json::Value> {
        match self {
            Value::Function(function) => Some(serde_json::Value::String(function.name.clone())),
            _ => None,
        }
    }

    pub fn assert_number(&self, name: &str) -> Result<&SassNumber> {
        match self {
            Value::Number(n) => Ok(n),
            other => Err(ExtractError::eval(format!("${}: {} is not a number.", name, other))),
        }
    }

    pub fn assert_color(&self, name: &str) -> Result<&SassColor> {
        match self {
            Value::Color(c) => Ok(c),
            other => Err(ExtractError::eval(format!("${}: {} is not a color.", name, other))),
        }
    }

    pub fn assert_string(&self, name: &str) -> Result<&SassString> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(ExtractError::eval(format!("${}: {} is not a string.", name, other))),
        }
    }

    pub fn assert_map(&self, name: &str) -> Result<SassMap> {
        self.try_map()
            .ok_or_else(|| ExtractError::eval(format!("${}: {} is not a map.", name, self)))
    }

    /// Render for CSS output. Quoted strings keep their quotes only when
    /// `keep_quotes` is set (interpolation drops them).
    pub fn to_css(&self, keep_quotes: bool) -> Result<String> {
        match self {
            Value::Null => Ok(String::new()),
            Value::String(s) if !keep_quotes => Ok(s.text.clone()),
            Value::List(list) => {
                let mut parts = Vec::new();
                for item in &list.items {
                    let css = item.to_css(keep_quotes)?;
                    if !css.is_empty() {
                        parts.push(css);
                    }
                }
                let joined = parts.join(list.separator.css_joiner());
                if list.bracketed {
                    Ok(format!("[{}]", joined))
                } else {
                    Ok(joined)
                }
            }
            Value::Map(_) => Err(ExtractError::eval(format!("{} isn't a valid CSS value.", self))),
            Value::Function(_) => Err(ExtractError::eval(format!("{} isn't a valid CSS value.", self))),
            other => Ok(other.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.sass_eq(b),
            (Value::String(a), Value::String(b)) => a.text == b.text,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.bracketed == b.bracketed
                    && a.items == b.items
                    && (a.separator == b.separator || a.items.len() <= 1)
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Map(map), Value::List(list)) | (Value::List(list), Value::Map(map)) => {
                map.is_empty() && list.items.is_empty()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Color(c) => write!(f, "{}", c),
            Value::List(list) => {
                if list.items.is_empty() {
                    return write!(f, "{}", if list.bracketed { "[]" } else { "()" });
                }
                let mut parts = Vec::with_capacity(list.items.len());
                for item in &list.items {
                    let needs_parens = match item {
                        Value::List(inner) => {
                            !inner.bracketed
                                && inner.items.len() > 1
                                && (inner.separator == ListSeparator::Comma
                                    || inner.separator == list.separator)
                        }
                        _ => false,
                    };
                    if needs_parens {
                        parts.push(format!("({})", item));
                    } else {
                        parts.push(item.to_string());
                    }
                }
                let joined = parts.join(list.separator.css_joiner());
                if list.bracketed {
                    write!(f, "[{}]", joined)
                } else if list.items.len() == 1 && list.separator == ListSeparator::Comma {
                    write!(f, "({},)", joined)
                } else {
                    write!(f, "{}", joined)
                }
            }
            Value::Map(map) => {
                let entries: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "({})", entries.join(", "))
            }
            Value::Function(function) => write!(f, "get-function(\"{}\")", function.name),
        }
    }
}

impl ListSeparator {
    fn css_joiner(&self) -> &'static str {
        match self {
            ListSeparator::Comma => ", ",
            ListSeparator::Slash => " / ",
            ListSeparator::Space | ListSeparator::Undecided => " ",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ListSeparator::Comma => "comma",
            ListSeparator::Slash => "slash",
            ListSeparator::Space | ListSeparator::Undecided => "space",
        }
    }
}

impl SassList {
    pub fn new(items: Vec<Value>, separator: ListSeparator) -> Self {
        Self {
            items,
            separator,
            bracketed: false,
        }
    }
}

impl SassMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace, keeping the position of an existing key
    pub fn insert(&mut self, key: Value, value: Value) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &Value) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for SassMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k).map_or(false, |ov| ov == v))
    }
}

impl SassString {
    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }
}

impl fmt::Display for SassString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.quoted {
            return write!(f, "{}", self.text);
        }
        let quote = if self.text.contains('"') && !self.text.contains('\'') {
            '\''
        } else {
            '"'
        };
        let mut out = String::with_capacity(self.text.len() + 2);
        out.push(quote);
        for ch in self.text.chars() {
            if ch == quote || ch == '\\' {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push(quote);
        write!(f, "{}", out)
    }
}

impl SassNumber {
    pub fn unitless(value: f64) -> Self {
        Self {
            value,
            numerator_units: Vec::new(),
            denominator_units: Vec::new(),
        }
    }

    pub fn with_unit(value: f64, unit: &str) -> Self {
        if unit.is_empty() {
            return Self::unitless(value);
        }
        Self {
            value,
            numerator_units: vec![unit.to_string()],
            denominator_units: Vec::new(),
        }
    }

    pub fn is_unitless(&self) -> bool {
        self.numerator_units.is_empty() && self.denominator_units.is_empty()
    }

    pub fn has_unit(&self, unit: &str) -> bool {
        self.denominator_units.is_empty() && self.numerator_units.len() == 1 && self.numerator_units[0] == unit
    }

    /// `px`, `px*em`, `px/s`
    pub fn unit_string(&self) -> String {
        let numerator = self.numerator_units.join("*");
        if self.denominator_units.is_empty() {
            return numerator;
        }
        format!("{}/{}", numerator, self.denominator_units.join("*"))
    }

    pub fn is_int(&self) -> bool {
        fuzzy_is_int(self.value)
    }

    fn single_unit(&self) -> Option<&str> {
        if self.denominator_units.is_empty() && self.numerator_units.len() == 1 {
            Some(&self.numerator_units[0])
        } else {
            None
        }
    }

    /// This number's value expressed in `other`'s units, when compatible.
    /// Unitless numbers are compatible with everything.
    pub fn value_in_units_of(&self, other: &SassNumber) -> Option<f64> {
        if self.is_unitless() || other.is_unitless() {
            return Some(self.value);
        }
        if self.numerator_units == other.numerator_units && self.denominator_units == other.denominator_units {
            return Some(self.value);
        }
        match (self.single_unit(), other.single_unit()) {
            (Some(from), Some(to)) => units::conversion_factor(from, to).map(|factor| self.value * factor),
            _ => None,
        }
    }

    pub fn is_comparable_to(&self, other: &SassNumber) -> bool {
        self.value_in_units_of(other).is_some()
    }

    fn incompatible(&self, other: &SassNumber) -> ExtractError {
        ExtractError::eval(format!("{} and {} have incompatible units.", self, other))
    }

    fn coerced_pair(&self, other: &SassNumber) -> Result<(f64, f64, SassNumber)> {
        let units_of = if self.is_unitless() { other } else { self };
        let left = self.value_in_units_of(units_of).ok_or_else(|| self.incompatible(other))?;
        let right = other.value_in_units_of(units_of).ok_or_else(|| self.incompatible(other))?;
        Ok((left, right, SassNumber {
            value: 0.0,
            numerator_units: units_of.numerator_units.clone(),
            denominator_units: units_of.denominator_units.clone(),
        }))
    }

    pub fn plus(&self, other: &SassNumber) -> Result<SassNumber> {
        let (left, right, mut result) = self.coerced_pair(other)?;
        result.value = left + right;
        Ok(result)
    }

    pub fn minus(&self, other: &SassNumber) -> Result<SassNumber> {
        let (left, right, mut result) = self.coerced_pair(other)?;
        result.value = left - right;
        Ok(result)
    }

    pub fn modulo(&self, other: &SassNumber) -> Result<SassNumber> {
        let (left, right, mut result) = self.coerced_pair(other)?;
        let mut remainder = left % right;
        if remainder != 0.0 && (remainder < 0.0) != (right < 0.0) {
            remainder += right;
        }
        result.value = remainder;
        Ok(result)
    }

    pub fn times(&self, other: &SassNumber) -> SassNumber {
        let mut numerators = self.numerator_units.clone();
        numerators.extend(other.numerator_units.iter().cloned());
        let mut denominators = self.denominator_units.clone();
        denominators.extend(other.denominator_units.iter().cloned());
        Self::cancel_units(self.value * other.value, numerators, denominators)
    }

    pub fn divided_by(&self, other: &SassNumber) -> SassNumber {
        let mut numerators = self.numerator_units.clone();
        numerators.extend(other.denominator_units.iter().cloned());
        let mut denominators = self.denominator_units.clone();
        denominators.extend(other.numerator_units.iter().cloned());
        Self::cancel_units(self.value / other.value, numerators, denominators)
    }

    fn cancel_units(mut value: f64, numerators: Vec<String>, mut denominators: Vec<String>) -> SassNumber {
        let mut remaining = Vec::new();
        for numerator in numerators {
            let found = denominators
                .iter()
                .position(|d| units::conversion_factor(&numerator, d).is_some());
            match found {
                Some(index) => {
                    let denominator = denominators.remove(index);
                    value *= units::conversion_factor(&numerator, &denominator).unwrap_or(1.0);
                }
                None => remaining.push(numerator),
            }
        }
        SassNumber {
            value,
            numerator_units: remaining,
            denominator_units: denominators,
        }
    }

    pub fn compare(&self, other: &SassNumber) -> Result<std::cmp::Ordering> {
        let (left, right, _) = self.coerced_pair(other)?;
        if fuzzy_equals(left, right) {
            return Ok(std::cmp::Ordering::Equal);
        }
        Ok(left.partial_cmp(&right).unwrap_or(std::cmp::Ordering::Equal))
    }

    fn sass_eq(&self, other: &SassNumber) -> bool {
        if self.is_unitless() != other.is_unitless() {
            return false;
        }
        match other.value_in_units_of(self) {
            Some(converted) => fuzzy_equals(self.value, converted),
            None => false,
        }
    }
}

impl fmt::Display for SassNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.value), self.unit_string())
    }
}

impl SassColor {
    pub fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red: clamp_channel(red),
            green: clamp_channel(green),
            blue: clamp_channel(blue),
            alpha: alpha.clamp(0.0, 1.0),
            format: None,
        }
    }

    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.0,
            format: None,
        }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#')?;
        let expanded: String = match digits.len() {
            3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_string(),
            _ => return None,
        };
        let bytes = hex::decode(&expanded).ok()?;
        let alpha = bytes.get(3).map_or(1.0, |a| *a as f64 / 255.0);
        Some(Self {
            red: bytes[0],
            green: bytes[1],
            blue: bytes[2],
            alpha,
            format: Some(text.to_string()),
        })
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let rgba = colors::lookup(&name.to_ascii_lowercase())?;
        let mut color = Self::rgba(rgba.0 as f64, rgba.1 as f64, rgba.2 as f64, rgba.3);
        color.format = Some(name.to_string());
        Some(color)
    }

    /// Lowercase `#rrggbb`; alpha is not encoded
    pub fn hex(&self) -> String {
        format!("#{}", hex::encode([self.red, self.green, self.blue]))
    }

    /// Hue in degrees, saturation and lightness in percent
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let r = self.red as f64 / 255.0;
        let g = self.green as f64 / 255.0;
        let b = self.blue as f64 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta) % 6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let lightness = (max + min) / 2.0;
        let saturation = if delta == 0.0 {
            0.0
        } else {
            delta / (1.0 - (2.0 * lightness - 1.0).abs())
        };

        (hue.rem_euclid(360.0), saturation * 100.0, lightness * 100.0)
    }

    pub fn from_hsla(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let l = (lightness / 100.0).clamp(0.0, 1.0);

        let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
        let m1 = l * 2.0 - m2;
        let channel = |mut t: f64| {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            let v = if t < 1.0 / 6.0 {
                m1 + (m2 - m1) * t * 6.0
            } else if t < 0.5 {
                m2
            } else if t < 2.0 / 3.0 {
                m1 + (m2 - m1) * (2.0 / 3.0 - t) * 6.0
            } else {
                m1
            };
            v * 255.0
        };

        Self::rgba(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0), alpha)
    }

    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self::rgba(self.red as f64, self.green as f64, self.blue as f64, alpha)
    }
}

impl PartialEq for SassColor {
    fn eq(&self, other: &Self) -> bool {
        self.red == other.red
            && self.green == other.green
            && self.blue == other.blue
            && fuzzy_equals(self.alpha, other.alpha)
    }
}

impl fmt::Display for SassColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(format) = &self.format {
            return write!(f, "{}", format);
        }
        if fuzzy_equals(self.alpha, 1.0) {
            write!(f, "{}", self.hex())
        } else {
            write!(
                f,
                "rgba({}, {}, {}, {})",
                self.red,
                self.green,
                self.blue,
                format_number(self.alpha)
            )
        }
    }
}

fn clamp_channel(value: f64) -> u8 {
    fuzzy_round(value).clamp(0.0, 255.0) as u8
}

/// Round halves away from zero, treating anything within epsilon of `.5`
/// as a half.
pub fn fuzzy_round(value: f64) -> f64 {
    let fraction = value.rem_euclid(1.0);
    let half = fuzzy_equals(fraction, 0.5);
    if value > 0.0 {
        if fraction < 0.5 && !half {
            value.floor()
        } else {
            value.ceil()
        }
    } else if fraction < 0.5 || half {
        value.floor()
    } else {
        value.ceil()
    }
}

pub fn fuzzy_equals(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

pub fn fuzzy_is_int(value: f64) -> bool {
    value.is_finite() && fuzzy_equals(value, value.round())
}

/// Format a number the way Sass prints it: at most ten decimals, no
/// trailing zeros, no negative zero.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if fuzzy_is_int(value) {
        let rounded = value.round();
        return if rounded == 0.0 { "0".to_string() } else { format!("{}", rounded as i64) };
    }

    let factor = 10f64.powi(PRECISION);
    let rounded = (value * factor).round() / factor;
    let text = format!("{:.*}", PRECISION as usize, rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

pub mod units {
    //! Conversion between compatible absolute units

    const LENGTH: &[(&str, f64)] = &[
        ("px", 1.0),
        ("in", 96.0),
        ("cm", 96.0 / 2.54),
        ("mm", 96.0 / 25.4),
        ("q", 96.0 / 101.6),
        ("pt", 96.0 / 72.0),
        ("pc", 16.0),
    ];
    const ANGLE: &[(&str, f64)] = &[
        ("deg", 1.0),
        ("grad", 0.9),
        ("rad", 180.0 / std::f64::consts::PI),
        ("turn", 360.0),
    ];
    const TIME: &[(&str, f64)] = &[("ms", 1.0), ("s", 1000.0)];
    const FREQUENCY: &[(&str, f64)] = &[("hz", 1.0), ("khz", 1000.0)];
    const RESOLUTION: &[(&str, f64)] = &[("dppx", 1.0), ("dpi", 1.0 / 96.0), ("dpcm", 2.54 / 96.0)];

    const DIMENSIONS: &[&[(&str, f64)]] = &[LENGTH, ANGLE, TIME, FREQUENCY, RESOLUTION];

    /// Factor that converts a value in `from` into `to`
    pub fn conversion_factor(from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        let from = from.to_ascii_lowercase();
        let to = to.to_ascii_lowercase();
        for dimension in DIMENSIONS {
            let source = dimension.iter().find(|(unit, _)| *unit == from);
            let target = dimension.iter().find(|(unit, _)| *unit == to);
            if let (Some((_, a)), Some((_, b))) = (source, target) {
                return Some(a / b);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
        assert_eq!(format_number(10.25), "10.25");
    }

    #[test]
    fn test_unit_arithmetic() {
        let a = SassNumber::with_unit(1.0, "in");
        let b = SassNumber::with_unit(48.0, "px");
        let sum = a.plus(&b).unwrap();
        assert_eq!(sum.to_string(), "1.5in");

        let unitless = SassNumber::unitless(2.0);
        assert_eq!(b.plus(&unitless).unwrap().to_string(), "50px");

        let em = SassNumber::with_unit(1.0, "em");
        assert!(b.plus(&em).is_err());

        let product = b.times(&SassNumber::with_unit(2.0, "px"));
        assert_eq!(product.unit_string(), "px*px");

        let ratio = b.divided_by(&SassNumber::with_unit(2.0, "px"));
        assert!(ratio.is_unitless());
        assert_eq!(ratio.value, 24.0);
    }

    #[test]
    fn test_number_equality() {
        assert_eq!(Value::number_with_unit(1.0, "in"), Value::number_with_unit(96.0, "px"));
        assert_ne!(Value::number_with_unit(1.0, "px"), Value::number(1.0));
        assert_ne!(Value::number_with_unit(1.0, "px"), Value::number_with_unit(1.0, "em"));
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        let result = SassNumber::unitless(-5.0).modulo(&SassNumber::unitless(3.0)).unwrap();
        assert_eq!(result.value, 1.0);
    }

    #[test]
    fn test_color_parsing_and_hex() {
        let white = SassColor::from_hex("#FFF").unwrap();
        assert_eq!((white.red, white.green, white.blue), (255, 255, 255));
        assert_eq!(white.hex(), "#ffffff");
        assert_eq!(white.to_string(), "#FFF");

        let translucent = SassColor::from_hex("#00000080").unwrap();
        assert!((translucent.alpha - 128.0 / 255.0).abs() < 1e-9);

        assert!(SassColor::from_hex("#12345").is_none());
        assert_eq!(SassColor::from_name("RebeccaPurple").unwrap().hex(), "#663399");
    }

    #[test]
    fn test_hsl_round_trip() {
        let color = SassColor::rgb(51, 102, 153);
        let (h, s, l) = color.to_hsl();
        assert_eq!(SassColor::from_hsla(h, s, l, 1.0), color);
    }

    #[test]
    fn test_hsl_channels_round_half_up() {
        let color = SassColor::from_hsla(210.0, 50.0, 50.0, 1.0);
        assert_eq!((color.red, color.green, color.blue), (64, 128, 191));
        assert_eq!(color.hex(), "#4080bf");

        assert_eq!(fuzzy_round(127.49999999999999), 128.0);
        assert_eq!(fuzzy_round(127.4), 127.0);
        assert_eq!(fuzzy_round(-1.5), -2.0);
        assert_eq!(fuzzy_round(-1.6), -2.0);
        assert_eq!(fuzzy_round(-1.4), -1.0);
    }

    #[test]
    fn test_string_display_picks_quotes() {
        assert_eq!(SassString::quoted("a").to_string(), "\"a\"");
        assert_eq!(SassString::quoted("say \"hi\"").to_string(), "'say \"hi\"'");
        assert_eq!(SassString::unquoted("none").to_string(), "none");
    }

    #[test]
    fn test_list_and_map_display() {
        let list = Value::List(SassList::new(
            vec![Value::number_with_unit(10.0, "px"), Value::unquoted("solid")],
            ListSeparator::Space,
        ));
        assert_eq!(list.to_string(), "10px solid");

        let mut map = SassMap::new();
        map.insert(Value::quoted("$a"), Value::number(1.0));
        assert_eq!(Value::Map(map).to_string(), "(\"$a\": 1)");
        assert_eq!(Value::empty_list().to_string(), "()");
    }

    #[test]
    fn test_empty_list_is_empty_map() {
        assert!(Value::empty_list().try_map().unwrap().is_empty());
        assert_eq!(Value::empty_list(), Value::Map(SassMap::new()));
        assert!(Value::number(1.0).try_map().is_none());
    }

    #[test]
    fn test_map_insert_keeps_order() {
        let mut map = SassMap::new();
        map.insert(Value::unquoted("a"), Value::number(1.0));
        map.insert(Value::unquoted("b"), Value::number(2.0));
        map.insert(Value::quoted("a"), Value::number(3.0));
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys()[0], Value::unquoted("a"));
        assert_eq!(map.get(&Value::unquoted("a")), Some(&Value::number(3.0)));
    }

    #[test]
    fn test_to_css() {
        assert_eq!(Value::quoted("x").to_css(false).unwrap(), "x");
        assert_eq!(Value::quoted("x").to_css(true).unwrap(), "\"x\"");
        assert_eq!(Value::Null.to_css(true).unwrap(), "");
        assert!(Value::Map(SassMap::new()).to_css(true).is_err());
    }
}
