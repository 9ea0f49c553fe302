use crate::error::MetadataError;
use crate::model::common::{json_kind, normalize_identifier, parse_boolean};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The closed set of attribute variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeType {
    Integer,
    PositiveInteger,
    NonnegativeInteger,
    BoundedInteger,
    Float,
    PositiveFloat,
    NonnegativeFloat,
    BoundedFloat,
    String,
    UnrestrictedString,
    OptionString,
    StringList,
    UnrestrictedStringList,
    OptionStringList,
    IntegerList,
    FloatList,
    Boolean,
    ResourceReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Float,
}

impl AttributeType {
    pub const ALL: [AttributeType; 18] = [
        AttributeType::Integer,
        AttributeType::PositiveInteger,
        AttributeType::NonnegativeInteger,
        AttributeType::BoundedInteger,
        AttributeType::Float,
        AttributeType::PositiveFloat,
        AttributeType::NonnegativeFloat,
        AttributeType::BoundedFloat,
        AttributeType::String,
        AttributeType::UnrestrictedString,
        AttributeType::OptionString,
        AttributeType::StringList,
        AttributeType::UnrestrictedStringList,
        AttributeType::OptionStringList,
        AttributeType::IntegerList,
        AttributeType::FloatList,
        AttributeType::Boolean,
        AttributeType::ResourceReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Integer => "Integer",
            AttributeType::PositiveInteger => "PositiveInteger",
            AttributeType::NonnegativeInteger => "NonnegativeInteger",
            AttributeType::BoundedInteger => "BoundedInteger",
            AttributeType::Float => "Float",
            AttributeType::PositiveFloat => "PositiveFloat",
            AttributeType::NonnegativeFloat => "NonnegativeFloat",
            AttributeType::BoundedFloat => "BoundedFloat",
            AttributeType::String => "String",
            AttributeType::UnrestrictedString => "UnrestrictedString",
            AttributeType::OptionString => "OptionString",
            AttributeType::StringList => "StringList",
            AttributeType::UnrestrictedStringList => "UnrestrictedStringList",
            AttributeType::OptionStringList => "OptionStringList",
            AttributeType::IntegerList => "IntegerList",
            AttributeType::FloatList => "FloatList",
            AttributeType::Boolean => "Boolean",
            AttributeType::ResourceReference => "ResourceReference",
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(
            self,
            AttributeType::BoundedInteger | AttributeType::BoundedFloat
        )
    }

    /// Kind of number the bounds of a bounded variant must have
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            AttributeType::Integer
            | AttributeType::PositiveInteger
            | AttributeType::NonnegativeInteger
            | AttributeType::BoundedInteger
            | AttributeType::IntegerList => Some(NumericKind::Integer),
            AttributeType::Float
            | AttributeType::PositiveFloat
            | AttributeType::NonnegativeFloat
            | AttributeType::BoundedFloat
            | AttributeType::FloatList => Some(NumericKind::Float),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            AttributeType::StringList
                | AttributeType::UnrestrictedStringList
                | AttributeType::OptionStringList
                | AttributeType::IntegerList
                | AttributeType::FloatList
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MetadataError::UnknownType(format!("'{}' is not an attribute type", s)))
    }
}

/// A numeric bound. The JSON literal kind is preserved: `0` is an integer
/// bound, `0.0` a float bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Integer(i64),
    Float(f64),
}

impl Bound {
    fn kind(&self) -> NumericKind {
        match self {
            Bound::Integer(_) => NumericKind::Integer,
            Bound::Float(_) => NumericKind::Float,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Bound::Integer(_) => true,
            Bound::Float(f) => f.is_finite(),
        }
    }

    /// Exact comparison of two bounds of the same kind; mixed kinds are
    /// unordered.
    fn partial_cmp_exact(&self, other: &Bound) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Bound::Integer(a), Bound::Integer(b)) => Some(a.cmp(b)),
            (Bound::Float(a), Bound::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    fn from_json(name: &str, raw: &Value) -> Result<Self, MetadataError> {
        match raw {
            Value::Number(n) if n.is_f64() => n
                .as_f64()
                .map(Bound::Float)
                .ok_or_else(|| MetadataError::MalformedValue(format!("{} is not finite", name))),
            Value::Number(n) => n.as_i64().map(Bound::Integer).ok_or_else(|| {
                MetadataError::OutOfBounds(format!("{} {} exceeds the 64-bit range", name, n))
            }),
            other => Err(MetadataError::MalformedValue(format!(
                "{} must be a number, got {}",
                name,
                json_kind(other)
            ))),
        }
    }

    pub fn to_json(self) -> Value {
        match self {
            Bound::Integer(i) => Value::from(i),
            Bound::Float(f) => Value::from(f),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Bound::Integer(i) => write!(f, "{}", i),
            Bound::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Variant-specific constraints carried alongside a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min: Option<Bound>,
    pub max: Option<Bound>,
    pub options: Option<Vec<String>>,
    pub many: Option<bool>,
}

impl Constraints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bounded(min: Bound, max: Bound) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }

    pub fn options(options: Vec<String>) -> Self {
        Self {
            options: Some(options),
            ..Self::default()
        }
    }

    pub fn many(many: bool) -> Self {
        Self {
            many: Some(many),
            ..Self::default()
        }
    }

    /// Parse constraints from the loose JSON of a wire record and check them
    /// against the variant.
    pub fn from_raw(
        attribute_type: AttributeType,
        min: Option<&Value>,
        max: Option<&Value>,
        options: Option<&Value>,
        many: Option<&Value>,
    ) -> Result<Self, MetadataError> {
        let min = min.map(|v| Bound::from_json("min", v)).transpose()?;
        let max = max.map(|v| Bound::from_json("max", v)).transpose()?;

        let options = match options {
            None => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s.clone()),
                        other => Err(MetadataError::MalformedValue(format!(
                            "options must all be strings, found {}",
                            json_kind(other)
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => {
                return Err(MetadataError::MalformedValue(format!(
                    "options must be a list of strings, got {}",
                    json_kind(other)
                )))
            }
        };

        let many = many
            .map(|v| {
                parse_boolean(v).map_err(|_| {
                    MetadataError::MalformedValue(format!("'many' must be a boolean, got {}", v))
                })
            })
            .transpose()?;

        let constraints = Self {
            min,
            max,
            options,
            many,
        };
        constraints.check_for(attribute_type)?;
        Ok(constraints)
    }

    /// Check that these constraints are exactly the ones the variant takes.
    pub fn check_for(&self, attribute_type: AttributeType) -> Result<(), MetadataError> {
        if attribute_type.is_bounded() {
            let (min, max) = match (self.min, self.max) {
                (Some(min), Some(max)) => (min, max),
                _ => {
                    return Err(MetadataError::MalformedValue(format!(
                        "{} requires both 'min' and 'max'",
                        attribute_type
                    )))
                }
            };
            let expected = attribute_type.numeric_kind();
            for (name, bound) in [("min", min), ("max", max)] {
                if Some(bound.kind()) != expected {
                    return Err(MetadataError::MalformedValue(format!(
                        "{} bound {} is not valid for {}",
                        name, bound, attribute_type
                    )));
                }
                if !bound.is_finite() {
                    return Err(MetadataError::MalformedValue(format!(
                        "{} bound {} must be finite",
                        name, bound
                    )));
                }
            }
            if min.partial_cmp_exact(&max) != Some(std::cmp::Ordering::Less) {
                return Err(MetadataError::MalformedValue(format!(
                    "'min' ({}) must be less than 'max' ({})",
                    min, max
                )));
            }
        } else if self.min.is_some() || self.max.is_some() {
            return Err(MetadataError::MalformedValue(format!(
                "{} does not accept 'min'/'max'",
                attribute_type
            )));
        }

        let takes_options = matches!(
            attribute_type,
            AttributeType::OptionString | AttributeType::OptionStringList
        );
        match (attribute_type, &self.options) {
            (t, None) if takes_options => {
                return Err(MetadataError::MalformedValue(format!(
                    "{} requires 'options'",
                    t
                )))
            }
            (_, Some(options)) if takes_options && options.is_empty() => {
                return Err(MetadataError::MalformedValue(
                    "'options' must not be empty".to_string(),
                ))
            }
            (_, Some(_)) if takes_options => {}
            (_, None) => {}
            (other, Some(_)) => {
                return Err(MetadataError::MalformedValue(format!(
                    "{} does not accept 'options'",
                    other
                )))
            }
        }

        match (attribute_type, self.many) {
            (AttributeType::ResourceReference, None) => Err(MetadataError::MalformedValue(
                "ResourceReference requires 'many'".to_string(),
            )),
            (AttributeType::ResourceReference, Some(_)) | (_, None) => Ok(()),
            (other, Some(_)) => Err(MetadataError::MalformedValue(format!(
                "{} does not accept 'many'",
                other
            ))),
        }
    }
}

/// A validated attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    IntegerList(Vec<i64>),
    FloatList(Vec<f64>),
    StringList(Vec<String>),
    Resource(Uuid),
    ResourceList(Vec<Uuid>),
}

impl AttributeValue {
    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Integer(i) => Value::from(*i),
            AttributeValue::Float(f) => Value::from(*f),
            AttributeValue::String(s) => Value::from(s.as_str()),
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::IntegerList(items) => Value::from(items.clone()),
            AttributeValue::FloatList(items) => Value::from(items.clone()),
            AttributeValue::StringList(items) => Value::from(items.clone()),
            AttributeValue::Resource(id) => Value::from(id.to_string()),
            AttributeValue::ResourceList(ids) => {
                Value::Array(ids.iter().map(|id| Value::from(id.to_string())).collect())
            }
        }
    }

    /// Resource ids referenced by this value, empty for non-reference values
    pub fn resource_ids(&self) -> Vec<Uuid> {
        match self {
            AttributeValue::Resource(id) => vec![*id],
            AttributeValue::ResourceList(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }
}

/// A typed, validated value. Only obtainable through the constructors below,
/// so an `Attribute` always satisfies its variant's rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "AttributeRecord", try_from = "AttributeRecord")]
pub struct Attribute {
    attribute_type: AttributeType,
    value: Option<AttributeValue>,
    constraints: Constraints,
}

/// Wire form of an [`Attribute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub attribute_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub many: Option<Value>,
}

impl Attribute {
    /// Construct an attribute, rejecting `null`.
    pub fn new(
        attribute_type: AttributeType,
        raw: &Value,
        constraints: Constraints,
    ) -> Result<Self, MetadataError> {
        constraints.check_for(attribute_type)?;
        let value = validate_value(attribute_type, raw, &constraints)?;
        Ok(Self {
            attribute_type,
            value: Some(value),
            constraints,
        })
    }

    /// Construct an attribute that may hold no value, as happens for empty
    /// cells in annotation tables.
    pub fn nullable(
        attribute_type: AttributeType,
        raw: &Value,
        constraints: Constraints,
    ) -> Result<Self, MetadataError> {
        if raw.is_null() {
            constraints.check_for(attribute_type)?;
            return Ok(Self {
                attribute_type,
                value: None,
                constraints,
            });
        }
        Self::new(attribute_type, raw, constraints)
    }

    pub fn integer(value: i64) -> Self {
        Self {
            attribute_type: AttributeType::Integer,
            value: Some(AttributeValue::Integer(value)),
            constraints: Constraints::none(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            attribute_type: AttributeType::Boolean,
            value: Some(AttributeValue::Boolean(value)),
            constraints: Constraints::none(),
        }
    }

    pub fn unrestricted_string(value: impl Into<String>) -> Self {
        Self {
            attribute_type: AttributeType::UnrestrictedString,
            value: Some(AttributeValue::String(value.into())),
            constraints: Constraints::none(),
        }
    }

    pub fn string(value: &str) -> Result<Self, MetadataError> {
        Self::new(AttributeType::String, &Value::from(value), Constraints::none())
    }

    pub fn float(value: f64) -> Result<Self, MetadataError> {
        Self::new(AttributeType::Float, &Value::from(value), Constraints::none())
    }

    pub fn bounded_float(value: f64, min: f64, max: f64) -> Result<Self, MetadataError> {
        Self::new(
            AttributeType::BoundedFloat,
            &Value::from(value),
            Constraints::bounded(Bound::Float(min), Bound::Float(max)),
        )
    }

    pub fn bounded_integer(value: i64, min: i64, max: i64) -> Result<Self, MetadataError> {
        Self::new(
            AttributeType::BoundedInteger,
            &Value::from(value),
            Constraints::bounded(Bound::Integer(min), Bound::Integer(max)),
        )
    }

    pub fn option_string(value: &str, options: Vec<String>) -> Result<Self, MetadataError> {
        Self::new(
            AttributeType::OptionString,
            &Value::from(value),
            Constraints::options(options),
        )
    }

    pub fn resource_reference(raw: &Value, many: bool) -> Result<Self, MetadataError> {
        Self::new(AttributeType::ResourceReference, raw, Constraints::many(many))
    }

    /// Rebuild an attribute from its wire record. A `null` value yields a
    /// nullable attribute so that [`Attribute::to_record`] round-trips.
    pub fn from_record(record: &AttributeRecord) -> Result<Self, MetadataError> {
        let attribute_type = AttributeType::from_str(&record.attribute_type)?;
        let constraints = Constraints::from_raw(
            attribute_type,
            record.min.as_ref(),
            record.max.as_ref(),
            record.options.as_ref(),
            record.many.as_ref(),
        )?;
        Self::nullable(attribute_type, &record.value, constraints)
    }

    /// Parse a raw JSON object as an attribute record, then build it
    pub fn from_value(raw: &Value) -> Result<Self, MetadataError> {
        let record: AttributeRecord = serde_json::from_value(raw.clone())
            .map_err(|e| MetadataError::MalformedValue(format!("bad attribute record: {}", e)))?;
        Self::from_record(&record)
    }

    pub fn to_record(&self) -> AttributeRecord {
        AttributeRecord {
            attribute_type: self.attribute_type.as_str().to_string(),
            value: self.value_json(),
            min: self.constraints.min.map(Bound::to_json),
            max: self.constraints.max.map(Bound::to_json),
            options: self.constraints.options.clone().map(Value::from),
            many: self.constraints.many.map(Value::Bool),
        }
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn value(&self) -> Option<&AttributeValue> {
        self.value.as_ref()
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// The bare value as JSON (`null` for a nullable attribute without one)
    pub fn value_json(&self) -> Value {
        self.value
            .as_ref()
            .map(AttributeValue::to_json)
            .unwrap_or(Value::Null)
    }
}

impl From<Attribute> for AttributeRecord {
    fn from(attribute: Attribute) -> Self {
        attribute.to_record()
    }
}

impl TryFrom<AttributeRecord> for Attribute {
    type Error = MetadataError;

    fn try_from(record: AttributeRecord) -> Result<Self, Self::Error> {
        Attribute::from_record(&record)
    }
}

fn validate_value(
    attribute_type: AttributeType,
    raw: &Value,
    constraints: &Constraints,
) -> Result<AttributeValue, MetadataError> {
    match attribute_type {
        AttributeType::Integer => parse_integer(raw).map(AttributeValue::Integer),
        AttributeType::PositiveInteger => {
            let v = parse_integer(raw)?;
            if v <= 0 {
                return Err(MetadataError::OutOfBounds(format!(
                    "{} is not a positive integer",
                    v
                )));
            }
            Ok(AttributeValue::Integer(v))
        }
        AttributeType::NonnegativeInteger => {
            let v = parse_integer(raw)?;
            if v < 0 {
                return Err(MetadataError::OutOfBounds(format!("{} is negative", v)));
            }
            Ok(AttributeValue::Integer(v))
        }
        AttributeType::BoundedInteger => {
            let v = parse_integer(raw)?;
            check_bounds(Bound::Integer(v), constraints)?;
            Ok(AttributeValue::Integer(v))
        }
        AttributeType::Float => parse_float(raw).map(AttributeValue::Float),
        AttributeType::PositiveFloat => {
            let v = parse_float(raw)?;
            if v <= 0.0 {
                return Err(MetadataError::OutOfBounds(format!(
                    "{:?} is not a positive number",
                    v
                )));
            }
            Ok(AttributeValue::Float(v))
        }
        AttributeType::NonnegativeFloat => {
            let v = parse_float(raw)?;
            if v < 0.0 {
                return Err(MetadataError::OutOfBounds(format!("{:?} is negative", v)));
            }
            Ok(AttributeValue::Float(v))
        }
        AttributeType::BoundedFloat => {
            let v = parse_float(raw)?;
            check_bounds(Bound::Float(v), constraints)?;
            Ok(AttributeValue::Float(v))
        }
        AttributeType::String => {
            let s = parse_str(raw)?;
            normalize_identifier(s).map(AttributeValue::String)
        }
        AttributeType::UnrestrictedString => {
            parse_str(raw).map(|s| AttributeValue::String(s.to_string()))
        }
        AttributeType::OptionString => {
            parse_option(raw, constraints).map(|s| AttributeValue::String(s.to_string()))
        }
        AttributeType::OptionStringList => {
            parse_list(raw, |item| parse_option(item, constraints).map(str::to_string))
                .map(AttributeValue::StringList)
        }
        AttributeType::StringList => parse_list(raw, |item| normalize_identifier(parse_str(item)?))
            .map(AttributeValue::StringList),
        AttributeType::UnrestrictedStringList => {
            parse_list(raw, |item| parse_str(item).map(str::to_string))
                .map(AttributeValue::StringList)
        }
        AttributeType::IntegerList => parse_list(raw, parse_integer).map(AttributeValue::IntegerList),
        AttributeType::FloatList => parse_list(raw, parse_float).map(AttributeValue::FloatList),
        AttributeType::Boolean => parse_boolean(raw).map(AttributeValue::Boolean),
        AttributeType::ResourceReference => parse_resources(raw, constraints.many.unwrap_or(false)),
    }
}

fn parse_integer(raw: &Value) -> Result<i64, MetadataError> {
    match raw {
        Value::Number(n) if n.is_f64() => Err(MetadataError::MalformedValue(format!(
            "expected an integer, got float literal {}",
            n
        ))),
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            MetadataError::OutOfBounds(format!("{} exceeds the 64-bit integer range", n))
        }),
        other => Err(MetadataError::MalformedValue(format!(
            "expected an integer, got {}",
            json_kind(other)
        ))),
    }
}

/// Integer literals widen to float: JSON encoders commonly write `1.0` as `1`.
fn parse_float(raw: &Value) -> Result<f64, MetadataError> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| MetadataError::MalformedValue(format!("{} is not finite", n))),
        other => Err(MetadataError::MalformedValue(format!(
            "expected a number, got {} {}",
            json_kind(other),
            other
        ))),
    }
}

fn parse_str(raw: &Value) -> Result<&str, MetadataError> {
    raw.as_str().ok_or_else(|| {
        MetadataError::MalformedValue(format!("expected a string, got {}", json_kind(raw)))
    })
}

fn parse_option<'v>(raw: &'v Value, constraints: &Constraints) -> Result<&'v str, MetadataError> {
    let s = parse_str(raw)?;
    let options = constraints.options.as_deref().unwrap_or_default();
    if !options.iter().any(|o| o == s) {
        return Err(MetadataError::OutOfBounds(format!(
            "'{}' is not one of the options [{}]",
            s,
            options.join(", ")
        )));
    }
    Ok(s)
}

fn parse_list<T>(
    raw: &Value,
    parse_item: impl Fn(&Value) -> Result<T, MetadataError>,
) -> Result<Vec<T>, MetadataError> {
    let items = raw.as_array().ok_or_else(|| {
        MetadataError::MalformedValue(format!("expected a list, got {}", json_kind(raw)))
    })?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_item(item).map_err(|e| e.in_context(format!("item {}", idx))))
        .collect()
}

fn check_bounds(v: Bound, constraints: &Constraints) -> Result<(), MetadataError> {
    use std::cmp::Ordering;

    // Bounds are present and of the value's kind, see Constraints::check_for
    if let (Some(min), Some(max)) = (constraints.min, constraints.max) {
        let above_min = matches!(v.partial_cmp_exact(&min), Some(Ordering::Greater | Ordering::Equal));
        let below_max = matches!(v.partial_cmp_exact(&max), Some(Ordering::Less | Ordering::Equal));
        if !(above_min && below_max) {
            return Err(MetadataError::OutOfBounds(format!(
                "{} is outside [{}, {}]",
                v, min, max
            )));
        }
    }
    Ok(())
}

fn parse_uuid(raw: &Value) -> Result<Uuid, MetadataError> {
    let s = parse_str(raw)?;
    Uuid::parse_str(s.trim())
        .map_err(|_| MetadataError::MalformedValue(format!("'{}' is not a valid UUID", s)))
}

fn parse_resources(raw: &Value, many: bool) -> Result<AttributeValue, MetadataError> {
    match (raw, many) {
        (Value::Array(_), false) => Err(MetadataError::CardinalityViolation(
            "a single resource is expected, got a list".to_string(),
        )),
        (Value::Array(items), true) => {
            if items.is_empty() {
                return Err(MetadataError::CardinalityViolation(
                    "at least one resource is required".to_string(),
                ));
            }
            parse_list(raw, parse_uuid).map(AttributeValue::ResourceList)
        }
        (Value::String(_), true) => Err(MetadataError::CardinalityViolation(
            "a list of resources is expected, got a single value".to_string(),
        )),
        (_, _) => parse_uuid(raw).map(AttributeValue::Resource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bounded_int(min: i64, max: i64) -> Constraints {
        Constraints::bounded(Bound::Integer(min), Bound::Integer(max))
    }

    fn bounded_float(min: f64, max: f64) -> Constraints {
        Constraints::bounded(Bound::Float(min), Bound::Float(max))
    }

    #[test]
    fn test_bounded_integer_requires_integer_in_range() {
        let t = AttributeType::BoundedInteger;
        for v in 0..=5 {
            assert!(Attribute::new(t, &json!(v), bounded_int(0, 5)).is_ok());
        }
        assert!(matches!(
            Attribute::new(t, &json!(6), bounded_int(0, 5)),
            Err(MetadataError::OutOfBounds(_))
        ));
        assert!(matches!(
            Attribute::new(t, &json!(-1), bounded_int(0, 5)),
            Err(MetadataError::OutOfBounds(_))
        ));
        // Float literal for an integer variant is a kind error, not coerced
        assert!(matches!(
            Attribute::new(t, &json!(3.0), bounded_int(0, 5)),
            Err(MetadataError::MalformedValue(_))
        ));
    }

    #[test]
    fn test_bounds_must_match_variant_kind_and_order() {
        let err = Attribute::new(
            AttributeType::BoundedFloat,
            &json!(0.5),
            Constraints::bounded(Bound::Integer(0), Bound::Float(1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, MetadataError::MalformedValue(_)));

        let err = Attribute::new(
            AttributeType::BoundedInteger,
            &json!(1),
            Constraints::bounded(Bound::Float(0.0), Bound::Float(5.0)),
        )
        .unwrap_err();
        assert!(matches!(err, MetadataError::MalformedValue(_)));

        assert!(Attribute::new(AttributeType::BoundedInteger, &json!(1), bounded_int(5, 5)).is_err());
        assert!(Attribute::new(AttributeType::BoundedInteger, &json!(1), bounded_int(5, 0)).is_err());
    }

    #[test]
    fn test_bounded_float_edges() {
        let t = AttributeType::BoundedFloat;
        assert!(Attribute::new(t, &json!(0.0), bounded_float(0.0, 1.0)).is_ok());
        assert!(Attribute::new(t, &json!(1.0), bounded_float(0.0, 1.0)).is_ok());
        assert!(matches!(
            Attribute::new(t, &json!(1.1), bounded_float(0.0, 1.0)),
            Err(MetadataError::OutOfBounds(_))
        ));
        // Integer literals widen for float variants
        let widened = Attribute::new(t, &json!(1), bounded_float(0.0, 1.0)).unwrap();
        assert_eq!(widened.value(), Some(&AttributeValue::Float(1.0)));
        assert!(matches!(
            Attribute::new(t, &json!(2), bounded_float(0.0, 1.0)),
            Err(MetadataError::OutOfBounds(_))
        ));
        assert!(Attribute::new(AttributeType::FloatList, &json!([1, 2.5]), Constraints::none()).is_ok());
    }

    #[test]
    fn test_bounded_integer_compares_exactly_above_2_pow_53() {
        let t = AttributeType::BoundedInteger;
        let max = 1_i64 << 53;
        assert!(Attribute::new(t, &json!(max), bounded_int(0, max)).is_ok());
        assert!(matches!(
            Attribute::new(t, &json!(max + 1), bounded_int(0, max)),
            Err(MetadataError::OutOfBounds(_))
        ));

        // Adjacent bounds at the top of the range are distinct
        let top = Attribute::bounded_integer(i64::MAX, i64::MAX - 1, i64::MAX).unwrap();
        assert_eq!(top.value_json(), json!(i64::MAX));
        assert!(Attribute::bounded_integer(i64::MAX - 2, i64::MAX - 1, i64::MAX).is_err());
    }

    #[test]
    fn test_float_bounds_must_be_finite() {
        for (min, max) in [(f64::NAN, 1.0), (0.0, f64::NAN), (f64::NEG_INFINITY, 1.0), (0.0, f64::INFINITY)] {
            let err = Constraints::bounded(Bound::Float(min), Bound::Float(max))
                .check_for(AttributeType::BoundedFloat)
                .unwrap_err();
            assert!(matches!(err, MetadataError::MalformedValue(_)));
        }
        assert!(Attribute::bounded_float(-1e9, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_sign_constrained_numbers() {
        let none = Constraints::none;
        assert!(Attribute::new(AttributeType::PositiveInteger, &json!(1), none()).is_ok());
        assert!(Attribute::new(AttributeType::PositiveInteger, &json!(0), none()).is_err());
        assert!(Attribute::new(AttributeType::NonnegativeInteger, &json!(0), none()).is_ok());
        assert!(Attribute::new(AttributeType::NonnegativeInteger, &json!(-3), none()).is_err());
        assert!(Attribute::new(AttributeType::PositiveFloat, &json!(0.0), none()).is_err());
        assert!(Attribute::new(AttributeType::PositiveFloat, &json!(1e-9), none()).is_ok());
        assert!(Attribute::new(AttributeType::NonnegativeFloat, &json!(0.0), none()).is_ok());
        assert!(Attribute::new(AttributeType::NonnegativeFloat, &json!(-0.5), none()).is_err());
        assert!(Attribute::new(AttributeType::Integer, &json!("5"), none()).is_err());
    }

    #[test]
    fn test_boolean_canonical_forms() {
        let canonical = Attribute::boolean(true);
        for token in [json!(true), json!("true"), json!("True"), json!(1)] {
            let attr = Attribute::new(AttributeType::Boolean, &token, Constraints::none()).unwrap();
            assert_eq!(attr, canonical);
        }
        for token in [json!(2), json!(-1)] {
            assert!(Attribute::new(AttributeType::Boolean, &token, Constraints::none()).is_err());
        }
    }

    #[test]
    fn test_string_variants() {
        let attr = Attribute::string("my sample").unwrap();
        assert_eq!(attr.value_json(), json!("my_sample"));
        assert!(Attribute::string("9lives").is_err());

        let attr = Attribute::new(
            AttributeType::UnrestrictedString,
            &json!("anything #goes here!"),
            Constraints::none(),
        )
        .unwrap();
        assert_eq!(attr.value_json(), json!("anything #goes here!"));
        assert!(Attribute::new(AttributeType::UnrestrictedString, &json!(5), Constraints::none())
            .is_err());
    }

    #[test]
    fn test_option_string() {
        let options = vec!["left".to_string(), "right".to_string()];
        assert!(Attribute::option_string("left", options.clone()).is_ok());
        assert!(matches!(
            Attribute::option_string("up", options),
            Err(MetadataError::OutOfBounds(_))
        ));
        assert!(Attribute::option_string("left", vec![]).is_err());

        let err = Constraints::from_raw(
            AttributeType::OptionString,
            None,
            None,
            Some(&json!(["a", 1])),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MetadataError::MalformedValue(_)));
    }

    #[test]
    fn test_option_string_list() {
        let constraints = Constraints::options(vec!["I".to_string(), "II".to_string(), "III".to_string()]);
        let attr = Attribute::new(
            AttributeType::OptionStringList,
            &json!(["I", "III"]),
            constraints.clone(),
        )
        .unwrap();
        assert_eq!(attr.value_json(), json!(["I", "III"]));

        let err = Attribute::new(AttributeType::OptionStringList, &json!(["I", "IV"]), constraints)
            .unwrap_err();
        assert!(matches!(err, MetadataError::OutOfBounds(_)));

        assert!(Attribute::new(AttributeType::OptionStringList, &json!(["I"]), Constraints::none())
            .is_err());

        let from_record = Attribute::from_value(&json!({
            "attribute_type": "OptionStringList",
            "value": ["II"],
            "options": ["I", "II"]
        }))
        .unwrap();
        assert_eq!(from_record.attribute_type(), AttributeType::OptionStringList);
        assert_eq!(
            serde_json::to_value(&from_record).unwrap(),
            json!({"attribute_type": "OptionStringList", "value": ["II"], "options": ["I", "II"]})
        );
    }

    #[test]
    fn test_list_fails_as_a_whole() {
        let ok = Attribute::new(
            AttributeType::StringList,
            &json!(["a b", "c"]),
            Constraints::none(),
        )
        .unwrap();
        assert_eq!(ok.value_json(), json!(["a_b", "c"]));

        let err = Attribute::new(
            AttributeType::StringList,
            &json!(["fine", "-bad"]),
            Constraints::none(),
        )
        .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidIdentifier { .. }));

        assert!(Attribute::new(AttributeType::IntegerList, &json!([1, 2, 3.5]), Constraints::none())
            .is_err());
        assert!(Attribute::new(AttributeType::FloatList, &json!([0.5, 2.5]), Constraints::none())
            .is_ok());
        assert!(Attribute::new(AttributeType::StringList, &json!("a"), Constraints::none())
            .is_err());
    }

    #[test]
    fn test_resource_reference_arity() {
        let a = "0b3e1d0c-6f6a-4a8e-9c59-2b1a9f1c1a11";
        let b = "5f1f6c7e-3a2d-4b3c-8d9e-0f1a2b3c4d5e";

        let single = Attribute::resource_reference(&json!(a), false).unwrap();
        assert_eq!(single.value().unwrap().resource_ids().len(), 1);

        let many = Attribute::resource_reference(&json!([a, b]), true).unwrap();
        assert_eq!(many.value().unwrap().resource_ids().len(), 2);

        assert!(matches!(
            Attribute::resource_reference(&json!([a]), false),
            Err(MetadataError::CardinalityViolation(_))
        ));
        assert!(matches!(
            Attribute::resource_reference(&json!(a), true),
            Err(MetadataError::CardinalityViolation(_))
        ));
        assert!(matches!(
            Attribute::resource_reference(&json!([a, "not-a-uuid"]), true),
            Err(MetadataError::MalformedValue(_))
        ));
        assert!(Attribute::new(AttributeType::ResourceReference, &json!(a), Constraints::none())
            .is_err());
    }

    #[test]
    fn test_bounded_float_record() {
        let attr = Attribute::bounded_float(0.05, 0.0, 1.0).unwrap();
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(
            json,
            json!({"attribute_type": "BoundedFloat", "value": 0.05, "min": 0.0, "max": 1.0})
        );
        let back: Attribute = serde_json::from_value(json).unwrap();
        assert_eq!(back, attr);
    }

    #[test]
    fn test_string_record_round_trip_is_idempotent() {
        for raw in ["plain", "with space", "dots.and-dashes_1"] {
            let attr = Attribute::string(raw).unwrap();
            let once = Attribute::from_record(&attr.to_record()).unwrap();
            let twice = Attribute::from_record(&once.to_record()).unwrap();
            assert_eq!(once, attr);
            assert_eq!(twice, attr);
        }
    }

    #[test]
    fn test_unknown_type_and_null_values() {
        let err = Attribute::from_value(&json!({"attribute_type": "Complex", "value": 1})).unwrap_err();
        assert!(matches!(err, MetadataError::UnknownType(_)));

        assert!(matches!(
            Attribute::new(AttributeType::Integer, &Value::Null, Constraints::none()),
            Err(MetadataError::MalformedValue(_))
        ));

        let empty_cell =
            Attribute::from_value(&json!({"attribute_type": "Float", "value": null})).unwrap();
        assert!(empty_cell.is_null());
        assert_eq!(
            serde_json::to_value(&empty_cell).unwrap(),
            json!({"attribute_type": "Float", "value": null})
        );
    }

    #[test]
    fn test_structural_equality_includes_constraints() {
        let a = Attribute::bounded_integer(3, 0, 5).unwrap();
        let b = Attribute::bounded_integer(3, 0, 10).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, Attribute::bounded_integer(3, 0, 5).unwrap());
    }
}
