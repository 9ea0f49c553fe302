use crate::error::MetadataError;
use crate::model::attribute::{Attribute, AttributeType, Bound, Constraints};
use crate::model::common::json_kind;
use crate::model::element::{Element, ElementKind};
use crate::model::element_set::ElementSet;
use crate::model::resource::ResourceTypeRegistry;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Everything a field spec can describe: one of the attribute variants, a
/// single element, or an element set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Attribute(AttributeType),
    Element(ElementKind),
    ElementSet(ElementKind),
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Attribute(t) => t.as_str(),
            FieldType::Element(kind) => kind.as_str(),
            FieldType::ElementSet(kind) => kind.set_name(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Observation" => Ok(FieldType::Element(ElementKind::Observation)),
            "Feature" => Ok(FieldType::Element(ElementKind::Feature)),
            "ObservationSet" => Ok(FieldType::ElementSet(ElementKind::Observation)),
            "FeatureSet" => Ok(FieldType::ElementSet(ElementKind::Feature)),
            other => AttributeType::from_str(other)
                .map(FieldType::Attribute)
                .map_err(|_| MetadataError::UnknownType(format!("'{}' is not a field type", other))),
        }
    }
}

/// Declarative wire form of a [`FieldSpec`], as found in pipeline
/// definitions. Unknown keys are rejected so typos fail ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpecRecord {
    pub attribute_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub many: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpecRecord {
    pub fn new(attribute_type: &str) -> Self {
        Self {
            attribute_type: attribute_type.to_string(),
            min: None,
            max: None,
            options: None,
            many: None,
            resource_types: None,
            default: None,
        }
    }
}

/// The expected shape of one pipeline input or output.
///
/// A spec holds no value of its own. When it declares a default, that
/// default has already been checked against the constraints, so a
/// `FieldSpec` with an unusable default cannot exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "FieldSpecRecord")]
pub struct FieldSpec {
    field_type: FieldType,
    constraints: Constraints,
    resource_types: Vec<String>,
    default: Option<Value>,
}

impl FieldSpec {
    pub fn integer(default: Option<i64>) -> Result<Self, MetadataError> {
        Self::attribute_field(AttributeType::Integer, Constraints::none(), default.map(Value::from))
    }

    pub fn positive_integer(default: Option<i64>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::PositiveInteger,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn nonnegative_integer(default: Option<i64>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::NonnegativeInteger,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn bounded_integer(min: i64, max: i64, default: Option<i64>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::BoundedInteger,
            Constraints::bounded(Bound::Integer(min), Bound::Integer(max)),
            default.map(Value::from),
        )
    }

    pub fn float(default: Option<f64>) -> Result<Self, MetadataError> {
        Self::attribute_field(AttributeType::Float, Constraints::none(), default.map(Value::from))
    }

    pub fn positive_float(default: Option<f64>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::PositiveFloat,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn nonnegative_float(default: Option<f64>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::NonnegativeFloat,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn bounded_float(min: f64, max: f64, default: Option<f64>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::BoundedFloat,
            Constraints::bounded(Bound::Float(min), Bound::Float(max)),
            default.map(Value::from),
        )
    }

    pub fn string(default: Option<&str>) -> Result<Self, MetadataError> {
        Self::attribute_field(AttributeType::String, Constraints::none(), default.map(Value::from))
    }

    pub fn unrestricted_string(default: Option<&str>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::UnrestrictedString,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn option_string(options: Vec<String>, default: Option<&str>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::OptionString,
            Constraints::options(options),
            default.map(Value::from),
        )
    }

    pub fn option_string_list(
        options: Vec<String>,
        default: Option<Vec<String>>,
    ) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::OptionStringList,
            Constraints::options(options),
            default.map(Value::from),
        )
    }

    pub fn string_list(default: Option<Vec<String>>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::StringList,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn unrestricted_string_list(default: Option<Vec<String>>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::UnrestrictedStringList,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn integer_list(default: Option<Vec<i64>>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::IntegerList,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn float_list(default: Option<Vec<f64>>) -> Result<Self, MetadataError> {
        Self::attribute_field(
            AttributeType::FloatList,
            Constraints::none(),
            default.map(Value::from),
        )
    }

    pub fn boolean(default: Option<bool>) -> Result<Self, MetadataError> {
        Self::attribute_field(AttributeType::Boolean, Constraints::none(), default.map(Value::Bool))
    }

    /// A field that takes one (or, with `many`, several) resources whose type
    /// is in `resource_types`.
    pub fn resource_reference(
        many: bool,
        resource_types: Vec<String>,
        registry: &ResourceTypeRegistry,
    ) -> Result<Self, MetadataError> {
        check_resource_types(&resource_types, registry)?;
        Self::build(
            FieldType::Attribute(AttributeType::ResourceReference),
            Constraints::many(many),
            resource_types,
            None,
        )
    }

    pub fn element(kind: ElementKind) -> Self {
        Self {
            field_type: FieldType::Element(kind),
            constraints: Constraints::none(),
            resource_types: Vec::new(),
            default: None,
        }
    }

    pub fn element_set(kind: ElementKind) -> Self {
        Self {
            field_type: FieldType::ElementSet(kind),
            constraints: Constraints::none(),
            resource_types: Vec::new(),
            default: None,
        }
    }

    /// Build a spec from its declarative record, as done at pipeline
    /// ingestion.
    pub fn from_record(
        record: &FieldSpecRecord,
        registry: &ResourceTypeRegistry,
    ) -> Result<Self, MetadataError> {
        let field_type = FieldType::from_str(&record.attribute_type)?;

        match field_type {
            FieldType::Attribute(attribute_type) => {
                let constraints = Constraints::from_raw(
                    attribute_type,
                    record.min.as_ref(),
                    record.max.as_ref(),
                    record.options.as_ref(),
                    record.many.as_ref(),
                )?;

                let resource_types = match (attribute_type, &record.resource_types) {
                    (AttributeType::ResourceReference, raw) => {
                        let tags = parse_resource_types(raw.as_ref())?;
                        check_resource_types(&tags, registry)?;
                        tags
                    }
                    (_, None) => Vec::new(),
                    (other, Some(_)) => {
                        return Err(MetadataError::MalformedValue(format!(
                            "{} does not accept 'resource_types'",
                            other
                        )))
                    }
                };

                Self::build(field_type, constraints, resource_types, record.default.clone())
            }
            FieldType::Element(_) | FieldType::ElementSet(_) => {
                let has_constraints = record.min.is_some()
                    || record.max.is_some()
                    || record.options.is_some()
                    || record.many.is_some()
                    || record.resource_types.is_some();
                if has_constraints {
                    return Err(MetadataError::MalformedValue(format!(
                        "{} fields take no constraints",
                        field_type
                    )));
                }
                Self::build(field_type, Constraints::none(), Vec::new(), record.default.clone())
            }
        }
    }

    pub fn to_record(&self) -> FieldSpecRecord {
        let mut record = FieldSpecRecord::new(self.field_type.as_str());
        record.min = self.constraints.min.map(Bound::to_json);
        record.max = self.constraints.max.map(Bound::to_json);
        record.options = self.constraints.options.clone().map(Value::from);
        record.many = self.constraints.many.map(Value::Bool);
        if !self.resource_types.is_empty() {
            record.resource_types = Some(Value::from(self.resource_types.clone()));
        }
        record.default = self.default.clone();
        record
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn resource_types(&self) -> &[String] {
        &self.resource_types
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_resource_reference(&self) -> bool {
        self.field_type == FieldType::Attribute(AttributeType::ResourceReference)
    }

    pub fn accepts_resource_type(&self, resource_type: &str) -> bool {
        self.resource_types.iter().any(|t| t == resource_type)
    }

    /// Build the concrete value this spec describes from a raw JSON value.
    /// Resource references are only checked for shape here; resolving them
    /// against the catalog is the input validator's job.
    pub fn instantiate(&self, raw: &Value) -> Result<FieldValue, MetadataError> {
        match self.field_type {
            FieldType::Attribute(t) => {
                Attribute::new(t, raw, self.constraints.clone()).map(FieldValue::Attribute)
            }
            FieldType::Element(_) => Element::from_value(raw).map(FieldValue::Element),
            FieldType::ElementSet(kind) => {
                ElementSet::from_value(kind, raw).map(FieldValue::ElementSet)
            }
        }
    }

    fn attribute_field(
        attribute_type: AttributeType,
        constraints: Constraints,
        default: Option<Value>,
    ) -> Result<Self, MetadataError> {
        Self::build(
            FieldType::Attribute(attribute_type),
            constraints,
            Vec::new(),
            default,
        )
    }

    fn build(
        field_type: FieldType,
        constraints: Constraints,
        resource_types: Vec<String>,
        default: Option<Value>,
    ) -> Result<Self, MetadataError> {
        if let FieldType::Attribute(t) = field_type {
            constraints.check_for(t)?;
        }

        let spec = Self {
            field_type,
            constraints,
            resource_types,
            default: None,
        };

        let default = match default {
            None | Some(Value::Null) => None,
            Some(_) if spec.is_resource_reference() => {
                return Err(MetadataError::MalformedValue(
                    "resource fields cannot declare a default".to_string(),
                ))
            }
            Some(raw) => {
                // Construct and throw away: only the raw default is kept
                spec.instantiate(&raw)
                    .map_err(|e| e.in_context("default"))?;
                Some(raw)
            }
        };

        Ok(Self { default, ..spec })
    }
}

fn parse_resource_types(raw: Option<&Value>) -> Result<Vec<String>, MetadataError> {
    match raw {
        None => Err(MetadataError::MalformedValue(
            "ResourceReference requires 'resource_types'".to_string(),
        )),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    MetadataError::MalformedValue(format!(
                        "resource types must be strings, found {}",
                        json_kind(item)
                    ))
                })
            })
            .collect(),
        Some(other) => Err(MetadataError::MalformedValue(format!(
            "'resource_types' must be a list, got {}",
            json_kind(other)
        ))),
    }
}

fn check_resource_types(
    tags: &[String],
    registry: &ResourceTypeRegistry,
) -> Result<(), MetadataError> {
    if tags.is_empty() {
        return Err(MetadataError::MalformedValue(
            "'resource_types' must list at least one type".to_string(),
        ));
    }
    tags.iter().try_for_each(|tag| registry.check(tag))
}

impl From<FieldSpec> for FieldSpecRecord {
    fn from(spec: FieldSpec) -> Self {
        spec.to_record()
    }
}

/// A validated value for one field, ready to hand to a job runner.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Optional field left empty
    Null,
    Attribute(Attribute),
    Element(Element),
    ElementSet(ElementSet),
}

impl FieldValue {
    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            FieldValue::Attribute(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Attributes serialize as their bare value, elements and sets as records.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Attribute(a) => a.value_json().serialize(serializer),
            FieldValue::Element(e) => e.serialize(serializer),
            FieldValue::ElementSet(s) => s.serialize(serializer),
        }
    }
}
