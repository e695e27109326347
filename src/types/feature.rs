//! Point feature types.

use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a feature (the host's object id).
///
/// Implements `Ord` so every collection keyed by it iterates deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId(u64);

impl FeatureId {
    /// Create a new FeatureId.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FeatureId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Attribute value types carried by host records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Missing value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    String(String),
}

/// A raw point record as handed over by the host platform.
///
/// Geometry and attributes are unchecked; [`PointFeature::from_source`]
/// turns a record into a validated feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFeature {
    /// Host object id.
    pub id: FeatureId,
    /// Point geometry, `None` for null shapes.
    #[serde(default)]
    pub geometry: Option<Point<f64>>,
    /// Attribute table row.
    #[serde(default)]
    pub properties: BTreeMap<String, AttributeValue>,
}

impl SourceFeature {
    /// Create a record with a geometry and no attributes.
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id: FeatureId::new(id),
            geometry: Some(Point::new(x, y)),
            properties: BTreeMap::new(),
        }
    }

    /// Create a record without geometry.
    pub fn null_geometry(id: u64) -> Self {
        Self {
            id: FeatureId::new(id),
            geometry: None,
            properties: BTreeMap::new(),
        }
    }

    /// Set an attribute.
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Set a text attribute.
    pub fn with_text(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_property(key, AttributeValue::String(value.into()))
    }

    /// Get an attribute.
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Why a source record could not become a [`PointFeature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Record has no geometry.
    NullGeometry,
    /// Geometry has a NaN or infinite coordinate.
    DegenerateGeometry,
    /// The type field is absent on this record.
    MissingType,
    /// The type field holds a value that cannot name a category.
    UnsupportedTypeValue,
    /// Another record with the same id was already accepted.
    DuplicateId,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullGeometry => write!(f, "null geometry"),
            Self::DegenerateGeometry => write!(f, "degenerate geometry"),
            Self::MissingType => write!(f, "missing type value"),
            Self::UnsupportedTypeValue => write!(f, "unsupported type value"),
            Self::DuplicateId => write!(f, "duplicate feature id"),
        }
    }
}

/// A validated point feature taking part in generalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    /// Feature identity.
    pub id: FeatureId,
    /// Categorical type (e.g. "school", "pharmacy").
    pub feature_type: String,
    /// Point location in ground units.
    pub location: Point<f64>,
}

impl PointFeature {
    /// Whether the location has a NaN or infinite coordinate.
    pub fn is_degenerate(&self) -> bool {
        !self.location.x().is_finite() || !self.location.y().is_finite()
    }

    /// Create a new point feature.
    pub fn new(id: u64, feature_type: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: FeatureId::new(id),
            feature_type: feature_type.into(),
            location: Point::new(x, y),
        }
    }

    /// Validate a source record, reading the category from `type_field`.
    pub fn from_source(source: &SourceFeature, type_field: &str) -> Result<Self, SkipReason> {
        let location = source.geometry.ok_or(SkipReason::NullGeometry)?;
        if !location.x().is_finite() || !location.y().is_finite() {
            return Err(SkipReason::DegenerateGeometry);
        }

        let feature_type = match source.get_property(type_field) {
            None => return Err(SkipReason::MissingType),
            Some(AttributeValue::String(s)) => s.clone(),
            Some(AttributeValue::Int(i)) => i.to_string(),
            Some(_) => return Err(SkipReason::UnsupportedTypeValue),
        };

        Ok(Self {
            id: source.id,
            feature_type,
            location,
        })
    }
}

/// Lifecycle of a feature inside the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    /// Still in the working set and not yet processed.
    Active,
    /// Processed without conflicts; copied to the output, left in place.
    PassedThrough,
    /// Kept as the representative of a cluster and removed.
    Representative,
    /// Removed because a higher-priority representative covers it.
    Cleared,
    /// Replaced by a merged centroid and removed.
    Merged,
    /// Dropped because its geometry turned out to be unusable.
    Skipped,
}

impl FeatureStatus {
    /// Whether a feature with this status is still in the working set.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Active | Self::PassedThrough)
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::PassedThrough => write!(f, "passed_through"),
            Self::Representative => write!(f, "representative"),
            Self::Cleared => write!(f, "cleared"),
            Self::Merged => write!(f, "merged"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}
