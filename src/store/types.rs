use crate::error::{CorrectionError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Products below this are clamped before taking the geometric mean.
pub const MIN_SIZE_PRODUCT: f64 = 0.01;

/// Opaque particle identifier, unique within its table.
///
/// Ordering is total: ids that parse as unsigned integers sort numerically and
/// before every other id; everything else (and numeric ties such as `"01"` vs
/// `"1"`) falls back to plain string order. The matcher's tie-break relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleId(pub String);

impl ParticleId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }

    fn numeric(&self) -> Option<u128> { self.0.parse().ok() }
}

impl Ord for ParticleId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ParticleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ParticleId {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

/// The role a table plays in a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Environmental,
    Blank,
    Blind,
    Synthetic,
}

/// Numeric field used to compare particle sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeDimension {
    #[default]
    GeometricMeanSize,
    Size1,
    Size2,
    Size3,
    Area,
}

impl SizeDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeDimension::GeometricMeanSize => "geometric_mean_size",
            SizeDimension::Size1 => "size_1",
            SizeDimension::Size2 => "size_2",
            SizeDimension::Size3 => "size_3",
            SizeDimension::Area => "area",
        }
    }
}

impl FromStr for SizeDimension {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "geometric_mean_size" | "size_geom_mean" => Ok(SizeDimension::GeometricMeanSize),
            "size_1" => Ok(SizeDimension::Size1),
            "size_2" => Ok(SizeDimension::Size2),
            "size_3" => Ok(SizeDimension::Size3),
            "area" => Ok(SizeDimension::Area),
            other => Err(CorrectionError::MatchingConfiguration(format!(
                "unknown size dimension '{}'",
                other
            ))),
        }
    }
}

/// Categorical fields a control particle can be required to share with its match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    PolymerType,
    Color,
    Shape,
}

/// Bucket key for candidate lookup. Fields not part of the criteria stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryKey {
    pub polymer_type: Option<String>,
    pub color: Option<String>,
    pub shape: Option<String>,
}

/// Immutable matching configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingCriteria {
    fields: Vec<CategoricalField>,
    pub size_dimension: SizeDimension,
}

impl Default for MatchingCriteria {
    fn default() -> Self {
        Self {
            fields: vec![CategoricalField::PolymerType, CategoricalField::Color, CategoricalField::Shape],
            size_dimension: SizeDimension::GeometricMeanSize,
        }
    }
}

impl MatchingCriteria {
    pub fn new(fields: &[CategoricalField], size_dimension: SizeDimension) -> Self {
        let mut unique = Vec::with_capacity(fields.len());
        for f in fields {
            if !unique.contains(f) {
                unique.push(*f);
            }
        }
        Self { fields: unique, size_dimension }
    }

    /// Parses the size dimension by name. Fails before any matching takes place.
    pub fn parse(fields: &[CategoricalField], size_dimension: &str) -> Result<Self> {
        Ok(Self::new(fields, size_dimension.parse()?))
    }

    pub fn fields(&self) -> &[CategoricalField] { &self.fields }

    pub fn key_for(&self, p: &Particle) -> CategoryKey {
        let pick = |field: CategoricalField, value: &str| {
            self.fields.contains(&field).then(|| value.to_string())
        };
        CategoryKey {
            polymer_type: pick(CategoricalField::PolymerType, &p.polymer_type),
            color: pick(CategoricalField::Color, &p.color),
            shape: pick(CategoricalField::Shape, &p.shape),
        }
    }
}

/// Raw particle as supplied by a loader. Carries no derived fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticleRecord {
    pub id: ParticleId,
    pub polymer_type: String,
    pub color: String,
    pub shape: String,
    pub size_1: f64,
    pub size_2: f64,
    #[serde(default)]
    pub size_3: Option<f64>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub quality_index: Option<f64>,
    #[serde(default)]
    pub fraction_analysed: Option<f64>,
}

/// One measured particle. The geometric mean size is kept in sync with
/// `size_1`/`size_2` and is never read from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParticleRecord")]
pub struct Particle {
    pub id: ParticleId,
    pub polymer_type: String,
    pub color: String,
    pub shape: String,
    size_1: f64,
    size_2: f64,
    pub size_3: Option<f64>,
    pub area: Option<f64>,
    geometric_mean_size: f64,
    pub quality_index: Option<f64>,
    pub fraction_analysed: Option<f64>,
}

impl From<ParticleRecord> for Particle {
    fn from(r: ParticleRecord) -> Self {
        let mut p = Particle::new(r.id, r.polymer_type, r.color, r.shape, r.size_1, r.size_2);
        p.size_3 = r.size_3;
        p.area = r.area;
        p.quality_index = r.quality_index;
        p.fraction_analysed = r.fraction_analysed;
        p
    }
}

impl Particle {
    pub fn new(
        id: impl Into<ParticleId>,
        polymer_type: impl Into<String>,
        color: impl Into<String>,
        shape: impl Into<String>,
        size_1: f64,
        size_2: f64,
    ) -> Self {
        Self {
            id: id.into(),
            polymer_type: polymer_type.into(),
            color: color.into(),
            shape: shape.into(),
            size_1,
            size_2,
            size_3: None,
            area: None,
            geometric_mean_size: geometric_mean(size_1, size_2),
            quality_index: None,
            fraction_analysed: None,
        }
    }

    pub fn with_size_3(mut self, v: f64) -> Self { self.size_3 = Some(v); self }
    pub fn with_area(mut self, v: f64) -> Self { self.area = Some(v); self }
    pub fn with_fraction_analysed(mut self, v: f64) -> Self { self.fraction_analysed = Some(v); self }

    pub fn size_1(&self) -> f64 { self.size_1 }
    pub fn size_2(&self) -> f64 { self.size_2 }
    pub fn geometric_mean_size(&self) -> f64 { self.geometric_mean_size }

    pub fn set_sizes(&mut self, size_1: f64, size_2: f64) {
        self.size_1 = size_1;
        self.size_2 = size_2;
        self.geometric_mean_size = geometric_mean(size_1, size_2);
    }

    /// Value of the given dimension, if this particle has one.
    pub fn size(&self, dim: SizeDimension) -> Option<f64> {
        match dim {
            SizeDimension::GeometricMeanSize => Some(self.geometric_mean_size),
            SizeDimension::Size1 => Some(self.size_1),
            SizeDimension::Size2 => Some(self.size_2),
            SizeDimension::Size3 => self.size_3,
            SizeDimension::Area => self.area,
        }
    }
}

impl From<String> for ParticleId {
    fn from(s: String) -> Self { Self(s) }
}

fn geometric_mean(size_1: f64, size_2: f64) -> f64 {
    (size_1 * size_2).max(MIN_SIZE_PRODUCT).sqrt()
}
