//! Run configuration: matching criteria, pre-filter settings and output conventions.
//!
//! Everything here is plain data deserialized with `serde`; defaults reproduce the
//! settings the correction procedure has historically been run with.
use crate::analysis::topology::CorrectionSpec;
use crate::error::Result;
use crate::store::{CategoricalField, MatchingCriteria, SizeDimension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// How a node with several controls is corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Each control is applied in declared order, starting from the previous output.
    #[default]
    Sequential,
    /// Controls are pooled into a single synthetic control first.
    Synthetic,
}

/// Particles outside `[low, high]` on `dimension` are dropped before correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeFilter {
    pub dimension: String,
    pub low: f64,
    pub high: f64,
}

impl Default for SizeFilter {
    fn default() -> Self {
        Self { dimension: "size_1".to_string(), low: 50.0, high: 5000.0 }
    }
}

/// Raw categorical value -> canonical value, per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizationMap {
    pub color: BTreeMap<String, String>,
    pub shape: BTreeMap<String, String>,
}

impl Default for StandardizationMap {
    fn default() -> Self {
        let color = [
            ("transparent", "unspecific"),
            ("undetermined", "unspecific"),
            ("white", "unspecific"),
            ("non-determinable", "unspecific"),
            ("grey", "unspecific"),
            ("brown", "unspecific"),
            ("black", "unspecific"),
            ("violet", "blue"),
        ];
        let shape = [
            ("spherule", "irregular"),
            ("irregular", "irregular"),
            ("flake", "irregular"),
            ("foam", "irregular"),
            ("granule", "irregular"),
            ("undetermined", "irregular"),
        ];
        let owned = |pairs: &[(&str, &str)]| {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        Self { color: owned(&color), shape: owned(&shape) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Appended to a node's name for its corrected table file.
    pub suffix: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { suffix: "_corrected".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub size_matching_dimension: String,
    pub categorical_fields: Vec<CategoricalField>,
    pub size_filter: Option<SizeFilter>,
    pub excluded_polymers: Vec<String>,
    pub standardization: StandardizationMap,
    pub amplify_by_fraction: bool,
    pub control_mode: ControlMode,
    /// Keep every n-th particle per phenotype when pooling n controls.
    pub synthetic_thinning: bool,
    pub parallel: bool,
    pub output: OutputSettings,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            size_matching_dimension: SizeDimension::GeometricMeanSize.as_str().to_string(),
            categorical_fields: vec![
                CategoricalField::PolymerType,
                CategoricalField::Color,
                CategoricalField::Shape,
            ],
            size_filter: Some(SizeFilter::default()),
            excluded_polymers: default_excluded_polymers(),
            standardization: StandardizationMap::default(),
            amplify_by_fraction: true,
            control_mode: ControlMode::Sequential,
            synthetic_thinning: false,
            parallel: false,
            output: OutputSettings::default(),
        }
    }
}

impl ProcessingConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolves the matching criteria, failing on an unknown size dimension.
    pub fn matching_criteria(&self) -> Result<MatchingCriteria> {
        MatchingCriteria::parse(&self.categorical_fields, &self.size_matching_dimension)
    }

    /// Resolves the size filter dimension, if a filter is configured.
    pub fn size_filter_dimension(&self) -> Result<Option<SizeDimension>> {
        self.size_filter.as_ref().map(|f| f.dimension.parse()).transpose()
    }
}

/// A correction graph together with the settings it runs under.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionPlan {
    pub corrections: CorrectionSpec,
    #[serde(default)]
    pub settings: ProcessingConfig,
}

pub fn load_plan(path: impl AsRef<Path>) -> Result<CorrectionPlan> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn default_excluded_polymers() -> Vec<String> {
    [
        "Poly (tetrafluoro ethylene)",
        "PV23",
        "Parafilm",
        "PR101",
        "PB15",
        "PW6",
        "PBr29",
        "PY17based",
        "PY74",
        "PB15 + PV23",
        "PV23 + PB15",
        "PB15 + TiO2",
        "PB23 + PY17based",
        "Parafilm/PE",
        "PB15+PY17",
        "PY17+PB15",
        "PV23+PB15+TiO2",
        "PB15+TiO2",
        "TiO2+PB15",
        "PB15+PV23",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
