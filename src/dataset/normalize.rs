//! Min-max scaling of feature groups.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::layout::FeatureGroup;
use super::loader::DataTable;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("cannot fit normalization on an empty table")]
    EmptyTable,
    #[error("group {group} has zero range (every value is {value}); min-max scaling is undefined")]
    ZeroRange { group: FeatureGroup, value: f32 },
    #[error("group {group} contains a non-finite value")]
    NonFinite { group: FeatureGroup },
}

/// Whether each group gets its own min/max or all declared groups share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationScope {
    #[default]
    PerGroup,
    Global,
}

impl NormalizationScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_group" | "group" => Some(Self::PerGroup),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

/// Observed value range of a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f32,
    pub max: f32,
}

impl MinMax {
    fn observe(values: impl IntoIterator<Item = f32>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(range) => Some(Self {
                min: range.min.min(v),
                max: range.max.max(v),
            }),
        })
    }

    pub fn range(&self) -> f32 {
        self.max - self.min
    }

    pub fn apply(&self, value: f32) -> f32 {
        (value - self.min) / self.range()
    }

    pub fn invert(&self, scaled: f32) -> f32 {
        scaled * self.range() + self.min
    }
}

/// Which groups to scale, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationPlan {
    pub groups: Vec<FeatureGroup>,
    pub scope: NormalizationScope,
}

/// Min/max fitted once over a full table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedNormalizer {
    scales: Vec<(FeatureGroup, MinMax)>,
}

impl FittedNormalizer {
    pub fn scale_for(&self, group: FeatureGroup) -> Option<MinMax> {
        self.scales
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, scale)| *scale)
    }

    /// Scale `value` from `group`; groups outside the plan pass through unchanged.
    pub fn apply(&self, group: FeatureGroup, value: f32) -> f32 {
        match self.scale_for(group) {
            Some(scale) => scale.apply(value),
            None => value,
        }
    }

    /// Scaled copy of one table row.
    pub fn apply_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .enumerate()
            .map(|(column, &value)| match FeatureGroup::of_column(column) {
                Some(group) => self.apply(group, value),
                None => value,
            })
            .collect()
    }
}

/// Fit min/max for every group in `plan` over all rows of `table`.
///
/// A group whose values are all identical is rejected rather than divided by zero.
pub fn fit(table: &DataTable, plan: &NormalizationPlan) -> Result<FittedNormalizer, NormalizeError> {
    if table.is_empty() {
        return Err(NormalizeError::EmptyTable);
    }
    let mut scales = Vec::with_capacity(plan.groups.len());
    for &group in &plan.groups {
        let scale = observe_group(table, group)?;
        scales.push((group, scale));
    }

    if plan.scope == NormalizationScope::Global {
        if let Some(shared) = MinMax::observe(
            scales
                .iter()
                .flat_map(|(_, scale)| [scale.min, scale.max]),
        ) {
            for (_, scale) in &mut scales {
                *scale = shared;
            }
        }
    }

    for &(group, scale) in &scales {
        if scale.range() <= 0.0 {
            return Err(NormalizeError::ZeroRange {
                group,
                value: scale.min,
            });
        }
        tracing::debug!("Normalizing {group}: min={} max={}", scale.min, scale.max);
    }
    Ok(FittedNormalizer { scales })
}

fn observe_group(table: &DataTable, group: FeatureGroup) -> Result<MinMax, NormalizeError> {
    let columns = group.columns();
    let values = table.rows().flat_map(|row| row[columns.clone()].iter().copied());
    let mut finite = true;
    let scale = MinMax::observe(values.inspect(|v| finite &= v.is_finite()))
        .ok_or(NormalizeError::EmptyTable)?;
    if !finite {
        return Err(NormalizeError::NonFinite { group });
    }
    Ok(scale)
}
