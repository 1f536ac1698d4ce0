//! API payloads and the small value types they are keyed by
//!
//! Shapes mirror the two backend endpoints:
//! - GET /api/map-data      → `MapResponse`
//! - GET /api/heatmap-data  → `HeatmapDataset`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Landing year shown by the dashboard, always within [1850, 2013]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Year(u16);

impl Year {
    pub const MIN_VALUE: i32 = 1850;
    pub const MAX_VALUE: i32 = 2013;
    pub const MIN: Year = Year(Self::MIN_VALUE as u16);
    pub const MAX: Year = Year(Self::MAX_VALUE as u16);

    /// Year for a slider value, clamped into range
    pub fn clamped(value: i32) -> Self {
        Year(value.clamp(Self::MIN_VALUE, Self::MAX_VALUE) as u16)
    }

    /// Next animation frame: 2013 wraps back to 1850
    pub fn next_wrapping(self) -> Self {
        if self >= Self::MAX {
            Self::MIN
        } else {
            Year(self.0 + 1)
        }
    }

    pub fn value(self) -> i32 {
        self.0 as i32
    }
}

impl Default for Year {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<i32> for Year {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value) {
            Ok(Year(value as u16))
        } else {
            Err(format!(
                "year {} outside {}..={}",
                value,
                Self::MIN_VALUE,
                Self::MAX_VALUE
            ))
        }
    }
}

impl From<Year> for i32 {
    fn from(year: Year) -> i32 {
        year.value()
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categorical field used to colour and group map and bar data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drilldown {
    Superclass,
    #[default]
    Megaclass,
    Recclass,
}

impl Drilldown {
    pub const ALL: [Drilldown; 3] = [Drilldown::Superclass, Drilldown::Megaclass, Drilldown::Recclass];

    /// Value of the `drilldown_column` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            Drilldown::Superclass => "superclass",
            Drilldown::Megaclass => "megaclass",
            Drilldown::Recclass => "recclass",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Drilldown::Superclass => "Super Class",
            Drilldown::Megaclass => "Mega Class",
            Drilldown::Recclass => "Major Class",
        }
    }
}

impl FromStr for Drilldown {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Drilldown::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown drilldown '{}' (expected superclass, megaclass or recclass)", s))
    }
}

impl fmt::Display for Drilldown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping key selecting the heatmap rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapGroup {
    #[default]
    Megaclass,
    Superclass,
}

impl HeatmapGroup {
    pub const ALL: [HeatmapGroup; 2] = [HeatmapGroup::Megaclass, HeatmapGroup::Superclass];

    /// Value of the `selected_group` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            HeatmapGroup::Megaclass => "megaclass",
            HeatmapGroup::Superclass => "superclass",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeatmapGroup::Megaclass => "Megaclass",
            HeatmapGroup::Superclass => "Superclass",
        }
    }
}

impl FromStr for HeatmapGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeatmapGroup::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown heatmap group '{}' (expected megaclass or superclass)", s))
    }
}

impl fmt::Display for HeatmapGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of GET /api/map-data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapResponse {
    pub map_data: MapData,
    pub bar_data: BarData,
}

/// Parallel arrays: index i describes one landing across every field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub category: Vec<String>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub name: Vec<String>,
    pub mass: Vec<f64>,
    pub recclass: Vec<String>,
    pub superclass: Vec<String>,
    pub megaclass: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarData {
    pub categories: Vec<String>,
    pub counts: Vec<u64>,
}

/// Body of GET /api/heatmap-data; `z[row][col]` is the composition
/// percentage of element `x[col]` in class `y[row]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapDataset {
    pub title: String,
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub z: Vec<Vec<f64>>,
}

impl MapData {
    pub fn len(&self) -> usize {
        self.category.len()
    }
}

impl MapResponse {
    /// Check the parallel-array invariants serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        let m = &self.map_data;
        let n = m.category.len();
        let columns = [
            ("lat", m.lat.len()),
            ("lon", m.lon.len()),
            ("name", m.name.len()),
            ("mass", m.mass.len()),
            ("recclass", m.recclass.len()),
            ("superclass", m.superclass.len()),
            ("megaclass", m.megaclass.len()),
        ];
        for (column, len) in columns {
            if len != n {
                return Err(format!(
                    "map_data.{} has {} entries, map_data.category has {}",
                    column, len, n
                ));
            }
        }

        if self.bar_data.categories.len() != self.bar_data.counts.len() {
            return Err(format!(
                "bar_data has {} categories but {} counts",
                self.bar_data.categories.len(),
                self.bar_data.counts.len()
            ));
        }
        Ok(())
    }
}

impl HeatmapDataset {
    pub fn rows(&self) -> usize {
        self.y.len()
    }

    pub fn columns(&self) -> usize {
        self.x.len()
    }

    /// Matrix must be `y.len()` rows of `x.len()` values each
    pub fn validate(&self) -> Result<(), String> {
        if self.z.len() != self.y.len() {
            return Err(format!("z has {} rows, y has {} labels", self.z.len(), self.y.len()));
        }
        if let Some((row, values)) = self.z.iter().enumerate().find(|(_, r)| r.len() != self.x.len()) {
            return Err(format!(
                "z row {} has {} values, x has {} labels",
                row,
                values.len(),
                self.x.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_wraps_at_max() {
        assert_eq!(Year::MAX.next_wrapping(), Year::MIN);
        assert_eq!(Year::clamped(1850).next_wrapping(), Year::clamped(1851));
    }

    #[test]
    fn test_tick_sequence_covers_every_year() {
        let mut year = Year::MIN;
        for expected in Year::MIN_VALUE + 1..=Year::MAX_VALUE {
            year = year.next_wrapping();
            assert_eq!(year.value(), expected);
        }
        assert_eq!(year.next_wrapping(), Year::MIN);
    }

    #[test]
    fn test_year_clamps_slider_values() {
        assert_eq!(Year::clamped(1700), Year::MIN);
        assert_eq!(Year::clamped(2100), Year::MAX);
        assert!(Year::try_from(1849).is_err());
    }

    #[test]
    fn test_drilldown_parse() {
        assert_eq!("MEGACLASS".parse::<Drilldown>().unwrap(), Drilldown::Megaclass);
        assert!("petrology".parse::<Drilldown>().is_err());
        assert_eq!("superclass".parse::<HeatmapGroup>().unwrap(), HeatmapGroup::Superclass);
    }

    #[test]
    fn test_map_response_ignores_server_color_map() {
        let body = r##"{
            "map_data": {"category": ["Stony"], "lat": [1.0], "lon": [2.0], "name": ["Aachen"],
                         "mass": [21.0], "recclass": ["L5"], "superclass": ["Chondrite"],
                         "megaclass": ["Stony"], "color_map": {"Stony": "#fff"}},
            "bar_data": {"categories": ["Stony"], "counts": [1], "color_map": {}}
        }"##;
        let resp: MapResponse = serde_json::from_str(body).unwrap();
        assert!(resp.validate().is_ok());
        assert_eq!(resp.map_data.len(), 1);
    }

    #[test]
    fn test_validate_rejects_ragged_columns() {
        let mut resp = MapResponse {
            map_data: MapData {
                category: vec!["Stony".into(), "Iron".into()],
                lat: vec![0.0, 1.0],
                lon: vec![0.0],
                name: vec!["a".into(), "b".into()],
                mass: vec![1.0, 2.0],
                recclass: vec!["L5".into(), "IIAB".into()],
                superclass: vec!["x".into(), "y".into()],
                megaclass: vec!["Stony".into(), "Iron".into()],
            },
            bar_data: BarData::default(),
        };
        let err = resp.validate().unwrap_err();
        assert!(err.contains("lon"));

        resp.map_data.lon.push(1.0);
        resp.bar_data.categories.push("Stony".into());
        assert!(resp.validate().unwrap_err().contains("bar_data"));
    }

    #[test]
    fn test_heatmap_validate() {
        let mut heatmap = HeatmapDataset {
            title: "t".into(),
            x: vec!["Fe".into(), "Ni".into()],
            y: vec!["Iron".into()],
            z: vec![vec![90.0, 8.0]],
        };
        assert!(heatmap.validate().is_ok());
        heatmap.z[0].pop();
        assert!(heatmap.validate().is_err());
    }
}
