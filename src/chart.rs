//! Chart Renderer - turns API payloads into chart specs
//!
//! Everything here is a pure function of the payload. Drawing happens behind
//! `ChartSink`, which replaces a container's content wholesale.

use std::collections::HashMap;
use std::fmt;

use crate::model::{BarData, HeatmapDataset, MapData, MapResponse, Year};

/// RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Colour-blind friendly categorical palette
pub const PALETTE: [Rgb; 15] = [
    Rgb(0xFF, 0xC8, 0x57), // yellow
    Rgb(0xE9, 0x72, 0x4C), // orange-red
    Rgb(0xC5, 0xD8, 0x6D), // light green
    Rgb(0x55, 0xD6, 0xBE), // turquoise
    Rgb(0x9B, 0x85, 0xA1), // lavender
    Rgb(0xF7, 0xF6, 0xCF), // off-white
    Rgb(0x8C, 0xB3, 0x69), // green
    Rgb(0xF4, 0x9C, 0xBB), // pink
    Rgb(0x85, 0xC7, 0xF2), // light blue
    Rgb(0x63, 0x69, 0x40), // olive
    Rgb(0xD4, 0xB4, 0x83), // tan
    Rgb(0x6B, 0x90, 0x80), // sage
    Rgb(0x6D, 0x59, 0x7A), // plum
    Rgb(0xBA, 0xA8, 0x98), // taupe
    Rgb(0xF6, 0xAA, 0x1C), // amber
];

/// Heatmap colour scale stops (position, colour)
pub const HEATMAP_SCALE: [(f64, Rgb); 5] = [
    (0.0, Rgb(0x0D, 0x13, 0x21)),
    (0.25, Rgb(0x1D, 0x2D, 0x44)),
    (0.5, Rgb(0x3E, 0x5C, 0x76)),
    (0.75, Rgb(0x74, 0x8C, 0xAB)),
    (1.0, Rgb(0xF0, 0xEB, 0xD8)),
];

pub const MIN_MARKER_SIZE: f64 = 5.0;
pub const MAX_MARKER_SIZE: f64 = 15.0;

pub const BAR_TITLE: &str = "Top Meteorite Categories";
pub const HEATMAP_X_TITLE: &str = "Chemical Elements";
pub const HEATMAP_Y_TITLE: &str = "Classification";

/// Category → colour, assigned round-robin in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMap {
    order: Vec<String>,
    colors: HashMap<String, Rgb>,
}

impl ColorMap {
    pub fn from_categories<'a, I>(categories: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut map = ColorMap::default();
        for category in categories {
            if !map.colors.contains_key(category) {
                let color = PALETTE[map.order.len() % PALETTE.len()];
                map.colors.insert(category.clone(), color);
                map.order.push(category.clone());
            }
        }
        map
    }

    /// Map categories first, then any bar-only categories after them
    pub fn for_response(response: &MapResponse) -> Self {
        Self::from_categories(
            response
                .map_data
                .category
                .iter()
                .chain(response.bar_data.categories.iter()),
        )
    }

    pub fn get(&self, category: &str) -> Option<Rgb> {
        self.colors.get(category).copied()
    }

    /// Distinct categories in assignment order
    pub fn categories(&self) -> &[String] {
        &self.order
    }
}

/// Marker size for a landing of `mass` grams: sqrt(mass)/10 clamped to [5, 15]
pub fn marker_size(mass: f64) -> f64 {
    if !mass.is_finite() || mass <= 0.0 {
        return MIN_MARKER_SIZE;
    }
    (mass.sqrt() / 10.0).clamp(MIN_MARKER_SIZE, MAX_MARKER_SIZE)
}

/// Where a spec gets drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Map,
    Bar,
    Heatmap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSpec {
    Map(MapSpec),
    Bar(BarSpec),
    Heatmap(HeatmapSpec),
}

impl ChartSpec {
    pub fn container(&self) -> Container {
        match self {
            ChartSpec::Map(_) => Container::Map,
            ChartSpec::Bar(_) => Container::Bar,
            ChartSpec::Heatmap(_) => Container::Heatmap,
        }
    }
}

/// Rendering backend. `render` replaces whatever the container showed before.
pub trait ChartSink: Send + 'static {
    fn render(&mut self, container: Container, spec: ChartSpec);
}

/// Hover details for one landing
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerInfo {
    pub name: String,
    pub mass: f64,
    pub recclass: String,
    pub superclass: String,
    pub megaclass: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub size: f64,
    pub info: MarkerInfo,
}

impl Marker {
    pub fn hover_text(&self) -> String {
        format!(
            "{}\nMass: {}g\nClass: {}\nSuperclass: {}\nMegaclass: {}",
            self.info.name, self.info.mass, self.info.recclass, self.info.superclass, self.info.megaclass
        )
    }
}

/// One legend entry: all markers of a category
#[derive(Debug, Clone, PartialEq)]
pub struct MapTrace {
    pub name: String,
    pub color: Rgb,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSpec {
    pub title: String,
    pub center: (f64, f64),
    pub zoom: f64,
    pub show_legend: bool,
    pub traces: Vec<MapTrace>,
}

impl MapSpec {
    pub fn point_count(&self) -> usize {
        self.traces.iter().map(|t| t.markers.len()).sum()
    }

    /// Closest marker to (lat, lon) within `max_distance` degrees
    pub fn nearest_marker(&self, lat: f64, lon: f64, max_distance: f64) -> Option<(&MapTrace, &Marker)> {
        self.traces
            .iter()
            .flat_map(|t| t.markers.iter().map(move |m| (t, m)))
            .map(|(t, m)| (t, m, (m.lat - lat).hypot(m.lon - lon)))
            .filter(|(_, _, d)| *d <= max_distance)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(t, m, _)| (t, m))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarEntry {
    pub label: String,
    pub count: u64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSpec {
    pub title: String,
    pub bars: Vec<BarEntry>,
}

impl BarSpec {
    pub fn total(&self) -> u64 {
        self.bars.iter().map(|b| b.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapSpec {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub z: Vec<Vec<f64>>,
    range: (f64, f64),
}

impl HeatmapSpec {
    pub fn rows(&self) -> usize {
        self.y_labels.len()
    }

    pub fn columns(&self) -> usize {
        self.x_labels.len()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.z.get(row)?.get(col).copied()
    }

    /// Colour for a cell value, normalised over the matrix range
    pub fn color_for(&self, value: f64) -> Rgb {
        let (min, max) = self.range;
        let t = if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        scale_color(t)
    }

    pub fn hover_text(&self, row: usize, col: usize) -> Option<String> {
        let value = self.value(row, col)?;
        Some(format!(
            "{}\nElement: {}\nComposition: {:.2}%",
            self.y_labels.get(row)?,
            self.x_labels.get(col)?,
            value
        ))
    }
}

fn scale_color(t: f64) -> Rgb {
    for pair in HEATMAP_SCALE.windows(2) {
        let (lo, lo_color) = pair[0];
        let (hi, hi_color) = pair[1];
        if t <= hi {
            return lo_color.lerp(hi_color, (t - lo) / (hi - lo));
        }
    }
    HEATMAP_SCALE[HEATMAP_SCALE.len() - 1].1
}

pub fn map_title(year: Year) -> String {
    format!("Meteorites in {}", year)
}

/// Map spec: one trace per category in first-seen order
pub fn build_map_spec(year: Year, data: &MapData, colors: &ColorMap) -> MapSpec {
    let mut traces: Vec<MapTrace> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for i in 0..data.len() {
        let category = data.category[i].as_str();
        let slot = *index.entry(category).or_insert_with(|| {
            traces.push(MapTrace {
                name: category.to_string(),
                color: colors.get(category).unwrap_or(PALETTE[0]),
                markers: Vec::new(),
            });
            traces.len() - 1
        });

        traces[slot].markers.push(Marker {
            lat: data.lat[i],
            lon: data.lon[i],
            size: marker_size(data.mass[i]),
            info: MarkerInfo {
                name: data.name[i].clone(),
                mass: data.mass[i],
                recclass: data.recclass[i].clone(),
                superclass: data.superclass[i].clone(),
                megaclass: data.megaclass[i].clone(),
            },
        });
    }

    MapSpec {
        title: map_title(year),
        center: (10.0, 0.0),
        zoom: 1.2,
        show_legend: true,
        traces,
    }
}

pub fn build_bar_spec(data: &BarData, colors: &ColorMap) -> BarSpec {
    let bars = data
        .categories
        .iter()
        .zip(&data.counts)
        .map(|(label, &count)| BarEntry {
            label: label.clone(),
            count,
            color: colors.get(label).unwrap_or(PALETTE[0]),
        })
        .collect();

    BarSpec {
        title: BAR_TITLE.to_string(),
        bars,
    }
}

/// Map and bar specs for one response, sharing a single colour map
pub fn build_map_and_bar(year: Year, response: &MapResponse) -> (MapSpec, BarSpec) {
    let colors = ColorMap::for_response(response);
    (
        build_map_spec(year, &response.map_data, &colors),
        build_bar_spec(&response.bar_data, &colors),
    )
}

/// Heatmap spec; values pass through untouched
pub fn build_heatmap_spec(data: &HeatmapDataset) -> HeatmapSpec {
    let range = data
        .z
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })
        .unwrap_or((0.0, 0.0));

    HeatmapSpec {
        title: data.title.clone(),
        x_title: HEATMAP_X_TITLE.to_string(),
        y_title: HEATMAP_Y_TITLE.to_string(),
        x_labels: data.x.clone(),
        y_labels: data.y.clone(),
        z: data.z.clone(),
        range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn response(categories: &[&str], bars: &[(&str, u64)]) -> MapResponse {
        let n = categories.len();
        MapResponse {
            map_data: MapData {
                category: strings(categories),
                lat: (0..n).map(|i| i as f64).collect(),
                lon: (0..n).map(|i| -(i as f64)).collect(),
                name: (0..n).map(|i| format!("m{}", i)).collect(),
                mass: (0..n).map(|i| (i * 1000) as f64).collect(),
                recclass: vec!["L6".into(); n],
                superclass: vec!["Chondrite".into(); n],
                megaclass: strings(categories),
            },
            bar_data: BarData {
                categories: bars.iter().map(|(c, _)| c.to_string()).collect(),
                counts: bars.iter().map(|(_, n)| *n).collect(),
            },
        }
    }

    #[test]
    fn test_color_assignment_round_robin() {
        let categories: Vec<String> = (0..20).map(|i| format!("c{}", i)).collect();
        let colors = ColorMap::from_categories(&categories);

        for (k, category) in categories.iter().enumerate() {
            assert_eq!(colors.get(category), Some(PALETTE[k % PALETTE.len()]));
        }
        assert_eq!(colors, ColorMap::from_categories(&categories));
    }

    #[test]
    fn test_color_assignment_uses_first_seen_order() {
        let colors = ColorMap::from_categories(&strings(&["Iron", "Stony", "Iron", "Stony-iron"]));
        assert_eq!(colors.categories(), strings(&["Iron", "Stony", "Stony-iron"]).as_slice());
        assert_eq!(colors.get("Stony-iron"), Some(PALETTE[2]));
    }

    #[test]
    fn test_marker_size_clamped() {
        assert_eq!(marker_size(0.0), MIN_MARKER_SIZE);
        assert_eq!(marker_size(100.0), MIN_MARKER_SIZE);
        assert_eq!(marker_size(10_000.0), 10.0);
        assert_eq!(marker_size(60_000_000.0), MAX_MARKER_SIZE);
        assert_eq!(marker_size(f64::NAN), MIN_MARKER_SIZE);
        assert_eq!(marker_size(-4.0), MIN_MARKER_SIZE);
    }

    #[test]
    fn test_three_categories_ten_points() {
        let resp = response(
            &["Stony", "Iron", "Stony", "Stony-iron", "Stony", "Iron", "Stony", "Stony", "Iron", "Stony"],
            &[("Stony", 6), ("Iron", 3), ("Stony-iron", 1)],
        );
        let (map, bar) = build_map_and_bar(Year::MIN, &resp);

        assert_eq!(map.title, "Meteorites in 1850");
        assert_eq!(map.traces.len(), 3);
        assert_eq!(map.point_count(), 10);
        assert_eq!(bar.bars.len(), 3);
        assert_eq!(bar.total(), 10);

        for entry in &bar.bars {
            let trace = map.traces.iter().find(|t| t.name == entry.label).unwrap();
            assert_eq!(trace.color, entry.color);
        }
    }

    #[test]
    fn test_bar_only_category_gets_next_color() {
        let resp = response(&["Stony"], &[("Stony", 1), ("Iron", 0)]);
        let (_, bar) = build_map_and_bar(Year::MIN, &resp);
        assert_eq!(bar.bars[0].color, PALETTE[0]);
        assert_eq!(bar.bars[1].color, PALETTE[1]);
    }

    #[test]
    fn test_nearest_marker_hover() {
        let resp = response(&["Stony", "Iron"], &[]);
        let (map, _) = build_map_and_bar(Year::MIN, &resp);

        let (trace, marker) = map.nearest_marker(0.9, -1.2, 2.0).unwrap();
        assert_eq!(trace.name, "Iron");
        assert!(marker.hover_text().starts_with("m1\nMass: 1000g"));
        assert!(map.nearest_marker(40.0, 40.0, 2.0).is_none());
    }

    #[test]
    fn test_heatmap_passthrough_5x8() {
        let z: Vec<Vec<f64>> = (0..5)
            .map(|r| (0..8).map(|c| r as f64 * 10.0 + c as f64 + 0.25).collect())
            .collect();
        let data = HeatmapDataset {
            title: "Average Composition per Megaclass".into(),
            x: (0..8).map(|c| format!("E{}", c)).collect(),
            y: (0..5).map(|r| format!("C{}", r)).collect(),
            z: z.clone(),
        };
        let spec = build_heatmap_spec(&data);

        assert_eq!(spec.rows(), 5);
        assert_eq!(spec.columns(), 8);
        assert_eq!(spec.value(2, 3), Some(z[2][3]));
        assert_eq!(spec.z, z);
        assert_eq!(spec.hover_text(2, 3).unwrap(), "C2\nElement: E3\nComposition: 23.25%");
        assert_eq!(spec.value(5, 0), None);
    }

    #[test]
    fn test_heatmap_color_scale_endpoints() {
        let data = HeatmapDataset {
            title: "t".into(),
            x: strings(&["Fe", "Ni"]),
            y: strings(&["Iron"]),
            z: vec![vec![0.0, 80.0]],
        };
        let spec = build_heatmap_spec(&data);
        assert_eq!(spec.color_for(0.0), HEATMAP_SCALE[0].1);
        assert_eq!(spec.color_for(80.0), HEATMAP_SCALE[4].1);
        assert_eq!(spec.color_for(40.0), HEATMAP_SCALE[2].1);
    }
}
