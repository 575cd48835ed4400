//! Tab-separated feature table
//!
//! This is the payload that share links carry. The first line names the
//! columns; the geometry column is the first whose header mentions `wkt` or
//! `geom`. Every other column becomes a feature property:
//!
//! ```text
//! id	note	wkt_geom
//! feature_1	base camp	POINT(10 20)
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::PayloadSource;
use crate::wkt::{self, Geometry, GeometryKind};
use crate::{GeosketchError, GeosketchResult};

/// Geometry header written by the table view and TSV export
pub const TSV_GEOMETRY_HEADER: &str = "wkt_geom";

/// Geometry header written by the CSV export
pub const CSV_GEOMETRY_HEADER: &str = "WKT";

/// A single sketched feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    /// Properties in column order
    pub properties: Vec<(String, String)>,
}

impl Feature {
    /// Create a feature with a fresh id and the given note.
    pub fn new(geometry: Geometry, note: impl Into<String>) -> Self {
        Self {
            geometry,
            properties: vec![
                ("id".to_string(), generate_feature_id()),
                ("note".to_string(), note.into()),
            ],
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.properties.push((key.to_string(), value)),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.property("id")
    }

    pub fn note(&self) -> &str {
        self.property("note").unwrap_or("")
    }

    fn to_geojson(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "type": "Feature",
            "geometry": self.geometry,
            "properties": properties,
        })
    }
}

/// Generate an id of the form `feature_<unix millis>_<9 base36 chars>`.
pub fn generate_feature_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("feature_{millis}_{suffix}")
}

/// Which geometries an export or view includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFilter {
    #[default]
    All,
    Points,
    Lines,
    Polygons,
}

impl GeometryFilter {
    pub fn matches(&self, kind: GeometryKind) -> bool {
        match self {
            GeometryFilter::All => true,
            GeometryFilter::Points => kind == GeometryKind::Point,
            GeometryFilter::Lines => kind == GeometryKind::Line,
            GeometryFilter::Polygons => kind == GeometryKind::Polygon,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeometryFilter::All => "all",
            GeometryFilter::Points => "points",
            GeometryFilter::Lines => "lines",
            GeometryFilter::Polygons => "polygons",
        }
    }
}

impl fmt::Display for GeometryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryFilter {
    type Err = GeosketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(GeometryFilter::All),
            "points" => Ok(GeometryFilter::Points),
            "lines" => Ok(GeometryFilter::Lines),
            "polygons" => Ok(GeometryFilter::Polygons),
            other => Err(GeosketchError::Table(format!(
                "unknown geometry filter {other:?} (expected all, points, lines or polygons)"
            ))),
        }
    }
}

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Tab-separated table with a `wkt_geom` column
    Tsv,
    /// Tab-separated table with a `WKT` column
    Csv,
    /// GeoJSON FeatureCollection
    GeoJson,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Tsv => "tsv",
            ExportFormat::Csv => "csv",
            ExportFormat::GeoJson => "geojson",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = GeosketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tsv" | "wkt" => Ok(ExportFormat::Tsv),
            "csv" => Ok(ExportFormat::Csv),
            "geojson" | "json" => Ok(ExportFormat::GeoJson),
            other => Err(GeosketchError::Table(format!(
                "unknown export format {other:?} (expected tsv, csv or geojson)"
            ))),
        }
    }
}

/// Default download name, e.g. `sketch-mars.geojson`.
pub fn export_file_name(target: crate::config::Target, format: ExportFormat) -> String {
    format!("sketch-{}.{}", target.name(), format.extension())
}

/// An ordered collection of features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    features: Vec<Feature>,
    skipped: usize,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a tab-separated table.
    ///
    /// Rows whose geometry cell is missing or not valid WKT are skipped and
    /// counted in [`FeatureTable::skipped`]. Features without an `id` get a
    /// generated one; features without a `note` get an empty one.
    pub fn parse_tsv(text: &str) -> GeosketchResult<Self> {
        // Tabs are significant: an empty leading or trailing cell is still a cell
        let text = text.trim_matches(|c: char| c.is_whitespace() && c != '\t');
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));
        let headers: Vec<&str> = lines.next().unwrap_or("").split('\t').collect();

        let geom_col = headers
            .iter()
            .position(|h| {
                let h = h.to_ascii_lowercase();
                h.contains("wkt") || h.contains("geom")
            })
            .ok_or_else(|| GeosketchError::Table("no geometry column found".into()))?;

        let mut table = Self::new();
        for (row, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split('\t').collect();
            let geometry = match cells.get(geom_col).map(|cell| wkt::parse(cell)) {
                Some(Ok(g)) => g,
                Some(Err(e)) => {
                    tracing::warn!(row = row + 2, "skipping row with invalid geometry: {e}");
                    table.skipped += 1;
                    continue;
                }
                None => {
                    tracing::warn!(row = row + 2, "skipping row without a geometry cell");
                    table.skipped += 1;
                    continue;
                }
            };

            let properties = headers
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != geom_col)
                .map(|(j, h)| (h.to_string(), cells.get(j).unwrap_or(&"").to_string()))
                .collect();

            let mut feature = Feature {
                geometry,
                properties,
            };
            if feature.id().map_or(true, str::is_empty) {
                feature.set_property("id", generate_feature_id());
            }
            if feature.property("note").is_none() {
                feature.set_property("note", "");
            }
            table.features.push(feature);
        }

        tracing::debug!(
            features = table.features.len(),
            skipped = table.skipped,
            "parsed feature table"
        );
        Ok(table)
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Rows dropped while parsing because their geometry was unusable
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn find(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id() == Some(id))
    }

    /// Replace the note of the feature with `id`. Returns false if absent.
    pub fn set_note(&mut self, id: &str, note: impl Into<String>) -> bool {
        match self.features.iter_mut().find(|f| f.id() == Some(id)) {
            Some(feature) => {
                feature.set_property("note", note);
                true
            }
            None => false,
        }
    }

    /// Remove the feature with `id`. Returns false if absent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.features.len();
        self.features.retain(|f| f.id() != Some(id));
        self.features.len() != before
    }

    pub fn filtered(&self, filter: GeometryFilter) -> impl Iterator<Item = &Feature> {
        self.features
            .iter()
            .filter(move |f| filter.matches(f.geometry.kind()))
    }

    pub fn count(&self, filter: GeometryFilter) -> usize {
        self.filtered(filter).count()
    }

    /// Tab-separated table with a trailing `wkt_geom` column.
    pub fn to_tsv(&self, filter: GeometryFilter) -> String {
        self.render(filter, TSV_GEOMETRY_HEADER)
    }

    /// The CSV export: same layout as the TSV, geometry header `WKT`.
    pub fn to_csv(&self, filter: GeometryFilter) -> String {
        self.render(filter, CSV_GEOMETRY_HEADER)
    }

    /// Pretty-printed GeoJSON FeatureCollection.
    pub fn to_geojson(&self, filter: GeometryFilter) -> GeosketchResult<String> {
        let features: Vec<serde_json::Value> =
            self.filtered(filter).map(Feature::to_geojson).collect();
        let collection = serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        });
        Ok(serde_json::to_string_pretty(&collection)?)
    }

    pub fn export(&self, format: ExportFormat, filter: GeometryFilter) -> GeosketchResult<String> {
        match format {
            ExportFormat::Tsv => Ok(self.to_tsv(filter)),
            ExportFormat::Csv => Ok(self.to_csv(filter)),
            ExportFormat::GeoJson => self.to_geojson(filter),
        }
    }

    fn render(&self, filter: GeometryFilter, geometry_header: &str) -> String {
        let mut fields: Vec<&str> = Vec::new();
        for feature in self.filtered(filter) {
            for (k, _) in &feature.properties {
                if !fields.contains(&k.as_str()) {
                    fields.push(k);
                }
            }
        }

        let mut header = fields.clone();
        header.push(geometry_header);
        let mut lines = vec![header.join("\t")];

        for feature in self.filtered(filter) {
            let mut row: Vec<String> = fields
                .iter()
                .map(|k| feature.property(k).unwrap_or("").to_string())
                .collect();
            row.push(feature.geometry.to_string());
            lines.push(row.join("\t"));
        }
        lines.join("\n")
    }
}

impl PayloadSource for FeatureTable {
    fn payload_text(&self) -> String {
        self.to_tsv(GeometryFilter::All)
    }
}
