//! Detection record model and row flattening
//!
//! A detection JSON file holds an array of per-object records emitted by the
//! detector: class, confidence score, anomaly metrics, and a bounding box.
//! Every field is optional; a missing field becomes an empty CSV value while
//! derived box metrics treat missing corners as 0.

use serde::Deserialize;

/// Frame width the detector ran at, in pixels.
pub const FRAME_WIDTH: u32 = 640;
/// Frame height the detector ran at, in pixels.
pub const FRAME_HEIGHT: u32 = 480;

/// Column schema of category tables and the combined table.
pub const COLUMNS: [&str; 15] = [
    "category",
    "filename",
    "class_id",
    "class_label",
    "score",
    "anomaly_distances",
    "angle_diff",
    "box_x1",
    "box_y1",
    "box_x2",
    "box_y2",
    "box_width",
    "box_height",
    "box_area",
    "box_area_percentage",
];

/// Bounding rectangle as reported by the detector.
///
/// Corners may be negative due to detector noise; they are clamped to 0
/// before any size computation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundingBox {
    pub x1: Option<f64>,
    pub y1: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
}

/// Width, height, area, and frame-relative area of a clamped box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxMetrics {
    pub width: f64,
    pub height: f64,
    pub area: f64,
    pub area_percentage: f64,
}

/// Percentage of the frame covered by `area`. Returns 0 for a degenerate
/// frame instead of dividing by zero.
pub(crate) fn area_percentage(area: f64, frame_width: f64, frame_height: f64) -> f64 {
    let frame_area = frame_width * frame_height;
    if frame_area > 0.0 {
        area / frame_area * 100.0
    } else {
        0.0
    }
}

impl BoundingBox {
    /// Corner value with missing treated as 0 and negatives clamped to 0.
    fn corner(value: Option<f64>) -> f64 {
        value.unwrap_or(0.0).max(0.0)
    }

    /// Compute width/height/area/percentage from the clamped corners.
    pub fn metrics(&self) -> BoxMetrics {
        let x1 = Self::corner(self.x1);
        let y1 = Self::corner(self.y1);
        let x2 = Self::corner(self.x2);
        let y2 = Self::corner(self.y2);

        let width = x2 - x1;
        let height = y2 - y1;
        let area = width * height;

        BoxMetrics {
            width,
            height,
            area,
            area_percentage: area_percentage(area, FRAME_WIDTH as f64, FRAME_HEIGHT as f64),
        }
    }
}

/// One detected object in one frame, as stored in a detection JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionRecord {
    pub class_id: Option<i64>,
    pub class_label: Option<String>,
    pub score: Option<f64>,
    pub anomaly_distances: Option<f64>,
    pub angle_diff: Option<f64>,
    #[serde(default, rename = "box")]
    pub bbox: BoundingBox,
}

/// One output row of a category table: the record plus derived box metrics.
#[derive(Debug, Clone)]
pub struct FlattenedRow {
    pub category: String,
    pub filename: String,
    pub class_id: Option<i64>,
    pub class_label: Option<String>,
    pub score: Option<f64>,
    pub anomaly_distances: Option<f64>,
    pub angle_diff: Option<f64>,
    /// Clamped corners; `None` only when the corner was absent in the input.
    pub box_x1: Option<f64>,
    pub box_y1: Option<f64>,
    pub box_x2: Option<f64>,
    pub box_y2: Option<f64>,
    pub metrics: BoxMetrics,
}

/// Format a numeric value the way the tables expect: integral values
/// without a decimal point, everything else with full f64 precision.
pub(crate) fn fmt_num(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn fmt_opt_num(value: Option<f64>) -> String {
    value.map(fmt_num).unwrap_or_default()
}

impl FlattenedRow {
    /// Flatten one detection record into a row for the given category/file.
    pub fn from_record(category: &str, filename: &str, record: &DetectionRecord) -> Self {
        let clamp = |v: Option<f64>| v.map(|c| c.max(0.0));
        FlattenedRow {
            category: category.to_string(),
            filename: filename.to_string(),
            class_id: record.class_id,
            class_label: record.class_label.clone(),
            score: record.score,
            anomaly_distances: record.anomaly_distances,
            angle_diff: record.angle_diff,
            box_x1: clamp(record.bbox.x1),
            box_y1: clamp(record.bbox.y1),
            box_x2: clamp(record.bbox.x2),
            box_y2: clamp(record.bbox.y2),
            metrics: record.bbox.metrics(),
        }
    }

    /// Render the row as CSV fields in `COLUMNS` order.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.category.clone(),
            self.filename.clone(),
            self.class_id.map(|id| id.to_string()).unwrap_or_default(),
            self.class_label.clone().unwrap_or_default(),
            fmt_opt_num(self.score),
            fmt_opt_num(self.anomaly_distances),
            fmt_opt_num(self.angle_diff),
            fmt_opt_num(self.box_x1),
            fmt_opt_num(self.box_y1),
            fmt_opt_num(self.box_x2),
            fmt_opt_num(self.box_y2),
            fmt_num(self.metrics.width),
            fmt_num(self.metrics.height),
            fmt_num(self.metrics.area),
            fmt_num(self.metrics.area_percentage),
        ]
    }
}
