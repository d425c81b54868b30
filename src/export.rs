//! Label-text and COCO JSON export of detections.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::geometry::xyxy_to_xywh;
use crate::types::{CocoRecord, Detection, ImageId, ImageShape};

/// COCO category ids of the 80 training classes, in class-index order.
const COCO91_IDS: [u64; 80] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 27, 28,
    31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 46, 47, 48, 49, 50, 51, 52, 53, 54, 55,
    56, 57, 58, 59, 60, 61, 62, 63, 64, 65, 67, 70, 72, 73, 74, 75, 76, 77, 78, 79, 80, 81, 82, 84,
    85, 86, 87, 88, 89, 90,
];

/// Map 80-class indices to the 91-id COCO category space.
///
/// # Example
///
/// ```
/// use multiattr_eval::export::coco80_to_coco91_class;
///
/// let ids = coco80_to_coco91_class();
/// assert_eq!(ids[0], 1);
/// assert_eq!(ids[11], 13);
/// assert_eq!(ids[79], 90);
/// ```
pub fn coco80_to_coco91_class() -> [u64; 80] {
    COCO91_IDS
}

/// Format a number the way C's `%g` does: six significant digits, trailing
/// zeros removed, scientific notation for very small or large magnitudes.
fn format_g(value: f64) -> String {
    format_general(value, 6)
}

/// `%.{precision}g`
pub(crate) fn format_general(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.abs());
    }

    let decimals = (precision as i32 - 1 - exponent) as usize;
    trim_zeros(&format!("{value:.decimals$}")).to_string()
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Render detections as label-text lines.
///
/// Each line is `c_0 .. c_{n-1} xc yc w h`, plus the confidence when
/// `save_conf` is set. Coordinates are normalized by the original image size.
///
/// # Example
///
/// ```
/// use multiattr_eval::export::label_lines;
/// use multiattr_eval::types::{Detection, ImageShape};
///
/// let det = Detection::new([10.0, 20.0, 30.0, 60.0], 0.875, vec![2, 0]);
/// let lines = label_lines(&[det], ImageShape::new(100.0, 200.0), true);
/// assert_eq!(lines, vec!["2 0 0.1 0.4 0.1 0.4 0.875"]);
/// ```
pub fn label_lines(detections: &[Detection], original: ImageShape, save_conf: bool) -> Vec<String> {
    detections
        .iter()
        .map(|detection| {
            let xywh = xyxy_to_xywh(detection.bbox);
            let normalized = [
                xywh[0] / original.width,
                xywh[1] / original.height,
                xywh[2] / original.width,
                xywh[3] / original.height,
            ];

            let mut fields: Vec<String> = detection
                .attribute_classes
                .iter()
                .map(ToString::to_string)
                .collect();
            fields.extend(normalized.iter().map(|&v| format_g(v)));
            if save_conf {
                fields.push(format_g(detection.confidence));
            }
            fields.join(" ").trim_end().to_string()
        })
        .collect()
}

/// Append label lines to a text file, creating it if needed.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn write_label_file<P: AsRef<Path>>(path: P, lines: &[String]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Round to `decimals` places, half to even on the exact binary value.
///
/// Matches Python's `round(value, decimals)`: `10.0625` rounds to `10.062`,
/// while scaling by a power of ten first would give `10.063`.
fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }

    // Enough fraction digits to print the value exactly
    let exponent = value.abs().log2().floor() as i64;
    let exact_digits = (54 - exponent).clamp(decimals as i64, 1100) as usize;
    let exact = format!("{:.*}", exact_digits, value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let (kept, rest) = frac_part.split_at(decimals.min(frac_part.len()));

    let mut digits: Vec<u8> = int_part.bytes().chain(kept.bytes()).map(|b| b - b'0').collect();
    let first_dropped = rest.bytes().next().map_or(0, |b| b - b'0');
    let beyond_half = rest.bytes().skip(1).any(|b| b != b'0');
    let last_odd = digits.last().is_some_and(|d| d % 2 == 1);

    if first_dropped > 5 || (first_dropped == 5 && (beyond_half || last_odd)) {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - kept.len();
    let to_text = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let sign = if value < 0.0 { "-" } else { "" };
    let text = format!("{sign}{}.{}0", to_text(&digits[..split]), to_text(&digits[split..]));
    text.parse().unwrap_or(value)
}

/// Convert detections of one image into COCO result records.
///
/// Boxes are written as top-left corner plus size, rounded to 3 decimals;
/// scores are rounded to 5. The category is the attribute-0 class, remapped
/// to the 91-id space when `is_coco` is set.
pub fn coco_records(detections: &[Detection], stem: &str, is_coco: bool) -> Vec<CocoRecord> {
    let image_id = ImageId::from_stem(stem);
    detections
        .iter()
        .map(|detection| {
            let xywh = xyxy_to_xywh(detection.bbox);
            let bbox = [
                round_to(xywh[0] - xywh[2] / 2.0, 3),
                round_to(xywh[1] - xywh[3] / 2.0, 3),
                round_to(xywh[2], 3),
                round_to(xywh[3], 3),
            ];
            let class = detection.primary_class();
            let category_id = if is_coco {
                COCO91_IDS.get(class).copied().unwrap_or(class as u64)
            } else {
                class as u64
            };
            CocoRecord {
                image_id: image_id.clone(),
                category_id,
                bbox,
                score: round_to(detection.confidence, 5),
            }
        })
        .collect()
}

/// Write COCO result records as a JSON array.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn write_coco_json<P: AsRef<Path>>(path: P, records: &[CocoRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}
