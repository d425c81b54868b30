//! Loading of evaluation configs and multi-attribute label files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::EvalConfig;
use crate::error::{EvalError, Result};
use crate::types::GroundTruthLabel;

/// Load an evaluation config from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to the JSON config
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the config
/// fails validation.
///
/// # Example
///
/// ```no_run
/// use multiattr_eval::loader::load_config_from_file;
///
/// let config = load_config_from_file("eval.json").unwrap();
/// println!("Evaluating {} attribute heads", config.n_att());
/// ```
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<EvalConfig> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config: EvalConfig = serde_json::from_reader(reader)?;

    config.validate()?;

    Ok(config)
}

/// Load an evaluation config from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON cannot be parsed or the config is invalid.
pub fn load_config_from_str(json_str: &str) -> Result<EvalConfig> {
    let config: EvalConfig = serde_json::from_str(json_str)?;
    config.validate()?;
    Ok(config)
}

/// Parse multi-attribute label text.
///
/// Every non-blank line holds `n_att` integer classes followed by a
/// normalized center box: `c_0 .. c_{n-1} xc yc w h`.
///
/// # Errors
///
/// Returns `InvalidLabel` for a wrong field count or an unparsable field,
/// `InvalidBoundingBox` for negative sizes or non-finite coordinates.
///
/// # Example
///
/// ```
/// use multiattr_eval::loader::parse_label_lines;
///
/// let labels = parse_label_lines("3 1 0.5 0.5 0.2 0.4\n\n0 2 0.1 0.1 0.05 0.05\n", 7, 2).unwrap();
/// assert_eq!(labels.len(), 2);
/// assert_eq!(labels[0].attribute_classes, vec![3, 1]);
/// assert_eq!(labels[1].image_index, 7);
/// ```
pub fn parse_label_lines(text: &str, image_index: usize, n_att: usize) -> Result<Vec<GroundTruthLabel>> {
    let mut labels = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != n_att + 4 {
            return Err(EvalError::InvalidLabel(format!(
                "line {}: expected {} fields, got {}",
                line_no + 1,
                n_att + 4,
                fields.len()
            )));
        }

        let attribute_classes = fields[..n_att]
            .iter()
            .map(|field| parse_class(field, line_no))
            .collect::<Result<Vec<usize>>>()?;

        let mut bbox = [0.0; 4];
        for (value, field) in bbox.iter_mut().zip(&fields[n_att..]) {
            *value = field.parse::<f64>().map_err(|_| {
                EvalError::InvalidLabel(format!("line {}: invalid coordinate '{}'", line_no + 1, field))
            })?;
        }
        if bbox.iter().any(|v| !v.is_finite()) || bbox[2] < 0.0 || bbox[3] < 0.0 {
            return Err(EvalError::InvalidBoundingBox(format!(
                "line {}: {:?}",
                line_no + 1,
                bbox
            )));
        }

        labels.push(GroundTruthLabel::new(image_index, attribute_classes, bbox));
    }

    Ok(labels)
}

/// Classes may be written as integral floats ("3.0").
fn parse_class(field: &str, line_no: usize) -> Result<usize> {
    if let Ok(class) = field.parse::<usize>() {
        return Ok(class);
    }
    match field.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 => Ok(value as usize),
        _ => Err(EvalError::InvalidLabel(format!(
            "line {}: invalid class '{}'",
            line_no + 1,
            field
        ))),
    }
}

/// Load labels of one image from a label text file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line is malformed.
pub fn load_labels_from_file<P: AsRef<Path>>(
    path: P,
    image_index: usize,
    n_att: usize,
) -> Result<Vec<GroundTruthLabel>> {
    let text = std::fs::read_to_string(path)?;
    parse_label_lines(&text, image_index, n_att)
}
