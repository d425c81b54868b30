//! Utilities for working with Polars DataFrames
//!
//! This module reads ground-truth labels from label tables and flattens
//! evaluation reports into per-class metric tables.

use polars::prelude::*;

use crate::error::EvalError;
use crate::types::{EvaluationReport, GroundTruthLabel};

/// Validate that a DataFrame contains all required columns
///
/// # Arguments
///
/// * `df` - The DataFrame to validate
/// * `required_columns` - Slice of required column names
///
/// # Returns
///
/// `Ok(())` if all columns are present, error otherwise
pub fn validate_columns(df: &DataFrame, required_columns: &[&str]) -> Result<(), EvalError> {
    let column_names: Vec<String> = df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for col in required_columns {
        if !column_names.iter().any(|c| c == col) {
            return Err(EvalError::MissingColumn(col.to_string()));
        }
    }

    Ok(())
}

/// Column names of a label table with `n_att` attribute heads
///
/// `image_index`, `att_0` .. `att_{n-1}`, then the normalized center box
/// `x`, `y`, `w`, `h`.
pub fn label_columns(n_att: usize) -> Vec<String> {
    let mut columns = vec!["image_index".to_string()];
    columns.extend((0..n_att).map(|k| format!("att_{k}")));
    columns.extend(["x", "y", "w", "h"].iter().map(|s| s.to_string()));
    columns
}

fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<usize>, EvalError> {
    let column = df.column(name)?;
    if !matches!(column.dtype(), DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32) {
        return Err(EvalError::InvalidDataFrame(
            format!("{} must be an integer column, got {:?}", name, column.dtype())
        ));
    }

    let values = column.as_materialized_series().cast(&DataType::UInt64)?;
    values.u64()?
        .into_iter()
        .map(|v| v.map(|v| v as usize).ok_or_else(|| EvalError::InvalidDataFrame(
            format!("{} contains nulls or negative values", name)
        )))
        .collect()
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, EvalError> {
    let column = df.column(name)?;
    if !matches!(
        column.dtype(),
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32
    ) {
        return Err(EvalError::InvalidDataFrame(
            format!("{} must be numeric, got {:?}", name, column.dtype())
        ));
    }

    let values = column.as_materialized_series().cast(&DataType::Float64)?;
    values.f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| EvalError::InvalidDataFrame(
            format!("{} contains nulls", name)
        )))
        .collect()
}

/// Read ground-truth labels from a label table
///
/// # Errors
///
/// Returns `MissingColumn` when a column of [`label_columns`] is absent and
/// `InvalidDataFrame` for wrong dtypes or null values.
pub fn labels_from_dataframe(df: &DataFrame, n_att: usize) -> Result<Vec<GroundTruthLabel>, EvalError> {
    let columns = label_columns(n_att);
    let required: Vec<&str> = columns.iter().map(String::as_str).collect();
    validate_columns(df, &required)?;

    let image_index = integer_column(df, "image_index")?;
    let attributes = (0..n_att)
        .map(|k| integer_column(df, &format!("att_{k}")))
        .collect::<Result<Vec<_>, _>>()?;
    let coords = ["x", "y", "w", "h"]
        .iter()
        .map(|name| float_column(df, name))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((0..df.height())
        .map(|i| {
            GroundTruthLabel::new(
                image_index[i],
                attributes.iter().map(|values| values[i]).collect(),
                [coords[0][i], coords[1][i], coords[2][i], coords[3][i]],
            )
        })
        .collect())
}

/// Flatten the per-class metrics of a report into one table
///
/// One row per (attribute, class present in the ground truth) with columns
/// `attribute`, `class`, `targets`, `precision`, `recall`, `f1`, `ap50`, `ap`.
pub fn report_to_dataframe(report: &EvaluationReport) -> Result<DataFrame, EvalError> {
    let mut attribute = Vec::new();
    let mut class = Vec::new();
    let mut targets = Vec::new();
    let mut precision = Vec::new();
    let mut recall = Vec::new();
    let mut f1 = Vec::new();
    let mut ap50 = Vec::new();
    let mut ap = Vec::new();

    for (k, metrics) in report.attributes.iter().enumerate() {
        for row in &metrics.classes {
            attribute.push(k as u32);
            class.push(row.class_id as u32);
            targets.push(row.targets as u64);
            precision.push(row.precision);
            recall.push(row.recall);
            f1.push(row.f1);
            ap50.push(row.ap50);
            ap.push(row.ap);
        }
    }

    let df = df! {
        "attribute" => attribute,
        "class" => class,
        "targets" => targets,
        "precision" => precision,
        "recall" => recall,
        "f1" => f1,
        "ap50" => ap50,
        "ap" => ap,
    }?;

    Ok(df)
}
