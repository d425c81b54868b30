//! Basic evaluation example demonstrating core functionality.

use multiattr_eval::export::{coco_records, label_lines};
use multiattr_eval::metrics::iou::box_iou;
use multiattr_eval::polars_utils::report_to_dataframe;
use multiattr_eval::{
    load_config_from_str, non_max_suppression_multi_attr, parse_label_lines, CandidateRow, Evaluator, ImageInput,
    ImageShape, Letterbox, ShapeInfo,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();

    println!("=== Multi-Attribute Evaluation Example ===\n");

    // Example 1: IoU Calculation
    println!("1. IoU Calculation");
    let iou = box_iou(&[10.0, 10.0, 60.0, 60.0], &[30.0, 30.0, 80.0, 80.0]);
    println!("   IoU between overlapping boxes: {:.4}", iou);
    println!();

    // Example 2: Configuration
    println!("2. Loading Configuration");
    let config = load_config_from_str(
        r#"{
            "class_counts": [3, 2],
            "conf_thres": 0.001,
            "iou_thres": 0.6,
            "save_json": true,
            "is_coco": false
        }"#,
    )?;
    println!("   Attributes: {} with class counts {:?}", config.n_att(), config.class_counts);
    println!();

    // Example 3: Ground truth labels (class per attribute, then normalized xywh)
    println!("3. Parsing Labels");
    let labels = parse_label_lines(
        "0 1 0.30 0.40 0.20 0.25\n\
         2 0 0.70 0.60 0.15 0.30\n",
        0,
        config.n_att(),
    )?;
    println!("   Parsed {} labels", labels.len());
    println!();

    // A 480x640 image letterboxed into 640x640: gain 1, 80 px padding top and bottom
    let shape = ShapeInfo {
        inference: ImageShape::new(640.0, 640.0),
        original: ImageShape::new(480.0, 640.0),
        letterbox: Some(Letterbox { gain: 1.0, pad: (0.0, 80.0) }),
    };

    // Example 4: Raw candidates through NMS
    println!("4. Multi-Attribute NMS");
    let rows = vec![
        CandidateRow::new([192.0, 272.0, 128.0, 120.0], 0.95, vec![vec![0.9, 0.05, 0.05], vec![0.2, 0.8]]),
        CandidateRow::new([195.0, 270.0, 126.0, 118.0], 0.80, vec![vec![0.85, 0.1, 0.05], vec![0.3, 0.7]]),
        CandidateRow::new([448.0, 368.0, 96.0, 144.0], 0.90, vec![vec![0.1, 0.1, 0.8], vec![0.9, 0.1]]),
        CandidateRow::new([100.0, 500.0, 40.0, 40.0], 0.30, vec![vec![0.2, 0.7, 0.1], vec![0.6, 0.4]]),
    ];
    let kept = non_max_suppression_multi_attr(&rows, &config.nms_params(), &[])?;
    println!("   {} candidates -> {} detections", rows.len(), kept.len());
    println!();

    // Example 5: Evaluation
    println!("5. Running Evaluation");
    let mut evaluator = Evaluator::new(config)?;
    let image = ImageInput {
        rows,
        labels,
        shape,
        stem: Some("42".to_string()),
    };
    let detections = evaluator.process_image(&image)?;

    println!("   Label file lines:");
    for line in label_lines(&detections, image.shape.original, true) {
        println!("   ├─ {}", line);
    }
    let records = coco_records(&detections, "42", false);
    println!("   └─ {} COCO records", records.len());
    println!();

    let report = evaluator.finalize();
    for line in report.summary_lines() {
        println!("   {}", line);
    }
    println!();

    // Example 6: Confusion matrix
    println!("6. Confusion Matrix (attribute 0, rows = predicted)");
    for row in report.confusion_matrices[0].matrix() {
        println!("   {:?}", row);
    }
    println!();

    // Example 7: Tabular report
    println!("7. Report as DataFrame");
    let df = report_to_dataframe(&report)?;
    println!("{}", df);

    println!("=== Example Complete ===");

    Ok(())
}
