//! Box format conversion and letterbox rescaling.

use crate::types::{BBoxXYWH, BBoxXYXY, ImageShape, ShapeInfo};

/// Convert bounding box from [x_center, y_center, width, height] to [x1, y1, x2, y2]
///
/// # Examples
///
/// ```
/// # use multiattr_eval::geometry::xywh_to_xyxy;
/// let xywh = [25.0, 40.0, 30.0, 40.0];
/// let xyxy = xywh_to_xyxy(xywh);
/// assert_eq!(xyxy, [10.0, 20.0, 40.0, 60.0]);
/// ```
#[must_use]
pub fn xywh_to_xyxy(bbox: BBoxXYWH) -> BBoxXYXY {
    let half_w = bbox[2] / 2.0;
    let half_h = bbox[3] / 2.0;
    [
        bbox[0] - half_w,
        bbox[1] - half_h,
        bbox[0] + half_w,
        bbox[1] + half_h,
    ]
}

/// Convert bounding box from [x1, y1, x2, y2] to [x_center, y_center, width, height]
///
/// # Examples
///
/// ```
/// # use multiattr_eval::geometry::xyxy_to_xywh;
/// let xyxy = [10.0, 20.0, 40.0, 60.0];
/// let xywh = xyxy_to_xywh(xyxy);
/// assert_eq!(xywh, [25.0, 40.0, 30.0, 40.0]);
/// ```
#[must_use]
pub fn xyxy_to_xywh(bbox: BBoxXYXY) -> BBoxXYWH {
    [
        (bbox[0] + bbox[2]) / 2.0,
        (bbox[1] + bbox[3]) / 2.0,
        bbox[2] - bbox[0],
        bbox[3] - bbox[1],
    ]
}

/// Scale a normalized center box to pixels of `shape`.
#[must_use]
pub fn denormalize_xywh(bbox: BBoxXYWH, shape: ImageShape) -> BBoxXYWH {
    [
        bbox[0] * shape.width,
        bbox[1] * shape.height,
        bbox[2] * shape.width,
        bbox[3] * shape.height,
    ]
}

/// Clamp a box to the image bounds.
#[must_use]
pub fn clip_box(bbox: BBoxXYXY, shape: ImageShape) -> BBoxXYXY {
    [
        bbox[0].clamp(0.0, shape.width),
        bbox[1].clamp(0.0, shape.height),
        bbox[2].clamp(0.0, shape.width),
        bbox[3].clamp(0.0, shape.height),
    ]
}

/// Map a box from the letterboxed inference frame to original image pixels.
///
/// Padding is removed, the resize gain undone and the result clipped to the
/// original image. Without explicit letterbox parameters the gain is
/// `min(h1 / h0, w1 / w0)` and the padding is split evenly on both sides.
///
/// # Examples
///
/// ```
/// # use multiattr_eval::geometry::scale_coords;
/// # use multiattr_eval::types::{ImageShape, ShapeInfo};
/// // 1280x640 image letterboxed into 640x640: gain 0.5, 160 px vertical pad
/// let shape = ShapeInfo {
///     inference: ImageShape::new(640.0, 640.0),
///     original: ImageShape::new(640.0, 1280.0),
///     letterbox: None,
/// };
/// let scaled = scale_coords([100.0, 200.0, 300.0, 400.0], &shape);
/// assert_eq!(scaled, [200.0, 80.0, 600.0, 480.0]);
/// ```
#[must_use]
pub fn scale_coords(bbox: BBoxXYXY, shape: &ShapeInfo) -> BBoxXYXY {
    let (gain, pad) = match shape.letterbox {
        Some(letterbox) => (letterbox.gain, letterbox.pad),
        None => {
            let gain = (shape.inference.height / shape.original.height)
                .min(shape.inference.width / shape.original.width);
            let pad = (
                (shape.inference.width - shape.original.width * gain) / 2.0,
                (shape.inference.height - shape.original.height * gain) / 2.0,
            );
            (gain, pad)
        }
    };

    let gain = if gain > 0.0 { gain } else { 1.0 };
    let unpadded = [
        (bbox[0] - pad.0) / gain,
        (bbox[1] - pad.1) / gain,
        (bbox[2] - pad.0) / gain,
        (bbox[3] - pad.1) / gain,
    ];
    clip_box(unpadded, shape.original)
}
