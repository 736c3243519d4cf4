//! Decoding raw detector tensors into boxes and keypoints.

mod bbox;
mod decoder;
mod nms;
mod pose;

pub use bbox::{BoundingBox, RawDetection, iou_matrix};
pub use decoder::{BoxDecoder, TensorView};
pub use nms::NonMaxSuppressor;
pub use pose::PoseDecoder;
