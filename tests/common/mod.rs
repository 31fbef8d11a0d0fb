//! Shared helpers for the integration tests.

#![allow(dead_code)]

use annopipe::domain::{
    BBox, ClassificationInstance, ImageInfo, Instance, LocatedObject, ObjectDetectionInstance,
};

/// A classification instance with the given filename and optional label.
pub fn classified(name: &str, label: Option<&str>) -> Instance {
    Instance::Classification(ClassificationInstance {
        image: ImageInfo::new(name),
        label: label.map(str::to_string),
    })
}

/// An object-detection instance with one labeled box per entry.
pub fn detected(name: &str, labels: &[&str]) -> Instance {
    Instance::ObjectDetection(ObjectDetectionInstance {
        image: ImageInfo::new(name),
        objects: Some(
            labels
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let offset = i as f64 * 10.0;
                    LocatedObject::new(
                        *label,
                        BBox::from_xyxy(offset, offset, offset + 5.0, offset + 5.0),
                    )
                })
                .collect(),
        ),
    })
}

/// The filenames of a slice of instances, in order.
pub fn file_names(instances: &[Instance]) -> Vec<&str> {
    instances.iter().map(|i| i.file_name()).collect()
}
