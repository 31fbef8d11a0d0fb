//! Cross-domain converters.

use crate::config::PipelineConfig;
use crate::domain::{ClassificationInstance, Domain, Instance};
use crate::error::AnnopipeError;
use crate::registry::{StageInstance, StageKind, StageSpecifier};
use crate::stream::{Processor, StageOutput};

/// Converts object detection to classification by labeling each image
/// after its largest-area object. Negative instances stay negative.
pub struct OdToIc;

impl Processor for OdToIc {
    fn process_element(
        &mut self,
        element: Instance,
        out: &mut StageOutput<'_>,
    ) -> Result<(), AnnopipeError> {
        let inst = match element {
            Instance::ObjectDetection(inst) => inst,
            // Unreachable behind the inline validators.
            other => return out.then(other),
        };
        let label = inst.objects.as_ref().and_then(|objects| {
            objects
                .iter()
                .filter(|obj| obj.bbox.is_finite())
                .max_by(|a, b| {
                    a.bbox
                        .area()
                        .partial_cmp(&b.bbox.area())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|obj| obj.label.clone())
        });
        out.then(Instance::Classification(ClassificationInstance {
            image: inst.image,
            label,
        }))
    }
}

pub struct OdToIcSpecifier;

impl StageSpecifier for OdToIcSpecifier {
    fn name(&self) -> &'static str {
        "od-to-ic"
    }

    fn description(&self) -> &'static str {
        "converts object detection to classification via the largest object's label"
    }

    fn kind(&self) -> StageKind {
        StageKind::Processor
    }

    fn domain_transfer(&self, input: Domain) -> Result<Domain, AnnopipeError> {
        match input {
            Domain::ObjectDetection => Ok(Domain::Classification),
            other => Err(AnnopipeError::UnsupportedDomain {
                stage: self.name().to_string(),
                domain: other,
            }),
        }
    }

    fn instantiate(
        &self,
        _options: &[String],
        _config: &PipelineConfig,
    ) -> Result<StageInstance, AnnopipeError> {
        Ok(StageInstance::Processor(Box::new(OdToIc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BBox, ImageInfo, LocatedObject, ObjectDetectionInstance};
    use crate::stream::bind_sink;
    use crate::stream::util::CollectSink;

    fn convert(instance: Instance) -> Instance {
        let mut sink = CollectSink::new();
        {
            let mut out = StageOutput::new("od-to-ic", bind_sink(&mut sink));
            OdToIc.process_element(instance, &mut out).unwrap();
        }
        let mut items = sink.into_items();
        assert_eq!(items.len(), 1);
        items.remove(0)
    }

    #[test]
    fn largest_object_wins() {
        let converted = convert(Instance::ObjectDetection(ObjectDetectionInstance {
            image: ImageInfo::new("a.png"),
            objects: Some(vec![
                LocatedObject::new("cat", BBox::from_xyxy(0.0, 0.0, 10.0, 10.0)),
                LocatedObject::new("dog", BBox::from_xyxy(0.0, 0.0, 50.0, 50.0)),
            ]),
        }));
        let Instance::Classification(inst) = converted else {
            panic!("wrong domain");
        };
        assert_eq!(inst.label.as_deref(), Some("dog"));
    }

    #[test]
    fn negatives_stay_negative() {
        let converted = convert(Instance::ObjectDetection(ObjectDetectionInstance {
            image: ImageInfo::new("a.png"),
            objects: None,
        }));
        assert_eq!(converted.domain(), Domain::Classification);
        assert!(converted.is_negative());
    }

    #[test]
    fn specifier_changes_domain() {
        let spec = OdToIcSpecifier;
        assert_eq!(
            spec.domain_transfer(Domain::ObjectDetection).unwrap(),
            Domain::Classification
        );
        assert!(spec.domain_transfer(Domain::Speech).is_err());
    }
}
