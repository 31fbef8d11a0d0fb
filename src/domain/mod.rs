//! Domain model for annopipe.
//!
//! A *domain* is a closed category of annotation task. Each domain fixes
//! the shape of the data record (an image or audio reference), the shape
//! of the annotation record, and the combined instance type that flows
//! through pipelines. Domains never change identity at runtime; a stage
//! either supports a domain or it does not, and that is decided entirely
//! at pipeline-construction time.
//!
//! # Design Principles
//!
//! 1. **Closed enumeration**: domains are a closed `enum`, so dispatch over
//!    them is exhaustive and compiler-checked rather than based on runtime
//!    type inspection.
//!
//! 2. **Negative examples are first-class**: every instance carries its
//!    annotations as an `Option`, so "image with nothing in it" is
//!    representable in every domain and survives conversion.

mod bbox;
mod data;
mod instance;

pub use bbox::BBox;
pub use data::{AudioInfo, ImageFormat, ImageInfo};
pub use instance::{
    ClassificationInstance, Instance, LocatedObject, ObjectDetectionInstance,
    SegmentationInstance, SegmentationMask, SpeechInstance,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A closed category of annotation task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// Images annotated with located, labeled objects.
    ObjectDetection,
    /// Images annotated with a single label.
    Classification,
    /// Images annotated with a per-pixel label mask.
    Segmentation,
    /// Audio annotated with a transcript.
    Speech,
}

impl Domain {
    /// Every supported domain, in canonical order.
    pub const ALL: [Domain; 4] = [
        Domain::ObjectDetection,
        Domain::Classification,
        Domain::Segmentation,
        Domain::Speech,
    ];

    /// The stable, kebab-case name used in CLI messages.
    pub fn name(&self) -> &'static str {
        match self {
            Domain::ObjectDetection => "object-detection",
            Domain::Classification => "classification",
            Domain::Segmentation => "segmentation",
            Domain::Speech => "speech",
        }
    }

    /// A one-line human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Domain::ObjectDetection => "images annotated with labeled bounding boxes",
            Domain::Classification => "images annotated with a single label",
            Domain::Segmentation => "images annotated with a per-pixel label mask",
            Domain::Speech => "audio annotated with a transcript",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered set of domains.
///
/// Used throughout pipeline construction to track which domains are still
/// possible at a given stage boundary, and in error messages to show the
/// user exactly where their stage sequence became invalid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainSet(BTreeSet<Domain>);

impl DomainSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// The set of every supported domain.
    pub fn all() -> Self {
        Self(Domain::ALL.into_iter().collect())
    }

    /// A set containing exactly one domain.
    pub fn singleton(domain: Domain) -> Self {
        Self(BTreeSet::from([domain]))
    }

    pub fn insert(&mut self, domain: Domain) -> bool {
        self.0.insert(domain)
    }

    pub fn remove(&mut self, domain: Domain) -> bool {
        self.0.remove(&domain)
    }

    pub fn contains(&self, domain: Domain) -> bool {
        self.0.contains(&domain)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the domains in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Domain> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Domain> for DomainSet {
    fn from_iter<I: IntoIterator<Item = Domain>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for DomainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, domain) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", domain)?;
        }
        write!(f, "}}")
    }
}
