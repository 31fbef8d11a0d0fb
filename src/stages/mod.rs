//! Built-in stages: thin format adapters, in-place stream processors, and
//! cross-domain converters.
//!
//! Each stage lives next to its [`StageSpecifier`](crate::registry::StageSpecifier)
//! and parses its own option tokens with clap, so `annopipe convert
//! from-roi-csv --help`-style errors come out of the same machinery as the
//! top-level CLI.

pub mod convert;
pub mod filters;
pub mod roi_csv;
pub mod subdir;

use crate::registry::StageSpecifier;

/// Every built-in stage specifier, used to populate the default registry.
pub fn builtin_specifiers() -> Vec<Box<dyn StageSpecifier>> {
    vec![
        Box::new(roi_csv::FromRoiCsvSpecifier),
        Box::new(roi_csv::ToRoiCsvSpecifier),
        Box::new(subdir::FromSubdirSpecifier),
        Box::new(subdir::ToSubdirSpecifier),
        Box::new(filters::PassthroughSpecifier),
        Box::new(filters::DiscardNegativesSpecifier),
        Box::new(filters::FilterLabelsSpecifier),
        Box::new(filters::MaxElementsSpecifier),
        Box::new(convert::OdToIcSpecifier),
    ]
}

/// Parses a stage's option tokens with clap, mapping failures to
/// [`AnnopipeError::StageOptions`](crate::error::AnnopipeError::StageOptions).
pub(crate) fn parse_stage_options<T: clap::Parser>(
    stage: &str,
    options: &[String],
) -> Result<T, crate::error::AnnopipeError> {
    T::try_parse_from(std::iter::once(stage.to_string()).chain(options.iter().cloned())).map_err(
        |err| crate::error::AnnopipeError::StageOptions {
            stage: stage.to_string(),
            message: err.to_string(),
        },
    )
}
