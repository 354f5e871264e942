//! Record-wide predicates that do not depend on allele or family.

use crate::filter::{
    record::{numeric_or_missing, VariantRecord},
    schema::{class, keys},
    settings::FilterSettings,
};

/// Flags computed once per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocusFlags {
    /// QUAL passes the call quality floor.
    pub pass_quality: bool,
    /// MQ0 / DP passes the ceiling.
    pub pass_mq0: bool,
    /// Functional region is exonic, splicing or not annotated.
    pub pass_function: bool,
    /// FILTER does not match the bad SNP list.
    pub good_snp: bool,
    /// FILTER does not match the bad indel list.
    pub good_indel: bool,
}

impl LocusFlags {
    /// Whether the record proceeds to allele evaluation.
    pub fn passes(&self) -> bool {
        self.pass_quality && self.pass_mq0 && self.pass_function
    }
}

/// Whether any entry of `patterns` matches the record's FILTER tags.
///
/// An entry with `;` matches only if all of its tags are present.
pub fn matches_any_filter(filter_tags: &[String], patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        pattern
            .split(';')
            .all(|tag| filter_tags.iter().any(|t| t == tag))
    })
}

/// Compute the record-wide flags of `record`.
pub fn evaluate(settings: &FilterSettings, record: &VariantRecord) -> LocusFlags {
    if settings.no_quality {
        return LocusFlags {
            pass_quality: true,
            pass_mq0: true,
            pass_function: passes_function(record),
            good_snp: true,
            good_indel: true,
        };
    }

    let depth = numeric_or_missing(keys::DEPTH, record.annotation_or(keys::DEPTH, "1"));
    let mq0 = numeric_or_missing(keys::MQ0, record.annotation_or(keys::MQ0, "0"));
    let mq0_fraction = mq0 / depth.max(1.0);

    LocusFlags {
        pass_quality: record.quality >= settings.min_call_quality,
        pass_mq0: mq0_fraction <= settings.max_mq0_fraction,
        pass_function: passes_function(record),
        good_snp: !matches_any_filter(&record.filter_tags, &settings.bad_snp_filters),
        good_indel: !matches_any_filter(&record.filter_tags, &settings.bad_indel_filters),
    }
}

fn passes_function(record: &VariantRecord) -> bool {
    match record.annotation(keys::FUNCTION) {
        None => true,
        Some(function) => {
            function == class::EXONIC
                || function == class::NO_FUNCTION
                || class::is_splicing_function(function)
        }
    }
}
