//! Per-sample depth, genotype quality and allele balance checks.

use enum_map::EnumMap;

use super::genotype::allele_count;
use crate::filter::{
    record::{numeric_or_missing, VariantRecord},
    registry::RoleSample,
    schema::{format, Role},
    settings::FilterSettings,
};

/// Roles whose samples must reach the minimal depth.
const DEPTH_ROLES: [Role; 3] = [Role::Alternate, Role::Heterozygous, Role::Reference];

/// Numeric FORMAT value `key` at `format_idx` of every sample in `samples`.
fn values<'a>(
    record: &'a VariantRecord,
    samples: &'a [RoleSample],
    key: &'a str,
    format_idx: usize,
) -> impl Iterator<Item = f64> + 'a {
    samples
        .iter()
        .map(move |sample| numeric_or_missing(key, record.sample_value(sample.index, format_idx)))
}

/// Minimal depth of coverage for Alternate, Heterozygous and Reference samples.
///
/// Passes if DP is not part of the FORMAT column.
pub fn passes_depth(
    settings: &FilterSettings,
    record: &VariantRecord,
    roles: &EnumMap<Role, Vec<RoleSample>>,
) -> bool {
    let Some(format_idx) = record.format_index(format::DEPTH) else {
        return true;
    };
    DEPTH_ROLES.iter().all(|role| {
        values(record, &roles[*role], format::DEPTH, format_idx).all(|dp| dp >= settings.min_depth)
    })
}

/// Minimal genotype quality for all gating samples.
///
/// Passes if GQ is not part of the FORMAT column.
pub fn passes_genotype_quality(
    settings: &FilterSettings,
    record: &VariantRecord,
    roles: &EnumMap<Role, Vec<RoleSample>>,
) -> bool {
    let Some(format_idx) = record.format_index(format::GENOTYPE_QUALITY) else {
        return true;
    };
    roles
        .iter()
        .filter(|(role, _)| role.is_gating())
        .all(|(_, samples)| {
            values(record, samples, format::GENOTYPE_QUALITY, format_idx)
                .all(|gq| gq >= settings.min_gq)
        })
}

/// Read counts of one sample from the AD field.
#[derive(Debug, Clone, PartialEq)]
pub struct AlleleDepths {
    counts: Vec<f64>,
}

impl AlleleDepths {
    /// Parse a comma-separated AD value; missing entries count as zero reads.
    pub fn parse(value: &str) -> Self {
        Self {
            counts: value
                .split(',')
                .map(|count| numeric_or_missing(format::ALLELE_DEPTH, count))
                .collect(),
        }
    }

    /// Reads for allele number `allele_no` (0 is the reference).
    pub fn count(&self, allele_no: usize) -> f64 {
        self.counts.get(allele_no).copied().unwrap_or(0.0)
    }

    /// Total reads, at least one.
    pub fn total(&self) -> f64 {
        self.counts.iter().sum::<f64>().max(1.0)
    }

    /// Fraction of reads for allele number `allele_no`.
    pub fn fraction(&self, allele_no: usize) -> f64 {
        self.count(allele_no) / self.total()
    }
}

/// Check whether a sample of `role` with genotype `gt` and read counts `depths`
/// has plausible allele balance for allele number `allele_no`.
pub fn sample_balanced(
    settings: &FilterSettings,
    role: Role,
    gt: &str,
    depths: &AlleleDepths,
    allele_no: usize,
) -> bool {
    let het_ok = depths.count(allele_no) >= settings.min_het_allele_count;
    let hom_ok = depths.fraction(allele_no) >= settings.min_hom_allele_fraction;
    let ref_ok = depths.fraction(0) >= settings.min_hom_allele_fraction;
    match role {
        Role::Heterozygous => het_ok,
        Role::Alternate => hom_ok,
        Role::Reference => ref_ok,
        Role::NotReference => match allele_count(gt, allele_no) {
            1 => het_ok,
            2 => hom_ok,
            _ => false,
        },
        Role::NotAlternate => match allele_count(gt, allele_no) {
            1 => het_ok,
            0 => ref_ok,
            _ => false,
        },
        Role::Unfiltered => true,
    }
}

/// Allele balance for all gating samples.
///
/// Passes if AD is not part of the FORMAT column.
pub fn passes_allele_balance(
    settings: &FilterSettings,
    record: &VariantRecord,
    roles: &EnumMap<Role, Vec<RoleSample>>,
    allele_no: usize,
) -> bool {
    let Some(format_idx) = record.format_index(format::ALLELE_DEPTH) else {
        return true;
    };
    roles.iter().all(|(role, samples)| {
        samples.iter().all(|sample| {
            let depths = AlleleDepths::parse(record.sample_value(sample.index, format_idx));
            sample_balanced(
                settings,
                role,
                record.genotype(sample.index),
                &depths,
                allele_no,
            )
        })
    })
}
