//! Resolution of per-allele annotation values.

use super::{
    record::{numeric_or_missing, VariantRecord, MISSING},
    schema::keys,
};

/// Return the value for `allele_idx` from a per-allele list.
///
/// Annotators emit either one value per alternate allele or a single value
/// shared by all alleles, so indices past the end resolve to the last entry.
pub fn resolve<I: IntoIterator>(values: I, allele_idx: usize) -> Option<I::Item> {
    values.into_iter().take(allele_idx.saturating_add(1)).last()
}

/// Resolve the comma-separated annotation `key` of `record` for `allele_idx`.
pub fn resolve_annotation<'a>(
    record: &'a VariantRecord,
    key: &str,
    default: &'a str,
    allele_idx: usize,
) -> &'a str {
    record
        .annotation(key)
        .and_then(|raw| resolve(raw.split(','), allele_idx))
        .unwrap_or(default)
}

/// One alternate allele of a record with its resolved annotation values.
#[derive(Debug, Clone)]
pub struct AlleleCandidate<'a> {
    /// 0-based index into the ALT alleles.
    pub index: usize,
    /// The alternate allele itself.
    pub alternate: &'a str,
    pub class: &'a str,
    pub aa_change: &'a str,
    pub freq_exac: &'a str,
    pub freq_1kg: &'a str,
    pub freq_esp: &'a str,
    /// In-cohort allele frequency.
    pub freq_cohort: &'a str,
    pub sift: &'a str,
    pub pp2: &'a str,
    pub mutation_assessor: &'a str,
    pub mutation_taster: &'a str,
    pub gerp: &'a str,
    pub cadd: &'a str,
    pub metasvm_score: &'a str,
    pub metasvm_prediction: &'a str,
    /// Values for `keys::POPULATION_FREQS`, in the same order.
    pub population_freqs: Vec<&'a str>,
}

impl<'a> AlleleCandidate<'a> {
    /// Resolve all per-allele values of `record` for `index`.
    pub fn new(record: &'a VariantRecord, index: usize) -> Self {
        let get = |key: &str| resolve_annotation(record, key, MISSING, index);
        Self {
            index,
            alternate: record
                .alternates
                .get(index)
                .map(String::as_str)
                .unwrap_or(MISSING),
            class: resolve_annotation(record, keys::CLASS, "none", index),
            aa_change: get(keys::AA_CHANGE),
            freq_exac: get(keys::FREQ_EXAC),
            freq_1kg: get(keys::FREQ_1KG),
            freq_esp: get(keys::FREQ_ESP),
            freq_cohort: resolve_annotation(record, keys::FREQ_COHORT, "0", index),
            sift: get(keys::SIFT),
            pp2: get(keys::PP2),
            mutation_assessor: get(keys::MUTATION_ASSESSOR),
            mutation_taster: get(keys::MUTATION_TASTER),
            gerp: get(keys::GERP),
            cadd: get(keys::CADD),
            metasvm_score: get(keys::METASVM_SCORE),
            metasvm_prediction: get(keys::METASVM_PREDICTION),
            population_freqs: keys::POPULATION_FREQS
                .iter()
                .map(|(_, key)| get(key))
                .collect(),
        }
    }

    /// 1-based allele number as used in genotype calls.
    pub fn allele_no(&self) -> usize {
        self.index + 1
    }

    pub fn freq_exac_value(&self) -> f64 {
        numeric_or_missing(keys::FREQ_EXAC, self.freq_exac)
    }

    pub fn freq_1kg_value(&self) -> f64 {
        numeric_or_missing(keys::FREQ_1KG, self.freq_1kg)
    }

    pub fn freq_esp_value(&self) -> f64 {
        numeric_or_missing(keys::FREQ_ESP, self.freq_esp)
    }

    pub fn freq_cohort_value(&self) -> f64 {
        numeric_or_missing(keys::FREQ_COHORT, self.freq_cohort)
    }

    pub fn cadd_value(&self) -> f64 {
        numeric_or_missing(keys::CADD, self.cadd)
    }
}
