//! Apply `FilterSettings` and `FamilyModel` definitions to `VariantRecord`s.

pub mod allele;
pub mod genotype;
pub mod locus;
pub mod quality;

use enum_map::EnumMap;

use self::{allele::AlleleFlags, locus::LocusFlags};
use super::{
    allele::AlleleCandidate, record::VariantRecord, registry::FamilyModel,
    settings::FilterSettings,
};

/// Per-family checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter, enum_map::Enum)]
pub enum Stage {
    CohortFrequency,
    Completeness,
    Genotype,
    SampleDepth,
    GenotypeQuality,
    AlleleBalance,
}

/// Outcome of evaluating one allele for one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Rejected by the first failing stage.
    Rejected(Stage),
}

/// Verdict plus the result of every stage reached; unreached stages are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDecision {
    pub verdict: Verdict,
    pub stages: EnumMap<Stage, Option<bool>>,
}

impl FamilyDecision {
    pub fn accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }

    /// Result of `stage`, if it was reached.
    pub fn stage(&self, stage: Stage) -> Option<bool> {
        self.stages[stage]
    }

    /// Combined completeness and genotype pattern result.
    pub fn genotype(&self) -> Option<bool> {
        match self.stage(Stage::Completeness) {
            Some(false) => Some(false),
            _ => self.stage(Stage::Genotype),
        }
    }
}

/// Hold the effective settings for interpreting records.
#[derive(Debug, Default, Clone)]
pub struct FilterInterpreter {
    pub settings: FilterSettings,
}

impl FilterInterpreter {
    pub fn new(settings: FilterSettings) -> Self {
        Self { settings }
    }

    /// Record-wide flags, computed once per record.
    pub fn passes_locus(&self, record: &VariantRecord) -> LocusFlags {
        locus::evaluate(&self.settings, record)
    }

    /// Allele-level flags, computed once per record and allele.
    pub fn passes_allele(
        &self,
        record: &VariantRecord,
        locus: &LocusFlags,
        candidate: &AlleleCandidate,
    ) -> AlleleFlags {
        allele::evaluate(&self.settings, record, locus, candidate)
    }

    fn passes_cohort_frequency(
        &self,
        family: &FamilyModel,
        _record: &VariantRecord,
        candidate: &AlleleCandidate,
    ) -> bool {
        candidate.freq_cohort_value() <= family.cohort_frequency_ceiling
    }

    fn passes_completeness(
        &self,
        family: &FamilyModel,
        record: &VariantRecord,
        _candidate: &AlleleCandidate,
    ) -> bool {
        genotype::complete(record, &family.roles)
    }

    fn passes_genotype(
        &self,
        family: &FamilyModel,
        record: &VariantRecord,
        candidate: &AlleleCandidate,
    ) -> bool {
        genotype::passes(record, &family.roles, candidate.allele_no())
    }

    fn passes_depth(
        &self,
        family: &FamilyModel,
        record: &VariantRecord,
        _candidate: &AlleleCandidate,
    ) -> bool {
        self.settings.no_quality || quality::passes_depth(&self.settings, record, &family.roles)
    }

    fn passes_genotype_quality(
        &self,
        family: &FamilyModel,
        record: &VariantRecord,
        _candidate: &AlleleCandidate,
    ) -> bool {
        self.settings.no_quality
            || quality::passes_genotype_quality(&self.settings, record, &family.roles)
    }

    fn passes_allele_balance(
        &self,
        family: &FamilyModel,
        record: &VariantRecord,
        candidate: &AlleleCandidate,
    ) -> bool {
        self.settings.no_quality
            || quality::passes_allele_balance(
                &self.settings,
                record,
                &family.roles,
                candidate.allele_no(),
            )
    }

    /// Evaluate `candidate` of `record` against `family`.
    ///
    /// Stages are evaluated in order and evaluation stops at the first failure.
    pub fn passes_family(
        &self,
        family: &FamilyModel,
        record: &VariantRecord,
        candidate: &AlleleCandidate,
    ) -> FamilyDecision {
        let mut stages: EnumMap<Stage, Option<bool>> = EnumMap::default();
        for (stage, check) in STAGE_CHECKS {
            let pass = check(self, family, record, candidate);
            stages[stage] = Some(pass);
            if !pass {
                tracing::trace!(
                    "{}:{} allele {} rejected for {} at {}",
                    &record.chromosome,
                    record.position,
                    candidate.allele_no(),
                    &family.base_name,
                    stage
                );
                return FamilyDecision {
                    verdict: Verdict::Rejected(stage),
                    stages,
                };
            }
        }

        FamilyDecision {
            verdict: Verdict::Accepted,
            stages,
        }
    }
}

/// Signature of the per-family stage checks.
type StageCheck = fn(&FilterInterpreter, &FamilyModel, &VariantRecord, &AlleleCandidate) -> bool;

/// Per-family stage checks in evaluation order.
const STAGE_CHECKS: [(Stage, StageCheck); 6] = [
    (Stage::CohortFrequency, FilterInterpreter::passes_cohort_frequency),
    (Stage::Completeness, FilterInterpreter::passes_completeness),
    (Stage::Genotype, FilterInterpreter::passes_genotype),
    (Stage::SampleDepth, FilterInterpreter::passes_depth),
    (Stage::GenotypeQuality, FilterInterpreter::passes_genotype_quality),
    (Stage::AlleleBalance, FilterInterpreter::passes_allele_balance),
];
