//! Allele-level predicates: class, population frequency, FILTER tier and
//! predicted pathogenicity.

use super::locus::{matches_any_filter, LocusFlags};
use crate::filter::{
    allele::AlleleCandidate,
    record::{VariantRecord, MISSING},
    schema::{class, keys, CallQuality, PathogenicityTier},
    settings::FilterSettings,
};

/// CADD phred score from which a missense allele counts as moderately damaging.
pub const CADD_MEDIUM: f64 = 15.0;
/// CADD phred score from which a missense allele counts as highly damaging.
pub const CADD_HIGH: f64 = 25.0;

/// Prediction token for "damaging" (SIFT, PP2, MetaSVM).
const DAMAGING: &str = "D";
/// Prediction token for "possibly damaging" (PP2).
const POSSIBLY_DAMAGING: &str = "P";

/// Flags computed once per (record, allele).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlleleFlags {
    pub pass_exac: bool,
    pub pass_1kg: bool,
    pub pass_esp: bool,
    pub pass_class: bool,
    pub pass_pathogenicity: bool,
    /// FILTER column does not match the bad list of the allele's category.
    pub pass_filter: bool,
    pub tier: PathogenicityTier,
    pub call_quality: CallQuality,
}

impl AlleleFlags {
    /// Whether the allele proceeds to per-family evaluation.
    pub fn passes(&self) -> bool {
        self.pass_exac
            && self.pass_1kg
            && self.pass_esp
            && self.pass_class
            && self.pass_filter
            && self.pass_pathogenicity
    }
}

/// Return the pathogenicity tier and whether any rule fired.
pub fn classify_pathogenicity(
    candidate: &AlleleCandidate,
    function: &str,
) -> (PathogenicityTier, bool) {
    let missense = class::is_missense(candidate.class);
    let cadd = candidate.cadd_value();

    let mut tier = PathogenicityTier::Low;
    let mut fired = false;
    let mut upgrade = |to: PathogenicityTier| {
        tier = to;
        fired = true;
    };

    if missense {
        let unannotated = [
            candidate.sift,
            candidate.pp2,
            candidate.cadd,
            candidate.metasvm_prediction,
        ]
        .iter()
        .all(|value| *value == MISSING);
        if unannotated {
            upgrade(PathogenicityTier::Medium);
        }
        if candidate.sift == DAMAGING
            || candidate.pp2 == DAMAGING
            || candidate.pp2 == POSSIBLY_DAMAGING
            || cadd >= CADD_MEDIUM
        {
            upgrade(PathogenicityTier::Medium);
        }
        if candidate.sift == DAMAGING && candidate.pp2 == DAMAGING {
            upgrade(PathogenicityTier::High);
        }
        if candidate.metasvm_prediction == DAMAGING {
            upgrade(PathogenicityTier::High);
        }
        if cadd >= CADD_HIGH {
            upgrade(PathogenicityTier::High);
        }
    }
    if class::is_splicing_function(function) {
        upgrade(PathogenicityTier::High);
    }
    if class::is_indel(candidate.class) || class::is_nonsense(candidate.class) {
        upgrade(PathogenicityTier::High);
    }
    if class::is_synonymous(candidate.class) {
        tier = PathogenicityTier::Silent;
    }

    (tier, fired)
}

/// Call-quality label of the record's FILTER column for an allele of `class`.
pub fn call_quality(settings: &FilterSettings, record: &VariantRecord, class: &str) -> CallQuality {
    let (bad, mid) = if class::is_indel(class) {
        (&settings.bad_indel_filters, &settings.mid_indel_filters)
    } else {
        (&settings.bad_snp_filters, &settings.mid_snp_filters)
    };
    if matches_any_filter(&record.filter_tags, bad) {
        CallQuality::Low
    } else if matches_any_filter(&record.filter_tags, mid) {
        CallQuality::Medium
    } else {
        CallQuality::High
    }
}

/// Compute the allele-level flags for `candidate` of `record`.
pub fn evaluate(
    settings: &FilterSettings,
    record: &VariantRecord,
    locus: &LocusFlags,
    candidate: &AlleleCandidate,
) -> AlleleFlags {
    let function = record.annotation_or(keys::FUNCTION, class::NO_FUNCTION);
    let synonymous = class::is_synonymous(candidate.class);
    let (tier, fired) = classify_pathogenicity(candidate, function);

    let pass_filter = if class::is_indel(candidate.class) {
        locus.good_indel
    } else {
        locus.good_snp
    };

    let keep_synonymous = settings.keep_synonymous && synonymous;
    AlleleFlags {
        pass_exac: candidate.freq_exac_value() <= settings.max_freq_exac,
        pass_1kg: candidate.freq_1kg_value() <= settings.max_freq_1kg,
        pass_esp: candidate.freq_esp_value() <= settings.max_freq_esp,
        pass_class: !synonymous || keep_synonymous,
        pass_pathogenicity: fired || settings.no_pathogenicity || keep_synonymous,
        pass_filter: pass_filter || settings.no_quality,
        tier,
        call_quality: call_quality(settings, record, candidate.class),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{call_quality, classify_pathogenicity, evaluate};
    use crate::filter::{
        allele::AlleleCandidate,
        interpreter::locus,
        record::VariantRecord,
        schema::{CallQuality, PathogenicityTier},
        settings::FilterSettings,
    };

    fn record(filter: &str, info: &str) -> VariantRecord {
        VariantRecord::parse(&format!("1\t100\t.\tA\tG,T\t50\t{filter}\t{info}"), 1)
            .expect("valid test record")
    }

    #[rstest]
    #[case("VarClass=nonsynonymousSNV", PathogenicityTier::Medium, true)]
    #[case(
        "VarClass=nonsynonymousSNV;SIFTprd=T;PP2.hvar.prd=B",
        PathogenicityTier::Low,
        false
    )]
    #[case("VarClass=nonsynonymousSNV;PP2.hvar.prd=P", PathogenicityTier::Medium, true)]
    #[case("VarClass=nonsynonymousSNV;CADDphred=15", PathogenicityTier::Medium, true)]
    #[case("VarClass=unknown;SIFTprd=D;PP2.hvar.prd=D", PathogenicityTier::High, true)]
    #[case("VarClass=nonsynonymousSNV;MetaSVMprd=D", PathogenicityTier::High, true)]
    #[case("VarClass=nonsynonymousSNV;CADDphred=25.1", PathogenicityTier::High, true)]
    #[case("VarClass=stopgain;SIFTprd=T", PathogenicityTier::High, true)]
    #[case("VarClass=frameshiftinsertion", PathogenicityTier::High, true)]
    #[case("VarClass=nonframeshiftdeletion", PathogenicityTier::High, true)]
    #[case("VarClass=synonymousSNV;CADDphred=30", PathogenicityTier::Silent, false)]
    #[case(
        "VarClass=synonymousSNV;VarFunc=exonic,splicing",
        PathogenicityTier::Silent,
        true
    )]
    #[case("VarClass=none;VarFunc=splicing", PathogenicityTier::High, true)]
    #[case("VarClass=none;CADDphred=30", PathogenicityTier::Low, false)]
    fn pathogenicity(
        #[case] info: &str,
        #[case] tier: PathogenicityTier,
        #[case] fired: bool,
    ) {
        let record = record("PASS", info);
        let candidate = AlleleCandidate::new(&record, 0);
        let function = record.annotation_or("VarFunc", "none");

        assert_eq!(classify_pathogenicity(&candidate, function), (tier, fired));
    }

    #[rstest]
    #[case("PASS", "nonsynonymousSNV", CallQuality::High)]
    #[case("FS_Mid_SNP", "nonsynonymousSNV", CallQuality::Medium)]
    #[case("FS_Mid_SNP;QD_Mid_SNP", "nonsynonymousSNV", CallQuality::Low)]
    #[case("FS_Mid_SNP", "frameshiftdeletion", CallQuality::High)]
    #[case("RPBias_Indel", "frameshiftdeletion", CallQuality::Medium)]
    #[case("LowQD_Indel", "frameshiftdeletion", CallQuality::Low)]
    #[case("LowQD_Indel", "stopgain", CallQuality::High)]
    fn call_quality_label(#[case] filter: &str, #[case] class: &str, #[case] expected: CallQuality) {
        let settings = FilterSettings::default();

        assert_eq!(
            call_quality(&settings, &record(filter, "."), class),
            expected
        );
    }

    #[test]
    fn per_allele_values_are_resolved() {
        let settings = FilterSettings::default();
        let record = record(
            "PASS",
            "VarClass=stopgain,synonymousSNV;ExACfreq=0.001,0.2;VarFunc=exonic",
        );
        let locus = locus::evaluate(&settings, &record);

        let first = evaluate(&settings, &record, &locus, &AlleleCandidate::new(&record, 0));
        assert!(first.passes());
        assert_eq!(first.tier, PathogenicityTier::High);

        let second = evaluate(&settings, &record, &locus, &AlleleCandidate::new(&record, 1));
        assert!(!second.pass_exac);
        assert!(!second.pass_class);
        assert!(!second.pass_pathogenicity);
        assert_eq!(second.tier, PathogenicityTier::Silent);
    }

    #[test]
    fn missing_frequencies_pass_zero_ceiling() {
        let settings = FilterSettings {
            max_freq_all: Some(0.0),
            ..Default::default()
        }
        .finalized();
        let record = record(
            "PASS",
            "VarClass=stopgain;ExACfreq=.;ESPfreq=.,0.1;VarFunc=exonic",
        );
        let locus = locus::evaluate(&settings, &record);

        let first = evaluate(&settings, &record, &locus, &AlleleCandidate::new(&record, 0));
        assert!(first.pass_exac);
        assert!(first.pass_1kg);
        assert!(first.pass_esp);
        assert!(first.passes());

        let second = evaluate(&settings, &record, &locus, &AlleleCandidate::new(&record, 1));
        assert!(second.pass_exac);
        assert!(!second.pass_esp);
    }

    #[test]
    fn mode_overrides() {
        let settings = FilterSettings {
            keep_synonymous: true,
            no_quality: true,
            ..Default::default()
        };
        let record = record("LowQuality", "VarClass=synonymousSNV");
        let locus = locus::evaluate(&settings, &record);

        let flags = evaluate(&settings, &record, &locus, &AlleleCandidate::new(&record, 0));
        assert!(flags.pass_class);
        assert!(flags.pass_pathogenicity);
        assert!(flags.pass_filter);
        assert_eq!(flags.call_quality, CallQuality::Low);
        assert!(flags.passes());

        let settings = FilterSettings {
            no_pathogenicity: true,
            ..Default::default()
        };
        let record = self::record("PASS", "VarClass=nonsynonymousSNV;SIFTprd=T");
        let flags = evaluate(
            &settings,
            &record,
            &locus::evaluate(&settings, &record),
            &AlleleCandidate::new(&record, 0),
        );
        assert_eq!(flags.tier, PathogenicityTier::Low);
        assert!(flags.pass_pathogenicity);
    }
}
