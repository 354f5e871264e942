//! Enumerations and vocabulary shared by the filter stages.

/// Sample role within a family/model definition.
///
/// The declaration order is the column order of the filter table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
    enum_map::Enum,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Role {
    /// Samples that must be homozygous reference.
    Reference,
    /// Samples that must be heterozygous for the tested allele.
    Heterozygous,
    /// Samples that must be homozygous for the tested allele.
    Alternate,
    /// Samples that must carry the tested allele at least once.
    NotReference,
    /// Samples that must not be homozygous for the tested allele.
    NotAlternate,
    /// Samples that are reported but never gate acceptance.
    Unfiltered,
}

impl Role {
    /// Order in which role samples are listed in output columns.
    pub const DISPLAY_ORDER: [Role; 6] = [
        Role::Alternate,
        Role::Heterozygous,
        Role::Reference,
        Role::NotReference,
        Role::NotAlternate,
        Role::Unfiltered,
    ];

    /// Whether samples of this role take part in acceptance decisions.
    pub fn is_gating(self) -> bool {
        self != Role::Unfiltered
    }

    /// Human-readable label used in family logs.
    pub fn log_label(self) -> &'static str {
        match self {
            Role::Reference => "Homozygous Reference Samples",
            Role::Heterozygous => "Heterozygous Samples",
            Role::Alternate => "Homozygous Alternate Samples",
            Role::NotReference => "Not-Reference Samples",
            Role::NotAlternate => "Not-Alternate Samples",
            Role::Unfiltered => "Unfiltered Samples",
        }
    }
}

/// Predicted pathogenicity tier of an allele.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, serde::Serialize,
)]
pub enum PathogenicityTier {
    /// No rule fired.
    #[default]
    Low,
    /// Moderate evidence.
    Medium,
    /// Strong evidence.
    High,
    /// Synonymous change.
    Silent,
}

impl PathogenicityTier {
    /// Counter bucket (Low/Medium/High) that the tier is accounted in.
    pub fn bucket(self) -> usize {
        match self {
            PathogenicityTier::Low | PathogenicityTier::Silent => 0,
            PathogenicityTier::Medium => 1,
            PathogenicityTier::High => 2,
        }
    }
}

/// Call-quality label derived from the FILTER column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize)]
pub enum CallQuality {
    High,
    Medium,
    Low,
}

/// Variant categories for which tier counters are kept.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    enum_map::Enum,
    serde::Serialize,
)]
pub enum VariantCategory {
    /// All selected variants.
    Overall,
    Missense,
    Nonsense,
    NonFrameshift,
    Frameshift,
    Splicing,
    Silent,
    Unknown,
}

impl VariantCategory {
    /// Label used in the terminal summary of family logs.
    pub fn log_label(self) -> &'static str {
        match self {
            VariantCategory::Overall => "variants",
            VariantCategory::Missense => "Missense variants",
            VariantCategory::Nonsense => "Nonsense variants",
            VariantCategory::NonFrameshift => "NonFrameshift InDels",
            VariantCategory::Frameshift => "Frameshift InDels",
            VariantCategory::Splicing => "Splice site variants",
            VariantCategory::Silent => "Silent function variants",
            VariantCategory::Unknown => "Unknown function variants",
        }
    }

    /// Whether an allele with `class` in a region with `function` belongs to `self`.
    pub fn contains(self, class: &str, function: &str) -> bool {
        match self {
            VariantCategory::Overall => true,
            VariantCategory::Missense => class::is_missense(class),
            VariantCategory::Nonsense => class::is_nonsense(class),
            VariantCategory::NonFrameshift => class::is_nonframeshift(class),
            VariantCategory::Frameshift => class::is_frameshift(class),
            VariantCategory::Splicing => class::is_splicing_function(function),
            VariantCategory::Silent => class::is_synonymous(class),
            VariantCategory::Unknown => class.eq_ignore_ascii_case(class::UNKNOWN),
        }
    }
}

/// Variant class and function vocabulary of the annotation.
pub mod class {
    pub const SYNONYMOUS: &str = "synonymousSNV";
    pub const UNKNOWN: &str = "unknown";
    pub const MISSENSE: &[&str] = &["nonsynonymousSNV", UNKNOWN];
    pub const NONFRAMESHIFT: &[&str] = &[
        "nonframeshiftdeletion",
        "nonframeshiftinsertion",
        "nonframeshiftsubstitution",
    ];
    pub const FRAMESHIFT: &[&str] = &[
        "frameshiftdeletion",
        "frameshiftinsertion",
        "frameshiftsubstitution",
    ];
    pub const NONSENSE: &[&str] = &["stopgain", "stoploss"];

    /// Functional regions that are kept; an absent annotation is kept as well.
    pub const EXONIC: &str = "exonic";
    /// Placeholder written by the annotator when no function is known.
    pub const NO_FUNCTION: &str = "none";
    pub const SPLICING_FUNCTIONS: &[&str] = &["splicing", "exonic,splicing"];

    pub fn is_synonymous(class: &str) -> bool {
        class == SYNONYMOUS
    }

    pub fn is_missense(class: &str) -> bool {
        MISSENSE.contains(&class)
    }

    pub fn is_nonframeshift(class: &str) -> bool {
        NONFRAMESHIFT.contains(&class)
    }

    pub fn is_frameshift(class: &str) -> bool {
        FRAMESHIFT.contains(&class)
    }

    /// Indels are judged against the indel FILTER vocabulary.
    pub fn is_indel(class: &str) -> bool {
        is_nonframeshift(class) || is_frameshift(class)
    }

    pub fn is_nonsense(class: &str) -> bool {
        NONSENSE.contains(&class)
    }

    pub fn is_splicing_function(function: &str) -> bool {
        SPLICING_FUNCTIONS.contains(&function)
    }
}

/// INFO keys read from the annotated VCF.
pub mod keys {
    pub const GENE: &str = "GeneName";
    pub const FUNCTION: &str = "VarFunc";
    pub const CLASS: &str = "VarClass";
    pub const AA_CHANGE: &str = "AAChange";
    pub const DEPTH: &str = "DP";
    pub const MQ0: &str = "MQ0";
    pub const SEGDUP: &str = "SegDup";
    pub const FREQ_1KG: &str = "1KGfreq";
    pub const FREQ_ESP: &str = "ESPfreq";
    pub const FREQ_EXAC: &str = "ExACfreq";
    pub const FREQ_COHORT: &str = "AF";
    pub const COSMIC: &str = "COSMIC";
    pub const SIFT: &str = "SIFTprd";
    pub const PP2: &str = "PP2.hvar.prd";
    pub const MUTATION_ASSESSOR: &str = "MutAprd";
    pub const MUTATION_TASTER: &str = "MutTprd";
    pub const GERP: &str = "GERP";
    pub const CADD: &str = "CADDphred";
    pub const METASVM_SCORE: &str = "MetaSVMscr";
    pub const METASVM_PREDICTION: &str = "MetaSVMprd";

    /// Population-specific frequencies as (output column, INFO key).
    pub const POPULATION_FREQS: [(&str, &str); 14] = [
        ("ESP.aa", "ESP.aa.freq"),
        ("ESP.ea", "ESP.ea.freq"),
        ("1KG.eur", "1KG.eur.freq"),
        ("1KG.amr", "1KG.amr.freq"),
        ("1KG.eas", "1KG.eas.freq"),
        ("1KG.afr", "1KG.afr.freq"),
        ("1KG.sas", "1KG.sas.freq"),
        ("ExAC.afr", "ExAC.afr.freq"),
        ("ExAC.amr", "ExAC.amr.freq"),
        ("ExAC.eas", "ExAC.eas.freq"),
        ("ExAC.fin", "ExAC.fin.freq"),
        ("ExAC.nfe", "ExAC.nfe.freq"),
        ("ExAC.oth", "ExAC.oth.freq"),
        ("ExAC.sas", "ExAC.sas.freq"),
    ];
}

/// FORMAT keys read from the sample columns.
pub mod format {
    pub const GENOTYPE: &str = "GT";
    pub const DEPTH: &str = "DP";
    pub const GENOTYPE_QUALITY: &str = "GQ";
    pub const ALLELE_DEPTH: &str = "AD";
}
