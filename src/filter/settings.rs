//! Effective filter thresholds and modes.

use super::Args;

/// Minimal QUAL value of a record.
pub const DEFAULT_MIN_CALL_QUALITY: f64 = 30.0;

/// Thresholds and switches that control all filter stages.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Minimal per-sample depth of coverage.
    pub min_depth: f64,
    /// Maximal fraction of MQ0 reads (MQ0 / DP).
    pub max_mq0_fraction: f64,
    /// Maximal allele frequency in 1000 Genomes.
    pub max_freq_1kg: f64,
    /// Maximal allele frequency in GO-ESP.
    pub max_freq_esp: f64,
    /// Maximal allele frequency in ExAC.
    pub max_freq_exac: f64,
    /// Overrides the three population frequency ceilings when set.
    pub max_freq_all: Option<f64>,
    /// Maximal allele frequency within the cohort, before per-family adjustment.
    pub max_freq_cohort: f64,
    /// Minimal per-sample genotype quality.
    pub min_gq: f64,
    /// Minimal number of reads supporting the allele in heterozygous calls.
    pub min_het_allele_count: f64,
    /// Minimal fraction of reads for the called allele in homozygous calls.
    pub min_hom_allele_fraction: f64,
    /// Minimal QUAL value of a record.
    pub min_call_quality: f64,

    /// FILTER tags that mark a SNP as bad; `;` joins tags that must all be present.
    pub bad_snp_filters: Vec<String>,
    /// FILTER tags that mark an indel as bad; `;` joins tags that must all be present.
    pub bad_indel_filters: Vec<String>,
    /// FILTER tags that mark a SNP as medium quality.
    pub mid_snp_filters: Vec<String>,
    /// FILTER tags that mark an indel as medium quality.
    pub mid_indel_filters: Vec<String>,

    /// Apply the stricter de novo thresholds.
    pub de_novo: bool,
    /// Do not filter on predicted pathogenicity.
    pub no_pathogenicity: bool,
    /// Do not filter on call quality (QUAL, MQ0, FILTER, DP, GQ, AD).
    pub no_quality: bool,
    /// Only consider records on chromosome X.
    pub x_linked: bool,
    /// Write selected records to a VCF file per family.
    pub vcf_out: bool,
    /// Keep synonymous variants.
    pub keep_synonymous: bool,
    /// Write a boolean decision log per family.
    pub debug: bool,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_depth: 3.0,
            max_mq0_fraction: 0.05,
            max_freq_1kg: 0.01,
            max_freq_esp: 0.01,
            max_freq_exac: 0.01,
            max_freq_all: None,
            max_freq_cohort: 0.05,
            min_gq: 30.0,
            min_het_allele_count: 3.0,
            min_hom_allele_fraction: 0.7,
            min_call_quality: DEFAULT_MIN_CALL_QUALITY,
            bad_snp_filters: strings(&[
                "QD_Bad_SNP",
                "FS_Bad_SNP",
                "FS_Mid_SNP;QD_Mid_SNP",
                "LowQuality",
            ]),
            bad_indel_filters: strings(&["LowQD_Indel", "LowQuality"]),
            mid_snp_filters: strings(&[
                "FS_Mid_SNP",
                "QD_Mid_SNP",
                "VQSRTrancheSNP99.00to99.90",
                "VQSRTrancheSNP99.90to100.00",
            ]),
            mid_indel_filters: strings(&[
                "FSBias_Indel",
                "RPBias_Indel",
                "VQSRTrancheINDEL99.00to99.90",
                "VQSRTrancheINDEL99.90to100.00",
            ]),
            de_novo: false,
            no_pathogenicity: false,
            no_quality: false,
            x_linked: false,
            vcf_out: false,
            keep_synonymous: false,
            debug: false,
        }
    }
}

impl FilterSettings {
    /// Build the effective settings from an optional JSON file and the command line.
    ///
    /// Values given on the command line override the file, mode flags can only
    /// be switched on.  The combined frequency ceiling and de novo mode are
    /// applied last.
    pub fn from_args(args: &Args) -> Result<Self, anyhow::Error> {
        let base = if let Some(path) = &args.path_settings {
            let file = std::fs::File::open(path)
                .map_err(|e| anyhow::anyhow!("could not open settings file {}: {}", path, e))?;
            serde_json::from_reader(std::io::BufReader::new(file))
                .map_err(|e| anyhow::anyhow!("could not parse settings file {}: {}", path, e))?
        } else {
            Self::default()
        };

        let result = Self {
            min_depth: args.min_depth.unwrap_or(base.min_depth),
            max_mq0_fraction: args.max_mq0_fraction.unwrap_or(base.max_mq0_fraction),
            max_freq_1kg: args.max_freq_1kg.unwrap_or(base.max_freq_1kg),
            max_freq_esp: args.max_freq_esp.unwrap_or(base.max_freq_esp),
            max_freq_exac: args.max_freq_exac.unwrap_or(base.max_freq_exac),
            max_freq_all: args.max_freq_all.or(base.max_freq_all),
            max_freq_cohort: args.max_freq_cohort.unwrap_or(base.max_freq_cohort),
            min_gq: args.min_gq.unwrap_or(base.min_gq),
            min_het_allele_count: args
                .min_het_allele_count
                .unwrap_or(base.min_het_allele_count),
            min_hom_allele_fraction: args
                .min_hom_allele_fraction
                .unwrap_or(base.min_hom_allele_fraction),
            de_novo: args.de_novo || base.de_novo,
            no_pathogenicity: args.no_pathogenicity || base.no_pathogenicity,
            no_quality: args.no_quality || base.no_quality,
            x_linked: args.x_linked || base.x_linked,
            vcf_out: args.vcf_out || base.vcf_out,
            keep_synonymous: args.keep_synonymous || base.keep_synonymous,
            debug: args.debug || base.debug,
            ..base
        };

        Ok(result.finalized())
    }

    /// Apply the combined frequency ceiling and, if requested, the de novo thresholds.
    pub fn finalized(mut self) -> Self {
        if let Some(max_freq_all) = self.max_freq_all {
            self.max_freq_1kg = max_freq_all;
            self.max_freq_esp = max_freq_all;
            self.max_freq_exac = max_freq_all;
        }
        if self.de_novo {
            self.min_het_allele_count = 6.0;
            self.min_hom_allele_fraction = 0.98;
            self.max_freq_1kg /= 10.0;
            self.max_freq_esp /= 10.0;
            self.max_freq_exac /= 10.0;
            self.max_freq_cohort = 0.01;
            self.min_depth = 7.0;
        }
        self
    }
}
