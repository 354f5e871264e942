//! Per-family output files: result table, selected VCF lines, log and decision log.

use std::io::Write;

use csv::QuoteStyle;
use strum::IntoEnumIterator;

use super::{
    allele::AlleleCandidate,
    interpreter::{
        allele::AlleleFlags, genotype::is_no_call, locus::LocusFlags, FamilyDecision, Stage,
    },
    record::{VariantRecord, MISSING},
    registry::FamilyModel,
    schema::{class, format, keys, Role, VariantCategory},
    settings::FilterSettings,
};
use crate::common::{open_write_maybe_gz, worker_version};

/// Placeholder for values that do not apply.
pub const NOT_AVAILABLE: &str = "NA";

/// Columns of the result table before the per-sample GT columns.
const LEADING_COLUMNS: &[&str] = &[
    "Chromosome",
    "Position",
    "ID",
    "REF",
    "ALT",
    "Gene",
    "VariantFunction",
    "VariantClass",
    "AAchange",
    "AlleleFrequency.ExAC",
    "AlleleFrequency.1KG",
    "AlleleFrequency.ESP",
    "MetaSVM",
    "SIFTprediction",
    "PP2prediction",
    "MAprediction",
    "MTprediction",
    "GERP++",
    "CADDscore",
    "SegmentalDuplication",
    "Cosmic",
    "PredictionSummary",
    "VariantCallQuality",
];

/// Columns of the result table between the per-sample AD and raw columns.
const RECORD_COLUMNS: &[&str] = &["AlternateAlleles", "MetaSVMScore", "FILTER", "INFO"];

/// Columns of the decision log.
const DECISION_COLUMNS: &[&str] = &[
    "Chromosome",
    "Position",
    "REF",
    "ALT",
    "AAlt",
    "PassExAC",
    "PassKG",
    "PassESP",
    "PassVCF",
    "PassQUAL",
    "PassMQ",
    "PassFunction",
    "PassClass",
    "PassGT",
    "PassDP",
    "PassGQ",
    "PassPatho",
    "PassFilter",
    "PassAFC",
];

/// Header of the result table of `family`.
pub fn header(family: &FamilyModel) -> Vec<String> {
    let names = family
        .samples_in_display_order()
        .map(|(_, sample)| sample.name.clone())
        .collect::<Vec<_>>();

    let mut result = LEADING_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    result.extend(names.iter().map(|name| format!("{} GT", name)));
    result.extend(names.iter().map(|name| format!("{} AD", name)));
    result.extend(RECORD_COLUMNS.iter().map(|s| s.to_string()));
    result.extend(names.iter().cloned());
    result.extend(keys::POPULATION_FREQS.iter().map(|(name, _)| name.to_string()));
    result
}

/// Result table row for an accepted `candidate` of `record`.
pub fn build_row(
    family: &FamilyModel,
    record: &VariantRecord,
    candidate: &AlleleCandidate,
    flags: &AlleleFlags,
) -> Vec<String> {
    let ad_idx = record.format_index(format::ALLELE_DEPTH);

    let mut genotypes = Vec::new();
    let mut depths = Vec::new();
    let mut raw = Vec::new();
    for (role, sample) in family.samples_in_display_order() {
        let gt = record.genotype(sample.index);
        genotypes.push(gt.to_string());
        depths.push(match ad_idx {
            None => NOT_AVAILABLE.to_string(),
            Some(_) if role == Role::Unfiltered && is_no_call(gt) => "0".to_string(),
            Some(idx) => record.sample_value(sample.index, idx).to_string(),
        });
        raw.push(record.sample_raw(sample.index).to_string());
    }

    let mut result = vec![
        record.chromosome.clone(),
        record.position.to_string(),
        record.id.clone(),
        record.reference.clone(),
        candidate.alternate.to_string(),
        record.annotation_or(keys::GENE, MISSING).to_string(),
        record
            .annotation_or(keys::FUNCTION, class::NO_FUNCTION)
            .to_string(),
        candidate.class.to_string(),
        candidate.aa_change.to_string(),
        candidate.freq_exac.to_string(),
        candidate.freq_1kg.to_string(),
        candidate.freq_esp.to_string(),
        candidate.metasvm_prediction.to_string(),
        candidate.sift.to_string(),
        candidate.pp2.to_string(),
        candidate.mutation_assessor.to_string(),
        candidate.mutation_taster.to_string(),
        candidate.gerp.to_string(),
        candidate.cadd.to_string(),
        record.annotation_or(keys::SEGDUP, "none").to_string(),
        record.annotation_or(keys::COSMIC, "none").to_string(),
        flags.tier.to_string(),
        flags.call_quality.to_string(),
    ];
    result.extend(genotypes);
    result.extend(depths);
    result.extend([
        record.alternates_raw.clone(),
        candidate.metasvm_score.to_string(),
        record.filter.clone(),
        record.info.clone(),
    ]);
    result.extend(raw);
    result.extend(candidate.population_freqs.iter().map(|s| s.to_string()));
    result
}

fn flag(value: Option<bool>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

/// Decision log row; `decision` is `None` if the allele did not reach the family.
pub fn build_decision_row(
    record: &VariantRecord,
    candidate: &AlleleCandidate,
    locus: &LocusFlags,
    allele: &AlleleFlags,
    decision: Option<&FamilyDecision>,
) -> Vec<String> {
    let stage = |stage: Stage| decision.and_then(|d| d.stage(stage));
    vec![
        record.chromosome.clone(),
        record.position.to_string(),
        record.reference.clone(),
        record.alternates_raw.clone(),
        candidate.index.to_string(),
        flag(Some(allele.pass_exac)),
        flag(Some(allele.pass_1kg)),
        flag(Some(allele.pass_esp)),
        flag(stage(Stage::CohortFrequency)),
        flag(Some(locus.pass_quality)),
        flag(Some(locus.pass_mq0)),
        flag(Some(locus.pass_function)),
        flag(Some(allele.pass_class)),
        flag(decision.and_then(FamilyDecision::genotype)),
        flag(stage(Stage::SampleDepth)),
        flag(stage(Stage::GenotypeQuality)),
        flag(Some(allele.pass_pathogenicity)),
        flag(Some(allele.pass_filter)),
        flag(stage(Stage::AlleleBalance)),
    ]
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()
}

fn tsv_writer(path: &str) -> Result<csv::Writer<Box<dyn Write>>, anyhow::Error> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .flexible(true)
        .from_writer(open_write_maybe_gz(path).map_err(|e| {
            anyhow::anyhow!("Cannot open {:?} for writing: {:?}", path, e)
        })?))
}

/// Open output files of one family.
pub struct FamilySink {
    table: csv::Writer<Box<dyn Write>>,
    vcf: Option<Box<dyn Write>>,
    log: Box<dyn Write>,
    decisions: Option<csv::Writer<Box<dyn Write>>>,
    /// Input line of the last record written to the VCF.
    last_vcf_line: Option<usize>,
}

impl FamilySink {
    /// Create all output files of `family` and write their headers.
    pub fn create(
        family: &FamilyModel,
        settings: &FilterSettings,
        path_input: &str,
        vcf_header: &[String],
    ) -> Result<Self, anyhow::Error> {
        let base_name = &family.base_name;
        tracing::debug!("opening output files for {}", base_name);

        let mut table = tsv_writer(&format!("{}.tsv", base_name))?;
        table.write_record(header(family))?;

        let vcf = if settings.vcf_out {
            let path = format!("{}.vcf", base_name);
            let mut vcf = open_write_maybe_gz(&path)
                .map_err(|e| anyhow::anyhow!("Cannot open {:?} for writing: {:?}", &path, e))?;
            for line in vcf_header {
                writeln!(vcf, "{}", line)?;
            }
            Some(vcf)
        } else {
            None
        };

        let path = format!("{}.log", base_name);
        let mut log = open_write_maybe_gz(&path)
            .map_err(|e| anyhow::anyhow!("Cannot open {:?} for writing: {:?}", &path, e))?;
        writeln!(log, "Filtering log: {}", now())?;
        writeln!(log, "Filter version: {}", worker_version())?;
        writeln!(log, "VCF: {}", path_input)?;
        writeln!(log, "OutputName: {}", base_name)?;
        writeln!(log)?;
        writeln!(log, "Genotype Filters: ")?;
        for role in Role::iter() {
            writeln!(
                log,
                "\t {}: {}",
                role.log_label(),
                family.roles_raw[role].as_deref().unwrap_or("None")
            )?;
        }
        writeln!(log)?;

        let decisions = if settings.debug {
            let mut decisions = tsv_writer(&format!("{}.boolean.log", base_name))?;
            decisions.write_record(DECISION_COLUMNS)?;
            Some(decisions)
        } else {
            None
        };

        Ok(Self {
            table,
            vcf,
            log,
            decisions,
            last_vcf_line: None,
        })
    }

    /// Write the result row of an accepted allele.
    pub fn write_row(&mut self, row: &[String]) -> Result<(), anyhow::Error> {
        self.table.write_record(row)?;
        Ok(())
    }

    /// Copy the input line of the record at `line_no` to the VCF, once per record.
    pub fn write_vcf_line(&mut self, line_no: usize, line: &str) -> Result<(), anyhow::Error> {
        if let Some(vcf) = self.vcf.as_mut() {
            if self.last_vcf_line != Some(line_no) {
                writeln!(vcf, "{}", line.trim_end_matches(['\n', '\r']))?;
                self.last_vcf_line = Some(line_no);
            }
        }
        Ok(())
    }

    /// Write a decision log row if the decision log is enabled.
    pub fn write_decision(&mut self, row: &[String]) -> Result<(), anyhow::Error> {
        if let Some(decisions) = self.decisions.as_mut() {
            decisions.write_record(row)?;
        }
        Ok(())
    }

    /// Record a fatal error in the family log.
    pub fn report_fatal(&mut self, message: &str) {
        if let Err(e) = writeln!(self.log, "ERROR: {}", message).and_then(|_| self.log.flush()) {
            tracing::warn!("could not write error to family log: {}", e);
        }
    }

    /// Write thresholds and counts to the log and flush all files.
    pub fn finish(
        mut self,
        family: &FamilyModel,
        settings: &FilterSettings,
        n_input_records: usize,
    ) -> Result<(), anyhow::Error> {
        let log = &mut self.log;
        if !settings.no_quality {
            writeln!(log, "Individual Sample Filters: ")?;
            writeln!(log, "\t Minimum Depth of Coverage: {}", settings.min_depth)?;
            writeln!(log, "\t Minimum Genotyping Quality(GQ): {}", settings.min_gq)?;
            writeln!(
                log,
                "\t Minimum Heterozygous allele count: {}",
                settings.min_het_allele_count
            )?;
            writeln!(
                log,
                "\t Minimum Homozygous allele fraction: {}",
                settings.min_hom_allele_fraction
            )?;
        }
        writeln!(log, "Variant Filters: ")?;
        if settings.no_quality {
            writeln!(log, "\t No Variant Quality Filters")?;
        } else {
            writeln!(log, "\t MQ0/DP maximum: {}", settings.max_mq0_fraction)?;
        }
        writeln!(
            log,
            "\t 1000 genomes alternate allele frequency maximum: {}",
            settings.max_freq_1kg
        )?;
        writeln!(
            log,
            "\t GO ESP alternate allele frequency maximum: {}",
            settings.max_freq_esp
        )?;
        writeln!(
            log,
            "\t ExAC alternate allele frequency maximum: {}",
            settings.max_freq_exac
        )?;
        writeln!(
            log,
            "\t Within VCF allele frequency maximum: {}",
            family.cohort_frequency_ceiling
        )?;
        if settings.no_pathogenicity {
            writeln!(log, "\t No Predicted Pathogenicity Filters")?;
        } else {
            writeln!(
                log,
                "\t Predicted Pathogenicity Filters: at least SIFT=D or PP2=D/P or CADD >= 15; \
                 all InDels and Nonsense"
            )?;
        }
        writeln!(log)?;
        writeln!(log)?;

        writeln!(log, "{}", "-".repeat(69))?;
        writeln!(log, "Results: ")?;
        writeln!(
            log,
            "\t Number of variants in original VCF: {}",
            n_input_records
        )?;
        for category in VariantCategory::iter() {
            let [low, medium, high] = family.counters[category];
            writeln!(
                log,
                "\t Number of {} selected (Low/Med/High/Total): {}/{}/{}/{}",
                category.log_label(),
                low,
                medium,
                high,
                low + medium + high
            )?;
        }
        writeln!(log)?;
        writeln!(log, "Filtering Finished: {}", now())?;
        log.flush()?;

        self.table.flush()?;
        if let Some(vcf) = self.vcf.as_mut() {
            vcf.flush()?;
        }
        if let Some(decisions) = self.decisions.as_mut() {
            decisions.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{build_decision_row, build_row, header, FamilySink};
    use crate::filter::{
        allele::AlleleCandidate,
        interpreter::FilterInterpreter,
        record::VariantRecord,
        registry::{read_families, FamilyModel, SampleIndex},
        settings::FilterSettings,
    };

    const HEADER: &str =
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tchild\tmother\tfather\n";

    fn family(prefix: &str) -> FamilyModel {
        read_families(
            "FAM\tAR\tmother\t\tchild\t\t\tfather\n".as_bytes(),
            &SampleIndex::from_header_line(HEADER),
            &FilterSettings::default(),
            prefix,
        )
        .expect("valid table")
        .remove(0)
    }

    #[test]
    fn header_lists_samples_in_display_order() {
        let header = header(&family(""));

        assert_eq!(header.len(), 23 + 3 * 3 + 4 + 14);
        assert_eq!(
            header[23..29].to_vec(),
            vec!["CHILD GT", "MOTHER GT", "FATHER GT", "CHILD AD", "MOTHER AD", "FATHER AD"]
        );
        assert_eq!(
            header[29..33].to_vec(),
            vec!["AlternateAlleles", "MetaSVMScore", "FILTER", "INFO"]
        );
        assert_eq!(header[33..36].to_vec(), vec!["CHILD", "MOTHER", "FATHER"]);
        assert_eq!(header[36], "ESP.aa");
        assert_eq!(header[49], "ExAC.sas");
    }

    #[test]
    fn row_matches_header() -> Result<(), anyhow::Error> {
        let family = family("");
        let interpreter = FilterInterpreter::default();
        let record = VariantRecord::parse(
            "1\t100\trs1\tA\tG\t50\tPASS\tGeneName=ABC;VarClass=stopgain;VarFunc=exonic;\
             ExAC.sas.freq=0.002\tGT:AD\t1/1:0,12\t0/0:10,0\t./.",
            1,
        )?;
        let candidate = AlleleCandidate::new(&record, 0);
        let locus = interpreter.passes_locus(&record);
        let flags = interpreter.passes_allele(&record, &locus, &candidate);

        let row = build_row(&family, &record, &candidate, &flags);
        assert_eq!(row.len(), header(&family).len());
        assert_eq!(
            row[..8].to_vec(),
            vec!["1", "100", "rs1", "A", "G", "ABC", "exonic", "stopgain"]
        );
        assert_eq!(row[19..23].to_vec(), vec!["none", "none", "High", "High"]);
        assert_eq!(
            row[23..29].to_vec(),
            vec!["1/1", "0/0", "./.", "0,12", "10,0", "0"]
        );
        assert_eq!(row[33..36].to_vec(), vec!["1/1:0,12", "0/0:10,0", "./."]);
        assert_eq!(row[49], "0.002");

        let decision = interpreter.passes_family(&family, &record, &candidate);
        let decision_row =
            build_decision_row(&record, &candidate, &locus, &flags, Some(&decision));
        assert_eq!(decision_row.len(), super::DECISION_COLUMNS.len());
        assert!(decision_row[5..].iter().all(|value| value == "true"));

        let skipped = build_decision_row(&record, &candidate, &locus, &flags, None);
        assert_eq!(skipped[8], "NA");
        assert_eq!(skipped[13], "NA");

        Ok(())
    }

    #[test]
    fn ad_columns_without_ad() -> Result<(), anyhow::Error> {
        let family = family("");
        let record = VariantRecord::parse(
            "1\t100\t.\tA\tG\t50\tPASS\tVarClass=stopgain\tGT\t1/1\t0/0\t0/0",
            1,
        )?;
        let interpreter = FilterInterpreter::default();
        let candidate = AlleleCandidate::new(&record, 0);
        let flags =
            interpreter.passes_allele(&record, &interpreter.passes_locus(&record), &candidate);

        let row = build_row(&family, &record, &candidate, &flags);
        assert_eq!(row[26..29].to_vec(), vec!["NA", "NA", "NA"]);

        Ok(())
    }

    #[test]
    fn sink_writes_log_and_vcf_once_per_record() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let prefix = tmp_dir.join("out");
        let mut family = family(&prefix.to_string_lossy());
        let settings = FilterSettings {
            vcf_out: true,
            ..Default::default()
        };

        let mut sink = FamilySink::create(
            &family,
            &settings,
            "input.vcf",
            &["##fileformat=VCFv4.2".to_string(), HEADER.trim_end().to_string()],
        )?;
        sink.write_vcf_line(3, "1\t100\t.\tA\tG,T\n")?;
        sink.write_vcf_line(3, "1\t100\t.\tA\tG,T\n")?;
        family.record(crate::filter::schema::PathogenicityTier::High, "stopgain", "exonic");
        sink.finish(&family, &settings, 1)?;

        let base = format!("{}.FAM.AR", prefix.to_string_lossy());
        let vcf = std::fs::read_to_string(format!("{}.vcf", base))?;
        assert_eq!(vcf.lines().count(), 3);

        let log = std::fs::read_to_string(format!("{}.log", base))?;
        assert!(log.contains("\t Homozygous Reference Samples: mother\n"));
        assert!(log.contains("\t Heterozygous Samples: None\n"));
        assert!(log.contains("Filter version: x.y.z\n"));
        assert!(log.contains("\t Number of variants in original VCF: 1\n"));
        assert!(log.contains("\t Number of variants selected (Low/Med/High/Total): 0/0/1/1\n"));
        assert!(log.contains(
            "\t Number of Nonsense variants selected (Low/Med/High/Total): 0/0/1/1\n"
        ));
        assert!(log.contains("Filtering Finished: "));

        let table = std::fs::read_to_string(format!("{}.tsv", base))?;
        assert_eq!(table.lines().count(), 1);

        Ok(())
    }
}
