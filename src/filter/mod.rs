//! Implementation of the `filter` subcommand.

pub mod allele;
pub mod interpreter;
pub mod output;
pub mod record;
pub mod registry;
pub mod schema;
pub mod settings;

use std::{io::BufRead, time::Instant};

use thousands::Separable;

use self::{
    allele::AlleleCandidate,
    interpreter::{FamilyDecision, FilterInterpreter},
    output::{build_decision_row, build_row, FamilySink},
    record::VariantRecord,
    registry::{load_families, FamilyModel, SampleIndex},
    schema::{class, keys},
    settings::FilterSettings,
};
use crate::{
    common::{self, canonicalize_chrom, open_read_maybe_gz, CHROM_X},
    err::AppError,
};

/// Command line arguments for `filter` subcommand.
#[derive(Debug, Default, clap::Parser)]
#[command(author, version, about = "Filter variants by family genotype patterns", long_about = None)]
pub struct Args {
    /// Path to the annotated input VCF file, optionally gzip-compressed.
    #[arg(long)]
    pub path_input: String,
    /// Path to the filter table with one family/model per row.
    #[arg(long)]
    pub path_table: String,
    /// Prefix for the names of all output files.
    #[arg(long, default_value = "")]
    pub path_out_prefix: String,
    /// Optional path to JSON file with filter settings.
    #[arg(long)]
    pub path_settings: Option<String>,

    /// Minimal per-sample depth of coverage.
    #[arg(long)]
    pub min_depth: Option<f64>,
    /// Maximal fraction of MQ0 reads.
    #[arg(long)]
    pub max_mq0_fraction: Option<f64>,
    /// Maximal allele frequency in 1000 Genomes.
    #[arg(long)]
    pub max_freq_1kg: Option<f64>,
    /// Maximal allele frequency in GO-ESP.
    #[arg(long)]
    pub max_freq_esp: Option<f64>,
    /// Maximal allele frequency in ExAC.
    #[arg(long)]
    pub max_freq_exac: Option<f64>,
    /// Set the 1000 Genomes, GO-ESP and ExAC maximal frequency at once.
    #[arg(long)]
    pub max_freq_all: Option<f64>,
    /// Maximal allele frequency within the cohort.
    #[arg(long)]
    pub max_freq_cohort: Option<f64>,
    /// Minimal per-sample genotype quality.
    #[arg(long)]
    pub min_gq: Option<f64>,
    /// Minimal supporting reads of heterozygous calls.
    #[arg(long)]
    pub min_het_allele_count: Option<f64>,
    /// Minimal fraction of reads for the called allele in homozygous calls.
    #[arg(long)]
    pub min_hom_allele_fraction: Option<f64>,

    /// Use the stricter de novo thresholds.
    #[arg(long)]
    pub de_novo: bool,
    /// Do not filter on predicted pathogenicity.
    #[arg(long)]
    pub no_pathogenicity: bool,
    /// Do not filter on call quality.
    #[arg(long)]
    pub no_quality: bool,
    /// Only consider variants on chromosome X.
    #[arg(long)]
    pub x_linked: bool,
    /// Also write the selected variants as VCF.
    #[arg(long)]
    pub vcf_out: bool,
    /// Keep synonymous variants.
    #[arg(long)]
    pub keep_synonymous: bool,
    /// Write a boolean decision log per family.
    #[arg(long)]
    pub debug: bool,
}

/// Header of the input VCF.
#[derive(Debug, Default)]
pub struct VcfHeader {
    /// All header lines including the `#CHROM` line, without line endings.
    pub lines: Vec<String>,
    pub samples: SampleIndex,
    /// Number of input lines consumed.
    pub line_count: usize,
}

/// Read the next input line into `buf`; `line_no` is its 1-based number.
///
/// Returns `None` at the end of the input.
fn next_line<'a, R: BufRead>(
    reader: &mut R,
    buf: &'a mut Vec<u8>,
    line_no: usize,
) -> Result<Option<&'a str>, anyhow::Error> {
    buf.clear();
    let n_read = reader
        .read_until(b'\n', buf)
        .map_err(|e| anyhow::anyhow!("could not read input line {}: {}", line_no, e))?;
    if n_read == 0 {
        return Ok(None);
    }
    let buf: &'a Vec<u8> = buf;
    let line = std::str::from_utf8(buf).map_err(|e| AppError::MalformedRecord {
        line: line_no,
        reason: format!("invalid UTF-8: {}", e),
    })?;
    Ok(Some(line.trim_end_matches(['\n', '\r'])))
}

/// Read the header lines up to and including the `#CHROM` line.
///
/// The reader is left positioned at the first data line.
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<VcfHeader, anyhow::Error> {
    let mut result = VcfHeader::default();
    let mut buf = Vec::new();
    loop {
        let Some(line) = next_line(reader, &mut buf, result.line_count + 1)? else {
            return Err(AppError::MissingHeader {
                line: result.line_count + 1,
            }
            .into());
        };
        result.line_count += 1;

        if line.starts_with("#CHROM") {
            result.samples = SampleIndex::from_header_line(line);
            result.lines.push(line.to_string());
            return Ok(result);
        } else if line.starts_with('#') {
            result.lines.push(line.to_string());
        } else if !line.is_empty() {
            return Err(AppError::MissingHeader {
                line: result.line_count,
            }
            .into());
        }
    }
}

/// Statistics of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Data records considered, after the X-linked restriction.
    pub records: usize,
    /// Records passing the locus-level checks.
    pub records_passing_locus: usize,
    /// Rows written over all families.
    pub rows_written: usize,
}

/// Run all families on one record.
fn process_record(
    interpreter: &FilterInterpreter,
    families: &mut [FamilyModel],
    sinks: &mut [FamilySink],
    record: &VariantRecord,
    line_no: usize,
    line: &str,
    stats: &mut Stats,
) -> Result<(), anyhow::Error> {
    let locus = interpreter.passes_locus(record);
    if !locus.passes() {
        tracing::trace!(
            "{}:{} fails locus checks: {:?}",
            &record.chromosome,
            record.position,
            &locus
        );
        return Ok(());
    }
    stats.records_passing_locus += 1;

    let function = record.annotation_or(keys::FUNCTION, class::NO_FUNCTION);
    for index in 0..record.alternates.len() {
        let candidate = AlleleCandidate::new(record, index);
        let flags = interpreter.passes_allele(record, &locus, &candidate);
        for (family, sink) in families.iter_mut().zip(sinks.iter_mut()) {
            let decision = flags
                .passes()
                .then(|| interpreter.passes_family(family, record, &candidate));
            sink.write_decision(&build_decision_row(
                record,
                &candidate,
                &locus,
                &flags,
                decision.as_ref(),
            ))?;

            if decision.as_ref().is_some_and(FamilyDecision::accepted) {
                sink.write_row(&build_row(family, record, &candidate, &flags))?;
                sink.write_vcf_line(line_no, line)?;
                family.record(flags.tier, candidate.class, function);
                stats.rows_written += 1;
            }
        }
    }

    Ok(())
}

/// Stream the data lines of `reader` through all families.
fn run_filtration<R: BufRead>(
    reader: &mut R,
    first_line_no: usize,
    interpreter: &FilterInterpreter,
    families: &mut [FamilyModel],
    sinks: &mut [FamilySink],
) -> Result<Stats, anyhow::Error> {
    let start = Instant::now();
    let mut prev = Instant::now();
    let mut stats = Stats::default();

    let mut buf = Vec::new();
    let mut line_no = first_line_no;
    while let Some(line) = next_line(reader, &mut buf, line_no + 1)? {
        line_no += 1;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        if interpreter.settings.x_linked {
            let chrom = line.split('\t').next().unwrap_or_default();
            if canonicalize_chrom(chrom) != CHROM_X {
                continue;
            }
        }
        stats.records += 1;

        let record = VariantRecord::parse(line, line_no)?;
        process_record(
            interpreter,
            families,
            sinks,
            &record,
            line_no,
            line,
            &mut stats,
        )
        .map_err(|e| e.context(format!("problem processing input line {}", line_no)))?;

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at {}:{}", &record.chromosome, record.position);
            prev = Instant::now();
        }
    }

    tracing::info!(
        "... processed {} records ({} passing locus checks) and wrote {} rows in {:?}",
        stats.records.separate_with_commas(),
        stats.records_passing_locus.separate_with_commas(),
        stats.rows_written.separate_with_commas(),
        start.elapsed()
    );

    Ok(stats)
}

/// Main entry point for `filter` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<Stats, anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let settings = FilterSettings::from_args(args)?;
    tracing::info!(
        "settings = {}",
        serde_json::to_string(&settings)
            .map_err(|e| anyhow::anyhow!("could not serialize settings: {}", e))?
    );

    tracing::info!("reading VCF header...");
    let mut reader = open_read_maybe_gz(&args.path_input)
        .map_err(|e| e.context(format!("could not open input file {}", &args.path_input)))?;
    let header = read_header(&mut reader)?;
    tracing::info!(
        "... found {} samples in {} header lines",
        header.samples.len(),
        header.lines.len()
    );

    tracing::info!("loading filter table...");
    let mut families = load_families(
        &args.path_table,
        &header.samples,
        &settings,
        &args.path_out_prefix,
    )?;
    tracing::info!("... loaded {} families/models", families.len());

    tracing::info!("opening output files...");
    let mut sinks = families
        .iter()
        .map(|family| FamilySink::create(family, &settings, &args.path_input, &header.lines))
        .collect::<Result<Vec<_>, _>>()?;

    common::trace_rss_now();

    tracing::info!("starting filtration...");
    let interpreter = FilterInterpreter::new(settings);
    let stats = match run_filtration(
        &mut reader,
        header.line_count,
        &interpreter,
        &mut families,
        &mut sinks,
    ) {
        Ok(stats) => stats,
        Err(e) => {
            let message = format!("{:#}", e);
            for sink in sinks.iter_mut() {
                sink.report_fatal(&message);
            }
            return Err(e);
        }
    };
    tracing::info!("... done with filtration");

    for (family, sink) in families.iter().zip(sinks.into_iter()) {
        tracing::debug!(
            "{}: selected {} alleles",
            &family.base_name,
            family.total_selected()
        );
        sink.finish(family, &interpreter.settings, stats.records)?;
    }

    common::trace_rss_now();
    tracing::info!(
        "All of `filter` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(stats)
}
