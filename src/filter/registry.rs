//! Family/model definitions from the filter table, resolved against the VCF header.

use std::collections::HashMap;

use enum_map::EnumMap;
use indexmap::IndexMap;
use itertools::Itertools;
use strum::IntoEnumIterator;

use super::{
    record::FIRST_SAMPLE_COLUMN,
    schema::{PathogenicityTier, Role, VariantCategory},
    settings::FilterSettings,
};
use crate::{common::open_read_maybe_gz, err::AppError};

/// Number of columns of the filter table: family, model and one per role.
pub const TABLE_COLUMNS: usize = 8;

/// Sample names of the VCF header, upper-cased, mapped to their sample index.
#[derive(Debug, Clone, Default)]
pub struct SampleIndex {
    by_name: IndexMap<String, usize>,
    /// Number of sample columns, including repeated names.
    n_columns: usize,
}

impl SampleIndex {
    /// Build from the `#CHROM` header line.
    ///
    /// A repeated sample name resolves to its first column.
    pub fn from_header_line(line: &str) -> Self {
        let mut result = Self::default();
        for (idx, name) in line
            .trim_end_matches(['\n', '\r'])
            .split('\t')
            .skip(FIRST_SAMPLE_COLUMN)
            .enumerate()
        {
            let name = name.trim().to_uppercase();
            if result.by_name.contains_key(&name) {
                tracing::warn!("sample {:?} appears more than once in VCF header", &name);
            } else {
                result.by_name.insert(name, idx);
            }
            result.n_columns += 1;
        }
        result
    }

    /// Number of sample columns in the VCF.
    pub fn len(&self) -> usize {
        self.n_columns
    }

    pub fn is_empty(&self) -> bool {
        self.n_columns == 0
    }

    /// Sample index of `name`; names are compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_uppercase()).copied()
    }
}

/// A sample assigned to a role.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct RoleSample {
    /// Upper-cased sample name.
    pub name: String,
    /// Index into the record's samples.
    pub index: usize,
}

/// Counts of selected variants in the Low, Medium and High bucket.
pub type TierCounts = [usize; 3];

/// One row of the filter table, resolved and with its counters.
#[derive(Debug, Clone)]
pub struct FamilyModel {
    pub family_label: String,
    pub model_label: String,
    /// Base name of all output files of this family.
    pub base_name: String,
    /// Samples per role, in table order.
    pub roles: EnumMap<Role, Vec<RoleSample>>,
    /// Role columns as given in the table; `None` if blank.
    pub roles_raw: EnumMap<Role, Option<String>>,
    /// Maximal in-cohort allele frequency for this family.
    pub cohort_frequency_ceiling: f64,
    pub counters: EnumMap<VariantCategory, TierCounts>,
}

impl FamilyModel {
    /// All role samples in display order, with their role.
    pub fn samples_in_display_order(&self) -> impl Iterator<Item = (Role, &RoleSample)> {
        Role::DISPLAY_ORDER
            .into_iter()
            .flat_map(move |role| self.roles[role].iter().map(move |sample| (role, sample)))
    }

    /// Account for a selected allele of `class` in a region with `function`.
    pub fn record(&mut self, tier: PathogenicityTier, class: &str, function: &str) {
        for category in VariantCategory::iter() {
            if category.contains(class, function) {
                self.counters[category][tier.bucket()] += 1;
            }
        }
    }

    /// Number of selected alleles over all tiers.
    pub fn total_selected(&self) -> usize {
        self.counters[VariantCategory::Overall].iter().sum()
    }
}

/// Round half away from zero to two decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cohort frequency ceiling of a family.
///
/// The family's own alleles (two per Alternate sample, one per Heterozygous
/// sample) are allowed on top of the configured frequency in the remaining
/// cohort, so small cohorts do not reject the family's own variants.
pub fn cohort_frequency_ceiling(
    n_samples: usize,
    n_alternate: usize,
    n_heterozygous: usize,
    configured: f64,
) -> f64 {
    if n_samples == 0 {
        return configured;
    }
    let family_alleles = (2 * n_alternate + n_heterozygous) as f64;
    let total_alleles = (2 * n_samples) as f64;
    let extra_alleles = (total_alleles - family_alleles) * configured;
    let ceiling = round2((family_alleles + extra_alleles + 0.5) / total_alleles);
    configured.max(ceiling)
}

/// Output base name from the non-empty parts of prefix, family and model label.
pub fn base_name(prefix: &str, family_label: &str, model_label: &str) -> String {
    let name = [prefix, family_label, model_label]
        .iter()
        .filter(|part| !part.is_empty())
        .join(".");
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("Fam{}", name)
    } else {
        name
    }
}

/// Read the filter table from `reader` and resolve it against `samples`.
pub fn read_families<R: std::io::Read>(
    reader: R,
    samples: &SampleIndex,
    settings: &FilterSettings,
    prefix: &str,
) -> Result<Vec<FamilyModel>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut result = Vec::new();
    let mut seen_base_names: HashMap<String, usize> = HashMap::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(|e| anyhow::anyhow!("problem reading filter table: {}", e))?;
        let row_no = row
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 1);
        if row.len() < 2 {
            return Err(AppError::MalformedTableRow {
                row: row_no,
                reason: format!(
                    "expected {} columns but found {}",
                    TABLE_COLUMNS,
                    row.len()
                ),
            }
            .into());
        }

        let column = |i: usize| row.get(i).unwrap_or("").trim();
        let family_label = column(0).to_string();
        let model_label = column(1).to_string();
        let family_name = base_name("", &family_label, &model_label);

        let mut roles: EnumMap<Role, Vec<RoleSample>> = EnumMap::default();
        let mut roles_raw: EnumMap<Role, Option<String>> = EnumMap::default();
        let mut assigned: HashMap<String, Role> = HashMap::new();
        for (offset, role) in Role::iter().enumerate() {
            let raw = column(2 + offset);
            if raw.is_empty() {
                continue;
            }
            roles_raw[role] = Some(raw.to_string());
            for name in raw.split(',').map(|s| s.trim().to_uppercase()) {
                if name.is_empty() {
                    continue;
                }
                let index = samples.get(&name).ok_or_else(|| AppError::UnknownSample {
                    family: family_name.clone(),
                    role: role.to_string(),
                    sample: name.clone(),
                })?;
                if let Some(first) = assigned.insert(name.clone(), role) {
                    return Err(AppError::ConflictingRoles {
                        family: family_name.clone(),
                        sample: name,
                        first: first.to_string(),
                        second: role.to_string(),
                    }
                    .into());
                }
                roles[role].push(RoleSample::new(name, index));
            }
        }

        let output_name = base_name(prefix, &family_label, &model_label);
        if output_name.is_empty() {
            return Err(AppError::MalformedTableRow {
                row: row_no,
                reason: "family and model label are both empty".into(),
            }
            .into());
        }
        if let Some(first) = seen_base_names.insert(output_name.clone(), row_no) {
            return Err(AppError::DuplicateOutput {
                base_name: output_name,
                first,
                second: row_no,
            }
            .into());
        }

        let cohort_frequency_ceiling = cohort_frequency_ceiling(
            samples.len(),
            roles[Role::Alternate].len(),
            roles[Role::Heterozygous].len(),
            settings.max_freq_cohort,
        );
        tracing::debug!(
            "family {} uses cohort frequency ceiling {}",
            &output_name,
            cohort_frequency_ceiling
        );

        result.push(FamilyModel {
            family_label,
            model_label,
            base_name: output_name,
            roles,
            roles_raw,
            cohort_frequency_ceiling,
            counters: EnumMap::default(),
        });
    }

    Ok(result)
}

/// Load the filter table at `path`, see `read_families`.
pub fn load_families<P: AsRef<std::path::Path>>(
    path: P,
    samples: &SampleIndex,
    settings: &FilterSettings,
    prefix: &str,
) -> Result<Vec<FamilyModel>, anyhow::Error> {
    let reader = open_read_maybe_gz(path.as_ref())?;
    read_families(reader, samples, settings, prefix).map_err(|e| {
        e.context(format!(
            "could not load filter table {}",
            path.as_ref().display()
        ))
    })
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{
        base_name, cohort_frequency_ceiling, read_families, RoleSample, SampleIndex,
    };
    use crate::{
        err::AppError,
        filter::{
            schema::{PathogenicityTier, Role, VariantCategory},
            settings::FilterSettings,
        },
    };

    const HEADER: &str =
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tmother\tFather\tCHILD\tsib\n";

    fn families(table: &str) -> Result<Vec<super::FamilyModel>, anyhow::Error> {
        read_families(
            table.as_bytes(),
            &SampleIndex::from_header_line(HEADER),
            &FilterSettings::default(),
            "out",
        )
    }

    #[test]
    fn sample_index() {
        let samples = SampleIndex::from_header_line(HEADER);

        assert_eq!(samples.len(), 4);
        assert_eq!(samples.get("MOTHER"), Some(0));
        assert_eq!(samples.get("father"), Some(1));
        assert_eq!(samples.get("Child"), Some(2));
        assert_eq!(samples.get("uncle"), None);
    }

    #[test]
    #[tracing_test::traced_test]
    fn repeated_sample_names_count_as_columns() {
        let samples = SampleIndex::from_header_line(
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tmother\tchild\tMOTHER\n",
        );

        assert_eq!(samples.len(), 3);
        assert_eq!(samples.get("mother"), Some(0));
        assert_eq!(samples.get("child"), Some(1));
        assert!(logs_contain("appears more than once"));
    }

    #[rstest]
    #[case("", "FAM1", "AD", "FAM1.AD")]
    #[case("out", "FAM1", "AD", "out.FAM1.AD")]
    #[case("", "12", "AR", "Fam12.AR")]
    #[case("", "", "AR", "AR")]
    #[case("3x", "", "", "Fam3x")]
    fn base_names(
        #[case] prefix: &str,
        #[case] family: &str,
        #[case] model: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(base_name(prefix, family, model), expected);
    }

    #[rstest]
    #[case(4, 1, 1, 0.05, 0.47)]
    #[case(100, 0, 1, 0.05, 0.06)]
    #[case(1000, 0, 1, 0.05, 0.05)]
    #[case(0, 0, 0, 0.05, 0.05)]
    fn ceiling(
        #[case] n_samples: usize,
        #[case] n_alternate: usize,
        #[case] n_heterozygous: usize,
        #[case] configured: f64,
        #[case] expected: f64,
    ) {
        assert!(approx_eq!(
            f64,
            cohort_frequency_ceiling(n_samples, n_alternate, n_heterozygous, configured),
            expected
        ));
    }

    #[test]
    fn ceiling_is_monotone() {
        for n_samples in 1..60usize {
            for n_alternate in 0..3usize {
                for n_heterozygous in 0..3usize {
                    let base =
                        cohort_frequency_ceiling(n_samples, n_alternate, n_heterozygous, 0.05);
                    assert!(base >= 0.05);
                    if 2 * (n_alternate + 1) + n_heterozygous <= 2 * n_samples {
                        assert!(
                            cohort_frequency_ceiling(
                                n_samples,
                                n_alternate + 1,
                                n_heterozygous,
                                0.05
                            ) >= base
                        );
                    }
                    if 2 * n_alternate + n_heterozygous + 1 <= 2 * n_samples {
                        assert!(
                            cohort_frequency_ceiling(
                                n_samples,
                                n_alternate,
                                n_heterozygous + 1,
                                0.05
                            ) >= base
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn read_table() -> Result<(), anyhow::Error> {
        let families = families(
            "# family\tmodel\tref\thet\talt\tnotref\tnotalt\tunfiltered\n\
             FAM1\tAR\tmother\t\tchild\t\t\tsib\n\
             FAM1\tDN\tmother,father\tchild\n",
        )?;

        assert_eq!(families.len(), 2);
        let recessive = &families[0];
        assert_eq!(recessive.base_name, "out.FAM1.AR");
        assert_eq!(
            recessive.roles[Role::Reference],
            vec![RoleSample::new("MOTHER".into(), 0)]
        );
        assert_eq!(
            recessive.roles[Role::Alternate],
            vec![RoleSample::new("CHILD".into(), 2)]
        );
        assert!(recessive.roles[Role::Heterozygous].is_empty());
        assert_eq!(recessive.roles_raw[Role::Unfiltered], Some("sib".into()));
        assert_eq!(recessive.roles_raw[Role::NotReference], None);
        assert_eq!(
            recessive
                .samples_in_display_order()
                .map(|(role, sample)| (role, sample.name.as_str()))
                .collect::<Vec<_>>(),
            vec![
                (Role::Alternate, "CHILD"),
                (Role::Reference, "MOTHER"),
                (Role::Unfiltered, "SIB")
            ]
        );
        assert!(approx_eq!(f64, recessive.cohort_frequency_ceiling, 0.35));

        let de_novo = &families[1];
        assert_eq!(de_novo.roles[Role::Reference].len(), 2);
        assert_eq!(de_novo.roles[Role::Heterozygous].len(), 1);
        assert_eq!(de_novo.total_selected(), 0);

        Ok(())
    }

    #[test]
    fn unknown_sample_is_rejected() {
        let err = families("FAM1\tAD\tmother\tuncle\n").unwrap_err();

        match err.downcast_ref::<AppError>() {
            Some(AppError::UnknownSample { role, sample, .. }) => {
                assert_eq!(role, "Heterozygous");
                assert_eq!(sample, "UNCLE");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn conflicting_roles_are_rejected() {
        let err = families("FAM1\tAD\tmother\tchild,MOTHER\n").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::ConflictingRoles { .. })
        ));
    }

    #[test]
    fn duplicate_base_names_are_rejected() {
        let err = families("FAM1\tAD\tmother\nFAM1\tAD\tfather\n").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::DuplicateOutput { .. })
        ));
    }

    #[test]
    fn short_row_is_rejected() {
        let err = families("FAM1\n").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::MalformedTableRow { .. })
        ));
    }

    #[test]
    fn empty_output_name_is_rejected() {
        let err = read_families(
            "\t\tmother\n".as_bytes(),
            &SampleIndex::from_header_line(HEADER),
            &FilterSettings::default(),
            "",
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::MalformedTableRow { row: 1, .. })
        ));
        assert!(families("\t\tmother\n").is_ok());
    }

    #[test]
    fn counters_by_category() -> Result<(), anyhow::Error> {
        let mut families = families("FAM1\tAD\t\tchild\n")?;
        let family = &mut families[0];

        family.record(PathogenicityTier::High, "stopgain", "exonic");
        family.record(PathogenicityTier::Medium, "nonsynonymousSNV", "exonic");
        family.record(PathogenicityTier::Silent, "synonymousSNV", "exonic,splicing");

        assert_eq!(family.counters[VariantCategory::Overall], [1, 1, 1]);
        assert_eq!(family.counters[VariantCategory::Nonsense], [0, 0, 1]);
        assert_eq!(family.counters[VariantCategory::Missense], [0, 1, 0]);
        assert_eq!(family.counters[VariantCategory::Silent], [1, 0, 0]);
        assert_eq!(family.counters[VariantCategory::Splicing], [1, 0, 0]);
        assert_eq!(family.total_selected(), 3);

        Ok(())
    }
}
