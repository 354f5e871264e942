//! Parsing of annotated VCF data lines into `VariantRecord`.

use indexmap::IndexMap;

use crate::err::AppError;

/// Token used for missing values in the VCF.
pub const MISSING: &str = ".";

/// Number of fixed fields up to and including INFO.
pub const MIN_FIELDS: usize = 8;

/// Index of the first sample column.
pub const FIRST_SAMPLE_COLUMN: usize = 9;

/// Coerce `value` to a number, the missing token counts as zero.
pub fn numeric(key: &str, value: &str) -> Result<f64, AppError> {
    let value = value.trim();
    if value.is_empty() || value == MISSING {
        return Ok(0.0);
    }
    value.parse::<f64>().map_err(|_| AppError::MalformedValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Like `numeric` but recover from malformed values with the missing-value default.
pub fn numeric_or_missing(key: &str, value: &str) -> f64 {
    numeric(key, value).unwrap_or_else(|e| {
        tracing::warn!("{} (using 0)", e);
        0.0
    })
}

/// One sample column of a record.
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct SampleCall {
    /// The column as found in the input, without surrounding whitespace.
    pub raw: String,
    /// The colon-separated values, aligned with the FORMAT keys.
    pub values: Vec<String>,
}

/// One data line of the input VCF.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantRecord {
    pub chromosome: String,
    pub position: u64,
    pub id: String,
    pub reference: String,
    pub alternates: Vec<String>,
    /// The ALT column as found in the input.
    pub alternates_raw: String,
    pub quality: f64,
    /// The FILTER column as found in the input.
    pub filter: String,
    /// FILTER split into tags; empty for passing records.
    pub filter_tags: Vec<String>,
    /// The INFO column as found in the input.
    pub info: String,
    /// INFO key/value pairs; flags without value are skipped.
    pub annotations: IndexMap<String, String>,
    pub format_keys: Vec<String>,
    pub samples: Vec<SampleCall>,
}

impl VariantRecord {
    /// Parse one tab-separated data line; `line_no` is only used for error messages.
    pub fn parse(line: &str, line_no: usize) -> Result<Self, AppError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields = line.split('\t').collect::<Vec<_>>();
        if fields.len() < MIN_FIELDS {
            return Err(AppError::MalformedRecord {
                line: line_no,
                reason: format!(
                    "expected at least {} fields but found {}",
                    MIN_FIELDS,
                    fields.len()
                ),
            });
        }

        let position = fields[1]
            .trim()
            .parse::<u64>()
            .map_err(|e| AppError::MalformedRecord {
                line: line_no,
                reason: format!("invalid position {:?}: {}", fields[1], e),
            })?;
        let quality = numeric_or_missing("QUAL", fields[5]);

        let filter = fields[6].to_string();
        let filter_tags = match filter.as_str() {
            "" | MISSING | "PASS" => Vec::new(),
            value => value.split(';').map(str::to_string).collect(),
        };

        let info = fields[7].to_string();
        let annotations = info
            .split(';')
            .filter_map(|entry| entry.split_once('='))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<IndexMap<_, _>>();

        let format_keys = fields
            .get(8)
            .map(|format| format.trim().split(':').map(str::to_string).collect())
            .unwrap_or_default();
        let samples = fields
            .iter()
            .skip(FIRST_SAMPLE_COLUMN)
            .map(|column| {
                let raw = column.trim();
                SampleCall::new(
                    raw.to_string(),
                    raw.split(':').map(str::to_string).collect(),
                )
            })
            .collect();

        Ok(Self {
            chromosome: fields[0].to_string(),
            position,
            id: fields[2].to_string(),
            reference: fields[3].to_string(),
            alternates: fields[4].split(',').map(str::to_string).collect(),
            alternates_raw: fields[4].to_string(),
            quality,
            filter,
            filter_tags,
            info,
            annotations,
            format_keys,
            samples,
        })
    }

    /// Raw annotation value, if any.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Raw annotation value or `default`.
    pub fn annotation_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.annotation(key).unwrap_or(default)
    }

    /// Position of `key` in the FORMAT column.
    pub fn format_index(&self, key: &str) -> Option<usize> {
        self.format_keys.iter().position(|k| k == key)
    }

    /// Value of FORMAT field at `format_idx` for the sample at `sample_idx`.
    ///
    /// Trailing fields dropped by the caller count as missing.
    pub fn sample_value(&self, sample_idx: usize, format_idx: usize) -> &str {
        self.samples
            .get(sample_idx)
            .and_then(|call| call.values.get(format_idx))
            .map(String::as_str)
            .unwrap_or(MISSING)
    }

    /// Genotype string of the sample at `sample_idx`.
    ///
    /// GT is the first FORMAT field by convention, so this does not consult the keys.
    pub fn genotype(&self, sample_idx: usize) -> &str {
        self.sample_value(sample_idx, 0)
    }

    /// Raw sample column of the sample at `sample_idx`.
    pub fn sample_raw(&self, sample_idx: usize) -> &str {
        self.samples
            .get(sample_idx)
            .map(|call| call.raw.as_str())
            .unwrap_or(MISSING)
    }
}
