//! Error taxonomy of the filter.

/// Errors raised while reading input, building the family registry, or writing output.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// A data line has too few fixed fields or an unparseable position.
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    /// Non-numeric content where a number was required.
    #[error("malformed value for {key}: {value:?}")]
    MalformedValue { key: String, value: String },
    /// A filter table row references a sample that is not in the VCF header.
    #[error("family {family:?}: {role} sample {sample:?} not found in VCF header")]
    UnknownSample {
        family: String,
        role: String,
        sample: String,
    },
    /// A sample is assigned to more than one role in the same filter table row.
    #[error("family {family:?}: sample {sample:?} assigned to both {first} and {second}")]
    ConflictingRoles {
        family: String,
        sample: String,
        first: String,
        second: String,
    },
    /// Two filter table rows would write to the same output files.
    #[error("filter table rows {first} and {second} both write to {base_name:?}")]
    DuplicateOutput {
        base_name: String,
        first: usize,
        second: usize,
    },
    /// A filter table row cannot be interpreted.
    #[error("malformed filter table row {row}: {reason}")]
    MalformedTableRow { row: usize, reason: String },
    /// No `#CHROM` line was found before the first data line.
    #[error("no #CHROM header line found before line {line}")]
    MissingHeader { line: usize },
    /// A file cannot be opened or written.
    #[error("could not access {path}: {source}")]
    Resource {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
