use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LoaderError;

/// Name of the capture group every sample name pattern must define.
pub const SAMPLE_NAME_GROUP: &str = "sample_name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pattern: String,
    pub label: String,
}

impl PatternEntry {
    pub fn new(pattern: &str, label: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.to_string(),
        }
    }
}

/// Sample name patterns for the data files already in the store, one entry per
/// file naming convention.
pub fn default_sample_name_patterns() -> Vec<PatternEntry> {
    vec![
        // KM1513.S06C1_A_600.6tr.orfs40.fasta.gz
        PatternEntry::new(
            r"KM\d+\.(?P<sample_name>S\d+C\d+_[A-Z])_\d+\.[a-zA-Z0-9]+\.orfs\d+\.fasta\.gz$",
            "Armbrust HL2A EukTxnDiel orfs",
        ),
        // KM1513.S06C1_A_600.H5C5H_1.1.fastq.gz
        PatternEntry::new(
            r"KM\d+\.(?P<sample_name>S\d+C\d+_[A-Z])_\d+\.[A-Z0-9]+_\d+\.\d+\.fastq\.gz$",
            "Armbrust HL2A EukTxnDiel reads",
        ),
        // Diel-RNA-1_S1_L001_R1_001.fastq.gz
        PatternEntry::new(
            r"(?P<sample_name>Diel-[DR]NA-\d+_S\d+)_L00\d_R[12]_001\.fastq\.gz$",
            "Caron HL2A diel",
        ),
        // July_5m_Rep1_ATCACG_L001_R1_001.fastq.gz
        PatternEntry::new(
            r"(?P<sample_name>(July|March)_(\d+m|DCM))(_Rep\d+)?_[ACGT]+_L00\d_R[12]_001\.fastq\.gz$",
            "Caron HL2A vertical profile",
        ),
        // 10a-268-400-DNA_S10_L001_R1_001.fastq.gz
        PatternEntry::new(
            r"(?P<sample_name>\d+[abc]-\d+-\d+-(DeDNA|DNA|RNA))_S\d+_L00\d_R[12]_001\.fastq\.gz$",
            "Caron HOT quarterly",
        ),
        // 1_200um_S1_L001_R1_001.fastq.gz
        PatternEntry::new(
            r"(?P<sample_name>\d+_\d+um_S\d+)_L00\d_R[12]_001\.fastq\.gz$",
            "Caron HOT273 18S size fraction",
        ),
        // S0501_1_sequence.fastq.bz2
        PatternEntry::new(
            r"(?P<sample_name>S\d+)_\d+_sequence\.fastq\.bz2$",
            "Chisholm HOT BATS",
        ),
        // 161013Chi_D16-10856_1_sequence.fastq.gz
        PatternEntry::new(
            r"(?P<sample_name>\d+Chi_D\d+-\d+)_\d+_sequence\.fastq\.gz$",
            "Chisholm vesicle",
        ),
        // .../CSHLIID00-20a-S06C001-0015/contigs.fastq
        PatternEntry::new(
            r"(?P<sample_name>(CSHLII[DR]\d\d)-(\d+[a-z]+)-(S\d+C\d+)-(\d+))",
            "DeLong HL2A",
        ),
        // SM125_S42_L008_R1_001.fastq.gz
        PatternEntry::new(
            r"(?P<sample_name>SM\d+_S\d+)_L\d+_R[12]_\d+\.fastq(\.gz)?$",
            "Dyhrman HL4 or MESO-SCOPE",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleNameMatch {
    pub sample_name: String,
    pub label: String,
}

/// Ordered table of compiled sample name patterns.
#[derive(Debug, Clone)]
pub struct SampleNameMatcher {
    patterns: Vec<(Regex, String)>,
}

impl SampleNameMatcher {
    pub fn new(entries: &[PatternEntry]) -> Result<Self, LoaderError> {
        let patterns = entries
            .iter()
            .map(|entry| {
                let regex =
                    Regex::new(&entry.pattern).map_err(|err| LoaderError::InvalidPattern {
                        pattern: entry.pattern.clone(),
                        message: err.to_string(),
                    })?;
                if !regex
                    .capture_names()
                    .any(|name| name == Some(SAMPLE_NAME_GROUP))
                {
                    return Err(LoaderError::InvalidPattern {
                        pattern: entry.pattern.clone(),
                        message: format!("missing capture group \"{SAMPLE_NAME_GROUP}\""),
                    });
                }
                Ok((regex, entry.label.clone()))
            })
            .collect::<Result<Vec<_>, LoaderError>>()?;
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Every pattern is evaluated; exactly one may match.
    pub fn identify(&self, name_or_path: &str) -> Result<SampleNameMatch, LoaderError> {
        let mut matches = self
            .patterns
            .iter()
            .filter_map(|(regex, label)| {
                regex
                    .captures(name_or_path)
                    .and_then(|captures| captures.name(SAMPLE_NAME_GROUP))
                    .map(|token| SampleNameMatch {
                        sample_name: token.as_str().to_string(),
                        label: label.clone(),
                    })
            })
            .collect::<Vec<_>>();

        debug!(
            name = name_or_path,
            matched = matches.len(),
            "evaluated sample name patterns"
        );

        match matches.len() {
            0 => Err(LoaderError::UnrecognizedFileName(name_or_path.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(LoaderError::AmbiguousFileName {
                name: name_or_path.to_string(),
                labels: matches.into_iter().map(|m| m.label).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_patterns_compile() {
        let matcher = SampleNameMatcher::new(&default_sample_name_patterns()).unwrap();
        assert_eq!(matcher.len(), 10);
    }

    #[test]
    fn pattern_without_group_is_rejected() {
        let err = SampleNameMatcher::new(&[PatternEntry::new(r"S\d+", "bare")]).unwrap_err();
        assert_matches!(err, LoaderError::InvalidPattern { .. });
    }
}
