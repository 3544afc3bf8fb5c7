use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

pub const READS_FILE_TYPE: &str = "Reads";

const READS_PATTERN: &str = r"\.(fasta|fastq)(\.(gz|bz2))?$";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeEntry {
    pub pattern: String,
    pub file_type: String,
}

impl FileTypeEntry {
    pub fn new(pattern: &str, file_type: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            file_type: file_type.to_string(),
        }
    }
}

pub fn default_file_types() -> Vec<FileTypeEntry> {
    vec![
        FileTypeEntry::new(r"contigs\.fastq", "Assembly"),
        FileTypeEntry::new(r"genes\.fna", "Annotation Genes"),
        FileTypeEntry::new(r"prodigal\.gff", "Annotation Prodigal"),
        FileTypeEntry::new(r"proteins\.faa", "Peptides"),
        FileTypeEntry::new(r"ribosomal_rRNA\.fna", "Ribosomal rRNA FASTA"),
        FileTypeEntry::new(r"ribosomal_rRNA\.gff", "Ribosomal rRNA GFF"),
    ]
}

/// Maps data file names to sample file type tags.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    specific: Vec<(Regex, String)>,
    reads: Regex,
    reads_type: String,
}

impl FileClassifier {
    pub fn new(entries: &[FileTypeEntry], reads_type: &str) -> Result<Self, LoaderError> {
        let specific = entries
            .iter()
            .map(|entry| {
                Regex::new(&entry.pattern)
                    .map(|regex| (regex, entry.file_type.clone()))
                    .map_err(|err| LoaderError::InvalidPattern {
                        pattern: entry.pattern.clone(),
                        message: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, LoaderError>>()?;
        let reads = Regex::new(READS_PATTERN).map_err(|err| LoaderError::InvalidPattern {
            pattern: READS_PATTERN.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            specific,
            reads,
            reads_type: reads_type.to_string(),
        })
    }

    pub fn classify(&self, file_name: &str) -> Result<String, LoaderError> {
        let mut matched = self
            .specific
            .iter()
            .filter(|(regex, _)| regex.is_match(file_name))
            .map(|(_, file_type)| file_type.clone())
            .collect::<Vec<_>>();

        match matched.len() {
            0 if self.reads.is_match(file_name) => Ok(self.reads_type.clone()),
            0 => Err(LoaderError::UnknownFileType(file_name.to_string())),
            1 => Ok(matched.remove(0)),
            _ => Err(LoaderError::AmbiguousFileType {
                name: file_name.to_string(),
                types: matched,
            }),
        }
    }

    /// A declared type from the attribute spreadsheet wins over the pattern table.
    pub fn resolve(&self, file_name: &str, declared: Option<&str>) -> Result<String, LoaderError> {
        match declared {
            Some(file_type) if !file_type.trim().is_empty() => Ok(file_type.to_string()),
            _ => self.classify(file_name),
        }
    }
}
