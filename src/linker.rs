use camino::Utf8Path;
use tracing::info;

use crate::catalog::{Catalog, Lookup, Sample, SampleFile};
use crate::classify::FileClassifier;
use crate::error::LoaderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Inserted(SampleFile),
    Retyped {
        file: SampleFile,
        previous_type: Option<String>,
        file_type: String,
    },
    Unchanged(SampleFile),
}

/// Links a data file to its sample, or refreshes the type of an existing link.
pub fn link_file<C: Catalog + ?Sized>(
    catalog: &mut C,
    classifier: &FileClassifier,
    file_path: &Utf8Path,
    sample: &Sample,
    declared_type: Option<&str>,
    dry_run: bool,
) -> Result<LinkOutcome, LoaderError> {
    let file_name = file_path.file_name().unwrap_or(file_path.as_str());
    let file_type = classifier.resolve(file_name, declared_type)?;

    let type_row = match catalog.find_file_type(&file_type)? {
        Lookup::Found(type_row) => type_row,
        Lookup::NotFound => return Err(LoaderError::UnregisteredFileType(file_type)),
        Lookup::MultipleFound(_) => {
            return Err(LoaderError::DuplicateRecord {
                entity: "sample_file_type",
                key: file_type,
            });
        }
    };

    match catalog.find_sample_file(sample.id, file_path.as_str())? {
        Lookup::NotFound => {
            info!(
                path = %file_path,
                sample = %sample.sample_name,
                file_type = %file_type,
                dry_run,
                "inserting sample file"
            );
            let file = catalog.insert_sample_file(sample.id, file_path.as_str(), type_row.id)?;
            Ok(LinkOutcome::Inserted(file))
        }
        Lookup::Found(file) if file.file_type_id == type_row.id => Ok(LinkOutcome::Unchanged(file)),
        Lookup::Found(mut file) => {
            let previous_type = catalog.file_type_name(file.file_type_id)?;
            info!(
                path = %file_path,
                from = previous_type.as_deref().unwrap_or("unknown"),
                to = %file_type,
                dry_run,
                "updating sample file type"
            );
            catalog.update_sample_file_type(file.id, type_row.id)?;
            file.file_type_id = type_row.id;
            Ok(LinkOutcome::Retyped {
                file,
                previous_type,
                file_type,
            })
        }
        Lookup::MultipleFound(_) => Err(LoaderError::DuplicateRecord {
            entity: "sample_file",
            key: file_path.to_string(),
        }),
    }
}
