use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::catalog::{Catalog, Sample, SampleAttrType};
use crate::error::LoaderError;
use crate::table::Table;

/// Declared sample attribute types keyed by their exact column header.
#[derive(Debug, Clone, Default)]
pub struct AttributeTypeIndex {
    by_name: BTreeMap<String, SampleAttrType>,
}

impl AttributeTypeIndex {
    pub fn load<C: Catalog + ?Sized>(catalog: &C) -> Result<Self, LoaderError> {
        let by_name = catalog
            .attribute_types()?
            .into_iter()
            .map(|attr_type| (attr_type.type_name.clone(), attr_type))
            .collect();
        Ok(Self { by_name })
    }

    pub fn get(&self, column: &str) -> Option<&SampleAttrType> {
        self.by_name.get(column)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Column headers that have no attribute type.
    pub fn unmatched<'a>(&self, columns: &'a [String]) -> Vec<&'a str> {
        columns
            .iter()
            .filter(|column| !self.by_name.contains_key(column.as_str()))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeCounts {
    pub created: usize,
    pub unchanged: usize,
    pub empty: usize,
}

/// Adds the row's attribute values the sample does not have yet. Existing
/// values are never overwritten.
pub fn apply_attributes<C: Catalog + ?Sized>(
    catalog: &mut C,
    table: &Table,
    row: usize,
    sample: &Sample,
    types: &AttributeTypeIndex,
    dry_run: bool,
) -> Result<AttributeCounts, LoaderError> {
    let mut counts = AttributeCounts::default();

    for (index, column) in table.columns().iter().enumerate() {
        let Some(attr_type) = types.get(column) else {
            continue;
        };

        let existing = catalog.find_attributes(sample.id, attr_type.id)?;
        match existing.len() {
            0 => match table.get_at(row, index).to_attribute_value() {
                Some(value) => {
                    info!(
                        sample = %sample.sample_name,
                        attribute = %attr_type.type_name,
                        value = %value,
                        dry_run,
                        "inserting sample attribute"
                    );
                    catalog.insert_attribute(sample.id, attr_type.id, &value)?;
                    counts.created += 1;
                }
                None => {
                    debug!(
                        sample = %sample.sample_name,
                        attribute = %attr_type.type_name,
                        "no value in spreadsheet"
                    );
                    counts.empty += 1;
                }
            },
            1 => counts.unchanged += 1,
            _ => {
                return Err(LoaderError::DuplicateAttribute {
                    sample_id: sample.id,
                    attr_type: attr_type.type_name.clone(),
                });
            }
        }
    }

    Ok(counts)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Writes `value` whether or not the sample already has an attribute of
/// this type.
pub fn overwrite_attribute<C: Catalog + ?Sized>(
    catalog: &mut C,
    sample: &Sample,
    attr_type: &SampleAttrType,
    value: &str,
    dry_run: bool,
) -> Result<OverwriteOutcome, LoaderError> {
    let mut existing = catalog.find_attributes(sample.id, attr_type.id)?;
    match existing.len() {
        0 => {
            info!(
                sample = %sample.sample_name,
                attribute = %attr_type.type_name,
                value,
                dry_run,
                "inserting sample attribute"
            );
            catalog.insert_attribute(sample.id, attr_type.id, value)?;
            Ok(OverwriteOutcome::Inserted)
        }
        1 => {
            let current = existing.remove(0);
            if current.value == value {
                return Ok(OverwriteOutcome::Unchanged);
            }
            info!(
                sample = %sample.sample_name,
                attribute = %attr_type.type_name,
                from = %current.value,
                to = value,
                dry_run,
                "updating sample attribute"
            );
            catalog.update_attribute(current.id, value)?;
            Ok(OverwriteOutcome::Updated)
        }
        _ => Err(LoaderError::DuplicateAttribute {
            sample_id: sample.id,
            attr_type: attr_type.type_name.clone(),
        }),
    }
}
