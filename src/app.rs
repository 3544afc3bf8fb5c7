use std::collections::VecDeque;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attributes::{AttributeTypeIndex, apply_attributes};
use crate::catalog::{Catalog, Lookup, Sample, UnitOfWork};
use crate::config::ResolvedConfig;
use crate::ctd::{CtdReport, merge_sheet};
use crate::error::LoaderError;
use crate::linker::{LinkOutcome, link_file};
use crate::lookup::{SampleIndex, StationIndex};
use crate::normalize::{CORE_ATTRIBUTES_SHEET, CORE_ATTRIBUTES_SKIP_ROWS, SheetCatalog, SheetFormat};
use crate::reconcile::{ReconcileContext, resolve_or_create};
use crate::remote::FileStore;
use crate::spreadsheet::SheetReader;
use crate::store::Workspace;
use crate::table::CanonicalTable;
use crate::water_column::{WaterColumnSheet, skip_rows_for};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub commit: bool,
    pub file_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub dry_run: bool,
    pub loaded: Vec<String>,
    pub unrecognized: Vec<String>,
    pub failed_spreadsheets: Vec<SheetFailure>,
    pub repaired_samples: Vec<RepairReport>,
    pub created_cruises: usize,
    pub created_samples: usize,
    pub created_attributes: usize,
    pub inserted_files: usize,
    pub retyped_files: usize,
    pub unprocessed_files: Vec<String>,
    pub file_limit_reached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub sample_name: String,
    pub deleted: Vec<SampleRef>,
    pub kept: Vec<SampleRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRef {
    pub id: i64,
    pub cruise_name: String,
    pub station_number: i64,
    pub cast_number: i64,
}

impl From<&Sample> for SampleRef {
    fn from(sample: &Sample) -> Self {
        Self {
            id: sample.id,
            cruise_name: sample.cruise_name.clone(),
            station_number: sample.station_number,
            cast_number: sample.cast_number,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CtdResult {
    pub dry_run: bool,
    pub sheets: Vec<String>,
    pub failed_sheets: Vec<SheetFailure>,
    #[serde(flatten)]
    pub merge: CtdReport,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub checked: usize,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub dry_run: bool,
    pub investigator: String,
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SheetCounts {
    pub cruises: usize,
    pub samples: usize,
    pub attributes: usize,
}

/// Runs the attribute and data-file passes against a catalog.
pub struct Loader<F: FileStore, R: SheetReader> {
    workspace: Workspace,
    store: F,
    reader: R,
    config: ResolvedConfig,
    sheets: SheetCatalog,
}

impl<F: FileStore, R: SheetReader> Loader<F, R> {
    pub fn new(
        workspace: Workspace,
        store: F,
        reader: R,
        config: ResolvedConfig,
    ) -> Result<Self, LoaderError> {
        Ok(Self {
            workspace,
            store,
            reader,
            config,
            sheets: SheetCatalog::new()?,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn store(&self) -> &F {
        &self.store
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn run<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        collections: &[Utf8PathBuf],
        options: &LoadOptions,
    ) -> Result<LoadReport, LoaderError> {
        let mut report = LoadReport {
            dry_run: !options.commit,
            ..LoadReport::default()
        };

        let sample_index_path = self.workspace.sample_index_path();
        Workspace::remove_file(&sample_index_path)?;
        Workspace::remove_file(&self.workspace.station_index_path())?;
        self.workspace.ensure_downloads_dir()?;

        let stations = self.build_station_index()?;
        stations.save(&self.workspace.station_index_path())?;
        SampleIndex::new().save(&sample_index_path)?;

        if options.commit {
            self.load_collections(catalog, collections, &stations, options, &mut report)?;
        } else {
            // Later passes see the intended changes of earlier ones; all are discarded at the end.
            let mut unit = UnitOfWork::begin(catalog)?;
            self.load_collections(&mut *unit, collections, &stations, options, &mut report)?;
            unit.rollback()?;
        }

        let sample_index = SampleIndex::load(&sample_index_path)?;
        report.unprocessed_files = sample_index
            .unprocessed()
            .into_iter()
            .map(|(file_name, _)| file_name.to_string())
            .collect();

        info!(
            loaded = report.loaded.len(),
            unrecognized = report.unrecognized.len(),
            failed_spreadsheets = report.failed_spreadsheets.len(),
            dry_run = report.dry_run,
            "load finished"
        );
        Ok(report)
    }

    fn load_collections<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        collections: &[Utf8PathBuf],
        stations: &StationIndex,
        options: &LoadOptions,
        report: &mut LoadReport,
    ) -> Result<(), LoaderError> {
        let mut remaining = options.file_limit;
        for (position, collection) in collections.iter().enumerate() {
            info!(collection = %collection, "loading attribute spreadsheets");
            self.attribute_pass(catalog, collection, stations, options, report)?;

            info!(collection = %collection, "linking data files");
            let stopped =
                self.data_file_pass(catalog, collection, options, &mut remaining, report)?;
            let skipped = remaining == Some(0) && position + 1 < collections.len();
            if stopped || skipped {
                report.file_limit_reached = true;
                info!("file limit reached; remaining files skipped");
                break;
            }
        }
        Ok(())
    }

    /// Seeds plus every station recorded in the water-column spreadsheets.
    pub fn build_station_index(&self) -> Result<StationIndex, LoaderError> {
        let mut stations = StationIndex::from_seeds(&self.config.seed_stations);
        let collection = &self.config.station_collection;
        let listing = match self.store.list(collection) {
            Ok(listing) => listing,
            Err(err) => {
                warn!(collection = %collection, error = %err, "no station reference collection");
                return Ok(stations);
            }
        };

        for remote in listing.files.iter().filter(|path| self.is_spreadsheet(path)) {
            match self.read_water_column(remote) {
                Ok(sheet) => {
                    let added = sheet.add_stations_to(&mut stations);
                    debug!(path = %remote, added, "indexed stations");
                }
                Err(err) => warn!(path = %remote, error = %err, "skipping water-column sheet"),
            }
        }
        info!(stations = stations.len(), "station index built");
        Ok(stations)
    }

    pub fn merge_ctd<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        commit: bool,
    ) -> Result<CtdResult, LoaderError> {
        let dry_run = !commit;
        let mut result = CtdResult {
            dry_run,
            ..CtdResult::default()
        };
        self.workspace.ensure_downloads_dir()?;
        let types = AttributeTypeIndex::load(catalog)?;
        let listing = self.store.list(&self.config.station_collection)?;

        for remote in listing.files.iter().filter(|path| self.is_spreadsheet(path)) {
            match self.merge_water_column(catalog, remote, &types, commit, &mut result.merge) {
                Ok(()) => result.sheets.push(remote.to_string()),
                Err(err) => {
                    warn!(path = %remote, error = %err, "water-column merge failed");
                    result.failed_sheets.push(SheetFailure {
                        path: remote.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }

    fn merge_water_column<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        remote: &Utf8Path,
        types: &AttributeTypeIndex,
        commit: bool,
        report: &mut CtdReport,
    ) -> Result<(), LoaderError> {
        let sheet = self.read_water_column(remote)?;
        let mut unit = UnitOfWork::begin(catalog)?;
        merge_sheet(&mut *unit, &sheet, types, !commit, report)?;
        unit.finish(commit)
    }

    /// Sample file paths that are gone from the store.
    pub fn audit_sample_files<C: Catalog + ?Sized>(
        &self,
        catalog: &C,
    ) -> Result<AuditReport, LoaderError> {
        let files = catalog.sample_files()?;
        let mut report = AuditReport {
            checked: files.len(),
            missing: Vec::new(),
        };
        for file in files {
            if !self.store.exists(Utf8Path::new(&file.path)) {
                warn!(path = %file.path, sample_id = file.sample_id, "sample file is missing");
                report.missing.push(file.path);
            }
        }
        Ok(report)
    }

    fn attribute_pass<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        root: &Utf8Path,
        stations: &StationIndex,
        options: &LoadOptions,
        report: &mut LoadReport,
    ) -> Result<(), LoaderError> {
        let index_path = self.workspace.sample_index_path();
        let mut sample_index = SampleIndex::load(&index_path)?;
        let mut queue = VecDeque::from([root.to_path_buf()]);

        while let Some(collection) = queue.pop_front() {
            let listing = match self.store.list(&collection) {
                Ok(listing) => listing,
                Err(err) => {
                    warn!(collection = %collection, error = %err, "failed to list collection");
                    report.unrecognized.push(collection.to_string());
                    continue;
                }
            };
            queue.extend(listing.collections);

            for remote in listing.files.iter().filter(|path| self.is_spreadsheet(path)) {
                let file_name = remote.file_name().unwrap_or(remote.as_str());
                let Some(format) = self.sheets.detect(file_name) else {
                    let err = LoaderError::UnknownSheetFormat(file_name.to_string());
                    warn!(path = %remote, error = %err, "skipping spreadsheet");
                    report.unrecognized.push(remote.to_string());
                    continue;
                };

                let snapshot = sample_index.clone();
                let loaded = self.load_spreadsheet(
                    catalog,
                    remote,
                    format,
                    stations,
                    &mut sample_index,
                    options,
                );
                match loaded {
                    Ok(counts) => {
                        report.created_cruises += counts.cruises;
                        report.created_samples += counts.samples;
                        report.created_attributes += counts.attributes;
                        report.loaded.push(remote.to_string());
                    }
                    Err(err) => {
                        warn!(
                            path = %remote,
                            format = %format,
                            error = %err,
                            "spreadsheet load failed"
                        );
                        sample_index = snapshot;
                        report.failed_spreadsheets.push(SheetFailure {
                            path: remote.to_string(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        sample_index.save(&index_path)
    }

    fn load_spreadsheet<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        remote: &Utf8Path,
        format: SheetFormat,
        stations: &StationIndex,
        sample_index: &mut SampleIndex,
        options: &LoadOptions,
    ) -> Result<SheetCounts, LoaderError> {
        let local = self.workspace.download_path(remote);
        self.store.download(remote, &local)?;
        let raw = self.reader.read_table(
            &local,
            Some(CORE_ATTRIBUTES_SHEET),
            &CORE_ATTRIBUTES_SKIP_ROWS,
        )?;
        let table = format.normalize(raw)?;
        info!(path = %remote, format = %format, rows = table.len(), "normalized spreadsheet");

        let mut unit = UnitOfWork::begin(catalog)?;
        let counts = apply_sheet(
            &mut *unit,
            &table,
            stations,
            sample_index,
            &self.config.time_zone,
            !options.commit,
        )?;
        unit.commit()?;
        Ok(counts)
    }

    fn data_file_pass<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        root: &Utf8Path,
        options: &LoadOptions,
        remaining: &mut Option<usize>,
        report: &mut LoadReport,
    ) -> Result<bool, LoaderError> {
        let index_path = self.workspace.sample_index_path();
        let mut sample_index = SampleIndex::load(&index_path)?;
        let dry_run = !options.commit;
        let mut unit = UnitOfWork::begin(catalog)?;
        let mut queue = VecDeque::from([root.to_path_buf()]);
        let mut stopped = false;

        'walk: while let Some(collection) = queue.pop_front() {
            let listing = match self.store.list(&collection) {
                Ok(listing) => listing,
                Err(err) => {
                    warn!(collection = %collection, error = %err, "failed to list collection");
                    report.unrecognized.push(collection.to_string());
                    continue;
                }
            };
            queue.extend(listing.collections);

            for remote in &listing.files {
                if *remaining == Some(0) {
                    stopped = true;
                    break 'walk;
                }
                let file_name = remote.file_name().unwrap_or(remote.as_str());
                let (sample_name, declared_type, indexed) = match sample_index.get(file_name) {
                    Some(entry) => (entry.sample_name.clone(), entry.data_type.clone(), true),
                    None => match self.config.sample_names.identify(remote.as_str()) {
                        Ok(found) => (found.sample_name, None, false),
                        Err(LoaderError::UnrecognizedFileName(_)) => {
                            debug!(path = %remote, "nothing to do");
                            continue;
                        }
                        Err(err) => {
                            warn!(path = %remote, error = %err, "cannot identify sample");
                            report.unrecognized.push(remote.to_string());
                            continue;
                        }
                    },
                };

                let samples = unit.find_samples_by_name(&sample_name)?;
                if !samples.is_empty()
                    && let Some(limit) = remaining.as_mut()
                {
                    *limit -= 1;
                }
                match samples.len() {
                    0 => {
                        warn!(path = %remote, sample = %sample_name, "no sample with this name");
                        report.unrecognized.push(remote.to_string());
                    }
                    1 => {
                        let outcome = link_file(
                            &mut *unit,
                            &self.config.classifier,
                            remote,
                            &samples[0],
                            declared_type.as_deref(),
                            dry_run,
                        );
                        match outcome {
                            Ok(outcome) => {
                                match outcome {
                                    LinkOutcome::Inserted(_) => report.inserted_files += 1,
                                    LinkOutcome::Retyped { .. } => report.retyped_files += 1,
                                    LinkOutcome::Unchanged(_) => {}
                                }
                                if indexed {
                                    sample_index.mark_processed(file_name);
                                }
                                report.loaded.push(remote.to_string());
                            }
                            Err(err) => {
                                warn!(path = %remote, error = %err, "failed to link file");
                                report.unrecognized.push(remote.to_string());
                            }
                        }
                    }
                    count => {
                        let duplicate = LoaderError::DuplicateSampleIdentity {
                            sample_name: sample_name.clone(),
                            count,
                        };
                        warn!(path = %remote, error = %duplicate, "repairing duplicate samples");
                        let repair = repair_duplicate_samples(
                            &mut *unit,
                            &sample_name,
                            &samples,
                            &self.config.known_bad_cruises,
                            dry_run,
                        )?;
                        report.repaired_samples.push(repair);
                        report.unrecognized.push(remote.to_string());
                    }
                }
            }
        }

        unit.commit()?;
        sample_index.save(&index_path)?;
        Ok(stopped)
    }

    fn is_spreadsheet(&self, path: &Utf8Path) -> bool {
        let file_name = path.file_name().unwrap_or(path.as_str());
        self.config.attribute_file_pattern.is_match(file_name)
    }

    fn read_water_column(&self, remote: &Utf8Path) -> Result<WaterColumnSheet, LoaderError> {
        let local = self.workspace.download_path(remote);
        self.store.download(remote, &local)?;
        let file_name = remote.file_name().unwrap_or(remote.as_str());
        let table = self.reader.read_table(&local, None, skip_rows_for(file_name))?;
        WaterColumnSheet::from_table(table)
    }
}

/// Reconciles every row of a normalized spreadsheet and adds its attributes.
pub fn apply_sheet<C: Catalog + ?Sized>(
    catalog: &mut C,
    table: &CanonicalTable,
    stations: &StationIndex,
    sample_index: &mut SampleIndex,
    time_zone: &str,
    dry_run: bool,
) -> Result<SheetCounts, LoaderError> {
    let types = AttributeTypeIndex::load(catalog)?;
    let unmatched = types.unmatched(table.columns());
    if !unmatched.is_empty() {
        debug!(columns = ?unmatched, "columns without an attribute type");
    }

    let mut context = ReconcileContext {
        stations,
        sample_index,
        time_zone,
        dry_run,
    };
    let mut counts = SheetCounts::default();
    for row in 0..table.len() {
        let Some(resolved) = resolve_or_create(catalog, table, row, &mut context)? else {
            continue;
        };
        counts.cruises += usize::from(resolved.created_cruise);
        counts.samples += usize::from(resolved.created_sample);
        let applied = apply_attributes(catalog, table, row, &resolved.sample, &types, dry_run)?;
        counts.attributes += applied.created;
    }
    Ok(counts)
}

/// Deletes the samples recorded against a known-bad cruise and keeps the rest.
pub fn repair_duplicate_samples<C: Catalog + ?Sized>(
    catalog: &mut C,
    sample_name: &str,
    samples: &[Sample],
    known_bad_cruises: &[String],
    dry_run: bool,
) -> Result<RepairReport, LoaderError> {
    let mut repair = RepairReport {
        sample_name: sample_name.to_string(),
        ..RepairReport::default()
    };
    for sample in samples {
        if known_bad_cruises.contains(&sample.cruise_name) {
            warn!(
                sample = %sample_name,
                sample_id = sample.id,
                cruise = %sample.cruise_name,
                dry_run,
                "deleting sample recorded against a bad cruise"
            );
            catalog.delete_sample(sample.id)?;
            repair.deleted.push(SampleRef::from(sample));
        } else {
            info!(
                sample = %sample_name,
                sample_id = sample.id,
                cruise = %sample.cruise_name,
                "keeping duplicate sample"
            );
            repair.kept.push(SampleRef::from(sample));
        }
    }
    Ok(repair)
}

pub fn delete_investigator_samples<C: Catalog + ?Sized>(
    catalog: &mut C,
    last_name: &str,
    commit: bool,
) -> Result<DeleteReport, LoaderError> {
    let dry_run = !commit;
    let mut unit = UnitOfWork::begin(catalog)?;
    let investigator = match unit.find_investigator(last_name)? {
        Lookup::Found(investigator) => investigator,
        Lookup::NotFound => return Err(LoaderError::UnknownInvestigator(last_name.to_string())),
        Lookup::MultipleFound(_) => {
            return Err(LoaderError::DuplicateRecord {
                entity: "investigator",
                key: last_name.to_string(),
            });
        }
    };

    let mut report = DeleteReport {
        dry_run,
        investigator: investigator.last_name.clone(),
        deleted: Vec::new(),
    };
    for sample in unit.samples_for_investigator(investigator.id)? {
        info!(
            sample = %sample.sample_name,
            sample_id = sample.id,
            investigator = %investigator.last_name,
            dry_run,
            "deleting sample"
        );
        unit.delete_sample(sample.id)?;
        report.deleted.push(sample.sample_name);
    }
    unit.finish(commit)?;
    Ok(report)
}
