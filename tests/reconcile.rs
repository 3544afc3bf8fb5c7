use assert_matches::assert_matches;
use camino::Utf8Path;
use chrono::NaiveDate;

use muscope_loader::app::apply_sheet;
use muscope_loader::attributes::{AttributeTypeIndex, apply_attributes};
use muscope_loader::catalog::{Catalog, Lookup, SampleKey};
use muscope_loader::classify::{FileClassifier, READS_FILE_TYPE, default_file_types};
use muscope_loader::error::LoaderError;
use muscope_loader::linker::{LinkOutcome, link_file};
use muscope_loader::lookup::{SampleIndex, StationIndex, StationPosition};
use muscope_loader::reconcile::{ReconcileContext, resolve_or_create};
use muscope_loader::sqlite::SqliteCatalog;
use muscope_loader::table::{CanonicalTable, Cell, Table};

const COLUMNS: [&str; 13] = [
    "sample_name",
    "seq_name",
    "pi",
    "cruise_name",
    "station",
    "cast_num",
    "depth",
    "collection_date",
    "collection_time",
    "latitude",
    "longitude",
    "temperature",
    "notes",
];

fn row(sample_name: &str, seq_name: &str, pi: &str, station: &str, temperature: Cell) -> Vec<Cell> {
    vec![
        Cell::text(sample_name),
        Cell::text(seq_name),
        Cell::text(pi),
        Cell::text("HOT300"),
        Cell::text(station),
        Cell::text("C2"),
        Cell::Number(10.0),
        Cell::text("2016-03-01"),
        Cell::text("10:15:00"),
        Cell::Number(21.5),
        Cell::Number(-157.5),
        temperature,
        Cell::text("first light"),
    ]
}

fn continuation(seq_name: &str) -> Vec<Cell> {
    let mut cells = vec![Cell::Empty; COLUMNS.len()];
    cells[1] = Cell::text(seq_name);
    cells
}

fn canonical(rows: Vec<Vec<Cell>>) -> CanonicalTable {
    let table = Table::new(COLUMNS.iter().map(|c| c.to_string()).collect(), rows);
    CanonicalTable::try_from(table).unwrap()
}

fn two_row_block() -> CanonicalTable {
    canonical(vec![
        row("S1", "f1.fastq", "Smith", "S5", Cell::Number(24.5)),
        continuation("f2.fastq"),
    ])
}

fn catalog() -> SqliteCatalog {
    let catalog = SqliteCatalog::open_in_memory().unwrap();
    catalog.seed_investigator("Smith").unwrap();
    catalog.seed_attribute_type("temperature").unwrap();
    catalog.seed_file_type(READS_FILE_TYPE).unwrap();
    catalog.seed_file_type("mRNA Reads").unwrap();
    catalog
}

fn stations() -> StationIndex {
    let mut stations = StationIndex::new();
    stations.insert(
        "HOT300",
        5,
        StationPosition {
            latitude: 22.75,
            longitude: -158.0,
        },
    );
    stations
}

#[test]
fn two_row_block_yields_one_sample_and_two_file_names() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    let table = two_row_block();

    let counts = apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap();
    assert_eq!(counts.cruises, 1);
    assert_eq!(counts.samples, 1);
    assert_eq!(counts.attributes, 1);
    assert_eq!(catalog.count_samples().unwrap(), 1);

    let cruise = catalog.find_cruise("HOT300").unwrap().found().unwrap();
    let key = SampleKey {
        cruise_id: cruise.id,
        station_number: 5,
        cast_number: 2,
        sample_name: "S1".to_string(),
    };
    let sample = catalog.find_sample(&key).unwrap().found().unwrap();
    assert_eq!(sample.cruise_name, "HOT300");
    assert_eq!(sample.depth, Some(10.0));
    assert_eq!(sample.latitude_start, Some(22.75));
    assert_eq!(sample.longitude_start, Some(-158.0));
    assert_eq!(sample.collection_time_zone.as_deref(), Some("HST"));
    assert_eq!(
        sample.collection_start,
        NaiveDate::from_ymd_opt(2016, 3, 1).unwrap().and_hms_opt(10, 15, 0)
    );

    assert_eq!(index.get("f1.fastq").unwrap().sample_name, "S1");
    assert_eq!(index.get("f2.fastq").unwrap().sample_name, "S1");
    assert_eq!(index.get("f1.fastq").unwrap().data_type, None);
    assert_eq!(index.len(), 2);
}

#[test]
fn reconciling_twice_changes_nothing() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    let table = two_row_block();

    apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap();
    let sample = catalog.find_samples_by_name("S1").unwrap().remove(0);
    let attributes = catalog.count_attributes(sample.id).unwrap();

    let again = apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap();
    assert_eq!(again.cruises, 0);
    assert_eq!(again.samples, 0);
    assert_eq!(again.attributes, 0);
    assert_eq!(catalog.count_samples().unwrap(), 1);
    assert_eq!(catalog.count_attributes(sample.id).unwrap(), attributes);
}

#[test]
fn existing_attributes_are_not_overwritten() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    apply_sheet(&mut catalog, &two_row_block(), &stations, &mut index, "HST", false).unwrap();

    let changed = canonical(vec![row("S1", "f1.fastq", "Smith", "S5", Cell::Number(30.0))]);
    let types = AttributeTypeIndex::load(&catalog).unwrap();
    let resolved = {
        let mut context = ReconcileContext {
            stations: &stations,
            sample_index: &mut index,
            time_zone: "HST",
            dry_run: false,
        };
        resolve_or_create(&mut catalog, &changed, 0, &mut context)
            .unwrap()
            .unwrap()
    };
    assert!(!resolved.created_sample);

    let counts =
        apply_attributes(&mut catalog, &changed, 0, &resolved.sample, &types, false).unwrap();
    assert_eq!(counts.created, 0);
    assert_eq!(counts.unchanged, 1);

    let temperature = types.get("temperature").unwrap();
    let stored = catalog.find_attributes(resolved.sample.id, temperature.id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value, "24.5");
}

#[test]
fn empty_attribute_cells_are_skipped() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    let table = canonical(vec![row("S1", "f1.fastq", "Smith", "S5", Cell::text("nan"))]);

    let counts = apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap();
    assert_eq!(counts.samples, 1);
    assert_eq!(counts.attributes, 0);
}

#[test]
fn duplicate_attribute_rows_are_reported() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    let table = two_row_block();
    apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap();

    let sample = catalog.find_samples_by_name("S1").unwrap().remove(0);
    let types = AttributeTypeIndex::load(&catalog).unwrap();
    let temperature = types.get("temperature").unwrap().clone();
    catalog.insert_attribute(sample.id, temperature.id, "25.0").unwrap();

    let err = apply_attributes(&mut catalog, &table, 0, &sample, &types, false).unwrap_err();
    assert_matches!(
        err,
        LoaderError::DuplicateAttribute { attr_type, .. } if attr_type == "temperature"
    );
}

#[test]
fn unknown_investigator_fails() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    let table = canonical(vec![row("S1", "f1.fastq", "Nobody", "S5", Cell::Empty)]);

    let err = apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap_err();
    assert_matches!(err, LoaderError::UnknownInvestigator(name) if name == "Nobody");
}

#[test]
fn unknown_station_fails() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    let table = canonical(vec![row("S1", "f1.fastq", "Smith", "S7", Cell::Empty)]);

    let err = apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap_err();
    assert_matches!(
        err,
        LoaderError::UnknownStation { cruise, station: 7 } if cruise == "HOT300"
    );
}

#[test]
fn net_tows_take_position_from_the_row() {
    let mut catalog = catalog();
    let stations = StationIndex::new();
    let mut index = SampleIndex::new();
    let table = canonical(vec![row("T1", "t1.fastq", "Smith", "0", Cell::Empty)]);

    apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap();
    let sample = catalog.find_samples_by_name("T1").unwrap().remove(0);
    assert_eq!(sample.station_number, 0);
    assert_eq!(sample.latitude_start, Some(21.5));
    assert_eq!(sample.longitude_start, Some(-157.5));
}

#[test]
fn same_name_on_another_cruise_is_a_new_sample() {
    let mut catalog = catalog();
    let mut stations = stations();
    stations.insert(
        "HOT301",
        5,
        StationPosition {
            latitude: 22.75,
            longitude: -158.0,
        },
    );
    let mut index = SampleIndex::new();
    let mut other = row("S1", "g1.fastq", "Smith", "S5", Cell::Empty);
    other[3] = Cell::text("HOT301");
    let table = canonical(vec![
        row("S1", "f1.fastq", "Smith", "S5", Cell::Empty),
        other,
    ]);

    let counts = apply_sheet(&mut catalog, &table, &stations, &mut index, "HST", false).unwrap();
    assert_eq!(counts.cruises, 2);
    assert_eq!(counts.samples, 2);
    assert_eq!(catalog.find_samples_by_name("S1").unwrap().len(), 2);
}

#[test]
fn linking_inserts_then_retypes() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    apply_sheet(&mut catalog, &two_row_block(), &stations, &mut index, "HST", false).unwrap();
    let sample = catalog.find_samples_by_name("S1").unwrap().remove(0);
    let classifier = FileClassifier::new(&default_file_types(), READS_FILE_TYPE).unwrap();
    let path = Utf8Path::new("/iplant/home/scope/data/smith/f1.fastq");

    let first = link_file(&mut catalog, &classifier, path, &sample, None, false).unwrap();
    assert_matches!(first, LinkOutcome::Inserted(file) if file.path == path.as_str());

    let second = link_file(&mut catalog, &classifier, path, &sample, None, false).unwrap();
    assert_matches!(second, LinkOutcome::Unchanged(_));

    let third =
        link_file(&mut catalog, &classifier, path, &sample, Some("mRNA Reads"), false).unwrap();
    assert_matches!(
        third,
        LinkOutcome::Retyped { previous_type: Some(previous), file_type, .. }
            if previous == READS_FILE_TYPE && file_type == "mRNA Reads"
    );
    assert_eq!(catalog.sample_files().unwrap().len(), 1);
}

#[test]
fn linking_needs_a_registered_file_type() {
    let mut catalog = catalog();
    let stations = stations();
    let mut index = SampleIndex::new();
    apply_sheet(&mut catalog, &two_row_block(), &stations, &mut index, "HST", false).unwrap();
    let sample = catalog.find_samples_by_name("S1").unwrap().remove(0);
    let classifier = FileClassifier::new(&default_file_types(), READS_FILE_TYPE).unwrap();

    let err = link_file(
        &mut catalog,
        &classifier,
        Utf8Path::new("/data/S1/contigs.fastq"),
        &sample,
        None,
        false,
    )
    .unwrap_err();
    assert_matches!(err, LoaderError::UnregisteredFileType(file_type) if file_type == "Assembly");
}

#[test]
fn duplicate_investigators_are_reported() {
    let mut catalog = catalog();
    catalog.seed_investigator("Smith").unwrap();
    assert_matches!(
        catalog.find_investigator("Smith").unwrap(),
        Lookup::MultipleFound(rows) if rows.len() == 2
    );

    let stations = stations();
    let mut index = SampleIndex::new();
    let err = apply_sheet(&mut catalog, &two_row_block(), &stations, &mut index, "HST", false)
        .unwrap_err();
    assert_matches!(err, LoaderError::DuplicateRecord { entity: "investigator", .. });
}
