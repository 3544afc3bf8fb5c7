use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};

use muscope_loader::error::LoaderError;
use muscope_loader::normalize::{SheetCatalog, SheetFormat};
use muscope_loader::table::{Cell, Table};

const BASE_COLUMNS: [&str; 12] = [
    "sample_name",
    "seq_name",
    "pi",
    "cruise_name",
    "station",
    "cast_num",
    "depth_sample",
    "collection_date",
    "collection_time",
    "latitude",
    "longitude",
    "data_type",
];

fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
    Table::new(columns.iter().map(|column| column.to_string()).collect(), rows)
}

fn text(value: &str) -> Cell {
    Cell::text(value)
}

fn number(value: f64) -> Cell {
    Cell::Number(value)
}

fn empty_row(width: usize) -> Vec<Cell> {
    vec![Cell::Empty; width]
}

/// Row in `BASE_COLUMNS` order.
#[allow(clippy::too_many_arguments)]
fn base_row(
    sample_name: &str,
    seq_name: &str,
    pi: &str,
    cruise: Cell,
    station: Cell,
    cast: Cell,
    depth: Cell,
    data_type: &str,
) -> Vec<Cell> {
    vec![
        text(sample_name),
        text(seq_name),
        text(pi),
        cruise,
        station,
        cast,
        depth,
        text("2015-07-26"),
        text("06:00:00"),
        number(22.75),
        number(-158.0),
        text(data_type),
    ]
}

#[test]
fn catalog_detects_known_spreadsheets() {
    let catalog = SheetCatalog::new().unwrap();
    assert_eq!(
        catalog.detect("Chisholm_HOT-BATS_seq_attrib.xls"),
        Some(SheetFormat::ChisholmHotBats)
    );
    assert_eq!(
        catalog.detect("Dyhrman_MS_incubation_assoc_data_v5.xls"),
        Some(SheetFormat::DyhrmanMsIncubation)
    );
    assert_eq!(catalog.detect("Caron_HL2A_VertProf_seq_attrib_v2.xls"), None);
    assert_eq!(catalog.detect("ctd_HOT273.xlsx"), None);
}

#[test]
fn base_format_renames_depth() {
    let raw = table(
        &BASE_COLUMNS,
        vec![base_row(
            "S1",
            "f1.fastq",
            "Armbrust",
            text("KM1513"),
            number(6.0),
            number(1.0),
            number(15.0),
            "",
        )],
    );
    let canonical = SheetFormat::ArmbrustHl2aEukTxnDiel.normalize(raw).unwrap();
    assert_eq!(canonical.get(0, "depth"), &number(15.0));
    assert!(!canonical.has_column("depth_sample"));
}

#[test]
fn missing_required_column_is_rejected() {
    let raw = table(&["sample_name", "seq_name"], vec![vec![text("S1"), text("f1")]]);
    let err = SheetFormat::DeLongHl2aDnaDiel.normalize(raw).unwrap_err();
    assert_matches!(err, LoaderError::MissingColumn(column) if column == "pi");
}

#[test]
fn caron_18s_diel_repairs_header_and_type_letters() {
    let columns = [
        "sample_name",
        "pi",
        "cruise_name",
        "station",
        "cast_num",
        "depth_sample",
        "collection_date",
        "collection_time",
        "latitude",
        "Unnamed: 9",
        "longitude",
    ];
    let raw = table(
        &columns,
        vec![vec![
            text("Diel-RNA-1_S1"),
            text("Caron"),
            text("KM1513"),
            text("S47"),
            text("C1"),
            number(15.0),
            text("2015-07-26"),
            text("06:00:00"),
            number(22.75),
            text("Diel-RNA-1_S1_L001_R1_001.fastq.gz"),
            number(-158.0),
        ]],
    );
    let canonical = SheetFormat::CaronHl2a18SDiel.normalize(raw).unwrap();
    assert_eq!(canonical.get(0, "seq_name"), &text("Diel-RNA-1_S1_L001_R1_001.fastq.gz"));
    assert_eq!(canonical.get(0, "station"), &number(47.0));
    assert_eq!(canonical.get(0, "cast_num"), &number(1.0));
    assert!(!canonical.has_data_type());
}

#[test]
fn caron_vertical_profile_heads_inherit_previous_head() {
    let mut second = empty_row(BASE_COLUMNS.len());
    second[0] = text("July_DCM");
    second[1] = text("July_DCM_R1.fastq.gz");
    let mut mate = empty_row(BASE_COLUMNS.len());
    mate[1] = text("July_5m_R2.fastq.gz");

    let raw = table(
        &BASE_COLUMNS,
        vec![
            base_row(
                "July_5m",
                "July_5m_R1.fastq.gz",
                "Caron",
                text("KM1513"),
                number(2.0),
                number(3.0),
                number(5.0),
                "",
            ),
            mate,
            second,
        ],
    );
    let canonical = SheetFormat::CaronHl3VertProf.normalize(raw).unwrap();
    assert_eq!(canonical.get(2, "pi"), &text("Caron"));
    assert_eq!(canonical.get(2, "cruise_name"), &text("KM1513"));
    assert_eq!(canonical.get(2, "sample_name"), &text("July_DCM"));
    assert!(canonical.get(1, "pi").is_empty());
}

#[test]
fn caron_hot273_gets_prefix_and_midnight() {
    let columns: Vec<&str> = BASE_COLUMNS
        .iter()
        .copied()
        .filter(|c| *c != "collection_time")
        .collect();
    let mut row = base_row(
        "1_200um_S1",
        "f1.fastq.gz",
        "Caron",
        number(273.0),
        number(2.0),
        number(1.0),
        number(25.0),
        "",
    );
    row.remove(8);
    let canonical = SheetFormat::CaronHot273SizeFraction
        .normalize(table(&columns, vec![row]))
        .unwrap();
    assert_eq!(canonical.get(0, "cruise_name"), &text("HOT273"));
    assert_eq!(canonical.get(0, "collection_time"), &Cell::Time(NaiveTime::MIN));
}

#[test]
fn chisholm_hot_bats_drops_bats_rows() {
    let columns: Vec<&str> = BASE_COLUMNS
        .iter()
        .map(|column| if *column == "seq_name" { "Unnamed: 9" } else { column })
        .collect();
    let rows = (0..140)
        .map(|index| {
            base_row(
                &format!("S{index:04}"),
                &format!("S{index:04}_1_sequence.fastq.bz2"),
                "Chisholm",
                text("HOT180"),
                number(2.0),
                number(1.0),
                number(100.0),
                "",
            )
        })
        .collect();
    let canonical = SheetFormat::ChisholmHotBats.normalize(table(&columns, rows)).unwrap();
    assert_eq!(canonical.len(), 132);
    assert_eq!(canonical.get(0, "seq_name"), &text("S0000_1_sequence.fastq.bz2"));
}

#[test]
fn church_tricho_repairs_net_tows_and_depths() {
    let mut first = base_row(
        "T1",
        "t1_R1.fastq",
        "Church",
        number(201.0),
        number(2.0),
        text("net tow"),
        Cell::Empty,
        "",
    );
    let sampled = NaiveDate::from_ymd_opt(2008, 5, 1)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    first[7] = Cell::DateTime(sampled);
    first[8] = Cell::Empty;

    let mut mate = empty_row(BASE_COLUMNS.len());
    mate[1] = text("t1_R2.fastq");

    let mut second = empty_row(BASE_COLUMNS.len());
    second[0] = text("T2");
    second[1] = text("t2_R1.fastq");
    second[3] = number(202.0);
    second[5] = number(1.0);

    let raw = table(&BASE_COLUMNS, vec![first, mate, second]);
    let canonical = SheetFormat::ChurchHotTricho16S.normalize(raw).unwrap();

    assert_eq!(canonical.get(0, "cruise_name"), &text("HOT201"));
    assert_eq!(canonical.get(0, "cast_num"), &number(0.0));
    assert_eq!(canonical.get(0, "depth"), &number(999.0));
    assert_eq!(
        canonical.get(0, "collection_time"),
        &Cell::Time(NaiveTime::from_hms_opt(10, 30, 0).unwrap())
    );

    assert_eq!(canonical.get(2, "cruise_name"), &text("HOT202"));
    assert_eq!(canonical.get(2, "pi"), &text("Church"));
    assert_eq!(canonical.get(2, "station"), &number(2.0));
    assert_eq!(canonical.get(2, "cast_num"), &number(1.0));
    assert_eq!(canonical.get(2, "depth"), &number(999.0));
    assert!(canonical.get(1, "sample_name").is_empty());
}

fn rna_block(sample_name: &str, first_type: &str, third_type: &str) -> Vec<Vec<Cell>> {
    let mut rows = vec![
        base_row(
            sample_name,
            "SM1_R1.fastq",
            "Dyhrman",
            text("KOK1515"),
            number(1.0),
            number(2.0),
            number(25.0),
            first_type,
        ),
        empty_row(BASE_COLUMNS.len()),
        empty_row(BASE_COLUMNS.len()),
        empty_row(BASE_COLUMNS.len()),
    ];
    rows[1][1] = text("SM1_R2.fastq");
    rows[2][1] = text("SM2_R1.fastq");
    rows[2][11] = text(third_type);
    rows[3][1] = text("SM2_R2.fastq");
    rows
}

#[test]
fn dyhrman_rna_diel_rewrites_vocabulary_and_suffixes() {
    let raw = table(&BASE_COLUMNS, rna_block("SM1.fastq.tar", "mRNA reads", "total RNA reads"));
    let canonical = SheetFormat::DyhrmanHl2aRnaDiel.normalize(raw).unwrap();

    assert_eq!(canonical.get(0, "sample_name"), &text("SM1"));
    assert_eq!(canonical.get(0, "data_type"), &text("mRNA Reads"));
    assert_eq!(canonical.get(2, "data_type"), &text("Total RNA Reads"));
    assert_eq!(canonical.get(0, "seq_name"), &text("SM1_R1.fastq.gz"));
    assert_eq!(canonical.get(3, "seq_name"), &text("SM2_R2.fastq.gz"));
    assert_eq!(canonical.get(2, "pi"), &text("Dyhrman"));
    assert_eq!(canonical.get(2, "depth"), &number(25.0));
    assert!(canonical.get(1, "pi").is_empty());
}

#[test]
fn dyhrman_unexpected_data_type_fails_the_sheet() {
    let raw = table(&BASE_COLUMNS, rna_block("SM1", "RNA reads", "total RNA reads"));
    let err = SheetFormat::DyhrmanHl4Incubation.normalize(raw).unwrap_err();
    assert_matches!(
        err,
        LoaderError::UnexpectedValue { column, row: 0, value, .. }
            if column == "data_type" && value == "RNA reads"
    );

    let raw = table(&BASE_COLUMNS, rna_block("SM1", "mRNA reads", "total reads"));
    let err = SheetFormat::DyhrmanHl4Incubation.normalize(raw).unwrap_err();
    assert_matches!(err, LoaderError::UnexpectedValue { row: 2, .. });
}

#[test]
fn dyhrman_tricho_is_a_net_tow_with_degree_minutes() {
    let columns: Vec<&str> = BASE_COLUMNS
        .iter()
        .copied()
        .filter(|column| *column != "station" && *column != "cast_num")
        .collect();
    let head = vec![
        text("Tricho-1"),
        text("tricho1_R1.fastq"),
        text("Dyhrman"),
        text("KM1513"),
        number(0.0),
        text("2015-07-26"),
        text("06:00:00"),
        text("22 30"),
        text("158 15"),
        text("reads"),
    ];
    let mut mate = empty_row(columns.len());
    mate[1] = text("tricho1_R2.fastq");
    mate[9] = text("reads");

    let canonical = SheetFormat::DyhrmanHl2aTricho
        .normalize(table(&columns, vec![head, mate]))
        .unwrap();
    assert_eq!(canonical.get(0, "station"), &number(0.0));
    assert_eq!(canonical.get(1, "cast_num"), &number(0.0));
    assert_eq!(canonical.get(0, "latitude"), &number(22.5));
    assert_eq!(canonical.get(0, "longitude"), &number(-158.25));
    assert_eq!(canonical.get(0, "data_type"), &text("Reads"));
    assert_eq!(canonical.get(1, "data_type"), &text("Reads"));
    assert_eq!(canonical.get(1, "seq_name"), &text("tricho1_R2.fastq.gz"));
}

#[test]
fn dyhrman_tricho_rejects_other_data_types() {
    let columns: Vec<&str> = BASE_COLUMNS
        .iter()
        .copied()
        .filter(|column| *column != "station" && *column != "cast_num")
        .collect();
    let mut head = empty_row(columns.len());
    head[0] = text("Tricho-1");
    head[9] = text("Reads");
    let err = SheetFormat::DyhrmanHl2aTricho
        .normalize(table(&columns, vec![head]))
        .unwrap_err();
    assert_matches!(err, LoaderError::UnexpectedValue { expected, .. } if expected == "reads");
}

#[test]
fn meso_scope_incubation_names_cruise_and_parses_times() {
    let mut rows = rna_block("SM125_S42", "mRNA reads", "total RNA reads");
    rows[0][8] = text("1245");
    let canonical = SheetFormat::DyhrmanMsIncubation
        .normalize(table(&BASE_COLUMNS, rows))
        .unwrap();
    assert_eq!(canonical.get(0, "cruise_name"), &text("MESO-SCOPE"));
    assert_eq!(canonical.get(2, "cruise_name"), &text("MESO-SCOPE"));
    assert_eq!(
        canonical.get(0, "collection_time"),
        &Cell::Time(NaiveTime::from_hms_opt(12, 45, 0).unwrap())
    );
    assert_eq!(canonical.get(0, "seq_name"), &text("SM1_R1.fastq"));
}
