//! Source-specific repairs that turn a raw attribute spreadsheet into
//! canonical rows.
//!
//! Every attribute spreadsheet in the data store was filled in by hand and
//! each one carries its own quirks. The set of known spreadsheets is closed:
//! [`SheetCatalog`] maps a spreadsheet file name to a [`SheetFormat`] and the
//! format selects the repairs applied by [`SheetFormat::normalize`].

mod sources;
pub mod transforms;

use std::fmt;

use regex::Regex;

use crate::error::LoaderError;
use crate::table::{CanonicalTable, Table};

/// Worksheet holding the per-sample attributes in every attribute spreadsheet.
pub const CORE_ATTRIBUTES_SHEET: &str = "core attributes + data";

/// Sheet rows dropped before the header: a title row and a units row.
pub const CORE_ATTRIBUTES_SKIP_ROWS: [usize; 2] = [0, 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetFormat {
    ArmbrustHl2aEukTxnDiel,
    CaronHl2a18SDiel,
    CaronHl2aVertProf,
    CaronHl3VertProf,
    CaronHot273SizeFraction,
    CaronHotQuarterly,
    ChisholmHotBats,
    ChisholmHotVesicle,
    ChurchHotTricho16S,
    DeLongHl2aDnaDiel,
    DeLongHl2aSizeFractionDiel,
    DeLongHl2aRnaDiel,
    DyhrmanHl4Incubation,
    DyhrmanHl2aIncubation,
    DyhrmanHl2aRnaDiel,
    DyhrmanHl2aTricho,
    DyhrmanMsIncubation,
}

impl SheetFormat {
    pub const ALL: [SheetFormat; 17] = [
        SheetFormat::ArmbrustHl2aEukTxnDiel,
        SheetFormat::CaronHl2a18SDiel,
        SheetFormat::CaronHl2aVertProf,
        SheetFormat::CaronHl3VertProf,
        SheetFormat::CaronHot273SizeFraction,
        SheetFormat::CaronHotQuarterly,
        SheetFormat::ChisholmHotBats,
        SheetFormat::ChisholmHotVesicle,
        SheetFormat::ChurchHotTricho16S,
        SheetFormat::DeLongHl2aDnaDiel,
        SheetFormat::DeLongHl2aSizeFractionDiel,
        SheetFormat::DeLongHl2aRnaDiel,
        SheetFormat::DyhrmanHl4Incubation,
        SheetFormat::DyhrmanHl2aIncubation,
        SheetFormat::DyhrmanHl2aRnaDiel,
        SheetFormat::DyhrmanHl2aTricho,
        SheetFormat::DyhrmanMsIncubation,
    ];

    /// File name pattern of the spreadsheet this format describes.
    pub fn file_pattern(self) -> &'static str {
        match self {
            SheetFormat::ArmbrustHl2aEukTxnDiel => r"^Armbrust_HL2A_EukTxnDiel_seq_attrib\.xls$",
            SheetFormat::CaronHl2a18SDiel => r"^Caron_HL2A_18Sdiel_seq_attrib_v2\.xls$",
            SheetFormat::CaronHl2aVertProf => r"^Caron_HL2A_VertProf_seq_attrib_v3\.xls$",
            SheetFormat::CaronHl3VertProf => r"^Caron_HL3_VertProf_seq_attrib_v3\.xls$",
            SheetFormat::CaronHot273SizeFraction => {
                r"^Caron_HOT273_18Ssizefrac_seq_assoc_data_v2\.xls$"
            }
            SheetFormat::CaronHotQuarterly => r"^Caron_HOTquarterly_18Sv4_seq_assoc_data_v2\.xls$",
            SheetFormat::ChisholmHotBats => r"^Chisholm_HOT[._-]BATS_seq_attrib\.xls$",
            SheetFormat::ChisholmHotVesicle => {
                r"^Chisholm_HOT263[._-]283_Vesicle_seq_attrib_v2\.xls$"
            }
            SheetFormat::ChurchHotTricho16S => {
                r"^Church_HOT201[._-]222_Tricho16S_seq_assoc_v2\.xls$"
            }
            SheetFormat::DeLongHl2aDnaDiel => r"^DeLong_HL2A_DNAdiel_seq_assoc_data_v3\.xls$",
            SheetFormat::DeLongHl2aSizeFractionDiel => {
                r"^DeLong_HL2A_0\.2frac_diel_seq_assoc_data_v3\.xls$"
            }
            SheetFormat::DeLongHl2aRnaDiel => r"^DeLong_HL2A_RNAdiel_seq_assoc_data_v3\.xls$",
            SheetFormat::DyhrmanHl4Incubation => {
                r"^Dyhrman_HL4_incubation_seq_assoc_data_v5\.xls$"
            }
            SheetFormat::DyhrmanHl2aIncubation => {
                r"^Dyhrman_HL2A_incubation_seq_assoc_data_v5\.xls$"
            }
            SheetFormat::DyhrmanHl2aRnaDiel => r"^Dyhrman_HL2A_RNAdiel_seq_assoc_data_v5\.xls$",
            SheetFormat::DyhrmanHl2aTricho => r"^Dyhrman_HL2A_Tricho_seq_attrib_v2\.xls$",
            SheetFormat::DyhrmanMsIncubation => r"^Dyhrman_MS_incubation_assoc_data_v5\.xls$",
        }
    }

    /// Applies the repairs for this spreadsheet. Pure: no I/O, no catalog access.
    pub fn normalize(self, raw: Table) -> Result<CanonicalTable, LoaderError> {
        let mut table = raw;
        table.rename_column("depth_sample", "depth");

        match self {
            SheetFormat::ArmbrustHl2aEukTxnDiel
            | SheetFormat::ChisholmHotVesicle
            | SheetFormat::DeLongHl2aDnaDiel
            | SheetFormat::DeLongHl2aSizeFractionDiel
            | SheetFormat::DeLongHl2aRnaDiel => {}
            SheetFormat::CaronHl2a18SDiel => sources::caron_18s_diel(&mut table)?,
            SheetFormat::CaronHl2aVertProf | SheetFormat::CaronHl3VertProf => {
                sources::caron_vertical_profile(&mut table)
            }
            SheetFormat::CaronHot273SizeFraction => sources::caron_hot273(&mut table)?,
            SheetFormat::CaronHotQuarterly => sources::caron_hot_quarterly(&mut table)?,
            SheetFormat::ChisholmHotBats => sources::chisholm_hot_bats(&mut table),
            SheetFormat::ChurchHotTricho16S => sources::church_tricho(&mut table)?,
            SheetFormat::DyhrmanHl4Incubation => sources::dyhrman_quad(&mut table, false)?,
            SheetFormat::DyhrmanHl2aRnaDiel => sources::dyhrman_quad(&mut table, true)?,
            SheetFormat::DyhrmanHl2aIncubation => sources::dyhrman_hl2a_incubation(&mut table)?,
            SheetFormat::DyhrmanHl2aTricho => sources::dyhrman_tricho(&mut table)?,
            SheetFormat::DyhrmanMsIncubation => sources::dyhrman_meso_scope(&mut table)?,
        }

        CanonicalTable::try_from(table)
    }
}

impl fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Compiled file name table for every known attribute spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetCatalog {
    formats: Vec<(Regex, SheetFormat)>,
}

impl SheetCatalog {
    pub fn new() -> Result<Self, LoaderError> {
        let formats = SheetFormat::ALL
            .iter()
            .map(|format| {
                Regex::new(format.file_pattern())
                    .map(|regex| (regex, *format))
                    .map_err(|err| LoaderError::InvalidPattern {
                        pattern: format.file_pattern().to_string(),
                        message: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, LoaderError>>()?;
        Ok(Self { formats })
    }

    pub fn detect(&self, file_name: &str) -> Option<SheetFormat> {
        self.formats
            .iter()
            .find(|(regex, _)| regex.is_match(file_name))
            .map(|(_, format)| *format)
    }
}
