use serde::Serialize;
use std::fmt;
use std::fmt::Formatter;

use crate::nlx_error::NlxError;
use crate::properties::{keys, HeaderProperties};

/// Hardware and software lineage of a recording. This decides the layout of the sample records
/// that follow the header.
/// ```text
/// PRE4           Cheetah before version 4, CscAcqEnt base class, rounded sampling frequency
/// BML            BML acquisition, fractional frequency and microseconds per sample
/// DIGITALLYNX    DigitalLynx hardware
/// DIGITALLYNXSX  DigitalLynxSX hardware
/// UNKNOWN        none of the known markers
/// CHEETAH64      Cheetah64 hardware
/// RAWDATAFILE    written from a raw data file
/// CHEETAH560     Cheetah 5.6.0, FileType without a known FileVersion
/// ATLAS          Atlas hardware
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AcquisitionType {
    Pre4,
    Bml,
    DigitalLynx,
    DigitalLynxSx,
    Unknown,
    Cheetah64,
    RawDataFile,
    Cheetah560,
    Atlas,
}

/// File versions whose acquisition type is named by the AcquisitionSystem property.
const ACQUISITION_SYSTEM_FILE_VERSIONS: [&str; 3] = ["3.2", "3.3", "3.4"];

impl AcquisitionType {
    pub const ALL: [AcquisitionType; 9] = [
        AcquisitionType::Pre4,
        AcquisitionType::Bml,
        AcquisitionType::DigitalLynx,
        AcquisitionType::DigitalLynxSx,
        AcquisitionType::Unknown,
        AcquisitionType::Cheetah64,
        AcquisitionType::RawDataFile,
        AcquisitionType::Cheetah560,
        AcquisitionType::Atlas,
    ];

    /// Upper case tag, e.g. `DIGITALLYNXSX`.
    pub fn tag(&self) -> &'static str {
        match self {
            AcquisitionType::Pre4 => "PRE4",
            AcquisitionType::Bml => "BML",
            AcquisitionType::DigitalLynx => "DIGITALLYNX",
            AcquisitionType::DigitalLynxSx => "DIGITALLYNXSX",
            AcquisitionType::Unknown => "UNKNOWN",
            AcquisitionType::Cheetah64 => "CHEETAH64",
            AcquisitionType::RawDataFile => "RAWDATAFILE",
            AcquisitionType::Cheetah560 => "CHEETAH560",
            AcquisitionType::Atlas => "ATLAS",
        }
    }

    /// Looks up a type by its exact tag.
    pub fn from_tag(tag: &str) -> Option<AcquisitionType> {
        AcquisitionType::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Determines the acquisition type from parsed header properties. The base class type is
    /// checked first, then the hardware subsystem type, then the file type.
    pub fn classify(props: &HeaderProperties) -> Result<AcquisitionType, NlxError> {
        if let Some(base_class) = props.get_str(keys::NLX_BASE_CLASS_TYPE) {
            return Ok(match base_class {
                "CscAcqEnt" => AcquisitionType::Pre4,
                "BmlAcq" => AcquisitionType::Bml,
                _ => {
                    log::warn!("unknown NLX_Base_Class_Type `{}`", base_class);
                    AcquisitionType::Unknown
                }
            });
        }

        if let Some(hardware) = props.get_str(keys::HARDWARE_SUBSYSTEM_TYPE) {
            return Ok(match hardware {
                "DigitalLynx" => AcquisitionType::DigitalLynx,
                "DigitalLynxSX" => AcquisitionType::DigitalLynxSx,
                "Cheetah64" => AcquisitionType::Cheetah64,
                "RawDataFile" => AcquisitionType::RawDataFile,
                _ => {
                    log::warn!("unknown HardwareSubSystemType `{}`", hardware);
                    AcquisitionType::Unknown
                }
            });
        }

        if props.contains(keys::FILE_TYPE) {
            let versioned = props
                .get_str(keys::FILE_VERSION)
                .map_or(false, |v| ACQUISITION_SYSTEM_FILE_VERSIONS.contains(&v));
            if versioned {
                return from_acquisition_system(props.get_str(keys::ACQUISITION_SYSTEM));
            }
            // only known case of FileType without a listed FileVersion
            return Ok(AcquisitionType::Cheetah560);
        }

        Ok(AcquisitionType::Unknown)
    }
}

/// The second word of AcquisitionSystem, e.g. `AcqSystem1 DigitalLynxSX`, names the type.
fn from_acquisition_system(system: Option<&str>) -> Result<AcquisitionType, NlxError> {
    let system = system.unwrap_or("");
    let tag = system
        .split_whitespace()
        .nth(1)
        .map(|word| word.trim_matches('"').to_uppercase());
    match tag.as_deref().and_then(AcquisitionType::from_tag) {
        Some(acq_type) => Ok(acq_type),
        None => Err(NlxError::UnknownAcquisitionSystem(system.to_string())),
    }
}

impl fmt::Display for AcquisitionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
