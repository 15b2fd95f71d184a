//! A library for reading the text header of Neuralynx files.
//!
//! Every Neuralynx file (`.ncs`, `.nev`, `.nse`, `.ntt`, `.nvt`) starts with a 16 kB free text
//! header. Its layout changed many times across Cheetah, Pegasus, Neuraview and BML releases.
//! This crate extracts the header properties into typed values, works out which application
//! and version wrote the file to read the open and close times, and classifies the acquisition
//! type that decides the layout of the records after the header.

mod acq_type;
mod app_version;
mod dialect;
mod header_text;
mod nlx_error;
mod nlx_header;
mod properties;

use std::path::Path;

pub use self::acq_type::AcquisitionType;
pub use self::app_version::{AppVersion, PreRelease};
pub use self::dialect::{
    resolve_dialect, DialectResolution, DialectSpec, RecordingTimes, ALL_DIALECTS, BML,
    IN_HEADER_COLON, LEGACY_BRACKETED, NEURAVIEW2, PROPERTIES_EMBEDDED, V540,
};
pub use self::header_text::{header_text_from_bytes, read_header_text, HEADER_MARKER, HEADER_SIZE};
pub use self::nlx_error::NlxError;
pub use self::nlx_header::{HeaderOptions, NlxHeader};
pub use self::properties::{
    keys, Converter, HeaderProperties, PropertyKey, PropertyName, PropertyRule, PropertyValue, PROPERTY_RULES,
    UNKNOWN_CHANNEL,
};

/// Parse the header properties of a Neuralynx file.
///
/// With `strict` the header must begin with the `########` marker and the open and close times
/// are read; otherwise only the properties are parsed.
///
/// #Example
///
/// ```
/// use nlxheader::NlxError;
/// # fn main() -> Result<(), NlxError> {
/// let props = nlxheader::parse_header("tests/reference-data/cheetah-5.7.4.txt", true)?;
/// assert_eq!(Some("Cheetah"), props.get_str("ApplicationName"));
/// let acq_type = nlxheader::classify_acquisition_type(&props)?;
/// assert_eq!(nlxheader::AcquisitionType::DigitalLynxSx, acq_type);
/// # Ok(())
/// # }
/// ```
pub fn parse_header<P: AsRef<Path>>(path: P, strict: bool) -> Result<HeaderProperties, NlxError> {
    let options = if strict {
        HeaderOptions::strict()
    } else {
        HeaderOptions::props_only()
    };
    Ok(NlxHeader::from_path(path, options)?.properties)
}

/// Acquisition type of parsed header properties, see [`AcquisitionType::classify`].
pub fn classify_acquisition_type(props: &HeaderProperties) -> Result<AcquisitionType, NlxError> {
    AcquisitionType::classify(props)
}
