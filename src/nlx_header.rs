use chrono::NaiveDateTime;
use std::fmt;
use std::path::Path;

use crate::acq_type::AcquisitionType;
use crate::app_version::AppVersion;
use crate::dialect::{resolve_dialect, DialectResolution};
use crate::header_text::{check_marker, read_header_text};
use crate::nlx_error::NlxError;
use crate::properties::{keys, HeaderProperties, PropertyValue};

/// Controls how much of a header is checked and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderOptions {
    /// Require the header to start with `########`.
    pub validate_marker: bool,
    /// Resolve the dialect and read open/close times and the original file name.
    pub read_timestamps: bool,
}

impl HeaderOptions {
    pub fn strict() -> HeaderOptions {
        HeaderOptions {
            validate_marker: true,
            read_timestamps: true,
        }
    }

    /// Properties only, for old files without the marker or a recognizable date layout.
    pub fn props_only() -> HeaderOptions {
        HeaderOptions {
            validate_marker: false,
            read_timestamps: false,
        }
    }
}

impl Default for HeaderOptions {
    fn default() -> Self {
        HeaderOptions::strict()
    }
}

/// The 16 kB text header of a Neuralynx file.
///
/// Besides the `-Key value` properties the header lists, the properties always contain
/// `ApplicationName`, `ApplicationVersion`, `channel_ids` and `channel_names`, and, when
/// timestamps are read, `recording_opened` plus `recording_closed` if the dialect records a
/// close time.
#[derive(Debug, Clone)]
pub struct NlxHeader {
    pub properties: HeaderProperties,
    /// Set when timestamps were read.
    pub dialect: Option<DialectResolution>,
}

impl NlxHeader {
    /// Reads and parses the header of the Neuralynx file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, options: HeaderOptions) -> Result<NlxHeader, NlxError> {
        // marker is checked by from_text
        let text = read_header_text(path, false)?;
        NlxHeader::from_text(&text, options)
    }

    /// Parses already decoded header text.
    pub fn from_text(text: &str, options: HeaderOptions) -> Result<NlxHeader, NlxError> {
        if options.validate_marker {
            check_marker(text)?;
        }
        let mut properties = HeaderProperties::from_text(text)?;
        let dialect = if options.read_timestamps {
            Some(read_time_date(&mut properties, text)?)
        } else {
            None
        };
        Ok(NlxHeader {
            properties,
            dialect,
        })
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn application_name(&self) -> &str {
        self.properties
            .get_str(keys::APPLICATION_NAME)
            .unwrap_or_default()
    }

    pub fn application_version(&self) -> Option<&AppVersion> {
        self.get(keys::APPLICATION_VERSION).and_then(|v| v.as_version())
    }

    /// Channel ids, `None` if the header did not list any.
    pub fn channel_ids(&self) -> Option<&[i64]> {
        self.get(keys::CHANNEL_IDS).and_then(|v| v.as_i64_list())
    }

    pub fn channel_names(&self) -> &[String] {
        self.get(keys::CHANNEL_NAMES)
            .and_then(|v| v.as_str_list())
            .unwrap_or_default()
    }

    /// Number of channels, 1 when the header did not list channel ids.
    pub fn num_channels(&self) -> usize {
        self.get(keys::CHANNEL_IDS).map_or(0, |v| v.len())
    }

    /// Conversion factor per channel from AD bits to microvolts.
    pub fn bit_to_microvolt(&self) -> Option<&[f64]> {
        self.get(keys::BIT_TO_MICROVOLT).and_then(|v| v.as_f64_list())
    }

    pub fn input_ranges(&self) -> Option<&[i64]> {
        self.get(keys::INPUT_RANGE).and_then(|v| v.as_i64_list())
    }

    pub fn sampling_rate(&self) -> Option<f64> {
        self.get(keys::SAMPLING_RATE).and_then(|v| v.as_f64())
    }

    pub fn input_inverted(&self) -> Option<bool> {
        self.get(keys::INPUT_INVERTED).and_then(|v| v.as_bool())
    }

    pub fn recording_opened(&self) -> Option<NaiveDateTime> {
        self.get(keys::RECORDING_OPENED).and_then(|v| v.as_timestamp())
    }

    pub fn recording_closed(&self) -> Option<NaiveDateTime> {
        self.get(keys::RECORDING_CLOSED).and_then(|v| v.as_timestamp())
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.properties.get_str(keys::ORIGINAL_FILENAME)
    }

    /// Acquisition type of the recording, see [`AcquisitionType::classify`].
    pub fn type_of_recording(&self) -> Result<AcquisitionType, NlxError> {
        AcquisitionType::classify(&self.properties)
    }

    /// Properties as a JSON object, in header order.
    pub fn to_json(&self) -> Result<String, NlxError> {
        Ok(serde_json::to_string_pretty(&self.properties)?)
    }
}

/// Resolves the dialect from the application name and version and stores the open and close
/// times and original file name it finds.
fn read_time_date(properties: &mut HeaderProperties, text: &str) -> Result<DialectResolution, NlxError> {
    let name = properties
        .get_str(keys::APPLICATION_NAME)
        .unwrap_or_default();
    let version = match properties.get(keys::APPLICATION_VERSION).and_then(|v| v.as_version()) {
        Some(v) => v,
        None => return Err(NlxError::Unknown(String::from("no application version in header"))),
    };
    let resolution = resolve_dialect(name, version);
    let dialect = resolution.dialect;

    let times = dialect.read_times(
        text,
        &resolution.application_name,
        &resolution.application_version,
    )?;
    properties.insert(keys::RECORDING_OPENED, PropertyValue::Timestamp(times.opened));
    if let Some(closed) = times.closed {
        properties.insert(keys::RECORDING_CLOSED, PropertyValue::Timestamp(closed));
    }
    if let Some(filename) = dialect.read_filename(text)? {
        properties.insert(keys::ORIGINAL_FILENAME, PropertyValue::Text(filename));
    }
    Ok(resolution)
}

impl fmt::Display for NlxHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.dialect {
            Some(d) => writeln!(
                f,
                "{} {} header ({} dialect)",
                d.application_name, d.application_version, d.dialect
            )?,
            None => writeln!(f, "{} header", self.application_name())?,
        }
        for (name, value) in self.properties.iter() {
            writeln!(f, "{:>24}: {}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEURAVIEW: &str = "######## Neuralynx Data File Header\r\n\
        ## File Name: L:\\Recording\\2015-06-24_18-05-11\\NeuraviewEventMarkers.nev\r\n\
        ## Date Opened: (mm/dd/yyy): 12/14/2015 At Time: 15:58:32\r\n\
        ## Date Closed: (mm/dd/yyy): 12/14/2015 At Time: 16:02:10\r\n";

    #[test]
    fn neuraview_header() -> Result<(), NlxError> {
        let header = NlxHeader::from_text(NEURAVIEW, HeaderOptions::strict())?;
        assert_eq!("Neuraview", header.application_name());
        assert_eq!(Some(&AppVersion::new(&[2])), header.application_version());
        assert_eq!(None, header.channel_ids());
        assert_eq!(1, header.num_channels());
        assert_eq!(&[String::from("unknown")], header.channel_names());
        let opened = header.recording_opened().unwrap();
        assert_eq!("2015-12-14 15:58:32", opened.to_string());
        let closed = header.recording_closed().unwrap();
        assert_eq!("2015-12-14 16:02:10", closed.to_string());
        assert_eq!(
            Some("L:\\Recording\\2015-06-24_18-05-11\\NeuraviewEventMarkers.nev"),
            header.original_filename()
        );
        assert_eq!(AcquisitionType::Unknown, header.type_of_recording()?);
        Ok(())
    }

    #[test]
    fn props_only_skips_times() -> Result<(), NlxError> {
        let text = "## old header without marker\n-CheetahRev 1.3.0\n";
        assert!(NlxHeader::from_text(text, HeaderOptions::strict()).is_err());
        let header = NlxHeader::from_text(text, HeaderOptions::props_only())?;
        assert_eq!("Cheetah", header.application_name());
        assert!(header.dialect.is_none());
        assert!(header.get(keys::RECORDING_OPENED).is_none());
        Ok(())
    }

    #[test]
    fn missing_open_time_fails() {
        let text = "########\n-ApplicationName Cheetah \"6.3.2\"\n";
        match NlxHeader::from_text(text, HeaderOptions::strict()) {
            Err(NlxError::MissingTimestamp(which, app, version)) => {
                assert_eq!("open", which);
                assert_eq!("Cheetah", app);
                assert_eq!("6.3.2", version);
            }
            other => panic!("expected missing open time, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_open_time_kept_as_none() -> Result<(), NlxError> {
        let text = "########\n-ApplicationName Pegasus \"2.1.1\"\n\
            -TimeCreated 2019/06/28 late\n-TimeClosed 2019/06/28 17:45:48\n";
        let header = NlxHeader::from_text(text, HeaderOptions::strict())?;
        assert_eq!(Some(&PropertyValue::Timestamp(None)), header.get(keys::RECORDING_OPENED));
        assert!(header.recording_closed().is_some());
        Ok(())
    }

    #[test]
    fn display_lists_properties() -> Result<(), NlxError> {
        let header = NlxHeader::from_text(NEURAVIEW, HeaderOptions::strict())?;
        let shown = header.to_string();
        assert!(shown.starts_with("Neuraview 2 header (neuraview2 dialect)\n"));
        assert!(shown.contains("         ApplicationName: Neuraview\n"));
        Ok(())
    }

    #[test]
    fn json() -> Result<(), NlxError> {
        let header = NlxHeader::from_text(NEURAVIEW, HeaderOptions::strict())?;
        let json: serde_json::Value = serde_json::from_str(&header.to_json()?)?;
        assert_eq!("Neuraview", json["ApplicationName"]);
        assert_eq!("2015-12-14T15:58:32", json["recording_opened"]);
        Ok(())
    }
}
