use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::app_version::AppVersion;
use crate::nlx_error::NlxError;

/// The closed set of properties this crate interprets. Any other `-Key value` line the rule
/// table recognizes is kept as a [`PropertyName::PassThrough`] under its literal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    ChannelNames,
    ChannelIds,
    SamplingRate,
    BitToMicroVolt,
    InputInverted,
    InputRange,
    FileType,
    FileVersion,
    HardwareSubSystemType,
    AcquisitionSystem,
    NlxBaseClassType,
    CheetahRev,
    ApplicationName,
    ApplicationVersion,
    RecordingOpened,
    RecordingClosed,
    OriginalFilename,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 17] = [
        PropertyKey::ChannelNames,
        PropertyKey::ChannelIds,
        PropertyKey::SamplingRate,
        PropertyKey::BitToMicroVolt,
        PropertyKey::InputInverted,
        PropertyKey::InputRange,
        PropertyKey::FileType,
        PropertyKey::FileVersion,
        PropertyKey::HardwareSubSystemType,
        PropertyKey::AcquisitionSystem,
        PropertyKey::NlxBaseClassType,
        PropertyKey::CheetahRev,
        PropertyKey::ApplicationName,
        PropertyKey::ApplicationVersion,
        PropertyKey::RecordingOpened,
        PropertyKey::RecordingClosed,
        PropertyKey::OriginalFilename,
    ];

    /// Name the property is stored and serialized under.
    pub const fn name(self) -> &'static str {
        match self {
            PropertyKey::ChannelNames => "channel_names",
            PropertyKey::ChannelIds => "channel_ids",
            PropertyKey::SamplingRate => "sampling_rate",
            PropertyKey::BitToMicroVolt => "bit_to_microVolt",
            PropertyKey::InputInverted => "input_inverted",
            PropertyKey::InputRange => "InputRange",
            PropertyKey::FileType => "FileType",
            PropertyKey::FileVersion => "FileVersion",
            PropertyKey::HardwareSubSystemType => "HardwareSubSystemType",
            PropertyKey::AcquisitionSystem => "AcquisitionSystem",
            PropertyKey::NlxBaseClassType => "NLX_Base_Class_Type",
            PropertyKey::CheetahRev => "CheetahRev",
            PropertyKey::ApplicationName => "ApplicationName",
            PropertyKey::ApplicationVersion => "ApplicationVersion",
            PropertyKey::RecordingOpened => "recording_opened",
            PropertyKey::RecordingClosed => "recording_closed",
            PropertyKey::OriginalFilename => "original_filename",
        }
    }

    pub fn from_name(name: &str) -> Option<PropertyKey> {
        PropertyKey::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl AsRef<str> for PropertyKey {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Key of a stored property, either canonical or the literal header key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyName {
    Canonical(PropertyKey),
    PassThrough(String),
}

impl PropertyName {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyName::Canonical(key) => key.name(),
            PropertyName::PassThrough(name) => name,
        }
    }

    pub fn key(&self) -> Option<PropertyKey> {
        match self {
            PropertyName::Canonical(key) => Some(*key),
            PropertyName::PassThrough(_) => None,
        }
    }
}

impl From<PropertyKey> for PropertyName {
    fn from(key: PropertyKey) -> Self {
        PropertyName::Canonical(key)
    }
}

impl From<&str> for PropertyName {
    fn from(name: &str) -> Self {
        match PropertyKey::from_name(name) {
            Some(key) => PropertyName::Canonical(key),
            None => PropertyName::PassThrough(name.to_string()),
        }
    }
}

/// [`PropertyKey`] names as string constants.
pub mod keys {
    use super::PropertyKey;

    pub const CHANNEL_NAMES: &str = PropertyKey::ChannelNames.name();
    pub const CHANNEL_IDS: &str = PropertyKey::ChannelIds.name();
    pub const SAMPLING_RATE: &str = PropertyKey::SamplingRate.name();
    pub const BIT_TO_MICROVOLT: &str = PropertyKey::BitToMicroVolt.name();
    pub const INPUT_INVERTED: &str = PropertyKey::InputInverted.name();
    pub const INPUT_RANGE: &str = PropertyKey::InputRange.name();
    pub const FILE_TYPE: &str = PropertyKey::FileType.name();
    pub const FILE_VERSION: &str = PropertyKey::FileVersion.name();
    pub const HARDWARE_SUBSYSTEM_TYPE: &str = PropertyKey::HardwareSubSystemType.name();
    pub const ACQUISITION_SYSTEM: &str = PropertyKey::AcquisitionSystem.name();
    pub const NLX_BASE_CLASS_TYPE: &str = PropertyKey::NlxBaseClassType.name();
    pub const CHEETAH_REV: &str = PropertyKey::CheetahRev.name();
    pub const APPLICATION_NAME: &str = PropertyKey::ApplicationName.name();
    pub const APPLICATION_VERSION: &str = PropertyKey::ApplicationVersion.name();
    pub const RECORDING_OPENED: &str = PropertyKey::RecordingOpened.name();
    pub const RECORDING_CLOSED: &str = PropertyKey::RecordingClosed.name();
    pub const ORIGINAL_FILENAME: &str = PropertyKey::OriginalFilename.name();
}

/// Channel id and name used when the header does not list channels.
pub const UNKNOWN_CHANNEL: &str = "unknown";

const DEVELOPMENT_MARKER: &str = " Development";
const DEVELOPMENT_SUFFIX: &str = ".dev0";

/// How the raw text of a matched property is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Identity,
    Float,
    Integer,
    /// Only the literals `True` and `False` are accepted.
    Bool,
}

impl Converter {
    pub fn convert(&self, name: &str, raw: &str) -> Result<PropertyValue, NlxError> {
        match self {
            Converter::Identity => Ok(PropertyValue::Text(raw.to_string())),
            Converter::Float => Ok(PropertyValue::Float(parse_number(name, raw)?)),
            Converter::Integer => Ok(PropertyValue::Integer(parse_number(name, raw)?)),
            Converter::Bool => match raw {
                "True" => Ok(PropertyValue::Bool(true)),
                "False" => Ok(PropertyValue::Bool(false)),
                _ => Err(NlxError::BadBool(name.to_string(), raw.to_string())),
            },
        }
    }
}

/// One entry of the property rule table.
#[derive(Debug, Clone, Copy)]
pub struct PropertyRule {
    /// Regex fragment for the key, matched after a literal `-`.
    pub key_pattern: &'static str,
    /// Key the value is stored under, or `None` to keep the matched key text.
    pub name: Option<PropertyKey>,
    pub converter: Converter,
}

const fn rule(key_pattern: &'static str, name: Option<PropertyKey>, converter: Converter) -> PropertyRule {
    PropertyRule {
        key_pattern,
        name,
        converter,
    }
}

const fn raw(key_pattern: &'static str) -> PropertyRule {
    rule(key_pattern, None, Converter::Identity)
}

/// Properties extracted from the header, in application order. A later rule writing the same
/// name replaces the earlier value in place.
pub const PROPERTY_RULES: &[PropertyRule] = &[
    rule("AcqEntName", Some(PropertyKey::ChannelNames), Converter::Identity),
    raw("FileType"),
    raw("FileVersion"),
    raw("RecordSize"),
    raw("HardwareSubSystemName"),
    raw("HardwareSubSystemType"),
    rule("SamplingFrequency", Some(PropertyKey::SamplingRate), Converter::Float),
    raw("ADMaxValue"),
    rule("ADBitVolts", Some(PropertyKey::BitToMicroVolt), Converter::Identity),
    raw("NumADChannels"),
    rule("ADChannel", Some(PropertyKey::ChannelIds), Converter::Identity),
    raw("InputRange"),
    rule("InputInverted", Some(PropertyKey::InputInverted), Converter::Bool),
    raw("DSPLowCutFilterEnabled"),
    raw("DspLowCutFrequency"),
    raw("DspLowCutNumTaps"),
    raw("DspLowCutFilterType"),
    raw("DSPHighCutFilterEnabled"),
    raw("DspHighCutFrequency"),
    raw("DspHighCutNumTaps"),
    raw("DspHighCutFilterType"),
    raw("DspDelayCompensation"),
    raw("DspFilterDelay_µs"),
    raw("DisabledSubChannels"),
    rule("WaveformLength", None, Converter::Integer),
    raw("AlignmentPt"),
    raw("ThreshVal"),
    raw("MinRetriggerSamples"),
    raw("SpikeRetriggerTime"),
    raw("DualThresholding"),
    raw(r"Feature \w+ \d+"),
    raw("SessionUUID"),
    raw("FileUUID"),
    raw("CheetahRev"), // older Cheetah only
    raw("ProbeName"),
    raw("OriginalFileName"),
    raw("TimeCreated"),
    raw("TimeClosed"),
    raw("ApplicationName"), // name and quoted version
    raw("AcquisitionSystem"),
    raw("ReferenceChannel"),
    raw("NLX_Base_Class_Type"), // Cheetah 4 and earlier, BML
];

lazy_static! {
    static ref PROPERTY_REGEXES: Vec<Regex> = PROPERTY_RULES
        .iter()
        .map(|r| Regex::new(&format!(r"-(?P<name>{})\s+(?P<value>[\S ]*)", r.key_pattern)).unwrap())
        .collect();
    static ref APPLICATION_NAME_REGEX: Regex = Regex::new(r#"(\S*) "([\S ]*)""#).unwrap();
    static ref WORD_REGEX: Regex = Regex::new(r"\w+").unwrap();
}

/// A typed header property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Float(f64),
    Integer(i64),
    Bool(bool),
    IntegerList(Vec<i64>),
    FloatList(Vec<f64>),
    TextList(Vec<String>),
    Version(AppVersion),
    /// `None` when the header had the timestamp line but its date could not be parsed.
    Timestamp(Option<NaiveDateTime>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64_list(&self) -> Option<&[i64]> {
        match self {
            PropertyValue::IntegerList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64_list(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::FloatList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::TextList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_version(&self) -> Option<&AppVersion> {
        match self {
            PropertyValue::Version(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            PropertyValue::Timestamp(t) => *t,
            _ => None,
        }
    }

    /// Number of entries for list values, 1 for anything else.
    pub fn len(&self) -> usize {
        match self {
            PropertyValue::IntegerList(v) => v.len(),
            PropertyValue::FloatList(v) => v.len(),
            PropertyValue::TextList(v) => v.len(),
            _ => 1,
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => write!(f, "{}", s),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Integer(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::IntegerList(v) => write!(f, "[{}]", join(v)),
            PropertyValue::FloatList(v) => write!(f, "[{}]", join(v)),
            PropertyValue::TextList(v) => write!(f, "[{}]", join(v)),
            PropertyValue::Version(v) => write!(f, "{}", v),
            PropertyValue::Timestamp(Some(t)) => write!(f, "{}", t),
            PropertyValue::Timestamp(None) => write!(f, "None"),
        }
    }
}

/// Parsed header properties, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderProperties {
    entries: Vec<(PropertyName, PropertyValue)>,
}

impl HeaderProperties {
    pub fn new() -> HeaderProperties {
        HeaderProperties {
            entries: Vec::new(),
        }
    }

    /// Extracts properties from header text and applies the channel, application version,
    /// bit to microvolt and input range passes.
    pub fn from_text(text: &str) -> Result<HeaderProperties, NlxError> {
        let mut props = HeaderProperties::read_properties(text)?;
        let num_channels = props.convert_channel_ids_names()?;
        props.set_application_and_version()?;
        props.set_bit_to_microvolt(num_channels)?;
        props.set_input_ranges(num_channels)?;
        log::debug!("parsed {} header properties", props.len());
        Ok(props)
    }

    /// Looks a property up by [`PropertyKey`] or by its literal name.
    pub fn get<K: AsRef<str>>(&self, name: K) -> Option<&PropertyValue> {
        let name = name.as_ref();
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// Text value of a property, `None` if absent or not text.
    pub fn get_str<K: AsRef<str>>(&self, name: K) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    pub fn contains<K: AsRef<str>>(&self, name: K) -> bool {
        self.get(name).is_some()
    }

    /// Sets a property, replacing any existing value without changing its position. Names of
    /// canonical properties are stored as their [`PropertyKey`].
    pub fn insert<N: Into<PropertyName>>(&mut self, name: N, value: PropertyValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| k.as_str() == name.as_str()) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Canonical keys present, in insertion order.
    pub fn canonical_keys(&self) -> impl Iterator<Item = PropertyKey> + '_ {
        self.entries.iter().filter_map(|(k, _)| k.key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn read_properties(text: &str) -> Result<HeaderProperties, NlxError> {
        let mut props = HeaderProperties::new();
        for (rule, regex) in PROPERTY_RULES.iter().zip(PROPERTY_REGEXES.iter()) {
            for captures in regex.captures_iter(text) {
                let key = captures.name("name").map_or("", |m| m.as_str());
                let raw = captures.name("value").map_or("", |m| m.as_str()).trim_end_matches(' ');
                let name = rule.name.map_or(key, |k| k.name());
                let value = rule.converter.convert(name, raw)?;
                props.insert(name, value);
            }
        }
        Ok(props)
    }

    /// Converts channel ids to integers and expands channel names to one per channel.
    /// Returns the channel count.
    fn convert_channel_ids_names(&mut self) -> Result<usize, NlxError> {
        let num_channels = match self.get_str(keys::CHANNEL_IDS).map(str::to_string) {
            Some(raw_ids) => {
                let ids = raw_ids
                    .split_whitespace()
                    .map(|id| parse_number::<i64>(keys::CHANNEL_IDS, id))
                    .collect::<Result<Vec<_>, _>>()?;
                let n = ids.len();
                self.insert(keys::CHANNEL_IDS, PropertyValue::IntegerList(ids));
                n
            }
            None => {
                self.insert(
                    keys::CHANNEL_IDS,
                    PropertyValue::TextList(vec![UNKNOWN_CHANNEL.to_string()]),
                );
                1
            }
        };

        let names = match self.get_str(keys::CHANNEL_NAMES) {
            Some(raw_names) => {
                let names: Vec<String> = raw_names.split_whitespace().map(str::to_string).collect();
                replicate_single(names, num_channels)
            }
            None => vec![UNKNOWN_CHANNEL.to_string(); num_channels],
        };
        check_channel_count(keys::CHANNEL_NAMES, num_channels, names.len())?;
        self.insert(keys::CHANNEL_NAMES, PropertyValue::TextList(names));
        Ok(num_channels)
    }

    fn set_application_and_version(&mut self) -> Result<(), NlxError> {
        let (name, version_text) = if let Some(rev) = self.get_str(keys::CHEETAH_REV) {
            if let Some(app) = self.get_str(keys::APPLICATION_NAME) {
                return Err(NlxError::ConflictingApplicationName(rev.to_string(), app.to_string()));
            }
            (String::from("Cheetah"), rev.to_string())
        } else if let Some(app) = self.get_str(keys::APPLICATION_NAME) {
            let matches: Vec<_> = APPLICATION_NAME_REGEX.captures_iter(app).collect();
            if matches.len() != 1 {
                return Err(NlxError::AmbiguousApplicationName(app.to_string()));
            }
            (matches[0][1].to_string(), matches[0][2].to_string())
        } else if self.contains(keys::NLX_BASE_CLASS_TYPE) {
            (String::from("BML"), String::from("2.0"))
        } else {
            (String::from("Neuraview"), String::from("2"))
        };

        let version_text = version_text.replace(DEVELOPMENT_MARKER, DEVELOPMENT_SUFFIX);
        let version = AppVersion::parse(&version_text)?;
        self.insert(keys::APPLICATION_NAME, PropertyValue::Text(name));
        self.insert(keys::APPLICATION_VERSION, PropertyValue::Version(version));
        Ok(())
    }

    fn set_bit_to_microvolt(&mut self, num_channels: usize) -> Result<(), NlxError> {
        let raw = match self.get_str(keys::BIT_TO_MICROVOLT) {
            Some(raw) => raw.to_string(),
            None => return Ok(()),
        };
        let entries: Vec<&str> = raw.split_whitespace().collect();
        let values = replicate_single(entries, num_channels)
            .into_iter()
            .map(|e| parse_number::<f64>(keys::BIT_TO_MICROVOLT, e).map(|v| v * 1e6))
            .collect::<Result<Vec<_>, _>>()?;
        check_channel_count(keys::BIT_TO_MICROVOLT, num_channels, values.len())?;
        self.insert(keys::BIT_TO_MICROVOLT, PropertyValue::FloatList(values));
        Ok(())
    }

    fn set_input_ranges(&mut self, num_channels: usize) -> Result<(), NlxError> {
        let raw = match self.get_str(keys::INPUT_RANGE) {
            Some(raw) => raw.to_string(),
            None => return Ok(()),
        };
        let entries: Vec<&str> = WORD_REGEX.find_iter(&raw).map(|m| m.as_str()).collect();
        let ranges = replicate_single(entries, num_channels)
            .into_iter()
            .map(|e| parse_number::<i64>(keys::INPUT_RANGE, e))
            .collect::<Result<Vec<_>, _>>()?;
        check_channel_count(keys::INPUT_RANGE, num_channels, ranges.len())?;
        self.insert(keys::INPUT_RANGE, PropertyValue::IntegerList(ranges));
        Ok(())
    }
}

impl Serialize for HeaderProperties {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k.as_str(), v)?;
        }
        map.end()
    }
}

/// A single entry stands for every channel.
fn replicate_single<T: Clone>(entries: Vec<T>, num_channels: usize) -> Vec<T> {
    if entries.len() == 1 {
        vec![entries[0].clone(); num_channels]
    } else {
        entries
    }
}

fn check_channel_count(name: &str, expected: usize, found: usize) -> Result<(), NlxError> {
    if expected != found {
        return Err(NlxError::ChannelCountMismatch(name.to_string(), expected, found));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, NlxError> {
    raw.parse::<T>()
        .map_err(|_| NlxError::BadNumber(name.to_string(), raw.to_string()))
}
