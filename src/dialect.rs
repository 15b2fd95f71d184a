use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;

use crate::app_version::AppVersion;
use crate::nlx_error::NlxError;

/// Regex patterns and date formats for one historical header layout.
///
/// Open and close patterns capture `date` and `time`, the filename pattern captures `filename`.
/// Formats are applied to `"<date> <time>"`.
#[derive(Debug, PartialEq, Eq)]
pub struct DialectSpec {
    pub name: &'static str,
    pub open_pattern: &'static str,
    pub close_pattern: Option<&'static str>,
    pub filename_pattern: &'static str,
    pub datetime_format: &'static str,
    pub datetime2_format: Option<&'static str>,
}

/// BML acquisition
/// ```text
/// ######## Neuralynx Data File Header
/// ## File Name: null
/// ## Time Opened: (m/d/y): 12/11/15  At Time: 11:37:39.000
/// ```
pub const BML: DialectSpec = DialectSpec {
    name: "bml",
    open_pattern: r"## Time Opened: \(m/d/y\): (?P<date>\S+)  At Time: (?P<time>\S+)",
    close_pattern: None,
    filename_pattern: r"## File Name: (?P<filename>\S+)",
    datetime_format: "%m/%d/%y %H:%M:%S%.f",
    datetime2_format: None,
};

/// Cheetah 5 up to and including 5.4.0
/// ```text
/// ######## Neuralynx Data File Header
/// ## File Name C:\CheetahData\2000-01-01_00-00-00\CSC5.ncs
/// ## Time Opened (m/d/y): 1/01/2001  At Time: 0:00:00.000
/// ## Time Closed (m/d/y): 1/01/2001  At Time: 00:00:00.000
/// ```
pub const V540: DialectSpec = DialectSpec {
    name: "v5.4.0",
    open_pattern: r"## Time Opened \(m/d/y\): (?P<date>\S+)  At Time: (?P<time>\S+)",
    close_pattern: Some(r"## Time Closed \(m/d/y\): (?P<date>\S+)  At Time: (?P<time>\S+)"),
    filename_pattern: r"## File Name: (?P<filename>\S+)",
    datetime_format: "%m/%d/%Y %H:%M:%S%.f",
    datetime2_format: None,
};

/// Cheetah 1 and Cheetah 5 after 5.4.0 up to 5.6.4, except 5.6.0
/// ```text
/// ######## Neuralynx Data File Header
/// ## File Name C:\CheetahData\2016-11-28_21-50-00\CSC1.ncs
/// ## Time Opened (m/d/y): 11/28/2016  (h:m:s.ms) 21:50:33.322
/// ## Time Closed (m/d/y): 11/28/2016  (h:m:s.ms) 22:44:41.145
/// ```
pub const LEGACY_BRACKETED: DialectSpec = DialectSpec {
    name: "bv5.6.4",
    open_pattern: r"## Time Opened \(m/d/y\): (?P<date>\S+)  \(h:m:s\.ms\) (?P<time>\S+)",
    close_pattern: Some(r"## Time Closed \(m/d/y\): (?P<date>\S+)  \(h:m:s\.ms\) (?P<time>\S+)"),
    filename_pattern: r"## File Name (?P<filename>\S+)",
    datetime_format: "%m/%d/%Y %H:%M:%S%.f",
    datetime2_format: None,
};

/// Neuraview 2
/// ```text
/// ######## Neuralynx Data File Header
/// ## File Name: L:\Recording\2015-06-24_18-05-11\NeuraviewEventMarkers.nev
/// ## Date Opened: (mm/dd/yyy): 12/14/2015 At Time: 15:58:32
/// ## Date Closed: (mm/dd/yyy): 12/14/2015 At Time: 15:58:32
/// ```
pub const NEURAVIEW2: DialectSpec = DialectSpec {
    name: "neuraview2",
    open_pattern: r"## Date Opened: \(mm/dd/yyy\): (?P<date>\S+) At Time: (?P<time>\S+)",
    close_pattern: Some(r"## Date Closed: \(mm/dd/yyy\): (?P<date>\S+) At Time: (?P<time>\S+)"),
    filename_pattern: r"## File Name: (?P<filename>\S+)",
    datetime_format: "%m/%d/%Y %H:%M:%S",
    datetime2_format: None,
};

/// Pegasus and Cheetah after 5.6.4, dates are properties
/// ```text
/// ######## Neuralynx Data File Header
/// -OriginalFileName "C:\CheetahData\2017-02-16_17-55-55\CSC1.ncs"
/// -TimeCreated 2017/02/16 17:56:04
/// -TimeClosed 2017/02/16 18:01:18
/// ```
pub const PROPERTIES_EMBEDDED: DialectSpec = DialectSpec {
    name: "inProps",
    open_pattern: r"-TimeCreated (?P<date>\S+) (?P<time>\S+)",
    close_pattern: Some(r"-TimeClosed (?P<date>\S+) (?P<time>\S+)"),
    filename_pattern: r#"-OriginalFileName "?(?P<filename>[^\s"]+)"?"#,
    datetime_format: "%Y/%m/%d %H:%M:%S",
    datetime2_format: Some("%Y/%m/%d %H:%M:%S%.f"),
};

/// Cheetah 2 to 4 and 5.6.0, date in a `##` line with colons and no close time
/// ```text
/// ######## Neuralynx Data File Header
/// ## File Name: D:\Cheetah_Data\2003-10-4_10-2-58\CSC14.Ncs
/// ## Time Opened: (m/d/y): 10/4/2003  At Time: 10:3:0.578
/// ```
pub const IN_HEADER_COLON: DialectSpec = DialectSpec {
    name: "inHeader",
    open_pattern: r"## Time Opened: \(m/d/y\): (?P<date>\S+)  At Time: (?P<time>\S+)",
    close_pattern: None,
    filename_pattern: r"## File Name: (?P<filename>\S+)",
    datetime_format: "%m/%d/%y %H:%M:%S%.f",
    datetime2_format: Some("%m/%d/%Y %H:%M:%S%.f"),
};

pub const ALL_DIALECTS: [&DialectSpec; 6] = [
    &BML,
    &V540,
    &LEGACY_BRACKETED,
    &NEURAVIEW2,
    &PROPERTIES_EMBEDDED,
    &IN_HEADER_COLON,
];

lazy_static! {
    static ref DIALECT_REGEXES: HashMap<&'static str, Regex> = ALL_DIALECTS
        .iter()
        .flat_map(|d| {
            let mut patterns = vec![d.open_pattern, d.filename_pattern];
            patterns.extend(d.close_pattern);
            patterns
        })
        .map(|p| (p, Regex::new(p).unwrap()))
        .collect();
}

/// Searches with the precompiled regex for built-in patterns, compiling any other pattern on
/// the spot.
fn search<'t>(pattern: &str, text: &'t str) -> Result<Option<Captures<'t>>, NlxError> {
    if let Some(regex) = DIALECT_REGEXES.get(pattern) {
        return Ok(regex.captures(text));
    }
    let regex =
        Regex::new(pattern).map_err(|e| NlxError::BadPattern(pattern.to_string(), e.to_string()))?;
    Ok(regex.captures(text))
}

/// Python style `%S.%f` needs a fraction but chrono's `%.f` also takes none.
fn parse_date_time(dt: &str, format: &str) -> Option<NaiveDateTime> {
    if format.ends_with("%.f") && !dt.contains('.') {
        return None;
    }
    NaiveDateTime::parse_from_str(dt, format).ok()
}

fn date_time(captures: &Captures) -> String {
    let date = captures.name("date").map_or("", |m| m.as_str());
    let time = captures.name("time").map_or("", |m| m.as_str());
    format!("{} {}", date, time)
}

/// Open and close times read from a header.
///
/// `closed` is `None` when the dialect has no close line, `Some(None)` when the close line was
/// found but its date could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingTimes {
    pub opened: Option<NaiveDateTime>,
    pub closed: Option<Option<NaiveDateTime>>,
}

impl DialectSpec {
    /// Reads the open and close times.
    ///
    /// A missing open line or a missing close line (when the dialect defines one) is an error,
    /// but a date that does not parse is recorded as `None`.
    pub fn read_times(
        &self,
        text: &str,
        application_name: &str,
        application_version: &str,
    ) -> Result<RecordingTimes, NlxError> {
        let opened = match search(self.open_pattern, text)? {
            Some(captures) => {
                let dt = date_time(&captures);
                let parsed = parse_date_time(&dt, self.datetime_format)
                    .or_else(|| self.datetime2_format.and_then(|fmt| parse_date_time(&dt, fmt)));
                if parsed.is_none() {
                    log::warn!("unparseable open time `{}` in {} header", dt, self.name);
                }
                parsed
            }
            None => {
                return Err(NlxError::MissingTimestamp(
                    String::from("open"),
                    application_name.to_string(),
                    application_version.to_string(),
                ))
            }
        };

        // TODO: the close time only tries the primary format while the open time falls back
        // to datetime2_format, so fractional -TimeClosed values come back as None.
        let closed = match self.close_pattern {
            Some(pattern) => match search(pattern, text)? {
                Some(captures) => {
                    let dt = date_time(&captures);
                    let parsed = parse_date_time(&dt, self.datetime_format);
                    if parsed.is_none() {
                        log::warn!("unparseable close time `{}` in {} header", dt, self.name);
                    }
                    Some(parsed)
                }
                None => {
                    return Err(NlxError::MissingTimestamp(
                        String::from("close"),
                        application_name.to_string(),
                        application_version.to_string(),
                    ))
                }
            },
            None => None,
        };
        Ok(RecordingTimes { opened, closed })
    }

    /// File name recorded in the header, without surrounding quotes.
    pub fn read_filename(&self, text: &str) -> Result<Option<String>, NlxError> {
        Ok(search(self.filename_pattern, text)?
            .and_then(|c| c.name("filename").map(|m| m.as_str().trim_matches('"').to_string())))
    }
}

impl fmt::Display for DialectSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Dialect chosen for a header, together with the application name and version used to choose
/// it. Name and version are the normalized forms, e.g. `Unknown`/`NA` for an unrecognized
/// application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectResolution {
    pub dialect: &'static DialectSpec,
    pub application_name: String,
    pub application_version: String,
}

/// Selects the header dialect for an application name and version.
pub fn resolve_dialect(application_name: &str, version: &AppVersion) -> DialectResolution {
    let two = AppVersion::new(&[2]);
    let (dialect, name, version_text) = match application_name {
        "Cheetah" => {
            let dialect = if *version <= two {
                &LEGACY_BRACKETED
            } else if *version < AppVersion::new(&[5]) {
                &IN_HEADER_COLON
            } else if *version <= AppVersion::new(&[5, 4, 0]) {
                &V540
            } else if *version == AppVersion::new(&[5, 6, 0]) {
                &IN_HEADER_COLON
            } else if *version <= AppVersion::new(&[5, 6, 4]) {
                &LEGACY_BRACKETED
            } else {
                &PROPERTIES_EMBEDDED
            };
            (dialect, application_name, version.to_string())
        }
        "BML" => (&IN_HEADER_COLON, application_name, two.to_string()),
        "Neuraview" => (&NEURAVIEW2, application_name, two.to_string()),
        "Pegasus" => (&PROPERTIES_EMBEDDED, application_name, two.to_string()),
        _ => (&PROPERTIES_EMBEDDED, "Unknown", String::from("NA")),
    };
    log::debug!(
        "using {} header dialect for {} version {}",
        dialect,
        name,
        version_text
    );
    DialectResolution {
        dialect,
        application_name: name.to_string(),
        application_version: version_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dialect_for(name: &str, version: &str) -> Result<&'static DialectSpec, NlxError> {
        Ok(resolve_dialect(name, &AppVersion::parse(version)?).dialect)
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_milli_opt(h, mi, s, ms)
            .unwrap()
    }

    #[test]
    fn cheetah_versions() -> Result<(), NlxError> {
        assert_eq!(&LEGACY_BRACKETED, dialect_for("Cheetah", "1.3.0")?);
        assert_eq!(&LEGACY_BRACKETED, dialect_for("Cheetah", "2")?);
        assert_eq!(&IN_HEADER_COLON, dialect_for("Cheetah", "4.0.2")?);
        assert_eq!(&V540, dialect_for("Cheetah", "5.0")?);
        assert_eq!(&V540, dialect_for("Cheetah", "5.4.0")?);
        assert_eq!(&LEGACY_BRACKETED, dialect_for("Cheetah", "5.5.1")?);
        assert_eq!(&IN_HEADER_COLON, dialect_for("Cheetah", "5.6.0")?);
        assert_eq!(&LEGACY_BRACKETED, dialect_for("Cheetah", "5.6.3")?);
        assert_eq!(&LEGACY_BRACKETED, dialect_for("Cheetah", "5.6.4")?);
        assert_eq!(&PROPERTIES_EMBEDDED, dialect_for("Cheetah", "5.7.4.dev0")?);
        assert_eq!(&PROPERTIES_EMBEDDED, dialect_for("Cheetah", "6.4.1")?);
        Ok(())
    }

    #[test]
    fn other_applications() -> Result<(), NlxError> {
        let bml = resolve_dialect("BML", &AppVersion::parse("7.1")?);
        assert_eq!(&IN_HEADER_COLON, bml.dialect);
        assert_eq!("2", bml.application_version);
        assert_eq!(&NEURAVIEW2, dialect_for("Neuraview", "2")?);
        assert_eq!(&PROPERTIES_EMBEDDED, dialect_for("Pegasus", "2.1.1")?);
        let unknown = resolve_dialect("Cube", &AppVersion::new(&[1]));
        assert_eq!(&PROPERTIES_EMBEDDED, unknown.dialect);
        assert_eq!("Unknown", unknown.application_name);
        assert_eq!("NA", unknown.application_version);
        Ok(())
    }

    #[test]
    fn properties_times() -> Result<(), NlxError> {
        let text = "########\n-TimeCreated 2019/07/12 13:21:32\n-TimeClosed 2019/07/12 15:07:55\n";
        let times = PROPERTIES_EMBEDDED.read_times(text, "Cheetah", "6.3.2")?;
        assert_eq!(Some(at(2019, 7, 12, 13, 21, 32, 0)), times.opened);
        assert_eq!(Some(Some(at(2019, 7, 12, 15, 7, 55, 0))), times.closed);
        Ok(())
    }

    #[test]
    fn open_time_second_format() -> Result<(), NlxError> {
        let text = "-TimeCreated 2019/07/12 13:21:32.250\n-TimeClosed 2019/07/12 15:07:55.500\n";
        let times = PROPERTIES_EMBEDDED.read_times(text, "Pegasus", "2")?;
        assert_eq!(Some(at(2019, 7, 12, 13, 21, 32, 250)), times.opened);
        // close time has no second format
        assert_eq!(Some(None), times.closed);
        Ok(())
    }

    #[test]
    fn bracketed_times() -> Result<(), NlxError> {
        let text = "######## Neuralynx Data File Header\n\
            ## File Name C:\\CheetahData\\2013-11-29_17-05-05\\Tet3a.ncs\n\
            ## Time Opened (m/d/y): 11/29/2013  (h:m:s.ms) 17:5:16.793\n\
            ## Time Closed (m/d/y): 11/29/2013  (h:m:s.ms) 18:3:13.603\n";
        let times = LEGACY_BRACKETED.read_times(text, "Cheetah", "5.5.1")?;
        assert_eq!(Some(at(2013, 11, 29, 17, 5, 16, 793)), times.opened);
        assert_eq!(Some(Some(at(2013, 11, 29, 18, 3, 13, 603))), times.closed);
        assert_eq!(
            Some(String::from("C:\\CheetahData\\2013-11-29_17-05-05\\Tet3a.ncs")),
            LEGACY_BRACKETED.read_filename(text)?
        );
        Ok(())
    }

    #[test]
    fn missing_close_line() {
        let v540 = "## Time Opened (m/d/y): 1/01/2001  At Time: 0:00:00.000\n";
        match V540.read_times(v540, "Cheetah", "5.4.0") {
            Err(NlxError::MissingTimestamp(which, app, version)) => {
                assert_eq!("close", which);
                assert_eq!("Cheetah", app);
                assert_eq!("5.4.0", version);
            }
            other => panic!("expected missing close time, got {:?}", other),
        }
        let neuraview = "## Date Opened: (mm/dd/yyy): 12/14/2015 At Time: 15:58:32\n";
        assert!(matches!(
            NEURAVIEW2.read_times(neuraview, "Neuraview", "2"),
            Err(NlxError::MissingTimestamp(_, _, _))
        ));
    }

    #[test]
    fn no_close_pattern() -> Result<(), NlxError> {
        let text = "## Time Opened: (m/d/y): 12/11/15  At Time: 11:37:39.000\n";
        let times = IN_HEADER_COLON.read_times(text, "BML", "2")?;
        assert_eq!(Some(at(2015, 12, 11, 11, 37, 39, 0)), times.opened);
        assert_eq!(None, times.closed);
        Ok(())
    }

    #[test]
    fn four_digit_year_in_header() -> Result<(), NlxError> {
        let text = "## Time Opened: (m/d/y): 10/4/2003  At Time: 10:3:0.578\n";
        let times = IN_HEADER_COLON.read_times(text, "Cheetah", "4.0.2")?;
        assert_eq!(Some(at(2003, 10, 4, 10, 3, 0, 578)), times.opened);
        Ok(())
    }

    #[test]
    fn unparseable_open_time_is_none() -> Result<(), NlxError> {
        let text = "-TimeCreated 2019/13/45 99:99:99\n-TimeClosed 2019/07/12 15:07:55\n";
        let times = PROPERTIES_EMBEDDED.read_times(text, "Cheetah", "6.3.2")?;
        assert_eq!(None, times.opened);
        assert!(times.closed.is_some());
        Ok(())
    }

    #[test]
    fn missing_open_line() {
        let err = PROPERTIES_EMBEDDED
            .read_times("########\n", "Unknown", "NA")
            .unwrap_err();
        assert_eq!(
            "No matching header open date/time for application Unknown version NA",
            err.to_string()
        );
    }

    #[test]
    fn quoted_filename() -> Result<(), NlxError> {
        let text = "-OriginalFileName \"G:\\CheetahDataD\\2019-07-12_13-21-32\\CSC1.ncs\"\n";
        assert_eq!(
            Some(String::from("G:\\CheetahDataD\\2019-07-12_13-21-32\\CSC1.ncs")),
            PROPERTIES_EMBEDDED.read_filename(text)?
        );
        assert_eq!(None, NEURAVIEW2.read_filename(text)?);
        Ok(())
    }

    #[test]
    fn fraction_required() -> Result<(), NlxError> {
        let text = "## Time Opened (m/d/y): 1/01/2001  At Time: 0:00:00\n\
            ## Time Closed (m/d/y): 1/01/2001  At Time: 0:00:00.000\n";
        let times = V540.read_times(text, "Cheetah", "5.4.0")?;
        assert_eq!(None, times.opened);
        assert_eq!(Some(Some(at(2001, 1, 1, 0, 0, 0, 0))), times.closed);
        let bml = "## Time Opened: (m/d/y): 12/11/15  At Time: 11:37:39\n";
        assert_eq!(None, BML.read_times(bml, "BML", "2")?.opened);
        Ok(())
    }

    const CUSTOM: DialectSpec = DialectSpec {
        name: "custom",
        open_pattern: r"-Opened (?P<date>\S+) (?P<time>\S+)",
        close_pattern: None,
        filename_pattern: r"-File (?P<filename>\S+)",
        datetime_format: "%Y/%m/%d %H:%M:%S",
        datetime2_format: None,
    };

    #[test]
    fn dialect_outside_table() -> Result<(), NlxError> {
        let text = "-Opened 2020/01/02 03:04:05\n-File a.ncs\n";
        let times = CUSTOM.read_times(text, "X", "1")?;
        assert_eq!(Some(at(2020, 1, 2, 3, 4, 5, 0)), times.opened);
        assert_eq!(None, times.closed);
        assert_eq!(Some(String::from("a.ncs")), CUSTOM.read_filename(text)?);
        Ok(())
    }

    #[test]
    fn bad_dialect_pattern() {
        let broken = DialectSpec {
            open_pattern: r"-Opened (?P<date>\S+",
            ..CUSTOM
        };
        match broken.read_times("-Opened 2020/01/02 03:04:05\n", "X", "1") {
            Err(NlxError::BadPattern(pattern, _)) => assert_eq!(broken.open_pattern, pattern),
            other => panic!("expected bad pattern, got {:?}", other),
        }
    }
}
