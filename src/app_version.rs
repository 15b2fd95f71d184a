use crate::nlx_error::NlxError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref PARSE_VERSION_REGEX: Regex = Regex::new(
        r"(?ix)^\s*
            v?                                          # optional leading v
            (?P<release>\d+(?:\.\d+)*)                  # numeric release, 1.2.3...
            (?:
                [-_.]?
                (?P<tag>dev|alpha|a|beta|b|rc|c|preview|pre)
                [-_.]?
                (?P<num>\d+)?                           # pre-release number, default 0
            )?
            (?:
                [-_.]?
                (?P<post_tag>post|rev|r)
                [-_.]?
                (?P<post>\d+)?                          # post-release number, default 0
            )?
            (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?   # local label, 1.0+build.3
        \s*$"
    )
    .unwrap();
}

/// Pre-release marker. Variant order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Dev(u64),
    Alpha(u64),
    Beta(u64),
    Rc(u64),
}

/// Version of the application that wrote a header, e.g. `5.7.4` or `6.4.1.dev0`.
///
/// Release components compare numerically with missing trailing components treated as zero, so
/// `2` equals `2.0`. A pre-release always orders before the release with the same numbers.
#[derive(Debug, Clone)]
pub struct AppVersion {
    release: Vec<u64>,
    pre: Option<PreRelease>,
    post: Option<u64>,
    local: Option<String>,
}

impl AppVersion {
    pub fn new(release: &[u64]) -> AppVersion {
        AppVersion {
            release: release.to_vec(),
            pre: None,
            post: None,
            local: None,
        }
    }

    pub fn with_pre_release(release: &[u64], pre: PreRelease) -> AppVersion {
        AppVersion {
            release: release.to_vec(),
            pre: Some(pre),
            post: None,
            local: None,
        }
    }

    pub fn parse(text: &str) -> Result<AppVersion, NlxError> {
        let captures = match PARSE_VERSION_REGEX.captures(text) {
            Some(c) => c,
            None => return Err(NlxError::BadVersion(text.to_string())),
        };
        let mut release = Vec::new();
        if let Some(r) = captures.name("release") {
            for part in r.as_str().split('.') {
                let n = part
                    .parse::<u64>()
                    .map_err(|_| NlxError::BadVersion(text.to_string()))?;
                release.push(n);
            }
        }
        let num = match captures.name("num") {
            Some(n) => n
                .as_str()
                .parse::<u64>()
                .map_err(|_| NlxError::BadVersion(text.to_string()))?,
            None => 0,
        };
        let pre = match captures.name("tag") {
            Some(tag) => match tag.as_str().to_ascii_lowercase().as_str() {
                "dev" => Some(PreRelease::Dev(num)),
                "a" | "alpha" => Some(PreRelease::Alpha(num)),
                "b" | "beta" => Some(PreRelease::Beta(num)),
                _ => Some(PreRelease::Rc(num)),
            },
            None => None,
        };
        let post = match (captures.name("post_tag"), captures.name("post")) {
            (Some(_), Some(n)) => Some(
                n.as_str()
                    .parse::<u64>()
                    .map_err(|_| NlxError::BadVersion(text.to_string()))?,
            ),
            (Some(_), None) => Some(0),
            _ => None,
        };
        let local = captures.name("local").map(|l| l.as_str().to_ascii_lowercase());
        Ok(AppVersion {
            release,
            pre,
            post,
            local,
        })
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre_release(&self) -> Option<PreRelease> {
        self.pre
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }

    pub fn post_release(&self) -> Option<u64> {
        self.post
    }

    /// Local label after `+`, lower cased.
    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    fn component(&self, i: usize) -> u64 {
        self.release.get(i).copied().unwrap_or(0)
    }
}

impl FromStr for AppVersion {
    type Err = NlxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppVersion::parse(s)
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        let pre = match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        };
        // a missing post release or local label sorts first
        pre.then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AppVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AppVersion {}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        match self.pre {
            Some(PreRelease::Dev(n)) => write!(f, ".dev{}", n)?,
            Some(PreRelease::Alpha(n)) => write!(f, "a{}", n)?,
            Some(PreRelease::Beta(n)) => write!(f, "b{}", n)?,
            Some(PreRelease::Rc(n)) => write!(f, "rc{}", n)?,
            None => {}
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{}", local)?;
        }
        Ok(())
    }
}

impl Serialize for AppVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
