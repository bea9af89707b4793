//! Job files and the known-primes lists they point at.

use anyhow::Context;
use log::*;
use primes_core::{decode_gaps, KnownPrimes};
use serde::Deserialize;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Errors when loading a job file.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("failed to read job file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse job file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid version string {0:?}")]
    InvalidVersion(String),
    #[error("job version {found} is neither the latest ({latest}) nor compatible")]
    IncompatibleVersion { found: Version, latest: Version },
    #[error("empty range [{from}, {to}]")]
    InvalidRange { from: u64, to: u64 },
    #[error("a job needs at least one worker")]
    NoWorkers,
}

/// Job schema version, written `major.minor.patch` with an optional leading `v`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || JobError::InvalidVersion(s.to_string());

        let mut parts = s.strip_prefix('v').unwrap_or(s).split('.');
        let mut next = || -> Result<u8, JobError> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };

        let version = Version::new(next()?, next()?, next()?);

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(version)
    }
}

impl TryFrom<String> for Version {
    type Error = JobError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Accept `found` if it is the latest version or one of the `compatible` ones.
pub fn check_version(found: Version, latest: Version, compatible: &[Version]) -> Result<(), JobError> {
    if found == latest || compatible.contains(&found) {
        Ok(())
    } else {
        Err(JobError::IncompatibleVersion { found, latest })
    }
}

/// Versions this build accepts, handed to [`JobFile::load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobConfig {
    pub latest: Version,
    pub compatible: Vec<Version>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            latest: Version::new(1, 2, 0),
            compatible: Vec::new(),
        }
    }
}

/// A slice of an NCC file holding known primes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct KnownPrimesSource {
    pub path: PathBuf,
    /// Number of primes to decode.
    pub count: usize,
    /// Byte offset of the anchor record to start from.
    #[serde(default)]
    pub offset: u64,
}

impl KnownPrimesSource {
    /// Decode and validate the list.
    pub fn load(&self) -> anyhow::Result<KnownPrimes> {
        let primes = decode_gaps(&self.path, self.count, self.offset)
            .with_context(|| format!("Failed to decode {}", self.path.display()))?;

        let known = KnownPrimes::new(primes)
            .with_context(|| format!("Invalid known primes in {}", self.path.display()))?;

        info!(
            "Loaded {} known primes from {} (largest {:?})",
            known.len(),
            self.path.display(),
            known.last()
        );

        Ok(known)
    }
}

/// A scan described on disk.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct JobFile {
    pub version: Version,
    pub from: u64,
    pub to: u64,
    pub workers: Option<u32>,
    pub known_primes: Option<KnownPrimesSource>,
}

impl JobFile {
    /// Read, parse and validate a job file.
    pub fn load(path: impl AsRef<Path>, config: &JobConfig) -> Result<Self, JobError> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|source| JobError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let job: JobFile = toml::from_str(&contents).map_err(|source| JobError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        job.validate(config)?;
        debug!("Loaded job {} from {}", job.version, path.display());

        Ok(job)
    }

    fn validate(&self, config: &JobConfig) -> Result<(), JobError> {
        check_version(self.version, config.latest, &config.compatible)?;

        if self.from > self.to {
            return Err(JobError::InvalidRange {
                from: self.from,
                to: self.to,
            });
        }

        if self.workers == Some(0) {
            return Err(JobError::NoWorkers);
        }

        Ok(())
    }
}
