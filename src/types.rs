// src/types.rs

//! Small value types shared by configuration, execution and scheduling.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{JobdagError, Result};

/// Command execution runtime.
///
/// Exactly one backend is active per run; individual call sites may still
/// override it (see `JobContext::check_output_with`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Backend {
    /// Image-based container engine (`docker run`).
    #[serde(rename = "docker", alias = "image")]
    ImageRuntime,
    /// Lightweight sandbox engine (`singularity exec`).
    #[serde(rename = "singularity", alias = "sandbox")]
    SandboxRuntime,
    /// Plain host process.
    #[serde(rename = "subprocess", alias = "direct", alias = "process")]
    DirectProcess,
}

impl Backend {
    /// Probe order used when no backend is configured explicitly.
    pub const PRIORITY: [Backend; 3] = [
        Backend::ImageRuntime,
        Backend::SandboxRuntime,
        Backend::DirectProcess,
    ];

    /// Executable that must be on `PATH` for this backend, if any.
    pub fn executable(self) -> Option<&'static str> {
        match self {
            Backend::ImageRuntime => Some("docker"),
            Backend::SandboxRuntime => Some("singularity"),
            Backend::DirectProcess => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::ImageRuntime => "docker",
            Backend::SandboxRuntime => "singularity",
            Backend::DirectProcess => "subprocess",
        };
        f.write_str(s)
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" | "image" => Ok(Backend::ImageRuntime),
            "singularity" | "sandbox" => Ok(Backend::SandboxRuntime),
            "subprocess" | "direct" | "process" => Ok(Backend::DirectProcess),
            other => Err(format!(
                "invalid backend: {other} (expected \"docker\", \"singularity\" or \"subprocess\")"
            )),
        }
    }
}

static MEMORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)\s*(\d+(?:\.\d+)?)\s*([kmgtp]?)(i?)b?\s*$").expect("valid memory regex")
});

/// Memory amount in bytes. Always strictly positive.
///
/// Parsed from human-readable strings such as `"1G"`, `"512M"`, `"2Gi"` or a
/// plain byte count. Unit suffixes are binary (`1K == 1024`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemorySize(u64);

impl MemorySize {
    pub const KIB: u64 = 1024;
    pub const MIB: u64 = 1024 * 1024;
    pub const GIB: u64 = 1024 * 1024 * 1024;

    pub fn from_bytes(bytes: u64) -> Result<Self> {
        if bytes == 0 {
            return Err(JobdagError::InvalidResources(
                "memory request must be > 0".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn gib(n: u64) -> Self {
        Self(n.max(1) * Self::GIB)
    }

    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u64, &str); 4] = [
            (1024 * 1024 * 1024 * 1024, "T"),
            (MemorySize::GIB, "G"),
            (MemorySize::MIB, "M"),
            (MemorySize::KIB, "K"),
        ];
        for (size, suffix) in UNITS {
            if self.0 % size == 0 {
                return write!(f, "{}{}", self.0 / size, suffix);
            }
        }
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemorySize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = MEMORY_RE
            .captures(s)
            .ok_or_else(|| format!("invalid memory size: {s:?} (expected e.g. \"1G\" or \"512M\")"))?;

        let value: f64 = caps[1]
            .parse()
            .map_err(|e| format!("invalid memory size {s:?}: {e}"))?;
        let multiplier = match caps[2].to_lowercase().as_str() {
            "" => 1u64,
            "k" => Self::KIB,
            "m" => Self::MIB,
            "g" => Self::GIB,
            "t" => Self::GIB * 1024,
            _ => Self::GIB * 1024 * 1024,
        };

        let bytes = (value * multiplier as f64).round() as u64;
        MemorySize::from_bytes(bytes).map_err(|e| format!("invalid memory size {s:?}: {e}"))
    }
}

impl<'de> Deserialize<'de> for MemorySize {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => MemorySize::from_bytes(n).map_err(serde::de::Error::custom),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Resource request of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub cores: u32,
    pub memory: MemorySize,
}

impl Resources {
    pub fn new(cores: u32, memory: MemorySize) -> Result<Self> {
        if cores == 0 {
            return Err(JobdagError::InvalidResources(
                "core request must be >= 1 (got 0)".to_string(),
            ));
        }
        Ok(Self { cores, memory })
    }
}

impl Default for Resources {
    /// One core and one gigabyte, the request used by the stock pipeline.
    fn default() -> Self {
        Self {
            cores: 1,
            memory: MemorySize::gib(1),
        }
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} core(s), {}", self.cores, self.memory)
    }
}
