//! Kubernetes resource quantity parsing.
//!
//! CPU quantities become millicores, memory quantities become whole megabytes
//! (MiB, truncated). Plain JSON numbers are taken to be in those units already.

use serde::{Deserialize, Deserializer};

use crate::core::errors::{KloadError, Result};

const BYTES_PER_MEGABYTE: f64 = (1u64 << 20) as f64;

/// Parse a CPU quantity (`250m`, `1`, `0.5`, `100u`, `5000n`) into millicores.
pub fn parse_cpu_millis(raw: &str) -> Result<f64> {
    let s = raw.trim();
    let (number, scale) = if let Some(n) = s.strip_suffix('m') {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix('u') {
        (n, 1e-3)
    } else if let Some(n) = s.strip_suffix('n') {
        (n, 1e-6)
    } else {
        (s, 1000.0)
    };
    Ok(parse_number(number, raw)? * scale)
}

/// Parse a memory quantity (`128Mi`, `1Gi`, `1G`, `500k`, raw bytes) into megabytes.
pub fn parse_memory_megabytes(raw: &str) -> Result<f64> {
    let s = raw.trim();
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let multiplier: f64 = match suffix {
        "" => 1.0,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0_f64.powi(4),
        "Pi" => 1024.0_f64.powi(5),
        "Ei" => 1024.0_f64.powi(6),
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        other => {
            return Err(KloadError::Serialization {
                context: "memory quantity",
                details: format!("unknown suffix {other:?} in {raw:?}"),
            });
        }
    };
    Ok(to_megabytes(parse_number(number, raw)? * multiplier))
}

/// Bytes to whole megabytes, truncating.
#[must_use]
pub fn to_megabytes(bytes: f64) -> f64 {
    (bytes / BYTES_PER_MEGABYTE).trunc()
}

fn parse_number(number: &str, raw: &str) -> Result<f64> {
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| KloadError::Serialization {
            context: "quantity",
            details: format!("not a quantity: {raw:?}"),
        })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrQuantity {
    Number(f64),
    Quantity(String),
}

pub(crate) fn de_cpu_millis<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrQuantity::deserialize(deserializer)? {
        NumberOrQuantity::Number(n) => Ok(n),
        NumberOrQuantity::Quantity(s) => parse_cpu_millis(&s).map_err(serde::de::Error::custom),
    }
}

pub(crate) fn de_memory_megabytes<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrQuantity::deserialize(deserializer)? {
        NumberOrQuantity::Number(n) => Ok(n),
        NumberOrQuantity::Quantity(s) => {
            parse_memory_megabytes(&s).map_err(serde::de::Error::custom)
        }
    }
}
