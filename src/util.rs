use anyhow::{Context, Result, anyhow};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

/// Creates the parent directory of `path`, if it has one.
pub fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn hash_file(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open file: {}", path.display()))?;
    let mut h = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        h.update(&buf[..n]);
    }
    Ok(format!("{:x}", h.finalize()))
}

/// Formats a sample timestamp the way the data file stores it. Fractional
/// seconds are written only when present.
pub fn format_timestamp(ts: PrimitiveDateTime) -> String {
    let formatted = if ts.nanosecond() == 0 {
        ts.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
    } else {
        ts.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"
        ))
    };
    formatted.unwrap_or_else(|_| ts.to_string())
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or the `T`-separated form, both with
/// optional fractional seconds, and RFC 3339 with an offset (converted to
/// UTC).
pub fn parse_timestamp(raw: &str) -> Result<PrimitiveDateTime> {
    let raw = raw.trim();
    PrimitiveDateTime::parse(
        raw,
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
        ),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
            ),
        )
    })
    .or_else(|_| {
        OffsetDateTime::parse(raw, &Rfc3339).map(|dt| {
            let utc = dt.to_offset(UtcOffset::UTC);
            PrimitiveDateTime::new(utc.date(), utc.time())
        })
    })
    .map_err(|e| anyhow!("invalid timestamp {raw:?}: {e}"))
}
