use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Cheap `{mtime, size}` proxy for "file unchanged".
///
/// Equality is the only operation delta discovery relies on: two equal
/// signatures mean the file is presumed unchanged. A write that lands within
/// the filesystem's mtime resolution without changing the size produces a
/// false negative; higher layers tolerate that and re-sync on the next
/// window expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSignature {
    pub size: u64,
    pub mtime_nanos: u128,
}

impl FileSignature {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mtime_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self {
            size: metadata.len(),
            mtime_nanos,
        }
    }

    pub fn for_path(path: &Path) -> crate::Result<Self> {
        Ok(Self::from_metadata(&std::fs::metadata(path)?))
    }

    /// Modification time as a UTC timestamp, if representable.
    pub fn modified_utc(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.mtime_nanos / 1_000_000_000).ok()?;
        let nanos = (self.mtime_nanos % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::FileSignature;

    #[test]
    fn equality_is_field_wise() {
        let a = FileSignature {
            size: 100,
            mtime_nanos: 42,
        };
        assert_eq!(
            a,
            FileSignature {
                size: 100,
                mtime_nanos: 42
            }
        );
        assert_ne!(
            a,
            FileSignature {
                size: 140,
                mtime_nanos: 42
            }
        );
        assert_ne!(
            a,
            FileSignature {
                size: 100,
                mtime_nanos: 43
            }
        );
    }

    #[test]
    fn modified_utc_converts_nanos() {
        let sig = FileSignature {
            size: 1,
            mtime_nanos: 1_700_000_000_500_000_000,
        };
        let ts = sig.modified_utc().expect("timestamp in range");
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }
}
