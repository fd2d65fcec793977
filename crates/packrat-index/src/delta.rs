use packrat_types::FileSignature;
use std::collections::HashMap;
use std::path::PathBuf;

/// Baseline signature map owned by one source's indexer.
pub type SignatureMap = HashMap<PathBuf, FileSignature>;

/// How much of the source tree one discovery pass enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryScope {
    /// Every candidate file under the source root.
    Full,
    /// A bounded recency window (top-K recently-modified subdirectories,
    /// or the last N dated folders, with a per-directory file cap).
    Recent,
}

/// Raw result of one enumeration pass, in the source's natural
/// newest-first order.
#[derive(Debug, Clone)]
pub struct Enumeration {
    pub scope: DiscoveryScope,
    pub files: Vec<(PathBuf, FileSignature)>,
    /// Directories actually visited. Under `Recent` scope, removal
    /// detection is limited to these subtrees.
    pub scanned_dirs: Vec<PathBuf>,
    /// A per-directory cap was hit; files outside the window may have
    /// changed without being observed.
    pub truncated: bool,
}

impl Enumeration {
    pub fn empty(scope: DiscoveryScope) -> Self {
        Self {
            scope,
            files: Vec::new(),
            scanned_dirs: Vec::new(),
            truncated: false,
        }
    }
}

/// Changed/removed file sets between two discovery passes.
///
/// Produced fresh on every pass, never mutated in place. `current_by_path`
/// reflects exactly the files observed in this pass for the scope scanned
/// and seeds the next pass's baseline (see [`DiscoveryDelta::next_baseline`]).
#[derive(Debug, Clone)]
pub struct DiscoveryDelta {
    /// Newest-first, in the enumeration's order.
    pub changed_files: Vec<PathBuf>,
    pub removed_paths: Vec<PathBuf>,
    pub current_by_path: SignatureMap,
    pub drift_detected: bool,
}

impl DiscoveryDelta {
    pub fn is_empty(&self) -> bool {
        self.changed_files.is_empty() && self.removed_paths.is_empty()
    }

    /// Fold this delta into `previous` to produce the next pass's baseline.
    ///
    /// A full pass replaces the baseline outright. A recent pass only
    /// observed its window, so out-of-window signatures are carried over
    /// and only observed removals are dropped.
    pub fn next_baseline(&self, scope: DiscoveryScope, previous: &SignatureMap) -> SignatureMap {
        match scope {
            DiscoveryScope::Full => self.current_by_path.clone(),
            DiscoveryScope::Recent => {
                let mut merged = previous.clone();
                for removed in &self.removed_paths {
                    merged.remove(removed);
                }
                for (path, sig) in &self.current_by_path {
                    merged.insert(path.clone(), *sig);
                }
                merged
            }
        }
    }
}

/// Compare a fresh enumeration against the previous baseline.
///
/// A file with a different or absent signature is changed. A baseline path
/// absent from the new enumeration is removed, except that under `Recent`
/// scope only paths inside the scanned subtrees count: a file outside this
/// pass's window is merely unobserved, not gone.
pub fn discover_delta(previous: &SignatureMap, enumeration: &Enumeration) -> DiscoveryDelta {
    let mut changed_files = Vec::new();
    let mut current_by_path = SignatureMap::with_capacity(enumeration.files.len());

    for (path, signature) in &enumeration.files {
        current_by_path.insert(path.clone(), *signature);
        if previous.get(path) != Some(signature) {
            changed_files.push(path.clone());
        }
    }

    let removed_paths = previous
        .keys()
        .filter(|path| !current_by_path.contains_key(*path))
        .filter(|path| match enumeration.scope {
            DiscoveryScope::Full => true,
            DiscoveryScope::Recent => enumeration
                .scanned_dirs
                .iter()
                .any(|dir| path.starts_with(dir)),
        })
        .cloned()
        .collect();

    DiscoveryDelta {
        changed_files,
        removed_paths,
        current_by_path,
        drift_detected: enumeration.truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(size: u64, mtime_nanos: u128) -> FileSignature {
        FileSignature { size, mtime_nanos }
    }

    fn enumeration(
        scope: DiscoveryScope,
        files: Vec<(&str, FileSignature)>,
        scanned_dirs: Vec<&str>,
    ) -> Enumeration {
        Enumeration {
            scope,
            files: files
                .into_iter()
                .map(|(p, s)| (PathBuf::from(p), s))
                .collect(),
            scanned_dirs: scanned_dirs.into_iter().map(PathBuf::from).collect(),
            truncated: false,
        }
    }

    #[test]
    fn unchanged_enumeration_is_idempotent() {
        let pass = enumeration(
            DiscoveryScope::Full,
            vec![("/logs/a.jsonl", sig(100, 1)), ("/logs/b.jsonl", sig(5, 2))],
            vec!["/logs"],
        );

        let first = discover_delta(&SignatureMap::new(), &pass);
        assert_eq!(first.changed_files.len(), 2);

        let second = discover_delta(&first.current_by_path, &pass);
        assert!(second.is_empty());
    }

    #[test]
    fn size_or_mtime_change_is_reported() {
        let mut previous = SignatureMap::new();
        previous.insert(PathBuf::from("/logs/a.jsonl"), sig(100, 1));
        previous.insert(PathBuf::from("/logs/b.jsonl"), sig(5, 2));

        let pass = enumeration(
            DiscoveryScope::Full,
            vec![
                ("/logs/a.jsonl", sig(140, 1)),
                ("/logs/b.jsonl", sig(5, 9)),
            ],
            vec!["/logs"],
        );
        let delta = discover_delta(&previous, &pass);
        assert_eq!(delta.changed_files.len(), 2);
        assert!(delta.removed_paths.is_empty());
    }

    #[test]
    fn full_scope_detects_removal_everywhere() {
        let mut previous = SignatureMap::new();
        previous.insert(PathBuf::from("/logs/old/a.jsonl"), sig(1, 1));

        let pass = enumeration(DiscoveryScope::Full, vec![], vec!["/logs"]);
        let delta = discover_delta(&previous, &pass);
        assert_eq!(delta.removed_paths, vec![PathBuf::from("/logs/old/a.jsonl")]);
    }

    #[test]
    fn recent_scope_limits_removal_to_scanned_dirs() {
        let mut previous = SignatureMap::new();
        previous.insert(PathBuf::from("/logs/hot/a.jsonl"), sig(1, 1));
        previous.insert(PathBuf::from("/logs/cold/b.jsonl"), sig(1, 1));

        let pass = enumeration(DiscoveryScope::Recent, vec![], vec!["/logs/hot"]);
        let delta = discover_delta(&previous, &pass);
        assert_eq!(delta.removed_paths, vec![PathBuf::from("/logs/hot/a.jsonl")]);
    }

    #[test]
    fn changed_files_keep_enumeration_order() {
        let pass = enumeration(
            DiscoveryScope::Full,
            vec![
                ("/logs/newest.jsonl", sig(3, 30)),
                ("/logs/middle.jsonl", sig(2, 20)),
                ("/logs/oldest.jsonl", sig(1, 10)),
            ],
            vec!["/logs"],
        );
        let delta = discover_delta(&SignatureMap::new(), &pass);
        let names: Vec<_> = delta
            .changed_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["newest.jsonl", "middle.jsonl", "oldest.jsonl"]);
    }

    #[test]
    fn truncated_enumeration_flags_drift() {
        let mut pass = enumeration(DiscoveryScope::Recent, vec![], vec!["/logs/hot"]);
        pass.truncated = true;
        let delta = discover_delta(&SignatureMap::new(), &pass);
        assert!(delta.drift_detected);
    }

    #[test]
    fn recent_baseline_overlays_previous() {
        let mut previous = SignatureMap::new();
        previous.insert(PathBuf::from("/logs/cold/b.jsonl"), sig(1, 1));
        previous.insert(PathBuf::from("/logs/hot/gone.jsonl"), sig(1, 1));

        let pass = enumeration(
            DiscoveryScope::Recent,
            vec![("/logs/hot/a.jsonl", sig(9, 9))],
            vec!["/logs/hot"],
        );
        let delta = discover_delta(&previous, &pass);
        let baseline = delta.next_baseline(DiscoveryScope::Recent, &previous);

        assert!(baseline.contains_key(&PathBuf::from("/logs/cold/b.jsonl")));
        assert!(baseline.contains_key(&PathBuf::from("/logs/hot/a.jsonl")));
        assert!(!baseline.contains_key(&PathBuf::from("/logs/hot/gone.jsonl")));
    }
}
