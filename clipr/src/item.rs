use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// What a paste does with the staged paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardOperation {
    Copy,
    Cut,
}

impl ClipboardOperation {
    /// Verb used by the GNOME encoding and in log fields.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Cut => "cut",
        }
    }

    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb.trim() {
            "copy" => Some(Self::Copy),
            "cut" => Some(Self::Cut),
            _ => None,
        }
    }
}

/// The set of paths staged by the last copy or cut.
///
/// Paths keep their staging order and duplicates collapse.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardSet {
    pub id: String,
    urls: IndexSet<PathBuf>,
    pub operation: ClipboardOperation,
    pub staged_at: Instant,
}

impl ClipboardSet {
    pub fn new<I>(urls: I, operation: ClipboardOperation) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            id: Uuid::new_v4().to_string(),
            urls: urls.into_iter().collect(),
            operation,
            staged_at: Instant::now(),
        }
    }

    pub fn copy<I: IntoIterator<Item = PathBuf>>(urls: I) -> Self {
        Self::new(urls, ClipboardOperation::Copy)
    }

    pub fn cut<I: IntoIterator<Item = PathBuf>>(urls: I) -> Self {
        Self::new(urls, ClipboardOperation::Cut)
    }

    pub fn urls(&self) -> impl ExactSizeIterator<Item = &PathBuf> {
        self.urls.iter()
    }

    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.urls.iter().cloned().collect()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.urls.contains(path)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub const fn is_cut(&self) -> bool {
        matches!(self.operation, ClipboardOperation::Cut)
    }

    /// Same paths and operation, ignoring id and staging time.
    pub fn same_contents(&self, other: &Self) -> bool {
        self.operation == other.operation && self.urls.iter().eq(other.urls.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_keeping_first_position() {
        let set = ClipboardSet::copy([
            PathBuf::from("/a"),
            PathBuf::from("/b"),
            PathBuf::from("/a"),
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.to_vec(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(!set.is_cut());
    }

    #[test]
    fn verbs_parse_back() {
        assert_eq!(ClipboardOperation::from_verb("cut\r"), Some(ClipboardOperation::Cut));
        assert_eq!(ClipboardOperation::from_verb("copy"), Some(ClipboardOperation::Copy));
        assert_eq!(ClipboardOperation::from_verb("link"), None);
    }
}
