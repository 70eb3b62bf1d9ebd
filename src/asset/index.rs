use std::{
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
};

/// Identifies an item inside a loaded model file.
///
/// Indices are only unique within one file, so the file path is part of the
/// identifier. Formats without stable indices (Collada joints) use names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetIndex {
    PathIndex(PathBuf, usize),
    PathName(PathBuf, String),
}

impl AssetIndex {
    pub fn from_index<P: AsRef<Path>>(path: P, index: usize) -> Self {
        Self::PathIndex(path.as_ref().to_path_buf(), index)
    }

    pub fn from_name<P: AsRef<Path>>(path: P, name: impl Into<String>) -> Self {
        Self::PathName(path.as_ref().to_path_buf(), name.into())
    }
}

impl Display for AssetIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssetIndex::PathIndex(path, index) => {
                write!(f, "{} #{}", path.to_string_lossy(), index)
            }
            AssetIndex::PathName(path, name) => {
                write!(f, "{} \"{}\"", path.to_string_lossy(), name)
            }
        }
    }
}
