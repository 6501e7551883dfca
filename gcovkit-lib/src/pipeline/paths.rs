//! Derivation of companion artifact names from a source path.

use camino::{Utf8Path, Utf8PathBuf};

/// Suffix letters appended to `.gc` for the notes file.
pub const NOTES_SUFFIX: &str = "no";

/// Suffix letters appended to `.gc` for the data file.
pub const DATA_SUFFIX: &str = "da";

/// How the object directory/file override is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLocation<'a> {
    /// No override: artifacts live next to the source file.
    NextToSource,

    /// The override names a directory holding artifacts named after the source file.
    Directory(&'a Utf8Path),

    /// The override names an object file; artifacts are named after it instead.
    File(&'a Utf8Path),
}

impl<'a> ObjectLocation<'a> {
    /// Classify an override string.
    ///
    /// The directory check only happens for a non-empty override. Anything that isn't an
    /// existing directory, including paths that can't be queried, is treated as a file.
    #[must_use]
    pub fn classify(object: &'a str) -> Self {
        if object.is_empty() {
            return Self::NextToSource;
        }

        let path = Utf8Path::new(object);
        if path.is_dir() { Self::Directory(path) } else { Self::File(path) }
    }
}

/// Compute the path, without extension, that both artifact names are built from.
#[must_use]
pub fn derive_stem(source: &Utf8Path, location: ObjectLocation<'_>) -> Utf8PathBuf {
    match location {
        ObjectLocation::NextToSource => parent(source).join(file_stem(source)),
        ObjectLocation::Directory(dir) => dir.join(file_stem(source)),
        ObjectLocation::File(file) => parent(file).join(file_stem(file)),
    }
}

/// The file name up to its last `.`.
///
/// Unlike [`Utf8Path::file_stem`], a leading dot starts the extension, so `.c` has an empty stem.
fn file_stem(path: &Utf8Path) -> &str {
    path.file_name()
        .map_or("", |name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
}

fn parent(path: &Utf8Path) -> &Utf8Path {
    path.parent().unwrap_or_else(|| Utf8Path::new(""))
}

/// Name an artifact, preferring an explicit override over the stem.
#[must_use]
pub fn derive_artifact_name(stem: &Utf8Path, explicit: Option<&str>, suffix: &str) -> String {
    match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{stem}.gc{suffix}"),
    }
}
