use super::Options;
use camino::Utf8Path;
use sha2::{Digest, Sha256};

const SEPARATOR: &str = "##";

/// Name of the `.gcov` file written for `file`, a source covered while compiling `source`.
#[must_use]
pub fn output_name(options: &Options, source: &Utf8Path, file: &str) -> String {
    let covered = mangle(options, file);
    let mut name = if options.long_file_names && file != source.as_str() {
        format!("{}{SEPARATOR}{covered}", mangle(options, source.as_str()))
    } else {
        covered
    };

    if options.hash_filenames && (options.long_file_names || options.preserve_paths) {
        name = format!("{}{SEPARATOR}{}", base_name(file), sha256_hex(&name));
    }

    name + ".gcov"
}

/// Keep the path when `-p` is given, encoding `/` as `#` and `..` as `^`; otherwise just the base name.
fn mangle(options: &Options, path: &str) -> String {
    if !options.preserve_paths {
        return base_name(path).to_string();
    }

    path.split('/')
        .filter(|component| *component != ".")
        .map(|component| if component == ".." { "^" } else { component })
        .collect::<Vec<_>>()
        .join("#")
}

/// A function's name as reported, demangled with `-m`.
///
/// Rust symbols are tried first, then Itanium C++ symbols. Anything else is left as is.
#[must_use]
pub fn function_name(options: &Options, name: &str) -> String {
    if !options.demangled_names {
        return name.to_string();
    }

    if let Ok(demangled) = rustc_demangle::try_demangle(name) {
        return format!("{demangled:#}");
    }

    cpp_demangle::Symbol::new(name.as_bytes()).map_or_else(|_| name.to_string(), |symbol| symbol.to_string())
}

fn base_name(path: &str) -> &str {
    Utf8Path::new(path).file_name().unwrap_or(path)
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
