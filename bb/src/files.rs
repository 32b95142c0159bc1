use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::{compile, CompileOptions, ErrorS, DEFAULT_UNIT_NAME};

/// File extension of templates
pub const TEMPLATE_EXTENSION: &str = "bb";

/// Suffix stripped from file stems when deriving unit names
const UNIT_NAME_SUFFIX: &str = "_bb";

#[derive(Debug, Error)]
pub enum CompileFileError {
    #[error("Unable to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Unable to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Unable to compile {}\n{report}", path.display())]
    Compile {
        path: PathBuf,
        error: ErrorS,
        report: String,
    },
}

/// True for paths with the template extension
pub fn is_template(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == TEMPLATE_EXTENSION)
}

/// Name of the unit generated for a template file
///
/// The file stem without a trailing `_bb`, with every character that can't be
/// part of an identifier replaced by `_`. Names starting with a digit or
/// spelling a keyword get a leading `_`.
pub fn unit_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    let stem = stem.strip_suffix(UNIT_NAME_SUFFIX).unwrap_or(&stem);

    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() {
        return DEFAULT_UNIT_NAME.to_string();
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) || !parser::is_identifier(&name) {
        name.insert(0, '_');
    }

    name
}

/// Compile one template file
pub fn compile_file(path: &Path) -> Result<String, CompileFileError> {
    let source = fs::read_to_string(path).map_err(|source| CompileFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path.display().to_string();
    let options = CompileOptions::default()
        .with_name(unit_name(path))
        .with_file_name(&file_name);

    let generated = compile(&source, &options).map_err(|error| CompileFileError::Compile {
        path: path.to_path_buf(),
        report: diagnostics::report(&error, &file_name, &source),
        error,
    })?;

    info!(path = %path.display(), "compiled template");

    Ok(generated)
}

/// Compile every template under `dir` in to one Rust file
///
/// Meant for build scripts: subdirectories become nested modules and every
/// input is announced with `cargo:rerun-if-changed`. Pull the output in with
/// `include!(concat!(env!("OUT_DIR"), "/templates.rs"))`.
pub fn compile_dir(dir: &Path, out_file: &Path) -> Result<(), CompileFileError> {
    let mut out = String::new();

    println!("cargo:rerun-if-changed={}", dir.display());

    compile_dir_into(dir, &mut out)?;

    fs::write(out_file, out).map_err(|source| CompileFileError::Write {
        path: out_file.to_path_buf(),
        source,
    })?;

    info!(dir = %dir.display(), out = %out_file.display(), "compiled template directory");

    Ok(())
}

fn compile_dir_into(dir: &Path, out: &mut String) -> Result<(), CompileFileError> {
    let read_error = |source| CompileFileError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = fs::read_dir(dir)
        .map_err(read_error)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;

    paths.sort();

    for path in paths {
        if path.is_dir() {
            debug!(dir = %path.display(), "entering template directory");

            println!("cargo:rerun-if-changed={}", path.display());

            out.push_str(&format!("pub mod {} {{\n", unit_name(&path)));
            compile_dir_into(&path, out)?;
            out.push_str("}\n");
        } else if is_template(&path) {
            println!("cargo:rerun-if-changed={}", path.display());

            out.push_str(&compile_file(&path)?);
            out.push('\n');
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    macro_rules! unit_name_test {
        ($test_name:ident, $path:expr, $name:expr) => {
            #[test]
            fn $test_name() {
                assert_eq!($name, unit_name(Path::new($path)));
            }
        };
    }

    unit_name_test!(plain_stem, "templates/page.bb", "page");

    unit_name_test!(strips_bb_suffix, "templates/page_bb.bb", "page");

    unit_name_test!(replaces_illegal_chars, "templates/my-page.v2.bb", "my_page_v2");

    unit_name_test!(leading_digit, "templates/404.bb", "_404");

    unit_name_test!(keyword, "templates/struct.bb", "_struct");

    #[test]
    fn template_extension() {
        assert!(is_template(Path::new("a/b.bb")));
        assert!(!is_template(Path::new("a/b.rs")));
        assert!(!is_template(Path::new("a/bb")));
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bb-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn compile_dir_nests_subdirectories() {
        let dir = scratch_dir("nested");
        fs::create_dir_all(dir.join("emails")).unwrap();
        fs::write(dir.join("b_page.bb"), "B").unwrap();
        fs::write(dir.join("a_page.bb"), "A").unwrap();
        fs::write(dir.join("notes.txt"), "not a template").unwrap();
        fs::write(dir.join("emails").join("welcome.bb"), "Welcome").unwrap();

        let out_file = dir.join("templates.rs");
        compile_dir(&dir, &out_file).unwrap();

        let generated = fs::read_to_string(&out_file).unwrap();

        let a = generated.find("pub mod a_page {").unwrap();
        let b = generated.find("pub mod b_page {").unwrap();
        let emails = generated.find("pub mod emails {\n// @generated by bb from").unwrap();
        let welcome = generated.find("pub mod welcome {").unwrap();

        assert!(a < b && b < emails && emails < welcome);
        assert!(!generated.contains("not a template"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn compile_file_reports_errors_with_path() {
        let dir = scratch_dir("broken");
        let path = dir.join("broken.bb");
        fs::write(&path, "<% end section %>").unwrap();

        let err = compile_file(&path).unwrap_err();

        match &err {
            CompileFileError::Compile { path: failed, report, .. } => {
                assert_eq!(&path, failed);
                assert!(report.contains("Found `end section` without an open section"));
            }
            other => panic!("expected a compile error, got {other:?}"),
        }

        assert!(err.to_string().starts_with("Unable to compile "));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn compile_file_missing() {
        let err = compile_file(Path::new("does/not/exist.bb")).unwrap_err();

        assert!(matches!(err, CompileFileError::Read { .. }));
    }
}
