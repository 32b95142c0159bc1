use std::env;
use std::path::{Path, PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR for build scripts"));

    if let Err(err) = bb::compile_dir(Path::new("templates"), &out_dir.join("templates.rs")) {
        panic!("{err}");
    }
}
