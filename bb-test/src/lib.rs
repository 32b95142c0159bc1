//! Render units generated from `templates/` by the build script

include!(concat!(env!("OUT_DIR"), "/templates.rs"));
