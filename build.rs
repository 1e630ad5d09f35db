//! Embeds the European root public key table.
//!
//! The ERCA key file is published separately from the source. If it is
//! present as `keys/EC_PK.bin` it is copied into the build, otherwise an
//! empty table is embedded.

use std::{env, fs, io};
use std::path::PathBuf;

fn main() -> Result<(), io::Error> {
    let manifest = PathBuf::from(
        env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default()
    );
    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap_or_default());
    let src = manifest.join("keys").join("EC_PK.bin");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", src.display());

    let data = match fs::read(&src) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => return Err(err),
    };
    fs::write(out.join("EC_PK.bin"), data)
}
