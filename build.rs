use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    // Only the firmware build links against cortex-m-rt's link.x
    if env::var_os("CARGO_FEATURE_FIRMWARE").is_none() {
        println!("cargo:rerun-if-changed=build.rs");
        return;
    }

    // Copy memory.x into OUT_DIR so the linker can find it
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::copy("memory.x", out_dir.join("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
