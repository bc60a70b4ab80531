fn main() {
    // Exposed to the CLI's long version string.
    let rustc = rustc_version::version()
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "unknown".to_owned());
    println!("cargo:rustc-env=RUSTC_VERSION={rustc}");
    println!("cargo:rerun-if-changed=build.rs");
}
