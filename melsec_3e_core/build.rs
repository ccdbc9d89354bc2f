fn main() {
    // The device and completion-code tables are embedded from TOML at compile
    // time. Rebuild when either table changes.
    println!("cargo:rerun-if-changed=src/devices.toml");
    println!("cargo:rerun-if-changed=src/error_codes.toml");
}
