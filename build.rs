fn main() {
    println!("cargo:rerun-if-changed=resources/blackout.rc");
    println!("cargo:rerun-if-changed=resources/blackout.manifest");

    // Only the Windows binary carries the DPI-awareness manifest.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    embed_resource::compile("resources/blackout.rc", embed_resource::NONE)
        .manifest_optional()
        .expect("failed to compile resources");
}
