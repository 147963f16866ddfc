use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=Info.plist");

    let (Ok(out_dir), Ok(manifest_dir)) = (env::var("OUT_DIR"), env::var("CARGO_MANIFEST_DIR")) else {
        return;
    };

    // macOS only grants camera access to bundles that declare NSCameraUsageDescription
    let plist_src = Path::new(&manifest_dir).join("Info.plist");
    let plist_dst = Path::new(&out_dir).join("../../Info.plist");

    if plist_src.exists() {
        if let Err(e) = fs::copy(&plist_src, &plist_dst) {
            println!("cargo:warning=failed to copy Info.plist: {}", e);
        }
    }
}
