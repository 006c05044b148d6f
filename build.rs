use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=MPSSE_LIB_DIR");
    println!("cargo:rerun-if-env-changed=D2XX_LIB_DIR");

    // Only the FT232H backend links against native libraries
    if env::var_os("CARGO_FEATURE_FTDI").is_none() {
        return;
    }

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let project_root = PathBuf::from(&manifest_dir);

    // Default layout: vendor SDKs unpacked next to the crate
    let shared_root = project_root.parent().unwrap_or(&project_root).to_path_buf();

    let mpsse_lib_path = env::var_os("MPSSE_LIB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| shared_root.join("FTDI MPSSE").join("build").join("Win32").join("DLL"));
    let d2xx_lib_path = env::var_os("D2XX_LIB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| shared_root.join("FTDI-D2XX-Drivers-Win-2.12.36.20U").join("x86"));

    println!("cargo:rustc-link-search=native={}", mpsse_lib_path.display());
    println!("cargo:rustc-link-search=native={}", d2xx_lib_path.display());

    // libmpsse loads FTD2XX at runtime
    println!("cargo:rustc-link-lib=dylib=libmpsse");

    // Copy runtime DLLs next to the executables when building for Windows
    if let (Ok(profile), Ok(target)) = (env::var("PROFILE"), env::var("TARGET")) {
        let target_dir = project_root.join("target").join(&target).join(&profile);

        if target_dir.exists() {
            for (dir, dll) in [(&mpsse_lib_path, "libmpsse.dll"), (&d2xx_lib_path, "FTD2XX.dll")] {
                if fs::copy(dir.join(dll), target_dir.join(dll)).is_ok() {
                    println!("cargo:warning=Copied {} to {}", dll, target_dir.display());
                }
            }
        }
    }
}
