fn main() {
    use std::env;
    use std::path::PathBuf;

    println!("cargo:rerun-if-changed=src/public_api.rs");
    println!("cargo:rerun-if-changed=src/errors.rs");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    let crate_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let out_dir = PathBuf::from(&crate_dir).join("include");
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        println!("cargo:warning=cannot create include directory: {e}");
        return;
    }

    let config = cbindgen::Config::from_file(PathBuf::from(&crate_dir).join("cbindgen.toml"))
        .unwrap_or_default();

    // The C header is a convenience; never fail the Rust build over it.
    match cbindgen::Builder::new()
        .with_config(config)
        .with_crate(&crate_dir)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("cidrtrie.h"));
        }
        Err(e) => println!("cargo:warning=cbindgen failed: {e}"),
    }
}
