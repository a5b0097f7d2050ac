//! Compiles the front-end (`api.proto`) and back-end (`store.proto`) wire
//! protocols into Rust via `tonic-build`. This is the codegen analogue of
//! the assembly/link steps a kernel build.rs performs: the source of truth
//! lives outside `src/`, and cargo regenerates the bindings on every change.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile(&["proto/api.proto"], &["proto"])?;

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(&["proto/store.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/api.proto");
    println!("cargo:rerun-if-changed=proto/store.proto");
    Ok(())
}
