fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc so builds do not depend on a system install
    if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
        // SAFETY: build scripts run single-threaded
        unsafe { std::env::set_var("PROTOC", path) };
    }

    println!("cargo:rerun-if-changed=proto/server.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .type_attribute(".server", "#[derive(serde::Serialize)]")
        .type_attribute(".server", "#[serde(rename_all = \"camelCase\")]")
        .compile(&["proto/server.proto"], &["proto"])?;
    Ok(())
}
