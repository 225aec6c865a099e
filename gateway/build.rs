fn main() {
    // The gateway is a gRPC client of the collaborator services; it never
    // serves gRPC itself.
    println!("cargo:rerun-if-changed=proto/registry.proto");
    println!("cargo:rerun-if-changed=proto/messages.proto");
    println!("cargo:rerun-if-changed=proto/sessions.proto");

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(
            &[
                "proto/registry.proto",
                "proto/messages.proto",
                "proto/sessions.proto",
            ],
            &["proto/"],
        )
        .expect("Failed to compile collaborator protos");
}
