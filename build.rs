fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        let protoc_path = protoc_bin_vendored::protoc_bin_path()?;
        unsafe {
            std::env::set_var("PROTOC", protoc_path);
        }
    }

    prost_build::compile_protos(
        &[
            "proto/common.proto",
            "proto/client.proto",
            "proto/server.proto",
            "proto/snake.proto",
        ],
        &["proto/"],
    )?;
    Ok(())
}
