//! Generates the `mattori_home.Home` service trait and client.
//!
//! Messages are declared by hand with prost derives in `src/rpc/proto.rs`, so
//! only the service glue is generated here and no `protoc` is required.

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn main() {
    let home = Service::builder()
        .name("Home")
        .package("mattori_home")
        .method(
            Method::builder()
                .name("read_atmosphere")
                .route_name("ReadAtmosphere")
                .input_type("crate::rpc::proto::AtmosphereFeatures")
                .output_type("crate::rpc::proto::AtmosphereReading")
                .codec_path(CODEC)
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .method(
            Method::builder()
                .name("get_ac_status")
                .route_name("GetAcStatus")
                .input_type("crate::rpc::proto::AcStatusParam")
                .output_type("crate::rpc::proto::AcStatus")
                .codec_path(CODEC)
                .build(),
        )
        .method(
            Method::builder()
                .name("set_ac_status")
                .route_name("SetAcStatus")
                .input_type("crate::rpc::proto::AcStatus")
                .output_type("crate::rpc::proto::AcStatus")
                .codec_path(CODEC)
                .build(),
        )
        .build();

    Builder::new().compile(&[home]);

    println!("cargo:rerun-if-changed=build.rs");
}
