use tonic_build::manual::{Builder, Method, Service};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Messages are plain prost structs in src/grpc/proto.rs, so the service
    // stubs are generated without a protoc step.
    let method = |name: &str, route: &str, input: &str, output: &str| {
        Method::builder()
            .name(name)
            .route_name(route)
            .input_type(input)
            .output_type(output)
            .codec_path("tonic::codec::ProstCodec")
            .build()
    };

    let service = Service::builder()
        .name("RateLimitService")
        .package("votegate.v1")
        .method(method(
            "should_rate_limit",
            "ShouldRateLimit",
            "crate::grpc::proto::RateLimitRequest",
            "crate::grpc::proto::RateLimitResponse",
        ))
        .method(method(
            "evaluate",
            "Evaluate",
            "crate::grpc::proto::RateLimitRequest",
            "crate::grpc::proto::RateLimitResponse",
        ))
        .method(method(
            "record",
            "Record",
            "crate::grpc::proto::RateLimitRequest",
            "crate::grpc::proto::RecordResponse",
        ))
        .build();

    Builder::new()
        .build_server(true)
        .build_client(false)
        .compile(&[service]);
}
