use tonic_build::manual::{Builder, Method, Service};

const PACKAGE: &str = "header_injector.plugins.v1";
const CODEC: &str = "tonic::codec::ProstCodec";

fn method(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path(CODEC)
        .build()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Build provenance reported by GetMetadata; empty when the builder does not set it.
    for (source, target) in [
        ("GIT_COMMIT_HASH", "PLUGIN_COMMIT_HASH"),
        ("BUILD_DATE", "PLUGIN_BUILD_DATE"),
    ] {
        println!("cargo:rerun-if-env-changed={source}");
        let value = std::env::var(source).unwrap_or_default();
        println!("cargo:rustc-env={target}={value}");
    }

    // Messages live in src/proto.rs; only the service plumbing is generated here.
    let plugin_manager = Service::builder()
        .name("PluginManager")
        .package(PACKAGE)
        .method(method(
            "get_metadata",
            "GetMetadata",
            "crate::proto::Empty",
            "crate::proto::Metadata",
        ))
        .method(method(
            "get_capabilities",
            "GetCapabilities",
            "crate::proto::Empty",
            "crate::proto::Capabilities",
        ))
        .method(method(
            "initialize",
            "Initialize",
            "crate::proto::Empty",
            "crate::proto::Ack",
        ))
        .method(method(
            "configure",
            "Configure",
            "crate::proto::PluginConfig",
            "crate::proto::Ack",
        ))
        .method(method(
            "activate",
            "Activate",
            "crate::proto::Empty",
            "crate::proto::Ack",
        ))
        .method(method(
            "shutdown",
            "Shutdown",
            "crate::proto::Empty",
            "crate::proto::Ack",
        ))
        .method(method(
            "check_health",
            "CheckHealth",
            "crate::proto::Empty",
            "crate::proto::HealthStatus",
        ))
        .method(method(
            "check_ready",
            "CheckReady",
            "crate::proto::Empty",
            "crate::proto::HealthStatus",
        ))
        .build();

    let middleware = Service::builder()
        .name("Middleware")
        .package(PACKAGE)
        .method(method(
            "should_handle",
            "ShouldHandle",
            "crate::proto::RouteQuery",
            "crate::proto::ShouldHandleResponse",
        ))
        .method(method(
            "handle_request",
            "HandleRequest",
            "crate::proto::HttpRequest",
            "crate::proto::HttpResponse",
        ))
        .method(method(
            "handle_response",
            "HandleResponse",
            "crate::proto::HttpResponse",
            "crate::proto::HttpResponse",
        ))
        .build();

    Builder::new()
        .build_server(true)
        .build_client(false)
        .compile(&[plugin_manager, middleware]);
}
