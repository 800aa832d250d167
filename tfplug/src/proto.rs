//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! Generated at build time from `proto/tfplugin6.9.proto`. Request/response
//! pairs live in snake_case modules (`read_resource::Request`), nested
//! messages in sub-modules (`schema::NestedBlock`), and the service trait is
//! `provider_server::Provider`. Several names clash with framework types, so
//! always refer to these through the `proto::` prefix.

pub mod tfplugin6 {
    tonic::include_proto!("tfplugin6");
}

pub use tfplugin6::*;
