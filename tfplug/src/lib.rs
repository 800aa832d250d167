//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust, implementing the
//! Terraform Plugin Protocol v6.

// Core modules
pub mod attribute_type;
pub mod context;
pub mod error;
pub mod types;

// Provider API modules
pub mod provider;
pub mod request;

// Helper modules
pub mod builders;
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod retry;
pub mod validator;

// Framework implementation modules
pub mod grpc;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use attribute_type::AttributeType;
pub use builders::{AttributeBuilder, BlockBuilder, SchemaBuilder};
pub use context::Context;
pub use error::{Result, TfplugError};
pub use import::{import_state_passthrough_id, split_import_id};
pub use provider::{
    Attribute, DataSourceSchema, DataSourceV2, NestedBlock, NestingMode, ProviderSchema,
    ProviderV2, ResourceSchema, ResourceV2,
};
pub use retry::{retry_when, RetryError, StateChangeConf};
pub use server::{serve, ProviderServer, ServerConfig};
pub use types::{Config, Diagnostic, Diagnostics, Dynamic, State};

