pub mod resource_domain;
pub mod resource_domain_policy;
pub mod resource_vpc_endpoint;

pub use resource_domain::DomainResource;
pub use resource_domain_policy::DomainPolicyResource;
pub use resource_vpc_endpoint::VpcEndpointResource;
