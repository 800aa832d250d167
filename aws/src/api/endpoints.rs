//! Partitions and service endpoint resolution

/// The AWS services this provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Elasticsearch,
    Kendra,
    Sts,
}

impl Service {
    /// Name used in the SigV4 credential scope
    pub fn signing_name(&self) -> &'static str {
        match self {
            Service::Elasticsearch => "es",
            Service::Kendra => "kendra",
            Service::Sts => "sts",
        }
    }

    fn endpoint_prefix(&self) -> &'static str {
        self.signing_name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: &'static str,
    pub dns_suffix: &'static str,
}

impl Partition {
    pub fn for_region(region: &str) -> Self {
        let (id, dns_suffix) = if region.starts_with("cn-") {
            ("aws-cn", "amazonaws.com.cn")
        } else if region.starts_with("us-gov-") {
            ("aws-us-gov", "amazonaws.com")
        } else if region.starts_with("us-isob-") {
            ("aws-iso-b", "sc2s.sgov.gov")
        } else if region.starts_with("us-iso-") {
            ("aws-iso", "c2s.ic.gov")
        } else {
            ("aws", "amazonaws.com")
        };
        Self { id, dns_suffix }
    }
}

/// Per-service endpoint overrides from the provider's `endpoints` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub elasticsearch: Option<String>,
    pub kendra: Option<String>,
    pub sts: Option<String>,
}

impl Endpoints {
    /// Every service pointed at one URL, used against local mock servers
    pub fn all(url: &str) -> Self {
        Self {
            elasticsearch: Some(url.to_string()),
            kendra: Some(url.to_string()),
            sts: Some(url.to_string()),
        }
    }

    pub fn resolve(&self, service: Service, region: &str, partition: &Partition) -> String {
        let custom = match service {
            Service::Elasticsearch => &self.elasticsearch,
            Service::Kendra => &self.kendra,
            Service::Sts => &self.sts,
        };
        match custom {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.{}.{}",
                service.endpoint_prefix(),
                region,
                partition.dns_suffix
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_follow_region_prefix() {
        assert_eq!(Partition::for_region("us-east-1").id, "aws");
        assert_eq!(Partition::for_region("cn-north-1").dns_suffix, "amazonaws.com.cn");
        assert_eq!(Partition::for_region("us-gov-west-1").id, "aws-us-gov");
        assert_eq!(Partition::for_region("us-iso-east-1").id, "aws-iso");
        assert_eq!(Partition::for_region("us-isob-east-1").id, "aws-iso-b");
    }

    #[test]
    fn default_endpoints_use_partition_suffix() {
        let endpoints = Endpoints::default();
        let partition = Partition::for_region("eu-west-1");
        assert_eq!(
            endpoints.resolve(Service::Kendra, "eu-west-1", &partition),
            "https://kendra.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            endpoints.resolve(Service::Elasticsearch, "eu-west-1", &partition),
            "https://es.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn overrides_win_and_lose_trailing_slash() {
        let endpoints = Endpoints {
            sts: Some("http://localhost:4566/".to_string()),
            ..Default::default()
        };
        let partition = Partition::for_region("us-east-1");
        assert_eq!(
            endpoints.resolve(Service::Sts, "us-east-1", &partition),
            "http://localhost:4566"
        );
    }
}
