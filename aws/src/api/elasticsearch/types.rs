//! Wire types for the Elasticsearch Service `2015-01-01` REST API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::Tag;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_master_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_master_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_master_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_awareness_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_awareness_config: Option<ZoneAwarenessConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cold_storage_options: Option<ColdStorageOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoneAwarenessConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColdStorageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EbsOptions {
    #[serde(rename = "EBSEnabled", skip_serializing_if = "Option::is_none")]
    pub ebs_enabled: Option<bool>,
    #[serde(rename = "VolumeType", skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    #[serde(rename = "VolumeSize", skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<i64>,
    #[serde(rename = "Iops", skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(rename = "Throughput", skip_serializing_if = "Option::is_none")]
    pub throughput: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automated_snapshot_start_hour: Option<i64>,
}

/// Subnets and security groups, as sent on create and update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_ids: Option<Vec<String>>,
}

/// VPC placement as reported back by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcDerivedInfo {
    #[serde(rename = "VPCId", default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CognitoOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionAtRestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeToNodeEncryptionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPublishingOption {
    #[serde(rename = "CloudWatchLogsLogGroupArn", skip_serializing_if = "Option::is_none")]
    pub cloud_watch_logs_log_group_arn: Option<String>,
    #[serde(rename = "Enabled", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainEndpointOptions {
    #[serde(rename = "EnforceHTTPS", skip_serializing_if = "Option::is_none")]
    pub enforce_https: Option<bool>,
    #[serde(rename = "TLSSecurityPolicy", skip_serializing_if = "Option::is_none")]
    pub tls_security_policy: Option<String>,
    #[serde(rename = "CustomEndpointEnabled", skip_serializing_if = "Option::is_none")]
    pub custom_endpoint_enabled: Option<bool>,
    #[serde(rename = "CustomEndpoint", skip_serializing_if = "Option::is_none")]
    pub custom_endpoint: Option<String>,
    #[serde(
        rename = "CustomEndpointCertificateArn",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_endpoint_certificate_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdvancedSecurityOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_user_database_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_user_options: Option<MasterUserOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterUserOptions {
    #[serde(rename = "MasterUserARN", skip_serializing_if = "Option::is_none")]
    pub master_user_arn: Option<String>,
    #[serde(rename = "MasterUserName", skip_serializing_if = "Option::is_none")]
    pub master_user_name: Option<String>,
    #[serde(rename = "MasterUserPassword", skip_serializing_if = "Option::is_none")]
    pub master_user_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoTuneOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_on_disable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_schedules: Option<Vec<MaintenanceSchedule>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaintenanceSchedule {
    /// Epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<MaintenanceDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression_for_recurrence: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaintenanceDuration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeProgressDetails {
    pub change_id: Option<String>,
    pub message: Option<String>,
    pub config_change_status: Option<String>,
}

/// Response of DescribeElasticsearchDomain, CreateElasticsearchDomain and
/// DeleteElasticsearchDomain
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainStatus {
    pub domain_id: String,
    pub domain_name: String,
    #[serde(rename = "ARN")]
    pub arn: String,
    #[serde(default)]
    pub created: Option<bool>,
    #[serde(default)]
    pub deleted: Option<bool>,
    #[serde(default)]
    pub processing: Option<bool>,
    #[serde(default)]
    pub domain_processing_status: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub endpoints: Option<HashMap<String, String>>,
    #[serde(default)]
    pub elasticsearch_version: Option<String>,
    #[serde(default)]
    pub access_policies: Option<String>,
    #[serde(default)]
    pub advanced_options: Option<HashMap<String, String>>,
    #[serde(default)]
    pub advanced_security_options: Option<AdvancedSecurityOptions>,
    #[serde(default)]
    pub elasticsearch_cluster_config: Option<ClusterConfig>,
    #[serde(rename = "EBSOptions", default)]
    pub ebs_options: Option<EbsOptions>,
    #[serde(default)]
    pub snapshot_options: Option<SnapshotOptions>,
    #[serde(rename = "VPCOptions", default)]
    pub vpc_options: Option<VpcDerivedInfo>,
    #[serde(default)]
    pub cognito_options: Option<CognitoOptions>,
    #[serde(default)]
    pub encryption_at_rest_options: Option<EncryptionAtRestOptions>,
    #[serde(default)]
    pub node_to_node_encryption_options: Option<NodeToNodeEncryptionOptions>,
    #[serde(default)]
    pub log_publishing_options: Option<HashMap<String, LogPublishingOption>>,
    #[serde(default)]
    pub domain_endpoint_options: Option<DomainEndpointOptions>,
    #[serde(default)]
    pub change_progress_details: Option<ChangeProgressDetails>,
}

impl DomainStatus {
    /// `ConfigChangeStatus: Message`, used as the last error of a failed wait
    pub fn change_progress_message(&self) -> Option<String> {
        self.change_progress_details.as_ref().map(|details| {
            format!(
                "{}: {}",
                details.config_change_status.as_deref().unwrap_or_default(),
                details.message.as_deref().unwrap_or_default()
            )
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DomainStatusResponse {
    pub domain_status: DomainStatus,
}

/// One option of DescribeElasticsearchDomainConfig, `{Options, Status}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionStatus<T> {
    pub options: Option<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainConfig {
    #[serde(default)]
    pub auto_tune_options: Option<OptionStatus<AutoTuneOptions>>,
    #[serde(default)]
    pub access_policies: Option<OptionStatus<String>>,
    #[serde(default)]
    pub elasticsearch_version: Option<OptionStatus<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DomainConfigResponse {
    pub domain_config: DomainConfig,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDomainRequest {
    pub domain_name: String,
    pub elasticsearch_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_policies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_options: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_security_options: Option<AdvancedSecurityOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_tune_options: Option<AutoTuneOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster_config: Option<ClusterConfig>,
    #[serde(rename = "EBSOptions", skip_serializing_if = "Option::is_none")]
    pub ebs_options: Option<EbsOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_options: Option<SnapshotOptions>,
    #[serde(rename = "VPCOptions", skip_serializing_if = "Option::is_none")]
    pub vpc_options: Option<VpcOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognito_options: Option<CognitoOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_at_rest_options: Option<EncryptionAtRestOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_to_node_encryption_options: Option<NodeToNodeEncryptionOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_publishing_options: Option<HashMap<String, LogPublishingOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_endpoint_options: Option<DomainEndpointOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_list: Vec<Tag>,
}

/// Partial configuration change; only the fields that are set are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateDomainConfigRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_policies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_options: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_security_options: Option<AdvancedSecurityOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_tune_options: Option<AutoTuneOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster_config: Option<ClusterConfig>,
    #[serde(rename = "EBSOptions", skip_serializing_if = "Option::is_none")]
    pub ebs_options: Option<EbsOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_options: Option<SnapshotOptions>,
    #[serde(rename = "VPCOptions", skip_serializing_if = "Option::is_none")]
    pub vpc_options: Option<VpcOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognito_options: Option<CognitoOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_at_rest_options: Option<EncryptionAtRestOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_to_node_encryption_options: Option<NodeToNodeEncryptionOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_publishing_options: Option<HashMap<String, LogPublishingOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_endpoint_options: Option<DomainEndpointOptions>,
}

impl UpdateDomainConfigRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompatibleVersionsMap {
    pub source_version: String,
    #[serde(default)]
    pub target_versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CompatibleVersionsResponse {
    #[serde(default)]
    pub compatible_elasticsearch_versions: Vec<CompatibleVersionsMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpgradeStatus {
    pub upgrade_step: Option<String>,
    pub step_status: Option<String>,
    pub upgrade_name: Option<String>,
}

impl UpgradeStatus {
    /// Step status for waiting purposes. A domain upgrade runs several steps
    /// and only a succeeded `UPGRADE` step means the whole upgrade finished.
    pub fn effective_status(&self) -> String {
        let status = self.step_status.clone().unwrap_or_default();
        if status == "SUCCEEDED" && self.upgrade_step.as_deref() != Some("UPGRADE") {
            return "IN_PROGRESS".to_string();
        }
        status
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcEndpoint {
    pub vpc_endpoint_id: String,
    #[serde(default)]
    pub vpc_endpoint_owner: Option<String>,
    #[serde(default)]
    pub domain_arn: Option<String>,
    #[serde(default)]
    pub vpc_options: Option<VpcDerivedInfo>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VpcEndpointResponse {
    pub vpc_endpoint: VpcEndpoint,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VpcEndpointError {
    pub vpc_endpoint_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeVpcEndpointsResponse {
    #[serde(default)]
    pub vpc_endpoints: Vec<VpcEndpoint>,
    #[serde(default)]
    pub vpc_endpoint_errors: Vec<VpcEndpointError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListTagsResponse {
    #[serde(default)]
    pub tag_list: Vec<Tag>,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_status_parses_vpc_domain() {
        let status: DomainStatus = serde_json::from_value(json!({
            "DomainId": "123456789012/search",
            "DomainName": "search",
            "ARN": "arn:aws:es:us-east-1:123456789012:domain/search",
            "DomainProcessingStatus": "Active",
            "Endpoints": {"vpc": "vpc-search-abc.us-east-1.es.amazonaws.com"},
            "EBSOptions": {"EBSEnabled": true, "VolumeType": "gp3", "VolumeSize": 10},
            "VPCOptions": {"VPCId": "vpc-1", "SubnetIds": ["subnet-1"], "AvailabilityZones": ["us-east-1a"]},
            "ChangeProgressDetails": {"ConfigChangeStatus": "ApplyingChanges", "Message": "Blue/green"}
        }))
        .unwrap();

        assert_eq!(status.domain_processing_status.as_deref(), Some("Active"));
        assert_eq!(
            status.change_progress_message().as_deref(),
            Some("ApplyingChanges: Blue/green")
        );
        assert!(status.endpoint.is_none());
        assert_eq!(status.ebs_options.unwrap().volume_size, Some(10));
        assert_eq!(status.vpc_options.unwrap().vpc_id.as_deref(), Some("vpc-1"));
    }

    #[test]
    fn update_request_skips_unset_fields() {
        let request = UpdateDomainConfigRequest {
            snapshot_options: Some(SnapshotOptions {
                automated_snapshot_start_hour: Some(3),
            }),
            ..Default::default()
        };
        assert!(!request.is_empty());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"SnapshotOptions": {"AutomatedSnapshotStartHour": 3}})
        );
        assert!(UpdateDomainConfigRequest::default().is_empty());
    }

    #[test]
    fn upgrade_intermediate_steps_are_in_progress() {
        let check = UpgradeStatus {
            upgrade_step: Some("PRE_UPGRADE_CHECK".to_string()),
            step_status: Some("SUCCEEDED".to_string()),
            upgrade_name: None,
        };
        assert_eq!(check.effective_status(), "IN_PROGRESS");

        let done = UpgradeStatus {
            upgrade_step: Some("UPGRADE".to_string()),
            ..check
        };
        assert_eq!(done.effective_status(), "SUCCEEDED");
    }
}
