//! `CloudAdapter`: the provider-facing read/write primitives that
//! `kubeup-units` diffs against and renders through. One trait, two
//! implementations (`AwsAdapter`, `GceAdapter`); every method returns
//! `Ok(None)` for "no actual" rather than an error (spec §7), matching
//! `pkg/fi`'s `find` convention of a nil actual meaning absent, not broken.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::CloudError;

pub type Tags = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VpcInfo {
    pub id: String,
    pub cidr: String,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DhcpOptionsInfo {
    pub id: String,
    pub domain_name: String,
    pub domain_name_servers: Vec<String>,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubnetInfo {
    pub id: String,
    pub vpc_id: String,
    pub cidr: String,
    pub availability_zone: String,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternetGatewayInfo {
    pub id: String,
    pub attached_vpc_id: Option<String>,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTableInfo {
    pub id: String,
    pub vpc_id: String,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    pub route_table_id: String,
    pub destination_cidr: String,
    pub target_internet_gateway_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityGroupInfo {
    pub id: String,
    pub vpc_id: String,
    pub name: String,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub cidr: Option<String>,
    pub source_group_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IamRoleInfo {
    pub name: String,
    pub assume_role_policy_document: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceProfileInfo {
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SshKeyInfo {
    pub name: String,
    pub fingerprint: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeInfo {
    pub id: String,
    pub availability_zone: String,
    pub size_gb: i64,
    pub volume_type: String,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElasticIpInfo {
    pub allocation_id: String,
    pub public_ip: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceInfo {
    pub id: String,
    pub state: String,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfigurationInfo {
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoscalingGroupInfo {
    pub name: String,
    pub launch_configuration_name: String,
    pub min_size: i32,
    pub max_size: i32,
    pub desired_capacity: i32,
}

/// Primitive the CloudAdapter surface is built from: given an id/selector,
/// return the provider's current view, or `None` if it does not exist.
/// `kubeup-units`'s `find` implementations call straight through to these.
#[async_trait]
pub trait CloudAdapter: Send + Sync {
    async fn find_vpc_by_tag(&self, key: &str, value: &str) -> Result<Option<VpcInfo>, CloudError>;
    async fn create_vpc(&self, cidr: &str, tags: &Tags) -> Result<VpcInfo, CloudError>;

    async fn find_dhcp_options_by_tag(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<DhcpOptionsInfo>, CloudError>;
    async fn create_dhcp_options(
        &self,
        domain_name: &str,
        domain_name_servers: &[String],
        tags: &Tags,
    ) -> Result<DhcpOptionsInfo, CloudError>;
    async fn associate_dhcp_options(&self, vpc_id: &str, dhcp_options_id: &str) -> Result<(), CloudError>;

    async fn find_subnet_by_tag(&self, key: &str, value: &str) -> Result<Option<SubnetInfo>, CloudError>;
    async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr: &str,
        availability_zone: &str,
        tags: &Tags,
    ) -> Result<SubnetInfo, CloudError>;

    async fn find_internet_gateway_by_tag(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<InternetGatewayInfo>, CloudError>;
    async fn create_internet_gateway(&self, tags: &Tags) -> Result<InternetGatewayInfo, CloudError>;
    async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<(), CloudError>;

    async fn find_route_table_by_tag(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<RouteTableInfo>, CloudError>;
    async fn create_route_table(&self, vpc_id: &str, tags: &Tags) -> Result<RouteTableInfo, CloudError>;
    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target_internet_gateway_id: &str,
    ) -> Result<(), CloudError>;
    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<(), CloudError>;

    async fn find_security_group_by_name(
        &self,
        vpc_id: &str,
        name: &str,
    ) -> Result<Option<SecurityGroupInfo>, CloudError>;
    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
        tags: &Tags,
    ) -> Result<SecurityGroupInfo, CloudError>;
    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<(), CloudError>;

    async fn find_iam_role(&self, name: &str) -> Result<Option<IamRoleInfo>, CloudError>;
    async fn create_iam_role(
        &self,
        name: &str,
        assume_role_policy_document: &str,
    ) -> Result<IamRoleInfo, CloudError>;
    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> Result<(), CloudError>;

    async fn find_instance_profile(&self, name: &str) -> Result<Option<InstanceProfileInfo>, CloudError>;
    async fn create_instance_profile(&self, name: &str) -> Result<InstanceProfileInfo, CloudError>;
    async fn add_role_to_instance_profile(&self, profile_name: &str, role_name: &str) -> Result<(), CloudError>;

    async fn find_ssh_key(&self, name: &str) -> Result<Option<SshKeyInfo>, CloudError>;
    async fn import_ssh_key(&self, name: &str, public_key_material: &[u8]) -> Result<SshKeyInfo, CloudError>;

    async fn find_volume_by_tag(&self, key: &str, value: &str) -> Result<Option<VolumeInfo>, CloudError>;
    async fn create_volume(
        &self,
        availability_zone: &str,
        size_gb: i64,
        volume_type: &str,
        tags: &Tags,
    ) -> Result<VolumeInfo, CloudError>;

    /// ElasticIP cannot be tagged directly; `kubeup-units` probes the
    /// sentinel tag on `sentinel_resource_id` before calling this.
    async fn find_elastic_ip_by_allocation_id(
        &self,
        allocation_id: &str,
    ) -> Result<Option<ElasticIpInfo>, CloudError>;
    async fn allocate_elastic_ip(&self) -> Result<ElasticIpInfo, CloudError>;

    async fn get_tags(&self, resource_id: &str) -> Result<Tags, CloudError>;
    async fn create_tags(&self, resource_id: &str, tags: &Tags) -> Result<(), CloudError>;

    async fn find_instance_by_tag(&self, key: &str, value: &str) -> Result<Option<InstanceInfo>, CloudError>;
    async fn run_instance(
        &self,
        image_id: &str,
        instance_type: &str,
        subnet_id: &str,
        security_group_ids: &[String],
        key_name: &str,
        user_data: &[u8],
        iam_instance_profile: &str,
        tags: &Tags,
    ) -> Result<InstanceInfo, CloudError>;
    async fn attach_volume(&self, instance_id: &str, volume_id: &str, device: &str) -> Result<(), CloudError>;
    async fn associate_elastic_ip(&self, instance_id: &str, allocation_id: &str) -> Result<(), CloudError>;

    async fn find_launch_configuration(
        &self,
        name: &str,
    ) -> Result<Option<LaunchConfigurationInfo>, CloudError>;
    async fn create_launch_configuration(
        &self,
        name: &str,
        image_id: &str,
        instance_type: &str,
        security_group_ids: &[String],
        key_name: &str,
        user_data: &[u8],
        iam_instance_profile: &str,
    ) -> Result<LaunchConfigurationInfo, CloudError>;

    async fn find_autoscaling_group(&self, name: &str) -> Result<Option<AutoscalingGroupInfo>, CloudError>;
    async fn create_autoscaling_group(
        &self,
        name: &str,
        launch_configuration_name: &str,
        min_size: i32,
        max_size: i32,
        desired_capacity: i32,
        subnet_ids: &[String],
    ) -> Result<AutoscalingGroupInfo, CloudError>;

    /// Bounded poll per spec §4.8/§5: caller picks interval/attempts; the
    /// adapter only re-describes.
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>, CloudError>;

    /// Deletes one resource by provider id. `kind` is a Unit's `unit_type()`
    /// string (`"Vpc"`, `"Instance"`, `"SecurityGroup"`, …) — `delete cluster`
    /// drives this straight off whatever a `find_*_by_tag` sweep turned up,
    /// without needing one delete method per resource kind on this trait.
    /// Deleting something already gone is not an error: the retry-until-empty
    /// sweep in `delete cluster` re-lists after every pass, so a resource a
    /// concurrent pass already removed simply stops showing up.
    async fn delete_resource(&self, kind: &str, id: &str) -> Result<(), CloudError>;
}
