//! AWS implementation of [`CloudAdapter`] via the EC2/IAM/Autoscaling query
//! APIs and the S3 REST API, all SigV4-signed by hand.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;

use crate::adapter::*;
use crate::error::CloudError;
use crate::sigv4::{sigv4_headers, url_host, AwsCredentials};
use crate::xml::{xml_all_texts, xml_error_code, xml_error_message, xml_items, xml_text};

pub struct AwsAdapter {
    client: Client,
    creds: AwsCredentials,
    region: String,
    endpoint_overrides: Option<EndpointOverrides>,
}

/// Lets tests point every service at one local mock server instead of the
/// real regional hostnames.
struct EndpointOverrides {
    ec2: String,
    iam: String,
    autoscaling: String,
}

impl AwsAdapter {
    pub fn new(creds: AwsCredentials, region: impl Into<String>) -> Self {
        AwsAdapter {
            client: Client::new(),
            creds,
            region: region.into(),
            endpoint_overrides: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint_override(creds: AwsCredentials, region: impl Into<String>, base_url: &str) -> Self {
        AwsAdapter {
            client: Client::new(),
            creds,
            region: region.into(),
            endpoint_overrides: Some(EndpointOverrides {
                ec2: base_url.to_string(),
                iam: base_url.to_string(),
                autoscaling: base_url.to_string(),
            }),
        }
    }

    fn ec2_endpoint(&self) -> String {
        match &self.endpoint_overrides {
            Some(o) => o.ec2.clone(),
            None => format!("https://ec2.{}.amazonaws.com/", self.region),
        }
    }

    fn iam_endpoint(&self) -> String {
        match &self.endpoint_overrides {
            Some(o) => o.iam.clone(),
            None => "https://iam.amazonaws.com/".to_string(),
        }
    }

    fn autoscaling_endpoint(&self) -> String {
        match &self.endpoint_overrides {
            Some(o) => o.autoscaling.clone(),
            None => format!("https://autoscaling.{}.amazonaws.com/", self.region),
        }
    }

    async fn query(
        &self,
        endpoint: &str,
        service: &str,
        action: &str,
        params: &[(String, String)],
        operation: &str,
        resource: &str,
    ) -> Result<String, CloudError> {
        let mut form: Vec<(String, String)> = vec![("Action".into(), action.to_string()), ("Version".into(), "2016-11-15".to_string())];
        form.extend(params.iter().cloned());

        let body = serde_urlencoded::to_string(&form).map_err(|e| CloudError::Parse {
            operation: operation.to_string(),
            resource: resource.to_string(),
            message: e.to_string(),
        })?;

        let host = url_host(endpoint);
        let headers = sigv4_headers(
            "POST",
            "/",
            "",
            "application/x-www-form-urlencoded; charset=utf-8",
            body.as_bytes(),
            &self.creds,
            &self.region,
            service,
            host,
        );

        let mut req = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")
            .header("Host", host);
        for (k, v) in &headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let resp = req.body(body).send().await.map_err(|source| CloudError::Transport {
            operation: operation.to_string(),
            resource: resource.to_string(),
            source,
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|source| CloudError::Transport {
            operation: operation.to_string(),
            resource: resource.to_string(),
            source,
        })?;

        if !status.is_success() {
            let code = xml_error_code(&text).unwrap_or_else(|| status.to_string());
            let message = xml_error_message(&text).unwrap_or_else(|| text.clone());
            return Err(CloudError::Api {
                operation: operation.to_string(),
                resource: resource.to_string(),
                code,
                message,
            });
        }

        Ok(text)
    }

    fn tags_to_params(tags: &Tags, out: &mut Vec<(String, String)>) {
        for (i, (k, v)) in tags.iter().enumerate() {
            out.push((format!("Tag.{}.Key", i + 1), k.clone()));
            out.push((format!("Tag.{}.Value", i + 1), v.clone()));
        }
    }
}

fn parse_tags_from_item(item_xml: &str) -> Tags {
    let mut tags = BTreeMap::new();
    for tag_item in xml_items(item_xml, "item") {
        if let (Some(k), Some(v)) = (xml_text(&tag_item, "key"), xml_text(&tag_item, "value")) {
            tags.insert(k, v);
        }
    }
    tags
}

#[async_trait]
impl CloudAdapter for AwsAdapter {
    async fn find_vpc_by_tag(&self, key: &str, value: &str) -> Result<Option<VpcInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "tag:".to_string() + key),
            ("Filter.1.Value.1".into(), value.to_string()),
        ];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "DescribeVpcs", &filter, "describe", "vpc")
            .await?;
        let items = xml_items(&body, "item");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(VpcInfo {
            id: xml_text(item, "vpcId").unwrap_or_default(),
            cidr: xml_text(item, "cidrBlock").unwrap_or_default(),
            tags: parse_tags_from_item(item),
        }))
    }

    async fn create_vpc(&self, cidr: &str, tags: &Tags) -> Result<VpcInfo, CloudError> {
        let params = vec![("CidrBlock".into(), cidr.to_string())];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "CreateVpc", &params, "create", "vpc")
            .await?;
        let id = xml_text(&body, "vpcId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(VpcInfo {
            id,
            cidr: cidr.to_string(),
            tags: tags.clone(),
        })
    }

    async fn find_dhcp_options_by_tag(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<DhcpOptionsInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "tag:".to_string() + key),
            ("Filter.1.Value.1".into(), value.to_string()),
        ];
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "DescribeDhcpOptions",
                &filter,
                "describe",
                "dhcp-options",
            )
            .await?;
        let items = xml_items(&body, "item");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(DhcpOptionsInfo {
            id: xml_text(item, "dhcpOptionsId").unwrap_or_default(),
            domain_name: xml_text(item, "domain-name").unwrap_or_default(),
            domain_name_servers: xml_all_texts(item, "domain-name-servers"),
            tags: parse_tags_from_item(item),
        }))
    }

    async fn create_dhcp_options(
        &self,
        domain_name: &str,
        domain_name_servers: &[String],
        tags: &Tags,
    ) -> Result<DhcpOptionsInfo, CloudError> {
        let mut params = vec![
            ("DhcpConfiguration.1.Key".into(), "domain-name".to_string()),
            ("DhcpConfiguration.1.Value.1".into(), domain_name.to_string()),
            ("DhcpConfiguration.2.Key".into(), "domain-name-servers".to_string()),
        ];
        for (i, server) in domain_name_servers.iter().enumerate() {
            params.push((format!("DhcpConfiguration.2.Value.{}", i + 1), server.clone()));
        }
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "CreateDhcpOptions",
                &params,
                "create",
                "dhcp-options",
            )
            .await?;
        let id = xml_text(&body, "dhcpOptionsId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(DhcpOptionsInfo {
            id,
            domain_name: domain_name.to_string(),
            domain_name_servers: domain_name_servers.to_vec(),
            tags: tags.clone(),
        })
    }

    async fn associate_dhcp_options(&self, vpc_id: &str, dhcp_options_id: &str) -> Result<(), CloudError> {
        let params = vec![
            ("VpcId".into(), vpc_id.to_string()),
            ("DhcpOptionsId".into(), dhcp_options_id.to_string()),
        ];
        self.query(
            &self.ec2_endpoint(),
            "ec2",
            "AssociateDhcpOptions",
            &params,
            "associate",
            "dhcp-options",
        )
        .await?;
        Ok(())
    }

    async fn find_subnet_by_tag(&self, key: &str, value: &str) -> Result<Option<SubnetInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "tag:".to_string() + key),
            ("Filter.1.Value.1".into(), value.to_string()),
        ];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "DescribeSubnets", &filter, "describe", "subnet")
            .await?;
        let items = xml_items(&body, "item");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(SubnetInfo {
            id: xml_text(item, "subnetId").unwrap_or_default(),
            vpc_id: xml_text(item, "vpcId").unwrap_or_default(),
            cidr: xml_text(item, "cidrBlock").unwrap_or_default(),
            availability_zone: xml_text(item, "availabilityZone").unwrap_or_default(),
            tags: parse_tags_from_item(item),
        }))
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr: &str,
        availability_zone: &str,
        tags: &Tags,
    ) -> Result<SubnetInfo, CloudError> {
        let params = vec![
            ("VpcId".into(), vpc_id.to_string()),
            ("CidrBlock".into(), cidr.to_string()),
            ("AvailabilityZone".into(), availability_zone.to_string()),
        ];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "CreateSubnet", &params, "create", "subnet")
            .await?;
        let id = xml_text(&body, "subnetId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(SubnetInfo {
            id,
            vpc_id: vpc_id.to_string(),
            cidr: cidr.to_string(),
            availability_zone: availability_zone.to_string(),
            tags: tags.clone(),
        })
    }

    async fn find_internet_gateway_by_tag(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<InternetGatewayInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "tag:".to_string() + key),
            ("Filter.1.Value.1".into(), value.to_string()),
        ];
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "DescribeInternetGateways",
                &filter,
                "describe",
                "internet-gateway",
            )
            .await?;
        let items = xml_items(&body, "item");
        let Some(item) = items.first() else { return Ok(None) };
        let attachments = xml_items(item, "item");
        let attached_vpc_id = attachments.iter().find_map(|a| xml_text(a, "vpcId"));
        Ok(Some(InternetGatewayInfo {
            id: xml_text(item, "internetGatewayId").unwrap_or_default(),
            attached_vpc_id,
            tags: parse_tags_from_item(item),
        }))
    }

    async fn create_internet_gateway(&self, tags: &Tags) -> Result<InternetGatewayInfo, CloudError> {
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "CreateInternetGateway",
                &[],
                "create",
                "internet-gateway",
            )
            .await?;
        let id = xml_text(&body, "internetGatewayId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(InternetGatewayInfo {
            id,
            attached_vpc_id: None,
            tags: tags.clone(),
        })
    }

    async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<(), CloudError> {
        let params = vec![
            ("InternetGatewayId".into(), igw_id.to_string()),
            ("VpcId".into(), vpc_id.to_string()),
        ];
        self.query(
            &self.ec2_endpoint(),
            "ec2",
            "AttachInternetGateway",
            &params,
            "attach",
            "internet-gateway",
        )
        .await?;
        Ok(())
    }

    async fn find_route_table_by_tag(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<RouteTableInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "tag:".to_string() + key),
            ("Filter.1.Value.1".into(), value.to_string()),
        ];
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "DescribeRouteTables",
                &filter,
                "describe",
                "route-table",
            )
            .await?;
        let items = xml_items(&body, "item");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(RouteTableInfo {
            id: xml_text(item, "routeTableId").unwrap_or_default(),
            vpc_id: xml_text(item, "vpcId").unwrap_or_default(),
            tags: parse_tags_from_item(item),
        }))
    }

    async fn create_route_table(&self, vpc_id: &str, tags: &Tags) -> Result<RouteTableInfo, CloudError> {
        let params = vec![("VpcId".into(), vpc_id.to_string())];
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "CreateRouteTable",
                &params,
                "create",
                "route-table",
            )
            .await?;
        let id = xml_text(&body, "routeTableId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(RouteTableInfo {
            id,
            vpc_id: vpc_id.to_string(),
            tags: tags.clone(),
        })
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target_internet_gateway_id: &str,
    ) -> Result<(), CloudError> {
        let params = vec![
            ("RouteTableId".into(), route_table_id.to_string()),
            ("DestinationCidrBlock".into(), destination_cidr.to_string()),
            ("GatewayId".into(), target_internet_gateway_id.to_string()),
        ];
        self.query(&self.ec2_endpoint(), "ec2", "CreateRoute", &params, "create", "route")
            .await?;
        Ok(())
    }

    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<(), CloudError> {
        let params = vec![
            ("RouteTableId".into(), route_table_id.to_string()),
            ("SubnetId".into(), subnet_id.to_string()),
        ];
        self.query(
            &self.ec2_endpoint(),
            "ec2",
            "AssociateRouteTable",
            &params,
            "associate",
            "route-table",
        )
        .await?;
        Ok(())
    }

    async fn find_security_group_by_name(
        &self,
        vpc_id: &str,
        name: &str,
    ) -> Result<Option<SecurityGroupInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "vpc-id".to_string()),
            ("Filter.1.Value.1".into(), vpc_id.to_string()),
            ("Filter.2.Name".into(), "group-name".to_string()),
            ("Filter.2.Value.1".into(), name.to_string()),
        ];
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "DescribeSecurityGroups",
                &filter,
                "describe",
                "security-group",
            )
            .await?;
        let items = xml_items(&body, "item");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(SecurityGroupInfo {
            id: xml_text(item, "groupId").unwrap_or_default(),
            vpc_id: xml_text(item, "vpcId").unwrap_or_default(),
            name: xml_text(item, "groupName").unwrap_or_default(),
            tags: parse_tags_from_item(item),
        }))
    }

    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
        tags: &Tags,
    ) -> Result<SecurityGroupInfo, CloudError> {
        let params = vec![
            ("VpcId".into(), vpc_id.to_string()),
            ("GroupName".into(), name.to_string()),
            ("GroupDescription".into(), description.to_string()),
        ];
        let body = self
            .query(
                &self.ec2_endpoint(),
                "ec2",
                "CreateSecurityGroup",
                &params,
                "create",
                "security-group",
            )
            .await?;
        let id = xml_text(&body, "groupId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(SecurityGroupInfo {
            id,
            vpc_id: vpc_id.to_string(),
            name: name.to_string(),
            tags: tags.clone(),
        })
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<(), CloudError> {
        let mut params = vec![
            ("GroupId".into(), group_id.to_string()),
            ("IpPermissions.1.IpProtocol".into(), rule.protocol.clone()),
            ("IpPermissions.1.FromPort".into(), rule.from_port.to_string()),
            ("IpPermissions.1.ToPort".into(), rule.to_port.to_string()),
        ];
        if let Some(cidr) = &rule.cidr {
            params.push(("IpPermissions.1.IpRanges.1.CidrIp".into(), cidr.clone()));
        }
        if let Some(src) = &rule.source_group_id {
            params.push(("IpPermissions.1.Groups.1.GroupId".into(), src.clone()));
        }
        self.query(
            &self.ec2_endpoint(),
            "ec2",
            "AuthorizeSecurityGroupIngress",
            &params,
            "authorize",
            "security-group-ingress",
        )
        .await?;
        Ok(())
    }

    async fn find_iam_role(&self, name: &str) -> Result<Option<IamRoleInfo>, CloudError> {
        let params = vec![("RoleName".into(), name.to_string())];
        match self
            .query(&self.iam_endpoint(), "iam", "GetRole", &params, "describe", "iam-role")
            .await
        {
            Ok(body) => Ok(Some(IamRoleInfo {
                name: xml_text(&body, "RoleName").unwrap_or_default(),
                assume_role_policy_document: xml_text(&body, "AssumeRolePolicyDocument").unwrap_or_default(),
            })),
            Err(CloudError::Api { code, .. }) if CloudError::is_not_found(&code) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_iam_role(
        &self,
        name: &str,
        assume_role_policy_document: &str,
    ) -> Result<IamRoleInfo, CloudError> {
        let params = vec![
            ("RoleName".into(), name.to_string()),
            ("AssumeRolePolicyDocument".into(), assume_role_policy_document.to_string()),
        ];
        self.query(&self.iam_endpoint(), "iam", "CreateRole", &params, "create", "iam-role")
            .await?;
        Ok(IamRoleInfo {
            name: name.to_string(),
            assume_role_policy_document: assume_role_policy_document.to_string(),
        })
    }

    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> Result<(), CloudError> {
        let params = vec![
            ("RoleName".into(), role_name.to_string()),
            ("PolicyName".into(), policy_name.to_string()),
            ("PolicyDocument".into(), policy_document.to_string()),
        ];
        self.query(
            &self.iam_endpoint(),
            "iam",
            "PutRolePolicy",
            &params,
            "put",
            "iam-role-policy",
        )
        .await?;
        Ok(())
    }

    async fn find_instance_profile(&self, name: &str) -> Result<Option<InstanceProfileInfo>, CloudError> {
        let params = vec![("InstanceProfileName".into(), name.to_string())];
        match self
            .query(
                &self.iam_endpoint(),
                "iam",
                "GetInstanceProfile",
                &params,
                "describe",
                "instance-profile",
            )
            .await
        {
            Ok(body) => Ok(Some(InstanceProfileInfo {
                name: xml_text(&body, "InstanceProfileName").unwrap_or_default(),
                roles: xml_all_texts(&body, "RoleName"),
            })),
            Err(CloudError::Api { code, .. }) if CloudError::is_not_found(&code) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_instance_profile(&self, name: &str) -> Result<InstanceProfileInfo, CloudError> {
        let params = vec![("InstanceProfileName".into(), name.to_string())];
        self.query(
            &self.iam_endpoint(),
            "iam",
            "CreateInstanceProfile",
            &params,
            "create",
            "instance-profile",
        )
        .await?;
        Ok(InstanceProfileInfo {
            name: name.to_string(),
            roles: Vec::new(),
        })
    }

    async fn add_role_to_instance_profile(&self, profile_name: &str, role_name: &str) -> Result<(), CloudError> {
        let params = vec![
            ("InstanceProfileName".into(), profile_name.to_string()),
            ("RoleName".into(), role_name.to_string()),
        ];
        self.query(
            &self.iam_endpoint(),
            "iam",
            "AddRoleToInstanceProfile",
            &params,
            "add",
            "instance-profile-role",
        )
        .await?;
        Ok(())
    }

    async fn find_ssh_key(&self, name: &str) -> Result<Option<SshKeyInfo>, CloudError> {
        let params = vec![("KeyName.1".into(), name.to_string())];
        match self
            .query(&self.ec2_endpoint(), "ec2", "DescribeKeyPairs", &params, "describe", "key-pair")
            .await
        {
            Ok(body) => {
                let items = xml_items(&body, "item");
                Ok(items.first().map(|item| SshKeyInfo {
                    name: xml_text(item, "keyName").unwrap_or_default(),
                    fingerprint: xml_text(item, "keyFingerprint").unwrap_or_default(),
                }))
            }
            Err(CloudError::Api { code, .. }) if CloudError::is_not_found(&code) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn import_ssh_key(&self, name: &str, public_key_material: &[u8]) -> Result<SshKeyInfo, CloudError> {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(public_key_material);
        let params = vec![("KeyName".into(), name.to_string()), ("PublicKeyMaterial".into(), encoded)];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "ImportKeyPair", &params, "create", "key-pair")
            .await?;
        Ok(SshKeyInfo {
            name: name.to_string(),
            fingerprint: xml_text(&body, "keyFingerprint").unwrap_or_default(),
        })
    }

    async fn find_volume_by_tag(&self, key: &str, value: &str) -> Result<Option<VolumeInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "tag:".to_string() + key),
            ("Filter.1.Value.1".into(), value.to_string()),
        ];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "DescribeVolumes", &filter, "describe", "volume")
            .await?;
        let items = xml_items(&body, "item");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(VolumeInfo {
            id: xml_text(item, "volumeId").unwrap_or_default(),
            availability_zone: xml_text(item, "availabilityZone").unwrap_or_default(),
            size_gb: xml_text(item, "size").and_then(|s| s.parse().ok()).unwrap_or_default(),
            volume_type: xml_text(item, "volumeType").unwrap_or_default(),
            tags: parse_tags_from_item(item),
        }))
    }

    async fn create_volume(
        &self,
        availability_zone: &str,
        size_gb: i64,
        volume_type: &str,
        tags: &Tags,
    ) -> Result<VolumeInfo, CloudError> {
        let params = vec![
            ("AvailabilityZone".into(), availability_zone.to_string()),
            ("Size".into(), size_gb.to_string()),
            ("VolumeType".into(), volume_type.to_string()),
        ];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "CreateVolume", &params, "create", "volume")
            .await?;
        let id = xml_text(&body, "volumeId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(VolumeInfo {
            id,
            availability_zone: availability_zone.to_string(),
            size_gb,
            volume_type: volume_type.to_string(),
            tags: tags.clone(),
        })
    }

    async fn find_elastic_ip_by_allocation_id(
        &self,
        allocation_id: &str,
    ) -> Result<Option<ElasticIpInfo>, CloudError> {
        let params = vec![("AllocationId.1".into(), allocation_id.to_string())];
        match self
            .query(&self.ec2_endpoint(), "ec2", "DescribeAddresses", &params, "describe", "elastic-ip")
            .await
        {
            Ok(body) => {
                let items = xml_items(&body, "item");
                Ok(items.first().map(|item| ElasticIpInfo {
                    allocation_id: xml_text(item, "allocationId").unwrap_or_default(),
                    public_ip: xml_text(item, "publicIp").unwrap_or_default(),
                }))
            }
            Err(CloudError::Api { code, .. }) if CloudError::is_not_found(&code) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn allocate_elastic_ip(&self) -> Result<ElasticIpInfo, CloudError> {
        let params = vec![("Domain".into(), "vpc".to_string())];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "AllocateAddress", &params, "create", "elastic-ip")
            .await?;
        Ok(ElasticIpInfo {
            allocation_id: xml_text(&body, "allocationId").unwrap_or_default(),
            public_ip: xml_text(&body, "publicIp").unwrap_or_default(),
        })
    }

    async fn get_tags(&self, resource_id: &str) -> Result<Tags, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "resource-id".to_string()),
            ("Filter.1.Value.1".into(), resource_id.to_string()),
        ];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "DescribeTags", &filter, "describe", "tags")
            .await?;
        let mut tags = BTreeMap::new();
        for item in xml_items(&body, "item") {
            if let (Some(k), Some(v)) = (xml_text(&item, "key"), xml_text(&item, "value")) {
                tags.insert(k, v);
            }
        }
        Ok(tags)
    }

    async fn create_tags(&self, resource_id: &str, tags: &Tags) -> Result<(), CloudError> {
        let mut params = vec![("ResourceId.1".into(), resource_id.to_string())];
        Self::tags_to_params(tags, &mut params);
        self.query(&self.ec2_endpoint(), "ec2", "CreateTags", &params, "create", "tags")
            .await?;
        Ok(())
    }

    async fn find_instance_by_tag(&self, key: &str, value: &str) -> Result<Option<InstanceInfo>, CloudError> {
        let filter = vec![
            ("Filter.1.Name".into(), "tag:".to_string() + key),
            ("Filter.1.Value.1".into(), value.to_string()),
            ("Filter.2.Name".into(), "instance-state-name".to_string()),
            ("Filter.2.Value.1".into(), "pending".to_string()),
            ("Filter.2.Value.2".into(), "running".to_string()),
        ];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "DescribeInstances", &filter, "describe", "instance")
            .await?;
        let reservations = xml_items(&body, "item");
        for reservation in &reservations {
            if let Some(item) = xml_items(reservation, "item").first() {
                return Ok(Some(InstanceInfo {
                    id: xml_text(item, "instanceId").unwrap_or_default(),
                    state: xml_text(item, "name").unwrap_or_default(),
                    private_ip: xml_text(item, "privateIpAddress"),
                    public_ip: xml_text(item, "ipAddress"),
                    tags: parse_tags_from_item(item),
                }));
            }
        }
        Ok(None)
    }

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
    ) -> Result<InstanceInfo, CloudError> {
        use base64::Engine;
        let encoded_user_data = base64::engine::general_purpose::STANDARD.encode(user_data);
        let mut params = vec![
            ("ImageId".into(), image_id.to_string()),
            ("InstanceType".into(), instance_type.to_string()),
            ("SubnetId".into(), subnet_id.to_string()),
            ("KeyName".into(), key_name.to_string()),
            ("UserData".into(), encoded_user_data),
            ("MinCount".into(), "1".to_string()),
            ("MaxCount".into(), "1".to_string()),
            ("IamInstanceProfile.Name".into(), iam_instance_profile.to_string()),
        ];
        for (i, sg) in security_group_ids.iter().enumerate() {
            params.push((format!("SecurityGroupId.{}", i + 1), sg.clone()));
        }
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "RunInstances", &params, "create", "instance")
            .await?;
        let id = xml_text(&body, "instanceId").unwrap_or_default();
        if !tags.is_empty() {
            self.create_tags(&id, tags).await?;
        }
        Ok(InstanceInfo {
            id,
            state: "pending".to_string(),
            private_ip: None,
            public_ip: None,
            tags: tags.clone(),
        })
    }

    async fn attach_volume(&self, instance_id: &str, volume_id: &str, device: &str) -> Result<(), CloudError> {
        let params = vec![
            ("InstanceId".into(), instance_id.to_string()),
            ("VolumeId".into(), volume_id.to_string()),
            ("Device".into(), device.to_string()),
        ];
        self.query(&self.ec2_endpoint(), "ec2", "AttachVolume", &params, "attach", "volume")
            .await?;
        Ok(())
    }

    async fn associate_elastic_ip(&self, instance_id: &str, allocation_id: &str) -> Result<(), CloudError> {
        let params = vec![
            ("InstanceId".into(), instance_id.to_string()),
            ("AllocationId".into(), allocation_id.to_string()),
        ];
        self.query(
            &self.ec2_endpoint(),
            "ec2",
            "AssociateAddress",
            &params,
            "associate",
            "elastic-ip",
        )
        .await?;
        Ok(())
    }

    async fn find_launch_configuration(
        &self,
        name: &str,
    ) -> Result<Option<LaunchConfigurationInfo>, CloudError> {
        let params = vec![("LaunchConfigurationNames.member.1".into(), name.to_string())];
        let body = self
            .query(
                &self.autoscaling_endpoint(),
                "autoscaling",
                "DescribeLaunchConfigurations",
                &params,
                "describe",
                "launch-configuration",
            )
            .await?;
        let items = xml_items(&body, "member");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(LaunchConfigurationInfo {
            name: xml_text(item, "LaunchConfigurationName").unwrap_or_default(),
            image_id: xml_text(item, "ImageId").unwrap_or_default(),
            instance_type: xml_text(item, "InstanceType").unwrap_or_default(),
        }))
    }

    async fn create_launch_configuration(
        &self,
        name: &str,
        image_id: &str,
        instance_type: &str,
        security_group_ids: &[String],
        key_name: &str,
        user_data: &[u8],
        iam_instance_profile: &str,
    ) -> Result<LaunchConfigurationInfo, CloudError> {
        use base64::Engine;
        let encoded_user_data = base64::engine::general_purpose::STANDARD.encode(user_data);
        let mut params = vec![
            ("LaunchConfigurationName".into(), name.to_string()),
            ("ImageId".into(), image_id.to_string()),
            ("InstanceType".into(), instance_type.to_string()),
            ("KeyName".into(), key_name.to_string()),
            ("UserData".into(), encoded_user_data),
            ("IamInstanceProfile".into(), iam_instance_profile.to_string()),
        ];
        for (i, sg) in security_group_ids.iter().enumerate() {
            params.push((format!("SecurityGroups.member.{}", i + 1), sg.clone()));
        }
        self.query(
            &self.autoscaling_endpoint(),
            "autoscaling",
            "CreateLaunchConfiguration",
            &params,
            "create",
            "launch-configuration",
        )
        .await?;
        Ok(LaunchConfigurationInfo {
            name: name.to_string(),
            image_id: image_id.to_string(),
            instance_type: instance_type.to_string(),
        })
    }

    async fn find_autoscaling_group(&self, name: &str) -> Result<Option<AutoscalingGroupInfo>, CloudError> {
        let params = vec![("AutoScalingGroupNames.member.1".into(), name.to_string())];
        let body = self
            .query(
                &self.autoscaling_endpoint(),
                "autoscaling",
                "DescribeAutoScalingGroups",
                &params,
                "describe",
                "autoscaling-group",
            )
            .await?;
        let items = xml_items(&body, "member");
        let Some(item) = items.first() else { return Ok(None) };
        Ok(Some(AutoscalingGroupInfo {
            name: xml_text(item, "AutoScalingGroupName").unwrap_or_default(),
            launch_configuration_name: xml_text(item, "LaunchConfigurationName").unwrap_or_default(),
            min_size: xml_text(item, "MinSize").and_then(|s| s.parse().ok()).unwrap_or_default(),
            max_size: xml_text(item, "MaxSize").and_then(|s| s.parse().ok()).unwrap_or_default(),
            desired_capacity: xml_text(item, "DesiredCapacity")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }))
    }

    async fn create_autoscaling_group(
        &self,
        name: &str,
        launch_configuration_name: &str,
        min_size: i32,
        max_size: i32,
        desired_capacity: i32,
        subnet_ids: &[String],
    ) -> Result<AutoscalingGroupInfo, CloudError> {
        let params = vec![
            ("AutoScalingGroupName".into(), name.to_string()),
            ("LaunchConfigurationName".into(), launch_configuration_name.to_string()),
            ("MinSize".into(), min_size.to_string()),
            ("MaxSize".into(), max_size.to_string()),
            ("DesiredCapacity".into(), desired_capacity.to_string()),
            ("VPCZoneIdentifier".into(), subnet_ids.join(",")),
        ];
        self.query(
            &self.autoscaling_endpoint(),
            "autoscaling",
            "CreateAutoScalingGroup",
            &params,
            "create",
            "autoscaling-group",
        )
        .await?;
        Ok(AutoscalingGroupInfo {
            name: name.to_string(),
            launch_configuration_name: launch_configuration_name.to_string(),
            min_size,
            max_size,
            desired_capacity,
        })
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>, CloudError> {
        let params = vec![("InstanceId.1".into(), instance_id.to_string())];
        let body = self
            .query(&self.ec2_endpoint(), "ec2", "DescribeInstances", &params, "describe", "instance")
            .await?;
        let reservations = xml_items(&body, "item");
        for reservation in &reservations {
            if let Some(item) = xml_items(reservation, "item").first() {
                return Ok(Some(InstanceInfo {
                    id: xml_text(item, "instanceId").unwrap_or_default(),
                    state: xml_text(item, "name").unwrap_or_default(),
                    private_ip: xml_text(item, "privateIpAddress"),
                    public_ip: xml_text(item, "ipAddress"),
                    tags: parse_tags_from_item(item),
                }));
            }
        }
        Ok(None)
    }

    async fn delete_resource(&self, kind: &str, id: &str) -> Result<(), CloudError> {
        let (endpoint, service, action, id_param): (String, &str, &str, &str) = match kind {
            "Vpc" => (self.ec2_endpoint(), "ec2", "DeleteVpc", "VpcId"),
            "DhcpOptions" => (self.ec2_endpoint(), "ec2", "DeleteDhcpOptions", "DhcpOptionsId"),
            "Subnet" => (self.ec2_endpoint(), "ec2", "DeleteSubnet", "SubnetId"),
            "InternetGateway" => (self.ec2_endpoint(), "ec2", "DeleteInternetGateway", "InternetGatewayId"),
            "RouteTable" => (self.ec2_endpoint(), "ec2", "DeleteRouteTable", "RouteTableId"),
            "SecurityGroup" => (self.ec2_endpoint(), "ec2", "DeleteSecurityGroup", "GroupId"),
            "SshKey" => (self.ec2_endpoint(), "ec2", "DeleteKeyPair", "KeyName"),
            "PersistentVolume" => (self.ec2_endpoint(), "ec2", "DeleteVolume", "VolumeId"),
            "ElasticIp" => (self.ec2_endpoint(), "ec2", "ReleaseAddress", "AllocationId"),
            "Instance" => (self.ec2_endpoint(), "ec2", "TerminateInstances", "InstanceId.1"),
            "LaunchConfiguration" => {
                (self.autoscaling_endpoint(), "autoscaling", "DeleteLaunchConfiguration", "LaunchConfigurationName")
            }
            "AutoscalingGroup" => {
                let params = vec![
                    ("AutoScalingGroupName".into(), id.to_string()),
                    ("ForceDelete".into(), "true".to_string()),
                ];
                self.query(
                    &self.autoscaling_endpoint(),
                    "autoscaling",
                    "DeleteAutoScalingGroup",
                    &params,
                    "delete",
                    "autoscaling-group",
                )
                .await?;
                return Ok(());
            }
            "IamRole" => {
                let params = vec![("RoleName".into(), id.to_string())];
                self.query(&self.iam_endpoint(), "iam", "DeleteRole", &params, "delete", "iam-role").await?;
                return Ok(());
            }
            "InstanceProfile" => {
                let params = vec![("InstanceProfileName".into(), id.to_string())];
                self.query(&self.iam_endpoint(), "iam", "DeleteInstanceProfile", &params, "delete", "instance-profile")
                    .await?;
                return Ok(());
            }
            // IgwAttachment/Route/RouteTableAssoc/VpcDhcpOptionsAssoc/IamRolePolicy/IngressRule/
            // VolumeAttachment/CertBuilder have no standalone provider id of their own — they
            // unwind as a side effect of deleting the resource they're attached to.
            _ => return Ok(()),
        };
        let params = vec![(id_param.to_string(), id.to_string())];
        self.query(&endpoint, service, action, &params, "delete", kind).await?;
        Ok(())
    }
}
