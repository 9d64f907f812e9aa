//! GCE implementation of [`CloudAdapter`] via Application Default
//! Credentials (`gcp_auth`) and the Compute Engine v1 JSON REST API.
//!
//! GCE has no DHCP options, internet gateway, or Elastic IP concept — those
//! methods are no-ops/`Ok(None)` here, since `ClusterComposer` never calls
//! them on the GCE path (spec §4.9). IAM role/instance profile are
//! satisfied by a single project-scoped service account instead of the
//! AWS role+profile pair.

use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::TokenProvider;
use reqwest::Client;
use serde_json::{json, Value};

use crate::adapter::*;
use crate::error::CloudError;

const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

pub struct GceAdapter {
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
    project: String,
    region: String,
    zone: String,
}

impl GceAdapter {
    pub async fn new(project: impl Into<String>, region: impl Into<String>, zone: impl Into<String>) -> Result<Self, CloudError> {
        let token_provider = gcp_auth::provider()
            .await
            .map_err(|e| CloudError::Credentials(e.to_string()))?;
        Ok(GceAdapter {
            client: Client::new(),
            token_provider,
            project: project.into(),
            region: region.into(),
            zone: zone.into(),
        })
    }

    async fn bearer_token(&self) -> Result<String, CloudError> {
        let token = self
            .token_provider
            .token(&[COMPUTE_SCOPE])
            .await
            .map_err(|e| CloudError::Credentials(e.to_string()))?;
        Ok(token.as_str().to_string())
    }

    fn base(&self) -> String {
        format!("https://compute.googleapis.com/compute/v1/projects/{}", self.project)
    }

    async fn get(&self, operation: &str, resource: &str, url: &str) -> Result<Option<Value>, CloudError> {
        let token = self.bearer_token().await?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| CloudError::Transport {
                operation: operation.to_string(),
                resource: resource.to_string(),
                source,
            })?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let status = resp.status();
        let body: Value = resp.json().await.map_err(|source| CloudError::Transport {
            operation: operation.to_string(),
            resource: resource.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(Self::api_error(operation, resource, &body));
        }
        Ok(Some(body))
    }

    async fn post(&self, operation: &str, resource: &str, url: &str, body: Value) -> Result<Value, CloudError> {
        let token = self.bearer_token().await?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|source| CloudError::Transport {
                operation: operation.to_string(),
                resource: resource.to_string(),
                source,
            })?;
        let status = resp.status();
        let response_body: Value = resp.json().await.map_err(|source| CloudError::Transport {
            operation: operation.to_string(),
            resource: resource.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(Self::api_error(operation, resource, &response_body));
        }
        Ok(response_body)
    }

    async fn delete(&self, operation: &str, resource: &str, url: &str) -> Result<(), CloudError> {
        let token = self.bearer_token().await?;
        let resp = self
            .client
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| CloudError::Transport {
                operation: operation.to_string(),
                resource: resource.to_string(),
                source,
            })?;
        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(());
        }
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or_default();
            return Err(Self::api_error(operation, resource, &body));
        }
        Ok(())
    }

    fn api_error(operation: &str, resource: &str, body: &Value) -> CloudError {
        let code = body["error"]["errors"][0]["reason"]
            .as_str()
            .or_else(|| body["error"]["status"].as_str())
            .unwrap_or("unknown")
            .to_string();
        let message = body["error"]["message"].as_str().unwrap_or("").to_string();
        CloudError::Api {
            operation: operation.to_string(),
            resource: resource.to_string(),
            code,
            message,
        }
    }

    fn labels_from(value: &Value) -> Tags {
        value["labels"]
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.as_str().unwrap_or("").to_string())).collect())
            .unwrap_or_default()
    }

    async fn find_by_label(
        &self,
        operation: &str,
        resource: &str,
        list_url: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<Value>, CloudError> {
        let filter = format!("labels.{}={}", key, value);
        let url = format!("{}?filter={}", list_url, urlencoding_lite(&filter));
        let Some(body) = self.get(operation, resource, &url).await? else {
            return Ok(None);
        };
        Ok(body["items"].as_array().and_then(|items| items.first()).cloned())
    }
}

fn urlencoding_lite(s: &str) -> String {
    s.replace(' ', "%20").replace('=', "%3D").replace('"', "%22")
}

#[async_trait]
impl CloudAdapter for GceAdapter {
    async fn find_vpc_by_tag(&self, key: &str, value: &str) -> Result<Option<VpcInfo>, CloudError> {
        let url = format!("{}/global/networks", self.base());
        let found = self.find_by_label("describe", "network", &url, key, value).await?;
        Ok(found.map(|n| VpcInfo {
            id: n["name"].as_str().unwrap_or_default().to_string(),
            cidr: n["IPv4Range"].as_str().unwrap_or_default().to_string(),
            tags: Self::labels_from(&n),
        }))
    }

    async fn create_vpc(&self, cidr: &str, tags: &Tags) -> Result<VpcInfo, CloudError> {
        let name = tags.get("Name").cloned().unwrap_or_else(|| "kubeup-network".to_string());
        let body = json!({
            "name": name,
            "autoCreateSubnetworks": false,
            "labels": tags,
        });
        let url = format!("{}/global/networks", self.base());
        self.post("create", "network", &url, body).await?;
        Ok(VpcInfo {
            id: name,
            cidr: cidr.to_string(),
            tags: tags.clone(),
        })
    }

    async fn find_dhcp_options_by_tag(&self, _key: &str, _value: &str) -> Result<Option<DhcpOptionsInfo>, CloudError> {
        Ok(None)
    }

    async fn create_dhcp_options(
        &self,
        _domain_name: &str,
        _domain_name_servers: &[String],
        _tags: &Tags,
    ) -> Result<DhcpOptionsInfo, CloudError> {
        Err(CloudError::Api {
            operation: "create".into(),
            resource: "dhcp-options".into(),
            code: "Unsupported".into(),
            message: "GCE has no DHCP options resource".into(),
        })
    }

    async fn associate_dhcp_options(&self, _vpc_id: &str, _dhcp_options_id: &str) -> Result<(), CloudError> {
        Ok(())
    }

    async fn find_subnet_by_tag(&self, key: &str, value: &str) -> Result<Option<SubnetInfo>, CloudError> {
        let url = format!("{}/regions/{}/subnetworks", self.base(), self.region);
        let found = self.find_by_label("describe", "subnetwork", &url, key, value).await?;
        Ok(found.map(|s| SubnetInfo {
            id: s["name"].as_str().unwrap_or_default().to_string(),
            vpc_id: s["network"].as_str().unwrap_or_default().to_string(),
            cidr: s["ipCidrRange"].as_str().unwrap_or_default().to_string(),
            availability_zone: self.zone.clone(),
            tags: Self::labels_from(&s),
        }))
    }

    async fn create_subnet(&self, vpc_id: &str, cidr: &str, _availability_zone: &str, tags: &Tags) -> Result<SubnetInfo, CloudError> {
        let name = tags.get("Name").cloned().unwrap_or_else(|| "kubeup-subnet".to_string());
        let body = json!({
            "name": name,
            "ipCidrRange": cidr,
            "network": format!("{}/global/networks/{}", self.base(), vpc_id),
            "region": self.region,
        });
        let url = format!("{}/regions/{}/subnetworks", self.base(), self.region);
        self.post("create", "subnetwork", &url, body).await?;
        Ok(SubnetInfo {
            id: name,
            vpc_id: vpc_id.to_string(),
            cidr: cidr.to_string(),
            availability_zone: self.zone.clone(),
            tags: tags.clone(),
        })
    }

    async fn find_internet_gateway_by_tag(&self, _key: &str, _value: &str) -> Result<Option<InternetGatewayInfo>, CloudError> {
        Ok(None)
    }

    async fn create_internet_gateway(&self, _tags: &Tags) -> Result<InternetGatewayInfo, CloudError> {
        Err(CloudError::Api {
            operation: "create".into(),
            resource: "internet-gateway".into(),
            code: "Unsupported".into(),
            message: "GCE routes egress implicitly, no explicit gateway resource".into(),
        })
    }

    async fn attach_internet_gateway(&self, _igw_id: &str, _vpc_id: &str) -> Result<(), CloudError> {
        Ok(())
    }

    async fn find_route_table_by_tag(&self, _key: &str, _value: &str) -> Result<Option<RouteTableInfo>, CloudError> {
        Ok(None)
    }

    async fn create_route_table(&self, vpc_id: &str, tags: &Tags) -> Result<RouteTableInfo, CloudError> {
        Ok(RouteTableInfo {
            id: format!("{}-implicit-routes", vpc_id),
            vpc_id: vpc_id.to_string(),
            tags: tags.clone(),
        })
    }

    async fn create_route(&self, _route_table_id: &str, _destination_cidr: &str, _target_internet_gateway_id: &str) -> Result<(), CloudError> {
        Ok(())
    }

    async fn associate_route_table(&self, _route_table_id: &str, _subnet_id: &str) -> Result<(), CloudError> {
        Ok(())
    }

    async fn find_security_group_by_name(&self, _vpc_id: &str, name: &str) -> Result<Option<SecurityGroupInfo>, CloudError> {
        let url = format!("{}/global/firewalls/{}", self.base(), name);
        let Some(f) = self.get("describe", "firewall", &url).await? else {
            return Ok(None);
        };
        Ok(Some(SecurityGroupInfo {
            id: f["name"].as_str().unwrap_or_default().to_string(),
            vpc_id: f["network"].as_str().unwrap_or_default().to_string(),
            name: f["name"].as_str().unwrap_or_default().to_string(),
            tags: Self::labels_from(&f),
        }))
    }

    async fn create_security_group(&self, vpc_id: &str, name: &str, description: &str, tags: &Tags) -> Result<SecurityGroupInfo, CloudError> {
        let body = json!({
            "name": name,
            "network": format!("{}/global/networks/{}", self.base(), vpc_id),
            "description": description,
            "allowed": [],
        });
        let url = format!("{}/global/firewalls", self.base());
        self.post("create", "firewall", &url, body).await?;
        Ok(SecurityGroupInfo {
            id: name.to_string(),
            vpc_id: vpc_id.to_string(),
            name: name.to_string(),
            tags: tags.clone(),
        })
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<(), CloudError> {
        let url = format!("{}/global/firewalls/{}", self.base(), group_id);
        let body = json!({
            "allowed": [{
                "IPProtocol": rule.protocol,
                "ports": [format!("{}-{}", rule.from_port, rule.to_port)],
            }],
            "sourceRanges": rule.cidr.as_ref().map(|c| vec![c.clone()]).unwrap_or_default(),
        });
        self.client
            .patch(&url)
            .bearer_auth(self.bearer_token().await?)
            .json(&body)
            .send()
            .await
            .map_err(|source| CloudError::Transport {
                operation: "patch".into(),
                resource: "firewall".into(),
                source,
            })?;
        Ok(())
    }

    async fn find_iam_role(&self, _name: &str) -> Result<Option<IamRoleInfo>, CloudError> {
        Ok(None)
    }

    async fn create_iam_role(&self, name: &str, assume_role_policy_document: &str) -> Result<IamRoleInfo, CloudError> {
        Ok(IamRoleInfo {
            name: name.to_string(),
            assume_role_policy_document: assume_role_policy_document.to_string(),
        })
    }

    async fn put_role_policy(&self, _role_name: &str, _policy_name: &str, _policy_document: &str) -> Result<(), CloudError> {
        Ok(())
    }

    async fn find_instance_profile(&self, _name: &str) -> Result<Option<InstanceProfileInfo>, CloudError> {
        Ok(None)
    }

    async fn create_instance_profile(&self, name: &str) -> Result<InstanceProfileInfo, CloudError> {
        Ok(InstanceProfileInfo {
            name: name.to_string(),
            roles: Vec::new(),
        })
    }

    async fn add_role_to_instance_profile(&self, _profile_name: &str, _role_name: &str) -> Result<(), CloudError> {
        Ok(())
    }

    async fn find_ssh_key(&self, _name: &str) -> Result<Option<SshKeyInfo>, CloudError> {
        // SSH keys live in project metadata, not as a discrete resource;
        // ClusterComposer always (re)writes the metadata entry instead of
        // diffing it, so there is nothing to find.
        Ok(None)
    }

    async fn import_ssh_key(&self, name: &str, public_key_material: &[u8]) -> Result<SshKeyInfo, CloudError> {
        let material = String::from_utf8_lossy(public_key_material).to_string();
        let url = format!("{}", self.base());
        let body = json!({
            "items": [{
                "key": "ssh-keys",
                "value": format!("kubeup:{}", material),
            }],
        });
        self.post("set", "project-metadata", &format!("{}/setCommonInstanceMetadata", url), body)
            .await?;
        Ok(SshKeyInfo {
            name: name.to_string(),
            fingerprint: String::new(),
        })
    }

    async fn find_volume_by_tag(&self, key: &str, value: &str) -> Result<Option<VolumeInfo>, CloudError> {
        let url = format!("{}/zones/{}/disks", self.base(), self.zone);
        let found = self.find_by_label("describe", "disk", &url, key, value).await?;
        Ok(found.map(|d| VolumeInfo {
            id: d["name"].as_str().unwrap_or_default().to_string(),
            availability_zone: self.zone.clone(),
            size_gb: d["sizeGb"].as_str().and_then(|s| s.parse().ok()).unwrap_or_default(),
            volume_type: d["type"].as_str().unwrap_or_default().to_string(),
            tags: Self::labels_from(&d),
        }))
    }

    async fn create_volume(&self, _availability_zone: &str, size_gb: i64, volume_type: &str, tags: &Tags) -> Result<VolumeInfo, CloudError> {
        let name = tags.get("Name").cloned().unwrap_or_else(|| "kubeup-disk".to_string());
        let body = json!({
            "name": name,
            "sizeGb": size_gb.to_string(),
            "type": format!("zones/{}/diskTypes/{}", self.zone, volume_type),
            "labels": tags,
        });
        let url = format!("{}/zones/{}/disks", self.base(), self.zone);
        self.post("create", "disk", &url, body).await?;
        Ok(VolumeInfo {
            id: name,
            availability_zone: self.zone.clone(),
            size_gb,
            volume_type: volume_type.to_string(),
            tags: tags.clone(),
        })
    }

    async fn find_elastic_ip_by_allocation_id(&self, allocation_id: &str) -> Result<Option<ElasticIpInfo>, CloudError> {
        let url = format!("{}/regions/{}/addresses/{}", self.base(), self.region, allocation_id);
        let Some(a) = self.get("describe", "address", &url).await? else {
            return Ok(None);
        };
        Ok(Some(ElasticIpInfo {
            allocation_id: a["name"].as_str().unwrap_or_default().to_string(),
            public_ip: a["address"].as_str().unwrap_or_default().to_string(),
        }))
    }

    async fn allocate_elastic_ip(&self) -> Result<ElasticIpInfo, CloudError> {
        let name = "kubeup-master-ip";
        let body = json!({ "name": name });
        let url = format!("{}/regions/{}/addresses", self.base(), self.region);
        self.post("create", "address", &url, body).await?;
        let describe_url = format!("{}/regions/{}/addresses/{}", self.base(), self.region, name);
        let a = self.get("describe", "address", &describe_url).await?.unwrap_or_default();
        Ok(ElasticIpInfo {
            allocation_id: name.to_string(),
            public_ip: a["address"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn get_tags(&self, resource_id: &str) -> Result<Tags, CloudError> {
        let url = format!("{}/zones/{}/disks/{}", self.base(), self.zone, resource_id);
        let found = self.get("describe", "disk", &url).await?;
        Ok(found.map(|v| Self::labels_from(&v)).unwrap_or_default())
    }

    async fn create_tags(&self, resource_id: &str, tags: &Tags) -> Result<(), CloudError> {
        let url = format!("{}/zones/{}/disks/{}/setLabels", self.base(), self.zone, resource_id);
        let body = json!({ "labels": tags });
        self.post("set", "disk-labels", &url, body).await?;
        Ok(())
    }

    async fn find_instance_by_tag(&self, key: &str, value: &str) -> Result<Option<InstanceInfo>, CloudError> {
        let url = format!("{}/zones/{}/instances", self.base(), self.zone);
        let found = self.find_by_label("describe", "instance", &url, key, value).await?;
        Ok(found.map(|i| Self::instance_info(&i)))
    }

    async fn run_instance(
        &self,
        image_id: &str,
        instance_type: &str,
        subnet_id: &str,
        _security_group_ids: &[String],
        _key_name: &str,
        user_data: &[u8],
        _iam_instance_profile: &str,
        tags: &Tags,
    ) -> Result<InstanceInfo, CloudError> {
        let name = tags.get("Name").cloned().unwrap_or_else(|| "kubeup-master".to_string());
        let startup_script = String::from_utf8_lossy(user_data).to_string();
        let body = json!({
            "name": name,
            "machineType": format!("zones/{}/machineTypes/{}", self.zone, instance_type),
            "disks": [{ "boot": true, "initializeParams": { "sourceImage": image_id } }],
            "networkInterfaces": [{ "subnetwork": subnet_id }],
            "metadata": { "items": [{ "key": "startup-script", "value": startup_script }] },
            "labels": tags,
        });
        let url = format!("{}/zones/{}/instances", self.base(), self.zone);
        self.post("create", "instance", &url, body).await?;
        Ok(InstanceInfo {
            id: name,
            state: "PROVISIONING".to_string(),
            private_ip: None,
            public_ip: None,
            tags: tags.clone(),
        })
    }

    async fn attach_volume(&self, instance_id: &str, volume_id: &str, _device: &str) -> Result<(), CloudError> {
        let url = format!("{}/zones/{}/instances/{}/attachDisk", self.base(), self.zone, instance_id);
        let body = json!({ "source": format!("{}/zones/{}/disks/{}", self.base(), self.zone, volume_id) });
        self.post("attach", "disk", &url, body).await?;
        Ok(())
    }

    async fn associate_elastic_ip(&self, instance_id: &str, allocation_id: &str) -> Result<(), CloudError> {
        let url = format!(
            "{}/zones/{}/instances/{}/deleteAccessConfig?accessConfig=External%20NAT&networkInterface=nic0",
            self.base(),
            self.zone,
            instance_id
        );
        let _ = self.client.post(&url).bearer_auth(self.bearer_token().await?).send().await;
        let add_url = format!(
            "{}/zones/{}/instances/{}/addAccessConfig?networkInterface=nic0",
            self.base(),
            self.zone,
            instance_id
        );
        let body = json!({ "type": "ONE_TO_ONE_NAT", "name": "External NAT", "natIP": allocation_id });
        self.post("attach", "access-config", &add_url, body).await?;
        Ok(())
    }

    async fn find_launch_configuration(&self, name: &str) -> Result<Option<LaunchConfigurationInfo>, CloudError> {
        let url = format!("{}/global/instanceTemplates/{}", self.base(), name);
        let Some(t) = self.get("describe", "instance-template", &url).await? else {
            return Ok(None);
        };
        let props = &t["properties"];
        Ok(Some(LaunchConfigurationInfo {
            name: t["name"].as_str().unwrap_or_default().to_string(),
            image_id: props["disks"][0]["initializeParams"]["sourceImage"].as_str().unwrap_or_default().to_string(),
            instance_type: props["machineType"].as_str().unwrap_or_default().to_string(),
        }))
    }

    async fn create_launch_configuration(
        &self,
        name: &str,
        image_id: &str,
        instance_type: &str,
        _security_group_ids: &[String],
        _key_name: &str,
        user_data: &[u8],
        _iam_instance_profile: &str,
    ) -> Result<LaunchConfigurationInfo, CloudError> {
        let startup_script = String::from_utf8_lossy(user_data).to_string();
        let body = json!({
            "name": name,
            "properties": {
                "machineType": instance_type,
                "disks": [{ "boot": true, "initializeParams": { "sourceImage": image_id } }],
                "metadata": { "items": [{ "key": "startup-script", "value": startup_script }] },
            },
        });
        let url = format!("{}/global/instanceTemplates", self.base());
        self.post("create", "instance-template", &url, body).await?;
        Ok(LaunchConfigurationInfo {
            name: name.to_string(),
            image_id: image_id.to_string(),
            instance_type: instance_type.to_string(),
        })
    }

    async fn find_autoscaling_group(&self, name: &str) -> Result<Option<AutoscalingGroupInfo>, CloudError> {
        let url = format!("{}/zones/{}/instanceGroupManagers/{}", self.base(), self.zone, name);
        let Some(g) = self.get("describe", "instance-group-manager", &url).await? else {
            return Ok(None);
        };
        let size = g["targetSize"].as_i64().unwrap_or_default() as i32;
        Ok(Some(AutoscalingGroupInfo {
            name: g["name"].as_str().unwrap_or_default().to_string(),
            launch_configuration_name: g["instanceTemplate"].as_str().unwrap_or_default().to_string(),
            min_size: size,
            max_size: size,
            desired_capacity: size,
        }))
    }

    async fn create_autoscaling_group(
        &self,
        name: &str,
        launch_configuration_name: &str,
        _min_size: i32,
        _max_size: i32,
        desired_capacity: i32,
        _subnet_ids: &[String],
    ) -> Result<AutoscalingGroupInfo, CloudError> {
        let body = json!({
            "name": name,
            "instanceTemplate": format!("{}/global/instanceTemplates/{}", self.base(), launch_configuration_name),
            "targetSize": desired_capacity,
            "baseInstanceName": name,
        });
        let url = format!("{}/zones/{}/instanceGroupManagers", self.base(), self.zone);
        self.post("create", "instance-group-manager", &url, body).await?;
        Ok(AutoscalingGroupInfo {
            name: name.to_string(),
            launch_configuration_name: launch_configuration_name.to_string(),
            min_size: desired_capacity,
            max_size: desired_capacity,
            desired_capacity,
        })
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>, CloudError> {
        let url = format!("{}/zones/{}/instances/{}", self.base(), self.zone, instance_id);
        let found = self.get("describe", "instance", &url).await?;
        Ok(found.map(|i| Self::instance_info(&i)))
    }

    async fn delete_resource(&self, kind: &str, id: &str) -> Result<(), CloudError> {
        let url = match kind {
            "Vpc" => format!("{}/global/networks/{}", self.base(), id),
            "Subnet" => format!("{}/regions/{}/subnetworks/{}", self.base(), self.region, id),
            "SecurityGroup" => format!("{}/global/firewalls/{}", self.base(), id),
            "PersistentVolume" => format!("{}/zones/{}/disks/{}", self.base(), self.zone, id),
            "Instance" => format!("{}/zones/{}/instances/{}", self.base(), self.zone, id),
            "LaunchConfiguration" => format!("{}/global/instanceTemplates/{}", self.base(), id),
            "AutoscalingGroup" => format!("{}/zones/{}/instanceGroupManagers/{}", self.base(), self.zone, id),
            "ElasticIp" => format!("{}/regions/{}/addresses/{}", self.base(), self.region, id),
            // DhcpOptions/InternetGateway/RouteTable/Route/RouteTableAssoc/VpcDhcpOptionsAssoc/
            // IamRole/IamRolePolicy/InstanceProfile/SshKey have no standalone GCE resource of
            // their own (see module doc) — nothing to delete.
            _ => return Ok(()),
        };
        self.delete("delete", kind, &url).await
    }
}

impl GceAdapter {
    fn instance_info(i: &Value) -> InstanceInfo {
        let nic = &i["networkInterfaces"][0];
        InstanceInfo {
            id: i["name"].as_str().unwrap_or_default().to_string(),
            state: i["status"].as_str().unwrap_or_default().to_string(),
            private_ip: nic["networkIP"].as_str().map(str::to_string),
            public_ip: nic["accessConfigs"][0]["natIP"].as_str().map(str::to_string),
            tags: Self::labels_from(i),
        }
    }
}
