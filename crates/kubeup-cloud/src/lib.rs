mod adapter;
mod aws;
mod error;
mod gcp;
mod sigv4;
mod tags;
mod xml;

pub use adapter::{
    AutoscalingGroupInfo, CloudAdapter, DhcpOptionsInfo, ElasticIpInfo, IamRoleInfo, IngressRule,
    InstanceInfo, InstanceProfileInfo, InternetGatewayInfo, LaunchConfigurationInfo, RouteInfo,
    RouteTableInfo, SecurityGroupInfo, SshKeyInfo, SubnetInfo, Tags, VolumeInfo, VpcInfo,
};
pub use aws::AwsAdapter;
pub use error::CloudError;
pub use gcp::GceAdapter;
pub use sigv4::{sigv4_headers, url_host, AwsCredentials};
pub use tags::{diff_tags, ensure_elastic_ip, find_elastic_ip_via_sentinel};

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_creds() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
        }
    }

    #[tokio::test]
    async fn create_vpc_parses_id_from_response() {
        let server = MockServer::start().await;
        let response = r#"<CreateVpcResponse><vpcId>vpc-abc123</vpcId></CreateVpcResponse>"#;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(response))
            .mount(&server)
            .await;

        let adapter = AwsAdapter::with_endpoint_override(test_creds(), "us-east-1", &server.uri());
        let tags = Tags::from([("Name".to_string(), "kubeup".to_string())]);
        let vpc = adapter.create_vpc("10.0.0.0/16", &tags).await.unwrap();
        assert_eq!(vpc.id, "vpc-abc123");
        assert_eq!(vpc.cidr, "10.0.0.0/16");
    }

    #[tokio::test]
    async fn api_error_response_surfaces_code_and_message() {
        let server = MockServer::start().await;
        let response = r#"<Response><Errors><Error><Code>InvalidVpcID.NotFound</Code><Message>no such vpc</Message></Error></Errors></Response>"#;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(400).set_body_string(response))
            .mount(&server)
            .await;

        let adapter = AwsAdapter::with_endpoint_override(test_creds(), "us-east-1", &server.uri());
        let err = adapter.create_vpc("10.0.0.0/16", &Tags::new()).await.unwrap_err();
        match err {
            CloudError::Api { code, .. } => assert_eq!(code, "InvalidVpcID.NotFound"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_vpc_by_tag_returns_none_on_empty_set() {
        let server = MockServer::start().await;
        let response = r#"<DescribeVpcsResponse><vpcSet></vpcSet></DescribeVpcsResponse>"#;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(response))
            .mount(&server)
            .await;

        let adapter = AwsAdapter::with_endpoint_override(test_creds(), "us-east-1", &server.uri());
        assert!(adapter.find_vpc_by_tag("kubernetes.io/cluster", "demo").await.unwrap().is_none());
    }

    #[test]
    fn is_not_found_recognizes_vpc_and_s3_codes() {
        assert!(CloudError::is_not_found("InvalidVpcID.NotFound"));
        assert!(CloudError::is_not_found("NoSuchBucket"));
        assert!(!CloudError::is_not_found("UnauthorizedOperation"));
    }
}
