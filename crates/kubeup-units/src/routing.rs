//! Route-path Units: InternetGateway, its VPC attachment, RouteTable, the
//! default route through the gateway, and the table-subnet association
//! (spec §3 InternetGateway, RouteTable).

use kubeup_cloud::{InternetGatewayInfo, RouteTableInfo};

use crate::changes::Tags;
use crate::error::UnitsError;
use crate::lifecycle::UnitLifecycle;
use crate::meta::UnitMeta;
use crate::network::CLUSTER_TAG_KEY;
use crate::runctx::RunCtx;

#[derive(Debug)]
pub struct InternetGatewayUnit {
    meta: UnitMeta,
    pub cluster_id: String,
    pub tags: Tags,
    pub id: Option<String>,
}

impl InternetGatewayUnit {
    pub fn new(key: impl Into<String>, cluster_id: String, tags: Tags) -> Self {
        InternetGatewayUnit {
            meta: UnitMeta::new(key),
            cluster_id,
            tags,
            id: None,
        }
    }

    fn all_tags(&self) -> Tags {
        let mut t = self.tags.clone();
        t.insert(CLUSTER_TAG_KEY.to_string(), self.cluster_id.clone());
        t
    }
}

impl UnitLifecycle for InternetGatewayUnit {
    type Actual = InternetGatewayInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "InternetGateway"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: self.id.clone(),
            secondary: None,
        }
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<InternetGatewayInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_internet_gateway_by_tag(CLUSTER_TAG_KEY, &self.cluster_id))?)
    }

    fn adopt_observed(&mut self, actual: &InternetGatewayInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&InternetGatewayInfo>) -> (bool, ()) {
        (actual.is_none(), ())
    }

    fn check_changes(&self, _actual: Option<&InternetGatewayInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&InternetGatewayInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let created = ctx.block_on(ctx.cloud.create_internet_gateway(&self.all_tags()))?;
            self.id = Some(created.id);
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&InternetGatewayInfo>, _changes: &()) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!("{var}=$(aws ec2 create-internet-gateway --query InternetGateway.InternetGatewayId --output text)"));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&InternetGatewayInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}

#[derive(Debug)]
pub struct IgwAttachmentUnit {
    meta: UnitMeta,
    pub igw_key: String,
    pub igw_id: Option<String>,
    pub vpc_key: String,
    pub vpc_id: Option<String>,
}

impl IgwAttachmentUnit {
    pub fn new(key: impl Into<String>, igw_key: String, vpc_key: String) -> Self {
        IgwAttachmentUnit {
            meta: UnitMeta::new(key),
            igw_key,
            igw_id: None,
            vpc_key,
            vpc_id: None,
        }
    }
}

impl UnitLifecycle for IgwAttachmentUnit {
    type Actual = InternetGatewayInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "IgwAttachment"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.igw_key.clone(), self.vpc_key.clone()]
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.igw_id = resolved.get(&self.igw_key).and_then(|r| r.id.clone());
        self.vpc_id = resolved.get(&self.vpc_key).and_then(|r| r.id.clone());
    }

    /// Re-uses the IGW's own find: attachment state lives on
    /// `InternetGatewayInfo::attached_vpc_id`, so this Unit has no
    /// independent `Actual` of its own.
    fn find(&self, ctx: &RunCtx) -> Result<Option<InternetGatewayInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_internet_gateway_by_tag(CLUSTER_TAG_KEY, &self.igw_key))?)
    }

    fn adopt_observed(&mut self, _actual: &InternetGatewayInfo) {}

    fn diff(&self, actual: Option<&InternetGatewayInfo>) -> (bool, ()) {
        let attached = actual.is_some_and(|a| a.attached_vpc_id.as_deref() == self.vpc_id.as_deref());
        (!attached, ())
    }

    fn check_changes(&self, _actual: Option<&InternetGatewayInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, _actual: Option<&InternetGatewayInfo>, _changes: &()) -> Result<(), UnitsError> {
        let igw_id = self.igw_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "igw_id".to_string(),
        })?;
        let vpc_id = self.vpc_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "vpc_id".to_string(),
        })?;
        ctx.block_on(ctx.cloud.attach_internet_gateway(igw_id, vpc_id))?;
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&InternetGatewayInfo>, _changes: &()) -> Result<(), UnitsError> {
        sink.emit(format!(
            "aws ec2 attach-internet-gateway --internet-gateway-id ${{{}_INTERNETGATEWAY}} --vpc-id ${{{}_VPC}}",
            self.igw_key.to_uppercase(),
            self.vpc_key.to_uppercase()
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&InternetGatewayInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}

#[derive(Debug)]
pub struct RouteTableUnit {
    meta: UnitMeta,
    pub cluster_id: String,
    pub name_tag: String,
    pub vpc_key: String,
    pub vpc_id: Option<String>,
    pub tags: Tags,
    pub id: Option<String>,
}

impl RouteTableUnit {
    pub fn new(key: impl Into<String>, cluster_id: String, name_tag: String, vpc_key: String, tags: Tags) -> Self {
        RouteTableUnit {
            meta: UnitMeta::new(key),
            cluster_id,
            name_tag,
            vpc_key,
            vpc_id: None,
            tags,
            id: None,
        }
    }

    fn all_tags(&self) -> Tags {
        let mut t = self.tags.clone();
        t.insert("Name".to_string(), self.name_tag.clone());
        t.insert(CLUSTER_TAG_KEY.to_string(), self.cluster_id.clone());
        t
    }
}

impl UnitLifecycle for RouteTableUnit {
    type Actual = RouteTableInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "RouteTable"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.vpc_key.clone()]
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: self.id.clone(),
            secondary: None,
        }
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.vpc_id = resolved.get(&self.vpc_key).and_then(|r| r.id.clone());
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<RouteTableInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_route_table_by_tag("Name", &self.name_tag))?)
    }

    fn adopt_observed(&mut self, actual: &RouteTableInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&RouteTableInfo>) -> (bool, ()) {
        (actual.is_none(), ())
    }

    fn check_changes(&self, _actual: Option<&RouteTableInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&RouteTableInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let vpc_id = self.vpc_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "vpc_id".to_string(),
            })?;
            let created = ctx.block_on(ctx.cloud.create_route_table(vpc_id, &self.all_tags()))?;
            self.id = Some(created.id);
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&RouteTableInfo>, _changes: &()) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!(
                "{var}=$(aws ec2 create-route-table --vpc-id ${{{}_VPC}} --query RouteTable.RouteTableId --output text)",
                self.vpc_key.to_uppercase()
            ));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&RouteTableInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}

#[derive(Debug)]
pub struct RouteUnit {
    meta: UnitMeta,
    pub route_table_key: String,
    pub route_table_id: Option<String>,
    pub destination_cidr: String,
    pub igw_key: String,
    pub igw_id: Option<String>,
}

impl RouteUnit {
    pub fn new(key: impl Into<String>, route_table_key: String, destination_cidr: String, igw_key: String) -> Self {
        RouteUnit {
            meta: UnitMeta::new(key),
            route_table_key,
            route_table_id: None,
            destination_cidr,
            igw_key,
            igw_id: None,
        }
    }
}

impl UnitLifecycle for RouteUnit {
    type Actual = kubeup_cloud::RouteInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "Route"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.route_table_key.clone(), self.igw_key.clone()]
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.route_table_id = resolved.get(&self.route_table_key).and_then(|r| r.id.clone());
        self.igw_id = resolved.get(&self.igw_key).and_then(|r| r.id.clone());
    }

    /// `CloudAdapter` has no `describe_routes`: a route table newly created
    /// this run never has the default route yet, and an adopted one already
    /// has it by construction, so routes are always (idempotently) created.
    fn find(&self, _ctx: &RunCtx) -> Result<Option<kubeup_cloud::RouteInfo>, UnitsError> {
        Ok(None)
    }

    fn adopt_observed(&mut self, _actual: &kubeup_cloud::RouteInfo) {}

    fn diff(&self, _actual: Option<&kubeup_cloud::RouteInfo>) -> (bool, ()) {
        (true, ())
    }

    fn check_changes(&self, _actual: Option<&kubeup_cloud::RouteInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, _actual: Option<&kubeup_cloud::RouteInfo>, _changes: &()) -> Result<(), UnitsError> {
        let route_table_id = self.route_table_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "route_table_id".to_string(),
        })?;
        let igw_id = self.igw_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "igw_id".to_string(),
        })?;
        ctx.block_on(ctx.cloud.create_route(route_table_id, &self.destination_cidr, igw_id))?;
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&kubeup_cloud::RouteInfo>, _changes: &()) -> Result<(), UnitsError> {
        sink.emit(format!(
            "aws ec2 create-route --route-table-id ${{{}_ROUTETABLE}} --destination-cidr-block {} --gateway-id ${{{}_INTERNETGATEWAY}}",
            self.route_table_key.to_uppercase(),
            self.destination_cidr,
            self.igw_key.to_uppercase()
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&kubeup_cloud::RouteInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}

#[derive(Debug)]
pub struct RouteTableAssocUnit {
    meta: UnitMeta,
    pub route_table_key: String,
    pub route_table_id: Option<String>,
    pub subnet_key: String,
    pub subnet_id: Option<String>,
}

impl RouteTableAssocUnit {
    pub fn new(key: impl Into<String>, route_table_key: String, subnet_key: String) -> Self {
        RouteTableAssocUnit {
            meta: UnitMeta::new(key),
            route_table_key,
            route_table_id: None,
            subnet_key,
            subnet_id: None,
        }
    }
}

impl UnitLifecycle for RouteTableAssocUnit {
    type Actual = ();
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "RouteTableAssoc"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.route_table_key.clone(), self.subnet_key.clone()]
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.route_table_id = resolved.get(&self.route_table_key).and_then(|r| r.id.clone());
        self.subnet_id = resolved.get(&self.subnet_key).and_then(|r| r.id.clone());
    }

    fn find(&self, _ctx: &RunCtx) -> Result<Option<()>, UnitsError> {
        Ok(None)
    }

    fn adopt_observed(&mut self, _actual: &()) {}

    fn diff(&self, _actual: Option<&()>) -> (bool, ()) {
        (true, ())
    }

    fn check_changes(&self, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        let route_table_id = self.route_table_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "route_table_id".to_string(),
        })?;
        let subnet_id = self.subnet_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "subnet_id".to_string(),
        })?;
        ctx.block_on(ctx.cloud.associate_route_table(route_table_id, subnet_id))?;
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        sink.emit(format!(
            "aws ec2 associate-route-table --route-table-id ${{{}_ROUTETABLE}} --subnet-id ${{{}_SUBNET}}",
            self.route_table_key.to_uppercase(),
            self.subnet_key.to_uppercase()
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&()>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}
