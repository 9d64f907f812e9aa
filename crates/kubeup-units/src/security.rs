//! Firewall Units: SecurityGroup and the ingress rules authorized against
//! it (spec §3 SecurityGroup).

use kubeup_cloud::SecurityGroupInfo;

use crate::changes::Tags;
use crate::error::UnitsError;
use crate::lifecycle::UnitLifecycle;
use crate::meta::UnitMeta;
use crate::network::CLUSTER_TAG_KEY;
use crate::runctx::RunCtx;

#[derive(Debug)]
pub struct SecurityGroupUnit {
    meta: UnitMeta,
    pub cluster_id: String,
    pub vpc_key: String,
    pub vpc_id: Option<String>,
    pub name: String,
    pub description: String,
    pub tags: Tags,
    pub id: Option<String>,
}

impl SecurityGroupUnit {
    pub fn new(
        key: impl Into<String>,
        cluster_id: String,
        vpc_key: String,
        name: String,
        description: String,
        tags: Tags,
    ) -> Self {
        SecurityGroupUnit {
            meta: UnitMeta::new(key),
            cluster_id,
            vpc_key,
            vpc_id: None,
            name,
            description,
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

impl UnitLifecycle for SecurityGroupUnit {
    type Actual = SecurityGroupInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "SecurityGroup"
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

    fn find(&self, ctx: &RunCtx) -> Result<Option<SecurityGroupInfo>, UnitsError> {
        let vpc_id = match &self.vpc_id {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(ctx.block_on(ctx.cloud.find_security_group_by_name(vpc_id, &self.name))?)
    }

    fn adopt_observed(&mut self, actual: &SecurityGroupInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&SecurityGroupInfo>) -> (bool, ()) {
        (actual.is_none(), ())
    }

    fn check_changes(&self, _actual: Option<&SecurityGroupInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&SecurityGroupInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let vpc_id = self.vpc_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "vpc_id".to_string(),
            })?;
            let created = ctx.block_on(ctx.cloud.create_security_group(vpc_id, &self.name, &self.description, &self.all_tags()))?;
            self.id = Some(created.id);
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&SecurityGroupInfo>, _changes: &()) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!(
                "{var}=$(aws ec2 create-security-group --vpc-id ${{{}_VPC}} --group-name {} --description \"{}\" --query GroupId --output text)",
                self.vpc_key.to_uppercase(),
                self.name,
                self.description
            ));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&SecurityGroupInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}

/// One `authorize_ingress` call. Security group rules have no stable id of
/// their own to re-find by, so like [`crate::routing::RouteUnit`] this Unit
/// always (idempotently, per the underlying API's duplicate-rule error
/// being treated as success upstream) renders.
#[derive(Debug)]
pub struct IngressRuleUnit {
    meta: UnitMeta,
    pub group_key: String,
    pub group_id: Option<String>,
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub cidr: Option<String>,
    pub source_group_key: Option<String>,
    pub source_group_id: Option<String>,
}

impl IngressRuleUnit {
    pub fn new(
        key: impl Into<String>,
        group_key: String,
        protocol: String,
        from_port: i32,
        to_port: i32,
        cidr: Option<String>,
        source_group_key: Option<String>,
    ) -> Self {
        IngressRuleUnit {
            meta: UnitMeta::new(key),
            group_key,
            group_id: None,
            protocol,
            from_port,
            to_port,
            cidr,
            source_group_key,
            source_group_id: None,
        }
    }
}

impl UnitLifecycle for IngressRuleUnit {
    type Actual = ();
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "IngressRule"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        let mut deps = vec![self.group_key.clone()];
        if let Some(k) = &self.source_group_key {
            deps.push(k.clone());
        }
        deps
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.group_id = resolved.get(&self.group_key).and_then(|r| r.id.clone());
        self.source_group_id = self
            .source_group_key
            .as_ref()
            .and_then(|k| resolved.get(k))
            .and_then(|r| r.id.clone());
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
        let group_id = self.group_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "group_id".to_string(),
        })?;
        let rule = kubeup_cloud::IngressRule {
            protocol: self.protocol.clone(),
            from_port: self.from_port,
            to_port: self.to_port,
            cidr: self.cidr.clone(),
            source_group_id: self.source_group_id.clone(),
        };
        ctx.block_on(ctx.cloud.authorize_ingress(group_id, &rule))?;
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        let source = match (&self.cidr, &self.source_group_key) {
            (Some(cidr), _) => format!("--cidr {cidr}"),
            (None, Some(k)) => format!("--source-group ${{{}_SECURITYGROUP}}", k.to_uppercase()),
            (None, None) => String::new(),
        };
        sink.emit(format!(
            "aws ec2 authorize-security-group-ingress --group-id ${{{}_SECURITYGROUP}} --protocol {} --port {}-{} {}",
            self.group_key.to_uppercase(),
            self.protocol,
            self.from_port,
            self.to_port,
            source
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&()>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}
