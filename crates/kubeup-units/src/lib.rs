//! Declarative, diffable cloud resources (spec §3 Unit, §4.2 BuildChanges,
//! §4.3 Unit contract and run protocol).
//!
//! `kubeup-graph` walks the composed tree and calls [`Unit::run`] on each
//! node in pre-order; this crate owns what happens *inside* one Unit's run
//! (find → diff → check → render), expressed once as the
//! [`UnitLifecycle::run`] default method and reused by every concrete Unit
//! type via its trait implementation (spec §9 design note: dispatch by
//! matching the enum variant, not reflection).
//!
//! `kubeup_cloud::CloudAdapter` already abstracts AWS and GCE behind one
//! VPC/Subnet/SecurityGroup-shaped surface, so a single set of Unit types
//! covers both clouds — there is no separate GCE unit family here.

mod certs;
mod changes;
mod compute;
mod error;
mod iam;
mod lifecycle;
mod meta;
mod network;
mod routing;
mod runctx;
mod security;
mod sinks;

pub use certs::{CertBuilderUnit, CertBundle};
pub use changes::Tags;
pub use compute::{
    AutoscalingGroupUnit, ElasticIpUnit, InstanceUnit, LaunchConfigurationUnit,
    PersistentVolumeUnit, SshKeyUnit, VolumeAttachmentUnit,
};
pub use error::UnitsError;
pub use iam::{IamRolePolicyUnit, IamRoleUnit, InstanceProfileUnit};
pub use lifecycle::{RenderMode, ResolvedId, UnitLifecycle};
pub use meta::UnitMeta;
pub use network::{DhcpOptionsUnit, SubnetUnit, VpcDhcpOptionsAssocUnit, VpcUnit, CLUSTER_TAG_KEY};
pub use routing::{
    IgwAttachmentUnit, InternetGatewayUnit, RouteTableAssocUnit, RouteTableUnit, RouteUnit,
};
pub use runctx::RunCtx;
pub use security::{IngressRuleUnit, SecurityGroupUnit};
pub use sinks::{DryRunSink, FieldDiff, ScriptSink};

/// Every concrete resource the composer can emit, tagged by kind (spec §4.4
/// "a Unit renders through whichever Target kind is selected" — realised as
/// one enum variant per concrete Rust type rather than a reflective lookup).
#[derive(Debug)]
pub enum Unit {
    Vpc(VpcUnit),
    DhcpOptions(DhcpOptionsUnit),
    VpcDhcpOptionsAssoc(VpcDhcpOptionsAssocUnit),
    Subnet(SubnetUnit),
    InternetGateway(InternetGatewayUnit),
    IgwAttachment(IgwAttachmentUnit),
    RouteTable(RouteTableUnit),
    Route(RouteUnit),
    RouteTableAssoc(RouteTableAssocUnit),
    SecurityGroup(SecurityGroupUnit),
    IngressRule(IngressRuleUnit),
    IamRole(IamRoleUnit),
    IamRolePolicy(IamRolePolicyUnit),
    InstanceProfile(InstanceProfileUnit),
    SshKey(SshKeyUnit),
    PersistentVolume(PersistentVolumeUnit),
    ElasticIp(ElasticIpUnit),
    Instance(InstanceUnit),
    VolumeAttachment(VolumeAttachmentUnit),
    LaunchConfiguration(LaunchConfigurationUnit),
    AutoscalingGroup(AutoscalingGroupUnit),
    CertBuilder(CertBuilderUnit),
}

macro_rules! for_each_unit {
    ($self:expr, $u:ident => $body:expr) => {
        match $self {
            Unit::Vpc($u) => $body,
            Unit::DhcpOptions($u) => $body,
            Unit::VpcDhcpOptionsAssoc($u) => $body,
            Unit::Subnet($u) => $body,
            Unit::InternetGateway($u) => $body,
            Unit::IgwAttachment($u) => $body,
            Unit::RouteTable($u) => $body,
            Unit::Route($u) => $body,
            Unit::RouteTableAssoc($u) => $body,
            Unit::SecurityGroup($u) => $body,
            Unit::IngressRule($u) => $body,
            Unit::IamRole($u) => $body,
            Unit::IamRolePolicy($u) => $body,
            Unit::InstanceProfile($u) => $body,
            Unit::SshKey($u) => $body,
            Unit::PersistentVolume($u) => $body,
            Unit::ElasticIp($u) => $body,
            Unit::Instance($u) => $body,
            Unit::VolumeAttachment($u) => $body,
            Unit::LaunchConfiguration($u) => $body,
            Unit::AutoscalingGroup($u) => $body,
            Unit::CertBuilder($u) => $body,
        }
    };
}

impl Unit {
    pub fn unit_type(&self) -> &'static str {
        for_each_unit!(self, u => u.unit_type())
    }

    pub fn key(&self) -> &str {
        for_each_unit!(self, u => u.meta().key())
    }

    pub fn path(&self) -> &str {
        for_each_unit!(self, u => u.meta().path())
    }

    pub fn set_path(&mut self, parent_path: &str) {
        for_each_unit!(self, u => u.meta_mut().set_path(parent_path))
    }

    /// Keys of Units this one reads a field from — used to check spec §3's
    /// "referent appears earlier in pre-order traversal than the referrer"
    /// invariant (invariant 6) without needing typed back-pointers.
    pub fn depends_on(&self) -> Vec<String> {
        for_each_unit!(self, u => u.depends_on())
    }

    /// Runs the full find → diff → check → render protocol for this one
    /// Unit (spec §4.3).
    pub fn run(&mut self, ctx: &RunCtx, mode: &mut RenderMode) -> Result<bool, UnitsError> {
        for_each_unit!(self, u => u.run(ctx, mode))
    }

    /// What this Unit exposes about itself for Units elsewhere in the tree
    /// that reference it by key (spec §3 invariant 6). Meaningful only
    /// after `run` has been called.
    pub fn resolved_id(&self) -> ResolvedId {
        for_each_unit!(self, u => u.resolved_id())
    }

    /// Substitutes every key this Unit holds a forward-reference to with
    /// the referent's [`ResolvedId`]. Called by `kubeup-graph` immediately
    /// before `run`, once the referent has already run in pre-order.
    pub fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, ResolvedId>) {
        for_each_unit!(self, u => u.resolve_refs(resolved))
    }
}
