use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;

use kubeup_units::{RenderMode, ResolvedId, Unit};

use crate::error::GraphError;

/// A node in the tree the composer builds: one Unit plus the Units whose
/// `depends_on` the composer chose to nest under it for display/path
/// purposes. Nesting is cosmetic — ordering is entirely decided by
/// `depends_on` and the pre-order walk below, not by tree shape.
#[derive(Debug)]
pub struct GraphNode {
    pub unit: Unit,
    pub children: Vec<GraphNode>,
}

impl GraphNode {
    pub fn leaf(unit: Unit) -> Self {
        GraphNode { unit, children: Vec::new() }
    }

    pub fn with_children(unit: Unit, children: Vec<GraphNode>) -> Self {
        GraphNode { unit, children }
    }
}

/// Stamps every node's path from its position in the tree (spec §3:
/// a Unit's path is its ancestors' keys joined by `/`).
pub fn assign_paths(nodes: &mut [GraphNode], parent_path: &str) {
    for node in nodes {
        node.unit.set_path(parent_path);
        let path = node.unit.path().to_string();
        assign_paths(&mut node.children, &path);
    }
}

fn flatten<'a>(nodes: &'a [GraphNode], out: &mut Vec<&'a Unit>) {
    for node in nodes {
        out.push(&node.unit);
        flatten(&node.children, out);
    }
}

/// Checks the tree's static shape before any Unit runs: no two Units share
/// a `(unit_type, key)` pair, every `depends_on` key resolves to a Unit
/// that actually exists, and that Unit precedes its dependent in pre-order
/// (spec §3 invariant 6). Returns the pre-order key sequence on success,
/// which is also the order `run_tree` will use.
pub fn validate(roots: &[GraphNode]) -> Result<Vec<String>, GraphError> {
    let mut order = Vec::new();
    flatten(roots, &mut order);

    let mut errors = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (i, unit) in order.iter().enumerate() {
        if !seen.insert((unit.unit_type(), unit.key())) {
            errors.push(GraphError::DuplicateUnit {
                unit_type: unit.unit_type().to_string(),
                key: unit.key().to_string(),
            });
        }
        index.insert(unit.key(), i);
    }

    for (i, unit) in order.iter().enumerate() {
        for dep in unit.depends_on() {
            match index.get(dep.as_str()) {
                None => errors.push(GraphError::DanglingDependency {
                    unit: unit.key().to_string(),
                    depends_on: dep,
                }),
                Some(&dep_index) if dep_index >= i => errors.push(GraphError::DependencyNotYetRun {
                    unit: unit.key().to_string(),
                    depends_on: dep,
                }),
                _ => {}
            }
        }
    }

    if let Some(err) = find_cycle(&order) {
        errors.push(err);
    }

    match errors.len() {
        0 => Ok(order.iter().map(|u| u.key().to_string()).collect()),
        1 => Err(errors.remove(0)),
        _ => Err(GraphError::Multiple(errors)),
    }
}

/// Belt-and-suspenders check alongside the index comparison above: builds
/// a dependency edge graph and runs petgraph's cycle detector over it.
fn find_cycle(order: &[&Unit]) -> Option<GraphError> {
    let mut graph = DiGraph::<&str, ()>::new();
    let mut node_idx = HashMap::new();
    for unit in order {
        node_idx.insert(unit.key(), graph.add_node(unit.key()));
    }
    for unit in order {
        for dep in unit.depends_on() {
            if let (Some(&from), Some(&to)) = (node_idx.get(dep.as_str()), node_idx.get(unit.key())) {
                graph.add_edge(from, to, ());
            }
        }
    }
    is_cyclic_directed(&graph).then_some(GraphError::CycleDetected)
}

/// Runs every Unit in the tree in pre-order (spec §5 Run): resolves this
/// Unit's references to whatever its dependencies have already exposed,
/// runs it, then records what it exposes for Units still to come. Returns
/// the number of Units that actually changed something.
pub fn run_tree(
    roots: &mut [GraphNode],
    ctx: &kubeup_units::RunCtx,
    mode: &mut RenderMode,
) -> Result<usize, GraphError> {
    let mut resolved: HashMap<String, ResolvedId> = HashMap::new();
    let mut changed = 0;
    for root in roots {
        run_node(root, ctx, mode, &mut resolved, &mut changed)?;
    }
    Ok(changed)
}

fn run_node(
    node: &mut GraphNode,
    ctx: &kubeup_units::RunCtx,
    mode: &mut RenderMode,
    resolved: &mut HashMap<String, ResolvedId>,
    changed: &mut usize,
) -> Result<(), GraphError> {
    node.unit.resolve_refs(resolved);
    if node.unit.run(ctx, mode)? {
        *changed += 1;
    }
    resolved.insert(node.unit.key().to_string(), node.unit.resolved_id());
    for child in &mut node.children {
        run_node(child, ctx, mode, resolved, changed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeup_units::{Tags, VpcUnit};

    fn vpc(key: &str) -> Unit {
        Unit::Vpc(VpcUnit::new(key, "vpc".into(), "cluster.example.com".into(), "10.0.0.0/16".into(), Tags::new()))
    }

    #[test]
    fn preorder_is_parent_then_children() {
        let tree = vec![GraphNode::with_children(
            vpc("vpc"),
            vec![GraphNode::leaf(vpc("vpc-child"))],
        )];
        let order = validate(&tree).unwrap();
        assert_eq!(order, vec!["vpc".to_string(), "vpc-child".to_string()]);
    }

    #[test]
    fn duplicate_type_and_key_is_rejected() {
        let tree = vec![GraphNode::leaf(vpc("vpc")), GraphNode::leaf(vpc("vpc"))];
        let err = validate(&tree).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateUnit { .. }));
    }

    #[test]
    fn dangling_dependency_is_rejected() {
        use kubeup_units::SubnetUnit;
        let tree = vec![GraphNode::leaf(Unit::Subnet(SubnetUnit::new(
            "subnet",
            "cluster.example.com".into(),
            "subnet".into(),
            "missing-vpc".into(),
            "10.0.1.0/24".into(),
            "us-east-1a".into(),
            Tags::new(),
        )))];
        let err = validate(&tree).unwrap_err();
        assert!(matches!(err, GraphError::DanglingDependency { .. }));
    }

    #[test]
    fn dependency_must_precede_in_preorder() {
        use kubeup_units::SubnetUnit;
        let subnet = Unit::Subnet(SubnetUnit::new(
            "subnet",
            "cluster.example.com".into(),
            "subnet".into(),
            "vpc".into(),
            "10.0.1.0/24".into(),
            "us-east-1a".into(),
            Tags::new(),
        ));
        // Subnet appears before the Vpc it depends on.
        let tree = vec![GraphNode::leaf(subnet), GraphNode::leaf(vpc("vpc"))];
        let err = validate(&tree).unwrap_err();
        assert!(matches!(err, GraphError::DependencyNotYetRun { .. }));
    }

    #[test]
    fn assign_paths_joins_ancestor_keys() {
        let mut tree = vec![GraphNode::with_children(vpc("vpc"), vec![GraphNode::leaf(vpc("vpc-child"))])];
        assign_paths(&mut tree, "");
        assert_eq!(tree[0].unit.path(), "vpc");
        assert_eq!(tree[0].children[0].unit.path(), "vpc/vpc-child");
    }
}
