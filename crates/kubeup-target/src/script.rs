//! Renders a tree of Units as a standalone shell script instead of calling
//! the cloud directly (spec §4.5 ScriptTarget, grounded line-for-line on
//! `pkg/fi/bashtarget.go`'s `PrintShellCommands`/`CreateVar`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kubeup_resource::Resource;
use kubeup_units::ScriptSink;

/// Emits one shell command per render call, naming cross-referenced
/// outputs `TYPE_N` (a per-unit-type counter) the way `bashtarget.go` does,
/// and materialising any resource a command needs under `resources/`.
pub struct ScriptTarget {
    resources_dir: PathBuf,
    env_vars: Vec<(String, String)>,
    vars: HashMap<String, String>,
    prefix_counts: HashMap<String, usize>,
    commands: Vec<String>,
}

impl ScriptTarget {
    /// `base_dir` is where the generated script's `resources/` directory
    /// is created; `env_vars` become the `export NAME=value` header lines
    /// (the composer supplies these — they differ between AWS and GCE).
    pub fn new(base_dir: impl AsRef<Path>, env_vars: Vec<(String, String)>) -> std::io::Result<Self> {
        let resources_dir = base_dir.as_ref().join("resources");
        std::fs::create_dir_all(&resources_dir)?;
        Ok(ScriptTarget {
            resources_dir,
            env_vars,
            vars: HashMap::new(),
            prefix_counts: HashMap::new(),
            commands: Vec::new(),
        })
    }

    /// Renders the full script text: shebang, `set -ex`, the `./helpers`
    /// source line, the environment header, then every emitted command in
    /// order.
    pub fn render(&self) -> String {
        let mut script = String::from("#!/bin/bash\nset -ex\n\n. ./helpers\n\n");
        for (key, value) in &self.env_vars {
            script.push_str(&format!("export {key}={}\n", shell_quote(value)));
        }
        if !self.env_vars.is_empty() {
            script.push('\n');
        }
        for command in &self.commands {
            script.push_str(command);
            script.push('\n');
        }
        script
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}

/// Double-quotes a value for safe inclusion in an `export` line (only `"`
/// needs escaping — callers don't pass untrusted shell metacharacters).
fn shell_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

impl ScriptSink for ScriptTarget {
    fn variable_for(&mut self, unit_type: &str, path: &str) -> String {
        if let Some(existing) = self.vars.get(path) {
            return existing.clone();
        }
        let prefix = unit_type.to_uppercase();
        let n = self.prefix_counts.entry(prefix.clone()).or_insert(0);
        *n += 1;
        let name = format!("{prefix}_{n}");
        self.vars.insert(path.to_string(), name.clone());
        name
    }

    fn emit(&mut self, command: String) {
        self.commands.push(command);
    }

    fn materialize_resource(&mut self, name: &str, resource: &dyn Resource) -> Result<String, kubeup_units::UnitsError> {
        let bytes = kubeup_resource::as_bytes(resource)?;
        let path = self.resources_dir.join(name);
        std::fs::write(&path, bytes).map_err(kubeup_resource::ResourceError::Read)?;
        Ok(format!("resources/{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeup_resource::StringResource;

    #[test]
    fn variable_for_reuses_the_same_name_for_the_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = ScriptTarget::new(dir.path(), Vec::new()).unwrap();
        let a = target.variable_for("Vpc", "vpc");
        let b = target.variable_for("Vpc", "vpc");
        assert_eq!(a, b);
        assert_eq!(a, "VPC_1");
    }

    #[test]
    fn variable_for_increments_per_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = ScriptTarget::new(dir.path(), Vec::new()).unwrap();
        let first = target.variable_for("Subnet", "subnet-a");
        let second = target.variable_for("Subnet", "subnet-b");
        assert_eq!(first, "SUBNET_1");
        assert_eq!(second, "SUBNET_2");
    }

    #[test]
    fn render_includes_header_exports_and_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = ScriptTarget::new(dir.path(), vec![("AWS_DEFAULT_REGION".into(), "us-east-1".into())]).unwrap();
        target.emit("aws ec2 create-vpc --cidr-block 10.0.0.0/16".to_string());
        let script = target.render();
        assert!(script.starts_with("#!/bin/bash\nset -ex\n\n. ./helpers\n\n"));
        assert!(script.contains("export AWS_DEFAULT_REGION=\"us-east-1\""));
        assert!(script.contains("aws ec2 create-vpc --cidr-block 10.0.0.0/16"));
    }

    #[test]
    fn materialize_resource_writes_under_resources_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = ScriptTarget::new(dir.path(), Vec::new()).unwrap();
        let path = target.materialize_resource("ca.crt", &StringResource::new("pem bytes")).unwrap();
        assert_eq!(path, "resources/ca.crt");
        let written = std::fs::read_to_string(dir.path().join("resources/ca.crt")).unwrap();
        assert_eq!(written, "pem bytes");
    }
}
