//! Template module graph
//!
//! `ModuleSpec` is the authored graph (may contain the producer/attachment
//! cycle). `ModuleNode` and `ExecutionPlan` are what the compiler emits: an
//! acyclic, topologically ordered list that is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Edge from a module to something it needs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dependency {
    /// Reads `output` of `module` at creation time
    Consumes { module: String, output: String },
    /// Writes metadata (diagnostic settings, links) onto `module` once it exists
    AttachesTo { module: String },
    /// Ordering only
    After { module: String },
}

impl Dependency {
    /// Module on the other end of the edge
    pub fn target(&self) -> &str {
        match self {
            Dependency::Consumes { module, .. }
            | Dependency::AttachesTo { module }
            | Dependency::After { module } => module,
        }
    }
}

/// Authored template module, before compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Module name, unique in the graph
    pub name: String,
    /// Outputs this module declares
    pub outputs: BTreeSet<String>,
    /// Edges to other modules
    pub dependencies: Vec<Dependency>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outputs: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn produces(mut self, output: impl Into<String>) -> Self {
        self.outputs.insert(output.into());
        self
    }

    pub fn consumes(mut self, module: impl Into<String>, output: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::Consumes {
            module: module.into(),
            output: output.into(),
        });
        self
    }

    pub fn attaches_to(mut self, module: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::AttachesTo {
            module: module.into(),
        });
        self
    }

    pub fn after(mut self, module: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::After {
            module: module.into(),
        });
        self
    }

    /// Whether `module` reads any output of this module
    pub fn is_consumed_by(&self, module: &ModuleSpec) -> bool {
        module.dependencies.iter().any(|dep| {
            matches!(dep, Dependency::Consumes { module: m, output } if *m == self.name && self.outputs.contains(output))
        })
    }
}

/// Which slice of an authored module a compiled node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulePhase {
    /// Module compiled as authored
    Whole,
    /// Output-producing half of a split module
    Producer,
    /// Metadata-attaching half of a split module, runs after its consumers
    Attachment,
}

/// Compiled module, immutable after compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    /// Node name (split halves get `-core` / `-diagnostics` suffixes)
    pub name: String,
    /// Authored module this node came from
    pub source: String,
    /// Slice of the source module
    pub phase: ModulePhase,
    /// Outputs declared by this node
    pub declared_outputs: BTreeSet<String>,
    /// Names of nodes that must complete first
    pub depends_on: BTreeSet<String>,
}

/// Topologically sorted module list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    nodes: Vec<ModuleNode>,
}

impl ExecutionPlan {
    /// Wrap an already ordered node list
    pub fn from_ordered(nodes: Vec<ModuleNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ModuleNode] {
        &self.nodes
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Position of a node in execution order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumption_requires_declared_output() {
        let telemetry = ModuleSpec::new("telemetry").produces("connectionString");
        let app = ModuleSpec::new("app").consumes("telemetry", "connectionString");
        let other = ModuleSpec::new("other").consumes("telemetry", "undeclared");

        assert!(telemetry.is_consumed_by(&app));
        assert!(!telemetry.is_consumed_by(&other));
    }

    #[test]
    fn test_dependency_target() {
        let dep = Dependency::AttachesTo {
            module: "app".into(),
        };
        assert_eq!(dep.target(), "app");
    }
}
