//! Dependency graph compiler
//!
//! Turns the authored module graph into an execution plan. The authored graph
//! is allowed one kind of cycle: a module whose output another module consumes
//! at creation time, while it also attaches metadata (diagnostic settings) back
//! onto that consumer. Such a module is split into a producer node that runs
//! first and an attachment node that runs after the consumer. Any cycle left
//! after splitting is fatal.

use crate::error::{OrchestratorError, Result};
use rigging_types::{Dependency, ExecutionPlan, ModuleNode, ModulePhase, ModuleSpec};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Suffix of the output-producing half of a split module
pub const PRODUCER_SUFFIX: &str = "-core";

/// Suffix of the metadata-attaching half of a split module
pub const ATTACHMENT_SUFFIX: &str = "-diagnostics";

/// Module names of the standard application stack
pub mod modules {
    pub const IDENTITY: &str = "managed-identity";
    pub const TELEMETRY: &str = "telemetry";
    pub const COMPUTE: &str = "app-service";
    pub const DATABASE: &str = "sql";
    pub const GENAI: &str = "genai";
}

/// Authored graph of the application stack.
///
/// `telemetry` feeds its connection string to `app-service` and attaches
/// diagnostic settings onto it, which is the cycle the compiler breaks.
pub fn standard_graph(extended_features: bool) -> Vec<ModuleSpec> {
    use modules::*;

    let mut graph = vec![
        ModuleSpec::new(IDENTITY)
            .produces("clientId")
            .produces("principalId")
            .produces("name"),
        ModuleSpec::new(TELEMETRY)
            .produces("connectionString")
            .attaches_to(COMPUTE),
        ModuleSpec::new(DATABASE)
            .produces("serverFqdn")
            .produces("databaseName"),
        ModuleSpec::new(COMPUTE)
            .consumes(IDENTITY, "clientId")
            .consumes(TELEMETRY, "connectionString")
            .produces("name")
            .produces("hostname"),
    ];

    if extended_features {
        graph.push(
            ModuleSpec::new(GENAI)
                .consumes(IDENTITY, "principalId")
                .produces("openAIEndpoint")
                .produces("openAIModelName")
                .produces("searchEndpoint"),
        );
    }

    graph
}

/// Compiles authored module graphs into execution plans
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyGraphCompiler;

impl DependencyGraphCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `modules` into a topologically sorted plan.
    ///
    /// Ordering is deterministic: among ready nodes, the one authored first runs
    /// first, and a producer half precedes its attachment half.
    #[instrument(skip(self, modules), fields(modules = modules.len()))]
    pub fn compile(&self, modules: &[ModuleSpec]) -> Result<ExecutionPlan> {
        let by_name = index_modules(modules)?;
        let split = modules_to_split(modules, &by_name);

        for name in &split {
            debug!(module = %name, "Splitting module into producer and attachment phases");
        }

        let nodes = build_nodes(modules, &split);
        let plan = topological_order(nodes)?;

        info!(order = ?plan.names(), "Execution plan compiled");
        Ok(plan)
    }
}

fn index_modules(modules: &[ModuleSpec]) -> Result<HashMap<&str, &ModuleSpec>> {
    let mut by_name = HashMap::with_capacity(modules.len());
    for module in modules {
        if by_name.insert(module.name.as_str(), module).is_some() {
            return Err(OrchestratorError::DuplicateModule(module.name.clone()));
        }
    }

    for module in modules {
        for dep in &module.dependencies {
            if dep.target() == module.name {
                return Err(OrchestratorError::UnresolvableCycle {
                    modules: vec![module.name.clone()],
                });
            }
            if !by_name.contains_key(dep.target()) {
                return Err(OrchestratorError::UnknownDependency {
                    module: module.name.clone(),
                    dependency: dep.target().to_string(),
                });
            }
        }
    }

    Ok(by_name)
}

/// Modules that attach onto a module consuming one of their outputs
fn modules_to_split(
    modules: &[ModuleSpec],
    by_name: &HashMap<&str, &ModuleSpec>,
) -> HashSet<String> {
    modules
        .iter()
        .filter(|module| {
            module.dependencies.iter().any(|dep| match dep {
                Dependency::AttachesTo { module: target } => by_name
                    .get(target.as_str())
                    .is_some_and(|consumer| module.is_consumed_by(consumer)),
                _ => false,
            })
        })
        .map(|module| module.name.clone())
        .collect()
}

/// Node a dependency on `target` resolves to; outputs of a split module live
/// in its producer half
fn resolve(target: &str, split: &HashSet<String>) -> String {
    if split.contains(target) {
        format!("{}{}", target, PRODUCER_SUFFIX)
    } else {
        target.to_string()
    }
}

fn build_nodes(modules: &[ModuleSpec], split: &HashSet<String>) -> Vec<ModuleNode> {
    let mut nodes = Vec::with_capacity(modules.len() + split.len());

    for module in modules {
        if !split.contains(&module.name) {
            nodes.push(ModuleNode {
                name: module.name.clone(),
                source: module.name.clone(),
                phase: ModulePhase::Whole,
                declared_outputs: module.outputs.clone(),
                depends_on: module
                    .dependencies
                    .iter()
                    .map(|dep| resolve(dep.target(), split))
                    .collect(),
            });
            continue;
        }

        let producer = format!("{}{}", module.name, PRODUCER_SUFFIX);
        let (attach, create): (Vec<&Dependency>, Vec<&Dependency>) = module
            .dependencies
            .iter()
            .partition(|dep| matches!(dep, Dependency::AttachesTo { .. }));

        nodes.push(ModuleNode {
            name: producer.clone(),
            source: module.name.clone(),
            phase: ModulePhase::Producer,
            declared_outputs: module.outputs.clone(),
            depends_on: create
                .iter()
                .map(|dep| resolve(dep.target(), split))
                .collect(),
        });

        let mut depends_on: BTreeSet<String> = attach
            .iter()
            .map(|dep| resolve(dep.target(), split))
            .collect();
        depends_on.insert(producer);

        nodes.push(ModuleNode {
            name: format!("{}{}", module.name, ATTACHMENT_SUFFIX),
            source: module.name.clone(),
            phase: ModulePhase::Attachment,
            declared_outputs: BTreeSet::new(),
            depends_on,
        });
    }

    nodes
}

/// Kahn's algorithm over node indices so ties break by authored order
fn topological_order(nodes: Vec<ModuleNode>) -> Result<ExecutionPlan> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.name.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, node) in nodes.iter().enumerate() {
        for dep in &node.depends_on {
            if let Some(&d) = index.get(dep.as_str()) {
                in_degree[i] += 1;
                dependents.entry(d).or_default().push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, deg)| **deg == 0)
        .map(|(i, _)| i)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in dependents.get(&next).map(Vec::as_slice).unwrap_or_default() {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < nodes.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        let modules = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed.contains(i))
            .map(|(_, n)| n.name.clone())
            .collect();
        return Err(OrchestratorError::UnresolvableCycle { modules });
    }

    let mut slots: Vec<Option<ModuleNode>> = nodes.into_iter().map(Some).collect();
    let ordered = order.into_iter().filter_map(|i| slots[i].take()).collect();
    Ok(ExecutionPlan::from_ordered(ordered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modules::*;

    fn pos(plan: &ExecutionPlan, name: &str) -> usize {
        plan.position(name)
            .unwrap_or_else(|| panic!("{} missing from plan {:?}", name, plan.names()))
    }

    #[test]
    fn test_diagnostics_run_after_telemetry_core_and_compute() {
        let plan = DependencyGraphCompiler::new()
            .compile(&standard_graph(false))
            .unwrap();

        let core = pos(&plan, "telemetry-core");
        let compute = pos(&plan, COMPUTE);
        let diagnostics = pos(&plan, "telemetry-diagnostics");

        assert!(core < compute);
        assert!(diagnostics > core);
        assert!(diagnostics > compute);
        assert!(plan.get(TELEMETRY).is_none());
    }

    #[test]
    fn test_compute_reads_producer_half() {
        let plan = DependencyGraphCompiler::new()
            .compile(&standard_graph(true))
            .unwrap();

        let compute = plan.get(COMPUTE).unwrap();
        assert!(compute.depends_on.contains("telemetry-core"));
        assert!(compute.depends_on.contains(IDENTITY));

        let core = plan.get("telemetry-core").unwrap();
        assert_eq!(core.phase, ModulePhase::Producer);
        assert!(core.declared_outputs.contains("connectionString"));
        assert!(core.depends_on.is_empty());

        let diagnostics = plan.get("telemetry-diagnostics").unwrap();
        assert_eq!(diagnostics.phase, ModulePhase::Attachment);
        assert!(diagnostics.declared_outputs.is_empty());
        assert!(pos(&plan, GENAI) > pos(&plan, IDENTITY));
    }

    #[test]
    fn test_order_is_deterministic() {
        let compiler = DependencyGraphCompiler::new();
        let a = compiler.compile(&standard_graph(true)).unwrap();
        let b = compiler.compile(&standard_graph(true)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.names(),
            vec![
                IDENTITY,
                "telemetry-core",
                DATABASE,
                COMPUTE,
                "telemetry-diagnostics",
                GENAI
            ]
        );
    }

    #[test]
    fn test_acyclic_graph_is_not_split() {
        let graph = vec![
            ModuleSpec::new("network").produces("subnetId"),
            ModuleSpec::new("vm").consumes("network", "subnetId"),
        ];
        let plan = DependencyGraphCompiler::new().compile(&graph).unwrap();
        assert_eq!(plan.names(), vec!["network", "vm"]);
        assert!(plan
            .nodes()
            .iter()
            .all(|n| n.phase == ModulePhase::Whole));
    }

    #[test]
    fn test_mutual_consumption_is_fatal() {
        let graph = vec![
            ModuleSpec::new("a").produces("x").consumes("b", "y"),
            ModuleSpec::new("b").produces("y").consumes("a", "x"),
        ];
        let err = DependencyGraphCompiler::new().compile(&graph).unwrap_err();
        match err {
            OrchestratorError::UnresolvableCycle { modules } => {
                assert_eq!(modules, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_attachment_without_consumption_is_not_split() {
        // Attaching onto a module that does not read our outputs is ordinary ordering.
        let graph = vec![
            ModuleSpec::new("app").produces("name"),
            ModuleSpec::new("alerts").attaches_to("app"),
        ];
        let plan = DependencyGraphCompiler::new().compile(&graph).unwrap();
        assert_eq!(plan.names(), vec!["app", "alerts"]);
    }

    #[test]
    fn test_unknown_dependency() {
        let graph = vec![ModuleSpec::new("app").consumes("missing", "x")];
        let err = DependencyGraphCompiler::new().compile(&graph).unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownDependency { .. }));
    }

    #[test]
    fn test_duplicate_module() {
        let graph = vec![ModuleSpec::new("app"), ModuleSpec::new("app")];
        let err = DependencyGraphCompiler::new().compile(&graph).unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateModule(name) if name == "app"));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let graph = vec![ModuleSpec::new("app").after("app")];
        let err = DependencyGraphCompiler::new().compile(&graph).unwrap_err();
        assert!(matches!(err, OrchestratorError::UnresolvableCycle { .. }));
    }
}
