//! Dependency graph builder
//!
//! Each selected test is instantiated once, then its dependencies are
//! resolved: the provider of every property it REQUIRES plus its declared
//! DEPS. Dependencies are instantiated recursively, so a whitelisted test
//! pulls in whatever it needs. Nodes are identified by their index, assigned
//! in instantiation order.

use crate::{ResponderTest, RunnerError, RunnerResult, TestDefinition, TestRegistry, TestSetup};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Position of a node in [`DependencyGraph::nodes`]
pub type NodeIndex = usize;

/// An instantiated test in the graph
pub struct TestNode {
    definition: Arc<TestDefinition>,
    fixture: Box<dyn ResponderTest>,
    /// REQUIRES plus whatever the fixture asked for at instantiation
    requires: BTreeSet<String>,
}

impl TestNode {
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &Arc<TestDefinition> {
        &self.definition
    }

    pub fn requires(&self) -> &BTreeSet<String> {
        &self.requires
    }

    pub fn fixture(&self) -> &dyn ResponderTest {
        self.fixture.as_ref()
    }

    pub fn fixture_mut(&mut self) -> &mut dyn ResponderTest {
        self.fixture.as_mut()
    }
}

impl fmt::Debug for TestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestNode")
            .field("name", &self.name())
            .field("requires", &self.requires)
            .field("state", &self.fixture.state())
            .finish()
    }
}

/// Instantiated tests and the edges between them
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<TestNode>,
    /// Node → the nodes it depends on
    edges: BTreeMap<NodeIndex, BTreeSet<NodeIndex>>,
}

impl DependencyGraph {
    /// Instantiate `selected` and everything they depend on
    ///
    /// Fails if a required property has no provider, a DEPS entry is not
    /// registered, or the dependencies form a cycle.
    pub fn build<'a>(
        registry: &TestRegistry,
        setup: &TestSetup,
        selected: impl IntoIterator<Item = &'a Arc<TestDefinition>>,
    ) -> RunnerResult<Self> {
        let mut builder = GraphBuilder {
            registry,
            setup,
            memo: HashMap::new(),
            graph: DependencyGraph::default(),
        };

        let mut chain = Vec::new();
        for definition in selected {
            builder.instantiate(definition, &mut chain)?;
        }

        tracing::debug!(
            nodes = builder.graph.nodes.len(),
            edges = builder.graph.edge_count(),
            "Dependency graph built"
        );
        Ok(builder.graph)
    }

    pub fn nodes(&self) -> &[TestNode] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> Option<&TestNode> {
        self.nodes.get(index)
    }

    pub fn edges(&self) -> &BTreeMap<NodeIndex, BTreeSet<NodeIndex>> {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Edges keyed by test name
    pub fn named_edges(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.edges
            .iter()
            .map(|(&node, deps)| {
                (
                    self.nodes[node].name().to_string(),
                    deps.iter()
                        .map(|&dep| self.nodes[dep].name().to_string())
                        .collect(),
                )
            })
            .collect()
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.iter().position(|node| node.name() == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Take the nodes out, leaving the edges behind
    pub fn into_nodes(self) -> Vec<TestNode> {
        self.nodes
    }
}

struct GraphBuilder<'r> {
    registry: &'r TestRegistry,
    setup: &'r TestSetup,
    /// Test name → node, filled before dependencies are visited
    memo: HashMap<String, NodeIndex>,
    graph: DependencyGraph,
}

impl GraphBuilder<'_> {
    /// `chain` holds the tests currently being instantiated, outermost first
    fn instantiate(
        &mut self,
        definition: &Arc<TestDefinition>,
        chain: &mut Vec<String>,
    ) -> RunnerResult<NodeIndex> {
        let name = definition.name();
        if let Some(&index) = self.memo.get(name) {
            return Ok(index);
        }

        let index = self.graph.nodes.len();
        self.memo.insert(name.to_string(), index);

        let fixture = definition.instantiate(self.setup);
        let mut requires = definition.required().clone();
        requires.extend(fixture.extra_requires());

        let mut dependencies = BTreeSet::new();
        for property in &requires {
            let provider =
                self.registry
                    .provider_of(property)
                    .ok_or_else(|| RunnerError::MissingProperty {
                        property: property.clone(),
                        required_by: name.to_string(),
                    })?;
            dependencies.insert(provider.name().to_string());
        }
        for dep in definition.deps() {
            if !self.registry.contains(dep) {
                return Err(RunnerError::UnknownDependency {
                    name: dep.clone(),
                    required_by: name.to_string(),
                });
            }
            dependencies.insert(dep.clone());
        }

        self.graph.nodes.push(TestNode {
            definition: Arc::clone(definition),
            fixture,
            requires,
        });

        chain.push(name.to_string());
        let mut edges = BTreeSet::new();
        for dep in &dependencies {
            if let Some(start) = chain.iter().position(|ancestor| ancestor == dep) {
                return Err(RunnerError::CircularDependency {
                    chain: chain[start..].to_vec(),
                });
            }
            let dep_definition = Arc::clone(self.registry.require(dep)?);
            edges.insert(self.instantiate(&dep_definition, chain)?);
        }
        chain.pop();

        self.graph.edges.insert(index, edges);
        Ok(index)
    }
}
