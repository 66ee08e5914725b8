use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DuplicatePolicy;
use crate::graph::{CallGraph, GraphError};
use crate::model::ObjectId;
use crate::tree::Tree;

/// Coarse-grained unit formed by one leaf of a depth slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Full name of the sliced leaf.
    pub identifier: String,
    pub member_ids: BTreeSet<ObjectId>,
    pub callers: BTreeSet<String>,
    pub callees: BTreeSet<String>,
}

impl Module {
    fn new(identifier: &str, member_ids: BTreeSet<ObjectId>) -> Self {
        Self {
            identifier: identifier.to_string(),
            member_ids,
            callers: BTreeSet::new(),
            callees: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirection {
    Outgoing,
    Incoming,
}

/// A link query that failed for one module and one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFailure {
    pub module: String,
    pub direction: LinkDirection,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub failures: Vec<LinkFailure>,
    /// Member ids claimed by more than one module.
    pub duplicate_members: usize,
    /// Neighbour ids that belong to no module.
    pub unresolved: usize,
}

/// Modules of a tree sliced at a fixed depth, with their call linkage.
#[derive(Debug, Clone)]
pub struct ModuleMap {
    depth: usize,
    policy: DuplicatePolicy,
    modules: Vec<Module>,
}

impl ModuleMap {
    /// One module per leaf of `tree.get_slice_by_depth(depth)`, in slice order.
    pub fn initialize(tree: &Tree, depth: usize) -> Self {
        let modules = tree
            .get_slice_by_depth(depth)
            .into_iter()
            .map(|leaf| Module::new(leaf.full_name(), leaf.object_ids().clone()))
            .collect();
        Self { depth, policy: DuplicatePolicy::default(), modules }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, identifier: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.identifier == identifier)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Callee edges as `(source, target)` identifier pairs.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.modules
            .iter()
            .flat_map(|m| m.callees.iter().map(move |c| (m.identifier.as_str(), c.as_str())))
            .collect()
    }

    /// Member id -> module position, resolving duplicates with the policy.
    fn build_index(&self) -> (HashMap<ObjectId, usize>, usize) {
        let mut index = HashMap::new();
        let mut duplicates = 0;
        for (pos, module) in self.modules.iter().enumerate() {
            for id in &module.member_ids {
                match index.get(id) {
                    Some(&existing) if existing != pos => {
                        duplicates += 1;
                        if self.policy == DuplicatePolicy::LastWins {
                            index.insert(*id, pos);
                        }
                    }
                    Some(_) => {}
                    None => {
                        index.insert(*id, pos);
                    }
                }
            }
        }
        (index, duplicates)
    }

    /// Populate callers and callees from one-hop call graph queries.
    ///
    /// Each module issues one outgoing and one incoming query. A failed
    /// query is logged and recorded; that module's edges for the direction
    /// stay empty and the other modules are still linked.
    pub fn compute_links(&mut self, graph: &dyn CallGraph) -> LinkReport {
        let (index, duplicate_members) = self.build_index();
        let mut report = LinkReport { duplicate_members, ..LinkReport::default() };
        if duplicate_members > 0 {
            warn!(
                "{} member ids belong to several modules ({:?} applied)",
                duplicate_members, self.policy
            );
        }

        let mut callees: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.modules.len()];
        let mut callers: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.modules.len()];

        for (pos, module) in self.modules.iter().enumerate() {
            let members: Vec<ObjectId> = module.member_ids.iter().copied().collect();
            for direction in [LinkDirection::Outgoing, LinkDirection::Incoming] {
                let neighbours: Result<Vec<ObjectId>, GraphError> = match direction {
                    LinkDirection::Outgoing => graph.neighbors_out(&members),
                    LinkDirection::Incoming => graph.neighbors_in(&members),
                };
                let neighbours = match neighbours {
                    Ok(ids) => ids,
                    Err(err) => {
                        warn!(
                            "Link query ({:?}) failed for module '{}': {}",
                            direction, module.identifier, err
                        );
                        report.failures.push(LinkFailure {
                            module: module.identifier.clone(),
                            direction,
                            error: err.to_string(),
                        });
                        continue;
                    }
                };

                let links = match direction {
                    LinkDirection::Outgoing => &mut callees[pos],
                    LinkDirection::Incoming => &mut callers[pos],
                };
                for id in neighbours {
                    if module.member_ids.contains(&id) {
                        continue;
                    }
                    match index.get(&id) {
                        Some(&other) if other != pos => {
                            links.insert(other);
                        }
                        Some(_) => {}
                        None => report.unresolved += 1,
                    }
                }
            }
        }

        let identifiers: Vec<String> = self.modules.iter().map(|m| m.identifier.clone()).collect();
        for (pos, module) in self.modules.iter_mut().enumerate() {
            module.callees = callees[pos].iter().map(|&i| identifiers[i].clone()).collect();
            module.callers = callers[pos].iter().map(|&i| identifiers[i].clone()).collect();
        }
        debug!(
            "Linked {} modules at depth {} ({} unresolved neighbours)",
            self.modules.len(),
            self.depth,
            report.unresolved
        );
        report
    }
}
