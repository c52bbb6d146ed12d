//! Static step dependency graph

use crate::error::GraphError;
use crate::step::{dedup_in_order, Step, StepMetadata};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Validated DAG of declared steps plus the explicit activation allow-list.
///
/// Construction rejects duplicate ids, undeclared dependencies, unknown ids in
/// the allow-list, active steps depending on inactive ones, and cycles.
pub struct StepGraph<C> {
    steps: Vec<Step<C>>,
    index: HashMap<String, usize>,
    active: HashSet<String>,
    order: Vec<usize>,
}

impl<C> StepGraph<C> {
    /// Build a graph in which every declared step is active
    pub fn new(steps: Vec<Step<C>>) -> Result<Self, GraphError> {
        let all: Vec<String> = steps.iter().map(|s| s.id().to_string()).collect();
        Self::with_active_steps(steps, &all)
    }

    /// Build a graph activating only the listed steps
    pub fn with_active_steps<S: AsRef<str>>(mut steps: Vec<Step<C>>, active_steps: &[S]) -> Result<Self, GraphError> {
        for step in &mut steps {
            dedup_in_order(&mut step.metadata.depends_on);
        }

        let mut index = HashMap::new();
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.id().to_string(), i).is_some() {
                return Err(GraphError::DuplicateStep(step.id().to_string()));
            }
        }

        for step in &steps {
            for dependency in &step.metadata.depends_on {
                if !index.contains_key(dependency) {
                    return Err(GraphError::UnknownDependency {
                        step: step.id().to_string(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        detect_cycle(&steps, &index)?;

        let mut active = HashSet::new();
        for id in active_steps {
            let id = id.as_ref();
            if !index.contains_key(id) {
                return Err(GraphError::UnknownStep(id.to_string()));
            }
            active.insert(id.to_string());
        }

        for step in steps.iter().filter(|s| active.contains(s.id())) {
            for dependency in &step.metadata.depends_on {
                if !active.contains(dependency) {
                    return Err(GraphError::InactiveDependency {
                        step: step.id().to_string(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let order = topological_order(&steps, &index, &active);

        Ok(Self {
            steps,
            index,
            active,
            order,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Step<C>> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Every declared step, in declaration order
    pub fn steps(&self) -> &[Step<C>] {
        &self.steps
    }

    /// Active steps in a dependency-respecting order; ties keep declaration order
    pub fn execution_order(&self) -> Vec<&Step<C>> {
        self.order.iter().map(|&i| &self.steps[i]).collect()
    }

    /// Declarative view of all steps in execution order, inactive ones last
    pub fn metadata(&self) -> Vec<(&StepMetadata, bool)> {
        let mut listed: Vec<(&StepMetadata, bool)> = self
            .execution_order()
            .into_iter()
            .map(|s| (&s.metadata, true))
            .collect();
        listed.extend(
            self.steps
                .iter()
                .filter(|s| !self.is_active(s.id()))
                .map(|s| (&s.metadata, false)),
        );
        listed
    }

    /// Active steps that list `id` as a dependency
    pub fn dependents(&self, id: &str) -> Vec<&Step<C>> {
        self.execution_order()
            .into_iter()
            .filter(|s| s.metadata.depends_on.iter().any(|d| d == id))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

fn detect_cycle<C>(steps: &[Step<C>], index: &HashMap<String, usize>) -> Result<(), GraphError> {
    let mut marks = vec![Mark::Unvisited; steps.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..steps.len() {
        if marks[start] == Mark::Unvisited {
            visit(start, steps, index, &mut marks, &mut path)?;
        }
    }
    Ok(())
}

fn visit<C>(
    node: usize,
    steps: &[Step<C>],
    index: &HashMap<String, usize>,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Result<(), GraphError> {
    marks[node] = Mark::InProgress;
    path.push(node);

    for dependency in &steps[node].metadata.depends_on {
        let Some(&next) = index.get(dependency) else {
            continue;
        };
        match marks[next] {
            Mark::InProgress => {
                let begin = path.iter().position(|&n| n == next).unwrap_or(0);
                let mut chain: Vec<String> = path[begin..]
                    .iter()
                    .map(|&n| steps[n].id().to_string())
                    .collect();
                chain.push(steps[next].id().to_string());
                return Err(GraphError::Cycle { chain });
            }
            Mark::Unvisited => visit(next, steps, index, marks, path)?,
            Mark::Done => {}
        }
    }

    path.pop();
    marks[node] = Mark::Done;
    Ok(())
}

fn topological_order<C>(
    steps: &[Step<C>],
    index: &HashMap<String, usize>,
    active: &HashSet<String>,
) -> Vec<usize> {
    let mut remaining: HashMap<usize, usize> = HashMap::new();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();

    for (i, step) in steps.iter().enumerate() {
        if !active.contains(step.id()) {
            continue;
        }
        remaining.insert(i, step.metadata.depends_on.len());
        for dependency in &step.metadata.depends_on {
            if let Some(&d) = index.get(dependency) {
                dependents.entry(d).or_default().push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| *i)
        .collect();
    let mut order = Vec::with_capacity(remaining.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &dependent in dependents.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = remaining.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    order
}
