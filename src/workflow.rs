use crate::Agent;
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// WorkflowError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    DuplicateAgent(&'static str),
    UnknownStep(&'static str),
    MissingStart,
    /// A node has both a `.then()` edge and a branch.
    ConflictingEdges(&'static str),
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateAgent(name) => write!(f, "duplicate agent name: {name}"),
            Self::UnknownStep(name) => write!(f, "unknown step: {name}"),
            Self::MissingStart => write!(f, "workflow missing start step"),
            Self::ConflictingEdges(name) => {
                write!(f, "step '{name}' has both a default edge and a branch")
            }
        }
    }
}

impl std::error::Error for WorkflowError {}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Where a branch sends the workflow next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    To(&'static str),
    End,
}

type Router<S> = Box<dyn Fn(&S) -> Route + Send>;

/// A conditional edge: a router plus the targets it is allowed to pick.
pub(crate) struct Branch<S> {
    targets: Vec<&'static str>,
    router: Router<S>,
}

impl<S> Branch<S> {
    pub(crate) fn route(&self, state: &S) -> Route {
        (self.router)(state)
    }

    pub(crate) fn allows(&self, step: &str) -> bool {
        self.targets.contains(&step)
    }
}

// ---------------------------------------------------------------------------
// WorkflowBuilder
// ---------------------------------------------------------------------------

pub struct WorkflowBuilder<S: Clone + 'static> {
    name: &'static str,
    start: Option<&'static str>,
    chain_last: Option<&'static str>,
    agents: HashMap<&'static str, Box<dyn Agent<S>>>,
    default_next: HashMap<&'static str, &'static str>,
    branches: HashMap<&'static str, Branch<S>>,
    duplicate: Option<&'static str>,
}

impl<S: Clone + 'static> WorkflowBuilder<S> {
    pub fn register<A: Agent<S>>(self, agent: A) -> Self {
        self.register_boxed(Box::new(agent))
    }

    pub fn register_boxed(mut self, agent: Box<dyn Agent<S>>) -> Self {
        let name = agent.name();
        if self.agents.contains_key(name) {
            self.duplicate = Some(name);
        }
        self.agents.insert(name, agent);

        // The first registered agent is the default start.
        if self.start.is_none() {
            self.start = Some(name);
        }
        if self.chain_last.is_none() {
            self.chain_last = Some(name);
        }

        self
    }

    pub fn start_at(mut self, step: &'static str) -> Self {
        self.start = Some(step);
        self.chain_last = Some(step);
        self
    }

    /// Chain the next step: current(chain_last) -> next
    pub fn then(mut self, next: &'static str) -> Self {
        let Some(current) = self.chain_last else {
            self.start = Some(next);
            self.chain_last = Some(next);
            return self;
        };

        self.default_next.insert(current, next);
        self.chain_last = Some(next);
        self
    }

    /// Add a conditional edge out of `from`. When `from` returns
    /// [`crate::Outcome::Continue`], `router` picks one of `targets` or ends
    /// the workflow.
    pub fn branch(
        mut self,
        from: &'static str,
        targets: &[&'static str],
        router: impl Fn(&S) -> Route + Send + 'static,
    ) -> Self {
        self.branches.insert(
            from,
            Branch {
                targets: targets.to_vec(),
                router: Box::new(router),
            },
        );
        self
    }

    pub fn build(self) -> Result<Workflow<S>, WorkflowError> {
        if let Some(name) = self.duplicate {
            return Err(WorkflowError::DuplicateAgent(name));
        }

        let start = self.start.ok_or(WorkflowError::MissingStart)?;
        if !self.agents.contains_key(start) {
            return Err(WorkflowError::UnknownStep(start));
        }

        for &target in self.default_next.values() {
            if !self.agents.contains_key(target) {
                return Err(WorkflowError::UnknownStep(target));
            }
        }

        for (&from, branch) in &self.branches {
            if !self.agents.contains_key(from) {
                return Err(WorkflowError::UnknownStep(from));
            }
            if self.default_next.contains_key(from) {
                return Err(WorkflowError::ConflictingEdges(from));
            }
            if let Some(&missing) = branch
                .targets
                .iter()
                .find(|t| !self.agents.contains_key(*t))
            {
                return Err(WorkflowError::UnknownStep(missing));
            }
        }

        Ok(Workflow {
            name: self.name,
            start,
            agents: self.agents,
            default_next: self.default_next,
            branches: self.branches,
        })
    }
}

// ---------------------------------------------------------------------------
// Workflow (validated, only constructed via build())
// ---------------------------------------------------------------------------

pub struct Workflow<S: Clone + 'static> {
    name: &'static str,
    start: &'static str,
    agents: HashMap<&'static str, Box<dyn Agent<S>>>,
    default_next: HashMap<&'static str, &'static str>,
    branches: HashMap<&'static str, Branch<S>>,
}

impl<S: Clone + 'static> Workflow<S> {
    pub fn builder(name: &'static str) -> WorkflowBuilder<S> {
        WorkflowBuilder {
            name,
            start: None,
            chain_last: None,
            agents: HashMap::new(),
            default_next: HashMap::new(),
            branches: HashMap::new(),
            duplicate: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // --- used by the runner ---
    pub(crate) fn start(&self) -> &'static str {
        self.start
    }

    pub(crate) fn agent_mut(&mut self, name: &'static str) -> Option<&mut Box<dyn Agent<S>>> {
        self.agents.get_mut(name)
    }

    pub(crate) fn default_next(&self, from: &'static str) -> Option<&'static str> {
        self.default_next.get(from).copied()
    }

    pub(crate) fn branch(&self, from: &'static str) -> Option<&Branch<S>> {
        self.branches.get(from)
    }
}
