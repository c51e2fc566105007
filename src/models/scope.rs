/// Which agents' data a request may touch. Resolved once per request from the
/// caller's role so that services never branch on roles themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentScope {
    All,
    Agent(i64),
}

impl AgentScope {
    /// `None` for unrestricted scopes.
    pub fn agent_id(&self) -> Option<i64> {
        match self {
            AgentScope::All => None,
            AgentScope::Agent(id) => Some(*id),
        }
    }

    pub fn permits(&self, agent_id: i64) -> bool {
        match self {
            AgentScope::All => true,
            AgentScope::Agent(id) => *id == agent_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scope_permits_everyone() {
        assert!(AgentScope::All.permits(1));
        assert!(AgentScope::All.permits(42));
        assert_eq!(AgentScope::All.agent_id(), None);
    }

    #[test]
    fn test_agent_scope_permits_only_itself() {
        let scope = AgentScope::Agent(7);
        assert!(scope.permits(7));
        assert!(!scope.permits(8));
        assert_eq!(scope.agent_id(), Some(7));
    }
}
