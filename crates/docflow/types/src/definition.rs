//! Workflow definitions: versioned, immutable approval state machines
//!
//! A WorkflowDefinition declares the states a document type moves
//! through, the guarded transitions between them, SLA escalation rules,
//! and delegation rules. Definitions are data: guards are restricted
//! expression strings validated when the definition is published.
//!
//! Once published a definition never changes. To modify a workflow,
//! publish a new version; existing instances keep their old binding.

use crate::{ValidationIssue, WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum delegation chain length, guarding against rule cycles
pub const MAX_DELEGATION_HOPS: usize = 5;

// ── Identifiers ──────────────────────────────────────────────────────

/// The document type a workflow governs (e.g. "Purchase Order")
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentType(pub String);

impl DocumentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a workflow state
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateName(pub String);

impl StateName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a transition action (e.g. "Approve (Low Value)")
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionName(pub String);

impl ActionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for ActionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A role identifier, resolved against the role directory
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an escalation rule, used for idempotency markers
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── State ────────────────────────────────────────────────────────────

/// A state in the approval workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct State {
    /// Unique name within the definition
    pub name: StateName,
    /// Roles allowed to edit the document while it sits in this state
    pub allowed_editor_roles: Vec<RoleId>,
    /// Terminal states end the workflow; they have no outgoing transitions
    pub is_terminal: bool,
    /// SLA for this state in hours, informational unless an escalation
    /// rule references the state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_hours: Option<u32>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: StateName::new(name),
            allowed_editor_roles: Vec::new(),
            is_terminal: false,
            sla_hours: None,
        }
    }

    /// Create a terminal state
    pub fn terminal(name: impl Into<String>) -> Self {
        Self {
            is_terminal: true,
            ..Self::new(name)
        }
    }

    pub fn with_editor_role(mut self, role: impl Into<String>) -> Self {
        self.allowed_editor_roles.push(RoleId::new(role));
        self
    }

    pub fn with_sla_hours(mut self, hours: u32) -> Self {
        self.sla_hours = Some(hours);
        self
    }
}

// ── Transition ───────────────────────────────────────────────────────

/// One `(guard, target)` candidate in a transition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionCandidate {
    /// Guard expression source; absent means unconditional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    /// Target state when this candidate is selected
    pub target: StateName,
}

/// A guarded transition: an action available on a source state
///
/// Candidates are evaluated in declaration order; the first whose guard
/// is true (or absent) wins. That tie-break is part of the contract:
/// repeated evaluation on the same snapshot always selects the same
/// target.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transition {
    /// State the action is offered on
    pub source_state: StateName,
    /// The action name shown to actors
    pub action_name: ActionName,
    /// Roles allowed to invoke the action. Checked before any guard
    /// is evaluated.
    pub allowed_roles: Vec<RoleId>,
    /// Ordered `(guard, target)` candidates
    pub candidates: Vec<TransitionCandidate>,
}

impl Transition {
    pub fn new(source: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            source_state: StateName::new(source),
            action_name: ActionName::new(action),
            allowed_roles: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn allow_role(mut self, role: impl Into<String>) -> Self {
        self.allowed_roles.push(RoleId::new(role));
        self
    }

    /// Add an unconditional candidate
    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.candidates.push(TransitionCandidate {
            guard: None,
            target: StateName::new(target),
        });
        self
    }

    /// Add a guarded candidate
    pub fn to_if(mut self, guard: impl Into<String>, target: impl Into<String>) -> Self {
        self.candidates.push(TransitionCandidate {
            guard: Some(guard.into()),
            target: StateName::new(target),
        });
        self
    }
}

// ── Escalation ───────────────────────────────────────────────────────

/// What an escalation rule does when it fires
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationEffect {
    /// Reassign the pending approver to a role
    Reassign { role: RoleId },
    /// Invoke an action through the normal executor path as
    /// `system:escalation`; the target state falls out of the
    /// transition table
    AutoTransition { action: ActionName },
}

/// An SLA escalation rule on a state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscalationRule {
    /// Stable identifier; a rule fires at most once per state entry,
    /// keyed by this id
    pub rule_id: RuleId,
    /// The state the rule watches
    pub from_state: StateName,
    /// Hours a document may sit in the state before the rule fires
    pub after_hours: u32,
    /// Optional guard over the document snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    /// Effect applied when the rule fires
    pub effect: EscalationEffect,
}

impl EscalationRule {
    pub fn reassign(
        rule_id: impl Into<String>,
        from_state: impl Into<String>,
        after_hours: u32,
        role: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: RuleId::new(rule_id),
            from_state: StateName::new(from_state),
            after_hours,
            guard: None,
            effect: EscalationEffect::Reassign {
                role: RoleId::new(role),
            },
        }
    }

    pub fn auto_transition(
        rule_id: impl Into<String>,
        from_state: impl Into<String>,
        after_hours: u32,
        action: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: RuleId::new(rule_id),
            from_state: StateName::new(from_state),
            after_hours,
            guard: None,
            effect: EscalationEffect::AutoTransition {
                action: ActionName::new(action),
            },
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }
}

// ── Delegation ───────────────────────────────────────────────────────

/// Temporary reassignment of an approver role to another role
///
/// While `trigger` holds (evaluated against the role directory's flag
/// snapshot), holders of `to_role` act with `from_role`'s permissions,
/// and reassignments targeting `from_role` land on `to_role`. Chains
/// are followed up to [`MAX_DELEGATION_HOPS`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegationRule {
    /// The role whose duties are delegated away
    pub from_role: RoleId,
    /// The role that covers for it
    pub to_role: RoleId,
    /// Guard over directory flags (e.g. `supervisor_absent`)
    pub trigger: String,
}

impl DelegationRule {
    pub fn new(
        from_role: impl Into<String>,
        to_role: impl Into<String>,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            from_role: RoleId::new(from_role),
            to_role: RoleId::new(to_role),
            trigger: trigger.into(),
        }
    }
}

// ── Workflow Definition ──────────────────────────────────────────────

/// A complete approval workflow for one document type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// The document type this definition governs
    pub document_type: DocumentType,
    /// Version assigned at publish time; instances bind to it for life
    pub version: u32,
    /// The states of the machine
    pub states: Vec<State>,
    /// Guarded transitions
    pub transitions: Vec<Transition>,
    /// SLA escalation rules
    pub escalation_rules: Vec<EscalationRule>,
    /// Delegation-on-absence rules
    pub delegation_rules: Vec<DelegationRule>,
}

impl WorkflowDefinition {
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            document_type: DocumentType::new(document_type),
            version: 1,
            states: Vec::new(),
            transitions: Vec::new(),
            escalation_rules: Vec::new(),
            delegation_rules: Vec::new(),
        }
    }

    /// Add a state; fails on duplicate name
    pub fn add_state(&mut self, state: State) -> WorkflowResult<()> {
        if self.states.iter().any(|s| s.name == state.name) {
            return Err(WorkflowError::DuplicateState(state.name));
        }
        self.states.push(state);
        Ok(())
    }

    /// Add a transition; endpoints must already exist
    pub fn add_transition(&mut self, transition: Transition) -> WorkflowResult<()> {
        if self.get_state(&transition.source_state).is_none() {
            return Err(WorkflowError::StateNotFound(transition.source_state));
        }
        for candidate in &transition.candidates {
            if self.get_state(&candidate.target).is_none() {
                return Err(WorkflowError::StateNotFound(candidate.target.clone()));
            }
        }
        self.transitions.push(transition);
        Ok(())
    }

    pub fn add_escalation_rule(&mut self, rule: EscalationRule) {
        self.escalation_rules.push(rule);
    }

    pub fn add_delegation_rule(&mut self, rule: DelegationRule) {
        self.delegation_rules.push(rule);
    }

    pub fn get_state(&self, name: &StateName) -> Option<&State> {
        self.states.iter().find(|s| &s.name == name)
    }

    pub fn is_terminal(&self, name: &StateName) -> bool {
        self.get_state(name).map(|s| s.is_terminal).unwrap_or(false)
    }

    /// The initial state: the unique state with no incoming transitions
    pub fn initial_state(&self) -> Option<&State> {
        let mut targets = HashSet::new();
        for t in &self.transitions {
            for c in &t.candidates {
                targets.insert(&c.target);
            }
        }
        let mut initials = self.states.iter().filter(|s| !targets.contains(&s.name));
        let first = initials.next()?;
        if initials.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Transitions offered on a state, in declaration order
    pub fn transitions_from(&self, state: &StateName) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| &t.source_state == state)
            .collect()
    }

    /// Transitions matching `(state, action)`, in declaration order
    pub fn transitions_for(&self, state: &StateName, action: &ActionName) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| &t.source_state == state && &t.action_name == action)
            .collect()
    }

    /// Escalation rules watching a state, in declaration order
    pub fn escalation_rules_for(&self, state: &StateName) -> Vec<&EscalationRule> {
        self.escalation_rules
            .iter()
            .filter(|r| &r.from_state == state)
            .collect()
    }

    /// Structural validation, returning every issue found
    ///
    /// Guard syntax is validated separately at publish time, since the
    /// expression language lives outside this crate.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.states.is_empty() {
            issues.push(ValidationIssue::NoStates);
            return issues;
        }

        // Unique state names
        let mut seen = HashSet::new();
        for state in &self.states {
            if !seen.insert(&state.name) {
                issues.push(ValidationIssue::DuplicateState(state.name.clone()));
            }
        }

        // Transition endpoints exist; terminal states have no outgoing
        for t in &self.transitions {
            if self.get_state(&t.source_state).is_none() {
                issues.push(ValidationIssue::DanglingTransition {
                    action: t.action_name.clone(),
                    state: t.source_state.clone(),
                });
            } else if self.is_terminal(&t.source_state) {
                issues.push(ValidationIssue::TransitionFromTerminal {
                    action: t.action_name.clone(),
                    state: t.source_state.clone(),
                });
            }
            for c in &t.candidates {
                if self.get_state(&c.target).is_none() {
                    issues.push(ValidationIssue::DanglingTransition {
                        action: t.action_name.clone(),
                        state: c.target.clone(),
                    });
                }
            }
            if t.candidates.is_empty() {
                issues.push(ValidationIssue::EmptyTransition {
                    action: t.action_name.clone(),
                    state: t.source_state.clone(),
                });
            }
        }

        // Exactly one initial state
        match self.initial_state() {
            None => issues.push(ValidationIssue::NoUniqueInitialState),
            Some(initial) => {
                // Every state reachable from the initial state
                let reachable = self.reachable_from(&initial.name);
                for state in &self.states {
                    if !reachable.contains(&state.name) {
                        issues.push(ValidationIssue::UnreachableState(state.name.clone()));
                    }
                }
            }
        }

        // At least one terminal state, and every non-terminal state
        // has a path to one
        let terminals: Vec<_> = self.states.iter().filter(|s| s.is_terminal).collect();
        if terminals.is_empty() {
            issues.push(ValidationIssue::NoTerminalState);
        } else {
            let can_finish = self.reaches_terminal();
            for state in &self.states {
                if !state.is_terminal && !can_finish.contains(&state.name) {
                    issues.push(ValidationIssue::NoPathToTerminal(state.name.clone()));
                }
            }
        }

        // Escalation rules reference known states; rule ids unique
        let mut rule_ids = HashSet::new();
        for rule in &self.escalation_rules {
            if self.get_state(&rule.from_state).is_none() {
                issues.push(ValidationIssue::EscalationUnknownState {
                    rule_id: rule.rule_id.clone(),
                    state: rule.from_state.clone(),
                });
            }
            if !rule_ids.insert(&rule.rule_id) {
                issues.push(ValidationIssue::DuplicateRuleId(rule.rule_id.clone()));
            }
        }

        // Delegation self-loops
        for rule in &self.delegation_rules {
            if rule.from_role == rule.to_role {
                issues.push(ValidationIssue::DelegationSelfLoop(rule.from_role.clone()));
            }
        }

        issues
    }

    /// States reachable from `start` following transition candidates
    fn reachable_from(&self, start: &StateName) -> HashSet<StateName> {
        let mut visited = HashSet::new();
        let mut queue = vec![start.clone()];

        while let Some(current) = queue.pop() {
            if visited.insert(current.clone()) {
                for t in self.transitions_from(&current) {
                    for c in &t.candidates {
                        if !visited.contains(&c.target) {
                            queue.push(c.target.clone());
                        }
                    }
                }
            }
        }

        visited
    }

    /// States from which some terminal state is reachable (reverse BFS)
    fn reaches_terminal(&self) -> HashSet<StateName> {
        // Reverse adjacency: target -> sources
        let mut incoming: HashMap<&StateName, Vec<&StateName>> = HashMap::new();
        for t in &self.transitions {
            for c in &t.candidates {
                incoming.entry(&c.target).or_default().push(&t.source_state);
            }
        }

        let mut visited = HashSet::new();
        let mut queue: Vec<StateName> = self
            .states
            .iter()
            .filter(|s| s.is_terminal)
            .map(|s| s.name.clone())
            .collect();

        while let Some(current) = queue.pop() {
            if visited.insert(current.clone()) {
                if let Some(sources) = incoming.get(&current) {
                    for source in sources {
                        if !visited.contains(*source) {
                            queue.push((*source).clone());
                        }
                    }
                }
            }
        }

        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_definition() -> WorkflowDefinition {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Pending Supervisor Approval").with_sla_hours(24))
            .unwrap();
        def.add_state(State::new("Pending Director Approval"))
            .unwrap();
        def.add_state(State::terminal("Approved")).unwrap();
        def.add_state(State::terminal("Rejected")).unwrap();

        def.add_transition(
            Transition::new("Pending Supervisor Approval", "Approve (Low Value)")
                .allow_role("Purchase Supervisor")
                .to_if("grand_total <= 5000", "Approved"),
        )
        .unwrap();
        def.add_transition(
            Transition::new("Pending Supervisor Approval", "Forward to Director")
                .allow_role("Purchase Supervisor")
                .to_if("grand_total > 20000", "Pending Director Approval"),
        )
        .unwrap();
        def.add_transition(
            Transition::new("Pending Supervisor Approval", "Reject")
                .allow_role("Purchase Supervisor")
                .to("Rejected"),
        )
        .unwrap();
        def.add_transition(
            Transition::new("Pending Director Approval", "Approve")
                .allow_role("Director")
                .to("Approved"),
        )
        .unwrap();
        def.add_transition(
            Transition::new("Pending Director Approval", "Reject")
                .allow_role("Director")
                .to("Rejected"),
        )
        .unwrap();

        def
    }

    #[test]
    fn test_valid_definition() {
        let def = two_level_definition();
        assert!(def.validate().is_empty());
        assert_eq!(
            def.initial_state().unwrap().name,
            StateName::new("Pending Supervisor Approval")
        );
    }

    #[test]
    fn test_duplicate_state_rejected() {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Draft")).unwrap();
        let result = def.add_state(State::new("Draft"));
        assert!(matches!(result, Err(WorkflowError::DuplicateState(_))));
    }

    #[test]
    fn test_transition_to_unknown_state_rejected() {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Draft")).unwrap();
        let result =
            def.add_transition(Transition::new("Draft", "Submit").to("Nonexistent"));
        assert!(matches!(result, Err(WorkflowError::StateNotFound(_))));
    }

    #[test]
    fn test_no_unique_initial_state() {
        let mut def = WorkflowDefinition::new("Purchase Order");
        // Two states with no incoming transitions
        def.add_state(State::new("A")).unwrap();
        def.add_state(State::new("B")).unwrap();
        def.add_state(State::terminal("Done")).unwrap();
        def.add_transition(Transition::new("A", "Finish").to("Done"))
            .unwrap();
        def.add_transition(Transition::new("B", "Finish").to("Done"))
            .unwrap();

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::NoUniqueInitialState)));
    }

    #[test]
    fn test_unreachable_state_flagged() {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Start")).unwrap();
        def.add_state(State::terminal("Done")).unwrap();
        // Disconnected two-state cycle: each has an incoming edge, so
        // the initial state stays unique, but neither is reachable
        def.add_state(State::new("Orbit A")).unwrap();
        def.add_state(State::new("Orbit B")).unwrap();
        def.add_transition(Transition::new("Start", "Finish").to("Done"))
            .unwrap();
        def.add_transition(Transition::new("Orbit A", "Spin").to("Orbit B"))
            .unwrap();
        def.add_transition(Transition::new("Orbit B", "Spin").to("Orbit A"))
            .unwrap();

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::UnreachableState(s) if s.0 == "Orbit A")));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::NoPathToTerminal(s) if s.0 == "Orbit B")));
    }

    #[test]
    fn test_no_path_to_terminal() {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Start")).unwrap();
        def.add_state(State::new("Stuck")).unwrap();
        def.add_state(State::terminal("Done")).unwrap();
        def.add_transition(Transition::new("Start", "Finish").to("Done"))
            .unwrap();
        def.add_transition(Transition::new("Start", "Wedge").to("Stuck"))
            .unwrap();

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::NoPathToTerminal(s) if s.0 == "Stuck")));
    }

    #[test]
    fn test_no_terminal_state() {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Start")).unwrap();
        def.add_state(State::new("Middle")).unwrap();
        def.add_transition(Transition::new("Start", "Go").to("Middle"))
            .unwrap();

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::NoTerminalState)));
    }

    #[test]
    fn test_transition_from_terminal_flagged() {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Start")).unwrap();
        def.add_state(State::terminal("Done")).unwrap();
        def.add_transition(Transition::new("Start", "Finish").to("Done"))
            .unwrap();
        def.add_transition(Transition::new("Done", "Reopen").to("Start"))
            .unwrap();

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::TransitionFromTerminal { .. })));
    }

    #[test]
    fn test_duplicate_rule_id_flagged() {
        let mut def = two_level_definition();
        def.add_escalation_rule(EscalationRule::reassign(
            "esc-1",
            "Pending Supervisor Approval",
            24,
            "Department Head",
        ));
        def.add_escalation_rule(EscalationRule::reassign(
            "esc-1",
            "Pending Director Approval",
            48,
            "General Manager",
        ));

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::DuplicateRuleId(_))));
    }

    #[test]
    fn test_escalation_unknown_state_flagged() {
        let mut def = two_level_definition();
        def.add_escalation_rule(EscalationRule::reassign(
            "esc-x",
            "No Such State",
            24,
            "Department Head",
        ));

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::EscalationUnknownState { .. })));
    }

    #[test]
    fn test_delegation_self_loop_flagged() {
        let mut def = two_level_definition();
        def.add_delegation_rule(DelegationRule::new(
            "Purchase Supervisor",
            "Purchase Supervisor",
            "supervisor_absent",
        ));

        let issues = def.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::DelegationSelfLoop(_))));
    }

    #[test]
    fn test_transitions_for_declaration_order() {
        let def = two_level_definition();
        let state = StateName::new("Pending Supervisor Approval");

        let all = def.transitions_from(&state);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action_name, ActionName::new("Approve (Low Value)"));
        assert_eq!(all[2].action_name, ActionName::new("Reject"));

        let matched = def.transitions_for(&state, &ActionName::new("Reject"));
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_definition_serde_roundtrip() {
        let mut def = two_level_definition();
        def.add_escalation_rule(
            EscalationRule::reassign("esc-1", "Pending Supervisor Approval", 24, "Department Head")
                .with_guard("priority == \"High\""),
        );
        def.add_delegation_rule(DelegationRule::new(
            "Purchase Supervisor",
            "Senior Purchase Officer",
            "supervisor_absent",
        ));

        let json = serde_json::to_string(&def).unwrap();
        let back: WorkflowDefinition = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_empty());
        assert_eq!(back.escalation_rules.len(), 1);
        assert_eq!(back.delegation_rules.len(), 1);
    }
}
