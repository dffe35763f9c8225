//! Delegation resolver: role substitution while someone is away
//!
//! A delegation rule says "while `trigger` holds, `to_role` covers for
//! `from_role`". Two directions fall out of that:
//!
//! - authorization: a holder of `to_role` acts with `from_role`'s
//!   permissions (chains expand transitively, capped at
//!   [`MAX_DELEGATION_HOPS`]);
//! - assignment: a reassignment targeting `from_role` lands on
//!   `to_role` instead.
//!
//! Triggers are guard expressions over the role directory's flag
//! snapshot, evaluated fail-closed like any other guard.

use crate::registry::CompiledDefinition;
use docflow_guard::evaluate;
use docflow_types::{DelegationRule, DocumentSnapshot, RoleId, MAX_DELEGATION_HOPS};
use std::collections::HashSet;
use tracing::warn;

/// Stateless delegation logic over a compiled definition
pub struct DelegationResolver;

impl DelegationResolver {
    /// Rules whose trigger currently holds
    pub fn active_rules<'a>(
        compiled: &'a CompiledDefinition,
        flags: &DocumentSnapshot,
    ) -> Vec<&'a DelegationRule> {
        compiled
            .definition
            .delegation_rules
            .iter()
            .filter(|rule| match compiled.guard(&rule.trigger) {
                Some(expr) => evaluate(expr, flags),
                None => {
                    warn!(
                        trigger = %rule.trigger,
                        "Delegation trigger has no compiled guard, treating as inactive"
                    );
                    false
                }
            })
            .collect()
    }

    /// Expand held roles through active delegation chains
    ///
    /// A holder of `to_role` gains `from_role`, and roles gained that
    /// way can gain further, up to the hop cap. Cycles terminate
    /// because already-held roles are never re-added.
    pub fn effective_roles(
        held: &[RoleId],
        compiled: &CompiledDefinition,
        flags: &DocumentSnapshot,
    ) -> HashSet<RoleId> {
        let active = Self::active_rules(compiled, flags);
        let mut effective: HashSet<RoleId> = held.iter().cloned().collect();
        let mut frontier: Vec<RoleId> = held.to_vec();

        for _ in 0..MAX_DELEGATION_HOPS {
            let mut gained = Vec::new();
            for rule in &active {
                if frontier.contains(&rule.to_role) && !effective.contains(&rule.from_role) {
                    gained.push(rule.from_role.clone());
                }
            }
            if gained.is_empty() {
                break;
            }
            effective.extend(gained.iter().cloned());
            frontier = gained;
        }

        effective
    }

    /// Follow delegations forward from a role an escalation would
    /// assign to, landing on whoever currently covers it
    pub fn resolve_assignment(
        role: &RoleId,
        compiled: &CompiledDefinition,
        flags: &DocumentSnapshot,
    ) -> RoleId {
        let active = Self::active_rules(compiled, flags);
        let mut current = role.clone();
        let mut visited = HashSet::new();
        visited.insert(current.clone());

        for _ in 0..MAX_DELEGATION_HOPS {
            let Some(rule) = active.iter().find(|r| r.from_role == current) else {
                break;
            };
            if !visited.insert(rule.to_role.clone()) {
                break;
            }
            current = rule.to_role.clone();
        }

        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DefinitionRegistry;
    use docflow_types::{DocumentType, State, Transition, WorkflowDefinition};

    fn definition_with_rules(rules: Vec<DelegationRule>) -> std::sync::Arc<CompiledDefinition> {
        let mut def = WorkflowDefinition::new("Purchase Order");
        def.add_state(State::new("Pending").with_editor_role("Supervisor"))
            .unwrap();
        def.add_state(State::terminal("Approved")).unwrap();
        def.add_transition(
            Transition::new("Pending", "approve")
                .allow_role("Supervisor")
                .to("Approved"),
        )
        .unwrap();
        for rule in rules {
            def.add_delegation_rule(rule);
        }

        let mut registry = DefinitionRegistry::new();
        registry.publish(def).unwrap();
        registry.active(&DocumentType::new("Purchase Order")).unwrap()
    }

    #[test]
    fn test_inactive_trigger_grants_nothing() {
        let compiled = definition_with_rules(vec![DelegationRule::new(
            "Supervisor",
            "Deputy",
            "supervisor_absent",
        )]);
        let flags = DocumentSnapshot::new().with_field("supervisor_absent", false);

        let roles =
            DelegationResolver::effective_roles(&[RoleId::new("Deputy")], &compiled, &flags);
        assert!(!roles.contains(&RoleId::new("Supervisor")));
    }

    #[test]
    fn test_active_trigger_grants_delegated_role() {
        let compiled = definition_with_rules(vec![DelegationRule::new(
            "Supervisor",
            "Deputy",
            "supervisor_absent",
        )]);
        let flags = DocumentSnapshot::new().with_field("supervisor_absent", true);

        let roles =
            DelegationResolver::effective_roles(&[RoleId::new("Deputy")], &compiled, &flags);
        assert!(roles.contains(&RoleId::new("Supervisor")));
        assert!(roles.contains(&RoleId::new("Deputy")));
    }

    #[test]
    fn test_chain_expands_transitively() {
        let compiled = definition_with_rules(vec![
            DelegationRule::new("Manager", "Supervisor", "manager_absent"),
            DelegationRule::new("Supervisor", "Deputy", "supervisor_absent"),
        ]);
        let flags = DocumentSnapshot::new()
            .with_field("manager_absent", true)
            .with_field("supervisor_absent", true);

        // Deputy covers Supervisor, who covers Manager
        let roles =
            DelegationResolver::effective_roles(&[RoleId::new("Deputy")], &compiled, &flags);
        assert!(roles.contains(&RoleId::new("Supervisor")));
        assert!(roles.contains(&RoleId::new("Manager")));
    }

    #[test]
    fn test_cycle_terminates() {
        let compiled = definition_with_rules(vec![
            DelegationRule::new("A", "B", "swap"),
            DelegationRule::new("B", "A", "swap"),
        ]);
        let flags = DocumentSnapshot::new().with_field("swap", true);

        let roles = DelegationResolver::effective_roles(&[RoleId::new("A")], &compiled, &flags);
        assert_eq!(roles.len(), 2);

        let landed = DelegationResolver::resolve_assignment(&RoleId::new("A"), &compiled, &flags);
        // Follows A -> B, then stops at the cycle
        assert_eq!(landed, RoleId::new("B"));
    }

    #[test]
    fn test_missing_flag_fails_closed() {
        let compiled = definition_with_rules(vec![DelegationRule::new(
            "Supervisor",
            "Deputy",
            "supervisor_absent",
        )]);
        let flags = DocumentSnapshot::new();

        let roles =
            DelegationResolver::effective_roles(&[RoleId::new("Deputy")], &compiled, &flags);
        assert!(!roles.contains(&RoleId::new("Supervisor")));
    }

    #[test]
    fn test_resolve_assignment_lands_on_cover() {
        let compiled = definition_with_rules(vec![DelegationRule::new(
            "Supervisor",
            "Deputy",
            "supervisor_absent",
        )]);
        let flags = DocumentSnapshot::new().with_field("supervisor_absent", true);

        let landed =
            DelegationResolver::resolve_assignment(&RoleId::new("Supervisor"), &compiled, &flags);
        assert_eq!(landed, RoleId::new("Deputy"));

        // An undelegated role resolves to itself
        let same =
            DelegationResolver::resolve_assignment(&RoleId::new("Manager"), &compiled, &flags);
        assert_eq!(same, RoleId::new("Manager"));
    }
}
