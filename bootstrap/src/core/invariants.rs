//! Semantic invariants over a build plan.
//!
//! The planner upholds these by construction; the checker exists so the
//! pipeline refuses to execute a plan that violates them, whatever produced
//! it.

use crate::core::types::{PlannedStage, StageId};

/// Check plan invariants:
/// - Stages appear exactly in [`StageId::BUILD_ORDER`]
/// - Every stage has at least one command
/// - Every command after the identity stage carries `run_as`
/// - Provisioning commands are non-interactive (`DEBIAN_FRONTEND`)
pub fn validate_plan(plan: &[PlannedStage]) -> Vec<String> {
    let mut errors = Vec::new();

    let ids: Vec<StageId> = plan.iter().map(|stage| stage.id).collect();
    if ids != StageId::BUILD_ORDER {
        errors.push(format!(
            "stages out of order: expected {:?}, got {:?}",
            StageId::BUILD_ORDER
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>(),
            ids.iter().map(|s| s.name()).collect::<Vec<_>>()
        ));
        return errors;
    }

    let mut past_identity = false;
    for stage in plan {
        if stage.commands.is_empty() {
            errors.push(format!("{}: stage has no commands", stage.id));
        }
        for command in &stage.commands {
            if past_identity && command.run_as.is_none() {
                errors.push(format!(
                    "{}: '{}' would run with elevated privilege after de-escalation",
                    stage.id, command
                ));
            }
            if stage.id == StageId::Provision
                && !command
                    .env
                    .iter()
                    .any(|(k, v)| k == "DEBIAN_FRONTEND" && v == "noninteractive")
            {
                errors.push(format!(
                    "{}: '{}' is missing DEBIAN_FRONTEND=noninteractive",
                    stage.id, command
                ));
            }
        }
        if stage.id == StageId::Identity {
            past_identity = true;
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::{EnvironmentDescriptor, IdentityRecord, LayoutSpec};
    use crate::core::plan::build_plan;
    use crate::core::types::CommandSpec;

    fn valid_plan() -> Vec<PlannedStage> {
        build_plan(
            &EnvironmentDescriptor::default(),
            &IdentityRecord::default(),
            &LayoutSpec::default(),
        )
    }

    #[test]
    fn planner_output_passes() {
        assert!(validate_plan(&valid_plan()).is_empty());
    }

    #[test]
    fn reordered_stages_are_rejected() {
        let mut plan = valid_plan();
        plan.swap(2, 4);
        let errors = validate_plan(&plan);
        assert!(errors.iter().any(|err| err.contains("out of order")));
    }

    #[test]
    fn privileged_command_after_identity_is_rejected() {
        let mut plan = valid_plan();
        plan[3].commands.push(CommandSpec::new("npm").arg("ci"));
        let errors = validate_plan(&plan);
        assert!(errors.iter().any(|err| err.contains("elevated privilege")));
    }

    #[test]
    fn interactive_provision_command_is_rejected() {
        let mut plan = valid_plan();
        plan[0].commands.push(CommandSpec::new("apt-get").arg("update"));
        let errors = validate_plan(&plan);
        assert!(errors.iter().any(|err| err.contains("DEBIAN_FRONTEND")));
    }

    #[test]
    fn empty_stage_is_rejected() {
        let mut plan = valid_plan();
        plan[1].commands.clear();
        let errors = validate_plan(&plan);
        assert!(errors.iter().any(|err| err.contains("no commands")));
    }
}
