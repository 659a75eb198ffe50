use wiring_core::{
    AssignmentError, ComposerError, ConsistencyViolation, InstanceError, WiringError,
};

/// Render an error the way the CLI prints it, with a hint when one applies
pub fn format_error_with_help(error: &WiringError) -> String {
    let mut message = format!("❌ Error: {}", error);
    if let Some(help) = suggestion(error) {
        message.push_str("\n\n💡 Suggestion: ");
        message.push_str(help);
    }
    message
}

fn suggestion(error: &WiringError) -> Option<&'static str> {
    match error {
        WiringError::Compose(err) => compose_suggestion(err),
        WiringError::Instance(InstanceError::Injection { .. }) => {
            Some("The element's injector failed; check the arguments it was given.")
        }
        WiringError::Instance(InstanceError::TypeNotFound(_)) => {
            Some("No element declares that result type. Base types such as 'object' never match.")
        }
        WiringError::Config(_) => {
            Some("Fix or delete the config file; missing fields fall back to their defaults.")
        }
        WiringError::Manifest(msg) if msg.contains("not found") => {
            Some("Pass the path of an existing manifest file.")
        }
        WiringError::Manifest(_) => {
            Some("Check the manifest against the documented schema: classes, modules, aggregation.")
        }
        _ => None,
    }
}

fn compose_suggestion(error: &ComposerError) -> Option<&'static str> {
    match error {
        ComposerError::ModuleAssignment { source, .. } => match source {
            AssignmentError::Unsatisfied { .. } => Some(
                "Provide an element of that type in the module, \
                 or export it from an imported module.",
            ),
            AssignmentError::Ambiguous { .. } => {
                Some("Several elements fit. Narrow the argument type or aggregate the argument.")
            }
            AssignmentError::InvalidAggregationType { .. } => {
                Some("Aggregated arguments must be declared as a collection, e.g. List[T].")
            }
        },
        ComposerError::ModuleCyclicDependency { .. } => Some(
            "Remove or retype one of the dependencies in the cycle, \
             or move an element to another module.",
        ),
        ComposerError::UnresolvedImport(_) => {
            Some("Modules must not import each other in a cycle.")
        }
        ComposerError::Consistency(err) => match err.violations.first() {
            Some(ConsistencyViolation::InaccessibleExports { .. }) => {
                Some("A module may only export elements it owns or imports.")
            }
            Some(ConsistencyViolation::SharedElements { .. }) => {
                Some("Each element must be owned by exactly one module.")
            }
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use wiring_core::ApplicationComposer;

    #[test]
    fn test_format_error_with_help() {
        let error = WiringError::Manifest("Manifest not found: wiring.yaml".to_string());
        let message = format_error_with_help(&error);
        assert!(message.starts_with("❌ Error: Manifest error: Manifest not found"));
        assert!(message.contains("💡 Suggestion: Pass the path"));
    }

    #[test]
    fn test_cyclic_dependency_help() {
        let yaml = r#"
classes:
  - name: A
  - name: B
modules:
  - name: loop
    elements:
      - label: a
        provides: A
        args:
          - { name: b, type: B }
      - label: b
        provides: B
        args:
          - { name: a, type: A }
"#;
        let loaded = Manifest::from_yaml(yaml).unwrap().build().unwrap();
        let error = ApplicationComposer::new(loaded.selector())
            .compose(&loaded.application)
            .unwrap_err();
        let message = format_error_with_help(&WiringError::from(error));

        assert!(message.contains("cyclic dependency between 'a', 'b'"));
        assert!(message.ends_with(
            "💡 Suggestion: Remove or retype one of the dependencies in the cycle, \
             or move an element to another module."
        ));
        assert!(!message.contains("optional"));
    }

    #[test]
    fn test_format_error_without_help() {
        let error = WiringError::Report("broken".to_string());
        assert_eq!(format_error_with_help(&error), "❌ Error: Report error: broken");
    }
}
