//! Tests for `wiring check`

use super::common::{TestContext, SERVICE_MANIFEST};
use predicates::prelude::*;

#[test]
fn check_accepts_valid_manifest() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", SERVICE_MANIFEST);

    ctx.wiring()
        .arg("check")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓"))
        .stdout(predicate::str::contains(
            "2 module(s), 2 element(s), 1 assignment(s)",
        ));
}

#[test]
fn check_reports_missing_manifest() {
    let ctx = TestContext::new();

    ctx.wiring()
        .arg("check")
        .arg("missing.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("❌ Error:"))
        .stderr(predicate::str::contains("Manifest not found"));
}

#[test]
fn check_reports_unsatisfied_dependency() {
    let ctx = TestContext::new();
    // `cfg` is not exported, so `system` cannot see it
    let manifest = ctx.write_manifest(
        "wiring.yaml",
        &SERVICE_MANIFEST.replace("export: true", "export: false"),
    );

    ctx.wiring()
        .arg("check")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to compose module 'system'"))
        .stderr(predicate::str::contains("💡 Suggestion:"));
}

#[test]
fn check_reports_cyclic_dependency() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest(
        "wiring.yaml",
        r#"
classes:
  - name: A
  - name: B
modules:
  - name: loop
    elements:
      - { label: a, provides: A, args: [{ name: b, type: B }] }
      - { label: b, provides: B, args: [{ name: a, type: A }] }
"#,
    );

    ctx.wiring()
        .arg("check")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cyclic dependency between 'a', 'b'"));
}

#[test]
fn check_reports_bad_config() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", SERVICE_MANIFEST);
    let config = ctx.write_config("report_format: [broken]\n");

    ctx.wiring()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}
