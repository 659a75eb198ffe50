//! Tests for `wiring boot`

use super::common::{TestContext, SERVICE_MANIFEST};
use predicates::prelude::*;

const LAYERED_MANIFEST: &str = r#"
classes:
  - name: Db
  - name: Cache
  - name: Api
modules:
  - name: storage
    elements:
      - { label: db, provides: Db, export: true, bootstrap: true }
      - label: cache
        provides: Cache
        export: true
        bootstrap: true
        args: [{ name: db, type: Db }]
  - name: web
    imports: [storage]
    elements:
      - label: api
        provides: Api
        bootstrap: true
        args:
          - { name: db, type: Db }
          - { name: cache, type: Cache }
      - { label: idle, provides: Api, strategy: transient }
"#;

#[test]
fn boot_constructs_bootstrap_elements_in_order() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", LAYERED_MANIFEST);

    ctx.wiring()
        .arg("boot")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "✓ Application booted (3 element(s) constructed)",
        ))
        .stdout(predicate::str::contains("  1. db\n  2. cache\n  3. api"))
        .stdout(predicate::str::contains("idle").not());
}

#[test]
fn boot_honours_deferred_boot_config() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", SERVICE_MANIFEST);
    let config = ctx.write_config("boot_on_build: false\n");

    ctx.wiring()
        .arg("--config")
        .arg(&config)
        .arg("boot")
        .arg(&manifest)
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"booted\""))
        .stdout(predicate::str::contains("\"svc\""));
}

#[test]
fn boot_in_parallel_constructs_everything() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", LAYERED_MANIFEST);

    ctx.wiring()
        .arg("boot")
        .arg("--parallel")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 element(s) constructed"));
}

#[test]
fn boot_verbose_logs_to_stderr() {
    let ctx = TestContext::new();
    let manifest = ctx.write_manifest("wiring.yaml", SERVICE_MANIFEST);

    ctx.wiring()
        .arg("--verbose")
        .arg("boot")
        .arg(&manifest)
        .assert()
        .success()
        .stderr(predicate::str::contains("Composed application"));
}
