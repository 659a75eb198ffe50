//! Common utilities for integration tests

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::path::PathBuf;

/// Two modules: `config` exports a value, `system` bootstraps a service on it
pub const SERVICE_MANIFEST: &str = r#"
classes:
  - name: Config
  - name: Service
modules:
  - name: config
    elements:
      - { label: cfg, provides: Config, value: production, export: true }
  - name: system
    imports: [config]
    elements:
      - label: svc
        provides: Service
        bootstrap: true
        args:
          - { name: cfg, type: Config }
"#;

/// Isolated environment: manifests and config live in a temp dir
pub struct TestContext {
    pub temp: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        temp.child("config").create_dir_all().unwrap();
        Self { temp }
    }

    /// `wiring` with the platform config directory pointed at the temp dir
    pub fn wiring(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("wiring").unwrap();
        cmd.current_dir(self.temp.path());

        let config_dir = self.temp.child("config").to_path_buf();
        if cfg!(target_os = "windows") {
            cmd.env("APPDATA", &config_dir);
        } else if cfg!(target_os = "linux") {
            cmd.env("XDG_CONFIG_HOME", &config_dir);
            cmd.env("HOME", self.temp.path());
        } else {
            cmd.env("HOME", self.temp.path());
        }
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn write_manifest(&self, name: &str, content: &str) -> PathBuf {
        let file = self.temp.child(name);
        file.write_str(content).unwrap();
        file.to_path_buf()
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let file = self.temp.child("wiring-config.yaml");
        file.write_str(content).unwrap();
        file.to_path_buf()
    }
}
