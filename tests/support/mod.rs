#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::{Days, Local, NaiveDate};
use serde_json::Value;
use tempfile::TempDir;

use teamtodo::storage::Storage;

/// A throwaway data directory ("browser profile") for one test.
pub struct TestProfile {
    dir: TempDir,
}

impl TestProfile {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage(&self) -> Storage {
        Storage::new(self.dir.path())
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join("teamtodo.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `teamtodo` bound to this data directory, isolated from the caller's env.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("teamtodo").expect("binary");
        cmd.env_remove("TEAMTODO_TEAM")
            .env_remove("TEAMTODO_EVENTS")
            .env_remove("RUST_LOG")
            .arg("--data-dir")
            .arg(self.dir.path());
        cmd
    }

    /// Run a command with `--json` and return the envelope's `data`.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(value["status"], "success");
        value["data"].clone()
    }

    pub fn join(&self, team: &str, name: &str) {
        self.cmd()
            .args(["join", team, "--name", name])
            .assert()
            .success();
    }

    /// Add a task and return its id.
    pub fn add(&self, name: &str, due: NaiveDate) -> u64 {
        let due = due.format("%Y-%m-%d").to_string();
        let data = self.json(&["add", name, "--due", &due]);
        data["id"].as_u64().expect("task id")
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn days_from_today(days: i64) -> NaiveDate {
    let today = today();
    if days >= 0 {
        today + Days::new(days as u64)
    } else {
        today - Days::new(days.unsigned_abs())
    }
}

pub fn ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
