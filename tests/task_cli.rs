mod support;

use predicates::str::contains;
use serde_json::Value;

use support::{days_from_today, today, ymd, TestProfile};

fn ids(tasks: &Value) -> Vec<u64> {
    tasks
        .as_array()
        .expect("task array")
        .iter()
        .map(|task| task["id"].as_u64().expect("id"))
        .collect()
}

#[test]
fn join_then_whoami() {
    let profile = TestProfile::new();
    let joined = profile.json(&["join", " alpha ", "--name", "Mei"]);
    assert_eq!(joined["teamCode"], "alpha");
    assert_eq!(joined["userName"], "Mei");

    let who = profile.json(&["whoami"]);
    assert_eq!(who, joined);

    profile
        .cmd()
        .arg("whoami")
        .assert()
        .success()
        .stdout(contains("Mei @ alpha"));
}

#[test]
fn commands_without_team_fail_with_user_error() {
    let profile = TestProfile::new();
    profile
        .cmd()
        .arg("list")
        .assert()
        .code(2)
        .stderr(contains("No active team"))
        .stderr(contains("teamtodo join"));
}

#[test]
fn add_then_list_contains_created_task() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");

    let due = days_from_today(5);
    let created = profile.json(&["add", "Plan sprint", "--due", &ymd(due), "--category", "work"]);
    assert_eq!(created["name"], "Plan sprint");
    assert_eq!(created["category"], "work");
    assert_eq!(created["completed"], false);
    assert_eq!(created["created_at"], created["updated_at"]);

    let listed = profile.json(&["list"]);
    assert_eq!(listed["team"], "alpha");
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0], created);
}

#[test]
fn add_reports_every_invalid_field() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");

    let output = profile
        .cmd()
        .args(["add", "  ", "--category", "chores", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("error envelope");
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["kind"], "user_error");
    let fields = &value["error"]["details"]["fields"];
    assert!(fields["name"].is_string());
    assert!(fields["due_date"].is_string());
    assert!(fields["category"].is_string());

    assert_eq!(profile.json(&["list"])["total"], 0);
}

#[test]
fn missing_ids_are_not_found() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");
    profile.add("Only", today());

    for args in [
        vec!["show", "42"],
        vec!["done", "42"],
        vec!["toggle", "42"],
        vec!["rm", "42"],
        vec!["edit", "42", "--name", "x"],
    ] {
        profile
            .cmd()
            .args(&args)
            .assert()
            .code(3)
            .stderr(contains("Task not found: 42"));
    }
}

#[test]
fn edit_done_reopen_and_toggle() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");
    let id = profile.add("Draft", today()).to_string();

    let edited = profile.json(&["edit", &id, "--name", "Final", "--category", "urgent"]);
    assert_eq!(edited["name"], "Final");
    assert_eq!(edited["category"], "urgent");

    assert_eq!(profile.json(&["done", &id])["completed"], true);
    assert_eq!(profile.json(&["reopen", &id])["completed"], false);
    assert_eq!(profile.json(&["toggle", &id])["completed"], true);

    let shown = profile.json(&["show", &id]);
    assert_eq!(shown["name"], "Final");
    assert_eq!(shown["completed"], true);

    profile
        .cmd()
        .args(["edit", &id])
        .assert()
        .code(2)
        .stderr(contains("nothing to change"));
}

#[test]
fn rm_removes_exactly_one_task() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");
    let keep = profile.add("Keep", today());
    let drop = profile.add("Drop", today());

    let removed = profile.json(&["rm", &drop.to_string()]);
    assert_eq!(removed["deleted"], true);

    let listed = profile.json(&["list"]);
    assert_eq!(ids(&listed["items"]), vec![keep]);
}

#[test]
fn list_filters_sorts_and_paginates() {
    let profile = TestProfile::new();
    profile.write_config("[query]\npage_size = 2\n").expect("config");
    profile.join("alpha", "Mei");

    let later = profile.add("Report later", days_from_today(3));
    let soon = profile.add("Report soon", days_from_today(1));
    let other = profile.add("Groceries", days_from_today(2));

    let first = profile.json(&["list"]);
    assert_eq!(first["total"], 3);
    assert_eq!(first["total_pages"], 2);
    assert_eq!(ids(&first["items"]), vec![soon, other]);

    let second = profile.json(&["list", "--page", "9"]);
    assert_eq!(second["page"], 2);
    assert_eq!(ids(&second["items"]), vec![later]);

    let everything = profile.json(&["list", "--all"]);
    assert_eq!(ids(&everything["items"]), vec![soon, other, later]);

    let searched = profile.json(&["list", "--search", "REPORT"]);
    assert_eq!(ids(&searched["items"]), vec![soon, later]);

    let by_date = profile.json(&["list", "--search", &ymd(days_from_today(2))]);
    assert_eq!(ids(&by_date["items"]), vec![other]);

    let by_category = profile.json(&["list", "--category", "work"]);
    assert_eq!(by_category["total"], 0);
    let all = profile.json(&["list", "--category", "all", "--all"]);
    assert_eq!(all["total"], 3);
}

#[test]
fn teams_do_not_see_each_other() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");
    profile.add("Alpha task", today());

    let beta = profile.json(&["list", "--team", "beta"]);
    assert_eq!(beta["team"], "beta");
    assert_eq!(beta["total"], 0);

    profile.join("beta", "Mei");
    assert_eq!(profile.json(&["list"])["total"], 0);
    assert_eq!(profile.json(&["list", "--team", "alpha"])["total"], 1);
}

#[test]
fn leave_clears_the_session() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");

    let left = profile.json(&["leave"]);
    assert_eq!(left["left"], true);
    assert_eq!(left["team"]["teamCode"], "alpha");

    let again = profile.json(&["leave"]);
    assert_eq!(again["left"], false);

    profile.cmd().arg("whoami").assert().code(2);
}

#[test]
fn stats_upcoming_and_notices() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");

    let due_today = profile.add("Today", today());
    let overdue = profile.add("Yesterday", days_from_today(-1));
    let tomorrow = profile.add("Tomorrow", days_from_today(1));
    let horizon = profile.add("Horizon", days_from_today(3));
    profile.add("Beyond", days_from_today(10));
    let finished = profile.add("Finished", days_from_today(-2));
    profile.json(&["done", &finished.to_string()]);

    let stats = profile.json(&["stats"]);
    assert_eq!(stats["total"], 6);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["completion_rate"], 17);
    assert_eq!(stats["due_today"], 1);
    assert_eq!(stats["overdue"], 1);
    assert_eq!(stats["upcoming"], 3);
    assert_eq!(stats["by_category"]["other"], 6);

    let upcoming = profile.json(&["upcoming"]);
    assert_eq!(upcoming["days"], 3);
    assert_eq!(ids(&upcoming["tasks"]), vec![due_today, tomorrow, horizon]);
    let narrow = profile.json(&["upcoming", "--days", "0"]);
    assert_eq!(ids(&narrow["tasks"]), vec![due_today]);

    let notices = profile.json(&["notices"]);
    let notice_ids: Vec<&str> = notices["notices"]
        .as_array()
        .expect("notices")
        .iter()
        .map(|n| n["id"].as_str().expect("notice id"))
        .collect();
    assert_eq!(
        notice_ids,
        vec![
            format!("task-{due_today}-today"),
            format!("task-{overdue}-overdue"),
            format!("task-{tomorrow}-tomorrow"),
        ]
    );
}

#[test]
fn events_are_written_as_json_lines() {
    let profile = TestProfile::new();
    let events = profile.path().join("events.jsonl");
    let events_arg = events.display().to_string();

    profile
        .cmd()
        .args(["--events", &events_arg, "join", "alpha", "--name", "Mei"])
        .assert()
        .success();
    profile
        .cmd()
        .args(["--events", &events_arg, "add", "Ship", "--due", &ymd(today())])
        .assert()
        .success();
    let listed = profile.json(&["list"]);
    let id = ids(&listed["items"])[0].to_string();
    profile
        .cmd()
        .args(["--events", &events_arg, "rm", &id])
        .assert()
        .success();

    let content = std::fs::read_to_string(&events).expect("events file");
    let lines: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("event json"))
        .collect();
    let kinds: Vec<&str> = lines
        .iter()
        .map(|line| line["event"].as_str().expect("kind"))
        .collect();
    assert_eq!(kinds, vec!["team_joined", "task_created", "task_deleted"]);
    assert!(lines.iter().all(|line| line["actor"] == "Mei"));
    assert!(lines.iter().all(|line| line["team"] == "alpha"));
    assert_eq!(lines[1]["data"]["name"], "Ship");
}

#[test]
fn notification_preference_flow() {
    let profile = TestProfile::new();

    let denied = profile
        .cmd()
        .args(["notify", "on", "--json"])
        .write_stdin("")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let denied: Value = serde_json::from_slice(&denied).expect("json");
    assert_eq!(denied["data"]["enabled"], false);
    assert_eq!(denied["data"]["permission"], "default");

    profile
        .cmd()
        .args(["notify", "on", "--allow"])
        .write_stdin("")
        .assert()
        .success()
        .stderr(contains("[Notifications enabled]"));

    let status = profile.json(&["notify", "status"]);
    assert_eq!(status["enabled"], true);
    assert_eq!(status["permission"], "granted");

    let test = profile.json(&["notify", "test"]);
    assert_eq!(test["shown"], true);

    let off = profile.json(&["notify", "off"]);
    assert_eq!(off["enabled"], false);
    assert_eq!(off["permission"], "granted");
}

#[test]
fn watch_prints_snapshots_until_limit() {
    let profile = TestProfile::new();
    profile
        .write_config("[sync]\nrefresh_interval_secs = 1\n")
        .expect("config");
    profile.join("alpha", "Mei");
    profile.add("Due now", today());

    let output = profile
        .cmd()
        .args(["watch", "--limit", "1", "--json"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let snapshots: Vec<Value> = serde_json::Deserializer::from_slice(&output)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("snapshots");
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["data"]["reason"], "initial");
    assert_eq!(snapshots[0]["data"]["stats"]["due_today"], 1);
    assert_eq!(snapshots[0]["data"]["notices"][0]["kind"], "due-today");
    assert!(snapshots[0]["data"]["notified"]
        .as_array()
        .expect("notified")
        .is_empty());
}

#[test]
fn watch_notifies_each_notice_once() {
    let profile = TestProfile::new();
    profile
        .write_config("[sync]\nrefresh_interval_secs = 1\n")
        .expect("config");
    profile.join("alpha", "Mei");
    profile
        .cmd()
        .args(["notify", "on", "--allow"])
        .write_stdin("")
        .assert()
        .success();
    let id = profile.add("Due now", today());

    let assert = profile
        .cmd()
        .args(["watch", "--limit", "2", "--json"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stderr(contains("[Due today]"));
    let output = assert.get_output();

    let snapshots: Vec<Value> = serde_json::Deserializer::from_slice(&output.stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("snapshots");
    assert_eq!(snapshots.len(), 3);

    let expected = format!("task-{id}-today");
    assert_eq!(snapshots[0]["data"]["notified"], serde_json::json!([expected]));
    for later in &snapshots[1..] {
        assert_eq!(later["data"]["notices"][0]["id"], expected.as_str());
        assert!(later["data"]["notified"]
            .as_array()
            .expect("notified")
            .is_empty());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("[Due today]").count(), 1);
}

#[test]
fn json_envelope_carries_schema_and_command() {
    let profile = TestProfile::new();
    profile.join("alpha", "Mei");

    let output = profile
        .cmd()
        .args(["--json", "stats"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("envelope");
    assert_eq!(value["schema_version"], "teamtodo.v1");
    assert_eq!(value["command"], "stats");
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["total"], 0);

    let output = profile
        .cmd()
        .args(["--json", "notify", "status", "--team", "beta"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("envelope");
    assert_eq!(value["command"], "notify status");

    let output = profile
        .cmd()
        .args(["--json", "show", "9"])
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("error envelope");
    assert_eq!(value["command"], "show");
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["kind"], "not_found");
    assert_eq!(value["next_steps"][0], "teamtodo list --all");
}
