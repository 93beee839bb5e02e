use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;

const MAIN_CLASS: &str = "package com.example;

import org.springframework.boot.autoconfigure.SpringBootApplication;

@SpringBootApplication
public class MainClass {
}
";

const HELLO_CONTROLLER: &str = "package com.example.web;

import org.springframework.web.bind.annotation.GetMapping;
import org.springframework.web.bind.annotation.RestController;

@RestController
public class HelloController {

\t@GetMapping(\"/hello\")
\tpublic String hello() {
\t\treturn \"hello\";
\t}
}
";

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        temp.child("demo/src/main/java/com/example/MainClass.java")
            .write_str(MAIN_CLASS)
            .unwrap();
        temp.child("demo/src/main/java/com/example/web/HelloController.java")
            .write_str(HELLO_CONTROLLER)
            .unwrap();
        Self { temp }
    }

    fn root(&self) -> std::path::PathBuf {
        self.temp.child("demo").path().to_path_buf()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("boot-index"));
        cmd.env("BOOT_INDEX_CACHE_DIR", self.temp.child("cache").path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).output().unwrap();
        assert!(output.status.success(), "{output:?}");
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

#[test]
fn index_reuses_the_cache_on_the_second_run() {
    let ws = Workspace::new();
    let root = ws.root();
    let root = root.to_str().unwrap();

    let first = ws.json(&["index", root, "--json"]);
    assert_eq!(first["project"], "demo");
    assert_eq!(first["files"], 2);
    assert_eq!(first["symbols"], 3);
    assert_eq!(first["from_cache"], false);

    let second = ws.json(&["index", root, "--json"]);
    assert_eq!(second["from_cache"], true);
    assert_eq!(second["symbols"], 3);
}

#[test]
fn index_prints_a_human_summary() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("index")
        .arg(ws.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("indexed: demo"))
        .stdout(predicate::str::contains("symbols: 3"));
}

#[test]
fn symbols_searches_case_insensitively() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["symbols", "HELLO", "--path"])
        .arg(ws.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("@/hello -- GET\t"))
        .stdout(predicate::str::contains("HelloController.java:9:2"))
        .stdout(predicate::str::contains("mainClass").not());
}

#[test]
fn symbols_json_lists_locations() {
    let ws = Workspace::new();
    let root = ws.root();
    let symbols = ws.json(&["symbols", "", "--json", "--path", root.to_str().unwrap()]);
    let symbols = symbols.as_array().unwrap();
    assert_eq!(symbols.len(), 3);
    assert!(symbols
        .iter()
        .all(|symbol| symbol["location"]["uri"].as_str().unwrap().starts_with("file://")));
}

#[test]
fn beans_lists_the_beans_of_a_file() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("beans")
        .arg(ws.root().join("src/main/java/com/example/web/HelloController.java"))
        .arg("--path")
        .arg(ws.root())
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "helloController: com.example.web.HelloController\n",
        ));
}

#[test]
fn cache_status_and_clean() {
    let ws = Workspace::new();
    ws.cmd().arg("index").arg(ws.root()).assert().success();

    let status = ws.json(&["cache", "status", "--json"]);
    let artifacts = status["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0]["key"]
        .as_str()
        .unwrap()
        .starts_with("demo-java-"));

    ws.cmd()
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1 artifacts"));
    let status = ws.json(&["cache", "status", "--json"]);
    assert!(status["artifacts"].as_array().unwrap().is_empty());
}

#[test]
fn unreadable_source_exits_with_one() {
    let ws = Workspace::new();
    ws.temp
        .child("demo/src/main/java/com/example/Broken.java")
        .write_str("package com.example;\n@GetMapping(\"/x\"\nclass Broken {}\n")
        .unwrap();

    ws.cmd()
        .arg("index")
        .arg(ws.root())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed:"))
        .stdout(predicate::str::contains("unterminated arguments of @GetMapping"));
}

#[test]
fn missing_project_root_is_an_error() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("index")
        .arg(ws.temp.child("nope").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to resolve project root"));
}

#[test]
fn invalid_config_is_reported() {
    let ws = Workspace::new();
    let config = ws.temp.child("boot-index.toml");
    config.write_str("[cache]\nbackend = \"floppy\"\n").unwrap();

    ws.cmd()
        .arg("--config")
        .arg(config.path())
        .arg("index")
        .arg(ws.root())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to parse toml config"));
}

#[test]
fn void_backend_has_no_cache_to_inspect() {
    let ws = Workspace::new();
    let config = ws.temp.child("boot-index.toml");
    config
        .write_str("[cache]\nbackend = \"void\"\n\n[logging]\nstderr = false\n")
        .unwrap();

    ws.cmd()
        .arg("--config")
        .arg(config.path())
        .args(["cache", "status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("keeps nothing on disk"));
}
