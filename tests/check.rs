//! `semgate check` end to end, against stand-in rustc and cargo scripts.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

const RUSTC: &str = "#!/bin/sh\necho 'rustc 1.80.0 (051478957 2024-07-21)'\n";

const CARGO: &str = r#"#!/bin/sh
if [ "$2" = "--version" ]; then
    echo "cargo-semver-checks 0.36.0"
    exit 0
fi
mkdir -p "$CARGO_TARGET_DIR/semver-checks/cache/local"
echo '{"crate":"demo"}' > "$CARGO_TARGET_DIR/semver-checks/cache/local/demo.json"
echo "     Checking demo v0.1.0 -> v0.1.1 (minor change)"
echo "--- failure function_missing: pub fn removed ---" >&2
exit 1
"#;

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn failed_check_publishes_output_and_saves_cache() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    write_script(&bin, "rustc", RUSTC);
    write_script(&bin, "cargo", CARGO);
    write_script(&bin, "cargo-semver-checks", "#!/bin/sh\nexit 0\n");

    let workspace = dir.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(workspace.join("Cargo.lock"), "version = 3\n").unwrap();

    let mut path = vec![bin];
    path.extend(std::env::split_paths(&std::env::var_os("PATH").unwrap_or_default()));
    let github_output = dir.path().join("github-output");
    let store = dir.path().join("store");

    let output = Command::new(env!("CARGO_BIN_EXE_semgate"))
        .current_dir(&workspace)
        .env("PATH", std::env::join_paths(path).unwrap())
        .env("CARGO_TARGET_DIR", dir.path().join("target"))
        .env("GITHUB_OUTPUT", &github_output)
        .env_remove("GITHUB_ACTIONS")
        .env_remove("GITHUB_PATH")
        .env_remove("GITHUB_JOB")
        .env_remove("RUSTUP_TOOLCHAIN")
        .env_remove("SEMGATE_CACHE_STORE")
        .env_remove("RUST_LOG")
        .args(["check", "--rust-toolchain", "manual", "--cache-store"])
        .arg(&store)
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success(), "check should fail: {stderr}");
    assert!(stderr.contains("cargo semver-checks failed with exit code 1"), "{stderr}");

    let published = std::fs::read_to_string(&github_output).unwrap();
    assert!(published.starts_with("cargo-semver-checks-output<<"), "{published}");
    assert!(published.contains("Checking demo v0.1.0 -> v0.1.1"));
    assert!(published.contains("--- failure function_missing: pub fn removed ---"));

    let entries: Vec<_> = std::fs::read_dir(&store)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1, "{entries:?}");
    let key = std::fs::read_to_string(entries[0].join("key")).unwrap();
    assert!(key.contains("cargo-semver-checks-0.36.0"), "{key}");
    assert!(entries[0].join("data").join("local").join("demo.json").is_file());
}
