use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("project");
    fs::create_dir_all(&work).unwrap();
    (dir, work)
}

fn tabspace(cwd: &Path, args: &[&str]) -> std::process::Output {
    Command::cargo_bin("tabspace")
        .unwrap()
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn converts_matching_files_recursively() {
    let (_dir, work) = project();
    fs::write(work.join("main.c"), "int main() {\r\n  return 0;   \r\n}\r\n").unwrap();
    fs::create_dir(work.join("src")).unwrap();
    fs::write(work.join("src/util.c"), "void f() {\n    g();\n}\n").unwrap();
    fs::write(work.join("notes.txt"), "  untouched  \n").unwrap();

    let out = tabspace(&work, &["-y", "*.c"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success(), "{stdout}");
    assert!(stdout.contains("main.c : tab-space conversion successful"), "{stdout}");
    assert_eq!(
        fs::read(work.join("main.c")).unwrap(),
        b"int main() {\n\treturn 0;\n}\n"
    );
    assert_eq!(
        fs::read(work.join("main.c.bak")).unwrap(),
        b"int main() {\r\n  return 0;   \r\n}\r\n"
    );
    assert_eq!(fs::read(work.join("src/util.c")).unwrap(), b"void f() {\n\tg();\n}\n");
    assert!(work.join("src/util.c.bak").exists());
    assert_eq!(fs::read(work.join("notes.txt")).unwrap(), b"  untouched  \n");
    assert!(!work.join("main.c.tsc").exists());
}

#[test]
fn spaces_flag_selects_aligned_rule() {
    let (_dir, work) = project();
    fs::write(work.join("lib.rs"), "fn f() {\n\tg();\n  h();\n}\n").unwrap();

    let out = tabspace(&work, &["-s", "-y", "*.rs"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success());
    assert!(stdout.contains("aligned all-space conversion successful"), "{stdout}");
    assert_eq!(
        fs::read(work.join("lib.rs")).unwrap(),
        b"fn f() {\n    g();\n    h();\n}\n"
    );
}

#[test]
fn compliant_files_are_reported_and_not_backed_up() {
    let (_dir, work) = project();
    fs::write(work.join("ok.h"), "\tint x;\n").unwrap();

    let out = tabspace(&work, &["-y", "*.h"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success());
    assert!(stdout.contains("ok.h : already tab-space compliant so left unchanged"), "{stdout}");
    assert!(!work.join("ok.h.bak").exists());
}

#[test]
fn backup_files_matching_the_pattern_are_skipped() {
    let (_dir, work) = project();
    fs::write(work.join("old.bak"), "  messy  \n").unwrap();

    let out = tabspace(&work, &["-y", "*bak"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success());
    assert!(stdout.contains("not processed as its extension is .bak"), "{stdout}");
    assert_eq!(fs::read(work.join("old.bak")).unwrap(), b"  messy  \n");
}

#[test]
fn dangerous_patterns_abort_the_run() {
    let (_dir, work) = project();
    fs::write(work.join("a.c"), "  x\n").unwrap();

    for pattern in ["*", "*.*", "sub/*.c"] {
        let out = tabspace(&work, &["-y", "*.c", pattern]);
        assert_eq!(out.status.code(), Some(2), "{pattern}");
    }
    assert_eq!(fs::read(work.join("a.c")).unwrap(), b"  x\n");
    assert!(!work.join("a.c.bak").exists());
}

#[test]
fn malformed_and_negated_globs_abort_the_run() {
    let (_dir, work) = project();
    fs::write(work.join("a.c"), "  x\n").unwrap();

    for pattern in ["[", "!a.c"] {
        let out = tabspace(&work, &["-y", pattern]);
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert_eq!(out.status.code(), Some(2), "{pattern}: {stderr}");
        assert!(!stderr.contains("Error finding files"), "{stderr}");
    }
    assert_eq!(fs::read(work.join("a.c")).unwrap(), b"  x\n");
    assert!(!work.join("a.c.bak").exists());
}

#[test]
fn runs_without_prompt_when_not_attached_to_a_terminal() {
    let (_dir, work) = project();
    fs::write(work.join("a.c"), "  x   \n").unwrap();

    let out = tabspace(&work, &["*.c"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("a.c : tab-space conversion successful"), "{stdout}");
    assert_eq!(fs::read(work.join("a.c")).unwrap(), b"\tx\n");
}

#[cfg(unix)]
#[test]
fn refuses_to_run_in_root_directory() {
    let out = tabspace(Path::new("/"), &["-y", "*.c"]);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert_eq!(out.status.code(), Some(4));
    assert!(stderr.contains("refuses to work in a root"), "{stderr}");
}

#[test]
fn per_file_failures_do_not_change_exit_status() {
    let (_dir, work) = project();
    fs::write(work.join("a.c"), "x   \n").unwrap();
    fs::write(work.join("a.c.tsc"), "someone else's data").unwrap();
    fs::write(work.join("b.c"), "y   \n").unwrap();

    let out = tabspace(&work, &["-y", "*.c"]);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert!(out.status.success());
    assert!(stderr.contains("a.c : conversion failed"), "{stderr}");
    assert_eq!(fs::read(work.join("a.c")).unwrap(), b"x   \n");
    assert_eq!(fs::read(work.join("a.c.tsc")).unwrap(), b"someone else's data");
    assert_eq!(fs::read(work.join("b.c")).unwrap(), b"y\n");
}

#[test]
fn no_matches_is_not_an_error() {
    let (_dir, work) = project();

    let out = tabspace(&work, &["-y", "*.c"]);

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("No files found"));
}

#[test]
fn prints_shell_completions() {
    let out = Command::cargo_bin("tabspace")
        .unwrap()
        .args(["completion", "bash"])
        .output()
        .unwrap();

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("tabspace"));
}
