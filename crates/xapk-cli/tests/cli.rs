//! Integration tests for the xapk CLI binary.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const BASE: &[u8] = b"PK\x03\x04 pretend base apk";
const SPLIT_EN: &[u8] = b"PK\x03\x04 pretend english split";
const SPLIT_HDPI: &[u8] = b"PK\x03\x04 pretend xxhdpi split";

fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Test context with input files, a manifest and an output directory
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let ctx = Self { temp_dir };

        std::fs::create_dir_all(ctx.input_dir()).unwrap();
        std::fs::create_dir_all(ctx.out_dir()).unwrap();
        std::fs::write(ctx.input("base.apk"), BASE).unwrap();
        std::fs::write(ctx.input("split_en.apk"), SPLIT_EN).unwrap();
        std::fs::write(ctx.input("split_hdpi.apk"), SPLIT_HDPI).unwrap();
        std::fs::write(ctx.input("stranger.apk"), b"not from this bundle").unwrap();

        let manifest = serde_json::json!({
            "package_id": "com.example.app",
            "version_code": 7,
            "base_digest": md5_hex(BASE),
            "split_entries": [
                {
                    "source_url": "https://cdn.example/apk/com.example.app-7-config.en-v1.apk",
                    "digest": md5_hex(SPLIT_EN),
                    "byte_size": SPLIT_EN.len()
                },
                {
                    "source_url": "https://cdn.example/apk/com.example.app-7-config.xxhdpi-v1.apk",
                    "digest": md5_hex(SPLIT_HDPI),
                    "byte_size": SPLIT_HDPI.len()
                }
            ]
        });
        std::fs::write(ctx.manifest(), manifest.to_string()).unwrap();
        ctx
    }

    fn input_dir(&self) -> PathBuf {
        self.temp_dir.path().join("in")
    }

    fn input(&self, name: &str) -> PathBuf {
        self.input_dir().join(name)
    }

    fn out_dir(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    fn manifest(&self) -> PathBuf {
        self.temp_dir.path().join("manifest.json")
    }

    fn xapk_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_xapk");
        let mut cmd = Command::new(bin_path);
        cmd.env_remove("XAPK_OUTPUT_DIR");
        cmd.env_remove("XAPK_MAX_SIZE");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn assemble(&self, base: &str, splits: &[&str], extra: &[&str]) -> Output {
        let mut cmd = self.xapk_cmd();
        cmd.arg("assemble")
            .arg("--manifest")
            .arg(self.manifest())
            .arg("--base")
            .arg(self.input(base))
            .arg("--output-dir")
            .arg(self.out_dir())
            .args(extra);
        for split in splits {
            cmd.arg(self.input(split));
        }
        cmd.output().expect("failed to run xapk")
    }

    fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.out_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).unwrap();
            (file.name().to_string(), bytes)
        })
        .collect()
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.xapk_cmd().arg("--help").output().expect("failed to run xapk");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("assemble"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.xapk_cmd().arg("--version").output().expect("failed to run xapk");
    assert!(output.status.success());
}

#[test]
fn test_hash_prints_md5() {
    let ctx = TestContext::new();
    let output = ctx
        .xapk_cmd()
        .arg("hash")
        .arg(ctx.input("base.apk"))
        .output()
        .expect("failed to run xapk");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&md5_hex(BASE)));
}

#[test]
fn test_inspect_lists_canonical_names() {
    let ctx = TestContext::new();
    let output = ctx
        .xapk_cmd()
        .arg("inspect")
        .arg("--manifest")
        .arg(ctx.manifest())
        .output()
        .expect("failed to run xapk");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("com.example.app-7.xapk"));
    assert!(stdout.contains("com.example.app.apk"));
    assert!(stdout.contains("config.en.apk"));
    assert!(stdout.contains("config.xxhdpi.apk"));
}

#[test]
fn test_assemble_writes_container() {
    let ctx = TestContext::new();
    let output = ctx.assemble("base.apk", &["split_en.apk", "split_hdpi.apk"], &[]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(ctx.output_files(), ["com.example.app-7.xapk"]);

    let entries = read_entries(&ctx.out_dir().join("com.example.app-7.xapk"));
    assert_eq!(
        entries,
        vec![
            ("com.example.app.apk".to_string(), BASE.to_vec()),
            ("config.en.apk".to_string(), SPLIT_EN.to_vec()),
            ("config.xxhdpi.apk".to_string(), SPLIT_HDPI.to_vec()),
        ]
    );
}

#[test]
fn test_assemble_then_verify() {
    let ctx = TestContext::new();
    let output = ctx.assemble("base.apk", &["split_hdpi.apk", "split_en.apk"], &["--quiet"]);
    assert!(output.status.success());

    let output = ctx
        .xapk_cmd()
        .arg("verify")
        .arg(ctx.out_dir().join("com.example.app-7.xapk"))
        .arg("--manifest")
        .arg(ctx.manifest())
        .output()
        .expect("failed to run xapk");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_wrong_base_fails_without_output() {
    let ctx = TestContext::new();
    let output = ctx.assemble("split_en.apk", &["split_hdpi.apk"], &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is not the base APK"), "stderr: {stderr}");
    assert!(ctx.output_files().is_empty());
}

#[test]
fn test_unknown_split_fails_without_output() {
    let ctx = TestContext::new();
    let output = ctx.assemble("base.apk", &["split_en.apk", "stranger.apk"], &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("stranger.apk"), "stderr: {stderr}");
    assert!(ctx.output_files().is_empty());
}

#[test]
fn test_missing_splits_fails() {
    let ctx = TestContext::new();
    let output = ctx.assemble("base.apk", &[], &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("split APK files"), "stderr: {stderr}");
    assert!(ctx.output_files().is_empty());
}

#[test]
fn test_dry_run_writes_nothing() {
    let ctx = TestContext::new();
    let output = ctx.assemble("base.apk", &["split_en.apk"], &["--dry-run"]);
    assert!(output.status.success());
    assert!(ctx.output_files().is_empty());
}

#[test]
fn test_max_size_from_env() {
    let ctx = TestContext::new();
    let mut cmd = ctx.xapk_cmd();
    cmd.env("XAPK_MAX_SIZE", "4")
        .arg("assemble")
        .arg("--manifest")
        .arg(ctx.manifest())
        .arg("--base")
        .arg(ctx.input("base.apk"))
        .arg("--output-dir")
        .arg(ctx.out_dir())
        .arg(ctx.input("split_en.apk"));
    let output = cmd.output().expect("failed to run xapk");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not read base.apk"), "stderr: {stderr}");
}

#[test]
fn test_verify_rejects_foreign_container() {
    let ctx = TestContext::new();
    let path = ctx.out_dir().join("foreign.xapk");
    {
        let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        writer
            .start_file("config.en.apk", zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut writer, b"something else").unwrap();
        writer.finish().unwrap();
    }

    let output = ctx
        .xapk_cmd()
        .arg("verify")
        .arg(&path)
        .arg("--manifest")
        .arg(ctx.manifest())
        .output()
        .expect("failed to run xapk");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("problem(s) found"), "stderr: {stderr}");
}
