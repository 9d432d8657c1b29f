use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn effectsdemo() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_effectsdemo"));
    command.env_remove("EFFECTSDEMO_CONFIG").env("RUST_LOG", "warn");
    command
}

#[test]
fn plan_prints_json_fit() {
    let output = effectsdemo()
        .args(["plan", "--viewport", "800x450", "--source", "512x512", "--json"])
        .output()
        .expect("failed to run effectsdemo plan");
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["renderable"], true);
    assert_eq!(plan["stretch"], "uniform");
    let dest = &plan["fit"]["dest"];
    assert!((dest["x"].as_f64().unwrap() - 175.0).abs() < 1e-9);
    assert!((dest["width"].as_f64().unwrap() - 450.0).abs() < 1e-9);
}

#[test]
fn plan_reports_unrenderable_geometry() {
    let output = effectsdemo()
        .args(["plan", "--viewport", "0x450", "--source", "512x512"])
        .output()
        .expect("failed to run effectsdemo plan");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not renderable"), "{stdout}");
}

#[test]
fn plan_rejects_unknown_stretch() {
    let status = effectsdemo()
        .args([
            "plan",
            "--viewport",
            "800x450",
            "--source",
            "512x512",
            "--stretch",
            "squash",
        ])
        .status()
        .expect("failed to run effectsdemo plan");
    assert!(!status.success());
}

#[test]
fn run_writes_report_for_config() {
    let root = TempDir::new().unwrap();
    let shaders = root.path().join("shaders");
    fs::create_dir_all(&shaders).unwrap();
    fs::write(
        shaders.join("wave.sksl"),
        "half4 main(float2 p) { return half4(sin(p.x), 0, 0, 1); }",
    )
    .unwrap();
    let config = root.path().join("effects.toml");
    fs::write(
        &config,
        r#"
version = 1

[defaults]
refresh_rate = 30

[effects.wave]
shader = "shaders/wave.sksl"
shader_width = 256
shader_height = 256
stretch = "none"
bounds = "128x128"

[[effects.wave.lifecycle]]
at = "500ms"
action = "detach"
"#,
    )
    .unwrap();
    let report_path = root.path().join("report.json");

    let status = effectsdemo()
        .env("EFFECTSDEMO_CONFIG", &config)
        .args(["run", "--duration", "1s", "--report"])
        .arg(&report_path)
        .status()
        .expect("failed to run effectsdemo run");
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["ticks"], 31);
    let wave = &report["effects"][0];
    assert_eq!(wave["name"], "wave");
    assert_eq!(wave["program"], "wave");
    assert_eq!(wave["frames_painted"], 15);
    assert_eq!(wave["detached"], true);
    assert_eq!(wave["last_fit"]["clipped"], true);
}

#[test]
fn run_uses_built_in_scene_without_config() {
    let status = effectsdemo()
        .args(["run", "--duration", "250ms", "--refresh-rate", "120"])
        .status()
        .expect("failed to run effectsdemo run");
    assert!(status.success());
}

#[test]
fn run_fails_for_missing_config() {
    let root = TempDir::new().unwrap();
    let output = effectsdemo()
        .args(["run", "--config"])
        .arg(root.path().join("missing.toml"))
        .output()
        .expect("failed to run effectsdemo run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load effects config"), "{stderr}");
}

#[test]
fn sample_config_compiles_every_effect() {
    let root = TempDir::new().unwrap();
    let report_path = root.path().join("report.json");
    let status = effectsdemo()
        .args(["run", "--duration", "5s", "--config"])
        .arg(concat!(env!("CARGO_MANIFEST_DIR"), "/config/effects.toml"))
        .arg("--report")
        .arg(&report_path)
        .status()
        .expect("failed to run effectsdemo run");
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let effects = report["effects"].as_array().unwrap();
    assert_eq!(effects.len(), 2);
    for effect in effects {
        assert!(effect["error_text"].is_null(), "{effect}");
        assert!(effect["frames_painted"].as_u64().unwrap() > 0);
        assert_eq!(effect["detached"], true);
    }
}

#[test]
fn run_with_still_clock_reports_pinned_time() {
    let root = TempDir::new().unwrap();
    let report_path = root.path().join("report.json");
    let status = effectsdemo()
        .args(["run", "--duration", "250ms", "--clock", "still:2.5", "--report"])
        .arg(&report_path)
        .status()
        .expect("failed to run effectsdemo run");
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let plasma = &report["effects"][0];
    assert!(plasma["frames_painted"].as_u64().unwrap() > 0);
    assert_eq!(plasma["last_time"].as_f64(), Some(2.5));
}

#[test]
fn run_rejects_out_of_range_arguments() {
    for args in [
        ["run", "--refresh-rate", "1e30"],
        ["run", "--duration", "1e20"],
        ["run", "--clock", "sundial"],
    ] {
        let output = effectsdemo()
            .args(args)
            .output()
            .expect("failed to run effectsdemo run");
        assert!(!output.status.success(), "{args:?}");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!stderr.contains("panicked"), "{args:?}: {stderr}");
    }
}
