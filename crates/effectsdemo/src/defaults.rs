/// Scene used by `effectsdemo run` when no `--config` is given: one plasma
/// effect letterboxed into a widescreen control, then squeezed into a square.
pub const DEFAULT_CONFIG: &str = r#"
version = 1

[defaults]
stretch = "uniform"
stretch_direction = "both"
refresh_rate = 60

[effects.plasma]
shader = "builtin:plasma"
shader_width = 512
shader_height = 512
bounds = "800x450"

[[effects.plasma.resizes]]
at = "2s"
bounds = "300x300"
"#;
