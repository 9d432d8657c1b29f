use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use renderer::{EffectLoader, EffectProgram, EffectSource, LoadedEffect};
use tracing::debug;

/// Prefix for shaders compiled into the binary.
pub const BUILTIN_PREFIX: &str = "builtin:";

const BUILTIN_SHADERS: &[(&str, &str)] = &[
    ("plasma", include_str!("../shaders/plasma.sksl")),
    ("rings", include_str!("../shaders/rings.sksl")),
];

const ENTRY_POINTS: &[&str] = &["mainImage(", "main("];

/// Stand-in for the compositor's shader compiler: reads the source and
/// checks it declares an entry point.
pub struct SourceLoader {
    root: PathBuf,
}

impl SourceLoader {
    /// Relative shader paths resolve against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a configured shader path onto a source, expanding `builtin:` names.
    pub fn source_for(&self, shader: &Path) -> EffectSource {
        let raw = shader.to_string_lossy();
        if let Some(name) = raw.strip_prefix(BUILTIN_PREFIX) {
            return match BUILTIN_SHADERS.iter().find(|(id, _)| *id == name) {
                Some((_, code)) => EffectSource::Inline {
                    name: name.to_string(),
                    code: (*code).to_string(),
                },
                None => EffectSource::File(shader.to_path_buf()),
            };
        }
        if shader.is_absolute() {
            EffectSource::File(shader.to_path_buf())
        } else {
            EffectSource::File(self.root.join(shader))
        }
    }

    fn compile(&self, source: &EffectSource) -> Result<TextProgram> {
        let (name, code) = match source {
            EffectSource::File(path) => {
                if path.to_string_lossy().starts_with(BUILTIN_PREFIX) {
                    bail!("unknown built-in shader '{}'", path.display());
                }
                let code = fs::read_to_string(path)
                    .with_context(|| format!("failed to read shader {}", path.display()))?;
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| source.label());
                (name, code)
            }
            EffectSource::Inline { name, code } => (name.clone(), code.clone()),
        };

        let entry_point = ENTRY_POINTS
            .iter()
            .find(|entry| code.contains(**entry))
            .map(|entry| entry.trim_end_matches('(').to_string())
            .with_context(|| format!("{name}: no `main` or `mainImage` entry point"))?;

        Ok(TextProgram {
            name,
            entry_point,
            source_len: code.len(),
            released: false,
        })
    }
}

impl EffectLoader for SourceLoader {
    fn load(&self, source: &EffectSource) -> LoadedEffect {
        match self.compile(source) {
            Ok(program) => {
                debug!(
                    program = %program.name,
                    entry = %program.entry_point,
                    bytes = program.source_len,
                    "compiled effect"
                );
                LoadedEffect::compiled(Box::new(program))
            }
            Err(err) => LoadedEffect::failed(format!("{err:#}")),
        }
    }
}

#[derive(Debug)]
pub struct TextProgram {
    name: String,
    entry_point: String,
    source_len: usize,
    released: bool,
}

impl EffectProgram for TextProgram {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!(program = %self.name, "released effect program");
        }
    }
}
