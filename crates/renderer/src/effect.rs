use std::fmt;
use std::path::PathBuf;

/// A shader program compiled by an external collaborator.
///
/// The handler only holds the program and hands it to the paint callback; it
/// never compiles, executes, or retries anything. `release` is invoked exactly
/// once, either on Dispose or when a newer program replaces this one.
pub trait EffectProgram: Send {
    fn name(&self) -> &str;
    fn release(&mut self);
}

/// Where an effect's shader text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectSource {
    File(PathBuf),
    Inline { name: String, code: String },
}

impl EffectSource {
    pub fn label(&self) -> String {
        match self {
            EffectSource::File(path) => path.display().to_string(),
            EffectSource::Inline { name, .. } => format!("inline:{name}"),
        }
    }
}

impl fmt::Display for EffectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Outcome of asking a loader for a program. Compilation failures are data:
/// `program` is `None` and `error_text` explains why.
#[derive(Default)]
pub struct LoadedEffect {
    pub program: Option<Box<dyn EffectProgram>>,
    pub error_text: Option<String>,
}

impl LoadedEffect {
    pub fn compiled(program: Box<dyn EffectProgram>) -> Self {
        Self {
            program: Some(program),
            error_text: None,
        }
    }

    pub fn failed(error_text: impl Into<String>) -> Self {
        Self {
            program: None,
            error_text: Some(error_text.into()),
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }
}

impl fmt::Debug for LoadedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedEffect")
            .field("program", &self.program.as_ref().map(|p| p.name().to_string()))
            .field("error_text", &self.error_text)
            .finish()
    }
}

/// Compiles effect sources into programs (asset loader + shader compiler).
pub trait EffectLoader {
    fn load(&self, source: &EffectSource) -> LoadedEffect;
}
