//! Source-dialect to target-script compilation used by the staging pipeline

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{SuiteError, SuiteResult};

/// Compiles one script source file and returns the compiled text
pub trait ScriptCompiler: Send + Sync {
    fn compile(&self, source: &Path) -> SuiteResult<String>;
}

/// Shells out to an external compiler that prints the result to stdout
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    /// `argv` is the program followed by its fixed arguments
    pub fn new(argv: &[String]) -> SuiteResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SuiteError::Config("pipeline.compiler must not be empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ScriptCompiler for CommandCompiler {
    fn compile(&self, source: &Path) -> SuiteResult<String> {
        debug!("Compiling {} with {}", source.display(), self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SuiteError::Compiler(format!("failed to spawn {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(SuiteError::Compiler(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| SuiteError::Compiler(format!("compiler emitted invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_argv_rejected() {
        assert!(matches!(CommandCompiler::new(&[]), Err(SuiteError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_compiled_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("a_test.coffee");
        std::fs::write(&source, "ok 1 is 1\n").unwrap();

        let compiler = CommandCompiler::new(&["cat".to_string()]).unwrap();
        assert_eq!(compiler.compile(&source).unwrap(), "ok 1 is 1\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_error() {
        let compiler = CommandCompiler::new(&["false".to_string()]).unwrap();
        let err = compiler.compile(Path::new("missing.coffee")).unwrap_err();
        assert!(matches!(err, SuiteError::Compiler(_)));
    }
}
