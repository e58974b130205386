//! Bytecode file loader.

use std::path::Path;

use engine_core::{OpcodeRevision, Program};

use crate::loaders::{LoadResult, read_bytes};

/// Reads an RSBC container and validates it under an opcode revision.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Returns the raw bytes alongside the validated program.
    ///
    /// The engine decodes the bytes itself; the program is returned so tools
    /// can inspect it without booting an engine.
    pub fn load(path: &Path, revision: OpcodeRevision) -> LoadResult<(Vec<u8>, Program)> {
        let bytes = read_bytes(path)?;
        let program = Program::load(&bytes, revision).map_err(|e| {
            anyhow::anyhow!("Invalid bytecode in {} ({} revision): {}", path.display(), revision, e)
        })?;
        tracing::debug!(
            path = %path.display(),
            functions = program.functions().len(),
            "bytecode loaded"
        );
        Ok((bytes, program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Opcode;
    use engine_core::script::Assembler;

    #[test]
    fn loads_and_rejects_by_revision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.rsbc");
        let mut asm = Assembler::new();
        asm.begin_function("main").push_int(3).op(Opcode::Pop).op(Opcode::End);
        std::fs::write(&path, asm.build(OpcodeRevision::Current).unwrap()).unwrap();

        let (bytes, program) = ProgramLoader::load(&path, OpcodeRevision::Current).unwrap();
        assert_eq!(&bytes[..4], b"RSBC");
        assert!(program.function_by_name("main").is_some());

        let missing = ProgramLoader::load(&dir.path().join("nope.rsbc"), OpcodeRevision::Current);
        assert!(missing.unwrap_err().to_string().contains("Failed to read file"));
    }
}
