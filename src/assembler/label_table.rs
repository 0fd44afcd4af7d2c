//! The label-resolution table: declared labels map to an instruction
//! index; uses are recorded as (instruction-index, byte-offset-to-patch)
//! pairs against a temporary label-table use index, resolved to a signed
//! pc-relative displacement once the whole source has been seen (§3/§4.4).

use std::collections::HashMap;

use super::error::AssembleError;

#[derive(Debug, Clone, Copy)]
pub struct PendingUse {
    /// Instruction index the `LBL` operand appears in.
    pub use_instruction_index: usize,
    /// Byte offset within the image where the u32 placeholder lives.
    pub patch_offset: usize,
}

#[derive(Default)]
pub struct LabelTable {
    declared: HashMap<String, usize>,
    /// One entry per recorded use, indexed by the temporary "use index"
    /// that gets emitted into the image as a placeholder `LBL` word.
    uses: Vec<(String, PendingUse)>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a label declaration at `instruction_index`. Fatal if the
    /// label was already declared.
    pub fn declare(&mut self, line: usize, name: &str, instruction_index: usize) -> Result<(), AssembleError> {
        if self.declared.contains_key(name) {
            return Err(AssembleError::LabelRedeclared {
                line,
                name: name.to_string(),
            });
        }
        self.declared.insert(name.to_string(), instruction_index);
        Ok(())
    }

    /// Record a use of `name` at `patch_offset` within instruction
    /// `use_instruction_index`. Returns the temporary use index to emit as
    /// the placeholder `LBL` operand word.
    pub fn record_use(&mut self, name: &str, use_instruction_index: usize, patch_offset: usize) -> u32 {
        let index = self.uses.len();
        self.uses.push((
            name.to_string(),
            PendingUse {
                use_instruction_index,
                patch_offset,
            },
        ));
        index as u32
    }

    /// Resolve every recorded use against the declared labels, returning
    /// `(patch_offset, displacement)` pairs. Fatal if any use's label was
    /// never declared.
    pub fn finalize(&self) -> Result<Vec<(usize, i32)>, AssembleError> {
        let mut patches = Vec::with_capacity(self.uses.len());
        for (name, pending) in &self.uses {
            let Some(&target) = self.declared.get(name) else {
                return Err(AssembleError::UnresolvedLabel { name: name.clone() });
            };
            let displacement = target as i64 - pending.use_instruction_index as i64;
            patches.push((pending.patch_offset, displacement as i32));
        }
        Ok(patches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_and_resolves() {
        let mut table = LabelTable::new();
        let use_idx = table.record_use("end", 0, 4);
        table.declare(3, "end", 2).unwrap();
        let patches = table.finalize().unwrap();
        assert_eq!(patches, vec![(4, 2 - 0)]);
        let _ = use_idx;
    }

    #[test]
    fn redeclaration_is_fatal() {
        let mut table = LabelTable::new();
        table.declare(1, "x", 0).unwrap();
        assert!(table.declare(2, "x", 1).is_err());
    }

    #[test]
    fn unresolved_use_is_fatal() {
        let mut table = LabelTable::new();
        table.record_use("missing", 0, 0);
        assert!(table.finalize().is_err());
    }
}
