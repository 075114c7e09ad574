use crate::error::RuntimeError;
use crate::loader::ScriptImage;
use crate::specs::CODE_SEGMENT_BASE;

/// A script resident in the code segment. Function addresses are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedScript {
    pub name: String,
    pub base: u32,
    pub size: u32,
    /// (name, address), sorted by address
    pub functions: Vec<(String, u32)>,
}

impl LoadedScript {
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    pub fn end(&self) -> u32 {
        self.base + self.size
    }

    /// The function whose entry is the closest one at or before `addr`.
    pub fn function_at(&self, addr: u32) -> Option<&str> {
        if !self.contains(addr) {
            return None;
        }
        let idx = self.functions.partition_point(|(_, start)| *start <= addr);
        idx.checked_sub(1).map(|i| self.functions[i].0.as_str())
    }

    pub fn function_address(&self, name: &str) -> Option<u32> {
        self.functions
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, addr)| *addr)
    }
}

/// All loaded bytecode, laid out back to back from `CODE_SEGMENT_BASE`.
#[derive(Debug, Default)]
pub(crate) struct CodeSegment {
    bytes: Vec<u8>,
    scripts: Vec<LoadedScript>,
}

impl CodeSegment {
    pub(crate) fn load(&mut self, image: &ScriptImage) -> LoadedScript {
        let base = CODE_SEGMENT_BASE + self.bytes.len() as u32;
        let mut functions: Vec<(String, u32)> = image
            .functions
            .iter()
            .map(|f| (f.name.clone(), base + f.offset))
            .collect();
        functions.sort_by_key(|(_, addr)| *addr);

        self.bytes.extend_from_slice(&image.code);
        let script = LoadedScript {
            name: image.name.clone(),
            base,
            size: image.code.len() as u32,
            functions,
        };
        self.scripts.push(script.clone());
        script
    }

    pub(crate) fn clear(&mut self) {
        self.bytes.clear();
        self.scripts.clear();
    }

    pub(crate) fn scripts(&self) -> &[LoadedScript] {
        &self.scripts
    }

    pub(crate) fn script_at(&self, addr: u32) -> Option<&LoadedScript> {
        self.scripts.iter().find(|s| s.contains(addr))
    }

    /// Bytes from `addr` to the end of the owning script.
    pub(crate) fn slice_from(&self, addr: u32) -> Result<&[u8], RuntimeError> {
        let script = self.script_at(addr).ok_or(RuntimeError::BadAddress(addr))?;
        let start = (addr - CODE_SEGMENT_BASE) as usize;
        let end = (script.end() - CODE_SEGMENT_BASE) as usize;
        Ok(&self.bytes[start..end])
    }

    pub(crate) fn read_u8(&self, addr: u32) -> Option<u8> {
        let idx = addr.checked_sub(CODE_SEGMENT_BASE)? as usize;
        self.bytes.get(idx).copied()
    }

    pub(crate) fn read_u16(&self, addr: u32) -> Option<u16> {
        let lo = self.read_u8(addr)?;
        let hi = self.read_u8(addr.checked_add(1)?)?;
        Some(u16::from_le_bytes([lo, hi]))
    }
}
