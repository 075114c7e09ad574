//! Debug Map Store and Source Position Resolver.
//!
//! Each loaded script carries an optional debug map: a `u32` record count
//! followed by `{offset: u32, line: u16, column: u16}` little-endian records,
//! offsets relative to the script's base address. The store keeps one
//! [`ScriptUnit`] per attached map and turns raw code addresses back into
//! source positions on the error path.

use std::fmt;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::DevMapError;

const HEADER_LEN: usize = 4;
const RECORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevMapEntry {
    pub offset: u32,
    pub line: u16,
    pub column: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub line: u16,
    pub column: u16,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// Decode a raw debug-map blob. Bytes past the last record are ignored.
pub fn parse_devmap(blob: &[u8]) -> Result<Vec<DevMapEntry>, DevMapError> {
    if blob.len() < HEADER_LEN {
        return Err(DevMapError::Truncated {
            expected: HEADER_LEN,
            actual: blob.len(),
        });
    }

    let mut cursor = Cursor::new(blob);
    let count = cursor.read_u32::<LittleEndian>()? as usize;
    let expected = count
        .checked_mul(RECORD_LEN)
        .and_then(|n| n.checked_add(HEADER_LEN))
        .unwrap_or(usize::MAX);
    if blob.len() < expected {
        return Err(DevMapError::Truncated {
            expected,
            actual: blob.len(),
        });
    }

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(DevMapEntry {
            offset: cursor.read_u32::<LittleEndian>()?,
            line: cursor.read_u16::<LittleEndian>()?,
            column: cursor.read_u16::<LittleEndian>()?,
        });
    }
    Ok(entries)
}

/// One loaded script as the resolver sees it. Immutable once attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptUnit {
    pub name: String,
    pub base_address: u32,
    pub size: u32,
    /// Sorted by offset; entries sharing an offset keep their blob order.
    entries: Vec<DevMapEntry>,
}

impl ScriptUnit {
    pub fn new(name: &str, base_address: u32, size: u32, mut entries: Vec<DevMapEntry>) -> Self {
        entries.sort_by_key(|e| e.offset);
        Self {
            name: name.to_string(),
            base_address,
            size,
            entries,
        }
    }

    fn end(&self) -> u64 {
        u64::from(self.base_address) + u64::from(self.size)
    }

    pub fn contains(&self, address: u32) -> bool {
        address >= self.base_address && u64::from(address) < self.end()
    }

    fn overlaps(&self, base: u32, size: u32) -> bool {
        let end = u64::from(base) + u64::from(size);
        size > 0 && self.size > 0 && u64::from(base) < self.end() && u64::from(self.base_address) < end
    }

    pub fn entries(&self) -> &[DevMapEntry] {
        &self.entries
    }

    /// Closest preceding entry for an offset relative to the base.
    ///
    /// The last marker emitted at or before `offset` wins; among entries at
    /// the same offset, the one that came last in the blob.
    pub fn position_at(&self, offset: u32) -> Option<SourcePosition> {
        let idx = self.entries.partition_point(|e| e.offset <= offset);
        let entry = self.entries.get(idx.checked_sub(1)?)?;
        Some(SourcePosition {
            line: entry.line,
            column: entry.column,
        })
    }
}

/// Stable reference to an attached unit. Handles from before a `clear` go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle {
    epoch: u32,
    index: u32,
}

#[derive(Debug, Default)]
pub struct DebugMapStore {
    units: Vec<ScriptUnit>,
    epoch: u32,
}

impl DebugMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `blob` and attach it as a new unit.
    pub fn attach(
        &mut self,
        name: &str,
        base_address: u32,
        size: u32,
        blob: &[u8],
    ) -> Result<UnitHandle, DevMapError> {
        let entries = parse_devmap(blob)?;
        self.attach_entries(name, base_address, size, entries)
    }

    /// Attach already decoded entries. Unit ranges must not overlap.
    pub fn attach_entries(
        &mut self,
        name: &str,
        base_address: u32,
        size: u32,
        entries: Vec<DevMapEntry>,
    ) -> Result<UnitHandle, DevMapError> {
        if let Some(existing) = self.units.iter().find(|u| u.overlaps(base_address, size)) {
            return Err(DevMapError::Overlap {
                name: name.to_string(),
                base: base_address,
                end: base_address.saturating_add(size),
                existing: existing.name.clone(),
            });
        }

        let unit = ScriptUnit::new(name, base_address, size, entries);
        tracing::debug!(
            script = name,
            base = base_address,
            size,
            entries = unit.entries.len(),
            "debug map attached"
        );
        let handle = UnitHandle {
            epoch: self.epoch,
            index: self.units.len() as u32,
        };
        self.units.push(unit);
        Ok(handle)
    }

    /// Forget every unit, e.g. when the VM unloads its scripts.
    pub fn clear(&mut self) {
        tracing::debug!(units = self.units.len(), "debug maps cleared");
        self.units.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit(&self, handle: UnitHandle) -> Option<&ScriptUnit> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.units.get(handle.index as usize)
    }

    pub fn units(&self) -> &[ScriptUnit] {
        &self.units
    }

    /// The unit whose range contains `address`.
    pub fn unit_for(&self, address: u32) -> Option<UnitHandle> {
        self.units
            .iter()
            .position(|u| u.contains(address))
            .map(|index| UnitHandle {
                epoch: self.epoch,
                index: index as u32,
            })
    }

    /// Source position of a raw code address, if any unit maps it.
    pub fn resolve(&self, address: u32) -> Option<SourcePosition> {
        let unit = self.units.iter().find(|u| u.contains(address))?;
        unit.position_at(address - unit.base_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: u32 = 0x10000;

    fn blob(records: &[(u32, u16, u16)]) -> Vec<u8> {
        vm::builder::encode_devmap(records)
    }

    fn store_with_lines() -> DebugMapStore {
        let mut store = DebugMapStore::new();
        store
            .attach("maps/a", BASE, 40, &blob(&[(0, 1, 1), (10, 2, 4), (25, 3, 8)]))
            .unwrap();
        store
    }

    #[test]
    fn resolves_to_the_closest_preceding_entry() {
        let store = store_with_lines();
        assert_eq!(store.resolve(BASE + 15).map(|p| p.line), Some(2));
        assert_eq!(store.resolve(BASE + 5).map(|p| p.line), Some(1));
        assert_eq!(store.resolve(BASE + 10), Some(SourcePosition { line: 2, column: 4 }));
        assert_eq!(store.resolve(BASE + 39).map(|p| p.line), Some(3));
    }

    #[test]
    fn addresses_outside_every_unit_do_not_resolve() {
        let store = store_with_lines();
        assert_eq!(store.resolve(BASE - 1), None);
        assert_eq!(store.resolve(BASE + 40), None);
        assert_eq!(store.unit_for(BASE - 1), None);
    }

    #[test]
    fn position_before_the_first_entry_does_not_resolve() {
        let mut store = DebugMapStore::new();
        store.attach("late", BASE, 16, &blob(&[(8, 7, 1)])).unwrap();
        assert_eq!(store.resolve(BASE + 4), None);
        assert_eq!(store.resolve(BASE + 8).map(|p| p.line), Some(7));
    }

    #[test]
    fn unordered_blob_is_sorted_and_ties_keep_the_last_record() {
        let mut store = DebugMapStore::new();
        store
            .attach("t", BASE, 32, &blob(&[(20, 9, 0), (4, 2, 0), (4, 3, 0)]))
            .unwrap();
        assert_eq!(store.resolve(BASE + 6).map(|p| p.line), Some(3));
        assert_eq!(store.resolve(BASE + 21).map(|p| p.line), Some(9));
    }

    #[test]
    fn truncated_blobs_are_rejected() {
        let err = parse_devmap(&[1, 0]).unwrap_err();
        assert!(matches!(err, DevMapError::Truncated { expected: 4, actual: 2 }));

        let mut bytes = blob(&[(0, 1, 1), (4, 2, 1)]);
        bytes.truncate(bytes.len() - 1);
        let err = parse_devmap(&bytes).unwrap_err();
        assert!(matches!(err, DevMapError::Truncated { expected: 20, actual: 19 }));
    }

    #[test]
    fn overlapping_units_are_rejected() {
        let mut store = store_with_lines();
        let err = store.attach("maps/b", BASE + 39, 4, &blob(&[])).unwrap_err();
        assert!(matches!(err, DevMapError::Overlap { ref existing, .. } if existing == "maps/a"));

        let handle = store.attach("maps/b", BASE + 40, 4, &blob(&[])).unwrap();
        assert_eq!(store.unit_for(BASE + 41), Some(handle));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clear_invalidates_handles() {
        let mut store = DebugMapStore::new();
        let handle = store.attach("a", BASE, 8, &blob(&[(0, 1, 1)])).unwrap();
        assert_eq!(store.unit(handle).map(|u| u.name.as_str()), Some("a"));

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.unit(handle), None);
        assert_eq!(store.resolve(BASE), None);
    }
}
