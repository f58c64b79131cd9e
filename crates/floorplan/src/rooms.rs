//! Room-type to class-id table.
//!
//! The on-disk table has one `label: id` entry per line. A label may be a
//! comma-joined alias list (`Bedroom,Bedroom Closet: 6`); aliases are
//! flattened into a single lookup map when the table is loaded, so
//! rasterization never re-splits keys.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{io_err, FloorplanError, Result};

/// One line of the table, as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomTableEntry {
    /// Label field verbatim, possibly a comma-joined alias list.
    pub label: String,
    pub class_id: u8,
}

impl RoomTableEntry {
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.label.split(',')
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoomTable {
    entries: Vec<RoomTableEntry>,
    lookup: HashMap<String, u8>,
}

impl RoomTable {
    /// Build a table from entries in file order.
    ///
    /// A repeated label field keeps the position of its first line and the
    /// id of its last. Fields are then flattened in that order, so when an
    /// alias appears under more than one field the later field wins.
    pub fn from_entries(entries: Vec<RoomTableEntry>) -> Self {
        let mut fields: Vec<(&RoomTableEntry, u8)> = Vec::with_capacity(entries.len());
        for entry in &entries {
            match fields.iter_mut().find(|field| field.0.label == entry.label) {
                Some(field) => field.1 = entry.class_id,
                None => fields.push((entry, entry.class_id)),
            }
        }

        let mut lookup = HashMap::new();
        for (entry, class_id) in fields {
            for alias in entry.aliases() {
                lookup.insert(alias.to_owned(), class_id);
            }
        }

        Self { entries, lookup }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let err = |reason: String| FloorplanError::RoomTable {
                line: index + 1,
                reason,
            };

            // Split on the last colon so a label containing ':' still round-trips.
            let (label, id) = line
                .rsplit_once(':')
                .ok_or_else(|| err(format!("expected `label: id`, got {line:?}")))?;

            let id: i64 = id
                .trim()
                .parse()
                .map_err(|_| err(format!("class id {:?} is not an integer", id.trim())))?;

            let class_id = u8::try_from(id)
                .ok()
                .filter(|&c| c > 0)
                .ok_or_else(|| err(format!("class id {id} outside 1..=255")))?;

            entries.push(RoomTableEntry {
                label: label.to_owned(),
                class_id,
            });
        }

        Ok(Self::from_entries(entries))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(io_err(path))?;
        Self::parse(&text)
    }

    /// Exact, case-sensitive lookup of a room type.
    #[inline]
    pub fn class_of(&self, room_type: &str) -> Option<u8> {
        self.lookup.get(room_type).copied()
    }

    /// Label field of the last entry mapping to `class_id`.
    pub fn label_of(&self, class_id: u8) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.class_id == class_id)
            .map(|e| e.label.as_str())
    }

    pub fn entries(&self) -> &[RoomTableEntry] {
        &self.entries
    }

    pub fn max_class(&self) -> u8 {
        self.entries.iter().map(|e| e.class_id).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the table in the on-disk `label: id` format.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}\n", e.label, e.class_id))
            .collect()
    }
}
