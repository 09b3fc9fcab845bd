//! Walker for the `KSAV` group table at the start of the inflated body.

use std::borrow::Cow;
use std::collections::BTreeMap;

use memchr::memmem;

use crate::compressed::BODY_MARKER;
use crate::model::{KsavSummary, ObjectGroup};
use crate::reader::ByteCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KsavHeader {
    /// Offset of the marker inside the body.
    pub offset: usize,
    pub major: i32,
    pub minor: i32,
    pub group_count: i32,
}

impl KsavHeader {
    pub fn locate(body: &[u8]) -> Option<Self> {
        let offset = memmem::find(body, BODY_MARKER)?;
        let mut c = ByteCursor::new(body);
        c.seek_to(offset + BODY_MARKER.len()).ok()?;
        let major = c.read_i32().ok()?;
        let minor = c.read_i32().ok()?;
        let group_count = c.read_i32().ok()?;
        Some(Self {
            offset,
            major,
            minor,
            group_count,
        })
    }

    fn table_start(&self) -> usize {
        self.offset + BODY_MARKER.len() + 12
    }
}

/// One entry of the group table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry<'a> {
    pub name: Cow<'a, str>,
    pub instance_count: u32,
    /// Absolute offset of `data` inside the body.
    pub data_offset: usize,
    /// Group payload, clamped to the body when the declared length overruns.
    pub data: &'a [u8],
    /// Declared payload length, or 0 if it was negative.
    pub data_length: usize,
}

/// Iterates the group table, stopping quietly at the first malformed entry.
#[derive(Debug, Clone)]
pub struct GroupIter<'a> {
    cursor: ByteCursor<'a>,
    remaining: usize,
    done: bool,
}

impl<'a> GroupIter<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        let mut cursor = ByteCursor::new(body);
        let remaining = KsavHeader::locate(body)
            .filter(|header| cursor.seek_to(header.table_start()).is_ok())
            .map_or(0, |header| header.group_count.max(0) as usize);
        Self {
            cursor,
            remaining,
            done: false,
        }
    }

    fn read_entry(&mut self) -> Option<GroupEntry<'a>> {
        let c = &mut self.cursor;
        let name_len = c.read_len("group name length").ok()?;
        let name = String::from_utf8_lossy(c.read_bytes(name_len).ok()?);
        let instance_count = c.read_i32().ok()?;
        let declared = c.read_i32().ok()?;
        if instance_count < 0 {
            return None;
        }

        let data_offset = c.position();
        let data_length = declared.max(0) as usize;
        let data = if declared < 0 {
            self.done = true;
            &[][..]
        } else if data_length > c.remaining() {
            self.done = true;
            c.remaining_slice()
        } else {
            c.read_bytes(data_length).ok()?
        };

        Some(GroupEntry {
            name,
            instance_count: instance_count as u32,
            data_offset,
            data,
            data_length,
        })
    }
}

impl<'a> Iterator for GroupIter<'a> {
    type Item = GroupEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let entry = self.read_entry();
        if entry.is_none() {
            self.done = true;
        }
        entry
    }
}

pub fn groups(body: &[u8]) -> GroupIter<'_> {
    GroupIter::new(body)
}

/// `{group name -> instance count}`; a repeated name keeps the later count.
pub fn object_group_counts(body: &[u8]) -> BTreeMap<String, u64> {
    groups(body)
        .map(|g| (g.name.into_owned(), u64::from(g.instance_count)))
        .collect()
}

pub fn summarize(body: &[u8]) -> KsavSummary {
    groups(body).fold(KsavSummary::default(), |mut acc, g| {
        acc.group_count += 1;
        acc.total_instances += u64::from(g.instance_count);
        acc
    })
}

pub fn object_groups(body: &[u8]) -> Vec<ObjectGroup> {
    groups(body)
        .map(|g| ObjectGroup {
            name: g.name.into_owned(),
            instance_count: g.instance_count,
            data_length: g.data_length,
        })
        .collect()
}
