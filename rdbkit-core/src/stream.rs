//! Streams.
//!
//! Entries live in listpack nodes keyed by a master ID. Inside a node,
//! IDs are stored as deltas from the master and field names may be shared
//! with the master entry:
//!
//! ```text
//! master entry:  count | deleted | nfields | field_1 .. field_n | 0
//! entry:         flags | ms-diff | seq-diff | nfields | field value .. | lp-count
//! SAMEFIELDS:    flags | ms-diff | seq-diff | value_1 .. value_n       | lp-count
//! ```
//!
//! Around the nodes, the object carries the stream's metadata and its
//! consumer groups, whose exact layout depends on the [`StreamFormat`].

use crate::compact::{Listpack, ListpackIter};
use bytes::Bytes;
use rdbkit_codec::{RawRef, RawValue, RdbError, Result, Rio, RioWriter, TypeCode};
use std::collections::HashSet;
use std::fmt;
use std::io::{Read, Write};
use std::iter::FusedIterator;
use std::slice;
use tracing::trace;

const FLAG_DELETED: i64 = 1;
const FLAG_SAMEFIELDS: i64 = 2;

/// Upper bound on capacity reserved from an untrusted count.
const MAX_PREALLOC: usize = 1024;

/// A stream entry ID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Parses the 16-byte big-endian form used for node keys and PELs.
    pub fn from_be_bytes(b: &[u8]) -> Option<Self> {
        let b: &[u8; 16] = b.try_into().ok()?;
        let (ms, seq) = b.split_at(8);
        Some(Self {
            ms: u64::from_be_bytes(ms.try_into().ok()?),
            seq: u64::from_be_bytes(seq.try_into().ok()?),
        })
    }

    pub fn to_be_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.ms.to_be_bytes());
        out[8..].copy_from_slice(&self.seq.to_be_bytes());
        out
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// On-wire layout generation of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamFormat {
    /// Metadata without first ID, tombstones or read counters.
    V1,
    /// Adds first ID, max deleted ID, entries added and group read counters.
    V2,
    /// Adds consumer active time.
    V3,
}

impl StreamFormat {
    pub fn type_code(self) -> TypeCode {
        match self {
            StreamFormat::V1 => TypeCode::StreamListpacks,
            StreamFormat::V2 => TypeCode::StreamListpacks2,
            StreamFormat::V3 => TypeCode::StreamListpacks3,
        }
    }

    pub fn from_type_code(code: TypeCode) -> Option<Self> {
        match code {
            TypeCode::StreamListpacks => Some(StreamFormat::V1),
            TypeCode::StreamListpacks2 => Some(StreamFormat::V2),
            TypeCode::StreamListpacks3 => Some(StreamFormat::V3),
            _ => None,
        }
    }
}

/// A listpack node and the ID its entries are relative to.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamNode {
    pub master: StreamId,
    pub listpack: Listpack,
}

impl StreamNode {
    /// Walks every entry of the node, deleted ones included.
    pub fn validate(&self) -> Result<()> {
        let mut walker = NodeWalker::new(self)?;
        while walker.next_raw()?.is_some() {}
        Ok(())
    }
}

/// A delivered but unacknowledged entry of a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: StreamId,
    /// Last delivery, in Unix milliseconds.
    pub delivery_time: i64,
    pub delivery_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub name: Bytes,
    pub seen_time: i64,
    pub active_time: i64,
    /// IDs owned by this consumer; each is in the group's PEL.
    pub pending: Vec<StreamId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroup {
    pub name: Bytes,
    pub last_id: StreamId,
    pub entries_read: u64,
    pub pending: Vec<PendingEntry>,
    pub consumers: Vec<Consumer>,
}

/// A decoded stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamValue {
    pub format: StreamFormat,
    pub nodes: Vec<StreamNode>,
    /// Number of live entries.
    pub length: u64,
    pub last_id: StreamId,
    pub first_id: StreamId,
    pub max_deleted_id: StreamId,
    pub entries_added: u64,
    pub groups: Vec<ConsumerGroup>,
}

impl StreamValue {
    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn iter(&self) -> StreamIter<'_> {
        StreamIter {
            nodes: self.nodes.iter(),
            current: None,
            released: false,
        }
    }

    /// Borrows every live entry, in ID order.
    pub fn entries(&self) -> Result<Vec<StreamEntry<'_>>> {
        self.iter().collect()
    }

    /// Copies every live entry out, in ID order.
    pub fn to_vec(&self) -> Result<Vec<(StreamId, Vec<(RawValue, RawValue)>)>> {
        self.iter()
            .map(|entry| entry.map(StreamEntry::into_owned))
            .collect()
    }
}

/// A live stream entry whose fields borrow from the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry<'a> {
    pub id: StreamId,
    pub fields: Vec<(RawRef<'a>, RawRef<'a>)>,
}

impl StreamEntry<'_> {
    pub fn into_owned(self) -> (StreamId, Vec<(RawValue, RawValue)>) {
        let fields = self
            .fields
            .into_iter()
            .map(|(f, v)| (f.into_owned(), v.into_owned()))
            .collect();
        (self.id, fields)
    }
}

/// Walks the entries of one node.
struct NodeWalker<'a> {
    entries: ListpackIter<'a>,
    master: StreamId,
    master_fields: Vec<RawRef<'a>>,
    remaining: u64,
}

impl<'a> NodeWalker<'a> {
    fn new(node: &'a StreamNode) -> Result<Self> {
        let mut entries = node.listpack.iter();
        let count = next_uint(&mut entries, "master entry count")?;
        let deleted = next_uint(&mut entries, "master deleted count")?;
        let nfields = next_uint(&mut entries, "master field count")?;
        let mut master_fields = Vec::with_capacity((nfields as usize).min(node.listpack.len()));
        for _ in 0..nfields {
            master_fields.push(next_entry(&mut entries, "master field")?);
        }
        let at = entries.offset();
        if next_int(&mut entries, "master entry terminator")? != 0 {
            return Err(RdbError::corrupted(at as u64, "master entry is not terminated"));
        }
        let remaining = count
            .checked_add(deleted)
            .ok_or_else(|| RdbError::corrupted(0, "stream node entry count overflows"))?;
        Ok(Self {
            entries,
            master: node.master,
            master_fields,
            remaining,
        })
    }

    /// Returns the next entry with its flags, deleted entries included.
    fn next_raw(&mut self) -> Result<Option<(i64, StreamEntry<'a>)>> {
        if self.remaining == 0 {
            let at = self.entries.offset();
            return match self.entries.next() {
                None => Ok(None),
                Some(Err(e)) => Err(e),
                Some(Ok(_)) => Err(RdbError::corrupted(
                    at as u64,
                    "stream node holds more entries than its master entry declares",
                )),
            };
        }
        self.remaining -= 1;

        let flags = next_int(&mut self.entries, "entry flags")?;
        let ms_diff = next_int(&mut self.entries, "entry ms-diff")?;
        let seq_diff = next_int(&mut self.entries, "entry seq-diff")?;
        let id = StreamId::new(
            self.master.ms.wrapping_add(ms_diff as u64),
            self.master.seq.wrapping_add(seq_diff as u64),
        );

        let (fields, expected_count) = if flags & FLAG_SAMEFIELDS != 0 {
            let mut fields = Vec::with_capacity(self.master_fields.len());
            for &field in &self.master_fields {
                fields.push((field, next_entry(&mut self.entries, "entry value")?));
            }
            (fields, self.master_fields.len() as u64 + 3)
        } else {
            let n = next_uint(&mut self.entries, "entry field count")?;
            let mut fields = Vec::with_capacity((n as usize).min(MAX_PREALLOC));
            for _ in 0..n {
                let field = next_entry(&mut self.entries, "entry field")?;
                let value = next_entry(&mut self.entries, "entry value")?;
                fields.push((field, value));
            }
            (fields, n.saturating_mul(2).saturating_add(4))
        };

        let at = self.entries.offset();
        let lp_count = next_uint(&mut self.entries, "entry lp-count")?;
        if lp_count != expected_count {
            return Err(RdbError::corrupted(
                at as u64,
                format!("entry {id} spans {expected_count} elements, lp-count says {lp_count}"),
            ));
        }
        Ok(Some((flags, StreamEntry { id, fields })))
    }
}

fn next_entry<'a>(entries: &mut ListpackIter<'a>, what: &str) -> Result<RawRef<'a>> {
    let at = entries.offset();
    entries.next().unwrap_or_else(|| {
        Err(RdbError::corrupted(
            at as u64,
            format!("stream node ends before {what}"),
        ))
    })
}

fn next_int(entries: &mut ListpackIter<'_>, what: &str) -> Result<i64> {
    let at = entries.offset();
    let raw = next_entry(entries, what)?;
    raw.to_i64()
        .ok_or_else(|| RdbError::corrupted(at as u64, format!("{what} '{raw}' is not an integer")))
}

fn next_uint(entries: &mut ListpackIter<'_>, what: &str) -> Result<u64> {
    let at = entries.offset();
    let v = next_int(entries, what)?;
    u64::try_from(v).map_err(|_| RdbError::corrupted(at as u64, format!("{what} {v} is negative")))
}

/// Iterator over the live entries of a [`StreamValue`].
///
/// Fused like the collection iterators: exhaustion, a fault or
/// [`release`](StreamIter::release) end it.
pub struct StreamIter<'a> {
    nodes: slice::Iter<'a, StreamNode>,
    current: Option<NodeWalker<'a>>,
    released: bool,
}

impl StreamIter<'_> {
    /// Drops the node walk state, including its field scratch buffer.
    pub fn release(&mut self) {
        self.current = None;
        self.released = true;
    }
}

impl<'a> Iterator for StreamIter<'a> {
    type Item = Result<StreamEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.released {
            if self.current.is_none() {
                let Some(node) = self.nodes.next() else {
                    break;
                };
                match NodeWalker::new(node) {
                    Ok(walker) => self.current = Some(walker),
                    Err(e) => {
                        self.release();
                        return Some(Err(e));
                    }
                }
            }
            let Some(walker) = self.current.as_mut() else {
                break;
            };
            match walker.next_raw() {
                Ok(Some((flags, entry))) => {
                    if flags & FLAG_DELETED == 0 {
                        return Some(Ok(entry));
                    }
                }
                Ok(None) => self.current = None,
                Err(e) => {
                    self.release();
                    return Some(Err(e));
                }
            }
        }
        self.release();
        None
    }
}

impl FusedIterator for StreamIter<'_> {}

fn load_id<R: Read>(rio: &mut Rio<R>) -> Result<StreamId> {
    Ok(StreamId::new(rio.load_len()?, rio.load_len()?))
}

fn load_raw_id<R: Read>(rio: &mut Rio<R>) -> Result<StreamId> {
    let ms = u64::from_be_bytes(rio.read_array()?);
    let seq = u64::from_be_bytes(rio.read_array()?);
    Ok(StreamId::new(ms, seq))
}

/// Reads a stream object body.
pub(crate) fn load_stream<R: Read>(rio: &mut Rio<R>, format: StreamFormat) -> Result<StreamValue> {
    let node_count = rio.load_usize()?;
    let mut nodes = Vec::with_capacity(node_count.min(MAX_PREALLOC));
    for _ in 0..node_count {
        let key_at = rio.tell();
        let key = rio.load_string_bytes()?;
        let master = StreamId::from_be_bytes(&key).ok_or_else(|| {
            RdbError::corrupted(
                key_at,
                format!("stream node key of {} bytes, expected 16", key.len()),
            )
        })?;
        let lp_at = rio.tell();
        let node = StreamNode {
            master,
            listpack: Listpack::new(rio.load_string_bytes()?).map_err(|e| e.rebase(lp_at))?,
        };
        node.validate().map_err(|e| e.rebase(lp_at))?;
        nodes.push(node);
    }

    let length = rio.load_len()?;
    let last_id = load_id(rio)?;
    let (first_id, max_deleted_id, entries_added) = if format >= StreamFormat::V2 {
        (load_id(rio)?, load_id(rio)?, rio.load_len()?)
    } else {
        (StreamId::default(), StreamId::default(), length)
    };

    let group_count = rio.load_usize()?;
    let mut groups = Vec::with_capacity(group_count.min(MAX_PREALLOC));
    for _ in 0..group_count {
        groups.push(load_group(rio, format)?);
    }

    trace!(nodes = nodes.len(), length, groups = groups.len(), "loaded stream");
    Ok(StreamValue {
        format,
        nodes,
        length,
        last_id,
        first_id,
        max_deleted_id,
        entries_added,
        groups,
    })
}

fn load_group<R: Read>(rio: &mut Rio<R>, format: StreamFormat) -> Result<ConsumerGroup> {
    let name = rio.load_string_bytes()?;
    let last_id = load_id(rio)?;
    let entries_read = if format >= StreamFormat::V2 {
        rio.load_len()?
    } else {
        0
    };

    let pel_count = rio.load_usize()?;
    let mut pending = Vec::with_capacity(pel_count.min(MAX_PREALLOC));
    let mut pel_ids = HashSet::with_capacity(pel_count.min(MAX_PREALLOC));
    for _ in 0..pel_count {
        let at = rio.tell();
        let id = load_raw_id(rio)?;
        if !pel_ids.insert(id) {
            return Err(RdbError::corrupted(at, format!("duplicate pending entry {id}")));
        }
        pending.push(PendingEntry {
            id,
            delivery_time: rio.load_time_millis()?,
            delivery_count: rio.load_len()?,
        });
    }

    let consumer_count = rio.load_usize()?;
    let mut consumers = Vec::with_capacity(consumer_count.min(MAX_PREALLOC));
    for _ in 0..consumer_count {
        let name = rio.load_string_bytes()?;
        let seen_time = rio.load_time_millis()?;
        let active_time = if format >= StreamFormat::V3 {
            rio.load_time_millis()?
        } else {
            seen_time
        };
        let owned = rio.load_usize()?;
        let mut ids = Vec::with_capacity(owned.min(MAX_PREALLOC));
        for _ in 0..owned {
            let at = rio.tell();
            let id = load_raw_id(rio)?;
            if !pel_ids.contains(&id) {
                return Err(RdbError::corrupted(
                    at,
                    format!("consumer owns {id}, which is not in the group PEL"),
                ));
            }
            ids.push(id);
        }
        consumers.push(Consumer {
            name,
            seen_time,
            active_time,
            pending: ids,
        });
    }

    Ok(ConsumerGroup {
        name,
        last_id,
        entries_read,
        pending,
        consumers,
    })
}

fn save_id<W: Write>(w: &mut RioWriter<W>, id: StreamId) -> Result<()> {
    w.save_length(id.ms)?;
    w.save_length(id.seq)?;
    Ok(())
}

/// Writes a stream object body in the layout of its format.
pub(crate) fn save_stream<W: Write>(w: &mut RioWriter<W>, stream: &StreamValue) -> Result<()> {
    w.save_length(stream.nodes.len() as u64)?;
    for node in &stream.nodes {
        w.save_raw_string(&node.master.to_be_bytes())?;
        w.save_raw_string(node.listpack.as_bytes())?;
    }
    w.save_length(stream.length)?;
    save_id(w, stream.last_id)?;
    if stream.format >= StreamFormat::V2 {
        save_id(w, stream.first_id)?;
        save_id(w, stream.max_deleted_id)?;
        w.save_length(stream.entries_added)?;
    }

    w.save_length(stream.groups.len() as u64)?;
    for group in &stream.groups {
        w.save_raw_string(&group.name)?;
        save_id(w, group.last_id)?;
        if stream.format >= StreamFormat::V2 {
            w.save_length(group.entries_read)?;
        }
        w.save_length(group.pending.len() as u64)?;
        for entry in &group.pending {
            w.write(&entry.id.to_be_bytes())?;
            w.save_time_millis(entry.delivery_time)?;
            w.save_length(entry.delivery_count)?;
        }
        w.save_length(group.consumers.len() as u64)?;
        for consumer in &group.consumers {
            w.save_raw_string(&consumer.name)?;
            w.save_time_millis(consumer.seen_time)?;
            if stream.format >= StreamFormat::V3 {
                w.save_time_millis(consumer.active_time)?;
            }
            w.save_length(consumer.pending.len() as u64)?;
            for id in &consumer.pending {
                w.write(&id.to_be_bytes())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a node holding `entries` relative to `master`, with the fields
    /// of the first entry as master fields. Entries are (ms-diff, deleted,
    /// fields).
    pub(crate) fn node(master: StreamId, entries: &[(i64, bool, Vec<(&str, &str)>)]) -> StreamNode {
        let master_fields: Vec<&str> = entries
            .first()
            .map(|(_, _, fields)| fields.iter().map(|(f, _)| *f).collect())
            .unwrap_or_default();
        let deleted = entries.iter().filter(|(_, d, _)| *d).count() as i64;
        let live = entries.len() as i64 - deleted;

        let mut lp: Vec<RawRef<'_>> = vec![
            RawRef::Int(live),
            RawRef::Int(deleted),
            RawRef::Int(master_fields.len() as i64),
        ];
        lp.extend(master_fields.iter().map(|f| RawRef::Bytes(f.as_bytes())));
        lp.push(RawRef::Int(0));

        for (ms_diff, is_deleted, fields) in entries {
            let same = fields.len() == master_fields.len()
                && fields.iter().zip(&master_fields).all(|((f, _), m)| f == m);
            let mut flags = 0;
            if *is_deleted {
                flags |= FLAG_DELETED;
            }
            if same {
                flags |= FLAG_SAMEFIELDS;
            }
            lp.push(RawRef::Int(flags));
            lp.push(RawRef::Int(*ms_diff));
            lp.push(RawRef::Int(0));
            if same {
                lp.extend(fields.iter().map(|(_, v)| RawRef::Bytes(v.as_bytes())));
                lp.push(RawRef::Int(fields.len() as i64 + 3));
            } else {
                lp.push(RawRef::Int(fields.len() as i64));
                for (f, v) in fields.iter() {
                    lp.push(RawRef::Bytes(f.as_bytes()));
                    lp.push(RawRef::Bytes(v.as_bytes()));
                }
                lp.push(RawRef::Int(fields.len() as i64 * 2 + 4));
            }
        }
        StreamNode {
            master,
            listpack: Listpack::from_entries(lp),
        }
    }

    pub(crate) fn sample_stream(format: StreamFormat) -> StreamValue {
        let master = StreamId::new(1000, 0);
        let node = node(
            master,
            &[
                (0, false, vec![("temp", "21"), ("unit", "c")]),
                (5, true, vec![("temp", "22"), ("unit", "c")]),
                (9, false, vec![("humidity", "40")]),
            ],
        );
        let pending_id = StreamId::new(1000, 0);
        StreamValue {
            format,
            nodes: vec![node],
            length: 2,
            last_id: StreamId::new(1009, 0),
            first_id: StreamId::new(1000, 0),
            max_deleted_id: StreamId::new(1005, 0),
            entries_added: 3,
            groups: vec![ConsumerGroup {
                name: Bytes::from_static(b"workers"),
                last_id: StreamId::new(1000, 0),
                entries_read: 1,
                pending: vec![PendingEntry {
                    id: pending_id,
                    delivery_time: 1_700_000_000_000,
                    delivery_count: 2,
                }],
                consumers: vec![Consumer {
                    name: Bytes::from_static(b"alice"),
                    seen_time: 1_700_000_000_500,
                    active_time: 1_700_000_000_500,
                    pending: vec![pending_id],
                }],
            }],
        }
    }

    #[test]
    fn test_stream_id() {
        let id = StreamId::new(1_526_919_030_474, 55);
        assert_eq!(StreamId::from_be_bytes(&id.to_be_bytes()), Some(id));
        assert_eq!(id.to_string(), "1526919030474-55");
        assert!(StreamId::new(1, 9) < StreamId::new(2, 0));
        assert_eq!(StreamId::from_be_bytes(b"short"), None);
    }

    #[test]
    fn test_raw_id_is_big_endian() {
        let id = StreamId::new(0x0102_0304_0506_0708, 9);
        let mut bytes = id.to_be_bytes().to_vec();
        bytes.push(0xAA);
        let mut rio = Rio::new(&bytes[..]);
        assert_eq!(load_raw_id(&mut rio).unwrap(), id);
        assert_eq!(rio.tell(), 16);

        let mut rio = Rio::new(&bytes[..12]);
        assert!(matches!(
            load_raw_id(&mut rio),
            Err(RdbError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_iteration_skips_deleted() {
        let stream = sample_stream(StreamFormat::V3);
        let entries = stream.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, StreamId::new(1000, 0));
        assert_eq!(
            entries[0].fields,
            vec![
                (RawRef::Bytes(b"temp"), RawRef::Int(21)),
                (RawRef::Bytes(b"unit"), RawRef::Bytes(b"c")),
            ]
        );
        assert_eq!(entries[1].id, StreamId::new(1009, 0));
        assert_eq!(entries[1].fields.len(), 1);
        assert_eq!(entries[1].fields[0].0, RawRef::Bytes(b"humidity"));
    }

    #[test]
    fn test_copying_view() {
        let stream = sample_stream(StreamFormat::V1);
        let owned = stream.to_vec().unwrap();
        assert_eq!(owned[1].1[0].1, RawValue::Int(40));
    }

    #[test]
    fn test_validate_rejects_bad_lp_count() {
        let good = node(StreamId::new(1, 1), &[(0, false, vec![("f", "v")])]);
        let mut entries: Vec<RawValue> = good
            .listpack
            .iter()
            .map(|e| e.unwrap().into_owned())
            .collect();
        let last = entries.len() - 1;
        entries[last] = RawValue::Int(99);
        let bad = StreamNode {
            master: good.master,
            listpack: Listpack::from_entries(entries.iter().map(RawValue::as_raw)),
        };
        assert!(good.validate().is_ok());
        assert!(matches!(
            bad.validate(),
            Err(RdbError::CorruptedPayload { .. })
        ));
        assert!(bad.iter_entries_fail());
    }

    impl StreamNode {
        fn iter_entries_fail(&self) -> bool {
            let stream = StreamValue {
                format: StreamFormat::V1,
                nodes: vec![self.clone()],
                length: 1,
                last_id: StreamId::default(),
                first_id: StreamId::default(),
                max_deleted_id: StreamId::default(),
                entries_added: 1,
                groups: vec![],
            };
            let mut it = stream.iter();
            let failed = matches!(it.next(), Some(Err(_)));
            failed && it.next().is_none()
        }
    }

    #[test]
    fn test_empty_node_rejected() {
        let node = StreamNode {
            master: StreamId::new(1, 0),
            listpack: Listpack::from_entries(Vec::new()),
        };
        assert!(node.validate().is_err());
    }

    #[test]
    fn test_stream_body_roundtrip_per_format() {
        for format in [StreamFormat::V1, StreamFormat::V2, StreamFormat::V3] {
            let stream = sample_stream(format);
            let mut w = RioWriter::new(Vec::new());
            save_stream(&mut w, &stream).unwrap();
            let bytes = w.into_inner();

            let mut rio = Rio::new(&bytes[..]);
            let back = load_stream(&mut rio, format).unwrap();
            assert_eq!(rio.tell() as usize, bytes.len());
            assert_eq!(back.nodes, stream.nodes);
            assert_eq!(back.to_vec().unwrap(), stream.to_vec().unwrap());
            assert_eq!(back.groups[0].consumers, stream.groups[0].consumers);
            match format {
                StreamFormat::V1 => {
                    assert_eq!(back.entries_added, back.length);
                    assert_eq!(back.first_id, StreamId::default());
                    assert_eq!(back.groups[0].entries_read, 0);
                }
                _ => assert_eq!(back, stream),
            }
        }
    }

    #[test]
    fn test_consumer_pel_must_be_in_group() {
        let mut stream = sample_stream(StreamFormat::V2);
        stream.groups[0].consumers[0].pending = vec![StreamId::new(9, 9)];
        let mut w = RioWriter::new(Vec::new());
        save_stream(&mut w, &stream).unwrap();
        let bytes = w.into_inner();
        let mut rio = Rio::new(&bytes[..]);
        assert!(matches!(
            load_stream(&mut rio, StreamFormat::V2),
            Err(RdbError::CorruptedPayload { .. })
        ));
    }
}
