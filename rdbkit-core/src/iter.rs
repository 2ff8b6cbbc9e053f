//! Lazy iteration over collection values.
//!
//! Each iterator walks whichever representation its value holds, so
//! callers never branch on [`Encoding`](crate::Encoding). Items borrow from
//! the value and fail with `CorruptedPayload` on a structural fault.
//!
//! Iterators are fused: once exhausted, after returning an error, or after
//! [`release`](ListIter::release), `next` only returns `None`. Dropping an
//! iterator releases it as well.

use crate::compact::{IntsetIter, ListpackIter, Ziplist, ZiplistIter, ZipmapIter};
use crate::value::{HashValue, ListValue, QuicklistNode, SetValue, ZSetValue};
use rdbkit_codec::{RawRef, RawValue, RdbError, Result};
use std::iter::FusedIterator;
use std::slice;

/// Iterator over a [`ListValue`].
pub struct ListIter<'a> {
    state: ListState<'a>,
}

enum ListState<'a> {
    Linked(slice::Iter<'a, RawValue>),
    Ziplist(ZiplistIter<'a>),
    Quicklist {
        nodes: slice::Iter<'a, Ziplist>,
        current: Option<ZiplistIter<'a>>,
    },
    Quicklist2 {
        nodes: slice::Iter<'a, QuicklistNode>,
        current: Option<ListpackIter<'a>>,
    },
    Released,
}

impl<'a> ListIter<'a> {
    pub(crate) fn new(list: &'a ListValue) -> Self {
        let state = match list {
            ListValue::Linked(items) => ListState::Linked(items.iter()),
            ListValue::Ziplist(zl) => ListState::Ziplist(zl.iter()),
            ListValue::Quicklist(nodes) => ListState::Quicklist {
                nodes: nodes.iter(),
                current: None,
            },
            ListValue::Quicklist2(nodes) => ListState::Quicklist2 {
                nodes: nodes.iter(),
                current: None,
            },
        };
        Self { state }
    }

    /// Drops any walk state; `next` returns `None` from now on.
    pub fn release(&mut self) {
        self.state = ListState::Released;
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Result<RawRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.state {
            ListState::Linked(items) => items.next().map(|v| Ok(v.as_raw())),
            ListState::Ziplist(entries) => entries.next(),
            ListState::Quicklist { nodes, current } => loop {
                if let Some(item) = current.as_mut().and_then(Iterator::next) {
                    break Some(item);
                }
                match nodes.next() {
                    Some(node) => *current = Some(node.iter()),
                    None => break None,
                }
            },
            ListState::Quicklist2 { nodes, current } => loop {
                if let Some(item) = current.as_mut().and_then(Iterator::next) {
                    break Some(item);
                }
                match nodes.next() {
                    Some(QuicklistNode::Plain(v)) => {
                        *current = None;
                        break Some(Ok(v.as_raw()));
                    }
                    Some(QuicklistNode::Packed(lp)) => *current = Some(lp.iter()),
                    None => break None,
                }
            },
            ListState::Released => None,
        };
        if !matches!(item, Some(Ok(_))) {
            self.release();
        }
        item
    }
}

impl FusedIterator for ListIter<'_> {}

/// Iterator over a [`HashValue`], yielding field/value pairs.
pub struct HashIter<'a> {
    state: HashState<'a>,
}

enum HashState<'a> {
    Table(slice::Iter<'a, (RawValue, RawValue)>),
    Zipmap(ZipmapIter<'a>),
    Ziplist(ZiplistIter<'a>),
    Listpack(ListpackIter<'a>),
    Released,
}

impl<'a> HashIter<'a> {
    pub(crate) fn new(hash: &'a HashValue) -> Self {
        let state = match hash {
            HashValue::Table(pairs) => HashState::Table(pairs.iter()),
            HashValue::Zipmap(zm) => HashState::Zipmap(zm.iter()),
            HashValue::Ziplist(zl) => HashState::Ziplist(zl.iter()),
            HashValue::Listpack(lp) => HashState::Listpack(lp.iter()),
        };
        Self { state }
    }

    /// Drops any walk state; `next` returns `None` from now on.
    pub fn release(&mut self) {
        self.state = HashState::Released;
    }
}

impl<'a> Iterator for HashIter<'a> {
    type Item = Result<(RawRef<'a>, RawRef<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.state {
            HashState::Table(pairs) => pairs.next().map(|(f, v)| Ok((f.as_raw(), v.as_raw()))),
            HashState::Zipmap(pairs) => pairs.next(),
            HashState::Ziplist(entries) => next_pair(entries),
            HashState::Listpack(entries) => next_pair(entries),
            HashState::Released => None,
        };
        if !matches!(item, Some(Ok(_))) {
            self.release();
        }
        item
    }
}

impl FusedIterator for HashIter<'_> {}

/// Iterator over a [`SetValue`].
pub struct SetIter<'a> {
    state: SetState<'a>,
}

enum SetState<'a> {
    Table(slice::Iter<'a, RawValue>),
    Intset(IntsetIter<'a>),
    Listpack(ListpackIter<'a>),
    Released,
}

impl<'a> SetIter<'a> {
    pub(crate) fn new(set: &'a SetValue) -> Self {
        let state = match set {
            SetValue::Table(members) => SetState::Table(members.iter()),
            SetValue::Intset(is) => SetState::Intset(is.iter()),
            SetValue::Listpack(lp) => SetState::Listpack(lp.iter()),
        };
        Self { state }
    }

    /// Drops any walk state; `next` returns `None` from now on.
    pub fn release(&mut self) {
        self.state = SetState::Released;
    }
}

impl<'a> Iterator for SetIter<'a> {
    type Item = Result<RawRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.state {
            SetState::Table(members) => members.next().map(|m| Ok(m.as_raw())),
            SetState::Intset(values) => values.next().map(|v| Ok(RawRef::Int(v))),
            SetState::Listpack(entries) => entries.next(),
            SetState::Released => None,
        };
        if !matches!(item, Some(Ok(_))) {
            self.release();
        }
        item
    }
}

impl FusedIterator for SetIter<'_> {}

/// Iterator over a [`ZSetValue`], yielding member/score pairs.
pub struct ZSetIter<'a> {
    state: ZSetState<'a>,
}

enum ZSetState<'a> {
    Skiplist(slice::Iter<'a, (RawValue, f64)>),
    Ziplist(ZiplistIter<'a>),
    Listpack(ListpackIter<'a>),
    Released,
}

impl<'a> ZSetIter<'a> {
    pub(crate) fn new(zset: &'a ZSetValue) -> Self {
        let state = match zset {
            ZSetValue::Skiplist { entries, .. } => ZSetState::Skiplist(entries.iter()),
            ZSetValue::Ziplist(zl) => ZSetState::Ziplist(zl.iter()),
            ZSetValue::Listpack(lp) => ZSetState::Listpack(lp.iter()),
        };
        Self { state }
    }

    /// Drops any walk state; `next` returns `None` from now on.
    pub fn release(&mut self) {
        self.state = ZSetState::Released;
    }
}

impl<'a> Iterator for ZSetIter<'a> {
    type Item = Result<(RawRef<'a>, f64)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.state {
            ZSetState::Skiplist(entries) => entries.next().map(|(m, s)| Ok((m.as_raw(), *s))),
            ZSetState::Ziplist(entries) => next_pair(entries).map(scored),
            ZSetState::Listpack(entries) => next_pair(entries).map(scored),
            ZSetState::Released => None,
        };
        if !matches!(item, Some(Ok(_))) {
            self.release();
        }
        item
    }
}

impl FusedIterator for ZSetIter<'_> {}

/// Pulls two consecutive packed entries.
fn next_pair<'a, I>(entries: &mut I) -> Option<Result<(RawRef<'a>, RawRef<'a>)>>
where
    I: Iterator<Item = Result<RawRef<'a>>>,
{
    let first = match entries.next()? {
        Ok(first) => first,
        Err(e) => return Some(Err(e)),
    };
    Some(match entries.next() {
        Some(Ok(second)) => Ok((first, second)),
        Some(Err(e)) => Err(e),
        None => Err(RdbError::corrupted(
            0,
            format!("packed entry '{first}' has no partner"),
        )),
    })
}

fn scored<'a>(pair: Result<(RawRef<'a>, RawRef<'a>)>) -> Result<(RawRef<'a>, f64)> {
    let (member, score) = pair?;
    match score.to_f64() {
        Some(s) if !s.is_nan() => Ok((member, s)),
        _ => Err(RdbError::corrupted(
            0,
            format!("invalid score '{score}' for member '{member}'"),
        )),
    }
}
