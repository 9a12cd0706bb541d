use std::fmt;

use log::warn;

use crate::pool::{Handle, Pool};

/// Size of one encoded node: a 32-bit value followed by the offset
/// of the next node.
const NODE_SIZE: usize = 12;

/// Link value stored by a node that has no successor.
const NO_NODE: u64 = u64::MAX;

/// A singly-linked list of integers whose nodes live inside a pool.
///
/// Every node is a pool block holding the value and the offset of
/// the next node; the list itself only keeps the head handle and
/// does no memory bookkeeping of its own. When the pool cannot
/// supply a node, the insertion is dropped and the list is left as
/// it was.
pub struct LinkedList {
    pool: Pool,
    head: Option<Handle>,
}

impl LinkedList {
    /// An empty list backed by a fresh pool of `bytes` bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            pool: Pool::new(bytes),
            head: None,
        }
    }

    /// The pool the nodes live in.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Inserts a value at the front of the list. Returns the node,
    /// or `None` when no node could be allocated.
    pub fn push_front(&mut self, value: i32) -> Option<Handle> {
        let node = self.new_node(value, self.head)?;
        self.head = Some(node);
        Some(node)
    }

    /// Inserts a value right after an existing node. An unknown node
    /// leaves the list untouched.
    pub fn insert_after(&mut self, node: Handle, value: i32) -> Option<Handle> {
        if !self.contains(node) {
            return None;
        }

        let (_, next) = self.read_node(node);
        let new = self.new_node(value, next)?;
        self.set_next(node, Some(new));
        Some(new)
    }

    /// Inserts a value right before an existing node. Inserting
    /// before the head is the same as inserting at the front.
    pub fn insert_before(&mut self, target: Handle, value: i32) -> Option<Handle> {
        let head = self.head?;
        if target == head {
            return self.push_front(value);
        }

        // Find the node whose successor is the target.
        let mut walker = head;
        loop {
            match self.read_node(walker).1 {
                Some(next) if next == target => break,
                Some(next) => walker = next,
                None => return None,
            }
        }

        let new = self.new_node(value, Some(target))?;
        self.set_next(walker, Some(new));
        Some(new)
    }

    /// Unlinks and releases the first node carrying `value`. Returns
    /// whether a node was removed.
    pub fn remove(&mut self, value: i32) -> bool {
        let Some(head) = self.head else {
            return false;
        };

        let (head_value, head_next) = self.read_node(head);
        if head_value == value {
            self.head = head_next;
            self.pool.release(head);
            return true;
        }

        let mut walker = head;
        loop {
            let Some(next) = self.read_node(walker).1 else {
                return false;
            };
            let (next_value, after) = self.read_node(next);
            if next_value == value {
                self.set_next(walker, after);
                self.pool.release(next);
                return true;
            }
            walker = next;
        }
    }

    /// The first node carrying `value`, if any.
    pub fn find(&self, value: i32) -> Option<Handle> {
        let mut cursor = self.head;
        while let Some(node) = cursor {
            let (found, next) = self.read_node(node);
            if found == value {
                return Some(node);
            }
            cursor = next;
        }
        None
    }

    /// The value carried by a node of this list.
    pub fn value(&self, node: Handle) -> Option<i32> {
        self.contains(node).then(|| self.read_node(node).0)
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head;
        while let Some(node) = cursor {
            count += 1;
            cursor = self.read_node(node).1;
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Formats the sub-range from `from` through `to`, both
    /// inclusive, as `[a, b, c]`. A missing `from` starts at the
    /// head, a missing `to` runs to the end of the list.
    pub fn display_range(&self, from: Option<Handle>, to: Option<Handle>) -> String {
        // The walk stops at the successor of `to`, so an unbounded
        // range and a range ending on the last node read the same.
        let stop = match to {
            Some(node) if self.contains(node) => self.read_node(node).1,
            _ => None,
        };
        let mut cursor = match from {
            Some(node) if self.contains(node) => Some(node),
            _ => self.head,
        };

        let mut values = Vec::new();
        while let Some(node) = cursor {
            if stop == Some(node) {
                break;
            }
            let (value, next) = self.read_node(node);
            values.push(value.to_string());
            cursor = next;
        }

        format!("[{}]", values.join(", "))
    }

    /// Releases every node. The list can be used again afterwards.
    pub fn clear(&mut self) {
        let mut cursor = self.head.take();
        while let Some(node) = cursor {
            cursor = self.read_node(node).1;
            self.pool.release(node);
        }
    }

    fn new_node(&mut self, value: i32, next: Option<Handle>) -> Option<Handle> {
        let node = match self.pool.allocate(NODE_SIZE) {
            Ok(node) => node,
            Err(error) => {
                warn!("Node for value {value} not inserted: {error}");
                return None;
            }
        };

        let link = next.map_or(NO_NODE, |next| next.offset() as u64);
        let data = self.pool.data_mut(node).unwrap();
        data[..4].copy_from_slice(&value.to_le_bytes());
        data[4..NODE_SIZE].copy_from_slice(&link.to_le_bytes());
        Some(node)
    }

    fn read_node(&self, node: Handle) -> (i32, Option<Handle>) {
        let data = self.pool.data(node).unwrap();
        let value = i32::from_le_bytes(data[..4].try_into().unwrap());
        let link = u64::from_le_bytes(data[4..NODE_SIZE].try_into().unwrap());
        (value, (link != NO_NODE).then(|| Handle(link as usize)))
    }

    fn set_next(&mut self, node: Handle, next: Option<Handle>) {
        let link = next.map_or(NO_NODE, |next| next.offset() as u64);
        let data = self.pool.data_mut(node).unwrap();
        data[4..NODE_SIZE].copy_from_slice(&link.to_le_bytes());
    }

    fn contains(&self, node: Handle) -> bool {
        let mut cursor = self.head;
        while let Some(current) = cursor {
            if current == node {
                return true;
            }
            cursor = self.read_node(current).1;
        }
        false
    }
}

impl fmt::Display for LinkedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_range(None, None))
    }
}
