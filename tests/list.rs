//! Integration tests for the pool-backed linked list.

use sycorax::LinkedList;

#[test]
fn push_front_builds_in_reverse() {
    let mut list = LinkedList::with_capacity(256);
    for value in [3, 2, 1] {
        list.push_front(value).unwrap();
    }

    assert_eq!(list.len(), 3);
    assert_eq!(list.to_string(), "[1, 2, 3]");
}

#[test]
fn empty_list_displays_as_empty() {
    let list = LinkedList::with_capacity(64);
    assert!(list.is_empty());
    assert_eq!(list.to_string(), "[]");
}

#[test]
fn insertion_around_existing_nodes() {
    let mut list = LinkedList::with_capacity(256);
    for value in [4, 3, 2, 1] {
        list.push_front(value).unwrap();
    }

    let three = list.find(3).unwrap();
    list.insert_before(three, 9).unwrap();
    assert_eq!(list.to_string(), "[1, 2, 9, 3, 4]");

    let nine = list.find(9).unwrap();
    list.insert_after(nine, 10).unwrap();
    assert_eq!(list.to_string(), "[1, 2, 9, 10, 3, 4]");

    // Inserting before the head is a front insertion.
    let head = list.find(1).unwrap();
    list.insert_before(head, 0).unwrap();
    assert_eq!(list.to_string(), "[0, 1, 2, 9, 10, 3, 4]");
}

#[test]
fn removal_unlinks_and_frees_the_node() {
    let mut list = LinkedList::with_capacity(256);
    for value in [3, 2, 1] {
        list.push_front(value).unwrap();
    }
    let occupied = list.pool().capacity() - list.pool().free_bytes();

    assert!(list.remove(2));
    assert_eq!(list.to_string(), "[1, 3]");
    assert!(list.pool().capacity() - list.pool().free_bytes() < occupied);

    // Removing the head relinks the list to its successor.
    assert!(list.remove(1));
    assert_eq!(list.to_string(), "[3]");

    assert!(!list.remove(42));
    assert_eq!(list.len(), 1);
}

#[test]
fn search_and_value_lookup() {
    let mut list = LinkedList::with_capacity(256);
    for value in [30, 20, 10] {
        list.push_front(value).unwrap();
    }

    let twenty = list.find(20).unwrap();
    assert_eq!(list.value(twenty), Some(20));
    assert_eq!(list.find(99), None);

    // A handle of a removed node is no longer part of the list, so
    // lookups through it answer nothing instead of reading freed
    // bytes.
    list.remove(20);
    assert_eq!(list.value(twenty), None);
    assert_eq!(list.insert_after(twenty, 5), None);
    assert_eq!(list.to_string(), "[10, 30]");
}

#[test]
fn range_display_is_bounded_on_both_sides() {
    let mut list = LinkedList::with_capacity(256);
    for value in [4, 3, 2, 1] {
        list.push_front(value).unwrap();
    }

    let two = list.find(2).unwrap();
    let three = list.find(3).unwrap();

    assert_eq!(list.display_range(Some(two), Some(three)), "[2, 3]");
    assert_eq!(list.display_range(None, Some(two)), "[1, 2]");
    assert_eq!(list.display_range(Some(three), None), "[3, 4]");
    assert_eq!(list.display_range(None, None), "[1, 2, 3, 4]");
}

#[test]
fn failed_allocation_leaves_the_list_alone() {
    // Room for two nodes and nothing more.
    let mut list = LinkedList::with_capacity(30);

    assert!(list.push_front(1).is_some());
    assert!(list.push_front(2).is_some());

    // The pool is exhausted; the insertion is dropped silently.
    assert_eq!(list.push_front(3), None);
    assert_eq!(list.len(), 2);
    assert_eq!(list.to_string(), "[2, 1]");

    let head = list.find(2).unwrap();
    assert_eq!(list.insert_after(head, 3), None);
    assert_eq!(list.to_string(), "[2, 1]");
}

#[test]
fn clear_returns_every_node_to_the_pool() {
    let mut list = LinkedList::with_capacity(256);
    for value in [3, 2, 1] {
        list.push_front(value).unwrap();
    }

    list.clear();
    assert!(list.is_empty());
    assert_eq!(list.pool().free_bytes(), list.pool().capacity());

    // The list is usable again after a teardown.
    list.push_front(7).unwrap();
    assert_eq!(list.to_string(), "[7]");
}
