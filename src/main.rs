use anyhow::Result;
use log::*;

use sycorax::{LinkedList, Pool};

fn main() -> Result<()> {
    std::env::set_var("RUST_LOG", "info");
    pretty_env_logger::init();

    // Carve a few blocks out of a small pool, resize one of them
    // and hand everything back.
    let mut pool = Pool::new(256);
    info!("Pool of {} bytes, {} free.", pool.capacity(), pool.free_bytes());

    let greeting = pool.allocate(16)?;
    pool.data_mut(greeting).unwrap()[..5].copy_from_slice(b"hello");

    let greeting = pool.resize(Some(greeting), 64)?;
    info!(
        "Grew the greeting block to {} bytes, {} free.",
        pool.size_of(greeting).unwrap(),
        pool.free_bytes()
    );

    pool.release(greeting);
    info!("Released everything, {} bytes free again.", pool.free_bytes());

    // The same pool machinery, driven through the linked list.
    let mut list = LinkedList::with_capacity(256);
    for value in [3, 2, 1] {
        list.push_front(value);
    }
    if let Some(two) = list.find(2) {
        list.insert_after(two, 10);
    }
    info!("List: {} ({} nodes).", list, list.len());

    list.remove(10);
    info!("List after removal: {}.", list);
    list.clear();

    Ok(())
}
