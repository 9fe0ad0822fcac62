//! Data structures backing the replacement policies.

pub mod entry_list;
pub mod slot_arena;

pub use entry_list::EntryList;
pub use slot_arena::{SlotArena, SlotId};
