//! Segregated Free Lists
//!
//! Free blocks are indexed in 5 doubly-linked lists, one per SizeClass. The roots are held by the FreeLists, whilst
//! the links are stored within the free blocks themselves.
//!
//! Insertion always happens at the head, and removal relies on the links of the removed block; both are O(1).

use core::marker::PhantomData;

use crate::{Configuration, Properties, SizeClass};

use super::{arena::Arena, tag::BlockOffset};

/// FreeLists.
pub(crate) struct FreeLists<C> {
    roots: [Option<BlockOffset>; SizeClass::NUMBER_CLASSES],
    _configuration: PhantomData<fn() -> C>,
}

impl<C> FreeLists<C>
    where
        C: Configuration
{
    /// Creates an instance, with all lists empty.
    pub(crate) fn new() -> Self { Self { roots: [None; SizeClass::NUMBER_CLASSES], _configuration: PhantomData } }

    /// Returns the head of the list of `class`, if any.
    pub(crate) fn head(&self, class: SizeClass) -> Option<BlockOffset> { self.roots[class.value()] }

    /// Returns an iterator over the blocks of the list of `class`.
    pub(crate) fn iter<'a>(&self, arena: &'a Arena, class: SizeClass) -> FreeListIter<'a> {
        FreeListIter { arena, current: self.head(class) }
    }

    /// Pushes `block` at the head of the list of its class.
    ///
    /// The leading tag of `block` must already hold its final size.
    pub(crate) fn insert(&mut self, arena: &mut Arena, block: BlockOffset) {
        let root = self.root_of(arena, block);

        arena.set_prev_link(block, None);
        arena.set_next_link(block, *root);

        if let Some(head) = *root {
            arena.set_prev_link(head, Some(block));
        }

        *root = Some(block);
    }

    /// Detaches `block` from the list of its class.
    ///
    /// The leading tag of `block` must still hold the size it was inserted with.
    pub(crate) fn remove(&mut self, arena: &mut Arena, block: BlockOffset) {
        let (prev, next) = (arena.prev_link(block), arena.next_link(block));

        match (prev, next) {
            (Some(prev), Some(next)) => {
                arena.set_next_link(prev, Some(next));
                arena.set_prev_link(next, Some(prev));
            },
            (Some(prev), None) => {
                arena.set_next_link(prev, None);
            },
            (None, Some(next)) => {
                arena.set_prev_link(next, None);
                *self.root_of(arena, block) = Some(next);
            },
            (None, None) => {
                *self.root_of(arena, block) = None;
            },
        }
    }

    fn root_of(&mut self, arena: &Arena, block: BlockOffset) -> &mut Option<BlockOffset> {
        let class = Properties::<C>::size_class(arena.tag(block).size());

        debug_assert!(arena.tag(block).is_free());

        &mut self.roots[class.value()]
    }
}

/// FreeListIter.
pub(crate) struct FreeListIter<'a> {
    arena: &'a Arena,
    current: Option<BlockOffset>,
}

impl<'a> Iterator for FreeListIter<'a> {
    type Item = BlockOffset;

    fn next(&mut self) -> Option<BlockOffset> {
        let result = self.current?;

        self.current = self.arena.next_link(result);

        Some(result)
    }
}
