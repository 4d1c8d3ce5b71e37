//! Run queue over a fixed task arena
//!
//! Each arena slot has `next`/`prev` links holding slot indices, so
//! insertion at the tail and removal by id are both O(1). A slot is either
//! linked exactly once or not at all.

/// Queue linkage for one arena slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Link {
    next: Option<u8>,
    prev: Option<u8>,
    queued: bool,
}

/// Ordered run queue of task ids
#[derive(Debug, Clone)]
pub struct TaskQueue<const N: usize> {
    links: [Link; N],
    head: Option<u8>,
    tail: Option<u8>,
    len: usize,
}

impl<const N: usize> Default for TaskQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TaskQueue<N> {
    pub const fn new() -> Self {
        Self {
            links: [Link {
                next: None,
                prev: None,
                queued: false,
            }; N],
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: u8) -> bool {
        self.links.get(id as usize).is_some_and(|l| l.queued)
    }

    /// Append `id` at the tail
    ///
    /// Returns false if `id` is outside the arena or already queued.
    pub fn push_back(&mut self, id: u8) -> bool {
        if id as usize >= N || self.links[id as usize].queued {
            return false;
        }

        self.links[id as usize] = Link {
            next: None,
            prev: self.tail,
            queued: true,
        };
        match self.tail {
            Some(tail) => self.links[tail as usize].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        true
    }

    /// Unlink `id`
    ///
    /// Returns false if it was not queued.
    pub fn remove(&mut self, id: u8) -> bool {
        if !self.contains(id) {
            return false;
        }

        let link = self.links[id as usize];
        match link.prev {
            Some(prev) => self.links[prev as usize].next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => self.links[next as usize].prev = link.prev,
            None => self.tail = link.prev,
        }
        self.links[id as usize] = Link::default();
        self.len -= 1;
        true
    }

    /// First queued id
    pub fn first(&self) -> Option<u8> {
        self.head
    }

    /// Id queued after `id`
    pub fn next(&self, id: u8) -> Option<u8> {
        self.links.get(id as usize).and_then(|l| l.next)
    }

    /// Iterate ids in queue order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        core::iter::successors(self.head, move |&id| self.next(id))
    }
}
