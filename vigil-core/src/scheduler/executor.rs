//! Round executor
//!
//! `schedule()` runs exactly one round:
//!
//! 1. advance the timebase by one tick
//! 2. queue every task with a pending insert (ascending id)
//! 3. unlink every task with a pending remove
//! 4. run each queued task once, in queue order, to completion
//!
//! A task that returns a [`Fault`] halts the scheduler for good.

use super::queue::TaskQueue;
use crate::fault::Fault;
use crate::time::Tick;

/// Arena size of the device task table
pub const MAX_TASKS: usize = 8;

/// A unit of work run once per round while queued
///
/// `C` is the state the task operates on, passed into every round.
pub trait Task<C> {
    /// Run to completion for this round
    fn run(&mut self, ctx: &mut C, round: &mut Round<'_>) -> Result<(), Fault>;
}

/// Per-round view handed to each task
pub struct Round<'a> {
    tick: Tick,
    capacity: usize,
    add: &'a mut u32,
    remove: &'a mut u32,
}

impl Round<'_> {
    /// Current tick
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Queue task `id` from the next round on
    pub fn request_add(&mut self, id: u8) -> Result<(), Fault> {
        request_add(id, self.capacity, self.add, self.remove)
    }

    /// Unlink task `id` from the next round on
    pub fn request_remove(&mut self, id: u8) {
        request_remove(id, self.capacity, self.add, self.remove);
    }
}

// The latest request for an id replaces any earlier one from the same round.

fn request_add(id: u8, capacity: usize, add: &mut u32, remove: &mut u32) -> Result<(), Fault> {
    if id as usize >= capacity {
        return Err(Fault::UnknownTask(id));
    }
    *add |= 1 << id;
    *remove &= !(1 << id);
    Ok(())
}

fn request_remove(id: u8, capacity: usize, add: &mut u32, remove: &mut u32) {
    if (id as usize) < capacity {
        *remove |= 1 << id;
        *add &= !(1 << id);
    }
}

/// Cooperative scheduler over a fixed arena of `N` task slots
pub struct Scheduler<T, const N: usize = MAX_TASKS> {
    tick: Tick,
    tasks: [Option<T>; N],
    queue: TaskQueue<N>,
    pending_add: u32,
    pending_remove: u32,
    fault: Option<Fault>,
}

impl<T, const N: usize> Default for Scheduler<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Scheduler<T, N> {
    // Pending sets are u32 bitmasks
    const FITS_BITMASK: () = assert!(N <= 32, "task arena larger than pending bitmask");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS_BITMASK;
        Self {
            tick: 0,
            tasks: core::array::from_fn(|_| None),
            queue: TaskQueue::new(),
            pending_add: 0,
            pending_remove: 0,
            fault: None,
        }
    }

    /// Place a task in arena slot `id`
    ///
    /// Registration does not queue the task; request an insert for that.
    pub fn register(&mut self, id: u8, task: T) -> Result<(), Fault> {
        let slot = self
            .tasks
            .get_mut(id as usize)
            .ok_or(Fault::UnknownTask(id))?;
        *slot = Some(task);
        Ok(())
    }

    /// Request an insert outside of a round (e.g. at boot)
    pub fn request_add(&mut self, id: u8) -> Result<(), Fault> {
        request_add(id, N, &mut self.pending_add, &mut self.pending_remove)
    }

    /// Request a removal outside of a round
    pub fn request_remove(&mut self, id: u8) {
        request_remove(id, N, &mut self.pending_add, &mut self.pending_remove);
    }

    /// Ticks elapsed since boot
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Latched fault, if the scheduler has halted
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn is_queued(&self, id: u8) -> bool {
        self.queue.contains(id)
    }

    /// Queued task ids in execution order
    pub fn queued(&self) -> impl Iterator<Item = u8> + '_ {
        self.queue.iter()
    }

    pub fn task(&self, id: u8) -> Option<&T> {
        self.tasks.get(id as usize).and_then(Option::as_ref)
    }

    pub fn task_mut(&mut self, id: u8) -> Option<&mut T> {
        self.tasks.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// Execute one round
    ///
    /// Once halted, returns the latched fault without advancing time or
    /// running anything.
    pub fn schedule<C>(&mut self, ctx: &mut C) -> Result<(), Fault>
    where
        T: Task<C>,
    {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        self.tick = self.tick.wrapping_add(1);

        let result = self.apply_pending().and_then(|()| self.run_round(ctx));
        if let Err(fault) = result {
            error!("Scheduler halted at tick {}: {}", self.tick, fault);
            self.fault = Some(fault);
        }
        result
    }

    fn apply_pending(&mut self) -> Result<(), Fault> {
        let adds = core::mem::take(&mut self.pending_add);
        for id in 0..N as u8 {
            if adds & (1 << id) == 0 {
                continue;
            }
            if self.tasks[id as usize].is_none() {
                return Err(Fault::UnknownTask(id));
            }
            if self.queue.push_back(id) {
                trace!("Task {} queued", id);
            }
        }

        let removes = core::mem::take(&mut self.pending_remove);
        for id in 0..N as u8 {
            if removes & (1 << id) != 0 && self.queue.remove(id) {
                trace!("Task {} removed", id);
            }
        }
        Ok(())
    }

    fn run_round<C>(&mut self, ctx: &mut C) -> Result<(), Fault>
    where
        T: Task<C>,
    {
        let mut cursor = self.queue.first();
        while let Some(id) = cursor {
            cursor = self.queue.next(id);
            if let Some(task) = self.tasks[id as usize].as_mut() {
                let mut round = Round {
                    tick: self.tick,
                    capacity: N,
                    add: &mut self.pending_add,
                    remove: &mut self.pending_remove,
                };
                task.run(ctx, &mut round)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Default)]
    struct Trace {
        counters: [u32; 2],
        calls: Vec<(Tick, u8), 64>,
    }

    enum TestTask {
        /// Bump a counter
        Count { id: u8, counter: usize },
        /// Ask for own removal every time it runs
        RemoveSelf { id: u8 },
        /// Ask for another task to be queued
        Add { id: u8, target: u8 },
        /// Fail with a fault
        Fail,
    }

    impl Task<Trace> for TestTask {
        fn run(&mut self, ctx: &mut Trace, round: &mut Round<'_>) -> Result<(), Fault> {
            match *self {
                TestTask::Count { id, counter } => {
                    ctx.counters[counter] += 1;
                    ctx.calls.push((round.tick(), id)).unwrap();
                }
                TestTask::RemoveSelf { id } => {
                    ctx.calls.push((round.tick(), id)).unwrap();
                    round.request_remove(id);
                }
                TestTask::Add { id, target } => {
                    ctx.calls.push((round.tick(), id)).unwrap();
                    round.request_add(target)?;
                }
                TestTask::Fail => return Err(Fault::EkgOverrun),
            }
            Ok(())
        }
    }

    /// Five slots: three bump counter 0, two bump counter 1
    fn five_task_scheduler() -> Scheduler<TestTask> {
        let mut s = Scheduler::new();
        for id in 0..5u8 {
            let counter = if id < 3 { 0 } else { 1 };
            s.register(id, TestTask::Count { id, counter }).unwrap();
        }
        s
    }

    #[test]
    fn test_schedule_add_then_remove() {
        let mut s = five_task_scheduler();
        let mut trace = Trace::default();

        // Insert slots {0, 4}
        s.request_add(0).unwrap();
        s.request_add(4).unwrap();
        let before = s.tick();
        s.schedule(&mut trace).unwrap();
        assert_eq!(s.tick() - before, 1);
        assert_eq!(trace.counters, [1, 1]);

        // Remove slots {0, 4}
        s.request_remove(0);
        s.request_remove(4);
        let before = s.tick();
        s.schedule(&mut trace).unwrap();
        assert_eq!(s.tick() - before, 1);
        assert_eq!(trace.counters, [1, 1]);
    }

    #[test]
    fn test_round_runs_in_queue_order() {
        let mut s = five_task_scheduler();
        let mut trace = Trace::default();
        for id in [3, 1, 2] {
            s.request_add(id).unwrap();
        }
        s.schedule(&mut trace).unwrap();
        // Pending inserts are applied in ascending id order
        assert_eq!(&trace.calls[..], &[(1, 1), (1, 2), (1, 3)]);

        s.request_add(0).unwrap();
        s.schedule(&mut trace).unwrap();
        assert_eq!(&trace.calls[3..], &[(2, 1), (2, 2), (2, 3), (2, 0)]);
    }

    #[test]
    fn test_removed_task_finishes_current_round() {
        let mut s: Scheduler<TestTask> = Scheduler::new();
        let mut trace = Trace::default();
        s.register(0, TestTask::RemoveSelf { id: 0 }).unwrap();
        s.register(1, TestTask::Count { id: 1, counter: 0 }).unwrap();
        s.request_add(0).unwrap();
        s.request_add(1).unwrap();

        s.schedule(&mut trace).unwrap();
        assert_eq!(&trace.calls[..], &[(1, 0), (1, 1)]);
        // Still linked until the next round applies the removal
        assert!(s.is_queued(0));

        s.schedule(&mut trace).unwrap();
        assert_eq!(&trace.calls[2..], &[(2, 1)]);
        assert!(!s.is_queued(0));
    }

    #[test]
    fn test_add_during_round_applies_next_round() {
        let mut s: Scheduler<TestTask> = Scheduler::new();
        let mut trace = Trace::default();
        s.register(0, TestTask::Add { id: 0, target: 1 }).unwrap();
        s.register(1, TestTask::Count { id: 1, counter: 0 }).unwrap();
        s.request_add(0).unwrap();

        s.schedule(&mut trace).unwrap();
        assert_eq!(trace.counters[0], 0);
        assert!(!s.is_queued(1));

        s.schedule(&mut trace).unwrap();
        assert_eq!(trace.counters[0], 1);
        // Re-requesting an already queued task does not duplicate it
        s.schedule(&mut trace).unwrap();
        assert_eq!(trace.counters[0], 2);
        assert_eq!(s.queued().count(), 2);
    }

    #[test]
    fn test_last_request_in_round_wins() {
        let mut s = five_task_scheduler();
        let mut trace = Trace::default();
        s.request_add(1).unwrap();
        s.schedule(&mut trace).unwrap();
        assert!(s.is_queued(1));

        // Remove then re-add: stays linked
        s.request_remove(1);
        s.request_add(1).unwrap();
        s.schedule(&mut trace).unwrap();
        assert!(s.is_queued(1));

        // Add then remove: unlinked
        s.request_add(2).unwrap();
        s.request_remove(2);
        s.request_remove(1);
        s.schedule(&mut trace).unwrap();
        assert!(!s.is_queued(1));
        assert!(!s.is_queued(2));
    }

    #[test]
    fn test_remove_absent_task_is_noop() {
        let mut s = five_task_scheduler();
        let mut trace = Trace::default();
        s.request_add(2).unwrap();
        s.request_remove(3);
        s.request_remove(200);
        s.schedule(&mut trace).unwrap();
        assert_eq!(trace.counters, [1, 0]);
    }

    #[test]
    fn test_add_outside_arena_faults() {
        let mut s = five_task_scheduler();
        assert_eq!(s.request_add(8), Err(Fault::UnknownTask(8)));
        assert_eq!(
            s.register(9, TestTask::Fail),
            Err(Fault::UnknownTask(9))
        );
    }

    #[test]
    fn test_add_unregistered_task_halts() {
        let mut s = five_task_scheduler();
        let mut trace = Trace::default();
        s.request_add(6).unwrap();
        assert_eq!(s.schedule(&mut trace), Err(Fault::UnknownTask(6)));
        assert_eq!(s.fault(), Some(Fault::UnknownTask(6)));
    }

    #[test]
    fn test_in_round_add_outside_arena_halts() {
        let mut s: Scheduler<TestTask> = Scheduler::new();
        let mut trace = Trace::default();
        s.register(0, TestTask::Add { id: 0, target: 40 }).unwrap();
        s.request_add(0).unwrap();
        assert_eq!(s.schedule(&mut trace), Err(Fault::UnknownTask(40)));
    }

    #[test]
    fn test_fault_latches_and_stops_rounds() {
        let mut s: Scheduler<TestTask> = Scheduler::new();
        let mut trace = Trace::default();
        s.register(0, TestTask::Count { id: 0, counter: 0 }).unwrap();
        s.register(1, TestTask::Fail).unwrap();
        s.register(2, TestTask::Count { id: 2, counter: 1 }).unwrap();
        for id in 0..3 {
            s.request_add(id).unwrap();
        }

        assert_eq!(s.schedule(&mut trace), Err(Fault::EkgOverrun));
        // Tasks after the failing one did not run
        assert_eq!(trace.counters, [1, 0]);

        let tick = s.tick();
        assert_eq!(s.schedule(&mut trace), Err(Fault::EkgOverrun));
        assert_eq!(s.tick(), tick);
        assert_eq!(trace.counters, [1, 0]);
    }

    #[test]
    fn test_tick_wraps() {
        let mut s: Scheduler<TestTask> = Scheduler::new();
        let mut trace = Trace::default();
        s.tick = u32::MAX;
        s.schedule(&mut trace).unwrap();
        assert_eq!(s.tick(), 0);
    }
}
