//! Настоящие переключения контекста на хосте
//! Real context switches on the host
//!
//! Зелёные потоки не паникуют: паника не может пересечь `extern "C"`.
//! Поэтому они только записывают наблюдения, а проверяет загрузочный поток.
//! Green threads never panic: a panic cannot cross `extern "C"`.
//! So they only record observations and the bootstrap thread checks them.

use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use threadcore::arch::hosted::Hosted;
use threadcore::arch::Cpu;
use threadcore::{
    Error, KernelStack, Scheduler, SchedulerConfig, ThreadHandle, ThreadState, MIN_STACK_SIZE,
};

type Sched = Scheduler<Hosted>;

fn boot(max_threads: usize) -> &'static Sched {
    let config = SchedulerConfig::default()
        .with_max_threads(max_threads)
        .with_default_stack_size(32 * 1024);
    Box::leak(Box::new(Scheduler::boot(config, Hosted::new()).unwrap()))
}

fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

/// Крутить тики, пока не останется только загрузочный поток.
/// Tick until only the bootstrap thread is left.
fn run_to_completion(sched: &Sched) {
    for _ in 0..1000 {
        if sched.live_threads() == 1 {
            return;
        }
        sched.tick();
    }
    panic!("threads did not finish");
}

extern "C" fn bump(arg: usize) -> usize {
    let counter = unsafe { &*(arg as *const AtomicUsize) };
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

// ── Сценарий / Scenario ───────────────────────────────────────────────────────

#[test]
fn three_threads_bump_a_shared_counter_once_each() {
    let sched = boot(8);
    let counter = leak(AtomicUsize::new(0));
    let arg = counter as *const AtomicUsize as usize;

    let threads: Vec<ThreadHandle> = (0..3).map(|_| sched.spawn(bump, arg).unwrap()).collect();
    assert_eq!(sched.ready_threads(), threads);

    run_to_completion(sched);

    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(sched.ready_len(), 0);
    assert_eq!(sched.current(), sched.bootstrap_thread());
    assert_eq!(sched.thread_state(sched.current()), Ok(ThreadState::Running));

    let stats = sched.stats();
    assert_eq!((stats.created, stats.exited), (3, 3));
    // boot → T1 → T2 → T3 → boot
    assert_eq!(stats.switches, 4);
    assert_eq!(stats.ticks, 1);
}

#[test]
fn exited_threads_never_come_back() {
    let sched = boot(4);
    let counter = leak(AtomicUsize::new(0));
    let t = sched.spawn(bump, counter as *const AtomicUsize as usize).unwrap();

    run_to_completion(sched);

    assert_eq!(sched.thread_state(t), Err(Error::ThreadExited));
    assert_eq!(sched.mark_ready(t), Err(Error::ThreadExited));
    sched.mark_not_ready(t);
    sched.tick();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(sched.ready_len(), 0);
}

#[test]
fn tick_with_an_empty_queue_keeps_the_current_thread() {
    let sched = boot(4);
    let boot_thread = sched.current();

    for _ in 0..5 {
        sched.tick();
    }

    assert_eq!(sched.current(), boot_thread);
    assert_eq!(sched.running_count(), 1);
    assert_eq!(sched.stats().switches, 0);
    assert_eq!(sched.stats().ticks, 5);
}

// ── Справедливость / Fairness ─────────────────────────────────────────────────

struct Worker {
    sched:  &'static Sched,
    id:     usize,
    rounds: usize,
    trace:  &'static Mutex<Vec<usize>>,
}

extern "C" fn take_turns(arg: usize) -> usize {
    let w = unsafe { &*(arg as *const Worker) };
    for _ in 0..w.rounds {
        w.trace.lock().unwrap().push(w.id);
        w.sched.yield_now();
    }
    w.id
}

#[test]
fn ready_threads_run_in_enqueue_order_once_per_round() {
    let sched = boot(8);
    let trace = leak(Mutex::new(Vec::new()));
    for id in 1..=3 {
        let worker = leak(Worker { sched, id, rounds: 3, trace });
        sched.spawn(take_turns, worker as *const Worker as usize).unwrap();
    }

    run_to_completion(sched);

    assert_eq!(*trace.lock().unwrap(), [1, 2, 3, 1, 2, 3, 1, 2, 3]);
}

struct Observer {
    sched:   &'static Sched,
    current: Mutex<Option<ThreadHandle>>,
    running: AtomicUsize,
}

extern "C" fn observe(arg: usize) -> usize {
    let o = unsafe { &*(arg as *const Observer) };
    *o.current.lock().unwrap() = Some(o.sched.current());
    o.running.store(o.sched.running_count(), Ordering::SeqCst);
    0
}

struct InterruptState {
    sched:   &'static Sched,
    enabled: Mutex<Option<bool>>,
}

extern "C" fn record_interrupts(arg: usize) -> usize {
    let w = unsafe { &*(arg as *const InterruptState) };
    *w.enabled.lock().unwrap() = Some(w.sched.cpu().interrupts_enabled());
    0
}

#[test]
fn a_new_thread_starts_with_interrupts_enabled() {
    let sched = boot(4);
    let seen = leak(InterruptState { sched, enabled: Mutex::new(None) });
    sched.spawn(record_interrupts, seen as *const InterruptState as usize).unwrap();

    sched.tick();

    assert_eq!(*seen.enabled.lock().unwrap(), Some(true));
    // Загрузочный поток получил своё состояние обратно / The bootstrap thread got its own state back
    assert!(sched.cpu().interrupts_enabled());
}

#[test]
fn the_dispatched_thread_is_the_only_running_one() {
    let sched = boot(4);
    let observer = leak(Observer { sched, current: Mutex::new(None), running: AtomicUsize::new(0) });
    let t = sched.spawn(observe, observer as *const Observer as usize).unwrap();

    sched.tick();

    assert_eq!(*observer.current.lock().unwrap(), Some(t));
    assert_eq!(observer.running.load(Ordering::SeqCst), 1);
    assert_eq!(sched.thread_state(sched.bootstrap_thread()), Ok(ThreadState::Running));
}

// ── Сохранение контекста / Context preservation ───────────────────────────────

struct Survivor {
    sched: &'static Sched,
    out:   AtomicUsize,
}

extern "C" fn keep_locals(arg: usize) -> usize {
    let s = unsafe { &*(arg as *const Survivor) };
    let a = black_box(0x1234_5678usize);
    let b = black_box(0x0bad_cafeusize);
    let c = black_box(a ^ b);
    s.sched.yield_now();
    s.sched.yield_now();
    s.out.store(black_box(a) + black_box(b) + black_box(c), Ordering::SeqCst);
    0
}

#[test]
fn locals_survive_being_switched_out() {
    let sched = boot(4);
    let survivor = leak(Survivor { sched, out: AtomicUsize::new(0) });
    sched.spawn(keep_locals, survivor as *const Survivor as usize).unwrap();

    let x = black_box(41usize);
    run_to_completion(sched);

    assert_eq!(black_box(x) + 1, 42);
    let (a, b) = (0x1234_5678usize, 0x0bad_cafeusize);
    assert_eq!(survivor.out.load(Ordering::SeqCst), a + b + (a ^ b));
}

#[test]
fn a_created_thread_snapshot_points_into_its_stack() {
    let sched = boot(4);
    let stack = KernelStack::allocate(8 * 1024).unwrap().leak();
    let (base, top) = (stack.base(), stack.top());
    let counter = leak(AtomicUsize::new(0));

    let t = sched.create(bump, counter as *const AtomicUsize as usize, stack).unwrap();
    let regs = sched.registers(t).unwrap();

    assert_eq!(sched.thread_state(t), Ok(ThreadState::New));
    assert!((base..top).contains(&regs.stack_pointer()));
    assert_eq!(regs.frame_pointer(), 0);
    assert_eq!(sched.ready_len(), 0);

    // New поток без mark_ready не запускается / A New thread does not run unqueued
    sched.tick();
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    sched.mark_ready(t).unwrap();
    sched.tick();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

// ── Готовность / Readiness ────────────────────────────────────────────────────

#[test]
fn not_ready_threads_are_skipped_until_marked_ready() {
    let sched = boot(8);
    let counter = leak(AtomicUsize::new(0));
    let arg = counter as *const AtomicUsize as usize;
    let a = sched.spawn(bump, arg).unwrap();
    let b = sched.spawn(bump, arg).unwrap();

    sched.mark_not_ready(a);
    assert_eq!(sched.ready_threads(), [b]);
    sched.tick();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(sched.thread_state(a), Ok(ThreadState::Blocked));
    assert_eq!(sched.thread_state(b), Err(Error::ThreadExited));

    sched.mark_ready(a).unwrap();
    sched.tick();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(sched.live_threads(), 1);
}

#[test]
fn not_ready_on_the_running_thread_is_a_no_op() {
    let sched = boot(4);
    let counter = leak(AtomicUsize::new(0));
    let a = sched.spawn(bump, counter as *const AtomicUsize as usize).unwrap();

    sched.mark_not_ready(sched.current());
    assert_eq!(sched.ready_threads(), [a]);
    assert_eq!(sched.thread_state(sched.current()), Ok(ThreadState::Running));
}

struct Sleeper {
    sched: &'static Sched,
    trace: Mutex<Vec<&'static str>>,
}

extern "C" fn sleep_once(arg: usize) -> usize {
    let s = unsafe { &*(arg as *const Sleeper) };
    s.trace.lock().unwrap().push("before");
    s.sched.block_current();
    s.trace.lock().unwrap().push("after");
    0
}

#[test]
fn blocked_thread_sleeps_until_woken() {
    let sched = boot(4);
    let sleeper = leak(Sleeper { sched, trace: Mutex::new(Vec::new()) });
    let t = sched.spawn(sleep_once, sleeper as *const Sleeper as usize).unwrap();

    sched.tick();
    assert_eq!(*sleeper.trace.lock().unwrap(), ["before"]);
    assert_eq!(sched.thread_state(t), Ok(ThreadState::Blocked));
    assert_eq!(sched.ready_len(), 0);

    sched.tick();
    assert_eq!(*sleeper.trace.lock().unwrap(), ["before"]);

    sched.mark_ready(t).unwrap();
    sched.tick();
    assert_eq!(*sleeper.trace.lock().unwrap(), ["before", "after"]);
    assert_eq!(sched.live_threads(), 1);
}

// ── Ресурсы / Resources ───────────────────────────────────────────────────────

#[test]
fn creation_fails_when_control_blocks_run_out() {
    let sched = boot(2);
    let counter = leak(AtomicUsize::new(0));
    let arg = counter as *const AtomicUsize as usize;

    sched.spawn(bump, arg).unwrap();
    assert_eq!(sched.spawn(bump, arg).err(), Some(Error::OutOfMemory));
    assert_eq!(sched.ready_len(), 1);

    // Блок освобождается после выхода / The block is freed after exit
    run_to_completion(sched);
    sched.spawn(bump, arg).unwrap();
    run_to_completion(sched);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn a_stack_without_room_for_the_frame_is_rejected() {
    let sched = boot(4);
    let tiny: &'static mut [u8] = Box::leak(vec![0u8; MIN_STACK_SIZE / 4].into_boxed_slice());
    let stack = threadcore::StackRegion::from_static(tiny);

    assert_eq!(sched.create(bump, 0, stack).err(), Some(Error::StackTooSmall));
    assert_eq!(sched.stats().created, 0);
    assert_eq!(sched.live_threads(), 1);
}
