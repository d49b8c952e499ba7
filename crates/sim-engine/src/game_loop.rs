//! Fixed-rate scheduler driving ordered subsystem ticks.
//!
//! No ECS stage graph here: tick ordering is a plain, explicit contract —
//! a `Vec<Box<dyn Subsystem>>` ticked in registration order. Exceptions in
//! one subsystem are logged and do not abort the tick.

use world_model::GameClock;

pub struct TickContext {
    pub tick_number: u64,
    pub delta_seconds: f64,
    pub is_paused: bool,
}

/// One engine subsystem. Registration order is execution order; this
/// *is* the ordering contract, not an incidental property of a graph.
pub trait Subsystem: Send {
    fn name(&self) -> &'static str;

    /// Called once per tick. Subsystems that should keep running while
    /// paused (admin-facing ones) return `true` from [`Subsystem::runs_while_paused`].
    fn on_tick(&mut self, ctx: &TickContext);

    fn runs_while_paused(&self) -> bool {
        false
    }
}

pub struct GameLoop {
    clock: GameClock,
    subsystems: Vec<Box<dyn Subsystem>>,
}

impl GameLoop {
    pub fn new(clock: GameClock) -> Self {
        Self { clock, subsystems: Vec::new() }
    }

    /// Registers a subsystem. Order of registration is the tick's execution order.
    pub fn register(&mut self, subsystem: Box<dyn Subsystem>) {
        self.subsystems.push(subsystem);
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused
    }

    pub fn pause(&mut self) {
        self.clock.is_paused = true;
    }

    pub fn resume(&mut self) {
        self.clock.is_paused = false;
    }

    pub fn clock(&self) -> GameClock {
        self.clock
    }

    /// Advances the clock and runs every registered subsystem once, in
    /// registration order. A panicking subsystem is caught so one bad
    /// subsystem cannot abort the tick for the rest; this is logged and the
    /// loop proceeds to the next subsystem.
    pub fn tick(&mut self) {
        let tick_number = self.clock.advance();
        let ctx = TickContext {
            tick_number,
            delta_seconds: 1.0 / world_model::clock::TICKS_PER_SECOND as f64,
            is_paused: self.clock.is_paused,
        };

        for subsystem in &mut self.subsystems {
            if ctx.is_paused && !subsystem.runs_while_paused() {
                continue;
            }
            let name = subsystem.name();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| subsystem.on_tick(&ctx)));
            if result.is_err() {
                tracing::error!(subsystem = name, tick = tick_number, "subsystem panicked during tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingSubsystem {
        name: &'static str,
        counter: Arc<AtomicU32>,
    }

    impl Subsystem for CountingSubsystem {
        fn name(&self) -> &'static str {
            self.name
        }

        fn on_tick(&mut self, _ctx: &TickContext) {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn subsystems_run_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        struct Recorder {
            name: &'static str,
            order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        }
        impl Subsystem for Recorder {
            fn name(&self) -> &'static str {
                self.name
            }
            fn on_tick(&mut self, _ctx: &TickContext) {
                self.order.lock().unwrap().push(self.name);
            }
        }

        let mut game_loop = GameLoop::new(GameClock::new());
        game_loop.register(Box::new(Recorder { name: "commands", order: order.clone() }));
        game_loop.register(Box::new(Recorder { name: "clock", order: order.clone() }));
        game_loop.register(Box::new(Recorder { name: "ai", order: order.clone() }));
        game_loop.tick();

        assert_eq!(*order.lock().unwrap(), vec!["commands", "clock", "ai"]);
    }

    #[test]
    fn paused_loop_skips_non_admin_subsystems() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut game_loop = GameLoop::new(GameClock::new());
        game_loop.register(Box::new(CountingSubsystem { name: "sim", counter: counter.clone() }));
        game_loop.pause();
        game_loop.tick();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clock_advances_once_per_tick() {
        let mut game_loop = GameLoop::new(GameClock::new());
        game_loop.tick();
        game_loop.tick();
        assert_eq!(game_loop.clock().tick, 2);
    }
}
