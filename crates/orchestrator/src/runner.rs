//! Simulation runner with lifecycle management.
//!
//! Drives a [`Simulation`] from a background thread -- the single control
//! thread that mutates simulation state -- with start, pause, resume, and
//! status tracking from the outside.

use kernel::Simulation;
use std::sync::{Arc, Mutex};
use std::thread;

/// Runner state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Simulation created but not yet started.
    Created,
    /// Tick loop actively running.
    Running,
    /// Tick loop paused.
    Paused,
    /// Reached the configured tick budget (or was dropped).
    Finished,
    /// The simulation thread died.
    Error,
}

/// Shared state between the runner thread and the control interface.
struct SharedState {
    state: RunnerState,
    sim_time: f64,
    tick_count: u64,
    error_message: Option<String>,
}

/// Handle for controlling and querying a running simulation.
pub struct SimulationRunner {
    shared: Arc<Mutex<SharedState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulationRunner {
    /// Wrap a simulation in a background tick loop.
    ///
    /// The loop waits for [`SimulationRunner::start`], then runs one outer
    /// tick per iteration until `max_ticks` is reached (forever if `None`).
    pub fn new(mut sim: Box<dyn Simulation + Send>, max_ticks: Option<u64>) -> Self {
        let shared = Arc::new(Mutex::new(SharedState {
            state: RunnerState::Created,
            sim_time: 0.0,
            tick_count: 0,
            error_message: None,
        }));

        let shared_clone = Arc::clone(&shared);
        let thread_handle = thread::spawn(move || {
            run_tick_loop(sim.as_mut(), shared_clone, max_ticks);
        });

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Current runner state.
    pub fn state(&self) -> RunnerState {
        self.shared.lock().unwrap().state.clone()
    }

    /// Accumulated simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.shared.lock().unwrap().sim_time
    }

    /// Outer ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.shared.lock().unwrap().tick_count
    }

    /// Error message when the state is [`RunnerState::Error`].
    pub fn error_message(&self) -> Option<String> {
        self.shared.lock().unwrap().error_message.clone()
    }

    /// Start the tick loop (Created -> Running).
    pub fn start(&self) {
        let mut state = self.shared.lock().unwrap();
        if state.state == RunnerState::Created {
            state.state = RunnerState::Running;
        }
    }

    /// Pause the tick loop.
    pub fn pause(&self) {
        let mut state = self.shared.lock().unwrap();
        if state.state == RunnerState::Running {
            state.state = RunnerState::Paused;
        }
    }

    /// Resume a paused tick loop.
    pub fn resume(&self) {
        let mut state = self.shared.lock().unwrap();
        if state.state == RunnerState::Paused {
            state.state = RunnerState::Running;
        }
    }

    /// Wait for the simulation thread to exit.
    pub fn join(mut self) -> Result<(), String> {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                let mut state = self.shared.lock().unwrap();
                state.state = RunnerState::Error;
                state.error_message = Some("simulation thread panicked".to_string());
                return Err("simulation thread panicked".to_string());
            }
        }
        Ok(())
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // Signal the thread to exit on its next state check.
        if let Ok(mut state) = self.shared.lock() {
            if state.state == RunnerState::Running || state.state == RunnerState::Paused {
                state.state = RunnerState::Finished;
            }
        }
    }
}

/// Tick loop executed in the background thread.
fn run_tick_loop(
    sim: &mut dyn Simulation,
    shared: Arc<Mutex<SharedState>>,
    max_ticks: Option<u64>,
) {
    // Wait for the start signal.
    loop {
        let state = shared.lock().unwrap().state.clone();
        match state {
            RunnerState::Created => thread::sleep(std::time::Duration::from_millis(10)),
            RunnerState::Running => break,
            _ => return,
        }
    }

    let mut tick_count = 0_u64;

    loop {
        let current = shared.lock().unwrap().state.clone();
        match current {
            RunnerState::Running => {
                sim.tick();
                tick_count += 1;

                {
                    let mut guard = shared.lock().unwrap();
                    guard.tick_count = tick_count;
                    guard.sim_time = sim.time() as f64;
                }

                if let Some(max) = max_ticks {
                    if tick_count >= max {
                        tracing::info!("simulation finished: reached max_ticks = {}", max);
                        shared.lock().unwrap().state = RunnerState::Finished;
                        break;
                    }
                }

                if tick_count % 100 == 0 {
                    tracing::debug!(
                        "tick {}: {} steps, sim_time = {:.3}s",
                        tick_count,
                        sim.steps(),
                        sim.time(),
                    );
                }
            }
            RunnerState::Paused => {
                thread::sleep(std::time::Duration::from_millis(50));
            }
            _ => break,
        }
    }

    tracing::info!(
        "simulation thread exiting: {} ticks, {} steps, {:.3}s simulated",
        tick_count,
        sim.steps(),
        sim.time(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::FieldImage;

    /// Device-free stand-in so the lifecycle tests run everywhere.
    struct CountingSim {
        steps: u64,
        steps_per_frame: u32,
        dt: f32,
    }

    impl Simulation for CountingSim {
        fn step(&mut self) {
            self.steps += 1;
        }

        fn tick(&mut self) {
            for _ in 0..self.steps_per_frame {
                self.step();
            }
        }

        fn present(&mut self) -> FieldImage {
            FieldImage::empty(4, 4)
        }

        fn steps(&self) -> u64 {
            self.steps
        }

        fn time(&self) -> f32 {
            self.steps as f32 * self.dt
        }

        fn dimensions(&self) -> (u32, u32) {
            (4, 4)
        }
    }

    fn counting_sim() -> Box<dyn Simulation + Send> {
        Box::new(CountingSim {
            steps: 0,
            steps_per_frame: 3,
            dt: 0.02,
        })
    }

    #[test]
    fn lifecycle_runs_to_max_ticks() {
        let runner = SimulationRunner::new(counting_sim(), Some(10));
        assert_eq!(runner.state(), RunnerState::Created);

        runner.start();
        runner.join().unwrap();
    }

    #[test]
    fn pause_stops_progress() {
        // No tick budget: the loop runs until paused or dropped.
        let runner = SimulationRunner::new(counting_sim(), None);

        runner.start();
        thread::sleep(std::time::Duration::from_millis(50));

        runner.pause();
        thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(runner.state(), RunnerState::Paused);

        let ticks_paused = runner.tick_count();
        thread::sleep(std::time::Duration::from_millis(100));
        let ticks_after = runner.tick_count();
        assert!(
            ticks_after <= ticks_paused + 1,
            "ticks advanced while paused: {} -> {}",
            ticks_paused,
            ticks_after
        );

        runner.resume();
        assert_eq!(runner.state(), RunnerState::Running);
        // Dropping the runner tells the thread to finish.
    }

    #[test]
    fn ticks_multiply_into_steps() {
        let runner = SimulationRunner::new(counting_sim(), Some(5));
        runner.start();
        while runner.state() != RunnerState::Finished {
            thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(runner.tick_count(), 5);
        // 5 ticks * 3 steps_per_frame * 0.02s per step.
        assert!((runner.sim_time() - 0.3).abs() < 1.0e-6);
        runner.join().unwrap();
    }
}
