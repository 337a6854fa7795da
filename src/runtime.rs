//! Simulation thread
//!
//! The simulation runs on its own thread at the configured tick rate.
//! Callers talk to it through a [`SimulationHandle`]: commands go in over a
//! channel and are applied between ticks, frames come out over a small
//! bounded channel. When the consumer falls behind, the oldest frame is
//! dropped so the newest state is always available.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::Millis;
use crate::render::Frame;
use crate::sim::tick::{Command, Simulation};

/// Frames buffered for the consumer
const FRAME_BUFFER: usize = 4;
/// Commands buffered for the simulation thread
const COMMAND_BUFFER: usize = 256;

#[derive(Debug)]
enum Message {
    Command(Command),
    Shutdown,
}

/// Owner-side handle to a running simulation thread
pub struct SimulationHandle {
    commands: Sender<Message>,
    frames: Receiver<Frame>,
    thread: Option<JoinHandle<Simulation>>,
}

/// Start `simulation` on a background thread
pub fn spawn(simulation: Simulation) -> SimulationHandle {
    let (cmd_tx, cmd_rx) = bounded::<Message>(COMMAND_BUFFER);
    let (frame_tx, frame_rx) = bounded::<Frame>(FRAME_BUFFER);

    let overflow = frame_rx.clone();
    let thread = thread::spawn(move || run(simulation, cmd_rx, frame_tx, overflow));

    SimulationHandle {
        commands: cmd_tx,
        frames: frame_rx,
        thread: Some(thread),
    }
}

impl SimulationHandle {
    /// Queue a command for the next tick; false once the thread has stopped
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(Message::Command(command)).is_ok()
    }

    pub fn frames(&self) -> &Receiver<Frame> {
        &self.frames
    }

    /// Most recent frame, discarding any older ones still queued
    pub fn latest_frame(&self) -> Option<Frame> {
        self.frames.try_iter().last()
    }

    /// Stop the thread and hand back the simulation
    pub fn shutdown(mut self) -> Option<Simulation> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Simulation> {
        let thread = self.thread.take()?;
        let _ = self.commands.send(Message::Shutdown);
        match thread.join() {
            Ok(sim) => Some(sim),
            Err(_) => {
                log::error!("Simulation thread panicked");
                None
            }
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drain pending commands; false when the loop should stop
fn process_commands(rx: &Receiver<Message>, sim: &mut Simulation, now: Millis) -> bool {
    loop {
        match rx.try_recv() {
            Ok(Message::Command(command)) => sim.apply(command, now),
            Ok(Message::Shutdown) => return false,
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => {
                log::debug!("Command channel closed");
                return false;
            }
        }
    }
}

/// Publish a frame, evicting the oldest one if the buffer is full
fn publish(tx: &Sender<Frame>, overflow: &Receiver<Frame>, frame: Frame) {
    match tx.try_send(frame) {
        Ok(()) => {}
        Err(TrySendError::Full(frame)) => {
            let _ = overflow.try_recv();
            if tx.try_send(frame).is_err() {
                log::trace!("Frame dropped");
            }
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

fn run(
    mut sim: Simulation,
    commands: Receiver<Message>,
    frames: Sender<Frame>,
    overflow: Receiver<Frame>,
) -> Simulation {
    let tick = Duration::from_millis(sim.config().tick_ms.max(1));
    let clock = Instant::now();
    let mut deadline = clock;
    log::info!("Simulation thread started ({} ms tick)", tick.as_millis());

    loop {
        let now = clock.elapsed().as_millis() as Millis;
        if !process_commands(&commands, &mut sim, now) {
            break;
        }

        let events = sim.step(now);
        publish(&frames, &overflow, sim.capture(now, events));

        deadline += tick;
        let wake = Instant::now();
        if deadline > wake {
            thread::sleep(deadline - wake);
        } else {
            // Fell behind, no catch-up burst
            deadline = wake;
        }
    }

    log::info!("Simulation thread stopped after {} ticks", sim.tick_count());
    sim
}
