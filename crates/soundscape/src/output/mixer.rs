//! Render-thread mixer
//!
//! The mixer is the single `Source` handed to the output stream. It owns every
//! live node, sums them into their bus, applies bus and master gains, and
//! drops nodes once they finish, fade out, or are released by their owner.

use super::{Bus, BusGains};
use crate::dsp::Signal;
use crate::node::{NodeControl, NodeId};
use rodio::Source;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Messages from the control thread to the render thread
pub(crate) enum GraphCommand {
    /// Start rendering a node
    Add(GraphNode),
}

/// A node as the render thread sees it
pub(crate) struct GraphNode {
    pub(crate) id: NodeId,
    pub(crate) bus: Bus,
    pub(crate) signal: Box<dyn Signal>,
    pub(crate) control: Arc<NodeControl>,
    fade: Option<FadeOut>,
}

impl GraphNode {
    pub(crate) fn new(id: NodeId, bus: Bus, signal: Box<dyn Signal>, control: Arc<NodeControl>) -> Self {
        Self { id, bus, signal, control, fade: None }
    }
}

/// Linear ramp to silence started by `stop()`
#[derive(Debug, Clone, Copy)]
struct FadeOut {
    gain: f32,
    step: f32,
}

/// Infinite mono source mixing every live node
pub struct MixerSource {
    commands: Receiver<GraphCommand>,
    nodes: Vec<GraphNode>,
    gains: Arc<BusGains>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    block: Vec<f32>,
    bus_buffers: [Vec<f32>; Bus::COUNT],
    cursor: usize,
    last_master: f32,
    last_bus: [f32; Bus::COUNT],
}

impl MixerSource {
    pub(crate) fn new(
        commands: Receiver<GraphCommand>,
        gains: Arc<BusGains>,
        clock: Arc<AtomicU64>,
        sample_rate: u32,
        block_size: usize,
    ) -> Self {
        let block_size = block_size.max(16);
        let last_bus = Bus::ALL.map(|bus| gains.bus(bus));
        Self {
            commands,
            nodes: Vec::new(),
            last_master: gains.master(),
            gains,
            clock,
            sample_rate,
            block: vec![0.0; block_size],
            bus_buffers: std::array::from_fn(|_| vec![0.0; block_size]),
            cursor: block_size,
            last_bus,
        }
    }

    /// Number of nodes currently being rendered
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(GraphCommand::Add(node)) => self.nodes.push(node),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Render the next block into `self.block`
    fn render_block(&mut self) {
        self.drain_commands();

        let len = self.block.len();
        for buffer in &mut self.bus_buffers {
            buffer.fill(0.0);
        }

        let sample_rate = self.sample_rate as f32;
        for node in &mut self.nodes {
            if node.control.is_released() {
                continue;
            }
            if node.fade.is_none() {
                if let Some(seconds) = node.control.stop_request() {
                    node.fade = Some(FadeOut { gain: 1.0, step: 1.0 / (seconds * sample_rate).max(1.0) });
                }
            }

            let buffer = &mut self.bus_buffers[node.bus.index()];
            for out in buffer.iter_mut() {
                let mut sample = node.signal.next_sample();
                if let Some(fade) = node.fade.as_mut() {
                    sample *= fade.gain;
                    fade.gain = (fade.gain - fade.step).max(0.0);
                }
                *out += sample;
            }
        }

        self.nodes.retain(|node| {
            let faded = node.fade.is_some_and(|fade| fade.gain <= 0.0);
            let done = faded || node.control.is_released() || node.signal.is_finished();
            if done {
                node.control.mark_finished();
                log::trace!("Mixer dropped node {:?}", node.id);
            }
            !done
        });

        // Interpolate gain changes across the block
        let target_master = self.gains.master();
        let target_bus = Bus::ALL.map(|bus| self.gains.bus(bus));
        for (i, out) in self.block.iter_mut().enumerate() {
            let t = (i + 1) as f32 / len as f32;
            let master = self.last_master + (target_master - self.last_master) * t;
            let mut sum = 0.0;
            for bus in Bus::ALL {
                let idx = bus.index();
                let gain = self.last_bus[idx] + (target_bus[idx] - self.last_bus[idx]) * t;
                sum += self.bus_buffers[idx][i] * gain;
            }
            *out = (sum * master).clamp(-1.0, 1.0);
        }
        self.last_master = target_master;
        self.last_bus = target_bus;

        self.clock.fetch_add(len as u64, Ordering::Relaxed);
        self.cursor = 0;
    }
}

impl Iterator for MixerSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.cursor >= self.block.len() {
            self.render_block();
        }
        let sample = self.block[self.cursor];
        self.cursor += 1;
        Some(sample)
    }
}

impl Source for MixerSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
