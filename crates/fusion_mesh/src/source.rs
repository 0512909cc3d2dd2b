//! Point sources feeding observations into the fusion core.
//!
//! The core only ever pulls from a [`PointSource`] on its own thread. Sensors
//! that produce samples on another thread hand them over through
//! [`channel`]: the sensor side owns an [`ObservationSender`], the fusion side
//! a [`ChannelSource`].
//!
//! ```text
//!   sensor thread                         fusion thread
//!   ─────────────                         ─────────────
//!   sender.send_batch(frame) ──channel──▶ manager.drain_source(&mut source)
//! ```

use std::collections::VecDeque;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use crate::types::Observation;

/// Supplier of observations, drained in order once per tick.
pub trait PointSource {
  /// Next pending observation, or `None` when nothing is available now.
  fn next_observation(&mut self) -> Option<Observation>;
}

/// In-memory FIFO of observations.
#[derive(Debug, Default, Clone)]
pub struct BufferedSource {
  pending: VecDeque<Observation>,
}

impl BufferedSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, observation: Observation) {
    self.pending.push_back(observation);
  }

  pub fn len(&self) -> usize {
    self.pending.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }
}

impl Extend<Observation> for BufferedSource {
  fn extend<I: IntoIterator<Item = Observation>>(&mut self, iter: I) {
    self.pending.extend(iter);
  }
}

impl FromIterator<Observation> for BufferedSource {
  fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
    Self {
      pending: iter.into_iter().collect(),
    }
  }
}

impl PointSource for BufferedSource {
  fn next_observation(&mut self) -> Option<Observation> {
    self.pending.pop_front()
  }
}

/// Sensor-side half of a [`channel`].
#[derive(Debug, Clone)]
pub struct ObservationSender {
  sender: Sender<Vec<Observation>>,
}

impl ObservationSender {
  /// Hand over one frame of observations.
  ///
  /// Returns false when the fusion side has been dropped.
  pub fn send_batch(&self, batch: Vec<Observation>) -> bool {
    if batch.is_empty() {
      return true;
    }
    self.sender.send(batch).is_ok()
  }
}

/// Fusion-side half of a [`channel`].
#[derive(Debug)]
pub struct ChannelSource {
  receiver: Receiver<Vec<Observation>>,
  current: VecDeque<Observation>,
  disconnected: bool,
}

impl ChannelSource {
  /// True once every sender is gone and all batches were consumed.
  pub fn is_finished(&self) -> bool {
    self.disconnected && self.current.is_empty() && self.receiver.is_empty()
  }
}

impl PointSource for ChannelSource {
  fn next_observation(&mut self) -> Option<Observation> {
    loop {
      if let Some(observation) = self.current.pop_front() {
        return Some(observation);
      }
      match self.receiver.try_recv() {
        Ok(batch) => self.current.extend(batch),
        Err(TryRecvError::Empty) => return None,
        Err(TryRecvError::Disconnected) => {
          self.disconnected = true;
          return None;
        }
      }
    }
  }
}

/// Single-writer/single-reader handoff for observations produced off-thread.
///
/// `capacity` bounds the number of frames in flight; a full channel blocks
/// the sensor side.
pub fn channel(capacity: usize) -> (ObservationSender, ChannelSource) {
  let (sender, receiver) = bounded(capacity.max(1));
  (
    ObservationSender { sender },
    ChannelSource {
      receiver,
      current: VecDeque::new(),
      disconnected: false,
    },
  )
}

#[cfg(test)]
#[path = "source_test.rs"]
mod source_test;
