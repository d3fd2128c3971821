//! Bounded undo/redo history of channel topics.
//!
//! A topic is modeled as an ordered list of string segments, joined with
//! `" | "` on the wire. Every channel owns two bounded stacks: `undo`
//! holds prior states, `redo` holds reverted ones. A plain topic change
//! pushes the previous state onto `undo` and clears `redo`; undo and
//! redo move states between the two stacks. When a stack outgrows the
//! configured depth, the oldest entry is evicted first.
//!
//! Server echoes need care: the engine sends `TOPIC` and later observes
//! its own change coming back. Undo, redo, and the edit operations mark
//! the channel as "applying", so [`TopicHistory::observe`] only syncs the
//! current segments instead of recording a second history entry.

use std::collections::{HashMap, VecDeque};

use minnow_proto::irc_to_lower;

use crate::error::{Error, Result};

/// Separator between topic segments on the wire.
pub const TOPIC_SEPARATOR: &str = " | ";

#[derive(Debug, Default)]
struct ChannelTopic {
    current: Vec<String>,
    undo: VecDeque<Vec<String>>,
    redo: VecDeque<Vec<String>>,
    /// Set when the next observed change is our own undo/redo/edit echo.
    applying: bool,
}

/// Per-channel topic state with bounded undo/redo.
#[derive(Debug)]
pub struct TopicHistory {
    max_depth: usize,
    channels: HashMap<String, ChannelTopic>,
}

impl TopicHistory {
    /// Create an empty history with the given maximum stack depth.
    pub fn new(max_depth: usize) -> Self {
        TopicHistory {
            max_depth,
            channels: HashMap::new(),
        }
    }

    fn entry(&mut self, channel: &str) -> &mut ChannelTopic {
        self.channels.entry(irc_to_lower(channel)).or_default()
    }

    /// Current topic segments for a channel; empty when unknown.
    pub fn segments(&self, channel: &str) -> &[String] {
        self.channels
            .get(&irc_to_lower(channel))
            .map(|t| t.current.as_slice())
            .unwrap_or(&[])
    }

    /// Current topic joined for the wire.
    pub fn get(&self, channel: &str) -> String {
        self.segments(channel).join(TOPIC_SEPARATOR)
    }

    /// Record a plain topic change: push the previous state onto the undo
    /// stack, clear the redo stack, and install the new segments.
    pub fn record_change(&mut self, channel: &str, new_segments: Vec<String>) {
        let max = self.max_depth;
        let entry = self.entry(channel);
        let previous = std::mem::replace(&mut entry.current, new_segments);
        entry.undo.push_back(previous);
        trim(&mut entry.undo, max);
        entry.redo.clear();
    }

    /// Feed an externally-observed topic change (TOPIC command or the
    /// topic numeric on join). Our own undo/redo/edit echo only syncs the
    /// current segments; anything else is recorded as a plain change.
    pub fn observe(&mut self, channel: &str, wire_topic: &str) {
        let segments = split_wire(wire_topic);
        {
            let entry = self.entry(channel);
            if entry.applying {
                entry.applying = false;
                entry.current = segments;
                return;
            }
        }
        self.record_change(channel, segments);
    }

    /// Revert to the previous topic state.
    ///
    /// Returns the restored topic in wire form. Fails with
    /// [`Error::NoHistory`] on an empty undo stack, leaving everything
    /// unchanged.
    pub fn undo(&mut self, channel: &str) -> Result<String> {
        let max = self.max_depth;
        let entry = self.entry(channel);
        let restored = entry
            .undo
            .pop_back()
            .ok_or_else(|| Error::NoHistory(channel.to_owned()))?;
        let replaced = std::mem::replace(&mut entry.current, restored);
        entry.redo.push_back(replaced);
        trim(&mut entry.redo, max);
        entry.applying = true;
        Ok(entry.current.join(TOPIC_SEPARATOR))
    }

    /// Re-apply the most recently undone topic state. Mirror of
    /// [`TopicHistory::undo`].
    pub fn redo(&mut self, channel: &str) -> Result<String> {
        let max = self.max_depth;
        let entry = self.entry(channel);
        let restored = entry
            .redo
            .pop_back()
            .ok_or_else(|| Error::NoHistory(channel.to_owned()))?;
        let replaced = std::mem::replace(&mut entry.current, restored);
        entry.undo.push_back(replaced);
        trim(&mut entry.undo, max);
        entry.applying = true;
        Ok(entry.current.join(TOPIC_SEPARATOR))
    }

    /// Append a segment to the topic.
    pub fn add(&mut self, channel: &str, text: &str) -> String {
        let mut segments = self.segments(channel).to_vec();
        segments.push(text.to_owned());
        self.apply_edit(channel, segments)
    }

    /// Remove the segment at `index` (counted from 0).
    pub fn delete(&mut self, channel: &str, index: usize) -> Result<String> {
        let mut segments = self.segments(channel).to_vec();
        if index >= segments.len() {
            return Err(Error::BadIndex {
                index,
                len: segments.len(),
            });
        }
        segments.remove(index);
        Ok(self.apply_edit(channel, segments))
    }

    /// Replace the segment at `index` with new text.
    pub fn edit(&mut self, channel: &str, index: usize, text: &str) -> Result<String> {
        let mut segments = self.segments(channel).to_vec();
        if index >= segments.len() {
            return Err(Error::BadIndex {
                index,
                len: segments.len(),
            });
        }
        segments[index] = text.to_owned();
        Ok(self.apply_edit(channel, segments))
    }

    /// Replace every occurrence of `from` with `to` across all segments.
    pub fn replace_all(&mut self, channel: &str, from: &str, to: &str) -> String {
        let segments = self
            .segments(channel)
            .iter()
            .map(|s| s.replace(from, to))
            .collect();
        self.apply_edit(channel, segments)
    }

    /// Overwrite the whole topic with the given segments.
    pub fn set(&mut self, channel: &str, segments: Vec<String>) -> String {
        self.apply_edit(channel, segments)
    }

    /// Every edit goes through `record_change` so it is individually
    /// undoable; the applying flag keeps the server echo from recording
    /// the same change twice.
    fn apply_edit(&mut self, channel: &str, segments: Vec<String>) -> String {
        self.record_change(channel, segments);
        let entry = self.entry(channel);
        entry.applying = true;
        entry.current.join(TOPIC_SEPARATOR)
    }
}

fn trim(stack: &mut VecDeque<Vec<String>>, max: usize) {
    while stack.len() > max {
        stack.pop_front();
    }
}

/// Split a wire topic into segments: split on `|`, trim whitespace, drop
/// empties.
fn split_wire(topic: &str) -> Vec<String> {
    topic
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
