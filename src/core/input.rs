//! Editor input events and the per-tick input queue.
//!
//! The surrounding shell translates its native window events into
//! [`EditorEvent`]s and pushes them here; the edit session drains the queue
//! once per tick. Every button and key transition is processed in arrival
//! order, while only the final pointer position of a tick is used for
//! picking.

use std::collections::VecDeque;

/// Pointer buttons the editor reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Keys the editor binds actions to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorKey {
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    KeyZ,
    KeyY,
    Shift,
    Control,
}

/// A single input event delivered by the editor shell
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditorEvent {
    PointerMoved { x: f32, y: f32 },
    PointerPressed { button: PointerButton, x: f32, y: f32 },
    PointerReleased { button: PointerButton, x: f32, y: f32 },
    /// Wheel rotation; positive is away from the user
    Scroll { delta: f32 },
    KeyPressed { key: EditorKey, ctrl: bool },
    KeyReleased { key: EditorKey },
}

/// FIFO queue of editor events, drained once per tick
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<EditorEvent>,
}

impl InputQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Push an event from the shell
    pub fn push(&mut self, event: EditorEvent) {
        self.events.push_back(event);
    }

    /// Pop the oldest queued event
    pub fn pop(&mut self) -> Option<EditorEvent> {
        self.events.pop_front()
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all queued events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = InputQueue::new();
        queue.push(EditorEvent::PointerMoved { x: 1.0, y: 1.0 });
        queue.push(EditorEvent::PointerPressed {
            button: PointerButton::Primary,
            x: 1.0,
            y: 1.0,
        });

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop(),
            Some(EditorEvent::PointerMoved { x: 1.0, y: 1.0 })
        );
        assert_eq!(
            queue.pop(),
            Some(EditorEvent::PointerPressed {
                button: PointerButton::Primary,
                x: 1.0,
                y: 1.0,
            })
        );
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut queue = InputQueue::new();
        queue.push(EditorEvent::Scroll { delta: 1.0 });
        queue.clear();
        assert!(queue.is_empty());
    }
}
