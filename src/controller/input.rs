/// Platform-agnostic input handling system
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Platform-independent input events.
///
/// Key codes are physical key names such as `"KeyW"` or `"ShiftLeft"`;
/// browser `KeyboardEvent.code` and winit `KeyCode` debug names agree.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard events
    KeyDown(String),
    KeyUp(String),

    // Mouse events
    MouseMove { dx: f32, dy: f32 },
    /// Browser convention: positive is scrolling down.
    MouseWheel { delta_y: f32 },

    // Window events
    FocusLost,
    VisibilityChanged { visible: bool },
    PointerLockChanged { locked: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveIntent {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Currently held movement intents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveFlags {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveFlags {
    pub fn set(&mut self, intent: MoveIntent, held: bool) {
        match intent {
            MoveIntent::Forward => self.forward = held,
            MoveIntent::Backward => self.backward = held,
            MoveIntent::Left => self.left = held,
            MoveIntent::Right => self.right = held,
            MoveIntent::Up => self.up = held,
            MoveIntent::Down => self.down = held,
        }
    }
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: Vec<String>,
    pub backward: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub release_pointer: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let keys = |ks: &[&str]| -> Vec<String> { ks.iter().map(|k| k.to_string()).collect() };
        Self {
            forward: keys(&["KeyW", "ArrowUp"]),
            backward: keys(&["KeyS", "ArrowDown"]),
            left: keys(&["KeyA", "ArrowLeft"]),
            right: keys(&["KeyD", "ArrowRight"]),
            up: keys(&["Space"]),
            down: keys(&["ShiftLeft", "ShiftRight"]),
            release_pointer: "Escape".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn intent_for(&self, code: &str) -> Option<MoveIntent> {
        let table = [
            (&self.forward, MoveIntent::Forward),
            (&self.backward, MoveIntent::Backward),
            (&self.left, MoveIntent::Left),
            (&self.right, MoveIntent::Right),
            (&self.up, MoveIntent::Up),
            (&self.down, MoveIntent::Down),
        ];
        table
            .into_iter()
            .find(|(codes, _)| codes.iter().any(|c| c == code))
            .map(|(_, intent)| intent)
    }

    pub fn is_release_pointer(&self, code: &str) -> bool {
        code == self.release_pointer
    }

    /// Codes whose browser default action (scrolling) should be suppressed.
    pub fn is_navigation(&self, code: &str) -> bool {
        self.intent_for(code).is_some()
    }
}

/// Movement intents, scroll speed and pointer capture for one session.
#[derive(Debug, Clone)]
pub struct InputState {
    pub moves: MoveFlags,
    pub speed: f32,
    pub look_delta: (f32, f32),
    pub pointer_locked: bool,
    pub bindings: KeyBindings,
}

impl InputState {
    pub fn new(initial_speed: f32) -> Self {
        Self {
            moves: MoveFlags::default(),
            speed: initial_speed,
            look_delta: (0.0, 0.0),
            pointer_locked: false,
            bindings: KeyBindings::default(),
        }
    }

    pub fn on_key_down(&mut self, code: &str) {
        if let Some(intent) = self.bindings.intent_for(code) {
            self.moves.set(intent, true);
        }
    }

    pub fn on_key_up(&mut self, code: &str) {
        if let Some(intent) = self.bindings.intent_for(code) {
            self.moves.set(intent, false);
        }
    }

    /// Scroll up speeds up, scroll down slows down. The guard runs before
    /// the step and the floor clamp after it, so a speed sitting at 1 drops
    /// to 0 and is clamped straight back to 1.
    pub fn on_scroll(&mut self, delta_y: f32) {
        if self.speed >= 1.0 {
            self.speed += sign(-delta_y);
        }
        if self.speed <= 0.0 {
            self.speed = 1.0;
        }
    }

    /// Process an input event and update state.
    ///
    /// Returns the new pointer-lock state when it actually changed.
    pub fn process_event(&mut self, event: &InputEvent) -> Option<bool> {
        match event {
            InputEvent::KeyDown(code) => self.on_key_down(code),
            InputEvent::KeyUp(code) => self.on_key_up(code),
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta.0 += dx;
                    self.look_delta.1 += dy;
                }
            }
            InputEvent::MouseWheel { delta_y } => self.on_scroll(*delta_y),
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => self.clear_keys(),
            InputEvent::PointerLockChanged { locked } => {
                if self.pointer_locked != *locked {
                    self.pointer_locked = *locked;
                    if !locked {
                        self.look_delta = (0.0, 0.0);
                    }
                    return Some(*locked);
                }
            }
        }
        None
    }

    pub fn clear_keys(&mut self) {
        self.moves = MoveFlags::default();
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        let result = self.look_delta;
        self.look_delta = (0.0, 0.0);
        result
    }
}

/// `Math.sign` semantics: zero stays zero.
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// FIFO shared between platform callbacks (producers) and the frame loop
/// (consumer). Single-threaded; clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue(Rc<RefCell<VecDeque<InputEvent>>>);

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InputEvent) {
        self.0.borrow_mut().push_back(event);
    }

    pub fn drain(&self) -> Vec<InputEvent> {
        self.0.borrow_mut().drain(..).collect()
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, WheelEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let code = e.code();
        if is_down {
            InputEvent::KeyDown(code)
        } else {
            InputEvent::KeyUp(code)
        }
    }

    pub fn mouse_move_to_input(dx: f32, dy: f32) -> InputEvent {
        InputEvent::MouseMove { dx, dy }
    }

    pub fn mouse_wheel_to_input(e: &WheelEvent) -> InputEvent {
        InputEvent::MouseWheel { delta_y: e.delta_y() as f32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_and_up_toggle_intent() {
        let mut input = InputState::new(10.0);
        input.on_key_down("KeyW");
        assert!(input.moves.forward);
        input.on_key_up("KeyW");
        assert!(!input.moves.forward);
    }

    #[test]
    fn arrow_keys_alias_wasd() {
        let mut input = InputState::new(10.0);
        for code in ["ArrowUp", "ArrowDown", "ArrowLeft", "ArrowRight"] {
            input.on_key_down(code);
        }
        assert!(input.moves.forward && input.moves.backward && input.moves.left && input.moves.right);
        assert!(!input.moves.up && !input.moves.down);
    }

    #[test]
    fn unknown_codes_are_ignored() {
        let mut input = InputState::new(10.0);
        input.on_key_down("KeyQ");
        input.on_key_up("F13");
        input.on_key_down("");
        assert_eq!(input.moves, MoveFlags::default());
    }

    #[test]
    fn scroll_up_increments_and_down_decrements() {
        let mut input = InputState::new(10.0);
        input.on_scroll(-120.0);
        assert_eq!(input.speed, 11.0);
        input.on_scroll(53.0);
        input.on_scroll(1.0);
        assert_eq!(input.speed, 9.0);
    }

    #[test]
    fn zero_scroll_is_a_no_op() {
        let mut input = InputState::new(4.0);
        input.on_scroll(0.0);
        assert_eq!(input.speed, 4.0);
    }

    #[test]
    fn speed_at_floor_is_clamped_back_to_one() {
        let mut input = InputState::new(1.0);
        input.on_scroll(100.0);
        assert_eq!(input.speed, 1.0);
        input.on_scroll(-100.0);
        assert_eq!(input.speed, 2.0);
    }

    #[test]
    fn fractional_speed_below_one_is_frozen_by_guard() {
        let mut input = InputState::new(0.5);
        input.on_scroll(-100.0);
        assert_eq!(input.speed, 0.5);
    }

    #[test]
    fn speed_never_drops_below_one_after_scrolling() {
        let mut input = InputState::new(3.0);
        let deltas = [100.0, 100.0, 100.0, 100.0, 100.0, -1.0, 100.0, 100.0, -3.0, -3.0, 7.0];
        for d in deltas {
            input.on_scroll(d);
            assert!(input.speed >= 1.0, "speed fell to {}", input.speed);
        }
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut input = InputState::new(10.0);
        input.process_event(&InputEvent::KeyDown("KeyW".into()));
        input.process_event(&InputEvent::KeyDown("Space".into()));
        input.process_event(&InputEvent::FocusLost);
        assert_eq!(input.moves, MoveFlags::default());

        input.process_event(&InputEvent::KeyDown("KeyA".into()));
        input.process_event(&InputEvent::VisibilityChanged { visible: false });
        assert_eq!(input.moves, MoveFlags::default());
    }

    #[test]
    fn lock_change_reported_only_on_transition() {
        let mut input = InputState::new(10.0);
        assert_eq!(input.process_event(&InputEvent::PointerLockChanged { locked: true }), Some(true));
        assert_eq!(input.process_event(&InputEvent::PointerLockChanged { locked: true }), None);
        assert_eq!(input.process_event(&InputEvent::PointerLockChanged { locked: false }), Some(false));
        assert_eq!(input.process_event(&InputEvent::PointerLockChanged { locked: false }), None);
    }

    #[test]
    fn look_accumulates_only_while_locked() {
        let mut input = InputState::new(10.0);
        input.process_event(&InputEvent::MouseMove { dx: 5.0, dy: 1.0 });
        assert_eq!(input.consume_look(), (0.0, 0.0));

        input.process_event(&InputEvent::PointerLockChanged { locked: true });
        input.process_event(&InputEvent::MouseMove { dx: 5.0, dy: 1.0 });
        input.process_event(&InputEvent::MouseMove { dx: -2.0, dy: 3.0 });
        assert_eq!(input.consume_look(), (3.0, 4.0));
        assert_eq!(input.consume_look(), (0.0, 0.0));
    }

    #[test]
    fn wheel_event_drives_speed() {
        let mut input = InputState::new(10.0);
        input.process_event(&InputEvent::MouseWheel { delta_y: -3.0 });
        assert_eq!(input.speed, 11.0);
    }

    #[test]
    fn event_queue_is_shared_and_drains_in_order() {
        let queue = EventQueue::new();
        let producer = queue.clone();
        producer.push(InputEvent::KeyDown("KeyW".into()));
        producer.push(InputEvent::FocusLost);
        let drained = queue.drain();
        assert_eq!(drained, vec![InputEvent::KeyDown("KeyW".into()), InputEvent::FocusLost]);
        assert!(producer.drain().is_empty());
    }

    #[test]
    fn release_key_and_navigation_codes() {
        let bindings = KeyBindings::default();
        assert!(bindings.is_release_pointer("Escape"));
        assert!(bindings.is_navigation("Space"));
        assert!(!bindings.is_navigation("KeyP"));
    }
}
