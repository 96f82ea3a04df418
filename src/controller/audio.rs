//! Audio playback driven by pointer-capture transitions.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioChannel {
    /// Non-spatial background loop.
    Ambient,
    /// Loop attached to a point in the world.
    Positional,
}

pub trait AudioEngine {
    fn play(&mut self, channel: AudioChannel);
    fn pause(&mut self, channel: AudioChannel);

    /// Move the listener with the camera. Engines without spatial output
    /// ignore this.
    fn set_listener(&mut self, _position: Vec3, _forward: Vec3, _up: Vec3) {}
}

/// Engine for platforms without audio output; only logs.
#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioEngine for SilentAudio {
    fn play(&mut self, channel: AudioChannel) {
        tracing::debug!(?channel, "play (silent)");
    }

    fn pause(&mut self, channel: AudioChannel) {
        tracing::debug!(?channel, "pause (silent)");
    }
}

/// Plays every channel when the pointer gets captured and pauses them when
/// it is released.
pub struct AudioDirector {
    engine: Box<dyn AudioEngine>,
    channels: Vec<AudioChannel>,
    playing: bool,
}

impl AudioDirector {
    pub fn new(engine: Box<dyn AudioEngine>) -> Self {
        Self {
            engine,
            channels: vec![AudioChannel::Ambient, AudioChannel::Positional],
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn on_lock_changed(&mut self, locked: bool) {
        if locked == self.playing {
            return;
        }
        self.playing = locked;
        for &channel in &self.channels {
            if locked {
                self.engine.play(channel);
            } else {
                self.engine.pause(channel);
            }
        }
    }

    pub fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.engine.set_listener(position, forward, up);
    }
}

#[cfg(target_arch = "wasm32")]
pub mod web {
    use super::*;
    use wasm_bindgen::JsValue;
    use web_sys::{
        AudioContext, DistanceModelType, HtmlAudioElement, PannerNode, PanningModelType,
    };

    use crate::config::AudioSettings;

    /// Web Audio backed engine: an `<audio>` element for the ambient loop
    /// and a panner-routed element for the positional loop.
    pub struct WebAudio {
        ctx: AudioContext,
        ambient: HtmlAudioElement,
        positional: HtmlAudioElement,
        _panner: PannerNode,
    }

    impl WebAudio {
        pub fn new(settings: &AudioSettings) -> Result<Self, JsValue> {
            let ctx = AudioContext::new()?;

            let ambient = HtmlAudioElement::new_with_src(&settings.ambient_path)?;
            ambient.set_loop(true);
            ambient.set_volume(settings.volume as f64);

            let positional = HtmlAudioElement::new_with_src(&settings.positional_path)?;
            positional.set_loop(true);
            positional.set_volume(settings.volume as f64);

            let panner = PannerNode::new(&ctx)?;
            panner.set_panning_model(PanningModelType::Hrtf);
            panner.set_distance_model(DistanceModelType::Inverse);
            panner.set_ref_distance(20.0);
            panner.set_max_distance(1000.0);
            let e = settings.emitter;
            panner.set_position(e.x as f64, e.y as f64, e.z as f64);

            let source = ctx.create_media_element_source(&positional)?;
            source.connect_with_audio_node(&panner)?;
            panner.connect_with_audio_node(&ctx.destination())?;

            Ok(Self { ctx, ambient, positional, _panner: panner })
        }

        fn element(&self, channel: AudioChannel) -> &HtmlAudioElement {
            match channel {
                AudioChannel::Ambient => &self.ambient,
                AudioChannel::Positional => &self.positional,
            }
        }
    }

    impl AudioEngine for WebAudio {
        fn play(&mut self, channel: AudioChannel) {
            // Contexts start suspended until a user gesture has happened.
            if let Err(e) = self.ctx.resume() {
                tracing::warn!("audio context resume failed: {e:?}");
            }
            if let Err(e) = self.element(channel).play() {
                tracing::warn!(?channel, "audio play failed: {e:?}");
            }
        }

        fn pause(&mut self, channel: AudioChannel) {
            if let Err(e) = self.element(channel).pause() {
                tracing::warn!(?channel, "audio pause failed: {e:?}");
            }
        }

        fn set_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
            let listener = self.ctx.listener();
            listener.set_position(position.x as f64, position.y as f64, position.z as f64);
            listener.set_orientation(
                forward.x as f64,
                forward.y as f64,
                forward.z as f64,
                up.x as f64,
                up.y as f64,
                up.z as f64,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<(&'static str, AudioChannel)>>>);

    impl AudioEngine for Recorder {
        fn play(&mut self, channel: AudioChannel) {
            self.0.borrow_mut().push(("play", channel));
        }
        fn pause(&mut self, channel: AudioChannel) {
            self.0.borrow_mut().push(("pause", channel));
        }
    }

    #[test]
    fn lock_plays_all_channels_and_unlock_pauses_them() {
        let rec = Recorder::default();
        let mut director = AudioDirector::new(Box::new(rec.clone()));

        director.on_lock_changed(true);
        assert!(director.is_playing());
        director.on_lock_changed(false);
        assert!(!director.is_playing());

        assert_eq!(
            *rec.0.borrow(),
            vec![
                ("play", AudioChannel::Ambient),
                ("play", AudioChannel::Positional),
                ("pause", AudioChannel::Ambient),
                ("pause", AudioChannel::Positional),
            ]
        );
    }

    #[test]
    fn repeated_state_is_ignored() {
        let rec = Recorder::default();
        let mut director = AudioDirector::new(Box::new(rec.clone()));
        director.on_lock_changed(false);
        director.on_lock_changed(true);
        director.on_lock_changed(true);
        assert_eq!(rec.0.borrow().len(), 2);
    }

    #[test]
    fn silent_engine_accepts_everything() {
        let mut director = AudioDirector::new(Box::new(SilentAudio));
        director.on_lock_changed(true);
        director.update_listener(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        director.on_lock_changed(false);
        assert!(!director.is_playing());
    }
}
