//! The game event catalogue driven by the console.
//!
//! Component handles (rigid bodies, colliders, game objects) are plain numeric ids here.

use rusty_events::{Event, Registry};

use crate::command::{Args, ParseError};

#[derive(Clone, Debug, PartialEq, Event)]
pub enum GameEvent {
    GameStart {
        start_time: f32,
    },
    GameEnd {
        time_elapsed: f32,
    },
    RigidBodyCreated {
        body: u32,
    },
    ColliderCreated {
        collider: u32,
    },
    SoundCue {
        audio_event: i32,
    },
    UiSound {
        audio_event: i32,
    },
    AudioRtpcChange {
        rtpc: i32,
        value: f32,
        game_object: Option<u64>,
    },
    AudioSwitchChange {
        switch_group: i32,
        value: u32,
        game_object: Option<u64>,
    },
    AudioStateChange {
        state_group: i32,
        value: u32,
    },
    CollisionEnter {
        a: u32,
        b: u32,
        contacts: u32,
    },
    CollisionExit {
        a: u32,
        b: u32,
        contacts: u32,
    },
}

impl GameEvent {
    /// Parse `<Category> [fields...]`, fields given positionally in declaration order.
    pub(crate) fn parse(
        registry: &Registry<GameEventCategory>,
        args: &mut Args<'_>,
    ) -> Result<Self, ParseError> {
        let name = args.word("event category")?;
        let category = registry
            .lookup(name)
            .ok_or_else(|| ParseError::UnknownCategory(name.to_string()))?;

        let event = match category {
            GameEventCategory::GameStart => GameEvent::GameStart {
                start_time: args.required("start_time")?,
            },
            GameEventCategory::GameEnd => GameEvent::GameEnd {
                time_elapsed: args.required("time_elapsed")?,
            },
            GameEventCategory::RigidBodyCreated => GameEvent::RigidBodyCreated {
                body: args.required("body")?,
            },
            GameEventCategory::ColliderCreated => GameEvent::ColliderCreated {
                collider: args.required("collider")?,
            },
            GameEventCategory::SoundCue => GameEvent::SoundCue {
                audio_event: args.required("audio_event")?,
            },
            GameEventCategory::UiSound => GameEvent::UiSound {
                audio_event: args.required("audio_event")?,
            },
            GameEventCategory::AudioRtpcChange => GameEvent::AudioRtpcChange {
                rtpc: args.required("rtpc")?,
                value: args.required("value")?,
                game_object: args.optional("game_object")?,
            },
            GameEventCategory::AudioSwitchChange => GameEvent::AudioSwitchChange {
                switch_group: args.required("switch_group")?,
                value: args.required("value")?,
                game_object: args.optional("game_object")?,
            },
            GameEventCategory::AudioStateChange => GameEvent::AudioStateChange {
                state_group: args.required("state_group")?,
                value: args.required("value")?,
            },
            GameEventCategory::CollisionEnter => GameEvent::CollisionEnter {
                a: args.required("a")?,
                b: args.required("b")?,
                contacts: args.required("contacts")?,
            },
            GameEventCategory::CollisionExit => GameEvent::CollisionExit {
                a: args.required("a")?,
                b: args.required("b")?,
                contacts: args.required("contacts")?,
            },
        };
        Ok(event)
    }
}
