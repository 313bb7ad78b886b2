//! Collision and trigger event bridge
//!
//! Rapier reports started/stopped events per collider pair from inside the step.
//! The collector forwards them over a channel; after the step the bridge folds
//! them into per-entity-pair enter/exit events, resolves both sides against the
//! scene world and hands the survivors to the registered sink.

use crossbeam_channel::{Receiver, Sender};
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::types::PhysicsEventType;
use crate::ecs::World;

/// Receiver of resolved events: `(event type, entity a, entity b)`.
///
/// Trigger events are ordered `(other, trigger)`.
pub type EventSink = Box<dyn FnMut(PhysicsEventType, Uuid, Uuid)>;

/// One collider-pair event as reported by rapier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawContactEvent {
    pub started: bool,
    pub is_trigger: bool,
    /// Entity bits of the first actor (the non-trigger side for triggers)
    pub actor_a: u128,
    /// Entity bits of the second actor (the trigger side for triggers)
    pub actor_b: u128,
}

/// Rapier event handler that queues raw events on a channel
pub(crate) struct ChannelEventCollector {
    sender: Sender<RawContactEvent>,
}

impl EventHandler for ChannelEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        // Colliders removed this step are already gone from the set
        let (Some(c1), Some(c2)) = (
            colliders.get(event.collider1()),
            colliders.get(event.collider2()),
        ) else {
            return;
        };

        let is_trigger = event.sensor();
        let (actor_a, actor_b) = if is_trigger && c1.is_sensor() && !c2.is_sensor() {
            (c2.user_data, c1.user_data)
        } else {
            (c1.user_data, c2.user_data)
        };

        let _ = self.sender.send(RawContactEvent {
            started: event.started(),
            is_trigger,
            actor_a,
            actor_b,
        });
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

type PairKey = (u128, u128, bool);

/// Turns raw collider-pair events into resolved entity events
pub struct EventBridge {
    sender: Sender<RawContactEvent>,
    receiver: Receiver<RawContactEvent>,
    /// Touching collider pairs per entity pair
    active_pairs: FxHashMap<PairKey, u32>,
    pending: Vec<(PhysicsEventType, u128, u128)>,
    sink: Option<EventSink>,
}

impl EventBridge {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            active_pairs: FxHashMap::default(),
            pending: Vec::new(),
            sink: None,
        }
    }

    /// Register the single event sink, replacing any previous one
    pub fn set_sink(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Handler passed into the native step
    pub(crate) fn collector(&self) -> ChannelEventCollector {
        ChannelEventCollector {
            sender: self.sender.clone(),
        }
    }

    /// Drop events queued outside a step
    pub fn clear(&mut self) {
        while self.receiver.try_recv().is_ok() {}
        self.pending.clear();
    }

    /// Forget every touching pair involving `entity`.
    ///
    /// Called when a body leaves the scene, since rapier cannot report who it
    /// was touching once its colliders are gone.
    pub fn forget(&mut self, entity: Uuid) {
        let bits = entity.as_u128();
        self.active_pairs
            .retain(|&(a, b, _), _| a != bits && b != bits);
    }

    /// Number of entity pairs currently touching
    pub fn active_pair_count(&self) -> usize {
        self.active_pairs.len()
    }

    /// Fold queued raw events into enter/exit events
    pub fn collect(&mut self) {
        while let Ok(raw) = self.receiver.try_recv() {
            // Compound bodies report once per collider pair
            let key = if raw.is_trigger {
                (raw.actor_a, raw.actor_b, true)
            } else {
                (raw.actor_a.min(raw.actor_b), raw.actor_a.max(raw.actor_b), false)
            };

            let event_type = if raw.started {
                let count = self.active_pairs.entry(key).or_insert(0);
                *count += 1;
                if *count > 1 {
                    continue;
                }
                if raw.is_trigger {
                    PhysicsEventType::TriggerEnter
                } else {
                    PhysicsEventType::CollisionEnter
                }
            } else {
                let Some(count) = self.active_pairs.get_mut(&key) else {
                    continue;
                };
                *count -= 1;
                if *count > 0 {
                    continue;
                }
                self.active_pairs.remove(&key);
                if raw.is_trigger {
                    PhysicsEventType::TriggerExit
                } else {
                    PhysicsEventType::CollisionExit
                }
            };

            self.pending.push((event_type, raw.actor_a, raw.actor_b));
        }
    }

    /// Resolve pending events and forward them to the sink.
    ///
    /// Events whose entities no longer exist in `world` are dropped.
    pub fn dispatch(&mut self, world: &World) {
        for (event_type, a, b) in self.pending.drain(..) {
            let (a, b) = (Uuid::from_u128(a), Uuid::from_u128(b));
            if world.try_entity_with_uuid(a).is_none() || world.try_entity_with_uuid(b).is_none() {
                log::trace!("Dropping {event_type:?} between {a} and {b}: entity gone");
                continue;
            }

            log::trace!("{event_type:?}: {a} <-> {b}");
            if let Some(sink) = self.sink.as_mut() {
                sink(event_type, a, b);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn push_raw(&self, event: RawContactEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    type Log = Rc<RefCell<Vec<(PhysicsEventType, Uuid, Uuid)>>>;

    fn bridge_with_log() -> (EventBridge, Log) {
        let log: Log = Rc::default();
        let mut bridge = EventBridge::new();
        let sink_log = Rc::clone(&log);
        bridge.set_sink(Box::new(move |event, a, b| {
            sink_log.borrow_mut().push((event, a, b));
        }));
        (bridge, log)
    }

    fn raw(started: bool, is_trigger: bool, a: Uuid, b: Uuid) -> RawContactEvent {
        RawContactEvent {
            started,
            is_trigger,
            actor_a: a.as_u128(),
            actor_b: b.as_u128(),
        }
    }

    #[test]
    fn test_enter_and_exit_are_dispatched() {
        let mut world = World::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        world.spawn_with_uuid(a, ());
        world.spawn_with_uuid(b, ());
        let (mut bridge, log) = bridge_with_log();

        bridge.push_raw(raw(true, false, a, b));
        bridge.collect();
        bridge.dispatch(&world);
        bridge.push_raw(raw(false, false, a, b));
        bridge.collect();
        bridge.dispatch(&world);

        assert_eq!(
            *log.borrow(),
            vec![
                (PhysicsEventType::CollisionEnter, a, b),
                (PhysicsEventType::CollisionExit, a, b),
            ]
        );
        assert_eq!(bridge.active_pair_count(), 0);
    }

    #[test]
    fn test_half_dead_pair_is_dropped() {
        let mut world = World::new();
        let alive = Uuid::new_v4();
        world.spawn_with_uuid(alive, ());
        let dead = Uuid::new_v4();
        let (mut bridge, log) = bridge_with_log();

        bridge.push_raw(raw(true, false, alive, dead));
        bridge.collect();
        bridge.dispatch(&world);

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_compound_pairs_fire_once() {
        let mut world = World::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        world.spawn_with_uuid(a, ());
        world.spawn_with_uuid(b, ());
        let (mut bridge, log) = bridge_with_log();

        // Two child colliders of `a` touching `b`, reported in either order
        bridge.push_raw(raw(true, false, a, b));
        bridge.push_raw(raw(true, false, b, a));
        bridge.push_raw(raw(false, false, a, b));
        bridge.collect();
        bridge.dispatch(&world);
        assert_eq!(log.borrow().len(), 1);

        bridge.push_raw(raw(false, false, b, a));
        bridge.collect();
        bridge.dispatch(&world);
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(log.borrow()[1].0, PhysicsEventType::CollisionExit);
    }

    #[test]
    fn test_trigger_events_keep_other_then_trigger_order() {
        let mut world = World::new();
        let other = Uuid::new_v4();
        let trigger = Uuid::new_v4();
        world.spawn_with_uuid(other, ());
        world.spawn_with_uuid(trigger, ());
        let (mut bridge, log) = bridge_with_log();

        bridge.push_raw(raw(true, true, other, trigger));
        bridge.push_raw(raw(false, true, other, trigger));
        bridge.collect();
        bridge.dispatch(&world);

        assert_eq!(
            *log.borrow(),
            vec![
                (PhysicsEventType::TriggerEnter, other, trigger),
                (PhysicsEventType::TriggerExit, other, trigger),
            ]
        );
    }

    #[test]
    fn test_forget_drops_active_pairs() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (mut bridge, _log) = bridge_with_log();

        bridge.push_raw(raw(true, false, a, b));
        bridge.collect();
        assert_eq!(bridge.active_pair_count(), 1);

        bridge.forget(b);
        assert_eq!(bridge.active_pair_count(), 0);
    }
}
