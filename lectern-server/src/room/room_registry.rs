use crate::config::RoomConfig;
use crate::room::room_coordinator::RoomCoordinator;
use crate::room::room_event::RoomEvent;
use crate::room::room_handle::RoomHandle;
use crate::signaling::{MediaRelay, NoopMediaRelay};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lectern_core::RoomId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

const EVENT_STREAM_CAPACITY: usize = 1024;

struct RegistryInner {
    rooms: DashMap<RoomId, RoomHandle>,
    config: RoomConfig,
    media_relay: Arc<dyn MediaRelay>,
    events: broadcast::Sender<RoomEvent>,
    coordinators_started: AtomicU64,
}

/// Process-wide map of room id to coordinator handle.
///
/// Every operation holds a map shard lock only for a single O(1) lookup,
/// insert or removal.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig, media_relay: Arc<dyn MediaRelay>) -> Self {
        let (events, _) = broadcast::channel(EVENT_STREAM_CAPACITY);

        Self {
            inner: Arc::new(RegistryInner {
                rooms: DashMap::new(),
                config,
                media_relay,
                events,
                coordinators_started: AtomicU64::new(0),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RoomConfig::default(), Arc::new(NoopMediaRelay))
    }

    pub fn config(&self) -> &RoomConfig {
        &self.inner.config
    }

    pub(crate) fn media_relay(&self) -> Arc<dyn MediaRelay> {
        self.inner.media_relay.clone()
    }

    /// Returns the room's coordinator, starting one if the room does not exist.
    ///
    /// Concurrent callers with the same new id all receive the same handle;
    /// exactly one coordinator is started.
    pub fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.inner.rooms.get(room_id) {
            return handle.value().clone();
        }

        let (handle, coordinator) = match self.inner.rooms.entry(room_id.clone()) {
            Entry::Occupied(entry) => return entry.get().clone(),
            Entry::Vacant(entry) => {
                let (tx, rx) = mpsc::channel(self.inner.config.command_queue);
                let handle =
                    RoomHandle::new(room_id.clone(), tx, self.inner.config.outbound_queue);
                let coordinator =
                    RoomCoordinator::new(room_id.clone(), handle.instance(), rx, self.clone());
                entry.insert(handle.clone());
                (handle, coordinator)
            }
        };

        self.inner
            .coordinators_started
            .fetch_add(1, Ordering::Relaxed);
        info!("Creating new room: {}", room_id);
        tokio::spawn(coordinator.run());

        handle
    }

    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.inner.rooms.get(room_id).map(|h| h.value().clone())
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.inner.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.rooms.is_empty()
    }

    /// Total coordinators ever started by this registry.
    pub fn coordinators_started(&self) -> u64 {
        self.inner.coordinators_started.load(Ordering::Relaxed)
    }

    /// Removes the room only if it is still served by coordinator `instance`.
    ///
    /// Returns whether an entry was removed.
    pub(crate) fn forget(&self, room_id: &RoomId, instance: Uuid) -> bool {
        let removed = self
            .inner
            .rooms
            .remove_if(room_id, |_, handle| handle.instance() == instance)
            .is_some();

        if removed {
            info!("Room {} forgotten", room_id);
        } else {
            debug!("Room {} already replaced, nothing to forget", room_id);
        }
        removed
    }

    /// Subscribe to join/leave/relay events of every room.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn publish(&self, event: RoomEvent) {
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }

    /// Registers a handle whose coordinator was started elsewhere.
    #[cfg(test)]
    pub(crate) fn insert(&self, handle: RoomHandle) {
        self.inner.rooms.insert(handle.room_id().clone(), handle);
    }
}
