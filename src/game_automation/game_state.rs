// Shared game state tracker
use super::match_image::slots::slot_index;
use super::match_image::{SLOT_COUNT, SlotId, SlotStatuses};
use super::types::{BotAction, GameMode, GameSnapshot, RodInfo, RodUse, SessionStats};
use crate::template_matching::RodStatus;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("Action {action:?} is not allowed while {mode}")]
    ActionBlocked { action: BotAction, mode: GameMode },

    #[error("Unknown rod slot {slot} (expected 1..={max})")]
    UnknownSlot { slot: SlotId, max: usize },
}

/// Observer signature: (old mode, new mode, context).
///
/// Returning `Err` only logs; it never undoes the transition.
pub type ModeObserver = dyn Fn(GameMode, GameMode, &str) -> Result<(), String> + Send + Sync;

pub type ObserverId = u64;

#[derive(Debug, Default)]
struct StateInner {
    current_mode: GameMode,
    previous_mode: GameMode,
    rods: [RodInfo; SLOT_COUNT],
    inventory_open: bool,
    chest_open: bool,
    feeding_active: bool,
    stats: SessionStats,
}

/// Process-wide game state, shared between the detection loop and input handlers.
///
/// All fields sit behind one reentrant lock, so an observer invoked during
/// `change_mode` may read the state (or even change mode again) on the same
/// thread without deadlocking.
pub struct GameState {
    inner: ReentrantMutex<RefCell<StateInner>>,
    observers: Mutex<Vec<(ObserverId, Arc<ModeObserver>)>>,
    next_observer: AtomicU64,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(StateInner::default())),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    /// Run `f` with shared access to the inner record.
    fn read<R>(&self, f: impl FnOnce(&StateInner) -> R) -> R {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        f(&inner)
    }

    /// Run `f` with exclusive access to the inner record.
    ///
    /// The `RefCell` borrow ends before this returns, so observers are never
    /// called while it is held.
    fn write<R>(&self, f: impl FnOnce(&mut StateInner) -> R) -> R {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        f(&mut inner)
    }

    // ------------------------------------------------------------
    // Mode transitions
    // ------------------------------------------------------------

    pub fn current_mode(&self) -> GameMode {
        self.read(|s| s.current_mode)
    }

    pub fn previous_mode(&self) -> GameMode {
        self.read(|s| s.previous_mode)
    }

    /// Switch to `new_mode` and notify observers.
    ///
    /// Permission is not checked here; callers consult
    /// [`can_perform_action`](Self::can_perform_action) first, or use
    /// [`change_mode_checked`](Self::change_mode_checked). Returns `false` when
    /// already in `new_mode` (nothing recorded, nobody notified).
    pub fn change_mode(&self, new_mode: GameMode, context: &str) -> bool {
        let guard = self.inner.lock();
        let old_mode = {
            let mut inner = guard.borrow_mut();
            let old_mode = inner.current_mode;
            if old_mode == new_mode {
                return false;
            }
            inner.previous_mode = old_mode;
            inner.current_mode = new_mode;
            inner.stats.mode_changes += 1;
            old_mode
        };

        log::info!("🎮 Game mode: {} -> {} ({})", old_mode, new_mode, context);
        self.notify(old_mode, new_mode, context);
        drop(guard);
        true
    }

    /// Like [`change_mode`](Self::change_mode), but refuses modes whose action
    /// the current mode blocks.
    pub fn change_mode_checked(&self, new_mode: GameMode, context: &str) -> StateResult<bool> {
        let _guard = self.inner.lock();
        if let Some(action) = BotAction::for_mode(new_mode) {
            let mode = self.current_mode();
            if mode != new_mode && !self.can_perform_action(action) {
                log::warn!("⛔ {:?} blocked while {} ({})", action, mode, context);
                return Err(StateError::ActionBlocked { action, mode });
            }
        }
        Ok(self.change_mode(new_mode, context))
    }

    /// Static permission table lookup for the current mode.
    pub fn can_perform_action(&self, action: BotAction) -> bool {
        !self.current_mode().blocked_actions().contains(&action)
    }

    /// Register an observer; it runs synchronously on every transition.
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(GameMode, GameMode, &str) -> Result<(), String> + Send + Sync + 'static,
    {
        let id = self.next_observer.fetch_add(1, Ordering::Relaxed);
        let observer: Arc<ModeObserver> = Arc::new(observer);
        self.observers.lock().push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    /// Call every observer in registration order, isolating failures.
    fn notify(&self, old_mode: GameMode, new_mode: GameMode, context: &str) {
        // Snapshot so observers may (un)subscribe without deadlocking
        let observers: Vec<(ObserverId, Arc<ModeObserver>)> = self.observers.lock().clone();
        for (id, observer) in observers {
            match catch_unwind(AssertUnwindSafe(|| observer(old_mode, new_mode, context))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("⚠️ Mode observer #{} failed: {}", id, e),
                Err(_) => log::error!("❌ Mode observer #{} panicked", id),
            }
        }
    }

    // ------------------------------------------------------------
    // Rods
    // ------------------------------------------------------------

    fn index(slot: SlotId) -> StateResult<usize> {
        slot_index(slot).ok_or(StateError::UnknownSlot {
            slot,
            max: SLOT_COUNT,
        })
    }

    pub fn rod(&self, slot: SlotId) -> StateResult<RodInfo> {
        let i = Self::index(slot)?;
        Ok(self.read(|s| s.rods[i].clone()))
    }

    /// Put a fresh rod with `uses` charges in `slot`.
    pub fn equip_rod(&self, slot: SlotId, uses: u32, bait_type: Option<String>) -> StateResult<()> {
        let i = Self::index(slot)?;
        self.write(|s| {
            let status = match (uses, bait_type.is_some()) {
                (0, _) => RodStatus::Empty,
                (_, true) => RodStatus::WithBait,
                (_, false) => RodStatus::WithoutBait,
            };
            s.rods[i] = RodInfo {
                status,
                uses_remaining: uses,
                bait_type,
                last_check: Some(SystemTime::now()),
            };
        });
        log::debug!("🎣 Rod equipped in slot {} ({} uses)", slot, uses);
        Ok(())
    }

    /// Consume one use of the rod in `slot`.
    ///
    /// The decrement happens under the lock: the count never goes below zero
    /// and exactly one caller sees [`RodUse::Depleted`].
    pub fn use_rod(&self, slot: SlotId) -> StateResult<RodUse> {
        let i = Self::index(slot)?;
        let outcome = self.write(|s| {
            let rod = &mut s.rods[i];
            if rod.uses_remaining == 0 {
                return RodUse::Unavailable;
            }
            rod.uses_remaining -= 1;
            rod.last_check = Some(SystemTime::now());
            if rod.uses_remaining == 0 {
                rod.status = RodStatus::Empty;
                rod.bait_type = None;
                s.stats.rods_depleted += 1;
                RodUse::Depleted
            } else {
                RodUse::Used {
                    remaining: rod.uses_remaining,
                }
            }
        });
        if outcome == RodUse::Depleted {
            log::info!("🪝 Rod in slot {} used up", slot);
        }
        Ok(outcome)
    }

    /// Overwrite every slot status with the latest detection pass.
    pub fn apply_slot_statuses(&self, statuses: &SlotStatuses) {
        let now = SystemTime::now();
        self.write(|s| {
            for (slot, status) in statuses.iter() {
                let rod = &mut s.rods[slot as usize - 1];
                if rod.status != status {
                    log::debug!("🎣 Slot {}: {} -> {}", slot, rod.status, status);
                }
                rod.status = status;
                rod.last_check = Some(now);
            }
        });
    }

    pub fn slot_statuses(&self) -> SlotStatuses {
        self.read(|s| {
            let mut statuses = SlotStatuses::all_empty();
            for (i, rod) in s.rods.iter().enumerate() {
                statuses.set((i + 1) as SlotId, rod.status);
            }
            statuses
        })
    }

    /// First slot holding a rod ready to fish (with bait preferred).
    pub fn best_ready_slot(&self) -> Option<SlotId> {
        self.read(|s| {
            let find = |wanted: RodStatus| {
                s.rods
                    .iter()
                    .position(|r| r.status == wanted)
                    .map(|i| (i + 1) as SlotId)
            };
            find(RodStatus::WithBait).or_else(|| find(RodStatus::WithoutBait))
        })
    }

    // ------------------------------------------------------------
    // Interface flags
    // ------------------------------------------------------------

    pub fn inventory_open(&self) -> bool {
        self.read(|s| s.inventory_open)
    }

    pub fn chest_open(&self) -> bool {
        self.read(|s| s.chest_open)
    }

    pub fn feeding_active(&self) -> bool {
        self.read(|s| s.feeding_active)
    }

    /// Returns whether the flag changed.
    pub fn set_inventory_open(&self, open: bool) -> bool {
        self.write(|s| std::mem::replace(&mut s.inventory_open, open) != open)
    }

    pub fn set_chest_open(&self, open: bool) -> bool {
        self.write(|s| std::mem::replace(&mut s.chest_open, open) != open)
    }

    pub fn set_feeding_active(&self, active: bool) -> bool {
        self.write(|s| std::mem::replace(&mut s.feeding_active, active) != active)
    }

    // ------------------------------------------------------------
    // Session statistics
    // ------------------------------------------------------------

    /// Count one catch and return the new total.
    pub fn record_fish_caught(&self) -> u64 {
        self.write(|s| {
            s.stats.fish_caught += 1;
            s.stats.last_catch_at = Some(SystemTime::now());
            s.stats.fish_caught
        })
    }

    pub fn record_cast(&self) {
        self.write(|s| s.stats.casts += 1);
    }

    pub fn record_detection_pass(&self, succeeded: bool) {
        self.write(|s| {
            s.stats.detection_passes += 1;
            if !succeeded {
                s.stats.detection_failures += 1;
            }
        });
    }

    pub fn stats(&self) -> SessionStats {
        self.read(|s| s.stats.clone())
    }

    /// Start a new session: counters reset, rods and mode kept.
    pub fn reset_session(&self) {
        self.write(|s| s.stats = SessionStats::new());
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.read(|s| GameSnapshot {
            current_mode: s.current_mode,
            previous_mode: s.previous_mode,
            rods: s.rods.to_vec(),
            inventory_open: s.inventory_open,
            chest_open: s.chest_open,
            feeding_active: s.feeding_active,
            stats: s.stats.clone(),
        })
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_initial_state() {
        let state = GameState::new();
        assert_eq!(state.current_mode(), GameMode::Idle);
        assert_eq!(state.previous_mode(), GameMode::Idle);
        assert_eq!(state.slot_statuses().count(RodStatus::Empty), SLOT_COUNT);
        assert!(!state.inventory_open());
        assert_eq!(state.stats().fish_caught, 0);
    }

    #[test]
    fn test_transitions_notify_observers_in_order() {
        let state = GameState::new();
        let calls: Arc<Mutex<Vec<(u8, GameMode, GameMode, String)>>> = Arc::new(Mutex::new(Vec::new()));

        for tag in [1u8, 2] {
            let calls = calls.clone();
            state.subscribe(move |old, new, ctx| {
                calls.lock().push((tag, old, new, ctx.to_string()));
                Ok(())
            });
        }

        assert!(state.change_mode(GameMode::Feeding, "feed pet"));
        assert!(state.change_mode(GameMode::Idle, "done"));

        assert_eq!(state.previous_mode(), GameMode::Feeding);
        assert_eq!(state.current_mode(), GameMode::Idle);
        assert_eq!(
            *calls.lock(),
            vec![
                (1, GameMode::Idle, GameMode::Feeding, "feed pet".to_string()),
                (2, GameMode::Idle, GameMode::Feeding, "feed pet".to_string()),
                (1, GameMode::Feeding, GameMode::Idle, "done".to_string()),
                (2, GameMode::Feeding, GameMode::Idle, "done".to_string()),
            ]
        );
        assert_eq!(state.stats().mode_changes, 2);
    }

    #[test]
    fn test_same_mode_is_noop() {
        let state = GameState::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        state.subscribe(move |_, _, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(!state.change_mode(GameMode::Idle, "again"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failing_observers_are_isolated() {
        let state = GameState::new();
        let reached = Arc::new(AtomicU64::new(0));

        state.subscribe(|_, _, _| Err("display gone".to_string()));
        state.subscribe(|_, _, _| panic!("observer bug"));
        let r = reached.clone();
        state.subscribe(move |_, _, _| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(state.change_mode(GameMode::Fishing, "cast"));
        assert_eq!(state.current_mode(), GameMode::Fishing);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observer_can_read_state_reentrantly() {
        let state = Arc::new(GameState::new());
        let seen = Arc::new(Mutex::new(None));
        let (s, out) = (Arc::downgrade(&state), seen.clone());
        state.subscribe(move |_, _, _| {
            if let Some(state) = s.upgrade() {
                *out.lock() = Some((state.current_mode(), state.previous_mode()));
            }
            Ok(())
        });

        state.change_mode(GameMode::ChestOpen, "chest");
        assert_eq!(*seen.lock(), Some((GameMode::ChestOpen, GameMode::Idle)));
    }

    #[test]
    fn test_unsubscribe() {
        let state = GameState::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let id = state.subscribe(move |_, _, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        state.change_mode(GameMode::Fishing, "a");
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.change_mode(GameMode::Idle, "b");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_permission_table() {
        let state = GameState::new();
        assert!(state.can_perform_action(BotAction::Fish));

        state.change_mode(GameMode::InventoryOpen, "inventory");
        assert!(!state.can_perform_action(BotAction::Fish));
        assert!(state.can_perform_action(BotAction::ReplaceRod));

        // change_mode itself does not enforce the table
        assert!(state.change_mode(GameMode::Fishing, "forced"));
    }

    #[test]
    fn test_checked_transition_rejects_blocked_mode() {
        let state = GameState::new();
        state.change_mode(GameMode::ChestOpen, "chest");

        let err = state.change_mode_checked(GameMode::Fishing, "cast").unwrap_err();
        assert_eq!(
            err,
            StateError::ActionBlocked {
                action: BotAction::Fish,
                mode: GameMode::ChestOpen
            }
        );
        assert_eq!(state.current_mode(), GameMode::ChestOpen);

        // Idle and error are always reachable
        assert_eq!(state.change_mode_checked(GameMode::Idle, "close"), Ok(true));
        assert_eq!(state.change_mode_checked(GameMode::Fishing, "cast"), Ok(true));
    }

    #[test]
    fn test_use_rod_counts_down() {
        let state = GameState::new();
        state.equip_rod(2, 2, Some("worm".to_string())).unwrap();
        assert_eq!(state.rod(2).unwrap().status, RodStatus::WithBait);

        assert_eq!(state.use_rod(2), Ok(RodUse::Used { remaining: 1 }));
        assert_eq!(state.use_rod(2), Ok(RodUse::Depleted));
        assert_eq!(state.use_rod(2), Ok(RodUse::Unavailable));

        let rod = state.rod(2).unwrap();
        assert_eq!(rod.status, RodStatus::Empty);
        assert_eq!(rod.bait_type, None);
        assert_eq!(state.use_rod(9), Err(StateError::UnknownSlot { slot: 9, max: 6 }));
    }

    #[test]
    fn test_concurrent_use_rod() {
        let state = Arc::new(GameState::new());
        state.equip_rod(1, 50, None).unwrap();

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || state.use_rod(1).unwrap())
            })
            .collect();
        let outcomes: Vec<RodUse> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let depleted = outcomes.iter().filter(|o| **o == RodUse::Depleted).count();
        let used = outcomes.iter().filter(|o| matches!(o, RodUse::Used { .. })).count();
        let unavailable = outcomes.iter().filter(|o| **o == RodUse::Unavailable).count();

        assert_eq!(depleted, 1);
        assert_eq!(used, 49);
        assert_eq!(unavailable, 50);
        let rod = state.rod(1).unwrap();
        assert_eq!(rod.uses_remaining, 0);
        assert_eq!(rod.status, RodStatus::Empty);
        assert_eq!(state.stats().rods_depleted, 1);
    }

    #[test]
    fn test_apply_slot_statuses_overwrites() {
        let state = GameState::new();
        state.equip_rod(1, 10, Some("worm".to_string())).unwrap();

        let mut statuses = SlotStatuses::all_empty();
        statuses.set(3, RodStatus::Broken);
        state.apply_slot_statuses(&statuses);

        assert_eq!(state.slot_statuses(), statuses);
        assert_eq!(state.rod(1).unwrap().status, RodStatus::Empty);
        // Use counts are bookkeeping, detection only overwrites status
        assert_eq!(state.rod(1).unwrap().uses_remaining, 10);
        assert!(state.rod(3).unwrap().last_check.is_some());
        assert_eq!(state.best_ready_slot(), None);

        statuses.set(5, RodStatus::WithoutBait);
        statuses.set(6, RodStatus::WithBait);
        state.apply_slot_statuses(&statuses);
        assert_eq!(state.best_ready_slot(), Some(6));
    }

    #[test]
    fn test_flags_and_stats() {
        let state = GameState::new();
        assert!(state.set_inventory_open(true));
        assert!(!state.set_inventory_open(true));
        assert!(state.set_chest_open(true));
        assert!(state.set_feeding_active(true));

        assert_eq!(state.record_fish_caught(), 1);
        assert_eq!(state.record_fish_caught(), 2);
        state.record_cast();
        state.record_detection_pass(true);
        state.record_detection_pass(false);

        let snap = state.snapshot();
        assert!(snap.inventory_open && snap.chest_open && snap.feeding_active);
        assert_eq!(snap.stats.fish_caught, 2);
        assert_eq!(snap.stats.casts, 1);
        assert_eq!(snap.stats.detection_passes, 2);
        assert_eq!(snap.stats.detection_failures, 1);
        assert!(snap.stats.last_catch_at.is_some());
        assert_eq!(snap.rods.len(), SLOT_COUNT);

        state.reset_session();
        assert_eq!(state.stats().fish_caught, 0);
        assert!(state.inventory_open());
    }
}
