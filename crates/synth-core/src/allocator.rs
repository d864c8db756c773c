//! Polyphonic voice allocator: note-to-voice mapping with stealing,
//! guaranteed to perform no dynamic allocation after construction.
//!
//! The allocator owns a fixed-length pool of slots for its entire
//! lifetime; the voice factory passed to [`VoiceAllocator::new`] is
//! only ever invoked during construction.

use crate::midi::MidiNote;
use crate::voice::Voice;

struct AllocationSlot {
    voice: Voice,
    /// `None` until the slot has been used for the first time. Once a
    /// note is assigned it stays assigned (even after the voice
    /// finishes its release) until a later `allocate()` steals the
    /// slot for a different note.
    assigned_note: Option<MidiNote>,
}

/// Owns exactly `max_voices` voices for its lifetime and maps MIDI
/// notes onto them, stealing when the pool is exhausted.
pub struct VoiceAllocator {
    slots: Box<[AllocationSlot]>,
    last_stolen: usize,
}

impl VoiceAllocator {
    /// Build a pool of `max_voices` voices from `factory`, called
    /// exactly `max_voices` times. Panics if `max_voices == 0`; a
    /// zero-voice allocator is a construction-time configuration error
    /// the embedder must not make it past (see [`crate::engine::Engine::new`]
    /// for the fallible constructor that turns this into an
    /// [`crate::error::EngineError`]).
    pub fn new(max_voices: usize, mut factory: impl FnMut() -> Voice) -> Self {
        assert!(max_voices > 0, "voice allocator requires at least one voice");
        let slots: Box<[AllocationSlot]> = (0..max_voices)
            .map(|_| AllocationSlot { voice: factory(), assigned_note: None })
            .collect();
        log::debug!("voice allocator constructed with {} voices", max_voices);
        Self { slots, last_stolen: max_voices - 1 }
    }

    /// Number of voices owned by this allocator (never changes after
    /// construction).
    pub fn voice_count(&self) -> usize {
        self.slots.len()
    }

    /// Map `note` to the voice that should be triggered for it.
    ///
    /// Ordered algorithm:
    /// 1. If `note` is already assigned to a slot, return that slot's
    ///    voice (same-note re-trigger collapses to one voice).
    /// 2. Else, the first never-used slot.
    /// 3. Else, steal: prefer a slot whose voice has finished
    ///    (`is_active() == false`), else round-robin.
    pub fn allocate(&mut self, note: MidiNote) -> &mut Voice {
        if let Some(idx) = self.slots.iter().position(|s| s.assigned_note == Some(note)) {
            return &mut self.slots[idx].voice;
        }

        if let Some(idx) = self.slots.iter().position(|s| s.assigned_note.is_none()) {
            self.slots[idx].assigned_note = Some(note);
            return &mut self.slots[idx].voice;
        }

        let idx = match self.slots.iter().position(|s| !s.voice.is_active()) {
            Some(inactive_idx) => inactive_idx,
            None => {
                let idx = (self.last_stolen + 1) % self.slots.len();
                self.last_stolen = idx;
                idx
            }
        };

        self.slots[idx].voice.release();
        self.slots[idx].assigned_note = Some(note);
        &mut self.slots[idx].voice
    }

    /// The voice currently assigned to `note`, if any. Returns `None`
    /// once the slot has been stolen for a different note; callers
    /// must use this (not `allocate`) to release a note, so a note-off
    /// for a reassigned note never releases the wrong voice.
    pub fn find_allocated(&mut self, note: MidiNote) -> Option<&mut Voice> {
        self.slots.iter_mut().find(|s| s.assigned_note == Some(note)).map(|s| &mut s.voice)
    }

    /// Apply `f` to every voice in the pool, in a stable order. Used
    /// for both broadcast parameter changes and audio rendering.
    pub fn for_each(&mut self, mut f: impl FnMut(&mut Voice)) {
        for slot in self.slots.iter_mut() {
            f(&mut slot.voice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freq_for_note(note: u8) -> f32 {
        440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
    }

    #[test]
    #[should_panic]
    fn zero_voices_panics() {
        VoiceAllocator::new(0, || Voice::new(44_100.0));
    }

    #[test]
    fn trigger_then_release_reuses_the_same_voice() {
        let mut alloc = VoiceAllocator::new(8, || Voice::new(44_100.0));
        let v = alloc.allocate(60);
        v.trigger(freq_for_note(60), 100.0 / 127.0);
        assert!(alloc.find_allocated(60).is_some());
        let v = alloc.find_allocated(60).unwrap();
        assert!(v.is_active());
        v.release();
        assert!(alloc.find_allocated(60).is_some());
    }

    #[test]
    fn three_distinct_voices_from_a_pool_of_eight() {
        let mut alloc = VoiceAllocator::new(8, || Voice::new(44_100.0));
        alloc.allocate(60).trigger(freq_for_note(60), 1.0);
        alloc.allocate(64).trigger(freq_for_note(64), 1.0);
        alloc.allocate(67).trigger(freq_for_note(67), 1.0);

        assert!(alloc.find_allocated(60).is_some());
        assert!(alloc.find_allocated(64).is_some());
        assert!(alloc.find_allocated(67).is_some());

        let mut visited = 0;
        alloc.for_each(|_| visited += 1);
        assert_eq!(visited, 8);
    }

    #[test]
    fn stealing_with_two_voices() {
        let mut alloc = VoiceAllocator::new(2, || Voice::new(44_100.0));
        alloc.allocate(60).trigger(freq_for_note(60), 1.0);
        alloc.allocate(64).trigger(freq_for_note(64), 1.0);
        // Both slots now active and allocated; a third distinct note
        // must steal one of the existing two voice instances.
        alloc.allocate(67).trigger(freq_for_note(67), 1.0);

        assert_eq!(alloc.voice_count(), 2);
        // Exactly one of notes 60/64 must have been displaced.
        let remaining = [60u8, 64].iter().filter(|&&n| alloc.find_allocated(n).is_some()).count();
        assert_eq!(remaining, 1);
        assert!(alloc.find_allocated(67).is_some());
    }

    #[test]
    fn stealing_prefers_inactive_voice_over_round_robin() {
        let mut alloc = VoiceAllocator::new(2, || Voice::new(44_100.0));
        alloc.allocate(60).trigger(freq_for_note(60), 1.0);
        let v64 = alloc.allocate(64);
        v64.set_amp_envelope(0.0, 0.0, 0.0, 0.0); // decays to idle almost instantly
        v64.trigger(freq_for_note(64), 1.0);
        // Drain note 64's envelope to idle without touching note 60.
        let table = crate::dsp::WavetableBuffer::new(0.0);
        alloc.find_allocated(64).unwrap().release();
        for _ in 0..8 {
            alloc.find_allocated(64).unwrap().next_sample(&table);
        }
        assert!(!alloc.find_allocated(64).unwrap().is_active());

        alloc.allocate(67).trigger(freq_for_note(67), 1.0);
        // Note 60 (still active) must survive; note 64 (inactive) was stolen.
        assert!(alloc.find_allocated(60).is_some());
        assert!(alloc.find_allocated(67).is_some());
    }

    #[test]
    fn same_note_retrigger_returns_same_voice() {
        let mut alloc = VoiceAllocator::new(8, || Voice::new(44_100.0));
        let a_ptr = alloc.allocate(60) as *const Voice;
        let b_ptr = alloc.allocate(60) as *const Voice;
        assert_eq!(a_ptr, b_ptr);
    }

    #[test]
    fn note_off_for_stolen_note_is_a_noop() {
        let mut alloc = VoiceAllocator::new(1, || Voice::new(44_100.0));
        alloc.allocate(60).trigger(freq_for_note(60), 1.0);
        alloc.allocate(64).trigger(freq_for_note(64), 1.0); // steals the only slot
        assert!(alloc.find_allocated(60).is_none());
        assert!(alloc.find_allocated(64).is_some());
    }
}
