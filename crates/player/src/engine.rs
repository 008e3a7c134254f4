use common::Track;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::output::{AudioOutput, PlayerHooks};

/// Pressing previous within the first seconds of a track moves back; after
/// this threshold it restarts the current track instead.
const RESTART_THRESHOLD_SECS: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Stopped,
    Loading,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// One entry of the live play queue: a track plus where it came from.
#[derive(Clone, Debug)]
pub struct QueueItem {
    pub id: u64,
    pub track: Track,
    pub source: String,
}

/// The queue/playback state machine. Owns the queue, the pre-shuffle
/// ordering, and the transport state; drives a single [`AudioOutput`].
///
/// All methods run on one event-processing thread. Transitions derive the
/// next index from the current authoritative state, so a user-initiated
/// `next()` and the output's natural end-of-track callback can land in the
/// same tick without double-advancing.
pub struct Player<O, H> {
    output: O,
    hooks: H,
    current_track: Option<Track>,
    queue: Vec<QueueItem>,
    original_queue: Vec<QueueItem>,
    queue_index: Option<usize>,
    status: PlaybackStatus,
    current_time: f64,
    duration: f64,
    volume: f64,
    muted: bool,
    shuffle: bool,
    repeat: RepeatMode,
    next_item_id: u64,
}

impl<O: AudioOutput, H: PlayerHooks> Player<O, H> {
    pub fn new(output: O, hooks: H) -> Self {
        Self {
            output,
            hooks,
            current_track: None,
            queue: Vec::new(),
            original_queue: Vec::new(),
            queue_index: None,
            status: PlaybackStatus::Stopped,
            current_time: 0.0,
            duration: 0.0,
            volume: 0.8,
            muted: false,
            shuffle: false,
            repeat: RepeatMode::Off,
            next_item_id: 0,
        }
    }

    // ----- queue management -----

    /// Replaces the queue and starts playing at `start_index`. With shuffle
    /// active the chosen track is pinned to position 0 and the remainder is
    /// permuted; the unshuffled ordering is retained for restoration.
    pub fn set_queue(&mut self, tracks: Vec<Track>, start_index: usize) {
        let items: Vec<QueueItem> = tracks
            .into_iter()
            .map(|track| self.wrap(track, "library"))
            .collect();
        if items.is_empty() {
            self.queue.clear();
            self.original_queue.clear();
            self.queue_index = None;
            return;
        }
        let start_index = start_index.min(items.len() - 1);

        self.original_queue = items.clone();
        if self.shuffle {
            let mut rest: Vec<QueueItem> = Vec::with_capacity(items.len());
            let mut pinned = None;
            for (i, item) in items.into_iter().enumerate() {
                if i == start_index {
                    pinned = Some(item);
                } else {
                    rest.push(item);
                }
            }
            let mut rng = rand::rng();
            rest.shuffle(&mut rng);
            let mut queue = Vec::with_capacity(rest.len() + 1);
            queue.extend(pinned);
            queue.extend(rest);
            self.queue = queue;
            self.select(0);
        } else {
            self.queue = self.original_queue.clone();
            self.select(start_index);
        }
    }

    pub fn add_to_queue(&mut self, tracks: Vec<Track>) {
        for track in tracks {
            let item = self.wrap(track, "manual");
            self.queue.push(item.clone());
            self.original_queue.push(item);
        }
    }

    pub fn remove_from_queue(&mut self, index: usize) {
        if index >= self.queue.len() {
            return;
        }
        let removed = self.queue.remove(index);
        self.original_queue.retain(|item| item.id != removed.id);

        if let Some(current) = self.queue_index {
            if index < current {
                self.queue_index = Some(current - 1);
            } else if index == current {
                if self.queue.is_empty() {
                    self.queue_index = None;
                } else if current >= self.queue.len() {
                    self.queue_index = Some(self.queue.len() - 1);
                }
                // Otherwise the index now points at the following entry.
            }
        }
    }

    pub fn clear_queue(&mut self) {
        self.stop();
        self.queue.clear();
        self.original_queue.clear();
        self.queue_index = None;
        self.current_track = None;
    }

    /// Relocates one entry while keeping the index on the same logical track.
    pub fn move_in_queue(&mut self, from: usize, to: usize) {
        if from >= self.queue.len() || from == to {
            return;
        }
        let to = to.min(self.queue.len() - 1);
        let item = self.queue.remove(from);
        self.queue.insert(to, item);

        if let Some(current) = self.queue_index {
            if from == current {
                self.queue_index = Some(to);
            } else if from < current && to >= current {
                self.queue_index = Some(current - 1);
            } else if from > current && to <= current {
                self.queue_index = Some(current + 1);
            }
        }
    }

    // ----- transport -----

    /// Plays a specific track, or resumes from the queue index when omitted.
    /// A track present in the queue moves the index to it; one that is not
    /// plays ad hoc without touching the queue.
    pub fn play(&mut self, track: Option<Track>) {
        match track {
            Some(track) => {
                if let Some(index) = self.queue.iter().position(|item| item.track.id == track.id) {
                    self.select(index);
                } else {
                    self.current_track = Some(track.clone());
                    self.status = PlaybackStatus::Loading;
                    self.output.load(&stream_url(&track.id));
                    self.output.play();
                    self.hooks.on_track_selected(&track.id);
                }
            }
            None => {
                if let Some(index) = self.queue_index {
                    if index < self.queue.len() {
                        self.select(index);
                    }
                }
            }
        }
    }

    pub fn pause(&mut self) {
        self.output.pause();
        self.status = PlaybackStatus::Paused;
    }

    /// Assumes a track is already loaded.
    pub fn resume(&mut self) {
        self.output.play();
        self.status = PlaybackStatus::Playing;
    }

    /// Rewinds and stops; the queue and current track are preserved.
    pub fn stop(&mut self) {
        self.output.pause();
        self.output.seek(0.0);
        self.status = PlaybackStatus::Stopped;
        self.current_time = 0.0;
    }

    /// Advances the queue. Also the natural end-of-track transition: calling
    /// it twice in the same tick advances once per call, each time from the
    /// then-current index.
    pub fn next(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.repeat == RepeatMode::One {
            if let Some(index) = self.queue_index {
                self.select(index);
                return;
            }
        }
        let next_index = match self.queue_index {
            Some(index) if index + 1 < self.queue.len() => index + 1,
            Some(_) => {
                if self.repeat == RepeatMode::All {
                    0
                } else {
                    // End of queue: stop without advancing.
                    self.status = PlaybackStatus::Stopped;
                    return;
                }
            }
            None => 0,
        };
        self.select(next_index);
    }

    pub fn previous(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.current_time > RESTART_THRESHOLD_SECS {
            self.output.seek(0.0);
            self.current_time = 0.0;
            return;
        }
        let prev_index = match self.queue_index {
            Some(index) if index > 0 => index - 1,
            _ => {
                if self.repeat == RepeatMode::All {
                    self.queue.len() - 1
                } else {
                    0
                }
            }
        };
        self.select(prev_index);
    }

    pub fn seek(&mut self, time_secs: f64) {
        self.output.seek(time_secs);
        self.current_time = time_secs;
    }

    // ----- modes -----

    /// On: pins the playing item first and permutes the rest. Off: restores
    /// the retained ordering and relocates the index to the current track
    /// (0 when it is no longer present).
    pub fn toggle_shuffle(&mut self) {
        if !self.shuffle {
            self.shuffle = true;
            if self.queue.is_empty() {
                return;
            }
            let mut rng = rand::rng();
            match self.queue_index {
                Some(current) if current < self.queue.len() => {
                    let pinned = self.queue.remove(current);
                    self.queue.shuffle(&mut rng);
                    self.queue.insert(0, pinned);
                    self.queue_index = Some(0);
                }
                _ => {
                    self.queue.shuffle(&mut rng);
                }
            }
        } else {
            self.shuffle = false;
            self.queue = self.original_queue.clone();
            if let Some(track) = &self.current_track {
                let restored = self
                    .queue
                    .iter()
                    .position(|item| item.track.id == track.id)
                    .unwrap_or(0);
                self.queue_index = Some(restored);
            }
        }
    }

    pub fn cycle_repeat(&mut self) {
        self.repeat = self.repeat.next();
    }

    // ----- volume -----

    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.output.set_volume(volume);
        self.volume = volume;
        self.muted = volume == 0.0;
    }

    /// Volume persists independently of mute; unmuting restores the last
    /// explicitly set volume.
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.output.set_volume(self.volume);
        } else {
            self.output.set_volume(0.0);
        }
        self.muted = !self.muted;
    }

    // ----- output events -----

    pub fn handle_time_update(&mut self, time_secs: f64) {
        self.current_time = time_secs;
    }

    pub fn handle_duration(&mut self, duration_secs: f64) {
        self.duration = duration_secs;
    }

    /// The output started producing audio for the loaded source.
    pub fn handle_ready(&mut self) {
        if self.status == PlaybackStatus::Loading {
            self.status = PlaybackStatus::Playing;
        }
    }

    /// Natural end of the current track.
    pub fn handle_ended(&mut self) {
        self.next();
    }

    /// Output-level failures are logged, never surfaced; there is no retry
    /// and no automatic skip.
    pub fn handle_error(&mut self, message: &str) {
        warn!("playback error: {}", message);
    }

    // ----- accessors -----

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn queue(&self) -> &[QueueItem] {
        &self.queue
    }

    pub fn queue_index(&self) -> Option<usize> {
        self.queue_index
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    // ----- internals -----

    fn wrap(&mut self, track: Track, source: &str) -> QueueItem {
        self.next_item_id += 1;
        QueueItem {
            id: self.next_item_id,
            track,
            source: source.to_string(),
        }
    }

    fn select(&mut self, index: usize) {
        let Some(item) = self.queue.get(index) else {
            return;
        };
        let track = item.track.clone();
        self.queue_index = Some(index);
        self.current_track = Some(track.clone());
        self.status = PlaybackStatus::Loading;
        self.output.load(&stream_url(&track.id));
        self.output.play();
        self.hooks.on_track_selected(&track.id);
    }
}

fn stream_url(track_id: &str) -> String {
    format!("/api/tracks/{}/stream", track_id)
}

#[cfg(test)]
mod tests {
    use common::{now_secs, Track};

    use super::{PlaybackStatus, Player, RepeatMode};
    use crate::output::{AudioOutput, PlayerHooks};

    #[derive(Default)]
    struct FakeOutput {
        loaded: Vec<String>,
        playing: bool,
        position: f64,
        volume: f64,
    }

    impl AudioOutput for FakeOutput {
        fn load(&mut self, url: &str) {
            self.loaded.push(url.to_string());
            self.playing = false;
        }

        fn play(&mut self) {
            self.playing = true;
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn seek(&mut self, time_secs: f64) {
            self.position = time_secs;
        }

        fn set_volume(&mut self, volume: f64) {
            self.volume = volume;
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        selected: Vec<String>,
    }

    impl PlayerHooks for RecordingHooks {
        fn on_track_selected(&mut self, track_id: &str) {
            self.selected.push(track_id.to_string());
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            artist_id: "artist".to_string(),
            album_id: "album".to_string(),
            title: id.to_uppercase(),
            track_no: 1,
            disc_no: 1,
            duration_secs: 200,
            bitrate_kbps: None,
            sample_rate_hz: None,
            format: "mp3".to_string(),
            file_size: 0,
            file_path: format!("/music/{}.mp3", id),
            genre: None,
            year: None,
            lyrics: None,
            lyrics_type: None,
            play_count: 0,
            rating: 0,
            created_at: now_secs(),
        }
    }

    fn player_with_queue(ids: &[&str]) -> Player<FakeOutput, RecordingHooks> {
        let mut player = Player::new(FakeOutput::default(), RecordingHooks::default());
        player.set_queue(ids.iter().map(|id| track(id)).collect(), 0);
        player
    }

    fn queue_ids(player: &Player<FakeOutput, RecordingHooks>) -> Vec<String> {
        player
            .queue()
            .iter()
            .map(|item| item.track.id.clone())
            .collect()
    }

    #[test]
    fn set_queue_starts_loading_selected_track() {
        let player = player_with_queue(&["a", "b", "c"]);
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.status(), PlaybackStatus::Loading);
        assert_eq!(player.current_track().unwrap().id, "a");
        assert_eq!(player.output.loaded, vec!["/api/tracks/a/stream"]);
        assert!(player.output.playing);
        assert_eq!(player.hooks.selected, vec!["a"]);
    }

    #[test]
    fn ready_event_moves_loading_to_playing() {
        let mut player = player_with_queue(&["a"]);
        assert_eq!(player.status(), PlaybackStatus::Loading);
        player.handle_ready();
        assert_eq!(player.status(), PlaybackStatus::Playing);
        // A stray ready event outside loading changes nothing.
        player.pause();
        player.handle_ready();
        assert_eq!(player.status(), PlaybackStatus::Paused);
    }

    #[test]
    fn next_walks_queue_then_stops_without_advancing() {
        let mut player = player_with_queue(&["a", "b", "c"]);
        player.next();
        assert_eq!(player.queue_index(), Some(1));
        assert_eq!(player.current_track().unwrap().id, "b");
        player.next();
        assert_eq!(player.queue_index(), Some(2));
        player.next();
        assert_eq!(player.status(), PlaybackStatus::Stopped);
        assert_eq!(player.queue_index(), Some(2));
        assert_eq!(player.current_track().unwrap().id, "c");
    }

    #[test]
    fn next_wraps_with_repeat_all() {
        let mut player = player_with_queue(&["a", "b", "c"]);
        player.cycle_repeat();
        assert_eq!(player.repeat(), RepeatMode::All);
        player.next();
        player.next();
        player.next();
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.current_track().unwrap().id, "a");
    }

    #[test]
    fn repeat_one_restarts_same_index() {
        let mut player = player_with_queue(&["a", "b"]);
        player.cycle_repeat();
        player.cycle_repeat();
        assert_eq!(player.repeat(), RepeatMode::One);
        player.handle_ended();
        assert_eq!(player.queue_index(), Some(0));
        // The same track was loaded again.
        assert_eq!(
            player.output.loaded,
            vec!["/api/tracks/a/stream", "/api/tracks/a/stream"]
        );
    }

    #[test]
    fn ended_event_is_just_next() {
        let mut player = player_with_queue(&["a", "b"]);
        player.handle_ended();
        assert_eq!(player.current_track().unwrap().id, "b");
        player.handle_ended();
        assert_eq!(player.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn previous_restarts_after_three_seconds() {
        let mut player = player_with_queue(&["a", "b"]);
        player.next();
        player.handle_time_update(5.0);
        player.previous();
        // Restart in place: index unchanged, rewound to zero.
        assert_eq!(player.queue_index(), Some(1));
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.output.position, 0.0);
    }

    #[test]
    fn previous_moves_back_early_in_track() {
        let mut player = player_with_queue(&["a", "b"]);
        player.next();
        player.handle_time_update(1.5);
        player.previous();
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.current_track().unwrap().id, "a");
    }

    #[test]
    fn previous_clamps_at_queue_start() {
        let mut player = player_with_queue(&["a", "b"]);
        player.handle_time_update(1.0);
        player.previous();
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.current_track().unwrap().id, "a");
    }

    #[test]
    fn previous_wraps_to_end_with_repeat_all() {
        let mut player = player_with_queue(&["a", "b", "c"]);
        player.cycle_repeat();
        player.handle_time_update(1.0);
        player.previous();
        assert_eq!(player.queue_index(), Some(2));
        assert_eq!(player.current_track().unwrap().id, "c");
    }

    #[test]
    fn stop_preserves_queue_and_current_track() {
        let mut player = player_with_queue(&["a", "b"]);
        player.handle_time_update(42.0);
        player.stop();
        assert_eq!(player.status(), PlaybackStatus::Stopped);
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.current_track().unwrap().id, "a");
        assert_eq!(player.queue().len(), 2);
        assert!(!player.output.playing);
    }

    #[test]
    fn play_finds_track_in_queue() {
        let mut player = player_with_queue(&["a", "b", "c"]);
        player.play(Some(track("c")));
        assert_eq!(player.queue_index(), Some(2));
        assert_eq!(player.current_track().unwrap().id, "c");
    }

    #[test]
    fn play_detached_track_leaves_queue_alone() {
        let mut player = player_with_queue(&["a", "b"]);
        player.play(Some(track("x")));
        assert_eq!(player.current_track().unwrap().id, "x");
        assert_eq!(player.queue().len(), 2);
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.hooks.selected.last().unwrap(), "x");
    }

    #[test]
    fn shuffle_pins_current_and_unshuffle_restores_order() {
        let ids = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let mut player = player_with_queue(&ids);
        player.next();
        assert_eq!(player.current_track().unwrap().id, "b");

        player.toggle_shuffle();
        assert!(player.is_shuffled());
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.queue()[0].track.id, "b");
        // Same multiset of tracks.
        let mut shuffled = queue_ids(&player);
        shuffled.sort();
        let mut expected: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(shuffled, expected);

        player.toggle_shuffle();
        assert!(!player.is_shuffled());
        let restored = queue_ids(&player);
        let original: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        assert_eq!(restored, original);
        // Index relocated to wherever the current track sits in the
        // restored order.
        assert_eq!(player.queue_index(), Some(1));
        assert_eq!(player.current_track().unwrap().id, "b");
    }

    #[test]
    fn set_queue_under_shuffle_pins_start_track() {
        let mut player = player_with_queue(&["x"]);
        player.toggle_shuffle();
        player.set_queue(
            ["a", "b", "c", "d"].iter().map(|id| track(id)).collect(),
            2,
        );
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.queue()[0].track.id, "c");
        assert_eq!(player.current_track().unwrap().id, "c");
        // Unshuffling recovers the submitted order.
        player.toggle_shuffle();
        assert_eq!(queue_ids(&player), vec!["a", "b", "c", "d"]);
        assert_eq!(player.queue_index(), Some(2));
    }

    #[test]
    fn cycle_repeat_walks_fixed_cycle() {
        let mut player = player_with_queue(&["a"]);
        assert_eq!(player.repeat(), RepeatMode::Off);
        player.cycle_repeat();
        assert_eq!(player.repeat(), RepeatMode::All);
        player.cycle_repeat();
        assert_eq!(player.repeat(), RepeatMode::One);
        player.cycle_repeat();
        assert_eq!(player.repeat(), RepeatMode::Off);
    }

    #[test]
    fn remove_before_current_shifts_index_down() {
        let mut player = player_with_queue(&["a", "b", "c"]);
        player.next();
        player.remove_from_queue(0);
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.queue()[0].track.id, "b");
        assert_eq!(player.current_track().unwrap().id, "b");
    }

    #[test]
    fn remove_current_at_end_clamps_to_last() {
        let mut player = player_with_queue(&["a", "b", "c"]);
        player.next();
        player.next();
        player.remove_from_queue(2);
        assert_eq!(player.queue_index(), Some(1));
        assert_eq!(player.queue().len(), 2);
    }

    #[test]
    fn remove_last_entry_empties_queue_safely() {
        let mut player = player_with_queue(&["a"]);
        player.remove_from_queue(0);
        assert!(player.queue().is_empty());
        assert_eq!(player.queue_index(), None);
        player.next();
        player.previous();
        assert!(player.queue().is_empty());
    }

    #[test]
    fn move_tracks_index_with_item() {
        let mut player = player_with_queue(&["a", "b", "c", "d"]);
        player.next();

        // Moving the playing item jumps the index to the destination.
        player.move_in_queue(1, 3);
        assert_eq!(queue_ids(&player), vec!["a", "c", "d", "b"]);
        assert_eq!(player.queue_index(), Some(3));

        // Moving an item from before to after the tracked one shifts it down.
        player.move_in_queue(0, 3);
        assert_eq!(queue_ids(&player), vec!["c", "d", "b", "a"]);
        assert_eq!(player.queue_index(), Some(2));

        // And the symmetric case shifts it up.
        player.move_in_queue(3, 0);
        assert_eq!(queue_ids(&player), vec!["a", "c", "d", "b"]);
        assert_eq!(player.queue_index(), Some(3));
        assert_eq!(player.current_track().unwrap().id, "b");
    }

    #[test]
    fn add_to_queue_appends_to_both_orders() {
        let mut player = player_with_queue(&["a"]);
        player.add_to_queue(vec![track("b"), track("c")]);
        assert_eq!(queue_ids(&player), vec!["a", "b", "c"]);
        player.toggle_shuffle();
        player.toggle_shuffle();
        assert_eq!(queue_ids(&player), vec!["a", "b", "c"]);
    }

    #[test]
    fn volume_persists_through_mute() {
        let mut player = player_with_queue(&["a"]);
        player.set_volume(0.5);
        assert_eq!(player.output.volume, 0.5);
        player.toggle_mute();
        assert!(player.is_muted());
        assert_eq!(player.output.volume, 0.0);
        assert_eq!(player.volume(), 0.5);
        player.toggle_mute();
        assert!(!player.is_muted());
        assert_eq!(player.output.volume, 0.5);
    }

    #[test]
    fn zero_volume_counts_as_muted() {
        let mut player = player_with_queue(&["a"]);
        player.set_volume(0.0);
        assert!(player.is_muted());
        player.set_volume(2.0);
        assert_eq!(player.volume(), 1.0);
        assert!(!player.is_muted());
    }

    #[test]
    fn seek_updates_position_and_output() {
        let mut player = player_with_queue(&["a"]);
        player.seek(37.5);
        assert_eq!(player.current_time(), 37.5);
        assert_eq!(player.output.position, 37.5);
    }

    #[test]
    fn pause_and_resume_toggle_output() {
        let mut player = player_with_queue(&["a"]);
        player.handle_ready();
        player.pause();
        assert_eq!(player.status(), PlaybackStatus::Paused);
        assert!(!player.output.playing);
        player.resume();
        assert_eq!(player.status(), PlaybackStatus::Playing);
        assert!(player.output.playing);
    }

    #[test]
    fn every_selection_notifies_hooks() {
        let mut player = player_with_queue(&["a", "b"]);
        player.next();
        player.previous();
        assert_eq!(player.hooks.selected, vec!["a", "b", "a"]);
    }

    #[test]
    fn clear_queue_resets_everything() {
        let mut player = player_with_queue(&["a", "b"]);
        player.clear_queue();
        assert!(player.queue().is_empty());
        assert_eq!(player.queue_index(), None);
        assert!(player.current_track().is_none());
        assert_eq!(player.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn playback_error_does_not_skip_or_retry() {
        let mut player = player_with_queue(&["a", "b"]);
        let loads = player.output.loaded.len();
        player.handle_error("network failure");
        assert_eq!(player.queue_index(), Some(0));
        assert_eq!(player.output.loaded.len(), loads);
    }
}
