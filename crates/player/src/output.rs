/// Capability surface of the single audio output the engine drives. A real
/// implementation fronts a streaming media element; tests use a fake.
///
/// The output reports back asynchronously through the engine's `handle_*`
/// methods (ready, time update, duration, ended, error); there are no
/// callbacks registered on the trait itself, which keeps implementations
/// trivially single-threaded.
pub trait AudioOutput {
    /// Points the output at a new stream URL. Playback does not start until
    /// `play` is called.
    fn load(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, time_secs: f64);
    fn set_volume(&mut self, volume: f64);
}

/// Best-effort side effects dispatched on track selection. Implementations
/// must not fail the caller: the engine ignores everything about the
/// dispatch beyond making it.
pub trait PlayerHooks {
    /// A track was selected for playback (history append, persisted-queue
    /// sync, and similar bookkeeping hang off this).
    fn on_track_selected(&mut self, track_id: &str);
}

/// Hook sink that drops every notification.
pub struct NullHooks;

impl PlayerHooks for NullHooks {
    fn on_track_selected(&mut self, _track_id: &str) {}
}
