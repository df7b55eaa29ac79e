//! Byte-delta to percentage aggregation.

/// Converts raw byte deltas into a throttled, monotonic percentage stream.
///
/// While the copy runs the reported value never exceeds 99; only
/// [`ProgressAggregator::finish`] reports 100, and the orchestrator calls it
/// strictly after the atomic commit. An observer can therefore treat 100 as
/// "the rename happened", not "the bytes were written". A total of zero
/// (empty source) reports 99 immediately instead of dividing by zero.
/// Values are emitted only when they change, which bounds sink traffic.
pub struct ProgressAggregator<'a> {
    total_bytes: u64,
    copied_bytes: u64,
    last_percent: Option<u8>,
    sink: &'a mut dyn FnMut(u8),
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(total_bytes: u64, sink: &'a mut dyn FnMut(u8)) -> Self {
        Self {
            total_bytes,
            copied_bytes: 0,
            last_percent: None,
            sink,
        }
    }

    /// Emit the initial value so observers render a determinate bar from the
    /// start. For an empty source this jumps straight to 99.
    pub fn begin(&mut self) {
        self.emit(0);
        if self.total_bytes == 0 {
            self.emit(99);
        }
    }

    /// Account `delta` copied bytes and emit the resulting percentage.
    pub fn on_bytes(&mut self, delta: u64) {
        self.copied_bytes = self.copied_bytes.saturating_add(delta);
        let percent = if self.total_bytes == 0 {
            99
        } else {
            (self
                .copied_bytes
                .saturating_mul(100)
                .checked_div(self.total_bytes)
                .unwrap_or(99))
            .min(99) as u8
        };
        self.emit(percent);
    }

    pub fn copied_bytes(&self) -> u64 {
        self.copied_bytes
    }

    /// Report completion. Called once, after the staging tree has been
    /// promoted; duplicate calls are suppressed.
    pub fn finish(&mut self) {
        self.emit(100);
    }

    fn emit(&mut self, percent: u8) {
        // Strictly increasing: a trailing small delta may round below an
        // already-reported value and must not be re-sent.
        if self.last_percent.is_none_or(|last| percent > last) {
            self.last_percent = Some(percent);
            (self.sink)(percent);
        }
    }
}
