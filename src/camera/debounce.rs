pub const DEFAULT_COOLDOWN_MS: i64 = 2000;

/// Admits at most one camera candidate per cooldown window.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    cooldown_ms: i64,
    /// `None` until the first admission, so the first candidate always passes.
    last_admitted_ms: Option<i64>,
}

impl DebounceGate {
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            cooldown_ms,
            last_admitted_ms: None,
        }
    }

    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_ms
    }

    pub fn admit(&mut self, candidate_ms: i64) -> bool {
        let admitted = match self.last_admitted_ms {
            None => true,
            Some(last) => candidate_ms.saturating_sub(last) >= self.cooldown_ms,
        };
        if admitted {
            self.last_admitted_ms = Some(candidate_ms);
        }
        admitted
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}
