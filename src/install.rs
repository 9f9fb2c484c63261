//! Install-prompt state machine.
//!
//! The platform announces installability once the shell worker is
//! registered; the default prompt is suppressed and the signal retained so
//! the console can replay it from its own affordance. Replaying consumes the
//! retained signal, and the affordance disappears for good once the app is
//! installed or already running standalone.

/// A retained installability signal. Replaying it consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredPrompt;

#[derive(Debug)]
pub struct InstallPrompt {
    deferred: Option<DeferredPrompt>,
    standalone: bool,
}

impl InstallPrompt {
    pub fn new(standalone: bool) -> Self {
        Self {
            deferred: None,
            standalone,
        }
    }

    /// The platform signalled that the app can be installed. The default
    /// prompt is suppressed; the signal is retained for the manual trigger.
    pub fn on_prompt_available(&mut self) {
        self.deferred = Some(DeferredPrompt);
    }

    /// Whether the install affordance should be shown.
    /// Hidden while standalone even if a prompt was retained.
    pub fn trigger_visible(&self) -> bool {
        self.deferred.is_some() && !self.standalone
    }

    /// Replay the retained prompt. One-shot: a second call returns None
    /// until the platform signals availability again.
    pub fn take_prompt(&mut self) -> Option<DeferredPrompt> {
        if self.standalone {
            return None;
        }
        self.deferred.take()
    }

    /// Installation completed; hide the affordance permanently.
    pub fn on_installed(&mut self) {
        self.standalone = true;
        self.deferred = None;
    }

    pub fn is_standalone(&self) -> bool {
        self.standalone
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_hidden_until_prompt_available() {
        let mut prompt = InstallPrompt::new(false);
        assert!(!prompt.trigger_visible());

        prompt.on_prompt_available();
        assert!(prompt.trigger_visible());
    }

    #[test]
    fn test_trigger_hidden_in_standalone_mode() {
        let mut prompt = InstallPrompt::new(true);
        prompt.on_prompt_available();
        assert!(!prompt.trigger_visible());
        assert!(prompt.take_prompt().is_none());
    }

    #[test]
    fn test_prompt_replay_is_one_shot() {
        let mut prompt = InstallPrompt::new(false);
        prompt.on_prompt_available();

        assert!(prompt.take_prompt().is_some());
        assert!(prompt.take_prompt().is_none());
        assert!(!prompt.trigger_visible());
    }

    #[test]
    fn test_installed_hides_trigger_permanently() {
        let mut prompt = InstallPrompt::new(false);
        prompt.on_prompt_available();
        prompt.on_installed();

        assert!(prompt.is_standalone());
        assert!(!prompt.trigger_visible());
        // A late availability signal no longer surfaces the affordance
        prompt.on_prompt_available();
        assert!(!prompt.trigger_visible());
    }
}
