//! Transition state machine for animated layout changes.
//!
//! A fade transition runs through `FadingOut -> Swapping -> FadingIn -> Idle`.
//! The host drives it: each step returns a [`ScheduledStep`] carrying the
//! generation it belongs to, and the host calls back with that generation
//! once the delay has elapsed. Starting any new transition bumps the
//! generation, so callbacks from a superseded transition are ignored.
//!
//! [`ScheduledStep`]: super::instruction::ScheduledStep

/// Current phase of the running transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPhase {
    #[default]
    Idle,
    /// Branches fading to transparent while tips move.
    FadingOut,
    /// Branches invisible, paths being replaced.
    Swapping,
    /// New branches fading back in.
    FadingIn,
}

/// Work the caller must perform when a transition advances.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionStep {
    /// Replace the branch paths of `nodes` while they are invisible.
    Swap { nodes: Vec<usize> },
    /// Fade the branches of `nodes` back in over `duration_ms`.
    FadeIn { nodes: Vec<usize>, duration_ms: f64 },
    /// The transition is over.
    Settle,
}

/// Generation-tokened fade transition state.
#[derive(Debug, Clone, Default)]
pub struct TransitionMachine {
    generation: u32,
    phase: TransitionPhase,
    /// Nodes whose branches take part in the current fade.
    nodes: Vec<usize>,
    dt: f64,
}

impl TransitionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    /// Nodes left hidden or half-faded by a transition that is being
    /// superseded.
    fn take_orphans(&mut self) -> Vec<usize> {
        if self.phase == TransitionPhase::Idle {
            self.nodes.clear();
            return Vec::new();
        }
        log::debug!(
            "transition {} superseded in {:?}",
            self.generation,
            self.phase
        );
        std::mem::take(&mut self.nodes)
    }

    /// Start a fade over `nodes`. Returns the new generation.
    ///
    /// Nodes still mid-fade from a superseded transition join the new one so
    /// their branches are brought back.
    pub fn begin_fade(&mut self, nodes: Vec<usize>, dt: f64) -> u32 {
        let mut members = self.take_orphans();
        members.extend(nodes);
        members.sort_unstable();
        members.dedup();

        self.generation = self.generation.wrapping_add(1);
        self.phase = TransitionPhase::FadingOut;
        self.nodes = members;
        self.dt = dt;
        self.generation
    }

    /// Start a plain (non-fading) update.
    ///
    /// Cancels any running fade and returns the nodes whose branches it left
    /// hidden, which the caller must restore.
    pub fn begin_plain(&mut self) -> Vec<usize> {
        let orphans = self.take_orphans();
        self.generation = self.generation.wrapping_add(1);
        self.phase = TransitionPhase::Idle;
        orphans
    }

    /// Nodes taking part in the running fade.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Advance the transition if `generation` is current.
    ///
    /// Returns `None` for stale generations and when idle.
    pub fn resume(&mut self, generation: u32) -> Option<TransitionStep> {
        if generation != self.generation {
            log::debug!(
                "dropping stale transition step {} (current {})",
                generation,
                self.generation
            );
            return None;
        }
        match self.phase {
            TransitionPhase::Idle => None,
            TransitionPhase::FadingOut => {
                self.phase = TransitionPhase::Swapping;
                Some(TransitionStep::Swap {
                    nodes: self.nodes.clone(),
                })
            }
            TransitionPhase::Swapping => {
                self.phase = TransitionPhase::FadingIn;
                Some(TransitionStep::FadeIn {
                    nodes: self.nodes.clone(),
                    duration_ms: 0.5 * self.dt,
                })
            }
            TransitionPhase::FadingIn => {
                self.phase = TransitionPhase::Idle;
                self.nodes.clear();
                Some(TransitionStep::Settle)
            }
        }
    }

    /// Delay before the step following the current phase.
    pub fn next_delay(&self) -> Option<f64> {
        match self.phase {
            TransitionPhase::Idle => None,
            TransitionPhase::FadingOut => Some(0.5 * self.dt),
            TransitionPhase::Swapping => Some(0.0),
            TransitionPhase::FadingIn => Some(0.5 * self.dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_fade_sequence() {
        let mut machine = TransitionMachine::new();
        let generation = machine.begin_fade(vec![2, 1], 1000.0);

        assert_eq!(machine.phase(), TransitionPhase::FadingOut);
        assert_eq!(machine.next_delay(), Some(500.0));
        assert_eq!(
            machine.resume(generation),
            Some(TransitionStep::Swap { nodes: vec![1, 2] })
        );
        assert_eq!(machine.next_delay(), Some(0.0));
        assert_eq!(
            machine.resume(generation),
            Some(TransitionStep::FadeIn {
                nodes: vec![1, 2],
                duration_ms: 500.0
            })
        );
        assert_eq!(machine.resume(generation), Some(TransitionStep::Settle));
        assert_eq!(machine.phase(), TransitionPhase::Idle);
        assert_eq!(machine.resume(generation), None);
    }

    #[test]
    fn test_stale_generation_is_noop() {
        let mut machine = TransitionMachine::new();
        let first = machine.begin_fade(vec![1], 1000.0);
        let second = machine.begin_fade(vec![3], 1000.0);

        assert_ne!(first, second);
        assert_eq!(machine.resume(first), None);
        assert_eq!(machine.phase(), TransitionPhase::FadingOut);
    }

    #[test]
    fn test_superseded_fade_nodes_carried_over() {
        let mut machine = TransitionMachine::new();
        let first = machine.begin_fade(vec![1, 2], 1000.0);
        machine.resume(first);
        machine.begin_fade(vec![2, 5], 400.0);

        assert_eq!(machine.nodes(), &[1, 2, 5]);
        assert_eq!(machine.next_delay(), Some(200.0));
    }

    #[test]
    fn test_plain_update_returns_orphans() {
        let mut machine = TransitionMachine::new();
        let generation = machine.begin_fade(vec![4, 7], 1000.0);
        let orphans = machine.begin_plain();

        assert_eq!(orphans, vec![4, 7]);
        assert_eq!(machine.phase(), TransitionPhase::Idle);
        assert_eq!(machine.resume(generation), None);
        assert!(machine.begin_plain().is_empty());
    }
}
