#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative sequencing of time-deferred steps.
//!
//! A [`Sequencer`] owns an ordered queue of steps. Driving it with
//! [`Sequencer::run`] executes steps strictly one after another: a step either
//! completes immediately or asks the sequencer to wait for a modeled duration
//! before the next step may start. Follow-up steps scheduled through a
//! [`Continuation`] run before anything that was already queued, so a step and
//! its follow-ups always complete before later steps begin.

use std::{collections::VecDeque, time::Duration};

/// Outcome of executing a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The step finished; the next step may run immediately.
    Ready,
    /// The step finishes once the duration elapsed.
    After(Duration),
}

/// Follow-up steps scheduled by the step currently executing.
#[derive(Debug)]
pub struct Continuation<S> {
    steps: Vec<S>,
}

impl<S> Continuation<S> {
    fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Schedules `step` to run after the current step and any follow-up
    /// scheduled before it, ahead of the rest of the queue.
    pub fn then(&mut self, step: S) {
        self.steps.push(step);
    }
}

/// Ordered queue of steps drained against a simulated clock.
#[derive(Debug)]
pub struct Sequencer<S> {
    queue: VecDeque<S>,
    wait: Duration,
}

impl<S> Default for Sequencer<S> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            wait: Duration::ZERO,
        }
    }
}

impl<S> Sequencer<S> {
    /// Appends a step to the end of the queue.
    pub fn push(&mut self, step: S) {
        self.queue.push_back(step);
    }

    /// Reports whether no step is queued and no completion is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.wait.is_zero()
    }

    /// Number of queued steps that have not started yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Remaining time before the next step may start.
    #[must_use]
    pub fn remaining_wait(&self) -> Duration {
        self.wait
    }

    /// Advances the simulated clock by `dt` and executes every step whose turn
    /// has come.
    ///
    /// Time left over once the queue drains is discarded, so a later push
    /// always starts from a fresh clock. `run(Duration::ZERO, ..)` executes
    /// everything that is ready without letting time pass.
    pub fn run<F>(&mut self, dt: Duration, mut execute: F)
    where
        F: FnMut(S, &mut Continuation<S>) -> Completion,
    {
        let mut budget = dt;

        if !self.wait.is_zero() {
            if budget < self.wait {
                self.wait -= budget;
                return;
            }
            budget -= self.wait;
            self.wait = Duration::ZERO;
        }

        while let Some(step) = self.queue.pop_front() {
            let mut continuation = Continuation::new();
            let completion = execute(step, &mut continuation);
            for follow_up in continuation.steps.into_iter().rev() {
                self.queue.push_front(follow_up);
            }

            if let Completion::After(duration) = completion {
                if budget < duration {
                    self.wait = duration - budget;
                    tracing::trace!(
                        wait = ?self.wait,
                        pending = self.queue.len(),
                        "sequencer waiting"
                    );
                    return;
                }
                budget -= duration;
            }
        }
    }
}
