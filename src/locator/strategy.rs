use std::fmt::Debug;

use tracing::debug;

/// A result together with the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<S, T> {
    pub stage: S,
    pub value: T,
}

type Attempt<'a, C, T> = Box<dyn Fn(&mut C) -> Option<T> + 'a>;

/// Ordered fallback stages; the first stage that yields a value wins.
pub struct Chain<'a, C: ?Sized, S, T> {
    name: &'static str,
    stages: Vec<(S, Attempt<'a, C, T>)>,
}

impl<'a, C: ?Sized, S: Copy + Debug, T> Chain<'a, C, S, T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, stages: Vec::new() }
    }

    pub fn then(mut self, stage: S, attempt: impl Fn(&mut C) -> Option<T> + 'a) -> Self {
        self.stages.push((stage, Box::new(attempt)));
        self
    }

    pub fn run(&self, ctx: &mut C) -> Option<Tagged<S, T>> {
        for (stage, attempt) in &self.stages {
            if let Some(value) = attempt(ctx) {
                debug!(chain = self.name, stage = ?stage, "strategy succeeded");
                return Some(Tagged { stage: *stage, value });
            }
            debug!(chain = self.name, stage = ?stage, "strategy failed, falling through");
        }
        None
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
