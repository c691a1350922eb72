use tracing::info;

use crate::render::Renderer;
use crate::{Flock, RenderError, Snapshot};

/// Drives a flock and hands each post-step snapshot to every renderer.
pub struct Simulation {
    flock: Flock,
    renderers: Vec<Box<dyn Renderer>>,
}

impl Simulation {
    pub fn new(flock: Flock) -> Self {
        Simulation {
            flock,
            renderers: Vec::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    pub fn add_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderers.push(renderer);
    }

    pub fn flock(&self) -> &Flock {
        &self.flock
    }

    /// Runs one step and returns the snapshot the renderers received.
    pub fn advance(&mut self) -> Result<Snapshot, RenderError> {
        self.flock.step();
        let snapshot = self.flock.snapshot();
        for renderer in &mut self.renderers {
            renderer.render(&snapshot)?;
        }
        Ok(snapshot)
    }

    /// Runs `steps` steps, calling `on_step` after each, then finishes every renderer.
    pub fn run(
        &mut self,
        steps: usize,
        mut on_step: impl FnMut(&Snapshot),
    ) -> Result<(), RenderError> {
        info!(steps, boids = self.flock.len(), "starting run");
        for _ in 0..steps {
            let snapshot = self.advance()?;
            on_step(&snapshot);
        }
        self.finish()?;
        info!(step = self.flock.step_count(), "run complete");
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), RenderError> {
        for renderer in &mut self.renderers {
            renderer.finish()?;
        }
        Ok(())
    }

    pub fn into_flock(self) -> Flock {
        self.flock
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::{Boid, Bounds, NoScouts, Parameters, UpdateMode};

    #[derive(Default, Clone)]
    struct Recorder {
        steps: Rc<RefCell<Vec<u64>>>,
        finished: Rc<RefCell<bool>>,
    }

    impl Renderer for Recorder {
        fn render(&mut self, snapshot: &Snapshot) -> Result<(), RenderError> {
            self.steps.borrow_mut().push(snapshot.step);
            Ok(())
        }

        fn finish(&mut self) -> Result<(), RenderError> {
            *self.finished.borrow_mut() = true;
            Ok(())
        }
    }

    #[test]
    fn renderers_see_every_step_in_order() {
        let flock = Flock::from_boids(
            vec![Boid::new(50.0, 50.0, 0.5, 0.0)],
            Bounds::default(),
            Parameters::default(),
            &NoScouts,
            UpdateMode::default(),
        )
        .unwrap();
        let recorder = Recorder::default();
        let mut sim = Simulation::new(flock).with_renderer(recorder.clone());

        let mut seen = 0;
        sim.run(5, |_| seen += 1).unwrap();

        assert_eq!(seen, 5);
        assert_eq!(*recorder.steps.borrow(), vec![1, 2, 3, 4, 5]);
        assert!(*recorder.finished.borrow());
        assert_eq!(sim.into_flock().step_count(), 5);
    }
}
