use std::time::{Duration, Instant};

/// Timing and population data for the most recent world step.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,
    pub solver_time: Duration,
    pub integrator_time: Duration,
    pub total_step_time: Duration,

    pub body_count: usize,
    pub contact_count: usize,
    pub touching_count: usize,
}

impl StepProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_step_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        let share = |d: Duration| (d.as_micros() as f32 / total_us) * 100.0;
        log::info!(
            "step {:.2} ms | bodies {} contacts {} touching {} | broad {:.1}% narrow {:.1}% solver {:.1}% integrate {:.1}%",
            self.total_step_time.as_secs_f32() * 1000.0,
            self.body_count,
            self.contact_count,
            self.touching_count,
            share(self.broad_phase_time),
            share(self.narrow_phase_time),
            share(self.solver_time),
            share(self.integrator_time),
        );
    }
}

/// Accumulates the lifetime of the timer into `output`.
pub struct PhaseTimer<'a> {
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(output: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for PhaseTimer<'a> {
    fn drop(&mut self) {
        *self.output += self.start.elapsed();
    }
}
