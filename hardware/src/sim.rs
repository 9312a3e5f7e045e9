//! Simulated continuous-rotation servo.
//!
//! Stands in for real hardware in tests and in the `track_sim` binary. The
//! servo integrates commanded power into an angle (power 1.0 turns at
//! [`DEFAULT_DEGREES_PER_SECOND`]) between hard stops, records every command
//! it receives, and can be told to fail or stall to exercise error paths.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::servo::{ServoCommandError, ServoDriver, ServoResult};

/// Angular speed at full power.
pub const DEFAULT_DEGREES_PER_SECOND: f64 = 120.0;

/// Hard stops of the simulated bracket, in degrees.
pub const TRAVEL_RANGE_DEG: (f64, f64) = (0.0, 180.0);

struct SimState {
    commands: Vec<f64>,
    power: f64,
    angle_deg: f64,
    last_update: Instant,
    failures_remaining: usize,
    fail_always: bool,
    response_delay: Duration,
}

impl SimState {
    fn integrate(&mut self, degrees_per_second: f64) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f64();
        self.angle_deg = (self.angle_deg + self.power * degrees_per_second * dt)
            .clamp(TRAVEL_RANGE_DEG.0, TRAVEL_RANGE_DEG.1);
        self.last_update = now;
    }
}

/// In-memory servo with command recording and fault injection.
pub struct SimulatedServo {
    name: String,
    degrees_per_second: f64,
    state: Mutex<SimState>,
}

impl SimulatedServo {
    /// Servo parked at mid-travel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            degrees_per_second: DEFAULT_DEGREES_PER_SECOND,
            state: Mutex::new(SimState {
                commands: Vec::new(),
                power: 0.0,
                angle_deg: (TRAVEL_RANGE_DEG.0 + TRAVEL_RANGE_DEG.1) / 2.0,
                last_update: Instant::now(),
                failures_remaining: 0,
                fail_always: false,
                response_delay: Duration::ZERO,
            }),
        }
    }

    /// Override the full-power angular speed.
    pub fn with_speed(mut self, degrees_per_second: f64) -> Self {
        self.degrees_per_second = degrees_per_second;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every power value accepted so far, oldest first.
    pub fn commands(&self) -> Vec<f64> {
        self.lock().commands.clone()
    }

    /// Number of accepted commands.
    pub fn command_count(&self) -> usize {
        self.lock().commands.len()
    }

    /// Most recent accepted power.
    pub fn last_power(&self) -> Option<f64> {
        self.lock().commands.last().copied()
    }

    /// Current simulated angle in degrees.
    pub fn angle_deg(&self) -> f64 {
        let mut state = self.lock();
        state.integrate(self.degrees_per_second);
        state.angle_deg
    }

    /// Reject the next `count` commands.
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    /// Reject every command until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.lock().fail_always = failing;
    }

    /// Delay every response, e.g. to trip the actuator timeout.
    pub fn set_response_delay(&self, delay: Duration) {
        self.lock().response_delay = delay;
    }
}

#[async_trait]
impl ServoDriver for SimulatedServo {
    fn name(&self) -> &str {
        &self.name
    }

    async fn set_power(&self, power: f64) -> ServoResult<()> {
        let delay = self.lock().response_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.fail_always || state.failures_remaining > 0 {
            state.failures_remaining = state.failures_remaining.saturating_sub(1);
            return Err(ServoCommandError::Rejected {
                servo: self.name.clone(),
                reason: "injected fault".to_string(),
            });
        }

        state.integrate(self.degrees_per_second);
        state.power = power;
        state.commands.push(power);
        Ok(())
    }
}
