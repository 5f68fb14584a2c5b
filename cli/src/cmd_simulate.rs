//! `mailroute simulate` — replay the adaptive score against synthetic outages.
//!
//! Two providers run on a virtual clock at a fixed message rate: a preferred
//! one that fails according to a scenario and an always-healthy alternative
//! with a lower base score. Every tick the providers are ordered by score and
//! tried in turn until one accepts the message. With scoring disabled the
//! order is random, which gives the baseline failure rate to compare with.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use mailroute_core::{
    BackoffConfig, BackoffScore, Email, MailError, MailProvider, ManualClock, Outcome,
    ScorePolicy, SendResult,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

/// Failure pattern of the preferred provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Every send fails between 200 s and 800 s
    Outage,
    /// Half of the sends fail between 200 s and 800 s
    Degraded,
    /// 5% of the sends fail, all the time
    Random,
    /// Nothing fails
    Healthy,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Outage,
        Scenario::Degraded,
        Scenario::Random,
        Scenario::Healthy,
    ];

    fn fails(self, at: Duration, rng: &mut StdRng) -> bool {
        let t = at.as_secs_f64();
        let in_window = t > 200.0 && t < 800.0;
        match self {
            Scenario::Outage => in_window,
            Scenario::Degraded => in_window && rng.gen_bool(0.5),
            Scenario::Random => rng.gen_bool(0.05),
            Scenario::Healthy => false,
        }
    }
}

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub scenario: Scenario,
    /// Virtual run time.
    pub duration: Duration,
    /// Messages per second.
    pub rate: u32,
    pub preferred_base_score: f64,
    /// 0 leaves the preferred provider effectively alone.
    pub alternative_base_score: f64,
    /// Order providers at random instead of by score.
    pub disable_scoring: bool,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Outage,
            duration: Duration::from_secs(30 * 60),
            rate: 10,
            preferred_base_score: 50.0,
            alternative_base_score: 40.0,
            disable_scoring: false,
            seed: 0,
        }
    }
}

/// Counters and a per-minute score trace.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub attempts: u64,
    pub failures: u64,
    /// Messages no provider accepted.
    pub undelivered: u64,
    /// (elapsed seconds, preferred score, alternative score), one per minute.
    pub timeline: Vec<(u64, f64, f64)>,
}

impl SimulationReport {
    /// Failed attempts as a percentage of all attempts.
    pub fn failure_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.failures as f64 / self.attempts as f64 * 100.0
        }
    }
}

/// Uniform random score in `[0, 50)`, i.e. no preference at all.
struct RandomScore {
    rng: Mutex<StdRng>,
}

impl ScorePolicy for RandomScore {
    fn score(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .gen_range(0.0..50.0)
    }
}

/// Provider whose failures follow a [`Scenario`] on the virtual clock.
struct SimulatedProvider {
    name: String,
    scenario: Scenario,
    clock: Arc<ManualClock>,
    policy: Arc<dyn ScorePolicy>,
    rng: Mutex<StdRng>,
}

#[async_trait]
impl MailProvider for SimulatedProvider {
    async fn send(&self, email: &Email) -> Result<SendResult, MailError> {
        email.is_valid()?;

        let fails = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            self.scenario.fails(self.clock.elapsed(), &mut rng)
        };
        let result = if fails {
            Err(MailError::ServerFailure("simulated failure".into()))
        } else {
            Ok(SendResult::all_delivered(&self.name, email, json!({ "simulated": true })))
        };
        self.policy.record(Outcome::from(&result));
        result
    }

    fn score(&self) -> f64 {
        self.policy.score()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn provider(
    name: &str,
    scenario: Scenario,
    base_score: f64,
    clock: &Arc<ManualClock>,
    config: &SimulationConfig,
    seed: u64,
) -> Arc<SimulatedProvider> {
    let policy: Arc<dyn ScorePolicy> = if config.disable_scoring {
        Arc::new(RandomScore {
            rng: Mutex::new(StdRng::seed_from_u64(seed ^ 0x5eed)),
        })
    } else {
        Arc::new(BackoffScore::with_clock(
            BackoffConfig::with_base_score(base_score),
            clock.clone(),
        ))
    };
    Arc::new(SimulatedProvider {
        name: name.to_string(),
        scenario,
        clock: clock.clone(),
        policy,
        rng: Mutex::new(StdRng::seed_from_u64(seed)),
    })
}

/// Run one simulation.
pub async fn run_simulation(config: &SimulationConfig) -> Result<SimulationReport> {
    let clock = Arc::new(ManualClock::new());
    let preferred = provider(
        "preferred",
        config.scenario,
        config.preferred_base_score,
        &clock,
        config,
        config.seed,
    );
    let alternative = provider(
        "alternative",
        Scenario::Healthy,
        config.alternative_base_score,
        &clock,
        config,
        config.seed.wrapping_add(1),
    );

    let email = Email::new("valid@email.com", "anothervalid@email.com", "Subject", "Content")?;
    let rate = config.rate.max(1);
    let tick = Duration::from_secs(1) / rate;
    let ticks = config.duration.as_secs() * u64::from(rate);
    let per_minute = 60 * u64::from(rate);

    let mut report = SimulationReport {
        attempts: 0,
        failures: 0,
        undelivered: 0,
        timeline: Vec::new(),
    };

    for i in 0..ticks {
        let mut order = [&preferred, &alternative];
        // Stable sort: equal scores keep the preferred provider first.
        order.sort_by(|a, b| b.score().total_cmp(&a.score()));

        let mut delivered = false;
        for candidate in order {
            report.attempts += 1;
            match candidate.send(&email).await {
                Ok(_) => {
                    delivered = true;
                    break;
                }
                Err(_) => report.failures += 1,
            }
        }
        if !delivered {
            report.undelivered += 1;
        }

        if i % per_minute == 0 {
            report.timeline.push((
                clock.elapsed().as_secs(),
                preferred.score(),
                alternative.score(),
            ));
        }
        clock.advance(tick);
    }

    tracing::debug!(
        scenario = ?config.scenario,
        attempts = report.attempts,
        failures = report.failures,
        "simulation finished"
    );
    Ok(report)
}

/// Entry point of `mailroute simulate`.
pub async fn run(config: SimulationConfig, compare: bool, trace: bool) -> Result<()> {
    let report = run_simulation(&config).await?;

    println!("Scenario:        {:?}", config.scenario);
    println!(
        "Run:             {} s at {} msg/s, base scores {} / {}",
        config.duration.as_secs(),
        config.rate,
        config.preferred_base_score,
        config.alternative_base_score
    );
    println!(
        "Scoring:         {}",
        if config.disable_scoring { "disabled (random order)" } else { "backoff on failure" }
    );
    println!("Attempts:        {}", report.attempts);
    println!("Failures:        {}", report.failures);
    println!("Undelivered:     {}", report.undelivered);
    println!("Failure rate:    {:.2}%", report.failure_rate());

    if compare && !config.disable_scoring {
        let baseline = run_simulation(&SimulationConfig {
            disable_scoring: true,
            ..config.clone()
        })
        .await?;
        println!("Without scoring: {:.2}%", baseline.failure_rate());
    }

    if trace {
        println!();
        println!("{:>6}  {:>9}  {:>11}", "t [s]", "preferred", "alternative");
        for (t, a, b) in &report.timeline {
            println!("{t:>6}  {a:>9.2}  {b:>11.2}");
        }
    }
    Ok(())
}
