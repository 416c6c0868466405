//! Decide command - drive a module through a short simulated run.

use super::load_config;
use anyhow::Result;
use clap::Args;
use pitlane_core::{DecisionRequest, DecisionResponse, Vec2};
use pitlane_host::adapter::DecisionAdapter;
use pitlane_host::registry::DecisionRegistry;
use serde_json::json;

/// Throttle and brake acceleration, in world units per second squared.
const ACCELERATION: f64 = 40.0;
/// Turn rate at full steering lock, in radians per second.
const TURN_RATE: f64 = 2.5;

/// Initial request fields.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Horizontal position
    #[arg(long, default_value = "123")]
    x: f64,

    /// Vertical position
    #[arg(long, default_value = "45")]
    y: f64,

    /// Speed
    #[arg(long, default_value = "10")]
    speed: f64,

    /// Heading in radians
    #[arg(long, default_value = "0")]
    heading: f64,

    /// Car body width
    #[arg(long, default_value = "50")]
    body_width: f64,

    /// Car body height
    #[arg(long, default_value = "20")]
    body_height: f64,

    /// Environment width
    #[arg(long, default_value = "800")]
    env_width: f64,

    /// Environment height
    #[arg(long, default_value = "600")]
    env_height: f64,

    /// Seconds per tick
    #[arg(long, default_value = "0.016")]
    dt: f64,
}

impl RequestArgs {
    fn to_request(&self) -> DecisionRequest {
        DecisionRequest::new(self.x, self.y)
            .with_speed(self.speed)
            .with_heading(self.heading)
            .with_body(self.body_width, self.body_height)
            .with_environment(self.env_width, self.env_height)
            .with_elapsed_time(self.dt)
    }
}

/// Run the decide command.
pub async fn run(url: &str, args: RequestArgs, ticks: u32, config: Option<&str>) -> Result<()> {
    let config = load_config(config)?;
    let registry = DecisionRegistry::from_config(&config)?;
    let adapter = registry.get(url).await?;

    tracing::info!(url = %url, variant = ?adapter.variant(), ticks, "Running decisions");

    let mut request = args.to_request();
    for tick in 0..ticks {
        let (response, error) = decide_or_neutral(&adapter, &request, tick);
        let line = json!({
            "tick": tick,
            "request": request,
            "response": response,
            "error": error,
        });
        println!("{}", serde_json::to_string(&line)?);
        request = advance(request, &response);
    }

    adapter.dispose()?;
    Ok(())
}

/// One tick's response. A failed decision is logged and replaced by the
/// neutral response so the run continues.
fn decide_or_neutral(
    adapter: &DecisionAdapter,
    request: &DecisionRequest,
    tick: u32,
) -> (DecisionResponse, Option<String>) {
    match adapter.decide(request) {
        Ok(response) => (response, None),
        Err(e) => {
            tracing::warn!(
                url = %adapter.url(),
                tick,
                code = e.code(),
                error = %e,
                "Decision failed; using neutral response"
            );
            (DecisionResponse::neutral(), Some(e.to_string()))
        }
    }
}

/// Step simple car kinematics forward by one tick, clamped to the environment.
fn advance(request: DecisionRequest, response: &DecisionResponse) -> DecisionRequest {
    let dt = request.elapsed_time;

    let mut speed = request.speed;
    if response.accelerate {
        speed += ACCELERATION * dt;
    }
    if response.brake {
        speed -= ACCELERATION * dt;
    }
    let speed = speed.max(0.0);

    let heading = request.heading + f64::from(response.steering.as_scalar()) * TURN_RATE * dt;
    let x = request.position.x + heading.cos() * speed * dt;
    let y = request.position.y + heading.sin() * speed * dt;

    DecisionRequest {
        position: Vec2::new(
            x.clamp(0.0, request.environment_width),
            y.clamp(0.0, request.environment_height),
        ),
        speed,
        heading,
        ..request
    }
}
