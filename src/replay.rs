//! Session replay and standard engine assembly
//!
//! A [`ReplayFrame`] is one recorded simulation tick: delta time plus whatever
//! samples and domain events the rig captured that frame. [`Engine`] wires the
//! six standard metrics into a registry, routes frame payloads to the right
//! collectors, and cross-feeds derived values (tremor, reaction delay, head
//! motion) into the stress metric the way the live session driver does.

use crate::error::MetricsError;
use crate::events::AvatarEvent;
use crate::metrics::{
    AwarenessSample, ClassificationMetric, ControllerMovementMetric, GazeTrackingMetric,
    ReactionTimeMetric, SituationalAwarenessMetric, StressInputs, StressLevelMetric,
};
use crate::params::MetricParameters;
use crate::registry::{MetricRegistry, MetricsSink, SessionReport};
use crate::sample::{ControllerSample, GazeSample, Hand, Quat};
use serde::{Deserialize, Serialize};

/// One recorded simulation tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Frame delta time (seconds)
    pub dt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaze: Option<GazeSample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controllers: Vec<ControllerSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation: Option<AwarenessSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress: Option<StressInputs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<AvatarEvent>,
}

impl ReplayFrame {
    /// Validate frame invariants the engine relies on
    pub fn validate(&self) -> Result<(), MetricsError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(MetricsError::FrameParseError(format!(
                "dt must be positive and finite, got {}",
                self.dt
            )));
        }
        Ok(())
    }

    /// Parse newline-delimited JSON, one frame per line
    pub fn parse_ndjson(input: &str) -> Result<Vec<ReplayFrame>, MetricsError> {
        let mut frames = Vec::new();
        for (index, line) in input.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let frame: ReplayFrame = serde_json::from_str(trimmed).map_err(|e| {
                MetricsError::FrameParseError(format!("line {}: {}", index + 1, e))
            })?;
            frame.validate()?;
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Standard engine: the six metrics wired into one registry
pub struct Engine {
    registry: MetricRegistry,
    stress_base: StressInputs,
    prev_head: Option<Quat>,
}

impl Engine {
    /// Build the standard metric set with shared parameters
    pub fn new(scenario: &str, params: MetricParameters) -> Result<Self, MetricsError> {
        let mut registry = MetricRegistry::new(scenario);
        registry.register(Box::new(ClassificationMetric::new(params)?))?;
        registry.register(Box::new(ReactionTimeMetric::new(params)?))?;
        registry.register(Box::new(ControllerMovementMetric::new(params)?))?;
        registry.register(Box::new(GazeTrackingMetric::new(params)?))?;
        registry.register(Box::new(StressLevelMetric::new(params)?))?;
        registry.register(Box::new(SituationalAwarenessMetric::new(params)?))?;
        Ok(Self {
            registry,
            stress_base: StressInputs::default(),
            prev_head: None,
        })
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MetricRegistry {
        &mut self.registry
    }

    pub fn add_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.registry.add_sink(sink);
    }

    pub fn start_session(&mut self) {
        self.registry.start_session();
    }

    fn metric_as<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.registry
            .metric_mut(name)
            .and_then(|m| m.as_any_mut().downcast_mut::<T>())
    }

    /// Apply one frame: route samples, publish events, advance the tick
    pub fn apply_frame(&mut self, frame: &ReplayFrame) {
        if let Some(base) = &frame.stress {
            self.stress_base = base.clone();
            self.registry
                .set_active_stressors(base.active_stressors.clone());
        }

        if let Some(gaze) = frame.gaze {
            if let Some(metric) = self.metric_as::<GazeTrackingMetric>("gaze_tracking") {
                metric.record_sample(gaze);
            }
        }

        for sample in &frame.controllers {
            if let Some(metric) =
                self.metric_as::<ControllerMovementMetric>("controller_movement")
            {
                metric.record_sample(*sample);
            }
        }

        if let Some(situation) = &frame.situation {
            if let Some(metric) =
                self.metric_as::<SituationalAwarenessMetric>("situational_awareness")
            {
                metric.record_sample(situation.clone());
            }
        }

        // Events see the samples already routed this frame, so spawn bearings
        // are judged against the current head pose
        for event in &frame.events {
            self.registry.publish_event(event);
        }

        let inputs = self.derive_stress_inputs(frame);
        if let Some(metric) = self.metric_as::<StressLevelMetric>("stress_level") {
            metric.record_inputs(inputs);
        }

        self.registry.tick(frame.dt);
    }

    /// Fold cross-metric signals into the stress component inputs
    fn derive_stress_inputs(&mut self, frame: &ReplayFrame) -> StressInputs {
        let mut inputs = self.stress_base.clone();

        let head_speed = frame.gaze.map(|gaze| {
            let speed = match self.prev_head {
                Some(prev) if frame.dt > 0.0 => {
                    prev.angle_to_deg(gaze.head.rotation) / frame.dt
                }
                _ => 0.0,
            };
            self.prev_head = Some(gaze.head.rotation);
            speed
        });
        if let Some(speed) = head_speed {
            inputs.head_angular_speed_dps = speed;
        }

        if let Some(trigger) = frame
            .controllers
            .iter()
            .map(|c| c.trigger)
            .fold(None::<f64>, |acc, t| Some(acc.map_or(t, |a| a.max(t))))
        {
            inputs.trigger_pressure = trigger;
        }

        if let Some(controller) =
            self.metric_as::<ControllerMovementMetric>("controller_movement")
        {
            let jitter = controller
                .tremor_score(Hand::Left)
                .max(controller.tremor_score(Hand::Right));
            inputs.movement_jitter = jitter;
        }

        if let Some(reaction) = self.metric_as::<ReactionTimeMetric>("reaction_time") {
            inputs.reaction_delay_sec = reaction.moving_average();
            inputs.missed_targets = reaction.missed_count();
        }

        inputs
    }

    /// Run a full recorded session and produce the composite report
    pub fn replay(&mut self, frames: &[ReplayFrame]) -> Result<SessionReport, MetricsError> {
        for frame in frames {
            frame.validate()?;
        }
        self.start_session();
        for frame in frames {
            self.apply_frame(frame);
        }
        Ok(self.registry.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PredictedClass;
    use crate::sample::{EntityCategory, EntityId, Pose, RaycastEntity, RaycastHit, Vec3};

    const DT: f64 = 1.0 / 60.0;

    fn gaze_at(point: Vec3, target: Option<RaycastEntity>) -> GazeSample {
        GazeSample {
            head: Pose::new(Vec3::ZERO, Quat::IDENTITY),
            eye_direction: Some(point.normalized()),
            eye_openness: Some(1.0),
            hit: Some(RaycastHit {
                point,
                entity: target,
            }),
        }
    }

    fn empty_frame() -> ReplayFrame {
        ReplayFrame {
            dt: DT,
            gaze: None,
            controllers: Vec::new(),
            situation: None,
            stress: None,
            events: Vec::new(),
        }
    }

    #[test]
    fn test_parse_ndjson() {
        let input = r#"
{"dt": 0.016}
{"dt": 0.016, "gaze": {"head": {"position": {"x":0,"y":0,"z":0}, "rotation": {"x":0,"y":0,"z":0,"w":1}}}}

{"dt": 0.016, "events": [{"kind":"spawned","id":1,"category":"hostile","timestamp":0.5,"position":{"x":0,"y":0,"z":5}}]}
"#;
        let frames = ReplayFrame::parse_ndjson(input).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[1].gaze.is_some());
        assert_eq!(frames[2].events.len(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        let err = ReplayFrame::parse_ndjson("not json\n").unwrap_err();
        assert!(matches!(err, MetricsError::FrameParseError(_)));
    }

    #[test]
    fn test_validate_rejects_bad_dt() {
        let mut frame = empty_frame();
        frame.dt = 0.0;
        assert!(frame.validate().is_err());
        frame.dt = f64::NAN;
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_engine_registers_standard_metrics() {
        let engine = Engine::new("test", MetricParameters::default()).unwrap();
        let names = engine.registry().metric_names();
        for expected in [
            "classification",
            "reaction_time",
            "controller_movement",
            "gaze_tracking",
            "stress_level",
            "situational_awareness",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_replay_end_to_end() {
        let params = MetricParameters {
            sampling_rate_hz: 240.0,
            ..Default::default()
        };
        let mut engine = Engine::new("replay-test", params).unwrap();

        let hostile = RaycastEntity {
            id: EntityId(1),
            category: EntityCategory::Hostile,
            trackable: true,
        };

        let mut frames = Vec::new();
        // Spawn a hostile half a second in
        let mut spawn_frame = empty_frame();
        spawn_frame.events.push(AvatarEvent::Spawned {
            id: EntityId(1),
            category: EntityCategory::Hostile,
            timestamp: 0.0,
            position: Vec3::new(0.0, 0.0, 10.0),
        });
        frames.push(spawn_frame);

        // Operator fixates the target for a second
        for _ in 0..60 {
            let mut frame = empty_frame();
            frame.gaze = Some(gaze_at(Vec3::new(0.0, 0.0, 10.0), Some(hostile)));
            frames.push(frame);
        }

        // Then classifies it
        let mut classify_frame = empty_frame();
        classify_frame.events.push(AvatarEvent::Classified {
            id: EntityId(1),
            category: EntityCategory::Hostile,
            predicted: PredictedClass::Hostile,
            timestamp: 1.0,
            position: Vec3::new(0.0, 0.0, 10.0),
        });
        frames.push(classify_frame);

        let report = engine.replay(&frames).unwrap();

        assert_eq!(report.reports.len(), 6);
        assert_eq!(report.scenario, "replay-test");

        let classification = &report.reports["classification"];
        assert_eq!(classification.sample_count, 1);
        assert_eq!(classification.additional["accuracy"].as_f64(), Some(1.0));

        let reaction = &report.reports["reaction_time"];
        assert_eq!(reaction.sample_count, 1);
        assert!((reaction.mean - 1.0).abs() < 1e-9);

        let gaze = &report.reports["gaze_tracking"];
        assert!(gaze.sample_count >= 1);

        // Stress engine ran every frame
        let stress = &report.reports["stress_level"];
        assert!(stress.sample_count > 0);
    }

    #[test]
    fn test_round_trip_frame_serialization() {
        let mut frame = empty_frame();
        frame.gaze = Some(gaze_at(Vec3::new(0.0, 0.0, 5.0), None));
        frame.stress = Some(StressInputs {
            environmental_level: 40.0,
            active_stressors: vec!["alarm".to_string()],
            ..Default::default()
        });

        let json = serde_json::to_string(&frame).unwrap();
        let parsed: ReplayFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stress.unwrap().environmental_level, 40.0);
        assert!(parsed.gaze.is_some());
    }
}
