use ts_sim::SimProgress;

/// Coarse phases of a run as seen by a front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingScenario,
    Initializing,
    Running,
    Saving,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::LoadingScenario => "Loading scenario",
            RunStage::Initializing => "Initializing",
            RunStage::Running => "Running",
            RunStage::Saving => "Saving",
            RunStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationProgress {
    pub sim_time: f64,
    pub duration: f64,
    pub fraction_complete: f64,
    pub step: u64,
    pub total_steps: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunProgressEvent {
    pub run_id: String,
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub simulation: Option<SimulationProgress>,
}

impl From<SimProgress> for SimulationProgress {
    fn from(p: SimProgress) -> Self {
        Self {
            sim_time: p.sim_time,
            duration: p.duration,
            fraction_complete: p.fraction_complete,
            step: p.step,
            total_steps: p.total_steps,
        }
    }
}
