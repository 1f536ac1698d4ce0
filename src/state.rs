//! Dashboard state
//!
//! `ViewState` is owned by the controller and mutated only inside its event
//! loop. The viewer sees it through `Snapshot`s and reads rendered charts
//! from the shared `ChartBoard`.

use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::chart::{BarSpec, ChartSink, ChartSpec, Container, HeatmapSpec, MapSpec};
use crate::config::DefaultsConfig;
use crate::debounce::SliderPhase;
use crate::model::{Drilldown, HeatmapGroup, Year};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Animation,
    Heatmap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub current_year: Year,
    pub drilldown: Drilldown,
    pub heatmap_group: HeatmapGroup,
    pub is_playing: bool,
    pub active_tab: Tab,
}

impl ViewState {
    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            current_year: defaults.year,
            drilldown: defaults.drilldown,
            heatmap_group: defaults.heatmap_group,
            is_playing: false,
            active_tab: Tab::Animation,
        }
    }

    pub fn year_label(&self) -> String {
        format!("Year: {}", self.current_year)
    }
}

/// Outcome of the most recent fetch, shown as a status line
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Updated { at: DateTime<Local> },
    Failed { message: String },
}

impl Status {
    pub fn describe(&self) -> String {
        match self {
            Status::Idle => String::new(),
            Status::Loading => "Loading…".to_string(),
            Status::Updated { at } => format!("Updated {}", at.format("%H:%M:%S")),
            Status::Failed { message } => format!("Update failed: {}", message),
        }
    }
}

/// What the controller publishes after every state change
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub view: ViewState,
    pub slider: SliderPhase,
    pub status: Status,
    pub animation_running: bool,
    pub in_flight: usize,
}

impl Snapshot {
    pub fn initial(view: ViewState) -> Self {
        Self {
            view,
            slider: SliderPhase::Idle,
            status: Status::Idle,
            animation_running: false,
            in_flight: 0,
        }
    }
}

/// Latest spec per container
#[derive(Debug, Default)]
pub struct ChartBoard {
    pub map: Option<MapSpec>,
    pub bar: Option<BarSpec>,
    pub heatmap: Option<HeatmapSpec>,
    /// Bumped on every render so viewers can spot changes
    pub revision: u64,
}

impl ChartBoard {
    pub fn shared() -> SharedBoard {
        Arc::new(Mutex::new(ChartBoard::default()))
    }

    /// Replace the container's content with `spec`
    pub fn replace(&mut self, spec: ChartSpec) {
        match spec {
            ChartSpec::Map(map) => self.map = Some(map),
            ChartSpec::Bar(bar) => self.bar = Some(bar),
            ChartSpec::Heatmap(heatmap) => self.heatmap = Some(heatmap),
        }
        self.revision += 1;
    }
}

pub type SharedBoard = Arc<Mutex<ChartBoard>>;

/// Lock the board, recovering from a poisoned lock
pub fn lock_board(board: &SharedBoard) -> MutexGuard<'_, ChartBoard> {
    board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sink writing into a shared board, with a hook run after each render
pub struct BoardSink<F> {
    board: SharedBoard,
    on_render: F,
}

impl<F> BoardSink<F>
where
    F: FnMut(Container) + Send + 'static,
{
    pub fn new(board: SharedBoard, on_render: F) -> Self {
        Self { board, on_render }
    }
}

impl<F> ChartSink for BoardSink<F>
where
    F: FnMut(Container) + Send + 'static,
{
    fn render(&mut self, container: Container, spec: ChartSpec) {
        debug_assert_eq!(container, spec.container());
        lock_board(&self.board).replace(spec);
        (self.on_render)(container);
    }
}
