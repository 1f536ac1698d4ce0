//! Native dashboard viewer using egui
//!
//! Two tabs: the animated landing map + category bar chart, and the
//! composition heatmap. Widgets only send `Event`s; all state lives in the
//! controller, which runs on its own single-threaded runtime.

use eframe::egui;
use egui_plot::{Bar, BarChart, Legend, Plot, PlotPoints, Points};
use std::time::Duration;
use tracing::{error, info};

use crate::chart::{BarSpec, HeatmapSpec, MapSpec, Rgb};
use crate::client::ApiClient;
use crate::config::Config;
use crate::controller::{Controller, ControllerHandle, ControllerSettings, Event};
use crate::model::{Drilldown, HeatmapGroup, Year};
use crate::state::{lock_board, BoardSink, ChartBoard, SharedBoard, Snapshot, Status, Tab, ViewState};

/// Hover radius for map markers, in degrees
const HOVER_DISTANCE: f64 = 3.0;

/// Run the native dashboard window
pub fn run_viewer(config: Config) -> anyhow::Result<()> {
    let client = ApiClient::from_config(&config.api)?;
    let settings = ControllerSettings::from_config(&config);
    let view = ViewState::from_defaults(&config.defaults);
    info!("Connecting to {}", client.base_url());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_title("Meteorite Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Meteorite Dashboard",
        options,
        Box::new(move |cc| {
            let board = ChartBoard::shared();
            let ctx = cc.egui_ctx.clone();
            let sink = BoardSink::new(board.clone(), move |_| ctx.request_repaint());
            let (controller, handle) = Controller::new(settings, view, client, sink);
            spawn_controller(controller)?;
            Ok(Box::new(DashboardApp::new(cc, handle, board)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

/// Drive the controller on a dedicated current-thread runtime
fn spawn_controller<D, S>(controller: Controller<D, S>) -> std::io::Result<()>
where
    D: crate::client::DataSource,
    S: crate::chart::ChartSink,
{
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    std::thread::Builder::new()
        .name("dashboard-controller".into())
        .spawn(move || runtime.block_on(controller.run()))?;
    Ok(())
}

struct DashboardApp {
    controller: ControllerHandle,
    board: SharedBoard,
    slider_year: i32,
}

impl DashboardApp {
    fn new(cc: &eframe::CreationContext<'_>, controller: ControllerHandle, board: SharedBoard) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let slider_year = controller.snapshot().view.current_year.value();
        Self {
            controller,
            board,
            slider_year,
        }
    }

    fn send(&self, event: Event) {
        if !self.controller.send(event) {
            error!("Controller is gone, dropping {:?}", event);
        }
    }

    fn tab_bar(&self, ui: &mut egui::Ui, snapshot: &Snapshot) {
        ui.horizontal(|ui| {
            ui.heading("Meteorite Dashboard");
            ui.separator();
            let active = snapshot.view.active_tab;
            if ui.selectable_label(active == Tab::Animation, "Meteorite Animation").clicked() && active != Tab::Animation {
                self.send(Event::SwitchTab(Tab::Animation));
            }
            if ui.selectable_label(active == Tab::Heatmap, "Composition Heatmap").clicked() && active != Tab::Heatmap {
                self.send(Event::SwitchTab(Tab::Heatmap));
            }
        });
    }

    fn animation_controls(&mut self, ui: &mut egui::Ui, snapshot: &Snapshot) {
        ui.horizontal(|ui| {
            let label = if snapshot.view.is_playing { "⏸ Pause" } else { "▶ Play" };
            if ui.button(label).clicked() {
                self.send(Event::TogglePlay);
            }

            ui.separator();
            let slider = egui::Slider::new(&mut self.slider_year, Year::MIN_VALUE..=Year::MAX_VALUE)
                .step_by(1.0)
                .show_value(false);
            if ui.add(slider).changed() {
                self.send(Event::SliderMoved(self.slider_year));
            } else {
                self.slider_year = snapshot.view.current_year.value();
            }
            ui.label(snapshot.view.year_label());

            ui.separator();
            let mut drilldown = snapshot.view.drilldown;
            egui::ComboBox::from_id_salt("drilldown")
                .selected_text(drilldown.label())
                .show_ui(ui, |ui| {
                    for option in Drilldown::ALL {
                        ui.selectable_value(&mut drilldown, option, option.label());
                    }
                });
            if drilldown != snapshot.view.drilldown {
                self.send(Event::DrilldownChanged(drilldown));
            }
        });
    }

    fn heatmap_controls(&self, ui: &mut egui::Ui, snapshot: &Snapshot) {
        ui.horizontal(|ui| {
            ui.label("Group by:");
            let mut group = snapshot.view.heatmap_group;
            egui::ComboBox::from_id_salt("heatmap_group")
                .selected_text(group.label())
                .show_ui(ui, |ui| {
                    for option in HeatmapGroup::ALL {
                        ui.selectable_value(&mut group, option, option.label());
                    }
                });
            if group != snapshot.view.heatmap_group {
                self.send(Event::HeatmapGroupChanged(group));
            }
        });
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshot = self.controller.snapshot();
        if snapshot.view.is_playing || snapshot.in_flight > 0 {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("tabs_panel").show(ctx, |ui| self.tab_bar(ui, &snapshot));

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            let text = snapshot.status.describe();
            match snapshot.status {
                Status::Failed { .. } => ui.colored_label(egui::Color32::LIGHT_RED, text),
                _ => ui.weak(text),
            };
        });

        // Clone out of the lock so painting never blocks the controller
        let (map, bar, heatmap) = {
            let board = lock_board(&self.board);
            (board.map.clone(), board.bar.clone(), board.heatmap.clone())
        };

        match snapshot.view.active_tab {
            Tab::Animation => {
                egui::TopBottomPanel::top("animation_controls").show(ctx, |ui| {
                    self.animation_controls(ui, &snapshot);
                });
                egui::SidePanel::right("bar_panel")
                    .min_width(360.0)
                    .show(ctx, |ui| match &bar {
                        Some(bar) => draw_bar_chart(ui, bar),
                        None => placeholder(ui),
                    });
                egui::CentralPanel::default().show(ctx, |ui| match &map {
                    Some(map) => draw_map(ui, map),
                    None => placeholder(ui),
                });
            }
            Tab::Heatmap => {
                egui::TopBottomPanel::top("heatmap_controls").show(ctx, |ui| {
                    self.heatmap_controls(ui, &snapshot);
                });
                egui::CentralPanel::default().show(ctx, |ui| match &heatmap {
                    Some(heatmap) => draw_heatmap(ui, heatmap),
                    None => placeholder(ui),
                });
            }
        }
    }
}

fn color32(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

fn placeholder(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.spinner();
    });
}

fn draw_map(ui: &mut egui::Ui, spec: &MapSpec) {
    ui.vertical_centered(|ui| ui.heading(&spec.title));

    let (center_lat, center_lon) = spec.center;
    let half_width = 180.0 / spec.zoom;
    let mut plot = Plot::new("landing_map")
        .data_aspect(1.0)
        .include_x(center_lon - half_width)
        .include_x(center_lon + half_width)
        .include_y((center_lat - half_width / 2.0).max(-90.0))
        .include_y((center_lat + half_width / 2.0).min(90.0))
        .x_axis_label("Longitude")
        .y_axis_label("Latitude");
    if spec.show_legend {
        plot = plot.legend(Legend::default());
    }

    let response = plot.show(ui, |plot_ui| {
        for trace in &spec.traces {
            for marker in &trace.markers {
                plot_ui.points(
                    Points::new(PlotPoints::new(vec![[marker.lon, marker.lat]]))
                        .radius(marker.size as f32 / 2.0)
                        .color(color32(trace.color))
                        .name(&trace.name),
                );
            }
        }
        plot_ui
            .pointer_coordinate()
            .and_then(|p| spec.nearest_marker(p.y, p.x, HOVER_DISTANCE))
            .map(|(_, marker)| marker.hover_text())
    });

    if let Some(text) = response.inner {
        response.response.on_hover_text(text);
    }
}

fn draw_bar_chart(ui: &mut egui::Ui, spec: &BarSpec) {
    ui.vertical_centered(|ui| ui.heading(&spec.title));

    let bars: Vec<Bar> = spec
        .bars
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            Bar::new(i as f64, entry.count as f64)
                .width(0.7)
                .fill(color32(entry.color))
                .name(format!("{}: {}", entry.label, entry.count))
        })
        .collect();

    let labels: Vec<String> = spec.bars.iter().map(|b| b.label.clone()).collect();
    Plot::new("category_bars")
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .include_y(0.0)
        .x_axis_formatter(move |mark, _range| {
            let index = mark.value.round();
            if (mark.value - index).abs() > f64::EPSILON || index < 0.0 {
                return String::new();
            }
            labels.get(index as usize).cloned().unwrap_or_default()
        })
        .y_axis_label("Count")
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars)));
}

fn draw_heatmap(ui: &mut egui::Ui, spec: &HeatmapSpec) {
    ui.vertical_centered(|ui| ui.heading(&spec.title));
    if spec.rows() == 0 || spec.columns() == 0 {
        ui.label("No composition data");
        return;
    }

    let label_width = 140.0;
    let label_height = 40.0;
    let available = ui.available_size();
    let (response, painter) = ui.allocate_painter(available, egui::Sense::hover());
    let rect = response.rect;

    let grid = egui::Rect::from_min_max(
        rect.min + egui::vec2(label_width, 0.0),
        rect.max - egui::vec2(0.0, label_height),
    );
    let cell_w = grid.width() / spec.columns() as f32;
    let cell_h = grid.height() / spec.rows() as f32;
    let font = egui::FontId::proportional(12.0);
    let text_color = ui.visuals().text_color();

    for (row, (values, label)) in spec.z.iter().zip(&spec.y_labels).enumerate() {
        for (col, &value) in values.iter().enumerate() {
            let min = grid.min + egui::vec2(col as f32 * cell_w, row as f32 * cell_h);
            let cell = egui::Rect::from_min_size(min, egui::vec2(cell_w, cell_h));
            painter.rect_filled(cell.shrink(0.5), 0.0, color32(spec.color_for(value)));
        }
        let y = grid.min.y + (row as f32 + 0.5) * cell_h;
        painter.text(
            egui::pos2(grid.min.x - 6.0, y),
            egui::Align2::RIGHT_CENTER,
            label,
            font.clone(),
            text_color,
        );
    }
    for (col, label) in spec.x_labels.iter().enumerate() {
        let x = grid.min.x + (col as f32 + 0.5) * cell_w;
        painter.text(
            egui::pos2(x, grid.max.y + 6.0),
            egui::Align2::CENTER_TOP,
            label,
            font.clone(),
            text_color,
        );
    }
    painter.text(
        egui::pos2(grid.center().x, rect.max.y),
        egui::Align2::CENTER_BOTTOM,
        &spec.x_title,
        font.clone(),
        text_color,
    );
    painter.text(
        egui::pos2(rect.min.x, rect.min.y),
        egui::Align2::LEFT_TOP,
        &spec.y_title,
        font,
        text_color,
    );

    let hovered = response.hover_pos().filter(|p| grid.contains(*p)).and_then(|p| {
        let col = ((p.x - grid.min.x) / cell_w) as usize;
        let row = ((p.y - grid.min.y) / cell_h) as usize;
        spec.hover_text(row, col)
    });
    if let Some(text) = hovered {
        response.on_hover_text(text);
    }
}
