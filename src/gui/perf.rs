use egui::{Align2, Context, Window};
use egui_plot::{Line, Plot, PlotPoints};

use crate::perf::PerformanceTracker;

const STATS_OFFSET: f32 = 50.0;

pub fn perf_info(ctx: &Context, perf_tracker: &PerformanceTracker) {
    Window::new("Stats")
        .resizable([false, false])
        .collapsible(false)
        .anchor(Align2::LEFT_BOTTOM, [STATS_OFFSET, -STATS_OFFSET])
        .show(ctx, |ui| {
            match perf_tracker.fps() {
                Some(fps) => {
                    ui.label(format!("FPS: {:#.1}", fps));
                }
                None => {
                    ui.label("FPS: unknown");
                }
            };

            match perf_tracker.last_frame_time() {
                Some(time) => {
                    ui.label(format!("Frame time: {:#.2}ms", time.as_secs_f32() * 1000.0));
                }
                None => {
                    ui.label("Frame time: unknown");
                }
            };

            match perf_tracker.avg_frame_time() {
                Some(time) => {
                    ui.label(format!(
                        "Avg frame time: {:#.2}ms",
                        time.as_secs_f32() * 1000.0
                    ));
                }
                None => {
                    ui.label("Avg frame time: unknown");
                }
            };

            let points: PlotPoints = perf_tracker
                .frame_time()
                .iter()
                .enumerate()
                .map(|(index, time)| [index as f64, time.as_secs_f64() * 1000.0])
                .collect();
            Plot::new("frame_time_plot")
                .height(60.0)
                .width(160.0)
                .include_y(0.0)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .allow_boxed_zoom(false)
                .show_x(false)
                .show(ui, |plot_ui| plot_ui.line(Line::new(points)));
        });
}
