use std::{path::PathBuf, sync::mpsc::Sender, thread};

use egui::{Align2, Context, Window};
use rfd::FileDialog;

use crate::config::ModelKind;

use super::GuiAction;

fn file_filter(kind: ModelKind) -> (&'static str, &'static [&'static str]) {
    match kind {
        ModelKind::Json => ("three.js JSON model", &["json", "js"]),
        ModelKind::Dae => ("Collada document", &["dae"]),
        ModelKind::Gltf => ("GLTF file", &["gltf", "glb"]),
    }
}

fn pick_model(kind: ModelKind, gui_actions_tx: &Sender<GuiAction>) {
    let tx = gui_actions_tx.clone();
    // The dialog blocks, keep it away from the frame loop
    thread::spawn(move || {
        let (name, extensions) = file_filter(kind);
        if let Some(file) = FileDialog::new().add_filter(name, extensions).pick_file() {
            let _ = tx.send(GuiAction::LoadModel(kind, file));
        }
    });
}

pub fn model_load(ctx: &Context, pending: &[PathBuf], gui_actions_tx: &Sender<GuiAction>) {
    Window::new("Load Model")
        .resizable([false, false])
        .pivot(Align2::RIGHT_TOP)
        .default_pos(ctx.screen_rect().right_top())
        .show(ctx, |ui| {
            if ui.button("Load JSON").clicked() {
                pick_model(ModelKind::Json, gui_actions_tx);
            }
            if ui.button("Load Collada").clicked() {
                pick_model(ModelKind::Dae, gui_actions_tx);
            }
            if ui.button("Load GLTF").clicked() {
                pick_model(ModelKind::Gltf, gui_actions_tx);
            }
            for path in pending {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(path.to_string_lossy());
                });
            }
        });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filters_match_loaders() {
        assert_eq!(file_filter(ModelKind::Dae).1, ["dae"]);
        assert!(file_filter(ModelKind::Gltf).1.contains(&"glb"));
    }
}
