use std::{
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

use animation::animation_items;
use egui::Context;
use error::error_dialog;
use load::model_load;
use perf::perf_info;

use crate::{
    config::ModelKind,
    perf::PerformanceTracker,
    renderer::{animation::PlaybackMode, Renderer},
};

mod animation;
mod error;
mod load;
mod perf;

#[derive(Debug, Default)]
pub struct GuiState {
    errors: Vec<String>,
    // Models whose load request is still running
    pending_loads: Vec<PathBuf>,
}

impl GuiState {
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn dismiss_error(&mut self, index: usize) {
        if index < self.errors.len() {
            self.errors.remove(index);
        }
    }

    pub fn load_started(&mut self, path: PathBuf) {
        self.pending_loads.push(path);
    }

    /// Clears one pending entry for `path`. A path requested twice stays
    /// pending until both loads finish.
    pub fn load_finished(&mut self, path: &Path) {
        if let Some(index) = self.pending_loads.iter().position(|pending| pending == path) {
            self.pending_loads.remove(index);
        }
    }

    pub fn pending_loads(&self) -> &[PathBuf] {
        &self.pending_loads
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuiAction {
    LoadModel(ModelKind, PathBuf),
    StopAnimation(usize),
    StartAnimation(usize, PlaybackMode),
}

pub struct GuiParam<'a> {
    pub renderer: &'a Renderer,
    pub perf_tracker: &'a PerformanceTracker,
    pub show_stats: bool,
    pub show_panels: bool,
    pub gui_actions_tx: &'a Sender<GuiAction>,
}

pub fn gui_main(ctx: &Context, param: GuiParam, state: &mut GuiState) {
    if param.show_stats {
        perf_info(ctx, param.perf_tracker);
    }
    if param.show_panels {
        model_load(ctx, state.pending_loads(), param.gui_actions_tx);
        animation_items(ctx, param.renderer.animation_groups(), param.gui_actions_tx);
    }

    let mut remove_index = Vec::new();
    for (index, error) in state.errors.iter().enumerate() {
        error_dialog(ctx, index, error, || {
            remove_index.push(index);
        });
    }
    for index in remove_index.into_iter().rev() {
        state.dismiss_error(index);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn errors_are_dismissed_by_index() {
        let mut state = GuiState::default();
        state.add_error("first".to_string());
        state.add_error("second".to_string());
        state.dismiss_error(0);
        assert_eq!(state.errors(), ["second".to_string()]);
        state.dismiss_error(5);
        assert_eq!(state.errors().len(), 1);
    }

    #[test]
    fn pending_loads_are_tracked() {
        let mut state = GuiState::default();
        let path = PathBuf::from("models/girl.json");
        state.load_started(path.clone());
        assert_eq!(state.pending_loads(), [path.clone()]);
        state.load_finished(&path);
        assert!(state.pending_loads().is_empty());
    }

    #[test]
    fn repeated_load_stays_pending_until_both_finish() {
        let mut state = GuiState::default();
        let path = PathBuf::from("models/monster.dae");
        state.load_started(path.clone());
        state.load_started(PathBuf::from("models/girl.json"));
        state.load_started(path.clone());
        state.load_finished(&path);
        assert_eq!(
            state.pending_loads(),
            [PathBuf::from("models/girl.json"), path.clone()]
        );
        state.load_finished(&path);
        assert_eq!(state.pending_loads(), [PathBuf::from("models/girl.json")]);
    }
}
