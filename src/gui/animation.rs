use std::{collections::HashMap, sync::mpsc::Sender};

use egui::{Align2, CollapsingHeader, Context, ScrollArea, Ui, Window};

use crate::{
    asset::animation::{AnimationKeyFrames, AnimationSampler},
    renderer::animation::{AnimationGroupNode, AnimationNode, AnimationState, PlaybackMode},
};

use super::GuiAction;

fn keyframes_label<T: std::fmt::Debug + Clone>(keyframes: &AnimationKeyFrames<T>) -> String {
    match keyframes {
        AnimationKeyFrames::Linear(keyframes) => format!("Linear (keyframes: {})", keyframes.len()),
        AnimationKeyFrames::Step(keyframes) => format!("Step (keyframes: {})", keyframes.len()),
        AnimationKeyFrames::CubicSpline(keyframes) => {
            format!("CubicSpline (keyframes: {})", keyframes.len())
        }
        AnimationKeyFrames::CatmullRom(keyframes) => {
            format!("CatmullRom (keyframes: {})", keyframes.len())
        }
    }
}

fn sampler_label(sampler: &AnimationSampler) -> String {
    match sampler {
        AnimationSampler::Rotation(keyframes) => format!("Rotation, {}", keyframes_label(keyframes)),
        AnimationSampler::Translation(keyframes) => {
            format!("Translation, {}", keyframes_label(keyframes))
        }
        AnimationSampler::Scale(keyframes) => format!("Scale, {}", keyframes_label(keyframes)),
    }
}

fn animation_item(ui: &mut Ui, animation: &AnimationNode) {
    let label = format!("Channel #{}", animation.id());
    CollapsingHeader::new(label)
        .id_salt(animation.id())
        .show(ui, |ui| {
            ui.label(format!("Length: {:#.03}s", animation.length()));
            ui.label(format!("Target node: #{}", animation.target_node()));
            ui.label(sampler_label(animation.sampler()));
        });
}

fn animation_group(ui: &mut Ui, animation: &AnimationGroupNode, gui_actions_tx: &Sender<GuiAction>) {
    let label = match animation.label() {
        Some(label) => format!("Clip \"{}\"", label),
        None => format!("Clip #{}", animation.id()),
    };
    CollapsingHeader::new(label)
        .id_salt(animation.id())
        .show(ui, |ui| {
            ui.label(format!("Length: {:#.03}s", animation.length()));
            match animation.state() {
                AnimationState::Stopped => {
                    ui.label("Stopped");
                    ui.horizontal(|ui| {
                        for mode in [PlaybackMode::Once, PlaybackMode::Repeat, PlaybackMode::PingPong] {
                            if ui.button(mode.to_string()).clicked() {
                                let _ = gui_actions_tx
                                    .send(GuiAction::StartAnimation(animation.id(), mode));
                            }
                        }
                    });
                }
                AnimationState::Playing { mode, time } => {
                    ui.label(format!("{}: {:#.03}s", mode, time));
                    if ui.button("Stop").clicked() {
                        let _ = gui_actions_tx.send(GuiAction::StopAnimation(animation.id()));
                    }
                }
            };
            for node in animation.nodes() {
                animation_item(ui, node);
            }
        });
}

pub fn animation_items(
    ctx: &Context,
    animations: &HashMap<usize, AnimationGroupNode>,
    gui_actions_tx: &Sender<GuiAction>,
) {
    let mut animations: Vec<&AnimationGroupNode> = animations.values().collect();
    animations.sort_by_key(|animation| animation.id());
    Window::new("Animation")
        .pivot(Align2::LEFT_TOP)
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                if animations.is_empty() {
                    ui.label("No clips loaded");
                }
                for animation in animations {
                    animation_group(ui, animation, gui_actions_tx);
                }
            });
        });
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use crate::asset::animation::AnimationKeyFrame;

    use super::*;

    #[test]
    fn samplers_are_described() {
        let sampler = AnimationSampler::Translation(AnimationKeyFrames::CatmullRom(vec![
            AnimationKeyFrame {
                time: 0.0,
                value: Vec3::ZERO,
            },
            AnimationKeyFrame {
                time: 1.0,
                value: Vec3::ONE,
            },
        ]));
        assert_eq!(
            sampler_label(&sampler),
            "Translation, CatmullRom (keyframes: 2)"
        );
    }
}
