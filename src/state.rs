use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    any::Any,
    iter,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::Instant,
};

use egui::{Context, ViewportId};
use egui_wgpu::{Renderer as EguiRenderer, ScreenDescriptor};
use egui_winit::State as EguiWinitState;
use glam::{Quat, Vec3};
use log::{debug, error, info, warn};
use wgpu::{
    util::{backend_bits_from_env, initialize_adapter_from_env, power_preference_from_env},
    Adapter, Backends, CommandEncoderDescriptor, CompositeAlphaMode, CreateSurfaceError, Device,
    DeviceDescriptor, Instance, InstanceDescriptor, LoadOp, Operations, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, RequestAdapterOptions,
    RequestDeviceError, StoreOp, Surface, SurfaceConfiguration, SurfaceError, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::{event::WindowEvent, window::Window};

use crate::{
    asset::{
        loader::{dae, gltf, json, LoadedModel, ModelLoadError},
        node::DecomposedTransform,
    },
    clock::Clock,
    config::{ClipSelection, ModelKind, ModelPreset, ViewerConfig},
    gui::{gui_main, GuiAction, GuiParam, GuiState},
    perf::PerformanceTracker,
    renderer::{
        animation::{AnimationState, PlaybackMode},
        controls::OrbitControls,
        loader::RendererAssetLoader,
        node::{
            light::{LightNode, LightParam},
            transform::TransformNode,
            RenderNodeItem,
        },
        pipeline::Pipelines,
        OngoingRenderState, Renderer, DEPTH_TEXTURE_FORMAT,
    },
};

#[derive(Debug)]
pub enum StateError {
    CreateSurface(CreateSurfaceError),
    NoAdapter,
    RequestDevice(RequestDeviceError),
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateError::CreateSurface(err) => write!(f, "Failed to create surface: {}", err),
            StateError::NoAdapter => write!(f, "Failed to acquire a graphic adapter"),
            StateError::RequestDevice(err) => write!(f, "Failed to acquire a device: {}", err),
        }
    }
}

impl Error for StateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StateError::CreateSurface(err) => Some(err),
            StateError::NoAdapter => None,
            StateError::RequestDevice(err) => Some(err),
        }
    }
}

impl From<CreateSurfaceError> for StateError {
    fn from(value: CreateSurfaceError) -> Self {
        StateError::CreateSurface(value)
    }
}

impl From<RequestDeviceError> for StateError {
    fn from(value: RequestDeviceError) -> Self {
        StateError::RequestDevice(value)
    }
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderResult {
    Succeed,
    // The frame was dropped, try again on the next redraw
    Skipped,
    OutOfMemory,
}

/// A finished load request, sent back from the worker thread.
struct ModelLoadResult {
    preset: ModelPreset,
    path: PathBuf,
    result: Result<LoadedModel, ModelLoadError>,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Runs the loader for `preset`. A panic inside a decoder becomes an error so
/// the result still reaches the frame loop.
fn load_model(preset: &ModelPreset, path: &Path) -> Result<LoadedModel, ModelLoadError> {
    panic::catch_unwind(AssertUnwindSafe(|| match preset.kind {
        ModelKind::Json => json::load_from_path(path, preset.interpolation),
        ModelKind::Dae => dae::load_from_path(path, preset.convert_up_axis),
        ModelKind::Gltf => gltf::load_from_path(path),
    }))
    .unwrap_or_else(|payload| {
        Err(ModelLoadError::Panicked(
            panic_message(payload.as_ref()).to_string(),
        ))
    })
}

/// Number of clips started once a model with `clip_count` clips arrives.
fn started_clips(selection: ClipSelection, clip_count: usize) -> usize {
    match selection {
        ClipSelection::First => clip_count.min(1),
        ClipSelection::All => clip_count,
    }
}

fn supports_sample_count(adapter: &Adapter, format: TextureFormat, sample_count: u32) -> bool {
    [format, DEPTH_TEXTURE_FORMAT].into_iter().all(|format| {
        adapter
            .get_texture_format_features(format)
            .flags
            .sample_count_supported(sample_count)
    })
}

pub struct State {
    window: Arc<Window>,
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    viewer_config: ViewerConfig,

    clock: Clock,
    perf_tracker: PerformanceTracker,

    renderer: Renderer,
    pipelines: Pipelines,
    controls: OrbitControls,

    load_tx: Sender<ModelLoadResult>,
    load_rx: Receiver<ModelLoadResult>,

    panels_active: bool,
    egui_renderer: EguiRenderer,
    egui_state: EguiWinitState,
    gui_state: GuiState,
    gui_actions_tx: Sender<GuiAction>,
    gui_actions_rx: Receiver<GuiAction>,
}

impl State {
    pub async fn new(window: Arc<Window>, viewer_config: ViewerConfig) -> Result<Self, StateError> {
        let size = window.inner_size();
        let size = (size.width.max(1), size.height.max(1));
        let instance = Instance::new(InstanceDescriptor {
            backends: backend_bits_from_env().unwrap_or(Backends::all()),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = match initialize_adapter_from_env(&instance, Some(&surface)) {
            Some(adapter) => adapter,
            None => instance
                .request_adapter(&RequestAdapterOptions {
                    compatible_surface: Some(&surface),
                    power_preference: power_preference_from_env().unwrap_or(PowerPreference::None),
                    ..Default::default()
                })
                .await
                .ok_or(StateError::NoAdapter)?,
        };
        info!("Using adapter {:?}", adapter.get_info());
        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Device"),
                    ..Default::default()
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(TextureFormat::Bgra8UnormSrgb);
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0,
            height: size.1,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(CompositeAlphaMode::Auto),
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let sample_count =
            if supports_sample_count(&adapter, surface_format, viewer_config.sample_count) {
                viewer_config.sample_count
            } else {
                warn!(
                    "{}x multisampling is not supported, antialiasing disabled",
                    viewer_config.sample_count
                );
                1
            };

        let renderer = Renderer::new(&device, &queue, size, surface_format, sample_count);
        let pipelines = Pipelines::new(&device, surface_format, sample_count);

        let mut controls =
            OrbitControls::new(viewer_config.orbit_target, viewer_config.orbit_max_distance);
        controls.resize(size.1);

        // The overlay is drawn in its own pass straight onto the surface
        let egui_renderer = EguiRenderer::new(&device, surface_format, None, 1, false);
        let egui_state = EguiWinitState::new(
            Context::default(),
            ViewportId::default(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let (gui_actions_tx, gui_actions_rx) = mpsc::channel();
        let (load_tx, load_rx) = mpsc::channel();

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            viewer_config,
            clock: Clock::new(),
            perf_tracker: PerformanceTracker::default(),
            renderer,
            pipelines,
            controls,
            load_tx,
            load_rx,
            panels_active: false,
            egui_renderer,
            egui_state,
            gui_state: GuiState::default(),
            gui_actions_tx,
            gui_actions_rx,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn setup_scene(&mut self) {
        let viewer_config = &self.viewer_config;
        self.renderer.state.set_fog(viewer_config.fog);
        let camera = viewer_config.camera.clone();
        self.renderer
            .state
            .update_camera(move |target| *target = camera);

        let ambient = LightNode::new(LightParam::Ambient {
            color: viewer_config.ambient_color,
        });
        self.renderer
            .add_node(RenderNodeItem::Light(Box::new(ambient)));

        if let Some(sun) = viewer_config.sun {
            let direction = sun.truncate().normalize_or(Vec3::NEG_Y);
            let sun_light = LightNode::new(LightParam::Parallel {
                color: Vec3::ONE,
                strength: sun.w,
            });
            let sun_transform = TransformNode::from_decomposed_transform(
                DecomposedTransform {
                    rotation: Quat::from_rotation_arc(Vec3::NEG_Z, direction),
                    ..Default::default()
                },
                RenderNodeItem::Light(Box::new(sun_light)),
            );
            self.renderer
                .add_node(RenderNodeItem::Transform(Box::new(sun_transform)));
        }

        if let Some(path) = self.viewer_config.model_path() {
            self.request_model(self.viewer_config.model, path);
        }
    }

    fn request_model(&mut self, kind: ModelKind, path: PathBuf) {
        info!("Loading {:?} model from {}", kind, path.display());
        self.gui_state.load_started(path.clone());
        let preset = ModelPreset::for_kind(kind);
        let tx = self.load_tx.clone();
        thread::spawn(move || {
            let result = load_model(&preset, &path);
            let _ = tx.send(ModelLoadResult {
                preset,
                path,
                result,
            });
        });
    }

    pub fn load_json_model(&mut self, path: PathBuf) {
        self.request_model(ModelKind::Json, path);
    }

    pub fn load_dae_model(&mut self, path: PathBuf) {
        self.request_model(ModelKind::Dae, path);
    }

    pub fn load_gltf_model(&mut self, path: PathBuf) {
        self.request_model(ModelKind::Gltf, path);
    }

    fn add_model(&mut self, preset: ModelPreset, mut model: LoadedModel) {
        if preset.force_skinning {
            model.set_skinning();
        }
        let name = model.name();
        info!(
            "Model {} loaded: {} nodes, {} skinned primitives, {} clips",
            name,
            model.node_count(),
            model.skinned_primitive_count(),
            model.animations.len()
        );

        let mut asset_loader =
            RendererAssetLoader::new(self.renderer.state.bind_group_layout(), &mut self.pipelines);
        let scene_group =
            asset_loader.load_scenes(&self.device, &self.queue, model.scenes, Some(name));
        let animations = asset_loader.load_animations(model.animations);

        let placement = TransformNode::from_decomposed_transform(
            DecomposedTransform::from_translation_scale(preset.position, preset.scale),
            scene_group,
        );
        self.renderer
            .add_node(RenderNodeItem::Transform(Box::new(placement)));

        let started = started_clips(preset.clips, animations.len());
        for (index, animation) in animations.into_iter().enumerate() {
            let id = self.renderer.add_animation_group(animation);
            if index < started {
                self.renderer
                    .set_animation_state(id, AnimationState::play(PlaybackMode::Repeat));
            }
        }
    }

    fn handle_loaded_models(&mut self) {
        while let Ok(loaded) = self.load_rx.try_recv() {
            self.gui_state.load_finished(&loaded.path);
            match loaded.result {
                Ok(model) => self.add_model(loaded.preset, model),
                Err(err) => {
                    error!("Failed to load {}: {}", loaded.path.display(), err);
                    self.gui_state.add_error(format!(
                        "Failed to load \"{}\": {}",
                        loaded.path.display(),
                        err
                    ));
                }
            }
        }
    }

    fn handle_gui_actions(&mut self) {
        while let Ok(action) = self.gui_actions_rx.try_recv() {
            match action {
                GuiAction::LoadModel(kind, path) => self.request_model(kind, path),
                GuiAction::StopAnimation(id) => {
                    self.renderer
                        .set_animation_state(id, AnimationState::Stopped);
                }
                GuiAction::StartAnimation(id, mode) => {
                    self.renderer
                        .set_animation_state(id, AnimationState::play(mode));
                }
            }
        }
    }

    pub fn panels_active(&self) -> bool {
        self.panels_active
    }

    pub fn set_panels_active(&mut self, active: bool) {
        self.panels_active = active;
    }

    /// Feeds a window event to the overlay, then to the orbit controls if the
    /// overlay did not use it.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        let response = self.egui_state.on_window_event(&self.window, event);
        if response.consumed && !self.controls.is_dragging() {
            return;
        }
        self.controls.handle_event(event);
    }

    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 == 0 || new_size.1 == 0 {
            debug!("Ignore resize to zero size: {:?}", new_size);
            return;
        }
        self.config.width = new_size.0;
        self.config.height = new_size.1;
        self.surface.configure(&self.device, &self.config);
        self.renderer.state.resize(&self.device, new_size);
        self.controls.resize(new_size.1);
    }

    pub fn update(&mut self) {
        self.handle_gui_actions();
        self.handle_loaded_models();

        let delta = self.clock.get_delta();
        let controls = &mut self.controls;
        self.renderer.state.update_camera(|camera| {
            controls.update(camera, delta);
        });
        self.renderer.advance_animations(delta);
    }

    fn render_overlay(&mut self, texture_view: &TextureView) {
        let ctx = self.egui_state.egui_ctx().clone();
        let input = self.egui_state.take_egui_input(&self.window);
        let full_output = ctx.run(input, |ctx| {
            gui_main(
                ctx,
                GuiParam {
                    renderer: &self.renderer,
                    perf_tracker: &self.perf_tracker,
                    show_stats: self.viewer_config.show_stats,
                    show_panels: self.panels_active,
                    gui_actions_tx: &self.gui_actions_tx,
                },
                &mut self.gui_state,
            );
        });
        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: ctx.zoom_factor() * self.window.scale_factor() as f32,
        };
        let paint_jobs = ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Overlay Encoder"),
            });
        let user_buffers = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut render_pass = encoder
                .begin_render_pass(&RenderPassDescriptor {
                    label: Some("Overlay Pass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: texture_view,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Load,
                            store: StoreOp::Store,
                        },
                    })],
                    ..Default::default()
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }
        self.queue
            .submit(user_buffers.into_iter().chain(iter::once(encoder.finish())));

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    pub fn render(&mut self) -> RenderResult {
        let start_time = Instant::now();
        self.renderer.prepare(&self.device, &self.queue);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                warn!("Surface is lost or outdated, drop this frame");
                self.surface.configure(&self.device, &self.config);
                self.window.request_redraw();
                return RenderResult::Skipped;
            }
            Err(SurfaceError::Timeout) => {
                warn!("Timed out when allocating a frame");
                self.window.request_redraw();
                return RenderResult::Skipped;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("Out of memory when allocating a frame");
                return RenderResult::OutOfMemory;
            }
        };
        let texture_view = output
            .texture
            .create_view(&TextureViewDescriptor::default());

        let mut ongoing_state =
            OngoingRenderState::new(&self.device, &texture_view, &self.renderer.state);
        self.renderer.render(&mut ongoing_state);
        ongoing_state.finish(&self.queue);

        self.render_overlay(&texture_view);

        self.window.pre_present_notify();
        output.present();
        self.window.request_redraw();

        let end_time = Instant::now();
        self.perf_tracker.add_sample(end_time - start_time, end_time);
        RenderResult::Succeed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clip_selection_limits_started_clips() {
        assert_eq!(started_clips(ClipSelection::First, 3), 1);
        assert_eq!(started_clips(ClipSelection::First, 0), 0);
        assert_eq!(started_clips(ClipSelection::All, 3), 3);
    }

    #[test]
    fn missing_model_reports_io_error() {
        let preset = ModelPreset::for_kind(ModelKind::Json);
        let result = load_model(&preset, Path::new("does/not/exist.json"));
        assert!(matches!(result, Err(ModelLoadError::Io(_))));
    }

    #[test]
    fn malformed_collada_reports_error() {
        let text = r#"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <library_geometries/>
  <library_animations>
    <animation id="Armature_Bone_pose_matrix"/>
  </library_animations>
</COLLADA>"#;
        let path = std::env::temp_dir().join(format!(
            "animated-objects-malformed-{}.dae",
            std::process::id()
        ));
        std::fs::write(&path, text).unwrap();

        let preset = ModelPreset::for_kind(ModelKind::Dae);
        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();
        thread::spawn(move || {
            let _ = tx.send(load_model(&preset, &worker_path));
        })
        .join()
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        let result = rx.recv().unwrap();
        match result {
            Err(ModelLoadError::Panicked(message)) => assert!(message.contains("channel")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");
        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
