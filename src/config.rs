use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use glam::{Vec3, Vec4};

use crate::{
    asset::loader::{json::KeyInterpolation, srgb_to_linear},
    renderer::{camera::Camera, uniform::light::FogParam},
};

/// Converts a `0xRRGGBB` sRGB color into linear RGB.
pub fn hex_to_linear(hex: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

fn parse_hex_color(value: &str) -> Result<u32, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix('#'))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16)
        .ok()
        .filter(|color| *color <= 0xffffff)
        .ok_or_else(|| format!("\"{}\" is not a RRGGBB color", value))
}

fn parse_sample_count(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(count @ (1 | 4)) => Ok(count),
        _ => Err(format!("unsupported sample count \"{}\", use 1 or 4", value)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModelKind {
    /// Legacy three.js JSON skinned mesh
    Json,
    /// Collada document
    #[default]
    Dae,
    /// glTF or GLB file
    Gltf,
}

/// Which animation clips start once a model is in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSelection {
    First,
    All,
}

/// How a kind of model is placed and animated after it arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPreset {
    pub kind: ModelKind,
    pub file_name: Option<PathBuf>,
    pub position: Vec3,
    pub scale: f32,
    pub force_skinning: bool,
    pub convert_up_axis: bool,
    pub clips: ClipSelection,
    pub interpolation: KeyInterpolation,
}

impl ModelPreset {
    pub fn for_kind(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Json => Self {
                kind,
                file_name: Some(PathBuf::from("girl.json")),
                position: Vec3::new(0.0, -20.0, 0.0),
                scale: 40.0,
                force_skinning: true,
                convert_up_axis: false,
                clips: ClipSelection::First,
                interpolation: KeyInterpolation::CatmullRom,
            },
            ModelKind::Dae => Self {
                kind,
                file_name: Some(PathBuf::from("monster.dae")),
                position: Vec3::new(0.0, -10.0, 0.0),
                scale: 0.023,
                force_skinning: false,
                convert_up_axis: true,
                clips: ClipSelection::All,
                interpolation: KeyInterpolation::Linear,
            },
            ModelKind::Gltf => Self {
                kind,
                file_name: None,
                position: Vec3::ZERO,
                scale: 1.0,
                force_skinning: false,
                convert_up_axis: false,
                clips: ClipSelection::First,
                interpolation: KeyInterpolation::Linear,
            },
        }
    }

    /// Default file of this preset inside `models_dir`.
    pub fn default_path(&self, models_dir: &Path) -> Option<PathBuf> {
        self.file_name.as_ref().map(|name| models_dir.join(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub camera: Camera,
    pub fog: FogParam,
    pub ambient_color: Vec3,
    // Direction the sun light travels, with strength in w
    pub sun: Option<Vec4>,
    pub orbit_target: Vec3,
    pub orbit_max_distance: f32,
    pub sample_count: u32,
    pub model: ModelKind,
    pub model_path: Option<PathBuf>,
    pub models_dir: PathBuf,
    pub show_stats: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            fog: FogParam {
                color: hex_to_linear(0xc8e0ff),
                density: 0.0003,
            },
            ambient_color: hex_to_linear(0xffffff),
            sun: None,
            orbit_target: Vec3::ZERO,
            orbit_max_distance: 150.0,
            sample_count: 4,
            model: ModelKind::Dae,
            model_path: None,
            models_dir: PathBuf::from("models"),
            show_stats: true,
        }
    }
}

impl ViewerConfig {
    pub fn preset(&self) -> ModelPreset {
        ModelPreset::for_kind(self.model)
    }

    /// File to load at start up, if the selected kind has one.
    pub fn model_path(&self) -> Option<PathBuf> {
        self.model_path
            .clone()
            .or_else(|| self.preset().default_path(&self.models_dir))
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Plays skeletal animation of skinned models")]
pub struct Args {
    /// Kind of model loaded at start up
    #[arg(long, value_enum, default_value_t = ModelKind::Dae)]
    pub model: ModelKind,

    /// Model file, overriding the preset file of the chosen kind
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Directory holding the preset model files
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    /// Multisample count, 1 disables antialiasing
    #[arg(long, default_value_t = 4, value_parser = parse_sample_count)]
    pub msaa: u32,

    /// Hide the frame statistics overlay
    #[arg(long)]
    pub no_stats: bool,

    /// Add a directional light with this strength
    #[arg(long)]
    pub sun: Option<f32>,

    /// Fog and background color as RRGGBB
    #[arg(long, value_parser = parse_hex_color)]
    pub fog_color: Option<u32>,
}

impl From<Args> for ViewerConfig {
    fn from(args: Args) -> Self {
        let mut config = ViewerConfig {
            model: args.model,
            model_path: args.path,
            models_dir: args.models_dir,
            sample_count: args.msaa,
            show_stats: !args.no_stats,
            sun: args
                .sun
                .map(|strength| Vec3::new(-1.0, -1.0, -0.5).normalize().extend(strength)),
            ..Default::default()
        };
        if let Some(color) = args.fog_color {
            config.fog.color = hex_to_linear(color);
        }
        config
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_describe_the_scene() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.yfov, 45.0);
        assert_eq!(config.camera.znear, 1.0);
        assert_eq!(config.camera.zfar, 1000.0);
        assert_eq!(config.camera.eye, Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(config.orbit_max_distance, 150.0);
        assert_eq!(config.fog.density, 0.0003);
        assert_eq!(config.sample_count, 4);
        assert_eq!(config.model, ModelKind::Dae);
        assert_eq!(config.model_path(), Some(PathBuf::from("models/monster.dae")));
        assert_eq!(ModelKind::default(), ModelKind::Dae);
    }

    #[test]
    fn hex_colors_become_linear() {
        assert!(hex_to_linear(0xffffff).abs_diff_eq(Vec3::ONE, 1e-5));
        assert_eq!(hex_to_linear(0x000000), Vec3::ZERO);
        let fog = hex_to_linear(0xc8e0ff);
        assert!((fog.x - 0.578).abs() < 1e-3);
        assert!((fog.y - 0.745).abs() < 1e-3);
        assert!((fog.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn parses_hex_arguments() {
        assert_eq!(parse_hex_color("c8e0ff"), Ok(0xc8e0ff));
        assert_eq!(parse_hex_color("#c8e0ff"), Ok(0xc8e0ff));
        assert_eq!(parse_hex_color("0xC8E0FF"), Ok(0xc8e0ff));
        assert!(parse_hex_color("1000000").is_err());
        assert!(parse_hex_color("fog").is_err());
    }

    #[test]
    fn presets_place_models() {
        let json = ModelPreset::for_kind(ModelKind::Json);
        assert_eq!(json.position, Vec3::new(0.0, -20.0, 0.0));
        assert_eq!(json.scale, 40.0);
        assert!(json.force_skinning);
        assert_eq!(json.interpolation, KeyInterpolation::CatmullRom);

        let dae = ModelPreset::for_kind(ModelKind::Dae);
        assert_eq!(dae.scale, 0.023);
        assert!(dae.convert_up_axis);
        assert_eq!(dae.clips, ClipSelection::All);
        assert_eq!(
            dae.default_path(Path::new("assets")),
            Some(PathBuf::from("assets/monster.dae"))
        );

        assert!(ModelPreset::for_kind(ModelKind::Gltf).file_name.is_none());
    }

    #[test]
    fn arguments_override_defaults() {
        let args = Args::parse_from([
            "animated-objects",
            "--model",
            "json",
            "--msaa",
            "1",
            "--no-stats",
            "--sun",
            "0.8",
        ]);
        let config = ViewerConfig::from(args);
        assert_eq!(config.model, ModelKind::Json);
        assert_eq!(config.sample_count, 1);
        assert!(!config.show_stats);
        assert_eq!(config.sun.map(|sun| sun.w), Some(0.8));
        assert_eq!(config.model_path(), Some(PathBuf::from("models/girl.json")));
    }

    #[test]
    fn rejects_unsupported_sample_counts() {
        assert!(Args::try_parse_from(["animated-objects", "--msaa", "2"]).is_err());
    }
}
