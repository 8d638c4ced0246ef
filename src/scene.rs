use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Scale applied to the cubes that mark point light positions.
pub const LAMP_SCALE: f32 = 0.2;

/// Everything the frame loop draws: cube placements, lights and material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default = "default_shininess")]
    pub shininess: f32,
    #[serde(default = "default_cubes")]
    pub cubes: Vec<Vec3>,
    #[serde(default)]
    pub directional: DirectionalLight,
    #[serde(default = "default_point_lights")]
    pub point_lights: Vec<PointLight>,
    #[serde(default)]
    pub spot: SpotLight,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background: default_background(),
            shininess: default_shininess(),
            cubes: default_cubes(),
            directional: DirectionalLight::default(),
            point_lights: default_point_lights(),
            spot: SpotLight::default(),
        }
    }
}

impl Scene {
    /// Parses a scene description. Elements that are absent keep their
    /// defaults; a scene without `<cube>` or `<pointlight>` elements keeps
    /// the default set of each.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        let mut scene = Scene::default();

        scene.background = parse_color(optional_text(&root, "background"), scene.background)?;
        if let Some(material) = child(&root, "material") {
            scene.shininess = parse_f32(optional_text(&material, "shininess"), scene.shininess)?;
        }

        let cubes = root
            .children()
            .filter(|n| n.has_tag_name("cube"))
            .map(|node| {
                let text = required_text(&node, "position")?;
                parse_vec3(Some(text), Vec3::ZERO).context("invalid cube position")
            })
            .collect::<Result<Vec<_>>>()?;
        if !cubes.is_empty() {
            scene.cubes = cubes;
        }

        if let Some(node) = child(&root, "dirlight") {
            scene.directional = parse_directional(&node)?;
        }

        let point_lights = root
            .children()
            .filter(|n| n.has_tag_name("pointlight"))
            .map(|node| parse_point(&node))
            .collect::<Result<Vec<_>>>()?;
        if !point_lights.is_empty() {
            scene.point_lights = point_lights;
        }

        if let Some(node) = child(&root, "spotlight") {
            scene.spot = parse_spot(&node)?;
        }

        Ok(scene)
    }

    /// Model matrix of the `index`-th cube: translated to its position and
    /// rotated `20 * index` radians about (1, 0.3, 0.5).
    pub fn cube_model(&self, index: usize) -> Option<Mat4> {
        let position = *self.cubes.get(index)?;
        let angle = 20.0 * index as f32;
        let axis = Vec3::new(1.0, 0.3, 0.5).normalize();
        Some(Mat4::from_translation(position) * Mat4::from_axis_angle(axis, angle))
    }

    pub fn lamp_model(&self, index: usize) -> Option<Mat4> {
        let light = self.point_lights.get(index)?;
        Some(Mat4::from_translation(light.position) * Mat4::from_scale(Vec3::splat(LAMP_SCALE)))
    }
}

/// Distance falloff `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.4),
            specular: Vec3::splat(0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    #[serde(default)]
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ONE,
            attenuation: Attenuation::default(),
        }
    }
}

/// Flashlight attached to the camera; position and direction come from the
/// camera every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    #[serde(default)]
    pub attenuation: Attenuation,
    /// Inner cone half-angle in degrees.
    pub cutoff: f32,
    /// Outer cone half-angle in degrees.
    pub outer_cutoff: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            attenuation: Attenuation::default(),
            cutoff: 12.5,
            outer_cutoff: 15.0,
        }
    }
}

fn default_background() -> Color {
    Color::new(25.5, 25.5, 25.5)
}

fn default_shininess() -> f32 {
    32.0
}

fn default_cubes() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(2.0, 5.0, -15.0),
        Vec3::new(-1.5, -2.2, -2.5),
        Vec3::new(-3.8, -2.0, -12.3),
        Vec3::new(2.4, -0.4, -3.5),
        Vec3::new(-1.7, 3.0, -7.5),
        Vec3::new(1.3, -2.0, -2.5),
        Vec3::new(1.5, 2.0, -2.5),
        Vec3::new(1.5, 0.2, -1.5),
        Vec3::new(-1.3, 1.0, -1.5),
    ]
}

fn default_point_lights() -> Vec<PointLight> {
    vec![
        PointLight::at(Vec3::new(0.7, 0.2, 2.0)),
        PointLight::at(Vec3::new(2.3, -3.3, -4.0)),
        PointLight::at(Vec3::new(-4.0, 2.0, -12.0)),
        PointLight::at(Vec3::new(0.0, 0.0, -3.0)),
    ]
}

fn parse_directional(node: &Node<'_, '_>) -> Result<DirectionalLight> {
    let mut light = DirectionalLight::default();
    light.direction = parse_vec3(optional_text(node, "direction"), light.direction)?;
    light.ambient = parse_vec3(optional_text(node, "ambient"), light.ambient)?;
    light.diffuse = parse_vec3(optional_text(node, "diffuse"), light.diffuse)?;
    light.specular = parse_vec3(optional_text(node, "specular"), light.specular)?;
    Ok(light)
}

fn parse_point(node: &Node<'_, '_>) -> Result<PointLight> {
    let position = parse_vec3(Some(required_text(node, "position")?), Vec3::ZERO)
        .context("invalid point light position")?;
    let mut light = PointLight::at(position);
    light.ambient = parse_vec3(optional_text(node, "ambient"), light.ambient)?;
    light.diffuse = parse_vec3(optional_text(node, "diffuse"), light.diffuse)?;
    light.specular = parse_vec3(optional_text(node, "specular"), light.specular)?;
    light.attenuation = parse_attenuation(node, light.attenuation)?;
    Ok(light)
}

fn parse_spot(node: &Node<'_, '_>) -> Result<SpotLight> {
    let mut light = SpotLight::default();
    light.ambient = parse_vec3(optional_text(node, "ambient"), light.ambient)?;
    light.diffuse = parse_vec3(optional_text(node, "diffuse"), light.diffuse)?;
    light.specular = parse_vec3(optional_text(node, "specular"), light.specular)?;
    light.attenuation = parse_attenuation(node, light.attenuation)?;
    light.cutoff = parse_f32(optional_text(node, "cutoff"), light.cutoff)?;
    light.outer_cutoff = parse_f32(optional_text(node, "outer_cutoff"), light.outer_cutoff)?;
    Ok(light)
}

fn parse_attenuation(node: &Node<'_, '_>, default: Attenuation) -> Result<Attenuation> {
    Ok(Attenuation {
        constant: parse_f32(optional_text(node, "constant"), default.constant)?,
        linear: parse_f32(optional_text(node, "linear"), default.linear)?,
        quadratic: parse_f32(optional_text(node, "quadratic"), default.quadratic)?,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components<const N: usize>(value: &str, what: &str) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    let mut numbers = value.split_whitespace();
    for slot in out.iter_mut() {
        let component = numbers
            .next()
            .ok_or_else(|| anyhow!("{what} is missing components"))?;
        *slot = component
            .parse::<f32>()
            .with_context(|| format!("invalid {what} component {component:?}"))?;
    }
    Ok(out)
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => Ok(Vec3::from_array(parse_components::<3>(&value, "vector")?)),
        None => Ok(default),
    }
}

/// Colors stay in 0-255; a missing fourth component means opaque.
fn parse_color(value: Option<String>, default: Color) -> Result<Color> {
    let Some(value) = value else {
        return Ok(default);
    };
    let [r, g, b] = parse_components::<3>(&value, "color")?;
    let alpha = match value.split_whitespace().nth(3) {
        Some(alpha) => alpha
            .parse::<f32>()
            .with_context(|| format!("invalid color alpha {alpha:?}"))?,
        None => Color::OPAQUE,
    };
    Ok(Color::rgba(r, g, b, alpha))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float {value:?}: {err}")),
        None => Ok(default),
    }
}
