//! Uniform upload for the multi-light shading program.

use glam::Mat4;

use crate::camera::Camera;
use crate::gl::GlBackend;
use crate::scene::{Attenuation, Scene};
use crate::shader::ActiveProgram;
use crate::texture::TextureBinding;

/// Texture unit sampled as `material.diffuse`.
pub const DIFFUSE_UNIT: u32 = 0;
/// Texture unit sampled as `material.specular`.
pub const SPECULAR_UNIT: u32 = 1;

/// Writes the per-frame lighting state: viewer position, material, the
/// directional light, every point light and the camera-mounted spot light.
pub fn upload_lighting<B: GlBackend>(program: &ActiveProgram<'_, B>, scene: &Scene, camera: &Camera) {
    program.set_uniform_vec3("uViewPos", camera.position());
    program.set_uniform_1f("material.shininess", scene.shininess);

    let directional = &scene.directional;
    program.set_uniform_vec3("dirLight.direction", directional.direction);
    program.set_uniform_vec3("dirLight.ambient", directional.ambient);
    program.set_uniform_vec3("dirLight.diffuse", directional.diffuse);
    program.set_uniform_vec3("dirLight.specular", directional.specular);

    for (index, light) in scene.point_lights.iter().enumerate() {
        let prefix = format!("pointLights[{index}]");
        program.set_uniform_vec3(&format!("{prefix}.position"), light.position);
        program.set_uniform_vec3(&format!("{prefix}.ambient"), light.ambient);
        program.set_uniform_vec3(&format!("{prefix}.diffuse"), light.diffuse);
        program.set_uniform_vec3(&format!("{prefix}.specular"), light.specular);
        upload_attenuation(program, &prefix, &light.attenuation);
    }

    let spot = &scene.spot;
    program.set_uniform_vec3("spotLight.position", camera.position());
    program.set_uniform_vec3("spotLight.direction", camera.front());
    program.set_uniform_vec3("spotLight.ambient", spot.ambient);
    program.set_uniform_vec3("spotLight.diffuse", spot.diffuse);
    program.set_uniform_vec3("spotLight.specular", spot.specular);
    upload_attenuation(program, "spotLight", &spot.attenuation);
    // The fragment shader compares against dot products.
    program.set_uniform_1f("spotLight.cutoff", spot.cutoff.to_radians().cos());
    program.set_uniform_1f("spotLight.outerCutoff", spot.outer_cutoff.to_radians().cos());
}

/// Binds the diffuse and specular maps to their units.
pub fn bind_material<B, T>(program: &ActiveProgram<'_, B>, diffuse: &T, specular: &T)
where
    B: GlBackend,
    T: TextureBinding + ?Sized,
{
    program.set_uniform_sampler_2d_with("material.diffuse", diffuse, DIFFUSE_UNIT);
    program.set_uniform_sampler_2d_with("material.specular", specular, SPECULAR_UNIT);
}

/// Transforms for one lit object.
pub fn upload_model<B: GlBackend>(program: &ActiveProgram<'_, B>, model: &Mat4, view_projection: &Mat4) {
    program.set_uniform_mat4("uModel", model);
    program.set_uniform_mat4("uModelViewProjection", &(*view_projection * *model));
}

/// Transform for one light marker drawn with the unlit program.
pub fn upload_lamp<B: GlBackend>(program: &ActiveProgram<'_, B>, model_view_projection: &Mat4) {
    program.set_uniform_mat4("uModelViewProjection", model_view_projection);
}

fn upload_attenuation<B: GlBackend>(program: &ActiveProgram<'_, B>, prefix: &str, attenuation: &Attenuation) {
    program.set_uniform_1f(&format!("{prefix}.constant"), attenuation.constant);
    program.set_uniform_1f(&format!("{prefix}.linear"), attenuation.linear);
    program.set_uniform_1f(&format!("{prefix}.quadratic"), attenuation.quadratic);
}
