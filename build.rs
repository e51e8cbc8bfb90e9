/// Build script for gui_sandbox
///
/// # Shader Strategy:
/// - OpenGL (wgpu GL): WGSL embedded via include_str!, validated by naga and compiled by the driver at startup
/// - Vulkan (ash): WGSL embedded via include_str!, translated to SPIR-V by naga at startup
fn main() {
    // Trigger rebuild if shader files change
    println!("cargo:rerun-if-changed=src/gfx/opengl/shaders/scene_vertex.wgsl");
    println!("cargo:rerun-if-changed=src/gfx/opengl/shaders/scene_fragment.wgsl");
    println!("cargo:rerun-if-changed=src/gfx/vulkan/shaders/gui.wgsl");
}
