//! WGSL 着色器工具
//!
//! 两个后端的着色器源码都以 WGSL 形式嵌入可执行文件：
//!
//! - OpenGL：先用 naga 校验，出错时得到带源码位置的诊断文本，再交给 wgpu
//! - Vulkan：用 naga 翻译为 SPIR-V
//!
//! 着色器编译失败一律视为致命错误。

use naga::back::spv;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use tracing::{debug, error};

use crate::core::error::{GraphicsError, Result};

/// 解析并校验后的着色器模块
pub struct ValidatedShader {
    pub module: naga::Module,
    pub info: naga::valid::ModuleInfo,
}

/// 解析并校验 WGSL 源码
///
/// `label` 只用于日志和错误信息。
pub fn validate_wgsl(label: &str, source: &str) -> Result<ValidatedShader> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        shader_error(label, e.emit_to_string(source))
    })?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::PUSH_CONSTANT)
        .validate(&module)
        .map_err(|e| shader_error(label, e.emit_to_string(source)))?;

    debug!("Shader '{}' validated ({} entry points)", label, module.entry_points.len());
    Ok(ValidatedShader { module, info })
}

/// WGSL 翻译为 SPIR-V
///
/// 不做坐标系调整，着色器直接按 Vulkan 约定（Y 轴向下）书写。
pub fn wgsl_to_spirv(label: &str, source: &str) -> Result<Vec<u32>> {
    let shader = validate_wgsl(label, source)?;

    let options = spv::Options {
        flags: spv::WriterFlags::empty(),
        ..spv::Options::default()
    };

    spv::write_vec(&shader.module, &shader.info, &options, None)
        .map_err(|e| shader_error(label, e.to_string()))
}

fn shader_error(label: &str, log: String) -> crate::core::error::SandboxError {
    error!("Failed to compile the {} shader:\n{}", label, log);
    GraphicsError::ShaderCompilation {
        stage: label.to_string(),
        log,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSTHROUGH: &str = r#"
        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(position, 1.0);
        }
    "#;

    #[test]
    fn test_valid_shader() {
        let shader = validate_wgsl("passthrough", PASSTHROUGH).unwrap();
        assert_eq!(shader.module.entry_points.len(), 1);
    }

    #[test]
    fn test_spirv_magic_number() {
        let words = wgsl_to_spirv("passthrough", PASSTHROUGH).unwrap();
        assert_eq!(words[0], 0x0723_0203);
    }

    #[test]
    fn test_syntax_error_reports_diagnostics() {
        let broken = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0) }";
        match validate_wgsl("broken", broken) {
            Err(crate::core::error::SandboxError::Graphics(GraphicsError::ShaderCompilation { stage, log })) => {
                assert_eq!(stage, "broken");
                assert!(!log.is_empty());
            }
            other => panic!("expected a shader compilation error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_type_error_is_caught_by_validation() {
        let mismatched = r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                let x: f32 = 1.0;
                return x;
            }
        "#;
        assert!(validate_wgsl("mismatched", mismatched).is_err());
    }
}
