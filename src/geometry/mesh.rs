//! 网格数据
//!
//! CPU 侧的顶点 + 索引数组，创建管线时上传到 GPU。

use super::vertex::SceneVertex;

/// 网格数据
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// 顶点数组
    pub vertices: Vec<SceneVertex>,

    /// 索引数组，每 3 个索引定义一个三角形
    pub indices: Vec<u16>,

    /// 网格名称，用于日志和调试标签
    pub name: Option<String>,
}

impl MeshData {
    /// 创建一个指定名称的空网格数据
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: Some(name.into()),
        }
    }

    /// 获取顶点数量
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 获取索引数量
    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 获取三角形数量
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 验证网格数据的有效性
    ///
    /// 检查：
    /// - 索引数量是 3 的倍数
    /// - 所有索引都在有效范围内
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "Index count must be a multiple of 3, got {}",
                self.indices.len()
            ));
        }

        let vertex_count = self.vertices.len();
        if let Some((i, index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index as usize >= vertex_count)
        {
            return Err(format!(
                "Index {} at position {} is out of range (vertex count {})",
                index, i, vertex_count
            ));
        }

        Ok(())
    }

    /// 网格名称，没有名称时为 "mesh"
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("mesh")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_indices() {
        let mut mesh = MeshData::with_name("broken");
        mesh.vertices = vec![SceneVertex::default(); 3];
        mesh.indices = vec![0, 1, 2];
        assert!(mesh.validate().is_ok());

        mesh.indices = vec![0, 1];
        assert!(mesh.validate().is_err());

        mesh.indices = vec![0, 1, 3];
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_counts() {
        let mut mesh = MeshData::default();
        mesh.vertices = vec![SceneVertex::default(); 4];
        mesh.indices = vec![0, 1, 2, 2, 3, 0];
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.label(), "mesh");
    }
}
